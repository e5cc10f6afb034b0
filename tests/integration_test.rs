//! Integration tests exercising `SharedMemory` across independently opened
//! handles, the way a writer process and a reader process would use it.

#![cfg(unix)]

use std::thread;
use std::time::Duration;

use shmrec::{ArrayData, ElementType, FieldDescriptor, FieldValue, ScalarType, Schema, ShmResult};
use shmrec::SharedMemory;

fn unique_name(prefix: &str) -> String {
    format!("{prefix}{}", uuid::Uuid::new_v4().simple())
}

fn s1_schema() -> Schema {
    Schema::new(vec![
        FieldDescriptor::scalar("v", ScalarType::F64),
        FieldDescriptor::scalar("n", ScalarType::I32),
    ])
    .unwrap()
}

#[test]
fn s1_single_slot_publish_consume() -> ShmResult<()> {
    let name = unique_name("s1_");
    let mut writer = SharedMemory::new(s1_schema(), Some(&name), 1, true)?;

    writer.publish([("v", FieldValue::F64(42.0)), ("n", FieldValue::I32(10))])?;

    let record = writer.consume(Duration::ZERO, false, false)?.unwrap();
    assert_eq!(record["v"].as_f64(), Some(42.0));
    assert!(record["v"].valid());
    assert!(record["v"].modified());
    assert_eq!(record["n"].as_i32(), Some(10));
    assert!(record["n"].modified());

    Ok(())
}

#[test]
fn s2_partial_modification() -> ShmResult<()> {
    let name = unique_name("s2_");
    let mut writer = SharedMemory::new(s1_schema(), Some(&name), 1, true)?;

    writer.publish([("v", FieldValue::F64(1.0))])?;
    let record = writer.consume(Duration::ZERO, false, false)?.unwrap();
    assert!(!record["n"].modified());
    assert!(record["n"].unwritten());

    writer.publish([("n", FieldValue::I32(5))])?;
    let record = writer.consume(Duration::ZERO, false, false)?.unwrap();
    assert!(!record["v"].modified());
    assert!(!record["v"].unwritten());
    assert!(record["n"].modified());

    Ok(())
}

#[test]
fn s3_string_truncation() -> ShmResult<()> {
    let name = unique_name("s3_");
    let schema = Schema::new(vec![FieldDescriptor::string("m", 32)]).unwrap();
    let mut writer = SharedMemory::new(schema, Some(&name), 1, true)?;

    writer.publish([("m", FieldValue::Str("a".repeat(40)))])?;

    let record = writer.consume(Duration::ZERO, false, false)?.unwrap();
    assert_eq!(record["m"].as_str(), Some("a".repeat(32).as_str()));
    assert!(record["m"].truncated());
    assert!(!record["m"].valid());

    Ok(())
}

#[test]
fn s4_ring_fifo_order_with_overrun() -> ShmResult<()> {
    let name = unique_name("s4_");
    let schema = Schema::new(vec![FieldDescriptor::scalar("v", ScalarType::F64)]).unwrap();
    let mut writer = SharedMemory::new(schema, Some(&name), 3, true)?;

    for i in 0..5 {
        writer.publish([("v", FieldValue::F64(i as f64))])?;
        writer.finalize()?;
    }

    for expected in [2.0, 3.0, 4.0] {
        let record = writer.consume(Duration::ZERO, false, false)?.unwrap();
        assert_eq!(record["v"].as_f64(), Some(expected));
    }

    assert!(writer.consume(Duration::ZERO, false, false)?.is_none());

    Ok(())
}

#[test]
fn s5_latest_skip() -> ShmResult<()> {
    let name = unique_name("s5_");
    let schema = Schema::new(vec![FieldDescriptor::scalar("v", ScalarType::F64)]).unwrap();
    let mut writer = SharedMemory::new(schema, Some(&name), 5, true)?;

    for i in 0..5 {
        writer.publish([("v", FieldValue::F64(i as f64))])?;
        writer.finalize()?;
    }

    let record = writer.consume(Duration::ZERO, true, false)?.unwrap();
    assert_eq!(record["v"].as_f64(), Some(4.0));

    Ok(())
}

#[test]
fn s6_reset_modified() -> ShmResult<()> {
    let name = unique_name("s6_");
    let schema = Schema::new(vec![FieldDescriptor::scalar("v", ScalarType::F64)]).unwrap();
    let mut writer = SharedMemory::new(schema, Some(&name), 1, true)?;

    writer.publish([("v", FieldValue::F64(1.0))])?;

    let observed = writer.consume(Duration::ZERO, false, true)?.unwrap();
    assert!(observed["v"].modified());

    let next = writer.consume(Duration::ZERO, false, false)?.unwrap();
    assert!(!next["v"].modified());

    Ok(())
}

#[test]
fn finalize_on_single_slot_is_a_mode_error() -> ShmResult<()> {
    let name = unique_name("mode_");
    let mut writer = SharedMemory::new(s1_schema(), Some(&name), 1, true)?;
    writer.publish([("v", FieldValue::F64(1.0))])?;
    assert!(writer.finalize().is_err());
    Ok(())
}

#[test]
fn reset_modified_in_ring_mode_is_a_mode_error() -> ShmResult<()> {
    let name = unique_name("mode2_");
    let schema = Schema::new(vec![FieldDescriptor::scalar("v", ScalarType::F64)]).unwrap();
    let mut writer = SharedMemory::new(schema, Some(&name), 3, true)?;
    writer.publish([("v", FieldValue::F64(1.0))])?;
    writer.finalize()?;
    assert!(writer.consume(Duration::ZERO, false, true).is_err());
    Ok(())
}

#[test]
fn slots_below_one_is_a_mode_error() {
    let schema = s1_schema();
    let result = SharedMemory::new(schema, Some("bad_slots"), 0, true);
    assert!(result.is_err());
}

#[test]
fn array_field_roundtrip() -> ShmResult<()> {
    let name = unique_name("arr_");
    let schema = Schema::new(vec![FieldDescriptor::array("frame", ElementType::F32, vec![2, 3])]).unwrap();
    let mut writer = SharedMemory::new(schema, Some(&name), 1, true)?;

    writer.publish([(
        "frame",
        FieldValue::Array(ArrayData::F32(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]), None),
    )])?;

    let record = writer.consume(Duration::ZERO, false, false)?.unwrap();
    match record["frame"].as_array().unwrap() {
        ArrayData::F32(values) => assert_eq!(values, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
        other => panic!("unexpected array variant: {other:?}"),
    }
    assert!(!record["frame"].truncated());

    Ok(())
}

#[test]
fn array_field_reshaped_source_is_truncated() -> ShmResult<()> {
    let name = unique_name("arr_reshape_");
    let schema = Schema::new(vec![FieldDescriptor::array("frame", ElementType::F32, vec![2, 3])]).unwrap();
    let mut writer = SharedMemory::new(schema, Some(&name), 1, true)?;

    writer.publish([(
        "frame",
        FieldValue::Array(ArrayData::F32(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]), Some(vec![3, 2])),
    )])?;

    let record = writer.consume(Duration::ZERO, false, false)?.unwrap();
    assert!(record["frame"].truncated());
    match record["frame"].as_array().unwrap() {
        ArrayData::F32(values) => assert_eq!(values, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
        other => panic!("unexpected array variant: {other:?}"),
    }

    Ok(())
}

#[test]
fn two_handles_same_region_see_each_others_writes() -> ShmResult<()> {
    let name = unique_name("cross_");
    let mut writer = SharedMemory::new(s1_schema(), Some(&name), 1, true)?;
    let mut reader = SharedMemory::new(s1_schema(), Some(&name), 1, false)?;

    writer.publish([("v", FieldValue::F64(9.0)), ("n", FieldValue::I32(1))])?;

    let record = reader.consume(Duration::ZERO, false, false)?.unwrap();
    assert_eq!(record["v"].as_f64(), Some(9.0));
    assert_eq!(record["n"].as_i32(), Some(1));

    Ok(())
}

#[test]
fn open_nonexistent_region_fails() {
    let name = unique_name("missing_");
    let result = SharedMemory::new(s1_schema(), Some(&name), 1, false);
    assert!(result.is_err());
}

#[test]
fn concurrent_ring_producer_consumer() -> ShmResult<()> {
    let name = unique_name("conc_");
    let schema = Schema::new(vec![FieldDescriptor::scalar("v", ScalarType::F64)]).unwrap();
    let mut writer = SharedMemory::new(schema.clone(), Some(&name), 8, true)?;
    let event_count = 200;

    let reader_name = name.clone();
    let reader_schema = schema.clone();
    let consumer_handle = thread::spawn(move || {
        let mut reader = SharedMemory::new(reader_schema, Some(&reader_name), 8, false).unwrap();
        let mut received = Vec::new();
        while received.len() < event_count {
            if let Some(record) = reader
                .consume(Duration::from_millis(200), false, false)
                .unwrap()
            {
                received.push(record["v"].as_f64().unwrap());
            }
        }
        received
    });

    thread::sleep(Duration::from_millis(10));

    for i in 0..event_count {
        writer.publish([("v", FieldValue::F64(i as f64))])?;
        writer.finalize()?;
    }

    let received = consumer_handle.join().expect("consumer thread panicked");
    assert_eq!(received.len(), event_count);

    Ok(())
}

#[test]
fn idempotent_reads_without_reset_modified() -> ShmResult<()> {
    let name = unique_name("idem_");
    let mut writer = SharedMemory::new(s1_schema(), Some(&name), 1, true)?;
    writer.publish([("v", FieldValue::F64(3.5)), ("n", FieldValue::I32(7))])?;

    let first = writer.consume(Duration::ZERO, false, false)?.unwrap();
    let second = writer.consume(Duration::ZERO, false, false)?.unwrap();

    assert_eq!(first["v"].as_f64(), second["v"].as_f64());
    assert_eq!(first["n"].as_i32(), second["n"].as_i32());
    assert!(second["v"].modified());

    Ok(())
}
