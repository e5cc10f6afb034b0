//! Seqlock write/read sequence and per-field status bits.
//!
//! A slot is a fixed-size byte range: an 8-byte `seq_begin`, one status byte
//! per field, padding, the field bodies, and an 8-byte `seq_end`. Every
//! access goes through [`write_slot`] or [`read_slot`]; nothing here trusts
//! field bytes unless the surrounding sequence counters agree.

use std::collections::HashMap;
use std::sync::atomic::{fence, AtomicU64, Ordering};

use crate::codec;
use crate::schema::{Layout, Schema};
use crate::value::{Field, FieldValue, StatusFlags};

pub(crate) const TRUNCATED: u8 = 1 << 0;
pub(crate) const UNWRITTEN: u8 = 1 << 1;
pub(crate) const MODIFIED: u8 = 1 << 2;

unsafe fn seq_begin_atomic(slot_ptr: *mut u8) -> &'static AtomicU64 {
    &*(slot_ptr as *const AtomicU64)
}

unsafe fn seq_end_atomic(slot_ptr: *mut u8, layout: &Layout) -> &'static AtomicU64 {
    &*(slot_ptr.add(layout.seq_end_offset()) as *const AtomicU64)
}

/// Initialize a freshly created slot: `seq_begin = seq_end = 0`, every
/// status byte `UNWRITTEN`. Field bodies are left untouched; readers must
/// not trust them while `UNWRITTEN` is set.
///
/// # Safety
/// `slot_ptr` must point to `layout.slot_size` writable bytes.
pub(crate) unsafe fn init_slot(slot_ptr: *mut u8, layout: &Layout) {
    seq_begin_atomic(slot_ptr).store(0, Ordering::Relaxed);
    for i in 0..layout.field_layouts.len() {
        std::ptr::write(slot_ptr.add(layout.status_offset(i)), UNWRITTEN);
    }
    seq_end_atomic(slot_ptr, layout).store(0, Ordering::Relaxed);
}

/// Publish `updates` into slot `slot_ptr` under seqlock discipline. Fields
/// absent from `updates` have their `MODIFIED` bit cleared but are
/// otherwise untouched.
///
/// # Safety
/// `slot_ptr` must point to `layout.slot_size` writable bytes exclusively
/// owned by the caller (single-writer precondition).
pub(crate) unsafe fn write_slot(
    slot_ptr: *mut u8,
    layout: &Layout,
    schema: &Schema,
    updates: &HashMap<String, FieldValue>,
) {
    let seq = seq_begin_atomic(slot_ptr).load(Ordering::Relaxed);
    seq_begin_atomic(slot_ptr).store(seq + 1, Ordering::Relaxed);
    fence(Ordering::Release);

    for (i, field) in schema.fields().iter().enumerate() {
        let status_ptr = slot_ptr.add(layout.status_offset(i));
        let mut status = std::ptr::read(status_ptr);

        if let Some(value) = updates.get(&field.name) {
            let truncated = codec::encode(slot_ptr, &layout.field_layouts[i], value);
            status &= !UNWRITTEN;
            status |= MODIFIED;
            if truncated {
                status |= TRUNCATED;
            } else {
                status &= !TRUNCATED;
            }
        } else {
            status &= !MODIFIED;
        }

        std::ptr::write(status_ptr, status);
    }

    fence(Ordering::Release);
    seq_end_atomic(slot_ptr, layout).store(seq + 1, Ordering::Relaxed);
}

/// Read a slot under seqlock discipline. Returns `None` on a torn read
/// (caller retries); otherwise the decoded field set, optionally clearing
/// `MODIFIED` on every status byte as a side effect of a "consuming" read.
///
/// # Safety
/// `slot_ptr` must point to `layout.slot_size` bytes valid to read (and, if
/// `reset_modified` is set, to write) for the duration of the call.
pub(crate) unsafe fn read_slot(
    slot_ptr: *mut u8,
    layout: &Layout,
    schema: &Schema,
    reset_modified: bool,
) -> Option<HashMap<String, Field>> {
    let b = seq_begin_atomic(slot_ptr).load(Ordering::Relaxed);
    fence(Ordering::Acquire);

    let mut fields = HashMap::with_capacity(schema.fields().len());
    for (i, field) in schema.fields().iter().enumerate() {
        let status_byte = std::ptr::read(slot_ptr.add(layout.status_offset(i)));
        let value = codec::decode(slot_ptr, &layout.field_layouts[i]);
        let status = StatusFlags {
            truncated: status_byte & TRUNCATED != 0,
            unwritten: status_byte & UNWRITTEN != 0,
            modified: status_byte & MODIFIED != 0,
        };
        fields.insert(field.name.clone(), Field::new(value, status));
    }

    fence(Ordering::Acquire);
    let e = seq_end_atomic(slot_ptr, layout).load(Ordering::Relaxed);

    if b != e {
        return None;
    }

    if reset_modified {
        for i in 0..schema.fields().len() {
            let status_ptr = slot_ptr.add(layout.status_offset(i));
            let status = std::ptr::read(status_ptr) & !MODIFIED;
            std::ptr::write(status_ptr, status);
        }
    }

    Some(fields)
}
