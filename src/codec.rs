//! Per-field encode/decode against raw slot bytes.
//!
//! Every function here operates on a `(base pointer, field layout)` pair and
//! never allocates a reference into the shared region for the caller. Reads
//! copy out, writes copy in. Truncation is reported as a bool, never an
//! error; the slot protocol is the one that turns it into a status bit.

use crate::schema::{ElementType, FieldKind, FieldLayout, ScalarType};
use crate::value::{ArrayData, FieldValue};

/// Write `value` at `layout`'s offset. Returns `true` if the value had to be
/// truncated to fit.
///
/// # Safety
/// `base` must point to a region at least `layout.offset + layout.size` bytes
/// long, exclusively owned by the caller for the duration of the call.
pub(crate) unsafe fn encode(base: *mut u8, layout: &FieldLayout, value: &FieldValue) -> bool {
    let field_ptr = base.add(layout.offset);
    match &layout.kind {
        FieldKind::Scalar(scalar_type) => {
            encode_scalar(field_ptr, *scalar_type, value);
            false
        }
        FieldKind::Str { max_chars } => encode_string(field_ptr, *max_chars, value),
        FieldKind::Array { element, shape } => encode_array(field_ptr, *element, shape, value),
    }
}

/// Read the value at `layout`'s offset into a freshly owned [`FieldValue`].
///
/// # Safety
/// `base` must point to a region at least `layout.offset + layout.size` bytes
/// long, valid to read for the duration of the call.
pub(crate) unsafe fn decode(base: *const u8, layout: &FieldLayout) -> FieldValue {
    let field_ptr = base.add(layout.offset);
    match &layout.kind {
        FieldKind::Scalar(scalar_type) => decode_scalar(field_ptr, *scalar_type),
        FieldKind::Str { .. } => decode_string(field_ptr),
        FieldKind::Array { element, shape } => decode_array(field_ptr, *element, shape),
    }
}

fn as_f64(value: &FieldValue) -> f64 {
    match value {
        FieldValue::F64(v) => *v,
        FieldValue::I32(v) => *v as f64,
        FieldValue::Bool(v) => {
            if *v {
                1.0
            } else {
                0.0
            }
        }
        FieldValue::Str(_) | FieldValue::Array(..) => 0.0,
    }
}

unsafe fn encode_scalar(ptr: *mut u8, scalar_type: ScalarType, value: &FieldValue) {
    match scalar_type {
        ScalarType::F64 => {
            let bytes = as_f64(value).to_le_bytes();
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, 8);
        }
        ScalarType::I32 => {
            let v = match value {
                FieldValue::I32(v) => *v,
                other => as_f64(other) as i32,
            };
            std::ptr::copy_nonoverlapping(v.to_le_bytes().as_ptr(), ptr, 4);
        }
        ScalarType::Bool => {
            let v = match value {
                FieldValue::Bool(v) => *v,
                other => as_f64(other) != 0.0,
            };
            *ptr = v as u8;
        }
    }
}

unsafe fn decode_scalar(ptr: *const u8, scalar_type: ScalarType) -> FieldValue {
    match scalar_type {
        ScalarType::F64 => {
            let mut bytes = [0u8; 8];
            std::ptr::copy_nonoverlapping(ptr, bytes.as_mut_ptr(), 8);
            FieldValue::F64(f64::from_le_bytes(bytes))
        }
        ScalarType::I32 => {
            let mut bytes = [0u8; 4];
            std::ptr::copy_nonoverlapping(ptr, bytes.as_mut_ptr(), 4);
            FieldValue::I32(i32::from_le_bytes(bytes))
        }
        ScalarType::Bool => FieldValue::Bool(*ptr != 0),
    }
}

unsafe fn encode_string(ptr: *mut u8, max_chars: u32, value: &FieldValue) -> bool {
    let s = match value {
        FieldValue::Str(s) => s.as_str(),
        _ => "",
    };

    let max_chars = max_chars as usize;
    let char_count = s.chars().count();
    let truncated = char_count > max_chars;

    let stored: String = if truncated {
        s.chars().take(max_chars).collect()
    } else {
        s.to_string()
    };

    let bytes = stored.as_bytes();
    let len = bytes.len() as u32;
    std::ptr::copy_nonoverlapping(len.to_le_bytes().as_ptr(), ptr, 4);
    std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.add(4), bytes.len());

    truncated
}

unsafe fn decode_string(ptr: *const u8) -> FieldValue {
    let mut len_bytes = [0u8; 4];
    std::ptr::copy_nonoverlapping(ptr, len_bytes.as_mut_ptr(), 4);
    let len = u32::from_le_bytes(len_bytes) as usize;

    let mut buf = vec![0u8; len];
    std::ptr::copy_nonoverlapping(ptr.add(4), buf.as_mut_ptr(), len);

    FieldValue::Str(String::from_utf8_lossy(&buf).into_owned())
}

fn shape_product(shape: &[u32]) -> usize {
    shape.iter().map(|&d| d as usize).product()
}

macro_rules! encode_numeric_array {
    ($ptr:expr, $src:expr, $count:expr, $target_ty:ty) => {{
        let mut written = 0usize;
        for &v in $src.iter().take($count) {
            let bytes = (v as $target_ty).to_le_bytes();
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), $ptr.add(written * bytes.len()), bytes.len());
            written += 1;
        }
        written
    }};
}

unsafe fn encode_array(ptr: *mut u8, element: ElementType, shape: &[u32], value: &FieldValue) -> bool {
    let empty = ArrayData::F64(Vec::new());
    let (src, source_shape) = match value {
        FieldValue::Array(a, source_shape) => (a, source_shape.as_deref()),
        _ => (&empty, None),
    };

    let expected_len = shape_product(shape);
    // A caller-asserted shape that differs from the declared one is truncated
    // even when the flattened element count happens to match (same element
    // count written from a different shape is not the same data).
    let shape_mismatch = source_shape.is_some_and(|s| s != shape);
    let truncated = shape_mismatch || src.len() != expected_len;
    let copy_count = src.len().min(expected_len);

    let written = match (src, element) {
        (ArrayData::F32(v), ElementType::F32) => encode_numeric_array!(ptr, v, copy_count, f32),
        (ArrayData::F64(v), ElementType::F64) => encode_numeric_array!(ptr, v, copy_count, f64),
        (ArrayData::I8(v), ElementType::I8) => encode_numeric_array!(ptr, v, copy_count, i8),
        (ArrayData::I16(v), ElementType::I16) => encode_numeric_array!(ptr, v, copy_count, i16),
        (ArrayData::I32(v), ElementType::I32) => encode_numeric_array!(ptr, v, copy_count, i32),
        (ArrayData::I64(v), ElementType::I64) => encode_numeric_array!(ptr, v, copy_count, i64),
        (ArrayData::U8(v), ElementType::U8) => encode_numeric_array!(ptr, v, copy_count, u8),
        (ArrayData::U16(v), ElementType::U16) => encode_numeric_array!(ptr, v, copy_count, u16),
        (ArrayData::U32(v), ElementType::U32) => encode_numeric_array!(ptr, v, copy_count, u32),
        (ArrayData::U64(v), ElementType::U64) => encode_numeric_array!(ptr, v, copy_count, u64),
        (ArrayData::Bool(v), ElementType::Bool) => {
            for (i, &b) in v.iter().take(copy_count).enumerate() {
                *ptr.add(i) = b as u8;
            }
            copy_count
        }
        // Cross-type source: coerce element-by-element through f64.
        (other, target) => encode_cross_type_array(ptr, other, target, copy_count),
    };

    // Zero-pad any remaining elements (short write).
    let element_size = element.size();
    if written < expected_len {
        let pad_start = written * element_size;
        let pad_len = (expected_len - written) * element_size;
        std::ptr::write_bytes(ptr.add(pad_start), 0, pad_len);
    }

    truncated
}

unsafe fn encode_cross_type_array(
    ptr: *mut u8,
    src: &ArrayData,
    target: ElementType,
    copy_count: usize,
) -> usize {
    let as_f64_vec: Vec<f64> = match src {
        ArrayData::F32(v) => v.iter().map(|&x| x as f64).collect(),
        ArrayData::F64(v) => v.clone(),
        ArrayData::I8(v) => v.iter().map(|&x| x as f64).collect(),
        ArrayData::I16(v) => v.iter().map(|&x| x as f64).collect(),
        ArrayData::I32(v) => v.iter().map(|&x| x as f64).collect(),
        ArrayData::I64(v) => v.iter().map(|&x| x as f64).collect(),
        ArrayData::U8(v) => v.iter().map(|&x| x as f64).collect(),
        ArrayData::U16(v) => v.iter().map(|&x| x as f64).collect(),
        ArrayData::U32(v) => v.iter().map(|&x| x as f64).collect(),
        ArrayData::U64(v) => v.iter().map(|&x| x as f64).collect(),
        ArrayData::Bool(v) => v.iter().map(|&x| if x { 1.0 } else { 0.0 }).collect(),
    };

    match target {
        ElementType::F32 => encode_numeric_array!(ptr, as_f64_vec, copy_count, f32),
        ElementType::F64 => encode_numeric_array!(ptr, as_f64_vec, copy_count, f64),
        ElementType::I8 => encode_numeric_array!(ptr, as_f64_vec, copy_count, i8),
        ElementType::I16 => encode_numeric_array!(ptr, as_f64_vec, copy_count, i16),
        ElementType::I32 => encode_numeric_array!(ptr, as_f64_vec, copy_count, i32),
        ElementType::I64 => encode_numeric_array!(ptr, as_f64_vec, copy_count, i64),
        ElementType::U8 => encode_numeric_array!(ptr, as_f64_vec, copy_count, u8),
        ElementType::U16 => encode_numeric_array!(ptr, as_f64_vec, copy_count, u16),
        ElementType::U32 => encode_numeric_array!(ptr, as_f64_vec, copy_count, u32),
        ElementType::U64 => encode_numeric_array!(ptr, as_f64_vec, copy_count, u64),
        ElementType::Bool => {
            for (i, &v) in as_f64_vec.iter().take(copy_count).enumerate() {
                *ptr.add(i) = (v != 0.0) as u8;
            }
            copy_count
        }
    }
}

macro_rules! decode_numeric_array {
    ($ptr:expr, $count:expr, $ty:ty, $variant:ident) => {{
        let size = std::mem::size_of::<$ty>();
        let mut out = Vec::with_capacity($count);
        for i in 0..$count {
            let mut bytes = vec![0u8; size];
            std::ptr::copy_nonoverlapping($ptr.add(i * size), bytes.as_mut_ptr(), size);
            let arr: [u8; std::mem::size_of::<$ty>()] = bytes.try_into().unwrap();
            out.push(<$ty>::from_le_bytes(arr));
        }
        ArrayData::$variant(out)
    }};
}

unsafe fn decode_array(ptr: *const u8, element: ElementType, shape: &[u32]) -> FieldValue {
    let count = shape_product(shape);
    let data = match element {
        ElementType::F32 => decode_numeric_array!(ptr, count, f32, F32),
        ElementType::F64 => decode_numeric_array!(ptr, count, f64, F64),
        ElementType::I8 => decode_numeric_array!(ptr, count, i8, I8),
        ElementType::I16 => decode_numeric_array!(ptr, count, i16, I16),
        ElementType::I32 => decode_numeric_array!(ptr, count, i32, I32),
        ElementType::I64 => decode_numeric_array!(ptr, count, i64, I64),
        ElementType::U8 => decode_numeric_array!(ptr, count, u8, U8),
        ElementType::U16 => decode_numeric_array!(ptr, count, u16, U16),
        ElementType::U32 => decode_numeric_array!(ptr, count, u32, U32),
        ElementType::U64 => decode_numeric_array!(ptr, count, u64, U64),
        ElementType::Bool => {
            let mut out = Vec::with_capacity(count);
            for i in 0..count {
                out.push(*ptr.add(i) != 0);
            }
            ArrayData::Bool(out)
        }
    };
    FieldValue::Array(data, None)
}
