//! Field values: what callers pass to `publish` and what `consume` hands back.

use std::fmt;

use crate::schema::ElementType;

/// A flattened, typed array value.
///
/// Variants carry the flattened (row-major) data; the declared shape lives
/// in the schema, not here. Decode always restores it.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    Bool(Vec<bool>),
}

impl ArrayData {
    pub fn element_type(&self) -> ElementType {
        match self {
            ArrayData::F32(_) => ElementType::F32,
            ArrayData::F64(_) => ElementType::F64,
            ArrayData::I8(_) => ElementType::I8,
            ArrayData::I16(_) => ElementType::I16,
            ArrayData::I32(_) => ElementType::I32,
            ArrayData::I64(_) => ElementType::I64,
            ArrayData::U8(_) => ElementType::U8,
            ArrayData::U16(_) => ElementType::U16,
            ArrayData::U32(_) => ElementType::U32,
            ArrayData::U64(_) => ElementType::U64,
            ArrayData::Bool(_) => ElementType::Bool,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ArrayData::F32(v) => v.len(),
            ArrayData::F64(v) => v.len(),
            ArrayData::I8(v) => v.len(),
            ArrayData::I16(v) => v.len(),
            ArrayData::I32(v) => v.len(),
            ArrayData::I64(v) => v.len(),
            ArrayData::U8(v) => v.len(),
            ArrayData::U16(v) => v.len(),
            ArrayData::U32(v) => v.len(),
            ArrayData::U64(v) => v.len(),
            ArrayData::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A value for one field, as passed to `publish` or decoded by `consume`.
///
/// `Array`'s second element is the shape the source was actually produced
/// with, when the caller knows it (e.g. building from a multi-dimensional
/// buffer). `publish` compares it against the field's declared shape and
/// marks the field truncated on a mismatch, even if the flattened element
/// count happens to match. Pass `None` when the source is already a flat
/// vector with no shape of its own to assert.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    F64(f64),
    I32(i32),
    Bool(bool),
    Str(String),
    Array(ArrayData, Option<Vec<u32>>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::F64(v) => write!(f, "{v}"),
            FieldValue::I32(v) => write!(f, "{v}"),
            FieldValue::Bool(v) => write!(f, "{v}"),
            FieldValue::Str(v) => write!(f, "{v}"),
            FieldValue::Array(a, _) => write!(f, "<array[{}]>", a.len()),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::F64(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::I32(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl From<ArrayData> for FieldValue {
    fn from(v: ArrayData) -> Self {
        FieldValue::Array(v, None)
    }
}

/// Per-field freshness bits: truncated, unwritten, and modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusFlags {
    pub truncated: bool,
    pub unwritten: bool,
    pub modified: bool,
}

impl StatusFlags {
    /// `valid := !truncated && !unwritten`, derived rather than stored.
    pub fn valid(&self) -> bool {
        !self.truncated && !self.unwritten
    }
}

/// A decoded value paired with its freshness status. Modeled as a small
/// struct with explicit accessors rather than a scalar subclass.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    value: FieldValue,
    status: StatusFlags,
}

impl Field {
    pub(crate) fn new(value: FieldValue, status: StatusFlags) -> Self {
        Self { value, status }
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    pub fn into_value(self) -> FieldValue {
        self.value
    }

    pub fn valid(&self) -> bool {
        self.status.valid()
    }

    pub fn modified(&self) -> bool {
        self.status.modified
    }

    pub fn truncated(&self) -> bool {
        self.status.truncated
    }

    pub fn unwritten(&self) -> bool {
        self.status.unwritten
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            FieldValue::F64(v) => Some(v),
            FieldValue::I32(v) => Some(v as f64),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self.value {
            FieldValue::I32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.value {
            FieldValue::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            FieldValue::Str(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayData> {
        match &self.value {
            FieldValue::Array(a, _) => Some(a),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

impl PartialEq<f64> for Field {
    fn eq(&self, other: &f64) -> bool {
        self.as_f64().is_some_and(|v| v == *other)
    }
}

impl PartialEq<i32> for Field {
    fn eq(&self, other: &i32) -> bool {
        self.as_i32() == Some(*other)
    }
}

impl PartialEq<str> for Field {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}
