//! Schema declaration and the layout compiler.
//!
//! A [`Schema`] is an ordered list of named, typed fields. Compiling a schema
//! produces a [`Layout`]: the byte offsets and sizes that both a writer and a
//! reader must agree on. The layout is the interoperability contract: there
//! is no self-describing header in the region itself, so two processes can
//! only talk to each other if they compiled identical schemas.

use std::collections::HashSet;

use thiserror::Error;

/// Scalar field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    F64,
    I32,
    Bool,
}

impl ScalarType {
    fn size(self) -> usize {
        match self {
            ScalarType::F64 => 8,
            ScalarType::I32 => 4,
            ScalarType::Bool => 1,
        }
    }
}

/// Array element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    F32,
    F64,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Bool,
}

impl ElementType {
    pub(crate) fn size(self) -> usize {
        match self {
            ElementType::F32 => 4,
            ElementType::F64 => 8,
            ElementType::I8 => 1,
            ElementType::I16 => 2,
            ElementType::I32 => 4,
            ElementType::I64 => 8,
            ElementType::U8 => 1,
            ElementType::U16 => 2,
            ElementType::U32 => 4,
            ElementType::U64 => 8,
            ElementType::Bool => 1,
        }
    }
}

/// The shape (kind) of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Scalar(ScalarType),
    Str { max_chars: u32 },
    Array { element: ElementType, shape: Vec<u32> },
}

/// One named, typed field in a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn scalar(name: impl Into<String>, scalar_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Scalar(scalar_type),
        }
    }

    pub fn string(name: impl Into<String>, max_chars: u32) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Str { max_chars },
        }
    }

    pub fn array(name: impl Into<String>, element: ElementType, shape: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Array { element, shape },
        }
    }

    fn body_size(&self) -> usize {
        match &self.kind {
            FieldKind::Scalar(s) => s.size(),
            FieldKind::Str { max_chars } => 4 + 4 * (*max_chars as usize),
            FieldKind::Array { element, shape } => {
                element.size() * shape.iter().map(|&d| d as usize).product::<usize>()
            }
        }
    }
}

/// Errors raised while constructing or compiling a [`Schema`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema has no fields")]
    EmptySchema,
    #[error("duplicate field name: {0}")]
    DuplicateField(String),
    #[error("field '{field}' has invalid dimension {dim} (must be >= 1)")]
    InvalidDimension { field: String, dim: u32 },
    #[error("field '{0}' declared with an unsupported type")]
    UnsupportedType(String),
}

/// An ordered, validated, immutable list of field descriptors.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    /// Validate and construct a schema from an ordered field list.
    ///
    /// Validation: non-empty, unique names, positive `max_chars`/shape
    /// dimensions (a zero-length string field is legal, `max_chars == 0`
    /// means "present but always empty"; only negative-equivalent values are
    /// rejected, which `u32` already rules out; shape dimensions must be
    /// strictly positive).
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self, SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::EmptySchema);
        }

        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
            if let FieldKind::Array { shape, .. } = &field.kind {
                if shape.is_empty() {
                    return Err(SchemaError::InvalidDimension {
                        field: field.name.clone(),
                        dim: 0,
                    });
                }
                for &dim in shape {
                    if dim < 1 {
                        return Err(SchemaError::InvalidDimension {
                            field: field.name.clone(),
                            dim,
                        });
                    }
                }
            }
        }

        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Compile this schema into a deterministic byte layout.
    ///
    /// Given the same field list in the same order, this always produces the
    /// same offsets. That determinism is what lets an independent reader
    /// process agree with the writer without any runtime negotiation.
    pub fn compile(&self) -> Layout {
        let num_fields = self.fields.len();

        // header: 8-byte seq_begin + one status byte per field, padded to 8.
        let mut offset = 8 + num_fields;
        offset = round_up_8(offset);
        let header_size = offset;

        let mut field_layouts = Vec::with_capacity(num_fields);
        for field in &self.fields {
            let size = field.body_size();
            field_layouts.push(FieldLayout {
                offset,
                size,
                kind: field.kind.clone(),
            });
            offset += size;
        }

        // footer: 8-byte seq_end, slot padded to a multiple of 8.
        let slot_size = round_up_8(offset + 8);

        Layout {
            header_size,
            field_layouts,
            slot_size,
        }
    }
}

fn round_up_8(n: usize) -> usize {
    (n + 7) & !7
}

/// Byte offset and size of one compiled field.
#[derive(Debug, Clone)]
pub struct FieldLayout {
    pub offset: usize,
    pub size: usize,
    pub kind: FieldKind,
}

/// The compiled, deterministic byte layout of one slot.
#[derive(Debug, Clone)]
pub struct Layout {
    pub header_size: usize,
    pub field_layouts: Vec<FieldLayout>,
    pub slot_size: usize,
}

impl Layout {
    pub fn status_offset(&self, field_index: usize) -> usize {
        8 + field_index
    }

    pub fn seq_end_offset(&self) -> usize {
        self.slot_size - 8
    }

    /// Region size for `slots` slots. `metadata_size` is 0 for a single slot,
    /// 24 (three little-endian u64 counters) for a ring.
    pub fn region_size(&self, slots: usize) -> usize {
        let metadata_size = if slots > 1 { 24 } else { 0 };
        metadata_size + self.slot_size * slots
    }

    pub fn metadata_size(slots: usize) -> usize {
        if slots > 1 {
            24
        } else {
            0
        }
    }
}
