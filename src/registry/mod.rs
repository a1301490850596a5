//! Typed field registry.
//!
//! Describes named, typed scalar fields that status sets, telemetry
//! samples, and parameter descriptors all share.
//!
//! ```text
//!   application ──owns──▶ Shared<T> ◀──clone── TypedField ◀── FieldSet
//!                                                  │
//!                              ParameterDescriptor ┘ (uref + validator)
//! ```
//!
//! The registry never allocates field storage. The application builds a
//! [`Shared`] handle, keeps one clone, and hands another to the field.
//! The storage variant fixes the field's [`FieldKind`], so kind and
//! storage cannot disagree.

pub mod buffer;
pub mod shared;

pub use buffer::{BufferOverflow, FixedBuf};
pub use shared::{Guarded, Shared, guarded};

use serde::Serialize;

use crate::error::ParamError;

// ---------------------------------------------------------------------------
// Kinds and values
// ---------------------------------------------------------------------------

/// Scalar type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FieldKind {
    String,
    Int32,
    UInt32,
    UInt8,
    Float,
    Double,
}

impl FieldKind {
    /// Byte width of the native encoding, `None` for variable-length text.
    pub const fn width(self) -> Option<usize> {
        match self {
            Self::String => None,
            Self::Int32 | Self::UInt32 | Self::Float => Some(4),
            Self::UInt8 => Some(1),
            Self::Double => Some(8),
        }
    }

    /// Decode a raw little-endian value of this kind.
    ///
    /// Scalar kinds require exactly `width()` bytes. Text must be UTF-8.
    pub fn decode(self, raw: &[u8]) -> Result<FieldValue, ParamError> {
        if let Some(width) = self.width() {
            if raw.len() != width {
                return Err(ParamError::LengthInvalid);
            }
        }
        let value = match self {
            Self::String => {
                let text = core::str::from_utf8(raw).map_err(|_| ParamError::LengthInvalid)?;
                FieldValue::Text(text.to_owned())
            }
            Self::Int32 => FieldValue::Int32(i32::from_le_bytes(array(raw))),
            Self::UInt32 => FieldValue::UInt32(u32::from_le_bytes(array(raw))),
            Self::UInt8 => FieldValue::UInt8(raw[0]),
            Self::Float => FieldValue::Float(f32::from_le_bytes(array(raw))),
            Self::Double => FieldValue::Double(f64::from_le_bytes(array(raw))),
        };
        Ok(value)
    }
}

fn array<const N: usize>(raw: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&raw[..N]);
    out
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Int32(i32),
    UInt32(u32),
    UInt8(u8),
    Float(f32),
    Double(f64),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Text(_) => FieldKind::String,
            Self::Int32(_) => FieldKind::Int32,
            Self::UInt32(_) => FieldKind::UInt32,
            Self::UInt8(_) => FieldKind::UInt8,
            Self::Float(_) => FieldKind::Float,
            Self::Double(_) => FieldKind::Double,
        }
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Handle to the application-owned memory behind a field.
#[derive(Debug, Clone)]
pub enum FieldStorage {
    Text(Shared<FixedBuf>),
    Int32(Shared<i32>),
    UInt32(Shared<u32>),
    UInt8(Shared<u8>),
    Float(Shared<f32>),
    Double(Shared<f64>),
}

impl FieldStorage {
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Text(_) => FieldKind::String,
            Self::Int32(_) => FieldKind::Int32,
            Self::UInt32(_) => FieldKind::UInt32,
            Self::UInt8(_) => FieldKind::UInt8,
            Self::Float(_) => FieldKind::Float,
            Self::Double(_) => FieldKind::Double,
        }
    }
}

// ---------------------------------------------------------------------------
// TypedField
// ---------------------------------------------------------------------------

/// A named, typed view onto application-owned storage.
#[derive(Debug, Clone)]
pub struct TypedField {
    name: &'static str,
    storage: FieldStorage,
    count: u8,
}

impl TypedField {
    pub fn new(name: &'static str, storage: FieldStorage) -> Self {
        Self {
            name,
            storage,
            count: 1,
        }
    }

    pub fn text(name: &'static str, storage: &Shared<FixedBuf>) -> Self {
        Self::new(name, FieldStorage::Text(storage.clone()))
    }

    pub fn int32(name: &'static str, storage: &Shared<i32>) -> Self {
        Self::new(name, FieldStorage::Int32(storage.clone()))
    }

    pub fn uint32(name: &'static str, storage: &Shared<u32>) -> Self {
        Self::new(name, FieldStorage::UInt32(storage.clone()))
    }

    pub fn uint8(name: &'static str, storage: &Shared<u8>) -> Self {
        Self::new(name, FieldStorage::UInt8(storage.clone()))
    }

    pub fn float(name: &'static str, storage: &Shared<f32>) -> Self {
        Self::new(name, FieldStorage::Float(storage.clone()))
    }

    pub fn double(name: &'static str, storage: &Shared<f64>) -> Self {
        Self::new(name, FieldStorage::Double(storage.clone()))
    }

    /// Element count reported alongside the value.
    pub fn with_count(mut self, count: u8) -> Self {
        self.count = count.max(1);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.storage.kind()
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    pub fn storage(&self) -> &FieldStorage {
        &self.storage
    }

    /// Byte capacity of text storage, `None` for scalars.
    pub fn capacity(&self) -> Option<usize> {
        match &self.storage {
            FieldStorage::Text(buf) => Some(buf.with(FixedBuf::capacity)),
            _ => None,
        }
    }

    /// Snapshot the current value.
    pub fn read(&self) -> FieldValue {
        match &self.storage {
            FieldStorage::Text(b) => FieldValue::Text(b.with(|b| b.text().into_owned())),
            FieldStorage::Int32(c) => FieldValue::Int32(c.get()),
            FieldStorage::UInt32(c) => FieldValue::UInt32(c.get()),
            FieldStorage::UInt8(c) => FieldValue::UInt8(c.get()),
            FieldStorage::Float(c) => FieldValue::Float(c.get()),
            FieldStorage::Double(c) => FieldValue::Double(c.get()),
        }
    }

    /// Check-and-store a scalar under one lock acquisition.
    ///
    /// `check` sees `(candidate, current)`; the write only happens when it
    /// accepts, so a rejection never leaves a partial value behind.
    pub fn update_scalar(
        &self,
        candidate: &FieldValue,
        check: impl FnOnce(&FieldValue, &FieldValue) -> Result<(), ParamError>,
    ) -> Result<(), ParamError> {
        match (&self.storage, candidate) {
            (FieldStorage::Int32(c), FieldValue::Int32(v)) => c.with_mut(|cur| {
                check(candidate, &FieldValue::Int32(*cur))?;
                *cur = *v;
                Ok(())
            }),
            (FieldStorage::UInt32(c), FieldValue::UInt32(v)) => c.with_mut(|cur| {
                check(candidate, &FieldValue::UInt32(*cur))?;
                *cur = *v;
                Ok(())
            }),
            (FieldStorage::UInt8(c), FieldValue::UInt8(v)) => c.with_mut(|cur| {
                check(candidate, &FieldValue::UInt8(*cur))?;
                *cur = *v;
                Ok(())
            }),
            (FieldStorage::Float(c), FieldValue::Float(v)) => c.with_mut(|cur| {
                check(candidate, &FieldValue::Float(*cur))?;
                *cur = *v;
                Ok(())
            }),
            (FieldStorage::Double(c), FieldValue::Double(v)) => c.with_mut(|cur| {
                check(candidate, &FieldValue::Double(*cur))?;
                *cur = *v;
                Ok(())
            }),
            _ => Err(ParamError::LengthInvalid),
        }
    }
}

// ---------------------------------------------------------------------------
// FieldSet
// ---------------------------------------------------------------------------

/// One field's value at publish time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedValue {
    pub name: &'static str,
    pub value: FieldValue,
    /// Element count, omitted from the report when 1.
    #[serde(skip_serializing_if = "is_single")]
    pub count: u8,
}

fn is_single(count: &u8) -> bool {
    *count == 1
}

/// Ordered collection of fields published together.
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    fields: Vec<TypedField>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append.
    pub fn with(mut self, field: TypedField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn push(&mut self, field: TypedField) {
        self.fields.push(field);
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypedField> {
        self.fields.iter()
    }

    pub fn get(&self, name: &str) -> Option<&TypedField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Read every field, in registration order.
    pub fn snapshot(&self) -> Vec<NamedValue> {
        self.fields
            .iter()
            .map(|f| NamedValue {
                name: f.name,
                value: f.read(),
                count: f.count(),
            })
            .collect()
    }
}
