//! Typed data arrays with identity keys.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::DataType;

/// Identity of one wholesale payload.
///
/// A new key is generated every time a payload is replaced as a whole; in-place
/// edits keep it. Drivers cache the key they last uploaded to tell "these bytes
/// were replaced" apart from "these bytes were edited".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataKey(u64);

impl DataKey {
    /// Generate a key never handed out before.
    pub fn unique() -> Self {
        static NEXT_KEY: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

/// A typed, fixed-length array of elements, optionally without backing bytes.
///
/// Data without bytes still has a length and type: drivers allocate device
/// storage for it but never upload anything.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferData {
    key: DataKey,
    data_type: DataType,
    len: usize,
    bytes: Option<Vec<u8>>,
}

impl BufferData {
    /// Storage for `len` elements of `data_type` with no contents.
    pub fn empty(data_type: DataType, len: usize) -> Self {
        Self {
            key: DataKey::unique(),
            data_type,
            len,
            bytes: None,
        }
    }

    /// Wrap raw bytes as elements of `data_type`.
    ///
    /// Trailing bytes that do not form a whole element are dropped.
    pub fn from_bytes(data_type: DataType, mut bytes: Vec<u8>) -> Self {
        let len = bytes.len() / data_type.byte_size();
        bytes.truncate(len * data_type.byte_size());
        Self {
            key: DataKey::unique(),
            data_type,
            len,
            bytes: Some(bytes),
        }
    }

    pub fn from_f32(values: &[f32]) -> Self {
        Self::from_bytes(DataType::Float, bytemuck::cast_slice(values).to_vec())
    }

    pub fn from_u8(values: &[u8]) -> Self {
        Self::from_bytes(DataType::UnsignedByte, values.to_vec())
    }

    pub fn from_u16(values: &[u16]) -> Self {
        Self::from_bytes(DataType::UnsignedShort, bytemuck::cast_slice(values).to_vec())
    }

    pub fn from_u32(values: &[u32]) -> Self {
        Self::from_bytes(DataType::UnsignedInt, bytemuck::cast_slice(values).to_vec())
    }

    /// Identity of this payload.
    pub fn key(&self) -> DataKey {
        self.key
    }

    /// Element type.
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the array in bytes.
    pub fn byte_len(&self) -> usize {
        self.len * self.data_type.byte_size()
    }

    /// Backing bytes, if any.
    pub fn bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    pub(crate) fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        self.bytes.as_deref_mut()
    }

    /// Bytes of the elements in `[offset, offset + len)`, clamped to the array.
    pub fn element_bytes(&self, offset: usize, len: usize) -> Option<&[u8]> {
        let (start, end) = self.clamped_byte_range(offset, len);
        self.bytes.as_deref().map(|bytes| &bytes[start..end])
    }

    pub(crate) fn clamped_byte_range(&self, offset: usize, len: usize) -> (usize, usize) {
        let size = self.data_type.byte_size();
        let offset = offset.min(self.len);
        let end = offset.saturating_add(len).min(self.len);
        (offset * size, end * size)
    }
}
