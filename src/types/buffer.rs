//! Element types and storage modes.

use std::fmt;

/// Primitive type of the elements stored in a data array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    #[default]
    Float,
    UnsignedByte,
    UnsignedShort,
    UnsignedInt,
}

impl DataType {
    /// Size of one element in bytes.
    pub fn byte_size(&self) -> usize {
        match self {
            Self::UnsignedByte => 1,
            Self::UnsignedShort => 2,
            Self::Float | Self::UnsignedInt => 4,
        }
    }

    /// Returns true for the integer types usable as vertex indices.
    pub fn is_index_type(&self) -> bool {
        !matches!(self, Self::Float)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Float => "FLOAT",
            Self::UnsignedByte => "UNSIGNED_BYTE",
            Self::UnsignedShort => "UNSIGNED_SHORT",
            Self::UnsignedInt => "UNSIGNED_INT",
        };
        f.write_str(name)
    }
}

/// Where the data of a vertex buffer lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StorageMode {
    /// Host memory only, read by the device at draw time.
    InMemory,
    /// Device-resident, rarely updated.
    #[default]
    GpuStatic,
    /// Device-resident with a host mirror for frequent partial updates.
    GpuDynamic,
}

impl StorageMode {
    /// Returns true if the data lives in a device buffer object.
    pub fn is_gpu(&self) -> bool {
        matches!(self, Self::GpuStatic | Self::GpuDynamic)
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InMemory => "IN_MEMORY",
            Self::GpuStatic => "GPU_STATIC",
            Self::GpuDynamic => "GPU_DYNAMIC",
        };
        f.write_str(name)
    }
}

/// Device binding point a buffer is written through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute data.
    Array,
    /// Vertex index data.
    Element,
}

impl BufferTarget {
    /// The target used for data of the given type.
    pub fn for_data_type(data_type: DataType) -> Self {
        if data_type.is_index_type() {
            Self::Element
        } else {
            Self::Array
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_sizes() {
        assert_eq!(DataType::UnsignedByte.byte_size(), 1);
        assert_eq!(DataType::UnsignedShort.byte_size(), 2);
        assert_eq!(DataType::Float.byte_size(), 4);
    }

    #[test]
    fn test_targets() {
        assert_eq!(BufferTarget::for_data_type(DataType::Float), BufferTarget::Array);
        assert_eq!(
            BufferTarget::for_data_type(DataType::UnsignedShort),
            BufferTarget::Element
        );
    }

    #[test]
    fn test_storage_mode() {
        assert!(StorageMode::GpuDynamic.is_gpu());
        assert!(!StorageMode::InMemory.is_gpu());
        assert_eq!(StorageMode::InMemory.to_string(), "IN_MEMORY");
    }
}
