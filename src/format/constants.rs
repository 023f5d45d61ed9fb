//! BIG format constants and chunk identifiers.

/// Width of the magic signature and of each chunk header field.
pub const CHUNK_LENGTH: usize = 8;

/// Magic bytes at the start of every BIG stream.
pub const MAGIC: [u8; CHUNK_LENGTH] = [0x42, 0x49, 0x47, 0x00, 0x00, 0x00, 0x00, 0x00];

/// Size of a chunk header (identifier + length).
pub const CHUNK_HEADER_SIZE: usize = 2 * CHUNK_LENGTH;

/// Default memory ceiling for resident data (1 GiB).
pub const DEFAULT_MEMORY_SIZE: usize = 1024 * 1024 * 1024;

/// Identifiers of the chunks understood by the core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u64)]
pub enum ChunkId {
    NumberOfImages = 1,
    NumberOfTiles = 2,
    ImageHeight = 3,
    ImageWidth = 4,
    NumberOfPlanes = 5,
    DataOrder = 6,
    DataType = 7,
    Data = 8,
}

impl ChunkId {
    /// Metadata chunks in the order the writer emits them.
    pub const METADATA: [ChunkId; 7] = [
        Self::NumberOfImages,
        Self::NumberOfTiles,
        Self::ImageHeight,
        Self::ImageWidth,
        Self::NumberOfPlanes,
        Self::DataOrder,
        Self::DataType,
    ];

    /// Wire identifier of this chunk.
    #[inline]
    pub const fn id(self) -> u64 {
        self as u64
    }

    /// Look up a core chunk by identifier. Unknown identifiers yield `None`.
    pub const fn from_id(id: u64) -> Option<Self> {
        match id {
            1 => Some(Self::NumberOfImages),
            2 => Some(Self::NumberOfTiles),
            3 => Some(Self::ImageHeight),
            4 => Some(Self::ImageWidth),
            5 => Some(Self::NumberOfPlanes),
            6 => Some(Self::DataOrder),
            7 => Some(Self::DataType),
            8 => Some(Self::Data),
            _ => None,
        }
    }

    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NumberOfImages => "NUMBER_OF_IMAGES",
            Self::NumberOfTiles => "NUMBER_OF_TILES",
            Self::ImageHeight => "IMAGE_HEIGHT",
            Self::ImageWidth => "IMAGE_WIDTH",
            Self::NumberOfPlanes => "NUMBER_OF_PLANES",
            Self::DataOrder => "DATA_ORDER",
            Self::DataType => "DATA_TYPE",
            Self::Data => "DATA",
        }
    }

    /// True for the five chunks carrying a single u64.
    #[inline]
    pub const fn is_scalar(self) -> bool {
        matches!(
            self,
            Self::NumberOfImages
                | Self::NumberOfTiles
                | Self::ImageHeight
                | Self::ImageWidth
                | Self::NumberOfPlanes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic() {
        assert_eq!(&MAGIC[0..3], b"BIG");
        assert_eq!(MAGIC.len(), CHUNK_LENGTH);
        assert_eq!(CHUNK_HEADER_SIZE, 16);
    }

    #[test]
    fn test_chunk_ids() {
        for id in 1..=8u64 {
            assert_eq!(ChunkId::from_id(id).map(ChunkId::id), Some(id));
        }
        assert_eq!(ChunkId::from_id(0), None);
        assert_eq!(ChunkId::from_id(9), None);
        assert!(ChunkId::ImageWidth.is_scalar());
        assert!(!ChunkId::DataOrder.is_scalar());
        assert!(!ChunkId::Data.is_scalar());
    }
}
