//! Chunk framing: `identifier (u64 LE) | length (u64 LE) | payload`.
//!
//! These functions are pure transforms over byte slices. The stream reader
//! uses [`ChunkHeader`] directly so that large payloads never have to be
//! pulled into memory just to be skipped.

use std::io::Write;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use super::constants::*;
use crate::util::{Error, Result};

/// Identifier and payload length of one chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id: u64,
    pub length: u64,
}

impl ChunkHeader {
    /// Parse a header from the first [`CHUNK_HEADER_SIZE`] bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < CHUNK_HEADER_SIZE {
            return Err(Error::corrupt(format!(
                "truncated chunk header: {} of {} bytes",
                bytes.len(),
                CHUNK_HEADER_SIZE
            )));
        }
        Ok(Self {
            id: LittleEndian::read_u64(&bytes[0..CHUNK_LENGTH]),
            length: LittleEndian::read_u64(&bytes[CHUNK_LENGTH..CHUNK_HEADER_SIZE]),
        })
    }

    /// Core chunk kind, or `None` for identifiers the core does not know.
    #[inline]
    pub fn kind(&self) -> Option<ChunkId> {
        ChunkId::from_id(self.id)
    }

    /// Write the header.
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u64::<LittleEndian>(self.id)?;
        w.write_u64::<LittleEndian>(self.length)?;
        Ok(())
    }
}

/// A decoded chunk borrowing its payload from the input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub id: u64,
    pub payload: &'a [u8],
}

impl<'a> Chunk<'a> {
    #[inline]
    pub fn kind(&self) -> Option<ChunkId> {
        ChunkId::from_id(self.id)
    }

    #[inline]
    pub fn length(&self) -> u64 {
        self.payload.len() as u64
    }
}

/// Validate the leading magic signature.
pub fn decode_header(bytes: &[u8]) -> Result<()> {
    if bytes.len() < CHUNK_LENGTH {
        return Err(Error::corrupt(format!(
            "stream too short for magic: {} bytes",
            bytes.len()
        )));
    }
    if bytes[..CHUNK_LENGTH] != MAGIC {
        return Err(Error::corrupt("invalid magic signature"));
    }
    Ok(())
}

/// Decode one chunk starting at `offset`.
///
/// Returns the chunk and the number of bytes consumed. Unknown identifiers
/// are returned as-is; skipping them is the caller's decision.
pub fn decode_chunk(bytes: &[u8], offset: usize) -> Result<(Chunk<'_>, usize)> {
    let rest = bytes.get(offset..).unwrap_or(&[]);
    let header = ChunkHeader::parse(rest)?;
    let available = (rest.len() - CHUNK_HEADER_SIZE) as u64;
    if header.length > available {
        return Err(Error::corrupt(format!(
            "chunk {} at offset {} declares {} bytes, {} remain",
            header.id, offset, header.length, available
        )));
    }
    let end = CHUNK_HEADER_SIZE + header.length as usize;
    let chunk = Chunk {
        id: header.id,
        payload: &rest[CHUNK_HEADER_SIZE..end],
    };
    Ok((chunk, end))
}

/// Encode one chunk.
pub fn encode_chunk(id: u64, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(CHUNK_HEADER_SIZE + payload.len());
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

/// Iterator over the chunks following the magic signature.
pub struct ChunkIter<'a> {
    bytes: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> ChunkIter<'a> {
    /// Validate the magic and iterate the remaining chunks.
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        decode_header(bytes)?;
        Ok(Self { bytes, pos: CHUNK_LENGTH, failed: false })
    }

    /// Current byte offset.
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = Result<Chunk<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.bytes.len() {
            return None;
        }
        match decode_chunk(self.bytes, self.pos) {
            Ok((chunk, used)) => {
                self.pos += used;
                Some(Ok(chunk))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

// ============================================================================
// Payload helpers
// ============================================================================

/// Decode a payload holding exactly one u64.
pub fn decode_u64(payload: &[u8]) -> Result<u64> {
    if payload.len() != 8 {
        return Err(Error::corrupt(format!(
            "scalar chunk payload must be 8 bytes, got {}",
            payload.len()
        )));
    }
    Ok(LittleEndian::read_u64(payload))
}

/// Decode a payload holding a non-empty sequence of u64.
pub fn decode_u64_seq(payload: &[u8]) -> Result<Vec<u64>> {
    if payload.is_empty() || payload.len() % 8 != 0 {
        return Err(Error::corrupt(format!(
            "sequence chunk payload must be a non-zero multiple of 8 bytes, got {}",
            payload.len()
        )));
    }
    let mut values = vec![0u64; payload.len() / 8];
    LittleEndian::read_u64_into(payload, &mut values);
    Ok(values)
}

/// Encode a sequence of u64 as a payload.
pub fn encode_u64_seq(values: &[u64]) -> Vec<u8> {
    let mut out = vec![0u8; values.len() * 8];
    LittleEndian::write_u64_into(values, &mut out);
    out
}
