//! BIG stream writer.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::ops::Deref;
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use tracing::debug;

use super::codec::*;
use super::constants::*;
use crate::core::Container;
use crate::util::{DataOrder, DataType, Element, Error, Result};

/// Sequential byte sink for a BIG stream.
pub struct OStream<W: Write = BufWriter<File>> {
    writer: W,
    pos: u64,
}

impl OStream<BufWriter<File>> {
    /// Create a new output stream for the given file path.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        Ok(Self::new(BufWriter::with_capacity(2 * 1024 * 1024, file))) // 2MB buffer
    }
}

impl<W: Write> OStream<W> {
    /// Wrap any writer.
    pub fn new(writer: W) -> Self {
        Self { writer, pos: 0 }
    }

    /// Get the current write position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Write bytes and advance position.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    /// Write a u64 value (little-endian).
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_u64::<LittleEndian>(value)?;
        self.pos += 8;
        Ok(())
    }

    /// Write the magic signature.
    pub fn write_magic(&mut self) -> Result<()> {
        self.write_bytes(&MAGIC)
    }

    /// Write a chunk header; the payload follows with `write_bytes`.
    pub fn write_chunk_header(&mut self, id: u64, length: u64) -> Result<()> {
        ChunkHeader { id, length }.write(&mut self.writer)?;
        self.pos += CHUNK_HEADER_SIZE as u64;
        Ok(())
    }

    /// Write a complete chunk.
    pub fn write_chunk(&mut self, id: u64, payload: &[u8]) -> Result<()> {
        self.write_chunk_header(id, payload.len() as u64)?;
        self.write_bytes(payload)
    }

    /// Flush buffered bytes.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and return the inner writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// BIG container writer.
///
/// Shape, order and types may only change while the container is empty.
/// Image data is loaded from caller buffers and written out with
/// [`write_to`](Self::write_to) once every image is resident.
#[derive(Debug, Default)]
pub struct OContainer {
    container: Container,
}

impl OContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with the given memory ceiling.
    pub fn with_memory_size(bytes: usize) -> Self {
        Self { container: Container::with_memory_size(bytes) }
    }

    /// The query surface.
    #[inline]
    pub fn container(&self) -> &Container {
        &self.container
    }

    // ========================================================================
    // Shape, order and type
    // ========================================================================

    pub fn set_number_of_images(&mut self, value: u64) -> Result<()> {
        self.container.registry_mut()?.set_number_of_images(value)
    }

    pub fn set_number_of_tiles(&mut self, value: u64) -> Result<()> {
        self.container.registry_mut()?.set_number_of_tiles(value)
    }

    pub fn set_image_height(&mut self, value: u64) -> Result<()> {
        self.container.registry_mut()?.set_image_height(value)
    }

    pub fn set_image_width(&mut self, value: u64) -> Result<()> {
        self.container.registry_mut()?.set_image_width(value)
    }

    pub fn set_number_of_planes(&mut self, value: u64) -> Result<()> {
        self.container.registry_mut()?.set_number_of_planes(value)
    }

    pub fn set_data_order(&mut self, order: DataOrder) -> Result<()> {
        self.container.registry_mut()?.set_data_order(order);
        Ok(())
    }

    /// Assign one type to all images, or one type per image.
    pub fn set_data_type(&mut self, types: &[DataType]) -> Result<()> {
        self.container.registry_mut()?.set_data_types(types.to_vec())
    }

    /// Assign types by wire identifier.
    pub fn set_data_type_ids(&mut self, ids: &[u64]) -> Result<()> {
        self.container.registry_mut()?.set_data_type_ids(ids)
    }

    // ========================================================================
    // Data
    // ========================================================================

    /// Copy raw bytes for image `index` into the container.
    /// Returns `false` if the image was already resident.
    pub fn load_image(&mut self, index: u64, bytes: &[u8]) -> Result<bool> {
        self.container.load_image_from(index, bytes)
    }

    /// Copy typed samples for image `index` into the container.
    pub fn write_image<T: Element>(&mut self, index: u64, samples: &[T]) -> Result<bool> {
        self.container.check_index(index)?;
        let expected = self
            .container
            .registry()
            .type_for_image(index)
            .ok_or_else(|| Error::invalid_state(format!("image {} has no data type", index)))?;
        if expected != T::DATA_TYPE {
            return Err(Error::TypeMismatch {
                expected: expected.to_string(),
                actual: T::DATA_TYPE.to_string(),
            });
        }
        self.load_image(index, bytemuck::cast_slice(samples))
    }

    /// Drop image `index` from memory. Returns `false` if it was not resident.
    pub fn release_image(&mut self, index: u64) -> bool {
        self.container.release_image(index)
    }

    /// Free all resident data and start over from a default dataset.
    pub fn clear(&mut self) {
        self.container.clear();
    }

    pub fn set_memory_size(&mut self, bytes: usize) {
        self.container.set_memory_size(bytes);
    }

    pub fn reset_memory_size(&mut self) {
        self.container.reset_memory_size();
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Write the full container: magic, metadata chunks, then DATA.
    pub fn write_to<W: Write>(&self, out: &mut OStream<W>) -> Result<()> {
        let c = &self.container;
        c.registry().validate()?;
        if !c.is_in_memory() {
            return Err(Error::invalid_state(format!(
                "{} of {} bytes resident; every image must be loaded before writing",
                c.size_in_memory(),
                c.size()
            )));
        }

        out.write_magic()?;
        for id in ChunkId::METADATA {
            let payload = match id {
                ChunkId::NumberOfImages => c.number_of_images().to_le_bytes().to_vec(),
                ChunkId::NumberOfTiles => c.number_of_tiles().to_le_bytes().to_vec(),
                ChunkId::ImageHeight => c.image_height().to_le_bytes().to_vec(),
                ChunkId::ImageWidth => c.image_width().to_le_bytes().to_vec(),
                ChunkId::NumberOfPlanes => c.number_of_planes().to_le_bytes().to_vec(),
                ChunkId::DataOrder => encode_u64_seq(&c.data_order().ids()),
                ChunkId::DataType => {
                    let ids: Vec<u64> = c.data_type().iter().map(|t| t.id()).collect();
                    encode_u64_seq(&ids)
                }
                ChunkId::Data => continue,
            };
            out.write_chunk(id.id(), &payload)?;
        }

        out.write_chunk_header(ChunkId::Data.id(), c.size() as u64)?;
        for index in c.outermost_entities_offsets() {
            if let Some(bytes) = c.image_data(*index) {
                out.write_bytes(bytes)?;
            }
        }
        out.flush()?;
        debug!("wrote BIG container: {}, {} bytes", c.shape(), out.pos());
        Ok(())
    }

    /// Write the container to a file.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut out = OStream::create(path)?;
        self.write_to(&mut out)
    }

    /// Encode the container into a byte vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = OStream::new(Vec::with_capacity(self.container.size() + 256));
        self.write_to(&mut out)?;
        out.into_inner()
    }
}

impl Deref for OContainer {
    type Target = Container;

    fn deref(&self) -> &Container {
        &self.container
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{ChunkIter, IContainer};

    fn writer(images: u64) -> OContainer {
        let mut w = OContainer::new();
        w.set_number_of_images(images).unwrap();
        w.set_image_width(2).unwrap();
        w.set_image_height(1).unwrap();
        w
    }

    #[test]
    fn test_ostream_positions() -> Result<()> {
        let mut out = OStream::new(Vec::new());
        out.write_magic()?;
        out.write_chunk(3, &5u64.to_le_bytes())?;
        out.write_u64(9)?;
        assert_eq!(out.pos(), 8 + 16 + 8 + 8);
        let bytes = out.into_inner()?;
        assert_eq!(bytes.len(), 40);
        assert_eq!(&bytes[..8], &MAGIC);
        Ok(())
    }

    #[test]
    fn test_chunk_layout() -> Result<()> {
        let mut w = writer(1);
        w.write_image(0, &[1.0f32, 2.0])?;
        let bytes = w.to_bytes()?;

        let chunks = ChunkIter::new(&bytes)?.collect::<Result<Vec<_>>>()?;
        let ids: Vec<u64> = chunks.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(decode_u64(chunks[3].payload)?, 2);
        assert_eq!(decode_u64_seq(chunks[5].payload)?, vec![1, 2, 3, 4, 5]);
        assert_eq!(decode_u64_seq(chunks[6].payload)?, vec![2]);
        assert_eq!(chunks[7].payload.len(), 8);
        Ok(())
    }

    #[test]
    fn test_write_requires_all_images() -> Result<()> {
        let mut w = writer(2);
        w.write_image(1, &[0.5f32, 0.25])?;
        assert!(matches!(w.to_bytes(), Err(Error::InvalidState(_))));
        w.write_image(0, &[0.0f32, 0.0])?;
        assert!(w.to_bytes().is_ok());
        Ok(())
    }

    #[test]
    fn test_write_rejects_inconsistent_types() {
        let mut w = writer(3);
        w.set_data_type(&[DataType::Float, DataType::Int]).unwrap();
        assert!(matches!(w.to_bytes(), Err(Error::InvalidTypeAssignment { .. })));
    }

    #[test]
    fn test_write_image_type_checked() {
        let mut w = writer(1);
        assert!(matches!(w.write_image(0, &[1u8, 2]), Err(Error::TypeMismatch { .. })));
        assert!(w.is_empty());
    }

    #[test]
    fn test_setters_locked_after_load() -> Result<()> {
        let mut w = writer(1);
        w.write_image(0, &[1.0f32, 2.0])?;
        assert!(matches!(w.set_image_width(3), Err(Error::InvalidState(_))));
        assert!(matches!(w.set_data_order(DataOrder::default()), Err(Error::InvalidState(_))));
        assert!(matches!(w.set_data_type(&[DataType::Int]), Err(Error::InvalidState(_))));
        w.clear();
        w.set_image_width(3)?;
        assert_eq!(w.image_width(), 3);
        Ok(())
    }

    #[test]
    fn test_roundtrip_mixed_types() -> Result<()> {
        let mut w = writer(2);
        w.set_data_type(&[DataType::UnsignedChar, DataType::Double])?;
        w.write_image(0, &[7u8, 9])?;
        w.write_image(1, &[1.25f64, -3.5])?;

        let mut r = IContainer::from_bytes(w.to_bytes()?)?;
        assert!(!r.is_uniform_data_type());
        assert_eq!(r.size(), 2 + 16);
        r.load_all()?;
        assert_eq!(r.read_image::<u8>(0)?, vec![7, 9]);
        assert_eq!(r.read_image::<f64>(1)?, vec![1.25, -3.5]);
        Ok(())
    }
}
