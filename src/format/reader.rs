//! BIG stream reader.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Deref;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use memmap2::Mmap;
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use super::codec::*;
use super::constants::*;
use crate::core::{Container, Registry};
use crate::util::{DataOrder, Error, Result};

/// Options for opening a BIG file.
#[derive(Clone, Debug)]
pub struct ReadOptions {
    /// Memory-map the file instead of using buffered reads.
    pub use_mmap: bool,
    /// Ceiling for resident image data.
    pub memory_size: usize,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn memory_size(mut self, bytes: usize) -> Self {
        self.memory_size = bytes;
        self
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            use_mmap: cfg!(feature = "mmap"),
            memory_size: DEFAULT_MEMORY_SIZE,
        }
    }
}

/// Random-access byte source for a BIG stream.
pub struct IStreams {
    inner: StreamsInner,
    size: u64,
}

enum StreamsInner {
    /// Memory-mapped file (preferred for large files)
    Mmap(Mmap),
    /// Buffered file access (fallback)
    File(RwLock<File>),
    /// Bytes already in memory
    Memory(Vec<u8>),
}

impl IStreams {
    /// Open a file for reading with memory mapping.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_opts(path, true)
    }

    /// Open a file with optional memory mapping.
    pub fn open_opts(path: impl AsRef<Path>, use_mmap: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        let size = file.metadata()?.len();

        let inner = if use_mmap && size > 0 {
            // Safety: the map is read-only; concurrent truncation of the file
            // by another process is outside what this reader guards against.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
            StreamsInner::Mmap(mmap)
        } else {
            StreamsInner::File(RwLock::new(file))
        };

        Ok(Self { inner, size })
    }

    /// Wrap bytes already in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let size = bytes.len() as u64;
        Self { inner: StreamsInner::Memory(bytes), size }
    }

    /// Total stream size.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn is_mmap(&self) -> bool {
        matches!(self.inner, StreamsInner::Mmap(_))
    }

    fn check_range(&self, pos: u64, len: usize) -> Result<()> {
        match pos.checked_add(len as u64) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(Error::corrupt(format!(
                "read of {} bytes at {} past end of stream ({} bytes)",
                len, pos, self.size
            ))),
        }
    }

    /// Read bytes into an existing buffer.
    pub fn read_into(&self, pos: u64, buf: &mut [u8]) -> Result<()> {
        self.check_range(pos, buf.len())?;
        let start = pos as usize;

        match &self.inner {
            StreamsInner::Mmap(mmap) => {
                buf.copy_from_slice(&mmap[start..start + buf.len()]);
                Ok(())
            }
            StreamsInner::Memory(bytes) => {
                buf.copy_from_slice(&bytes[start..start + buf.len()]);
                Ok(())
            }
            StreamsInner::File(file) => {
                let mut f = file.write();
                f.seek(SeekFrom::Start(pos))?;
                f.read_exact(buf)?;
                Ok(())
            }
        }
    }

    /// Read bytes at a specific position.
    pub fn read_bytes(&self, pos: u64, len: usize) -> Result<Vec<u8>> {
        self.check_range(pos, len)?;
        let mut buf = vec![0u8; len];
        self.read_into(pos, &mut buf)?;
        Ok(buf)
    }

    /// Read a u64 value at the given position.
    pub fn read_u64(&self, pos: u64) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_into(pos, &mut buf)?;
        Ok(LittleEndian::read_u64(&buf))
    }

    /// Read the chunk header at `pos`.
    pub fn read_chunk_header(&self, pos: u64) -> Result<ChunkHeader> {
        let mut buf = [0u8; CHUNK_HEADER_SIZE];
        self.read_into(pos, &mut buf)?;
        ChunkHeader::parse(&buf)
    }
}

/// Location of a chunk within the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkInfo {
    pub id: u64,
    /// Position of the payload (after the chunk header).
    pub pos: u64,
    pub length: u64,
}

/// BIG container reader.
///
/// Shape, order and type come from the stream and are read-only; image
/// data is paged in on request under the memory ceiling.
pub struct IContainer {
    streams: IStreams,
    container: Container,
    /// Metadata as read from the stream, restored after `clear`.
    metadata: Registry,
    data: Option<ChunkInfo>,
    unknown: Vec<ChunkInfo>,
}

impl IContainer {
    /// Open a BIG file for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_opts(path, &ReadOptions::default())
    }

    /// Open a BIG file with explicit options.
    pub fn open_opts(path: impl AsRef<Path>, opts: &ReadOptions) -> Result<Self> {
        let path = path.as_ref();
        debug!("opening {} (mmap: {})", path.display(), opts.use_mmap);
        let streams = IStreams::open_opts(path, opts.use_mmap)?;
        Self::from_streams(streams, opts)
    }

    /// Read a BIG stream held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_streams(IStreams::from_bytes(bytes), &ReadOptions::default())
    }

    /// Read a BIG stream from an opened source.
    pub fn from_streams(streams: IStreams, opts: &ReadOptions) -> Result<Self> {
        let mut reader = Self {
            streams,
            container: Container::with_memory_size(opts.memory_size),
            metadata: Registry::new(),
            data: None,
            unknown: Vec::new(),
        };
        reader.read_directory()?;
        Ok(reader)
    }

    /// Walk every chunk, populating the registry and remembering where the
    /// data payload lives. No payload larger than a metadata sequence is read.
    fn read_directory(&mut self) -> Result<()> {
        let mut magic = [0u8; CHUNK_LENGTH];
        if self.streams.size() < CHUNK_LENGTH as u64 {
            return Err(Error::corrupt(format!(
                "stream too short for magic: {} bytes",
                self.streams.size()
            )));
        }
        self.streams.read_into(0, &mut magic)?;
        decode_header(&magic)?;

        let mut seen: Vec<ChunkId> = Vec::new();
        let mut pos = CHUNK_LENGTH as u64;
        let end = self.streams.size();

        while pos < end {
            let header = self.streams.read_chunk_header(pos)?;
            let payload_pos = pos + CHUNK_HEADER_SIZE as u64;
            let remaining = end - payload_pos;
            if header.length > remaining {
                return Err(Error::corrupt(format!(
                    "chunk {} at {} declares {} bytes, {} remain",
                    header.id, pos, header.length, remaining
                )));
            }
            let info = ChunkInfo { id: header.id, pos: payload_pos, length: header.length };

            match header.kind() {
                Some(kind) => {
                    if seen.contains(&kind) {
                        return Err(Error::corrupt(format!("duplicate {} chunk", kind.name())));
                    }
                    seen.push(kind);
                    trace!("chunk {} at {} ({} bytes)", kind.name(), pos, header.length);
                    self.apply_chunk(kind, info)?;
                }
                None => {
                    warn!("skipping unknown chunk {} at {} ({} bytes)", header.id, pos, header.length);
                    self.unknown.push(info);
                }
            }
            pos = payload_pos + header.length;
        }

        self.container.registry().validate().map_err(|e| match e {
            Error::InvalidTypeAssignment { .. } => Error::corrupt(e.to_string()),
            other => other,
        })?;

        let expected = self.container.size();
        match self.data {
            Some(info) if info.length != expected as u64 => {
                return Err(Error::corrupt(format!(
                    "DATA chunk holds {} bytes, dataset size is {}",
                    info.length, expected
                )));
            }
            None if expected > 0 => {
                return Err(Error::corrupt(format!(
                    "missing DATA chunk for a dataset of {} bytes",
                    expected
                )));
            }
            _ => {}
        }

        self.metadata = self.container.registry().clone();
        debug!(
            "read BIG container: {}, order {}, {} bytes of data",
            self.container.shape(),
            self.container.data_order(),
            expected
        );
        Ok(())
    }

    fn apply_chunk(&mut self, kind: ChunkId, info: ChunkInfo) -> Result<()> {
        if kind == ChunkId::Data {
            self.data = Some(info);
            return Ok(());
        }

        if kind.is_scalar() && info.length != CHUNK_LENGTH as u64 {
            return Err(Error::corrupt(format!(
                "{} chunk payload must be {} bytes, got {}",
                kind.name(),
                CHUNK_LENGTH,
                info.length
            )));
        }
        if !kind.is_scalar() && (info.length == 0 || info.length % CHUNK_LENGTH as u64 != 0) {
            return Err(Error::corrupt(format!(
                "{} chunk payload must be a non-zero multiple of {} bytes, got {}",
                kind.name(),
                CHUNK_LENGTH,
                info.length
            )));
        }
        let payload = self.streams.read_bytes(info.pos, info.length as usize)?;
        let registry = self.container.registry_mut()?;
        let shape_err = |e: Error| match e {
            Error::InvalidShape(msg) => Error::corrupt(msg),
            other => other,
        };
        let result = match kind {
            ChunkId::NumberOfImages => registry.set_number_of_images(decode_u64(&payload)?),
            ChunkId::NumberOfTiles => registry.set_number_of_tiles(decode_u64(&payload)?),
            ChunkId::ImageHeight => registry.set_image_height(decode_u64(&payload)?),
            ChunkId::ImageWidth => registry.set_image_width(decode_u64(&payload)?),
            ChunkId::NumberOfPlanes => registry.set_number_of_planes(decode_u64(&payload)?),
            ChunkId::DataOrder => {
                let ids = decode_u64_seq(&payload)?;
                let order = DataOrder::from_ids(&ids).map_err(|e| Error::corrupt(e.to_string()))?;
                registry.set_data_order(order);
                Ok(())
            }
            ChunkId::DataType => registry.set_data_type_ids(&decode_u64_seq(&payload)?),
            ChunkId::Data => Ok(()),
        };
        result.map_err(shape_err)
    }

    /// Access the underlying byte source.
    #[inline]
    pub fn streams(&self) -> &IStreams {
        &self.streams
    }

    /// The query surface.
    #[inline]
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Location of the DATA payload, if the stream has one.
    #[inline]
    pub fn data_chunk(&self) -> Option<ChunkInfo> {
        self.data
    }

    /// Chunks with identifiers the core does not know, in stream order.
    #[inline]
    pub fn unknown_chunks(&self) -> &[ChunkInfo] {
        &self.unknown
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Page image `index` into memory. Returns `false` if already resident.
    pub fn load_image(&mut self, index: u64) -> Result<bool> {
        self.restore_metadata()?;
        self.container.check_index(index)?;
        if self.container.registry().image_size_at(index) == 0 {
            return self.container.load_image_with(index, |_| Ok(()));
        }
        let data_pos = self
            .data
            .map(|d| d.pos)
            .ok_or_else(|| Error::invalid_state("stream has no DATA chunk"))?;
        let pos = data_pos + self.container.registry().image_offset(index) as u64;
        let streams = &self.streams;
        self.container.load_image_with(index, |buf| streams.read_into(pos, buf))
    }

    /// Put the stream's metadata back after a `clear`.
    fn restore_metadata(&mut self) -> Result<()> {
        if self.container.is_empty() && self.container.registry() != &self.metadata {
            trace!("restoring stream metadata");
            *self.container.registry_mut()? = self.metadata.clone();
        }
        Ok(())
    }

    /// Page in the lowest-indexed image not yet resident.
    pub fn load_next(&mut self) -> Result<Option<u64>> {
        self.restore_metadata()?;
        let next = (0..self.container.number_of_images())
            .find(|&i| !self.container.is_image_resident(i));
        match next {
            Some(index) => {
                self.load_image(index)?;
                Ok(Some(index))
            }
            None => Ok(None),
        }
    }

    /// Page in images in ascending order until the next one would not fit.
    /// Returns how many were admitted.
    pub fn load_greedy(&mut self) -> Result<usize> {
        let mut loaded = 0;
        loop {
            match self.load_next() {
                Ok(Some(_)) => loaded += 1,
                Ok(None) => break,
                Err(Error::CapacityExceeded { .. }) => break,
                Err(e) => return Err(e),
            }
        }
        debug!(
            "greedy load admitted {} images ({} of {} bytes resident)",
            loaded,
            self.container.size_in_memory(),
            self.container.size()
        );
        Ok(loaded)
    }

    /// Page in the whole dataset, or nothing if it does not fit.
    pub fn load_all(&mut self) -> Result<()> {
        self.restore_metadata()?;
        let resident = self.container.size_in_memory();
        let missing = self.container.size() - resident;
        let limit = self.container.memory_size();
        if missing > limit.saturating_sub(resident) {
            return Err(Error::CapacityExceeded { requested: missing, resident, limit });
        }
        while self.load_next()?.is_some() {}
        Ok(())
    }

    /// Drop image `index` from memory. Returns `false` if it was not resident.
    pub fn release_image(&mut self, index: u64) -> bool {
        self.container.release_image(index)
    }

    /// Free all resident data. Queries report an empty dataset until the
    /// next load restores the stream's metadata.
    pub fn clear(&mut self) {
        self.container.clear();
    }

    pub fn set_memory_size(&mut self, bytes: usize) {
        self.container.set_memory_size(bytes);
    }

    pub fn reset_memory_size(&mut self) {
        self.container.reset_memory_size();
    }
}

impl Deref for IContainer {
    type Target = Container;

    fn deref(&self) -> &Container {
        &self.container
    }
}
