//! Memory budget manager.
//!
//! Owns the raw data buffer and tracks which outermost entities (images)
//! are resident. Admission is all-or-nothing per entity: a failed admission
//! leaves the buffer, `data_length` and the resident set untouched.

use tracing::{debug, trace};

use crate::format::DEFAULT_MEMORY_SIZE;
use crate::util::{Error, Result};

/// Raw data buffer under a byte ceiling.
#[derive(Debug)]
pub struct MemoryBudget {
    /// `None` until the first admission, and again after `clear`.
    data: Option<Vec<u8>>,
    memory_size: usize,
    /// Resident entity indices, ascending. Their bytes are stored in the
    /// same order in `data`.
    offsets: Vec<u64>,
}

impl MemoryBudget {
    pub fn new(memory_size: usize) -> Self {
        Self {
            data: None,
            memory_size,
            offsets: Vec::new(),
        }
    }

    /// Configured ceiling in bytes.
    #[inline]
    pub fn memory_size(&self) -> usize {
        self.memory_size
    }

    /// Update the ceiling. Never frees or shrinks what is already resident.
    pub fn set_memory_size(&mut self, bytes: usize) {
        if bytes < self.data_length() {
            debug!(
                "memory ceiling {} below current residency {}; applies to the next load",
                bytes,
                self.data_length()
            );
        }
        self.memory_size = bytes;
    }

    /// True until the buffer is allocated by the first admission.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    /// Bytes currently resident.
    #[inline]
    pub fn data_length(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }

    /// Resident buffer contents.
    #[inline]
    pub fn data(&self) -> &[u8] {
        self.data.as_deref().unwrap_or(&[])
    }

    /// Resident entity indices, ascending.
    #[inline]
    pub fn outermost_entities_offsets(&self) -> &[u64] {
        &self.offsets
    }

    #[inline]
    pub fn is_resident(&self, index: u64) -> bool {
        self.offsets.binary_search(&index).is_ok()
    }

    /// Number of resident entities with an index below `index`.
    #[inline]
    pub fn rank(&self, index: u64) -> usize {
        self.offsets.partition_point(|&i| i < index)
    }

    /// True if `bytes` more would stay within the ceiling. An empty entity
    /// always fits, even over a lowered ceiling.
    #[inline]
    pub fn fits(&self, bytes: usize) -> bool {
        bytes == 0
            || self
                .data_length()
                .checked_add(bytes)
                .is_some_and(|total| total <= self.memory_size)
    }

    /// Admit entity `index` of `len` bytes at byte position `at`.
    ///
    /// `fill` writes the entity's bytes into the slice it is given. If it
    /// fails, the buffer is restored and the error returned. `capacity_hint`
    /// sizes the buffer on first allocation.
    pub fn admit_with<F>(
        &mut self,
        index: u64,
        at: usize,
        len: usize,
        capacity_hint: usize,
        fill: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut [u8]) -> Result<()>,
    {
        if self.is_resident(index) {
            return Err(Error::invalid_state(format!("entity {} is already resident", index)));
        }
        if !self.fits(len) {
            debug!(
                "refusing entity {}: {} bytes over {} resident, limit {}",
                index,
                len,
                self.data_length(),
                self.memory_size
            );
            return Err(Error::CapacityExceeded {
                requested: len,
                resident: self.data_length(),
                limit: self.memory_size,
            });
        }

        let fresh = self.data.is_none();
        let initial = capacity_hint.min(self.memory_size);
        let data = self.data.get_or_insert_with(|| Vec::with_capacity(initial));
        let old_len = data.len();
        debug_assert!(at <= old_len);

        if let Err(e) = data.try_reserve(len) {
            if fresh {
                self.data = None;
            }
            return Err(Error::invalid_state(format!("allocation of {} bytes failed: {}", len, e)));
        }
        data.resize(old_len + len, 0);
        if let Err(e) = fill(&mut data[old_len..]) {
            data.truncate(old_len);
            if fresh {
                self.data = None;
            }
            return Err(e);
        }
        data[at..].rotate_right(len);

        let slot = self.rank(index);
        self.offsets.insert(slot, index);
        trace!("admitted entity {} ({} bytes, {} resident)", index, len, self.data_length());
        Ok(())
    }

    /// Drop entity `index` stored at byte position `at` with `len` bytes.
    /// The buffer stays allocated.
    pub fn release(&mut self, index: u64, at: usize, len: usize) -> bool {
        let Ok(slot) = self.offsets.binary_search(&index) else {
            return false;
        };
        if let Some(data) = self.data.as_mut() {
            data.drain(at..at + len);
        }
        self.offsets.remove(slot);
        trace!("released entity {} ({} bytes)", index, len);
        true
    }

    /// Free the buffer and forget all resident entities.
    pub fn clear(&mut self) {
        if let Some(data) = self.data.take() {
            debug!("releasing {} resident bytes", data.len());
        }
        self.offsets.clear();
    }
}

impl Default for MemoryBudget {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_SIZE)
    }
}
