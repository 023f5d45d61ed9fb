//! Container façade over the registry and the memory budget.
//!
//! [`Container`] is the query surface shared by the reader and writer roles
//! ([`IContainer`](crate::IContainer), [`OContainer`](crate::OContainer)).
//! Shape, order and type mutation and data loading are crate-internal and
//! reached through those roles.

use tracing::debug;

use super::{MemoryBudget, Registry};
use crate::util::{Axis, DataOrder, DataType, Element, Error, Result, Shape};

/// Materialization state of a container.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerState {
    /// No buffer allocated.
    Empty,
    /// Buffer allocated, part of the dataset resident.
    PartiallyLoaded,
    /// The whole dataset is resident.
    FullyLoaded,
}

/// Dataset metadata plus the resident part of its data.
#[derive(Debug, Default)]
pub struct Container {
    registry: Registry,
    memory: MemoryBudget,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty container with the given memory ceiling.
    pub fn with_memory_size(bytes: usize) -> Self {
        Self {
            registry: Registry::new(),
            memory: MemoryBudget::new(bytes),
        }
    }

    // ========================================================================
    // Registry accessors
    // ========================================================================

    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        self.registry.shape()
    }

    #[inline]
    pub fn number_of_images(&self) -> u64 {
        self.registry.number_of_images()
    }

    #[inline]
    pub fn number_of_tiles(&self) -> u64 {
        self.registry.number_of_tiles()
    }

    #[inline]
    pub fn image_height(&self) -> u64 {
        self.registry.image_height()
    }

    #[inline]
    pub fn image_width(&self) -> u64 {
        self.registry.image_width()
    }

    #[inline]
    pub fn number_of_planes(&self) -> u64 {
        self.registry.number_of_planes()
    }

    #[inline]
    pub fn data_order(&self) -> &DataOrder {
        self.registry.data_order()
    }

    /// Scalar type assignment: one entry, or one per image.
    #[inline]
    pub fn data_type(&self) -> &[DataType] {
        self.registry.data_types()
    }

    #[inline]
    pub fn is_uniform_data_type(&self) -> bool {
        self.registry.is_uniform_data_type()
    }

    /// Byte width of the type with wire identifier `data_type`.
    pub fn get_image_type(&self, data_type: u64) -> Result<usize> {
        Ok(DataType::try_from_id(data_type)?.num_bytes())
    }

    /// Elements per image, regardless of type.
    #[inline]
    pub fn image_size_raw(&self) -> usize {
        self.registry.image_size_raw()
    }

    /// Bytes in one image of `data_type`.
    #[inline]
    pub fn image_size(&self, data_type: DataType) -> usize {
        self.registry.image_size(data_type)
    }

    // ========================================================================
    // Memory
    // ========================================================================

    /// True until the data buffer is allocated.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.memory.is_empty()
    }

    /// Free the data buffer and reset shape, order and type to their
    /// defaults. The memory ceiling is kept.
    pub fn clear(&mut self) {
        self.memory.clear();
        self.registry = Registry::new();
    }

    /// True if the whole dataset is resident.
    #[inline]
    pub fn is_in_memory(&self) -> bool {
        self.size_in_memory() == self.size()
    }

    pub fn state(&self) -> ContainerState {
        if self.is_empty() {
            ContainerState::Empty
        } else if self.is_in_memory() {
            ContainerState::FullyLoaded
        } else {
            ContainerState::PartiallyLoaded
        }
    }

    #[inline]
    pub fn memory_size(&self) -> usize {
        self.memory.memory_size()
    }

    /// Set the memory ceiling. Does not free memory if already allocated.
    pub fn set_memory_size(&mut self, bytes: usize) {
        self.memory.set_memory_size(bytes);
    }

    /// Restore the default memory ceiling.
    pub fn reset_memory_size(&mut self) {
        self.memory.set_memory_size(crate::format::DEFAULT_MEMORY_SIZE);
    }

    /// Total size of the dataset in bytes, resident or not.
    #[inline]
    pub fn size(&self) -> usize {
        self.registry.size()
    }

    /// Bytes of the images currently resident.
    pub fn size_in_memory(&self) -> usize {
        let size = self
            .memory
            .outermost_entities_offsets()
            .iter()
            .map(|&i| self.registry.image_size_at(i))
            .sum();
        debug_assert_eq!(size, self.memory.data_length());
        size
    }

    /// Resident image indices, ascending.
    #[inline]
    pub fn outermost_entities_offsets(&self) -> &[u64] {
        self.memory.outermost_entities_offsets()
    }

    #[inline]
    pub fn is_image_resident(&self, index: u64) -> bool {
        self.memory.is_resident(index)
    }

    /// Raw bytes of a resident image.
    pub fn image_data(&self, index: u64) -> Option<&[u8]> {
        if !self.memory.is_resident(index) {
            return None;
        }
        let at = self.buffer_position(index);
        let len = self.registry.image_size_at(index);
        self.memory.data().get(at..at + len)
    }

    /// Copy a resident image out as typed samples.
    pub fn read_image<T: Element>(&self, index: u64) -> Result<Vec<T>> {
        self.check_index(index)?;
        let actual = self.type_of(index)?;
        if actual != T::DATA_TYPE {
            return Err(Error::TypeMismatch {
                expected: actual.to_string(),
                actual: T::DATA_TYPE.to_string(),
            });
        }
        let bytes = self
            .image_data(index)
            .ok_or_else(|| Error::invalid_state(format!("image {} is not resident", index)))?;
        Ok(bytemuck::pod_collect_to_vec(bytes))
    }

    // ========================================================================
    // Crate-internal mutation
    // ========================================================================

    /// Mutable registry, only while no data is resident.
    pub(crate) fn registry_mut(&mut self) -> Result<&mut Registry> {
        if !self.is_empty() {
            return Err(Error::invalid_state(
                "shape, order and type are fixed while data is allocated; clear() first",
            ));
        }
        Ok(&mut self.registry)
    }

    /// Check the container can hold image data at all.
    pub(crate) fn check_loadable(&self) -> Result<()> {
        self.registry.validate()?;
        match self.registry.data_order().outermost() {
            Axis::Images => Ok(()),
            other => Err(Error::UnsupportedDataOrder(other)),
        }
    }

    pub(crate) fn check_index(&self, index: u64) -> Result<()> {
        let count = self.number_of_images();
        if index >= count {
            return Err(Error::ImageOutOfBounds { index, count });
        }
        Ok(())
    }

    fn type_of(&self, index: u64) -> Result<DataType> {
        self.registry
            .type_for_image(index)
            .ok_or_else(|| Error::invalid_state(format!("image {} has no data type", index)))
    }

    /// Byte position of image `index` within the resident buffer.
    fn buffer_position(&self, index: u64) -> usize {
        let rank = self.memory.rank(index);
        self.memory.outermost_entities_offsets()[..rank]
            .iter()
            .map(|&i| self.registry.image_size_at(i))
            .sum()
    }

    /// Admit image `index`, filled by `fill`. Returns `false` if it was
    /// already resident.
    pub(crate) fn load_image_with<F>(&mut self, index: u64, fill: F) -> Result<bool>
    where
        F: FnOnce(&mut [u8]) -> Result<()>,
    {
        self.check_loadable()?;
        self.check_index(index)?;
        if self.memory.is_resident(index) {
            return Ok(false);
        }
        let len = self.registry.image_size_at(index);
        let at = self.buffer_position(index);
        let hint = self.size();
        self.memory.admit_with(index, at, len, hint, fill)?;
        Ok(true)
    }

    /// Admit image `index` from a caller-supplied payload.
    pub(crate) fn load_image_from(&mut self, index: u64, payload: &[u8]) -> Result<bool> {
        self.check_index(index)?;
        let expected = self.registry.image_size_at(index);
        if payload.len() != expected {
            return Err(Error::SizeMismatch { expected, actual: payload.len() });
        }
        self.load_image_with(index, |buf| {
            buf.copy_from_slice(payload);
            Ok(())
        })
    }

    /// Drop image `index` from residency.
    pub(crate) fn release_image(&mut self, index: u64) -> bool {
        if !self.memory.is_resident(index) {
            return false;
        }
        let at = self.buffer_position(index);
        let len = self.registry.image_size_at(index);
        debug!("releasing image {}", index);
        self.memory.release(index, at, len)
    }
}
