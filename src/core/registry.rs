//! Dimension & type registry and the size computations derived from it.

use crate::util::{DataOrder, DataType, Error, Result, Shape};

/// Dataset shape, axis order and scalar type assignment.
///
/// Setters validate individual values and guarantee that the total dataset
/// size stays representable. Cross-field consistency (type list length vs.
/// image count) is checked by [`validate`](Self::validate) before any data
/// is loaded or written, since writers may set the two in either order.
#[derive(Clone, Debug, PartialEq)]
pub struct Registry {
    shape: Shape,
    data_order: DataOrder,
    data_types: Vec<DataType>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            shape: Shape::default(),
            data_order: DataOrder::default(),
            data_types: vec![DataType::default()],
        }
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    pub fn number_of_images(&self) -> u64 {
        self.shape.number_of_images
    }

    #[inline]
    pub fn number_of_tiles(&self) -> u64 {
        self.shape.number_of_tiles
    }

    #[inline]
    pub fn image_height(&self) -> u64 {
        self.shape.image_height
    }

    #[inline]
    pub fn image_width(&self) -> u64 {
        self.shape.image_width
    }

    #[inline]
    pub fn number_of_planes(&self) -> u64 {
        self.shape.number_of_planes
    }

    #[inline]
    pub fn data_order(&self) -> &DataOrder {
        &self.data_order
    }

    #[inline]
    pub fn data_types(&self) -> &[DataType] {
        &self.data_types
    }

    /// True if every image shares one scalar type.
    pub fn is_uniform_data_type(&self) -> bool {
        match self.data_types.split_first() {
            Some((first, rest)) => rest.iter().all(|t| t == first),
            None => true,
        }
    }

    /// Scalar type of image `index`: the single entry for a uniform
    /// assignment, else the per-image entry.
    pub fn type_for_image(&self, index: u64) -> Option<DataType> {
        if self.data_types.len() == 1 {
            return Some(self.data_types[0]);
        }
        usize::try_from(index).ok().and_then(|i| self.data_types.get(i).copied())
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    pub fn set_number_of_images(&mut self, value: u64) -> Result<()> {
        self.update_shape(|s| s.number_of_images = value)
    }

    pub fn set_number_of_tiles(&mut self, value: u64) -> Result<()> {
        if value == 0 {
            return Err(Error::InvalidShape("number of tiles must be at least 1".into()));
        }
        self.update_shape(|s| s.number_of_tiles = value)
    }

    pub fn set_image_height(&mut self, value: u64) -> Result<()> {
        self.update_shape(|s| s.image_height = value)
    }

    pub fn set_image_width(&mut self, value: u64) -> Result<()> {
        self.update_shape(|s| s.image_width = value)
    }

    pub fn set_number_of_planes(&mut self, value: u64) -> Result<()> {
        if value == 0 {
            return Err(Error::InvalidShape("number of planes must be at least 1".into()));
        }
        self.update_shape(|s| s.number_of_planes = value)
    }

    pub fn set_data_order(&mut self, order: DataOrder) {
        self.data_order = order;
    }

    pub fn set_data_types(&mut self, types: Vec<DataType>) -> Result<()> {
        if types.is_empty() {
            return Err(Error::InvalidTypeAssignment {
                types: 0,
                images: self.shape.number_of_images,
            });
        }
        Self::check_total(&self.shape, &types)?;
        self.data_types = types;
        Ok(())
    }

    /// Set type identifiers as read from the wire.
    pub fn set_data_type_ids(&mut self, ids: &[u64]) -> Result<()> {
        let types = ids
            .iter()
            .map(|&id| DataType::try_from_id(id))
            .collect::<Result<Vec<_>>>()?;
        self.set_data_types(types)
    }

    fn update_shape(&mut self, f: impl FnOnce(&mut Shape)) -> Result<()> {
        let mut next = self.shape;
        f(&mut next);
        Self::check_total(&next, &self.data_types)?;
        self.shape = next;
        Ok(())
    }

    fn check_total(shape: &Shape, types: &[DataType]) -> Result<()> {
        let overflow = || Error::InvalidShape(format!("dataset size overflows: {}", shape));
        let raw = shape.checked_image_size_raw().ok_or_else(overflow)?;
        let widest = types.iter().map(|t| t.num_bytes()).max().unwrap_or(0);
        let images = usize::try_from(shape.number_of_images).map_err(|_| overflow())?;
        raw.checked_mul(widest)
            .and_then(|n| n.checked_mul(images))
            .ok_or_else(overflow)?;
        Ok(())
    }

    /// Check cross-field consistency.
    pub fn validate(&self) -> Result<()> {
        let types = self.data_types.len();
        if types != 1 && types as u64 != self.shape.number_of_images {
            return Err(Error::InvalidTypeAssignment {
                types,
                images: self.shape.number_of_images,
            });
        }
        Ok(())
    }

    // ========================================================================
    // Sizes
    // ========================================================================

    /// `width * height * planes * tiles`, independent of the scalar type.
    #[inline]
    pub fn image_size_raw(&self) -> usize {
        // bounded by check_total on every mutation
        self.shape.checked_image_size_raw().unwrap_or(0)
    }

    /// Bytes in one image of the given type.
    #[inline]
    pub fn image_size(&self, data_type: DataType) -> usize {
        self.image_size_raw() * data_type.num_bytes()
    }

    /// Bytes in image `index`, or 0 if it has no assigned type.
    pub fn image_size_at(&self, index: u64) -> usize {
        self.type_for_image(index).map_or(0, |t| self.image_size(t))
    }

    /// Total logical dataset size in bytes.
    pub fn size(&self) -> usize {
        if self.data_types.len() == 1 {
            return self.image_size(self.data_types[0]) * self.shape.number_of_images as usize;
        }
        (0..self.shape.number_of_images).map(|i| self.image_size_at(i)).sum()
    }

    /// Byte offset of image `index` within the full dataset.
    pub fn image_offset(&self, index: u64) -> usize {
        if self.data_types.len() == 1 {
            return self.image_size(self.data_types[0]) * index as usize;
        }
        (0..index).map(|i| self.image_size_at(i)).sum()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(w: u64, h: u64, planes: u64, tiles: u64) -> Registry {
        let mut r = Registry::new();
        r.set_image_width(w).unwrap();
        r.set_image_height(h).unwrap();
        r.set_number_of_planes(planes).unwrap();
        r.set_number_of_tiles(tiles).unwrap();
        r
    }

    #[test]
    fn test_defaults() {
        let r = Registry::new();
        assert_eq!(r.number_of_images(), 0);
        assert_eq!(r.number_of_tiles(), 1);
        assert_eq!(r.number_of_planes(), 1);
        assert_eq!(r.data_types(), &[DataType::Float]);
        assert_eq!(r.data_order().ids(), vec![1, 2, 3, 4, 5]);
        assert_eq!(r.size(), 0);
        assert!(r.validate().is_ok());
    }

    #[test]
    fn test_image_size_raw() {
        for (w, h, p, t) in [(4, 4, 1, 1), (3, 5, 2, 7), (0, 9, 3, 1), (640, 480, 3, 4)] {
            let r = registry(w, h, p, t);
            assert_eq!(r.image_size_raw() as u64, w * h * p * t);
            for dt in DataType::ALL {
                assert_eq!(r.image_size(dt), r.image_size_raw() * dt.num_bytes());
            }
        }
    }

    #[test]
    fn test_scenario_a() {
        let r = registry(4, 4, 1, 1);
        assert_eq!(r.image_size_raw(), 16);
        assert_eq!(r.image_size(DataType::Float), 64);
    }

    #[test]
    fn test_uniform_data_type() {
        let mut r = Registry::new();
        assert!(r.is_uniform_data_type());

        r.set_data_types(vec![DataType::Float, DataType::Int]).unwrap();
        assert!(!r.is_uniform_data_type());

        r.set_number_of_images(3).unwrap();
        r.set_data_types(vec![DataType::Float; 3]).unwrap();
        assert!(r.is_uniform_data_type());
    }

    #[test]
    fn test_mixed_type_size() {
        let mut r = registry(2, 2, 1, 1);
        r.set_number_of_images(3).unwrap();
        r.set_data_types(vec![DataType::Float, DataType::UnsignedChar, DataType::Double]).unwrap();
        assert!(r.validate().is_ok());
        assert_eq!(r.size(), 16 + 4 + 32);
        assert_eq!(r.image_offset(0), 0);
        assert_eq!(r.image_offset(1), 16);
        assert_eq!(r.image_offset(2), 20);
        assert_eq!(r.image_size_at(2), 32);
    }

    #[test]
    fn test_validate_type_length() {
        let mut r = Registry::new();
        r.set_number_of_images(3).unwrap();
        r.set_data_types(vec![DataType::Float, DataType::Int]).unwrap();
        assert!(matches!(
            r.validate(),
            Err(Error::InvalidTypeAssignment { types: 2, images: 3 })
        ));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let mut r = Registry::new();
        assert!(matches!(r.set_number_of_tiles(0), Err(Error::InvalidShape(_))));
        assert!(matches!(r.set_number_of_planes(0), Err(Error::InvalidShape(_))));
        assert!(matches!(r.set_data_types(vec![]), Err(Error::InvalidTypeAssignment { .. })));
        assert!(matches!(r.set_data_type_ids(&[2, 42]), Err(Error::UnsupportedDataType(42))));
        assert_eq!(r.data_types(), &[DataType::Float]);
    }

    #[test]
    fn test_rejects_overflow() {
        let mut r = registry(1 << 20, 1 << 20, 1, 1);
        assert!(matches!(r.set_number_of_images(u64::MAX), Err(Error::InvalidShape(_))));
        assert_eq!(r.number_of_images(), 0);
    }
}
