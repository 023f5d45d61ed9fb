//! Dataset shape and axis ordering.
//!
//! A BIG dataset has five axes: images, tiles, height, width and planes.
//! [`Shape`] holds the extent of each one and [`DataOrder`] the nesting
//! order in which the raw data is laid out.

use smallvec::SmallVec;
use std::fmt;

use super::{Error, Result};

/// One of the five dataset axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u64)]
pub enum Axis {
    Images = 1,
    Tiles = 2,
    Height = 3,
    Width = 4,
    Planes = 5,
}

impl Axis {
    /// All axes in default nesting order.
    pub const ALL: [Axis; 5] = [Self::Images, Self::Tiles, Self::Height, Self::Width, Self::Planes];

    /// Wire identifier of this axis.
    #[inline]
    pub const fn id(self) -> u64 {
        self as u64
    }

    /// Look up an axis by its wire identifier.
    pub const fn from_id(id: u64) -> Option<Self> {
        match id {
            1 => Some(Self::Images),
            2 => Some(Self::Tiles),
            3 => Some(Self::Height),
            4 => Some(Self::Width),
            5 => Some(Self::Planes),
            _ => None,
        }
    }

    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Images => "images",
            Self::Tiles => "tiles",
            Self::Height => "height",
            Self::Width => "width",
            Self::Planes => "planes",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Nesting order of the dataset axes, outermost first.
///
/// Always a permutation of [`Axis::ALL`]; construction rejects anything else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataOrder {
    axes: SmallVec<[Axis; 5]>,
}

impl DataOrder {
    /// Create a data order from axes, outermost first.
    pub fn new(axes: &[Axis]) -> Result<Self> {
        if axes.len() != Axis::ALL.len() {
            return Err(Error::InvalidDataOrder(format!(
                "expected {} axes, got {}",
                Axis::ALL.len(),
                axes.len()
            )));
        }
        for (i, axis) in axes.iter().enumerate() {
            if axes[..i].contains(axis) {
                return Err(Error::InvalidDataOrder(format!("duplicate axis {}", axis)));
            }
        }
        Ok(Self { axes: SmallVec::from_slice(axes) })
    }

    /// Create a data order from wire identifiers.
    pub fn from_ids(ids: &[u64]) -> Result<Self> {
        let axes = ids
            .iter()
            .map(|&id| {
                Axis::from_id(id)
                    .ok_or_else(|| Error::InvalidDataOrder(format!("unknown axis id {}", id)))
            })
            .collect::<Result<SmallVec<[Axis; 5]>>>()?;
        Self::new(&axes)
    }

    /// Axes, outermost first.
    #[inline]
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Wire identifiers, outermost first.
    pub fn ids(&self) -> Vec<u64> {
        self.axes.iter().map(|a| a.id()).collect()
    }

    /// The outermost axis, at which partial residency is tracked.
    #[inline]
    pub fn outermost(&self) -> Axis {
        self.axes[0]
    }

    /// Position of an axis in the nesting order.
    pub fn position(&self, axis: Axis) -> usize {
        self.axes.iter().position(|&a| a == axis).unwrap_or(self.axes.len())
    }
}

impl Default for DataOrder {
    fn default() -> Self {
        Self { axes: SmallVec::from_slice(&Axis::ALL) }
    }
}

impl fmt::Display for DataOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, a) in self.axes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", a)?;
        }
        write!(f, "]")
    }
}

/// Extent of each dataset axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Shape {
    pub number_of_images: u64,
    pub number_of_tiles: u64,
    pub image_height: u64,
    pub image_width: u64,
    pub number_of_planes: u64,
}

impl Shape {
    /// Extent along one axis.
    pub fn extent(&self, axis: Axis) -> u64 {
        match axis {
            Axis::Images => self.number_of_images,
            Axis::Tiles => self.number_of_tiles,
            Axis::Height => self.image_height,
            Axis::Width => self.image_width,
            Axis::Planes => self.number_of_planes,
        }
    }

    /// Elements in one image (`width * height * planes * tiles`), or `None`
    /// if the product does not fit in `usize`.
    pub fn checked_image_size_raw(&self) -> Option<usize> {
        let n = self
            .image_width
            .checked_mul(self.image_height)?
            .checked_mul(self.number_of_planes)?
            .checked_mul(self.number_of_tiles)?;
        usize::try_from(n).ok()
    }
}

impl Default for Shape {
    fn default() -> Self {
        Self {
            number_of_images: 0,
            number_of_tiles: 1,
            image_height: 0,
            image_width: 0,
            number_of_planes: 1,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} images x {} tiles x [{} x {}] x {} planes",
            self.number_of_images,
            self.number_of_tiles,
            self.image_width,
            self.image_height,
            self.number_of_planes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order() {
        let order = DataOrder::default();
        assert_eq!(order.ids(), vec![1, 2, 3, 4, 5]);
        assert_eq!(order.outermost(), Axis::Images);
        assert_eq!(format!("{}", order), "[images, tiles, height, width, planes]");
    }

    #[test]
    fn test_permutation() {
        let order = DataOrder::from_ids(&[5, 4, 3, 2, 1]).unwrap();
        assert_eq!(order.outermost(), Axis::Planes);
        assert_eq!(order.position(Axis::Images), 4);
    }

    #[test]
    fn test_rejects_duplicates_and_unknown() {
        assert!(matches!(
            DataOrder::from_ids(&[1, 1, 3, 4, 5]),
            Err(Error::InvalidDataOrder(_))
        ));
        assert!(matches!(
            DataOrder::from_ids(&[1, 2, 3, 4, 6]),
            Err(Error::InvalidDataOrder(_))
        ));
        assert!(matches!(DataOrder::from_ids(&[1, 2, 3]), Err(Error::InvalidDataOrder(_))));
    }

    #[test]
    fn test_shape_defaults() {
        let s = Shape::default();
        assert_eq!(s.number_of_images, 0);
        assert_eq!(s.number_of_tiles, 1);
        assert_eq!(s.number_of_planes, 1);
        assert_eq!(s.checked_image_size_raw(), Some(0));
        assert_eq!(s.extent(Axis::Tiles), 1);
    }

    #[test]
    fn test_shape_overflow() {
        let s = Shape {
            image_width: u64::MAX,
            image_height: 2,
            ..Shape::default()
        };
        assert_eq!(s.checked_image_size_raw(), None);
    }
}
