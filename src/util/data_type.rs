//! Scalar data types and their byte widths.
//!
//! Every size computation in the container goes through
//! [`DataType::num_bytes`]. The numeric identifiers are part of the wire
//! format and must never be renumbered.

use bytemuck::{Pod, Zeroable};
use half::f16;
use std::fmt;

use super::{Error, Result};

/// Scalar type of the samples stored for an image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u64)]
pub enum DataType {
    /// 16-bit floating point (IEEE 754 half precision)
    Half = 1,
    /// 32-bit floating point
    #[default]
    Float = 2,
    /// 64-bit floating point
    Double = 3,
    /// Signed 8-bit integer
    Char = 4,
    /// Unsigned 8-bit integer
    UnsignedChar = 5,
    /// Signed 16-bit integer
    Short = 6,
    /// Unsigned 16-bit integer
    UnsignedShort = 7,
    /// Signed 32-bit integer
    Int = 8,
    /// Unsigned 32-bit integer
    UnsignedInt = 9,
    /// Signed 64-bit integer
    LongLong = 10,
    /// Unsigned 64-bit integer
    UnsignedLongLong = 11,
    /// Boolean stored as one byte
    Bool = 12,
}

impl DataType {
    /// All recognized types, in identifier order.
    pub const ALL: [DataType; 12] = [
        Self::Half,
        Self::Float,
        Self::Double,
        Self::Char,
        Self::UnsignedChar,
        Self::Short,
        Self::UnsignedShort,
        Self::Int,
        Self::UnsignedInt,
        Self::LongLong,
        Self::UnsignedLongLong,
        Self::Bool,
    ];

    /// Returns the size in bytes of a single element of this type.
    #[inline]
    pub const fn num_bytes(self) -> usize {
        match self {
            Self::Half => 2,
            Self::Float => 4,
            Self::Double => 8,
            Self::Char => 1,
            Self::UnsignedChar => 1,
            Self::Short => 2,
            Self::UnsignedShort => 2,
            Self::Int => 4,
            Self::UnsignedInt => 4,
            Self::LongLong => 8,
            Self::UnsignedLongLong => 8,
            Self::Bool => 1,
        }
    }

    /// Wire identifier of this type.
    #[inline]
    pub const fn id(self) -> u64 {
        self as u64
    }

    /// Look up a type by its wire identifier.
    pub const fn from_id(id: u64) -> Option<Self> {
        match id {
            1 => Some(Self::Half),
            2 => Some(Self::Float),
            3 => Some(Self::Double),
            4 => Some(Self::Char),
            5 => Some(Self::UnsignedChar),
            6 => Some(Self::Short),
            7 => Some(Self::UnsignedShort),
            8 => Some(Self::Int),
            9 => Some(Self::UnsignedInt),
            10 => Some(Self::LongLong),
            11 => Some(Self::UnsignedLongLong),
            12 => Some(Self::Bool),
            _ => None,
        }
    }

    /// Like [`from_id`](Self::from_id), failing with `UnsupportedDataType`.
    pub fn try_from_id(id: u64) -> Result<Self> {
        Self::from_id(id).ok_or(Error::UnsupportedDataType(id))
    }

    /// Returns the name of this type as a string.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Half => "half",
            Self::Float => "float",
            Self::Double => "double",
            Self::Char => "char",
            Self::UnsignedChar => "unsigned char",
            Self::Short => "short",
            Self::UnsignedShort => "unsigned short",
            Self::Int => "int",
            Self::UnsignedInt => "unsigned int",
            Self::LongLong => "long long",
            Self::UnsignedLongLong => "unsigned long long",
            Self::Bool => "bool",
        }
    }

    /// Returns true if this is a floating point type.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Half | Self::Float | Self::Double)
    }
}

impl TryFrom<u64> for DataType {
    type Error = Error;

    fn try_from(id: u64) -> Result<Self> {
        Self::try_from_id(id)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rust scalar that can be stored as image samples.
pub trait Element: Pod {
    /// The data type this Rust type maps to.
    const DATA_TYPE: DataType;
}

impl Element for i8 {
    const DATA_TYPE: DataType = DataType::Char;
}

impl Element for u8 {
    const DATA_TYPE: DataType = DataType::UnsignedChar;
}

impl Element for i16 {
    const DATA_TYPE: DataType = DataType::Short;
}

impl Element for u16 {
    const DATA_TYPE: DataType = DataType::UnsignedShort;
}

impl Element for i32 {
    const DATA_TYPE: DataType = DataType::Int;
}

impl Element for u32 {
    const DATA_TYPE: DataType = DataType::UnsignedInt;
}

impl Element for i64 {
    const DATA_TYPE: DataType = DataType::LongLong;
}

impl Element for u64 {
    const DATA_TYPE: DataType = DataType::UnsignedLongLong;
}

impl Element for f16 {
    const DATA_TYPE: DataType = DataType::Half;
}

impl Element for f32 {
    const DATA_TYPE: DataType = DataType::Float;
}

impl Element for f64 {
    const DATA_TYPE: DataType = DataType::Double;
}

/// Boolean sample with guaranteed 1-byte storage.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Bool(u8);

impl Bool {
    pub const TRUE: Self = Self(1);
    pub const FALSE: Self = Self(0);

    #[inline]
    pub const fn new(v: bool) -> Self {
        Self(v as u8)
    }

    #[inline]
    pub const fn get(self) -> bool {
        self.0 != 0
    }
}

impl From<bool> for Bool {
    #[inline]
    fn from(v: bool) -> Self {
        Self::new(v)
    }
}

impl From<Bool> for bool {
    #[inline]
    fn from(v: Bool) -> Self {
        v.get()
    }
}

impl fmt::Debug for Bool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl Element for Bool {
    const DATA_TYPE: DataType = DataType::Bool;
}
