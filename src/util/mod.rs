//! Utility types for the BIG container.
//!
//! This module contains fundamental types used throughout the library:
//! - [`DataType`] - Scalar types and their byte widths
//! - [`Axis`] / [`DataOrder`] / [`Shape`] - Dataset dimensions
//! - [`Error`] / [`Result`] - Error handling

mod data_type;
mod dimensions;
mod error;

pub use data_type::*;
pub use dimensions::*;
pub use error::*;
