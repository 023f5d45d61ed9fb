//! # BIG
//!
//! Container format and in-memory model for large multi-image datasets.
//!
//! A dataset holds a number of images, each made of tiles, rows, columns and
//! planes of one scalar type. The container keeps only as much of the
//! sample data resident as a configured byte budget allows, while size and
//! completeness queries always describe the whole dataset.
//!
//! ## Modules
//!
//! - [`util`] - Basic types (data types, axes, shape, errors)
//! - [`format`] - The chunked binary format, reader and writer
//! - [`core`] - Registry, memory budget and the container façade
//!
//! ## Example
//!
//! ```ignore
//! use big::prelude::*;
//!
//! let mut reader = IContainer::open_opts("stack.big", &ReadOptions::new().memory_size(64 << 20))?;
//! let loaded = reader.load_greedy()?;
//! println!("{} of {} images resident", loaded, reader.number_of_images());
//! ```

pub mod core;
pub mod format;
pub mod util;

// Re-export commonly used types
pub use crate::core::{Container, ContainerState};
pub use format::{IContainer, OContainer, ReadOptions};
pub use util::{Axis, DataOrder, DataType, Element, Error, Result, Shape};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{Container, ContainerState};
    pub use crate::format::{IContainer, OContainer, ReadOptions, DEFAULT_MEMORY_SIZE};
    pub use crate::util::{Axis, Bool, DataOrder, DataType, Element, Error, Result, Shape};
}
