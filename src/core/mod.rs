//! In-memory model of a BIG dataset.
//!
//! - [`Registry`] - shape, data order, type assignment and size arithmetic
//! - [`MemoryBudget`] - owned data buffer under a byte ceiling
//! - [`Container`] - the queryable façade composing both

mod container;
mod memory;
mod registry;

pub use container::*;
pub use memory::*;
pub use registry::*;
