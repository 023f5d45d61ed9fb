//! The BIG binary container format.
//!
//! A BIG stream is an 8-byte magic signature followed by tagged,
//! length-prefixed chunks. All integers are little-endian `u64`.
//!
//! ## Stream Structure
//!
//! ```text
//! +---------------------------+
//! | Magic: "BIG\0\0\0\0\0"    |  8 bytes
//! +---------------------------+
//! | Chunk id                  |  8 bytes (u64 LE)
//! | Payload length            |  8 bytes (u64 LE)
//! | Payload                   |  length bytes
//! +---------------------------+
//! | ... more chunks ...       |
//! +---------------------------+
//! ```
//!
//! Chunks 1-5 carry one `u64` each (images, tiles, height, width, planes),
//! 6 and 7 carry `u64` sequences (data order, data types), and 8 carries
//! the raw samples, image by image. Other identifiers are skipped.

mod codec;
mod constants;
mod reader;
mod writer;

pub use codec::*;
pub use constants::*;
pub use reader::*;
pub use writer::*;
