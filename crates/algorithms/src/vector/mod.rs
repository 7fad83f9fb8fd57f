//! Vector outputs
//!
//! Planar polygon products derived from the network:
//! - Buffer: corridor around a path, an edge subset or the whole network

mod buffer;

pub use buffer::{buffer_corridor, buffer_segment, BufferParams, Corridor};
