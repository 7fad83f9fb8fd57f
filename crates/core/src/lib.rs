//! # Reachline Core
//!
//! Core types and traits for linear referencing on stream networks.
//!
//! This crate provides:
//! - `Point3`, `MeasuredLine`, `Polyline`: measured 3D centerline geometry
//! - `Alignment`: directed graph of reaches joined at nodes
//! - `Path`: a contiguous run of reaches from a source to an outlet
//! - `Address` / `PathAddress`: locations on the network
//! - Algorithm traits for consistent API

pub mod address;
pub mod alignment;
pub mod error;
pub mod geometry;
pub mod path;

pub use address::{Address, Boundary, Located, PathAddress};
pub use alignment::{
    build_alignment, find_path, Alignment, AlignmentParams, Direction, Edge, EdgeId, Node, NodeId,
    NodeRole,
};
pub use error::{Error, Result};
pub use geometry::{MeasuredLine, Point3, Polyline, Segment};
pub use path::Path;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::address::{Address, PathAddress};
    pub use crate::alignment::{build_alignment, Alignment, AlignmentParams, EdgeId, NodeId};
    pub use crate::error::{Error, Result};
    pub use crate::geometry::{Point3, Polyline};
    pub use crate::path::Path;
    pub use crate::Algorithm;
}

/// Core trait for all algorithms in Reachline.
///
/// Algorithms are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
