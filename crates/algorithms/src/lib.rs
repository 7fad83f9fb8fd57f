//! # Reachline Algorithms
//!
//! Linear referencing and profile analysis on stream networks.
//!
//! ## Available Algorithm Categories
//!
//! - **network**: Addressing, point projection, topology repair, stations
//! - **vector**: Corridor buffer
//! - **profile**: Profile assembly, despiking, drop/slope identification

pub mod network;
pub mod profile;
pub mod vector;

mod maybe_rayon;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::network::{
        edge_addresses, generate_stations, network_stations, outlet_addresses, path_address_at,
        project_points, repair, to_coordinate, to_path_address, NetworkPoint, ObservedPoint,
        Projection, ProjectionParams, RepairParams, RepairReport, Station,
    };
    pub use crate::profile::{
        assemble_profile, despike, identify_features, Despike, ElevationSampler, Feature,
        FlowDirection, IdentifyFeatures, IdentifyParams, ProfileSample, VertexElevation,
    };
    pub use crate::vector::{buffer_corridor, BufferParams, Corridor};
    pub use reachline_core::prelude::*;
}
