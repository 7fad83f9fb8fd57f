//! Network linear referencing
//!
//! Address resolution, point projection, topology repair and stationing on
//! an [`Alignment`](reachline_core::Alignment).

pub mod addressing;
pub mod projection;
pub mod repair;
pub mod stations;

pub use addressing::{
    distance_to_outlet, edge_addresses, outlet_addresses, path_address_at, to_coordinate,
    to_path_address, EdgeAddress,
};
pub use projection::{
    project_points, project_points_onto, ObservedPoint, Projection, ProjectionParams,
    ProjectionResult,
};
pub use repair::{dangling_endpoints, repair, DanglingEndpoint, EdgeEnd, RepairParams, RepairReport, Snap};
pub use stations::{
    generate_stations, network_stations, network_vertices, station_addresses, NetworkPoint, Station,
};
