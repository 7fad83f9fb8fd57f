//! Long profiles
//!
//! Elevation-vs-distance series along one path:
//! - Assemble: vertex and station samples in path order
//! - Despike: remove bridge/culvert artifacts above the running minimum
//! - Identify: windowed drop and slope thresholds

mod assemble;
mod despike;
mod identify;

pub use assemble::{
    assemble_profile, assemble_station_profile, ElevationSampler, ProfileSample, SampleKind,
    VertexElevation,
};
pub use despike::{despike, spike_mask, Despike, DespikeParams};
pub use identify::{
    identify_features, sample_slopes, Feature, FlowDirection, IdentifyFeatures, IdentifyParams,
};
