//! Long profile assembly
//!
//! Walks a path from source to outlet and turns its vertices (and optionally
//! regularly spaced stations) into elevation samples ordered by path
//! distance.

use crate::network::addressing::to_coordinate;
use crate::network::stations::station_addresses;
use reachline_core::{Alignment, Path, PathAddress, Point3, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Where a profile sample came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleKind {
    /// A vertex of the edge geometry
    Vertex,
    /// A point interpolated between vertices, e.g. a station
    Interpolated,
}

/// One point of a long profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileSample {
    pub address: PathAddress,
    pub coord: Point3,
    pub elevation: f64,
    pub kind: SampleKind,
}

impl ProfileSample {
    /// Cumulative distance from the path origin
    #[inline]
    pub fn distance(&self) -> f64 {
        self.address.path_distance
    }
}

/// Source of elevations for profile samples, typically a surface model
/// sampled at the planar position.
///
/// Returning `None` (no data at that position) falls back to the vertex z.
pub trait ElevationSampler {
    fn sample(&self, p: &Point3) -> Option<f64>;
}

impl<F> ElevationSampler for F
where
    F: Fn(f64, f64) -> Option<f64>,
{
    fn sample(&self, p: &Point3) -> Option<f64> {
        self(p.x, p.y)
    }
}

/// Uses the z already carried by the geometry.
#[derive(Debug, Clone, Copy, Default)]
pub struct VertexElevation;

impl ElevationSampler for VertexElevation {
    fn sample(&self, p: &Point3) -> Option<f64> {
        Some(p.z)
    }
}

fn elevation_at<S: ElevationSampler + ?Sized>(sampler: &S, p: &Point3) -> f64 {
    sampler.sample(p).unwrap_or(p.z)
}

/// One sample per path vertex, in path order.
///
/// The node shared by consecutive edges appears once.
///
/// # Errors
/// `UnknownEdge` if `path` was not produced by `alignment`.
pub fn assemble_profile<S>(alignment: &Alignment, path: &Path, sampler: &S) -> Result<Vec<ProfileSample>>
where
    S: ElevationSampler + ?Sized,
{
    let mut samples = Vec::new();
    for (i, (edge_id, start, _)) in path.iter().enumerate() {
        let geometry = &alignment.edge(edge_id)?.geometry;
        let skip = usize::from(i > 0);
        for (v, &m) in geometry
            .vertices()
            .iter()
            .zip(geometry.measures())
            .skip(skip)
        {
            samples.push(ProfileSample {
                address: PathAddress {
                    edge: edge_id,
                    measure: m,
                    path_distance: start + m,
                },
                coord: *v,
                elevation: elevation_at(sampler, v),
                kind: SampleKind::Vertex,
            });
        }
    }

    debug!(samples = samples.len(), edges = path.edges().len(), "assembled profile");
    Ok(samples)
}

/// Vertex profile merged with stations every `spacing` units.
///
/// Stations are flagged [`SampleKind::Interpolated`]; a station falling on a
/// vertex (within a relative 1e-9) is dropped in favour of the vertex.
///
/// # Errors
/// - `InvalidSpacing` if `spacing` is not a positive number
/// - `UnknownEdge` if `path` was not produced by `alignment`
pub fn assemble_station_profile<S>(
    alignment: &Alignment,
    path: &Path,
    spacing: f64,
    sampler: &S,
) -> Result<Vec<ProfileSample>>
where
    S: ElevationSampler + ?Sized,
{
    let addresses = station_addresses(path, spacing)?;
    let vertices = assemble_profile(alignment, path, sampler)?;
    let tolerance = 1e-9 * path.length().max(1.0);

    let mut stations = Vec::with_capacity(addresses.len());
    for address in addresses {
        let coord = to_coordinate(alignment, &address.address())?.coord;
        stations.push(ProfileSample {
            address,
            coord,
            elevation: elevation_at(sampler, &coord),
            kind: SampleKind::Interpolated,
        });
    }

    let mut merged = Vec::with_capacity(vertices.len() + stations.len());
    let mut vs = vertices.into_iter().peekable();
    let mut ss = stations.into_iter().peekable();
    loop {
        match (vs.peek(), ss.peek()) {
            (Some(v), Some(s)) => {
                if (v.distance() - s.distance()).abs() <= tolerance {
                    ss.next();
                } else if v.distance() < s.distance() {
                    merged.extend(vs.next());
                } else {
                    merged.extend(ss.next());
                }
            }
            (Some(_), None) => merged.extend(vs.next()),
            (None, Some(_)) => merged.extend(ss.next()),
            (None, None) => break,
        }
    }

    debug!(samples = merged.len(), spacing, "assembled station profile");
    Ok(merged)
}
