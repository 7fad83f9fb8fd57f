//! Corridor buffer
//!
//! Builds a planar buffer polygon around a selection of reaches. Every
//! segment is buffered as a capsule (a rectangle with a semicircular cap at
//! each end) and the capsules are unioned. A disconnected selection yields
//! one polygon per connected part.

use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};
use reachline_core::{Alignment, EdgeId, Error, Path, Result, Segment};
use std::f64::consts::PI;
use tracing::debug;

/// Parameters for buffer operations
#[derive(Debug, Clone)]
pub struct BufferParams {
    /// Buffer distance, must be positive
    pub distance: f64,
    /// Number of segments approximating each semicircular cap (default: 16)
    pub segments: usize,
}

impl Default for BufferParams {
    fn default() -> Self {
        Self {
            distance: 1.0,
            segments: 16,
        }
    }
}

/// Which reaches to buffer.
#[derive(Debug, Clone, Copy)]
pub enum Corridor<'a> {
    /// Every edge of the alignment
    Network,
    /// The edges of one path
    Path(&'a Path),
    /// An explicit edge subset
    Edges(&'a [EdgeId]),
}

/// Buffer a single segment as a capsule.
///
/// The ring runs counter-clockwise: around the downstream cap first, then
/// back around the upstream cap.
pub fn buffer_segment(segment: &Segment, params: &BufferParams) -> Polygon<f64> {
    let n = params.segments.max(2);
    let r = params.distance.abs();
    let heading = (segment.end.y - segment.start.y).atan2(segment.end.x - segment.start.x);

    let mut coords = Vec::with_capacity(2 * (n + 1) + 1);
    for (center, from) in [(segment.end, heading - PI / 2.0), (segment.start, heading + PI / 2.0)] {
        for i in 0..=n {
            let angle = from + PI * i as f64 / n as f64;
            coords.push(Coord {
                x: center.x + r * angle.cos(),
                y: center.y + r * angle.sin(),
            });
        }
    }
    // Close the ring
    coords.push(coords[0]);

    Polygon::new(LineString::from(coords), vec![])
}

/// Buffer the selected reaches by `params.distance`.
///
/// # Errors
/// - `InvalidBuffer` if the distance is not a positive number
/// - `UnknownEdge` if an explicit edge is not in the alignment
pub fn buffer_corridor(
    alignment: &Alignment,
    corridor: Corridor<'_>,
    params: &BufferParams,
) -> Result<MultiPolygon<f64>> {
    if !(params.distance > 0.0) || !params.distance.is_finite() {
        return Err(Error::InvalidBuffer {
            distance: params.distance,
        });
    }

    let edges: Vec<EdgeId> = match corridor {
        Corridor::Network => alignment.edges().iter().map(|e| e.id).collect(),
        Corridor::Path(path) => path.edges().to_vec(),
        Corridor::Edges(edges) => edges.to_vec(),
    };

    let mut capsules = Vec::new();
    for id in &edges {
        let edge = alignment.edge(*id)?;
        capsules.extend(
            edge.geometry
                .segments()
                .map(|s| MultiPolygon::new(vec![buffer_segment(&s, params)])),
        );
    }

    let corridor = union_all(capsules);
    debug!(
        edges = edges.len(),
        polygons = corridor.0.len(),
        distance = params.distance,
        "buffered corridor"
    );
    Ok(corridor)
}

/// Union polygons pairwise, halving the list each round.
fn union_all(mut parts: Vec<MultiPolygon<f64>>) -> MultiPolygon<f64> {
    while parts.len() > 1 {
        parts = parts
            .chunks(2)
            .map(|pair| match pair {
                [a, b] => a.union(b),
                [a] => a.clone(),
                _ => MultiPolygon::new(vec![]),
            })
            .collect();
    }
    parts.pop().unwrap_or_else(|| MultiPolygon::new(vec![]))
}
