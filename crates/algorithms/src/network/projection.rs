//! Point projection onto the network
//!
//! Locates external observations (terrace points, surveyed features, ...) by
//! address along the nearest edge. Candidate edges come from an R-tree of
//! their segments queried within the search radius; each point is then
//! projected perpendicularly onto every segment of every candidate, and the
//! globally closest edge wins. Points farther than the search radius are excluded and reported
//! by input index.
//!
//! Kept results come back in input order with their external id attached.

use crate::maybe_rayon::map_indexed;
use reachline_core::{Address, Alignment, EdgeId, Error, Point3, Result, Segment};
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// An external point to be located on the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedPoint {
    /// External feature identifier, carried through to the result
    pub id: String,
    pub coord: Point3,
}

impl ObservedPoint {
    pub fn new(id: impl Into<String>, coord: impl Into<Point3>) -> Self {
        Self {
            id: id.into(),
            coord: coord.into(),
        }
    }
}

/// Parameters for point projection
#[derive(Debug, Clone, Copy)]
pub struct ProjectionParams {
    /// Points farther than this planar distance from every candidate edge
    /// are excluded. Default: 100.0
    pub radius: f64,
    /// Distances within this tolerance count as a tie; ties go to the
    /// lower edge id. Default: 1e-9
    pub tie_tolerance: f64,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self {
            radius: 100.0,
            tie_tolerance: 1e-9,
        }
    }
}

/// One located point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    /// Position of the point in the input sequence
    pub index: usize,
    /// External identifier of the point
    pub id: String,
    pub address: Address,
    /// Projected position on the edge; z comes from the edge geometry
    pub projected: Point3,
    /// Signed offset: negative left of the flow direction, positive right
    pub offset: f64,
    /// Unsigned planar distance between the point and its projection
    pub distance: f64,
}

/// Outcome of projecting a batch of points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// Kept points, in input order
    pub results: Vec<ProjectionResult>,
    /// Input indices of points outside the search radius
    pub excluded: Vec<usize>,
}

impl Projection {
    pub fn excluded_count(&self) -> usize {
        self.excluded.len()
    }
}

/// Project points onto every edge of the alignment.
pub fn project_points(
    alignment: &Alignment,
    points: &[ObservedPoint],
    params: ProjectionParams,
) -> Result<Projection> {
    let edges: Vec<EdgeId> = alignment.edges().iter().map(|e| e.id).collect();
    project_points_onto(alignment, points, &edges, params)
}

/// Project points onto a subset of edges.
///
/// # Errors
/// - `InvalidParameter` for a non-positive radius or negative tie tolerance
/// - `UnknownEdge` if `edges` names an edge not in the alignment
pub fn project_points_onto(
    alignment: &Alignment,
    points: &[ObservedPoint],
    edges: &[EdgeId],
    params: ProjectionParams,
) -> Result<Projection> {
    if !(params.radius > 0.0) {
        return Err(Error::invalid_parameter(
            "radius",
            params.radius,
            "search radius must be positive",
        ));
    }
    if !(params.tie_tolerance >= 0.0) {
        return Err(Error::invalid_parameter(
            "tie_tolerance",
            params.tie_tolerance,
            "must be non-negative",
        ));
    }

    let mut candidates: Vec<EdgeId> = edges.to_vec();
    candidates.sort_unstable();
    candidates.dedup();
    let mut segments = Vec::new();
    for &id in &candidates {
        let edge = alignment.edge(id)?;
        segments.extend(edge.geometry.segments().map(|segment| EdgeSegment { edge: id, segment }));
    }
    let tree = RTree::bulk_load(segments);

    let nearest = map_indexed(points.len(), |i| nearest_edge(alignment, &tree, &points[i].coord, &params));

    let mut projection = Projection::default();
    for (index, (point, hit)) in points.iter().zip(nearest).enumerate() {
        match hit {
            Some(hit) => projection.results.push(ProjectionResult {
                index,
                id: point.id.clone(),
                address: Address::new(hit.edge, hit.measure),
                projected: hit.projected,
                offset: hit.offset,
                distance: hit.distance,
            }),
            None => projection.excluded.push(index),
        }
    }

    debug!(
        points = points.len(),
        kept = projection.results.len(),
        excluded = projection.excluded.len(),
        radius = params.radius,
        "projected points"
    );
    Ok(projection)
}

struct Hit {
    edge: EdgeId,
    measure: f64,
    projected: Point3,
    offset: f64,
    distance: f64,
}

/// One segment of a candidate edge, indexed by its planar bounding box.
struct EdgeSegment {
    edge: EdgeId,
    segment: Segment,
}

impl RTreeObject for EdgeSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let Segment { start, end } = self.segment;
        AABB::from_corners([start.x, start.y], [end.x, end.y])
    }
}

impl PointDistance for EdgeSegment {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let d = self.segment.project(&Point3::new(point[0], point[1], 0.0)).distance;
        d * d
    }
}

/// Closest candidate edge within the radius. Edges are visited in id order,
/// so keeping the incumbent on a tie prefers the lower id.
fn nearest_edge(
    alignment: &Alignment,
    tree: &RTree<EdgeSegment>,
    p: &Point3,
    params: &ProjectionParams,
) -> Option<Hit> {
    let mut near: Vec<EdgeId> = tree
        .locate_within_distance([p.x, p.y], params.radius * params.radius)
        .map(|s| s.edge)
        .collect();
    near.sort_unstable();
    near.dedup();

    let mut best: Option<Hit> = None;
    for id in near {
        let proj = alignment.edges()[id.0].geometry.project(p);
        let better = match &best {
            None => true,
            Some(b) => proj.distance < b.distance - params.tie_tolerance,
        };
        if better {
            best = Some(Hit {
                edge: id,
                measure: proj.measure,
                projected: proj.point,
                offset: proj.offset,
                distance: proj.distance,
            });
        }
    }

    best.filter(|b| b.distance <= params.radius)
}
