//! Topology repair
//!
//! Digitized networks often have reaches that should meet but stop a hair
//! short of each other. Repair finds dangling endpoints (nodes touched by a
//! single edge), pairs those that agree to a given number of decimal places,
//! and merges each pair onto one node. Endpoints without a partner, or whose
//! merge would close a flow loop, are reported back; nothing is forced.

use reachline_core::{Alignment, EdgeId, Error, NodeId, Point3, Polyline, Result};
use rstar::primitives::GeomWithData;
use rstar::{RTree, AABB};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Parameters for topology repair
#[derive(Debug, Clone, Copy)]
pub struct RepairParams {
    /// Endpoints match when each planar coordinate differs by less than
    /// half a unit in this decimal place. Default: 6
    pub decimal_precision: u32,
}

impl Default for RepairParams {
    fn default() -> Self {
        Self {
            decimal_precision: 6,
        }
    }
}

/// Which end of an edge a node sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeEnd {
    Start,
    End,
}

/// A node of degree one, with the single edge that touches it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DanglingEndpoint {
    pub node: NodeId,
    pub edge: EdgeId,
    pub end: EdgeEnd,
    pub coord: Point3,
}

/// Two dangling endpoints merged onto `coord`.
///
/// Node ids refer to the alignment passed to [`repair`]; the repaired
/// alignment numbers its nodes afresh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snap {
    pub a: DanglingEndpoint,
    pub b: DanglingEndpoint,
    pub coord: Point3,
}

#[derive(Debug, Clone)]
pub struct RepairReport {
    /// Rebuilt alignment; edge ids are unchanged
    pub alignment: Alignment,
    pub snaps: Vec<Snap>,
    /// Dangling endpoints left unmerged, in node order: those without a
    /// partner and those whose merge would have closed a flow loop
    pub unresolved: Vec<DanglingEndpoint>,
}

/// All nodes of degree one, in ascending node order.
pub fn dangling_endpoints(alignment: &Alignment) -> Vec<DanglingEndpoint> {
    let mut dangling: Vec<DanglingEndpoint> = alignment
        .edges()
        .iter()
        .flat_map(|e| [(e.from, e.id, EdgeEnd::Start), (e.to, e.id, EdgeEnd::End)])
        .filter(|&(node, _, _)| alignment.degree(node) == 1)
        .map(|(node, edge, end)| DanglingEndpoint {
            node,
            edge,
            end,
            coord: alignment.nodes()[node.0].coord,
        })
        .collect();
    dangling.sort_by_key(|d| d.node);
    dangling
}

/// Snap matching dangling endpoints together and rebuild the alignment.
///
/// Dangling endpoints are visited in ascending node order. Each unmatched
/// one is paired with its nearest unmatched match (lower node id on ties),
/// never with the other end of its own edge. The pair is merged at the first
/// endpoint's coordinate rounded to `decimal_precision` places. A merge that
/// would connect two nodes already joined by a directed route closes a loop;
/// it is skipped and both endpoints stay unresolved.
///
/// # Errors
/// - `InvalidParameter` for a precision above 15 decimal places
/// - any error from rebuilding the alignment
pub fn repair(alignment: &Alignment, params: RepairParams) -> Result<RepairReport> {
    let n = params.decimal_precision;
    if n > 15 {
        return Err(Error::invalid_parameter(
            "decimal_precision",
            n,
            "at most 15 decimal places are meaningful for f64",
        ));
    }
    let tolerance = 0.5 * 10f64.powi(-(n as i32));

    let dangling = dangling_endpoints(alignment);
    let tree = RTree::bulk_load(
        dangling
            .iter()
            .enumerate()
            .map(|(i, d)| GeomWithData::new([d.coord.x, d.coord.y], i))
            .collect(),
    );
    let mut matched = vec![false; dangling.len()];
    let mut groups = NodeGroups::new(alignment);
    let mut snaps = Vec::new();

    for i in 0..dangling.len() {
        if matched[i] {
            continue;
        }
        let a = dangling[i];
        let window = AABB::from_corners(
            [a.coord.x - tolerance, a.coord.y - tolerance],
            [a.coord.x + tolerance, a.coord.y + tolerance],
        );
        let best = tree
            .locate_in_envelope_intersecting(&window)
            .map(|candidate| candidate.data)
            .filter(|&j| {
                let b = &dangling[j];
                j != i && !matched[j] && b.edge != a.edge && coincide(&a.coord, &b.coord, tolerance)
            })
            .map(|j| (j, a.coord.planar_distance_sq(&dangling[j].coord)))
            .min_by(|x, y| x.1.total_cmp(&y.1).then(x.0.cmp(&y.0)));
        let Some((j, _)) = best else {
            continue;
        };

        let b = dangling[j];
        if groups.joined_by_flow(a.node, b.node) {
            warn!(
                a = %a.node,
                b = %b.node,
                "skipped merge that would close a flow loop"
            );
            continue;
        }
        groups.union(a.node, b.node);
        matched[i] = true;
        matched[j] = true;

        let snap = Snap {
            a,
            b,
            coord: a.coord.round_planar(n),
        };
        info!(
            a = %snap.a.node,
            b = %snap.b.node,
            x = snap.coord.x,
            y = snap.coord.y,
            "snapped dangling endpoints"
        );
        snaps.push(snap);
    }

    let unresolved: Vec<DanglingEndpoint> = dangling
        .iter()
        .zip(&matched)
        .filter(|(_, &m)| !m)
        .map(|(d, _)| *d)
        .collect();
    debug!(
        dangling = dangling.len(),
        snapped = snaps.len(),
        unresolved = unresolved.len(),
        decimal_precision = n,
        "repaired topology"
    );

    let alignment = if snaps.is_empty() {
        alignment.clone()
    } else {
        let mut polylines: Vec<Polyline> = alignment.edges().iter().map(|e| e.to_polyline()).collect();
        for snap in &snaps {
            for end in [&snap.a, &snap.b] {
                let vertices = &mut polylines[end.edge.0].vertices;
                let slot = match end.end {
                    EdgeEnd::Start => vertices.first_mut(),
                    EdgeEnd::End => vertices.last_mut(),
                };
                if let Some(v) = slot {
                    *v = snap.coord;
                }
            }
        }
        Alignment::build(polylines, *alignment.params())?
    };

    Ok(RepairReport {
        alignment,
        snaps,
        unresolved,
    })
}

fn coincide(a: &Point3, b: &Point3, tolerance: f64) -> bool {
    (a.x - b.x).abs() < tolerance && (a.y - b.y).abs() < tolerance
}

/// Nodes merged so far, as a union-find over the input alignment's nodes.
struct NodeGroups<'a> {
    alignment: &'a Alignment,
    parent: Vec<usize>,
}

impl<'a> NodeGroups<'a> {
    fn new(alignment: &'a Alignment) -> Self {
        Self {
            alignment,
            parent: (0..alignment.node_count()).collect(),
        }
    }

    fn find(&mut self, mut n: usize) -> usize {
        while self.parent[n] != n {
            self.parent[n] = self.parent[self.parent[n]];
            n = self.parent[n];
        }
        n
    }

    fn union(&mut self, a: NodeId, b: NodeId) {
        let (ra, rb) = (self.find(a.0), self.find(b.0));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }

    /// Whether a directed route over the merged network runs from either
    /// node to the other.
    fn joined_by_flow(&mut self, a: NodeId, b: NodeId) -> bool {
        let (ra, rb) = (self.find(a.0), self.find(b.0));
        if ra == rb {
            return true;
        }
        let alignment = self.alignment;
        let mut successors = vec![Vec::new(); self.parent.len()];
        for e in alignment.edges() {
            let (from, to) = (self.find(e.from.0), self.find(e.to.0));
            successors[from].push(to);
        }
        reaches(&successors, ra, rb) || reaches(&successors, rb, ra)
    }
}

fn reaches(successors: &[Vec<usize>], from: usize, to: usize) -> bool {
    let mut seen = vec![false; successors.len()];
    let mut stack = vec![from];
    while let Some(g) = stack.pop() {
        if g == to {
            return true;
        }
        if std::mem::replace(&mut seen[g], true) {
            continue;
        }
        stack.extend(&successors[g]);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use reachline_core::build_alignment;

    fn near_miss() -> Alignment {
        build_alignment(vec![
            Polyline::from_iter([(-10.0, 0.0, 5.0), (0.00004, 0.0, 4.0)]),
            Polyline::from_iter([(0.00006, 0.0, 4.0), (10.0, 0.0, 3.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_merges_at_four_decimals() {
        let a = near_miss();
        assert_eq!(a.component_count(), 2);

        let report = repair(&a, RepairParams { decimal_precision: 4 }).unwrap();
        assert_eq!(report.snaps.len(), 1);
        let snap = report.snaps[0];
        assert_eq!((snap.coord.x, snap.coord.y), (0.0, 0.0));
        assert_eq!((snap.a.edge, snap.a.end), (EdgeId(0), EdgeEnd::End));
        assert_eq!((snap.b.edge, snap.b.end), (EdgeId(1), EdgeEnd::Start));

        let fixed = &report.alignment;
        assert_eq!(fixed.component_count(), 1);
        assert_eq!(fixed.node_count(), 3);
        let e0 = fixed.edge(EdgeId(0)).unwrap();
        let e1 = fixed.edge(EdgeId(1)).unwrap();
        assert_eq!(e0.to, e1.from);
        assert_eq!(e0.geometry.last().x, 0.0);
        // the source and the outlet are still dangling
        assert_eq!(report.unresolved.len(), 2);
    }

    #[test]
    fn test_no_merge_at_six_decimals() {
        let a = near_miss();
        let report = repair(&a, RepairParams::default()).unwrap();
        assert!(report.snaps.is_empty());
        assert_eq!(report.unresolved.len(), 4);
        assert_eq!(report.alignment.component_count(), 2);
        let nodes: Vec<NodeId> = report.unresolved.iter().map(|d| d.node).collect();
        assert_eq!(nodes, vec![NodeId(0), NodeId(1), NodeId(2), NodeId(3)]);
    }

    #[test]
    fn test_nearest_candidate_wins() {
        let a = build_alignment(vec![
            Polyline::from_iter([(-10.0, 0.0, 5.0), (0.00001, 0.0, 4.0)]),
            Polyline::from_iter([(0.00004, 0.0, 4.0), (10.0, 5.0, 3.0)]),
            Polyline::from_iter([(0.00002, 0.0, 4.0), (10.0, -5.0, 3.0)]),
        ])
        .unwrap();
        let report = repair(&a, RepairParams { decimal_precision: 4 }).unwrap();

        assert_eq!(report.snaps.len(), 1);
        assert_eq!(report.snaps[0].b.edge, EdgeId(2));
        let fixed = &report.alignment;
        assert_eq!(fixed.edge(EdgeId(0)).unwrap().to, fixed.edge(EdgeId(2)).unwrap().from);
        assert_ne!(fixed.edge(EdgeId(0)).unwrap().to, fixed.edge(EdgeId(1)).unwrap().from);
        assert!(report.unresolved.iter().any(|d| d.edge == EdgeId(1) && d.end == EdgeEnd::Start));
    }

    #[test]
    fn test_own_edge_never_matched() {
        let a = build_alignment(vec![Polyline::from_iter([(0.0, 0.0, 1.0), (0.00002, 0.0, 0.0)])]).unwrap();
        let report = repair(&a, RepairParams { decimal_precision: 4 }).unwrap();
        assert!(report.snaps.is_empty());
        assert_eq!(report.unresolved.len(), 2);
    }

    #[test]
    fn test_confluence_is_not_dangling() {
        let a = build_alignment(vec![
            Polyline::from_iter([(0.0, 10.0, 3.0), (5.0, 5.0, 2.0)]),
            Polyline::from_iter([(10.0, 10.0, 3.0), (5.0, 5.0, 2.0)]),
            Polyline::from_iter([(5.0, 5.0, 2.0), (5.0, 0.0, 1.0)]),
        ])
        .unwrap();
        let dangling = dangling_endpoints(&a);
        assert_eq!(dangling.len(), 3);
        assert!(dangling.iter().all(|d| a.degree(d.node) == 1));
    }

    #[test]
    fn test_loop_closing_merge_is_skipped() {
        let a = build_alignment(vec![
            // a reach doubling back on itself, both ends a hair apart
            Polyline::from_iter([(0.0, 0.0, 2.0), (10.0, 0.0, 1.0)]),
            Polyline::from_iter([(10.0, 0.00001, 1.0), (0.0, 0.00001, 0.0)]),
            // an ordinary gap further downstream
            Polyline::from_iter([(50.0, 0.0, 5.0), (60.0, 0.0, 4.0)]),
            Polyline::from_iter([(60.0, 0.00001, 4.0), (70.0, 0.0, 3.0)]),
        ])
        .unwrap();
        let report = repair(&a, RepairParams { decimal_precision: 4 }).unwrap();

        assert_eq!(report.snaps.len(), 2);
        assert_eq!((report.snaps[0].a.edge, report.snaps[0].b.edge), (EdgeId(0), EdgeId(1)));
        assert_eq!((report.snaps[1].a.edge, report.snaps[1].b.edge), (EdgeId(2), EdgeId(3)));

        let fixed = &report.alignment;
        assert_eq!(fixed.edge(EdgeId(2)).unwrap().to, fixed.edge(EdgeId(3)).unwrap().from);
        assert_ne!(fixed.edge(EdgeId(0)).unwrap().to, fixed.edge(EdgeId(1)).unwrap().from);
        assert!(report
            .unresolved
            .iter()
            .any(|d| d.edge == EdgeId(0) && d.end == EdgeEnd::End));
        assert!(report
            .unresolved
            .iter()
            .any(|d| d.edge == EdgeId(1) && d.end == EdgeEnd::Start));
        assert_eq!(report.unresolved.len(), 4);
    }

    #[test]
    fn test_precision_out_of_range() {
        let a = near_miss();
        assert!(matches!(
            repair(&a, RepairParams { decimal_precision: 16 }),
            Err(Error::InvalidParameter { name: "decimal_precision", .. })
        ));
    }
}
