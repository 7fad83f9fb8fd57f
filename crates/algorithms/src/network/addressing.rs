//! Address ↔ coordinate mapping
//!
//! Resolves `(edge, measure)` addresses to 3D coordinates, lifts them onto a
//! path's cumulative distance axis, and builds per-edge address tables that
//! stitch all edges into one coordinate system (either edge-local or
//! measured from a chosen outlet).

use reachline_core::{
    Address, Alignment, Boundary, Direction, EdgeId, Error, Located, NodeId, Path, PathAddress,
    Result,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Addresses of an edge's two end nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeAddress {
    pub edge: EdgeId,
    pub from_node: NodeId,
    pub to_node: NodeId,
    pub length: f64,
    /// Address of the upstream node
    pub from_address: f64,
    /// Address of the downstream node
    pub to_address: f64,
}

/// Resolve an address to a coordinate.
///
/// Measures outside `[0, edge length]` are clamped to the nearest node and
/// flagged through [`Located::boundary`] rather than rejected.
///
/// # Errors
/// - `UnknownEdge` if the edge is not in the alignment
/// - `InvalidParameter` for a NaN measure
pub fn to_coordinate(alignment: &Alignment, address: &Address) -> Result<Located> {
    let edge = alignment.edge(address.edge)?;
    let m = address.measure;
    if m.is_nan() {
        return Err(Error::invalid_parameter("measure", m, "must be a number"));
    }

    let boundary = if m < 0.0 {
        Boundary::BeforeStart
    } else if m > edge.length() {
        Boundary::PastEnd
    } else {
        Boundary::Within
    };

    Ok(Located {
        coord: edge.geometry.interpolate(m),
        boundary,
    })
}

/// Lift an edge address onto a path: the lengths of the path edges preceding
/// `edge` plus `measure`.
///
/// `measure` is clamped to `[0, edge length]`, so the result always stays on
/// `edge` rather than spilling onto its neighbours. Use [`to_coordinate`] to
/// learn whether a measure was out of range.
///
/// # Errors
/// - `NotOnPath` if `edge` is not a member of `path`
/// - `InvalidParameter` for a NaN measure
pub fn to_path_address(path: &Path, edge: EdgeId, measure: f64) -> Result<PathAddress> {
    if measure.is_nan() {
        return Err(Error::invalid_parameter("measure", measure, "must be a number"));
    }
    let (offset, length) = path
        .offset_of(edge)
        .zip(path.edge_length(edge))
        .ok_or(Error::NotOnPath { edge })?;
    let measure = measure.clamp(0.0, length);
    Ok(PathAddress {
        edge,
        measure,
        path_distance: offset + measure,
    })
}

/// The path address at cumulative distance `distance`, clamped to the path.
pub fn path_address_at(path: &Path, distance: f64) -> PathAddress {
    let d = distance.clamp(0.0, path.length());
    let (edge, measure) = path.locate(d);
    PathAddress {
        edge,
        measure,
        path_distance: d,
    }
}

/// Edge-local address table: the upstream node of every edge sits at 0 and
/// the downstream node at the edge length.
pub fn edge_addresses(alignment: &Alignment) -> BTreeMap<EdgeId, EdgeAddress> {
    alignment
        .edges()
        .iter()
        .map(|e| {
            (
                e.id,
                EdgeAddress {
                    edge: e.id,
                    from_node: e.from,
                    to_node: e.to,
                    length: e.length(),
                    from_address: 0.0,
                    to_address: e.length(),
                },
            )
        })
        .collect()
}

/// Address table measured as distance upstream from `outlet`.
///
/// Each node's address is its shortest downstream path length to the
/// outlet. Edges that do not drain to `outlet` are left out.
///
/// # Errors
/// `UnknownNode` if `outlet` is not in the alignment.
pub fn outlet_addresses(alignment: &Alignment, outlet: NodeId) -> Result<BTreeMap<EdgeId, EdgeAddress>> {
    alignment.node(outlet)?;

    let mut distance = vec![f64::INFINITY; alignment.node_count()];
    distance[outlet.0] = 0.0;
    // downstream nodes come last in topological order
    for node in alignment.topological_order().into_iter().rev() {
        for e in alignment.edges_incident(node, Direction::Downstream)? {
            let edge = alignment.edge(e)?;
            let via = distance[edge.to.0] + edge.length();
            if via < distance[node.0] {
                distance[node.0] = via;
            }
        }
    }

    let table = alignment
        .edges()
        .iter()
        .filter(|e| distance[e.to.0].is_finite())
        .map(|e| {
            (
                e.id,
                EdgeAddress {
                    edge: e.id,
                    from_node: e.from,
                    to_node: e.to,
                    length: e.length(),
                    from_address: distance[e.from.0],
                    to_address: distance[e.to.0],
                },
            )
        })
        .collect();
    Ok(table)
}

/// Distance from an address to the outlet of an outlet-relative table built
/// by [`outlet_addresses`], measured along the address's own edge.
pub fn distance_to_outlet(table: &BTreeMap<EdgeId, EdgeAddress>, address: &Address) -> Option<f64> {
    table
        .get(&address.edge)
        .map(|ea| ea.to_address + (ea.length - address.measure).clamp(0.0, ea.length))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reachline_core::{build_alignment, Point3, Polyline};

    fn network() -> Alignment {
        build_alignment(vec![
            Polyline::from_iter([(0.0, 100.0, 30.0), (50.0, 50.0, 20.0)]),
            Polyline::from_iter([(100.0, 100.0, 32.0), (75.0, 75.0, 26.0), (50.0, 50.0, 20.0)]),
            Polyline::from_iter([(50.0, 50.0, 20.0), (50.0, 20.0, 15.0), (50.0, 0.0, 10.0)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_round_trip_on_node_coordinates() {
        let a = network();
        let outlet = a.outlet().unwrap();
        for source in a.sources() {
            let path = a.path(source, outlet).unwrap();
            for &edge_id in path.edges() {
                let edge = a.edge(edge_id).unwrap();
                let start = to_path_address(&path, edge_id, 0.0).unwrap();
                let end = to_path_address(&path, edge_id, edge.length()).unwrap();

                let p0 = to_coordinate(&a, &start.address()).unwrap();
                let p1 = to_coordinate(&a, &end.address()).unwrap();
                assert_eq!(p0.coord, a.node(edge.from).unwrap().coord);
                assert_eq!(p1.coord, a.node(edge.to).unwrap().coord);
                assert!(!p0.is_clamped() && !p1.is_clamped());
            }
        }
    }

    #[test]
    fn test_interpolates_z() {
        let a = network();
        let loc = to_coordinate(&a, &Address::new(EdgeId(2), 40.0)).unwrap();
        assert!((loc.coord.y - 10.0).abs() < 1e-12);
        assert!((loc.coord.z - 12.5).abs() < 1e-12);
        assert_eq!(loc.boundary, Boundary::Within);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let a = network();
        let past = to_coordinate(&a, &Address::new(EdgeId(2), 75.0)).unwrap();
        assert_eq!(past.boundary, Boundary::PastEnd);
        assert_eq!(past.coord, Point3::new(50.0, 0.0, 10.0));

        let before = to_coordinate(&a, &Address::new(EdgeId(2), -1.0)).unwrap();
        assert_eq!(before.boundary, Boundary::BeforeStart);
        assert_eq!(before.coord, Point3::new(50.0, 50.0, 20.0));

        assert_eq!(
            to_coordinate(&a, &Address::new(EdgeId(7), 1.0)).unwrap_err(),
            Error::UnknownEdge(EdgeId(7))
        );
    }

    #[test]
    fn test_not_on_path() {
        let a = network();
        let path = a.path(a.edge(EdgeId(0)).unwrap().from, a.outlet().unwrap()).unwrap();
        assert_eq!(
            to_path_address(&path, EdgeId(1), 3.0).unwrap_err(),
            Error::NotOnPath { edge: EdgeId(1) }
        );
        let pa = to_path_address(&path, EdgeId(2), 3.0).unwrap();
        let e0 = a.edge(EdgeId(0)).unwrap().length();
        assert!((pa.path_distance - (e0 + 3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_path_address_measure_clamped_to_edge() {
        let a = network();
        let path = a.path(a.edge(EdgeId(0)).unwrap().from, a.outlet().unwrap()).unwrap();
        let e0 = a.edge(EdgeId(0)).unwrap().length();

        let before = to_path_address(&path, EdgeId(2), -10.0).unwrap();
        assert_eq!(before.measure, 0.0);
        assert!((before.path_distance - e0).abs() < 1e-12);

        let past = to_path_address(&path, EdgeId(0), e0 + 25.0).unwrap();
        assert_eq!(past.edge, EdgeId(0));
        assert_eq!(past.measure, e0);
        assert!((past.path_distance - e0).abs() < 1e-12);

        assert!(matches!(
            to_path_address(&path, EdgeId(0), f64::NAN),
            Err(Error::InvalidParameter { name: "measure", .. })
        ));
    }

    #[test]
    fn test_path_address_at_inverts_to_path_address() {
        let a = network();
        let path = a.path(a.edge(EdgeId(1)).unwrap().from, a.outlet().unwrap()).unwrap();
        let pa = path_address_at(&path, 80.0);
        let back = to_path_address(&path, pa.edge, pa.measure).unwrap();
        assert!((back.path_distance - 80.0).abs() < 1e-9);
        assert_eq!(path_address_at(&path, -4.0).path_distance, 0.0);
        assert_eq!(path_address_at(&path, 1e6).path_distance, path.length());
    }

    #[test]
    fn test_edge_addresses_table() {
        let a = network();
        let table = edge_addresses(&a);
        assert_eq!(table.len(), 3);
        let e2 = table[&EdgeId(2)];
        assert_eq!(e2.from_address, 0.0);
        assert_eq!(e2.to_address, 50.0);
        assert_eq!(e2.from_node, a.edge(EdgeId(2)).unwrap().from);
    }

    #[test]
    fn test_outlet_addresses() {
        let a = network();
        let outlet = a.outlet().unwrap();
        let table = outlet_addresses(&a, outlet).unwrap();
        assert_eq!(table.len(), 3);

        let e2 = table[&EdgeId(2)];
        assert_eq!(e2.to_address, 0.0);
        assert_eq!(e2.from_address, 50.0);

        let e0 = table[&EdgeId(0)];
        assert_eq!(e0.to_address, 50.0);
        assert!((e0.from_address - (50.0 + a.edge(EdgeId(0)).unwrap().length())).abs() < 1e-9);

        let d = distance_to_outlet(&table, &Address::new(EdgeId(2), 20.0)).unwrap();
        assert!((d - 30.0).abs() < 1e-12);
    }
}
