//! Evenly spaced stations
//!
//! Along a single path, stations count up from the path origin. Over a whole
//! network they count up from the outlet instead, so that stations on
//! tributaries line up with those on the main stem.

use crate::network::addressing::{outlet_addresses, path_address_at, to_coordinate};
use reachline_core::{Address, Alignment, Direction, Error, NodeId, Path, PathAddress, Point3, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A station: a path address and the coordinate it resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub address: PathAddress,
    pub coord: Point3,
}

/// A point on the network addressed both by edge and by distance to an
/// outlet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkPoint {
    pub address: Address,
    pub coord: Point3,
    /// Distance along the network from this point down to the outlet
    pub outlet_distance: f64,
}

/// Path addresses at `0, spacing, 2·spacing, …` plus the path end.
///
/// The terminal station is always present; when the path length is a
/// multiple of `spacing` (within a relative 1e-9) it is not repeated.
///
/// # Errors
/// `InvalidSpacing` if `spacing` is not a positive number, or is so small
/// that the station count cannot be represented.
pub fn station_addresses(path: &Path, spacing: f64) -> Result<Vec<PathAddress>> {
    if !(spacing > 0.0) || !spacing.is_finite() {
        return Err(Error::InvalidSpacing { spacing });
    }

    let length = path.length();
    let tolerance = 1e-9 * length.max(1.0);
    let count = interior_count::<PathAddress>(length - tolerance, 0.0, spacing)?;

    let mut addresses: Vec<PathAddress> = (0..count)
        .map(|k| path_address_at(path, k as f64 * spacing))
        .collect();
    addresses.push(path_address_at(path, length));

    Ok(addresses)
}

/// Number of positions `start + k·spacing` strictly below `end`, checked
/// against the largest allocation of `T` a `Vec` can hold.
fn interior_count<T>(end: f64, start: f64, spacing: f64) -> Result<usize> {
    let limit = isize::MAX as usize / std::mem::size_of::<T>().max(1);
    let n = ((end - start) / spacing).ceil().max(0.0);
    if !(n < limit as f64) {
        return Err(Error::InvalidSpacing { spacing });
    }
    // the quotient can round either way
    let mut n = n as usize;
    while n > 0 && start + (n - 1) as f64 * spacing >= end {
        n -= 1;
    }
    while n < limit && start + n as f64 * spacing < end {
        n += 1;
    }
    Ok(n)
}

/// Generate stations every `spacing` units along `path`.
///
/// # Errors
/// - `InvalidSpacing` if `spacing` is not a positive number or is too fine to count
/// - `UnknownEdge` if `path` was not produced by `alignment`
pub fn generate_stations(alignment: &Alignment, path: &Path, spacing: f64) -> Result<Vec<Station>> {
    let stations = station_addresses(path, spacing)?
        .into_iter()
        .map(|address| {
            to_coordinate(alignment, &address.address()).map(|loc| Station {
                address,
                coord: loc.coord,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        stations = stations.len(),
        spacing,
        length = path.length(),
        "generated stations"
    );
    Ok(stations)
}

/// Stations over every edge draining to `outlet`, placed so that each one
/// sits a whole number of `step`s upstream of the outlet.
///
/// On each edge the first station falls at measure
/// `(to_address + length) mod step` and the rest follow every `step`. Each
/// edge owns its stations on `[start, length)`, so a station on a confluence
/// is emitted once, by the edge leaving it. The outlet node itself gets a
/// final station on its lowest-id incoming edge. Edges are visited in id
/// order.
///
/// # Errors
/// - `InvalidSpacing` if `step` is not a positive number or is too fine to count
/// - `UnknownNode` if `outlet` is not in the alignment
pub fn network_stations(alignment: &Alignment, outlet: NodeId, step: f64) -> Result<Vec<NetworkPoint>> {
    if !(step > 0.0) || !step.is_finite() {
        return Err(Error::InvalidSpacing { spacing: step });
    }
    let table = outlet_addresses(alignment, outlet)?;

    let mut stations = Vec::new();
    for ea in table.values() {
        let edge = alignment.edge(ea.edge)?;
        let tolerance = 1e-9 * ea.length.max(1.0);
        let upstream = ea.to_address + ea.length;
        let mut start = upstream.rem_euclid(step);
        if step - start <= tolerance {
            start = 0.0;
        }
        let count = interior_count::<NetworkPoint>(ea.length - tolerance, start, step)?;
        stations.extend((0..count).map(|k| {
            let m = start + k as f64 * step;
            NetworkPoint {
                address: Address::new(ea.edge, m),
                coord: edge.geometry.interpolate(m),
                outlet_distance: upstream - m,
            }
        }));
    }

    if let Some(last) = alignment
        .edges_incident(outlet, Direction::Upstream)?
        .into_iter()
        .filter(|e| table.contains_key(e))
        .min()
    {
        let edge = alignment.edge(last)?;
        stations.push(NetworkPoint {
            address: Address::new(last, edge.length()),
            coord: alignment.node(outlet)?.coord,
            outlet_distance: 0.0,
        });
    }

    debug!(
        stations = stations.len(),
        edges = table.len(),
        step,
        outlet = %outlet,
        "generated network stations"
    );
    Ok(stations)
}

/// Every vertex of every edge draining to `outlet`, tagged with its
/// distance to the outlet. Shared nodes appear once per incident edge.
///
/// # Errors
/// `UnknownNode` if `outlet` is not in the alignment.
pub fn network_vertices(alignment: &Alignment, outlet: NodeId) -> Result<Vec<NetworkPoint>> {
    let table = outlet_addresses(alignment, outlet)?;
    let mut vertices = Vec::new();
    for ea in table.values() {
        let line = &alignment.edge(ea.edge)?.geometry;
        let upstream = ea.to_address + ea.length;
        vertices.extend(line.vertices().iter().zip(line.measures()).map(|(v, &m)| NetworkPoint {
            address: Address::new(ea.edge, m),
            coord: *v,
            outlet_distance: upstream - m,
        }));
    }
    Ok(vertices)
}
