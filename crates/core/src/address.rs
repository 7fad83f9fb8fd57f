//! Network addresses
//!
//! An [`Address`] names a location as an edge plus a distance along it. A
//! [`PathAddress`] adds the cumulative distance from the origin of a chosen
//! path, which is the horizontal axis of a long profile.

use crate::alignment::EdgeId;
use crate::geometry::Point3;
use serde::{Deserialize, Serialize};

/// A location on the network: distance `measure` along `edge`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub edge: EdgeId,
    pub measure: f64,
}

impl Address {
    pub fn new(edge: EdgeId, measure: f64) -> Self {
        Self { edge, measure }
    }
}

/// An [`Address`] together with its cumulative distance along a path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathAddress {
    pub edge: EdgeId,
    pub measure: f64,
    pub path_distance: f64,
}

impl PathAddress {
    pub fn address(&self) -> Address {
        Address::new(self.edge, self.measure)
    }
}

/// Whether a requested measure had to be clamped onto the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Boundary {
    Within,
    /// Measure was negative; clamped to the upstream node
    BeforeStart,
    /// Measure exceeded the edge length; clamped to the downstream node
    PastEnd,
}

/// A resolved address.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Located {
    pub coord: Point3,
    pub boundary: Boundary,
}

impl Located {
    pub fn is_clamped(&self) -> bool {
        self.boundary != Boundary::Within
    }
}
