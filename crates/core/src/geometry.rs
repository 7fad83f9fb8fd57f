//! Measured 3D line geometry
//!
//! Reaches are stored as ordered 3D vertices with a cumulative along-line
//! measure. Measures are planar (x/y only); z is carried along and
//! interpolated linearly, so a draped centerline keeps the same stationing
//! as its 2D footprint.

use crate::error::{Error, Result};
use geo_types::{Coord, LineString};
use serde::{Deserialize, Serialize};

/// A 3D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Squared planar distance to another point
    #[inline]
    pub fn planar_distance_sq(&self, other: &Point3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Planar (x/y) Euclidean distance to another point
    #[inline]
    pub fn planar_distance(&self, other: &Point3) -> f64 {
        self.planar_distance_sq(other).sqrt()
    }

    /// Linear interpolation towards `other`; `t = 0` is `self`, `t = 1` is `other`.
    #[inline]
    pub fn lerp(&self, other: &Point3, t: f64) -> Point3 {
        Point3 {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }

    /// Round x and y to `decimals` places; z is left untouched.
    pub fn round_planar(&self, decimals: u32) -> Point3 {
        let scale = 10f64.powi(decimals as i32);
        Point3 {
            x: (self.x * scale).round() / scale,
            y: (self.y * scale).round() / scale,
            z: self.z,
        }
    }

    pub fn coord(&self) -> Coord<f64> {
        Coord { x: self.x, y: self.y }
    }
}

impl From<(f64, f64, f64)> for Point3 {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Point3::new(x, y, z)
    }
}

impl From<(f64, f64)> for Point3 {
    fn from((x, y): (f64, f64)) -> Self {
        Point3::new(x, y, 0.0)
    }
}

/// A straight piece of line between two vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Point3,
    pub end: Point3,
}

/// Closest point on a segment to some query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentProjection {
    /// Position along the segment, clamped to `[0, 1]`
    pub t: f64,
    /// Projected point (z interpolated from the segment)
    pub point: Point3,
    /// Planar distance from the query point to `point`
    pub distance: f64,
    /// Signed area term: positive when the query lies left of the segment direction
    pub side: f64,
}

impl Segment {
    pub fn new(start: Point3, end: Point3) -> Self {
        Self { start, end }
    }

    /// Planar length
    pub fn length(&self) -> f64 {
        self.start.planar_distance(&self.end)
    }

    /// Perpendicular projection of `p` onto the segment, clamped to the endpoints.
    pub fn project(&self, p: &Point3) -> SegmentProjection {
        let dx = self.end.x - self.start.x;
        let dy = self.end.y - self.start.y;
        let len_sq = dx * dx + dy * dy;
        let px = p.x - self.start.x;
        let py = p.y - self.start.y;

        let t = if len_sq > 0.0 {
            ((px * dx + py * dy) / len_sq).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let point = self.start.lerp(&self.end, t);

        SegmentProjection {
            t,
            point,
            distance: p.planar_distance(&point),
            side: dx * py - dy * px,
        }
    }
}

/// Result of projecting a point onto a whole [`MeasuredLine`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineProjection {
    /// Distance along the line of the projected point
    pub measure: f64,
    /// Projected point on the line
    pub point: Point3,
    /// Planar distance between the query point and the line
    pub distance: f64,
    /// Signed offset: negative left of the line direction, positive right
    pub offset: f64,
    /// Index of the segment holding the projection
    pub segment: usize,
}

/// An ordered vertex sequence with cumulative planar measures.
///
/// Invariants: at least two vertices, `measures[0] == 0`, measures strictly
/// increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasuredLine {
    vertices: Vec<Point3>,
    measures: Vec<f64>,
}

impl MeasuredLine {
    /// Build a measured line, dropping consecutive vertices that share a
    /// planar position.
    pub fn new(vertices: Vec<Point3>) -> Result<Self> {
        if vertices.is_empty() {
            return Err(Error::GeometryDegenerate {
                edge: None,
                reason: "empty polyline",
            });
        }
        if vertices
            .iter()
            .any(|v| !v.x.is_finite() || !v.y.is_finite() || v.z.is_nan())
        {
            return Err(Error::GeometryDegenerate {
                edge: None,
                reason: "non-finite coordinate",
            });
        }

        let mut kept: Vec<Point3> = Vec::with_capacity(vertices.len());
        let mut measures = Vec::with_capacity(vertices.len());
        let mut m = 0.0;
        for v in vertices {
            if let Some(prev) = kept.last() {
                let d = prev.planar_distance(&v);
                if d == 0.0 {
                    continue;
                }
                m += d;
            }
            kept.push(v);
            measures.push(m);
        }

        if kept.len() < 2 {
            return Err(Error::GeometryDegenerate {
                edge: None,
                reason: "zero-length polyline",
            });
        }

        Ok(Self {
            vertices: kept,
            measures,
        })
    }

    pub fn vertices(&self) -> &[Point3] {
        &self.vertices
    }

    /// Cumulative distance of each vertex from the first
    pub fn measures(&self) -> &[f64] {
        &self.measures
    }

    pub fn length(&self) -> f64 {
        self.measures[self.measures.len() - 1]
    }

    pub fn first(&self) -> Point3 {
        self.vertices[0]
    }

    pub fn last(&self) -> Point3 {
        self.vertices[self.vertices.len() - 1]
    }

    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.vertices.windows(2).map(|w| Segment::new(w[0], w[1]))
    }

    /// Point at distance `m` along the line; `m` is clamped to `[0, length]`.
    pub fn interpolate(&self, m: f64) -> Point3 {
        let m = m.clamp(0.0, self.length());
        // first vertex whose measure is >= m
        let i = self.measures.partition_point(|&v| v < m);
        if self.measures[i] == m {
            return self.vertices[i];
        }
        let (m0, m1) = (self.measures[i - 1], self.measures[i]);
        let t = (m - m0) / (m1 - m0);
        self.vertices[i - 1].lerp(&self.vertices[i], t)
    }

    /// Closest point on the line to `p`. Ties between segments resolve to
    /// the earliest segment.
    pub fn project(&self, p: &Point3) -> LineProjection {
        let mut best: Option<(usize, SegmentProjection)> = None;
        for (i, seg) in self.segments().enumerate() {
            let proj = seg.project(p);
            match best {
                Some((_, b)) if b.distance <= proj.distance => {}
                _ => best = Some((i, proj)),
            }
        }
        // at least one segment exists by construction
        let (segment, proj) = best.unwrap_or((
            0,
            SegmentProjection {
                t: 0.0,
                point: self.vertices[0],
                distance: p.planar_distance(&self.vertices[0]),
                side: 0.0,
            },
        ));
        let seg_len = self.measures[segment + 1] - self.measures[segment];
        LineProjection {
            measure: self.measures[segment] + proj.t * seg_len,
            point: proj.point,
            distance: proj.distance,
            offset: if proj.side > 0.0 { -proj.distance } else { proj.distance },
            segment,
        }
    }

    /// Replace the first and last vertex, re-measuring the line.
    pub fn with_endpoints(&self, first: Point3, last: Point3) -> Result<Self> {
        let mut vertices = self.vertices.clone();
        let n = vertices.len();
        vertices[0] = first;
        vertices[n - 1] = last;
        Self::new(vertices)
    }

    /// Insert stations every `step` units starting at `start`, keeping the
    /// original vertices.
    ///
    /// Station `k` sits at `start + k·step`. A station within a relative
    /// 1e-9 of an existing vertex is dropped in favour of the vertex.
    ///
    /// # Errors
    /// `InvalidSpacing` if `step` is not a positive number, or is so small
    /// that the station count cannot be represented.
    pub fn densify(&self, start: f64, step: f64) -> Result<Self> {
        if !(step > 0.0) || !step.is_finite() {
            return Err(Error::InvalidSpacing { spacing: step });
        }
        let length = self.length();
        let start = start.max(0.0);
        let limit = isize::MAX as usize / std::mem::size_of::<Point3>();
        let count = ((length - start) / step).floor().max(0.0);
        if !(count < limit as f64) {
            return Err(Error::InvalidSpacing { spacing: step });
        }
        let last = count as usize;
        let eps = 1e-9 * length.max(1.0);
        let at = |k: usize| start + k as f64 * step;

        let mut vertices = Vec::new();
        let mut k = 0usize;
        for (i, v) in self.vertices.iter().enumerate() {
            let m = self.measures[i];
            while k <= last && at(k) < m - eps {
                vertices.push(self.interpolate(at(k)));
                k += 1;
            }
            // stations on top of this vertex
            while k <= last && at(k) <= m + eps {
                k += 1;
            }
            vertices.push(*v);
        }
        Self::new(vertices)
    }

    /// Planar footprint as a `geo` line string
    pub fn to_line_string(&self) -> LineString<f64> {
        self.vertices.iter().map(Point3::coord).collect()
    }

    pub fn into_vertices(self) -> Vec<Point3> {
        self.vertices
    }
}

/// Input geometry for one reach: a directed polyline with an optional
/// external label.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polyline {
    pub label: Option<String>,
    pub vertices: Vec<Point3>,
}

impl Polyline {
    pub fn new(vertices: Vec<Point3>) -> Self {
        Self {
            label: None,
            vertices,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Planar length of the polyline
    pub fn length(&self) -> f64 {
        self.vertices
            .windows(2)
            .map(|w| w[0].planar_distance(&w[1]))
            .sum()
    }

    /// Densify with regularly spaced stations every `step` units from the
    /// first vertex, keeping the original vertices.
    pub fn densify(&self, step: f64) -> Result<Polyline> {
        let line = MeasuredLine::new(self.vertices.clone())?;
        Ok(Polyline {
            label: self.label.clone(),
            vertices: line.densify(0.0, step)?.into_vertices(),
        })
    }
}

impl<P: Into<Point3>> FromIterator<P> for Polyline {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Polyline::new(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Euclidean, Length};

    fn l_shape() -> MeasuredLine {
        MeasuredLine::new(vec![
            Point3::new(0.0, 0.0, 10.0),
            Point3::new(10.0, 0.0, 8.0),
            Point3::new(10.0, 10.0, 4.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_measures_are_planar() {
        let line = l_shape();
        assert_eq!(line.measures(), &[0.0, 10.0, 20.0]);
        assert_eq!(line.length(), 20.0);
        let ls = line.to_line_string();
        assert!((ls.length::<Euclidean>() - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_duplicate_vertices_dropped() {
        let line = MeasuredLine::new(vec![
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(0.0, 0.0, 2.0),
            Point3::new(5.0, 0.0, 0.0),
        ])
        .unwrap();
        assert_eq!(line.vertices().len(), 2);
        assert_eq!(line.first().z, 1.0);
    }

    #[test]
    fn test_degenerate_lines_rejected() {
        assert!(matches!(
            MeasuredLine::new(vec![]),
            Err(Error::GeometryDegenerate { reason: "empty polyline", .. })
        ));
        assert!(matches!(
            MeasuredLine::new(vec![Point3::new(1.0, 1.0, 0.0), Point3::new(1.0, 1.0, 5.0)]),
            Err(Error::GeometryDegenerate { .. })
        ));
    }

    #[test]
    fn test_interpolate_between_vertices() {
        let line = l_shape();
        let p = line.interpolate(15.0);
        assert!((p.x - 10.0).abs() < 1e-12);
        assert!((p.y - 5.0).abs() < 1e-12);
        assert!((p.z - 6.0).abs() < 1e-12);

        assert_eq!(line.interpolate(-3.0), line.first());
        assert_eq!(line.interpolate(99.0), line.last());
        assert_eq!(line.interpolate(10.0), Point3::new(10.0, 0.0, 8.0));
    }

    #[test]
    fn test_segment_projection_clamps() {
        let seg = Segment::new(Point3::new(0.0, 0.0, 0.0), Point3::new(10.0, 0.0, 0.0));
        let before = seg.project(&Point3::new(-5.0, 3.0, 0.0));
        assert_eq!(before.t, 0.0);
        assert!((before.distance - (25.0f64 + 9.0).sqrt()).abs() < 1e-12);

        let mid = seg.project(&Point3::new(4.0, -2.0, 0.0));
        assert!((mid.t - 0.4).abs() < 1e-12);
        assert!((mid.distance - 2.0).abs() < 1e-12);
        assert!(mid.side < 0.0, "point right of the segment");
    }

    #[test]
    fn test_line_projection_offset_sign() {
        let line = l_shape();
        // walking north along the second segment, x > 10 is on the right
        let right = line.project(&Point3::new(12.0, 5.0, 0.0));
        assert_eq!(right.segment, 1);
        assert!((right.measure - 15.0).abs() < 1e-12);
        assert!((right.offset - 2.0).abs() < 1e-12);

        let left = line.project(&Point3::new(8.0, 5.0, 0.0));
        assert!((left.offset + 2.0).abs() < 1e-12);
        assert!((left.distance - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_densify_keeps_vertices() {
        let line = l_shape();
        let dense = line.densify(0.0, 4.0).unwrap();
        let m = dense.measures();
        assert_eq!(m, &[0.0, 4.0, 8.0, 10.0, 12.0, 16.0, 20.0]);
        assert_eq!(dense.vertices()[3], Point3::new(10.0, 0.0, 8.0));
        assert!(line.densify(0.0, 0.0).is_err());
    }

    #[test]
    fn test_densify_drops_stations_in_float_noise_of_vertices() {
        // 3 * 0.1 and 6 * 0.1 overshoot the vertices by an ulp
        let line = MeasuredLine::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.3, 0.0, 0.0),
            Point3::new(0.6, 0.0, 0.0),
        ])
        .unwrap();
        let dense = line.densify(0.0, 0.1).unwrap();
        assert_eq!(dense.vertices().len(), 7);
        assert_eq!(dense.vertices()[3], Point3::new(0.3, 0.0, 0.0));
        assert!(dense.measures().windows(2).all(|w| w[1] - w[0] > 0.05));
    }

    #[test]
    fn test_densify_rejects_uncountable_step() {
        let line = l_shape();
        assert_eq!(
            line.densify(0.0, 1e-300).unwrap_err(),
            Error::InvalidSpacing { spacing: 1e-300 }
        );
        assert!(line.densify(0.0, f64::INFINITY).is_err());
        // a step longer than the line places the single station at `start`
        assert_eq!(line.densify(5.0, 100.0).unwrap().measures(), &[0.0, 5.0, 10.0, 20.0]);
    }

    #[test]
    fn test_polyline_densify_preserves_label() {
        let pl: Polyline = vec![(0.0, 0.0, 3.0), (10.0, 0.0, 1.0)].into_iter().collect();
        let pl = pl.with_label("reach-7");
        let dense = pl.densify(2.5).unwrap();
        assert_eq!(dense.label.as_deref(), Some("reach-7"));
        assert_eq!(dense.vertices.len(), 5);
        assert!((dense.length() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_round_planar() {
        let p = Point3::new(0.00004, 1.23456, 7.0).round_planar(4);
        assert_eq!(p.x, 0.0);
        assert!((p.y - 1.2346).abs() < 1e-12);
        assert_eq!(p.z, 7.0);
    }
}
