//! Paths through an alignment

use crate::alignment::{Alignment, EdgeId, NodeId};

/// An ordered, contiguous run of edges from a source node down to an outlet
/// node, with the cumulative distance at which each edge starts.
///
/// Paths are produced by [`Alignment::path`] and only make sense against the
/// alignment that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    source: NodeId,
    outlet: NodeId,
    edges: Vec<EdgeId>,
    /// Path distance at the upstream end of each edge
    offsets: Vec<f64>,
    lengths: Vec<f64>,
    length: f64,
}

impl Path {
    pub(crate) fn new(alignment: &Alignment, source: NodeId, outlet: NodeId, edges: Vec<EdgeId>) -> Self {
        let lengths: Vec<f64> = edges
            .iter()
            .map(|e| alignment.edges()[e.0].length())
            .collect();
        let mut offsets = Vec::with_capacity(edges.len());
        let mut total = 0.0;
        for len in &lengths {
            offsets.push(total);
            total += len;
        }
        Self {
            source,
            outlet,
            edges,
            offsets,
            lengths,
            length: total,
        }
    }

    pub fn source(&self) -> NodeId {
        self.source
    }

    pub fn outlet(&self) -> NodeId {
        self.outlet
    }

    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    /// Total path length
    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn contains(&self, edge: EdgeId) -> bool {
        self.edges.contains(&edge)
    }

    /// Position of `edge` within the path
    pub fn position(&self, edge: EdgeId) -> Option<usize> {
        self.edges.iter().position(|&e| e == edge)
    }

    /// Path distance at the upstream end of `edge`
    pub fn offset_of(&self, edge: EdgeId) -> Option<f64> {
        self.position(edge).map(|i| self.offsets[i])
    }

    /// Length of `edge` if it is on the path
    pub fn edge_length(&self, edge: EdgeId) -> Option<f64> {
        self.position(edge).map(|i| self.lengths[i])
    }

    /// `(edge, start distance, edge length)` for each edge in order
    pub fn iter(&self) -> impl Iterator<Item = (EdgeId, f64, f64)> + '_ {
        self.edges
            .iter()
            .zip(&self.offsets)
            .zip(&self.lengths)
            .map(|((&e, &start), &len)| (e, start, len))
    }

    /// Edge and along-edge measure at path distance `distance`, clamped to
    /// the path. A distance falling exactly on a shared node resolves to the
    /// downstream end of the upstream edge, except at the path origin.
    pub fn locate(&self, distance: f64) -> (EdgeId, f64) {
        let d = distance.clamp(0.0, self.length);
        let i = self
            .offsets
            .partition_point(|&start| start < d)
            .saturating_sub(1);
        if d >= self.length {
            // summed offsets can miss the total by an ulp
            return (self.edges[i], self.lengths[i]);
        }
        (self.edges[i], (d - self.offsets[i]).min(self.lengths[i]))
    }
}

#[cfg(test)]
mod tests {
    use crate::alignment::tests::y_network;
    use crate::alignment::EdgeId;

    #[test]
    fn test_offsets_accumulate() {
        let a = y_network();
        let outlet = a.outlet().unwrap();
        let path = a.path(a.edges()[0].from, outlet).unwrap();

        let e0 = a.edges()[0].length();
        assert_eq!(path.offset_of(EdgeId(0)), Some(0.0));
        assert_eq!(path.offset_of(EdgeId(2)), Some(e0));
        assert_eq!(path.offset_of(EdgeId(1)), None);
        assert_eq!(path.edge_length(EdgeId(2)), Some(50.0));
        assert_eq!(path.edge_length(EdgeId(1)), None);
        assert!((path.length() - (e0 + 50.0)).abs() < 1e-9);
        assert_eq!(path.iter().count(), 2);
    }

    #[test]
    fn test_locate() {
        let a = y_network();
        let outlet = a.outlet().unwrap();
        let path = a.path(a.edges()[0].from, outlet).unwrap();
        let e0 = a.edges()[0].length();

        assert_eq!(path.locate(0.0), (EdgeId(0), 0.0));
        assert_eq!(path.locate(e0), (EdgeId(0), e0));
        let (edge, m) = path.locate(e0 + 10.0);
        assert_eq!(edge, EdgeId(2));
        assert!((m - 10.0).abs() < 1e-9);
        assert_eq!(path.locate(1e9), (EdgeId(2), 50.0));
        assert_eq!(path.locate(-5.0), (EdgeId(0), 0.0));
    }
}
