//! Directed stream network graph
//!
//! An [`Alignment`] is an arena of nodes and measured edges. Edges point
//! downstream, from an upstream node to a downstream node. Node roles
//! (source, confluence, outlet, ...) are derived from the adjacency index on
//! demand rather than stored, so they can never go stale.

use crate::error::{Error, Result};
use crate::geometry::{MeasuredLine, Point3, Polyline};
use crate::path::Path;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, warn};

/// Node identifier, dense index into the alignment's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// Edge identifier, equal to the index of the source polyline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which incident edges to select at a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Edges flowing into the node
    Upstream,
    /// Edges flowing out of the node
    Downstream,
    /// All incident edges
    Both,
}

/// Role of a node in the network, inferred from in/out degree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    /// No incoming edges
    Source,
    /// No outgoing edges
    Outlet,
    /// Two or more incoming edges
    Confluence,
    /// Two or more outgoing edges (braids, distributaries)
    Bifurcation,
    /// Exactly one edge in and one out
    Junction,
    /// No incident edges
    Isolated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub coord: Point3,
}

/// A reach: measured geometry directed from `from` (upstream) to `to` (downstream).
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub label: Option<String>,
    pub from: NodeId,
    pub to: NodeId,
    pub geometry: MeasuredLine,
}

impl Edge {
    pub fn length(&self) -> f64 {
        self.geometry.length()
    }

    /// Geometry of the edge as an input polyline, e.g. for rebuilding.
    pub fn to_polyline(&self) -> Polyline {
        Polyline {
            label: self.label.clone(),
            vertices: self.geometry.vertices().to_vec(),
        }
    }
}

/// Parameters for building an [`Alignment`]
#[derive(Debug, Clone, Copy)]
pub struct AlignmentParams {
    /// Endpoints closer than this planar distance become the same node.
    /// Default: 1e-9
    pub node_epsilon: f64,
}

impl Default for AlignmentParams {
    fn default() -> Self {
        Self { node_epsilon: 1e-9 }
    }
}

/// Planar index of node positions, only needed while building.
type NodeIndex = RTree<GeomWithData<[f64; 2], NodeId>>;

/// A directed, acyclic network of measured reaches.
#[derive(Debug, Clone)]
pub struct Alignment {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    incoming: Vec<Vec<EdgeId>>,
    outgoing: Vec<Vec<EdgeId>>,
    params: AlignmentParams,
}

/// Build an alignment with default parameters.
pub fn build_alignment<I>(polylines: I) -> Result<Alignment>
where
    I: IntoIterator<Item = Polyline>,
{
    Alignment::build(polylines, AlignmentParams::default())
}

/// Find the unique directed path between two nodes.
pub fn find_path(alignment: &Alignment, source: NodeId, outlet: NodeId) -> Result<Path> {
    alignment.path(source, outlet)
}

impl Alignment {
    /// Build an alignment from directed polylines.
    ///
    /// Each polyline becomes an edge whose id is its position in the input.
    /// Endpoints within `params.node_epsilon` share a node; the edge's end
    /// vertices are snapped onto that node's coordinate.
    ///
    /// # Errors
    /// - `DisconnectedInput` for an empty input
    /// - `GeometryDegenerate` for empty or zero-length polylines
    /// - `Cycle` when the flow direction forms a loop
    pub fn build<I>(polylines: I, params: AlignmentParams) -> Result<Self>
    where
        I: IntoIterator<Item = Polyline>,
    {
        if !(params.node_epsilon >= 0.0) || !params.node_epsilon.is_finite() {
            return Err(Error::invalid_parameter(
                "node_epsilon",
                params.node_epsilon,
                "must be a finite, non-negative distance",
            ));
        }

        let mut alignment = Alignment {
            nodes: Vec::new(),
            edges: Vec::new(),
            incoming: Vec::new(),
            outgoing: Vec::new(),
            params,
        };
        let mut index = NodeIndex::new();

        for (i, polyline) in polylines.into_iter().enumerate() {
            let id = EdgeId(i);
            let Polyline { label, vertices } = polyline;
            let line = MeasuredLine::new(vertices).map_err(|e| e.on_edge(id))?;

            let from = alignment.register_node(&mut index, line.first());
            let to = alignment.register_node(&mut index, line.last());
            if from == to {
                return Err(Error::Cycle { node: from });
            }

            let geometry = line
                .with_endpoints(alignment.nodes[from.0].coord, alignment.nodes[to.0].coord)
                .map_err(|e| e.on_edge(id))?;

            alignment.outgoing[from.0].push(id);
            alignment.incoming[to.0].push(id);
            alignment.edges.push(Edge {
                id,
                label,
                from,
                to,
                geometry,
            });
        }

        if alignment.edges.is_empty() {
            return Err(Error::DisconnectedInput);
        }

        alignment.check_acyclic()?;

        let components = alignment.component_count();
        if components > 1 {
            warn!(
                components,
                "alignment has multiple disconnected subnetworks; use repair to check"
            );
        }
        debug!(
            nodes = alignment.nodes.len(),
            edges = alignment.edges.len(),
            "built alignment"
        );

        Ok(alignment)
    }

    /// Node within `node_epsilon` of `p`, lowest id first, or a new node.
    fn register_node(&mut self, index: &mut NodeIndex, p: Point3) -> NodeId {
        let eps_sq = self.params.node_epsilon * self.params.node_epsilon;
        if let Some(id) = index
            .locate_within_distance([p.x, p.y], eps_sq)
            .map(|n| n.data)
            .min()
        {
            return id;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { id, coord: p });
        self.incoming.push(Vec::new());
        self.outgoing.push(Vec::new());
        index.insert(GeomWithData::new([p.x, p.y], id));
        id
    }

    /// Nodes ordered so that every edge points from an earlier node to a
    /// later one (Kahn's algorithm). Nodes on a cycle are left out.
    pub fn topological_order(&self) -> Vec<NodeId> {
        let mut in_degree: Vec<usize> = self.incoming.iter().map(Vec::len).collect();
        let mut queue: VecDeque<usize> = (0..self.nodes.len())
            .filter(|&n| in_degree[n] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(n) = queue.pop_front() {
            order.push(NodeId(n));
            for e in &self.outgoing[n] {
                let to = self.edges[e.0].to.0;
                in_degree[to] -= 1;
                if in_degree[to] == 0 {
                    queue.push_back(to);
                }
            }
        }
        order
    }

    fn check_acyclic(&self) -> Result<()> {
        let order = self.topological_order();
        if order.len() == self.nodes.len() {
            return Ok(());
        }
        let mut ordered = vec![false; self.nodes.len()];
        for n in &order {
            ordered[n.0] = true;
        }
        let node = ordered
            .iter()
            .position(|&done| !done)
            .map(NodeId)
            .unwrap_or(NodeId(0));
        Err(Error::Cycle { node })
    }

    pub fn params(&self) -> &AlignmentParams {
        &self.params
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(Error::UnknownNode(id))
    }

    pub fn edge(&self, id: EdgeId) -> Result<&Edge> {
        self.edges.get(id.0).ok_or(Error::UnknownEdge(id))
    }

    /// Total planar length of all edges
    pub fn total_length(&self) -> f64 {
        self.edges.iter().map(Edge::length).sum()
    }

    /// Node coordinates in id order. The iterator is lazy and can be cloned
    /// to restart it.
    pub fn vertices(&self) -> impl Iterator<Item = Point3> + Clone + '_ {
        self.nodes.iter().map(|n| n.coord)
    }

    /// Edges incident to `node` in the requested direction.
    pub fn edges_incident(&self, node: NodeId, direction: Direction) -> Result<Vec<EdgeId>> {
        self.node(node)?;
        let edges = match direction {
            Direction::Upstream => self.incoming[node.0].clone(),
            Direction::Downstream => self.outgoing[node.0].clone(),
            Direction::Both => self.incoming[node.0]
                .iter()
                .chain(&self.outgoing[node.0])
                .copied()
                .collect(),
        };
        Ok(edges)
    }

    pub fn in_degree(&self, node: NodeId) -> usize {
        self.incoming.get(node.0).map_or(0, Vec::len)
    }

    pub fn out_degree(&self, node: NodeId) -> usize {
        self.outgoing.get(node.0).map_or(0, Vec::len)
    }

    /// Number of incident edges
    pub fn degree(&self, node: NodeId) -> usize {
        self.in_degree(node) + self.out_degree(node)
    }

    pub fn node_role(&self, node: NodeId) -> Result<NodeRole> {
        self.node(node)?;
        let role = match (self.in_degree(node), self.out_degree(node)) {
            (0, 0) => NodeRole::Isolated,
            (0, _) => NodeRole::Source,
            (_, 0) => NodeRole::Outlet,
            (i, _) if i >= 2 => NodeRole::Confluence,
            (_, o) if o >= 2 => NodeRole::Bifurcation,
            _ => NodeRole::Junction,
        };
        Ok(role)
    }

    /// Nodes without incoming edges
    pub fn sources(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .map(|n| n.id)
            .filter(|&n| self.in_degree(n) == 0 && self.out_degree(n) > 0)
            .collect()
    }

    /// Nodes without outgoing edges
    pub fn outlets(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .map(|n| n.id)
            .filter(|&n| self.out_degree(n) == 0 && self.in_degree(n) > 0)
            .collect()
    }

    /// The outlet of the network, if there is exactly one.
    pub fn outlet(&self) -> Option<NodeId> {
        match self.outlets().as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Nodes with both incoming and outgoing edges
    pub fn intermediate_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .map(|n| n.id)
            .filter(|&n| self.in_degree(n) > 0 && self.out_degree(n) > 0)
            .collect()
    }

    /// Number of weakly connected components
    pub fn component_count(&self) -> usize {
        let mut seen = vec![false; self.nodes.len()];
        let mut components = 0;
        let mut stack = Vec::new();

        for start in 0..self.nodes.len() {
            if seen[start] {
                continue;
            }
            components += 1;
            seen[start] = true;
            stack.push(start);
            while let Some(n) = stack.pop() {
                let neighbours = self.incoming[n]
                    .iter()
                    .map(|e| self.edges[e.0].from.0)
                    .chain(self.outgoing[n].iter().map(|e| self.edges[e.0].to.0));
                for m in neighbours {
                    if !seen[m] {
                        seen[m] = true;
                        stack.push(m);
                    }
                }
            }
        }
        components
    }

    /// Nodes that can reach `target` by following flow direction, `target` included.
    fn reaches(&self, target: NodeId) -> Vec<bool> {
        let mut reach = vec![false; self.nodes.len()];
        reach[target.0] = true;
        let mut stack = vec![target.0];
        while let Some(n) = stack.pop() {
            for e in &self.incoming[n] {
                let from = self.edges[e.0].from.0;
                if !reach[from] {
                    reach[from] = true;
                    stack.push(from);
                }
            }
        }
        reach
    }

    /// The unique directed path from `source` down to `outlet`.
    ///
    /// # Errors
    /// - `NoPath` when `outlet` is not downstream of `source` (or they are the same node)
    /// - `AmbiguousPath` when more than one directed route joins them; the
    ///   error names the node where the routes split
    pub fn path(&self, source: NodeId, outlet: NodeId) -> Result<Path> {
        self.node(source)?;
        self.node(outlet)?;

        let no_path = Error::NoPath {
            from: source,
            to: outlet,
        };
        if source == outlet {
            return Err(no_path);
        }
        let reach = self.reaches(outlet);
        if !reach[source.0] {
            return Err(no_path);
        }

        // Every route shares the walk up to its first divergence, so a forced
        // walk either reaches the outlet or finds the split.
        let mut edges = Vec::new();
        let mut current = source;
        while current != outlet {
            let mut onward = self.outgoing[current.0]
                .iter()
                .filter(|e| reach[self.edges[e.0].to.0]);
            let next = match (onward.next(), onward.next()) {
                (Some(&e), None) => e,
                (Some(_), Some(_)) => {
                    return Err(Error::AmbiguousPath {
                        from: source,
                        to: outlet,
                        at: current,
                    })
                }
                (None, _) => return Err(no_path),
            };
            edges.push(next);
            current = self.edges[next.0].to;
        }

        let path = Path::new(self, source, outlet, edges);
        debug!(
            source = source.0,
            outlet = outlet.0,
            edges = path.edges().len(),
            length = path.length(),
            "found path"
        );
        Ok(path)
    }
}
