//! Error types for Reachline

use crate::alignment::{EdgeId, NodeId};
use thiserror::Error;

/// Main error type for Reachline operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("No directed path from node {from} to node {to}")]
    NoPath { from: NodeId, to: NodeId },

    #[error("Ambiguous path from node {from} to node {to}: routes diverge at node {at}")]
    AmbiguousPath { from: NodeId, to: NodeId, at: NodeId },

    #[error("Edge {edge} is not part of the path")]
    NotOnPath { edge: EdgeId },

    #[error("Cannot build an alignment from zero polylines")]
    DisconnectedInput,

    #[error("Invalid buffer distance: {distance} (must be positive)")]
    InvalidBuffer { distance: f64 },

    #[error("Invalid station spacing: {spacing} (must be positive)")]
    InvalidSpacing { spacing: f64 },

    #[error("Degenerate geometry{}: {reason}", .edge.map(|e| format!(" on edge {e}")).unwrap_or_default())]
    GeometryDegenerate {
        edge: Option<EdgeId>,
        reason: &'static str,
    },

    #[error("Network contains a cycle through node {node}")]
    Cycle { node: NodeId },

    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Unknown edge: {0}")]
    UnknownEdge(EdgeId),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl Error {
    /// Shorthand for [`Error::InvalidParameter`].
    pub fn invalid_parameter(name: &'static str, value: impl ToString, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// Attach an edge identifier to a degenerate geometry error.
    pub(crate) fn on_edge(self, id: EdgeId) -> Self {
        match self {
            Error::GeometryDegenerate { reason, .. } => Error::GeometryDegenerate {
                edge: Some(id),
                reason,
            },
            other => other,
        }
    }
}

/// Result type alias for Reachline operations
pub type Result<T> = std::result::Result<T, Error>;
