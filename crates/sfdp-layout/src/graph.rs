//! Graph and property-store capabilities consumed by the layout.
//!
//! The layout never owns a graph. It only needs a stable vertex count, the
//! outgoing edges of each vertex, and read-only per-vertex and per-edge
//! scalars. `petgraph::Graph` is supported out of the box.

use petgraph::graph::{Graph, IndexType};
use petgraph::visit::EdgeRef;
use petgraph::EdgeType;

use crate::force::distance;
use crate::Point;

/// Vertex identifier, valid in `[0, vertex_count)`.
pub type VertexId = usize;

/// Edge identifier used to look up edge weights.
pub type EdgeId = usize;

/// An edge leaving a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutEdge {
    pub id: EdgeId,
    pub target: VertexId,
}

/// Read-only graph topology.
pub trait LayoutGraph: Sync {
    /// Number of vertices. Identifiers are `0..vertex_count()`.
    fn vertex_count(&self) -> usize;

    /// Number of edges. Edge identifiers are `0..edge_count()`.
    fn edge_count(&self) -> usize;

    /// Edges leaving `v`.
    fn out_edges(&self, v: VertexId) -> impl Iterator<Item = OutEdge> + '_;
}

/// Directed graphs report outgoing edges. Undirected graphs report every
/// incident edge with the far endpoint as target, so both endpoints of an
/// edge attract each other.
impl<N, E, Ty, Ix> LayoutGraph for Graph<N, E, Ty, Ix>
where
    N: Sync,
    E: Sync,
    Ty: EdgeType + Sync,
    Ix: IndexType + Sync,
{
    fn vertex_count(&self) -> usize {
        self.node_count()
    }

    fn edge_count(&self) -> usize {
        Graph::edge_count(self)
    }

    fn out_edges(&self, v: VertexId) -> impl Iterator<Item = OutEdge> + '_ {
        let node = petgraph::graph::NodeIndex::<Ix>::new(v);
        self.edges(node).map(move |e| {
            let target = if e.source() == node {
                e.target()
            } else {
                e.source()
            };
            OutEdge {
                id: e.id().index(),
                target: target.index(),
            }
        })
    }
}

/// Per-vertex mass.
pub trait VertexWeights: Sync {
    fn weight(&self, v: VertexId) -> f64;

    /// Entries held, for stores that can be undersized. `None` covers every id.
    fn stored(&self) -> Option<usize> {
        None
    }
}

/// Per-edge attraction multiplier.
pub trait EdgeWeights: Sync {
    fn weight(&self, e: EdgeId) -> f64;

    /// Entries held, for stores that can be undersized. `None` covers every id.
    fn stored(&self) -> Option<usize> {
        None
    }
}

/// Vertices the layout must not move.
pub trait PinMap: Sync {
    fn is_pinned(&self, v: VertexId) -> bool;

    /// Entries held, for stores that can be undersized. `None` covers every id.
    fn stored(&self) -> Option<usize> {
        None
    }
}

/// The same weight for every vertex or edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Uniform(pub f64);

/// No vertex is pinned.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPins;

impl VertexWeights for Uniform {
    fn weight(&self, _v: VertexId) -> f64 {
        self.0
    }
}

impl EdgeWeights for Uniform {
    fn weight(&self, _e: EdgeId) -> f64 {
        self.0
    }
}

impl VertexWeights for [f64] {
    fn weight(&self, v: VertexId) -> f64 {
        self[v]
    }
    fn stored(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl VertexWeights for Vec<f64> {
    fn weight(&self, v: VertexId) -> f64 {
        self[v]
    }
    fn stored(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl EdgeWeights for [f64] {
    fn weight(&self, e: EdgeId) -> f64 {
        self[e]
    }
    fn stored(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl EdgeWeights for Vec<f64> {
    fn weight(&self, e: EdgeId) -> f64 {
        self[e]
    }
    fn stored(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl PinMap for NoPins {
    fn is_pinned(&self, _v: VertexId) -> bool {
        false
    }
}

impl PinMap for [bool] {
    fn is_pinned(&self, v: VertexId) -> bool {
        self[v]
    }
    fn stored(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl PinMap for Vec<bool> {
    fn is_pinned(&self, v: VertexId) -> bool {
        self[v]
    }
    fn stored(&self) -> Option<usize> {
        Some(self.len())
    }
}

/// Mean Euclidean length of the graph's non-loop edges under `positions`.
///
/// The usual choice for `K` when the caller has no better one. Returns `None`
/// when the graph has no such edge.
pub fn average_edge_length<G>(graph: &G, positions: &[Point]) -> Option<f64>
where
    G: LayoutGraph,
{
    let (sum, count) = (0..graph.vertex_count())
        .flat_map(move |v| graph.out_edges(v).map(move |e| (v, e.target)))
        .filter(|&(v, u)| v != u)
        .fold((0.0, 0usize), |(sum, count), (v, u)| {
            (sum + distance(positions[v], positions[u]), count + 1)
        });

    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
