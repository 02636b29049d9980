pub mod io;
pub mod node_mapper;
pub mod succ_array;
pub mod traversal;

use std::ops::Range;

pub type Node = u32;
pub type Edge = (Node, Node);

pub use node_mapper::NodeMapper;
pub use succ_array::SuccArray;
pub use traversal::is_acyclic_without;

pub trait GraphOrder {
    /// Returns the number of nodes of the graph
    fn number_of_nodes(&self) -> Node;

    /// Returns the number of edges of the graph
    fn number_of_edges(&self) -> usize;

    /// Return the number of nodes as usize
    fn len(&self) -> usize {
        self.number_of_nodes() as usize
    }

    /// Returns an iterator over V.
    fn vertices(&self) -> Range<Node> {
        0..self.number_of_nodes()
    }

    /// Returns true if the graph has no nodes (and thus no edges)
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait AdjacencyList: GraphOrder {
    /// Returns the number of outgoing edges from *u*
    fn out_degree(&self, u: Node) -> Node;

    /// Returns a vector over all edges in the graph
    fn edges(&self) -> Vec<Edge>;
}

pub trait AdjacencyTest {
    /// Returns *true* exactly if the graph contains the directed edge (u, v)
    fn has_edge(&self, u: Node, v: Node) -> bool;
}

pub trait GraphEdgeEditing {
    /// Adds the directed edge *(u,v)* to the graph. I.e., the edge FROM u TO v.
    /// Multi-edges are kept as separate entries.
    /// ** Panics if u, v >= n **
    fn add_edge(&mut self, u: Node, v: Node);

    /// Adds all edges in the collection
    fn add_edges<'a, T: IntoIterator<Item = &'a Edge>>(&mut self, edges: T) {
        for e in edges {
            self.add_edge(e.0, e.1);
        }
    }
}

pub trait GraphNew {
    /// Creates an empty graph with n singleton nodes
    fn new(n: usize) -> Self;
}
