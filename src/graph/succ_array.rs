use super::*;
use std::cell::RefCell;
use std::fmt;

/// Out-degree from which on [`SuccArray::has_edge`] stops scanning linearly and instead sorts the
/// successor list (once, lazily) and searches it binary.
pub const BINARY_SEARCH_THRESHOLD: usize = 15;

#[derive(Clone, Default)]
struct Successors {
    list: Vec<Node>,
    is_sorted: bool,
}

impl Successors {
    fn push(&mut self, v: Node) {
        self.list.push(v);
        self.is_sorted = false;
    }

    fn contains(&mut self, v: Node) -> bool {
        if self.list.len() < BINARY_SEARCH_THRESHOLD {
            return self.list.contains(&v);
        }

        if !self.is_sorted {
            self.list.sort_unstable();
            self.is_sorted = true;
        }
        self.list.binary_search(&v).is_ok()
    }
}

/// A directed graph that stores one successor list per node. Self-loops and multi-edges are
/// kept as they are added.
///
/// Successor lists of high out-degree are reordered by edge queries; the set of edges is never
/// affected by this.
#[derive(Clone)]
pub struct SuccArray {
    n: usize,
    m: usize,
    successors: Vec<RefCell<Successors>>,
}

impl GraphOrder for SuccArray {
    fn number_of_nodes(&self) -> Node {
        self.n as Node
    }

    fn number_of_edges(&self) -> usize {
        self.m
    }
}

impl AdjacencyList for SuccArray {
    fn out_degree(&self, u: Node) -> Node {
        self.successors[u as usize].borrow().list.len() as Node
    }

    fn edges(&self) -> Vec<Edge> {
        self.vertices()
            .flat_map(|u| {
                self.successors[u as usize]
                    .borrow()
                    .list
                    .iter()
                    .map(|&v| (u, v))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

impl AdjacencyTest for SuccArray {
    fn has_edge(&self, u: Node, v: Node) -> bool {
        self.successors[u as usize].borrow_mut().contains(v)
    }
}

impl GraphEdgeEditing for SuccArray {
    fn add_edge(&mut self, u: Node, v: Node) {
        assert!((u as usize) < self.n);
        assert!((v as usize) < self.n);
        self.successors[u as usize].get_mut().push(v);
        self.m += 1;
    }
}

impl GraphNew for SuccArray {
    /// Creates a new SuccArray with *V={0,1,...,n-1}* and without any edges.
    ///
    /// # Panics
    /// If `n` exceeds `Node::MAX`, i.e. if some node could not be named.
    fn new(n: usize) -> Self {
        assert!(n <= Node::MAX as usize, "{} nodes do not fit into Node", n);
        Self {
            n,
            m: 0,
            successors: vec![RefCell::new(Successors::default()); n],
        }
    }
}

/// Builds the graph on the nodes `0..=max label`. Inputs with sparse or huge labels should be
/// relabeled first, see [`crate::graph::io::compact_graph_from_edges`].
impl<'a, T: IntoIterator<Item = &'a Edge> + Clone> From<T> for SuccArray {
    fn from(edges: T) -> Self {
        let n = edges
            .clone()
            .into_iter()
            .map(|e| e.0.max(e.1) as usize + 1)
            .max()
            .unwrap_or(0);
        let mut graph = Self::new(n);
        graph.add_edges(edges);
        graph
    }
}

impl fmt::Debug for SuccArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "digraph {{ /* n={} m={} */",
            self.number_of_nodes(),
            self.number_of_edges()
        )?;
        for u in self.vertices() {
            let succ = self.successors[u as usize].borrow();
            if succ.list.is_empty() {
                continue;
            }

            write!(f, " v{} -> {{", u)?;
            for v in &succ.list {
                write!(f, " v{}", v)?;
            }
            write!(f, " }};")?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg64;

    #[test]
    fn graph_edges() {
        let mut edges = vec![(1, 2), (1, 0), (4, 3), (0, 5), (2, 4), (5, 4)];
        let graph = SuccArray::from(&edges);
        assert_eq!(graph.number_of_nodes(), 6);
        assert_eq!(graph.number_of_edges(), edges.len());
        let mut ret_edges = graph.edges();

        edges.sort();
        ret_edges.sort();

        assert_eq!(edges, ret_edges);
    }

    #[test]
    fn multi_edges_are_kept() {
        let graph = SuccArray::from(&[(0, 1), (0, 1), (1, 0)]);
        assert_eq!(graph.number_of_edges(), 3);
        assert_eq!(graph.out_degree(0), 2);
        assert!(graph.has_edge(0, 1));
        assert!(graph.has_edge(1, 0));
        assert!(!graph.has_edge(1, 1));
    }

    #[test]
    #[should_panic]
    fn add_edge_out_of_range() {
        let mut graph = SuccArray::new(3);
        graph.add_edge(0, 3);
    }

    #[test]
    fn has_edge_linear_does_not_sort() {
        let mut graph = SuccArray::new(10);
        for v in (0..5).rev() {
            graph.add_edge(9, v);
        }
        assert!(graph.has_edge(9, 2));
        assert!(!graph.has_edge(9, 7));
        assert_eq!(graph.successors[9].borrow().list, vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn has_edge_sorts_lazily_and_resets_on_insert() {
        let n = 2 * BINARY_SEARCH_THRESHOLD;
        let mut graph = SuccArray::new(n);
        for v in (1..=BINARY_SEARCH_THRESHOLD as Node).rev() {
            graph.add_edge(0, v);
        }
        assert!(!graph.successors[0].borrow().is_sorted);

        assert!(graph.has_edge(0, 3));
        assert!(graph.successors[0].borrow().is_sorted);
        let sorted = graph.successors[0].borrow().list.windows(2).all(|w| w[0] <= w[1]);
        assert!(sorted);

        graph.add_edge(0, (n - 1) as Node);
        assert!(!graph.successors[0].borrow().is_sorted);
        assert!(graph.has_edge(0, (n - 1) as Node));
        assert!(!graph.has_edge(0, 0));
    }

    #[test]
    fn has_edge_agrees_with_linear_scan() {
        let mut rng = Pcg64::seed_from_u64(3);
        for _ in 0..20 {
            let n = rng.gen_range(1..40usize);
            let m = rng.gen_range(0..(4 * n * n / 3 + 1));
            let edges: Vec<Edge> = (0..m)
                .map(|_| (rng.gen_range(0..n) as Node, rng.gen_range(0..n) as Node))
                .collect();

            let mut graph = SuccArray::new(n);
            graph.add_edges(&edges);

            for u in 0..n as Node {
                for v in 0..n as Node {
                    assert_eq!(graph.has_edge(u, v), edges.contains(&(u, v)));
                }
            }
            assert_eq!(graph.number_of_edges(), m);
        }
    }

    #[test]
    fn from_edges_covers_largest_label() {
        let edges: [Edge; 2] = [(3, 1), (1, 6)];
        let graph = SuccArray::from(&edges);
        assert_eq!(graph.number_of_nodes(), 7);
        assert!(graph.has_edge(1, 6));
    }

    #[test]
    #[should_panic]
    fn from_edges_rejects_unnameable_nodes() {
        // n would be Node::MAX + 1; this panics before allocating
        let edges: [Edge; 1] = [(Node::MAX, 0)];
        let _ = SuccArray::from(&edges);
    }

    #[test]
    fn test_debug_format() {
        let mut g = SuccArray::new(8);
        g.add_edges(&[(0, 1), (0, 2), (0, 3), (4, 5)]);
        let str = format!("{:?}", g);
        assert!(str.contains("digraph"));
        assert!(str.contains("v0 ->"));
        assert!(!str.contains("v3 ->"));
    }
}
