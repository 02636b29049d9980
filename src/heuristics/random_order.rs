use crate::graph::{AdjacencyTest, Edge, Node};
use rand::Rng;

/// Derives feedback arc set candidates from random linear orders of the vertices.
///
/// For a fixed order, every edge that points from a later vertex back to an earlier one has to
/// be removed to turn the order into a topological sorting; these backward edges form the
/// candidate. Repeating this with fresh uniformly random orders yields a Monte Carlo search for a
/// small feedback arc set.
pub struct RandomOrderGenerator<'a, G, R> {
    graph: &'a G,
    rng: &'a mut R,
    order: Vec<Node>,
    feedback: Vec<Edge>,
}

impl<'a, G, R> RandomOrderGenerator<'a, G, R>
where
    G: AdjacencyTest,
    R: Rng,
{
    /// Creates a generator that orders exactly the passed `vertices`, initially in the given
    /// sequence. Vertices absent from `vertices` are ignored, i.e. they must not carry edges.
    pub fn new(graph: &'a G, vertices: Vec<Node>, rng: &'a mut R) -> Self {
        Self {
            graph,
            rng,
            feedback: Vec::new(),
            order: vertices,
        }
    }

    /// Replaces the current order by a uniformly random permutation of it. For every index *i*
    /// from first to last, the element at *i* is swapped with one drawn uniformly from *[i, last]*.
    pub fn shuffle(&mut self) {
        let n = self.order.len();
        for i in 0..n {
            let j = self.rng.gen_range(i..n);
            self.order.swap(i, j);
        }
    }

    /// The current vertex order
    pub fn order(&self) -> &[Node] {
        &self.order
    }

    /// Overwrites the current order. `order` has to be a permutation of the vertices this
    /// generator was created with.
    pub fn set_order(&mut self, order: &[Node]) {
        debug_assert_eq!(order.len(), self.order.len());
        self.order.clear();
        self.order.extend_from_slice(order);
    }

    /// Computes the backward edges of the current order in order of discovery: position *i*
    /// ascending, then position *j < i* ascending.
    ///
    /// Returns `None` as soon as the number of backward edges reaches `bound`, since such a
    /// candidate cannot improve on a known solution of size `bound`. The check is carried out
    /// after each position *i*, so a result, if returned, always has fewer than `bound` edges.
    pub fn evaluate(&mut self, bound: usize) -> Option<&[Edge]> {
        self.feedback.clear();
        if bound == 0 {
            return None;
        }

        for i in 1..self.order.len() {
            let u = self.order[i];
            for &v in &self.order[..i] {
                if self.graph.has_edge(u, v) {
                    self.feedback.push((u, v));
                }
            }

            if self.feedback.len() >= bound {
                return None;
            }
        }

        Some(&self.feedback)
    }

    /// Shuffles and evaluates in one go
    pub fn next_candidate(&mut self, bound: usize) -> Option<&[Edge]> {
        self.shuffle();
        self.evaluate(bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{
        is_acyclic_without, AdjacencyList, GraphEdgeEditing, GraphNew, GraphOrder, SuccArray,
    };
    use rand::SeedableRng;
    use rand_pcg::Pcg64;
    use test_case::test_case;

    fn backward_edges_by_position(graph: &SuccArray, order: &[Node]) -> Vec<Edge> {
        let mut position = vec![usize::MAX; graph.len()];
        for (i, &u) in order.iter().enumerate() {
            position[u as usize] = i;
        }
        let mut edges: Vec<Edge> = graph
            .edges()
            .into_iter()
            .filter(|&(u, v)| position[u as usize] > position[v as usize])
            .collect();
        edges.sort_unstable();
        edges.dedup();
        edges
    }

    fn random_graph(rng: &mut Pcg64, n: usize, m: usize) -> SuccArray {
        let mut graph = SuccArray::new(n);
        for _ in 0..m {
            let u = rng.gen_range(0..n) as Node;
            let v = rng.gen_range(0..n) as Node;
            graph.add_edge(u, v);
        }
        graph
    }

    #[test]
    fn shuffle_yields_permutation() {
        let graph = SuccArray::new(50);
        let mut rng = Pcg64::seed_from_u64(0);
        let mut gen = RandomOrderGenerator::new(&graph, (0..50).collect(), &mut rng);

        for _ in 0..10 {
            gen.shuffle();
            let mut order = gen.order().to_vec();
            order.sort_unstable();
            assert_eq!(order, (0..50).collect::<Vec<_>>());
        }
    }

    #[test]
    fn shuffle_is_roughly_uniform() {
        let graph = SuccArray::new(3);
        let mut rng = Pcg64::seed_from_u64(1);
        let mut gen = RandomOrderGenerator::new(&graph, vec![0, 1, 2], &mut rng);

        let mut counts = std::collections::HashMap::new();
        let rounds = 6000;
        for _ in 0..rounds {
            gen.shuffle();
            *counts.entry(gen.order().to_vec()).or_insert(0usize) += 1;
        }

        assert_eq!(counts.len(), 6);
        for &count in counts.values() {
            assert!(count > rounds / 6 * 8 / 10, "skewed permutation count {}", count);
            assert!(count < rounds / 6 * 12 / 10, "skewed permutation count {}", count);
        }
    }

    #[test_case(&[0, 1, 2] => vec![(2, 0)])]
    #[test_case(&[2, 1, 0] => vec![(0, 1), (1, 2)])]
    #[test_case(&[1, 2, 0] => vec![(0, 1)])]
    #[test_case(&[0, 2, 1] => vec![(1, 2), (2, 0)])]
    fn triangle_backward_edges(order: &[Node]) -> Vec<Edge> {
        let graph = SuccArray::from(&[(0, 1), (1, 2), (2, 0)]);
        let mut rng = Pcg64::seed_from_u64(0);
        let mut gen = RandomOrderGenerator::new(&graph, vec![0, 1, 2], &mut rng);
        gen.set_order(order);
        let mut edges = gen.evaluate(usize::MAX).unwrap().to_vec();
        edges.sort_unstable();
        edges
    }

    #[test]
    fn discovery_order() {
        let graph = SuccArray::from(&[(2, 0), (2, 1), (1, 0)]);
        let mut rng = Pcg64::seed_from_u64(0);
        let mut gen = RandomOrderGenerator::new(&graph, vec![0, 1, 2], &mut rng);
        gen.set_order(&[0, 1, 2]);
        assert_eq!(gen.evaluate(10).unwrap(), &[(1, 0), (2, 0), (2, 1)]);
    }

    #[test]
    fn acyclic_order_yields_empty_candidate() {
        let graph = SuccArray::from(&[(0, 1), (1, 2)]);
        let mut rng = Pcg64::seed_from_u64(0);
        let mut gen = RandomOrderGenerator::new(&graph, vec![0, 1, 2], &mut rng);
        gen.set_order(&[0, 1, 2]);
        assert_eq!(gen.evaluate(1), Some(&[][..]));
    }

    #[test]
    fn bound_aborts_evaluation() {
        let graph = SuccArray::from(&[(0, 1), (1, 2), (2, 0)]);
        let mut rng = Pcg64::seed_from_u64(0);
        let mut gen = RandomOrderGenerator::new(&graph, vec![0, 1, 2], &mut rng);

        gen.set_order(&[2, 1, 0]);
        assert!(gen.evaluate(2).is_none());
        assert_eq!(gen.evaluate(3).map(|e| e.len()), Some(2));

        gen.set_order(&[0, 1, 2]);
        assert!(gen.evaluate(0).is_none());
        assert!(gen.evaluate(1).is_none());
        assert_eq!(gen.evaluate(2).map(|e| e.len()), Some(1));
    }

    #[test]
    fn candidates_match_backward_edges_and_break_all_cycles() {
        let mut rng = Pcg64::seed_from_u64(7);
        for _ in 0..30 {
            let n = rng.gen_range(2..25usize);
            let m = rng.gen_range(0..3 * n);
            let graph = random_graph(&mut rng, n, m);

            let mut order_rng = Pcg64::seed_from_u64(rng.gen());
            let mut gen =
                RandomOrderGenerator::new(&graph, graph.vertices().collect(), &mut order_rng);

            for _ in 0..5 {
                gen.shuffle();
                let order = gen.order().to_vec();
                let expected = backward_edges_by_position(&graph, &order);

                let mut candidate = gen.evaluate(usize::MAX).unwrap().to_vec();
                candidate.sort_unstable();
                assert_eq!(candidate, expected);

                let has_self_loop = graph.edges().iter().any(|&(u, v)| u == v);
                if !has_self_loop {
                    assert!(is_acyclic_without(&graph, &candidate));
                }
            }
        }
    }

    #[test]
    fn early_exit_only_drops_candidates_at_or_above_bound() {
        let mut rng = Pcg64::seed_from_u64(11);
        let graph = random_graph(&mut rng, 12, 30);
        let mut order_rng = Pcg64::seed_from_u64(12);
        let mut gen = RandomOrderGenerator::new(&graph, graph.vertices().collect(), &mut order_rng);

        for _ in 0..50 {
            gen.shuffle();
            let full = gen.evaluate(usize::MAX).unwrap().to_vec();
            for bound in 0..full.len() + 2 {
                match gen.evaluate(bound) {
                    Some(edges) => {
                        assert!(full.len() < bound);
                        assert_eq!(edges, full.as_slice());
                    }
                    None => assert!(full.len() >= bound),
                }
            }
        }
    }
}
