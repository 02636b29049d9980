use super::*;
use fxhash::FxHashSet;

/// Returns *true* exactly if the graph becomes acyclic once every edge in `removed` is deleted.
/// Removing an edge deletes all of its parallel copies.
///
/// Runs a topology search: a node is visited once all its remaining predecessors are visited.
/// If and only if the remaining graph is acyclic all nodes are visited.
pub fn is_acyclic_without<G: AdjacencyList>(graph: &G, removed: &[Edge]) -> bool {
    let removed: FxHashSet<Edge> = removed.iter().copied().collect();

    let mut out_neighbors: Vec<Vec<Node>> = vec![vec![]; graph.len()];
    let mut in_degs: Vec<usize> = vec![0; graph.len()];
    for (u, v) in graph.edges() {
        if removed.contains(&(u, v)) {
            continue;
        }
        out_neighbors[u as usize].push(v);
        in_degs[v as usize] += 1;
    }

    let mut stack: Vec<Node> = graph
        .vertices()
        .filter(|&u| in_degs[u as usize] == 0)
        .collect();

    let mut visited = 0;
    while let Some(u) = stack.pop() {
        visited += 1;
        for &v in &out_neighbors[u as usize] {
            in_degs[v as usize] -= 1;
            if in_degs[v as usize] == 0 {
                stack.push(v);
            }
        }
    }

    visited == graph.len()
}
