use crate::graph::Edge;
use arrayvec::ArrayVec;
use itertools::Itertools;
use std::fmt;

/// Largest feedback arc set that is still considered viable, i.e. that is ever stored in the
/// shared buffer or reported.
pub const MAX_VIABLE_COUNT: usize = 8;

/// A feedback arc set candidate with at most [`MAX_VIABLE_COUNT`] edges. An empty solution claims
/// that the observed vertex order had no backward edge at all.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Solution {
    edges: ArrayVec<Edge, MAX_VIABLE_COUNT>,
}

/// Returned when a candidate exceeds [`MAX_VIABLE_COUNT`] edges
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("feedback arc set with {0} edges exceeds the viability cap")]
pub struct NotViable(pub usize);

impl Solution {
    /// The solution without any edges
    pub fn acyclic() -> Self {
        Self::default()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// True for the terminal solution without edges
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Appends an edge unless the solution already holds [`MAX_VIABLE_COUNT`] edges
    pub fn push(&mut self, edge: Edge) -> Result<(), NotViable> {
        self.edges
            .try_push(edge)
            .map_err(|_| NotViable(self.edges.len() + 1))
    }

    /// Returns the solution with every edge replaced by `f(edge)`, keeping their order
    pub fn map_edges<F: FnMut(Edge) -> Edge>(&self, f: F) -> Self {
        Self {
            edges: self.edges.iter().copied().map(f).collect(),
        }
    }
}

impl TryFrom<&[Edge]> for Solution {
    type Error = NotViable;

    fn try_from(edges: &[Edge]) -> Result<Self, Self::Error> {
        let mut result = ArrayVec::new();
        result
            .try_extend_from_slice(edges)
            .map_err(|_| NotViable(edges.len()))?;
        Ok(Self { edges: result })
    }
}

impl fmt::Display for Solution {
    /// Formats as `Solution with <N> edges: <src>-<dst> ...`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Solution with {} edges:", self.len())?;
        if !self.is_empty() {
            let edges = self
                .edges
                .iter()
                .map(|(u, v)| format!("{}-{}", u, v))
                .join(" ");
            write!(f, " {}", edges)?;
        }
        Ok(())
    }
}
