//! The search agent: draws random vertex orders, keeps the candidates that improve on everything
//! it knows of and publishes them.
use crate::algorithm::IterativeAlgorithm;
use crate::channel::{ChannelError, Publish, SolutionSender};
use crate::graph::{AdjacencyTest, Edge, GraphOrder, Node, NodeMapper};
use crate::heuristics::random_order::RandomOrderGenerator;
use crate::solution::{Solution, MAX_VIABLE_COUNT};
use log::{debug, info};
use rand::Rng;

/// Where an agent sends its improvements to. Implemented by [`SolutionSender`].
pub trait SolutionSink {
    type Error;

    /// Hands over an improving candidate. May block until there is room for it.
    fn publish(&mut self, solution: &Solution) -> Result<Publish, Self::Error>;

    /// Size of the best solution any agent got accepted so far
    fn best_size(&self) -> Option<usize>;

    /// True once further candidates are of no interest to anybody
    fn should_stop(&self) -> bool;
}

impl<const CAP: usize> SolutionSink for SolutionSender<CAP> {
    type Error = ChannelError;

    fn publish(&mut self, solution: &Solution) -> Result<Publish, Self::Error> {
        SolutionSender::publish(self, solution)
    }

    fn best_size(&self) -> Option<usize> {
        SolutionSender::best_size(self)
    }

    fn should_stop(&self) -> bool {
        SolutionSender::should_stop(self)
    }
}

/// Translates the dense node ids of the searched graph back into input labels before passing a
/// solution on to `inner`.
pub struct RelabelingSink<'a, S> {
    mapper: &'a NodeMapper,
    inner: S,
}

impl<'a, S> RelabelingSink<'a, S> {
    pub fn new(mapper: &'a NodeMapper, inner: S) -> Self {
        Self { mapper, inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<'a, S: SolutionSink> SolutionSink for RelabelingSink<'a, S> {
    type Error = S::Error;

    fn publish(&mut self, solution: &Solution) -> Result<Publish, Self::Error> {
        // agents only ever see ids of the mapped graph
        let labeled = solution.map_edges(|edge| self.mapper.old_edge_of(edge).unwrap_or(edge));
        self.inner.publish(&labeled)
    }

    fn best_size(&self) -> Option<usize> {
        self.inner.best_size()
    }

    fn should_stop(&self) -> bool {
        self.inner.should_stop()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AgentStats {
    /// Random orders drawn
    pub trials: u64,
    /// Orders whose evaluation was cut short because they could not improve
    pub early_exits: u64,
    /// Candidates written to the sink
    pub published: u64,
    /// Candidates dropped because the shared best was at least as good
    pub adopted: u64,
    /// Publications given up because a stop condition came up while waiting
    pub abandoned: u64,
}

/// Repeatedly shuffles the vertices and evaluates the backward edges of the order. A candidate is
/// published only if it is viable and strictly smaller than both the agent's own best and the
/// shared best of the sink.
///
/// The local best starts at the number of edges, so any candidate that leaves at least one edge
/// in place is an improvement. The agent completes when the sink asks to stop, when a
/// publication was abandoned, or when it published an empty solution itself.
pub struct SearchAgent<'a, G, R, S> {
    generator: RandomOrderGenerator<'a, G, R>,
    sink: S,
    local_best: usize,
    best_solution: Option<Solution>,
    stats: AgentStats,
    completed: bool,
}

impl<'a, G, R, S> SearchAgent<'a, G, R, S>
where
    G: AdjacencyTest + GraphOrder,
    R: Rng,
    S: SolutionSink,
{
    /// Creates an agent ordering `vertices`, which have to include every endpoint of an edge.
    pub fn new(graph: &'a G, vertices: Vec<Node>, rng: &'a mut R, sink: S) -> Self {
        let local_best = graph.number_of_edges();
        Self {
            generator: RandomOrderGenerator::new(graph, vertices, rng),
            sink,
            local_best,
            best_solution: None,
            stats: AgentStats::default(),
            completed: false,
        }
    }

    pub fn stats(&self) -> &AgentStats {
        &self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Size every new candidate has to beat
    pub fn local_best(&self) -> usize {
        self.local_best
    }

    fn draw_candidate(&mut self) -> Option<Solution> {
        self.stats.trials += 1;
        let bound = self.local_best.min(MAX_VIABLE_COUNT + 1);
        match self.generator.next_candidate(bound) {
            Some(edges) => Solution::try_from(edges).ok(),
            None => {
                self.stats.early_exits += 1;
                None
            }
        }
    }
}

impl<'a, G, R, S> IterativeAlgorithm for SearchAgent<'a, G, R, S>
where
    G: AdjacencyTest + GraphOrder,
    R: Rng,
    S: SolutionSink,
{
    type Error = S::Error;

    fn execute_step(&mut self) -> Result<(), Self::Error> {
        if self.local_best == 0 || self.sink.should_stop() {
            self.completed = true;
            return Ok(());
        }

        let candidate = match self.draw_candidate() {
            Some(candidate) => candidate,
            None => return Ok(()),
        };

        if let Some(shared) = self.sink.best_size() {
            if shared <= candidate.len() {
                debug!(
                    "Dropped candidate with {} edges, shared best has {}",
                    candidate.len(),
                    shared
                );
                self.local_best = shared;
                self.stats.adopted += 1;
                return Ok(());
            }
        }

        match self.sink.publish(&candidate)? {
            Publish::Written => {
                debug!("Published {}", candidate);
                self.stats.published += 1;
                self.local_best = candidate.len();
                if candidate.is_empty() {
                    info!("Published an empty solution, the graph is acyclic");
                    self.completed = true;
                }
                self.best_solution = Some(candidate);
            }
            Publish::Abandoned => {
                debug!("Gave up publishing {}", candidate);
                self.stats.abandoned += 1;
                self.completed = true;
            }
        }
        Ok(())
    }

    fn is_completed(&self) -> bool {
        self.completed
    }

    fn best_known_solution(&self) -> Option<&[Edge]> {
        self.best_solution.as_ref().map(|s| s.edges())
    }
}
