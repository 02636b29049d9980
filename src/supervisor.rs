//! The aggregator: drains the channel, reports every improvement and ends the run once an empty
//! solution shows up or a termination signal arrives.
use crate::algorithm::IterativeAlgorithm;
use crate::channel::{ChannelError, SolutionReceiver};
use crate::graph::Edge;
use crate::signal_handling::received_termination;
use crate::solution::Solution;
use log::{debug, info};
use std::io::{self, Write};

/// Where the supervisor takes candidates from. Implemented by [`SolutionReceiver`].
pub trait SolutionSource {
    type Error: Into<io::Error>;

    /// Blocks for the next candidate. `None` means that no candidate will be delivered anymore.
    fn receive(&mut self) -> Result<Option<Solution>, Self::Error>;

    fn request_shutdown(&mut self);

    fn mark_acyclic(&mut self);

    /// Publishes the size of the best solution to the agents
    fn record_best(&mut self, size: usize);
}

impl<const CAP: usize> SolutionSource for SolutionReceiver<CAP> {
    type Error = ChannelError;

    fn receive(&mut self) -> Result<Option<Solution>, Self::Error> {
        SolutionReceiver::receive(self)
    }

    fn request_shutdown(&mut self) {
        SolutionReceiver::request_shutdown(self)
    }

    fn mark_acyclic(&mut self) {
        SolutionReceiver::mark_acyclic(self)
    }

    fn record_best(&mut self, size: usize) {
        SolutionReceiver::record_best(self, size)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SupervisorState {
    Running,
    AcyclicFound,
    ShuttingDown,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SupervisorStats {
    pub received: u64,
    pub reported: u64,
    pub stale: u64,
}

/// Keeps the best solution seen so far and writes a line to `output` for each improvement. There
/// is no way back to [`SupervisorState::Running`] once shutdown was entered.
pub struct Supervisor<S, W> {
    source: S,
    output: W,
    state: SupervisorState,
    best: Option<Solution>,
    stats: SupervisorStats,
}

impl<S: SolutionSource, W: Write> Supervisor<S, W> {
    pub fn new(source: S, output: W) -> Self {
        Self {
            source,
            output,
            state: SupervisorState::Running,
            best: None,
            stats: SupervisorStats::default(),
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn stats(&self) -> &SupervisorStats {
        &self.stats
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    /// Processes candidates until the run ends. If the loop is left because of a termination
    /// signal, shutdown is requested before returning.
    pub fn run(&mut self) -> io::Result<()> {
        self.run_to_completion()?;
        if self.state != SupervisorState::ShuttingDown {
            self.shut_down("termination signal received");
        }

        info!(
            "Received {} solutions, reported {}, discarded {} stale",
            self.stats.received, self.stats.reported, self.stats.stale
        );
        Ok(())
    }

    /// Handles one consumed candidate
    pub fn on_solution(&mut self, solution: Solution) -> io::Result<()> {
        if self.state == SupervisorState::ShuttingDown {
            return Ok(());
        }
        self.stats.received += 1;

        if solution.is_empty() {
            self.source.mark_acyclic();
            self.source.record_best(0);
            self.state = SupervisorState::AcyclicFound;
            writeln!(self.output, "The graph is acyclic!")?;
            self.output.flush()?;
            self.best = Some(solution);
            self.stats.reported += 1;
            self.shut_down("the graph is acyclic");
        } else if self
            .best
            .as_ref()
            .map_or(true, |best| solution.len() < best.len())
        {
            self.source.record_best(solution.len());
            writeln!(self.output, "{}", solution)?;
            self.output.flush()?;
            self.best = Some(solution);
            self.stats.reported += 1;
        } else {
            debug!("Discarded stale {}", solution);
            self.stats.stale += 1;
        }
        Ok(())
    }

    /// Enters the terminal state and tells every agent to stop
    pub fn shut_down(&mut self, reason: &str) {
        if self.state == SupervisorState::ShuttingDown {
            return;
        }
        info!("Shutting down: {}", reason);
        self.source.request_shutdown();
        self.state = SupervisorState::ShuttingDown;
    }
}

impl<S: SolutionSource, W: Write> IterativeAlgorithm for Supervisor<S, W> {
    type Error = io::Error;

    fn execute_step(&mut self) -> Result<(), Self::Error> {
        match self.source.receive().map_err(Into::into)? {
            Some(solution) => self.on_solution(solution),
            None if received_termination() => {
                self.shut_down("termination signal received");
                Ok(())
            }
            None => {
                self.shut_down("the channel stopped delivering");
                Ok(())
            }
        }
    }

    fn is_completed(&self) -> bool {
        self.state == SupervisorState::ShuttingDown
    }

    fn best_known_solution(&self) -> Option<&[Edge]> {
        self.best.as_ref().map(|s| s.edges())
    }
}
