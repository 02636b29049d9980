//! Both long running loops (search agents and the supervisor) are implemented using the
//! [`IterativeAlgorithm`] trait.
//!
//! The idea is to do a small amount of work per step and to return, so the caller gets a chance
//! to look at termination requests and iteration limits between two steps. Nothing is ever
//! interrupted in the middle of a step.

use crate::graph::Edge;
use crate::signal_handling::received_termination;
use std::time::{Duration, Instant};

/// [`IterativeAlgorithm`] provides a consistent interface to drive our loops. It does not
/// prescribe a constructor; construction should be cheap.
///
/// As an adopter of [`IterativeAlgorithm`], you have to implement at least the methods
///   [`IterativeAlgorithm::execute_step`],
///   [`IterativeAlgorithm::is_completed`] and [`IterativeAlgorithm::best_known_solution`].
///
/// # Example
/// ```
/// use dfas::algorithm::IterativeAlgorithm;
/// use dfas::graph::Edge;
///
/// struct Countdown {
///     remaining: usize,
///     solution: Vec<Edge>,
/// }
///
/// impl IterativeAlgorithm for Countdown {
///     type Error = std::convert::Infallible;
///
///     fn execute_step(&mut self) -> Result<(), Self::Error> {
///         self.remaining -= 1;
///         Ok(())
///     }
///
///     fn is_completed(&self) -> bool {
///         self.remaining == 0
///     }
///
///     fn best_known_solution(&self) -> Option<&[Edge]> {
///         Some(&self.solution)
///     }
/// }
///
/// let mut algo = Countdown { remaining: 3, solution: vec![(1, 0)] };
/// algo.run_to_completion().unwrap();
/// assert_eq!(algo.best_known_solution_size(), Some(1));
/// ```
pub trait IterativeAlgorithm {
    type Error;

    /// Advances the computation of this algorithm by a small amount of work.
    fn execute_step(&mut self) -> Result<(), Self::Error>;

    /// Returns true iff the algorithm is completed and [`IterativeAlgorithm::execute_step`] may not
    /// be called again.
    fn is_completed(&self) -> bool;

    /// Returns the currently best known solution or None if no solution is known yet.
    fn best_known_solution(&self) -> Option<&[Edge]>;

    /// Returns the size of the currently best known solution.
    fn best_known_solution_size(&self) -> Option<usize> {
        Some(self.best_known_solution()?.len())
    }

    /// Keeps calling [`IterativeAlgorithm::execute_step`] as long as `predicate` returns true,
    /// no termination signal was received, and [`IterativeAlgorithm::is_completed`] is false. The
    /// predicate is evaluated after each step, i.e. at least one step is carried out unless the
    /// algorithm is already completed or a signal arrived.
    fn run_while<F>(&mut self, mut predicate: F) -> Result<(), Self::Error>
    where
        F: FnMut(&mut Self) -> bool,
        Self: Sized,
    {
        while !self.is_completed() && !received_termination() {
            self.execute_step()?;

            if !predicate(self) {
                break;
            }
        }
        Ok(())
    }

    /// Runs until a timeout occurred, a termination signal was received or the algorithm
    /// completed. The timeout is only checked between steps.
    fn run_until_timeout(&mut self, timeout: Duration) -> Result<(), Self::Error>
    where
        Self: Sized,
    {
        let start = Instant::now();
        self.run_while(|_| start.elapsed() < timeout)
    }

    /// Runs until the algorithm completed or a termination signal was received.
    fn run_to_completion(&mut self) -> Result<(), Self::Error>
    where
        Self: Sized,
    {
        self.run_while(|_| true)
    }
}
