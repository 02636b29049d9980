//! Bounded multi-producer/single-consumer channel for [`Solution`]s between processes.
//!
//! The channel lives in one POSIX shared memory segment holding a [`RingRegion`] and is guarded by
//! three named semaphores: `free` counts empty slots, `used` counts filled slots and `excl`
//! serializes writers. The supervisor creates all four resources through a [`SolutionReceiver`]
//! and is the only reader; any number of generator processes attach a [`SolutionSender`].
//!
//! Every blocking wait is bounded by the configured poll interval. After a timeout or a signal
//! the waiter re-checks its stop conditions, so no process waits forever on a peer that left.
pub mod layout;
pub mod semaphore;
pub mod shm;

use crate::config::ChannelConfig;
use crate::signal_handling::received_termination;
use crate::solution::Solution;
use layout::{LayoutStamp, RingRegion};
use log::{debug, info, trace};
use semaphore::{NamedSemaphore, WaitOutcome};
use shm::SharedMapping;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Number of slots in the ring buffer
pub const BUFFER_CAPACITY: usize = 8;

pub type Receiver = SolutionReceiver<BUFFER_CAPACITY>;
pub type Sender = SolutionSender<BUFFER_CAPACITY>;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("cannot {operation} semaphore {name}: {source}")]
    Semaphore {
        operation: &'static str,
        name: String,
        source: io::Error,
    },

    #[error("cannot {operation} shared memory {name}: {source}")]
    SharedMemory {
        operation: &'static str,
        name: String,
        source: io::Error,
    },

    #[error("shared memory {name} has {found} bytes, expected {expected}")]
    SizeMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("shared memory was built with {found:?}, expected {expected:?}")]
    LayoutMismatch {
        expected: LayoutStamp,
        found: LayoutStamp,
    },

    #[error("shared memory was not initialized by its creator")]
    Uninitialized,

    #[error("invalid resource name {0:?}")]
    InvalidName(String),

    #[error("no free slot although a free permit was held")]
    NoFreeSlot,

    #[error("no filled slot although a used permit was held")]
    NoOccupiedSlot,

    #[error("slot holds {0} edges")]
    CorruptSlot(usize),
}

impl From<ChannelError> for io::Error {
    fn from(error: ChannelError) -> Self {
        let kind = match &error {
            ChannelError::Semaphore { source, .. } | ChannelError::SharedMemory { source, .. } => {
                source.kind()
            }
            ChannelError::InvalidName(_) => io::ErrorKind::InvalidInput,
            _ => io::ErrorKind::InvalidData,
        };
        io::Error::new(kind, error)
    }
}

/// Snapshot of the buffer accounting. While no writer is inside the critical section,
/// `used + free == capacity` and `occupied_slots == used`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Occupancy {
    pub used: usize,
    pub free: usize,
    pub occupied_slots: usize,
}

/// Outcome of [`SolutionSender::publish`] that is not an error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Publish {
    /// The solution is in the buffer
    Written,
    /// A stop condition came up while waiting; nothing was written
    Abandoned,
}

/// Resources shared by both ends of the channel
struct ChannelCore<const CAP: usize> {
    region: SharedMapping<RingRegion<CAP>>,
    free: NamedSemaphore,
    used: NamedSemaphore,
    mutex: NamedSemaphore,
    poll_interval: Duration,
}

impl<const CAP: usize> ChannelCore<CAP> {
    /// Waits on `semaphore` in rounds of one poll interval until it is acquired (`true`) or
    /// `stop` returns true (`false`). `stop` is evaluated before every round.
    fn acquire<F: Fn() -> bool>(
        &self,
        semaphore: &NamedSemaphore,
        stop: F,
    ) -> Result<bool, ChannelError> {
        loop {
            if stop() {
                return Ok(false);
            }

            match semaphore.wait_timeout(self.poll_interval)? {
                WaitOutcome::Acquired => return Ok(true),
                outcome => trace!("Waiting on {}: {:?}", semaphore.name(), outcome),
            }
        }
    }

    fn occupancy(&self) -> Result<Occupancy, ChannelError> {
        Ok(Occupancy {
            used: self.used.value()?.max(0) as usize,
            free: self.free.value()?.max(0) as usize,
            occupied_slots: self.region.occupied_slots(),
        })
    }
}

/// Reading end of the channel. Creates the shared memory segment and the semaphores, and removes
/// them from the system again when dropped. There must only be one receiver per namespace.
pub struct SolutionReceiver<const CAP: usize> {
    core: ChannelCore<CAP>,
    read_cursor: usize,
}

impl<const CAP: usize> SolutionReceiver<CAP> {
    /// Creates all named resources of `config`. Fails if any of them already exists; see
    /// [`SolutionReceiver::remove_stale`].
    pub fn create(config: &ChannelConfig) -> Result<Self, ChannelError> {
        let free = NamedSemaphore::create(&config.free_name(), CAP as u32)?;
        let used = NamedSemaphore::create(&config.used_name(), 0)?;
        let mutex = NamedSemaphore::create(&config.mutex_name(), 1)?;
        let region = SharedMapping::<RingRegion<CAP>>::create(&config.ring_name())?;

        // SAFETY: we just created the segment, nobody else can have attached yet.
        unsafe { region.initialize() };

        info!(
            "Created channel {} with {} slots of up to {} edges",
            config.namespace,
            CAP,
            crate::solution::MAX_VIABLE_COUNT
        );

        Ok(Self {
            core: ChannelCore {
                region,
                free,
                used,
                mutex,
                poll_interval: config.poll_interval,
            },
            read_cursor: 0,
        })
    }

    /// Removes the named resources of `config` left behind by a run that did not shut down
    /// cleanly. Names that do not exist are skipped.
    pub fn remove_stale(config: &ChannelConfig) -> Result<(), ChannelError> {
        SharedMapping::<RingRegion<CAP>>::unlink(&config.ring_name())?;
        NamedSemaphore::unlink(&config.free_name())?;
        NamedSemaphore::unlink(&config.used_name())?;
        NamedSemaphore::unlink(&config.mutex_name())?;
        Ok(())
    }

    /// Blocks until a solution can be taken out of the buffer. Returns `None` without consuming
    /// anything once shutdown was requested or this process received a termination signal.
    pub fn receive(&mut self) -> Result<Option<Solution>, ChannelError> {
        let core = &self.core;
        let stop = || received_termination() || core.region.shutdown_requested();
        if !core.acquire(&core.used, stop)? {
            return Ok(None);
        }

        // SAFETY: we are the only reader and hold a used permit.
        let solution = unsafe { core.region.pop(&mut self.read_cursor) };
        // A corrupt slot is emptied as well; only an empty ring has nothing to give back.
        if !matches!(solution, Err(ChannelError::NoOccupiedSlot)) {
            core.free.post()?;
        }
        solution.map(Some)
    }

    /// Tells all senders to stop. Sticky.
    pub fn request_shutdown(&self) {
        self.core.region.request_shutdown();
    }

    pub fn shutdown_requested(&self) -> bool {
        self.core.region.shutdown_requested()
    }

    /// Announces that an empty solution was found. Sticky.
    pub fn mark_acyclic(&self) {
        self.core.region.mark_acyclic();
    }

    pub fn acyclic_found(&self) -> bool {
        self.core.region.acyclic_found()
    }

    /// Lowers the shared best size; see [`RingRegion::record_best`]
    pub fn record_best(&self, size: usize) {
        self.core.region.record_best(size);
    }

    pub fn best_size(&self) -> Option<usize> {
        self.core.region.best_size()
    }

    pub fn occupancy(&self) -> Result<Occupancy, ChannelError> {
        self.core.occupancy()
    }
}

impl<const CAP: usize> Drop for SolutionReceiver<CAP> {
    fn drop(&mut self) {
        // Senders still mapping the region observe this after the names are gone.
        self.core.region.request_shutdown();
        debug!("Removing channel {}", self.core.region.name());
    }
}

/// Writing end of the channel. Attaches to resources created by a [`SolutionReceiver`] and never
/// removes them.
pub struct SolutionSender<const CAP: usize> {
    core: ChannelCore<CAP>,
}

impl<const CAP: usize> SolutionSender<CAP> {
    /// Attaches to the channel of `config`. Fails if the receiver has not created it yet or if it
    /// was built with different constants.
    pub fn attach(config: &ChannelConfig) -> Result<Self, ChannelError> {
        let region = SharedMapping::<RingRegion<CAP>>::open(&config.ring_name())?;
        region.validate()?;

        let free = NamedSemaphore::open(&config.free_name())?;
        let used = NamedSemaphore::open(&config.used_name())?;
        let mutex = NamedSemaphore::open(&config.mutex_name())?;

        info!("Attached to channel {}", config.namespace);

        Ok(Self {
            core: ChannelCore {
                region,
                free,
                used,
                mutex,
                poll_interval: config.poll_interval,
            },
        })
    }

    /// Writes `solution` into the buffer, blocking while the buffer is full. Gives up with
    /// [`Publish::Abandoned`] if shutdown is requested, an empty solution is announced, or this
    /// process receives a termination signal while waiting.
    ///
    /// Writers take the writer mutex before a free permit, so a writer blocked on a full buffer
    /// holds the mutex. This is fine as long as the single reader never needs the mutex.
    pub fn publish(&self, solution: &Solution) -> Result<Publish, ChannelError> {
        let core = &self.core;
        if !core.acquire(&core.mutex, || self.should_stop())? {
            return Ok(Publish::Abandoned);
        }

        let result = self.publish_exclusive(solution);
        core.mutex.post()?;
        result
    }

    /// The part of [`SolutionSender::publish`] carried out while holding the writer mutex
    fn publish_exclusive(&self, solution: &Solution) -> Result<Publish, ChannelError> {
        let core = &self.core;
        if !core.acquire(&core.free, || self.should_stop())? {
            return Ok(Publish::Abandoned);
        }

        // SAFETY: we hold the writer mutex and a free permit.
        if let Err(e) = unsafe { core.region.push(solution) } {
            core.free.post()?;
            return Err(e);
        }
        core.region.record_best(solution.len());
        core.used.post()?;
        Ok(Publish::Written)
    }

    /// True if waiting for buffer space is pointless
    pub fn should_stop(&self) -> bool {
        received_termination() || self.shutdown_requested() || self.acyclic_found()
    }

    pub fn shutdown_requested(&self) -> bool {
        self.core.region.shutdown_requested()
    }

    pub fn acyclic_found(&self) -> bool {
        self.core.region.acyclic_found()
    }

    /// Size of the smallest solution admitted into the buffer so far
    pub fn best_size(&self) -> Option<usize> {
        self.core.region.best_size()
    }

    pub fn occupancy(&self) -> Result<Occupancy, ChannelError> {
        self.core.occupancy()
    }
}
