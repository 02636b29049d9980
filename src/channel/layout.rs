//! Memory layout of the shared ring buffer. Supervisor and generators map the same bytes, so every
//! type in here is `#[repr(C)]` and sized by compile-time constants only.
use super::shm::SharedLayout;
use super::ChannelError;
use crate::graph::Node;
use crate::solution::{NotViable, Solution, MAX_VIABLE_COUNT};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

pub const LAYOUT_MAGIC: u32 = 0x4446_4153;
pub const LAYOUT_VERSION: u32 = 1;

const NO_SOLUTION: u32 = u32::MAX;

/// Identifies the constants a region was built with. Written once by the creator.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LayoutStamp {
    pub magic: u32,
    pub version: u32,
    pub capacity: u32,
    pub max_edges: u32,
}

impl LayoutStamp {
    pub fn current(capacity: usize) -> Self {
        Self {
            magic: LAYOUT_MAGIC,
            version: LAYOUT_VERSION,
            capacity: capacity as u32,
            max_edges: MAX_VIABLE_COUNT as u32,
        }
    }
}

#[repr(C)]
pub struct Slot {
    occupied: AtomicBool,
    len: UnsafeCell<u32>,
    edges: UnsafeCell<[[Node; 2]; MAX_VIABLE_COUNT]>,
}

impl Slot {
    fn is_occupied(&self) -> bool {
        self.occupied.load(Ordering::Acquire)
    }

    /// # Safety
    /// The caller has to be the only writer of this slot and the slot must be empty.
    unsafe fn store(&self, solution: &Solution) {
        let edges = &mut *self.edges.get();
        for (dst, &(u, v)) in edges.iter_mut().zip(solution.edges()) {
            *dst = [u, v];
        }
        *self.len.get() = solution.len() as u32;
        self.occupied.store(true, Ordering::Release);
    }

    /// # Safety
    /// The caller has to be the only reader of this slot and the slot must be occupied.
    unsafe fn take(&self) -> Result<Solution, ChannelError> {
        let len = *self.len.get() as usize;
        let edges = &*self.edges.get();
        let solution = match edges.get(..len) {
            Some(edges) => edges
                .iter()
                .try_fold(Solution::acyclic(), |mut solution, e| {
                    solution.push((e[0], e[1]))?;
                    Ok::<_, NotViable>(solution)
                })
                .map_err(|NotViable(len)| ChannelError::CorruptSlot(len)),
            None => Err(ChannelError::CorruptSlot(len)),
        };
        self.occupied.store(false, Ordering::Release);
        solution
    }
}

/// The single shared-memory record of a run: run-wide flags, the best size seen so far and a ring
/// of `CAP` solution slots.
///
/// Slot contents are only touched under the semaphore protocol of the channel: writers hold the
/// writer mutex and a free permit, the single reader holds a used permit. The flags are advisory
/// and may be read at any time.
#[repr(C)]
pub struct RingRegion<const CAP: usize> {
    initialized: AtomicBool,
    stamp: UnsafeCell<LayoutStamp>,
    acyclic: AtomicBool,
    shutdown: AtomicBool,
    best_size: AtomicU32,
    write_cursor: UnsafeCell<u32>,
    slots: [Slot; CAP],
}

// SAFETY: zero is a valid value for all fields; the UnsafeCells are only accessed by the single
// creator before publication (stamp) or under the semaphore protocol (cursor and slots).
unsafe impl<const CAP: usize> Sync for RingRegion<CAP> {}
unsafe impl<const CAP: usize> SharedLayout for RingRegion<CAP> {}

impl<const CAP: usize> RingRegion<CAP> {
    /// Writes the layout stamp and resets the shared state, then publishes the region.
    ///
    /// # Safety
    /// Must only be called by the creator before any other process attached.
    pub unsafe fn initialize(&self) {
        *self.stamp.get() = LayoutStamp::current(CAP);
        *self.write_cursor.get() = 0;
        for slot in &self.slots {
            slot.occupied.store(false, Ordering::Relaxed);
        }
        self.acyclic.store(false, Ordering::Relaxed);
        self.shutdown.store(false, Ordering::Relaxed);
        self.best_size.store(NO_SOLUTION, Ordering::Relaxed);
        self.initialized.store(true, Ordering::Release);
    }

    /// Checks that the creator published a region built with our constants
    pub fn validate(&self) -> Result<(), ChannelError> {
        if !self.initialized.load(Ordering::Acquire) {
            return Err(ChannelError::Uninitialized);
        }

        // SAFETY: the stamp is never written after `initialized` was published.
        let found = unsafe { *self.stamp.get() };
        let expected = LayoutStamp::current(CAP);
        if found != expected {
            return Err(ChannelError::LayoutMismatch { expected, found });
        }
        Ok(())
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    pub fn mark_acyclic(&self) {
        self.acyclic.store(true, Ordering::Release);
    }

    pub fn acyclic_found(&self) -> bool {
        self.acyclic.load(Ordering::Acquire)
    }

    /// Size of the smallest solution admitted so far, if any
    pub fn best_size(&self) -> Option<usize> {
        match self.best_size.load(Ordering::Acquire) {
            NO_SOLUTION => None,
            size => Some(size as usize),
        }
    }

    /// Lowers the best size to `size` if it is smaller; never raises it.
    pub fn record_best(&self, size: usize) {
        let size = u32::try_from(size).unwrap_or(NO_SOLUTION - 1).min(NO_SOLUTION - 1);
        self.best_size.fetch_min(size, Ordering::AcqRel);
    }

    /// Number of slots currently holding an unread solution
    pub fn occupied_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_occupied()).count()
    }

    /// Stores `solution` in the next empty slot at or after the write cursor.
    ///
    /// # Safety
    /// The caller holds the writer mutex and one free permit.
    pub unsafe fn push(&self, solution: &Solution) -> Result<(), ChannelError> {
        let cursor = &mut *self.write_cursor.get();
        for offset in 0..CAP {
            let index = (*cursor as usize + offset) % CAP;
            let slot = &self.slots[index];
            if !slot.is_occupied() {
                slot.store(solution);
                *cursor = ((index + 1) % CAP) as u32;
                return Ok(());
            }
        }
        Err(ChannelError::NoFreeSlot)
    }

    /// Takes the solution out of the next occupied slot at or after `read_cursor`.
    ///
    /// # Safety
    /// The caller is the only reader and holds one used permit.
    pub unsafe fn pop(&self, read_cursor: &mut usize) -> Result<Solution, ChannelError> {
        for offset in 0..CAP {
            let index = (*read_cursor + offset) % CAP;
            let slot = &self.slots[index];
            if slot.is_occupied() {
                *read_cursor = (index + 1) % CAP;
                return slot.take();
            }
        }
        Err(ChannelError::NoOccupiedSlot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region<const CAP: usize>() -> Box<RingRegion<CAP>> {
        // SAFETY: RingRegion is SharedLayout, so all-zero is a valid value.
        let region: Box<RingRegion<CAP>> = unsafe { Box::new(std::mem::zeroed()) };
        unsafe { region.initialize() };
        region
    }

    fn solution(edges: &[(Node, Node)]) -> Solution {
        Solution::try_from(edges).unwrap()
    }

    #[test]
    fn zeroed_region_is_not_valid() {
        let region: Box<RingRegion<4>> = unsafe { Box::new(std::mem::zeroed()) };
        assert!(matches!(region.validate(), Err(ChannelError::Uninitialized)));
        unsafe { region.initialize() };
        assert!(region.validate().is_ok());
    }

    #[test]
    fn stamp_mismatch_is_detected() {
        let region = region::<4>();
        unsafe { (*region.stamp.get()).version += 1 };
        assert!(matches!(
            region.validate(),
            Err(ChannelError::LayoutMismatch { .. })
        ));
    }

    #[test]
    fn flags_are_sticky_and_best_is_monotone() {
        let region = region::<2>();
        assert_eq!(region.best_size(), None);
        assert!(!region.shutdown_requested());
        assert!(!region.acyclic_found());

        region.record_best(5);
        region.record_best(7);
        assert_eq!(region.best_size(), Some(5));
        region.record_best(0);
        assert_eq!(region.best_size(), Some(0));

        region.mark_acyclic();
        region.request_shutdown();
        assert!(region.acyclic_found());
        assert!(region.shutdown_requested());
    }

    #[test]
    fn ring_is_fifo_and_wraps() {
        let region = region::<3>();
        let mut read_cursor = 0;

        for round in 0..4 {
            let a = solution(&[(round, 0)]);
            let b = solution(&[(round, 1), (1, round)]);
            unsafe {
                region.push(&a).unwrap();
                region.push(&b).unwrap();
            }
            assert_eq!(region.occupied_slots(), 2);
            unsafe {
                assert_eq!(region.pop(&mut read_cursor).unwrap(), a);
                assert_eq!(region.pop(&mut read_cursor).unwrap(), b);
            }
            assert_eq!(region.occupied_slots(), 0);
        }
    }

    #[test]
    fn full_and_empty_ring() {
        let region = region::<2>();
        let mut read_cursor = 0;
        unsafe {
            assert!(matches!(
                region.pop(&mut read_cursor),
                Err(ChannelError::NoOccupiedSlot)
            ));
            region.push(&Solution::acyclic()).unwrap();
            region.push(&solution(&[(1, 0)])).unwrap();
            assert!(matches!(
                region.push(&solution(&[(2, 0)])),
                Err(ChannelError::NoFreeSlot)
            ));
            assert_eq!(region.pop(&mut read_cursor).unwrap(), Solution::acyclic());
        }
    }

    #[test]
    fn corrupt_length_is_reported_and_freed() {
        let region = region::<2>();
        let mut read_cursor = 0;
        unsafe {
            region.push(&solution(&[(1, 0), (2, 1)])).unwrap();
            *region.slots[0].len.get() = MAX_VIABLE_COUNT as u32 + 1;
            assert!(matches!(
                region.pop(&mut read_cursor),
                Err(ChannelError::CorruptSlot(len)) if len == MAX_VIABLE_COUNT + 1
            ));
        }
        assert_eq!(region.occupied_slots(), 0);

        unsafe {
            region.push(&solution(&[(3, 0)])).unwrap();
            assert_eq!(region.pop(&mut read_cursor).unwrap(), solution(&[(3, 0)]));
        }
    }
}
