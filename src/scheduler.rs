//! Region scheduling and per-worker execution contexts.
//!
//! The scheduler splits an output volume into disjoint slabs along its last
//! axis and runs one invocation per slab. Each concurrently running slab gets
//! exclusive use of one context from a [`WorkerArena`], so plan caches and
//! their buffers are never touched by two threads at once.

use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

#[cfg(feature = "std")]
use std::sync::OnceLock;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::SpectraError;
use crate::volume::{Volume, VolumeSlab};

/// Environment variable holding the default worker count.
pub const THREADS_ENV: &str = "SPECTRA1D_THREADS";

/// Programmatic override of the worker count. `0` means no override.
static WORKER_THREAD_OVERRIDE: AtomicUsize = AtomicUsize::new(0);

#[cfg(feature = "std")]
static ENV_THREADS: OnceLock<usize> = OnceLock::new();

#[cfg(feature = "std")]
fn env_threads() -> usize {
    *ENV_THREADS.get_or_init(|| {
        std::env::var(THREADS_ENV)
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or_else(|| num_cpus::get().max(1))
    })
}

/// Override the number of workers used by [`RegionScheduler::from_env`].
/// Passing `0` reverts to the environment variable or the CPU count.
pub fn set_worker_threads(threads: usize) {
    WORKER_THREAD_OVERRIDE.store(threads, Ordering::Relaxed);
}

/// Number of workers the scheduler uses by default.
pub fn worker_threads() -> usize {
    let override_thr = WORKER_THREAD_OVERRIDE.load(Ordering::Relaxed);
    if override_thr != 0 {
        return override_thr;
    }
    #[cfg(feature = "std")]
    {
        env_threads()
    }
    #[cfg(not(feature = "std"))]
    {
        1
    }
}

/// One execution context per worker slot.
///
/// Contexts live as long as the arena, so state such as a cached plan
/// carries over from one invocation to the next.
pub struct WorkerArena<C> {
    slots: Vec<C>,
}

impl<C> WorkerArena<C> {
    /// Create `workers` contexts (at least one) with `make`.
    pub fn new(workers: usize, mut make: impl FnMut() -> C) -> Self {
        let slots = (0..workers.max(1)).map(|_| make()).collect();
        Self { slots }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<&C> {
        self.slots.get(slot)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut C> {
        self.slots.get_mut(slot)
    }

    pub fn slots_mut(&mut self) -> &mut [C] {
        &mut self.slots
    }
}

/// Splits output volumes into slabs and dispatches one call per slab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionScheduler {
    workers: usize,
}

impl Default for RegionScheduler {
    fn default() -> Self {
        Self::from_env()
    }
}

impl RegionScheduler {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Use [`worker_threads`] workers.
    pub fn from_env() -> Self {
        Self::new(worker_threads())
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Number of slabs an output volume is split into for an arena of
    /// `contexts` slots.
    pub fn partition(&self, contexts: usize) -> usize {
        self.workers.min(contexts).max(1)
    }

    /// Run `f` once per slab of `output`, slab `i` with context `i` of
    /// `arena`.
    ///
    /// Every slab runs to completion even when a sibling fails; the first
    /// error in slab order is returned.
    pub fn dispatch<P, C, F, const D: usize>(
        &self,
        output: &mut Volume<P, D>,
        arena: &mut WorkerArena<C>,
        f: F,
    ) -> Result<(), SpectraError>
    where
        P: Send,
        C: Send,
        F: Fn(&mut C, &mut VolumeSlab<'_, P, D>) -> Result<(), SpectraError> + Sync,
    {
        let pieces = self.partition(arena.len());
        let mut slabs = output.slabs_mut(pieces);
        debug_log!(
            "dispatching {} slab(s) across {} context(s)",
            slabs.len(),
            arena.len()
        );
        let contexts = arena.slots_mut();

        #[cfg(feature = "parallel")]
        let results: Vec<Result<(), SpectraError>> = slabs
            .par_iter_mut()
            .zip(contexts.par_iter_mut())
            .map(|(slab, ctx)| f(ctx, slab))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let results: Vec<Result<(), SpectraError>> = slabs
            .iter_mut()
            .zip(contexts.iter_mut())
            .map(|(slab, ctx)| f(ctx, slab))
            .collect();

        results.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Region;

    #[test]
    fn test_arena_has_at_least_one_slot() {
        let arena = WorkerArena::new(0, || 0u32);
        assert_eq!(arena.len(), 1);
        let mut count = 0;
        let arena = WorkerArena::new(4, || {
            count += 1;
            count
        });
        assert_eq!(arena.get(3), Some(&4));
        assert_eq!(arena.get(4), None);
    }

    #[test]
    fn test_dispatch_visits_every_pixel_once() {
        let mut out = Volume::new(Region::from_size([3, 10]), 0u32).unwrap();
        let mut arena = WorkerArena::new(4, || 0usize);
        RegionScheduler::new(4)
            .dispatch(&mut out, &mut arena, |calls, slab| {
                *calls += 1;
                for (_, px) in slab.pixels_mut() {
                    *px += 1;
                }
                Ok(())
            })
            .unwrap();
        assert!(out.as_slice().iter().all(|&v| v == 1));
        assert_eq!(arena.slots_mut().iter().sum::<usize>(), 4);
    }

    #[test]
    fn test_failing_slab_does_not_stop_siblings() {
        let mut out = Volume::new(Region::from_size([2, 4]), 0u8).unwrap();
        let mut arena = WorkerArena::new(4, || ());
        let err = RegionScheduler::new(4)
            .dispatch(&mut out, &mut arena, |_, slab| {
                if slab.region().index[1] == 1 {
                    return Err(SpectraError::RegionOutsideVolume);
                }
                for (_, px) in slab.pixels_mut() {
                    *px = 9;
                }
                Ok(())
            })
            .unwrap_err();
        assert_eq!(err, SpectraError::RegionOutsideVolume);
        assert_eq!(out.as_slice(), &[9, 9, 0, 0, 9, 9, 9, 9]);
    }

    #[test]
    fn test_partition_limited_by_contexts() {
        let sched = RegionScheduler::new(8);
        assert_eq!(sched.partition(2), 2);
        assert_eq!(RegionScheduler::new(0).workers(), 1);
    }
}
