//! Chunked parallel execution of per-tile lighting work.
//!
//! Every worker floods into a private copy of the light buffer, claiming
//! fixed-size index chunks from a shared atomic cursor. The private maps are
//! then max-reduced into the first one and copied back to the caller.

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};

use glint_geom::Rgb;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Tiles claimed per cursor increment.
pub const CLAIM_CHUNK: usize = 32;
/// Tiles per task in the parallel max-reduction.
pub const REDUCE_CHUNK: usize = 64;

struct WorkerSlot<S> {
    map: Vec<Rgb>,
    scratch: S,
    work: u64,
}

impl<S: Default> WorkerSlot<S> {
    fn new() -> Self {
        Self {
            map: Vec::new(),
            scratch: S::default(),
            work: 0,
        }
    }
}

/// Fixed-size worker pool with a private light map and scratch `S` per worker.
pub struct WorkerPool<S> {
    threads: usize,
    pool: Option<ThreadPool>,
    slots: Vec<WorkerSlot<S>>,
}

impl<S: Default + Send> Default for WorkerPool<S> {
    fn default() -> Self {
        Self::new(1)
    }
}

impl<S: Default + Send> WorkerPool<S> {
    pub fn new(threads: usize) -> Self {
        let mut pool = Self {
            threads: 0,
            pool: None,
            slots: Vec::new(),
        };
        pool.resize(threads);
        pool
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Rebuilds the thread pool when the worker count changes. Private maps
    /// of surviving workers are kept.
    pub fn resize(&mut self, threads: usize) {
        let threads = threads.max(1);
        if threads == self.threads {
            return;
        }
        self.pool = None;
        self.threads = threads;
        if threads > 1 {
            match ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("glint-light-{i}"))
                .build()
            {
                Ok(pool) => self.pool = Some(pool),
                Err(e) => {
                    log::warn!(
                        target: "lighting",
                        "failed to build {threads}-thread lighting pool ({e}); running single-threaded"
                    );
                    self.threads = 1;
                }
            }
        }
        self.slots.truncate(self.threads);
        while self.slots.len() < self.threads {
            self.slots.push(WorkerSlot::new());
        }
        log::debug!(target: "lighting", "lighting workers: {}", self.threads);
    }

    fn ensure_capacity(&mut self, len: usize) {
        for slot in &mut self.slots {
            if slot.map.len() < len {
                slot.map.resize(len, Rgb::ZERO);
            }
        }
    }

    /// Runs `action` over `0..lights.len()` in chunks and writes the max-blended
    /// result back into `lights`.
    ///
    /// `action(source, map, scratch, range)` reads the untouched input through
    /// `source`, writes only into its worker's `map` (seeded with a copy of the
    /// input) and returns an approximate work count. Returns the summed work.
    pub fn run<F>(&mut self, lights: &mut [Rgb], action: F) -> u64
    where
        F: Fn(&[Rgb], &mut [Rgb], &mut S, Range<usize>) -> u64 + Sync,
    {
        let len = lights.len();
        self.ensure_capacity(len);
        let Self { pool, slots, .. } = self;

        let Some(pool) = pool.as_ref() else {
            let slot = &mut slots[0];
            let map = &mut slot.map[..len];
            map.copy_from_slice(lights);
            slot.work = action(lights, map, &mut slot.scratch, 0..len);
            lights.copy_from_slice(map);
            return slot.work;
        };

        let cursor = AtomicUsize::new(0);
        {
            let source: &[Rgb] = lights;
            let (cursor, action) = (&cursor, &action);
            pool.scope(|s| {
                for slot in slots.iter_mut() {
                    s.spawn(move |_| {
                        let map = &mut slot.map[..len];
                        map.copy_from_slice(source);
                        slot.work = 0;
                        loop {
                            let begin = cursor.fetch_add(CLAIM_CHUNK, Ordering::Relaxed);
                            if begin >= len {
                                break;
                            }
                            let end = (begin + CLAIM_CHUNK).min(len);
                            slot.work += action(source, map, &mut slot.scratch, begin..end);
                        }
                    });
                }
            });
        }

        let work = slots.iter().map(|s| s.work).sum();
        let (first, rest) = slots.split_at_mut(1);
        let acc = &mut first[0].map[..len];
        let others: Vec<&[Rgb]> = rest.iter().map(|s| &s.map[..len]).collect();
        pool.install(|| {
            acc.par_chunks_mut(REDUCE_CHUNK)
                .zip(lights.par_chunks_mut(REDUCE_CHUNK))
                .enumerate()
                .for_each(|(c, (acc, out))| {
                    let begin = c * REDUCE_CHUNK;
                    for other in &others {
                        let theirs = &other[begin..begin + acc.len()];
                        for (a, b) in acc.iter_mut().zip(theirs) {
                            *a = a.max(*b);
                        }
                    }
                    out.copy_from_slice(acc);
                });
        });
        work
    }

    /// Applies `f(chunk_index, chunk)` to consecutive chunks of `data`, in
    /// parallel on the pool when one exists.
    pub fn for_each_chunk<T, F>(&self, data: &mut [T], chunk: usize, f: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Sync + Send,
    {
        if chunk == 0 {
            return;
        }
        match &self.pool {
            Some(pool) => pool.install(|| {
                data.par_chunks_mut(chunk)
                    .enumerate()
                    .for_each(|(i, c)| f(i, c))
            }),
            None => data
                .chunks_mut(chunk)
                .enumerate()
                .for_each(|(i, c)| f(i, c)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spread_right(source: &[Rgb], map: &mut [Rgb], calls: &mut usize, range: Range<usize>) -> u64 {
        *calls += 1;
        for i in range.clone() {
            if i + 1 < map.len() {
                map[i + 1] = map[i + 1].max(source[i] * 0.5);
            }
        }
        range.len() as u64
    }

    #[test]
    fn pool_matches_inline_run() {
        let input: Vec<Rgb> = (0..1000).map(|i| Rgb::splat((i % 7) as f32)).collect();

        let mut single = WorkerPool::<usize>::new(1);
        let mut a = input.clone();
        let work_a = single.run(&mut a, spread_right);

        let mut multi = WorkerPool::<usize>::new(4);
        let mut b = input.clone();
        let work_b = multi.run(&mut b, spread_right);

        assert_eq!(a, b);
        assert_eq!(work_a, 1000);
        assert_eq!(work_b, 1000);
    }

    #[test]
    fn resize_keeps_one_slot_per_worker() {
        let mut pool = WorkerPool::<()>::new(3);
        assert_eq!(pool.threads(), 3);
        pool.resize(1);
        assert_eq!(pool.threads(), 1);
        assert!(pool.pool.is_none());
        assert_eq!(pool.slots.len(), 1);
        pool.resize(0);
        assert_eq!(pool.threads(), 1);
    }

    #[test]
    fn for_each_chunk_visits_every_column() {
        let pool = WorkerPool::<()>::new(2);
        let mut data = vec![0usize; 12];
        pool.for_each_chunk(&mut data, 4, |i, c| c.iter_mut().for_each(|v| *v = i));
        assert_eq!(data, vec![0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2]);
    }
}
