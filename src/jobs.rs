//! Parallel job execution for conversion kernels.
//!
//! Every kernel invocation is an independent unit of work executed on the
//! rayon thread pool; the helpers here are the join points that combine a
//! batch of such units before a dependent stage proceeds.
//!
//! Output buffers are never shared between jobs: [`split_ranges`] statically
//! partitions one buffer into disjoint per-primitive chunks, so the fan-out
//! in [`convert_chunks`] needs no locking.

use rayon::prelude::*;

/// Split a buffer into consecutive disjoint chunks of the given sizes.
///
/// The sizes must sum to at most `buf.len()`; any remainder after the last
/// chunk is dropped from the returned set.
pub fn split_ranges<'a>(mut buf: &'a mut [u8], sizes: &[usize]) -> Vec<&'a mut [u8]> {
    let mut chunks = Vec::with_capacity(sizes.len());
    for &size in sizes {
        let (head, tail) = buf.split_at_mut(size);
        chunks.push(head);
        buf = tail;
    }
    chunks
}

/// Run one conversion job per (chunk, item) pair in parallel and join.
///
/// Each job owns its chunk exclusively for the duration of the call. The
/// first error wins and fails the whole batch; per the buffer-construction
/// contract, a partially converted buffer is never returned.
pub fn convert_chunks<'a, I, T, E, F>(
    chunks: Vec<&'a mut [u8]>,
    items: &[I],
    job: F,
) -> Result<Vec<T>, E>
where
    I: Sync,
    T: Send,
    E: Send,
    F: Fn(&mut [u8], &I) -> Result<T, E> + Sync,
{
    chunks
        .into_par_iter()
        .zip(items.par_iter())
        .map(|(chunk, item)| job(chunk, item))
        .collect()
}

/// Run one job per item in parallel and join, collecting all results.
pub fn run_parallel<I, T, F>(items: &[I], job: F) -> Vec<T>
where
    I: Sync,
    T: Send,
    F: Fn(&I) -> T + Sync + Send,
{
    items.par_iter().map(job).collect()
}
