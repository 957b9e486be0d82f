//! Fork-join execution over index ranges.
//!
//! Every bulk matrix operation is expressed as a loop over rows, columns or
//! entries run through [`ParallelRange`]. The range is cut into at most
//! `max_degree` contiguous chunks which run on the rayon pool; the call blocks
//! until every chunk has finished.

use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{MatrixError, Result};

/// Cooperative cancellation flag shared between a caller and running operations.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Returns the start offset and length of chunk `chunk` when `0..len` is split
/// between `chunk_count` consumers. Earlier chunks absorb the remainder.
pub fn split_range(len: usize, chunk: usize, chunk_count: usize) -> (usize, usize) {
    let chunk_size = len / chunk_count;
    let rem = len % chunk_count;

    let chunk_start = move |idx: usize| {
        if idx < rem {
            idx * (chunk_size + 1)
        } else {
            rem + idx * chunk_size
        }
    };

    let start = chunk_start(chunk);
    let end = chunk_start(chunk + 1);
    (start, end - start)
}

/// Partitions `[start, end)` across workers honoring a maximum degree of parallelism.
#[derive(Debug, Clone)]
pub struct ParallelRange {
    max_degree: usize,
    token: Option<CancellationToken>,
}

impl ParallelRange {
    /// A `max_degree` of zero is treated as one.
    pub fn new(max_degree: usize) -> Self {
        ParallelRange {
            max_degree: max_degree.max(1),
            token: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn max_degree(&self) -> usize {
        self.max_degree
    }

    /// Number of chunks a range of `len` indices is split into.
    pub fn chunk_count(&self, len: usize) -> usize {
        self.max_degree.min(len)
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.token {
            Some(token) if token.is_cancelled() => Err(MatrixError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Runs `body` for every index in `[start, end)` exactly once and returns the
    /// results in index order.
    ///
    /// A chunk stops at its first failure. The call still waits for every other
    /// chunk, then returns the failure of the earliest failing chunk.
    pub fn try_map<R, F>(&self, start: usize, end: usize, body: F) -> Result<Vec<R>>
    where
        R: Send,
        F: Fn(usize) -> Result<R> + Send + Sync,
    {
        if start >= end {
            return Ok(Vec::new());
        }
        self.check_cancelled()?;

        let len = end - start;
        let chunks = self.chunk_count(len);
        let run_chunk = |chunk: usize| -> Result<Vec<R>> {
            let (offset, size) = split_range(len, chunk, chunks);
            let mut out = Vec::with_capacity(size);
            for index in start + offset..start + offset + size {
                self.check_cancelled()?;
                out.push(body(index)?);
            }
            Ok(out)
        };

        let partials: Vec<Result<Vec<R>>> = if chunks == 1 {
            vec![run_chunk(0)]
        } else {
            (0..chunks).into_par_iter().map(run_chunk).collect()
        };

        let mut results = Vec::with_capacity(len);
        for partial in partials {
            results.extend(partial?);
        }
        Ok(results)
    }

    /// Runs `body` for every index in `[start, end)`; see [`try_map`](Self::try_map).
    pub fn for_each<F>(&self, start: usize, end: usize, body: F) -> Result<()>
    where
        F: Fn(usize) -> Result<()> + Send + Sync,
    {
        self.try_map(start, end, body).map(|_| ())
    }
}
