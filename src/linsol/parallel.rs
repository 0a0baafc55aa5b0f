//! Worker pool shared by the cooperative sparse backend.
//!
//! The pool is created and owned by the caller and only borrowed by the
//! solvers. Each worker owns a contiguous block of matrix rows; collective
//! operations run one task per block inside the pool and complete only when
//! every worker has returned.

use std::{fmt, ops::Range, sync::Arc};

use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};

use crate::{Float, error::LinSolError, matrix::Triplet};

/// Caller-supplied handle to a fixed set of cooperating workers.
#[derive(Clone)]
pub struct ParallelContext {
    pool: Arc<ThreadPool>,
    nworkers: usize,
}

impl ParallelContext {
    /// Starts a pool with `nworkers` threads.
    pub fn new(nworkers: usize) -> Result<Self, LinSolError> {
        if nworkers == 0 {
            return Err(LinSolError::Workers("at least one worker is required".to_string()));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(nworkers)
            .thread_name(|i| format!("radau-worker-{}", i))
            .build()
            .map_err(|e| LinSolError::Workers(e.to_string()))?;
        Ok(Self {
            pool: Arc::new(pool),
            nworkers,
        })
    }

    pub fn nworkers(&self) -> usize {
        self.nworkers
    }

    /// Splits `0..n` into at most `nworkers` contiguous, non-empty ranges.
    pub(crate) fn partition(&self, n: usize) -> Vec<Range<usize>> {
        let parts = self.nworkers.min(n).max(1);
        let base = n / parts;
        let extra = n % parts;
        let mut start = 0;
        (0..parts)
            .map(|p| {
                let len = base + usize::from(p < extra);
                let r = start..start + len;
                start += len;
                r
            })
            .collect()
    }

    /// Every worker gathers its own rows of `a`. Fails if any worker finds a
    /// non-finite entry.
    pub(crate) fn scatter_rows(&self, a: &Triplet) -> Result<Vec<RowBlock>, LinSolError> {
        let ranges = self.partition(a.nrow());
        self.pool.install(|| {
            ranges
                .into_par_iter()
                .map(|rows| RowBlock::gather(a, rows))
                .collect::<Result<Vec<_>, _>>()
        })
    }

    /// Collective residual `r = b - A·x`, each worker filling its rows.
    /// Non-finite values are passed through to the caller, as the serial
    /// solve does.
    pub(crate) fn residual(&self, blocks: &[RowBlock], b: &[Float], x: &[Float]) -> Vec<Float> {
        let parts: Vec<Vec<Float>> =
            self.pool.install(|| blocks.par_iter().map(|blk| blk.residual(b, x)).collect());
        parts.concat()
    }
}

impl fmt::Debug for ParallelContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelContext")
            .field("nworkers", &self.nworkers)
            .finish()
    }
}

/// Rows `range` of a matrix in compressed row form, owned by one worker.
#[derive(Debug)]
pub(crate) struct RowBlock {
    range: Range<usize>,
    rows: Vec<Vec<(usize, Float)>>,
}

impl RowBlock {
    fn gather(a: &Triplet, range: Range<usize>) -> Result<Self, LinSolError> {
        let mut rows = vec![Vec::new(); range.len()];
        for (i, j, v) in a.iter() {
            if !range.contains(&i) {
                continue;
            }
            if !v.is_finite() {
                return Err(LinSolError::NonFinite(i, j));
            }
            rows[i - range.start].push((j, v));
        }
        Ok(Self { range, rows })
    }

    fn residual(&self, b: &[Float], x: &[Float]) -> Vec<Float> {
        self.range
            .clone()
            .zip(&self.rows)
            .map(|(i, row)| b[i] - row.iter().map(|&(j, v)| v * x[j]).sum::<Float>())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::ParallelContext;

    #[test]
    fn partition_covers_all_rows() {
        let ctx = ParallelContext::new(3).unwrap();
        let parts = ctx.partition(10);
        assert_eq!(parts, vec![0..4, 4..7, 7..10]);
        assert_eq!(ctx.partition(2), vec![0..1, 1..2]);
    }

    #[test]
    fn zero_workers_is_an_error() {
        assert!(ParallelContext::new(0).is_err());
    }
}
