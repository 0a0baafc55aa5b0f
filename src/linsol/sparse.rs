//! Sparse LU backend.
//!
//! Left-looking column LU with threshold partial pivoting. Column `j` of the
//! factors is computed from column `j` of `A` and the previously computed
//! columns of `L`, visited in pivot order through a min-heap so that only
//! the structurally reachable columns are touched. A pivot on the diagonal
//! is preferred while it is within [`PIVOT_THRESHOLD`] of the largest
//! candidate, which keeps fill-in low on the diagonally dominant iteration
//! matrices of the integrator. The finished factors are stored as `sprs`
//! CSC matrices and applied with its triangular solvers.

use std::{cmp::Reverse, collections::BinaryHeap};

use sprs::{
    CsMat, TriMat,
    errors::LinalgError,
    linalg::trisolve::{lsolve_csc_dense_rhs, usolve_csc_dense_rhs},
};

use crate::{Float, error::LinSolError, matrix::Triplet};

use super::{
    Handle, LinSolKind, LinSolver, check_square,
    parallel::{ParallelContext, RowBlock},
};

const PIVOT_THRESHOLD: Float = 0.1;
const UNPIVOTED: usize = usize::MAX;

/// Sparse LU factors, `P·A = L·U`, with rows of `L` and `U` numbered by
/// pivot step.
#[derive(Debug, Clone)]
struct SparseLu {
    /// Unit lower triangle, diagonal stored.
    l: CsMat<Float>,
    u: CsMat<Float>,
    /// Original row chosen as pivot at each step.
    prow: Vec<usize>,
}

impl SparseLu {
    fn factor(n: usize, cols: &[Vec<(usize, Float)>], tol: Float) -> Result<Self, LinSolError> {
        let mut row_sums = vec![0.0; n];
        for col in cols {
            for &(i, v) in col {
                row_sums[i] += v.abs();
            }
        }
        let threshold = tol * row_sums.iter().copied().fold(0.0, Float::max);

        // column k of L below the diagonal as (original row, multiplier)
        let mut l_cols: Vec<Vec<(usize, Float)>> = Vec::with_capacity(n);
        let mut u = TriMat::new((n, n));
        let mut prow = Vec::with_capacity(n);
        let mut pinv = vec![UNPIVOTED; n];
        let mut x = vec![0.0; n];
        let mut mark = vec![false; n];
        let mut pattern: Vec<usize> = Vec::new();
        let mut heap: BinaryHeap<Reverse<usize>> = BinaryHeap::new();

        for (j, col) in cols.iter().enumerate() {
            for &(i, v) in col {
                if !mark[i] {
                    mark[i] = true;
                    pattern.push(i);
                    if pinv[i] != UNPIVOTED {
                        heap.push(Reverse(pinv[i]));
                    }
                }
                x[i] += v;
            }

            // sparse triangular solve with the columns of L computed so far
            while let Some(Reverse(k)) = heap.pop() {
                let ukj = x[prow[k]];
                if ukj == 0.0 {
                    continue;
                }
                u.add_triplet(k, j, ukj);
                for &(i, l) in &l_cols[k] {
                    if !mark[i] {
                        mark[i] = true;
                        pattern.push(i);
                        if pinv[i] != UNPIVOTED {
                            heap.push(Reverse(pinv[i]));
                        }
                    }
                    x[i] -= l * ukj;
                }
            }

            // pivot
            let mut best = UNPIVOTED;
            let mut maxabs = 0.0;
            for &i in &pattern {
                if pinv[i] == UNPIVOTED && x[i].abs() > maxabs {
                    maxabs = x[i].abs();
                    best = i;
                }
            }
            if best == UNPIVOTED || maxabs <= threshold || !maxabs.is_finite() {
                return Err(LinSolError::Singular(j));
            }
            let piv = if pinv[j] == UNPIVOTED && x[j].abs() >= PIVOT_THRESHOLD * maxabs {
                j
            } else {
                best
            };
            let d = x[piv];
            pinv[piv] = j;
            prow.push(piv);
            u.add_triplet(j, j, d);
            l_cols.push(
                pattern
                    .iter()
                    .filter(|&&i| pinv[i] == UNPIVOTED && x[i] != 0.0)
                    .map(|&i| (i, x[i] / d))
                    .collect(),
            );

            for &i in &pattern {
                x[i] = 0.0;
                mark[i] = false;
            }
            pattern.clear();
        }

        // every row is pivoted now, so L can be renumbered by pivot step
        let mut l = TriMat::new((n, n));
        for (k, col) in l_cols.iter().enumerate() {
            l.add_triplet(k, k, 1.0);
            for &(i, v) in col {
                l.add_triplet(pinv[i], k, v);
            }
        }
        Ok(SparseLu {
            l: l.to_csc(),
            u: u.to_csc(),
            prow,
        })
    }

    fn solve_mut(&self, b: &mut [Float]) -> Result<(), LinSolError> {
        let n = self.prow.len();
        if b.len() != n {
            return Err(LinSolError::RhsLength {
                expected: n,
                got: b.len(),
            });
        }
        let mut w: Vec<Float> = self.prow.iter().map(|&i| b[i]).collect();
        lsolve_csc_dense_rhs(self.l.view(), &mut w).map_err(singular)?;
        usolve_csc_dense_rhs(self.u.view(), &mut w).map_err(singular)?;
        b.copy_from_slice(&w);
        Ok(())
    }

    fn nnz(&self) -> usize {
        self.l.nnz() + self.u.nnz() - self.prow.len()
    }
}

fn singular(e: LinalgError) -> LinSolError {
    match e {
        LinalgError::SingularMatrix(info) => LinSolError::Singular(info.index),
        other => LinSolError::Backend(other.to_string()),
    }
}

#[derive(Debug)]
struct Factored {
    handle: Handle,
    lu: SparseLu,
    /// Row partitions held by the workers, empty without a context.
    blocks: Vec<RowBlock>,
}

/// Sparse direct solver, optionally shared by the workers of a
/// [`ParallelContext`]. With a context, the rows are distributed over the
/// workers during factorization and every solve finishes with one step of
/// iterative refinement whose residual is computed collectively.
#[derive(Debug)]
pub struct SparseSolver {
    n: usize,
    tol: Float,
    ctx: Option<ParallelContext>,
    state: Option<Factored>,
}

impl SparseSolver {
    pub fn new(n: usize, tol: Float, ctx: Option<ParallelContext>) -> Self {
        Self {
            n,
            tol,
            ctx,
            state: None,
        }
    }

    /// Number of workers sharing the factorization (1 without a context).
    pub fn nworkers(&self) -> usize {
        self.ctx.as_ref().map_or(1, ParallelContext::nworkers)
    }
}

impl LinSolver for SparseSolver {
    fn kind(&self) -> LinSolKind {
        LinSolKind::Sparse
    }

    fn factorize(&mut self, a: &Triplet) -> Result<Handle, LinSolError> {
        self.state = None;
        check_square(a, self.n)?;
        let blocks = match &self.ctx {
            Some(ctx) => ctx.scatter_rows(a)?,
            None => {
                if let Some((i, j, _)) = a.iter().find(|(_, _, v)| !v.is_finite()) {
                    return Err(LinSolError::NonFinite(i, j));
                }
                Vec::new()
            }
        };
        let csc = a.to_csc();
        let cols: Vec<Vec<(usize, Float)>> = csc
            .outer_iterator()
            .map(|col| col.iter().map(|(i, &v)| (i, v)).collect())
            .collect();
        let lu = SparseLu::factor(self.n, &cols, self.tol)?;
        log::trace!(
            "sparse LU: n = {}, nnz(A) = {}, nnz(LU) = {}, workers = {}",
            self.n,
            csc.nnz(),
            lu.nnz(),
            self.nworkers()
        );
        let handle = Handle::fresh();
        self.state = Some(Factored { handle, lu, blocks });
        Ok(handle)
    }

    fn solve(&self, handle: Handle, rhs: &mut [Float]) -> Result<(), LinSolError> {
        let state = match &self.state {
            None => return Err(LinSolError::NotFactorized),
            Some(s) if s.handle != handle => return Err(LinSolError::StaleHandle),
            Some(s) => s,
        };
        match &self.ctx {
            None => state.lu.solve_mut(rhs),
            Some(ctx) => {
                let b = rhs.to_vec();
                state.lu.solve_mut(rhs)?;
                let mut d = ctx.residual(&state.blocks, &b, rhs);
                state.lu.solve_mut(&mut d)?;
                rhs.iter_mut().zip(&d).for_each(|(x, dx)| *x += dx);
                Ok(())
            }
        }
    }

    fn free(&mut self) {
        self.state = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn off_diagonal_pivot_is_chosen_when_diagonal_is_zero() {
        // [[0, 1, 0], [2, 0, 1], [0, 3, 4]]
        let mut a = Triplet::new(3, 3);
        a.put(0, 1, 1.0);
        a.put(1, 0, 2.0);
        a.put(1, 2, 1.0);
        a.put(2, 1, 3.0);
        a.put(2, 2, 4.0);
        let mut ls = SparseSolver::new(3, 1e-14, None);
        let h = ls.factorize(&a).unwrap();
        let xref = [1.0, -2.0, 0.5];
        let mut b = vec![0.0; 3];
        a.mul_vec(&xref, &mut b);
        ls.solve(h, &mut b).unwrap();
        for i in 0..3 {
            assert!((b[i] - xref[i]).abs() < 1e-14);
        }
    }

    #[test]
    fn block_matrix_with_fill_in_is_solved() {
        // arrow matrix: dense first row and column
        let n = 8;
        let mut a = Triplet::new(n, n);
        for i in 0..n {
            a.put(i, i, 10.0);
            if i > 0 {
                a.put(0, i, 1.0);
                a.put(i, 0, 1.0);
            }
        }
        let ctx = ParallelContext::new(2).unwrap();
        let mut ls = SparseSolver::new(n, 1e-14, Some(ctx));
        assert_eq!(ls.nworkers(), 2);
        let h = ls.factorize(&a).unwrap();
        let xref: Vec<Float> = (0..n).map(|i| i as Float - 3.0).collect();
        let mut b = vec![0.0; n];
        a.mul_vec(&xref, &mut b);
        ls.solve(h, &mut b).unwrap();
        for i in 0..n {
            assert!((b[i] - xref[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn non_finite_rhs_is_propagated_by_both_modes() {
        let a = Triplet::identity(3);
        for ctx in [None, Some(ParallelContext::new(2).unwrap())] {
            let mut ls = SparseSolver::new(3, 1e-14, ctx);
            let h = ls.factorize(&a).unwrap();
            let mut b = vec![1.0, Float::NAN, 2.0];
            ls.solve(h, &mut b).unwrap();
            assert_eq!(b[0], 1.0);
            assert!(b[1].is_nan());
        }
    }

    #[test]
    fn non_finite_entries_are_rejected() {
        let mut a = Triplet::identity(2);
        a.put(1, 0, Float::NAN);
        let mut ls = SparseSolver::new(2, 1e-14, None);
        assert_eq!(ls.factorize(&a), Err(LinSolError::NonFinite(1, 0)));
        let mut ls = SparseSolver::new(2, 1e-14, Some(ParallelContext::new(2).unwrap()));
        assert_eq!(ls.factorize(&a), Err(LinSolError::NonFinite(1, 0)));
    }
}
