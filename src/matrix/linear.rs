//! Linear solves: A x = b via LU with partial pivoting.

use crate::{Float, error::LinSolError};

use super::base::Matrix;

/// LU factors of a square matrix, `P·A = L·U`, packed in one row-major
/// buffer (unit diagonal of `L` implied).
#[derive(Clone, Debug)]
pub struct LuFactors {
    n: usize,
    lu: Vec<Float>,
    perm: Vec<usize>,
}

impl Matrix {
    /// Factorizes the matrix. A pivot whose magnitude does not exceed
    /// `tol·‖A‖∞` is reported as [`LinSolError::Singular`].
    pub fn lu(&self, tol: Float) -> Result<LuFactors, LinSolError> {
        let n = self.n;
        if self.m != n {
            return Err(LinSolError::DimensionMismatch {
                expected: n,
                rows: self.m,
                cols: self.n,
            });
        }
        let threshold = tol * self.norm_inf();
        let mut a = self.data.clone();
        let mut perm: Vec<usize> = (0..n).collect();

        for k in 0..n {
            // pivot
            let mut pivot_row = k;
            let mut pivot_val = a[k * n + k].abs();
            for i in (k + 1)..n {
                let val = a[i * n + k].abs();
                if val > pivot_val {
                    pivot_val = val;
                    pivot_row = i;
                }
            }
            if pivot_val == 0.0 || pivot_val <= threshold || !pivot_val.is_finite() {
                return Err(LinSolError::Singular(k));
            }
            if pivot_row != k {
                for j in 0..n {
                    a.swap(k * n + j, pivot_row * n + j);
                }
                perm.swap(k, pivot_row);
            }
            // Eliminate below the pivot
            let akk = a[k * n + k];
            for i in (k + 1)..n {
                let factor = a[i * n + k] / akk;
                a[i * n + k] = factor;
                if factor != 0.0 {
                    for j in (k + 1)..n {
                        a[i * n + j] -= factor * a[k * n + j];
                    }
                }
            }
        }

        Ok(LuFactors { n, lu: a, perm })
    }

    /// Solve A x = b, returning x.
    pub fn lin_solve(&self, b: &[Float]) -> Result<Vec<Float>, LinSolError> {
        let mut x = b.to_vec();
        self.lu(0.0)?.solve_mut(&mut x)?;
        Ok(x)
    }
}

impl LuFactors {
    /// In-place solve: overwrites `b` with `x`.
    pub fn solve_mut(&self, b: &mut [Float]) -> Result<(), LinSolError> {
        let n = self.n;
        if b.len() != n {
            return Err(LinSolError::RhsLength {
                expected: n,
                got: b.len(),
            });
        }
        let a = &self.lu;

        // Forward solve Ly = Pb
        let pb: Vec<Float> = self.perm.iter().map(|&p| b[p]).collect();
        b.copy_from_slice(&pb);
        for i in 0..n {
            let mut sum = b[i];
            for k in 0..i {
                sum -= a[i * n + k] * b[k];
            }
            b[i] = sum;
        }
        // Backward solve Ux = y
        for i in (0..n).rev() {
            let mut sum = b[i];
            for k in (i + 1)..n {
                sum -= a[i * n + k] * b[k];
            }
            b[i] = sum / a[i * n + i];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{error::LinSolError, matrix::Matrix};

    #[test]
    fn solve_full_2x2() {
        // A = [[3, 2],[1, 4]], b = [5, 6] -> x = [0.8, 1.3]
        let mut a = Matrix::zeros(2, 2);
        a[(0, 0)] = 3.0;
        a[(0, 1)] = 2.0;
        a[(1, 0)] = 1.0;
        a[(1, 1)] = 4.0;
        let x = a.lin_solve(&[5.0, 6.0]).unwrap();
        assert!((x[0] - 0.8).abs() < 1e-12);
        assert!((x[1] - 1.3).abs() < 1e-12);
    }

    #[test]
    fn pivoting_handles_zero_diagonal() {
        let mut a = Matrix::zeros(3, 3);
        a[(0, 1)] = 1.0;
        a[(1, 0)] = 2.0;
        a[(2, 2)] = 4.0;
        let x = a.lin_solve(&[3.0, 4.0, 8.0]).unwrap();
        assert_eq!(x, vec![2.0, 3.0, 2.0]);
    }

    #[test]
    fn singular_matrix_is_reported() {
        let mut a = Matrix::zeros(2, 2);
        a[(0, 0)] = 1.0;
        a[(0, 1)] = 2.0;
        a[(1, 0)] = 2.0;
        a[(1, 1)] = 4.0;
        assert_eq!(a.lu(1e-14).unwrap_err(), LinSolError::Singular(1));
        assert_eq!(Matrix::zeros(2, 2).lu(1e-14).unwrap_err(), LinSolError::Singular(0));
    }
}
