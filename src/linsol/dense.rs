//! Dense LU backend.

use crate::{
    Float,
    error::LinSolError,
    matrix::{LuFactors, Triplet},
};

use super::{Handle, LinSolKind, LinSolver, check_square};

/// Densifies the triplet and factorizes it with partial pivoting. Suited to
/// small or dense Jacobians.
#[derive(Debug)]
pub struct DenseSolver {
    n: usize,
    tol: Float,
    factors: Option<(Handle, LuFactors)>,
}

impl DenseSolver {
    pub fn new(n: usize, tol: Float) -> Self {
        Self {
            n,
            tol,
            factors: None,
        }
    }
}

impl LinSolver for DenseSolver {
    fn kind(&self) -> LinSolKind {
        LinSolKind::Dense
    }

    fn factorize(&mut self, a: &Triplet) -> Result<Handle, LinSolError> {
        self.factors = None;
        check_square(a, self.n)?;
        if let Some((i, j, _)) = a.iter().find(|(_, _, v)| !v.is_finite()) {
            return Err(LinSolError::NonFinite(i, j));
        }
        let lu = a.to_dense().lu(self.tol)?;
        let handle = Handle::fresh();
        self.factors = Some((handle, lu));
        Ok(handle)
    }

    fn solve(&self, handle: Handle, rhs: &mut [Float]) -> Result<(), LinSolError> {
        match &self.factors {
            None => Err(LinSolError::NotFactorized),
            Some((h, lu)) if *h == handle => lu.solve_mut(rhs),
            Some(_) => Err(LinSolError::StaleHandle),
        }
    }

    fn free(&mut self) {
        self.factors = None;
    }
}
