//! Counters collected during a solve.

use std::fmt;

/// Work statistics of the last call to [`crate::Solver::solve`].
///
/// Zeroed when the solver is built and at the start of every solve. Every
/// attempted step ends either accepted or rejected, so
/// `nsteps == naccepted + nrejected` holds at all times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stat {
    /// Number of right-hand side evaluations.
    pub nfeval: usize,
    /// Number of Jacobian evaluations (analytical or numerical).
    pub njeval: usize,
    /// Number of attempted steps.
    pub nsteps: usize,
    /// Number of accepted steps.
    pub naccepted: usize,
    /// Number of rejected steps, including Newton, evaluation and
    /// factorization failures.
    pub nrejected: usize,
    /// Number of successful decompositions of the iteration matrices.
    pub ndecomp: usize,
    /// Number of linear solves with those decompositions.
    pub nlinsol: usize,
    /// Largest number of Newton iterations of a converged step.
    pub nitmax: usize,
    /// Name of the linear solver backend.
    pub ls_kind: String,
}

impl Stat {
    pub(crate) fn new(ls_kind: &str) -> Self {
        Self {
            ls_kind: ls_kind.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn reset(&mut self) {
        let ls_kind = std::mem::take(&mut self.ls_kind);
        *self = Self {
            ls_kind,
            ..Default::default()
        };
    }

    pub(crate) fn update_nitmax(&mut self, iterations: usize) {
        self.nitmax = self.nitmax.max(iterations);
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "number of F evaluations   = {}", self.nfeval)?;
        writeln!(f, "number of J evaluations   = {}", self.njeval)?;
        writeln!(f, "total number of steps     = {}", self.nsteps)?;
        writeln!(f, "number of accepted steps  = {}", self.naccepted)?;
        writeln!(f, "number of rejected steps  = {}", self.nrejected)?;
        writeln!(f, "number of decompositions  = {}", self.ndecomp)?;
        writeln!(f, "number of lin solutions   = {}", self.nlinsol)?;
        writeln!(f, "max number of iterations  = {}", self.nitmax)?;
        write!(f, "linear solver             = {}", self.ls_kind)
    }
}

#[cfg(test)]
mod tests {
    use super::Stat;

    #[test]
    fn reset_keeps_backend_name() {
        let mut stat = Stat::new("sparse");
        stat.nfeval = 3;
        stat.update_nitmax(4);
        stat.update_nitmax(2);
        assert_eq!(stat.nitmax, 4);
        stat.reset();
        assert_eq!(stat, Stat::new("sparse"));
    }
}
