//! Simplified Newton iteration on the transformed Radau5 stage system.
//!
//! With `W = (T⊗I)^{-1}·Z` the collocation system splits into one real
//! system with `E1 = (U1/h)·M - J` and one complex system with
//! `E2 = ((ALPH + i·BETA)/h)·M - J`. The complex matrix is handed to the
//! linear solver as the real `2n x 2n` block
//! `[[ALPH/h·M - J, -BETA/h·M], [BETA/h·M, ALPH/h·M - J]]`.
//!
//! An iteration starts from predicted stages (`predict`) whose right-hand
//! sides are evaluated before the matrices are factorized (`eval_stages`),
//! so that a factorization is only paid for when it is used. It then
//! repeats solve / update / evaluate until the correction is small enough.
//! Its result is a [`NewtonOutcome`]; a failed iteration only touches the
//! stage workspace, never the accepted state.

use crate::{
    Float,
    config::Config,
    error::{EvalError, LinSolError},
    jacobian::{analytical_jacobian, numerical_jacobian},
    linsol::{Handle, LinSolver, new_lin_solver},
    matrix::Triplet,
    ode::{ODE, eval},
    stat::Stat,
};

use super::coeffs::*;

/// How a Newton iteration ended.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NewtonOutcome {
    /// The stage increments satisfy the Newton tolerance.
    Converged { iterations: usize },
    /// Convergence is predicted to fail within the iteration budget; retry
    /// with the step size multiplied by `factor`.
    Slow { factor: Float },
    /// The contraction rate reached 0.99.
    Diverged,
    /// No convergence after `newton_maxiter` iterations.
    MaxIterReached,
    /// The right-hand side failed at a stage value.
    EvalFailed(EvalError),
}

/// Owns the iteration matrices, their factorizations and the stage
/// workspace of one integrator.
pub(crate) struct NewtonStageSolver {
    n: usize,
    uround: Float,
    nit: usize,
    fnewt: Float,
    thet: Float,
    mass: Option<Triplet>,
    jac: Triplet,
    e1: Triplet,
    e2: Triplet,
    ls_real: Box<dyn LinSolver>,
    ls_cplx: Box<dyn LinSolver>,
    handles: Option<(Handle, Handle)>,
    // scaled eigenvalues for the factorized step size
    fac1: Float,
    alphn: Float,
    betan: Float,
    // transformed stage increments and stage increments
    f1: Vec<Float>,
    f2: Vec<Float>,
    f3: Vec<Float>,
    z1: Vec<Float>,
    z2: Vec<Float>,
    z3: Vec<Float>,
    // scratch
    ys: Vec<Float>,
    k1: Vec<Float>,
    k2: Vec<Float>,
    k3: Vec<Float>,
    rhs1: Vec<Float>,
    rhs23: Vec<Float>,
    m1: Vec<Float>,
    m2: Vec<Float>,
    m3: Vec<Float>,
    /// Dense output of the last accepted step: [y_{n+1}, c1, c2, c3].
    cont: Vec<Float>,
    /// Contraction rate of the last iteration.
    pub(crate) theta: Float,
    faccon: Float,
}

impl NewtonStageSolver {
    pub(crate) fn new(conf: &Config, n: usize, mass: Option<Triplet>) -> Self {
        let ctx = conf.parallel.as_ref();
        Self {
            n,
            uround: conf.uround,
            nit: conf.newton_maxiter,
            fnewt: conf.newton_tol,
            thet: conf.theta_max,
            mass,
            jac: Triplet::new(n, n),
            e1: Triplet::new(n, n),
            e2: Triplet::new(2 * n, 2 * n),
            ls_real: new_lin_solver(conf.ls_kind, n, conf.uround, ctx),
            ls_cplx: new_lin_solver(conf.ls_kind, 2 * n, conf.uround, ctx),
            handles: None,
            fac1: 0.0,
            alphn: 0.0,
            betan: 0.0,
            f1: vec![0.0; n],
            f2: vec![0.0; n],
            f3: vec![0.0; n],
            z1: vec![0.0; n],
            z2: vec![0.0; n],
            z3: vec![0.0; n],
            ys: vec![0.0; n],
            k1: vec![0.0; n],
            k2: vec![0.0; n],
            k3: vec![0.0; n],
            rhs1: vec![0.0; n],
            rhs23: vec![0.0; 2 * n],
            m1: vec![0.0; n],
            m2: vec![0.0; n],
            m3: vec![0.0; n],
            cont: vec![0.0; 4 * n],
            theta: conf.theta_max,
            faccon: 1.0,
        }
    }

    /// Forgets everything learned during a previous solve.
    pub(crate) fn reset(&mut self) {
        self.release();
        self.cont.iter_mut().for_each(|c| *c = 0.0);
        self.theta = self.thet;
        self.faccon = 1.0;
    }

    /// Evaluates `J = df/dy` at `(x, y)`. `f0` must hold `f(x, y)`.
    /// Any previous factorization becomes unusable.
    pub(crate) fn jacobian<F: ODE + ?Sized>(
        &mut self,
        f: &F,
        x: Float,
        y: &[Float],
        f0: &[Float],
        stat: &mut Stat,
    ) -> Result<(), EvalError> {
        self.handles = None;
        self.jac.clear();
        stat.njeval += 1;
        if f.has_jac() {
            analytical_jacobian(f, x, y, &mut self.jac)
        } else {
            numerical_jacobian(
                f,
                x,
                y,
                f0,
                self.uround,
                &mut self.ys,
                &mut self.k1,
                &mut self.jac,
                stat,
            )
        }
    }

    /// Assembles and factorizes `E1` and `E2` for the step size `h`.
    pub(crate) fn decompose(&mut self, h: Float, stat: &mut Stat) -> Result<(), LinSolError> {
        self.handles = None;
        let n = self.n;
        self.fac1 = U1 / h;
        self.alphn = ALPH / h;
        self.betan = BETA / h;

        self.e1.clear();
        self.e2.clear();
        for (i, j, v) in self.jac.iter() {
            self.e1.put(i, j, -v);
            self.e2.put(i, j, -v);
            self.e2.put(i + n, j + n, -v);
        }
        match &self.mass {
            None => {
                for i in 0..n {
                    self.e1.put(i, i, self.fac1);
                    self.e2.put(i, i, self.alphn);
                    self.e2.put(i + n, i + n, self.alphn);
                    self.e2.put(i, i + n, -self.betan);
                    self.e2.put(i + n, i, self.betan);
                }
            }
            Some(mass) => {
                for (i, j, m) in mass.iter() {
                    self.e1.put(i, j, m * self.fac1);
                    self.e2.put(i, j, m * self.alphn);
                    self.e2.put(i + n, j + n, m * self.alphn);
                    self.e2.put(i, j + n, -m * self.betan);
                    self.e2.put(i + n, j, m * self.betan);
                }
            }
        }

        let h1 = self.ls_real.factorize(&self.e1)?;
        let h2 = self.ls_cplx.factorize(&self.e2)?;
        self.handles = Some((h1, h2));
        stat.ndecomp += 1;
        Ok(())
    }

    /// Starting values for the stage increments. Without a previous step the
    /// iteration starts from zero; otherwise the collocation polynomial of
    /// the last accepted step of size `hold` is extrapolated.
    pub(crate) fn predict(&mut self, h: Float, hold: Float, first: bool) {
        let n = self.n;
        if first {
            for v in [&mut self.z1, &mut self.z2, &mut self.z3, &mut self.f1, &mut self.f2, &mut self.f3] {
                v.iter_mut().for_each(|x| *x = 0.0);
            }
            return;
        }
        let c3q = h / hold;
        let c1q = C1 * c3q;
        let c2q = C2 * c3q;
        for i in 0..n {
            let ak1 = self.cont[n + i];
            let ak2 = self.cont[2 * n + i];
            let ak3 = self.cont[3 * n + i];
            let z1i = c1q * (ak1 + (c1q - C2M1) * (ak2 + (c1q - C1M1) * ak3));
            let z2i = c2q * (ak1 + (c2q - C2M1) * (ak2 + (c2q - C1M1) * ak3));
            let z3i = c3q * (ak1 + (c3q - C2M1) * (ak2 + (c3q - C1M1) * ak3));
            self.z1[i] = z1i;
            self.z2[i] = z2i;
            self.z3[i] = z3i;
            self.f1[i] = TINV00 * z1i + TINV01 * z2i + TINV02 * z3i;
            self.f2[i] = TINV10 * z1i + TINV11 * z2i + TINV12 * z3i;
            self.f3[i] = TINV20 * z1i + TINV21 * z2i + TINV22 * z3i;
        }
    }

    /// Runs the simplified Newton iteration for the step `[x, x + h]` using
    /// the current factorization. The stages of the first iteration must
    /// already be evaluated by [`Self::eval_stages`]. `scal` holds the error
    /// weights at `y`.
    pub(crate) fn iterate<F: ODE + ?Sized>(
        &mut self,
        f: &F,
        x: Float,
        y: &[Float],
        h: Float,
        scal: &[Float],
        stat: &mut Stat,
    ) -> Result<NewtonOutcome, LinSolError> {
        let (h1, h2) = self.handles.ok_or(LinSolError::NotFactorized)?;
        let n = self.n;
        let nit = self.nit;

        self.faccon = self.faccon.max(self.uround).powf(0.8);
        self.theta = self.thet;
        let mut dynold: Float = 0.0;
        let mut thqold: Float = 0.0;

        for newt in 1..=nit {
            if newt > 1 {
                if let Err(e) = self.eval_stages(f, x, y, h, stat) {
                    return Ok(NewtonOutcome::EvalFailed(e));
                }
            }

            // T^{-1}·k minus the mass terms of the current iterate
            for i in 0..n {
                let (k1, k2, k3) = (self.k1[i], self.k2[i], self.k3[i]);
                self.rhs1[i] = TINV00 * k1 + TINV01 * k2 + TINV02 * k3;
                self.rhs23[i] = TINV10 * k1 + TINV11 * k2 + TINV12 * k3;
                self.rhs23[n + i] = TINV20 * k1 + TINV21 * k2 + TINV22 * k3;
            }
            match &self.mass {
                None => {
                    self.m1.copy_from_slice(&self.f1);
                    self.m2.copy_from_slice(&self.f2);
                    self.m3.copy_from_slice(&self.f3);
                }
                Some(mass) => {
                    mass.mul_vec(&self.f1, &mut self.m1);
                    mass.mul_vec(&self.f2, &mut self.m2);
                    mass.mul_vec(&self.f3, &mut self.m3);
                }
            }
            for i in 0..n {
                let (s1, s2, s3) = (-self.m1[i], -self.m2[i], -self.m3[i]);
                self.rhs1[i] += s1 * self.fac1;
                self.rhs23[i] += s2 * self.alphn - s3 * self.betan;
                self.rhs23[n + i] += s3 * self.alphn + s2 * self.betan;
            }

            self.ls_real.solve(h1, &mut self.rhs1)?;
            self.ls_cplx.solve(h2, &mut self.rhs23)?;
            stat.nlinsol += 1;

            let mut dyno = 0.0;
            for i in 0..n {
                let d1 = self.rhs1[i] / scal[i];
                let d2 = self.rhs23[i] / scal[i];
                let d3 = self.rhs23[n + i] / scal[i];
                dyno += d1 * d1 + d2 * d2 + d3 * d3;
            }
            let dyno = (dyno / (3 * n) as Float).sqrt();

            // rate of convergence
            if newt > 1 && newt < nit {
                let thq = dyno / dynold;
                self.theta = if newt == 2 { thq } else { (thq * thqold).sqrt() };
                thqold = thq;
                if self.theta < 0.99 {
                    self.faccon = self.theta / (1.0 - self.theta);
                    let left = (nit - 1 - newt) as i32;
                    let dyth = self.faccon * dyno * self.theta.powi(left) / self.fnewt;
                    if dyth >= 1.0 {
                        let qnewt = dyth.clamp(1e-4, 20.0);
                        let factor = 0.8 * qnewt.powf(-1.0 / (4.0 + left as Float));
                        return Ok(NewtonOutcome::Slow { factor });
                    }
                } else {
                    return Ok(NewtonOutcome::Diverged);
                }
            }
            dynold = dyno.max(self.uround);

            for i in 0..n {
                self.f1[i] += self.rhs1[i];
                self.f2[i] += self.rhs23[i];
                self.f3[i] += self.rhs23[n + i];
                self.z1[i] = T00 * self.f1[i] + T01 * self.f2[i] + T02 * self.f3[i];
                self.z2[i] = T10 * self.f1[i] + T11 * self.f2[i] + T12 * self.f3[i];
                self.z3[i] = T20 * self.f1[i] + self.f2[i];
            }

            if self.faccon * dyno <= self.fnewt {
                stat.update_nitmax(newt);
                return Ok(NewtonOutcome::Converged { iterations: newt });
            }
        }
        Ok(NewtonOutcome::MaxIterReached)
    }

    /// Evaluates `f` at the three stage values `y + z_i`.
    pub(crate) fn eval_stages<F: ODE + ?Sized>(
        &mut self,
        f: &F,
        x: Float,
        y: &[Float],
        h: Float,
        stat: &mut Stat,
    ) -> Result<(), EvalError> {
        for (c, z, k) in [
            (C1, &self.z1, &mut self.k1),
            (C2, &self.z2, &mut self.k2),
            (1.0, &self.z3, &mut self.k3),
        ] {
            for ((ys, yi), zi) in self.ys.iter_mut().zip(y).zip(z) {
                *ys = yi + zi;
            }
            stat.nfeval += 1;
            eval(f, x + c * h, &self.ys, k)?;
        }
        Ok(())
    }

    /// Scaled norm of the embedded error estimate of the converged step.
    ///
    /// `f0` holds `f(x, y)`. When the estimate fails on the first step or
    /// right after a rejection (`refine`), it is improved once with an extra
    /// evaluation at `y + err`. The solves done here reuse the factors of
    /// `E1` and are not counted in `nlinsol`, which counts Newton
    /// iterations only.
    pub(crate) fn estimate_error<F: ODE + ?Sized>(
        &mut self,
        f: &F,
        x: Float,
        y: &[Float],
        h: Float,
        f0: &[Float],
        scal: &[Float],
        refine: bool,
        stat: &mut Stat,
    ) -> Result<Result<Float, EvalError>, LinSolError> {
        let (h1, _) = self.handles.ok_or(LinSolError::NotFactorized)?;
        let n = self.n;
        let hee1 = DD1 / h;
        let hee2 = DD2 / h;
        let hee3 = DD3 / h;
        for i in 0..n {
            self.m1[i] = hee1 * self.z1[i] + hee2 * self.z2[i] + hee3 * self.z3[i];
        }
        // m2 = M·Σ hee_i·z_i
        match &self.mass {
            None => self.m2.copy_from_slice(&self.m1),
            Some(mass) => mass.mul_vec(&self.m1, &mut self.m2),
        }
        for i in 0..n {
            self.rhs1[i] = f0[i] + self.m2[i];
        }
        self.ls_real.solve(h1, &mut self.rhs1)?;
        let mut err = rms(&self.rhs1, scal);

        if err >= 1.0 && refine {
            for i in 0..n {
                self.ys[i] = y[i] + self.rhs1[i];
            }
            stat.nfeval += 1;
            if let Err(e) = eval(f, x, &self.ys, &mut self.k1) {
                return Ok(Err(e));
            }
            for i in 0..n {
                self.rhs1[i] = self.k1[i] + self.m2[i];
            }
            self.ls_real.solve(h1, &mut self.rhs1)?;
            err = rms(&self.rhs1, scal);
        }
        Ok(Ok(err))
    }

    /// `y + z3`, the state at the end of the converged step.
    pub(crate) fn end_state(&self, y: &[Float], out: &mut [Float]) {
        for ((o, yi), zi) in out.iter_mut().zip(y).zip(&self.z3) {
            *o = yi + zi;
        }
    }

    /// Advances `y` by the converged step and stores the coefficients of its
    /// collocation polynomial.
    pub(crate) fn accept(&mut self, y: &mut [Float]) {
        let n = self.n;
        for i in 0..n {
            y[i] += self.z3[i];
            let cont1 = (self.z2[i] - self.z3[i]) / C2M1;
            let ak = (self.z1[i] - self.z2[i]) / C1MC2;
            let acont3 = (ak - self.z1[i] / C1) / C2;
            let cont2 = (ak - cont1) / C1M1;
            self.cont[i] = y[i];
            self.cont[n + i] = cont1;
            self.cont[2 * n + i] = cont2;
            self.cont[3 * n + i] = cont2 - acont3;
        }
    }

    pub(crate) fn cont(&self) -> &[Float] {
        &self.cont
    }

    pub(crate) fn is_factorized(&self) -> bool {
        self.handles.is_some()
    }

    fn release(&mut self) {
        self.handles = None;
        self.ls_real.free();
        self.ls_cplx.free();
    }
}

impl Drop for NewtonStageSolver {
    fn drop(&mut self) {
        log::trace!("releasing {} factorizations", self.ls_real.kind());
        self.release();
    }
}

/// Root mean square of `v/scal`, floored at 1e-10.
fn rms(v: &[Float], scal: &[Float]) -> Float {
    let sum: Float = v.iter().zip(scal).map(|(vi, si)| (vi / si) * (vi / si)).sum();
    (sum / v.len() as Float).sqrt().max(1e-10)
}
