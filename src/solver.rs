//! Adaptive Radau5 integrator.

use crate::{
    Float,
    cancel::CancelToken,
    config::Config,
    error::{ConfigError, Error, EvalError, LinSolError, NonConvergence},
    methods::radau::{DenseRadau, NewtonOutcome, NewtonStageSolver, StepController},
    ode::{ODE, eval},
    output::Output,
    stat::Stat,
};

/// Why an attempted step failed before its error could be estimated.
enum Failure {
    Eval(EvalError),
    Singular,
    /// Newton iteration failed; retry with `h·factor`.
    Newton(Float),
}

/// Integrates `M·y' = f(x, y)` from `x0` to `xf`.
///
/// A solver is built once for a problem of dimension `ndim` and may be
/// reused for several solves. It owns the linear-solver factorizations and
/// releases them when dropped.
///
/// # Example
/// ```ignore
/// let conf = Config::builder().rtol(1e-6).atol(1e-6).build()?;
/// let mut solver = Solver::new(conf, 1, &problem)?;
/// let mut y = vec![0.0];
/// solver.solve(&mut y, 0.0, 1.5)?;
/// println!("{}", solver.stat());
/// ```
pub struct Solver<'a, F: ODE + ?Sized> {
    conf: Config,
    ndim: usize,
    f: &'a F,
    stage: NewtonStageSolver,
    stat: Stat,
    out: Output,
    cancel: Option<CancelToken>,
}

impl<'a, F: ODE + ?Sized> Solver<'a, F> {
    pub fn new(conf: Config, ndim: usize, f: &'a F) -> Result<Self, Error> {
        if ndim == 0 {
            return Err(ConfigError::NdimMustBePositive.into());
        }
        for tol in [conf.rtol(), conf.atol()] {
            if let Some(got) = tol.len().filter(|&len| len != ndim) {
                return Err(ConfigError::DimensionMismatch {
                    expected: ndim,
                    got,
                }
                .into());
            }
        }
        if !f.has_jac() && !conf.numerical_jacobian {
            return Err(ConfigError::MissingJacobian.into());
        }
        let mass = f.mass();
        if let Some(m) = &mass {
            if m.nrow() != ndim || m.ncol() != ndim {
                return Err(ConfigError::MassShape {
                    expected: ndim,
                    rows: m.nrow(),
                    cols: m.ncol(),
                }
                .into());
            }
        }
        log::debug!(
            "{} solver: ndim = {}, backend = {}, mass = {}",
            conf.method.name(),
            ndim,
            conf.ls_kind,
            if mass.is_some() { "given" } else { "identity" }
        );
        let stage = NewtonStageSolver::new(&conf, ndim, mass);
        Ok(Self {
            stat: Stat::new(conf.ls_kind.name()),
            out: Output::new(conf.save_xy, conf.dense_dx),
            conf,
            ndim,
            f,
            stage,
            cancel: None,
        })
    }

    /// Token checked at every step boundary.
    pub fn set_cancel_token(&mut self, token: CancelToken) {
        self.cancel = Some(token);
    }

    pub fn config(&self) -> &Config {
        &self.conf
    }

    /// Statistics of the last solve.
    pub fn stat(&self) -> &Stat {
        &self.stat
    }

    /// Samples recorded by the last solve.
    pub fn out(&self) -> &Output {
        &self.out
    }

    /// Advances `y` from `x0` to `xf`.
    ///
    /// The first step is `min(h0, hmax)`, where an unset `hmax` stands for
    /// the whole interval `xf - x0`. On success `y` holds the solution at
    /// `xf`. On failure `y` holds the last accepted state, whose abscissa is
    /// reported by the error.
    pub fn solve(&mut self, y: &mut [Float], x0: Float, xf: Float) -> Result<(), Error> {
        if y.len() != self.ndim {
            return Err(ConfigError::DimensionMismatch {
                expected: self.ndim,
                got: y.len(),
            }
            .into());
        }
        if !(xf > x0) || !x0.is_finite() || !xf.is_finite() {
            return Err(ConfigError::InvalidSpan { x0, xf }.into());
        }
        self.stat.reset();
        self.stage.reset();

        let result = self.run(y, x0, xf);
        match &result {
            Ok(()) => log::info!(
                "reached x = {} after {} steps ({} accepted, {} rejected)",
                xf,
                self.stat.nsteps,
                self.stat.naccepted,
                self.stat.nrejected
            ),
            Err(e) => log::warn!("integration stopped: {}", e),
        }
        result
    }

    fn run(&mut self, y: &mut [Float], x0: Float, xf: Float) -> Result<(), Error> {
        let Solver {
            conf,
            f,
            stage,
            stat,
            out,
            cancel,
            ..
        } = self;
        let f: &F = *f;
        let n = y.len();
        let hmax = conf.hmax.unwrap_or(xf - x0);
        let mut ctrl = StepController::new(conf, hmax);

        let mut x = x0;
        let mut h = conf.h0;
        if h > ctrl.hmax() {
            log::debug!("h0 = {} clamped to hmax = {}", h, ctrl.hmax());
            h = ctrl.hmax();
        }
        let mut f0 = vec![0.0; n];
        let mut ynew = vec![0.0; n];
        let mut fnew = vec![0.0; n];
        let mut scal = vec![0.0; n];
        stat.nfeval += 1;
        eval(f, x, y, &mut f0).map_err(|source| Error::Evaluation { x, h, source })?;
        conf.scale(y, &mut scal);
        out.start(x, y);

        let mut first = true;
        let mut reject = false;
        let mut last = false;
        let mut need_jac = true;
        let mut need_decomp = true;
        // Jacobian evaluated at the current state
        let mut caljac = false;
        let mut jac_age = 0;
        let mut hold = h;
        let mut nrej_consec = 0;
        let mut neval_consec = 0;
        let mut nsing_consec = 0;

        if x + h >= xf {
            h = xf - x;
            last = true;
        }

        loop {
            if cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
                return Err(Error::Cancelled { x, h });
            }
            if stat.nsteps >= conf.nmax {
                return Err(Error::BudgetExceeded {
                    x,
                    h,
                    nmax: conf.nmax,
                });
            }
            if 0.1 * h.abs() <= x.abs() * conf.uround {
                return Err(Error::NonConvergence {
                    x,
                    h,
                    reason: NonConvergence::StepSizeTooSmall,
                });
            }
            stat.nsteps += 1;
            log::trace!("step {}: x = {}, h = {}", stat.nsteps, x, h);

            let at = move |source| Error::LinearSolver { x, h, source };
            let attempt: Result<(Float, usize), Failure> = 'attempt: {
                if need_jac {
                    if let Err(e) = stage.jacobian(f, x, y, &f0, stat) {
                        break 'attempt Err(Failure::Eval(e));
                    }
                    log::debug!("Jacobian evaluated at x = {}", x);
                    need_jac = false;
                    caljac = true;
                    jac_age = 0;
                    need_decomp = true;
                }

                stage.predict(h, hold, first || conf.zero_start);
                if let Err(e) = stage.eval_stages(f, x, y, h, stat) {
                    break 'attempt Err(Failure::Eval(e));
                }
                if need_decomp || !stage.is_factorized() {
                    match stage.decompose(h, stat) {
                        Ok(()) => need_decomp = false,
                        Err(LinSolError::Singular(_)) => break 'attempt Err(Failure::Singular),
                        Err(e) => return Err(at(e)),
                    }
                }

                let newt = match stage.iterate(f, x, y, h, &scal, stat).map_err(at)? {
                    NewtonOutcome::Converged { iterations } => iterations,
                    NewtonOutcome::Slow { factor } => break 'attempt Err(Failure::Newton(factor)),
                    NewtonOutcome::Diverged | NewtonOutcome::MaxIterReached => {
                        break 'attempt Err(Failure::Newton(0.5));
                    }
                    NewtonOutcome::EvalFailed(e) => break 'attempt Err(Failure::Eval(e)),
                };
                let err = match stage
                    .estimate_error(f, x, y, h, &f0, &scal, first || reject, stat)
                    .map_err(at)?
                {
                    Ok(err) => err,
                    Err(e) => break 'attempt Err(Failure::Eval(e)),
                };
                // the next step starts from f at the new state, so a failure
                // there rejects this step instead of the next one
                if err <= 1.0 && !last {
                    stage.end_state(y, &mut ynew);
                    stat.nfeval += 1;
                    if let Err(e) = eval(f, x + h, &ynew, &mut fnew) {
                        break 'attempt Err(Failure::Eval(e));
                    }
                }
                Ok((err, newt))
            };

            let (err, newt) = match attempt {
                Ok(v) => v,
                Err(failure) => {
                    stat.nrejected += 1;
                    nrej_consec += 1;
                    let factor = match failure {
                        Failure::Eval(source) => {
                            neval_consec += 1;
                            if neval_consec >= conf.max_eval_failures {
                                return Err(Error::Evaluation { x, h, source });
                            }
                            log::warn!("evaluation failed at x = {}, h = {}: {}", x, h, source);
                            0.5
                        }
                        Failure::Singular => {
                            nsing_consec += 1;
                            if nsing_consec >= conf.max_singular {
                                return Err(Error::SingularMatrix { x, h });
                            }
                            log::warn!("singular iteration matrix at x = {}, h = {}", x, h);
                            0.5
                        }
                        Failure::Newton(factor) => {
                            log::debug!("Newton failed at x = {}, h = {}", x, h);
                            factor
                        }
                    };
                    if nrej_consec > conf.max_rejections {
                        return Err(Error::NonConvergence {
                            x,
                            h,
                            reason: NonConvergence::TooManyRejections,
                        });
                    }
                    let hcur = h;
                    h = ctrl.reduce(hcur, hcur * factor).map_err(|reason| {
                        Error::NonConvergence {
                            x,
                            h: hcur,
                            reason,
                        }
                    })?;
                    reject = true;
                    last = false;
                    need_decomp = true;
                    if !caljac {
                        need_jac = true;
                    }
                    continue;
                }
            };

            let quot = ctrl.quotient(err, newt);
            if err > 1.0 {
                stat.nrejected += 1;
                nrej_consec += 1;
                if nrej_consec > conf.max_rejections {
                    return Err(Error::NonConvergence {
                        x,
                        h,
                        reason: NonConvergence::TooManyRejections,
                    });
                }
                let hcur = h;
                h = ctrl.reject(hcur, quot, first).map_err(|reason| Error::NonConvergence {
                    x,
                    h: hcur,
                    reason,
                })?;
                log::debug!("step rejected at x = {}: err = {:.3e}, h = {} -> {}", x, err, hcur, h);
                reject = true;
                last = false;
                need_decomp = true;
                if !caljac {
                    need_jac = true;
                }
                continue;
            }

            // accepted
            first = false;
            stat.naccepted += 1;
            nrej_consec = 0;
            neval_consec = 0;
            nsing_consec = 0;
            let mut hnew = ctrl.accept(h, err, quot, stat.naccepted);
            let xold = x;
            hold = h;
            x = if last { xf } else { x + h };
            stage.accept(y);
            out.push_step(
                x,
                h,
                err,
                y,
                &DenseRadau {
                    cont: stage.cont(),
                    xold,
                    h,
                },
            );
            if last {
                return Ok(());
            }

            conf.scale(y, &mut scal);
            std::mem::swap(&mut f0, &mut fnew);
            caljac = false;
            jac_age += 1;

            hnew = ctrl.limit(hnew);
            if reject {
                hnew = hnew.min(h);
            }
            reject = false;
            let fast = stage.theta <= conf.theta_max;
            if x + hnew / conf.keep_h_min >= xf {
                h = xf - x;
                last = true;
                need_decomp = true;
            } else {
                let qt = hnew / h;
                if !(fast && qt >= conf.keep_h_min && qt <= conf.keep_h_max) {
                    h = hnew;
                    need_decomp = true;
                }
            }
            if !fast || conf.jac_max_age.is_some_and(|age| jac_age >= age) {
                need_jac = true;
            }
        }
    }
}
