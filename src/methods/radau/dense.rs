//! Continuous output of an accepted Radau5 step.

use crate::{Float, interpolate::Interpolate};

use super::coeffs::{C1M1, C2M1};

/// Evaluates the collocation polynomial stored in `cont` at `xi`.
///
/// `cont` holds `[y_{n+1}, c1, c2, c3]`, each of length `n`, for the step
/// `[xold, xold + h]`.
pub(crate) fn contr5(xi: Float, yi: &mut [Float], cont: &[Float], xold: Float, h: Float) {
    let n = cont.len() / 4;
    // s = (xi - (xold + h)) / h
    let s = (xi - (xold + h)) / h;
    let c0 = &cont[..n];
    let c1 = &cont[n..2 * n];
    let c2 = &cont[2 * n..3 * n];
    let c3 = &cont[3 * n..4 * n];
    for i in 0..n {
        yi[i] = c0[i] + s * (c1[i] + (s - C2M1) * (c2[i] + (s - C1M1) * c3[i]));
    }
}

/// Dense output: cubic at the right endpoint using `cont` coefficients.
pub(crate) struct DenseRadau<'a> {
    pub(crate) cont: &'a [Float],
    pub(crate) xold: Float,
    pub(crate) h: Float,
}

impl Interpolate for DenseRadau<'_> {
    fn interpolate(&self, xi: Float, yi: &mut [Float]) {
        contr5(xi, yi, self.cont, self.xold, self.h);
    }
}
