//! Trajectory recorded during a solve.

use crate::{Float, interpolate::Interpolate};

/// Samples collected by the [`crate::Solver`].
///
/// With `save_xy`, `xx`/`yy` hold the initial point followed by one sample
/// per accepted step, and `hh`/`ee` hold the size and scaled error norm of
/// each accepted step. With `dense_dx`, `xd`/`yd` hold the solution at
/// `x0, x0 + dx, x0 + 2·dx, ...` up to `xf`, interpolated from the
/// collocation polynomial of the step containing each point.
#[derive(Debug, Clone, Default)]
pub struct Output {
    pub xx: Vec<Float>,
    pub yy: Vec<Vec<Float>>,
    pub hh: Vec<Float>,
    pub ee: Vec<Float>,
    pub xd: Vec<Float>,
    pub yd: Vec<Vec<Float>>,
    save_xy: bool,
    dense_dx: Option<Float>,
    x0: Float,
    kd: usize,
}

impl Output {
    pub(crate) fn new(save_xy: bool, dense_dx: Option<Float>) -> Self {
        Self {
            save_xy,
            dense_dx,
            ..Default::default()
        }
    }

    /// Clears previous samples and records the initial point.
    pub(crate) fn start(&mut self, x0: Float, y0: &[Float]) {
        self.xx.clear();
        self.yy.clear();
        self.hh.clear();
        self.ee.clear();
        self.xd.clear();
        self.yd.clear();
        self.x0 = x0;
        self.kd = 0;
        if self.save_xy {
            self.xx.push(x0);
            self.yy.push(y0.to_vec());
        }
        if self.dense_dx.is_some() {
            self.xd.push(x0);
            self.yd.push(y0.to_vec());
            self.kd = 1;
        }
    }

    /// Records the accepted step of size `h` and error norm `err` ending at `(x, y)`.
    pub(crate) fn push_step(
        &mut self,
        x: Float,
        h: Float,
        err: Float,
        y: &[Float],
        dense: &dyn Interpolate,
    ) {
        if self.save_xy {
            self.xx.push(x);
            self.yy.push(y.to_vec());
            self.hh.push(h);
            self.ee.push(err);
        }
        if let Some(dx) = self.dense_dx {
            loop {
                let xi = self.x0 + self.kd as Float * dx;
                // grid points within rounding of the step end belong to it
                if xi > x + 1e-10 * dx {
                    break;
                }
                let xi = xi.min(x);
                let mut yi = vec![0.0; y.len()];
                dense.interpolate(xi, &mut yi);
                self.xd.push(xi);
                self.yd.push(yi);
                self.kd += 1;
            }
        }
    }

    /// Accepted samples as `(x, y)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Float, &[Float])> + '_ {
        self.xx.iter().copied().zip(self.yy.iter().map(Vec::as_slice))
    }

    /// Dense samples as `(x, y)` pairs.
    pub fn dense_iter(&self) -> impl Iterator<Item = (Float, &[Float])> + '_ {
        self.xd.iter().copied().zip(self.yd.iter().map(Vec::as_slice))
    }

    pub fn len(&self) -> usize {
        self.xx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// y(x) = 2x
    struct Line;

    impl Interpolate for Line {
        fn interpolate(&self, xi: Float, yi: &mut [Float]) {
            yi[0] = 2.0 * xi;
        }
    }

    #[test]
    fn dense_grid_is_filled_step_by_step() {
        let mut out = Output::new(true, Some(0.25));
        out.start(0.0, &[0.0]);
        out.push_step(0.6, 0.6, 0.3, &[1.2], &Line);
        assert_eq!(out.xd, vec![0.0, 0.25, 0.5]);
        out.push_step(1.0, 0.4, 0.9, &[2.0], &Line);
        assert_eq!(out.xd, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(out.yd[4], vec![2.0]);
        assert_eq!(out.len(), 3);
        let xs: Vec<Float> = out.iter().map(|(x, _)| x).collect();
        assert_eq!(xs, vec![0.0, 0.6, 1.0]);
        assert_eq!(out.hh, vec![0.6, 0.4]);
        assert_eq!(out.ee, vec![0.3, 0.9]);
    }

    #[test]
    fn nothing_is_kept_by_default() {
        let mut out = Output::new(false, None);
        out.start(0.0, &[1.0]);
        out.push_step(1.0, 1.0, 0.5, &[2.0], &Line);
        assert!(out.is_empty());
        assert!(out.hh.is_empty());
        assert_eq!(out.dense_iter().count(), 0);
    }
}
