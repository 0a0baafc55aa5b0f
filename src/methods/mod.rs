// Numerical methods

pub(crate) mod radau;

/// Implicit Runge-Kutta method used by the [`crate::Solver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    /// 3-stage Radau IIA of order 5.
    #[default]
    Radau5,
}

impl Method {
    pub fn name(&self) -> &'static str {
        match self {
            Method::Radau5 => "Radau5",
        }
    }
}
