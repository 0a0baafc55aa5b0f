//! Tolerance abstraction to allow scalar or vector tolerances

use crate::Float;

/// Tolerance enum to allow scalar or vector tolerances
/// using [`Into`] trait for easy conversion from `Float`, `[Float; N]`, or `Vec<Float>`
/// users do not need to know or worry this simply allows both
/// `Float` and `[Float; N]` to be passed in as arguments.
#[derive(Clone, Debug, PartialEq)]
pub enum Tolerance {
    Scalar(Float),
    Vector(Vec<Float>),
}

impl Tolerance {
    /// Number of components, `None` for a scalar.
    pub fn len(&self) -> Option<usize> {
        match self {
            Tolerance::Scalar(_) => None,
            Tolerance::Vector(vs) => Some(vs.len()),
        }
    }

    /// Smallest component.
    pub fn min(&self) -> Float {
        match self {
            Tolerance::Scalar(v) => *v,
            Tolerance::Vector(vs) => vs.iter().copied().fold(Float::INFINITY, Float::min),
        }
    }

    /// Applies `f` to every component.
    pub(crate) fn map(&self, f: impl Fn(Float) -> Float) -> Tolerance {
        match self {
            Tolerance::Scalar(v) => Tolerance::Scalar(f(*v)),
            Tolerance::Vector(vs) => Tolerance::Vector(vs.iter().map(|&v| f(v)).collect()),
        }
    }

    /// Combines two tolerances component-wise. A scalar is broadcast.
    pub(crate) fn zip(&self, other: &Tolerance, f: impl Fn(Float, Float) -> Float) -> Tolerance {
        match (self, other) {
            (Tolerance::Scalar(a), Tolerance::Scalar(b)) => Tolerance::Scalar(f(*a, *b)),
            (Tolerance::Vector(a), Tolerance::Scalar(b)) => {
                Tolerance::Vector(a.iter().map(|&ai| f(ai, *b)).collect())
            }
            (Tolerance::Scalar(a), Tolerance::Vector(b)) => {
                Tolerance::Vector(b.iter().map(|&bi| f(*a, bi)).collect())
            }
            (Tolerance::Vector(a), Tolerance::Vector(b)) => {
                Tolerance::Vector(a.iter().zip(b).map(|(&ai, &bi)| f(ai, bi)).collect())
            }
        }
    }
}

impl From<Float> for Tolerance {
    fn from(val: Float) -> Self {
        Tolerance::Scalar(val)
    }
}

impl From<&[Float]> for Tolerance {
    fn from(val: &[Float]) -> Self {
        Tolerance::Vector(val.to_vec())
    }
}

impl<const N: usize> From<[Float; N]> for Tolerance {
    fn from(val: [Float; N]) -> Self {
        Tolerance::Vector(val.to_vec())
    }
}

impl From<Vec<Float>> for Tolerance {
    fn from(val: Vec<Float>) -> Self {
        Tolerance::Vector(val)
    }
}

impl std::ops::Index<usize> for Tolerance {
    type Output = Float;

    fn index(&self, index: usize) -> &Self::Output {
        match self {
            Tolerance::Scalar(v) => v,
            Tolerance::Vector(vs) => &vs[index],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Tolerance;

    #[test]
    fn scalar_broadcasts_in_zip() {
        let rtol = Tolerance::from(vec![1e-3, 1e-4]);
        let atol = Tolerance::from(1e-6);
        let q = atol.zip(&rtol, |a, r| a / r);
        assert_eq!(q, Tolerance::Vector(vec![1e-3, 1e-2]));
        assert_eq!(q.len(), Some(2));
        assert_eq!(atol[7], 1e-6);
    }
}
