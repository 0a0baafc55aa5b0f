//! Dense row-major matrix.

use std::ops::{Index, IndexMut};

use crate::Float;

/// Dense `m x n` matrix stored row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    pub(crate) m: usize,
    pub(crate) n: usize,
    pub(crate) data: Vec<Float>,
}

impl Matrix {
    pub fn zeros(m: usize, n: usize) -> Self {
        Self {
            m,
            n,
            data: vec![0.0; m * n],
        }
    }

    /// Largest absolute row sum.
    pub fn norm_inf(&self) -> Float {
        (0..self.m)
            .map(|i| self.data[i * self.n..(i + 1) * self.n].iter().map(|v| v.abs()).sum())
            .fold(0.0, Float::max)
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = Float;

    fn index(&self, (i, j): (usize, usize)) -> &Self::Output {
        &self.data[i * self.n + j]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut Self::Output {
        &mut self.data[i * self.n + j]
    }
}
