//! Matrix types, operations, and utilities.

mod base;
mod linear;
mod triplet;

pub use base::Matrix;
pub use linear::LuFactors;
pub use triplet::Triplet;
