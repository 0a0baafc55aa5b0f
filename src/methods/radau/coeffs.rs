//! Radau IIA(5) coefficients.

use crate::Float;

// Nodes (abscissae) in [0,1]
pub(crate) const C1: Float = 0.155_051_025_721_682_2;
pub(crate) const C2: Float = 0.644_948_974_278_317_8;
pub(crate) const C1M1: Float = C1 - 1.0;
pub(crate) const C2M1: Float = C2 - 1.0;
pub(crate) const C1MC2: Float = C1 - C2;

// Error estimation and splitting constants
pub(crate) const DD1: Float = -10.048_809_399_827_416;
pub(crate) const DD2: Float = 1.382_142_733_160_749;
pub(crate) const DD3: Float = -0.333_333_333_333_333_3;
pub(crate) const U1: Float = 3.637_834_252_744_496; // real eigenvalue of A^{-1}
pub(crate) const ALPH: Float = 2.681_082_873_627_752_3;
pub(crate) const BETA: Float = 3.050_430_199_247_410_5;

// Transformation matrix T; the last row is (T20, 1, 0)
pub(crate) const T00: Float = 9.123_239_487_089_295E-2;
pub(crate) const T01: Float = -1.412_552_950_209_542E-1;
pub(crate) const T02: Float = -3.002_919_410_514_742_4E-2;
pub(crate) const T10: Float = 2.417_179_327_071_07E-1;
pub(crate) const T11: Float = 2.041_293_522_937_999_4E-1;
pub(crate) const T12: Float = 3.829_421_127_572_619E-1;
pub(crate) const T20: Float = 9.660_481_826_150_93E-1;

// Inverse transformation matrix T^{-1}
pub(crate) const TINV00: Float = 4.325_579_890_063_155;
pub(crate) const TINV01: Float = 3.391_992_518_158_098_4E-1;
pub(crate) const TINV02: Float = 5.417_705_399_358_749E-1;
pub(crate) const TINV10: Float = -4.178_718_591_551_905;
pub(crate) const TINV11: Float = -3.276_828_207_610_623_7E-1;
pub(crate) const TINV12: Float = 4.766_235_545_005_504_4E-1;
pub(crate) const TINV20: Float = -5.028_726_349_457_868E-1;
pub(crate) const TINV21: Float = 2.571_926_949_855_605;
pub(crate) const TINV22: Float = -5.960_392_048_282_249E-1;
