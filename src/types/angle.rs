//! Angle normalization
//!
//! Heading and bearing residuals must be folded back into (-π, π] before they
//! enter an outer product or a Kalman correction; a raw difference between
//! 179° and -179° would otherwise look like a 358° error.

use nalgebra::RealField;
use num_traits::Float;

/// Wraps an angle into the half-open interval (-π, π].
///
/// Non-finite input is returned unchanged.
pub fn normalize_angle<T: RealField + Float + Copy>(angle: T) -> T {
    if !Float::is_finite(angle) {
        return angle;
    }

    let pi = T::pi();
    let two_pi = T::two_pi();

    let mut a = angle;
    // Far-off angles are reduced first so the loops below run at most twice.
    if Float::abs(a) > two_pi + two_pi {
        a = a % two_pi;
    }
    while a > pi {
        a -= two_pi;
    }
    while a <= -pi {
        a += two_pi;
    }
    a
}
