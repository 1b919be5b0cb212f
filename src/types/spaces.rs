//! Vector space markers and typed vectors
//!
//! State estimates, sensor readings and innovations are all small nalgebra
//! vectors. Wrapping them in a space marker keeps a radar reading from being
//! added to a state vector by accident.

use ::core::marker::PhantomData;
use nalgebra::{RealField, SMatrix, SVector, Scalar};
use num_traits::Float;

use super::angle::normalize_angle;

// ============================================================================
// Vector Space Markers
// ============================================================================

/// Marker for CTRV state space: [px, py, v, yaw, yaw_rate]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateSpace;

/// Marker for sensor measurement space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeasurementSpace;

/// Marker for innovation vectors (measurement - predicted measurement)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InnovationSpace;

// ============================================================================
// Typed Vector
// ============================================================================

/// A vector parameterized by scalar type, dimension, and space.
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "T: Scalar + serde::Serialize",
        deserialize = "T: Scalar + serde::Deserialize<'de>"
    ))
)]
pub struct Vector<T: Scalar, const N: usize, Space> {
    inner: SVector<T, N>,
    #[cfg_attr(feature = "serde", serde(skip))]
    _marker: PhantomData<Space>,
}

impl<T: Scalar, const N: usize, Space> Vector<T, N, Space> {
    /// Builds a vector from its components.
    #[inline]
    pub fn from_array(data: [T; N]) -> Self {
        Self::from_svector(SVector::from(data))
    }

    /// Wraps a raw nalgebra vector.
    #[inline]
    pub fn from_svector(inner: SVector<T, N>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// Underlying nalgebra vector.
    #[inline]
    pub fn as_svector(&self) -> &SVector<T, N> {
        &self.inner
    }

    /// Components in order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.inner.as_slice()
    }

    /// Access element at index.
    ///
    /// # Panics
    /// Panics if index is out of bounds.
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn index(&self, index: usize) -> &T {
        &self.inner[index]
    }
}

impl<T: Scalar + Copy, const N: usize, Space: Clone> Copy for Vector<T, N, Space> {}

impl<T: RealField + Float + Copy, const N: usize, Space> Vector<T, N, Space> {
    /// All-zero vector.
    #[inline]
    pub fn zeros() -> Self {
        Self::from_svector(SVector::zeros())
    }

    /// True when every component is finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.inner.iter().all(|v| Float::is_finite(*v))
    }
}

// ============================================================================
// Type Aliases
// ============================================================================

/// A state vector in state space.
pub type StateVector<T, const N: usize> = Vector<T, N, StateSpace>;

/// A measurement vector in measurement space.
pub type Measurement<T, const M: usize> = Vector<T, M, MeasurementSpace>;

/// An innovation vector (measurement residual) in innovation space.
pub type Innovation<T, const M: usize> = Vector<T, M, InnovationSpace>;

/// The five-component CTRV state.
pub type CtrvState<T> = StateVector<T, 5>;

impl<T: RealField + Float + Copy> StateVector<T, 5> {
    /// Builds a CTRV state from its named components.
    #[inline]
    pub fn ctrv(px: T, py: T, speed: T, yaw: T, yaw_rate: T) -> Self {
        Self::from_array([px, py, speed, yaw, yaw_rate])
    }

    #[inline]
    pub fn px(&self) -> T {
        self.inner[0]
    }

    #[inline]
    pub fn py(&self) -> T {
        self.inner[1]
    }

    /// Speed magnitude along the heading.
    #[inline]
    pub fn speed(&self) -> T {
        self.inner[2]
    }

    #[inline]
    pub fn yaw(&self) -> T {
        self.inner[3]
    }

    #[inline]
    pub fn yaw_rate(&self) -> T {
        self.inner[4]
    }

    /// Cartesian velocity `(vx, vy)` derived from speed and heading.
    #[inline]
    pub fn velocity(&self) -> (T, T) {
        let v = self.speed();
        let yaw = self.yaw();
        (v * Float::cos(yaw), v * Float::sin(yaw))
    }
}

// ============================================================================
// Special Operation: Measurement - Measurement = Innovation
// ============================================================================

/// Computes the innovation between an actual and a predicted measurement.
///
/// Components listed in `angular` are wrapped into (-π, π] after subtraction.
pub trait ComputeInnovation<T: RealField, const M: usize> {
    fn innovation(self, predicted: &Measurement<T, M>, angular: &[usize]) -> Innovation<T, M>;
}

impl<T: RealField + Float + Copy, const M: usize> ComputeInnovation<T, M> for Measurement<T, M> {
    #[inline]
    fn innovation(self, predicted: &Measurement<T, M>, angular: &[usize]) -> Innovation<T, M> {
        Innovation::from_svector(wrapped_difference(&self.inner, &predicted.inner, angular))
    }
}

/// `a - b` with the listed angular components normalized.
#[inline]
pub fn wrapped_difference<T: RealField + Float + Copy, const D: usize>(
    a: &SVector<T, D>,
    b: &SVector<T, D>,
    angular: &[usize],
) -> SVector<T, D> {
    let mut diff = a - b;
    for &i in angular {
        diff[i] = normalize_angle(diff[i]);
    }
    diff
}

// ============================================================================
// Covariance Matrix
// ============================================================================

/// A covariance matrix bound to a specific vector space.
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(bound(
        serialize = "T: Scalar + serde::Serialize",
        deserialize = "T: Scalar + serde::Deserialize<'de>"
    ))
)]
pub struct Covariance<T: Scalar, const N: usize, Space> {
    inner: SMatrix<T, N, N>,
    #[cfg_attr(feature = "serde", serde(skip))]
    _marker: PhantomData<Space>,
}

impl<T: Scalar, const N: usize, Space> Covariance<T, N, Space> {
    /// Wraps a raw matrix.
    ///
    /// The caller should ensure the matrix is symmetric and positive semi-definite.
    #[inline]
    pub fn from_matrix(inner: SMatrix<T, N, N>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn as_matrix(&self) -> &SMatrix<T, N, N> {
        &self.inner
    }
}

impl<T: Scalar + Copy, const N: usize, Space: Clone> Copy for Covariance<T, N, Space> where
    SMatrix<T, N, N>: Copy
{
}

impl<T: RealField + Float + Copy, const N: usize, Space> Covariance<T, N, Space> {
    #[inline]
    pub fn identity() -> Self {
        Self::from_matrix(SMatrix::identity())
    }

    #[inline]
    pub fn from_diagonal(diag: &SVector<T, N>) -> Self {
        Self::from_matrix(SMatrix::from_diagonal(diag))
    }

    /// Largest absolute difference between the matrix and its transpose.
    pub fn asymmetry(&self) -> T {
        let mut worst = T::zero();
        for i in 0..N {
            for j in (i + 1)..N {
                worst = Float::max(worst, Float::abs(self.inner[(i, j)] - self.inner[(j, i)]));
            }
        }
        worst
    }

    /// True when every entry is finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.inner.iter().all(|v| Float::is_finite(*v))
    }
}

/// Covariance matrix in state space.
pub type StateCovariance<T, const N: usize> = Covariance<T, N, StateSpace>;

/// Covariance matrix in measurement space (R, and S = HPHᵀ + R).
pub type MeasurementCovariance<T, const M: usize> = Covariance<T, M, MeasurementSpace>;

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::PI;

    #[test]
    fn test_ctrv_accessors() {
        let x: CtrvState<f64> = StateVector::ctrv(1.0, 2.0, 3.0, PI / 2.0, 0.1);
        assert_eq!(x.px(), 1.0);
        assert_eq!(x.py(), 2.0);
        assert_eq!(x.speed(), 3.0);
        assert_eq!(x.yaw_rate(), 0.1);

        let (vx, vy) = x.velocity();
        assert!(vx.abs() < 1e-12);
        assert!((vy - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_innovation_wraps_bearing() {
        let actual: Measurement<f64, 3> = Measurement::from_array([10.0, 3.1, 0.0]);
        let predicted: Measurement<f64, 3> = Measurement::from_array([9.0, -3.1, 0.0]);

        let innovation = actual.innovation(&predicted, &[1]);
        assert!((innovation.index(0) - 1.0).abs() < 1e-12);
        // 6.2 rad wraps to 6.2 - 2π
        assert!((innovation.index(1) - (6.2 - 2.0 * PI)).abs() < 1e-12);
    }

    #[test]
    fn test_innovation_without_angles_is_plain_difference() {
        let actual: Measurement<f64, 2> = Measurement::from_array([10.0, 20.0]);
        let predicted: Measurement<f64, 2> = Measurement::from_array([9.5, 19.0]);

        let innovation = actual.innovation(&predicted, &[]);
        assert!((innovation.index(0) - 0.5).abs() < 1e-12);
        assert!((innovation.index(1) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_asymmetry() {
        let cov: StateCovariance<f64, 2> =
            StateCovariance::from_matrix(nalgebra::matrix![1.0, 0.5; 0.25, 1.0]);
        assert!((cov.asymmetry() - 0.25).abs() < 1e-12);
        assert_eq!(StateCovariance::<f64, 3>::identity().asymmetry(), 0.0);
    }
}
