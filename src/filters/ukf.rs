//! Unscented transform over an augmented CTRV state
//!
//! The UKF uses a set of carefully chosen sample points (sigma points) that
//! capture the mean and covariance of the state distribution. These points are
//! propagated through the nonlinear motion model and the output statistics are
//! recovered as weighted sums.
//!
//! # Sigma Point Selection
//!
//! This implementation uses the symmetric selection on the augmented state:
//! - χ₀ = μ (mean)
//! - χᵢ = μ + √(λ+n)·Lᵢ for i = 1...n
//! - χᵢ₊ₙ = μ - √(λ+n)·Lᵢ for i = 1...n
//!
//! where L is the lower Cholesky factor of the augmented covariance and
//! λ = 3 - n is the spread parameter.
//!
//! Mean and covariance share one weight set:
//! - w₀ = λ/(λ+n)
//! - wᵢ = 1/(2(λ+n))

use nalgebra::{RealField, SMatrix, SVector};
use num_traits::Float;

use crate::models::{NonlinearTransitionModel, AUGMENTED_DIM};
use crate::types::spaces::{StateCovariance, StateVector};
use crate::{FusionError, Result};

/// Number of sigma points drawn from the augmented CTRV state (2·7 + 1).
pub const SIGMA_POINT_COUNT: usize = 2 * AUGMENTED_DIM + 1;

// ============================================================================
// UKF State
// ============================================================================

/// Mean and covariance of a state estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct UkfState<T: RealField, const N: usize> {
    /// State estimate mean
    pub mean: StateVector<T, N>,
    /// State estimate covariance
    pub covariance: StateCovariance<T, N>,
}

impl<T: RealField + Copy, const N: usize> Copy for UkfState<T, N> {}

impl<T: RealField + Float + Copy, const N: usize> UkfState<T, N> {
    #[inline]
    pub fn new(mean: StateVector<T, N>, covariance: StateCovariance<T, N>) -> Self {
        Self { mean, covariance }
    }

    /// Creates a state with identity covariance.
    #[inline]
    pub fn with_identity_covariance(mean: StateVector<T, N>) -> Self {
        Self::new(mean, StateCovariance::identity())
    }

    /// True when mean and covariance are free of NaN and infinities.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.mean.is_finite() && self.covariance.is_finite()
    }
}

// ============================================================================
// UKF Parameters
// ============================================================================

/// Sigma point spread parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UkfParams<T: RealField> {
    /// Spread parameter λ; sigma points sit √(λ+n) standard deviations out
    pub lambda: T,
}

impl<T: RealField + Float + Copy> Default for UkfParams<T> {
    /// λ = 3 - n_aug for the augmented CTRV state.
    fn default() -> Self {
        Self::for_dimension(AUGMENTED_DIM)
    }
}

impl<T: RealField + Float + Copy> UkfParams<T> {
    /// λ = 3 - n for an n-dimensional (augmented) state.
    pub fn for_dimension(n: usize) -> Self {
        Self {
            lambda: T::from_f64(3.0).unwrap() - T::from_usize(n).unwrap(),
        }
    }

    /// Computes γ = √(λ + n) used for sigma point generation.
    #[inline]
    pub fn gamma(&self, n: usize) -> T {
        Float::sqrt(self.lambda + T::from_usize(n).unwrap())
    }

    /// Weights of the central and of every other sigma point.
    #[inline]
    fn weight_pair(&self, n: usize) -> (T, T) {
        let spread = self.lambda + T::from_usize(n).unwrap();
        let w0 = self.lambda / spread;
        let wi = T::one() / (T::from_f64(2.0).unwrap() * spread);
        (w0, wi)
    }
}

/// Sigma point weights, shared by mean and covariance recovery.
///
/// `S` is the number of sigma points and must equal 2n+1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SigmaWeights<T: RealField, const S: usize> {
    weights: SVector<T, S>,
}

impl<T: RealField + Float + Copy, const S: usize> SigmaWeights<T, S> {
    /// Computes weights for an n-dimensional augmented state.
    ///
    /// # Panics
    /// Panics if `S != 2n + 1`.
    pub fn new(params: &UkfParams<T>, n: usize) -> Self {
        assert_eq!(S, 2 * n + 1, "Sigma point count must be 2n+1");
        let (w0, wi) = params.weight_pair(n);
        let mut weights = SVector::from_element(wi);
        weights[0] = w0;
        Self { weights }
    }

    #[inline]
    pub fn get(&self, i: usize) -> T {
        self.weights[i]
    }

    #[inline]
    pub fn as_svector(&self) -> &SVector<T, S> {
        &self.weights
    }

    /// Sum of all weights (1 up to rounding).
    #[inline]
    pub fn sum(&self) -> T {
        self.weights.sum()
    }
}

// ============================================================================
// Sigma Points
// ============================================================================

/// A set of `S` sigma points of dimension `D`, one per column.
#[derive(Debug, Clone, PartialEq)]
pub struct SigmaPoints<T: RealField, const D: usize, const S: usize> {
    pub points: SMatrix<T, D, S>,
}

impl<T: RealField + Copy, const D: usize, const S: usize> Copy for SigmaPoints<T, D, S> {}

impl<T: RealField + Float + Copy, const D: usize, const S: usize> SigmaPoints<T, D, S> {
    /// Draws sigma points from a mean and covariance.
    ///
    /// # Errors
    /// `NotPositiveDefinite` if the covariance has no Cholesky factor.
    ///
    /// # Panics
    /// Panics if `S != 2D + 1`.
    pub fn generate(mean: &SVector<T, D>, covariance: &SMatrix<T, D, D>, params: &UkfParams<T>) -> Result<Self> {
        assert_eq!(S, 2 * D + 1, "Sigma point count must be 2n+1");

        // Cholesky decomposition: P = L * L^T
        let sqrt_p = nalgebra::Cholesky::new(*covariance)
            .ok_or(FusionError::NotPositiveDefinite)?
            .l();
        let scaled_sqrt_p = sqrt_p.scale(params.gamma(D));

        let mut points = SMatrix::<T, D, S>::zeros();
        points.set_column(0, mean);
        for i in 0..D {
            let offset = scaled_sqrt_p.column(i);
            points.set_column(i + 1, &(mean + offset));
            points.set_column(i + 1 + D, &(mean - offset));
        }

        Ok(Self { points })
    }

    /// Wraps already propagated points.
    #[inline]
    pub fn from_matrix(points: SMatrix<T, D, S>) -> Self {
        Self { points }
    }

    #[inline]
    pub fn column(&self, i: usize) -> SVector<T, D> {
        self.points.column(i).into_owned()
    }

    /// Weighted mean of the points.
    pub fn mean(&self, weights: &SigmaWeights<T, S>) -> SVector<T, D> {
        self.points * weights.as_svector()
    }

    /// Weighted mean and covariance, with residuals computed by `residual`
    /// so angular components can be wrapped.
    pub fn recover_mean_cov<F>(
        &self,
        weights: &SigmaWeights<T, S>,
        residual: F,
        additive_noise: Option<&SMatrix<T, D, D>>,
    ) -> (SVector<T, D>, SMatrix<T, D, D>)
    where
        F: Fn(&SVector<T, D>, &SVector<T, D>) -> SVector<T, D>,
    {
        let mean = self.mean(weights);

        let mut cov = SMatrix::<T, D, D>::zeros();
        for i in 0..S {
            let diff = residual(&self.column(i), &mean);
            cov += (diff * diff.transpose()).scale(weights.get(i));
        }

        if let Some(noise) = additive_noise {
            cov += noise;
        }

        (mean, cov)
    }

    /// Cross-covariance between these points and another point set of the
    /// same size, given each set's mean and residual function.
    pub fn cross_covariance<const E: usize, F, G>(
        &self,
        mean: &SVector<T, D>,
        residual: F,
        other: &SigmaPoints<T, E, S>,
        other_mean: &SVector<T, E>,
        other_residual: G,
        weights: &SigmaWeights<T, S>,
    ) -> SMatrix<T, D, E>
    where
        F: Fn(&SVector<T, D>, &SVector<T, D>) -> SVector<T, D>,
        G: Fn(&SVector<T, E>, &SVector<T, E>) -> SVector<T, E>,
    {
        let mut cross_cov = SMatrix::<T, D, E>::zeros();
        for i in 0..S {
            let diff = residual(&self.column(i), mean);
            let other_diff = other_residual(&other.column(i), other_mean);
            cross_cov += (diff * other_diff.transpose()).scale(weights.get(i));
        }
        cross_cov
    }
}

// ============================================================================
// Prediction
// ============================================================================

/// Output of the prediction step: the predicted estimate together with the
/// propagated sigma points the measurement update consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction<T: RealField, const N: usize, const S: usize> {
    pub state: UkfState<T, N>,
    pub sigma_points: SigmaPoints<T, N, S>,
    /// Indices of angular state components
    pub angular: &'static [usize],
}

/// Runs the unscented prediction step.
///
/// 1. Augment the state with the process noise components
/// 2. Draw sigma points from the augmented distribution
/// 3. Propagate each point through the transition model
/// 4. Recover the predicted mean and covariance (angle-wrapped residuals)
///
/// # Errors
/// - `NotPositiveDefinite` if the augmented covariance has no Cholesky factor
/// - `NumericalInstability` if propagation produced non-finite values
pub fn predict<T, Trans, const N: usize, const NA: usize, const S: usize>(
    transition: &Trans,
    state: &UkfState<T, N>,
    weights: &SigmaWeights<T, S>,
    params: &UkfParams<T>,
    dt: T,
) -> Result<Prediction<T, N, S>>
where
    T: RealField + Float + Copy,
    Trans: NonlinearTransitionModel<T, N, NA>,
{
    let (x_aug, p_aug) = transition.augment(&state.mean, &state.covariance);
    let augmented = SigmaPoints::<T, NA, S>::generate(&x_aug, &p_aug, params)?;

    let mut propagated = SMatrix::<T, N, S>::zeros();
    for i in 0..S {
        let next = transition.propagate(&augmented.column(i), dt);
        propagated.set_column(i, next.as_svector());
    }
    let sigma_points = SigmaPoints::from_matrix(propagated);

    let (mean, cov) =
        sigma_points.recover_mean_cov(weights, |a, b| transition.state_residual(a, b), None);

    let predicted = UkfState::new(StateVector::from_svector(mean), StateCovariance::from_matrix(cov));
    if !predicted.is_finite() {
        return Err(FusionError::NumericalInstability);
    }

    Ok(Prediction {
        state: predicted,
        sigma_points,
        angular: transition.angular_components(),
    })
}

// ============================================================================
// Tests
// ============================================================================
