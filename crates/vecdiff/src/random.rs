//! Random vector fill.
//!
//! This module provides the sampling traits used by [`Scalar`] and
//! functions for filling vectors from a named distribution.

use rand::distr::StandardUniform;
use rand::{Rng, RngCore};
use rand_distr::StandardNormal;

use crate::backend::Vector;
use crate::scalar::Scalar;

/// Trait for types that can be randomly sampled from a uniform distribution.
pub trait RandomUniform: Sized {
    /// Sample a random value from the uniform distribution [0, 1).
    fn sample_uniform<R: Rng + ?Sized>(rng: &mut R) -> Self;
}

impl RandomUniform for f32 {
    fn sample_uniform<R: Rng + ?Sized>(rng: &mut R) -> Self {
        rng.sample(StandardUniform)
    }
}

impl RandomUniform for f64 {
    fn sample_uniform<R: Rng + ?Sized>(rng: &mut R) -> Self {
        rng.sample(StandardUniform)
    }
}

/// Trait for types that can be randomly sampled from a normal distribution.
pub trait RandomNormal: Sized {
    /// Sample a random value from the standard normal distribution.
    fn sample_normal<R: Rng + ?Sized>(rng: &mut R) -> Self;
}

impl RandomNormal for f32 {
    fn sample_normal<R: Rng + ?Sized>(rng: &mut R) -> Self {
        rng.sample(StandardNormal)
    }
}

impl RandomNormal for f64 {
    fn sample_normal<R: Rng + ?Sized>(rng: &mut R) -> Self {
        rng.sample(StandardNormal)
    }
}

/// Named probability distribution for [`fill_random`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distribution {
    /// Standard normal.
    Normal,
    /// Uniform on [0, 1).
    Uniform,
    /// 0 or 1 with equal probability.
    Bernoulli,
}

/// Overwrite every component of `v` with a sample from `dist`.
///
/// When `rng` is `None` the thread-local generator is used.
///
/// # Example
///
/// ```
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
/// use vecdiff::Vector;
/// use vecdiff::random::{Distribution, fill_random};
///
/// let mut rng = StdRng::seed_from_u64(42);
/// let mut v1 = Vector::<f64>::zeros(4);
/// fill_random(&mut v1, Distribution::Uniform, Some(&mut rng));
///
/// let mut rng = StdRng::seed_from_u64(42);
/// let mut v2 = Vector::<f64>::zeros(4);
/// fill_random(&mut v2, Distribution::Uniform, Some(&mut rng));
///
/// assert_eq!(v1, v2);
/// ```
pub fn fill_random<T: Scalar>(
    v: &mut Vector<T>,
    dist: Distribution,
    rng: Option<&mut dyn RngCore>,
) {
    match rng {
        Some(rng) => fill_with_rng(v, dist, rng),
        None => fill_with_rng(v, dist, &mut rand::rng()),
    }
}

/// Fill `v` from `dist` using a specific RNG.
pub fn fill_with_rng<T: Scalar, R: Rng + ?Sized>(v: &mut Vector<T>, dist: Distribution, rng: &mut R) {
    let data = v.as_mut_slice();
    match dist {
        Distribution::Normal => data.iter_mut().for_each(|x| *x = T::sample_normal(rng)),
        Distribution::Uniform => data.iter_mut().for_each(|x| *x = T::sample_uniform(rng)),
        Distribution::Bernoulli => data.iter_mut().for_each(|x| {
            *x = if rng.random_bool(0.5) { T::one() } else { T::zero() }
        }),
    }
}
