//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use rand::SeedableRng;
use rand::rngs::StdRng;
use vecdiff::random::{Distribution, fill_with_rng};
use vecdiff::seq::{ResBatch, Seq, res_seq};
use vecdiff::{DiffError, Scalar, Var, Vector};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Variable with standard normal components.
pub fn random_var<T: Scalar>(rng: &mut StdRng, size: usize) -> Var<T> {
    let mut v = Vector::zeros(size);
    fill_with_rng(&mut v, Distribution::Normal, rng);
    Var::new(v)
}

/// Components in `±[0.1, 1.1)`, away from the kink at zero.
pub fn abs_friendly_var<T: Scalar>(rng: &mut StdRng, size: usize) -> Var<T> {
    let mut v = Vector::zeros(size);
    fill_with_rng(&mut v, Distribution::Uniform, rng);
    v.add_scalar(T::from_f64(0.1));
    let mut mask = Vector::zeros(size);
    fill_with_rng(&mut mask, Distribution::Bernoulli, rng);
    mask.add_scalar(T::from_f64(-0.5));
    mask.scale(T::from_f64(2.0));
    v *= &mask;
    Var::new(v)
}

/// Components in `[0.25, 1.25)`.
pub fn division_friendly_var<T: Scalar>(rng: &mut StdRng, size: usize) -> Var<T> {
    let mut v = Vector::zeros(size);
    fill_with_rng(&mut v, Distribution::Uniform, rng);
    v.add_scalar(T::from_f64(0.25));
    Var::new(v)
}

pub fn vec64(data: &[f64]) -> Vector<f64> {
    Vector::from_f64s(data)
}

/// Four sequences of lengths 4, 2, 6 and 1 with chunk size 6.
pub const BASIC_PRESENCE: [[bool; 4]; 6] = [
    [true, true, true, true],
    [true, true, true, false],
    [true, false, true, false],
    [true, false, true, false],
    [false, false, true, false],
    [false, false, true, false],
];

/// One random variable per timestep of [`BASIC_PRESENCE`].
pub fn basic_seq_vars<T: Scalar>(rng: &mut StdRng) -> Vec<Var<T>> {
    BASIC_PRESENCE
        .iter()
        .map(|p| random_var(rng, 6 * p.iter().filter(|&&x| x).count()))
        .collect()
}

/// Sequence whose timesteps are `vars` with the given presence masks.
pub fn seq_from_vars<T: Scalar>(vars: &[Var<T>], presence: &[[bool; 4]]) -> Result<Seq<T>, DiffError> {
    let batches = vars
        .iter()
        .zip(presence)
        .map(|(v, p)| ResBatch {
            packed: v.to_res(),
            present: p.to_vec(),
        })
        .collect();
    res_seq(batches)
}

pub fn basic_seq<T: Scalar>(vars: &[Var<T>]) -> Result<Seq<T>, DiffError> {
    seq_from_vars(vars, &BASIC_PRESENCE)
}
