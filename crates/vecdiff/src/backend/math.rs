//! Elementwise math primitives.
//!
//! All functions mutate their argument in place, except the chunked
//! reductions which return a fresh vector.

use crate::backend::vector::Vector;
use crate::error::DiffError;
use crate::scalar::Scalar;

pub fn tanh<T: Scalar>(v: &mut Vector<T>) {
    v.apply(|x| x.tanh());
}

/// Logistic sigmoid, stable for large `|x|`.
pub fn sigmoid<T: Scalar>(v: &mut Vector<T>) {
    v.apply(|x| {
        if x >= T::zero() {
            T::one() / (T::one() + (-x).exp())
        } else {
            let e = x.exp();
            e / (T::one() + e)
        }
    });
}

/// `log(sigmoid(x))` computed as `min(x, 0) - ln(1 + e^-|x|)`.
pub fn log_sigmoid<T: Scalar>(v: &mut Vector<T>) {
    v.apply(|x| x.min(T::zero()) - (-x.abs()).exp().ln_1p());
}

/// `ln(1 + e^x)` computed as `max(x, 0) + ln(1 + e^-|x|)`.
pub fn softplus<T: Scalar>(v: &mut Vector<T>) {
    v.apply(|x| x.max(T::zero()) + (-x.abs()).exp().ln_1p());
}

pub fn sin<T: Scalar>(v: &mut Vector<T>) {
    v.apply(|x| x.sin());
}

pub fn cos<T: Scalar>(v: &mut Vector<T>) {
    v.apply(|x| x.cos());
}

pub fn exp<T: Scalar>(v: &mut Vector<T>) {
    v.apply(|x| x.exp());
}

/// Natural logarithm.
pub fn log<T: Scalar>(v: &mut Vector<T>) {
    v.apply(|x| x.ln());
}

pub fn pow<T: Scalar>(v: &mut Vector<T>, p: T) {
    v.apply(|x| x.powf(p));
}

pub fn abs<T: Scalar>(v: &mut Vector<T>) {
    v.apply(|x| x.abs());
}

/// Clamp negative components to zero.
pub fn clip_pos<T: Scalar>(v: &mut Vector<T>) {
    v.apply(|x| if x > T::zero() { x } else { T::zero() });
}

/// `1 - x`.
pub fn complement<T: Scalar>(v: &mut Vector<T>) {
    v.apply(|x| T::one() - x);
}

/// Replace each component with 1 if it is greater than `n`, else 0.
pub fn greater_than<T: Scalar>(v: &mut Vector<T>, n: T) {
    v.apply(|x| if x > n { T::one() } else { T::zero() });
}

pub fn less_than<T: Scalar>(v: &mut Vector<T>, n: T) {
    v.apply(|x| if x < n { T::one() } else { T::zero() });
}

pub fn equal_to<T: Scalar>(v: &mut Vector<T>, n: T) {
    v.apply(|x| if x == n { T::one() } else { T::zero() });
}

/// Componentwise maximum of `v` and `other`, stored in `v`.
pub fn elem_max<T: Scalar>(v: &mut Vector<T>, other: &Vector<T>) {
    v.zip_apply(other, |a, b| if a > b { a } else { b });
}

fn check_chunk(len: usize, chunk: usize) -> Result<(), DiffError> {
    if chunk == 0 || len % chunk != 0 {
        return Err(DiffError::NotDivisible {
            len,
            divisor: chunk,
        });
    }
    Ok(())
}

fn log_sum_exp<T: Scalar>(chunk: &[T]) -> T {
    let max = chunk
        .iter()
        .fold(T::neg_infinity(), |m, &x| if x > m { x } else { m });
    if max.is_infinite() {
        return max;
    }
    let sum = chunk.iter().fold(T::zero(), |acc, &x| acc + (x - max).exp());
    max + sum.ln()
}

/// Log-sum-exp of every `chunk`-sized run of `v`.
///
/// # Errors
///
/// Returns `NotDivisible` if `chunk` does not divide `v.len()`.
///
/// # Example
///
/// ```
/// use vecdiff::Vector;
/// use vecdiff::backend::math::add_logs;
///
/// let v = Vector::<f64>::from_f64s(&[0.0, 0.0, 1.0, 1.0]);
/// let out = add_logs(&v, 2).unwrap();
/// assert!((out.as_slice()[0] - 2f64.ln()).abs() < 1e-12);
/// assert!((out.as_slice()[1] - (1.0 + 2f64.ln())).abs() < 1e-12);
/// ```
pub fn add_logs<T: Scalar>(v: &Vector<T>, chunk: usize) -> Result<Vector<T>, DiffError> {
    check_chunk(v.len(), chunk)?;
    Ok(Vector::from_vec(
        v.as_slice().chunks(chunk).map(log_sum_exp).collect(),
    ))
}

/// Log-softmax over every `chunk`-sized run of `v`, in place.
///
/// # Errors
///
/// Returns `NotDivisible` if `chunk` does not divide `v.len()`.
pub fn log_softmax<T: Scalar>(v: &mut Vector<T>, chunk: usize) -> Result<(), DiffError> {
    check_chunk(v.len(), chunk)?;
    for c in v.as_mut_slice().chunks_mut(chunk) {
        let lse = log_sum_exp(c);
        c.iter_mut().for_each(|x| *x = *x - lse);
    }
    Ok(())
}
