//! Finite-difference gradient checking.
//!
//! A [`Checker`] wraps a function of some variables that can be evaluated
//! twice: once through reverse-mode propagation and once by perturbing
//! each variable component. [`check`] compares the two Jacobians.
//!
//! # Example
//!
//! ```
//! use vecdiff::{Var, Vector, ops};
//! use vecdiff::gradcheck::ResChecker;
//!
//! let x = Var::new(Vector::<f64>::from_f64s(&[0.3, -1.2, 2.0]));
//! let checker = ResChecker::new(|| Ok(ops::tanh(&x.to_res())), vec![x.clone()]);
//! checker.full_check().unwrap();
//! ```

mod res_checker;
mod seq_checker;

pub use res_checker::ResChecker;
pub use seq_checker::SeqChecker;

use log::{debug, warn};
use thiserror::Error;

use crate::backend::Vector;
use crate::error::DiffError;
use crate::graph::{Grad, Var, VarSet};
use crate::scalar::Scalar;

/// Ways a gradient check can fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GradCheckError {
    /// The function under test could not be built.
    #[error("building the checked function failed: {0}")]
    Build(#[from] DiffError),

    /// Exact and approximate partial derivatives disagree.
    #[error("d out[{output}] / d var{var}[{index}] approximated to {expected} but got {actual}")]
    Mismatch {
        output: usize,
        var: usize,
        index: usize,
        expected: f64,
        actual: f64,
    },

    /// The output does not report a listed variable as a dependency.
    #[error("output does not depend on var{var}")]
    MissingVar { var: usize },

    /// Propagation left internal gradient slots behind.
    #[error("{count} temporary gradient slots left after propagation")]
    LeakedTemporaries { count: usize },

    /// Propagation added or removed gradient slots.
    #[error("gradient slots changed during propagation: expected {expected:?}, got {actual:?}")]
    GradKeysChanged { expected: VarSet, actual: VarSet },

    /// The finite-difference output changed length under perturbation.
    #[error("output length changed from {expected} to {actual} under perturbation")]
    OutputLength { expected: usize, actual: usize },
}

/// Something whose gradients can be computed two ways.
pub trait Checker<T: Scalar> {
    /// Variables of interest.
    fn vars(&self) -> &[Var<T>];

    /// Approximate partials of every output component with respect to
    /// component `idx` of `var`.
    fn approx(&self, var: &Var<T>, idx: usize) -> Result<Vector<T>, GradCheckError>;

    /// Propagate a one-hot upstream for output component `comp` into `grad`.
    fn exact(&self, comp: usize, grad: &mut Grad<T>) -> Result<(), GradCheckError>;
}

/// Compare the propagated Jacobian of `c` against finite differences.
///
/// Components are considered equal when they differ by less than
/// `prec * max(1, |a|, |b|)`. Every mismatch is logged; the first one is
/// returned.
pub fn check<T, C>(c: &C, prec: f64) -> Result<(), GradCheckError>
where
    T: Scalar,
    C: Checker<T> + ?Sized,
{
    let Some(n) = output_count(c)? else {
        return Ok(());
    };

    let mut jacobian = Vec::with_capacity(n);
    for i in 0..n {
        let mut g = Grad::new(c.vars());
        c.exact(i, &mut g)?;
        jacobian.push(g);
    }

    let mut first = None;
    let mut mismatches = 0;
    for (var_idx, v) in c.vars().iter().enumerate() {
        for i in 0..v.len() {
            let approx = c.approx(v, i)?;
            for (out_idx, g) in jacobian.iter().enumerate() {
                let actual = g.get(v).and_then(|x| x.get(i)).map_or(0.0, |x| x.as_f64());
                let expected = approx.get(out_idx).map_or(0.0, |x| x.as_f64());
                if values_close(actual, expected, prec) {
                    continue;
                }
                warn!(
                    "d out[{}] / d var{}[{}] approximated to {} but got {}",
                    out_idx, var_idx, i, expected, actual
                );
                mismatches += 1;
                first.get_or_insert(GradCheckError::Mismatch {
                    output: out_idx,
                    var: var_idx,
                    index: i,
                    expected,
                    actual,
                });
            }
        }
    }
    debug!(
        "gradcheck: {} outputs, {} vars, {} mismatches",
        n,
        c.vars().len(),
        mismatches
    );
    first.map_or(Ok(()), Err)
}

/// Check that an output built from `c`'s function depends on every listed
/// variable and that propagating through it leaves the gradient with
/// exactly the slots it started with.
pub(crate) fn check_vars<T, C>(c: &C, out_vars: &VarSet) -> Result<(), GradCheckError>
where
    T: Scalar,
    C: Checker<T> + ?Sized,
{
    for (i, v) in c.vars().iter().enumerate() {
        if !out_vars.has(v.id()) {
            return Err(GradCheckError::MissingVar { var: i });
        }
    }
    let mut g = Grad::new(c.vars());
    let expected = g.vars();
    c.exact(0, &mut g)?;
    if g.pending_temporaries() != 0 {
        return Err(GradCheckError::LeakedTemporaries {
            count: g.pending_temporaries(),
        });
    }
    let actual = g.vars();
    if actual != expected {
        return Err(GradCheckError::GradKeysChanged { expected, actual });
    }
    Ok(())
}

fn output_count<T, C>(c: &C) -> Result<Option<usize>, GradCheckError>
where
    T: Scalar,
    C: Checker<T> + ?Sized,
{
    match c.vars().iter().find(|v| !v.is_empty()) {
        Some(v) => Ok(Some(c.approx(v, 0)?.len())),
        None => Ok(None),
    }
}

/// Central difference of `eval` around component `idx` of `var`.
///
/// The component is restored even if `eval` fails.
pub(crate) fn central_difference<T: Scalar>(
    var: &Var<T>,
    idx: usize,
    delta: f64,
    eval: impl Fn() -> Result<Vector<T>, DiffError>,
) -> Result<Vector<T>, GradCheckError> {
    let old = var.component(idx).ok_or(DiffError::SliceOutOfRange {
        start: idx,
        end: idx + 1,
        len: var.len(),
    })?;
    var.set_component(idx, T::from_f64(old.as_f64() + delta))?;
    let pos = eval();
    var.set_component(idx, T::from_f64(old.as_f64() - delta))?;
    let neg = eval();
    var.set_component(idx, old)?;

    let (mut pos, neg) = (pos?, neg?);
    if pos.len() != neg.len() {
        return Err(GradCheckError::OutputLength {
            expected: pos.len(),
            actual: neg.len(),
        });
    }
    pos -= &neg;
    pos.scale(T::from_f64(1.0 / (2.0 * delta)));
    Ok(pos)
}

/// One-hot vector of length `len`, or all zeros if `idx` is out of range.
pub(crate) fn one_hot<T: Scalar>(len: usize, idx: usize) -> Vector<T> {
    let mut v = Vector::zeros(len);
    if idx < len {
        v.as_mut_slice()[idx] = T::one();
    }
    v
}

fn values_close(a: f64, b: f64, prec: f64) -> bool {
    if a.is_nan() {
        b.is_nan()
    } else if a.is_infinite() {
        b == a
    } else {
        let mag = 1f64.max(a.abs()).max(b.abs());
        (a - b).abs() < prec * mag
    }
}
