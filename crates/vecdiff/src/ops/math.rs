//! Differentiable elementwise nonlinearities and chunked log-sum-exp.

use crate::backend::{Vector, chunks, math};
use crate::error::DiffError;
use crate::graph::{Const, Grad, Node, Res, VarSet};
use crate::scalar::Scalar;

use super::vector_ops::{add, mul};

/// Elementwise function with a precomputed local derivative.
#[derive(Debug)]
struct Elementwise<T: Scalar> {
    input: Res<T>,
    out: Vector<T>,
    /// `f'(x)` for every component.
    deriv: Vector<T>,
}

impl<T: Scalar> Node<T> for Elementwise<T> {
    fn output(&self) -> Vector<T> {
        self.out.clone()
    }

    fn vars(&self) -> VarSet {
        self.input.vars()
    }

    fn propagate(&self, mut upstream: Vector<T>, grad: &mut Grad<T>) {
        upstream *= &self.deriv;
        self.input.propagate(upstream, grad);
    }
}

fn elementwise<T: Scalar>(
    r: &Res<T>,
    f: impl FnOnce(&mut Vector<T>),
    deriv: impl FnOnce(&Vector<T>, &Vector<T>) -> Vector<T>,
) -> Res<T> {
    let x = r.output();
    let mut out = x.clone();
    f(&mut out);
    let deriv = deriv(&x, &out);
    Res::new(Elementwise {
        input: r.clone(),
        out,
        deriv,
    })
}

fn mapped<T: Scalar>(v: &Vector<T>, f: impl Fn(T) -> T) -> Vector<T> {
    let mut v = v.clone();
    v.apply(f);
    v
}

pub fn tanh<T: Scalar>(r: &Res<T>) -> Res<T> {
    elementwise(r, math::tanh, |_, out| mapped(out, |y| T::one() - y * y))
}

pub fn sigmoid<T: Scalar>(r: &Res<T>) -> Res<T> {
    elementwise(r, math::sigmoid, |_, out| mapped(out, |s| s * (T::one() - s)))
}

/// `log(sigmoid(x))`, stable for large `|x|`.
pub fn log_sigmoid<T: Scalar>(r: &Res<T>) -> Res<T> {
    elementwise(r, math::log_sigmoid, |x, _| {
        let mut d = mapped(x, |x| -x);
        math::sigmoid(&mut d);
        d
    })
}

/// `ln(1 + e^x)`.
pub fn softplus<T: Scalar>(r: &Res<T>) -> Res<T> {
    elementwise(r, math::softplus, |x, _| {
        let mut d = x.clone();
        math::sigmoid(&mut d);
        d
    })
}

pub fn sin<T: Scalar>(r: &Res<T>) -> Res<T> {
    elementwise(r, math::sin, |x, _| mapped(x, |x| x.cos()))
}

pub fn cos<T: Scalar>(r: &Res<T>) -> Res<T> {
    elementwise(r, math::cos, |x, _| mapped(x, |x| -x.sin()))
}

pub fn exp<T: Scalar>(r: &Res<T>) -> Res<T> {
    elementwise(r, math::exp, |_, out| out.clone())
}

/// Natural logarithm.
pub fn log<T: Scalar>(r: &Res<T>) -> Res<T> {
    elementwise(r, math::log, |x, _| mapped(x, |x| T::one() / x))
}

/// `x^p` for a constant exponent `p`.
pub fn pow<T: Scalar>(r: &Res<T>, p: T) -> Res<T> {
    elementwise(
        r,
        |v| math::pow(v, p),
        |x, _| mapped(x, |x| p * x.powf(p - T::one())),
    )
}

/// `x^e` where `exponent` is a length-1 result.
///
/// # Errors
///
/// Returns `NonConstantExponent` if `exponent` depends on any variable,
/// and `LengthMismatch` if it is not a single component.
pub fn pow_by<T: Scalar>(r: &Res<T>, exponent: &Res<T>) -> Result<Res<T>, DiffError> {
    if !exponent.vars().is_empty() {
        return Err(DiffError::NonConstantExponent);
    }
    let e = exponent.output();
    if e.len() != 1 {
        return Err(DiffError::LengthMismatch {
            expected: 1,
            actual: e.len(),
        });
    }
    Ok(pow(r, e.as_slice()[0]))
}

/// `|x|`. The derivative at zero is taken as zero.
pub fn abs<T: Scalar>(r: &Res<T>) -> Res<T> {
    elementwise(r, math::abs, |x, _| {
        mapped(x, |x| {
            if x > T::zero() {
                T::one()
            } else if x < T::zero() {
                -T::one()
            } else {
                T::zero()
            }
        })
    })
}

/// `max(x, 0)`.
pub fn clip_pos<T: Scalar>(r: &Res<T>) -> Res<T> {
    elementwise(r, math::clip_pos, |x, _| {
        let mut mask = x.clone();
        math::greater_than(&mut mask, T::zero());
        mask
    })
}

/// `1 - x`.
pub fn complement<T: Scalar>(r: &Res<T>) -> Res<T> {
    elementwise(r, math::complement, |x, _| Vector::from_vec(vec![-T::one(); x.len()]))
}

/// Componentwise maximum.
///
/// Built from a constant mask `m = (a - b > 0)` as `m*a + (1-m)*b`, so
/// ties send the whole gradient to `b`.
///
/// # Errors
///
/// Returns `LengthMismatch` if the operands differ in length.
pub fn elem_max<T: Scalar>(a: &Res<T>, b: &Res<T>) -> Result<Res<T>, DiffError> {
    super::check_same_len(a, b)?;
    let mut mask = a.output();
    mask -= &b.output();
    math::greater_than(&mut mask, T::zero());
    let mut inv = mask.clone();
    math::complement(&mut inv);
    add(
        &mul(&Const::new(mask).to_res(), a)?,
        &mul(&Const::new(inv).to_res(), b)?,
    )
}

/// Log-softmax over every `chunk`-sized run.
#[derive(Debug)]
struct LogSoftmax<T: Scalar> {
    input: Res<T>,
    out: Vector<T>,
    probs: Vector<T>,
    chunk: usize,
}

impl<T: Scalar> Node<T> for LogSoftmax<T> {
    fn output(&self) -> Vector<T> {
        self.out.clone()
    }

    fn vars(&self) -> VarSet {
        self.input.vars()
    }

    fn propagate(&self, mut upstream: Vector<T>, grad: &mut Grad<T>) {
        let totals = chunks::sum_cols(&upstream, upstream.len() / self.chunk);
        let mut weighted = self.probs.clone();
        chunks::scale_chunks(&mut weighted, &totals);
        upstream -= &weighted;
        self.input.propagate(upstream, grad);
    }
}

/// Log-softmax of every `chunk`-sized run of `r`.
///
/// # Errors
///
/// Returns `NotDivisible` if `chunk` does not divide `r`'s length.
pub fn log_softmax<T: Scalar>(r: &Res<T>, chunk: usize) -> Result<Res<T>, DiffError> {
    let mut out = r.output();
    math::log_softmax(&mut out, chunk)?;
    let mut probs = out.clone();
    math::exp(&mut probs);
    Ok(Res::new(LogSoftmax {
        input: r.clone(),
        out,
        probs,
        chunk,
    }))
}

/// Log-sum-exp over every `chunk`-sized run.
#[derive(Debug)]
struct AddLogs<T: Scalar> {
    input: Res<T>,
    out: Vector<T>,
    probs: Vector<T>,
}

impl<T: Scalar> Node<T> for AddLogs<T> {
    fn output(&self) -> Vector<T> {
        self.out.clone()
    }

    fn vars(&self) -> VarSet {
        self.input.vars()
    }

    fn propagate(&self, upstream: Vector<T>, grad: &mut Grad<T>) {
        let mut down = self.probs.clone();
        chunks::scale_chunks(&mut down, &upstream);
        self.input.propagate(down, grad);
    }
}

/// `log(sum(exp(x)))` of every `chunk`-sized run of `r`.
///
/// # Errors
///
/// Returns `NotDivisible` if `chunk` does not divide `r`'s length.
pub fn add_logs<T: Scalar>(r: &Res<T>, chunk: usize) -> Result<Res<T>, DiffError> {
    let x = r.output();
    let out = math::add_logs(&x, chunk)?;
    let mut probs = x.clone();
    let mut neg = out.clone();
    neg.scale(-T::one());
    chunks::add_chunks(&mut probs, &neg);
    math::exp(&mut probs);
    Ok(Res::new(AddLogs {
        input: r.clone(),
        out,
        probs,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Var;
    use approx::assert_relative_eq;

    fn var(data: &[f64]) -> Var<f64> {
        Var::new(Vector::from_f64s(data))
    }

    fn grad_of(v: &Var<f64>, out: &Res<f64>, upstream: &[f64]) -> Vec<f64> {
        let mut g = Grad::new(&[v.clone()]);
        out.propagate(Vector::from_f64s(upstream), &mut g);
        g.get(v).unwrap().to_vec()
    }

    #[test]
    fn test_tanh_gradient() {
        let v = var(&[0.5]);
        let out = tanh(&v.to_res());
        let t = 0.5f64.tanh();
        assert_relative_eq!(grad_of(&v, &out, &[2.0])[0], 2.0 * (1.0 - t * t));
    }

    #[test]
    fn test_pow_literals() {
        let v = var(&[2.0, 3.0]);
        let out = pow(&v.to_res(), 1.3);
        assert_relative_eq!(out.output().as_slice()[0], 2.4622888267, epsilon = 1e-9);
        assert_relative_eq!(out.output().as_slice()[1], 4.1711675109, epsilon = 1e-9);
        let g = grad_of(&v, &out, &[1.0, 1.0]);
        assert_relative_eq!(g[0], 1.3 * 2f64.powf(0.3), epsilon = 1e-12);
    }

    #[test]
    fn test_pow_by_rejects_variable_exponent() {
        let v = var(&[1.0]);
        let e = var(&[2.0]);
        assert_eq!(
            pow_by(&v.to_res(), &e.to_res()).unwrap_err(),
            DiffError::NonConstantExponent
        );
        let c = Const::new(Vector::from_f64s(&[3.0])).to_res();
        let out = pow_by(&var(&[2.0]).to_res(), &c).unwrap();
        assert_relative_eq!(out.output().as_slice()[0], 8.0);
    }

    #[test]
    fn test_elem_max_ties_go_to_second() {
        let a = var(&[1.0, 3.0, 2.0]);
        let b = var(&[1.0, 2.0, 5.0]);
        let out = elem_max(&a.to_res(), &b.to_res()).unwrap();
        assert_eq!(out.output().as_slice(), &[1.0, 3.0, 5.0]);
        let mut g = Grad::new(&[a.clone(), b.clone()]);
        out.propagate(Vector::from_f64s(&[1.0, 1.0, 1.0]), &mut g);
        assert_eq!(g.get(&a).unwrap().as_slice(), &[0.0, 1.0, 0.0]);
        assert_eq!(g.get(&b).unwrap().as_slice(), &[1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_log_softmax_rejects_bad_chunk() {
        let v = var(&[1.0, 2.0, 3.0]);
        assert!(log_softmax(&v.to_res(), 2).is_err());
        assert!(add_logs(&v.to_res(), 0).is_err());
    }

    #[test]
    fn test_log_softmax_gradient_sums_to_zero() {
        let v = var(&[0.1, -0.4, 2.0, 1.0]);
        let out = log_softmax(&v.to_res(), 2).unwrap();
        let g = grad_of(&v, &out, &[1.0, 1.0, 1.0, 1.0]);
        assert_relative_eq!(g[0] + g[1], 0.0, epsilon = 1e-12);
        assert_relative_eq!(g[2] + g[3], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_add_logs_gradient_is_softmax() {
        let v = var(&[0.0, 0.0]);
        let out = add_logs(&v.to_res(), 2).unwrap();
        let g = grad_of(&v, &out, &[1.0]);
        assert_relative_eq!(g[0], 0.5);
        assert_relative_eq!(g[1], 0.5);
    }

    #[test]
    fn test_clip_pos_mask() {
        let v = var(&[-1.0, 2.0]);
        let out = clip_pos(&v.to_res());
        assert_eq!(out.output().as_slice(), &[0.0, 2.0]);
        assert_eq!(grad_of(&v, &out, &[3.0, 3.0]), vec![0.0, 3.0]);
    }
}
