//! Elementwise arithmetic between results.

use super::check_same_len;
use crate::backend::Vector;
use crate::error::DiffError;
use crate::graph::{Grad, Node, Res, VarSet};
use crate::scalar::Scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Binary elementwise node.
///
/// Keeps the operand outputs from the forward pass for the product and
/// quotient rules.
#[derive(Debug)]
struct Binary<T: Scalar> {
    op: BinaryOp,
    a: Res<T>,
    b: Res<T>,
    a_out: Vector<T>,
    b_out: Vector<T>,
    out: Vector<T>,
    vars: VarSet,
}

fn binary<T: Scalar>(op: BinaryOp, a: &Res<T>, b: &Res<T>) -> Result<Res<T>, DiffError> {
    check_same_len(a, b)?;
    let (a_out, b_out) = (a.output(), b.output());
    let mut out = a_out.clone();
    match op {
        BinaryOp::Add => out += &b_out,
        BinaryOp::Sub => out -= &b_out,
        BinaryOp::Mul => out *= &b_out,
        BinaryOp::Div => out /= &b_out,
    }
    Ok(Res::new(Binary {
        op,
        a: a.clone(),
        b: b.clone(),
        a_out,
        b_out,
        out,
        vars: a.vars().merge(&b.vars()),
    }))
}

impl<T: Scalar> Node<T> for Binary<T> {
    fn output(&self) -> Vector<T> {
        self.out.clone()
    }

    fn vars(&self) -> VarSet {
        self.vars.clone()
    }

    fn propagate(&self, upstream: Vector<T>, grad: &mut Grad<T>) {
        let prop_a = grad.intersects(&self.a.vars());
        let prop_b = grad.intersects(&self.b.vars());
        let (ua, ub) = match (prop_a, prop_b) {
            (false, false) => return,
            (true, false) => (Some(upstream), None),
            (false, true) => (None, Some(upstream)),
            (true, true) => (Some(upstream.clone()), Some(upstream)),
        };
        if let Some(mut u) = ua {
            match self.op {
                BinaryOp::Add | BinaryOp::Sub => {}
                BinaryOp::Mul => u *= &self.b_out,
                BinaryOp::Div => u /= &self.b_out,
            }
            self.a.propagate(u, grad);
        }
        if let Some(mut u) = ub {
            match self.op {
                BinaryOp::Add => {}
                BinaryOp::Sub => u.scale(-T::one()),
                BinaryOp::Mul => u *= &self.a_out,
                BinaryOp::Div => {
                    // d(a/b)/db = -(a/b) / b
                    u *= &self.out;
                    u /= &self.b_out;
                    u.scale(-T::one());
                }
            }
            self.b.propagate(u, grad);
        }
    }
}

/// Componentwise `a + b`.
///
/// # Errors
///
/// Returns `LengthMismatch` if the operands differ in length.
pub fn add<T: Scalar>(a: &Res<T>, b: &Res<T>) -> Result<Res<T>, DiffError> {
    binary(BinaryOp::Add, a, b)
}

/// Componentwise `a - b`.
pub fn sub<T: Scalar>(a: &Res<T>, b: &Res<T>) -> Result<Res<T>, DiffError> {
    binary(BinaryOp::Sub, a, b)
}

/// Componentwise `a * b`.
pub fn mul<T: Scalar>(a: &Res<T>, b: &Res<T>) -> Result<Res<T>, DiffError> {
    binary(BinaryOp::Mul, a, b)
}

/// Componentwise `a / b`.
pub fn div<T: Scalar>(a: &Res<T>, b: &Res<T>) -> Result<Res<T>, DiffError> {
    binary(BinaryOp::Div, a, b)
}

/// Affine map `s * x + shift` applied to every component.
#[derive(Debug)]
struct Affine<T: Scalar> {
    input: Res<T>,
    scaler: T,
    out: Vector<T>,
}

impl<T: Scalar> Node<T> for Affine<T> {
    fn output(&self) -> Vector<T> {
        self.out.clone()
    }

    fn vars(&self) -> VarSet {
        self.input.vars()
    }

    fn propagate(&self, mut upstream: Vector<T>, grad: &mut Grad<T>) {
        if self.scaler != T::one() {
            upstream.scale(self.scaler);
        }
        self.input.propagate(upstream, grad);
    }
}

/// Multiply every component by the constant `s`.
pub fn scale<T: Scalar>(r: &Res<T>, s: T) -> Res<T> {
    let mut out = r.output();
    out.scale(s);
    Res::new(Affine {
        input: r.clone(),
        scaler: s,
        out,
    })
}

/// Add the constant `s` to every component.
pub fn add_scalar<T: Scalar>(r: &Res<T>, s: T) -> Res<T> {
    let mut out = r.output();
    out.add_scalar(s);
    Res::new(Affine {
        input: r.clone(),
        scaler: T::one(),
        out,
    })
}

#[derive(Debug)]
struct Sum<T: Scalar> {
    input: Res<T>,
    out: Vector<T>,
}

impl<T: Scalar> Node<T> for Sum<T> {
    fn output(&self) -> Vector<T> {
        self.out.clone()
    }

    fn vars(&self) -> VarSet {
        self.input.vars()
    }

    fn propagate(&self, upstream: Vector<T>, grad: &mut Grad<T>) {
        let u = upstream.as_slice()[0];
        self.input
            .propagate(Vector::from_vec(vec![u; self.input.len()]), grad);
    }
}

/// Sum of all components, as a length-1 result.
pub fn sum<T: Scalar>(r: &Res<T>) -> Res<T> {
    let out = Vector::from_vec(vec![r.output().sum()]);
    Res::new(Sum {
        input: r.clone(),
        out,
    })
}

#[derive(Debug)]
struct Square<T: Scalar> {
    input: Res<T>,
    in_out: Vector<T>,
    out: Vector<T>,
}

impl<T: Scalar> Node<T> for Square<T> {
    fn output(&self) -> Vector<T> {
        self.out.clone()
    }

    fn vars(&self) -> VarSet {
        self.input.vars()
    }

    fn propagate(&self, mut upstream: Vector<T>, grad: &mut Grad<T>) {
        upstream *= &self.in_out;
        upstream.scale(T::from_f64(2.0));
        self.input.propagate(upstream, grad);
    }
}

/// Componentwise `x * x`.
pub fn square<T: Scalar>(r: &Res<T>) -> Res<T> {
    let in_out = r.output();
    let mut out = in_out.clone();
    out *= &in_out;
    Res::new(Square {
        input: r.clone(),
        in_out,
        out,
    })
}
