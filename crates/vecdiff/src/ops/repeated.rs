//! Broadcasting a short vector across a long one.

use super::check_divides;
use crate::backend::{Vector, chunks};
use crate::error::DiffError;
use crate::graph::{Grad, Node, Res, VarSet};
use crate::scalar::Scalar;

#[derive(Debug)]
struct AddRepeated<T: Scalar> {
    input: Res<T>,
    bias: Res<T>,
    out: Vector<T>,
    vars: VarSet,
}

impl<T: Scalar> Node<T> for AddRepeated<T> {
    fn output(&self) -> Vector<T> {
        self.out.clone()
    }

    fn vars(&self) -> VarSet {
        self.vars.clone()
    }

    fn propagate(&self, upstream: Vector<T>, grad: &mut Grad<T>) {
        if grad.intersects(&self.bias.vars()) {
            let down = chunks::sum_rows(&upstream, self.bias.len());
            self.bias.propagate(down, grad);
        }
        if grad.intersects(&self.input.vars()) {
            self.input.propagate(upstream, grad);
        }
    }
}

/// Add `bias` to every `bias.len()`-sized chunk of `r`.
///
/// # Errors
///
/// Returns `NotDivisible` if `bias.len()` does not divide `r.len()`.
pub fn add_repeated<T: Scalar>(r: &Res<T>, bias: &Res<T>) -> Result<Res<T>, DiffError> {
    let mut out = r.output();
    let b = bias.output();
    check_divides(out.len(), b.len())?;
    chunks::add_repeated(&mut out, &b);
    Ok(Res::new(AddRepeated {
        input: r.clone(),
        bias: bias.clone(),
        out,
        vars: r.vars().merge(&bias.vars()),
    }))
}

#[derive(Debug)]
struct ScaleRepeated<T: Scalar> {
    input: Res<T>,
    scalers: Res<T>,
    in_out: Vector<T>,
    scalers_out: Vector<T>,
    out: Vector<T>,
    vars: VarSet,
}

impl<T: Scalar> Node<T> for ScaleRepeated<T> {
    fn output(&self) -> Vector<T> {
        self.out.clone()
    }

    fn vars(&self) -> VarSet {
        self.vars.clone()
    }

    fn propagate(&self, mut upstream: Vector<T>, grad: &mut Grad<T>) {
        if grad.intersects(&self.scalers.vars()) {
            let mut prod = upstream.clone();
            prod *= &self.in_out;
            let down = chunks::sum_rows(&prod, self.scalers_out.len());
            self.scalers.propagate(down, grad);
        }
        if grad.intersects(&self.input.vars()) {
            chunks::scale_repeated(&mut upstream, &self.scalers_out);
            self.input.propagate(upstream, grad);
        }
    }
}

/// Multiply every `scalers.len()`-sized chunk of `r` componentwise by
/// `scalers`.
///
/// # Errors
///
/// Returns `NotDivisible` if `scalers.len()` does not divide `r.len()`.
pub fn scale_repeated<T: Scalar>(r: &Res<T>, scalers: &Res<T>) -> Result<Res<T>, DiffError> {
    let in_out = r.output();
    let scalers_out = scalers.output();
    check_divides(in_out.len(), scalers_out.len())?;
    let mut out = in_out.clone();
    chunks::scale_repeated(&mut out, &scalers_out);
    Ok(Res::new(ScaleRepeated {
        input: r.clone(),
        scalers: scalers.clone(),
        in_out,
        scalers_out,
        out,
        vars: r.vars().merge(&scalers.vars()),
    }))
}

/// `scale_repeated(r, scalers)` followed by `add_repeated(.., biases)`.
pub fn scale_add_repeated<T: Scalar>(
    r: &Res<T>,
    scalers: &Res<T>,
    biases: &Res<T>,
) -> Result<Res<T>, DiffError> {
    add_repeated(&scale_repeated(r, scalers)?, biases)
}
