//! Slicing and concatenation.

use crate::backend::{Creator, Vector};
use crate::error::DiffError;
use crate::graph::{Grad, Node, Res, VarSet};
use crate::scalar::Scalar;

#[derive(Debug)]
struct Slice<T: Scalar> {
    input: Res<T>,
    start: usize,
    end: usize,
    out: Vector<T>,
}

impl<T: Scalar> Node<T> for Slice<T> {
    fn output(&self) -> Vector<T> {
        self.out.clone()
    }

    fn vars(&self) -> VarSet {
        self.input.vars()
    }

    fn propagate(&self, upstream: Vector<T>, grad: &mut Grad<T>) {
        if !grad.intersects(&self.input.vars()) {
            return;
        }
        if let Some(var) = self.input.as_var() {
            if let Some(slot) = grad.get_mut(&var) {
                let dst = &mut slot.as_mut_slice()[self.start..self.end];
                for (g, &u) in dst.iter_mut().zip(upstream.as_slice()) {
                    *g = *g + u;
                }
            }
            return;
        }
        let mut down = Vector::zeros(self.input.len());
        down.as_mut_slice()[self.start..self.end].copy_from_slice(upstream.as_slice());
        self.input.propagate(down, grad);
    }
}

/// Components `start..end` of `r`.
///
/// The output aliases `r`'s storage.
///
/// # Errors
///
/// Returns `SliceOutOfRange` if `start > end` or `end > r.len()`.
pub fn slice<T: Scalar>(r: &Res<T>, start: usize, end: usize) -> Result<Res<T>, DiffError> {
    let out = r.output().slice(start, end)?;
    Ok(Res::new(Slice {
        input: r.clone(),
        start,
        end,
        out,
    }))
}

#[derive(Debug)]
struct Concat<T: Scalar> {
    inputs: Vec<Res<T>>,
    lens: Vec<usize>,
    out: Vector<T>,
    vars: VarSet,
}

impl<T: Scalar> Node<T> for Concat<T> {
    fn output(&self) -> Vector<T> {
        self.out.clone()
    }

    fn vars(&self) -> VarSet {
        self.vars.clone()
    }

    fn propagate(&self, upstream: Vector<T>, grad: &mut Grad<T>) {
        let u = upstream.as_slice();
        let mut start = 0;
        for (input, &len) in self.inputs.iter().zip(&self.lens) {
            if grad.intersects(&input.vars()) {
                input.propagate(Vector::from_vec(u[start..start + len].to_vec()), grad);
            }
            start += len;
        }
    }
}

/// Concatenate the outputs of `reses` in order.
pub fn concat<T: Scalar>(reses: &[Res<T>]) -> Res<T> {
    let outs: Vec<Vector<T>> = reses.iter().map(Res::output).collect();
    let lens = outs.iter().map(Vector::len).collect();
    let vars = reses.iter().fold(VarSet::new(), |acc, r| acc.merge(&r.vars()));
    Res::new(Concat {
        inputs: reses.to_vec(),
        lens,
        out: Creator::new().concat(&outs),
        vars,
    })
}
