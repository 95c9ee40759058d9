use log::debug;

use super::{Checker, GradCheckError, central_difference, check, check_vars, one_hot};
use crate::backend::{Creator, Vector};
use crate::error::DiffError;
use crate::graph::{Grad, Var, VarSet};
use crate::scalar::Scalar;
use crate::seq::{Batch, Seq, SeqNode};

/// [`Checker`] for a function returning a [`Seq`].
///
/// Output components are numbered across the packed timesteps in order.
pub struct SeqChecker<T: Scalar, F> {
    f: F,
    vars: Vec<Var<T>>,
    pub delta: Option<f64>,
    pub prec: Option<f64>,
}

impl<T, F> SeqChecker<T, F>
where
    T: Scalar,
    F: Fn() -> Result<Seq<T>, DiffError>,
{
    pub fn new(f: F, vars: Vec<Var<T>>) -> Self {
        Self {
            f,
            vars,
            delta: None,
            prec: None,
        }
    }

    pub fn with_prec(mut self, prec: f64) -> Self {
        self.prec = Some(prec);
        self
    }

    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = Some(delta);
        self
    }

    pub fn prec(&self) -> f64 {
        self.prec.unwrap_or(T::DTYPE.default_prec())
    }

    pub fn delta(&self) -> f64 {
        self.delta.unwrap_or_else(|| self.prec())
    }

    /// Same three checks as [`ResChecker::full_check`](super::ResChecker::full_check).
    pub fn full_check(&self) -> Result<(), GradCheckError> {
        debug!("seq gradcheck: standard");
        check(self, self.prec())?;

        debug!("seq gradcheck: vars");
        let out = (self.f)()?;
        check_vars(self, &out.vars())?;

        debug!("seq gradcheck: accumulated");
        let accumulated = SeqChecker {
            f: || -> Result<Seq<T>, DiffError> { Ok(accumulate(&(self.f)()?)) },
            vars: self.vars.clone(),
            delta: self.delta,
            prec: self.prec,
        };
        check(&accumulated, accumulated.prec())
    }
}

impl<T, F> Checker<T> for SeqChecker<T, F>
where
    T: Scalar,
    F: Fn() -> Result<Seq<T>, DiffError>,
{
    fn vars(&self) -> &[Var<T>] {
        &self.vars
    }

    fn approx(&self, var: &Var<T>, idx: usize) -> Result<Vector<T>, GradCheckError> {
        central_difference(var, idx, self.delta(), || {
            let out = (self.f)()?;
            Ok(pack_output(out.output()))
        })
    }

    fn exact(&self, comp: usize, grad: &mut Grad<T>) -> Result<(), GradCheckError> {
        let out = (self.f)()?;
        if !grad.intersects(&out.vars()) {
            return Ok(());
        }
        out.propagate(one_hot_batches(out.output(), comp), grad);
        Ok(())
    }
}

fn pack_output<T: Scalar>(batches: &[Batch<T>]) -> Vector<T> {
    let parts: Vec<Vector<T>> = batches.iter().map(|b| b.packed.clone()).collect();
    Creator::new().concat(&parts)
}

/// Upstream batches with a single one at packed component `idx`.
fn one_hot_batches<T: Scalar>(batches: &[Batch<T>], idx: usize) -> Vec<Batch<T>> {
    let mut offset = 0;
    batches
        .iter()
        .map(|b| {
            let len = b.packed.len();
            let packed = if (offset..offset + len).contains(&idx) {
                one_hot(len, idx - offset)
            } else {
                Vector::zeros(len)
            };
            offset += len;
            Batch {
                packed,
                present: b.present.clone(),
            }
        })
        .collect()
}

#[derive(Debug)]
struct Accumulator<T: Scalar> {
    input: Seq<T>,
    out: Vec<Batch<T>>,
}

fn accumulate<T: Scalar>(input: &Seq<T>) -> Seq<T> {
    let mut out: Vec<Batch<T>> = input.output().to_vec();
    scale_batches(&mut out, T::from_f64(4.0));
    Seq::new(Accumulator {
        input: input.clone(),
        out,
    })
}

fn scale_batches<T: Scalar>(batches: &mut [Batch<T>], s: T) {
    for b in batches {
        b.packed.scale(s);
    }
}

impl<T: Scalar> SeqNode<T> for Accumulator<T> {
    fn creator(&self) -> Creator<T> {
        self.input.creator()
    }

    fn output(&self) -> &[Batch<T>] {
        &self.out
    }

    fn vars(&self) -> VarSet {
        self.input.vars()
    }

    fn propagate(&self, mut upstream: Vec<Batch<T>>, grad: &mut Grad<T>) {
        scale_batches(&mut upstream, T::from_f64(2.0));
        let copy = upstream
            .iter()
            .map(|b| Batch {
                packed: b.packed.copy(),
                present: b.present.clone(),
            })
            .collect();
        self.input.propagate(copy, grad);
        self.input.propagate(upstream, grad);
    }
}
