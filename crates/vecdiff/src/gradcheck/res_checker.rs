use log::debug;

use super::{Checker, GradCheckError, central_difference, check, check_vars, one_hot};
use crate::backend::Vector;
use crate::error::DiffError;
use crate::graph::{Grad, Node, Res, Var, VarSet};
use crate::scalar::Scalar;

/// [`Checker`] for a function returning a [`Res`].
///
/// The function is called again for every evaluation, so it must rebuild
/// its graph from the current variable values.
pub struct ResChecker<T: Scalar, F> {
    f: F,
    vars: Vec<Var<T>>,
    /// Finite difference step. Defaults to the precision.
    pub delta: Option<f64>,
    /// Error tolerance. Defaults to [`DType::default_prec`](crate::DType::default_prec).
    pub prec: Option<f64>,
}

impl<T, F> ResChecker<T, F>
where
    T: Scalar,
    F: Fn() -> Result<Res<T>, DiffError>,
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

    /// Run the standard check, the variable-set check and the check on
    /// an accumulating wrapper.
    pub fn full_check(&self) -> Result<(), GradCheckError> {
        debug!("gradcheck: standard");
        check(self, self.prec())?;

        debug!("gradcheck: vars");
        let out = (self.f)()?;
        check_vars(self, &out.vars())?;

        debug!("gradcheck: accumulated");
        let accumulated = ResChecker {
            f: || -> Result<Res<T>, DiffError> { Ok(accumulate(&(self.f)()?)) },
            vars: self.vars.clone(),
            delta: self.delta,
            prec: self.prec,
        };
        check(&accumulated, accumulated.prec())
    }
}

impl<T, F> Checker<T> for ResChecker<T, F>
where
    T: Scalar,
    F: Fn() -> Result<Res<T>, DiffError>,
{
    fn vars(&self) -> &[Var<T>] {
        &self.vars
    }

    fn approx(&self, var: &Var<T>, idx: usize) -> Result<Vector<T>, GradCheckError> {
        central_difference(var, idx, self.delta(), || Ok((self.f)()?.output()))
    }

    fn exact(&self, comp: usize, grad: &mut Grad<T>) -> Result<(), GradCheckError> {
        let out = (self.f)()?;
        let upstream = one_hot(out.len(), comp);
        out.propagate(upstream, grad);
        Ok(())
    }
}

/// Output scaled by 4. Propagation doubles the upstream and sends it
/// through the input twice, the first time as a copy.
#[derive(Debug)]
struct Accumulator<T: Scalar> {
    input: Res<T>,
    out: Vector<T>,
}

fn accumulate<T: Scalar>(input: &Res<T>) -> Res<T> {
    let mut out = input.output().copy();
    out.scale(T::from_f64(4.0));
    Res::new(Accumulator {
        input: input.clone(),
        out,
    })
}

impl<T: Scalar> Node<T> for Accumulator<T> {
    fn output(&self) -> Vector<T> {
        self.out.clone()
    }

    fn vars(&self) -> VarSet {
        self.input.vars()
    }

    fn propagate(&self, mut upstream: Vector<T>, grad: &mut Grad<T>) {
        upstream.scale(T::from_f64(2.0));
        self.input.propagate(upstream.copy(), grad);
        self.input.propagate(upstream, grad);
    }
}
