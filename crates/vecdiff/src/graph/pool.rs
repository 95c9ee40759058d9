//! Pooling: consume a result many times, propagate through it once.

use log::trace;

use super::grad::Grad;
use super::res::{Node, Res};
use super::var::Var;
use super::varset::VarSet;
use crate::backend::Vector;
use crate::error::DiffError;
use crate::scalar::Scalar;

/// Let `f` use `r` any number of times while `r`'s ancestors are
/// propagated through exactly once.
///
/// `f` receives a fresh internal variable holding `r`'s output. During
/// propagation that variable gets a temporary gradient slot; once `f`'s
/// graph has accumulated into it, the total is handed to `r`.
///
/// Leaves are passed to `f` directly, and if `f`'s result does not use
/// its argument the result is returned as is.
///
/// # Example
///
/// ```
/// use vecdiff::{Grad, Var, Vector, ops, pool};
///
/// let x = Var::new(Vector::<f64>::from_f64s(&[0.5]));
/// let out = pool(&ops::tanh(&x.to_res()), |r| ops::mul(r, r)).unwrap();
///
/// let mut g = Grad::new(&[x.clone()]);
/// out.propagate(Vector::from_f64s(&[1.0]), &mut g);
/// assert_eq!(g.pending_temporaries(), 0);
/// ```
pub fn pool<T, F>(r: &Res<T>, f: F) -> Result<Res<T>, DiffError>
where
    T: Scalar,
    F: FnOnce(&Res<T>) -> Result<Res<T>, DiffError>,
{
    if r.is_leaf() {
        return f(r);
    }
    let pool_var = Var::new(r.output());
    let out = f(&pool_var.to_res())?;
    let mut vars = out.vars();
    if !vars.has(pool_var.id()) {
        return Ok(out);
    }
    vars.del(pool_var.id());
    let vars = vars.merge(&r.vars());
    Ok(Res::new(PoolNode {
        pool_var,
        input: r.clone(),
        out,
        vars,
    }))
}

#[derive(Debug)]
struct PoolNode<T: Scalar> {
    pool_var: Var<T>,
    input: Res<T>,
    out: Res<T>,
    vars: VarSet,
}

impl<T: Scalar> Node<T> for PoolNode<T> {
    fn output(&self) -> Vector<T> {
        self.out.output()
    }

    fn vars(&self) -> VarSet {
        self.vars.clone()
    }

    fn propagate(&self, upstream: Vector<T>, grad: &mut Grad<T>) {
        if !grad.intersects(&self.input.vars()) {
            self.out.propagate(upstream, grad);
            return;
        }
        trace!("pool: propagating through var {}", self.pool_var.id().index());
        grad.insert_temporary(&self.pool_var);
        self.out.propagate(upstream, grad);
        let down = grad.remove_temporary(&self.pool_var);
        self.input.propagate(down, grad);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Const;
    use crate::ops;
    use approx::assert_relative_eq;

    #[test]
    fn test_pool_leaf_short_circuits() {
        let x = Var::new(Vector::<f64>::from_f64s(&[1.0, 2.0]));
        let r = x.to_res();
        let out = pool(&r, |p| {
            assert!(p.as_var().is_some());
            Ok(p.clone())
        })
        .unwrap();
        assert!(out.as_var().is_some());
    }

    #[test]
    fn test_pool_unused_argument_returns_result() {
        let x = Var::new(Vector::<f64>::from_f64s(&[1.0]));
        let r = ops::tanh(&x.to_res());
        let c = Const::new(Vector::from_f64s(&[3.0])).to_res();
        let out = pool(&r, |_| Ok(c.clone())).unwrap();
        assert!(out.is_leaf());
        assert!(out.vars().is_empty());
    }

    #[test]
    fn test_pool_square_of_tanh() {
        let x = Var::new(Vector::<f64>::from_f64s(&[0.3, -0.7]));
        let out = pool(&ops::tanh(&x.to_res()), |r| ops::mul(r, r)).unwrap();
        assert!(out.vars().has(x.id()));
        assert_eq!(out.vars().len(), 1);

        let mut g = Grad::new(&[x.clone()]);
        out.propagate(Vector::from_f64s(&[1.0, 1.0]), &mut g);
        assert_eq!(g.pending_temporaries(), 0);
        assert_eq!(g.len(), 1);
        for (got, x) in g.get(&x).unwrap().as_slice().iter().zip([0.3f64, -0.7]) {
            let t = x.tanh();
            assert_relative_eq!(*got, 2.0 * t * (1.0 - t * t), epsilon = 1e-12);
        }
    }
}
