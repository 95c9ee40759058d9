//! Results with several outputs and their pooling combinators.

use std::fmt::{self, Debug};
use std::rc::Rc;

use log::trace;

use super::grad::Grad;
use super::res::{Node, Res};
use super::var::Var;
use super::varset::VarSet;
use crate::backend::Vector;
use crate::error::DiffError;
use crate::scalar::Scalar;

/// A node producing several vectors at once.
pub trait MultiNode<T: Scalar>: Debug {
    fn outputs(&self) -> Vec<Vector<T>>;
    fn vars(&self) -> VarSet;
    /// Propagate one upstream vector per output.
    fn propagate(&self, upstream: Vec<Vector<T>>, grad: &mut Grad<T>);
}

/// Shared handle to a [`MultiNode`].
pub struct MultiRes<T: Scalar>(Rc<dyn MultiNode<T>>);

impl<T: Scalar> Clone for MultiRes<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: Scalar> MultiRes<T> {
    pub fn new(node: impl MultiNode<T> + 'static) -> Self {
        Self(Rc::new(node))
    }

    pub fn outputs(&self) -> Vec<Vector<T>> {
        self.0.outputs()
    }

    pub fn vars(&self) -> VarSet {
        self.0.vars()
    }

    pub fn propagate(&self, upstream: Vec<Vector<T>>, grad: &mut Grad<T>) {
        self.0.propagate(upstream, grad)
    }

    /// Number of outputs.
    pub fn len(&self) -> usize {
        self.0.outputs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Scalar> Debug for MultiRes<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Bundle independent results into one [`MultiRes`].
pub fn fuse<T: Scalar>(reses: &[Res<T>]) -> MultiRes<T> {
    let vars = reses.iter().fold(VarSet::new(), |acc, r| acc.merge(&r.vars()));
    MultiRes::new(FuseNode {
        reses: reses.to_vec(),
        vars,
    })
}

#[derive(Debug)]
struct FuseNode<T: Scalar> {
    reses: Vec<Res<T>>,
    vars: VarSet,
}

impl<T: Scalar> MultiNode<T> for FuseNode<T> {
    fn outputs(&self) -> Vec<Vector<T>> {
        self.reses.iter().map(Res::output).collect()
    }

    fn vars(&self) -> VarSet {
        self.vars.clone()
    }

    fn propagate(&self, upstream: Vec<Vector<T>>, grad: &mut Grad<T>) {
        for (r, u) in self.reses.iter().zip(upstream) {
            if grad.intersects(&r.vars()) {
                r.propagate(u, grad);
            }
        }
    }
}

fn pool_vars<T: Scalar>(m: &MultiRes<T>) -> (Vec<Var<T>>, Vec<Res<T>>) {
    let pools: Vec<Var<T>> = m.outputs().into_iter().map(Var::new).collect();
    let reses = pools.iter().map(Var::to_res).collect();
    (pools, reses)
}

fn without_pools<T: Scalar>(mut vars: VarSet, pools: &[Var<T>]) -> VarSet {
    for p in pools {
        vars.del(p.id());
    }
    vars
}

fn propagate_pooled<T: Scalar>(
    input: &MultiRes<T>,
    pools: &[Var<T>],
    grad: &mut Grad<T>,
    inner: impl FnOnce(&mut Grad<T>),
) {
    if !grad.intersects(&input.vars()) {
        inner(grad);
        return;
    }
    trace!("pool_multi: propagating through {} vars", pools.len());
    for p in pools {
        grad.insert_temporary(p);
    }
    inner(grad);
    let down = pools.iter().map(|p| grad.remove_temporary(p)).collect();
    input.propagate(down, grad);
}

/// Collapse a [`MultiRes`] into a single result built by `f` from its
/// pooled outputs.
pub fn unfuse<T, F>(m: &MultiRes<T>, f: F) -> Result<Res<T>, DiffError>
where
    T: Scalar,
    F: FnOnce(&[Res<T>]) -> Result<Res<T>, DiffError>,
{
    let (pools, reses) = pool_vars(m);
    let out = f(&reses)?;
    let vars = without_pools(out.vars(), &pools).merge(&m.vars());
    Ok(Res::new(UnfuseNode {
        input: m.clone(),
        pools,
        out,
        vars,
    }))
}

#[derive(Debug)]
struct UnfuseNode<T: Scalar> {
    input: MultiRes<T>,
    pools: Vec<Var<T>>,
    out: Res<T>,
    vars: VarSet,
}

impl<T: Scalar> Node<T> for UnfuseNode<T> {
    fn output(&self) -> Vector<T> {
        self.out.output()
    }

    fn vars(&self) -> VarSet {
        self.vars.clone()
    }

    fn propagate(&self, upstream: Vector<T>, grad: &mut Grad<T>) {
        propagate_pooled(&self.input, &self.pools, grad, |g| {
            self.out.propagate(upstream, g)
        });
    }
}

/// Like [`unfuse`], but `f` produces several outputs.
pub fn pool_multi<T, F>(m: &MultiRes<T>, f: F) -> Result<MultiRes<T>, DiffError>
where
    T: Scalar,
    F: FnOnce(&[Res<T>]) -> Result<MultiRes<T>, DiffError>,
{
    let (pools, reses) = pool_vars(m);
    let out = f(&reses)?;
    let vars = without_pools(out.vars(), &pools).merge(&m.vars());
    Ok(MultiRes::new(PoolMultiNode {
        input: m.clone(),
        pools,
        out,
        vars,
    }))
}

#[derive(Debug)]
struct PoolMultiNode<T: Scalar> {
    input: MultiRes<T>,
    pools: Vec<Var<T>>,
    out: MultiRes<T>,
    vars: VarSet,
}

impl<T: Scalar> MultiNode<T> for PoolMultiNode<T> {
    fn outputs(&self) -> Vec<Vector<T>> {
        self.out.outputs()
    }

    fn vars(&self) -> VarSet {
        self.vars.clone()
    }

    fn propagate(&self, upstream: Vec<Vector<T>>, grad: &mut Grad<T>) {
        propagate_pooled(&self.input, &self.pools, grad, |g| {
            self.out.propagate(upstream, g)
        });
    }
}

/// Concatenate the outputs of several [`MultiRes`] values.
///
/// Inputs are paired up recursively so each one is pooled once.
pub fn fuse_multi<T: Scalar>(ms: &[MultiRes<T>]) -> Result<MultiRes<T>, DiffError> {
    match ms {
        [] => Ok(fuse(&[])),
        [m] => Ok(m.clone()),
        _ => {
            let (left, right) = ms.split_at(ms.len() / 2);
            let m1 = fuse_multi(left)?;
            let m2 = fuse_multi(right)?;
            pool_multi(&m1, |r1| {
                pool_multi(&m2, |r2| {
                    let all: Vec<Res<T>> = r1.iter().chain(r2).cloned().collect();
                    Ok(fuse(&all))
                })
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops;

    #[test]
    fn test_fuse_outputs_in_order() {
        let a = Var::new(Vector::<f64>::from_f64s(&[1.0]));
        let b = Var::new(Vector::<f64>::from_f64s(&[2.0, 3.0]));
        let m = fuse(&[a.to_res(), b.to_res()]);
        let outs = m.outputs();
        assert_eq!(outs.len(), 2);
        assert_eq!(outs[1].as_slice(), &[2.0, 3.0]);
        assert_eq!(m.vars().len(), 2);
    }

    #[test]
    fn test_fuse_multi_concatenates() {
        let vs: Vec<Var<f64>> = (0..5)
            .map(|i| Var::new(Vector::from_f64s(&[i as f64])))
            .collect();
        let ms: Vec<MultiRes<f64>> = vs.iter().map(|v| fuse(&[v.to_res()])).collect();
        let joined = fuse_multi(&ms).unwrap();
        let outs: Vec<f64> = joined.outputs().iter().map(|o| o.as_slice()[0]).collect();
        assert_eq!(outs, vec![0.0, 1.0, 2.0, 3.0, 4.0]);

        let sum = unfuse(&joined, |rs| {
            rs.iter()
                .skip(1)
                .try_fold(rs[0].clone(), |acc, r| ops::add(&acc, r))
        })
        .unwrap();
        let mut g = Grad::new(&vs);
        sum.propagate(Vector::from_f64s(&[1.0]), &mut g);
        assert_eq!(g.pending_temporaries(), 0);
        for v in &vs {
            assert_eq!(g.get(v).unwrap().as_slice(), &[1.0]);
        }
    }
}
