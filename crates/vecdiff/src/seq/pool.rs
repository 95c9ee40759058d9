//! Pooling for sequences.
//!
//! Each timestep of the pooled sequence is replaced by an internal
//! variable, the callback builds on those, and propagation routes one
//! accumulated gradient per timestep back to the real input.

use log::trace;

use super::batch::{Batch, ResBatch};
use super::creation::res_seq_unchecked;
use super::node::{Seq, SeqNode};
use crate::backend::Vector;
use crate::error::DiffError;
use crate::graph::{Grad, Node, Res, Var, VarSet};
use crate::scalar::Scalar;

struct Pooled<T: Scalar> {
    vars: Vec<Var<T>>,
    seq: Seq<T>,
}

fn pool_timesteps<T: Scalar>(s: &Seq<T>) -> Pooled<T> {
    let vars: Vec<Var<T>> = s
        .output()
        .iter()
        .map(|b| Var::new(b.packed.clone()))
        .collect();
    let inputs = vars
        .iter()
        .zip(s.output())
        .map(|(v, b)| ResBatch {
            packed: v.to_res(),
            present: b.present.clone(),
        })
        .collect();
    let seq = res_seq_unchecked(inputs, s.output().to_vec());
    Pooled { vars, seq }
}

fn without<T: Scalar>(mut vars: VarSet, pools: &[Var<T>]) -> VarSet {
    for p in pools {
        vars.del(p.id());
    }
    vars
}

/// Run `inner` with temporary slots for `pools`, then hand what they
/// collected to `input`.
fn propagate_through<T: Scalar>(
    input: &Seq<T>,
    pools: &[Var<T>],
    grad: &mut Grad<T>,
    inner: impl FnOnce(&mut Grad<T>),
) {
    if !grad.intersects(&input.vars()) {
        inner(grad);
        return;
    }
    trace!("seq pool: propagating through {} timesteps", pools.len());
    for p in pools {
        grad.insert_temporary(p);
    }
    inner(grad);
    let down = pools
        .iter()
        .zip(input.output())
        .map(|(p, x)| Batch {
            packed: grad.remove_temporary(p),
            present: x.present.clone(),
        })
        .collect();
    input.propagate(down, grad);
}

#[derive(Debug)]
struct PoolSeq<T: Scalar> {
    input: Seq<T>,
    pools: Vec<Var<T>>,
    out: Seq<T>,
    vars: VarSet,
}

impl<T: Scalar> SeqNode<T> for PoolSeq<T> {
    fn output(&self) -> &[Batch<T>] {
        self.out.output()
    }

    fn vars(&self) -> VarSet {
        self.vars.clone()
    }

    fn propagate(&self, upstream: Vec<Batch<T>>, grad: &mut Grad<T>) {
        propagate_through(&self.input, &self.pools, grad, |g| {
            self.out.propagate(upstream, g)
        });
    }
}

/// Let `f` use `s` any number of times while `s` is propagated through
/// once.
pub fn pool<T, F>(s: &Seq<T>, f: F) -> Result<Seq<T>, DiffError>
where
    T: Scalar,
    F: FnOnce(&Seq<T>) -> Result<Seq<T>, DiffError>,
{
    let pooled = pool_timesteps(s);
    let out = f(&pooled.seq)?;
    let vars = without(out.vars(), &pooled.vars).merge(&s.vars());
    Ok(Seq::new(PoolSeq {
        input: s.clone(),
        pools: pooled.vars,
        out,
        vars,
    }))
}

#[derive(Debug)]
struct PoolToVec<T: Scalar> {
    input: Seq<T>,
    pools: Vec<Var<T>>,
    out: Res<T>,
    vars: VarSet,
}

impl<T: Scalar> Node<T> for PoolToVec<T> {
    fn output(&self) -> Vector<T> {
        self.out.output()
    }

    fn vars(&self) -> VarSet {
        self.vars.clone()
    }

    fn propagate(&self, upstream: Vector<T>, grad: &mut Grad<T>) {
        propagate_through(&self.input, &self.pools, grad, |g| {
            self.out.propagate(upstream, g)
        });
    }
}

/// Like [`pool`], but `f` reduces the sequence to a single result.
pub fn pool_to_vec<T, F>(s: &Seq<T>, f: F) -> Result<Res<T>, DiffError>
where
    T: Scalar,
    F: FnOnce(&Seq<T>) -> Result<Res<T>, DiffError>,
{
    let pooled = pool_timesteps(s);
    let out = f(&pooled.seq)?;
    let vars = without(out.vars(), &pooled.vars).merge(&s.vars());
    Ok(Res::new(PoolToVec {
        input: s.clone(),
        pools: pooled.vars,
        out,
        vars,
    }))
}

#[derive(Debug)]
struct PoolFromVec<T: Scalar> {
    input: Res<T>,
    pool: Var<T>,
    out: Seq<T>,
    vars: VarSet,
}

impl<T: Scalar> SeqNode<T> for PoolFromVec<T> {
    fn output(&self) -> &[Batch<T>] {
        self.out.output()
    }

    fn vars(&self) -> VarSet {
        self.vars.clone()
    }

    fn propagate(&self, upstream: Vec<Batch<T>>, grad: &mut Grad<T>) {
        if !grad.intersects(&self.input.vars()) {
            self.out.propagate(upstream, grad);
            return;
        }
        grad.insert_temporary(&self.pool);
        self.out.propagate(upstream, grad);
        let down = grad.remove_temporary(&self.pool);
        self.input.propagate(down, grad);
    }
}

/// Let `f` build a sequence that uses `r` any number of times while `r`
/// is propagated through once.
pub fn pool_from_vec<T, F>(r: &Res<T>, f: F) -> Result<Seq<T>, DiffError>
where
    T: Scalar,
    F: FnOnce(&Res<T>) -> Result<Seq<T>, DiffError>,
{
    let pool = Var::new(r.output());
    let out = f(&pool.to_res())?;
    let mut vars = out.vars();
    vars.del(pool.id());
    let vars = vars.merge(&r.vars());
    Ok(Seq::new(PoolFromVec {
        input: r.clone(),
        pool,
        out,
        vars,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops;
    use crate::seq::{self, const_seq_list};

    fn v(data: &[f64]) -> Vector<f64> {
        Vector::from_f64s(data)
    }

    #[test]
    fn test_pool_removes_temporaries() {
        let a = Var::new(v(&[0.5, -0.5]));
        let input = seq::map(&const_seq_list(&[vec![v(&[1.0, 2.0])]]).unwrap(), |r, _| {
            ops::mul(r, &a.to_res())
        })
        .unwrap();
        let out = pool_to_vec(&input, |s| {
            let twice = seq::map(s, |r, _| ops::add(r, r))?;
            seq::sum(&twice)
        })
        .unwrap();
        assert_eq!(out.output().as_slice(), &[1.0, -2.0]);

        let mut g = Grad::new(&[a.clone()]);
        out.propagate(v(&[1.0, 1.0]), &mut g);
        assert_eq!(g.pending_temporaries(), 0);
        assert_eq!(g.len(), 1);
        assert_eq!(g.get(&a).unwrap().as_slice(), &[2.0, 4.0]);
    }

    #[test]
    fn test_pool_from_vec_routes_once() {
        let a = Var::new(v(&[0.5]));
        let r = ops::tanh(&a.to_res());
        let out = pool_from_vec(&r, |p| {
            let s = const_seq_list(&[vec![v(&[1.0]), v(&[2.0])]])?;
            seq::map(&s, |x, _| ops::mul(x, p))
        })
        .unwrap();
        assert!(out.vars().has(a.id()));
        assert_eq!(out.vars().len(), 1);

        let mut g = Grad::new(&[a.clone()]);
        out.propagate(out.output().to_vec(), &mut g);
        assert_eq!(g.pending_temporaries(), 0);
        let t = 0.5f64.tanh();
        let want = (1.0 * t + 2.0 * 2.0 * t) * (1.0 - t * t);
        assert!((g.get(&a).unwrap().as_slice()[0] - want).abs() < 1e-12);
    }
}
