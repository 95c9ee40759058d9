//! Applying a per-timestep function to one or more sequences.

use log::trace;

use super::batch::Batch;
use super::node::{Seq, SeqNode};
use crate::error::DiffError;
use crate::graph::{Grad, Res, Var, VarSet};
use crate::scalar::Scalar;

/// Result of [`map_n`]: one pooled variable per input per timestep.
#[derive(Debug)]
struct MapN<T: Scalar> {
    inputs: Vec<Seq<T>>,
    /// `pools[j][t]` stands in for timestep `t` of input `j`.
    pools: Vec<Vec<Var<T>>>,
    results: Vec<Res<T>>,
    out: Vec<Batch<T>>,
    vars: VarSet,
}

impl<T: Scalar> SeqNode<T> for MapN<T> {
    fn output(&self) -> &[Batch<T>] {
        &self.out
    }

    fn vars(&self) -> VarSet {
        self.vars.clone()
    }

    fn propagate(&self, upstream: Vec<Batch<T>>, grad: &mut Grad<T>) {
        let active: Vec<bool> = self
            .inputs
            .iter()
            .map(|s| grad.intersects(&s.vars()))
            .collect();
        for (pools, _) in self.pools.iter().zip(&active).filter(|(_, a)| **a) {
            pools.iter().for_each(|p| grad.insert_temporary(p));
        }
        for (r, u) in self.results.iter().zip(upstream) {
            if grad.intersects(&r.vars()) {
                r.propagate(u.packed, grad);
            }
        }
        for ((input, pools), _) in self
            .inputs
            .iter()
            .zip(&self.pools)
            .zip(&active)
            .filter(|(_, a)| **a)
        {
            trace!("map: propagating {} timesteps into input", pools.len());
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
    }
}

/// Apply `f` to every timestep of `seq`.
///
/// `f` gets the packed timestep and the number of present sequences; its
/// output is read as a packed batch with the same presence mask.
///
/// # Errors
///
/// Returns `NotDivisible` if an output length is not a multiple of the
/// present count, or any error raised by `f`.
pub fn map<T, F>(seq: &Seq<T>, mut f: F) -> Result<Seq<T>, DiffError>
where
    T: Scalar,
    F: FnMut(&Res<T>, usize) -> Result<Res<T>, DiffError>,
{
    map_n(std::slice::from_ref(seq), |rs, n| f(&rs[0], n))
}

/// Apply `f` to matching timesteps of several sequences.
///
/// # Errors
///
/// Returns `SeqShapeMismatch` unless every input has the same timestep
/// count and presence masks, plus the errors of [`map`].
pub fn map_n<T, F>(seqs: &[Seq<T>], mut f: F) -> Result<Seq<T>, DiffError>
where
    T: Scalar,
    F: FnMut(&[Res<T>], usize) -> Result<Res<T>, DiffError>,
{
    let Some(first) = seqs.first() else {
        return Ok(super::creation::res_seq_unchecked(Vec::new(), Vec::new()));
    };
    for s in &seqs[1..] {
        if s.len() != first.len() {
            return Err(DiffError::SeqShapeMismatch {
                timestep: s.len().min(first.len()),
            });
        }
        if let Some(t) = (0..first.len()).find(|&t| s.output()[t].present != first.output()[t].present) {
            return Err(DiffError::SeqShapeMismatch { timestep: t });
        }
    }

    let pools: Vec<Vec<Var<T>>> = seqs
        .iter()
        .map(|s| s.output().iter().map(|b| Var::new(b.packed.clone())).collect())
        .collect();
    let mut results = Vec::with_capacity(first.len());
    let mut out = Vec::with_capacity(first.len());
    let mut vars = seqs.iter().fold(VarSet::new(), |acc, s| acc.merge(&s.vars()));
    for (t, b) in first.output().iter().enumerate() {
        let n = b.num_present();
        let args: Vec<Res<T>> = pools.iter().map(|p| p[t].to_res()).collect();
        let r = f(&args, n)?;
        let packed = r.output();
        if n == 0 || packed.len() % n != 0 {
            return Err(DiffError::NotDivisible {
                len: packed.len(),
                divisor: n,
            });
        }
        vars = vars.merge(&r.vars());
        out.push(Batch {
            packed,
            present: b.present.clone(),
        });
        results.push(r);
    }
    for p in pools.iter().flatten() {
        vars.del(p.id());
    }
    Ok(Seq::new(MapN {
        inputs: seqs.to_vec(),
        pools,
        results,
        out,
        vars,
    }))
}
