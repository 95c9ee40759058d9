//! Building sequences from batches and per-sequence vector lists.

use log::debug;

use super::batch::{Batch, ResBatch, validate_batches};
use super::node::{Seq, SeqNode};
use crate::backend::{Creator, Vector};
use crate::error::DiffError;
use crate::graph::{Grad, VarSet};
use crate::scalar::Scalar;

#[derive(Debug)]
struct ResSeq<T: Scalar> {
    inputs: Vec<ResBatch<T>>,
    out: Vec<Batch<T>>,
    vars: VarSet,
}

impl<T: Scalar> SeqNode<T> for ResSeq<T> {
    fn output(&self) -> &[Batch<T>] {
        &self.out
    }

    fn vars(&self) -> VarSet {
        self.vars.clone()
    }

    fn propagate(&self, upstream: Vec<Batch<T>>, grad: &mut Grad<T>) {
        for (input, u) in self.inputs.iter().zip(upstream) {
            if grad.intersects(&input.packed.vars()) {
                input.packed.propagate(u.packed, grad);
            }
        }
    }
}

/// Sequence whose timesteps are differentiable results.
///
/// # Errors
///
/// Fails like [`validate_batches`] on the resulting batches.
pub fn res_seq<T: Scalar>(batches: Vec<ResBatch<T>>) -> Result<Seq<T>, DiffError> {
    let out: Vec<Batch<T>> = batches
        .iter()
        .map(|b| Batch {
            packed: b.packed.output(),
            present: b.present.clone(),
        })
        .collect();
    validate_batches(&out)?;
    Ok(res_seq_unchecked(batches, out))
}

pub(crate) fn res_seq_unchecked<T: Scalar>(inputs: Vec<ResBatch<T>>, out: Vec<Batch<T>>) -> Seq<T> {
    let vars = inputs
        .iter()
        .fold(VarSet::new(), |acc, b| acc.merge(&b.packed.vars()));
    Seq::new(ResSeq { inputs, out, vars })
}

#[derive(Debug)]
struct ConstSeq<T: Scalar> {
    out: Vec<Batch<T>>,
}

impl<T: Scalar> SeqNode<T> for ConstSeq<T> {
    fn output(&self) -> &[Batch<T>] {
        &self.out
    }

    fn vars(&self) -> VarSet {
        VarSet::new()
    }

    fn propagate(&self, _upstream: Vec<Batch<T>>, _grad: &mut Grad<T>) {}
}

/// Constant sequence over fixed batches.
///
/// # Errors
///
/// Fails like [`validate_batches`].
pub fn const_seq<T: Scalar>(batches: Vec<Batch<T>>) -> Result<Seq<T>, DiffError> {
    validate_batches(&batches)?;
    Ok(Seq::new(ConstSeq { out: batches }))
}

/// Constant sequence from one vector list per sequence.
///
/// Timestep `t` holds every sequence longer than `t`; packing stops at the
/// first timestep where no sequence remains.
///
/// # Errors
///
/// Returns `SeqShapeMismatch` if the vectors of one timestep differ in
/// length.
///
/// # Example
///
/// ```
/// use vecdiff::Vector;
/// use vecdiff::seq::const_seq_list;
///
/// let v = |x: f64| Vector::<f64>::from_f64s(&[x]);
/// let seq = const_seq_list(&[vec![v(1.0), v(2.0)], vec![], vec![v(3.0)]]).unwrap();
/// assert_eq!(seq.len(), 2);
/// assert_eq!(seq.output()[0].packed.as_slice(), &[1.0, 3.0]);
/// assert_eq!(seq.output()[1].present, vec![true, false, false]);
/// ```
pub fn const_seq_list<T: Scalar>(seqs: &[Vec<Vector<T>>]) -> Result<Seq<T>, DiffError> {
    let steps = seqs.iter().map(Vec::len).max().unwrap_or(0);
    for t in 0..steps {
        let mut lens = seqs.iter().filter_map(|s| s.get(t)).map(Vector::len);
        if let Some(first) = lens.next() {
            if lens.any(|l| l != first) {
                return Err(DiffError::SeqShapeMismatch { timestep: t });
            }
        }
    }
    let out = pack_seqs(seqs);
    debug!(
        "const_seq_list: packed {} sequences into {} timesteps",
        seqs.len(),
        out.len()
    );
    Ok(Seq::new(ConstSeq { out }))
}

/// Pack per-sequence lists into batches, stopping when nothing remains.
pub(crate) fn pack_seqs<T: Scalar>(seqs: &[Vec<Vector<T>>]) -> Vec<Batch<T>> {
    let creator = Creator::new();
    let mut out = Vec::new();
    for t in 0.. {
        let present: Vec<bool> = seqs.iter().map(|s| s.len() > t).collect();
        if !present.iter().any(|&p| p) {
            break;
        }
        let parts: Vec<Vector<T>> = seqs.iter().filter_map(|s| s.get(t).cloned()).collect();
        out.push(Batch {
            packed: creator.concat(&parts),
            present,
        });
    }
    out
}

/// Split batches back into one vector list per sequence slot.
pub fn separate_seqs<T: Scalar>(batches: &[Batch<T>]) -> Vec<Vec<Vector<T>>> {
    let slots = batches.first().map_or(0, |b| b.present.len());
    let mut seqs = vec![Vec::new(); slots];
    for b in batches {
        let size = b.chunk_size();
        let data = b.packed.as_slice();
        let mut offset = 0;
        for (seq, &p) in seqs.iter_mut().zip(&b.present) {
            if p {
                seq.push(Vector::from_vec(data[offset..offset + size].to_vec()));
                offset += size;
            }
        }
    }
    seqs
}
