//! Last timestep of every sequence.

use super::batch::Batch;
use super::node::Seq;
use crate::backend::{Creator, Vector};
use crate::error::DiffError;
use crate::graph::{Grad, Node, Res, VarSet};
use crate::scalar::Scalar;

/// Where sequence `seq_idx` ends: its last timestep and the chunk range
/// inside that timestep's packed vector.
fn tail_range<T: Scalar>(batches: &[Batch<T>], seq_idx: usize) -> (usize, usize, usize) {
    let t = (1..batches.len())
        .find(|&i| !batches[i].present[seq_idx])
        .map_or(batches.len() - 1, |i| i - 1);
    let b = &batches[t];
    let cols = b.chunk_size();
    let start = b.present[..seq_idx].iter().filter(|&&p| p).count() * cols;
    (t, start, start + cols)
}

#[derive(Debug)]
struct Tail<T: Scalar> {
    input: Seq<T>,
    out: Vector<T>,
}

impl<T: Scalar> Node<T> for Tail<T> {
    fn output(&self) -> Vector<T> {
        self.out.clone()
    }

    fn vars(&self) -> VarSet {
        self.input.vars()
    }

    fn propagate(&self, upstream: Vector<T>, grad: &mut Grad<T>) {
        let in_out = self.input.output();
        let mut down: Vec<Batch<T>> = in_out
            .iter()
            .map(|x| Batch {
                packed: Vector::zeros(x.packed.len()),
                present: x.present.clone(),
            })
            .collect();
        let u = upstream.as_slice();
        let mut offset = 0;
        for (i, &p) in in_out[0].present.iter().enumerate() {
            if !p {
                continue;
            }
            let (t, start, end) = tail_range(in_out, i);
            let len = end - start;
            down[t].packed.as_mut_slice()[start..end].copy_from_slice(&u[offset..offset + len]);
            offset += len;
        }
        self.input.propagate(down, grad);
    }
}

/// Concatenate the last vector of every non-empty sequence, in slot order.
///
/// # Errors
///
/// Returns `EmptySequence` if `seq` has no timesteps.
pub fn tail<T: Scalar>(seq: &Seq<T>) -> Result<Res<T>, DiffError> {
    let batches = seq.output();
    let Some(first) = batches.first() else {
        return Err(DiffError::EmptySequence { op: "tail" });
    };
    let parts: Vec<Vector<T>> = (0..first.present.len())
        .filter(|&i| first.present[i])
        .map(|i| {
            let (t, start, end) = tail_range(batches, i);
            Vector::from_vec(batches[t].packed.as_slice()[start..end].to_vec())
        })
        .collect();
    if parts.is_empty() {
        return Err(DiffError::EmptySequence { op: "tail" });
    }
    Ok(Res::new(Tail {
        input: seq.clone(),
        out: Creator::new().concat(&parts),
    }))
}
