//! Per-sequence reversal.

use super::batch::Batch;
use super::creation::{pack_seqs, separate_seqs};
use super::node::{Seq, SeqNode};
use crate::graph::{Grad, VarSet};
use crate::scalar::Scalar;

#[derive(Debug)]
struct Reverse<T: Scalar> {
    input: Seq<T>,
    out: Vec<Batch<T>>,
}

impl<T: Scalar> SeqNode<T> for Reverse<T> {
    fn output(&self) -> &[Batch<T>] {
        &self.out
    }

    fn vars(&self) -> VarSet {
        self.input.vars()
    }

    fn propagate(&self, upstream: Vec<Batch<T>>, grad: &mut Grad<T>) {
        self.input.propagate(reverse_batches(&upstream), grad);
    }
}

fn reverse_batches<T: Scalar>(batches: &[Batch<T>]) -> Vec<Batch<T>> {
    if batches.is_empty() {
        return Vec::new();
    }
    let mut seqs = separate_seqs(batches);
    for s in &mut seqs {
        s.reverse();
    }
    pack_seqs(&seqs)
}

/// Reverse every sequence on its own, so the last chunk of each sequence
/// lands in the first timestep.
pub fn reverse<T: Scalar>(seq: &Seq<T>) -> Seq<T> {
    Seq::new(Reverse {
        input: seq.clone(),
        out: reverse_batches(seq.output()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Vector;
    use crate::seq::const_seq_list;

    fn v(data: &[f64]) -> Vector<f64> {
        Vector::from_f64s(data)
    }

    #[test]
    fn test_reverse_ragged() {
        let seq = const_seq_list(&[
            vec![v(&[1.0]), v(&[2.0]), v(&[3.0])],
            vec![],
            vec![v(&[4.0]), v(&[5.0])],
        ])
        .unwrap();
        let r = reverse(&seq);
        let out = r.output();
        assert_eq!(out[0].packed.as_slice(), &[3.0, 5.0]);
        assert_eq!(out[1].packed.as_slice(), &[2.0, 4.0]);
        assert_eq!(out[2].packed.as_slice(), &[1.0]);

        let rr = reverse(&r);
        assert_eq!(rr.output(), seq.output());
    }
}
