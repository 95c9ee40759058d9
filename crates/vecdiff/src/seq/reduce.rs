//! Dropping sequences from every timestep.

use super::batch::{Batch, expand_unchecked, reduce_unchecked};
use super::node::{Seq, SeqNode};
use crate::backend::Vector;
use crate::error::DiffError;
use crate::graph::{Grad, VarSet};
use crate::scalar::Scalar;

#[derive(Debug)]
struct Reduce<T: Scalar> {
    input: Seq<T>,
    out: Vec<Batch<T>>,
}

impl<T: Scalar> SeqNode<T> for Reduce<T> {
    fn output(&self) -> &[Batch<T>] {
        &self.out
    }

    fn vars(&self) -> VarSet {
        self.input.vars()
    }

    fn propagate(&self, upstream: Vec<Batch<T>>, grad: &mut Grad<T>) {
        let in_out = self.input.output();
        let mut down: Vec<Batch<T>> = upstream
            .iter()
            .zip(in_out)
            .map(|(u, x)| expand_unchecked(u, &x.present))
            .collect();
        for x in &in_out[down.len()..] {
            down.push(Batch {
                packed: Vector::zeros(x.packed.len()),
                present: x.present.clone(),
            });
        }
        self.input.propagate(down, grad);
    }
}

/// Keep only the sequences marked in `present`.
///
/// Each timestep is reduced to `present` intersected with its own mask.
/// Output stops at the first timestep with no sequence left.
///
/// # Errors
///
/// Returns `PresenceLength` if `present` does not have one flag per slot.
pub fn reduce<T: Scalar>(seq: &Seq<T>, present: &[bool]) -> Result<Seq<T>, DiffError> {
    let mut out = Vec::with_capacity(seq.len());
    for b in seq.output() {
        if b.present.len() != present.len() {
            return Err(DiffError::PresenceLength {
                expected: b.present.len(),
                actual: present.len(),
            });
        }
        let keep: Vec<bool> = b
            .present
            .iter()
            .zip(present)
            .map(|(&a, &b)| a && b)
            .collect();
        if !keep.iter().any(|&p| p) {
            break;
        }
        out.push(reduce_unchecked(b, &keep));
    }
    Ok(Seq::new(Reduce {
        input: seq.clone(),
        out,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seq::const_seq_list;

    fn v(data: &[f64]) -> Vector<f64> {
        Vector::from_f64s(data)
    }

    #[test]
    fn test_reduce_drops_trailing_timesteps() {
        let seq = const_seq_list(&[
            vec![v(&[1.0]), v(&[2.0]), v(&[3.0])],
            vec![v(&[4.0])],
            vec![v(&[5.0]), v(&[6.0])],
        ])
        .unwrap();
        let r = reduce(&seq, &[false, true, true]).unwrap();
        let out = r.output();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].packed.as_slice(), &[4.0, 5.0]);
        assert_eq!(out[0].present, vec![false, true, true]);
        assert_eq!(out[1].packed.as_slice(), &[6.0]);
        assert_eq!(out[1].present, vec![false, false, true]);
    }

    #[test]
    fn test_reduce_bad_mask_length() {
        let seq = const_seq_list(&[vec![v(&[1.0])]]).unwrap();
        assert!(reduce(&seq, &[true, true]).is_err());
    }
}
