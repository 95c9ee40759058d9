//! Summing sequences over time.

use super::batch::{Batch, expand_unchecked, reduce_unchecked};
use super::node::Seq;
use crate::backend::{Vector, chunks};
use crate::error::DiffError;
use crate::graph::{Grad, Node, Res, VarSet};
use crate::scalar::Scalar;

#[derive(Debug)]
struct Sum<T: Scalar> {
    input: Seq<T>,
    out: Vector<T>,
}

impl<T: Scalar> Node<T> for Sum<T> {
    fn output(&self) -> Vector<T> {
        self.out.clone()
    }

    fn vars(&self) -> VarSet {
        self.input.vars()
    }

    fn propagate(&self, upstream: Vector<T>, grad: &mut Grad<T>) {
        let down = self
            .input
            .output()
            .iter()
            .map(|x| {
                let mut packed = Vector::zeros(x.packed.len());
                chunks::add_repeated(&mut packed, &upstream);
                Batch {
                    packed,
                    present: x.present.clone(),
                }
            })
            .collect();
        self.input.propagate(down, grad);
    }
}

/// Sum of every chunk at every timestep.
///
/// # Errors
///
/// Returns `EmptySequence` if `seq` has no timesteps and
/// `SeqShapeMismatch` if chunk sizes differ between timesteps.
///
/// # Example
///
/// ```
/// use vecdiff::Vector;
/// use vecdiff::seq::{const_seq_list, sum};
///
/// let v = |a: f64, b: f64| Vector::<f64>::from_f64s(&[a, b]);
/// let seq = const_seq_list(&[vec![v(1.0, 2.0), v(3.0, 4.0)], vec![v(5.0, 6.0)]]).unwrap();
/// assert_eq!(sum(&seq).unwrap().output().as_slice(), &[9.0, 12.0]);
/// ```
pub fn sum<T: Scalar>(seq: &Seq<T>) -> Result<Res<T>, DiffError> {
    let batches = seq.output();
    let Some(first) = batches.first() else {
        return Err(DiffError::EmptySequence { op: "sum" });
    };
    let width = first.chunk_size();
    let mut out = Vector::zeros(width);
    for (t, b) in batches.iter().enumerate() {
        if b.chunk_size() != width {
            return Err(DiffError::SeqShapeMismatch { timestep: t });
        }
        out += &chunks::sum_rows(&b.packed, width);
    }
    Ok(Res::new(Sum {
        input: seq.clone(),
        out,
    }))
}

#[derive(Debug)]
struct SumEach<T: Scalar> {
    input: Seq<T>,
    out: Vector<T>,
}

impl<T: Scalar> Node<T> for SumEach<T> {
    fn output(&self) -> Vector<T> {
        self.out.clone()
    }

    fn vars(&self) -> VarSet {
        self.input.vars()
    }

    fn propagate(&self, upstream: Vector<T>, grad: &mut Grad<T>) {
        let in_out = self.input.output();
        let u = Batch {
            packed: upstream,
            present: in_out[0].present.clone(),
        };
        let down = in_out
            .iter()
            .map(|x| reduce_unchecked(&u, &x.present))
            .collect();
        self.input.propagate(down, grad);
    }
}

/// Sum of each sequence over its own timesteps, packed in slot order.
/// Sequences absent from the first timestep contribute nothing.
///
/// # Errors
///
/// Returns `EmptySequence` if `seq` has no timesteps and
/// `SeqShapeMismatch` if chunk sizes differ between timesteps.
pub fn sum_each<T: Scalar>(seq: &Seq<T>) -> Result<Res<T>, DiffError> {
    let batches = seq.output();
    let Some(first) = batches.first() else {
        return Err(DiffError::EmptySequence { op: "sum_each" });
    };
    let width = first.chunk_size();
    let mut out = first.packed.copy();
    for (t, b) in batches.iter().enumerate().skip(1) {
        if b.chunk_size() != width {
            return Err(DiffError::SeqShapeMismatch { timestep: t });
        }
        out += &expand_unchecked(b, &first.present).packed;
    }
    Ok(Res::new(SumEach {
        input: seq.clone(),
        out,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seq::const_seq_list;

    #[test]
    fn test_sum_each_ragged() {
        let v = |a: f64, b: f64| Vector::<f64>::from_f64s(&[a, b]);
        let seq = const_seq_list(&[
            vec![v(1.0, 2.0), v(3.0, 4.0)],
            vec![v(5.0, 6.0)],
            vec![],
        ])
        .unwrap();
        let out = sum_each(&seq).unwrap();
        assert_eq!(out.output().as_slice(), &[4.0, 6.0, 5.0, 6.0]);
    }

    #[test]
    fn test_sum_empty_sequence() {
        let seq = const_seq_list::<f32>(&[]).unwrap();
        assert_eq!(
            sum(&seq).unwrap_err(),
            DiffError::EmptySequence { op: "sum" }
        );
        assert_eq!(
            sum_each(&seq).unwrap_err(),
            DiffError::EmptySequence { op: "sum_each" }
        );
    }

    #[test]
    fn test_sum_width_mismatch() {
        let seq = const_seq_list(&[vec![
            Vector::<f64>::from_f64s(&[1.0, 2.0]),
            Vector::from_f64s(&[3.0]),
        ]])
        .unwrap();
        assert_eq!(
            sum(&seq).unwrap_err(),
            DiffError::SeqShapeMismatch { timestep: 1 }
        );
    }
}
