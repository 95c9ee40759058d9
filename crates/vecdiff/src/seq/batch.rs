//! Per-timestep batches and presence-mask packing.

use crate::backend::{Creator, Vector};
use crate::error::DiffError;
use crate::graph::Res;
use crate::scalar::Scalar;

/// One timestep of a batch of sequences.
///
/// `packed` holds one equally sized chunk per present sequence, in slot
/// order. `present[i]` is true while sequence `i` has not ended.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T: Scalar> {
    pub packed: Vector<T>,
    pub present: Vec<bool>,
}

impl<T: Scalar> Batch<T> {
    /// # Errors
    ///
    /// Returns `NotDivisible` unless the number of present slots is
    /// positive and divides `packed.len()`.
    pub fn new(packed: Vector<T>, present: Vec<bool>) -> Result<Self, DiffError> {
        let b = Self { packed, present };
        b.check_packing()?;
        Ok(b)
    }

    /// Number of present sequences.
    pub fn num_present(&self) -> usize {
        self.present.iter().filter(|&&p| p).count()
    }

    /// Length of each sequence's chunk.
    pub fn chunk_size(&self) -> usize {
        match self.num_present() {
            0 => 0,
            n => self.packed.len() / n,
        }
    }

    fn check_packing(&self) -> Result<(), DiffError> {
        let n = self.num_present();
        if n == 0 || self.packed.len() % n != 0 {
            return Err(DiffError::NotDivisible {
                len: self.packed.len(),
                divisor: n,
            });
        }
        Ok(())
    }
}

/// A [`Batch`] whose packed data is a differentiable result.
#[derive(Debug, Clone)]
pub struct ResBatch<T: Scalar> {
    pub packed: Res<T>,
    pub present: Vec<bool>,
}

fn check_presence_len(expected: usize, actual: usize) -> Result<(), DiffError> {
    if expected != actual {
        return Err(DiffError::PresenceLength { expected, actual });
    }
    Ok(())
}

/// Drop the chunks of sequences absent from `present`.
///
/// # Errors
///
/// Returns `PresenceLength` if the masks differ in size and
/// `PresenceViolation` if `present` re-adds a sequence missing from `b`.
///
/// # Example
///
/// ```
/// use vecdiff::Vector;
/// use vecdiff::seq::{Batch, reduce_batch};
///
/// let b = Batch::new(Vector::<f64>::from_f64s(&[1.0, 2.0, 3.0]), vec![true, true, true]).unwrap();
/// let r = reduce_batch(&b, &[true, false, true]).unwrap();
/// assert_eq!(r.packed.as_slice(), &[1.0, 3.0]);
/// ```
pub fn reduce_batch<T: Scalar>(b: &Batch<T>, present: &[bool]) -> Result<Batch<T>, DiffError> {
    check_presence_len(b.present.len(), present.len())?;
    if let Some(index) = (0..present.len()).find(|&i| present[i] && !b.present[i]) {
        return Err(DiffError::PresenceViolation {
            index,
            reason: "cannot re-add sequences",
        });
    }
    Ok(reduce_unchecked(b, present))
}

/// Insert zero chunks for sequences present in `present` but not in `b`.
///
/// # Errors
///
/// Returns `PresenceLength` if the masks differ in size and
/// `PresenceViolation` if `present` drops a sequence present in `b`.
pub fn expand_batch<T: Scalar>(b: &Batch<T>, present: &[bool]) -> Result<Batch<T>, DiffError> {
    check_presence_len(b.present.len(), present.len())?;
    if let Some(index) = (0..present.len()).find(|&i| b.present[i] && !present[i]) {
        return Err(DiffError::PresenceViolation {
            index,
            reason: "expanded mask must be a superset",
        });
    }
    Ok(expand_unchecked(b, present))
}

/// [`reduce_batch`] for masks already known to be a subset of `b.present`.
///
/// Kept chunks are copied in contiguous runs.
pub(crate) fn reduce_unchecked<T: Scalar>(b: &Batch<T>, present: &[bool]) -> Batch<T> {
    if present == b.present.as_slice() {
        return b.clone();
    }
    let inc = b.chunk_size();
    let data = b.packed.as_slice();
    let mut runs: Vec<Vector<T>> = Vec::new();
    let (mut start, mut size) = (0, 0);
    for (&want, &have) in present.iter().zip(&b.present) {
        if want {
            debug_assert!(have, "reduce: cannot re-add sequences");
            size += inc;
        } else if have {
            if size > 0 {
                runs.push(Vector::from_vec(data[start..start + size].to_vec()));
                start += size;
                size = 0;
            }
            start += inc;
        }
    }
    if size > 0 {
        runs.push(Vector::from_vec(data[start..start + size].to_vec()));
    }
    Batch {
        packed: Creator::new().concat(&runs),
        present: present.to_vec(),
    }
}

/// [`expand_batch`] for masks already known to be a superset of `b.present`.
pub(crate) fn expand_unchecked<T: Scalar>(b: &Batch<T>, present: &[bool]) -> Batch<T> {
    if present == b.present.as_slice() {
        return b.clone();
    }
    let inc = b.chunk_size();
    let data = b.packed.as_slice();
    let filler = Vector::zeros(inc);
    let mut runs: Vec<Vector<T>> = Vec::new();
    let (mut start, mut size) = (0, 0);
    for (&want, &have) in present.iter().zip(&b.present) {
        if have {
            debug_assert!(want, "expand: mask must be a superset");
            size += inc;
        } else if want {
            if size > 0 {
                runs.push(Vector::from_vec(data[start..start + size].to_vec()));
                start += size;
                size = 0;
            }
            runs.push(filler.clone());
        }
    }
    if size > 0 {
        runs.push(Vector::from_vec(data[start..start + size].to_vec()));
    }
    Batch {
        packed: Creator::new().concat(&runs),
        present: present.to_vec(),
    }
}

/// Check a timestep list: equal mask sizes, valid packing, and no
/// sequence reappearing after it ended.
///
/// # Errors
///
/// Returns `PresenceLength`, `NotDivisible` or `NonMonotonicPresence`.
pub fn validate_batches<T: Scalar>(batches: &[Batch<T>]) -> Result<(), DiffError> {
    let Some(first) = batches.first() else {
        return Ok(());
    };
    let slots = first.present.len();
    for (t, b) in batches.iter().enumerate() {
        check_presence_len(slots, b.present.len())?;
        b.check_packing()?;
        if t > 0 {
            let prev = &batches[t - 1].present;
            if let Some(index) = (0..slots).find(|&i| b.present[i] && !prev[i]) {
                return Err(DiffError::NonMonotonicPresence { index, timestep: t });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(s: &str) -> Vec<bool> {
        s.chars().map(|c| c == 'T').collect()
    }

    fn batch(data: &[f64], present: &str) -> Batch<f64> {
        Batch::new(Vector::from_f64s(data), mask(present)).unwrap()
    }

    fn range(n: usize) -> Vec<f64> {
        (1..=n).map(|x| x as f64).collect()
    }

    #[test]
    fn test_reduce_batch() {
        let b = batch(&range(10), "TFTTFFTT");
        let r = reduce_batch(&b, &mask("TFFTFFFT")).unwrap();
        assert_eq!(r.packed.as_slice(), &[1.0, 2.0, 5.0, 6.0, 9.0, 10.0]);
        let r = reduce_batch(&b, &mask("FFTFFFTF")).unwrap();
        assert_eq!(r.packed.as_slice(), &[3.0, 4.0, 7.0, 8.0]);
    }

    #[test]
    fn test_reduce_batch_rejects_re_add() {
        let b = batch(&range(4), "TFTF");
        assert_eq!(
            reduce_batch(&b, &mask("TTFF")).unwrap_err(),
            DiffError::PresenceViolation {
                index: 1,
                reason: "cannot re-add sequences"
            }
        );
        assert_eq!(
            reduce_batch(&b, &mask("TF")).unwrap_err(),
            DiffError::PresenceLength {
                expected: 4,
                actual: 2
            }
        );
    }

    #[test]
    fn test_expand_batch() {
        let b = batch(&range(6), "TFTFFFFT");
        let e = expand_batch(&b, &mask("TFTFTFTT")).unwrap();
        assert_eq!(
            e.packed.as_slice(),
            &[1.0, 2.0, 3.0, 4.0, 0.0, 0.0, 0.0, 0.0, 5.0, 6.0]
        );
        let e = expand_batch(&b, &mask("TTTTTTTT")).unwrap();
        assert_eq!(
            e.packed.as_slice(),
            &[1.0, 2.0, 0.0, 0.0, 3.0, 4.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 5.0, 6.0]
        );
        let e = expand_batch(&b, &mask("TFTFTTTT")).unwrap();
        assert_eq!(
            e.packed.as_slice(),
            &[1.0, 2.0, 3.0, 4.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 5.0, 6.0]
        );
        assert!(expand_batch(&b, &mask("FFTFFFFT")).is_err());
    }

    #[test]
    fn test_expand_then_reduce_round_trip() {
        let b = batch(&range(6), "FTFTFT");
        for superset in ["FTFTFT", "TTFTFT", "FTTTTT", "TTTTTT"] {
            let e = expand_batch(&b, &mask(superset)).unwrap();
            let r = reduce_batch(&e, &b.present).unwrap();
            assert_eq!(r, b);
        }
    }

    #[test]
    fn test_validate_batches() {
        let ok = vec![batch(&range(4), "TT"), batch(&range(2), "TF")];
        assert!(validate_batches(&ok).is_ok());

        let bad = vec![batch(&range(2), "TF"), batch(&range(4), "TT")];
        assert_eq!(
            validate_batches(&bad).unwrap_err(),
            DiffError::NonMonotonicPresence {
                index: 1,
                timestep: 1
            }
        );
        assert!(Batch::new(Vector::<f64>::zeros(3), mask("TT")).is_err());
        assert!(Batch::new(Vector::<f64>::zeros(0), mask("FF")).is_err());
    }
}
