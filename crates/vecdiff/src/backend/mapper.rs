//! Gather/scatter index mappers.

use crate::backend::vector::Vector;
use crate::error::DiffError;
use crate::scalar::Scalar;

/// Linear map that gathers input components into an output vector.
///
/// `map_transpose` is the adjoint: it scatter-adds into the input space.
pub trait Mapper<T: Scalar> {
    fn in_size(&self) -> usize;

    fn out_size(&self) -> usize;

    /// Write the mapped `input` (length `in_size`) into `out` (length `out_size`).
    fn map(&self, input: &Vector<T>, out: &mut Vector<T>);

    /// Accumulate the transposed map of `input` (length `out_size`) into
    /// `out` (length `in_size`).
    fn map_transpose(&self, input: &Vector<T>, out: &mut Vector<T>);
}

/// Mapper defined by a table with `out[i] = in[table[i]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMapper {
    in_size: usize,
    table: Vec<usize>,
}

impl IndexMapper {
    /// # Errors
    ///
    /// Returns `MapperIndex` if an entry is outside `0..in_size`.
    pub fn new(in_size: usize, table: Vec<usize>) -> Result<Self, DiffError> {
        if let Some(&index) = table.iter().find(|&&i| i >= in_size) {
            return Err(DiffError::MapperIndex { index, in_size });
        }
        Ok(Self { in_size, table })
    }

    pub fn table(&self) -> &[usize] {
        &self.table
    }
}

impl<T: Scalar> Mapper<T> for IndexMapper {
    fn in_size(&self) -> usize {
        self.in_size
    }

    fn out_size(&self) -> usize {
        self.table.len()
    }

    fn map(&self, input: &Vector<T>, out: &mut Vector<T>) {
        let src = input.as_slice();
        let dst = out.as_mut_slice();
        for (o, &i) in dst.iter_mut().zip(&self.table) {
            *o = src[i];
        }
    }

    fn map_transpose(&self, input: &Vector<T>, out: &mut Vector<T>) {
        let src = input.as_slice();
        let dst = out.as_mut_slice();
        for (&x, &i) in src.iter().zip(&self.table) {
            dst[i] = dst[i] + x;
        }
    }
}

/// Mapper selecting the largest entry of each `cols`-wide row of `v`.
///
/// # Errors
///
/// Returns `NotDivisible` if `cols` does not divide `v.len()`.
///
/// # Example
///
/// ```
/// use vecdiff::Vector;
/// use vecdiff::backend::{Mapper, map_max};
///
/// let v = Vector::<f64>::from_f64s(&[1.0, 5.0, 2.0, 9.0, 0.0, 3.0]);
/// let m = map_max(&v, 3).unwrap();
/// let mut out = Vector::zeros(2);
/// m.map(&v, &mut out);
/// assert_eq!(out.as_slice(), &[5.0, 9.0]);
/// ```
pub fn map_max<T: Scalar>(v: &Vector<T>, cols: usize) -> Result<IndexMapper, DiffError> {
    if cols == 0 || v.len() % cols != 0 {
        return Err(DiffError::NotDivisible {
            len: v.len(),
            divisor: cols,
        });
    }
    let data = v.as_slice();
    let table = data
        .chunks(cols)
        .enumerate()
        .map(|(row, chunk)| {
            let best = (0..chunk.len())
                .reduce(|b, i| if chunk[i] > chunk[b] { i } else { b })
                .unwrap_or(0);
            row * cols + best
        })
        .collect();
    IndexMapper::new(v.len(), table)
}
