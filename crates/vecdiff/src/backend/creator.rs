//! Vector factory.

use std::marker::PhantomData;

use crate::backend::mapper::IndexMapper;
use crate::backend::vector::Vector;
use crate::error::DiffError;
use crate::scalar::{DType, Scalar};

/// Factory producing vectors and numerics of one representation.
///
/// `Creator<f32>` and `Creator<f64>` are the two supported backends;
/// the type carries no state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Creator<T: Scalar> {
    _phantom: PhantomData<T>,
}

impl<T: Scalar> Creator<T> {
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }

    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    /// Zero vector of `len` components.
    pub fn make_vector(&self, len: usize) -> Vector<T> {
        Vector::zeros(len)
    }

    pub fn make_vector_data(&self, data: &[T]) -> Vector<T> {
        Vector::from_vec(data.to_vec())
    }

    pub fn make_numeric(&self, x: f64) -> T {
        T::from_f64(x)
    }

    pub fn make_numeric_list(&self, xs: &[f64]) -> Vec<T> {
        xs.iter().map(|&x| T::from_f64(x)).collect()
    }

    /// Concatenate vectors into fresh storage.
    ///
    /// # Example
    ///
    /// ```
    /// use vecdiff::{Creator, Vector};
    ///
    /// let c = Creator::<f64>::new();
    /// let joined = c.concat(&[Vector::from_f64s(&[1.0]), Vector::from_f64s(&[2.0, 3.0])]);
    /// assert_eq!(joined.as_slice(), &[1.0, 2.0, 3.0]);
    /// ```
    pub fn concat(&self, vs: &[Vector<T>]) -> Vector<T> {
        let total = vs.iter().map(Vector::len).sum();
        let mut data = Vec::with_capacity(total);
        for v in vs {
            data.extend_from_slice(v.as_slice());
        }
        Vector::from_vec(data)
    }

    /// Gather mapper with `out[i] = in[table[i]]`.
    ///
    /// # Errors
    ///
    /// Returns `MapperIndex` if a table entry is `>= in_size`.
    pub fn make_mapper(&self, in_size: usize, table: Vec<usize>) -> Result<IndexMapper, DiffError> {
        IndexMapper::new(in_size, table)
    }
}
