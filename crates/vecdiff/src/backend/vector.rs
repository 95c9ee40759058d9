//! Copy-on-write numeric vector.
//!
//! A [`Vector`] is a window `offset..offset+len` into a reference-counted
//! buffer. Cloning is cheap and shares the buffer; `slice` produces an
//! aliasing view. Any mutation first makes the window exclusive, so a
//! vector never observes writes made through another handle.

use std::fmt;
use std::ops::{AddAssign, DivAssign, MulAssign, SubAssign};
use std::rc::Rc;

use crate::error::DiffError;
use crate::scalar::{FlatData, Scalar};

/// Dense vector of scalars with shared, copy-on-write storage.
#[derive(Clone)]
pub struct Vector<T: Scalar> {
    buffer: Rc<Vec<T>>,
    offset: usize,
    len: usize,
}

impl<T: Scalar> Vector<T> {
    /// Create a zero-initialized vector.
    ///
    /// # Example
    ///
    /// ```
    /// use vecdiff::Vector;
    ///
    /// let v = Vector::<f64>::zeros(3);
    /// assert_eq!(v.as_slice(), &[0.0, 0.0, 0.0]);
    /// ```
    pub fn zeros(len: usize) -> Self {
        Self::from_vec(vec![T::zero(); len])
    }

    /// Wrap existing data.
    pub fn from_vec(data: Vec<T>) -> Self {
        let len = data.len();
        Self {
            buffer: Rc::new(data),
            offset: 0,
            len,
        }
    }

    /// Build a vector from `f64` literals.
    pub fn from_f64s(data: &[f64]) -> Self {
        Self::from_vec(data.iter().map(|&x| T::from_f64(x)).collect())
    }

    /// Build a vector from its flat serialized form, converting widths if needed.
    pub fn from_flat(flat: &FlatData) -> Self {
        match flat {
            FlatData::F32(v) => Self::from_vec(v.iter().map(|&x| T::from_f64(x as f64)).collect()),
            FlatData::F64(v) => Self::from_f64s(v),
        }
    }

    /// Serialize to a flat list in this vector's own representation.
    pub fn to_flat(&self) -> FlatData {
        match T::DTYPE {
            crate::scalar::DType::F32 => {
                FlatData::F32(self.as_slice().iter().map(|x| x.as_f64() as f32).collect())
            }
            crate::scalar::DType::F64 => {
                FlatData::F64(self.as_slice().iter().map(|x| x.as_f64()).collect())
            }
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Immutable view of the components.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.buffer[self.offset..self.offset + self.len]
    }

    /// Mutable view of the components.
    ///
    /// Views are materialized into their own buffer and shared buffers
    /// are cloned before the borrow is handed out.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        if self.is_view() {
            self.buffer = Rc::new(self.as_slice().to_vec());
            self.offset = 0;
        }
        Rc::make_mut(&mut self.buffer).as_mut_slice()
    }

    /// Components as an owned `Vec`.
    pub fn to_vec(&self) -> Vec<T> {
        self.as_slice().to_vec()
    }

    /// Deep copy into fresh storage.
    pub fn copy(&self) -> Self {
        Self::from_vec(self.to_vec())
    }

    /// Component at `i`, if in range.
    pub fn get(&self, i: usize) -> Option<T> {
        self.as_slice().get(i).copied()
    }

    /// Overwrite component `i`.
    ///
    /// # Errors
    ///
    /// Returns `SliceOutOfRange` if `i` is past the end.
    pub fn set(&mut self, i: usize, value: T) -> Result<(), DiffError> {
        if i >= self.len {
            return Err(DiffError::SliceOutOfRange {
                start: i,
                end: i + 1,
                len: self.len,
            });
        }
        self.as_mut_slice()[i] = value;
        Ok(())
    }

    /// Aliasing view of `start..end`.
    ///
    /// # Example
    ///
    /// ```
    /// use vecdiff::Vector;
    ///
    /// let v = Vector::<f64>::from_f64s(&[1.0, 2.0, 3.0, 4.0]);
    /// let s = v.slice(1, 3).unwrap();
    /// assert_eq!(s.as_slice(), &[2.0, 3.0]);
    /// assert!(s.shares_storage_with(&v));
    /// ```
    pub fn slice(&self, start: usize, end: usize) -> Result<Self, DiffError> {
        if start > end || end > self.len {
            return Err(DiffError::SliceOutOfRange {
                start,
                end,
                len: self.len,
            });
        }
        Ok(Self {
            buffer: Rc::clone(&self.buffer),
            offset: self.offset + start,
            len: end - start,
        })
    }

    /// Overwrite `start..start+src.len()` with `src`.
    pub fn set_slice(&mut self, start: usize, src: &Vector<T>) -> Result<(), DiffError> {
        let end = start + src.len();
        if end > self.len {
            return Err(DiffError::SliceOutOfRange {
                start,
                end,
                len: self.len,
            });
        }
        self.as_mut_slice()[start..end].copy_from_slice(src.as_slice());
        Ok(())
    }

    /// Whether both vectors read from the same buffer.
    pub fn shares_storage_with(&self, other: &Vector<T>) -> bool {
        Rc::ptr_eq(&self.buffer, &other.buffer)
    }

    /// Whether this vector covers only part of its buffer.
    pub fn is_view(&self) -> bool {
        self.offset != 0 || self.len != self.buffer.len()
    }

    /// Multiply every component by `s`.
    pub fn scale(&mut self, s: T) {
        self.as_mut_slice().iter_mut().for_each(|x| *x = *x * s);
    }

    /// Add `s` to every component.
    pub fn add_scalar(&mut self, s: T) {
        self.as_mut_slice().iter_mut().for_each(|x| *x = *x + s);
    }

    /// Apply `f` to every component in place.
    pub fn apply(&mut self, f: impl Fn(T) -> T) {
        self.as_mut_slice().iter_mut().for_each(|x| *x = f(*x));
    }

    /// Combine componentwise with `other` in place.
    pub fn zip_apply(&mut self, other: &Vector<T>, f: impl Fn(T, T) -> T) {
        debug_assert_eq!(self.len, other.len, "zip_apply: lengths differ");
        self.as_mut_slice()
            .iter_mut()
            .zip(other.as_slice())
            .for_each(|(x, &y)| *x = f(*x, y));
    }

    pub fn dot(&self, other: &Vector<T>) -> T {
        self.as_slice()
            .iter()
            .zip(other.as_slice())
            .fold(T::zero(), |acc, (&a, &b)| acc + a * b)
    }

    pub fn sum(&self) -> T {
        self.as_slice().iter().fold(T::zero(), |acc, &x| acc + x)
    }

    /// Largest component, or `-inf` for an empty vector.
    pub fn max(&self) -> T {
        self.as_slice()
            .iter()
            .fold(T::neg_infinity(), |acc, &x| if x > acc { x } else { acc })
    }

    /// Index of the first largest component.
    pub fn max_index(&self) -> Option<usize> {
        let data = self.as_slice();
        (0..data.len()).reduce(|best, i| if data[i] > data[best] { i } else { best })
    }

    pub fn abs_sum(&self) -> T {
        self.as_slice().iter().fold(T::zero(), |acc, &x| acc + x.abs())
    }

    pub fn abs_max(&self) -> T {
        self.as_slice()
            .iter()
            .fold(T::zero(), |acc, &x| if x.abs() > acc { x.abs() } else { acc })
    }

    /// Euclidean norm.
    pub fn norm(&self) -> T {
        self.dot(self).sqrt()
    }
}

impl<T: Scalar> fmt::Debug for Vector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<T: Scalar> PartialEq for Vector<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Scalar> AddAssign<&Vector<T>> for Vector<T> {
    fn add_assign(&mut self, rhs: &Vector<T>) {
        self.zip_apply(rhs, |a, b| a + b);
    }
}

impl<T: Scalar> SubAssign<&Vector<T>> for Vector<T> {
    fn sub_assign(&mut self, rhs: &Vector<T>) {
        self.zip_apply(rhs, |a, b| a - b);
    }
}

impl<T: Scalar> MulAssign<&Vector<T>> for Vector<T> {
    fn mul_assign(&mut self, rhs: &Vector<T>) {
        self.zip_apply(rhs, |a, b| a * b);
    }
}

impl<T: Scalar> DivAssign<&Vector<T>> for Vector<T> {
    fn div_assign(&mut self, rhs: &Vector<T>) {
        self.zip_apply(rhs, |a, b| a / b);
    }
}

impl<T: Scalar> From<Vec<T>> for Vector<T> {
    fn from(data: Vec<T>) -> Self {
        Self::from_vec(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros() {
        let v = Vector::<f64>::zeros(4);
        assert_eq!(v.len(), 4);
        assert!(v.as_slice().iter().all(|&x| x == 0.0));
        assert!(!v.is_view());
    }

    #[test]
    fn test_clone_shares_until_write() {
        let v1 = Vector::<f64>::from_f64s(&[1.0, 2.0, 3.0]);
        let mut v2 = v1.clone();
        assert!(v1.shares_storage_with(&v2));

        v2.set(0, 10.0).unwrap();
        assert!(!v1.shares_storage_with(&v2));
        assert_eq!(v1.as_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(v2.as_slice(), &[10.0, 2.0, 3.0]);
    }

    #[test]
    fn test_slice_is_view() {
        let v = Vector::<f32>::from_f64s(&[1.0, 2.0, 3.0, 4.0]);
        let mut s = v.slice(1, 3).unwrap();
        assert!(s.is_view());
        assert!(s.shares_storage_with(&v));

        s.scale(2.0);
        assert!(!s.is_view());
        assert_eq!(s.as_slice(), &[4.0, 6.0]);
        assert_eq!(v.as_slice(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_slice_out_of_range() {
        let v = Vector::<f64>::zeros(3);
        assert!(matches!(
            v.slice(2, 5),
            Err(DiffError::SliceOutOfRange { start: 2, end: 5, len: 3 })
        ));
        assert!(v.slice(2, 1).is_err());
        assert!(v.slice(3, 3).unwrap().is_empty());
    }

    #[test]
    fn test_set_slice() {
        let mut v = Vector::<f64>::zeros(5);
        v.set_slice(1, &Vector::from_f64s(&[7.0, 8.0])).unwrap();
        assert_eq!(v.as_slice(), &[0.0, 7.0, 8.0, 0.0, 0.0]);
        assert!(v.set_slice(4, &Vector::from_f64s(&[1.0, 1.0])).is_err());
    }

    #[test]
    fn test_arithmetic() {
        let mut a = Vector::<f64>::from_f64s(&[1.0, 2.0, 3.0]);
        let b = Vector::<f64>::from_f64s(&[4.0, 5.0, 6.0]);
        a += &b;
        assert_eq!(a.as_slice(), &[5.0, 7.0, 9.0]);
        a -= &b;
        a *= &b;
        assert_eq!(a.as_slice(), &[4.0, 10.0, 18.0]);
        a /= &b;
        assert_eq!(a.as_slice(), &[1.0, 2.0, 3.0]);
        a.add_scalar(1.0);
        a.scale(0.5);
        assert_eq!(a.as_slice(), &[1.0, 1.5, 2.0]);
    }

    #[test]
    fn test_aggregates() {
        let v = Vector::<f64>::from_f64s(&[3.0, -4.0, 1.0]);
        assert_eq!(v.sum(), 0.0);
        assert_eq!(v.max(), 3.0);
        assert_eq!(v.max_index(), Some(0));
        assert_eq!(v.abs_sum(), 8.0);
        assert_eq!(v.abs_max(), 4.0);
        assert_eq!(v.dot(&v), 26.0);
        assert_eq!(Vector::<f64>::from_f64s(&[3.0, 4.0]).norm(), 5.0);
        assert_eq!(Vector::<f64>::zeros(0).max_index(), None);
    }

    #[test]
    fn test_flat_round_trip() {
        let v = Vector::<f32>::from_f64s(&[1.5, -2.0]);
        let flat = v.to_flat();
        assert_eq!(flat, FlatData::F32(vec![1.5, -2.0]));
        let w = Vector::<f64>::from_flat(&flat);
        assert_eq!(w.as_slice(), &[1.5, -2.0]);
    }
}
