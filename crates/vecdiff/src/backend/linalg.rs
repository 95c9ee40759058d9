//! Dense linear algebra using faer.
//!
//! Matrices are row-major, so buffers are wrapped with
//! `MatRef::from_row_major_slice` and handed to faer's `matmul`
//! without copying. Transposition is a stride swap.

use faer::linalg::matmul::matmul;
use faer::{Accum, MatMut, MatRef, Par};

use crate::backend::vector::Vector;
use crate::error::DiffError;
use crate::scalar::Scalar;

/// Row-major matrix backed by a [`Vector`].
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix<T: Scalar> {
    pub data: Vector<T>,
    pub rows: usize,
    pub cols: usize,
}

impl<T: Scalar> DenseMatrix<T> {
    /// # Errors
    ///
    /// Returns `LengthMismatch` if `data.len() != rows * cols`.
    pub fn new(data: Vector<T>, rows: usize, cols: usize) -> Result<Self, DiffError> {
        if data.len() != rows * cols {
            return Err(DiffError::LengthMismatch {
                expected: rows * cols,
                actual: data.len(),
            });
        }
        Ok(Self { data, rows, cols })
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            data: Vector::zeros(rows * cols),
            rows,
            cols,
        }
    }

    /// Shape after optional transposition.
    pub fn dims(&self, trans: bool) -> (usize, usize) {
        if trans {
            (self.cols, self.rows)
        } else {
            (self.rows, self.cols)
        }
    }

    /// `self = alpha * op(m1) * op(m2) + beta * self`.
    ///
    /// # Panics
    ///
    /// Panics if the operand shapes are incompatible with `self`.
    ///
    /// # Example
    ///
    /// ```
    /// use vecdiff::Vector;
    /// use vecdiff::backend::DenseMatrix;
    ///
    /// let a = DenseMatrix::new(Vector::<f64>::from_f64s(&[1.0, 2.0, 3.0, 4.0]), 2, 2).unwrap();
    /// let mut c = DenseMatrix::zeros(2, 2);
    /// c.product(false, true, 1.0, &a, &a, 0.0);
    /// assert_eq!(c.data.as_slice(), &[5.0, 11.0, 11.0, 25.0]);
    /// ```
    pub fn product(
        &mut self,
        trans1: bool,
        trans2: bool,
        alpha: T,
        m1: &DenseMatrix<T>,
        m2: &DenseMatrix<T>,
        beta: T,
    ) {
        let (m, k) = m1.dims(trans1);
        let (k2, n) = m2.dims(trans2);
        assert_eq!(k, k2, "product: inner dimensions {k} and {k2} differ");
        assert_eq!(
            (self.rows, self.cols),
            (m, n),
            "product: destination is {}x{}, expected {m}x{n}",
            self.rows,
            self.cols
        );
        gemm_slices(
            trans1,
            trans2,
            m,
            n,
            k,
            alpha,
            m1.data.as_slice(),
            m2.data.as_slice(),
            beta,
            self.data.as_mut_slice(),
        );
    }
}

fn operand<T: Scalar>(data: &[T], trans: bool, rows: usize, cols: usize) -> MatRef<'_, T> {
    if trans {
        MatRef::from_row_major_slice(data, cols, rows).transpose()
    } else {
        MatRef::from_row_major_slice(data, rows, cols)
    }
}

/// GEMM on raw row-major slices: `c = alpha * op(a) * op(b) + beta * c`,
/// where `op(a)` is `m x k`, `op(b)` is `k x n` and `c` is `m x n`.
#[allow(clippy::too_many_arguments)]
fn gemm_slices<T: Scalar>(
    trans_a: bool,
    trans_b: bool,
    m: usize,
    n: usize,
    k: usize,
    alpha: T,
    a: &[T],
    b: &[T],
    beta: T,
    c: &mut [T],
) {
    let a_mat = operand(a, trans_a, m, k);
    let b_mat = operand(b, trans_b, k, n);
    let accum = if beta == T::zero() {
        Accum::Replace
    } else {
        if beta != T::one() {
            c.iter_mut().for_each(|x| *x = *x * beta);
        }
        Accum::Add
    };
    let c_mat = MatMut::from_row_major_slice_mut(c, m, n);
    matmul(c_mat, accum, a_mat, b_mat, alpha, Par::Seq);
}

/// Batched GEMM over `num` contiguous `m x k` / `k x n` / `m x n` blocks.
///
/// # Panics
///
/// Panics if a buffer is not `num` times its block size.
#[allow(clippy::too_many_arguments)]
pub fn batched_gemm<T: Scalar>(
    trans_a: bool,
    trans_b: bool,
    num: usize,
    m: usize,
    n: usize,
    k: usize,
    alpha: T,
    a: &Vector<T>,
    b: &Vector<T>,
    beta: T,
    c: &mut Vector<T>,
) {
    let (a_size, b_size, c_size) = (m * k, k * n, m * n);
    assert_eq!(a.len(), num * a_size, "batched_gemm: bad lhs length");
    assert_eq!(b.len(), num * b_size, "batched_gemm: bad rhs length");
    assert_eq!(c.len(), num * c_size, "batched_gemm: bad output length");
    let (a, b) = (a.as_slice(), b.as_slice());
    let c = c.as_mut_slice();
    for i in 0..num {
        gemm_slices(
            trans_a,
            trans_b,
            m,
            n,
            k,
            alpha,
            &a[i * a_size..(i + 1) * a_size],
            &b[i * b_size..(i + 1) * b_size],
            beta,
            &mut c[i * c_size..(i + 1) * c_size],
        );
    }
}

/// `y = alpha * op(a) * x + beta * y` for an `m x n` row-major `a`.
///
/// # Panics
///
/// Panics if `x` or `y` has the wrong length.
#[allow(clippy::too_many_arguments)]
pub fn gemv<T: Scalar>(
    trans: bool,
    m: usize,
    n: usize,
    alpha: T,
    a: &Vector<T>,
    x: &Vector<T>,
    beta: T,
    y: &mut Vector<T>,
) {
    assert_eq!(a.len(), m * n, "gemv: bad matrix length");
    let (out, inner) = if trans { (n, m) } else { (m, n) };
    assert_eq!(x.len(), inner, "gemv: bad input length");
    assert_eq!(y.len(), out, "gemv: bad output length");
    let a_mat = if trans {
        MatRef::from_row_major_slice(a.as_slice(), m, n).transpose()
    } else {
        MatRef::from_row_major_slice(a.as_slice(), m, n)
    };
    let x_mat = MatRef::from_row_major_slice(x.as_slice(), inner, 1);
    let y_slice = y.as_mut_slice();
    let accum = if beta == T::zero() {
        Accum::Replace
    } else {
        if beta != T::one() {
            y_slice.iter_mut().for_each(|v| *v = *v * beta);
        }
        Accum::Add
    };
    let y_mat = MatMut::from_row_major_slice_mut(y_slice, out, 1);
    matmul(y_mat, accum, a_mat, x_mat, alpha, Par::Seq);
}

/// Transpose a `rows x ?` row-major matrix.
///
/// # Panics
///
/// Panics if `rows` does not divide `v.len()`.
pub fn transpose<T: Scalar>(v: &Vector<T>, rows: usize) -> Vector<T> {
    if v.is_empty() {
        return Vector::zeros(0);
    }
    assert!(rows > 0 && v.len() % rows == 0, "transpose: bad row count");
    let cols = v.len() / rows;
    let src = v.as_slice();
    Vector::from_vec(
        (0..cols)
            .flat_map(|i| (0..rows).map(move |j| src[j * cols + i]))
            .collect(),
    )
}
