//! Differentiable row-major matrices.

use crate::backend::{DenseMatrix, Vector, chunks, linalg};
use crate::error::DiffError;
use crate::graph::{Grad, Node, Res, VarSet};
use crate::scalar::Scalar;

/// A result read as a `rows x cols` row-major matrix.
#[derive(Debug, Clone)]
pub struct Matrix<T: Scalar> {
    pub data: Res<T>,
    pub rows: usize,
    pub cols: usize,
}

impl<T: Scalar> Matrix<T> {
    /// # Errors
    ///
    /// Returns `LengthMismatch` if `data.len() != rows * cols`.
    pub fn new(data: Res<T>, rows: usize, cols: usize) -> Result<Self, DiffError> {
        if data.len() != rows * cols {
            return Err(DiffError::LengthMismatch {
                expected: rows * cols,
                actual: data.len(),
            });
        }
        Ok(Self { data, rows, cols })
    }

    /// Shape after optional transposition.
    pub fn dims(&self, trans: bool) -> (usize, usize) {
        if trans {
            (self.cols, self.rows)
        } else {
            (self.rows, self.cols)
        }
    }
}

/// Write a gradient product into `target`'s slot when it is a variable
/// with one, otherwise into a fresh buffer that is then propagated.
///
/// `f` receives the destination and the `beta` to accumulate with.
fn product_into<T: Scalar>(
    target: &Res<T>,
    rows: usize,
    cols: usize,
    grad: &mut Grad<T>,
    f: impl FnOnce(&mut DenseMatrix<T>, T),
) {
    if let Some(var) = target.as_var() {
        if let Some(slot) = grad.get_mut(&var) {
            let data = std::mem::replace(slot, Vector::zeros(0));
            let mut dst = DenseMatrix { data, rows, cols };
            f(&mut dst, T::one());
            *slot = dst.data;
        }
        return;
    }
    let mut dst = DenseMatrix::zeros(rows, cols);
    f(&mut dst, T::zero());
    target.propagate(dst.data, grad);
}

#[derive(Debug)]
struct MatMul<T: Scalar> {
    m1: Matrix<T>,
    m2: Matrix<T>,
    m1_out: Vector<T>,
    m2_out: Vector<T>,
    trans1: bool,
    trans2: bool,
    out: Vector<T>,
    vars: VarSet,
}

impl<T: Scalar> Node<T> for MatMul<T> {
    fn output(&self) -> Vector<T> {
        self.out.clone()
    }

    fn vars(&self) -> VarSet {
        self.vars.clone()
    }

    fn propagate(&self, upstream: Vector<T>, grad: &mut Grad<T>) {
        let (rows, _) = self.m1.dims(self.trans1);
        let (_, cols) = self.m2.dims(self.trans2);
        let u = DenseMatrix {
            data: upstream,
            rows,
            cols,
        };
        let a = DenseMatrix {
            data: self.m1_out.clone(),
            rows: self.m1.rows,
            cols: self.m1.cols,
        };
        let b = DenseMatrix {
            data: self.m2_out.clone(),
            rows: self.m2.rows,
            cols: self.m2.cols,
        };
        let one = T::one();
        let (t1, t2) = (self.trans1, self.trans2);
        if grad.intersects(&self.m1.data.vars()) {
            product_into(&self.m1.data, a.rows, a.cols, grad, |dst, beta| {
                if t1 {
                    dst.product(t2, true, one, &b, &u, beta);
                } else {
                    dst.product(false, !t2, one, &u, &b, beta);
                }
            });
        }
        if grad.intersects(&self.m2.data.vars()) {
            product_into(&self.m2.data, b.rows, b.cols, grad, |dst, beta| {
                if t2 {
                    dst.product(true, t1, one, &u, &a, beta);
                } else {
                    dst.product(!t1, false, one, &a, &u, beta);
                }
            });
        }
    }
}

/// Matrix product `op(m1) * op(m2)`, where `op` transposes when the
/// matching flag is set.
///
/// # Errors
///
/// Returns `MatrixDimension` if the inner dimensions differ.
///
/// # Example
///
/// ```
/// use vecdiff::{Const, Vector};
/// use vecdiff::ops::{Matrix, mat_mul};
///
/// let a = Matrix::new(Const::new(Vector::<f64>::from_f64s(&[1.0, 2.0])).to_res(), 1, 2).unwrap();
/// let p = mat_mul(false, true, &a, &a).unwrap();
/// assert_eq!((p.rows, p.cols), (1, 1));
/// assert_eq!(p.data.output().as_slice(), &[5.0]);
/// ```
pub fn mat_mul<T: Scalar>(
    trans1: bool,
    trans2: bool,
    m1: &Matrix<T>,
    m2: &Matrix<T>,
) -> Result<Matrix<T>, DiffError> {
    let (rows, inner1) = m1.dims(trans1);
    let (inner2, cols) = m2.dims(trans2);
    if inner1 != inner2 {
        return Err(DiffError::MatrixDimension {
            rows,
            cols: inner1,
            other_rows: inner2,
            other_cols: cols,
        });
    }
    let a = DenseMatrix {
        data: m1.data.output(),
        rows: m1.rows,
        cols: m1.cols,
    };
    let b = DenseMatrix {
        data: m2.data.output(),
        rows: m2.rows,
        cols: m2.cols,
    };
    let mut out = DenseMatrix::zeros(rows, cols);
    out.product(trans1, trans2, T::one(), &a, &b, T::zero());
    let data = Res::new(MatMul {
        m1: m1.clone(),
        m2: m2.clone(),
        m1_out: a.data,
        m2_out: b.data,
        trans1,
        trans2,
        out: out.data,
        vars: m1.data.vars().merge(&m2.data.vars()),
    });
    Ok(Matrix { data, rows, cols })
}

/// Batch of equally shaped row-major matrices stored back to back.
#[derive(Debug, Clone)]
pub struct MatrixBatch<T: Scalar> {
    pub data: Res<T>,
    pub num: usize,
    pub rows: usize,
    pub cols: usize,
}

impl<T: Scalar> MatrixBatch<T> {
    /// # Errors
    ///
    /// Returns `LengthMismatch` if `data.len() != num * rows * cols`.
    pub fn new(data: Res<T>, num: usize, rows: usize, cols: usize) -> Result<Self, DiffError> {
        let expected = num * rows * cols;
        if data.len() != expected {
            return Err(DiffError::LengthMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            num,
            rows,
            cols,
        })
    }

    pub fn dims(&self, trans: bool) -> (usize, usize) {
        if trans {
            (self.cols, self.rows)
        } else {
            (self.rows, self.cols)
        }
    }
}

#[derive(Debug)]
struct BatchedMatMul<T: Scalar> {
    m1: MatrixBatch<T>,
    m2: MatrixBatch<T>,
    m1_out: Vector<T>,
    m2_out: Vector<T>,
    trans1: bool,
    trans2: bool,
    out: Vector<T>,
    vars: VarSet,
}

impl<T: Scalar> Node<T> for BatchedMatMul<T> {
    fn output(&self) -> Vector<T> {
        self.out.clone()
    }

    fn vars(&self) -> VarSet {
        self.vars.clone()
    }

    fn propagate(&self, upstream: Vector<T>, grad: &mut Grad<T>) {
        let num = self.m1.num;
        let (out_rows, _) = self.m1.dims(self.trans1);
        let (_, out_cols) = self.m2.dims(self.trans2);
        let one = T::one();
        let (t1, t2) = (self.trans1, self.trans2);
        let (a, b, u) = (&self.m1_out, &self.m2_out, &upstream);
        if grad.intersects(&self.m1.data.vars()) {
            let (r, c) = (self.m1.rows, self.m1.cols);
            product_into(&self.m1.data, num * r, c, grad, |dst, beta| {
                if t1 {
                    linalg::batched_gemm(t2, true, num, r, c, out_cols, one, b, u, beta, &mut dst.data);
                } else {
                    linalg::batched_gemm(false, !t2, num, r, c, out_cols, one, u, b, beta, &mut dst.data);
                }
            });
        }
        if grad.intersects(&self.m2.data.vars()) {
            let (r, c) = (self.m2.rows, self.m2.cols);
            product_into(&self.m2.data, num * r, c, grad, |dst, beta| {
                if t2 {
                    linalg::batched_gemm(true, t1, num, r, c, out_rows, one, u, a, beta, &mut dst.data);
                } else {
                    linalg::batched_gemm(!t1, false, num, r, c, out_rows, one, a, u, beta, &mut dst.data);
                }
            });
        }
    }
}

/// Multiply corresponding matrices of two batches.
///
/// # Errors
///
/// Returns `LengthMismatch` if the batch sizes differ and
/// `MatrixDimension` if the inner dimensions differ.
pub fn batched_mat_mul<T: Scalar>(
    trans1: bool,
    trans2: bool,
    m1: &MatrixBatch<T>,
    m2: &MatrixBatch<T>,
) -> Result<MatrixBatch<T>, DiffError> {
    if m1.num != m2.num {
        return Err(DiffError::LengthMismatch {
            expected: m1.num,
            actual: m2.num,
        });
    }
    let (rows, inner1) = m1.dims(trans1);
    let (inner2, cols) = m2.dims(trans2);
    if inner1 != inner2 {
        return Err(DiffError::MatrixDimension {
            rows,
            cols: inner1,
            other_rows: inner2,
            other_cols: cols,
        });
    }
    let (a, b) = (m1.data.output(), m2.data.output());
    let mut out = Vector::zeros(m1.num * rows * cols);
    linalg::batched_gemm(
        trans1,
        trans2,
        m1.num,
        rows,
        cols,
        inner1,
        T::one(),
        &a,
        &b,
        T::zero(),
        &mut out,
    );
    let data = Res::new(BatchedMatMul {
        m1: m1.clone(),
        m2: m2.clone(),
        m1_out: a,
        m2_out: b,
        trans1,
        trans2,
        out,
        vars: m1.data.vars().merge(&m2.data.vars()),
    });
    Ok(MatrixBatch {
        data,
        num: m1.num,
        rows,
        cols,
    })
}

#[derive(Debug)]
struct SumRows<T: Scalar> {
    input: Res<T>,
    out: Vector<T>,
}

impl<T: Scalar> Node<T> for SumRows<T> {
    fn output(&self) -> Vector<T> {
        self.out.clone()
    }

    fn vars(&self) -> VarSet {
        self.input.vars()
    }

    fn propagate(&self, upstream: Vector<T>, grad: &mut Grad<T>) {
        let mut down = Vector::zeros(self.input.len());
        chunks::add_repeated(&mut down, &upstream);
        self.input.propagate(down, grad);
    }
}

/// Sum of the rows of `m`, a vector of length `m.cols`.
pub fn sum_rows<T: Scalar>(m: &Matrix<T>) -> Res<T> {
    Res::new(SumRows {
        input: m.data.clone(),
        out: chunks::sum_rows(&m.data.output(), m.cols),
    })
}

#[derive(Debug)]
struct SumCols<T: Scalar> {
    input: Res<T>,
    out: Vector<T>,
}

impl<T: Scalar> Node<T> for SumCols<T> {
    fn output(&self) -> Vector<T> {
        self.out.clone()
    }

    fn vars(&self) -> VarSet {
        self.input.vars()
    }

    fn propagate(&self, upstream: Vector<T>, grad: &mut Grad<T>) {
        let mut down = Vector::zeros(self.input.len());
        chunks::add_chunks(&mut down, &upstream);
        self.input.propagate(down, grad);
    }
}

/// Sum of the columns of `m`, a vector of length `m.rows`.
pub fn sum_cols<T: Scalar>(m: &Matrix<T>) -> Res<T> {
    Res::new(SumCols {
        input: m.data.clone(),
        out: chunks::sum_cols(&m.data.output(), m.rows),
    })
}

#[derive(Debug)]
struct Transpose<T: Scalar> {
    input: Res<T>,
    cols: usize,
    out: Vector<T>,
}

impl<T: Scalar> Node<T> for Transpose<T> {
    fn output(&self) -> Vector<T> {
        self.out.clone()
    }

    fn vars(&self) -> VarSet {
        self.input.vars()
    }

    fn propagate(&self, upstream: Vector<T>, grad: &mut Grad<T>) {
        self.input
            .propagate(linalg::transpose(&upstream, self.cols), grad);
    }
}

/// Transpose of `m`.
pub fn transpose<T: Scalar>(m: &Matrix<T>) -> Matrix<T> {
    let data = Res::new(Transpose {
        input: m.data.clone(),
        cols: m.cols,
        out: linalg::transpose(&m.data.output(), m.rows),
    });
    Matrix {
        data,
        rows: m.cols,
        cols: m.rows,
    }
}
