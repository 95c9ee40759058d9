//! Differentiable operations over [`Res`](crate::Res).
//!
//! Constructors validate shapes and return `Result` where a shape can be
//! wrong; the forward value is computed immediately. Operations that cannot
//! fail return the result directly.

mod mapper;
mod math;
mod matrix;
mod repeated;
mod slices;
mod vector_ops;

pub use mapper::{map, map_transpose};
pub use math::{
    abs, add_logs, clip_pos, complement, cos, elem_max, exp, log, log_sigmoid, log_softmax, pow,
    pow_by, sigmoid, sin, softplus, tanh,
};
pub use matrix::{
    Matrix, MatrixBatch, batched_mat_mul, mat_mul, sum_cols, sum_rows, transpose,
};
pub use repeated::{add_repeated, scale_add_repeated, scale_repeated};
pub use slices::{concat, slice};
pub use vector_ops::{add, add_scalar, div, mul, scale, square, sub, sum};

use crate::error::DiffError;
use crate::graph::Res;
use crate::scalar::Scalar;

fn check_same_len<T: Scalar>(a: &Res<T>, b: &Res<T>) -> Result<(), DiffError> {
    let (la, lb) = (a.len(), b.len());
    if la != lb {
        return Err(DiffError::LengthMismatch {
            expected: la,
            actual: lb,
        });
    }
    Ok(())
}

/// `divisor` must split `len` evenly; a zero divisor only splits zero.
fn check_divides(len: usize, divisor: usize) -> Result<(), DiffError> {
    let ok = if divisor == 0 {
        len == 0
    } else {
        len % divisor == 0
    };
    if !ok {
        return Err(DiffError::NotDivisible { len, divisor });
    }
    Ok(())
}
