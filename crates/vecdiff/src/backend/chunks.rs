//! Reductions and broadcasts over row-major packed matrices.
//!
//! A vector of length `rows * cols` is read as a row-major matrix. The
//! "repeated" operations broadcast a row across every row; the "chunk"
//! operations broadcast one scalar per row.

use crate::backend::vector::Vector;
use crate::scalar::Scalar;

fn assert_divides(len: usize, n: usize, what: &str) {
    assert!(
        (n == 0 && len == 0) || (n > 0 && len % n == 0),
        "{what}: {n} must divide vector length {len}"
    );
}

/// Sum the rows of a `? x cols` matrix, giving a vector of length `cols`.
///
/// # Panics
///
/// Panics if `cols` does not divide `v.len()`.
///
/// # Example
///
/// ```
/// use vecdiff::Vector;
/// use vecdiff::backend::chunks::sum_rows;
///
/// let m = Vector::<f64>::from_f64s(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
/// assert_eq!(sum_rows(&m, 3).as_slice(), &[5.0, 7.0, 9.0]);
/// ```
pub fn sum_rows<T: Scalar>(v: &Vector<T>, cols: usize) -> Vector<T> {
    assert_divides(v.len(), cols, "sum_rows");
    let mut out = vec![T::zero(); cols];
    if cols > 0 {
        for row in v.as_slice().chunks(cols) {
            for (o, &x) in out.iter_mut().zip(row) {
                *o = *o + x;
            }
        }
    }
    Vector::from_vec(out)
}

/// Sum the columns of a `rows x ?` matrix, giving a vector of length `rows`.
///
/// # Panics
///
/// Panics if `rows` does not divide `v.len()`.
pub fn sum_cols<T: Scalar>(v: &Vector<T>, rows: usize) -> Vector<T> {
    assert_divides(v.len(), rows, "sum_cols");
    if rows == 0 {
        return Vector::zeros(0);
    }
    let cols = v.len() / rows;
    let data = v.as_slice();
    Vector::from_vec(
        (0..rows)
            .map(|r| {
                data[r * cols..(r + 1) * cols]
                    .iter()
                    .fold(T::zero(), |acc, &x| acc + x)
            })
            .collect(),
    )
}

fn repeated_op<T: Scalar>(v: &mut Vector<T>, row: &Vector<T>, what: &str, f: impl Fn(T, T) -> T) {
    assert_divides(v.len(), row.len(), what);
    let row = row.as_slice();
    if row.is_empty() {
        return;
    }
    for chunk in v.as_mut_slice().chunks_mut(row.len()) {
        for (x, &r) in chunk.iter_mut().zip(row) {
            *x = f(*x, r);
        }
    }
}

fn chunk_op<T: Scalar>(v: &mut Vector<T>, scalars: &Vector<T>, what: &str, f: impl Fn(T, T) -> T) {
    assert_divides(v.len(), scalars.len(), what);
    if scalars.is_empty() {
        return;
    }
    let size = v.len() / scalars.len();
    if size == 0 {
        return;
    }
    let scalars = scalars.as_slice();
    for (chunk, &s) in v.as_mut_slice().chunks_mut(size).zip(scalars) {
        chunk.iter_mut().for_each(|x| *x = f(*x, s));
    }
}

/// Add `bias` to every `bias.len()`-sized row of `v`.
///
/// # Panics
///
/// Panics if `bias.len()` does not divide `v.len()`.
pub fn add_repeated<T: Scalar>(v: &mut Vector<T>, bias: &Vector<T>) {
    repeated_op(v, bias, "add_repeated", |a, b| a + b);
}

/// Multiply every `scalers.len()`-sized row of `v` by `scalers`.
///
/// # Panics
///
/// Panics if `scalers.len()` does not divide `v.len()`.
pub fn scale_repeated<T: Scalar>(v: &mut Vector<T>, scalers: &Vector<T>) {
    repeated_op(v, scalers, "scale_repeated", |a, b| a * b);
}

/// Add `scalars[i]` to every component of row `i`, where `v` has
/// `scalars.len()` rows.
///
/// # Panics
///
/// Panics if `scalars.len()` does not divide `v.len()`.
pub fn add_chunks<T: Scalar>(v: &mut Vector<T>, scalars: &Vector<T>) {
    chunk_op(v, scalars, "add_chunks", |a, b| a + b);
}

/// Multiply every component of row `i` by `scalers[i]`.
///
/// # Panics
///
/// Panics if `scalers.len()` does not divide `v.len()`.
pub fn scale_chunks<T: Scalar>(v: &mut Vector<T>, scalers: &Vector<T>) {
    chunk_op(v, scalers, "scale_chunks", |a, b| a * b);
}
