//! Numeric backend for the differentiation engine.
//!
//! This module provides the vector type every graph node computes with,
//! plus the primitive kernels the differentiable operations are built on.
//!
//! # Layout
//!
//! - `vector`: copy-on-write [`Vector`] with aliasing slices
//! - `creator`: [`Creator`] factory for vectors, numerics and mappers
//! - `math`: elementwise nonlinearities and chunked log-sum-exp
//! - `chunks`: row/column sums and broadcast add/scale
//! - `linalg`: GEMM/GEMV through faer on row-major buffers
//! - `mapper`: gather/scatter [`Mapper`]s
//!
//! Kernels in `chunks` and `linalg` panic on inconsistent shapes; the
//! graph operations validate shapes before calling them.

pub mod chunks;
mod creator;
pub mod linalg;
mod mapper;
pub mod math;
mod vector;

pub use creator::Creator;
pub use linalg::DenseMatrix;
pub use mapper::{IndexMapper, Mapper, map_max};
pub use vector::Vector;
