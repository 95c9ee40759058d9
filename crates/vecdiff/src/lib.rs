//! vecdiff - reverse-mode automatic differentiation over vectors and
//! batched variable-length sequences.
//!
//! # Architecture
//!
//! ```text
//! Level 1: Sequence engine (seq module)
//!     → Batch/Seq, reduce, reverse, tail, sum, map, pool
//!
//! Level 2: Operation library (ops module)
//!     → elementwise math, repeated/chunked broadcast, matrix products
//!
//! Level 3: Graph engine (graph module)
//!     → Var, Res, Grad, pool, fuse
//!
//! Level 4: Numeric backend (backend module)
//!     → copy-on-write Vector, faer GEMM, mappers
//! ```
//!
//! # Example
//!
//! ```
//! use vecdiff::{Grad, Var, Vector, ops};
//!
//! // f(x, y) = sum(tanh(x) * y)
//! let x = Var::new(Vector::<f64>::from_f64s(&[0.0, 1.0]));
//! let y = Var::new(Vector::<f64>::from_f64s(&[2.0, 3.0]));
//! let f = ops::sum(&ops::mul(&ops::tanh(&x.to_res()), &y.to_res()).unwrap());
//!
//! let mut g = Grad::new(&[x.clone(), y.clone()]);
//! f.propagate(Vector::from_f64s(&[1.0]), &mut g);
//! assert_eq!(g.get(&x).unwrap().as_slice()[0], 2.0);
//! assert_eq!(g.get(&y).unwrap().as_slice()[0], 0.0);
//! ```

pub mod backend;
pub mod error;
#[cfg(feature = "gradcheck")]
pub mod gradcheck;
pub mod graph;
pub mod ops;
pub mod random;
pub mod scalar;
pub mod seq;

pub use backend::{Creator, IndexMapper, Mapper, Vector};
pub use error::DiffError;
pub use graph::{
    Const, Grad, MultiNode, MultiRes, Node, Res, Var, VarId, VarSet, fuse, fuse_multi, pool,
    pool_multi, unfuse,
};
pub use random::{Distribution, fill_random};
pub use scalar::{DType, FlatData, Scalar};
