//! Reverse-mode computation graph.
//!
//! Every differentiable operation builds a [`Node`]: the forward value is
//! computed eagerly and `propagate` pushes an upstream gradient back into a
//! [`Grad`] accumulator. [`VarSet`]s carried by each node let propagation
//! skip subgraphs that touch none of the variables being differentiated.
//!
//! # Example
//!
//! ```
//! use vecdiff::{Grad, Var, Vector, ops};
//!
//! let x = Var::new(Vector::<f64>::from_f64s(&[1.0, 2.0]));
//! let y = ops::mul(&x.to_res(), &x.to_res()).unwrap();
//!
//! let mut g = Grad::new(&[x.clone()]);
//! y.propagate(Vector::from_f64s(&[1.0, 1.0]), &mut g);
//! assert_eq!(g.get(&x).unwrap().as_slice(), &[2.0, 4.0]);
//! ```

mod grad;
mod multi;
mod pool;
mod res;
mod var;
mod varset;

pub use grad::Grad;
pub use multi::{MultiNode, MultiRes, fuse, fuse_multi, pool_multi, unfuse};
pub use pool::pool;
pub use res::{Node, Res};
pub use var::{Const, Var};
pub use varset::{VarId, VarSet};
