//! Batched variable-length sequences.
//!
//! A sequence list is stored as one [`Batch`] per timestep. Each batch
//! packs the chunks of every sequence still running at that timestep, in
//! slot order, and carries a presence mask over all slots. Once a slot
//! drops out it never comes back, so timesteps only ever shrink.
//!
//! # Example
//!
//! ```
//! use vecdiff::{Grad, Var, Vector, ops};
//! use vecdiff::seq::{self, const_seq_list};
//!
//! let v = |x: f64| Vector::<f64>::from_f64s(&[x]);
//! let w = Var::new(v(2.0));
//! let s = const_seq_list(&[vec![v(1.0), v(3.0)], vec![v(5.0)]]).unwrap();
//! let scaled = seq::map(&s, |r, _| ops::scale_repeated(r, &w.to_res())).unwrap();
//! let total = seq::sum(&scaled).unwrap();
//! assert_eq!(total.output().as_slice(), &[18.0]);
//!
//! let mut g = Grad::new(&[w.clone()]);
//! total.propagate(v(1.0), &mut g);
//! assert_eq!(g.get(&w).unwrap().as_slice(), &[9.0]);
//! ```

mod aggregate;
mod batch;
mod creation;
mod map;
mod node;
mod pool;
mod reduce;
mod reverse;
mod tail;

pub use aggregate::{sum, sum_each};
pub use batch::{Batch, ResBatch, expand_batch, reduce_batch, validate_batches};
pub use creation::{const_seq, const_seq_list, res_seq, separate_seqs};
pub use map::{map, map_n};
pub use node::{Seq, SeqNode};
pub use pool::{pool, pool_from_vec, pool_to_vec};
pub use reduce::reduce;
pub use reverse::reverse;
pub use tail::tail;
