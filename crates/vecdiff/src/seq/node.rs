//! Sequence node contract and the `Seq` handle.

use std::fmt::{self, Debug};
use std::rc::Rc;

use super::batch::Batch;
use crate::backend::Creator;
use crate::graph::{Grad, VarSet};
use crate::scalar::Scalar;

/// A differentiable list of timesteps.
///
/// Same contract as [`Node`](crate::Node), one [`Batch`] per timestep.
/// Outputs never contain a timestep with no present sequence.
pub trait SeqNode<T: Scalar>: Debug {
    fn creator(&self) -> Creator<T> {
        Creator::new()
    }

    fn output(&self) -> &[Batch<T>];

    fn vars(&self) -> VarSet;

    /// Back-propagate one upstream batch per timestep. The node owns the
    /// batches and may reuse their buffers.
    fn propagate(&self, upstream: Vec<Batch<T>>, grad: &mut Grad<T>);
}

/// Shared handle to a [`SeqNode`].
pub struct Seq<T: Scalar>(Rc<dyn SeqNode<T>>);

impl<T: Scalar> Clone for Seq<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: Scalar> Seq<T> {
    pub fn new(node: impl SeqNode<T> + 'static) -> Self {
        Self(Rc::new(node))
    }

    pub fn creator(&self) -> Creator<T> {
        self.0.creator()
    }

    pub fn output(&self) -> &[Batch<T>] {
        self.0.output()
    }

    pub fn vars(&self) -> VarSet {
        self.0.vars()
    }

    pub fn propagate(&self, upstream: Vec<Batch<T>>, grad: &mut Grad<T>) {
        self.0.propagate(upstream, grad)
    }

    /// Number of timesteps.
    pub fn len(&self) -> usize {
        self.0.output().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.output().is_empty()
    }

    /// Number of sequence slots, or zero if there are no timesteps.
    pub fn num_slots(&self) -> usize {
        self.0.output().first().map_or(0, |b| b.present.len())
    }
}

impl<T: Scalar> Debug for Seq<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
