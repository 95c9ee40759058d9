//! Graph node contract and the `Res` handle.

use std::fmt::{self, Debug};
use std::rc::Rc;

use super::grad::Grad;
use super::var::Var;
use super::varset::VarSet;
use crate::backend::Vector;
use crate::scalar::Scalar;

/// One differentiable result in the graph.
///
/// Each operation implements this trait. The output is computed when the
/// node is built; `propagate` applies one step of the chain rule and
/// recurses into the operands.
pub trait Node<T: Scalar>: Debug {
    /// Forward value.
    fn output(&self) -> Vector<T>;

    /// Variables this result depends on.
    fn vars(&self) -> VarSet;

    /// Back-propagate `upstream` (the gradient of some scalar with respect
    /// to this output) into `grad`.
    ///
    /// The node owns `upstream` and may use it as scratch space.
    fn propagate(&self, upstream: Vector<T>, grad: &mut Grad<T>);

    /// The variable itself, for `Var` leaves.
    fn as_var(&self) -> Option<Var<T>> {
        None
    }

    /// Whether this node is a `Var` or `Const`.
    fn is_leaf(&self) -> bool {
        false
    }
}

/// Shared handle to a graph node.
pub struct Res<T: Scalar>(Rc<dyn Node<T>>);

impl<T: Scalar> Clone for Res<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: Scalar> Res<T> {
    /// Wrap a node.
    pub fn new(node: impl Node<T> + 'static) -> Self {
        Self(Rc::new(node))
    }

    pub fn output(&self) -> Vector<T> {
        self.0.output()
    }

    pub fn vars(&self) -> VarSet {
        self.0.vars()
    }

    pub fn propagate(&self, upstream: Vector<T>, grad: &mut Grad<T>) {
        self.0.propagate(upstream, grad)
    }

    pub fn as_var(&self) -> Option<Var<T>> {
        self.0.as_var()
    }

    pub fn is_leaf(&self) -> bool {
        self.0.is_leaf()
    }

    /// Length of the output.
    pub fn len(&self) -> usize {
        self.0.output().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Scalar> Debug for Res<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
