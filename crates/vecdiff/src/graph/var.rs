//! Leaf nodes: variables and constants.

use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::grad::Grad;
use super::res::{Node, Res};
use super::varset::{VarId, VarSet};
use crate::backend::Vector;
use crate::error::DiffError;
use crate::scalar::Scalar;

struct VarCell<T: Scalar> {
    value: RefCell<Vector<T>>,
    vars: OnceCell<VarSet>,
}

/// Differentiable leaf owning a vector.
///
/// Identity is the allocation, not the content: clones refer to the same
/// variable, while two `Var::new` calls on equal data give distinct keys.
pub struct Var<T: Scalar>(Rc<VarCell<T>>);

impl<T: Scalar> Clone for Var<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: Scalar> Var<T> {
    pub fn new(value: Vector<T>) -> Self {
        Self(Rc::new(VarCell {
            value: RefCell::new(value),
            vars: OnceCell::new(),
        }))
    }

    pub fn id(&self) -> VarId {
        VarId(Rc::as_ptr(&self.0) as *const () as usize)
    }

    /// Current value; shares storage until either side is written.
    pub fn value(&self) -> Vector<T> {
        self.0.value.borrow().clone()
    }

    pub fn set_value(&self, value: Vector<T>) {
        *self.0.value.borrow_mut() = value;
    }

    /// Mutate the value in place.
    pub fn update(&self, f: impl FnOnce(&mut Vector<T>)) {
        f(&mut self.0.value.borrow_mut());
    }

    pub fn len(&self) -> usize {
        self.0.value.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn component(&self, i: usize) -> Option<T> {
        self.0.value.borrow().get(i)
    }

    /// # Errors
    ///
    /// Returns `SliceOutOfRange` if `i` is past the end.
    pub fn set_component(&self, i: usize, x: T) -> Result<(), DiffError> {
        self.0.value.borrow_mut().set(i, x)
    }

    pub fn to_res(&self) -> Res<T> {
        Res::new(self.clone())
    }
}

impl<T: Scalar> fmt::Debug for Var<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Var")
            .field("id", &self.id().index())
            .field("len", &self.len())
            .finish()
    }
}

impl<T: Scalar> Node<T> for Var<T> {
    fn output(&self) -> Vector<T> {
        self.value()
    }

    fn vars(&self) -> VarSet {
        self.0.vars.get_or_init(|| VarSet::singleton(self.id())).clone()
    }

    fn propagate(&self, upstream: Vector<T>, grad: &mut Grad<T>) {
        if let Some(slot) = grad.get_mut(self) {
            *slot += &upstream;
        }
    }

    fn as_var(&self) -> Option<Var<T>> {
        Some(self.clone())
    }

    fn is_leaf(&self) -> bool {
        true
    }
}

/// Non-differentiable leaf; depends on no variables.
#[derive(Debug, Clone)]
pub struct Const<T: Scalar> {
    value: Vector<T>,
}

impl<T: Scalar> Const<T> {
    pub fn new(value: Vector<T>) -> Self {
        Self { value }
    }

    pub fn to_res(&self) -> Res<T> {
        Res::new(self.clone())
    }
}

impl<T: Scalar> Node<T> for Const<T> {
    fn output(&self) -> Vector<T> {
        self.value.clone()
    }

    fn vars(&self) -> VarSet {
        VarSet::new()
    }

    fn propagate(&self, _upstream: Vector<T>, _grad: &mut Grad<T>) {}

    fn is_leaf(&self) -> bool {
        true
    }
}

impl<T: Scalar> From<Var<T>> for Res<T> {
    fn from(v: Var<T>) -> Self {
        Res::new(v)
    }
}

impl<T: Scalar> From<&Var<T>> for Res<T> {
    fn from(v: &Var<T>) -> Self {
        v.to_res()
    }
}

impl<T: Scalar> From<Const<T>> for Res<T> {
    fn from(c: Const<T>) -> Self {
        Res::new(c)
    }
}
