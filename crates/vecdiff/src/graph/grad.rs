//! Gradient accumulator.

use std::collections::HashMap;

use log::trace;

use super::var::Var;
use super::varset::{VarId, VarSet};
use crate::backend::Vector;
use crate::scalar::Scalar;

#[derive(Debug)]
struct Slot<T: Scalar> {
    var: Var<T>,
    grad: Vector<T>,
}

/// Container for accumulated gradients.
///
/// Holds one zero-initialized slot per variable of interest. Nodes only
/// propagate into subgraphs whose variables intersect the slot keys, and
/// leaves add their upstream into their own slot.
///
/// Pooling combinators insert temporary slots for internal variables and
/// remove them before their `propagate` returns; `pending_temporaries`
/// reports how many are outstanding so leaks can be asserted.
#[derive(Debug)]
pub struct Grad<T: Scalar> {
    slots: HashMap<VarId, Slot<T>>,
    temporaries: usize,
}

impl<T: Scalar> Grad<T> {
    /// Create zero slots for `vars`. Repeated variables share one slot.
    pub fn new(vars: &[Var<T>]) -> Self {
        let mut slots = HashMap::with_capacity(vars.len());
        for v in vars {
            slots.entry(v.id()).or_insert_with(|| Slot {
                var: v.clone(),
                grad: Vector::zeros(v.len()),
            });
        }
        Self {
            slots,
            temporaries: 0,
        }
    }

    /// Whether any slot key is in `set`.
    ///
    /// Iterates whichever side is smaller.
    pub fn intersects(&self, set: &VarSet) -> bool {
        if set.len() < self.slots.len() {
            set.iter().any(|id| self.slots.contains_key(&id))
        } else {
            self.slots.keys().any(|id| set.has(*id))
        }
    }

    pub fn get(&self, var: &Var<T>) -> Option<&Vector<T>> {
        self.slots.get(&var.id()).map(|s| &s.grad)
    }

    pub fn get_mut(&mut self, var: &Var<T>) -> Option<&mut Vector<T>> {
        self.slots.get_mut(&var.id()).map(|s| &mut s.grad)
    }

    pub fn contains(&self, var: &Var<T>) -> bool {
        self.slots.contains_key(&var.id())
    }

    /// Add a zero slot for an internal variable.
    pub fn insert_temporary(&mut self, var: &Var<T>) {
        trace!("grad: insert temporary slot {}", var.id().index());
        self.slots.insert(
            var.id(),
            Slot {
                var: var.clone(),
                grad: Vector::zeros(var.len()),
            },
        );
        self.temporaries += 1;
    }

    /// Remove a slot added by [`insert_temporary`](Self::insert_temporary)
    /// and return what was accumulated into it.
    pub fn remove_temporary(&mut self, var: &Var<T>) -> Vector<T> {
        trace!("grad: remove temporary slot {}", var.id().index());
        match self.slots.remove(&var.id()) {
            Some(slot) => {
                self.temporaries = self.temporaries.saturating_sub(1);
                slot.grad
            }
            None => Vector::zeros(var.len()),
        }
    }

    /// Number of temporary slots not yet removed.
    pub fn pending_temporaries(&self) -> usize {
        self.temporaries
    }

    /// Multiply every slot by `s`.
    pub fn scale(&mut self, s: T) {
        for slot in self.slots.values_mut() {
            slot.grad.scale(s);
        }
    }

    /// Add every slot into its variable's value.
    ///
    /// Scale by a negative step size first to take one descent step.
    pub fn add_to_vars(&self) {
        for slot in self.slots.values() {
            slot.var.update(|v| *v += &slot.grad);
        }
    }

    /// Set of variables that have a slot.
    pub fn vars(&self) -> VarSet {
        self.slots.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Var<T>, &Vector<T>)> {
        self.slots.values().map(|s| (&s.var, &s.grad))
    }
}
