//! Variable identities and sets of them.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// Identity of a [`Var`](super::Var).
///
/// Two variables holding equal data still have distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) usize);

impl VarId {
    /// Get the internal index.
    pub fn index(&self) -> usize {
        self.0
    }

    /// Create a VarId for testing purposes.
    #[cfg(test)]
    pub(crate) fn new_for_test(index: usize) -> Self {
        Self(index)
    }
}

/// Set of variable identities.
///
/// Cloning is cheap: the underlying set is shared and only copied when
/// a clone is mutated.
#[derive(Clone, Default)]
pub struct VarSet {
    ids: Rc<HashSet<VarId>>,
}

impl VarSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set containing exactly `id`.
    pub fn singleton(id: VarId) -> Self {
        let mut ids = HashSet::with_capacity(1);
        ids.insert(id);
        Self { ids: Rc::new(ids) }
    }

    /// Union of `self` and `other`.
    ///
    /// Empty operands are shared rather than copied.
    pub fn merge(&self, other: &VarSet) -> VarSet {
        if other.is_empty() || Rc::ptr_eq(&self.ids, &other.ids) {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let (big, small) = if self.len() >= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        let mut out = big.clone();
        for id in small.iter() {
            out.add(id);
        }
        out
    }

    /// Union of every set in `sets`.
    pub fn merge_all<'a>(sets: impl IntoIterator<Item = &'a VarSet>) -> VarSet {
        sets.into_iter()
            .fold(VarSet::new(), |acc, set| acc.merge(set))
    }

    pub fn add(&mut self, id: VarId) {
        if !self.has(id) {
            Rc::make_mut(&mut self.ids).insert(id);
        }
    }

    /// Remove `id`; a no-op if it is absent.
    pub fn del(&mut self, id: VarId) {
        if self.has(id) {
            Rc::make_mut(&mut self.ids).remove(&id);
        }
    }

    pub fn has(&self, id: VarId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = VarId> + '_ {
        self.ids.iter().copied()
    }
}

impl PartialEq for VarSet {
    fn eq(&self, other: &Self) -> bool {
        self.ids == other.ids
    }
}

impl Eq for VarSet {}

impl fmt::Debug for VarSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.iter().map(|id| id.0).collect();
        ids.sort_unstable();
        f.debug_set().entries(ids).finish()
    }
}

impl FromIterator<VarId> for VarSet {
    fn from_iter<I: IntoIterator<Item = VarId>>(iter: I) -> Self {
        Self {
            ids: Rc::new(iter.into_iter().collect()),
        }
    }
}
