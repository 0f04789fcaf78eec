//! Value slots for semantic actions
//!
//! Actions and predicates communicate through an index-addressed store of
//! values. Slots are addressed relative to the matcher's current base, so
//! inside a rule body slot 0 is the rule's result and slots 1, 2, ... line
//! up with the rule's sub-expressions. Reads of never-written slots yield
//! the value type's default.

use std::collections::BTreeMap;
use std::ops::{Index, IndexMut};

/// Slot storage. The dense variant is an auto-resizing vector; the sparse
/// variant backs the same interface with a map, for grammars that touch few
/// of their slot indices.
#[derive(Debug)]
pub struct SlotTable<V> {
    store: Store<V>,
    /// Pristine default handed out for reads of missing slots.
    vacant: V,
}

#[derive(Debug)]
enum Store<V> {
    Dense(Vec<V>),
    Sparse(BTreeMap<usize, V>),
}

impl<V: Default> SlotTable<V> {
    pub fn dense() -> Self {
        SlotTable {
            store: Store::Dense(Vec::new()),
            vacant: V::default(),
        }
    }

    pub fn sparse() -> Self {
        SlotTable {
            store: Store::Sparse(BTreeMap::new()),
            vacant: V::default(),
        }
    }

    pub fn get(&self, idx: usize) -> &V {
        match &self.store {
            Store::Dense(slots) => slots.get(idx).unwrap_or(&self.vacant),
            Store::Sparse(slots) => slots.get(&idx).unwrap_or(&self.vacant),
        }
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut V {
        match &mut self.store {
            Store::Dense(slots) => {
                if idx >= slots.len() {
                    slots.resize_with(idx + 1, V::default);
                }
                &mut slots[idx]
            }
            Store::Sparse(slots) => slots.entry(idx).or_default(),
        }
    }
}

/// One case of a sum-typed slot value. A host whose grammar stores values
/// of several types declares an enum and implements `Variant<T>` for each
/// payload type; [`Scope::val`] and [`Scope::set`] then read and write
/// slots by payload type, and a read of a slot holding a different case is
/// a kind-mismatch structural error.
///
/// The blanket identity impl makes the typed accessors work unchanged when
/// the slot type is a single plain type.
pub trait Variant<T>: Sized {
    fn from_value(value: T) -> Self;
    fn as_value(&self) -> Option<&T>;
    fn as_value_mut(&mut self) -> Option<&mut T>;
}

impl<T> Variant<T> for T {
    fn from_value(value: T) -> Self {
        value
    }

    fn as_value(&self) -> Option<&T> {
        Some(self)
    }

    fn as_value_mut(&mut self) -> Option<&mut T> {
        Some(self)
    }
}

/// The view handed to actions and predicates: the captured text active for
/// this call and slot access relative to the base frozen (for actions) or
/// current (for predicates) at the time of the call.
pub struct Scope<'m, V> {
    text: String,
    base: usize,
    slots: &'m mut SlotTable<V>,
}

impl<'m, V: Default> Scope<'m, V> {
    pub(crate) fn new(text: String, base: usize, slots: &'m mut SlotTable<V>) -> Self {
        Scope { text, base, slots }
    }

    /// The captured text this call sees: for a deferred action, the capture
    /// window at scheduling time; for a predicate, the live window.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Typed read of slot `idx`. Panics with a kind-mismatch error if the
    /// slot currently holds a different variant.
    pub fn val<T>(&mut self, idx: usize) -> &mut T
    where
        V: Variant<T>,
    {
        self.slots
            .get_mut(self.base + idx)
            .as_value_mut()
            .unwrap_or_else(|| panic!("slot {} holds a different kind of value", idx))
    }

    /// Typed write of slot `idx`.
    pub fn set<T>(&mut self, idx: usize, value: T)
    where
        V: Variant<T>,
    {
        *self.slots.get_mut(self.base + idx) = V::from_value(value);
    }
}

impl<V: Default> Index<usize> for Scope<'_, V> {
    type Output = V;

    fn index(&self, idx: usize) -> &V {
        self.slots.get(self.base + idx)
    }
}

impl<V: Default> IndexMut<usize> for Scope<'_, V> {
    fn index_mut(&mut self, idx: usize) -> &mut V {
        self.slots.get_mut(self.base + idx)
    }
}
