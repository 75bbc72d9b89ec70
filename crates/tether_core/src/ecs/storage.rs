// storage.rs - Sparse, index-addressed component storage
//
// One store per component type. Slot `i` belongs to the entity whose index
// is `i`. A slot is either empty or holds exactly one value, independently
// of its neighbours.

use std::any::Any;

/// Sparse column for a single component type.
///
/// Storage never relocates a populated slot: growth appends empty slots
/// (amortized doubling) and removal only empties a slot, it never shrinks
/// the container. A slot that was never written and a slot whose value was
/// removed are indistinguishable.
pub struct ComponentStore<T> {
    slots: Vec<Option<T>>,
    len: usize,
}

impl<T> ComponentStore<T> {
    /// Smallest capacity allocated on first growth.
    const MIN_CAPACITY: usize = 8;

    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            len: 0,
        }
    }

    /// Number of slots (populated or not) currently addressable.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of populated slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Grow so that `index` is addressable, back-filling with empty slots.
    fn ensure_index(&mut self, index: usize) {
        if index < self.slots.len() {
            return;
        }
        let doubled = (self.slots.len() * 2).max(Self::MIN_CAPACITY);
        let new_len = doubled.max(index + 1);
        self.slots.resize_with(new_len, || None);
    }

    /// Write `value` into slot `index`, returning the previous value if any.
    pub fn insert(&mut self, index: usize, value: T) -> Option<T> {
        self.ensure_index(index);
        let prev = self.slots[index].replace(value);
        if prev.is_none() {
            self.len += 1;
        }
        prev
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Empty slot `index`. Out-of-range or already-empty slots are a no-op.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        let taken = self.slots.get_mut(index).and_then(Option::take);
        if taken.is_some() {
            self.len -= 1;
        }
        taken
    }

    /// Populated slots in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (i, v)))
    }

    /// Indices of populated slots in storage order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.iter().map(|(i, _)| i)
    }
}

impl<T> Default for ComponentStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased view the World uses to clear an entity from every store.
pub(crate) trait ErasedStore: Any {
    fn erase(&mut self, index: usize) -> bool;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> ErasedStore for ComponentStore<T> {
    fn erase(&mut self, index: usize) -> bool {
        self.remove(index).is_some()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
