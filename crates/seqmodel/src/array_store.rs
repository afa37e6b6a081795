//! Concrete, owning sequence model.
//!
//! `ArrayStore<T>` is the only model that actually owns its items; every
//! other model in this crate derives its contents from one or more stores.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;

use seqmodel_core::logging::targets;
use seqmodel_core::{ModelError, Result, Signal};

use crate::traits::{assert_quiescent, ChangeEvent, SequenceModel};

/// A growable, mutable sequence model backed by a `Vec<T>`.
///
/// Every mutating operation updates the items first and then emits exactly
/// one [`ChangeEvent`] describing the net effect (or nothing at all for a
/// no-op), even when the operation touches several items.
///
/// # Example
///
/// ```
/// use seqmodel::{ArrayStore, SequenceModel, SequenceModelExt};
///
/// let store = ArrayStore::new();
/// store.append("apple");
/// store.append("cherry");
/// store.insert(1, "banana");
///
/// assert_eq!(store.to_vec(), vec!["apple", "banana", "cherry"]);
///
/// let _guard = store.on_changed(|event| println!("changed: {event}"));
/// store.splice(0, 2, ["date"]);
/// assert_eq!(store.len(), 2);
/// ```
pub struct ArrayStore<T> {
    items: RefCell<Vec<T>>,
    items_changed: Signal<ChangeEvent>,
}

impl<T: Clone + 'static> Default for ArrayStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> ArrayStore<T> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Creates an empty store with room for `capacity` items.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_vec(Vec::with_capacity(capacity))
    }

    /// Creates a store holding `items`. No event is emitted.
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            items: RefCell::new(items),
            items_changed: Signal::new(),
        }
    }

    /// Appends an item to the end of the store.
    ///
    /// Emits `(len, 0, 1)`.
    pub fn append(&self, item: T) {
        let len = self.len();
        self.splice(len, 0, [item]);
    }

    /// Appends every item of `items` with a single `(len, 0, k)` event.
    pub fn extend<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        let len = self.len();
        self.splice(len, 0, items);
    }

    /// Inserts an item at `position`.
    ///
    /// Emits `(position, 0, 1)`.
    ///
    /// # Panics
    ///
    /// Panics if `position > len()`.
    pub fn insert(&self, position: usize, item: T) {
        self.splice(position, 0, [item]);
    }

    /// Removes and returns the item at `position`.
    ///
    /// Emits `(position, 1, 0)`.
    ///
    /// # Panics
    ///
    /// Panics if `position >= len()`.
    pub fn remove(&self, position: usize) -> T {
        match self.splice(position, 1, []).pop() {
            Some(item) => item,
            None => unreachable!("splice removed exactly one item"),
        }
    }

    /// Removes every item.
    ///
    /// Equivalent to `splice(0, len(), [])`.
    pub fn remove_all(&self) {
        let len = self.len();
        self.splice(0, len, []);
    }

    /// Replaces `removed` items at `position` with `additions`.
    ///
    /// Returns the removed items. Emits one `(position, removed, added)`
    /// event, or nothing when both counts are zero.
    ///
    /// # Panics
    ///
    /// Panics if `position + removed > len()`, or if called from inside one
    /// of this store's own change handlers. Use
    /// [`try_splice`](Self::try_splice) to handle these cases.
    pub fn splice<I>(&self, position: usize, removed: usize, additions: I) -> Vec<T>
    where
        I: IntoIterator<Item = T>,
    {
        match self.try_splice(position, removed, additions) {
            Ok(items) => items,
            Err(err) => panic!("{err}"),
        }
    }

    /// Fallible form of [`splice`](Self::splice).
    ///
    /// The store is left untouched when an error is returned.
    pub fn try_splice<I>(&self, position: usize, removed: usize, additions: I) -> Result<Vec<T>>
    where
        I: IntoIterator<Item = T>,
    {
        if self.items_changed.is_emitting() {
            return Err(ModelError::ReentrantMutation);
        }

        // Collected up front: the iterator may itself read this store.
        let additions: Vec<T> = additions.into_iter().collect();
        let added = additions.len();

        let taken = {
            let mut items = self.items.borrow_mut();
            ModelError::check_range(position, removed, items.len())?;
            items
                .splice(position..position + removed, additions)
                .collect::<Vec<T>>()
        };

        let event = ChangeEvent::new(position, removed, added);
        if !event.is_empty() {
            tracing::trace!(target: targets::STORE, %event, "store changed");
            self.items_changed.emit(event);
        }
        Ok(taken)
    }

    /// Sorts the items with `compare`.
    ///
    /// Emits `(0, n, n)` when the store is not empty.
    ///
    /// # Panics
    ///
    /// Panics if called from inside one of this store's own change handlers.
    pub fn sort_by<F>(&self, compare: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        assert_quiescent(&self.items_changed);

        let len = {
            let mut items = self.items.borrow_mut();
            items.sort_by(compare);
            items.len()
        };

        if len > 0 {
            tracing::debug!(target: targets::STORE, len, "store sorted");
            self.items_changed.emit(ChangeEvent::new(0, len, len));
        }
    }

    /// Returns the position of the first item matching `predicate`.
    pub fn find_with<P>(&self, mut predicate: P) -> Option<usize>
    where
        P: FnMut(&T) -> bool,
    {
        self.items.borrow().iter().position(|item| predicate(item))
    }

    /// Returns a snapshot of all items.
    pub fn items(&self) -> Vec<T> {
        self.items.borrow().clone()
    }
}

impl<T: Clone + PartialEq + 'static> ArrayStore<T> {
    /// Returns the position of the first item equal to `item`.
    pub fn find(&self, item: &T) -> Option<usize> {
        self.find_with(|candidate| candidate == item)
    }
}

impl<T: Clone + 'static> SequenceModel for ArrayStore<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.items.borrow().len()
    }

    fn get(&self, position: usize) -> Option<T> {
        self.items.borrow().get(position).cloned()
    }

    fn items_changed(&self) -> &Signal<ChangeEvent> {
        &self.items_changed
    }
}

impl<T: Clone + 'static> From<Vec<T>> for ArrayStore<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl<T: Clone + 'static> FromIterator<T> for ArrayStore<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T: fmt::Debug> fmt::Debug for ArrayStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayStore")
            .field("items", &self.items.borrow())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_not_impl_any!(ArrayStore<u32>: Send, Sync);
