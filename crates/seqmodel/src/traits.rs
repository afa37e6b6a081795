//! Core traits for sequence models.
//!
//! This module defines the read-plus-notify contract every model implements
//! and every composition layer consumes.

use std::fmt;
use std::rc::Rc;

use seqmodel_core::{ConnectionGuard, ModelError, Signal};

/// Describes one structural change of a sequence model.
///
/// At `position`, `removed` old items were replaced by `added` new items.
/// The event is emitted after the model has been updated, so `len()` and
/// `get()` already reflect the new state when observers run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChangeEvent {
    /// First affected position.
    pub position: usize,
    /// Number of items removed at `position`.
    pub removed: usize,
    /// Number of items added at `position`.
    pub added: usize,
}

impl ChangeEvent {
    /// Creates a new change event.
    pub const fn new(position: usize, removed: usize, added: usize) -> Self {
        Self {
            position,
            removed,
            added,
        }
    }

    /// Returns `true` if the event neither removes nor adds anything.
    pub const fn is_empty(&self) -> bool {
        self.removed == 0 && self.added == 0
    }

    /// The model length after applying this event to a model of `len_before` items.
    pub const fn len_after(&self, len_before: usize) -> usize {
        len_before - self.removed + self.added
    }
}

/// Formats as `position-removed+added`, e.g. `3-2+1`.
impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}+{}", self.position, self.removed, self.added)
    }
}

/// The core trait for sequence models.
///
/// A `SequenceModel` is an ordered, 0-indexed view of `len()` items together
/// with a change channel. Views and composition layers pull items with
/// [`get`](SequenceModel::get) and listen to
/// [`items_changed`](SequenceModel::items_changed) for updates.
///
/// # Implementation Requirements
///
/// - `get(i)` returns `None` for `i >= len()` and never panics.
/// - Emit exactly one [`ChangeEvent`] per contiguous affected region, after
///   the internal state is fully updated.
/// - Never hold an internal borrow while emitting; observers may call back
///   into the model.
pub trait SequenceModel {
    /// The item type handed out by [`get`](SequenceModel::get).
    type Item: Clone + 'static;

    /// Returns the number of items.
    fn len(&self) -> usize;

    /// Returns the item at `position`, or `None` when out of range.
    fn get(&self, position: usize) -> Option<Self::Item>;

    /// Returns the signal emitted after every structural change.
    fn items_changed(&self) -> &Signal<ChangeEvent>;

    /// Returns `true` if the model has no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Panics with [`ModelError::ReentrantMutation`] while `signal` is emitting.
///
/// Every model calls this before changing state in response to a mutation,
/// so a change can never start while observers are still handling the
/// previous one.
pub(crate) fn assert_quiescent(signal: &Signal<ChangeEvent>) {
    if signal.is_emitting() {
        panic!("{}", ModelError::ReentrantMutation);
    }
}

/// A shared, type-erased handle to a sequence model.
///
/// Composition layers hold their sources and children through this type.
pub type ModelHandle<T> = Rc<dyn SequenceModel<Item = T>>;

/// Convenience methods available on every [`SequenceModel`], including
/// trait objects.
pub trait SequenceModelExt: SequenceModel {
    /// Registers `handler` for change events.
    ///
    /// The handler stays connected until the returned guard is dropped.
    ///
    /// # Panics
    ///
    /// Panics if called while this model is notifying its observers.
    fn on_changed<F>(&self, handler: F) -> ConnectionGuard<ChangeEvent>
    where
        F: Fn(&ChangeEvent) + 'static,
    {
        self.items_changed().connect_scoped(handler)
    }

    /// Iterates over the current items by position.
    fn iter(&self) -> ModelIter<'_, Self> {
        ModelIter {
            model: self,
            position: 0,
        }
    }

    /// Collects the current items into a vector.
    fn to_vec(&self) -> Vec<Self::Item> {
        self.iter().collect()
    }
}

impl<M: SequenceModel + ?Sized> SequenceModelExt for M {}

/// Iterator over the items of a [`SequenceModel`].
///
/// Created by [`SequenceModelExt::iter`].
pub struct ModelIter<'a, M: ?Sized> {
    model: &'a M,
    position: usize,
}

impl<M: ?Sized> fmt::Debug for ModelIter<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelIter")
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

impl<M: SequenceModel + ?Sized> Iterator for ModelIter<'_, M> {
    type Item = M::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.model.get(self.position)?;
        self.position += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.model.len().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Fixed {
        items: Vec<u32>,
        items_changed: Signal<ChangeEvent>,
    }

    impl SequenceModel for Fixed {
        type Item = u32;

        fn len(&self) -> usize {
            self.items.len()
        }

        fn get(&self, position: usize) -> Option<u32> {
            self.items.get(position).copied()
        }

        fn items_changed(&self) -> &Signal<ChangeEvent> {
            &self.items_changed
        }
    }

    fn fixed(items: &[u32]) -> Fixed {
        Fixed {
            items: items.to_vec(),
            items_changed: Signal::new(),
        }
    }

    #[test]
    fn test_change_event() {
        let event = ChangeEvent::new(3, 2, 1);
        assert_eq!(event.to_string(), "3-2+1");
        assert_eq!(event.len_after(10), 9);
        assert!(!event.is_empty());
        assert!(ChangeEvent::new(5, 0, 0).is_empty());
    }

    #[test]
    fn test_iter_and_to_vec() {
        let model = fixed(&[1, 2, 3]);
        assert_eq!(model.iter().size_hint(), (3, Some(3)));
        assert_eq!(model.to_vec(), vec![1, 2, 3]);
        assert_eq!(model.get(3), None);
        assert!(!model.is_empty());
    }

    #[test]
    fn test_trait_object_extension() {
        let model: ModelHandle<u32> = Rc::new(fixed(&[4, 5]));
        let received = Rc::new(RefCell::new(Vec::new()));

        let recv = received.clone();
        let guard = model.on_changed(move |event| recv.borrow_mut().push(*event));
        model.items_changed().emit(ChangeEvent::new(0, 1, 1));
        drop(guard);
        model.items_changed().emit(ChangeEvent::new(1, 1, 0));

        assert_eq!(*received.borrow(), vec![ChangeEvent::new(0, 1, 1)]);
        assert_eq!(model.to_vec(), vec![4, 5]);
    }
}
