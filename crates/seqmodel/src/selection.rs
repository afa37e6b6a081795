//! Selection over sequence models.
//!
//! [`SelectionModel`] extends [`SequenceModel`] with a set of selected
//! positions. The provided methods describe a selection that never changes;
//! [`PassthroughSelectionModel`] is the adapter that relies on them entirely,
//! wrapping any model with an always-empty selection.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::{Rc, Weak};

use seqmodel_core::logging::targets;
use seqmodel_core::{ConnectionGuard, Signal};

use crate::traits::{assert_quiescent, ChangeEvent, ModelHandle, SequenceModel, SequenceModelExt};

/// Emitted when the selection state of `n_items` positions starting at
/// `position` may have changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SelectionChanged {
    /// First position whose selection state may have changed.
    pub position: usize,
    /// Number of positions covered, starting at `position`.
    pub n_items: usize,
}

impl SelectionChanged {
    /// Creates an event covering `position..position + n_items`.
    pub const fn new(position: usize, n_items: usize) -> Self {
        Self { position, n_items }
    }
}

impl fmt::Display for SelectionChanged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.position, self.position + self.n_items)
    }
}

/// A sequence model that also tracks which of its positions are selected.
///
/// Mutating methods return `true` only if the selection actually changed, in
/// which case [`selection_changed`](Self::selection_changed) is emitted. The
/// provided implementations never change anything.
pub trait SelectionModel: SequenceModel {
    /// Signal emitted when the selection changes.
    fn selection_changed(&self) -> &Signal<SelectionChanged>;

    /// Returns `true` if the item at `position` is selected.
    fn is_selected(&self, position: usize) -> bool {
        let _ = position;
        false
    }

    /// Returns every selected position.
    fn selection(&self) -> BTreeSet<usize> {
        self.selection_in_range(0, self.len())
    }

    /// Returns the selected positions in `position..position + n_items`.
    fn selection_in_range(&self, position: usize, n_items: usize) -> BTreeSet<usize> {
        (position..position.saturating_add(n_items).min(self.len()))
            .filter(|&i| self.is_selected(i))
            .collect()
    }

    /// Selects the item at `position`, optionally unselecting everything else.
    fn select(&self, position: usize, unselect_rest: bool) -> bool {
        let _ = (position, unselect_rest);
        false
    }

    /// Unselects the item at `position`.
    fn unselect(&self, position: usize) -> bool {
        let _ = position;
        false
    }

    /// Selects `n_items` items starting at `position`, optionally unselecting
    /// everything else.
    fn select_range(&self, position: usize, n_items: usize, unselect_rest: bool) -> bool {
        let _ = (position, n_items, unselect_rest);
        false
    }

    /// Unselects `n_items` items starting at `position`.
    fn unselect_range(&self, position: usize, n_items: usize) -> bool {
        let _ = (position, n_items);
        false
    }

    /// Selects every item.
    fn select_all(&self) -> bool {
        false
    }

    /// Unselects every item.
    fn unselect_all(&self) -> bool {
        false
    }
}

struct ModelBinding<T: Clone + 'static> {
    model: ModelHandle<T>,
    _connection: ConnectionGuard<ChangeEvent>,
}

/// A selection model whose selection is always empty.
///
/// Length, items and change events come straight from the wrapped model.
/// Every selection request is refused: it returns `false` and no
/// [`SelectionChanged`] is ever emitted.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use seqmodel::{ArrayStore, PassthroughSelectionModel, SelectionModel, SequenceModel};
///
/// let store = Rc::new(ArrayStore::from_vec(vec!["a", "b", "c"]));
/// let selection = PassthroughSelectionModel::new(store);
///
/// assert!(!selection.select_all());
/// assert!(selection.selection().is_empty());
/// assert_eq!(selection.get(1), Some("b"));
/// ```
pub struct PassthroughSelectionModel<T: Clone + 'static> {
    this: Weak<Self>,
    binding: RefCell<ModelBinding<T>>,
    items_changed: Signal<ChangeEvent>,
    selection_changed: Signal<SelectionChanged>,
}

impl<T: Clone + 'static> PassthroughSelectionModel<T> {
    /// Wraps `model`.
    ///
    /// # Panics
    ///
    /// Panics if `model` is currently notifying its observers.
    pub fn new(model: ModelHandle<T>) -> Rc<Self> {
        Rc::new_cyclic(|this: &Weak<Self>| Self {
            binding: RefCell::new(Self::bind(this, model)),
            this: this.clone(),
            items_changed: Signal::new(),
            selection_changed: Signal::new(),
        })
    }

    /// Returns the wrapped model.
    pub fn model(&self) -> ModelHandle<T> {
        self.binding.borrow().model.clone()
    }

    /// Replaces the wrapped model, emitting `(0, old_len, new_len)`.
    ///
    /// # Panics
    ///
    /// Panics if `model` is currently notifying its observers.
    pub fn set_model(&self, model: ModelHandle<T>) {
        assert_quiescent(&self.items_changed);
        let binding = Self::bind(&self.this, model);
        let new_len = binding.model.len();

        let previous = std::mem::replace(&mut *self.binding.borrow_mut(), binding);
        let old_len = previous.model.len();
        drop(previous);

        let event = ChangeEvent::new(0, old_len, new_len);
        tracing::debug!(target: targets::SELECTION, %event, "model replaced");
        if !event.is_empty() {
            self.items_changed.emit(event);
        }
    }

    fn bind(this: &Weak<Self>, model: ModelHandle<T>) -> ModelBinding<T> {
        let this = this.clone();
        let connection = model.on_changed(move |event| {
            if let Some(this) = this.upgrade() {
                assert_quiescent(&this.items_changed);
                tracing::trace!(target: targets::SELECTION, %event, "forwarding model change");
                this.items_changed.emit(*event);
            }
        });
        ModelBinding {
            model,
            _connection: connection,
        }
    }
}

impl<T: Clone + 'static> SequenceModel for PassthroughSelectionModel<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.binding.borrow().model.len()
    }

    fn get(&self, position: usize) -> Option<T> {
        let model = self.model();
        model.get(position)
    }

    fn items_changed(&self) -> &Signal<ChangeEvent> {
        &self.items_changed
    }
}

impl<T: Clone + 'static> SelectionModel for PassthroughSelectionModel<T> {
    fn selection_changed(&self) -> &Signal<SelectionChanged> {
        &self.selection_changed
    }

    fn selection_in_range(&self, _position: usize, _n_items: usize) -> BTreeSet<usize> {
        BTreeSet::new()
    }
}

impl<T: Clone + 'static> fmt::Debug for PassthroughSelectionModel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PassthroughSelectionModel")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_not_impl_any!(PassthroughSelectionModel<u32>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{handle, store, EventLog, Relay};
    use std::cell::Cell;

    fn count_selection_events(
        model: &PassthroughSelectionModel<u32>,
    ) -> (Rc<Cell<usize>>, ConnectionGuard<SelectionChanged>) {
        let count = Rc::new(Cell::new(0));
        let recv = count.clone();
        let guard = model
            .selection_changed()
            .connect_scoped(move |_| recv.set(recv.get() + 1));
        (count, guard)
    }

    #[test]
    fn test_selection_changed_range() {
        let event = SelectionChanged::new(2, 3);
        assert_eq!((event.position, event.n_items), (2, 3));
        assert_eq!(event.to_string(), "2..5");
    }

    #[test]
    fn test_selection_requests_are_refused() {
        let source = store(&[1, 2, 3, 4]);
        let selection = PassthroughSelectionModel::new(handle(&source));
        let (count, _guard) = count_selection_events(&selection);

        for (position, n_items) in [(0, 0), (0, 4), (1, 2), (3, 10), (100, 1)] {
            assert!(!selection.select_range(position, n_items, false));
            assert!(!selection.select_range(position, n_items, true));
            assert!(!selection.unselect_range(position, n_items));
        }
        assert!(!selection.select(0, true));
        assert!(!selection.unselect(0));
        assert!(!selection.select_all());
        assert!(!selection.unselect_all());

        assert_eq!(count.get(), 0);
        assert!(selection.selection().is_empty());
        assert!((0..4).all(|i| !selection.is_selected(i)));
    }

    #[test]
    fn test_forwards_items_and_events() {
        let source = store(&[1, 2, 3]);
        let selection = PassthroughSelectionModel::new(handle(&source));
        let log = EventLog::attach_checked(&selection);

        source.splice(1, 1, [7, 8]);
        source.remove_all();

        assert_eq!(
            log.take(),
            vec![ChangeEvent::new(1, 1, 2), ChangeEvent::new(0, 4, 0)]
        );
        assert!(selection.is_empty());
    }

    #[test]
    fn test_never_selected_after_mutations() {
        let source = store(&[1, 2, 3]);
        let selection = PassthroughSelectionModel::new(handle(&source));

        source.append(4);
        selection.select_all();
        source.remove(0);
        source.insert(2, 9);

        assert_eq!(selection.to_vec(), vec![2, 3, 9, 4]);
        assert!((0..selection.len()).all(|i| !selection.is_selected(i)));
        assert!(selection.selection_in_range(0, 10).is_empty());
    }

    #[test]
    fn test_set_model() {
        let first = store(&[1, 2]);
        let second = store(&[5, 6, 7]);
        let selection = PassthroughSelectionModel::new(handle(&first));
        let log = EventLog::attach_checked(&selection);

        selection.set_model(handle(&second));
        first.append(3);
        second.append(8);

        assert_eq!(
            log.take(),
            vec![ChangeEvent::new(0, 2, 3), ChangeEvent::new(3, 0, 1)]
        );
        assert_eq!(first.items_changed().connection_count(), 0);
        assert!(Rc::ptr_eq(&selection.model(), &handle(&second)));
    }

    #[test]
    #[should_panic(expected = "model mutated while it was notifying its observers")]
    fn test_nested_model_change_is_rejected() {
        let model = Relay::new(&[]);
        let selection = PassthroughSelectionModel::new(model.clone());
        let relay = model.clone();
        let _guard = selection.on_changed(move |_| relay.push(2));

        model.push(1);
    }
}
