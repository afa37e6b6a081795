//! Item-by-item mapping of a source model.
//!
//! `MapModel` replaces every source item with the result of a mapping
//! function. Mapping to a [`ModelHandle`](crate::ModelHandle) and wrapping
//! the result in a [`FlattenModel`](crate::FlattenModel) turns each item into
//! a run of items, which is how trees are presented as flat lists.

use std::cell::RefCell;
use std::fmt;
use std::iter;
use std::rc::Rc;

use seqmodel_core::logging::targets;
use seqmodel_core::{ConnectionGuard, Signal};

use crate::traits::{assert_quiescent, ChangeEvent, ModelHandle, SequenceModel, SequenceModelExt};

/// Type alias for a mapping function.
pub type MapFn<S, U> = Rc<dyn Fn(&S) -> U>;

/// A model presenting `f(item)` for every item of its source.
///
/// Entries are computed lazily on first access and cached until their source
/// item is removed or the mapping function is replaced, so repeated `get`
/// calls for the same position return the same entry. Source events are
/// forwarded unchanged: mapping is strictly one to one.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use seqmodel::{ArrayStore, MapModel, SequenceModel, SequenceModelExt};
///
/// let source = Rc::new(ArrayStore::from_vec(vec![1, 2, 3]));
/// let squares = MapModel::new(source.clone(), |n: &i32| n * n);
///
/// assert_eq!(squares.to_vec(), vec![1, 4, 9]);
/// source.append(4);
/// assert_eq!(squares.get(3), Some(16));
/// ```
pub struct MapModel<S: Clone + 'static, U: Clone + 'static> {
    source: ModelHandle<S>,
    map_fn: RefCell<MapFn<S, U>>,
    /// One entry per source item; `None` until materialized.
    entries: RefCell<Vec<Option<U>>>,
    _connection: ConnectionGuard<ChangeEvent>,
    items_changed: Signal<ChangeEvent>,
}

impl<S: Clone + 'static, U: Clone + 'static> MapModel<S, U> {
    /// Creates a model mapping every item of `source` through `map_fn`.
    ///
    /// # Panics
    ///
    /// Panics if `source` is currently notifying its observers.
    pub fn new<F>(source: ModelHandle<S>, map_fn: F) -> Rc<Self>
    where
        F: Fn(&S) -> U + 'static,
    {
        Rc::new_cyclic(|this| {
            let this = this.clone();
            let connection = source.on_changed(move |event| {
                if let Some(this) = this.upgrade() {
                    Self::source_changed(&this, event);
                }
            });
            Self {
                entries: RefCell::new(vec![None; source.len()]),
                source,
                map_fn: RefCell::new(Rc::new(map_fn)),
                _connection: connection,
                items_changed: Signal::new(),
            }
        })
    }

    /// Returns the source model.
    pub fn source(&self) -> ModelHandle<S> {
        self.source.clone()
    }

    /// Replaces the mapping function.
    ///
    /// Every cached entry is discarded. Emits `(0, n, n)` when the model is
    /// not empty.
    pub fn set_map_fn<F>(&self, map_fn: F)
    where
        F: Fn(&S) -> U + 'static,
    {
        assert_quiescent(&self.items_changed);
        *self.map_fn.borrow_mut() = Rc::new(map_fn);

        let (len, discarded) = {
            let mut entries = self.entries.borrow_mut();
            let len = entries.len();
            let discarded = std::mem::replace(&mut *entries, vec![None; len]);
            (len, discarded)
        };
        drop(discarded);

        if len > 0 {
            tracing::debug!(target: targets::MAP, len, "map function replaced");
            self.items_changed.emit(ChangeEvent::new(0, len, len));
        }
    }

    /// Returns `true` if the entry at `position` has been computed and cached.
    pub fn is_materialized(&self, position: usize) -> bool {
        matches!(self.entries.borrow().get(position), Some(Some(_)))
    }

    fn source_changed(&self, event: &ChangeEvent) {
        assert_quiescent(&self.items_changed);
        let discarded: Vec<Option<U>> = {
            let mut entries = self.entries.borrow_mut();
            entries
                .splice(
                    event.position..event.position + event.removed,
                    iter::repeat_n(None, event.added),
                )
                .collect()
        };
        // Releases any subscriptions the removed entries held.
        drop(discarded);

        tracing::trace!(target: targets::MAP, %event, "forwarding source change");
        if !event.is_empty() {
            self.items_changed.emit(*event);
        }
    }
}

impl<S: Clone + 'static, U: Clone + 'static> SequenceModel for MapModel<S, U> {
    type Item = U;

    fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    fn get(&self, position: usize) -> Option<U> {
        match self.entries.borrow().get(position) {
            None => return None,
            Some(Some(entry)) => return Some(entry.clone()),
            Some(None) => {}
        }

        let item = self.source.get(position)?;
        let map_fn = self.map_fn.borrow().clone();
        let entry = map_fn(&item);

        let mut entries = self.entries.borrow_mut();
        match entries.get_mut(position) {
            Some(slot) => Some(slot.get_or_insert(entry).clone()),
            None => Some(entry),
        }
    }

    fn items_changed(&self) -> &Signal<ChangeEvent> {
        &self.items_changed
    }
}

impl<S: Clone + 'static, U: Clone + 'static> fmt::Debug for MapModel<S, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.borrow();
        f.debug_struct("MapModel")
            .field("len", &entries.len())
            .field(
                "materialized",
                &entries.iter().filter(|entry| entry.is_some()).count(),
            )
            .finish_non_exhaustive()
    }
}

static_assertions::assert_not_impl_any!(MapModel<u32, u32>: Send, Sync);
