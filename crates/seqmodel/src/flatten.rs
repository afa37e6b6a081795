//! Flattening of a model of models.
//!
//! `FlattenModel` presents a sequence whose items are themselves sequence
//! models as one flat sequence. It keeps a table of child lengths and their
//! starting offsets so that both lookups and change translation only touch
//! the children involved.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use seqmodel_core::logging::targets;
use seqmodel_core::{ConnectionGuard, Signal};
use slotmap::{new_key_type, SlotMap};

use crate::traits::{assert_quiescent, ChangeEvent, ModelHandle, SequenceModel, SequenceModelExt};

new_key_type! {
    /// Stable identity of one child slot, used by child subscriptions to find
    /// their slot again after the table has shifted.
    struct ChildKey;
}

/// A child model together with the subscription to its changes.
struct Child<T: Clone + 'static> {
    model: ModelHandle<T>,
    _connection: ConnectionGuard<ChangeEvent>,
}

/// One row of the offset table.
#[derive(Debug, Clone, Copy)]
struct Slot {
    key: ChildKey,
    start: usize,
    len: usize,
}

/// Per-child lengths with their prefix-sum starts.
///
/// `slots[k].start == sum(slots[..k].len)` holds whenever no method of the
/// table is running. Zero-length children keep their slot.
struct OffsetTable<T: Clone + 'static> {
    children: SlotMap<ChildKey, Child<T>>,
    slots: Vec<Slot>,
}

impl<T: Clone + 'static> OffsetTable<T> {
    fn new() -> Self {
        Self {
            children: SlotMap::with_key(),
            slots: Vec::new(),
        }
    }

    /// Total number of flat items.
    fn total(&self) -> usize {
        self.slots.last().map_or(0, |slot| slot.start + slot.len)
    }

    /// Flat position where slot `index` starts; the total for one past the end.
    fn start_of(&self, index: usize) -> usize {
        self.slots
            .get(index)
            .map_or_else(|| self.total(), |slot| slot.start)
    }

    /// Maps a flat position to `(slot index, local position)`.
    fn locate(&self, position: usize) -> Option<(usize, usize)> {
        if position >= self.total() {
            return None;
        }
        // The last slot starting at or before `position` is the non-empty one
        // containing it; empty slots sharing that start come earlier.
        let index = self.slots.partition_point(|slot| slot.start <= position) - 1;
        Some((index, position - self.slots[index].start))
    }

    fn index_of(&self, key: ChildKey) -> Option<usize> {
        self.slots.iter().position(|slot| slot.key == key)
    }

    fn model(&self, index: usize) -> Option<&ModelHandle<T>> {
        let slot = self.slots.get(index)?;
        self.children.get(slot.key).map(|child| &child.model)
    }

    /// Replaces `removed` slots at `index` with one slot per model.
    ///
    /// Returns `(removed flat length, added flat length, dropped children)`.
    /// The dropped children are handed back so the caller can release them
    /// after its borrow of the table ends.
    fn splice<S>(
        &mut self,
        index: usize,
        removed: usize,
        models: Vec<ModelHandle<T>>,
        mut subscribe: S,
    ) -> (usize, usize, Vec<Child<T>>)
    where
        S: FnMut(ChildKey, &ModelHandle<T>) -> ConnectionGuard<ChangeEvent>,
    {
        let mut added_len = 0;
        let mut new_slots = Vec::with_capacity(models.len());
        for model in models {
            let len = model.len();
            added_len += len;
            let key = self.children.insert_with_key(|key| Child {
                _connection: subscribe(key, &model),
                model,
            });
            new_slots.push(Slot { key, start: 0, len });
        }

        let old_slots: Vec<Slot> = self
            .slots
            .splice(index..index + removed, new_slots)
            .collect();

        let removed_len = old_slots.iter().map(|slot| slot.len).sum();
        let dropped = old_slots
            .iter()
            .filter_map(|slot| self.children.remove(slot.key))
            .collect();

        self.restart_from(index);
        (removed_len, added_len, dropped)
    }

    /// Recomputes starts from slot `index` onwards.
    fn restart_from(&mut self, index: usize) {
        let mut start = match index.checked_sub(1).and_then(|i| self.slots.get(i)) {
            Some(prev) => prev.start + prev.len,
            None => 0,
        };
        for slot in self.slots.iter_mut().skip(index) {
            slot.start = start;
            start += slot.len;
        }
    }

    /// Applies a child-local change to slot `index` and shifts every later
    /// start by the length delta. Returns the slot's start.
    fn resize(&mut self, index: usize, event: &ChangeEvent) -> usize {
        let slot = &mut self.slots[index];
        debug_assert!(
            event.position + event.removed <= slot.len,
            "child event {event} exceeds child length {}",
            slot.len
        );
        slot.len = event.len_after(slot.len);
        let start = slot.start;

        for later in self.slots.iter_mut().skip(index + 1) {
            later.start = later.start - event.removed + event.added;
        }
        start
    }
}

/// The source currently flattened, with the subscription to its changes.
struct SourceBinding<T: Clone + 'static> {
    model: ModelHandle<ModelHandle<T>>,
    _connection: ConnectionGuard<ChangeEvent>,
}

/// A model that concatenates the items of every child model of its source.
///
/// # Change translation
///
/// - When the source gains, loses or replaces children at `(pos, r, a)`, the
///   flat model emits one `(start of pos, flat length of the r children,
///   flat length of the a children)` event.
/// - When child `k` emits `(p, r, a)`, the flat model emits
///   `(start of k + p, r, a)` and shifts only the starts after `k`.
///
/// The offset table is fully updated before the flat event is emitted, so
/// observers always see `get()` results that agree with the event.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use seqmodel::{ArrayStore, FlattenModel, ModelHandle, SequenceModel, SequenceModelExt};
///
/// let fruits: ModelHandle<&str> = Rc::new(ArrayStore::from_vec(vec!["apple", "pear"]));
/// let veggies = Rc::new(ArrayStore::from_vec(vec!["leek"]));
/// let veggies_handle: ModelHandle<&str> = veggies.clone();
///
/// let source: ModelHandle<ModelHandle<&str>> =
///     Rc::new(ArrayStore::from_vec(vec![fruits, veggies_handle]));
/// let flat = FlattenModel::new(source);
/// assert_eq!(flat.to_vec(), vec!["apple", "pear", "leek"]);
///
/// veggies.append("kale");
/// assert_eq!(flat.len(), 4);
/// assert_eq!(flat.get(3), Some("kale"));
/// ```
pub struct FlattenModel<T: Clone + 'static> {
    this: Weak<Self>,
    source: RefCell<Option<SourceBinding<T>>>,
    table: RefCell<OffsetTable<T>>,
    items_changed: Signal<ChangeEvent>,
}

impl<T: Clone + 'static> FlattenModel<T> {
    /// Creates a flat view over `source`.
    ///
    /// No event is emitted for the initial contents.
    ///
    /// # Panics
    ///
    /// Panics if `source` or one of its children is currently notifying its
    /// observers.
    pub fn new(source: ModelHandle<ModelHandle<T>>) -> Rc<Self> {
        let model = Self::empty();
        // Initial contents are not announced.
        let (_old_len, _new_len) = model.rebind(Some(source));
        model
    }

    /// Creates a flat model without a source. It stays empty until
    /// [`set_source`](Self::set_source) is called.
    pub fn empty() -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            source: RefCell::new(None),
            table: RefCell::new(OffsetTable::new()),
            items_changed: Signal::new(),
        })
    }

    /// Returns the model being flattened.
    pub fn source(&self) -> Option<ModelHandle<ModelHandle<T>>> {
        self.source
            .borrow()
            .as_ref()
            .map(|binding| binding.model.clone())
    }

    /// Replaces the model being flattened.
    ///
    /// All child subscriptions are dropped and the table is rebuilt. Emits
    /// one `(0, old len, new len)` event unless both lengths are zero.
    pub fn set_source(&self, source: Option<ModelHandle<ModelHandle<T>>>) {
        assert_quiescent(&self.items_changed);
        let (removed, added) = self.rebind(source);
        let event = ChangeEvent::new(0, removed, added);
        if !event.is_empty() {
            tracing::debug!(target: targets::FLATTEN, %event, "flatten source replaced");
            self.items_changed.emit(event);
        }
    }

    /// Returns the child model holding the item at flat `position`.
    pub fn model_for_item(&self, position: usize) -> Option<ModelHandle<T>> {
        let table = self.table.borrow();
        let (index, _) = table.locate(position)?;
        table.model(index).cloned()
    }

    /// Number of children, including empty ones.
    pub fn child_count(&self) -> usize {
        self.table.borrow().slots.len()
    }

    /// Flat position where child `index` starts.
    pub fn child_offset(&self, index: usize) -> Option<usize> {
        self.table.borrow().slots.get(index).map(|slot| slot.start)
    }

    /// Swaps in `source`, rebuilding the table. Returns the old and new
    /// flat lengths.
    fn rebind(&self, source: Option<ModelHandle<ModelHandle<T>>>) -> (usize, usize) {
        let binding = source.map(|model| SourceBinding {
            _connection: self.subscribe_source(&model),
            model,
        });
        let models: Vec<ModelHandle<T>> = binding
            .as_ref()
            .map(|binding| binding.model.iter().collect())
            .unwrap_or_default();

        let (removed, added, dropped) = {
            let mut table = self.table.borrow_mut();
            let count = table.slots.len();
            table.splice(0, count, models, |key, model| self.subscribe_child(key, model))
        };
        let old_binding = self.source.replace(binding);

        drop(dropped);
        drop(old_binding);
        (removed, added)
    }

    fn subscribe_source(
        &self,
        source: &ModelHandle<ModelHandle<T>>,
    ) -> ConnectionGuard<ChangeEvent> {
        let this = self.this.clone();
        source.on_changed(move |event| {
            if let Some(this) = this.upgrade() {
                this.source_changed(event);
            }
        })
    }

    fn subscribe_child(
        &self,
        key: ChildKey,
        model: &ModelHandle<T>,
    ) -> ConnectionGuard<ChangeEvent> {
        let this = self.this.clone();
        model.on_changed(move |event| {
            if let Some(this) = this.upgrade() {
                this.child_changed(key, event);
            }
        })
    }

    fn source_changed(&self, event: &ChangeEvent) {
        assert_quiescent(&self.items_changed);
        let Some(source) = self.source() else {
            return;
        };
        let models: Vec<ModelHandle<T>> = (event.position..event.position + event.added)
            .filter_map(|position| source.get(position))
            .collect();

        let (position, removed, added, dropped) = {
            let mut table = self.table.borrow_mut();
            let position = table.start_of(event.position);
            let (removed, added, dropped) =
                table.splice(event.position, event.removed, models, |key, model| {
                    self.subscribe_child(key, model)
                });
            (position, removed, added, dropped)
        };
        drop(dropped);

        let flat = ChangeEvent::new(position, removed, added);
        tracing::trace!(target: targets::FLATTEN, source = %event, %flat, "source changed");
        if !flat.is_empty() {
            self.items_changed.emit(flat);
        }
    }

    fn child_changed(&self, key: ChildKey, event: &ChangeEvent) {
        if event.is_empty() {
            return;
        }
        assert_quiescent(&self.items_changed);
        let start = {
            let mut table = self.table.borrow_mut();
            let Some(index) = table.index_of(key) else {
                tracing::trace!(target: targets::FLATTEN, %event, "event from released child");
                return;
            };
            table.resize(index, event)
        };

        let flat = ChangeEvent::new(start + event.position, event.removed, event.added);
        tracing::trace!(target: targets::FLATTEN, child = %event, %flat, "child changed");
        self.items_changed.emit(flat);
    }
}

impl<T: Clone + 'static> SequenceModel for FlattenModel<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.table.borrow().total()
    }

    fn get(&self, position: usize) -> Option<T> {
        let (model, local) = {
            let table = self.table.borrow();
            let (index, local) = table.locate(position)?;
            (table.model(index)?.clone(), local)
        };
        model.get(local)
    }

    fn items_changed(&self) -> &Signal<ChangeEvent> {
        &self.items_changed
    }
}

impl<T: Clone + 'static> fmt::Debug for FlattenModel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.borrow();
        f.debug_struct("FlattenModel")
            .field("len", &table.total())
            .field("slots", &table.slots)
            .field("has_source", &self.source.borrow().is_some())
            .finish()
    }
}

static_assertions::assert_not_impl_any!(FlattenModel<u32>: Send, Sync);
