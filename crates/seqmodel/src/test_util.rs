//! Shared helpers for unit tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use seqmodel_core::{ConnectionGuard, Signal};

use crate::array_store::ArrayStore;
use crate::traits::{ChangeEvent, ModelHandle, SequenceModel, SequenceModelExt};

/// Records every change event a model emits.
pub(crate) struct EventLog {
    events: Rc<RefCell<Vec<ChangeEvent>>>,
    _guard: ConnectionGuard<ChangeEvent>,
}

impl EventLog {
    pub(crate) fn attach<M: SequenceModel + ?Sized>(model: &M) -> Self {
        let events = Rc::new(RefCell::new(Vec::new()));
        let recv = events.clone();
        let guard = model.on_changed(move |event| recv.borrow_mut().push(*event));
        Self {
            events,
            _guard: guard,
        }
    }

    /// Like [`attach`](Self::attach), but also asserts on every event that
    /// the model's new length matches `len_before - removed + added`.
    pub(crate) fn attach_checked<M: SequenceModel + ?Sized + 'static>(model: &Rc<M>) -> Self {
        let events = Rc::new(RefCell::new(Vec::new()));
        let len = Cell::new(model.len());
        let weak = Rc::downgrade(model);
        let recv = events.clone();
        let guard = model.on_changed(move |event| {
            if let Some(model) = weak.upgrade() {
                assert!(
                    event.position + event.removed <= len.get(),
                    "event {event} reaches past the old length {}",
                    len.get()
                );
                assert_eq!(
                    event.len_after(len.get()),
                    model.len(),
                    "event {event} does not account for the new length"
                );
                len.set(model.len());
            }
            recv.borrow_mut().push(*event);
        });
        Self {
            events,
            _guard: guard,
        }
    }

    pub(crate) fn take(&self) -> Vec<ChangeEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

pub(crate) fn store(items: &[u32]) -> Rc<ArrayStore<u32>> {
    Rc::new(ArrayStore::from_vec(items.to_vec()))
}

pub(crate) fn handle(store: &Rc<ArrayStore<u32>>) -> ModelHandle<u32> {
    store.clone()
}

/// A minimal model that announces every push, even from inside its own
/// notifications.
pub(crate) struct Relay {
    items: RefCell<Vec<u32>>,
    items_changed: Signal<ChangeEvent>,
}

impl Relay {
    pub(crate) fn new(items: &[u32]) -> Rc<Self> {
        Rc::new(Self {
            items: RefCell::new(items.to_vec()),
            items_changed: Signal::new(),
        })
    }

    pub(crate) fn push(&self, item: u32) {
        let position = {
            let mut items = self.items.borrow_mut();
            items.push(item);
            items.len() - 1
        };
        self.items_changed.emit(ChangeEvent::new(position, 0, 1));
    }
}

impl SequenceModel for Relay {
    type Item = u32;

    fn len(&self) -> usize {
        self.items.borrow().len()
    }

    fn get(&self, position: usize) -> Option<u32> {
        self.items.borrow().get(position).copied()
    }

    fn items_changed(&self) -> &Signal<ChangeEvent> {
        &self.items_changed
    }
}
