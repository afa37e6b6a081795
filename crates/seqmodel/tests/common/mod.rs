//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use seqmodel::{ArrayStore, ChangeEvent, ConnectionGuard, ModelHandle, SequenceModel, SequenceModelExt};
use tracing_subscriber::EnvFilter;

/// Installs a test-writer subscriber once per test binary.
///
/// Set `RUST_LOG=seqmodel=trace` to see every forwarded event.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Records the events of one model and checks that each of them accounts
/// for the model's new length.
pub struct Recorder {
    events: Rc<RefCell<Vec<ChangeEvent>>>,
    _guard: ConnectionGuard<ChangeEvent>,
}

impl Recorder {
    pub fn attach<M: SequenceModel + ?Sized + 'static>(model: &Rc<M>) -> Self {
        let events = Rc::new(RefCell::new(Vec::new()));
        let len = Cell::new(model.len());
        let weak = Rc::downgrade(model);
        let recv = events.clone();
        let guard = model.on_changed(move |event| {
            if let Some(model) = weak.upgrade() {
                assert!(event.position + event.removed <= len.get());
                assert_eq!(event.len_after(len.get()), model.len(), "after {event}");
                len.set(model.len());
            }
            recv.borrow_mut().push(*event);
        });
        Self {
            events,
            _guard: guard,
        }
    }

    pub fn take(&self) -> Vec<ChangeEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

pub fn store(items: &[u32]) -> Rc<ArrayStore<u32>> {
    Rc::new(items.iter().copied().collect())
}

pub fn children(stores: &[&Rc<ArrayStore<u32>>]) -> Rc<ArrayStore<ModelHandle<u32>>> {
    Rc::new(
        stores
            .iter()
            .map(|store| -> ModelHandle<u32> { Rc::<ArrayStore<u32>>::clone(store) })
            .collect(),
    )
}
