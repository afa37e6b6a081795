//! seqmodel - incremental, composable list models.
//!
//! A [`SequenceModel`] is an ordered, observable sequence of items. Every
//! structural change is announced with a single [`ChangeEvent`]
//! `(position, removed, added)`, so observers can update in place instead of
//! rebuilding.
//!
//! # Models
//!
//! - [`ArrayStore`]: the concrete, mutable backing store
//! - [`FlattenModel`]: concatenates a model of models into one sequence
//! - [`MapModel`]: maps every item through a function, lazily
//! - [`FilterModel`]: keeps the items that pass a predicate
//! - [`PassthroughSelectionModel`]: adds an always-empty selection
//!
//! Layers stack freely. Each holds its source strongly and subscribes to it
//! through a weak back-reference, so dropping the outermost layer tears the
//! whole chain of subscriptions down.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use seqmodel::{ArrayStore, FlattenModel, ModelHandle, SequenceModel, SequenceModelExt};
//!
//! let first: ModelHandle<u32> = Rc::new(ArrayStore::from_vec(vec![1, 2]));
//! let second = Rc::new(ArrayStore::from_vec(vec![3]));
//! let children = Rc::new(ArrayStore::from_vec(vec![first, second.clone()]));
//! let flat = FlattenModel::new(children);
//!
//! let _guard = flat.on_changed(|event| println!("changed: {event}"));
//! second.append(4);
//!
//! assert_eq!(flat.to_vec(), vec![1, 2, 3, 4]);
//! ```
//!
//! All models are single-threaded: they use `Rc` and `RefCell` and are
//! neither `Send` nor `Sync`.

mod array_store;
mod filter;
mod flatten;
mod map;
mod selection;
mod traits;

#[cfg(test)]
mod test_util;

pub use array_store::ArrayStore;
pub use filter::{FilterFn, FilterModel};
pub use flatten::FlattenModel;
pub use map::{MapFn, MapModel};
pub use selection::{PassthroughSelectionModel, SelectionChanged, SelectionModel};
pub use traits::{ChangeEvent, ModelHandle, ModelIter, SequenceModel, SequenceModelExt};

pub use seqmodel_core::logging;
pub use seqmodel_core::{ConnectionGuard, ConnectionId, ModelError, Result, Signal, SignalError};
