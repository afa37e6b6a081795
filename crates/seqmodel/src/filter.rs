//! Filtering of a source model.
//!
//! `FilterModel` wraps a source model and presents only the items accepted
//! by a predicate, translating source events into the filtered index space.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use seqmodel_core::logging::targets;
use seqmodel_core::{ConnectionGuard, Signal};

use crate::traits::{assert_quiescent, ChangeEvent, ModelHandle, SequenceModel, SequenceModelExt};

/// Type alias for a filter function.
///
/// Returns `true` if the item should be included, `false` to filter it out.
pub type FilterFn<T> = Rc<dyn Fn(&T) -> bool>;

/// A model presenting the items of its source that pass a filter.
///
/// Without a filter every item passes. A source event `(pos, r, a)` becomes
/// `(matches before pos, matches among the r removed, matches among the a
/// added)` and is only emitted when one of the two counts is non-zero.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use seqmodel::{ArrayStore, FilterModel, SequenceModel, SequenceModelExt};
///
/// let source = Rc::new(ArrayStore::from_vec(vec![1, 2, 3, 4, 5, 6]));
/// let even = FilterModel::new(source.clone()).with_filter(|n: &i32| n % 2 == 0);
///
/// assert_eq!(even.to_vec(), vec![2, 4, 6]);
/// source.append(8);
/// assert_eq!(even.len(), 4);
/// ```
pub struct FilterModel<T: Clone + 'static> {
    source: ModelHandle<T>,
    filter: RefCell<Option<FilterFn<T>>>,
    /// Sorted source positions of the items that pass the filter.
    matches: RefCell<Vec<usize>>,
    _connection: ConnectionGuard<ChangeEvent>,
    items_changed: Signal<ChangeEvent>,
}

impl<T: Clone + 'static> FilterModel<T> {
    /// Creates a filter model over `source` that accepts every item.
    ///
    /// # Panics
    ///
    /// Panics if `source` is currently notifying its observers.
    pub fn new(source: ModelHandle<T>) -> Rc<Self> {
        Rc::new_cyclic(|this| {
            let this = this.clone();
            let connection = source.on_changed(move |event| {
                if let Some(this) = this.upgrade() {
                    Self::source_changed(&this, event);
                }
            });
            Self {
                matches: RefCell::new((0..source.len()).collect()),
                source,
                filter: RefCell::new(None),
                _connection: connection,
                items_changed: Signal::new(),
            }
        })
    }

    /// Sets a filter function, builder style.
    pub fn with_filter<F>(self: Rc<Self>, filter: F) -> Rc<Self>
    where
        F: Fn(&T) -> bool + 'static,
    {
        self.set_filter(filter);
        self
    }

    /// Returns the source model.
    pub fn source(&self) -> ModelHandle<T> {
        self.source.clone()
    }

    /// Returns `true` if a filter function is set.
    pub fn has_filter(&self) -> bool {
        self.filter.borrow().is_some()
    }

    /// Sets the filter function dynamically and refilters.
    pub fn set_filter<F>(&self, filter: F)
    where
        F: Fn(&T) -> bool + 'static,
    {
        assert_quiescent(&self.items_changed);
        *self.filter.borrow_mut() = Some(Rc::new(filter));
        self.refilter();
    }

    /// Clears the filter, showing all rows from the source model.
    pub fn clear_filter(&self) {
        assert_quiescent(&self.items_changed);
        *self.filter.borrow_mut() = None;
        self.refilter();
    }

    /// Re-evaluates the filter for every source item.
    ///
    /// Call this when state the filter depends on has changed. Emits one
    /// event spanning the first through the last changed position.
    pub fn refilter(&self) {
        assert_quiescent(&self.items_changed);
        let matches = self.compute_matches(0, self.source.len());
        let event = {
            let mut current = self.matches.borrow_mut();
            let old = std::mem::replace(&mut *current, matches);
            diff(&old, &current)
        };

        if !event.is_empty() {
            tracing::debug!(target: targets::FILTER, %event, "refiltered");
            self.items_changed.emit(event);
        }
    }

    /// Maps a filtered position to the position of the same item in the source.
    pub fn source_position(&self, position: usize) -> Option<usize> {
        self.matches.borrow().get(position).copied()
    }

    /// Source positions in `start..start + count` whose items pass the filter.
    fn compute_matches(&self, start: usize, count: usize) -> Vec<usize> {
        let filter = self.filter.borrow().clone();
        (start..start + count)
            .filter(|&position| match &filter {
                None => true,
                Some(filter) => self
                    .source
                    .get(position)
                    .is_some_and(|item| filter(&item)),
            })
            .collect()
    }

    fn source_changed(&self, event: &ChangeEvent) {
        assert_quiescent(&self.items_changed);
        let added = self.compute_matches(event.position, event.added);

        let filtered = {
            let mut matches = self.matches.borrow_mut();
            let start = matches.partition_point(|&source| source < event.position);
            let end = matches.partition_point(|&source| source < event.position + event.removed);
            for source in &mut matches[end..] {
                *source = *source - event.removed + event.added;
            }
            let added_count = added.len();
            matches.splice(start..end, added);
            ChangeEvent::new(start, end - start, added_count)
        };

        tracing::trace!(target: targets::FILTER, source = %event, %filtered, "source changed");
        if !filtered.is_empty() {
            self.items_changed.emit(filtered);
        }
    }
}

/// The single event turning `old` into `new`, spanning everything between
/// their common prefix and common suffix.
fn diff(old: &[usize], new: &[usize]) -> ChangeEvent {
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let limit = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(limit)
        .take_while(|(a, b)| a == b)
        .count();
    ChangeEvent::new(
        prefix,
        old.len() - prefix - suffix,
        new.len() - prefix - suffix,
    )
}

impl<T: Clone + 'static> SequenceModel for FilterModel<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.matches.borrow().len()
    }

    fn get(&self, position: usize) -> Option<T> {
        let source_position = self.source_position(position)?;
        self.source.get(source_position)
    }

    fn items_changed(&self) -> &Signal<ChangeEvent> {
        &self.items_changed
    }
}

impl<T: Clone + 'static> fmt::Debug for FilterModel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterModel")
            .field("len", &self.matches.borrow().len())
            .field("has_filter", &self.has_filter())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_not_impl_any!(FilterModel<u32>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{handle, store, EventLog, Relay};
    use std::cell::Cell;

    fn is_even(n: &u32) -> bool {
        n % 2 == 0
    }

    #[test]
    fn test_no_filter_passes_everything() {
        let source = store(&[1, 2, 3]);
        let filtered = FilterModel::new(handle(&source));

        assert!(!filtered.has_filter());
        assert_eq!(filtered.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_with_filter() {
        let source = store(&[1, 2, 3, 4, 5, 6]);
        let filtered = FilterModel::new(handle(&source)).with_filter(is_even);

        assert_eq!(filtered.to_vec(), vec![2, 4, 6]);
        assert_eq!(filtered.source_position(1), Some(3));
        assert_eq!(filtered.get(3), None);
    }

    #[test]
    fn test_source_changes_translate() {
        let source = store(&[1, 2, 3, 4, 5, 6]);
        let filtered = FilterModel::new(handle(&source)).with_filter(is_even);
        let log = EventLog::attach_checked(&filtered);

        // Replace 3, 4 with 8, 9, 10: one even removed, two added.
        source.splice(2, 2, [8, 9, 10]);
        // Odd item only: invisible.
        source.insert(0, 11);
        // Removing the head shifts nothing visible.
        source.remove(0);
        source.remove_all();

        assert_eq!(
            log.take(),
            vec![ChangeEvent::new(1, 1, 2), ChangeEvent::new(0, 4, 0)]
        );
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_positions_shift_after_splice() {
        let source = store(&[2, 4, 6]);
        let filtered = FilterModel::new(handle(&source)).with_filter(is_even);

        source.insert(1, 8);
        source.insert(0, 1);

        assert_eq!(filtered.to_vec(), vec![2, 8, 4, 6]);
        assert_eq!(filtered.source_position(0), Some(1));
        assert_eq!(filtered.source_position(3), Some(4));
    }

    #[test]
    fn test_set_filter_emits_minimal_span() {
        let source = store(&[1, 2, 3, 4, 5, 6]);
        let filtered = FilterModel::new(handle(&source));
        let log = EventLog::attach_checked(&filtered);

        filtered.set_filter(|n| *n != 3 && *n != 4);
        filtered.set_filter(|n| *n != 3 && *n != 4);
        filtered.clear_filter();

        assert_eq!(
            log.take(),
            vec![ChangeEvent::new(2, 2, 0), ChangeEvent::new(2, 0, 2)]
        );
    }

    #[test]
    fn test_refilter_after_external_change() {
        let threshold = Rc::new(Cell::new(3));
        let source = store(&[1, 2, 3, 4, 5]);
        let limit = threshold.clone();
        let filtered = FilterModel::new(handle(&source)).with_filter(move |n| *n <= limit.get());
        let log = EventLog::attach_checked(&filtered);

        threshold.set(5);
        filtered.refilter();
        threshold.set(1);
        filtered.refilter();

        assert_eq!(
            log.take(),
            vec![ChangeEvent::new(3, 0, 2), ChangeEvent::new(1, 4, 0)]
        );
        assert_eq!(filtered.to_vec(), vec![1]);
    }

    #[test]
    fn test_diff() {
        assert_eq!(diff(&[], &[]), ChangeEvent::new(0, 0, 0));
        assert_eq!(diff(&[1, 2, 3], &[1, 3]), ChangeEvent::new(1, 1, 0));
        assert_eq!(diff(&[1, 1], &[1, 1, 1]), ChangeEvent::new(2, 0, 1));
        assert_eq!(diff(&[0, 5], &[1, 4]), ChangeEvent::new(0, 2, 2));
    }

    #[test]
    #[should_panic(expected = "model mutated while it was notifying its observers")]
    fn test_nested_source_change_is_rejected() {
        let source = Relay::new(&[2]);
        let filtered = FilterModel::new(source.clone()).with_filter(is_even);
        let relay = source.clone();
        let _guard = filtered.on_changed(move |_| relay.push(6));

        source.push(4);
    }

    #[test]
    #[should_panic(expected = "model mutated while it was notifying its observers")]
    fn test_refilter_from_observer_is_rejected() {
        let source = store(&[1, 2]);
        let filtered = FilterModel::new(handle(&source));
        let weak = Rc::downgrade(&filtered);
        let _guard = filtered.on_changed(move |_| {
            if let Some(filtered) = weak.upgrade() {
                filtered.set_filter(is_even);
            }
        });

        source.append(3);
    }
}
