//! Signal/slot system for seqmodel.
//!
//! This module provides a type-safe observer list used by every sequence
//! model to announce its changes. Signals are emitted by a model after its
//! state changes, and connected slots (callbacks) are invoked in response.
//!
//! # Key Types
//!
//! - [`Signal<Args>`] - The signal type for emitting notifications
//! - [`ConnectionId`] - Unique identifier returned when connecting a slot
//! - [`ConnectionGuard`] - RAII guard that disconnects when dropped
//!
//! # Threading
//!
//! Signals are single-threaded. Every slot runs synchronously on the
//! emitter's call stack, in slot order, before [`Signal::emit`] returns.
//! `Signal<Args>` is neither `Send` nor `Sync`.
//!
//! # Reentrancy
//!
//! A slot may freely read any model and may disconnect connections (including
//! its own) while the signal is emitting. Connecting a new slot to a signal
//! that is currently emitting is rejected: [`Signal::try_connect`] returns
//! [`SignalError::ConnectDuringEmit`] and [`Signal::connect`] panics.
//!
//! # Example
//!
//! ```
//! use seqmodel_core::Signal;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let text_changed = Signal::<String>::new();
//! let seen = Rc::new(RefCell::new(Vec::new()));
//!
//! let seen_clone = seen.clone();
//! let conn_id = text_changed.connect(move |text| {
//!     seen_clone.borrow_mut().push(text.clone());
//! });
//!
//! text_changed.emit("Hello".to_string());
//! text_changed.disconnect(conn_id);
//! text_changed.emit("World".to_string());
//!
//! assert_eq!(*seen.borrow(), vec!["Hello".to_string()]);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use slotmap::{new_key_type, SlotMap};

use crate::error::SignalError;
use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a signal-slot connection.
    ///
    /// Use this ID to disconnect a specific connection via [`Signal::disconnect`].
    /// The ID remains valid until the connection is explicitly disconnected or
    /// the signal is dropped.
    pub struct ConnectionId;
}

type Slot<Args> = Rc<dyn Fn(&Args)>;

/// Shared state behind a [`Signal`], also reachable weakly from guards.
struct SignalInner<Args> {
    /// All active connections.
    connections: RefCell<SlotMap<ConnectionId, Slot<Args>>>,
    /// Whether signal emission is temporarily blocked.
    blocked: Cell<bool>,
    /// Emission depth; non-zero while slots are running.
    emitting: Cell<usize>,
}

/// Marks a signal as emitting for the lifetime of the scope.
///
/// Unwinds correctly when a slot panics.
struct EmitScope<'a>(&'a Cell<usize>);

impl<'a> EmitScope<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for EmitScope<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

/// A type-safe signal that can have multiple connected slots.
///
/// # Type Parameter
///
/// - `Args`: The argument type passed to connected slots. Use `()` for signals
///   with no arguments, or a struct/tuple for multiple values.
///
/// # Related Types
///
/// - [`ConnectionId`] - Returned by [`connect`](Self::connect), used to disconnect
/// - [`ConnectionGuard`] - RAII-style connection that auto-disconnects on drop
pub struct Signal<Args> {
    inner: Rc<SignalInner<Args>>,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args> fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.inner.connections.borrow().len())
            .field("blocked", &self.inner.blocked.get())
            .field("emitting", &(self.inner.emitting.get() > 0))
            .finish()
    }
}

impl<Args: 'static> Signal<Args> {
    /// Create a new signal with no connections.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SignalInner {
                connections: RefCell::new(SlotMap::with_key()),
                blocked: Cell::new(false),
                emitting: Cell::new(0),
            }),
        }
    }

    /// Connect a slot (closure) to this signal.
    ///
    /// Returns a `ConnectionId` that can be used to disconnect the slot later.
    ///
    /// # Panics
    ///
    /// Panics if the signal is currently emitting. Use
    /// [`try_connect`](Self::try_connect) to handle that case.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + 'static,
    {
        match self.try_connect(slot) {
            Ok(id) => id,
            Err(err) => panic!("{err}"),
        }
    }

    /// Connect a slot, failing if the signal is currently emitting.
    pub fn try_connect<F>(&self, slot: F) -> Result<ConnectionId, SignalError>
    where
        F: Fn(&Args) + 'static,
    {
        if self.is_emitting() {
            tracing::debug!(
                target: targets::SIGNAL,
                "rejected connection made while emitting"
            );
            return Err(SignalError::ConnectDuringEmit);
        }
        Ok(self.inner.connections.borrow_mut().insert(Rc::new(slot)))
    }

    /// Connect a slot with automatic disconnection when the guard is dropped.
    ///
    /// The guard only holds a weak reference to the signal, so it may outlive
    /// the signal safely.
    ///
    /// # Panics
    ///
    /// Panics if the signal is currently emitting.
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard<Args>
    where
        F: Fn(&Args) + 'static,
    {
        let id = self.connect(slot);
        ConnectionGuard {
            signal: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Disconnect a specific slot by its connection ID.
    ///
    /// Returns `true` if the connection was found and removed, `false` otherwise.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.inner.connections.borrow_mut().remove(id).is_some()
    }

    /// Disconnect all slots from this signal.
    pub fn disconnect_all(&self) {
        self.inner.connections.borrow_mut().clear();
    }

    /// Get the number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.inner.connections.borrow().len()
    }

    /// Block signal emission temporarily.
    ///
    /// While blocked, calls to `emit()` will do nothing.
    pub fn set_blocked(&self, blocked: bool) {
        self.inner.blocked.set(blocked);
    }

    /// Check if signal emission is currently blocked.
    pub fn is_blocked(&self) -> bool {
        self.inner.blocked.get()
    }

    /// Check if the signal is in the middle of invoking its slots.
    pub fn is_emitting(&self) -> bool {
        self.inner.emitting.get() > 0
    }

    /// Emit the signal, invoking all connected slots.
    ///
    /// If the signal is blocked, this does nothing. Slots disconnected by an
    /// earlier slot during this emission are skipped.
    #[tracing::instrument(skip_all, target = "seqmodel_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "signal blocked, skipping emit");
            return;
        }

        // Snapshot the IDs so slots can disconnect without invalidating the walk.
        let ids: Vec<ConnectionId> = self.inner.connections.borrow().keys().collect();
        tracing::trace!(target: targets::SIGNAL, connection_count = ids.len(), "emitting signal");

        let _scope = EmitScope::enter(&self.inner.emitting);
        for id in ids {
            let slot = self.inner.connections.borrow().get(id).cloned();
            if let Some(slot) = slot {
                slot(&args);
            }
        }
    }
}

/// A connection guard that automatically disconnects when dropped.
///
/// Created via [`Signal::connect_scoped`]. Models hold one guard per
/// upstream subscription, so dropping a model releases its subscriptions.
///
/// # Example
///
/// ```
/// use seqmodel_core::Signal;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let signal = Signal::<i32>::new();
/// let counter = Rc::new(Cell::new(0));
/// {
///     let counter_clone = counter.clone();
///     let _guard = signal.connect_scoped(move |&n| {
///         counter_clone.set(counter_clone.get() + n);
///     });
///     signal.emit(42);  // counter = 42
/// }
/// signal.emit(43);  // Nothing happens - connection was dropped
/// assert_eq!(counter.get(), 42);
/// ```
pub struct ConnectionGuard<Args> {
    signal: Weak<SignalInner<Args>>,
    id: ConnectionId,
}

impl<Args> ConnectionGuard<Args> {
    /// The ID of the guarded connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns `true` while both the signal and the connection exist.
    pub fn is_connected(&self) -> bool {
        self.signal
            .upgrade()
            .is_some_and(|inner| inner.connections.borrow().contains_key(self.id))
    }

    /// Disconnect now instead of waiting for the guard to drop.
    pub fn disconnect(self) {
        drop(self);
    }
}

impl<Args> fmt::Debug for ConnectionGuard<Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionGuard")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl<Args> Drop for ConnectionGuard<Args> {
    fn drop(&mut self) {
        if let Some(inner) = self.signal.upgrade() {
            let _ = inner.connections.borrow_mut().remove(self.id);
        }
    }
}

static_assertions::assert_not_impl_any!(Signal<()>: Send, Sync);
static_assertions::assert_not_impl_any!(ConnectionGuard<()>: Send, Sync);
