//! Core systems for seqmodel.
//!
//! This crate provides the foundational pieces the sequence models are
//! built on:
//!
//! - **Signal/Slot System**: Single-threaded, synchronous observer lists
//! - **Errors**: Typed precondition failures shared by every model
//! - **Logging**: `tracing` target names per subsystem
//!
//! # Signal/Slot Example
//!
//! ```
//! use seqmodel_core::Signal;
//!
//! // Create a signal that notifies when a value changes
//! let value_changed = Signal::<i32>::new();
//!
//! // Connect a slot to handle the signal
//! let conn_id = value_changed.connect(|value| {
//!     println!("Value changed to: {}", value);
//! });
//!
//! // Emit the signal
//! value_changed.emit(42);
//!
//! // Disconnect when done
//! value_changed.disconnect(conn_id);
//! ```

mod error;
pub mod logging;
pub mod signal;

pub use error::{ModelError, Result, SignalError};
pub use signal::{ConnectionGuard, ConnectionId, Signal};
