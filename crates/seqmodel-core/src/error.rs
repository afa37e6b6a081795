//! Error types for seqmodel.
//!
//! Every error here describes a precondition violation. The infallible API
//! surface panics with the error's message; the `try_*` variants hand the
//! same value back to the caller instead.

/// Result type alias for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Signal-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignalError {
    /// A slot tried to connect to a signal while that signal was emitting.
    #[error("cannot connect to a signal while it is emitting")]
    ConnectDuringEmit,
}

/// Errors raised by sequence models.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A position or range reaches past the end of the model.
    #[error("range {position}+{count} is out of bounds for a model of length {len}")]
    RangeOutOfBounds {
        position: usize,
        count: usize,
        len: usize,
    },

    /// The model was mutated from inside one of its own change handlers.
    #[error("model mutated while it was notifying its observers")]
    ReentrantMutation,

    /// Signal-related error.
    #[error("signal error: {0}")]
    Signal(#[from] SignalError),
}

impl ModelError {
    /// Create a range error for `count` items starting at `position`.
    pub fn out_of_bounds(position: usize, count: usize, len: usize) -> Self {
        Self::RangeOutOfBounds {
            position,
            count,
            len,
        }
    }

    /// Checks that `position..position + count` lies within `0..len`.
    pub fn check_range(position: usize, count: usize, len: usize) -> Result<()> {
        match position.checked_add(count) {
            Some(end) if end <= len => Ok(()),
            _ => Err(Self::out_of_bounds(position, count, len)),
        }
    }
}
