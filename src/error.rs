// SmartWake - Core Error Types

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WakeError {
    /// `peek` past the number of stored samples. Call sites should check `len()` first.
    #[error("index {index} out of range for ring buffer of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Storage for the history buffer could not be reserved.
    #[error("could not allocate history buffer of {capacity} samples")]
    AllocationFailure { capacity: usize },

    #[error("need {needed} buffered epochs, have {available}")]
    InsufficientData { needed: usize, available: usize },
}
