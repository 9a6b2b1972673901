use thiserror::Error;

/// A `tmframe` Result, conveniently wrapping the [TmFrameError]
pub type Result<T> = std::result::Result<T, TmFrameError>;

#[derive(Error, Debug)]
/// Error types which can occur while building, serializing, or multiplexing
/// Transfer Frames.
///
/// `SizeMismatch`, `RangeViolation`, `QueueFull`, `QueueEmpty`, and
/// `CrcMismatch` are recoverable: the stage that raised them surfaces the
/// error to its caller without mutating its frame counter.
/// `SerializationError` and `InvariantViolation` indicate a configuration or
/// coding fault and abort the pipeline. `QueueClosed` unwinds cleanly to
/// termination.
pub enum TmFrameError {
    #[error("I/O error during frame encoding/decoding")]
    Io(#[from] std::io::Error),

    #[error("buffer length {actual} does not match expected field size {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("{field} value {value} exceeds its {bits}-bit field width")]
    RangeViolation {
        field: &'static str,
        value: u32,
        bits: u32,
    },

    #[error("bit-packer or CRC writer could not produce the required octets")]
    SerializationError,

    #[error("frame CRC mismatch: expected {expected:#06X}, computed {computed:#06X}")]
    CrcMismatch { expected: u16, computed: u16 },

    #[error("queue '{0}' is full")]
    QueueFull(&'static str),

    #[error("queue '{0}' is empty")]
    QueueEmpty(&'static str),

    #[error("queue '{0}' is closed")]
    QueueClosed(&'static str),

    #[error("invariant violation: {0}")]
    InvariantViolation(&'static str),
}
