use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a draw. No partial result is ever returned alongside one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DrawError {
    /// An input entry failed validation
    #[error("invalid entry at index {index}: {fault}")]
    InvalidEntry { index: usize, fault: EntryFault },

    /// A prize reached selection without any pool slots
    #[error("internal invariant violated: prize {prize:?} has an empty pool")]
    EmptyPool { prize: String },

    /// The injected randomness source failed or misbehaved
    #[error("randomness source error: {0}")]
    RandomnessSource(RandomFault),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryFault {
    #[error("quantity must be a positive integer, got {0}")]
    NonPositiveQuantity(i64),

    #[error("prize name is empty")]
    EmptyPrize,

    #[error("buyer name is empty")]
    EmptyBuyer,

    #[error("ticket total for the prize overflows")]
    TicketOverflow,

    #[error("ticket total for the prize would exceed the limit of {limit}")]
    TicketLimit { limit: u64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RandomFault {
    #[error("drew {value}, expected a value below {bound}")]
    OutOfRange { value: u64, bound: u64 },

    #[error("range {bound} exceeds the {bits}-bit word range of the source")]
    RangeTooLarge { bound: u64, bits: u32 },

    #[error("modulo reduction over {bound} has bias {bias:e}, above the ceiling {ceiling:e}")]
    BiasTooHigh { bound: u64, bias: f64, ceiling: f64 },

    #[error("word width must be between 1 and 64 bits, got {0}")]
    InvalidWordWidth(u32),

    #[error("source has no more random words")]
    Exhausted,

    #[error("{0}")]
    Failed(String),
}

impl From<RandomFault> for DrawError {
    fn from(e: RandomFault) -> Self {
        DrawError::RandomnessSource(e)
    }
}

/// Errors raised by the collaborators around the engine: ingestion, export and config.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{}: {}", .path.display(), .source)]
    File {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("candid error: {0}")]
    Candid(#[from] candid::Error),

    #[error("line {line}: quantity {value:?} is not an integer")]
    Quantity { line: u64, value: String },

    #[error(transparent)]
    Draw(#[from] DrawError),
}
