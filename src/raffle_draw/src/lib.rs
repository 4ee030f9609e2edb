#[macro_use]
extern crate serde;

pub mod config;
pub mod error;
pub mod ingest;
pub mod random;
pub mod report;
mod service;
pub mod types;

pub use crate::error::{DrawError, EntryFault, ExportError, RandomFault};
pub use crate::random::{ChaChaSource, ModuloSource, RandomSource, RngSource, SharedSource};
pub use crate::service::{
    aggregate, draw, draw_concurrent, select_winner, Aggregator, PrizePool, DEFAULT_TICKET_LIMIT,
};
pub use crate::types::*;
