pub mod analyzers;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod processors;
pub mod readers;
pub mod utils;
pub mod writers;

pub use error::{ProcessingError, Result};
pub use models::{FilterParameters, ObservationRecord, ObservationTable, QueryResult};
pub use processors::{query, QueryEngine};
