pub mod batch_processor;
pub mod palette;
pub mod query_engine;

pub use batch_processor::{BatchProcessor, SynopticTotal};
pub use query_engine::{query, QueryEngine};
