pub mod storage_analyzer;

pub use storage_analyzer::{DatasetSummary, StorageAnalyzer};
