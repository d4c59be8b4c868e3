pub mod filter;
pub mod observation;
pub mod query_result;

pub use filter::{DateRange, FilterParameters, FilterParametersBuilder, StorageUnit, SynopticTime};
pub use observation::{ObservationRecord, ObservationTable};
pub use query_result::{BreakdownRow, DetailRow, QueryResult, SeriesLine, SeriesPoint};
