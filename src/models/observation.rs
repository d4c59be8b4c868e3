use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;
use crate::utils::constants::LOCAL_UTC_OFFSET_HOURS;

/// One row of the storage table: a single downloaded observation file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ObservationRecord {
    /// Position of the row in the source file (0-based, data rows only)
    pub row_index: usize,

    #[validate(length(min = 1))]
    pub observation_type: String,

    #[validate(length(min = 1))]
    pub file_type: String,

    pub download_timestamp: NaiveDateTime,

    /// Synoptic time the file belongs to
    pub observation_timestamp: NaiveDateTime,

    #[validate(range(min = 0.0))]
    pub download_size_kb: f64,
}

impl ObservationRecord {
    pub fn new(
        row_index: usize,
        observation_type: String,
        file_type: String,
        download_timestamp: NaiveDateTime,
        observation_timestamp: NaiveDateTime,
        download_size_kb: f64,
    ) -> Result<Self> {
        let record = Self {
            row_index,
            observation_type,
            file_type,
            download_timestamp,
            observation_timestamp,
            download_size_kb,
        };

        record.validate()?;
        Ok(record)
    }

    /// Delay between the synoptic time and the download, corrected for the
    /// local offset the download clock runs on.
    pub fn time_difference(&self) -> Duration {
        (self.download_timestamp - self.observation_timestamp)
            - Duration::hours(LOCAL_UTC_OFFSET_HOURS)
    }

    pub fn observation_time_of_day(&self) -> NaiveTime {
        self.observation_timestamp.time()
    }
}

/// Immutable, loaded storage table. Shared between queries behind an `Arc`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ObservationTable {
    records: Vec<ObservationRecord>,
}

impl ObservationTable {
    pub fn new(records: Vec<ObservationRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[ObservationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest and latest observation timestamps, if any rows are loaded
    pub fn observation_bounds(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let first = self.records.first()?.observation_timestamp;
        Some(self.records.iter().fold((first, first), |(lo, hi), r| {
            (
                lo.min(r.observation_timestamp),
                hi.max(r.observation_timestamp),
            )
        }))
    }
}

impl From<Vec<ObservationRecord>> for ObservationTable {
    fn from(records: Vec<ObservationRecord>) -> Self {
        Self::new(records)
    }
}
