use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::{FilterParameters, ObservationRecord, StorageUnit};

/// A surviving record as it appears in the detail table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailRow {
    pub row_index: usize,
    pub observation_type: String,
    pub file_type: String,
    pub download_timestamp: NaiveDateTime,
    pub observation_timestamp: NaiveDateTime,
    pub download_size_kb: f64,
    pub scaled_size: f64,
    /// Download delay in seconds, local offset removed
    pub time_difference_secs: i64,
}

impl DetailRow {
    pub fn from_record(record: &ObservationRecord, unit: StorageUnit) -> Self {
        Self {
            row_index: record.row_index,
            observation_type: record.observation_type.clone(),
            file_type: record.file_type.clone(),
            download_timestamp: record.download_timestamp,
            observation_timestamp: record.observation_timestamp,
            download_size_kb: record.download_size_kb,
            scaled_size: unit.scale(record.download_size_kb),
            time_difference_secs: record.time_difference().num_seconds(),
        }
    }

    /// `D days HH:MM:SS`, negative delays prefixed with `-`
    pub fn format_time_difference(&self) -> String {
        let sign = if self.time_difference_secs < 0 { "-" } else { "" };
        let secs = self.time_difference_secs.unsigned_abs();
        format!(
            "{}{} days {:02}:{:02}:{:02}",
            sign,
            secs / 86_400,
            (secs % 86_400) / 3600,
            (secs % 3600) / 60,
            secs % 60
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

/// One plotted line: a single (observation type, file type) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesLine {
    pub observation_type: String,
    pub file_type: String,
    pub color: String,
    pub points: Vec<SeriesPoint>,
}

impl SeriesLine {
    pub fn total(&self) -> f64 {
        self.points.iter().map(|p| p.value).sum()
    }
}

/// One wedge of the proportional breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownRow {
    pub observation_type: String,
    pub size: f64,
    pub percentage: f64,
    /// Wedge angle in radians
    pub angle: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub parameters: FilterParameters,
    pub unit: StorageUnit,
    pub total: f64,
    pub detail: Vec<DetailRow>,
    pub series: Vec<SeriesLine>,
    pub breakdown: Vec<BreakdownRow>,
}

impl QueryResult {
    pub fn empty(parameters: FilterParameters) -> Self {
        Self {
            unit: parameters.unit,
            parameters,
            total: 0.0,
            detail: Vec::new(),
            series: Vec::new(),
            breakdown: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.detail.is_empty()
    }

    pub fn total_label(&self) -> String {
        format!("Total stored ({}): {:.2}", self.unit, self.total)
    }

    pub fn summary(&self) -> String {
        let mut out = format!(
            "{}\n- Matching files: {}\n- Synoptic time: {}\n- Period: {} to {}",
            self.total_label(),
            self.detail.len(),
            self.parameters.synoptic_time,
            self.parameters.date_range.start,
            self.parameters.date_range.end,
        );

        if !self.series.is_empty() {
            out.push_str("\n\nTime series:");
            for line in &self.series {
                out.push_str(&format!(
                    "\n  {}/{} ({}): {} points, {:.2} {}",
                    line.observation_type,
                    line.file_type,
                    line.color,
                    line.points.len(),
                    line.total(),
                    self.unit
                ));
            }
        }

        if !self.breakdown.is_empty() {
            out.push_str("\n\nRelative size (%):");
            for row in &self.breakdown {
                out.push_str(&format!(
                    "\n  {:<10} {:>14.2} {}  {:>6.2}%  {}",
                    row.observation_type, row.size, self.unit, row.percentage, row.color
                ));
            }
        }

        out
    }
}
