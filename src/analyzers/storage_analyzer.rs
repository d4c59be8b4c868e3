use crate::error::{ProcessingError, Result};
use crate::models::{ObservationTable, StorageUnit};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub total_records: usize,
    pub first_observation: NaiveDateTime,
    pub last_observation: NaiveDateTime,
    pub observation_types: Vec<String>,
    pub file_types: Vec<String>,
    pub total_kb: f64,
    pub per_type_kb: BTreeMap<String, f64>,
}

impl DatasetSummary {
    /// Largest unit in which the total is still at least 1
    pub fn preferred_unit(&self) -> StorageUnit {
        StorageUnit::ALL
            .iter()
            .rev()
            .copied()
            .find(|u| u.scale(self.total_kb) >= 1.0)
            .unwrap_or(StorageUnit::KB)
    }

    pub fn detailed_summary(&self) -> String {
        let unit = self.preferred_unit();
        let mut out = format!(
            "Storage Dataset Summary:\n\
            - Files: {}\n\
            - Observation period: {} to {}\n\
            - Observation types: {}\n\
            - File types: {}\n\
            - Total stored: {:.2} {}",
            self.total_records,
            self.first_observation,
            self.last_observation,
            self.observation_types.len(),
            self.file_types.join(", "),
            unit.scale(self.total_kb),
            unit
        );

        out.push_str("\n\nPer observation type:");
        for (observation_type, kb) in &self.per_type_kb {
            let share = if self.total_kb > 0.0 {
                kb / self.total_kb * 100.0
            } else {
                0.0
            };
            out.push_str(&format!(
                "\n  {:<10} {:>14.2} {}  ({:.1}%)",
                observation_type,
                unit.scale(*kb),
                unit,
                share
            ));
        }

        out
    }
}

pub struct StorageAnalyzer;

impl StorageAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn summarize(&self, table: &ObservationTable) -> Result<DatasetSummary> {
        let (first_observation, last_observation) = table
            .observation_bounds()
            .ok_or_else(|| ProcessingError::MissingData("No records to analyze".to_string()))?;

        let mut observation_types = BTreeSet::new();
        let mut file_types = BTreeSet::new();
        let mut per_type_kb: BTreeMap<String, f64> = BTreeMap::new();
        let mut total_kb = 0.0;

        for record in table.records() {
            observation_types.insert(record.observation_type.clone());
            file_types.insert(record.file_type.clone());
            *per_type_kb
                .entry(record.observation_type.clone())
                .or_default() += record.download_size_kb;
            total_kb += record.download_size_kb;
        }

        Ok(DatasetSummary {
            total_records: table.len(),
            first_observation,
            last_observation,
            observation_types: observation_types.into_iter().collect(),
            file_types: file_types.into_iter().collect(),
            total_kb,
            per_type_kb,
        })
    }
}

impl Default for StorageAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}
