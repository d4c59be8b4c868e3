use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{ProcessingError, Result};

/// Display unit for download sizes. Sizes are stored in KB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageUnit {
    KB,
    MB,
    GB,
    TB,
    PB,
}

impl StorageUnit {
    pub const ALL: [StorageUnit; 5] = [
        StorageUnit::KB,
        StorageUnit::MB,
        StorageUnit::GB,
        StorageUnit::TB,
        StorageUnit::PB,
    ];

    /// Multiplier applied to a KB value: 1 for KB, 1/1024^n for the others
    /// with n = 2 (MB) through 5 (PB).
    pub fn factor(&self) -> f64 {
        match self {
            StorageUnit::KB => 1.0,
            StorageUnit::MB => 1.0 / 1024f64.powi(2),
            StorageUnit::GB => 1.0 / 1024f64.powi(3),
            StorageUnit::TB => 1.0 / 1024f64.powi(4),
            StorageUnit::PB => 1.0 / 1024f64.powi(5),
        }
    }

    pub fn scale(&self, size_kb: f64) -> f64 {
        size_kb * self.factor()
    }

    pub fn label(&self) -> &'static str {
        match self {
            StorageUnit::KB => "KB",
            StorageUnit::MB => "MB",
            StorageUnit::GB => "GB",
            StorageUnit::TB => "TB",
            StorageUnit::PB => "PB",
        }
    }
}

impl fmt::Display for StorageUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for StorageUnit {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "KB" => Ok(StorageUnit::KB),
            "MB" => Ok(StorageUnit::MB),
            "GB" => Ok(StorageUnit::GB),
            "TB" => Ok(StorageUnit::TB),
            "PB" => Ok(StorageUnit::PB),
            _ => Err(ProcessingError::UnknownUnit(s.to_string())),
        }
    }
}

/// Synoptic hour selection applied to the observation time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SynopticTime {
    H00,
    H06,
    H12,
    H18,
    H00And12,
    H06And18,
    AllFour,
}

impl SynopticTime {
    pub const ALL: [SynopticTime; 7] = [
        SynopticTime::H00,
        SynopticTime::H06,
        SynopticTime::H12,
        SynopticTime::H18,
        SynopticTime::H00And12,
        SynopticTime::H06And18,
        SynopticTime::AllFour,
    ];

    /// Inclusive time-of-day window the selector spans
    pub fn window(&self) -> (NaiveTime, NaiveTime) {
        let (lo, hi) = match self {
            SynopticTime::H00 => (0, 0),
            SynopticTime::H06 => (6, 6),
            SynopticTime::H12 => (12, 12),
            SynopticTime::H18 => (18, 18),
            SynopticTime::H00And12 => (0, 12),
            SynopticTime::H06And18 => (6, 18),
            SynopticTime::AllFour => (0, 18),
        };
        (hour(lo), hour(hi))
    }

    /// Interior hour dropped from a paired window
    pub fn excluded(&self) -> Option<NaiveTime> {
        match self {
            SynopticTime::H00And12 => Some(hour(6)),
            SynopticTime::H06And18 => Some(hour(12)),
            _ => None,
        }
    }

    /// Window test first, interior exclusion second.
    pub fn matches(&self, time_of_day: NaiveTime) -> bool {
        let (lo, hi) = self.window();
        if time_of_day < lo || time_of_day > hi {
            return false;
        }

        self.excluded().map_or(true, |skip| time_of_day != skip)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SynopticTime::H00 => "00Z",
            SynopticTime::H06 => "06Z",
            SynopticTime::H12 => "12Z",
            SynopticTime::H18 => "18Z",
            SynopticTime::H00And12 => "00Z+12Z",
            SynopticTime::H06And18 => "06Z+18Z",
            SynopticTime::AllFour => "all",
        }
    }
}

fn hour(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap_or_default()
}

impl fmt::Display for SynopticTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for SynopticTime {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_uppercase();
        match normalized.as_str() {
            "00Z" => Ok(SynopticTime::H00),
            "06Z" => Ok(SynopticTime::H06),
            "12Z" => Ok(SynopticTime::H12),
            "18Z" => Ok(SynopticTime::H18),
            "00Z+12Z" | "00Z E 12Z" => Ok(SynopticTime::H00And12),
            "06Z+18Z" | "06Z E 18Z" => Ok(SynopticTime::H06And18),
            "ALL" | "ALL-FOUR" | "00Z, 06Z, 12Z E 18Z" => Ok(SynopticTime::AllFour),
            _ => Err(ProcessingError::UnknownSynopticTime(s.to_string())),
        }
    }
}

/// Inclusive observation-time interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if start > end {
            return Err(ProcessingError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, timestamp: NaiveDateTime) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }
}

#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = ProcessingError;

    fn try_from(raw: RawDateRange) -> Result<Self> {
        DateRange::new(raw.start, raw.end)
    }
}

/// One query's worth of filter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFilterParameters")]
pub struct FilterParameters {
    pub date_range: DateRange,
    pub observation_types: Vec<String>,
    pub file_types: Vec<String>,
    pub synoptic_time: SynopticTime,
    pub unit: StorageUnit,
}

impl FilterParameters {
    pub fn new(
        date_range: DateRange,
        observation_types: Vec<String>,
        file_types: Vec<String>,
        synoptic_time: SynopticTime,
        unit: StorageUnit,
    ) -> Self {
        Self {
            date_range,
            observation_types: dedup_preserving_order(observation_types),
            file_types: dedup_preserving_order(file_types),
            synoptic_time,
            unit,
        }
    }

    pub fn builder() -> FilterParametersBuilder {
        FilterParametersBuilder::new()
    }

    /// Same filters with a different synoptic selection
    pub fn with_synoptic_time(&self, synoptic_time: SynopticTime) -> Self {
        Self {
            synoptic_time,
            ..self.clone()
        }
    }

    /// Same filters with a different display unit
    pub fn with_unit(&self, unit: StorageUnit) -> Self {
        Self {
            unit,
            ..self.clone()
        }
    }

    pub fn selects_observation_type(&self, observation_type: &str) -> bool {
        self.observation_types.iter().any(|t| t == observation_type)
    }

    pub fn selects_file_type(&self, file_type: &str) -> bool {
        self.file_types.iter().any(|t| t == file_type)
    }

    /// Position of an observation type in the request, used for colors
    pub fn observation_type_position(&self, observation_type: &str) -> Option<usize> {
        self.observation_types
            .iter()
            .position(|t| t == observation_type)
    }
}

#[derive(Deserialize)]
struct RawFilterParameters {
    date_range: DateRange,
    observation_types: Vec<String>,
    file_types: Vec<String>,
    synoptic_time: SynopticTime,
    unit: StorageUnit,
}

impl From<RawFilterParameters> for FilterParameters {
    fn from(raw: RawFilterParameters) -> Self {
        FilterParameters::new(
            raw.date_range,
            raw.observation_types,
            raw.file_types,
            raw.synoptic_time,
            raw.unit,
        )
    }
}

fn dedup_preserving_order(values: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    unique
}

#[derive(Debug, Default)]
pub struct FilterParametersBuilder {
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    observation_types: Vec<String>,
    file_types: Vec<String>,
    synoptic_time: Option<SynopticTime>,
    unit: Option<StorageUnit>,
}

impl FilterParametersBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn date_range(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn observation_type(mut self, observation_type: impl Into<String>) -> Self {
        self.observation_types.push(observation_type.into());
        self
    }

    pub fn observation_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.observation_types.extend(types.into_iter().map(Into::into));
        self
    }

    pub fn file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_types.push(file_type.into());
        self
    }

    pub fn file_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_types.extend(types.into_iter().map(Into::into));
        self
    }

    pub fn synoptic_time(mut self, synoptic_time: SynopticTime) -> Self {
        self.synoptic_time = Some(synoptic_time);
        self
    }

    pub fn unit(mut self, unit: StorageUnit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Synoptic time defaults to 00Z and unit to KB, matching the dashboard
    /// defaults. The date range is required.
    pub fn build(self) -> Result<FilterParameters> {
        let start = self
            .start
            .ok_or_else(|| ProcessingError::MissingData("date_range.start".to_string()))?;
        let end = self
            .end
            .ok_or_else(|| ProcessingError::MissingData("date_range.end".to_string()))?;

        Ok(FilterParameters::new(
            DateRange::new(start, end)?,
            self.observation_types,
            self.file_types,
            self.synoptic_time.unwrap_or(SynopticTime::H00),
            self.unit.unwrap_or(StorageUnit::KB),
        ))
    }
}
