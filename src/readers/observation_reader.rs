use crate::error::{ProcessingError, Result};
use crate::models::{ObservationRecord, ObservationTable};
use crate::utils::constants::*;
use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use memmap2::Mmap;
use serde::Serialize;
use std::borrow::Cow;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A data row that could not be turned into a record.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRow {
    /// 1-based line number in the file, header included
    pub line: usize,
    pub reason: String,
}

/// Outcome of a table load.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_loaded: usize,
    pub rows_skipped: usize,
    /// First few skipped rows, for display
    pub skipped: Vec<SkippedRow>,
    pub transcoded: bool,
}

impl LoadReport {
    fn skip(&mut self, line: usize, reason: String) {
        warn!(line, %reason, "skipping malformed row");
        self.rows_skipped += 1;
        if self.skipped.len() < MAX_REPORTED_SKIPS {
            self.skipped.push(SkippedRow { line, reason });
        }
    }

    pub fn summary(&self) -> String {
        let mut out = format!(
            "Load Summary:\n\
            - Rows read: {}\n\
            - Rows loaded: {}\n\
            - Rows skipped: {}",
            self.rows_read, self.rows_loaded, self.rows_skipped
        );
        if self.transcoded {
            out.push_str("\n- Input decoded as Windows-1252");
        }
        for row in &self.skipped {
            out.push_str(&format!("\n  line {}: {}", row.line, row.reason));
        }
        if self.rows_skipped > self.skipped.len() {
            out.push_str(&format!(
                "\n  ... and {} more",
                self.rows_skipped - self.skipped.len()
            ));
        }
        out
    }
}

/// Header positions of the five required columns.
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    observation_type: usize,
    file_type: usize,
    download_timestamp: usize,
    observation_timestamp: usize,
    download_size_kb: usize,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str, alias: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h == name || h.eq_ignore_ascii_case(alias))
                .ok_or_else(|| ProcessingError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            observation_type: find(COL_OBSERVATION_TYPE, ALIAS_OBSERVATION_TYPE)?,
            file_type: find(COL_FILE_TYPE, ALIAS_FILE_TYPE)?,
            download_timestamp: find(COL_DOWNLOAD_TIMESTAMP, ALIAS_DOWNLOAD_TIMESTAMP)?,
            observation_timestamp: find(COL_OBSERVATION_TIMESTAMP, ALIAS_OBSERVATION_TIMESTAMP)?,
            download_size_kb: find(COL_DOWNLOAD_SIZE_KB, ALIAS_DOWNLOAD_SIZE_KB)?,
        })
    }
}

/// Loads the storage table from a headered CSV file.
pub struct ObservationReader {
    use_mmap: bool,
}

impl ObservationReader {
    pub fn new() -> Self {
        Self { use_mmap: false }
    }

    pub fn with_mmap(use_mmap: bool) -> Self {
        Self { use_mmap }
    }

    /// Read the whole table from `path`
    pub fn read_table(&self, path: &Path) -> Result<(ObservationTable, LoadReport)> {
        info!(path = %path.display(), mmap = self.use_mmap, "loading observation table");

        if self.use_mmap {
            let file = File::open(path)?;
            let mmap = unsafe { Mmap::map(&file)? };
            self.read_from_bytes(&mmap)
        } else {
            self.read_from_bytes(&std::fs::read(path)?)
        }
    }

    /// Load on the blocking pool so the async runtime stays responsive
    pub async fn read_table_async(self, path: PathBuf) -> Result<(ObservationTable, LoadReport)> {
        tokio::task::spawn_blocking(move || self.read_table(&path)).await?
    }

    /// Parse CSV content. Non-UTF-8 input is decoded as Windows-1252.
    pub fn read_from_bytes(&self, bytes: &[u8]) -> Result<(ObservationTable, LoadReport)> {
        let mut report = LoadReport::default();
        let text = decode(bytes, &mut report);

        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let columns = ColumnMap::from_headers(csv_reader.headers()?)?;
        debug!(?columns, "resolved header columns");

        let mut records = Vec::new();

        for (row_index, result) in csv_reader.records().enumerate() {
            report.rows_read += 1;
            // header is line 1
            let line = row_index + 2;

            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    report.skip(line, e.to_string());
                    continue;
                }
            };

            match parse_row(&row, &columns, row_index) {
                Ok(record) => records.push(record),
                Err(e) => report.skip(line, e.to_string()),
            }
        }

        report.rows_loaded = records.len();
        info!(
            loaded = report.rows_loaded,
            skipped = report.rows_skipped,
            "observation table loaded"
        );

        Ok((ObservationTable::new(records), report))
    }
}

impl Default for ObservationReader {
    fn default() -> Self {
        Self::new()
    }
}

fn decode<'a>(bytes: &'a [u8], report: &mut LoadReport) -> Cow<'a, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text.trim_start_matches('\u{feff}')),
        Err(_) => {
            report.transcoded = true;
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            text
        }
    }
}

fn field<'a>(row: &'a StringRecord, index: usize, name: &str) -> Result<&'a str> {
    row.get(index)
        .ok_or_else(|| ProcessingError::MissingData(format!("{} field missing", name)))
}

fn parse_row(row: &StringRecord, columns: &ColumnMap, row_index: usize) -> Result<ObservationRecord> {
    let observation_type = field(row, columns.observation_type, COL_OBSERVATION_TYPE)?;
    let file_type = field(row, columns.file_type, COL_FILE_TYPE)?;
    let download_timestamp =
        parse_timestamp(field(row, columns.download_timestamp, COL_DOWNLOAD_TIMESTAMP)?)?;
    let observation_timestamp =
        parse_timestamp(field(row, columns.observation_timestamp, COL_OBSERVATION_TIMESTAMP)?)?;

    let size_str = field(row, columns.download_size_kb, COL_DOWNLOAD_SIZE_KB)?;
    let download_size_kb = size_str.parse::<f64>().map_err(|_| {
        ProcessingError::InvalidFormat(format!("Invalid download size: '{}'", size_str))
    })?;
    if !download_size_kb.is_finite() {
        return Err(ProcessingError::InvalidFormat(format!(
            "Invalid download size: '{}'",
            size_str
        )));
    }

    ObservationRecord::new(
        row_index,
        observation_type.to_string(),
        file_type.to_string(),
        download_timestamp,
        observation_timestamp,
        download_size_kb,
    )
}

/// Parse a timestamp in any of the accepted layouts; a bare date means midnight.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();

    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(ts);
        }
    }

    NaiveDate::parse_from_str(value, DATE_ONLY_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Invalid timestamp: '{}'", value)))
}
