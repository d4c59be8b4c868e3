use crate::error::{ProcessingError, Result};
use crate::models::{DetailRow, StorageUnit};
use crate::utils::constants::*;
use arrow::array::*;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDateTime};
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel};
use parquet::file::properties::WriterProperties;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Schema metadata key recording the unit of `scaled_size`
pub const UNIT_METADATA_KEY: &str = "scaled_unit";

pub struct ParquetWriter {
    compression: Compression,
    row_group_size: usize,
}

impl ParquetWriter {
    pub fn new() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
        }
    }

    pub fn with_compression(mut self, compression: &str) -> Result<Self> {
        self.compression = match compression.to_lowercase().as_str() {
            COMPRESSION_SNAPPY => Compression::SNAPPY,
            COMPRESSION_GZIP => Compression::GZIP(GzipLevel::default()),
            COMPRESSION_LZ4 => Compression::LZ4,
            COMPRESSION_ZSTD => Compression::ZSTD(parquet::basic::ZstdLevel::default()),
            COMPRESSION_NONE => Compression::UNCOMPRESSED,
            _ => {
                return Err(ProcessingError::Config(format!(
                    "Unsupported compression: {}",
                    compression
                )))
            }
        };
        Ok(self)
    }

    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size.max(1);
        self
    }

    /// Write the detail table of a query. Nothing is written for an empty table.
    pub fn write_detail_rows(&self, rows: &[DetailRow], unit: StorageUnit, path: &Path) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let schema = self.create_schema(unit);
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        for chunk in rows.chunks(self.row_group_size) {
            let batch = self.rows_to_batch(chunk, schema.clone())?;
            writer.write(&batch)?;
        }

        writer.close()?;
        info!(rows = rows.len(), path = %path.display(), "detail table exported");
        Ok(())
    }

    fn create_schema(&self, unit: StorageUnit) -> Arc<Schema> {
        let timestamp = DataType::Timestamp(TimeUnit::Millisecond, None);
        let fields = vec![
            Field::new("row_index", DataType::UInt64, false),
            Field::new("observation_type", DataType::Utf8, false),
            Field::new("file_type", DataType::Utf8, false),
            Field::new("download_timestamp", timestamp.clone(), false),
            Field::new("observation_timestamp", timestamp, false),
            Field::new("download_size_kb", DataType::Float64, false),
            Field::new("scaled_size", DataType::Float64, false),
            Field::new("time_difference_secs", DataType::Int64, false),
        ];

        let metadata = HashMap::from([(UNIT_METADATA_KEY.to_string(), unit.label().to_string())]);
        Arc::new(Schema::new_with_metadata(fields, metadata))
    }

    fn rows_to_batch(&self, rows: &[DetailRow], schema: Arc<Schema>) -> Result<RecordBatch> {
        let millis = |ts: NaiveDateTime| ts.and_utc().timestamp_millis();

        let row_indices: Vec<u64> = rows.iter().map(|r| r.row_index as u64).collect();
        let observation_types: Vec<&str> = rows.iter().map(|r| r.observation_type.as_str()).collect();
        let file_types: Vec<&str> = rows.iter().map(|r| r.file_type.as_str()).collect();
        let downloads: Vec<i64> = rows.iter().map(|r| millis(r.download_timestamp)).collect();
        let observations: Vec<i64> = rows.iter().map(|r| millis(r.observation_timestamp)).collect();
        let sizes_kb: Vec<f64> = rows.iter().map(|r| r.download_size_kb).collect();
        let scaled: Vec<f64> = rows.iter().map(|r| r.scaled_size).collect();
        let differences: Vec<i64> = rows.iter().map(|r| r.time_difference_secs).collect();

        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(UInt64Array::from(row_indices)),
                Arc::new(StringArray::from(observation_types)),
                Arc::new(StringArray::from(file_types)),
                Arc::new(TimestampMillisecondArray::from(downloads)),
                Arc::new(TimestampMillisecondArray::from(observations)),
                Arc::new(Float64Array::from(sizes_kb)),
                Arc::new(Float64Array::from(scaled)),
                Arc::new(Int64Array::from(differences)),
            ],
        )?;

        Ok(batch)
    }

    /// Read up to `limit` exported rows back (0 = all)
    pub fn read_detail_rows(&self, path: &Path, limit: usize) -> Result<Vec<DetailRow>> {
        use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

        let file = File::open(path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

        let mut rows = Vec::new();

        for batch_result in reader {
            let batch = batch_result?;

            let row_indices = column::<UInt64Array>(&batch, 0, "row_index")?;
            let observation_types = column::<StringArray>(&batch, 1, "observation_type")?;
            let file_types = column::<StringArray>(&batch, 2, "file_type")?;
            let downloads = column::<TimestampMillisecondArray>(&batch, 3, "download_timestamp")?;
            let observations =
                column::<TimestampMillisecondArray>(&batch, 4, "observation_timestamp")?;
            let sizes_kb = column::<Float64Array>(&batch, 5, "download_size_kb")?;
            let scaled = column::<Float64Array>(&batch, 6, "scaled_size")?;
            let differences = column::<Int64Array>(&batch, 7, "time_difference_secs")?;

            for i in 0..batch.num_rows() {
                if limit > 0 && rows.len() >= limit {
                    return Ok(rows);
                }

                rows.push(DetailRow {
                    row_index: row_indices.value(i) as usize,
                    observation_type: observation_types.value(i).to_string(),
                    file_type: file_types.value(i).to_string(),
                    download_timestamp: from_millis(downloads.value(i))?,
                    observation_timestamp: from_millis(observations.value(i))?,
                    download_size_kb: sizes_kb.value(i),
                    scaled_size: scaled.value(i),
                    time_difference_secs: differences.value(i),
                });
            }
        }

        Ok(rows)
    }

    pub fn get_file_info(&self, path: &Path) -> Result<ParquetFileInfo> {
        use parquet::file::reader::{FileReader, SerializedFileReader};

        let file = File::open(path)?;
        let reader = SerializedFileReader::new(file)?;
        let metadata = reader.metadata();

        let file_metadata = metadata.file_metadata();
        let row_groups = metadata.num_row_groups();
        let total_rows = file_metadata.num_rows();
        let file_size = std::fs::metadata(path)?.len();

        let row_group_sizes = (0..row_groups)
            .map(|i| metadata.row_group(i).num_rows())
            .collect();

        Ok(ParquetFileInfo {
            total_rows,
            row_groups: row_groups as i32,
            row_group_sizes,
            file_size,
            compression: self.compression,
        })
    }
}

impl Default for ParquetWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, index: usize, name: &str) -> Result<&'a T> {
    batch
        .column(index)
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Invalid {} column type", name)))
}

fn from_millis(millis: i64) -> Result<NaiveDateTime> {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| ProcessingError::InvalidFormat(format!("Timestamp out of range: {}", millis)))
}

#[derive(Debug)]
pub struct ParquetFileInfo {
    pub total_rows: i64,
    pub row_groups: i32,
    pub row_group_sizes: Vec<i64>,
    pub file_size: u64,
    pub compression: Compression,
}

impl ParquetFileInfo {
    pub fn summary(&self) -> String {
        let groups: Vec<String> = self.row_group_sizes.iter().map(|n| n.to_string()).collect();
        format!(
            "Detail export: {} rows in {} row group(s) [{}]\n\
            On disk: {} bytes, {:?} compression",
            self.total_rows,
            self.row_groups,
            groups.join(", "),
            self.file_size,
            self.compression
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::NamedTempFile;

    fn detail_row(index: usize, hour: u32, size_kb: f64) -> DetailRow {
        let observed = NaiveDate::from_ymd_opt(2023, 7, 15)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        DetailRow {
            row_index: index,
            observation_type: "prepbufr".to_string(),
            file_type: "gdas".to_string(),
            download_timestamp: observed + chrono::Duration::minutes(250),
            observation_timestamp: observed,
            download_size_kb: size_kb,
            scaled_size: StorageUnit::MB.scale(size_kb),
            time_difference_secs: 600,
        }
    }

    #[test]
    fn test_write_empty_rows() {
        let writer = ParquetWriter::new();
        let temp_file = NamedTempFile::new().unwrap();

        let result = writer.write_detail_rows(&[], StorageUnit::KB, temp_file.path());
        assert!(result.is_ok());
        assert_eq!(std::fs::metadata(temp_file.path()).unwrap().len(), 0);
    }

    #[test]
    fn test_write_and_read_back() -> Result<()> {
        let writer = ParquetWriter::new().with_row_group_size(2);
        let temp_file = NamedTempFile::new()?;
        let rows = vec![
            detail_row(3, 0, 1024.0),
            detail_row(8, 12, 2048.0),
            detail_row(9, 18, 4096.0),
        ];

        writer.write_detail_rows(&rows, StorageUnit::MB, temp_file.path())?;

        let info = writer.get_file_info(temp_file.path())?;
        assert_eq!(info.total_rows, 3);
        assert_eq!(info.row_groups, 2);

        let read = writer.read_detail_rows(temp_file.path(), 0)?;
        assert_eq!(read, rows);

        let limited = writer.read_detail_rows(temp_file.path(), 1)?;
        assert_eq!(limited.len(), 1);
        Ok(())
    }

    #[test]
    fn test_different_compressions() -> Result<()> {
        for compression in [
            COMPRESSION_SNAPPY,
            COMPRESSION_GZIP,
            COMPRESSION_LZ4,
            COMPRESSION_ZSTD,
            COMPRESSION_NONE,
        ] {
            let writer = ParquetWriter::new().with_compression(compression)?;
            let temp_file = NamedTempFile::new()?;

            let result = writer.write_detail_rows(&[detail_row(0, 6, 1.0)], StorageUnit::KB, temp_file.path());
            assert!(result.is_ok(), "Failed with compression: {}", compression);
        }

        assert!(ParquetWriter::new().with_compression("brotli9").is_err());
        Ok(())
    }
}
