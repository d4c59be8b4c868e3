use crate::models::{
    BreakdownRow, DetailRow, FilterParameters, ObservationRecord, ObservationTable, QueryResult,
    SeriesLine, SeriesPoint,
};
use crate::processors::palette::{breakdown_colors, series_color};
use std::f64::consts::PI;
use std::sync::Arc;
use tracing::debug;

/// Runs filter queries against one loaded storage table.
///
/// The table is never mutated, so an engine can be cloned freely and shared
/// between threads.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    table: Arc<ObservationTable>,
}

impl QueryEngine {
    pub fn new(table: Arc<ObservationTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &ObservationTable {
        &self.table
    }

    pub fn query(&self, params: &FilterParameters) -> QueryResult {
        query(self.table.records(), params)
    }
}

impl From<ObservationTable> for QueryEngine {
    fn from(table: ObservationTable) -> Self {
        Self::new(Arc::new(table))
    }
}

/// Filter, scale and shape the records selected by `params`.
///
/// Filters run in a fixed order: observation date range, synoptic time of
/// day, then observation and file type. Every view is derived from the same
/// filtered rows, so the total always equals the sum of the detail table.
pub fn query(records: &[ObservationRecord], params: &FilterParameters) -> QueryResult {
    let matched: Vec<&ObservationRecord> = records
        .iter()
        .filter(|r| params.date_range.contains(r.observation_timestamp))
        .filter(|r| params.synoptic_time.matches(r.observation_time_of_day()))
        .filter(|r| {
            params.selects_observation_type(&r.observation_type)
                && params.selects_file_type(&r.file_type)
        })
        .collect();

    debug!(
        scanned = records.len(),
        matched = matched.len(),
        synoptic = %params.synoptic_time,
        unit = %params.unit,
        "query evaluated"
    );

    if matched.is_empty() {
        return QueryResult::empty(params.clone());
    }

    let detail: Vec<DetailRow> = matched
        .into_iter()
        .map(|r| DetailRow::from_record(r, params.unit))
        .collect();

    let total = detail.iter().map(|r| r.scaled_size).sum();
    let series = build_series(&detail, params);
    let breakdown = build_breakdown(&detail, params);

    QueryResult {
        parameters: params.clone(),
        unit: params.unit,
        total,
        detail,
        series,
        breakdown,
    }
}

/// One line per requested (observation type, file type) pair that has data,
/// observation type outermost. Lines of the same observation type share a color.
fn build_series(detail: &[DetailRow], params: &FilterParameters) -> Vec<SeriesLine> {
    let mut lines = Vec::new();

    for (position, observation_type) in params.observation_types.iter().enumerate() {
        // a repeated type was already drawn at its first position
        if params.observation_type_position(observation_type) != Some(position) {
            continue;
        }
        for (i, file_type) in params.file_types.iter().enumerate() {
            if params.file_types[..i].contains(file_type) {
                continue;
            }
            let mut points: Vec<SeriesPoint> = detail
                .iter()
                .filter(|r| &r.observation_type == observation_type && &r.file_type == file_type)
                .map(|r| SeriesPoint {
                    timestamp: r.observation_timestamp,
                    value: r.scaled_size,
                })
                .collect();

            if points.is_empty() {
                continue;
            }

            points.sort_by_key(|p| p.timestamp);

            lines.push(SeriesLine {
                observation_type: observation_type.clone(),
                file_type: file_type.clone(),
                color: series_color(position).to_string(),
                points,
            });
        }
    }

    lines
}

/// Size per requested observation type (all file types combined) and its
/// share of the combined size. Types without surviving rows are left out.
fn build_breakdown(detail: &[DetailRow], params: &FilterParameters) -> Vec<BreakdownRow> {
    let sizes: Vec<(&String, f64)> = params
        .observation_types
        .iter()
        .enumerate()
        .filter(|(position, observation_type)| {
            params.observation_type_position(observation_type) == Some(*position)
        })
        .filter_map(|(_, observation_type)| {
            let mut rows = detail
                .iter()
                .filter(|r| &r.observation_type == observation_type)
                .peekable();
            rows.peek()?;
            Some((observation_type, rows.map(|r| r.scaled_size).sum::<f64>()))
        })
        .collect();

    let combined: f64 = sizes.iter().map(|(_, size)| size).sum();
    let colors = breakdown_colors(sizes.len());

    sizes
        .into_iter()
        .zip(colors)
        .map(|((observation_type, size), color)| {
            let share = if combined > 0.0 { size / combined } else { 0.0 };
            BreakdownRow {
                observation_type: observation_type.clone(),
                size,
                percentage: share * 100.0,
                angle: share * 2.0 * PI,
                color: color.to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StorageUnit, SynopticTime};
    use crate::utils::constants::FLOAT_TOLERANCE;
    use chrono::{NaiveDate, NaiveDateTime};
    use pretty_assertions::assert_eq;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn record(
        index: usize,
        observation_type: &str,
        file_type: &str,
        observed: NaiveDateTime,
        size_kb: f64,
    ) -> ObservationRecord {
        ObservationRecord::new(
            index,
            observation_type.to_string(),
            file_type.to_string(),
            observed + chrono::Duration::hours(5),
            observed,
            size_kb,
        )
        .unwrap()
    }

    fn params(
        types: &[&str],
        files: &[&str],
        synoptic: SynopticTime,
        unit: StorageUnit,
    ) -> FilterParameters {
        FilterParameters::builder()
            .date_range(ts(1, 0), ts(31, 18))
            .observation_types(types.iter().copied())
            .file_types(files.iter().copied())
            .synoptic_time(synoptic)
            .unit(unit)
            .build()
            .unwrap()
    }

    fn sample_table() -> Vec<ObservationRecord> {
        vec![
            record(0, "prepbufr", "gdas", ts(1, 0), 100.0),
            record(1, "prepbufr", "gdas", ts(1, 6), 150.0),
            record(2, "prepbufr", "gdas", ts(1, 12), 200.0),
            record(3, "prepbufr", "gfs", ts(1, 18), 250.0),
            record(4, "satwnd", "gdas", ts(2, 0), 300.0),
            record(5, "satwnd", "gfs", ts(2, 12), 400.0),
            record(6, "gome", "gdas", ts(3, 6), 50.0),
            record(7, "satwnd", "gdas", ts(1, 12), 600.0),
        ]
    }

    #[test]
    fn test_two_record_example() {
        let records = vec![
            record(0, "prepbufr", "gdas", ts(1, 0), 100.0),
            record(1, "prepbufr", "gdas", ts(1, 12), 200.0),
        ];
        let p = params(&["prepbufr"], &["gdas"], SynopticTime::H00And12, StorageUnit::KB);

        let result = query(&records, &p);

        assert_eq!(result.total, 300.0);
        assert_eq!(result.detail.len(), 2);
        assert_eq!(result.breakdown.len(), 1);
        assert_eq!(result.breakdown[0].observation_type, "prepbufr");
        assert_eq!(result.breakdown[0].size, 300.0);
        assert!((result.breakdown[0].percentage - 100.0).abs() < FLOAT_TOLERANCE);
        assert!((result.breakdown[0].angle - 2.0 * PI).abs() < FLOAT_TOLERANCE);
    }

    #[test]
    fn test_paired_selector_keeps_only_named_hours() {
        let records = sample_table();
        let p = params(&["prepbufr"], &["gdas"], SynopticTime::H00And12, StorageUnit::KB);

        let result = query(&records, &p);
        let indices: Vec<usize> = result.detail.iter().map(|r| r.row_index).collect();

        assert_eq!(indices, vec![0, 2]);
    }

    #[test]
    fn test_all_four_covers_every_synoptic_hour() {
        let records = sample_table();
        let p = params(&["prepbufr"], &["gdas", "gfs"], SynopticTime::AllFour, StorageUnit::KB);

        let result = query(&records, &p);
        assert_eq!(result.detail.len(), 4);
        assert_eq!(result.total, 700.0);
    }

    #[test]
    fn test_date_range_end_is_inclusive() {
        let records = vec![
            record(0, "gpsro", "gfs", ts(10, 0), 10.0),
            record(1, "gpsro", "gfs", ts(11, 0), 20.0),
        ];
        let p = FilterParameters::builder()
            .date_range(ts(9, 0), ts(10, 0))
            .observation_type("gpsro")
            .file_type("gfs")
            .build()
            .unwrap();

        let result = query(&records, &p);
        assert_eq!(result.detail.len(), 1);
        assert_eq!(result.detail[0].row_index, 0);
    }

    #[test]
    fn test_empty_type_selection_is_not_an_error() {
        let records = sample_table();
        let p = params(&[], &["gdas"], SynopticTime::AllFour, StorageUnit::KB);

        let result = query(&records, &p);
        assert_eq!(result.total, 0.0);
        assert!(result.detail.is_empty());
        assert!(result.series.is_empty());
        assert!(result.breakdown.is_empty());
    }

    #[test]
    fn test_total_matches_detail_sum() {
        let records = sample_table();
        for synoptic in SynopticTime::ALL {
            for unit in StorageUnit::ALL {
                let p = params(&["prepbufr", "satwnd", "gome"], &["gdas", "gfs"], synoptic, unit);
                let result = query(&records, &p);
                let detail_sum: f64 = result.detail.iter().map(|r| r.scaled_size).sum();
                assert_eq!(result.total, detail_sum, "{} {}", synoptic, unit);
            }
        }
    }

    #[test]
    fn test_unit_scaling_is_multiplicative() {
        let records = sample_table();
        let kb = query(
            &records,
            &params(&["satwnd"], &["gdas", "gfs"], SynopticTime::AllFour, StorageUnit::KB),
        );
        let mb = query(&records, &kb.parameters.with_unit(StorageUnit::MB));

        assert!((mb.total - kb.total / 1024f64.powi(2)).abs() < FLOAT_TOLERANCE);
        assert_eq!(mb.detail.len(), kb.detail.len());
    }

    #[test]
    fn test_breakdown_shares_sum_to_hundred() {
        let records = sample_table();
        let p = params(&["satwnd", "prepbufr", "gome"], &["gdas", "gfs"], SynopticTime::AllFour, StorageUnit::GB);

        let result = query(&records, &p);
        let shares: f64 = result.breakdown.iter().map(|r| r.percentage).sum();

        assert_eq!(result.breakdown.len(), 3);
        assert!((shares - 100.0).abs() < 1e-6);
        let order: Vec<&str> = result
            .breakdown
            .iter()
            .map(|r| r.observation_type.as_str())
            .collect();
        assert_eq!(order, vec!["satwnd", "prepbufr", "gome"]);
        assert_eq!(result.breakdown[2].color, "#ff7f0e");
    }

    #[test]
    fn test_breakdown_skips_types_without_rows() {
        let records = sample_table();
        let p = params(&["prepbufr", "atms"], &["gdas"], SynopticTime::H00, StorageUnit::KB);

        let result = query(&records, &p);
        assert_eq!(result.breakdown.len(), 1);
        assert_eq!(result.breakdown[0].color, "#1f77b4");
    }

    #[test]
    fn test_series_lines_per_pair() {
        let records = sample_table();
        let p = params(&["satwnd", "prepbufr"], &["gdas", "gfs"], SynopticTime::AllFour, StorageUnit::KB);

        let result = query(&records, &p);
        let pairs: Vec<(&str, &str, &str)> = result
            .series
            .iter()
            .map(|l| (l.observation_type.as_str(), l.file_type.as_str(), l.color.as_str()))
            .collect();

        assert_eq!(
            pairs,
            vec![
                ("satwnd", "gdas", "#1f77b4"),
                ("satwnd", "gfs", "#1f77b4"),
                ("prepbufr", "gdas", "#aec7e8"),
                ("prepbufr", "gfs", "#aec7e8"),
            ]
        );

        // row 7 precedes row 4 in time even though it comes later in the file
        let satwnd_gdas: Vec<f64> = result.series[0].points.iter().map(|p| p.value).collect();
        assert_eq!(satwnd_gdas, vec![600.0, 300.0]);
    }

    #[test]
    fn test_repeated_types_are_counted_once() {
        let records = sample_table();
        let base = params(&["prepbufr"], &["gdas"], SynopticTime::AllFour, StorageUnit::KB);
        let p = FilterParameters {
            observation_types: vec!["prepbufr".into(), "satwnd".into(), "prepbufr".into()],
            file_types: vec!["gdas".into(), "gdas".into()],
            ..base
        };

        let result = query(&records, &p);
        let lines: Vec<(&str, &str)> = result
            .series
            .iter()
            .map(|l| (l.observation_type.as_str(), l.file_type.as_str()))
            .collect();
        assert_eq!(lines, vec![("prepbufr", "gdas"), ("satwnd", "gdas")]);

        let types: Vec<&str> = result
            .breakdown
            .iter()
            .map(|r| r.observation_type.as_str())
            .collect();
        assert_eq!(types, vec!["prepbufr", "satwnd"]);
        let shares: f64 = result.breakdown.iter().map(|r| r.percentage).sum();
        assert!((shares - 100.0).abs() < FLOAT_TOLERANCE);
    }

    #[test]
    fn test_detail_preserves_source_order() {
        let records = sample_table();
        let p = params(&["satwnd", "prepbufr"], &["gdas"], SynopticTime::H12, StorageUnit::KB);

        let result = query(&records, &p);
        let indices: Vec<usize> = result.detail.iter().map(|r| r.row_index).collect();
        assert_eq!(indices, vec![2, 7]);
    }

    #[test]
    fn test_engine_queries_are_independent() {
        let engine = QueryEngine::from(ObservationTable::new(sample_table()));
        let first = engine.query(&params(&["gome"], &["gdas"], SynopticTime::H06, StorageUnit::KB));
        let second = engine.query(&params(&["satwnd"], &["gfs"], SynopticTime::H12, StorageUnit::KB));

        assert_eq!(first.breakdown.len(), 1);
        assert_eq!(first.breakdown[0].observation_type, "gome");
        assert_eq!(second.breakdown.len(), 1);
        assert_eq!(second.breakdown[0].observation_type, "satwnd");
        assert_eq!(second.total, 400.0);
    }
}
