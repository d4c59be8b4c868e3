use crate::error::{ProcessingError, Result};
use crate::models::{FilterParameters, QueryResult, StorageUnit, SynopticTime};
use crate::processors::QueryEngine;
use crate::utils::progress::ProgressReporter;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// Total for one synoptic selection of an otherwise fixed query.
#[derive(Debug, Clone, Serialize)]
pub struct SynopticTotal {
    pub synoptic_time: SynopticTime,
    pub files: usize,
    pub total: f64,
    pub unit: StorageUnit,
}

/// Evaluates many independent queries on a bounded rayon pool.
pub struct BatchProcessor {
    engine: QueryEngine,
    max_workers: usize,
}

impl BatchProcessor {
    pub fn new(engine: QueryEngine, max_workers: usize) -> Self {
        Self {
            engine,
            max_workers: max_workers.max(1),
        }
    }

    /// Run every parameter set; results come back in input order.
    pub fn query_all(
        &self,
        params: &[FilterParameters],
        progress: Option<&ProgressReporter>,
    ) -> Result<Vec<QueryResult>> {
        let done = AtomicUsize::new(0);

        if let Some(p) = progress {
            p.set_message(&format!("Evaluating {} queries...", params.len()));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| ProcessingError::Config(e.to_string()))?;

        let results: Vec<QueryResult> = pool.install(|| {
            params
                .par_iter()
                .map(|p| {
                    let result = self.engine.query(p);

                    let count = done.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(reporter) = progress {
                        reporter.update(count as u64);
                    }

                    result
                })
                .collect()
        });

        info!(queries = results.len(), workers = self.max_workers, "batch complete");
        Ok(results)
    }

    /// Evaluate `base` once per synoptic selector.
    pub fn compare_synoptic_times(
        &self,
        base: &FilterParameters,
        progress: Option<&ProgressReporter>,
    ) -> Result<Vec<SynopticTotal>> {
        let variants: Vec<FilterParameters> = SynopticTime::ALL
            .iter()
            .map(|&s| base.with_synoptic_time(s))
            .collect();

        let results = self.query_all(&variants, progress)?;

        Ok(results
            .into_iter()
            .map(|r| SynopticTotal {
                synoptic_time: r.parameters.synoptic_time,
                files: r.detail.len(),
                total: r.total,
                unit: r.unit,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ObservationRecord, ObservationTable};
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 5, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn engine() -> QueryEngine {
        let records = [0, 6, 12, 18]
            .iter()
            .enumerate()
            .map(|(i, &h)| {
                ObservationRecord::new(
                    i,
                    "airsev".to_string(),
                    "gdas".to_string(),
                    ts(h),
                    ts(h),
                    (i as f64 + 1.0) * 10.0,
                )
                .unwrap()
            })
            .collect();
        QueryEngine::from(ObservationTable::new(records))
    }

    fn base() -> FilterParameters {
        FilterParameters::builder()
            .date_range(ts(0), ts(18))
            .observation_type("airsev")
            .file_type("gdas")
            .build()
            .unwrap()
    }

    #[test]
    fn test_query_all_preserves_order() -> Result<()> {
        let processor = BatchProcessor::new(engine(), 2);
        let params = vec![
            base().with_synoptic_time(SynopticTime::H18),
            base().with_synoptic_time(SynopticTime::H00),
            base().with_unit(StorageUnit::MB),
        ];

        let results = processor.query_all(&params, None)?;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].total, 40.0);
        assert_eq!(results[1].total, 10.0);
        assert_eq!(results[2].unit, StorageUnit::MB);
        Ok(())
    }

    #[test]
    fn test_compare_synoptic_times() -> Result<()> {
        let processor = BatchProcessor::new(engine(), 4);
        let totals = processor.compare_synoptic_times(&base(), None)?;

        let by_selector: Vec<(SynopticTime, f64)> =
            totals.iter().map(|t| (t.synoptic_time, t.total)).collect();

        assert_eq!(
            by_selector,
            vec![
                (SynopticTime::H00, 10.0),
                (SynopticTime::H06, 20.0),
                (SynopticTime::H12, 30.0),
                (SynopticTime::H18, 40.0),
                (SynopticTime::H00And12, 40.0),
                (SynopticTime::H06And18, 60.0),
                (SynopticTime::AllFour, 100.0),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_zero_workers_clamped() {
        let processor = BatchProcessor::new(engine(), 0);
        assert!(processor.query_all(&[base()], None).is_ok());
    }
}
