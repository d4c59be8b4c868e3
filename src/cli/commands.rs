use crate::analyzers::StorageAnalyzer;
use crate::cli::args::{Cli, Commands, FilterArgs};
use crate::config::AppConfig;
use crate::error::{ProcessingError, Result};
use crate::models::{FilterParameters, ObservationTable, QueryResult};
use crate::processors::{BatchProcessor, QueryEngine};
use crate::readers::{parse_timestamp, LoadReport, ObservationReader};
use crate::utils::constants::{FILE_TYPES, OBSERVATION_TYPES};
use crate::utils::filename::generate_default_export_filename;
use crate::utils::progress::ProgressReporter;
use crate::writers::ParquetWriter;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    init_logging(cli.verbose, &config.log_level);
    debug!(?config, "configuration loaded");

    let data_file = cli.data_file.clone().unwrap_or_else(|| config.data_file.clone());
    let use_mmap = cli.mmap || config.use_mmap;
    let quiet = matches!(
        cli.command,
        Commands::Query { json: true, .. }
            | Commands::Compare { json: true, .. }
            | Commands::Info { json: true }
    );

    let (table, report) = load_table(&data_file, use_mmap, quiet).await?;
    let table = Arc::new(table);

    match cli.command {
        Commands::Query {
            filters,
            limit,
            json,
            export,
            compression,
        } => {
            let params = build_parameters(&filters, &table, &config)?;
            let engine = QueryEngine::new(table.clone());
            let result = engine.query(&params);

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("{}", result.summary());
                print_detail(&result, limit);
            }

            if let Some(path) = export {
                let path = path.unwrap_or_else(generate_default_export_filename);
                let compression = compression.unwrap_or_else(|| config.compression.clone());
                export_detail(&result, &path, &compression, json)?;
            }
        }

        Commands::Compare {
            filters,
            json,
            max_workers,
        } => {
            let params = build_parameters(&filters, &table, &config)?;
            let workers = max_workers.unwrap_or(config.max_workers);
            let processor = BatchProcessor::new(QueryEngine::new(table.clone()), workers);

            let progress = ProgressReporter::new(7, "Comparing synoptic times...", json);
            let totals = processor.compare_synoptic_times(&params, Some(&progress))?;
            progress.clear();

            if json {
                println!("{}", serde_json::to_string_pretty(&totals)?);
            } else {
                println!("Total stored per synoptic time ({}):", params.unit);
                for total in &totals {
                    println!(
                        "  {:<8} {:>8} files  {:>16.2} {}",
                        total.synoptic_time.label(),
                        total.files,
                        total.total,
                        total.unit
                    );
                }
            }
        }

        Commands::Info { json } => {
            let summary = StorageAnalyzer::new().summarize(&table)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{}", summary.detailed_summary());
                println!("\n{}", report.summary());
            }
        }

        Commands::Validate => {
            println!("{}", report.summary());
            if report.rows_skipped == 0 {
                println!("✅ All rows parsed");
            } else {
                println!("⚠️  {} rows could not be parsed", report.rows_skipped);
            }
        }
    }

    Ok(())
}

/// `--verbose` forces debug; otherwise `RUST_LOG`, then the configured level.
fn init_logging(verbose: bool, level: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    // A subscriber may already be installed (tests, embedding)
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

async fn load_table(path: &Path, use_mmap: bool, quiet: bool) -> Result<(ObservationTable, LoadReport)> {
    let progress = ProgressReporter::new_spinner(&format!("Loading {}...", path.display()), quiet);

    let (table, report) = ObservationReader::with_mmap(use_mmap)
        .read_table_async(path.to_path_buf())
        .await?;

    progress.finish_with_message(&format!(
        "Loaded {} records ({} skipped)",
        report.rows_loaded, report.rows_skipped
    ));
    Ok((table, report))
}

/// Resolve CLI filter flags against config defaults and the table's own period.
pub fn build_parameters(
    filters: &FilterArgs,
    table: &ObservationTable,
    config: &AppConfig,
) -> Result<FilterParameters> {
    let bounds = table.observation_bounds();
    let no_data = || ProcessingError::MissingData("empty table and no date range given".to_string());

    let start = match &filters.start {
        Some(s) => parse_timestamp(s)?,
        None => bounds.ok_or_else(no_data)?.0,
    };
    let end = match &filters.end {
        Some(s) => parse_timestamp(s)?,
        None => bounds.ok_or_else(no_data)?.1,
    };

    let observation_types = if filters.observation_types.is_empty() {
        vec![OBSERVATION_TYPES[0].to_string()]
    } else {
        filters.observation_types.clone()
    };
    let file_types = if filters.file_types.is_empty() {
        vec![FILE_TYPES[0].to_string()]
    } else {
        filters.file_types.clone()
    };

    let synoptic_time = match &filters.synoptic {
        Some(s) => s.parse()?,
        None => config.synoptic_time()?,
    };
    let unit = match &filters.unit {
        Some(u) => u.parse()?,
        None => config.unit()?,
    };

    FilterParameters::builder()
        .date_range(start, end)
        .observation_types(observation_types)
        .file_types(file_types)
        .synoptic_time(synoptic_time)
        .unit(unit)
        .build()
}

fn print_detail(result: &QueryResult, limit: usize) {
    if result.detail.is_empty() {
        println!("\nNo matching files");
        return;
    }

    let shown = if limit == 0 {
        result.detail.len()
    } else {
        limit.min(result.detail.len())
    };

    println!("\nDetail (showing {} of {} rows):", shown, result.detail.len());
    println!(
        "{:>7}  {:<10} {:<5} {:<19}  {:<19}  {:>14}  {}",
        "row", "type", "file", "observation", "download", result.unit, "delay"
    );
    for row in result.detail.iter().take(shown) {
        println!(
            "{:>7}  {:<10} {:<5} {:<19}  {:<19}  {:>14.4}  {}",
            row.row_index,
            row.observation_type,
            row.file_type,
            row.observation_timestamp.format("%Y-%m-%d %H:%M:%S"),
            row.download_timestamp.format("%Y-%m-%d %H:%M:%S"),
            row.scaled_size,
            row.format_time_difference()
        );
    }
}

fn export_detail(result: &QueryResult, path: &Path, compression: &str, quiet: bool) -> Result<()> {
    if result.detail.is_empty() {
        if !quiet {
            println!("No rows to export");
        }
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let writer = ParquetWriter::new().with_compression(compression)?;
    writer.write_detail_rows(&result.detail, result.unit, path)?;
    info!(path = %path.display(), "export written");

    if !quiet {
        let file_info = writer.get_file_info(path)?;
        println!("\nExported to {}\n{}", path.display(), file_info.summary());
    }
    Ok(())
}
