use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "smna-armobs")]
#[command(about = "Disk usage of SMNA observation files by type, period and synoptic time")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Storage table CSV [default: from config]")]
    pub data_file: Option<PathBuf>,

    #[arg(long, global = true, help = "Configuration file [default: armobs.toml if present]")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Memory-map the data file")]
    pub mmap: bool,
}

/// Filter flags shared by `query` and `compare`
#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    #[arg(long, help = "First observation time (YYYY-MM-DD[ HH:MM[:SS]]) [default: table start]")]
    pub start: Option<String>,

    #[arg(long, help = "Last observation time, inclusive [default: table end]")]
    pub end: Option<String>,

    #[arg(
        short = 'o',
        long = "obs-type",
        help = "Observation type, repeatable [default: 1bamua]"
    )]
    pub observation_types: Vec<String>,

    #[arg(
        short = 'f',
        long = "file-type",
        help = "File type, repeatable [default: gdas]"
    )]
    pub file_types: Vec<String>,

    #[arg(
        short,
        long,
        help = "00Z, 06Z, 12Z, 18Z, 00Z+12Z, 06Z+18Z or all [default: from config]"
    )]
    pub synoptic: Option<String>,

    #[arg(short, long, help = "KB, MB, GB, TB or PB [default: from config]")]
    pub unit: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Total, detail table, time series and breakdown for one filter set
    Query {
        #[command(flatten)]
        filters: FilterArgs,

        #[arg(long, default_value = "20", help = "Detail rows to print (0 = all)")]
        limit: usize,

        #[arg(long, help = "Print the full result as JSON")]
        json: bool,

        #[arg(
            long,
            num_args = 0..=1,
            help = "Export the detail table to Parquet [default path: output/armobs-query-{YYMMDD}.parquet]"
        )]
        export: Option<Option<PathBuf>>,

        #[arg(short, long, help = "Parquet compression [default: from config]")]
        compression: Option<String>,
    },

    /// Totals for every synoptic selection of the same filters
    Compare {
        #[command(flatten)]
        filters: FilterArgs,

        #[arg(long, help = "Print the totals as JSON")]
        json: bool,

        #[arg(long, help = "Worker threads [default: from config]")]
        max_workers: Option<usize>,
    },

    /// Summarize the loaded storage table
    Info {
        #[arg(long, help = "Print the summary as JSON")]
        json: bool,
    },

    /// Load the table and report rows that failed to parse
    Validate,
}
