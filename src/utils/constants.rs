/// Source table column headers (as exported by the monitoring job)
pub const COL_OBSERVATION_TYPE: &str = "Tipo de Observação";
pub const COL_FILE_TYPE: &str = "Tipo de Arquivo";
pub const COL_DOWNLOAD_TIMESTAMP: &str = "Data do Download";
pub const COL_OBSERVATION_TIMESTAMP: &str = "Data da Observação";
pub const COL_DOWNLOAD_SIZE_KB: &str = "Tamanho do Download (KB)";

/// snake_case aliases accepted for the same columns
pub const ALIAS_OBSERVATION_TYPE: &str = "observation_type";
pub const ALIAS_FILE_TYPE: &str = "file_type";
pub const ALIAS_DOWNLOAD_TIMESTAMP: &str = "download_timestamp";
pub const ALIAS_OBSERVATION_TIMESTAMP: &str = "observation_timestamp";
pub const ALIAS_DOWNLOAD_SIZE_KB: &str = "download_size_kb";

/// Accepted timestamp layouts, tried in order
/// `%.f` also matches a timestamp without fractional seconds
pub const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];
pub const DATE_ONLY_FORMAT: &str = "%Y-%m-%d";

/// Known observation types
pub const OBSERVATION_TYPES: &[&str] = &[
    "1bamua", "1bhrs4", "airsev", "atms", "crisf4", "eshrs3", "esmhs", "gome", "gpsipw", "gpsro",
    "mtiasi", "osbuv8", "prepbufr", "satwnd", "sevcsr",
];

/// Known file types
pub const FILE_TYPES: &[&str] = &["gdas", "gfs"];

/// Download timestamps are recorded in local time (UTC-3)
pub const LOCAL_UTC_OFFSET_HOURS: i64 = 3;

/// Files
pub const DEFAULT_DATA_FILE: &str = "mon_rec_obs_final.csv";
pub const DEFAULT_CONFIG_FILE: &str = "armobs.toml";
pub const ENV_PREFIX: &str = "ARMOBS";

/// Processing defaults
pub const DEFAULT_ROW_GROUP_SIZE: usize = 10000;
pub const MAX_REPORTED_SKIPS: usize = 10;
pub const FLOAT_TOLERANCE: f64 = 1e-9;

/// Parquet compression options
pub const COMPRESSION_SNAPPY: &str = "snappy";
pub const COMPRESSION_GZIP: &str = "gzip";
pub const COMPRESSION_LZ4: &str = "lz4";
pub const COMPRESSION_ZSTD: &str = "zstd";
pub const COMPRESSION_NONE: &str = "none";
