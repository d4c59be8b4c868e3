use chrono::{Datelike, Local};
use std::path::PathBuf;

/// Default export path: output/armobs-query-{YYMMDD}.parquet
pub fn generate_default_export_filename() -> PathBuf {
    let now = Local::now();
    let year = now.year() % 100;
    let month = now.month();
    let day = now.day();

    let filename = format!("armobs-query-{:02}{:02}{:02}.parquet", year, month, day);
    PathBuf::from("output").join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_default_export_filename() {
        let filename = generate_default_export_filename();
        let filename_str = filename.to_string_lossy();

        assert!(filename_str.starts_with("output"));
        assert!(filename_str.ends_with(".parquet"));

        let file_part = filename.file_name().unwrap().to_string_lossy();
        assert!(file_part.starts_with("armobs-query-"));
        // armobs-query- + YYMMDD + .parquet
        assert_eq!(file_part.len(), 13 + 6 + 8);
    }
}
