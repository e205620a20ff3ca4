//! Reading source tables from disk and writing the feature table.
//!
//! Files ending in `.parquet` go through the Parquet reader/writer; anything
//! else is treated as CSV with a header row.

use crate::error::{Result, ResultExt};
use crate::types::SourceTables;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const INFER_SCHEMA_ROWS: usize = 10_000;

fn is_parquet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet"))
}

/// Load a CSV file, retrying on the cleaned content if the first parse
/// fails (doubled quotes, blank lines).
pub fn load_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();

    match CsvReadOptions::default()
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Standard loading of {} failed: {}", path.display(), e);
        }
    }

    let content = fs::read_to_string(path)?;
    CsvReadOptions::default()
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .with_has_header(true)
        .into_reader_with_file_handle(Cursor::new(clean_csv_content(&content)))
        .finish()
        .context(format!("Failed to parse {}", path.display()))
}

fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Load a CSV or Parquet table, chosen by extension.
pub fn load_table(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    let df = if is_parquet(path) {
        let file = File::open(path)?;
        ParquetReader::new(file)
            .finish()
            .context(format!("Failed to read {}", path.display()))?
    } else {
        load_csv(path)?
    };

    info!(
        "Loaded {}: {} rows x {} columns",
        path.display(),
        df.height(),
        df.width()
    );
    Ok(df)
}

/// Write `df` as CSV or Parquet, chosen by extension. Parent directories
/// are created as needed.
pub fn write_table(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    if is_parquet(path) {
        ParquetWriter::new(&mut file).finish(df)?;
    } else {
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .with_quote_char(b'"')
            .finish(df)?;
    }

    info!("Feature table saved: {}", path.display());
    Ok(())
}

/// Locations of the four source tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePaths {
    pub application: PathBuf,
    pub bureau: PathBuf,
    pub card_balance: PathBuf,
    pub previous_application: PathBuf,
}

impl SourcePaths {
    /// The conventional file names inside one directory.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            application: dir.join("application_train.csv"),
            bureau: dir.join("bureau.csv"),
            card_balance: dir.join("credit_card_balance.csv"),
            previous_application: dir.join("previous_application.csv"),
        }
    }

    pub fn load(&self) -> Result<SourceTables> {
        Ok(SourceTables::new(
            load_table(&self.application).context("Loading application table")?,
            load_table(&self.bureau).context("Loading bureau table")?,
            load_table(&self.card_balance).context("Loading card balance table")?,
            load_table(&self.previous_application)
                .context("Loading previous application table")?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("credit-features-io-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_clean_csv_content() {
        let raw = "a,b\n\n\"\"x\"\",1\n";
        assert_eq!(clean_csv_content(raw), "a,b\n\"x\",1");
    }

    #[test]
    fn test_csv_write_then_load() {
        let path = temp_path("features.csv");
        let mut df = df![
            "SK_ID_CURR" => [1i64, 2],
            "ttl_bureau_cc_limit" => [Some(10.5), None],
        ]
        .unwrap();
        write_table(&mut df, &path).unwrap();

        let loaded = load_table(&path).unwrap();
        assert_eq!(loaded.shape(), (2, 2));
        assert_eq!(loaded.column("ttl_bureau_cc_limit").unwrap().null_count(), 1);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_in_dir_names() {
        let paths = SourcePaths::in_dir("data");
        assert_eq!(paths.bureau, PathBuf::from("data/bureau.csv"));
        assert!(!is_parquet(&paths.application));
        assert!(is_parquet(Path::new("x.PARQUET")));
    }
}
