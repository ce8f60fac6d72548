//! CSV importers behind the `import-csv` and `import-wallet-profiles`
//! commands.
//!
//! Imports are idempotent: rows are upserted by the id they carry in the
//! export, so re-running an import updates rows in place.

pub mod hierarchy;
pub mod parse;
pub mod wallet_profiles;

use std::{
    collections::HashMap,
    hash::Hash,
    path::{Path, PathBuf},
};

use serde::de::DeserializeOwned;

/// Errors raised while importing exports.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Input not found: {0}")]
    MissingInput(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read every row of a CSV file into `T`.
///
/// A leading UTF-8 byte order mark is ignored. Columns missing from the file
/// fall back to the field defaults of `T`; extra columns are ignored.
pub async fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ImportError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    parse_rows(&content).map_err(|source| ImportError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse CSV text (with header row) into `T`.
pub fn parse_rows<T: DeserializeOwned>(content: &str) -> Result<Vec<T>, csv::Error> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    reader.deserialize().collect()
}

/// Drop earlier rows that share a key with a later one.
///
/// A multi-row upsert cannot touch the same row twice, and in the exports
/// the last occurrence of an id is the current one.
pub fn keep_last<T, K: Eq + Hash>(rows: Vec<T>, key: impl Fn(&T) -> K) -> Vec<T> {
    let mut slots: HashMap<K, usize> = HashMap::with_capacity(rows.len());
    let mut kept: Vec<T> = Vec::with_capacity(rows.len());
    for row in rows {
        match slots.get(&key(&row)) {
            Some(&slot) => kept[slot] = row,
            None => {
                slots.insert(key(&row), kept.len());
                kept.push(row);
            }
        }
    }
    kept
}
