//! Append-only CSV dataset storage.
//!
//! Every dataset lives in its own file inside the data directory. Files are
//! created lazily on the first append, and the header is written exactly once.
//! Rows are only ever appended.

use crate::error::StoreError;
use crate::models::{Dataset, Record};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File-backed store for the four study datasets.
#[derive(Debug, Clone)]
pub struct RecordStore {
    root: PathBuf,
}

impl RecordStore {
    /// Open the store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();

        if !root.is_dir() {
            info!("Creating data directory: {}", root.display());
        }
        fs::create_dir_all(&root).map_err(|source| StoreError::CreateDir {
            path: root.clone(),
            source,
        })?;

        Ok(Self { root })
    }

    /// Directory holding the dataset files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the backing file for a dataset.
    pub fn path_for(&self, dataset: Dataset) -> PathBuf {
        self.root.join(dataset.file_name())
    }

    /// Append one record to its dataset.
    ///
    /// A new (or empty) file gets the header row first. For an existing file
    /// the stored header must match the record's columns, otherwise nothing is
    /// written and `SchemaMismatch` is returned. Header and row go out in a
    /// single write.
    pub fn append<R: Record>(&self, record: &R) -> Result<(), StoreError> {
        let dataset = R::DATASET;
        let path = self.path_for(dataset);

        if let Some(found) = read_header(&path)? {
            check_columns(&path, dataset, found)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| StoreError::Open {
                path: path.clone(),
                source,
            })?;

        let is_new = file
            .metadata()
            .map_err(|source| StoreError::Open {
                path: path.clone(),
                source,
            })?
            .len()
            == 0;

        let buffer = encode_row(&path, record, is_new)?;

        file.write_all(&buffer)
            .and_then(|_| file.sync_data())
            .map_err(|source| StoreError::Write {
                path: path.clone(),
                source,
            })?;

        if is_new {
            info!("Created {} dataset at {}", dataset, path.display());
        }
        debug!("Appended {} bytes to {}", buffer.len(), path.display());

        Ok(())
    }

    /// Load every record of a dataset in file order.
    ///
    /// A dataset that has never been written yields an empty vector.
    pub fn load<R: Record>(&self) -> Result<Vec<R>, StoreError> {
        let dataset = R::DATASET;
        let path = self.path_for(dataset);

        if !path.is_file() {
            debug!("No {} dataset at {}", dataset, path.display());
            return Ok(Vec::new());
        }

        let file = File::open(&path).map_err(|source| StoreError::Open {
            path: path.clone(),
            source,
        })?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|source| StoreError::Decode {
                path: path.clone(),
                line: 1,
                source,
            })?
            .clone();
        if headers.is_empty() {
            return Ok(Vec::new());
        }
        let found = headers.iter().map(String::from).collect();
        check_columns(&path, dataset, found)?;

        let mut records = Vec::new();
        for (index, row) in reader.records().enumerate() {
            let fallback_line = index as u64 + 2;
            let row = row.map_err(|source| {
                let line = source.position().map_or(fallback_line, |p| p.line());
                StoreError::Decode {
                    path: path.clone(),
                    line,
                    source,
                }
            })?;
            let line = row.position().map_or(fallback_line, |p| p.line());

            // Two writers racing on a new file can both emit the header.
            if row == headers {
                warn!("Skipping repeated header at {}:{}", path.display(), line);
                continue;
            }

            let record = row
                .deserialize::<R>(Some(&headers))
                .map_err(|source| StoreError::Decode {
                    path: path.clone(),
                    line,
                    source,
                })?;
            records.push(record);
        }

        debug!("Loaded {} {} records", records.len(), dataset);
        Ok(records)
    }
}

/// Read the header row of an existing, non-empty dataset file.
fn read_header(path: &Path) -> Result<Option<Vec<String>>, StoreError> {
    if !path.is_file() {
        return Ok(None);
    }

    let file = File::open(path).map_err(|source| StoreError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(file);
    let headers = reader.headers().map_err(|source| StoreError::Decode {
        path: path.to_path_buf(),
        line: 1,
        source,
    })?;

    if headers.is_empty() {
        Ok(None)
    } else {
        Ok(Some(headers.iter().map(String::from).collect()))
    }
}

fn check_columns(path: &Path, dataset: Dataset, found: Vec<String>) -> Result<(), StoreError> {
    let expected = dataset.columns();

    if found.iter().map(String::as_str).eq(expected.iter().copied()) {
        Ok(())
    } else {
        Err(StoreError::SchemaMismatch {
            path: path.to_path_buf(),
            expected: expected.iter().map(|c| c.to_string()).collect(),
            found,
        })
    }
}

/// Encode a record (and optionally the header derived from its fields).
fn encode_row<R: Record>(path: &Path, record: &R, with_header: bool) -> Result<Vec<u8>, StoreError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(with_header)
        .from_writer(Vec::new());

    writer
        .serialize(record)
        .map_err(|source| StoreError::Encode {
            path: path.to_path_buf(),
            source,
        })?;

    writer.into_inner().map_err(|err| StoreError::Encode {
        path: path.to_path_buf(),
        source: csv::Error::from(err.into_error()),
    })
}
