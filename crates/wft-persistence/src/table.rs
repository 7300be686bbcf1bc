//! ---
//! wft_section: "03-persistence"
//! wft_subsection: "module"
//! wft_type: "source"
//! wft_scope: "code"
//! wft_description: "Persistence abstractions and storage bindings."
//! wft_version: "v0.1.0"
//! wft_owner: "tbd"
//! ---
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use walkdir::WalkDir;

use crate::{PersistenceError, Result};

const DATA_FILE_PREFIX: &str = "part-";
const DATA_FILE_SUFFIX: &str = ".csv";

/// A deserialized row together with the partition values of the file it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionedRow<T> {
    /// `(column, value)` pairs in the table's partition order.
    pub partitions: Vec<(String, String)>,
    /// Row payload.
    pub row: T,
}

impl<T> PartitionedRow<T> {
    /// Value of one partition column, if present.
    pub fn partition(&self, column: &str) -> Option<&str> {
        self.partitions
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }
}

/// Append-only CSV dataset laid out as `root/col=value/.../part-<id>.csv`.
///
/// Every write lands in fresh files, so concurrent readers only ever see
/// complete files and nothing is overwritten.
#[derive(Debug, Clone)]
pub struct PartitionedTable {
    root: PathBuf,
    partition_columns: Vec<String>,
}

impl PartitionedTable {
    /// Describe a table rooted at `root` partitioned by `partition_columns`.
    pub fn new(root: impl Into<PathBuf>, partition_columns: &[&str]) -> Self {
        Self {
            root: root.into(),
            partition_columns: partition_columns.iter().map(|c| (*c).to_owned()).collect(),
        }
    }

    /// Dataset root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the dataset root has been created.
    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Write `rows` grouped by the partition values `partition_of` returns.
    ///
    /// One new file is created per distinct partition; rows keep their input
    /// order inside it. Returns the created file paths.
    pub fn write_batch<T, F>(&self, rows: &[T], partition_of: F) -> Result<Vec<PathBuf>>
    where
        T: Serialize,
        F: Fn(&T) -> Vec<String>,
    {
        let mut groups: BTreeMap<Vec<String>, Vec<&T>> = BTreeMap::new();
        for row in rows {
            let values = partition_of(row);
            if values.len() != self.partition_columns.len() {
                return Err(PersistenceError::PartitionArity {
                    expected: self.partition_columns.len(),
                    actual: values.len(),
                });
            }
            groups.entry(values).or_default().push(row);
        }

        let mut written = Vec::with_capacity(groups.len());
        for (values, group) in groups {
            let dir = self.partition_dir(&values);
            fs::create_dir_all(&dir)?;
            written.push(write_part(&dir, &group)?);
        }
        debug!(
            table = %self.root.display(),
            rows = rows.len(),
            files = written.len(),
            "table batch written"
        );
        Ok(written)
    }

    /// Every data file in the table, ordered by path.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        if !self.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() && is_data_file(entry.file_name().to_str()) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }

    /// Read the whole dataset in file-name order.
    pub fn read_all<T: DeserializeOwned>(&self) -> Result<Vec<PartitionedRow<T>>> {
        let mut rows = Vec::new();
        for file in self.files()? {
            let partitions = self.partitions_of(&file)?;
            let mut reader = csv::Reader::from_path(&file)?;
            for record in reader.deserialize() {
                rows.push(PartitionedRow {
                    partitions: partitions.clone(),
                    row: record?,
                });
            }
        }
        Ok(rows)
    }

    /// Distinct values of one partition column across every data file.
    pub fn partition_values(&self, column: &str) -> Result<BTreeSet<String>> {
        let mut values = BTreeSet::new();
        for file in self.files()? {
            if let Some((_, value)) = self
                .partitions_of(&file)?
                .into_iter()
                .find(|(name, _)| name == column)
            {
                values.insert(value);
            }
        }
        Ok(values)
    }

    fn partition_dir(&self, values: &[String]) -> PathBuf {
        self.partition_columns
            .iter()
            .zip(values)
            .fold(self.root.clone(), |dir, (column, value)| {
                dir.join(format!("{column}={}", escape_partition_value(value)))
            })
    }

    fn partitions_of(&self, file: &Path) -> Result<Vec<(String, String)>> {
        let relative_dir = file
            .parent()
            .and_then(|parent| parent.strip_prefix(&self.root).ok())
            .unwrap_or_else(|| Path::new(""));
        relative_dir
            .components()
            .map(|component| {
                let segment = component.as_os_str().to_string_lossy();
                segment
                    .split_once('=')
                    .and_then(|(column, raw)| {
                        unescape_partition_value(raw).map(|value| (column.to_owned(), value))
                    })
                    .ok_or_else(|| PersistenceError::MalformedPartition {
                        segment: segment.to_string(),
                        path: file.to_path_buf(),
                    })
            })
            .collect()
    }
}

fn is_data_file(name: Option<&str>) -> bool {
    name.is_some_and(|n| n.starts_with(DATA_FILE_PREFIX) && n.ends_with(DATA_FILE_SUFFIX))
}

fn write_part<T: Serialize>(dir: &Path, rows: &[&T]) -> Result<PathBuf> {
    let staging = tempfile::Builder::new()
        .prefix(".part-")
        .suffix(".csv.tmp")
        .tempfile_in(dir)?;
    let mut writer = csv::Writer::from_writer(staging);
    for row in rows {
        writer.serialize(row)?;
    }
    let mut staging = writer
        .into_inner()
        .map_err(|err| {
            PersistenceError::Io(std::io::Error::new(err.error().kind(), err.error().to_string()))
        })?;
    staging.flush()?;

    let target = dir.join(format!(
        "{DATA_FILE_PREFIX}{}{DATA_FILE_SUFFIX}",
        uuid::Uuid::now_v7().simple()
    ));
    staging
        .persist(&target)
        .map_err(|err| PersistenceError::Persist {
            path: target.clone(),
            source: err.error,
        })?;
    Ok(target)
}

/// Percent-escape the characters that cannot appear in a partition segment.
pub fn escape_partition_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '%' => escaped.push_str("%25"),
            '/' => escaped.push_str("%2F"),
            ':' => escaped.push_str("%3A"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Inverse of [`escape_partition_value`]; `None` on a truncated or non-hex escape.
pub fn unescape_partition_value(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = raw.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
