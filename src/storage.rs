//! Time-rotated CSV persistence. Exactly one stage (the ingest pipeline's
//! decoder-storer) ever writes a given sink, so no internal locking is
//! needed — it is a single-writer resource, the same way the serial port
//! is exclusively owned by one stage at a time.

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use chrono::{Local, NaiveDateTime, TimeZone};
use std::fs::{self, File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{error, info, warn};

const FILE_PREFIX: &str = "data_";
const FILE_SUFFIX: &str = ".csv";
const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";
/// Length of the `YYYYMMDD-HHMMSS` timestamp substring in a rotated file name.
const TIMESTAMP_LEN: usize = 15;

struct OpenFile {
    writer: csv::Writer<File>,
    path: PathBuf,
    opened_at: SystemTime,
}

/// Appends fixed-schema rows to a CSV file, rotating to a new file once the
/// current one has been open for `rotation_interval`.
pub struct RotatingCsvSink {
    cfg: StorageConfig,
    fields: Vec<String>,
    current: Option<OpenFile>,
}

impl RotatingCsvSink {
    /// `fields` is the caller-supplied column list; `timestamp` is always
    /// column zero and is not part of `fields`.
    pub fn new(cfg: StorageConfig, fields: Vec<String>) -> Self {
        Self {
            cfg,
            fields,
            current: None,
        }
    }

    fn header(&self) -> Vec<String> {
        let mut header = vec!["timestamp".to_string()];
        header.extend(self.fields.iter().cloned());
        header
    }

    fn file_name(opened_at: SystemTime) -> String {
        let datetime: chrono::DateTime<Local> = opened_at.into();
        format!(
            "{FILE_PREFIX}{}{FILE_SUFFIX}",
            datetime.format(TIMESTAMP_FORMAT)
        )
    }

    /// Parse the `YYYYMMDD-HHMMSS` substring out of a rotated file name, used
    /// by *continue_file* mode to tell whether that file is still within its
    /// rotation window.
    fn parse_open_time(path: &Path) -> Option<SystemTime> {
        let stem = path.file_stem()?.to_str()?;
        let ts = stem.strip_prefix(FILE_PREFIX)?;
        if ts.len() != TIMESTAMP_LEN {
            return None;
        }
        let naive = NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT).ok()?;
        let local = Local.from_local_datetime(&naive).single()?;
        Some(local.into())
    }

    /// Scan `output_dir` for the most recently named `data_*.csv` file.
    fn most_recent_existing_file(&self) -> Option<PathBuf> {
        let mut candidates: Vec<PathBuf> = fs::read_dir(&self.cfg.output_dir)
            .ok()?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with(FILE_PREFIX) && n.ends_with(FILE_SUFFIX))
                    .unwrap_or(false)
            })
            .collect();
        candidates.sort();
        candidates.pop()
    }

    /// *new_file* mode: always open a fresh file.
    fn open_fresh(&mut self) -> Result<()> {
        fs::create_dir_all(&self.cfg.output_dir).map_err(Error::Transport)?;
        let opened_at = SystemTime::now();
        let path = self.cfg.output_dir.join(Self::file_name(opened_at));
        let file = File::create(&path).map_err(Error::Transport)?;
        let mut writer = csv::WriterBuilder::new().from_writer(file);
        writer
            .write_record(self.header())
            .map_err(Error::Storage)?;
        writer.flush().map_err(Error::Transport)?;
        info!(path = %path.display(), "opened new CSV file");
        self.current = Some(OpenFile {
            writer,
            path,
            opened_at,
        });
        Ok(())
    }

    /// *continue_file* mode: reopen the most recent file in append mode if
    /// it is still inside its rotation window; otherwise fall back to
    /// opening fresh.
    fn open_continue(&mut self) -> Result<()> {
        let Some(path) = self.most_recent_existing_file() else {
            return self.open_fresh();
        };
        let Some(opened_at) = Self::parse_open_time(&path) else {
            warn!(path = %path.display(), "could not parse open time, starting a fresh file");
            return self.open_fresh();
        };
        let elapsed = SystemTime::now()
            .duration_since(opened_at)
            .unwrap_or(Duration::MAX);
        if elapsed >= self.cfg.rotation_interval {
            return self.open_fresh();
        }

        let file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(Error::Transport)?;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        info!(path = %path.display(), "continuing existing CSV file");
        self.current = Some(OpenFile {
            writer,
            path,
            opened_at,
        });
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        if self.cfg.continue_on_startup {
            self.open_continue()
        } else {
            self.open_fresh()
        }
    }

    fn needs_rotation(&self, now: SystemTime) -> bool {
        match &self.current {
            Some(open) => now
                .duration_since(open.opened_at)
                .map(|elapsed| elapsed >= self.cfg.rotation_interval)
                .unwrap_or(false),
            None => false,
        }
    }

    /// Append one row. `values` must be in the same order as the `fields`
    /// this sink was constructed with. A write whose wall-clock time has
    /// crossed the rotation boundary closes the current file and opens a
    /// new one first.
    pub fn write_row(&mut self, timestamp_unix_s: f64, values: &[f64]) -> Result<()> {
        debug_assert_eq!(values.len(), self.fields.len());

        let now = SystemTime::now();
        if self.current.is_none() {
            self.open()?;
        } else if self.needs_rotation(now) {
            self.close();
            self.open_fresh()?;
        }

        let open = self.current.as_mut().expect("just opened above");
        let mut record = vec![format!("{timestamp_unix_s}")];
        record.extend(values.iter().map(|v| format!("{v}")));

        if let Err(e) = open.writer.write_record(&record).and_then(|_| {
            open.writer.flush().map_err(csv::Error::from)
        }) {
            error!(error = %e, path = %open.path.display(), "CSV write failed, dropping row and closing file");
            self.current = None;
            return Err(Error::Storage(e));
        }
        Ok(())
    }

    /// Idempotent: closing an already-closed sink is a no-op. Any I/O error
    /// while flushing/closing is logged and swallowed, never propagated.
    pub fn close(&mut self) {
        if let Some(mut open) = self.current.take() {
            if let Err(e) = open.writer.flush() {
                warn!(error = %e, path = %open.path.display(), "error flushing CSV file on close");
            }
        }
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(|o| o.path.as_path())
    }
}

impl Drop for RotatingCsvSink {
    fn drop(&mut self) {
        self.close();
    }
}

/// Post-upload lifecycle: an external uploader renames a rotated file
/// `X.csv -> X.csv.sent` once it has shipped it (an empty rotation window
/// is instead marked `.empty`); this deletes either suffix once the file's
/// modification time is older than `max_age`. Returns the number of files
/// removed. Errors removing an individual file are logged and do not stop
/// the sweep.
pub fn cleanup_uploaded_files(dir: &Path, max_age: Duration) -> Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => return Err(Error::Transport(e)),
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        let is_uploaded = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(".sent") || n.ends_with(".empty"))
            .unwrap_or(false);
        if !is_uploaded {
            continue;
        }
        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        if age.map(|a| a >= max_age).unwrap_or(false) {
            match fs::remove_file(&path) {
                Ok(()) => {
                    removed += 1;
                    info!(path = %path.display(), "removed aged-out uploaded file");
                }
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove uploaded file"),
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
#[path = "tests/storage.rs"]
mod storage_tests;
