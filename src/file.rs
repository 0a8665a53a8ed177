// src/file.rs

use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufWriter, ErrorKind},
    path::{Path, PathBuf},
};

use chrono::{Local, NaiveDateTime};

use crate::core::sanitize::sanitize_file_stem;
use crate::csv::write_records;
use crate::error::PersistError;
use crate::record::MonitoringRecord;

/// Where a run's records end up. Returns the location written.
pub trait Persist: Send + Sync {
    fn persist(&self, records: &[MonitoringRecord], prefix: &str) -> Result<PathBuf, PersistError>;
}

/// One timestamped, BOM-prefixed CSV per run under `dir`.
pub struct CsvStore {
    dir: PathBuf,
}

impl CsvStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Like `persist`, with the clock supplied.
    pub fn persist_at(
        &self,
        records: &[MonitoringRecord],
        prefix: &str,
        at: NaiveDateTime,
    ) -> Result<PathBuf, PersistError> {
        if records.is_empty() {
            return Err(PersistError::Empty);
        }
        let io_err = |path: &Path, source: io::Error| PersistError::Io { path: path.to_path_buf(), source };

        ensure_directory(&self.dir).map_err(|e| io_err(&self.dir, e))?;

        let stem = format!("{}_{}", sanitize_file_stem(prefix, "records"), at.format("%Y%m%d_%H%M%S"));
        let (path, file) = create_unique(&self.dir, &stem, "csv").map_err(|e| io_err(&self.dir, e))?;

        write_records(BufWriter::new(file), records, true).map_err(|e| io_err(&path, e))?;
        logf!("Store: {} records -> {}", records.len(), path.display());
        Ok(path)
    }
}

impl Persist for CsvStore {
    fn persist(&self, records: &[MonitoringRecord], prefix: &str) -> Result<PathBuf, PersistError> {
        self.persist_at(records, prefix, Local::now().naive_local())
    }
}

pub fn ensure_directory(dir: &Path) -> io::Result<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("Path exists but is not a directory: {}", dir.display()),
        ));
    }
    if !dir.exists() { fs::create_dir_all(dir)?; }
    Ok(())
}

/// "<stem>.ext", then "<stem> (2).ext", "<stem> (3).ext", ... for the first
/// name nobody holds. `create_new` keeps two runs in the same second apart.
fn create_unique(dir: &Path, stem: &str, ext: &str) -> io::Result<(PathBuf, File)> {
    let mut n = 1usize;
    loop {
        let filename = if n == 1 {
            format!("{stem}.{ext}")
        } else {
            format!("{stem} ({n}).{ext}")
        };
        let path = dir.join(filename);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(f) => return Ok((path, f)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => n += 1,
            Err(e) => return Err(e),
        }
    }
}
