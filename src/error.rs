// src/error.rs
use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },
    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("{url} returned an empty page")]
    Empty { url: String },
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("no records to save")]
    Empty,
    #[error("cannot write {}: {source}", .path.display())]
    Io { path: PathBuf, #[source] source: io::Error },
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("file to publish not found: {}", .0.display())]
    Missing(PathBuf),
    #[error("`git {step}` failed: {detail}")]
    Git { step: String, detail: String },
    #[error("cannot run git: {0}")]
    Spawn(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings from {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },
    #[error("cannot write default settings to {}: {source}", .path.display())]
    Init { path: PathBuf, #[source] source: io::Error },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("time of day {value:?} is not HH:MM")]
pub struct ScheduleConfigError {
    pub value: String,
}

/// Why one run stopped early. Publishing is not in here: a failed publish
/// does not fail the run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("settings: {0}")]
    Settings(#[from] SettingsError),
    #[error("fetch: {0}")]
    Fetch(#[from] FetchError),
    #[error("no monitoring records found on the page")]
    EmptyResult,
    #[error("persist: {0}")]
    Persist(#[from] PersistError),
    #[error("run aborted unexpectedly: {0}")]
    Panicked(String),
}

/// Why a manual run was not started.
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("a manual run is already in progress")]
    Busy,
    #[error("shutting down, no new runs")]
    Cancelled,
    #[error("cannot start worker thread: {0}")]
    Spawn(#[from] io::Error),
}
