// src/runner.rs
use std::{
    any::Any,
    panic::{catch_unwind, AssertUnwindSafe},
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use crate::{
    config::{consts::{ERROR_LOG_CHARS, URL_LOG_CHARS}, SettingsProvider},
    core::{net::Fetch, sanitize::{sanitize_str, truncate_chars}},
    error::{PublishError, RunError, TriggerError},
    file::Persist,
    publish::Publish,
    schedule::CancelToken,
    sink::{emit, LogSink},
    specs::{self, Patterns},
};

pub const SCHEDULED_LABEL: &str = "scheduled";
pub const MANUAL_LABEL: &str = "manual";

#[derive(Debug)]
pub enum PublishStatus {
    Disabled,
    Published,
    /// Logged, not fatal: the file is already written.
    Failed(PublishError),
}

/// What a successful run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub records: usize,
    pub location: PathBuf,
    pub publish: PublishStatus,
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunSummary),
    Failed(RunError),
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }
}

/// One self-contained run. Implementations never panic out and never block
/// past a single run.
pub trait Job: Send + Sync {
    fn run_once(&self, label: &str) -> RunOutcome;
}

/// Settings → fetch → parse → persist → publish.
pub struct Runner {
    settings: Arc<dyn SettingsProvider>,
    fetcher: Arc<dyn Fetch>,
    store: Arc<dyn Persist>,
    publisher: Arc<dyn Publish>,
    sink: Arc<dyn LogSink>,
    patterns: Patterns,
}

impl Runner {
    pub fn new(
        settings: Arc<dyn SettingsProvider>,
        fetcher: Arc<dyn Fetch>,
        store: Arc<dyn Persist>,
        publisher: Arc<dyn Publish>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self { settings, fetcher, store, publisher, sink, patterns: Patterns::default() }
    }

    pub fn with_patterns(mut self, patterns: Patterns) -> Self {
        self.patterns = patterns;
        self
    }

    fn say(&self, msg: &str, is_error: bool) {
        emit(self.sink.as_ref(), msg, is_error);
    }

    /// Run the whole sequence once. Every failure, panics included, ends up
    /// as exactly one error line and a `Failed` outcome; nothing propagates.
    pub fn run_once(&self, label: &str) -> RunOutcome {
        let label = sanitize_str(label, MANUAL_LABEL);
        self.say(&format!("=== {label} run started ==="), false);

        match catch_unwind(AssertUnwindSafe(|| self.steps())) {
            Ok(Ok(summary)) => {
                self.say(&format!("=== {label} run finished ==="), false);
                RunOutcome::Completed(summary)
            }
            Ok(Err(e)) => {
                let why = truncate_chars(&e.to_string(), ERROR_LOG_CHARS);
                self.say(&format!("{label} run failed: {why}"), true);
                RunOutcome::Failed(e)
            }
            Err(payload) => {
                let why = truncate_chars(&panic_message(payload.as_ref()), ERROR_LOG_CHARS);
                self.say(&format!("{label} run aborted: {why}"), true);
                RunOutcome::Failed(RunError::Panicked(why))
            }
        }
    }

    fn steps(&self) -> Result<RunSummary, RunError> {
        let settings = self.settings.snapshot()?;
        self.sink.resize(settings.logging.max_log_lines);
        let scraping = &settings.scraping;

        self.say(&format!("Requesting {}", truncate_chars(&scraping.target_url, URL_LOG_CHARS)), false);
        let content = self.fetcher.fetch(&scraping.target_url, scraping.delay)?;

        self.say("Parsing page", false);
        let records = specs::parse_with(&content, &self.patterns);
        drop(content);
        if records.is_empty() {
            return Err(RunError::EmptyResult);
        }
        self.say(&format!("Parsed {} stations", records.len()), false);

        self.say("Saving records", false);
        let location = self.store.persist(&records, &scraping.output_prefix)?;
        let shown = location
            .file_name()
            .map_or_else(|| location.display().to_string(), |n| n.to_string_lossy().into_owned());
        self.say(&format!("Saved to {shown}"), false);

        let publishing = &settings.publishing;
        let publish = if publishing.publish_enabled {
            self.say("Publishing to git", false);
            match self.publisher.publish(&location, &publishing.commit_message_prefix) {
                Ok(()) => {
                    self.say("Publish succeeded", false);
                    PublishStatus::Published
                }
                Err(e) => {
                    let why = truncate_chars(&e.to_string(), ERROR_LOG_CHARS);
                    self.say(&format!("Publish failed (check the repository setup): {why}"), true);
                    PublishStatus::Failed(e)
                }
            }
        } else {
            self.say("Publishing disabled", false);
            PublishStatus::Disabled
        };

        Ok(RunSummary { records: records.len(), location, publish })
    }
}

impl Job for Runner {
    fn run_once(&self, label: &str) -> RunOutcome {
        Runner::run_once(self, label)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s!(*s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        s!("unknown panic")
    }
}

/// On-demand runs on their own thread, one at a time.
pub struct ManualTrigger {
    job: Arc<dyn Job>,
    busy: Arc<AtomicBool>,
    cancel: CancelToken,
}

/// Clears the busy flag however the worker ends.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ManualTrigger {
    pub fn new(job: Arc<dyn Job>, cancel: CancelToken) -> Self {
        Self { job, busy: Arc::new(AtomicBool::new(false)), cancel }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn trigger(&self) -> Result<JoinHandle<RunOutcome>, TriggerError> {
        if self.cancel.is_cancelled() {
            return Err(TriggerError::Cancelled);
        }
        if self.busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
            logd!("Trigger: rejected, previous manual run still going");
            return Err(TriggerError::Busy);
        }
        let guard = BusyGuard(Arc::clone(&self.busy));
        let job = Arc::clone(&self.job);

        // a failed spawn drops the closure, and the guard with it
        let handle = thread::Builder::new().name(s!("manual-run")).spawn(move || {
            let _guard = guard;
            job.run_once(MANUAL_LABEL)
        })?;
        Ok(handle)
    }
}
