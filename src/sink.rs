// src/sink.rs
//! Run log trail. One fully formatted, timestamped line per call.
//! Sinks are shared between the scheduler and manual runs, so they must
//! be callable from any thread, including after shutdown.
use std::{collections::VecDeque, sync::Mutex};

use chrono::Local;

use crate::config::consts::DEFAULT_MAX_LOG_LINES;
use crate::schedule::CancelToken;

pub trait LogSink: Send + Sync {
    fn log(&self, line: &str, is_error: bool);

    /// New line bound from a fresh settings snapshot. Unbounded sinks ignore it.
    fn resize(&self, _max_lines: usize) {}
}

/// Drops everything.
pub struct NullSink;
impl LogSink for NullSink {
    fn log(&self, _line: &str, _is_error: bool) {}
}

pub const ERROR_TAG: &str = "[ERROR] ";

/// `[YYYY-MM-DD HH:MM:SS] [ERROR] msg`, tag only for errors.
pub fn format_line(msg: &str, is_error: bool) -> String {
    let ts = Local::now().format("%Y-%m-%d %H:%M:%S");
    let tag = if is_error { ERROR_TAG } else { "" };
    format!("[{ts}] {tag}{msg}")
}

/// Format, mirror into the diagnostic log, hand to the sink.
pub fn emit(sink: &dyn LogSink, msg: &str, is_error: bool) {
    if is_error {
        loge!("{msg}");
    } else {
        logf!("{msg}");
    }
    sink.log(&format_line(msg, is_error), is_error);
}

/// Bounded in-memory trail, oldest lines out first.
pub struct LogBuffer {
    inner: Mutex<Ring>,
    echo: bool,
    cancel: CancelToken,
}

struct Ring {
    lines: VecDeque<String>,
    capacity: usize,
}

impl Ring {
    fn trim(&mut self) {
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }
}

impl LogBuffer {
    pub fn new(capacity: usize, cancel: CancelToken) -> Self {
        let capacity = if capacity == 0 { DEFAULT_MAX_LOG_LINES } else { capacity };
        Self {
            inner: Mutex::new(Ring { lines: VecDeque::with_capacity(capacity), capacity }),
            echo: false,
            cancel,
        }
    }

    /// Also print each line: errors to stderr, the rest to stdout.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Settings can change between runs; shrinking drops the oldest lines now.
    pub fn set_capacity(&self, capacity: usize) {
        if capacity == 0 {
            return;
        }
        let mut ring = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        ring.capacity = capacity;
        ring.trim();
    }

    pub fn lines(&self) -> Vec<String> {
        let ring = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        ring.lines.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LogSink for LogBuffer {
    fn log(&self, line: &str, is_error: bool) {
        if self.cancel.is_cancelled() {
            return;
        }
        // lock held while echoing so stdout order matches buffer order
        let mut ring = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        if self.echo {
            if is_error { eprintln!("{line}"); } else { println!("{line}"); }
        }
        ring.lines.push_back(s!(line));
        ring.trim();
    }

    fn resize(&self, max_lines: usize) {
        self.set_capacity(max_lines);
    }
}
