// src/schedule.rs
//! Daily scheduler.
//!
//! ```text
//! Idle -> Waiting(target) -> Firing -> Waiting(next) -> ...
//!            |                  |
//!            +---- error/panic -+--> Recovering -> Idle
//! any state --cancel--> Cancelled
//! ```
//!
//! The wait is a poll loop: sleep at most one poll interval, re-read the
//! clock, check the cancel flag. Nothing sleeps longer than one interval, so
//! `cancel()` is observed within one increment. Only cancellation ends the
//! loop; a failed cycle waits out the recovery period and starts over.

use std::{
    io,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use chrono::{Local, NaiveDateTime, NaiveTime, TimeDelta};

use crate::{
    config::{
        consts::{BAD_TIME_RETRY_MINS, ERROR_LOG_CHARS, POLL_INTERVAL_MS, RECOVERY_POLLS},
        SettingsProvider,
    },
    core::sanitize::truncate_chars,
    error::{ScheduleConfigError, SettingsError},
    runner::{Job, SCHEDULED_LABEL},
    sink::{emit, LogSink},
};

/// One-way shutdown flag shared by everything that must stop.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Wall-clock access, replaceable in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
    fn sleep(&self, d: Duration);
}

/// Local time and `thread::sleep`.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn sleep(&self, d: Duration) {
        thread::sleep(d);
    }
}

/// Today at `time_of_day` ("HH:MM") if that is still ahead of `now`,
/// otherwise tomorrow at the same time.
pub fn next_target(now: NaiveDateTime, time_of_day: &str) -> Result<NaiveDateTime, ScheduleConfigError> {
    let raw = time_of_day.trim();
    let at = NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|_| ScheduleConfigError { value: s!(raw) })?;

    let today = now.date().and_time(at);
    Ok(if today > now { today } else { today + TimeDelta::days(1) })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Waiting(NaiveDateTime),
    Firing,
    Recovering,
    Cancelled,
}

enum CycleEnd {
    Fired,
    Cancelled,
}

pub struct Scheduler {
    job: Arc<dyn Job>,
    settings: Arc<dyn SettingsProvider>,
    sink: Arc<dyn LogSink>,
    cancel: CancelToken,
    clock: Arc<dyn Clock>,
    poll: Duration,
    recovery_polls: u32,
    phase: Arc<Mutex<Phase>>,
}

impl Scheduler {
    pub fn new(
        job: Arc<dyn Job>,
        settings: Arc<dyn SettingsProvider>,
        sink: Arc<dyn LogSink>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            job,
            settings,
            sink,
            cancel,
            clock: Arc::new(SystemClock),
            poll: Duration::from_millis(POLL_INTERVAL_MS),
            recovery_polls: RECOVERY_POLLS,
            phase: Arc::new(Mutex::new(Phase::Idle)),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Zero is bumped to one millisecond so the wait still yields.
    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll = poll.max(Duration::from_millis(1));
        self
    }

    /// Number of poll intervals to sit out after a failed cycle.
    pub fn with_recovery(mut self, polls: u32) -> Self {
        self.recovery_polls = polls;
        self
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_phase(&self, phase: Phase) {
        *self.phase.lock().unwrap_or_else(|p| p.into_inner()) = phase;
    }

    fn say(&self, msg: &str, is_error: bool) {
        emit(self.sink.as_ref(), msg, is_error);
    }

    /// Blocks until cancelled.
    pub fn run(&self) {
        logd!("Scheduler: poll {:?}, recovery {} polls", self.poll, self.recovery_polls);
        while !self.cancel.is_cancelled() {
            let why = match catch_unwind(AssertUnwindSafe(|| self.cycle())) {
                Ok(Ok(CycleEnd::Fired)) => continue,
                Ok(Ok(CycleEnd::Cancelled)) => break,
                Ok(Err(e)) => e.to_string(),
                Err(_) => s!("scheduler cycle panicked"),
            };
            self.set_phase(Phase::Recovering);
            self.say(&format!("Scheduler error: {}; retrying shortly", truncate_chars(&why, ERROR_LOG_CHARS)), true);
            self.recovery_wait();
            self.set_phase(Phase::Idle);
        }
        self.set_phase(Phase::Cancelled);
        logf!("Scheduler: stopped");
    }

    fn cycle(&self) -> Result<CycleEnd, SettingsError> {
        let settings = self.settings.snapshot()?;
        let now = self.clock.now();
        let target = match next_target(now, &settings.scraping.schedule_time) {
            Ok(t) => t,
            Err(e) => {
                let retry = now + TimeDelta::minutes(BAD_TIME_RETRY_MINS);
                self.say(&format!("{e}; trying again at {}", retry.format("%Y-%m-%d %H:%M:%S")), true);
                retry
            }
        };

        self.set_phase(Phase::Waiting(target));
        self.say(&format!("Next scheduled run at {}", target.format("%Y-%m-%d %H:%M:%S")), false);
        if !self.wait_until(target) {
            return Ok(CycleEnd::Cancelled);
        }

        self.set_phase(Phase::Firing);
        let outcome = self.job.run_once(SCHEDULED_LABEL);
        logd!("Scheduler: run ended, completed={}", outcome.is_completed());
        self.set_phase(Phase::Idle);
        Ok(CycleEnd::Fired)
    }

    /// `false` if cancelled first.
    fn wait_until(&self, target: NaiveDateTime) -> bool {
        loop {
            if self.cancel.is_cancelled() {
                return false;
            }
            let now = self.clock.now();
            if now >= target {
                return true;
            }
            let remaining = (target - now).to_std().unwrap_or(Duration::ZERO);
            self.clock.sleep(remaining.min(self.poll));
        }
    }

    fn recovery_wait(&self) {
        for _ in 0..self.recovery_polls {
            if self.cancel.is_cancelled() {
                return;
            }
            self.clock.sleep(self.poll);
        }
    }

    /// Run on a background thread named `scheduler`.
    pub fn spawn(self) -> io::Result<SchedulerHandle> {
        let cancel = self.cancel.clone();
        let phase = Arc::clone(&self.phase);
        let thread = thread::Builder::new().name(s!("scheduler")).spawn(move || self.run())?;
        Ok(SchedulerHandle { cancel, phase, thread })
    }
}

pub struct SchedulerHandle {
    cancel: CancelToken,
    phase: Arc<Mutex<Phase>>,
    thread: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    pub fn join(self) -> thread::Result<()> {
        self.thread.join()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(h, m, s).unwrap()
    }

    #[test]
    fn before_time_means_today() {
        assert_eq!(next_target(at(9, 30, 0), "10:00").unwrap(), at(10, 0, 0));
    }

    #[test]
    fn after_or_at_time_means_tomorrow() {
        let tomorrow = at(10, 0, 0) + TimeDelta::days(1);
        assert_eq!(next_target(at(10, 0, 1), "10:00").unwrap(), tomorrow);
        assert_eq!(next_target(at(10, 0, 0), "10:00").unwrap(), tomorrow);
    }

    #[test]
    fn rolls_over_month_end() {
        let now = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap().and_hms_opt(23, 0, 0).unwrap();
        let want = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(8, 15, 0).unwrap();
        assert_eq!(next_target(now, " 08:15 ").unwrap(), want);
    }

    #[test]
    fn malformed_time_is_config_error() {
        for bad in ["", "25:00", "10-00", "ten", "10:61"] {
            let err = next_target(at(9, 0, 0), bad).unwrap_err();
            assert_eq!(err.value, bad.trim());
        }
    }

    #[test]
    fn token_is_shared_and_one_way() {
        let a = CancelToken::new();
        let b = a.clone();
        assert!(!b.is_cancelled());
        a.cancel();
        a.cancel();
        assert!(b.is_cancelled());
    }
}
