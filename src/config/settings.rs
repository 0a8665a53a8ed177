// src/config/settings.rs
//
// Settings are read into an immutable snapshot at the start of every run and
// every scheduler cycle. Nothing holds on to a snapshot across runs, so edits
// to the file take effect on the next cycle.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
    sync::RwLock,
};

use config::{Config, File, FileFormat, Value};

use super::consts::*;
use crate::core::sanitize::{sanitize, RawValue};
use crate::error::SettingsError;

/// Random wait before each request, whole seconds, `min <= max`, `min >= 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DelayRange {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl Default for DelayRange {
    fn default() -> Self {
        Self { min_secs: DEFAULT_DELAY_MIN_SECS, max_secs: DEFAULT_DELAY_MAX_SECS }
    }
}

impl DelayRange {
    /// "min,max". Each side falls back on its own if it is not all digits.
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split(',').map(str::trim);
        let min = parts.next().and_then(digits).unwrap_or(DEFAULT_DELAY_MIN_SECS);
        let max = parts.next().and_then(digits).unwrap_or(DEFAULT_DELAY_MAX_SECS);
        let min = min.max(1);
        Self { min_secs: min, max_secs: max.max(min) }
    }
}

fn digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScrapingSettings {
    /// Raw "HH:MM"; validated by the scheduler so a typo can be reported there.
    pub schedule_time: String,
    pub target_url: String,
    pub delay: DelayRange,
    pub output_prefix: String,
    pub output_dir: PathBuf,
    pub verify_tls: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishingSettings {
    pub commit_message_prefix: String,
    pub publish_enabled: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingSettings {
    pub max_log_lines: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub scraping: ScrapingSettings,
    pub publishing: PublishingSettings,
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_lookup(|_| RawValue::Absent)
    }
}

impl Settings {
    /// Build a snapshot from `"section.key"` lookups. Every value is
    /// sanitized; anything missing or malformed gets its documented default.
    pub fn from_lookup<F: Fn(&str) -> RawValue>(get: F) -> Self {
        let text = |key: &str, default: &str| sanitize(&get(key), default);
        let flag = |key: &str, default: bool| {
            parse_bool(&text(key, if default { "true" } else { "false" })).unwrap_or(default)
        };

        let max_log_lines = text("logging.max_log_lines", "")
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_LOG_LINES);

        Self {
            scraping: ScrapingSettings {
                schedule_time: text("scraping.schedule_time", DEFAULT_SCHEDULE_TIME),
                target_url: text("scraping.target_url", DEFAULT_TARGET_URL),
                delay: DelayRange::parse(&text("scraping.delay_range", "")),
                output_prefix: text("scraping.output_prefix", DEFAULT_OUTPUT_PREFIX),
                output_dir: PathBuf::from(text("scraping.output_dir", DEFAULT_OUTPUT_DIR)),
                verify_tls: flag("scraping.verify_tls", DEFAULT_VERIFY_TLS),
            },
            publishing: PublishingSettings {
                commit_message_prefix: text("publishing.commit_message_prefix", DEFAULT_COMMIT_PREFIX),
                publish_enabled: flag("publishing.publish_enabled", DEFAULT_PUBLISH_ENABLED),
            },
            logging: LoggingSettings { max_log_lines },
        }
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.scraping;
        let p = &self.publishing;
        writeln!(f, "[scraping]")?;
        writeln!(f, "schedule_time = {}", s.schedule_time)?;
        writeln!(f, "target_url = {}", s.target_url)?;
        writeln!(f, "delay_range = {},{} (seconds)", s.delay.min_secs, s.delay.max_secs)?;
        writeln!(f, "output_prefix = {}", s.output_prefix)?;
        writeln!(f, "output_dir = {}", s.output_dir.display())?;
        writeln!(f, "verify_tls = {}", s.verify_tls)?;
        writeln!(f)?;
        writeln!(f, "[publishing]")?;
        writeln!(f, "commit_message_prefix = {}", p.commit_message_prefix)?;
        writeln!(f, "publish_enabled = {}", p.publish_enabled)?;
        writeln!(f)?;
        writeln!(f, "[logging]")?;
        write!(f, "max_log_lines = {}", self.logging.max_log_lines)
    }
}

/// Source of settings snapshots. Called from several threads.
pub trait SettingsProvider: Send + Sync {
    fn snapshot(&self) -> Result<Settings, SettingsError>;
}

/// Fixed snapshot, swappable as a whole.
pub struct StaticSettings {
    inner: RwLock<Settings>,
}

impl StaticSettings {
    pub fn new(settings: Settings) -> Self {
        Self { inner: RwLock::new(settings) }
    }

    pub fn replace(&self, settings: Settings) {
        match self.inner.write() {
            Ok(mut guard) => *guard = settings,
            Err(poisoned) => *poisoned.into_inner() = settings,
        }
    }
}

impl SettingsProvider for StaticSettings {
    fn snapshot(&self) -> Result<Settings, SettingsError> {
        let guard = self.inner.read().unwrap_or_else(|p| p.into_inner());
        Ok(guard.clone())
    }
}

/// `config.ini`-backed settings, re-read on every snapshot.
pub struct IniSettings {
    path: PathBuf,
}

impl IniSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the default file if there is none. Returns whether it wrote.
    pub fn ensure_default_file(&self) -> Result<bool, SettingsError> {
        if self.path.exists() {
            return Ok(false);
        }
        let init_err = |source: std::io::Error| SettingsError::Init { path: self.path.clone(), source };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(init_err)?;
            }
        }
        fs::write(&self.path, DEFAULT_INI).map_err(init_err)?;
        logf!("Settings: wrote defaults to {}", self.path.display());
        Ok(true)
    }
}

impl SettingsProvider for IniSettings {
    fn snapshot(&self) -> Result<Settings, SettingsError> {
        self.ensure_default_file()?;

        let name = self.path.to_string_lossy();
        let cfg = Config::builder()
            .add_source(File::new(&name, FileFormat::Ini).required(false))
            .build()
            .map_err(|e| SettingsError::Read { path: self.path.clone(), reason: e.to_string() })?;

        Ok(Settings::from_lookup(|key| {
            cfg.get::<Value>(key).map_or(RawValue::Absent, raw_of)
        }))
    }
}

/// `config` values can be tables, arrays or nil; only scalars and arrays of
/// scalars mean anything to us.
fn raw_of(v: Value) -> RawValue {
    match v.clone().into_array() {
        Ok(items) => RawValue::Sequence(items.into_iter().map(raw_of).collect()),
        Err(_) => v.into_string().map_or(RawValue::Absent, RawValue::Scalar),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, RawValue)]) -> Settings {
        let map: HashMap<String, RawValue> =
            pairs.iter().map(|(k, v)| (s!(*k), v.clone())).collect();
        Settings::from_lookup(|k| map.get(k).cloned().unwrap_or(RawValue::Absent))
    }

    #[test]
    fn delay_range_rules() {
        assert_eq!(DelayRange::parse("2,5"), DelayRange { min_secs: 2, max_secs: 5 });
        assert_eq!(DelayRange::parse(" 4 , 9 "), DelayRange { min_secs: 4, max_secs: 9 });
        assert_eq!(DelayRange::parse("0,0"), DelayRange { min_secs: 1, max_secs: 1 });
        assert_eq!(DelayRange::parse("7,2"), DelayRange { min_secs: 7, max_secs: 7 });
        assert_eq!(DelayRange::parse("x,y"), DelayRange { min_secs: 1, max_secs: 3 });
        assert_eq!(DelayRange::parse("5"), DelayRange { min_secs: 5, max_secs: 5 });
        assert_eq!(DelayRange::parse("-1,2"), DelayRange { min_secs: 1, max_secs: 2 });
    }

    #[test]
    fn defaults_when_everything_missing() {
        let s = Settings::default();
        assert_eq!(s.scraping.schedule_time, DEFAULT_SCHEDULE_TIME);
        assert_eq!(s.scraping.target_url, DEFAULT_TARGET_URL);
        assert_eq!(s.scraping.delay, DelayRange::default());
        assert_eq!(s.publishing.commit_message_prefix, DEFAULT_COMMIT_PREFIX);
        assert!(s.publishing.publish_enabled);
        assert!(!s.scraping.verify_tls);
        assert_eq!(s.logging.max_log_lines, DEFAULT_MAX_LOG_LINES);
    }

    #[test]
    fn list_values_take_first_and_junk_falls_back() {
        let s = lookup(&[
            ("scraping.target_url", RawValue::from(vec![" https://a.example/ ", "https://b.example/"])),
            ("scraping.schedule_time", RawValue::from("  08:30 ")),
            ("publishing.publish_enabled", RawValue::from("False")),
            ("logging.max_log_lines", RawValue::from("zero")),
            ("scraping.verify_tls", RawValue::from("maybe")),
        ]);
        assert_eq!(s.scraping.target_url, "https://a.example/");
        assert_eq!(s.scraping.schedule_time, "08:30");
        assert!(!s.publishing.publish_enabled);
        assert_eq!(s.logging.max_log_lines, DEFAULT_MAX_LOG_LINES);
        assert_eq!(s.scraping.verify_tls, DEFAULT_VERIFY_TLS);
    }

    #[test]
    fn static_provider_swaps_whole_snapshot() {
        let p = StaticSettings::new(Settings::default());
        let mut s = Settings::default();
        s.scraping.schedule_time = s!("23:59");
        p.replace(s.clone());
        assert_eq!(p.snapshot().unwrap(), s);
    }
}
