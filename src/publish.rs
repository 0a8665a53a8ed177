// src/publish.rs
//
// Push a persisted file to the data repository. The run treats every
// failure here as non-fatal; the file is already on disk.

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use chrono::{Local, NaiveDateTime};

use crate::core::sanitize::{sanitize_str, truncate_chars};
use crate::config::consts::{DEFAULT_COMMIT_PREFIX, ERROR_LOG_CHARS};
use crate::error::PublishError;

pub trait Publish: Send + Sync {
    fn publish(&self, location: &Path, message_prefix: &str) -> Result<(), PublishError>;
}

/// `<prefix><YYYY-MM-DD HH:MM:SS> 的数据`
pub fn commit_message(prefix: &str, at: NaiveDateTime) -> String {
    format!("{}{} 的数据", sanitize_str(prefix, DEFAULT_COMMIT_PREFIX), at.format("%Y-%m-%d %H:%M:%S"))
}

/// `git add`, `git commit`, `git push`, run in `workdir`.
pub struct GitPublisher {
    workdir: PathBuf,
}

impl GitPublisher {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self { workdir: workdir.into() }
    }

    fn git(&self, step: &str, args: &[&str]) -> Result<(), PublishError> {
        let out = Command::new("git").current_dir(&self.workdir).args(args).output()?;
        if out.status.success() {
            logd!("Publish: git {step} ok");
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&out.stderr);
        let detail = match stderr.trim() {
            "" => format!("exit status {}", out.status),
            s => truncate_chars(s, ERROR_LOG_CHARS),
        };
        Err(PublishError::Git { step: s!(step), detail })
    }
}

impl Publish for GitPublisher {
    fn publish(&self, location: &Path, message_prefix: &str) -> Result<(), PublishError> {
        // absolute, so it still resolves from inside `workdir`
        let file = match location.canonicalize() {
            Ok(p) if p.is_file() => p.to_string_lossy().into_owned(),
            _ => return Err(PublishError::Missing(location.to_path_buf())),
        };
        let msg = commit_message(message_prefix, Local::now().naive_local());

        self.git("add", &["add", "--", file.as_str()])?;
        self.git("commit", &["commit", "-m", msg.as_str()])?;
        self.git("push", &["push"])?;
        logf!("Publish: pushed {}", location.display());
        Ok(())
    }
}
