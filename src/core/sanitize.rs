// src/core/sanitize.rs
//
// Every value that comes from outside (settings, parsed markup, HTTP bodies)
// passes through `sanitize` before it is stored, formatted or used as a path.

use std::fmt;

/// A value as handed over by an upstream library, before we trust it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawValue {
    Scalar(String),
    Sequence(Vec<RawValue>),
    Absent,
}

impl RawValue {
    pub fn scalar(v: impl fmt::Display) -> Self {
        RawValue::Scalar(v.to_string())
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Scalar(s!(s))
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Scalar(s)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(RawValue::Absent, Into::into)
    }
}

impl<T: Into<RawValue>> From<Vec<T>> for RawValue {
    fn from(v: Vec<T>) -> Self {
        RawValue::Sequence(v.into_iter().map(Into::into).collect())
    }
}

/// Collapse a raw value into one trimmed, non-empty string.
///
/// - Sequence: the sanitized first element, or `default` when empty.
/// - Absent, empty or whitespace-only: `default`.
/// - Otherwise the trimmed text.
///
/// A blank `default` is replaced by a single placeholder so the result is
/// never empty either way.
pub fn sanitize(value: &RawValue, default: &str) -> String {
    match value {
        RawValue::Sequence(items) => match items.first() {
            Some(first) => sanitize(first, default),
            None => fallback(default),
        },
        RawValue::Scalar(text) => sanitize_str(text, default),
        RawValue::Absent => fallback(default),
    }
}

/// `sanitize` for text that is already known to be a scalar.
pub fn sanitize_str(text: &str, default: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() { fallback(default) } else { s!(trimmed) }
}

const BLANK_DEFAULT: &str = "未知";

fn fallback(default: &str) -> String {
    let d = default.trim();
    if d.is_empty() { s!(BLANK_DEFAULT) } else { s!(d) }
}

/// Collapse internal whitespace runs to one space and trim.
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space { out.push(' '); prev_space = true; }
        } else { out.push(ch); prev_space = false; }
    }
    out.trim().to_string()
}

/// Turn an arbitrary prefix into something usable as a file stem.
/// Drops `\ / : * ? " < > |` and control chars; keeps everything else (CJK included).
pub fn sanitize_file_stem(name: &str, default: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    let cleaned = normalize_ws(&cleaned);
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        // the default may itself be unusable
        let d: String = default.chars().filter(|c| c.is_alphanumeric() || *c == '_').collect();
        if d.is_empty() { s!("records") } else { d }
    } else {
        s!(cleaned)
    }
}

/// Cut to at most `max` chars, appending "..." when something was dropped.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s!(s)
    } else {
        let head: String = s.chars().take(max).collect();
        join!(&head, "...")
    }
}
