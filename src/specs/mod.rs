// src/specs/mod.rs
//! # Extraction pipeline
//!
//! Reads the monitoring page and produces `MonitoringRecord`s. The site has
//! shipped at least two renderings, so there are two independent strategies:
//!
//! - `tag_based`: CSS-class markers of the list layout (`li.datali` & co.).
//! - `text_lines`: flattened visible text, scanned line by line after the
//!   column-header caption.
//!
//! They are tried in `STRATEGY_ORDER`; the first one that yields anything
//! wins, even if a later one would have found more.
//!
//! ## Conventions & invariants
//! - `parse` never fails. A broken entry is logged and skipped; a broken
//!   page yields an empty vec, and the caller decides whether that is fatal.
//! - Deterministic for a given input and `Patterns`.
//! - Every field goes through `core::sanitize`, so records never carry blanks.
//!
//! Fetching, persistence and scheduling live elsewhere (`core::net`, `file`, `schedule`).

pub mod patterns;
pub mod tag_based;
pub mod text_lines;

use scraper::Html;
use thiserror::Error;

use crate::core::sanitize::truncate_chars;
use crate::record::MonitoringRecord;
pub use patterns::{LinePatterns, Patterns, TagPatterns};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParseStrategy {
    TagBased,
    TextLine,
}

/// Precedence, most precise first.
pub const STRATEGY_ORDER: [ParseStrategy; 2] = [ParseStrategy::TagBased, ParseStrategy::TextLine];

/// Per-item problems. Absorbed inside the pipeline, never returned from `parse`.
#[derive(Debug, Error)]
pub(crate) enum ParseFailure {
    #[error("invalid selector {selector:?}: {reason}")]
    Selector { selector: String, reason: String },
    #[error("container {context}: {reason}")]
    Container { context: String, reason: String },
}

/// Parse with the default patterns.
pub fn parse(content: &str) -> Vec<MonitoringRecord> {
    parse_with(content, &Patterns::default())
}

pub fn parse_with(content: &str, patterns: &Patterns) -> Vec<MonitoringRecord> {
    parse_tagged(content, patterns).map(|(_, recs)| recs).unwrap_or_default()
}

/// Like `parse_with`, but also says which strategy produced the records.
/// `None` when every strategy came up empty.
pub fn parse_tagged(content: &str, patterns: &Patterns) -> Option<(ParseStrategy, Vec<MonitoringRecord>)> {
    if content.trim().is_empty() {
        return None;
    }

    let doc = Html::parse_document(content);
    for strategy in STRATEGY_ORDER {
        let recs = run_on(strategy, &doc, patterns);
        if !recs.is_empty() {
            logf!("Parse: {} records via {:?}", recs.len(), strategy);
            return Some((strategy, recs));
        }
        logd!("Parse: {:?} found nothing", strategy);
    }
    loge!("Parse: no strategy found records (page starts {:?})", truncate_chars(content.trim(), 80));
    None
}

/// Run one strategy alone.
pub fn run_strategy(strategy: ParseStrategy, content: &str, patterns: &Patterns) -> Vec<MonitoringRecord> {
    run_on(strategy, &Html::parse_document(content), patterns)
}

fn run_on(strategy: ParseStrategy, doc: &Html, patterns: &Patterns) -> Vec<MonitoringRecord> {
    match strategy {
        ParseStrategy::TagBased => tag_based::extract(doc, &patterns.tags),
        ParseStrategy::TextLine => text_lines::extract(doc, &patterns.lines),
    }
}
