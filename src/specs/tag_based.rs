// src/specs/tag_based.rs
//! Structural strategy: one record per station container in the list layout.
//!
//! ```text
//! <li class="datali">
//!   <div class="divname">北京 (东城)</div>
//!   <div class="divval"><span class="label">80.1 nGy/h</span><span class="showtime">2024-05-01</span></div>
//! </li>
//! ```
//!
//! Missing sub-elements are not errors; the record just carries defaults.

use scraper::{ElementRef, Html, Selector};

use super::patterns::TagPatterns;
use super::ParseFailure;
use crate::core::sanitize::{normalize_ws, truncate_chars, RawValue};
use crate::record::MonitoringRecord;

struct TagSelectors {
    container: Selector,
    name: Selector,
    value: Selector,
    reading: Selector,
    time: Selector,
}

impl TagSelectors {
    fn build(p: &TagPatterns) -> Result<Self, ParseFailure> {
        let container_tags: Vec<&str> = p.container_tags.iter().map(String::as_str).collect();
        Ok(Self {
            container: compile(&container_tags, &p.container_classes)?,
            name: compile(&["div"], &p.name_classes)?,
            value: compile(&["div"], &p.value_classes)?,
            reading: compile(&["span"], &p.reading_classes)?,
            time: compile(&["span"], &p.time_classes)?,
        })
    }
}

/// `tag.class` for every pair, as one selector group.
fn compile(tags: &[&str], classes: &[String]) -> Result<Selector, ParseFailure> {
    let group = tags
        .iter()
        .flat_map(|t| classes.iter().map(move |c| format!("{t}.{c}")))
        .collect::<Vec<_>>()
        .join(", ");
    Selector::parse(&group).map_err(|e| ParseFailure::Selector {
        selector: group.clone(),
        reason: e.to_string(),
    })
}

pub fn extract(doc: &Html, patterns: &TagPatterns) -> Vec<MonitoringRecord> {
    let sel = match TagSelectors::build(patterns) {
        Ok(sel) => sel,
        Err(e) => {
            loge!("Tag strategy disabled: {e}");
            return Vec::new();
        }
    };

    let containers: Vec<ElementRef<'_>> = doc.select(&sel.container).collect();
    if containers.is_empty() {
        logd!("Tag strategy: no station containers");
        return Vec::new();
    }

    let mut out = Vec::with_capacity(containers.len());
    for item in containers {
        match extract_one(item, &sel) {
            Ok(rec) => out.push(rec),
            Err(e) => logd!("Tag strategy: skipped {e}"),
        }
    }
    out
}

fn extract_one(item: ElementRef<'_>, sel: &TagSelectors) -> Result<MonitoringRecord, ParseFailure> {
    // A container inside another container would repeat the outer one's values.
    let nested = item
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| sel.container.matches(&a));
    if nested {
        return Err(ParseFailure::Container {
            context: describe(item),
            reason: s!("nested inside another container"),
        });
    }

    let station = item.select(&sel.name).next().map(text_of);

    let (reading, time) = match item.select(&sel.value).next() {
        Some(val) => {
            let (reading, time) = pick_spans(val, sel);
            (reading.map(text_of), time.map(text_of))
        }
        None => (None, None),
    };

    Ok(MonitoringRecord::new(
        RawValue::from(station),
        RawValue::from(reading),
        RawValue::from(time),
    ))
}

/// Marked spans win. Position decides only when neither marker matched, and
/// one span never serves as both reading and time.
fn pick_spans<'a>(val: ElementRef<'a>, sel: &TagSelectors) -> (Option<ElementRef<'a>>, Option<ElementRef<'a>>) {
    let reading = val.select(&sel.reading).next();
    let time = val.select(&sel.time).next();
    match (reading, time) {
        (None, None) => {
            let mut spans = val
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|c| c.value().name() == "span");
            (spans.next(), spans.next())
        }
        (Some(r), Some(t)) if r.id() == t.id() => (Some(r), None),
        marked => marked,
    }
}

fn text_of(el: ElementRef<'_>) -> String {
    normalize_ws(&el.text().collect::<String>())
}

/// `<li class="datali">"北京 (东城) 80.1…"` for log lines.
fn describe(el: ElementRef<'_>) -> String {
    let v = el.value();
    let class = v.attr("class").unwrap_or("");
    format!("<{} class=\"{}\"> {:?}", v.name(), class, truncate_chars(&text_of(el), 40))
}
