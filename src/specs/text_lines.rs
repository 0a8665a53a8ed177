// src/specs/text_lines.rs
//! Text fallback: read the page as flat lines and pick out
//! `station / reading / date` runs after the column-header caption.
//!
//! ```text
//! 省会城市空气吸收剂量率 监测值      <- anchor
//! 监测点 数值 时间                   <- header row, skipped
//! 北京 (东城)                        <- station
//! 80.1 nGy/h                         <- first line with the unit marker
//! 2024-05-01                         <- first 10-char line with '-'
//! ...
//! ```

use scraper::Html;

use super::patterns::LinePatterns;
use crate::core::sanitize::RawValue;
use crate::core::text::visible_lines;
use crate::record::MonitoringRecord;

pub fn extract(doc: &Html, patterns: &LinePatterns) -> Vec<MonitoringRecord> {
    extract_lines(&visible_lines(doc), patterns)
}

/// Scan already-flattened lines. Split out so it can be fed text directly.
pub fn extract_lines(lines: &[String], p: &LinePatterns) -> Vec<MonitoringRecord> {
    let mut cursor = match lines.iter().position(|l| l.contains(p.anchor.as_str())) {
        Some(i) => i + p.anchor_skip,
        None => {
            logd!("Text strategy: anchor {:?} not found, scanning from the top", p.anchor);
            0
        }
    };

    let mut out = Vec::new();
    while cursor < lines.len() {
        let station = &lines[cursor];
        if p.is_noise(station) {
            cursor += 1;
            continue;
        }

        // No reading left means no complete record left.
        let Some(reading_ix) = (cursor + 1..lines.len()).find(|&i| p.is_reading(&lines[i])) else {
            break;
        };
        let time_ix = (reading_ix + 1..lines.len()).find(|&i| p.is_timestamp(&lines[i]));

        out.push(MonitoringRecord::new(
            station.as_str(),
            lines[reading_ix].as_str(),
            RawValue::from(time_ix.map(|i| lines[i].as_str())),
        ));

        cursor = match time_ix {
            Some(i) => i + 1,
            None => lines.len(),
        };
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DEFAULT_TIME;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s!(*s)).collect()
    }

    #[test]
    fn triples_after_anchor() {
        let l = lines(&[
            "导航", "省会城市空气吸收剂量率 监测值", "监测点 数值 时间",
            "北京 (东城)", "80.1 nGy/h", "2024-05-01",
            "上海 (徐汇)", "95.0 nGy/h", "2024-05-01",
        ]);
        let recs = extract_lines(&l, &LinePatterns::default());
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].to_row(), ["北京", "北京 (东城)", "80.1 nGy/h", "2024-05-01"]);
        assert_eq!(recs[1].station(), "上海 (徐汇)");
    }

    #[test]
    fn filler_between_fields_is_skipped() {
        let l = lines(&["省会城市空气吸收剂量率 监测值", "hdr", "西安 (雁塔)", "↑", "88 nGy/h", "更新", "2024-05-01"]);
        let recs = extract_lines(&l, &LinePatterns::default());
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].radiation_value(), "88 nGy/h");
        assert_eq!(recs[0].update_time(), "2024-05-01");
    }

    #[test]
    fn no_anchor_scans_from_top() {
        let l = lines(&["长沙 (岳麓)", "70 nGy/h", "2024-05-04"]);
        let recs = extract_lines(&l, &LinePatterns::default());
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].province(), "长沙");
    }

    #[test]
    fn short_lines_are_noise() {
        let l = lines(&["--", "ab", "南京 (鼓楼)", "60 nGy/h", "2024-05-04"]);
        let recs = extract_lines(&l, &LinePatterns::default());
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].station(), "南京 (鼓楼)");
    }

    #[test]
    fn trailing_station_without_reading_dropped() {
        let l = lines(&["南京 (鼓楼)", "60 nGy/h", "2024-05-04", "杭州 (西湖)", "no data"]);
        let recs = extract_lines(&l, &LinePatterns::default());
        assert_eq!(recs.len(), 1);
    }

    #[test]
    fn missing_time_defaults_and_ends_scan() {
        let l = lines(&["南京 (鼓楼)", "60 nGy/h", "later"]);
        let recs = extract_lines(&l, &LinePatterns::default());
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].update_time(), DEFAULT_TIME);
    }

    #[test]
    fn custom_unit_marker() {
        let mut p = LinePatterns::default();
        p.unit_marker = s!("μSv/h");
        let l = lines(&["南京 (鼓楼)", "0.06 μSv/h", "2024/05/04", "2024-05-04"]);
        let recs = extract_lines(&l, &p);
        assert_eq!(recs[0].radiation_value(), "0.06 μSv/h");
        assert_eq!(recs[0].update_time(), "2024-05-04");
    }
}
