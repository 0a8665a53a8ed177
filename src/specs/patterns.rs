// src/specs/patterns.rs
//
// Everything the extractors know about the monitoring page's rendering.
// The defaults match data.rmtc.org.cn's list page; the site changes its
// markup every so often, so these are data rather than code.

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Patterns {
    pub tags: TagPatterns,
    pub lines: LinePatterns,
}

/// Class markers for the list-based layout, any one of each set matches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagPatterns {
    /// Element names that can carry a station entry.
    pub container_tags: Vec<String>,
    pub container_classes: Vec<String>,
    pub name_classes: Vec<String>,
    pub value_classes: Vec<String>,
    pub reading_classes: Vec<String>,
    pub time_classes: Vec<String>,
}

impl Default for TagPatterns {
    fn default() -> Self {
        Self {
            container_tags: strings(&["li", "div"]),
            container_classes: strings(&["datali", "data-item", "monitor-item"]),
            name_classes: strings(&["divname", "station-name"]),
            value_classes: strings(&["divval", "radiation-value-div"]),
            reading_classes: strings(&["label", "radiation-value"]),
            time_classes: strings(&["showtime", "update-time"]),
        }
    }
}

/// Heuristics for the flattened-text fallback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinePatterns {
    /// Column-header caption that precedes the data rows.
    pub anchor: String,
    /// Lines to skip after the anchor (the anchor itself plus the header row).
    pub anchor_skip: usize,
    /// A reading line contains this.
    pub unit_marker: String,
    /// A timestamp line is exactly this many chars...
    pub timestamp_len: usize,
    /// ...and contains this.
    pub timestamp_sep: char,
    /// Shorter lines are noise, never a station name.
    pub min_station_len: usize,
}

impl Default for LinePatterns {
    fn default() -> Self {
        Self {
            anchor: s!("省会城市空气吸收剂量率 监测值"),
            anchor_skip: 2,
            unit_marker: s!("nGy/h"),
            timestamp_len: 10,
            timestamp_sep: '-',
            min_station_len: 3,
        }
    }
}

impl LinePatterns {
    pub fn is_reading(&self, line: &str) -> bool {
        line.contains(self.unit_marker.as_str())
    }

    pub fn is_timestamp(&self, line: &str) -> bool {
        line.chars().count() == self.timestamp_len && line.contains(self.timestamp_sep)
    }

    pub fn is_noise(&self, line: &str) -> bool {
        line.chars().count() < self.min_station_len
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s!(*s)).collect()
}
