// src/record.rs
use crate::core::sanitize::{sanitize, RawValue};

pub const DEFAULT_PROVINCE: &str = "省份未知";
pub const DEFAULT_STATION: &str = "名称缺失";
pub const DEFAULT_VALUE: &str = "数值缺失";
pub const DEFAULT_TIME: &str = "时间缺失";

/// Column headers, in the same order as `MonitoringRecord::to_row`.
pub const HEADERS: [&str; 4] = ["省份", "监测点", "辐射值", "更新时间"];

/// Separator between a province and the station detail, e.g. "北京 (东城)".
const PROVINCE_SEP: &str = " (";

/// One reading at one station. Fields are guaranteed non-empty scalars;
/// there is no way to build one without going through `sanitize`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonitoringRecord {
    province: String,
    station: String,
    radiation_value: String,
    update_time: String,
}

impl MonitoringRecord {
    /// Build from raw upstream values. Province is derived from the station.
    pub fn new(
        station: impl Into<RawValue>,
        radiation_value: impl Into<RawValue>,
        update_time: impl Into<RawValue>,
    ) -> Self {
        let station = sanitize(&station.into(), DEFAULT_STATION);
        let province = province_of(&station);
        Self {
            province,
            station,
            radiation_value: sanitize(&radiation_value.into(), DEFAULT_VALUE),
            update_time: sanitize(&update_time.into(), DEFAULT_TIME),
        }
    }

    pub fn province(&self) -> &str { &self.province }
    pub fn station(&self) -> &str { &self.station }
    /// Raw text as rendered by the site, unit included.
    pub fn radiation_value(&self) -> &str { &self.radiation_value }
    pub fn update_time(&self) -> &str { &self.update_time }

    pub fn to_row(&self) -> [&str; 4] {
        [&self.province, &self.station, &self.radiation_value, &self.update_time]
    }
}

/// The text before " (" if present, else the unknown-province default.
pub fn province_of(station: &str) -> String {
    match station.split_once(PROVINCE_SEP) {
        Some((head, _)) => sanitize(&RawValue::from(head), DEFAULT_PROVINCE),
        None => s!(DEFAULT_PROVINCE),
    }
}
