// src/config/consts.rs

// Settings file
pub const CONFIG_PATH: &str = "config.ini";

// Net
pub const DEFAULT_TARGET_URL: &str = "https://data.rmtc.org.cn/gis/listtype0M.html";
pub const REQUEST_TIMEOUT_SECS: u64 = 15;
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_DELAY_MIN_SECS: u64 = 1;
pub const DEFAULT_DELAY_MAX_SECS: u64 = 3;
pub const DEFAULT_VERIFY_TLS: bool = false; // the site's chain does not always validate

// Schedule
pub const DEFAULT_SCHEDULE_TIME: &str = "10:00";
pub const POLL_INTERVAL_MS: u64 = 500;
pub const RECOVERY_POLLS: u32 = 120; // × poll interval ≈ 60 s
pub const BAD_TIME_RETRY_MINS: i64 = 5;

// Output
pub const DEFAULT_OUTPUT_DIR: &str = "data";
pub const DEFAULT_OUTPUT_PREFIX: &str = "辐射监测数据";
pub const DEFAULT_COMMIT_PREFIX: &str = "自动更新：";
pub const DEFAULT_PUBLISH_ENABLED: bool = true;

// Local store (debug log)
pub const STORE_DIR: &str = ".store";

// Run log
pub const DEFAULT_MAX_LOG_LINES: usize = 100;
pub const URL_LOG_CHARS: usize = 50;
pub const ERROR_LOG_CHARS: usize = 100;

pub const DEFAULT_INI: &str = "\
[scraping]
schedule_time = 10:00
target_url = https://data.rmtc.org.cn/gis/listtype0M.html
delay_range = 1,3
output_prefix = 辐射监测数据
output_dir = data
verify_tls = false

[publishing]
commit_message_prefix = 自动更新：
publish_enabled = true

[logging]
max_log_lines = 100
";
