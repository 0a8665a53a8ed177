// src/config/mod.rs

pub mod consts;
pub mod settings;

pub use settings::{
    DelayRange, IniSettings, LoggingSettings, PublishingSettings, ScrapingSettings, Settings,
    SettingsProvider, StaticSettings,
};
