//! Configuration management for dubmux.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Automatic defaults for missing keys
//!
//! # Example
//!
//! ```no_run
//! use dubmux_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new("dubmux.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Caption font: {}", config.settings().subtitles.font_name);
//!
//! config.settings_mut().queue.workers = 4;
//! config.update_section(ConfigSection::Queue).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    AssemblySettings, ConfigSection, LoggingSettings, PathSettings, QueueSettings, Settings,
    SubtitleSettings, ThumbnailSettings, ToolSettings,
};
