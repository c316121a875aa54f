//! Configuration management with environment variable support.
//!
//! Process-level settings for the harness binary and the mock device's
//! canned answers. Values are read once from the environment; anything
//! missing or unparseable falls back to its default.
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `SCREEN_GRAPH_SCENARIO_DIR` | Directory searched by `suite` | `tests/fixtures/scenarios` |
//! | `SCREEN_GRAPH_SCREEN_SIZE` | Screen size as `WxH` (placeholders, relative coordinates) | `1080x2400` |
//! | `SCREEN_GRAPH_DEVICE_ID` | Id returned by mock device enumeration | `mock_device_001` |
//! | `SCREEN_GRAPH_KEYBOARD` | IME reported by mock keyboard detection | `com.mock.keyboard` |
//! | `SCREEN_GRAPH_LOG` | Log filter (falls back to `RUST_LOG`) | `info` |
//!
//! # Example
//!
//! ```bash
//! export SCREEN_GRAPH_SCREEN_SIZE="720x1600"
//! export SCREEN_GRAPH_LOG="screen_graph=debug"
//! ```

use std::env;
use std::sync::OnceLock;

// ============================================================================
// Default Values
// ============================================================================

/// Default scenario directory for suite runs
pub const DEFAULT_SCENARIO_DIR: &str = "tests/fixtures/scenarios";

/// Default screen width (pixels)
pub const DEFAULT_SCREEN_WIDTH: u32 = 1080;

/// Default screen height (pixels)
pub const DEFAULT_SCREEN_HEIGHT: u32 = 2400;

/// Default mock device id
pub const DEFAULT_DEVICE_ID: &str = "mock_device_001";

/// Default mock keyboard IME
pub const DEFAULT_KEYBOARD_IME: &str = "com.mock.keyboard";

/// Default log filter
pub const DEFAULT_LOG_FILTER: &str = "info";

// ============================================================================
// Environment Variable Names
// ============================================================================

pub const ENV_SCENARIO_DIR: &str = "SCREEN_GRAPH_SCENARIO_DIR";

pub const ENV_SCREEN_SIZE: &str = "SCREEN_GRAPH_SCREEN_SIZE";

pub const ENV_DEVICE_ID: &str = "SCREEN_GRAPH_DEVICE_ID";

pub const ENV_KEYBOARD: &str = "SCREEN_GRAPH_KEYBOARD";

pub const ENV_LOG: &str = "SCREEN_GRAPH_LOG";

/// Conventional fallback for the log filter
pub const ENV_RUST_LOG: &str = "RUST_LOG";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub suite: SuiteSettings,
    pub screen: ScreenSettings,
    pub device: DeviceSettings,
    /// Log filter directive for the binary
    pub log_filter: String,
}

#[derive(Debug, Clone)]
pub struct SuiteSettings {
    /// Directory searched for `scenario.yaml` files
    pub scenario_dir: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSettings {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct DeviceSettings {
    pub device_id: String,
    pub keyboard_ime: String,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            suite: SuiteSettings::from_env(),
            screen: ScreenSettings::from_env(),
            device: DeviceSettings::from_env(),
            log_filter: env::var(ENV_LOG)
                .or_else(|_| env::var(ENV_RUST_LOG))
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            suite: SuiteSettings::defaults(),
            screen: ScreenSettings::defaults(),
            device: DeviceSettings::defaults(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl SuiteSettings {
    pub fn from_env() -> Self {
        Self {
            scenario_dir: env::var(ENV_SCENARIO_DIR)
                .unwrap_or_else(|_| DEFAULT_SCENARIO_DIR.to_string()),
        }
    }

    pub fn defaults() -> Self {
        Self {
            scenario_dir: DEFAULT_SCENARIO_DIR.to_string(),
        }
    }
}

impl ScreenSettings {
    pub fn from_env() -> Self {
        env::var(ENV_SCREEN_SIZE)
            .ok()
            .and_then(|s| parse_screen_size(&s))
            .map(|(width, height)| Self { width, height })
            .unwrap_or_else(Self::defaults)
    }

    pub fn defaults() -> Self {
        Self {
            width: DEFAULT_SCREEN_WIDTH,
            height: DEFAULT_SCREEN_HEIGHT,
        }
    }
}

impl DeviceSettings {
    pub fn from_env() -> Self {
        Self {
            device_id: env::var(ENV_DEVICE_ID).unwrap_or_else(|_| DEFAULT_DEVICE_ID.to_string()),
            keyboard_ime: env::var(ENV_KEYBOARD)
                .unwrap_or_else(|_| DEFAULT_KEYBOARD_IME.to_string()),
        }
    }

    pub fn defaults() -> Self {
        Self {
            device_id: DEFAULT_DEVICE_ID.to_string(),
            keyboard_ime: DEFAULT_KEYBOARD_IME.to_string(),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a screen size string ("1080x2400") into (width, height).
/// Zero dimensions are rejected.
pub fn parse_screen_size(size: &str) -> Option<(u32, u32)> {
    let (w, h) = size.trim().to_lowercase().split_once('x').map(|(w, h)| {
        (w.trim().parse::<u32>(), h.trim().parse::<u32>())
    })?;
    match (w.ok()?, h.ok()?) {
        (0, _) | (_, 0) => None,
        dims => Some(dims),
    }
}

/// Get the configured screen size (convenience function)
pub fn screen_size() -> (u32, u32) {
    let screen = get().screen;
    (screen.width, screen.height)
}

/// Get the suite scenario directory (convenience function)
pub fn scenario_dir() -> String {
    get().suite.scenario_dir.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_screen_size() {
        assert_eq!(parse_screen_size("1080x2400"), Some((1080, 2400)));
        assert_eq!(parse_screen_size(" 720X1600 "), Some((720, 1600)));
    }

    #[test]
    fn test_parse_screen_size_invalid() {
        assert_eq!(parse_screen_size("invalid"), None);
        assert_eq!(parse_screen_size("1080"), None);
        assert_eq!(parse_screen_size("0x100"), None);
        assert_eq!(parse_screen_size("axb"), None);
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::defaults();
        assert_eq!(config.device.device_id, DEFAULT_DEVICE_ID);
        assert_eq!(config.device.keyboard_ime, DEFAULT_KEYBOARD_IME);
        assert_eq!(config.screen, ScreenSettings::defaults());
        assert_eq!(config.suite.scenario_dir, DEFAULT_SCENARIO_DIR);
    }
}
