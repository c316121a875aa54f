//! Device control surface used by the agent.
//!
//! [`DeviceControl`] is the full capability set an agent expects from a
//! phone: observation (screenshot, foreground app), pointer gestures, system
//! keys, app launch, text entry and keyboard management. The harness plugs
//! in [`MockDevice`], which routes gestures into a [`StateMachine`] and
//! answers everything else with fixed values.
//!
//! [`StateMachine`]: crate::machine::StateMachine

pub mod mock;

use base64::Engine;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub use mock::{DeviceCall, MockDevice, MockDeviceConfig};

/// Result type for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Errors a device can report
#[derive(Debug)]
pub enum DeviceError {
    /// Screenshot file could not be read
    Io { path: PathBuf, source: std::io::Error },

    /// Screenshot file is not a decodable image
    Image { path: PathBuf, message: String },
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceError::Io { path, source } => {
                write!(f, "cannot read screenshot {}: {}", path.display(), source)
            }
            DeviceError::Image { path, message } => {
                write!(f, "cannot decode screenshot {}: {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for DeviceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeviceError::Io { source, .. } => Some(source),
            DeviceError::Image { .. } => None,
        }
    }
}

/// Screen capture as handed to the agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Screenshot {
    /// Base64-encoded image file contents
    pub base64_data: String,
    pub width: u32,
    pub height: u32,
    /// Set when the real device refused capture (secure window)
    pub is_sensitive: bool,
}

impl Screenshot {
    /// Read an image file and encode it for the agent
    pub fn from_file(path: &Path) -> DeviceResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| DeviceError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let img = image::load_from_memory(&bytes).map_err(|e| DeviceError::Image {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(Self {
            base64_data: base64::engine::general_purpose::STANDARD.encode(&bytes),
            width: img.width(),
            height: img.height(),
            is_sensitive: false,
        })
    }
}

/// Everything an agent may ask a device to do.
///
/// Coordinates are absolute screen pixels.
pub trait DeviceControl {
    /// Identifier for the kind of device (e.g. "adb", "mock")
    fn device_type(&self) -> &str;

    fn screenshot(&mut self) -> DeviceResult<Screenshot>;

    /// Package name of the foreground application
    fn current_app(&mut self) -> DeviceResult<String>;

    fn tap(&mut self, x: i32, y: i32) -> DeviceResult<()>;

    fn double_tap(&mut self, x: i32, y: i32) -> DeviceResult<()>;

    fn long_press(&mut self, x: i32, y: i32, duration_ms: u64) -> DeviceResult<()>;

    fn swipe(
        &mut self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        duration_ms: Option<u64>,
    ) -> DeviceResult<()>;

    fn back(&mut self) -> DeviceResult<()>;

    fn home(&mut self) -> DeviceResult<()>;

    /// Returns whether the app was found and launched
    fn launch_app(&mut self, app: &str) -> DeviceResult<bool>;

    fn type_text(&mut self, text: &str) -> DeviceResult<()>;

    fn clear_text(&mut self) -> DeviceResult<()>;

    /// Switch to an input method that accepts injected text; returns the previous IME
    fn detect_and_set_keyboard(&mut self) -> DeviceResult<String>;

    fn restore_keyboard(&mut self, ime: &str) -> DeviceResult<()>;

    fn list_devices(&mut self) -> DeviceResult<Vec<String>>;
}
