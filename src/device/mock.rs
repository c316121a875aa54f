use serde::Serialize;
use tracing::trace;

use super::{DeviceControl, DeviceResult, Screenshot};
use crate::config;
use crate::machine::StateMachine;

/// Canned answers for the non-navigational capabilities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockDeviceConfig {
    /// The single id returned by device enumeration
    pub device_id: String,
    /// IME reported by keyboard detection
    pub keyboard_ime: String,
}

impl Default for MockDeviceConfig {
    fn default() -> Self {
        let cfg = config::get();
        Self {
            device_id: cfg.device.device_id.clone(),
            keyboard_ime: cfg.device.keyboard_ime.clone(),
        }
    }
}

impl MockDeviceConfig {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            ..Default::default()
        }
    }

    pub fn keyboard_ime(mut self, ime: impl Into<String>) -> Self {
        self.keyboard_ime = ime.into();
        self
    }
}

/// A call received by the mock device, in arrival order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum DeviceCall {
    Screenshot,
    CurrentApp,
    Tap { x: i32, y: i32 },
    DoubleTap { x: i32, y: i32 },
    LongPress { x: i32, y: i32, duration_ms: u64 },
    Swipe { start_x: i32, start_y: i32, end_x: i32, end_y: i32 },
    Back,
    Home,
    LaunchApp { app: String },
    TypeText { text: String },
    ClearText,
    DetectKeyboard,
    RestoreKeyboard { ime: String },
    ListDevices,
}

/// Device stand-in backed by a screen graph.
///
/// Gestures move the graph cursor; back, home, app launch and text entry
/// are accepted and ignored so they can never change the graph position.
#[derive(Debug)]
pub struct MockDevice {
    machine: StateMachine,
    config: MockDeviceConfig,
    calls: Vec<DeviceCall>,
}

impl MockDevice {
    pub fn new(machine: StateMachine) -> Self {
        Self::with_config(machine, MockDeviceConfig::default())
    }

    pub fn with_config(machine: StateMachine, config: MockDeviceConfig) -> Self {
        Self {
            machine,
            config,
            calls: Vec::new(),
        }
    }

    pub fn machine(&self) -> &StateMachine {
        &self.machine
    }

    pub fn into_machine(self) -> StateMachine {
        self.machine
    }

    /// Every call received so far
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    fn record(&mut self, call: DeviceCall) {
        trace!(state = %self.machine.current_state_id(), ?call, "mock device call");
        self.calls.push(call);
    }
}

impl DeviceControl for MockDevice {
    fn device_type(&self) -> &str {
        "mock"
    }

    fn screenshot(&mut self) -> DeviceResult<Screenshot> {
        self.record(DeviceCall::Screenshot);
        Screenshot::from_file(&self.machine.current_screenshot().path)
    }

    fn current_app(&mut self) -> DeviceResult<String> {
        self.record(DeviceCall::CurrentApp);
        Ok(self.machine.current_app().to_string())
    }

    fn tap(&mut self, x: i32, y: i32) -> DeviceResult<()> {
        self.record(DeviceCall::Tap { x, y });
        self.machine.handle_tap(x, y);
        Ok(())
    }

    fn double_tap(&mut self, x: i32, y: i32) -> DeviceResult<()> {
        self.record(DeviceCall::DoubleTap { x, y });
        self.machine.handle_double_tap(x, y);
        Ok(())
    }

    fn long_press(&mut self, x: i32, y: i32, duration_ms: u64) -> DeviceResult<()> {
        self.record(DeviceCall::LongPress { x, y, duration_ms });
        self.machine.handle_long_press(x, y);
        Ok(())
    }

    fn swipe(
        &mut self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        _duration_ms: Option<u64>,
    ) -> DeviceResult<()> {
        self.record(DeviceCall::Swipe {
            start_x,
            start_y,
            end_x,
            end_y,
        });
        self.machine.handle_swipe(start_x, start_y, end_x, end_y);
        Ok(())
    }

    fn back(&mut self) -> DeviceResult<()> {
        self.record(DeviceCall::Back);
        Ok(())
    }

    fn home(&mut self) -> DeviceResult<()> {
        self.record(DeviceCall::Home);
        Ok(())
    }

    fn launch_app(&mut self, app: &str) -> DeviceResult<bool> {
        self.record(DeviceCall::LaunchApp {
            app: app.to_string(),
        });
        Ok(true)
    }

    fn type_text(&mut self, text: &str) -> DeviceResult<()> {
        self.record(DeviceCall::TypeText {
            text: text.to_string(),
        });
        Ok(())
    }

    fn clear_text(&mut self) -> DeviceResult<()> {
        self.record(DeviceCall::ClearText);
        Ok(())
    }

    fn detect_and_set_keyboard(&mut self) -> DeviceResult<String> {
        self.record(DeviceCall::DetectKeyboard);
        Ok(self.config.keyboard_ime.clone())
    }

    fn restore_keyboard(&mut self, ime: &str) -> DeviceResult<()> {
        self.record(DeviceCall::RestoreKeyboard {
            ime: ime.to_string(),
        });
        Ok(())
    }

    fn list_devices(&mut self) -> DeviceResult<Vec<String>> {
        self.record(DeviceCall::ListDevices);
        Ok(vec![self.config.device_id.clone()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceError;
    use crate::scenario::load_str;

    const TWO_STATES: &str = r#"
test_name: mock
instruction: open messages
states:
  - id: home
    screenshot: home.png
    transitions:
      - { click_region: [100, 500, 200, 600], next_state: message }
  - { id: message, screenshot: message.png, current_app: com.chat, is_terminal: true }
"#;

    fn device() -> MockDevice {
        let scenario = load_str(TWO_STATES, "/nonexistent").unwrap();
        let machine = StateMachine::from_scenario(&scenario).unwrap();
        MockDevice::with_config(
            machine,
            MockDeviceConfig {
                device_id: "mock_device_001".to_string(),
                keyboard_ime: "com.mock.keyboard".to_string(),
            },
        )
    }

    #[test]
    fn test_tap_moves_graph() {
        let mut dev = device();
        assert_eq!(dev.current_app().unwrap(), "com.android.launcher");
        dev.tap(150, 550).unwrap();
        assert_eq!(dev.machine().current_state_id(), "message");
        assert_eq!(dev.current_app().unwrap(), "com.chat");
    }

    #[test]
    fn test_non_navigational_calls_leave_graph_alone() {
        let mut dev = device();
        dev.back().unwrap();
        dev.home().unwrap();
        assert!(dev.launch_app("com.chat").unwrap());
        let ime = dev.detect_and_set_keyboard().unwrap();
        dev.clear_text().unwrap();
        dev.type_text("hello").unwrap();
        dev.restore_keyboard(&ime).unwrap();

        assert_eq!(ime, "com.mock.keyboard");
        assert_eq!(dev.list_devices().unwrap(), vec!["mock_device_001".to_string()]);
        assert_eq!(dev.machine().current_state_id(), "home");
        assert!(dev.machine().history().is_empty());
    }

    #[test]
    fn test_calls_logged_in_order() {
        let mut dev = device();
        dev.long_press(1, 2, 3000).unwrap();
        dev.swipe(150, 550, 150, 100, Some(300)).unwrap();
        dev.back().unwrap();
        assert_eq!(
            dev.calls(),
            &[
                DeviceCall::LongPress {
                    x: 1,
                    y: 2,
                    duration_ms: 3000
                },
                DeviceCall::Swipe {
                    start_x: 150,
                    start_y: 550,
                    end_x: 150,
                    end_y: 100
                },
                DeviceCall::Back,
            ]
        );
        assert_eq!(dev.machine().current_state_id(), "message");
    }

    #[test]
    fn test_missing_screenshot_is_io_error() {
        let mut dev = device();
        assert!(matches!(dev.screenshot(), Err(DeviceError::Io { .. })));
        assert_eq!(dev.device_type(), "mock");
    }
}
