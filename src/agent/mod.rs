//! Agent side of a run.
//!
//! The harness treats the agent as a black box behind [`Agent`]: each call
//! to [`Agent::step`] is one reasoning step, during which the agent may call
//! into the device any number of times. [`ActionAgent`] is the stock agent:
//! it asks a [`ModelBackend`] what to do, parses the reply with
//! [`action::parse`] and carries the action out on the device.

pub mod action;
pub mod scripted;

use serde::Serialize;
use tracing::debug;

pub use action::Action;
pub use scripted::ScriptedBackend;

use crate::device::{DeviceControl, DeviceError, Screenshot};

/// Result type for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Reasons an agent stops abnormally
#[derive(Debug)]
pub enum AgentError {
    /// The scripted backend ran out of replies before the agent finished
    ResponsesExhausted { consumed: usize },

    /// A model reply did not contain a usable action
    MalformedAction { reply: String, reason: String },

    /// A model reply named an action the agent does not know
    UnknownAction(String),

    /// The device failed while the agent was using it
    Device(DeviceError),
}

impl std::fmt::Display for AgentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentError::ResponsesExhausted { consumed } => write!(
                f,
                "scripted responses exhausted after {} reply(ies)",
                consumed
            ),
            AgentError::MalformedAction { reason, .. } => {
                write!(f, "malformed action: {}", reason)
            }
            AgentError::UnknownAction(name) => write!(f, "unknown action '{}'", name),
            AgentError::Device(err) => write!(f, "device error: {}", err),
        }
    }
}

impl std::error::Error for AgentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AgentError::Device(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DeviceError> for AgentError {
    fn from(err: DeviceError) -> Self {
        AgentError::Device(err)
    }
}

/// What the runner tells the agent at the start of each step
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub instruction: &'a str,
    /// 1-based step number
    pub step: u32,
    pub max_steps: u32,
}

/// How a reasoning step ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Keep going
    Continue,
    /// The agent signalled task completion
    Finished { message: Option<String> },
    /// The agent gave up without signalling completion
    Stopped { reason: String },
}

/// An agent driven one reasoning step at a time
pub trait Agent {
    fn step(
        &mut self,
        ctx: &StepContext<'_>,
        device: &mut dyn DeviceControl,
    ) -> AgentResult<StepOutcome>;
}

/// Observation handed to the model for one step
#[derive(Debug, Clone, Serialize)]
pub struct Prompt {
    pub instruction: String,
    pub step: u32,
    pub current_app: String,
    pub screenshot: Option<Screenshot>,
}

/// Source of model replies
pub trait ModelBackend {
    fn respond(&mut self, prompt: &Prompt) -> AgentResult<String>;
}

/// How model coordinates map onto device pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinateMode {
    /// Coordinates are already device pixels
    #[default]
    Absolute,
    /// Coordinates are on a 0..1000 grid over a screen of this size
    Relative { width: u32, height: u32 },
}

impl CoordinateMode {
    pub fn to_pixels(&self, x: i32, y: i32) -> (i32, i32) {
        match *self {
            CoordinateMode::Absolute => (x, y),
            CoordinateMode::Relative { width, height } => (
                (i64::from(x) * i64::from(width) / 1000) as i32,
                (i64::from(y) * i64::from(height) / 1000) as i32,
            ),
        }
    }
}

/// Agent that executes whatever its model backend replies with
#[derive(Debug)]
pub struct ActionAgent<B> {
    backend: B,
    coordinates: CoordinateMode,
    capture_screenshots: bool,
    long_press_ms: u64,
}

impl<B: ModelBackend> ActionAgent<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            coordinates: CoordinateMode::Absolute,
            capture_screenshots: false,
            long_press_ms: 3000,
        }
    }

    pub fn coordinates(mut self, mode: CoordinateMode) -> Self {
        self.coordinates = mode;
        self
    }

    /// Include a screenshot in every prompt (requires the image files to exist)
    pub fn capture_screenshots(mut self, capture: bool) -> Self {
        self.capture_screenshots = capture;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn execute(&self, action: Action, device: &mut dyn DeviceControl) -> AgentResult<StepOutcome> {
        let px = |x, y| self.coordinates.to_pixels(x, y);
        match action {
            Action::Tap { x, y } => {
                let (x, y) = px(x, y);
                device.tap(x, y)?;
            }
            Action::DoubleTap { x, y } => {
                let (x, y) = px(x, y);
                device.double_tap(x, y)?;
            }
            Action::LongPress { x, y } => {
                let (x, y) = px(x, y);
                device.long_press(x, y, self.long_press_ms)?;
            }
            Action::Swipe { start, end } => {
                let (sx, sy) = px(start.0, start.1);
                let (ex, ey) = px(end.0, end.1);
                device.swipe(sx, sy, ex, ey, None)?;
            }
            Action::Type { text } => {
                let ime = device.detect_and_set_keyboard()?;
                device.clear_text()?;
                device.type_text(&text)?;
                device.restore_keyboard(&ime)?;
            }
            Action::Launch { app } => {
                if !device.launch_app(&app)? {
                    debug!(app = %app, "app not found on device");
                }
            }
            Action::Back => device.back()?,
            Action::Home => device.home()?,
            Action::Wait { .. } | Action::Note { .. } => {}
            Action::TakeOver { message } => {
                return Ok(StepOutcome::Stopped { reason: message });
            }
            Action::Finish { message } => return Ok(StepOutcome::Finished { message }),
        }
        Ok(StepOutcome::Continue)
    }
}

impl<B: ModelBackend> Agent for ActionAgent<B> {
    fn step(
        &mut self,
        ctx: &StepContext<'_>,
        device: &mut dyn DeviceControl,
    ) -> AgentResult<StepOutcome> {
        let current_app = device.current_app()?;
        let screenshot = if self.capture_screenshots {
            Some(device.screenshot()?)
        } else {
            None
        };

        let prompt = Prompt {
            instruction: ctx.instruction.to_string(),
            step: ctx.step,
            current_app,
            screenshot,
        };
        let reply = self.backend.respond(&prompt)?;
        let action = action::parse(&reply)?;
        debug!(step = ctx.step, max_steps = ctx.max_steps, ?action, "agent action");

        self.execute(action, device)
    }
}
