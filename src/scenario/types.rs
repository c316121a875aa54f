use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default step budget when a scenario omits `max_steps`
pub const DEFAULT_MAX_STEPS: u32 = 10;

/// Default foreground app reported by a state
pub const DEFAULT_CURRENT_APP: &str = "com.android.launcher";

/// Screenshot extensions accepted by the loader (lowercase, without dot)
pub const SCREENSHOT_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

// ============================================================================
// Raw shapes (as written by the scenario author)
// ============================================================================

/// Scenario document as deserialized, before any invariant is checked
#[derive(Debug, Clone, Deserialize)]
pub struct RawScenario {
    pub test_name: String,

    pub instruction: String,

    /// Signed so that a negative budget is a violation, not a parse error
    #[serde(default = "default_max_steps")]
    pub max_steps: i64,

    /// Optional explicit start state (defaults to the first declared state)
    #[serde(default)]
    pub start: Option<String>,

    #[serde(default)]
    pub states: Vec<RawState>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawState {
    pub id: String,

    pub screenshot: String,

    #[serde(default = "default_current_app")]
    pub current_app: String,

    #[serde(default)]
    pub transitions: Vec<RawTransition>,

    #[serde(default)]
    pub is_terminal: bool,

    #[serde(default)]
    pub expected_finish: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTransition {
    /// Read as a list so that a wrong number of values is a violation, not a parse error
    pub click_region: Vec<i32>,

    pub next_state: String,

    #[serde(default)]
    pub description: String,
}

fn default_max_steps() -> i64 {
    i64::from(DEFAULT_MAX_STEPS)
}

fn default_current_app() -> String {
    DEFAULT_CURRENT_APP.to_string()
}

// ============================================================================
// Validated definitions
// ============================================================================

/// Axis-aligned click region in screen pixels.
///
/// Both edges are inclusive: a point on the border counts as inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rect {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x1 && x <= self.x2 && y >= self.y1 && y <= self.y2
    }

    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.x1, self.y1, self.x2, self.y2)
    }
}

/// A hit region on a state and the state it leads to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionDefinition {
    pub region: Rect,
    pub next_state: String,
    pub description: String,
}

/// A named screen in the graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateDefinition {
    pub id: String,

    /// Image path, already resolved against the scenario's directory
    pub screenshot: PathBuf,

    pub current_app: String,

    /// Hit regions in declaration order; the first match wins
    pub transitions: Vec<TransitionDefinition>,

    pub is_terminal: bool,

    /// Agent must call finish in this state (only valid on terminal states)
    pub expected_finish: bool,
}

/// A validated scenario, ready to become a state machine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioDefinition {
    pub name: String,
    pub instruction: String,
    pub max_steps: u32,

    /// Id of the state the cursor starts on
    pub start: String,

    pub states: Vec<StateDefinition>,

    /// File the scenario was loaded from, if any
    pub source: Option<PathBuf>,
}

impl ScenarioDefinition {
    pub fn state(&self, id: &str) -> Option<&StateDefinition> {
        self.states.iter().find(|s| s.id == id)
    }

    pub fn terminal_states(&self) -> impl Iterator<Item = &StateDefinition> {
        self.states.iter().filter(|s| s.is_terminal)
    }
}

// ============================================================================
// Validation errors
// ============================================================================

/// A single broken invariant found while loading a scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    EmptyInstruction,
    /// Budget below 1 or beyond `u32::MAX`
    InvalidMaxSteps(i64),
    NoStates,
    DuplicateStateId(String),
    DanglingTransition { state: String, index: usize, target: String },
    NoTerminalState,
    FinishWithoutTerminal(String),
    BadScreenshotExtension { state: String, path: String },
    RegionArity { state: String, index: usize, len: usize },
    NegativeOrigin { state: String, index: usize },
    EmptyWidth { state: String, index: usize, x1: i32, x2: i32 },
    EmptyHeight { state: String, index: usize, y1: i32, y2: i32 },
    UnknownStart(String),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::EmptyInstruction => write!(f, "instruction must not be empty"),
            Violation::InvalidMaxSteps(n) => write!(f, "max_steps must be >= 1 (got {})", n),
            Violation::NoStates => write!(f, "must define at least one state"),
            Violation::DuplicateStateId(id) => write!(f, "duplicate state id '{}'", id),
            Violation::DanglingTransition { state, index, target } => write!(
                f,
                "state '{}' transition #{} targets undefined state '{}'",
                state, index, target
            ),
            Violation::NoTerminalState => {
                write!(f, "must have at least one terminal state (is_terminal=true)")
            }
            Violation::FinishWithoutTerminal(state) => write!(
                f,
                "state '{}' sets expected_finish without is_terminal",
                state
            ),
            Violation::BadScreenshotExtension { state, path } => write!(
                f,
                "state '{}' screenshot '{}' must end in .png, .jpg or .jpeg",
                state, path
            ),
            Violation::RegionArity { state, index, len } => write!(
                f,
                "state '{}' transition #{} click_region has {} values, expected 4 (x1, y1, x2, y2)",
                state, index, len
            ),
            Violation::NegativeOrigin { state, index } => write!(
                f,
                "state '{}' transition #{} click_region coordinates must be non-negative",
                state, index
            ),
            Violation::EmptyWidth { state, index, x1, x2 } => write!(
                f,
                "state '{}' transition #{} x2 ({}) must be greater than x1 ({})",
                state, index, x2, x1
            ),
            Violation::EmptyHeight { state, index, y1, y2 } => write!(
                f,
                "state '{}' transition #{} y2 ({}) must be greater than y1 ({})",
                state, index, y2, y1
            ),
            Violation::UnknownStart(id) => write!(f, "start state '{}' is not declared", id),
        }
    }
}

/// Every violation found in one scenario document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Scenario name or file, for diagnostics
    pub scenario: String,
    pub violations: Vec<Violation>,
}

impl ValidationError {
    /// Duplicate ids reported by this error, in first-seen order
    pub fn duplicate_ids(&self) -> Vec<&str> {
        self.violations
            .iter()
            .filter_map(|v| match v {
                Violation::DuplicateStateId(id) => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scenario '{}' failed validation with {} violation(s):",
            self.scenario,
            self.violations.len()
        )?;
        for violation in &self.violations {
            write!(f, "\n  - {}", violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
