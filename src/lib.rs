//! Screen Graph - device-free test harness for GUI automation agents.
//!
//! This crate provides:
//! - Declarative scenarios: screens, click regions, an instruction and a step budget
//! - A state machine that resolves taps and swipes into screen transitions
//! - A mock device implementing the agent's full device control surface
//! - A runner that drives an agent and renders a pass/fail verdict
//! - A scripted model backend so agents run without a network
//! - Placeholder screenshot generation for scenario authoring
//!
//! # Example
//!
//! ```rust,no_run
//! use screen_graph::{ActionAgent, ScriptedBackend, TestRunner};
//!
//! let runner = TestRunner::from_path("scenarios/messages/scenario.yaml").unwrap();
//! let backend = ScriptedBackend::new([
//!     "do(action=\"Tap\", element=[150,550])",
//!     "finish(message=\"done\")",
//! ]);
//! let verdict = runner.run(&mut ActionAgent::new(backend)).unwrap();
//! assert!(verdict.passed, "{:?}", verdict.failure_reason);
//! ```

pub mod agent;
pub mod config;
pub mod device;
pub mod error;
pub mod machine;
pub mod render;
pub mod runner;
pub mod scenario;
pub mod suite;

// Re-export error types
pub use error::{HarnessError, HarnessResult};

// Re-export scenario types
pub use scenario::{
    Rect, ScenarioDefinition, StateDefinition, TransitionDefinition, ValidationError, Violation,
};

// Re-export the state machine
pub use machine::{Gesture, HitRecord, ScreenshotHandle, StateMachine};

// Re-export device surface
pub use device::{DeviceCall, DeviceControl, DeviceError, MockDevice, MockDeviceConfig, Screenshot};

// Re-export agent types
pub use agent::{
    Action, ActionAgent, Agent, AgentError, CoordinateMode, ModelBackend, Prompt, ScriptedBackend,
    StepContext, StepOutcome,
};

// Re-export runner
pub use runner::{FailureReason, RunTrace, TestRunner, Verdict, evaluate, load_test_case};
pub use suite::{SuiteOptions, SuiteReport, run_suite};
