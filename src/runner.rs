//! Scenario runs and their verdicts.
//!
//! A run builds a fresh [`StateMachine`] and [`MockDevice`] from the
//! scenario, steps the agent until it finishes, stops, or uses up the step
//! budget, then judges where the graph ended up. Judging is ordered:
//!
//! 1. budget used up without a completion signal: fail
//! 2. final state not terminal: fail
//! 3. final state expects finish but none was signalled: fail
//! 4. otherwise pass (finishing on a terminal state that does not require
//!    it is accepted)

use serde::{Serialize, Serializer};
use std::fmt;
use std::path::Path;

use tracing::{info, warn};

use crate::agent::{Agent, StepContext, StepOutcome};
use crate::device::{DeviceCall, MockDevice, MockDeviceConfig};
use crate::error::HarnessResult;
use crate::machine::{HitRecord, StateMachine};
use crate::scenario::{self, ScenarioDefinition, StateDefinition};

/// Load a scenario file and build its state machine.
///
/// Returns the machine, the instruction for the agent and the step budget.
pub fn load_test_case(path: impl AsRef<Path>) -> HarnessResult<(StateMachine, String, u32)> {
    let scenario = scenario::load_file(path)?;
    let machine = StateMachine::from_scenario(&scenario)?;
    Ok((machine, scenario.instruction, scenario.max_steps))
}

/// Why a run failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    MaxStepsExceeded { max_steps: u32 },
    NonTerminalState(String),
    ExpectedFinishNotSignaled(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::MaxStepsExceeded { max_steps } => {
                write!(f, "max steps exceeded ({} allowed)", max_steps)
            }
            FailureReason::NonTerminalState(id) => {
                write!(f, "ended in non-terminal state `{}`", id)
            }
            FailureReason::ExpectedFinishNotSignaled(id) => {
                write!(f, "expected finish not signaled in state `{}`", id)
            }
        }
    }
}

// Reasons are reported as their message text
impl Serialize for FailureReason {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Outcome of one scenario run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub test_name: String,
    pub passed: bool,
    pub final_state: String,
    pub failure_reason: Option<FailureReason>,
    pub steps_taken: u32,
    /// Gestures that hit no region (informational)
    pub misses: usize,
    pub finish_signaled: bool,
    pub finish_message: Option<String>,
}

/// How the agent loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    Finished { message: Option<String> },
    Stopped { reason: String },
    BudgetExhausted,
}

/// Judge a finished run
pub fn evaluate(
    scenario: &ScenarioDefinition,
    final_state: &StateDefinition,
    termination: &Termination,
    steps_taken: u32,
    misses: usize,
) -> Verdict {
    let (finish_signaled, finish_message) = match termination {
        Termination::Finished { message } => (true, message.clone()),
        _ => (false, None),
    };

    let failure_reason = if *termination == Termination::BudgetExhausted {
        Some(FailureReason::MaxStepsExceeded {
            max_steps: scenario.max_steps,
        })
    } else if !final_state.is_terminal {
        Some(FailureReason::NonTerminalState(final_state.id.clone()))
    } else if final_state.expected_finish && !finish_signaled {
        Some(FailureReason::ExpectedFinishNotSignaled(final_state.id.clone()))
    } else {
        None
    };

    Verdict {
        test_name: scenario.name.clone(),
        passed: failure_reason.is_none(),
        final_state: final_state.id.clone(),
        failure_reason,
        steps_taken,
        misses,
        finish_signaled,
        finish_message,
    }
}

/// Verdict plus everything that happened on the way to it
#[derive(Debug, Clone, Serialize)]
pub struct RunTrace {
    pub verdict: Verdict,
    pub termination_note: Option<String>,
    pub history: Vec<HitRecord>,
    pub calls: Vec<DeviceCall>,
}

/// Drives one scenario against an agent
#[derive(Debug, Clone)]
pub struct TestRunner {
    scenario: ScenarioDefinition,
    device_config: MockDeviceConfig,
}

impl TestRunner {
    pub fn new(scenario: ScenarioDefinition) -> Self {
        Self {
            scenario,
            device_config: MockDeviceConfig::default(),
        }
    }

    /// Load and validate a scenario file
    pub fn from_path(path: impl AsRef<Path>) -> HarnessResult<Self> {
        Ok(Self::new(scenario::load_file(path)?))
    }

    pub fn device_config(mut self, config: MockDeviceConfig) -> Self {
        self.device_config = config;
        self
    }

    pub fn scenario(&self) -> &ScenarioDefinition {
        &self.scenario
    }

    /// Run the agent and return the verdict.
    ///
    /// An agent error (e.g. exhausted scripted responses) aborts the run
    /// and is returned as an error rather than a failing verdict.
    pub fn run<A: Agent + ?Sized>(&self, agent: &mut A) -> HarnessResult<Verdict> {
        Ok(self.run_traced(agent)?.verdict)
    }

    /// Run the agent and keep the hit history and device call log
    pub fn run_traced<A: Agent + ?Sized>(&self, agent: &mut A) -> HarnessResult<RunTrace> {
        let machine = StateMachine::from_scenario(&self.scenario)?;
        let mut device = MockDevice::with_config(machine, self.device_config.clone());

        let max_steps = self.scenario.max_steps;
        let mut steps_taken = 0;
        let mut termination = Termination::BudgetExhausted;

        while steps_taken < max_steps {
            steps_taken += 1;
            let ctx = StepContext {
                instruction: &self.scenario.instruction,
                step: steps_taken,
                max_steps,
            };
            match agent.step(&ctx, &mut device)? {
                StepOutcome::Continue => {}
                StepOutcome::Finished { message } => {
                    termination = Termination::Finished { message };
                    break;
                }
                StepOutcome::Stopped { reason } => {
                    termination = Termination::Stopped { reason };
                    break;
                }
            }
        }

        let calls = device.calls().to_vec();
        let machine = device.into_machine();
        let verdict = evaluate(
            &self.scenario,
            machine.current_state(),
            &termination,
            steps_taken,
            machine.misses(),
        );

        match &verdict.failure_reason {
            None => info!(
                scenario = %verdict.test_name,
                final_state = %verdict.final_state,
                steps = verdict.steps_taken,
                "scenario passed"
            ),
            Some(reason) => warn!(
                scenario = %verdict.test_name,
                final_state = %verdict.final_state,
                steps = verdict.steps_taken,
                misses = verdict.misses,
                reason = %reason,
                "scenario failed"
            ),
        }

        let termination_note = match termination {
            Termination::Stopped { reason } => Some(reason),
            _ => None,
        };

        Ok(RunTrace {
            verdict,
            termination_note,
            history: machine.history().to_vec(),
            calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{ActionAgent, ScriptedBackend};
    use crate::scenario::load_str;

    const SCENARIO: &str = r#"
test_name: judge
instruction: go
states:
  - id: home
    screenshot: home.png
    transitions:
      - { click_region: [0, 0, 10, 10], next_state: done }
      - { click_region: [20, 20, 30, 30], next_state: soft }
  - { id: done, screenshot: done.png, is_terminal: true, expected_finish: true }
  - { id: soft, screenshot: soft.png, is_terminal: true }
"#;

    fn judge(state: &str, termination: Termination) -> Verdict {
        let scenario = load_str(SCENARIO, ".").unwrap();
        let final_state = scenario.state(state).unwrap().clone();
        evaluate(&scenario, &final_state, &termination, 3, 0)
    }

    fn finished() -> Termination {
        Termination::Finished { message: None }
    }

    #[test]
    fn test_budget_checked_first() {
        let verdict = judge("done", Termination::BudgetExhausted);
        assert!(!verdict.passed);
        assert_eq!(
            verdict.failure_reason,
            Some(FailureReason::MaxStepsExceeded { max_steps: 10 })
        );
    }

    #[test]
    fn test_non_terminal_fails() {
        let verdict = judge("home", finished());
        assert_eq!(
            verdict.failure_reason,
            Some(FailureReason::NonTerminalState("home".to_string()))
        );
        assert_eq!(
            verdict.failure_reason.unwrap().to_string(),
            "ended in non-terminal state `home`"
        );
    }

    #[test]
    fn test_expected_finish_must_be_signaled() {
        let verdict = judge(
            "done",
            Termination::Stopped {
                reason: "gave up".to_string(),
            },
        );
        assert_eq!(
            verdict.failure_reason,
            Some(FailureReason::ExpectedFinishNotSignaled("done".to_string()))
        );
    }

    #[test]
    fn test_unrequested_finish_tolerated() {
        assert!(judge("soft", finished()).passed);
        assert!(
            judge(
                "soft",
                Termination::Stopped {
                    reason: "stop".to_string()
                }
            )
            .passed
        );
    }

    #[test]
    fn test_pass_records_finish() {
        let verdict = judge(
            "done",
            Termination::Finished {
                message: Some("ok".to_string()),
            },
        );
        assert!(verdict.passed);
        assert!(verdict.finish_signaled);
        assert_eq!(verdict.finish_message.as_deref(), Some("ok"));
        assert_eq!(verdict.final_state, "done");
    }

    #[test]
    fn test_quoted_finish_in_typed_text_is_not_completion() {
        let scenario = load_str(
            "test_name: typing\ninstruction: type it\nmax_steps: 1\nstates:\n  - { id: form, screenshot: form.png, is_terminal: true, expected_finish: true }\n",
            ".",
        )
        .unwrap();
        let mut agent = ActionAgent::new(ScriptedBackend::new([
            r#"do(action="Type", text="finish(x)")"#,
        ]));

        let verdict = TestRunner::new(scenario).run(&mut agent).unwrap();
        assert!(!verdict.passed);
        assert!(!verdict.finish_signaled);
        assert_eq!(
            verdict.failure_reason,
            Some(FailureReason::MaxStepsExceeded { max_steps: 1 })
        );
    }

    #[test]
    fn test_verdict_serializes_reason_as_text() {
        let verdict = judge("home", finished());
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["passed"], false);
        assert_eq!(json["failure_reason"], "ended in non-terminal state `home`");
        assert_eq!(json["steps_taken"], 3);
    }
}
