//! Scenario loading and validation.
//!
//! Loading is two-phase: the YAML document is deserialized into the raw
//! shapes from [`types`](super::types), then every invariant is checked and
//! all violations are collected before anything is returned. A scenario is
//! either fully valid or rejected with the complete list of problems.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use tracing::debug;

use super::types::{
    RawScenario, RawState, Rect, SCREENSHOT_EXTENSIONS, ScenarioDefinition, StateDefinition,
    TransitionDefinition, ValidationError, Violation,
};
use crate::error::{HarnessError, HarnessResult};

/// Load and validate a scenario file.
///
/// Screenshot paths are resolved relative to the file's directory.
pub fn load_file(path: impl AsRef<Path>) -> HarnessResult<ScenarioDefinition> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
    let raw: RawScenario = serde_yaml::from_str(&text).map_err(|e| HarnessError::Parse {
        path: Some(path.to_path_buf()),
        source: e,
    })?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut scenario = validate(raw, base_dir, &path.display().to_string())?;
    scenario.source = Some(path.to_path_buf());

    debug!(
        scenario = %scenario.name,
        states = scenario.states.len(),
        path = %path.display(),
        "loaded scenario"
    );
    Ok(scenario)
}

/// Load and validate a scenario from YAML text.
pub fn load_str(text: &str, base_dir: impl AsRef<Path>) -> HarnessResult<ScenarioDefinition> {
    let raw: RawScenario =
        serde_yaml::from_str(text).map_err(|e| HarnessError::Parse { path: None, source: e })?;
    Ok(validate(raw, base_dir.as_ref(), "<inline>")?)
}

/// Check every invariant on a raw scenario and build the typed definition.
pub fn validate(
    raw: RawScenario,
    base_dir: &Path,
    origin: &str,
) -> Result<ScenarioDefinition, ValidationError> {
    let mut violations = Vec::new();

    if raw.instruction.trim().is_empty() {
        violations.push(Violation::EmptyInstruction);
    }
    let max_steps = match u32::try_from(raw.max_steps) {
        Ok(n) if n >= 1 => n,
        _ => {
            violations.push(Violation::InvalidMaxSteps(raw.max_steps));
            0
        }
    };

    if raw.states.is_empty() {
        violations.push(Violation::NoStates);
    } else {
        violations.extend(duplicate_ids(&raw.states));

        let declared: HashSet<&str> = raw.states.iter().map(|s| s.id.as_str()).collect();
        for state in &raw.states {
            check_state(state, &declared, &mut violations);
        }

        if !raw.states.iter().any(|s| s.is_terminal) {
            violations.push(Violation::NoTerminalState);
        }

        if let Some(start) = &raw.start {
            if !declared.contains(start.as_str()) {
                violations.push(Violation::UnknownStart(start.clone()));
            }
        }
    }

    if !violations.is_empty() {
        let scenario = if raw.test_name.is_empty() {
            origin.to_string()
        } else {
            raw.test_name
        };
        return Err(ValidationError {
            scenario,
            violations,
        });
    }

    let start = match raw.start {
        Some(start) => start,
        None => raw.states[0].id.clone(),
    };

    let states = raw
        .states
        .into_iter()
        .map(|state| StateDefinition {
            screenshot: base_dir.join(&state.screenshot),
            transitions: state
                .transitions
                .into_iter()
                .map(|t| TransitionDefinition {
                    region: Rect::new(
                        t.click_region[0],
                        t.click_region[1],
                        t.click_region[2],
                        t.click_region[3],
                    ),
                    next_state: t.next_state,
                    description: t.description,
                })
                .collect(),
            id: state.id,
            current_app: state.current_app,
            is_terminal: state.is_terminal,
            expected_finish: state.expected_finish,
        })
        .collect();

    Ok(ScenarioDefinition {
        name: raw.test_name,
        instruction: raw.instruction,
        max_steps,
        start,
        states,
        source: None,
    })
}

/// One violation per id that appears more than once, in first-seen order
fn duplicate_ids(states: &[RawState]) -> Vec<Violation> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for state in states {
        *counts.entry(state.id.as_str()).or_default() += 1;
    }

    let mut reported = HashSet::new();
    states
        .iter()
        .filter(|s| counts[s.id.as_str()] > 1 && reported.insert(s.id.as_str()))
        .map(|s| Violation::DuplicateStateId(s.id.clone()))
        .collect()
}

fn check_state(state: &RawState, declared: &HashSet<&str>, violations: &mut Vec<Violation>) {
    let extension_ok = Path::new(&state.screenshot)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| SCREENSHOT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false);
    if !extension_ok {
        violations.push(Violation::BadScreenshotExtension {
            state: state.id.clone(),
            path: state.screenshot.clone(),
        });
    }

    if state.expected_finish && !state.is_terminal {
        violations.push(Violation::FinishWithoutTerminal(state.id.clone()));
    }

    for (index, transition) in state.transitions.iter().enumerate() {
        check_region(&state.id, index, &transition.click_region, violations);

        if !declared.contains(transition.next_state.as_str()) {
            violations.push(Violation::DanglingTransition {
                state: state.id.clone(),
                index,
                target: transition.next_state.clone(),
            });
        }
    }
}

fn check_region(state: &str, index: usize, region: &[i32], violations: &mut Vec<Violation>) {
    let [x1, y1, x2, y2] = match region {
        [x1, y1, x2, y2] => [*x1, *y1, *x2, *y2],
        _ => {
            violations.push(Violation::RegionArity {
                state: state.to_string(),
                index,
                len: region.len(),
            });
            return;
        }
    };

    if x1 < 0 || y1 < 0 {
        violations.push(Violation::NegativeOrigin {
            state: state.to_string(),
            index,
        });
    }
    if x2 <= x1 {
        violations.push(Violation::EmptyWidth {
            state: state.to_string(),
            index,
            x1,
            x2,
        });
    }
    if y2 <= y1 {
        violations.push(Violation::EmptyHeight {
            state: state.to_string(),
            index,
            y1,
            y2,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const MESSAGE_SCENARIO: &str = r#"
test_name: open messages
instruction: Tap the message button at the bottom of the screen
max_steps: 5
states:
  - id: home
    screenshot: screenshots/home.png
    transitions:
      - click_region: [100, 500, 200, 600]
        next_state: message
        description: tap messages
  - id: message
    screenshot: screenshots/message.PNG
    current_app: com.example.chat
    is_terminal: true
    expected_finish: true
"#;

    fn violations(text: &str) -> Vec<Violation> {
        match load_str(text, ".") {
            Err(HarnessError::Validation(err)) => err.violations,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_valid_scenario() {
        let scenario = load_str(MESSAGE_SCENARIO, "/scenarios/msg").unwrap();
        assert_eq!(scenario.name, "open messages");
        assert_eq!(scenario.max_steps, 5);
        assert_eq!(scenario.start, "home");
        assert_eq!(scenario.states.len(), 2);

        let home = &scenario.states[0];
        assert_eq!(home.current_app, "com.android.launcher");
        assert_eq!(
            home.screenshot,
            PathBuf::from("/scenarios/msg/screenshots/home.png")
        );
        assert_eq!(home.transitions[0].region, Rect::new(100, 500, 200, 600));
        assert_eq!(home.transitions[0].description, "tap messages");

        let message = scenario.state("message").unwrap();
        assert!(message.is_terminal);
        assert!(message.expected_finish);
        assert_eq!(message.current_app, "com.example.chat");

        let terminals: Vec<&str> = scenario.terminal_states().map(|s| s.id.as_str()).collect();
        assert_eq!(terminals, vec!["message"]);
    }

    #[test]
    fn test_defaults_applied() {
        let text = r#"
test_name: defaults
instruction: do it
states:
  - id: only
    screenshot: only.jpg
    is_terminal: true
"#;
        let scenario = load_str(text, ".").unwrap();
        assert_eq!(scenario.max_steps, 10);
        assert!(scenario.states[0].transitions.is_empty());
        assert!(!scenario.states[0].expected_finish);
    }

    #[test]
    fn test_duplicate_ids_reported_once_each() {
        let text = r#"
test_name: dupes
instruction: go
states:
  - { id: home, screenshot: a.png }
  - { id: home, screenshot: b.png, is_terminal: true }
  - { id: home, screenshot: c.png }
  - { id: other, screenshot: d.png }
  - { id: other, screenshot: e.png }
"#;
        let found = violations(text);
        assert_eq!(
            found,
            vec![
                Violation::DuplicateStateId("home".to_string()),
                Violation::DuplicateStateId("other".to_string()),
            ]
        );
    }

    #[test]
    fn test_negative_max_steps_reported_with_the_rest() {
        let text = "test_name: neg\ninstruction: ''\nmax_steps: -1\nstates:\n  - { id: a, screenshot: a.gif }\n";
        assert_eq!(
            violations(text),
            vec![
                Violation::EmptyInstruction,
                Violation::InvalidMaxSteps(-1),
                Violation::BadScreenshotExtension {
                    state: "a".to_string(),
                    path: "a.gif".to_string(),
                },
                Violation::NoTerminalState,
            ]
        );
    }

    #[test]
    fn test_collects_all_violations() {
        let text = r#"
test_name: broken
instruction: "  "
max_steps: 0
start: nowhere
states:
  - id: home
    screenshot: home.gif
    expected_finish: true
    transitions:
      - click_region: [-1, 10, -5, 10]
        next_state: ghost
      - click_region: [1, 2, 3]
        next_state: home
"#;
        let found = violations(text);
        assert!(found.contains(&Violation::EmptyInstruction));
        assert!(found.contains(&Violation::InvalidMaxSteps(0)));
        assert!(found.contains(&Violation::UnknownStart("nowhere".to_string())));
        assert!(found.contains(&Violation::NoTerminalState));
        assert!(found.contains(&Violation::FinishWithoutTerminal("home".to_string())));
        assert!(found.contains(&Violation::BadScreenshotExtension {
            state: "home".to_string(),
            path: "home.gif".to_string(),
        }));
        assert!(found.contains(&Violation::NegativeOrigin {
            state: "home".to_string(),
            index: 0,
        }));
        assert!(found.contains(&Violation::EmptyWidth {
            state: "home".to_string(),
            index: 0,
            x1: -1,
            x2: -5,
        }));
        assert!(found.contains(&Violation::EmptyHeight {
            state: "home".to_string(),
            index: 0,
            y1: 10,
            y2: 10,
        }));
        assert!(found.contains(&Violation::DanglingTransition {
            state: "home".to_string(),
            index: 0,
            target: "ghost".to_string(),
        }));
        assert!(found.contains(&Violation::RegionArity {
            state: "home".to_string(),
            index: 1,
            len: 3,
        }));
    }

    #[test]
    fn test_every_dangling_target_listed() {
        let text = r#"
test_name: dangling
instruction: go
states:
  - id: home
    screenshot: home.png
    is_terminal: true
    transitions:
      - { click_region: [0, 0, 10, 10], next_state: a }
      - { click_region: [0, 0, 10, 10], next_state: b }
"#;
        let targets: Vec<String> = violations(text)
            .into_iter()
            .filter_map(|v| match v {
                Violation::DanglingTransition { target, .. } => Some(target),
                _ => None,
            })
            .collect();
        assert_eq!(targets, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_empty_states_rejected() {
        let text = "test_name: empty\ninstruction: go\nstates: []\n";
        assert_eq!(violations(text), vec![Violation::NoStates]);
    }

    #[test]
    fn test_explicit_start() {
        let text = r#"
test_name: start
instruction: go
start: second
states:
  - { id: first, screenshot: a.png, is_terminal: true }
  - { id: second, screenshot: b.png }
"#;
        assert_eq!(load_str(text, ".").unwrap().start, "second");
    }

    #[test]
    fn test_malformed_yaml_is_parse_error() {
        let result = load_str("test_name: [unterminated", ".");
        assert!(matches!(result, Err(HarnessError::Parse { path: None, .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_file("/definitely/not/here/scenario.yaml");
        assert!(matches!(result, Err(HarnessError::Io { .. })));
    }
}
