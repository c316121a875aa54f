//! Runtime screen graph with a single mutable cursor.
//!
//! The graph (states, hit regions, screenshots) is fixed at construction;
//! only the current-state cursor and the hit history change while a run
//! is in progress. Hit-testing walks a state's transitions in declaration
//! order and the first region containing the point fires, so overlapping
//! regions are resolved by the order the scenario author wrote them in.
//!
//! Swipes are hit-tested at their start point.

use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::scenario::{ScenarioDefinition, StateDefinition, ValidationError, Violation};

/// The image bound to a state, without loading it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenshotHandle {
    pub state_id: String,
    pub path: PathBuf,
}

/// Kind of pointer gesture that was resolved against the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gesture {
    Tap,
    DoubleTap,
    LongPress,
    Swipe { end_x: i32, end_y: i32 },
}

/// One resolved gesture, hit or miss
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HitRecord {
    /// 1-based position in the history
    pub seq: usize,
    pub gesture: Gesture,
    pub x: i32,
    pub y: i32,
    pub from: String,
    /// Target state, or `None` when no region contained the point
    pub to: Option<String>,
    pub description: Option<String>,
}

impl HitRecord {
    pub fn is_miss(&self) -> bool {
        self.to.is_none()
    }
}

/// Screen graph plus the cursor for one test run
#[derive(Debug, Clone)]
pub struct StateMachine {
    name: String,
    states: Vec<StateDefinition>,
    index: HashMap<String, usize>,
    start: usize,
    current: usize,
    history: Vec<HitRecord>,
}

impl StateMachine {
    /// Build a machine positioned on the scenario's start state
    pub fn from_scenario(scenario: &ScenarioDefinition) -> Result<Self, ValidationError> {
        let index: HashMap<String, usize> = scenario
            .states
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();

        let start = *index.get(&scenario.start).ok_or_else(|| ValidationError {
            scenario: scenario.name.clone(),
            violations: vec![Violation::UnknownStart(scenario.start.clone())],
        })?;

        Ok(Self {
            name: scenario.name.clone(),
            states: scenario.states.clone(),
            index,
            start,
            current: start,
            history: Vec::new(),
        })
    }

    /// States in declaration order
    pub fn states(&self) -> &[StateDefinition] {
        &self.states
    }

    pub fn state(&self, id: &str) -> Option<&StateDefinition> {
        self.index.get(id).map(|&i| &self.states[i])
    }

    pub fn contains_state(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn start_state_id(&self) -> &str {
        &self.states[self.start].id
    }

    pub fn current_state(&self) -> &StateDefinition {
        &self.states[self.current]
    }

    pub fn current_state_id(&self) -> &str {
        &self.current_state().id
    }

    pub fn current_app(&self) -> &str {
        &self.current_state().current_app
    }

    pub fn current_screenshot(&self) -> ScreenshotHandle {
        let state = self.current_state();
        ScreenshotHandle {
            state_id: state.id.clone(),
            path: state.screenshot.clone(),
        }
    }

    /// Every gesture resolved so far, in order
    pub fn history(&self) -> &[HitRecord] {
        &self.history
    }

    /// Number of gestures that landed outside every region
    pub fn misses(&self) -> usize {
        self.history.iter().filter(|r| r.is_miss()).count()
    }

    /// Move the cursor back to the start state and forget the history
    pub fn reset(&mut self) {
        self.current = self.start;
        self.history.clear();
    }

    /// Resolve a tap; returns whether a transition fired
    pub fn handle_tap(&mut self, x: i32, y: i32) -> bool {
        self.resolve(Gesture::Tap, x, y)
    }

    pub fn handle_double_tap(&mut self, x: i32, y: i32) -> bool {
        self.resolve(Gesture::DoubleTap, x, y)
    }

    pub fn handle_long_press(&mut self, x: i32, y: i32) -> bool {
        self.resolve(Gesture::LongPress, x, y)
    }

    /// Resolve a swipe at its start point
    pub fn handle_swipe(&mut self, start_x: i32, start_y: i32, end_x: i32, end_y: i32) -> bool {
        self.resolve(Gesture::Swipe { end_x, end_y }, start_x, start_y)
    }

    fn resolve(&mut self, gesture: Gesture, x: i32, y: i32) -> bool {
        let from = self.current;
        let hit = self.states[from]
            .transitions
            .iter()
            .find(|t| t.region.contains(x, y))
            .map(|t| (t.next_state.clone(), t.description.clone()));

        let target = match hit {
            Some((next, description)) => match self.index.get(&next) {
                Some(&to) => Some((to, next, description)),
                None => {
                    warn!(
                        scenario = %self.name,
                        from = %self.states[from].id,
                        target = %next,
                        "transition targets unknown state, treating as miss"
                    );
                    None
                }
            },
            None => None,
        };

        let seq = self.history.len() + 1;
        let from_id = self.states[from].id.clone();

        match target {
            Some((to, next, description)) => {
                info!(
                    scenario = %self.name,
                    from = %from_id,
                    to = %next,
                    x,
                    y,
                    description = %description,
                    "transition"
                );
                self.current = to;
                self.history.push(HitRecord {
                    seq,
                    gesture,
                    x,
                    y,
                    from: from_id,
                    to: Some(next),
                    description: Some(description).filter(|d| !d.is_empty()),
                });
                true
            }
            None => {
                debug!(scenario = %self.name, state = %from_id, x, y, "no region hit");
                self.history.push(HitRecord {
                    seq,
                    gesture,
                    x,
                    y,
                    from: from_id,
                    to: None,
                    description: None,
                });
                false
            }
        }
    }
}
