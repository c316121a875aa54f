pub mod loader;
pub mod types;

pub use loader::{load_file, load_str, validate};
pub use types::{
    DEFAULT_CURRENT_APP, DEFAULT_MAX_STEPS, Rect, ScenarioDefinition, StateDefinition,
    TransitionDefinition, ValidationError, Violation,
};
