use std::path::PathBuf;

use crate::agent::AgentError;
use crate::scenario::ValidationError;

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Error types for harness operations
#[derive(Debug)]
pub enum HarnessError {
    /// Reading or writing a file failed
    Io { path: PathBuf, source: std::io::Error },

    /// A scenario or response file is not well-formed YAML/JSON
    Parse {
        path: Option<PathBuf>,
        source: serde_yaml::Error,
    },

    /// The scenario parsed but broke one or more graph invariants
    Validation(ValidationError),

    /// The agent stopped abnormally (e.g. scripted responses ran out)
    Agent(AgentError),

    /// Rendering a placeholder screenshot failed
    Render(String),
}

impl HarnessError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HarnessError::Io {
            path: path.into(),
            source,
        }
    }
}

impl std::fmt::Display for HarnessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HarnessError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            HarnessError::Parse {
                path: Some(path),
                source,
            } => write!(f, "Parse error in {}: {}", path.display(), source),
            HarnessError::Parse { path: None, source } => write!(f, "Parse error: {}", source),
            HarnessError::Validation(err) => write!(f, "{}", err),
            HarnessError::Agent(err) => write!(f, "Agent error: {}", err),
            HarnessError::Render(msg) => write!(f, "Render error: {}", msg),
        }
    }
}

impl std::error::Error for HarnessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HarnessError::Io { source, .. } => Some(source),
            HarnessError::Parse { source, .. } => Some(source),
            HarnessError::Validation(err) => Some(err),
            HarnessError::Agent(err) => Some(err),
            HarnessError::Render(_) => None,
        }
    }
}

impl From<ValidationError> for HarnessError {
    fn from(err: ValidationError) -> Self {
        HarnessError::Validation(err)
    }
}

impl From<AgentError> for HarnessError {
    fn from(err: AgentError) -> Self {
        HarnessError::Agent(err)
    }
}
