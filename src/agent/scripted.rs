//! Scripted stand-in for the language-model backend.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use tracing::trace;

use super::{AgentError, AgentResult, ModelBackend, Prompt};
use crate::error::{HarnessError, HarnessResult};

/// Replays a fixed list of replies, one per request, first in first out.
///
/// Running out is an error; the last reply is never reused.
#[derive(Debug, Clone, Default)]
pub struct ScriptedBackend {
    queue: VecDeque<String>,
    consumed: usize,
    prompts: Vec<Prompt>,
}

impl ScriptedBackend {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            queue: responses.into_iter().map(Into::into).collect(),
            consumed: 0,
            prompts: Vec::new(),
        }
    }

    /// Load replies from a YAML (or JSON) list of strings
    pub fn from_file(path: impl AsRef<Path>) -> HarnessResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
        let responses: Vec<String> =
            serde_yaml::from_str(&text).map_err(|e| HarnessError::Parse {
                path: Some(path.to_path_buf()),
                source: e,
            })?;
        Ok(Self::new(responses))
    }

    /// Replies not yet handed out
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Every prompt received, in order
    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }
}

impl ModelBackend for ScriptedBackend {
    fn respond(&mut self, prompt: &Prompt) -> AgentResult<String> {
        self.prompts.push(prompt.clone());
        let reply = self.queue.pop_front().ok_or(AgentError::ResponsesExhausted {
            consumed: self.consumed,
        })?;
        self.consumed += 1;
        trace!(step = prompt.step, consumed = self.consumed, "scripted reply");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn prompt(step: u32) -> Prompt {
        Prompt {
            instruction: "go".to_string(),
            step,
            current_app: "app".to_string(),
            screenshot: None,
        }
    }

    #[test]
    fn test_replies_in_order_then_exhausts() {
        let mut backend = ScriptedBackend::new(["a", "b"]);
        assert_eq!(backend.respond(&prompt(1)).unwrap(), "a");
        assert_eq!(backend.respond(&prompt(2)).unwrap(), "b");
        assert_eq!(backend.remaining(), 0);

        let err = backend.respond(&prompt(3)).unwrap_err();
        assert!(matches!(err, AgentError::ResponsesExhausted { consumed: 2 }));
        assert_eq!(backend.prompts().len(), 3);
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "- |\n  reasoning\n  do(action=\"Tap\", element=[1,2])\n- finish(message=\"ok\")"
        )
        .unwrap();

        let mut backend = ScriptedBackend::from_file(file.path()).unwrap();
        assert_eq!(backend.remaining(), 2);
        assert!(backend.respond(&prompt(1)).unwrap().contains("element=[1,2]"));
    }

    #[test]
    fn test_from_file_rejects_non_list() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not: a list").unwrap();
        assert!(matches!(
            ScriptedBackend::from_file(file.path()),
            Err(HarnessError::Parse { .. })
        ));
    }
}
