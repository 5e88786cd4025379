//! # Command Layer
//!
//! The verb contract consumed by command-palette-style collaborators: four
//! subcommands — `add`, `delete`, `enable`, `disable` — each taking one
//! snippet id and delegating to the corresponding manager operation.
//!
//! Commands never panic and never leak a raw error across the boundary:
//! every outcome, including an unrecognized verb, comes back as a
//! structured [`CmdResult`] the caller can render. An unknown verb lists
//! the valid ones instead of failing.

use crate::error::Result;
use crate::manager::SnippetManager;
use crate::model::Message;
use crate::persist::BufferStore;

pub const VALID_VERBS: [&str; 4] = ["add", "delete", "enable", "disable"];

/// Looks up a message by id. Messages live with the host; the command layer
/// only needs this one door into them.
pub trait MessageSource {
    fn message(&self, id: &str) -> Result<Option<Message>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    /// Ids of snippets the command touched.
    pub affected: Vec<String>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn message(message: CmdMessage) -> Self {
        Self {
            affected: Vec::new(),
            messages: vec![message],
        }
    }

    pub fn succeeded(&self) -> bool {
        !self
            .messages
            .iter()
            .any(|message| message.level == MessageLevel::Error)
    }
}

/// Runs one verb. All manager failures are folded into the result; the
/// caller renders, it does not catch.
pub fn dispatch<B: BufferStore>(
    manager: &mut SnippetManager<B>,
    source: &dyn MessageSource,
    verb: &str,
    args: &[String],
) -> CmdResult {
    let handler: fn(&mut SnippetManager<B>, &dyn MessageSource, &str) -> CmdResult = match verb {
        "add" => add,
        "delete" => delete,
        "enable" => enable,
        "disable" => disable,
        _ => {
            return CmdResult::message(CmdMessage::error(format!(
                "`{}` is not a valid subcommand. Valid subcommands: {}",
                verb,
                VALID_VERBS.join(", ")
            )))
        }
    };

    let Some(id) = args.first() else {
        return CmdResult::message(CmdMessage::error(format!(
            "`{}` takes a snippet id",
            verb
        )));
    };

    handler(manager, source, id)
}

fn add<B: BufferStore>(
    manager: &mut SnippetManager<B>,
    source: &dyn MessageSource,
    id: &str,
) -> CmdResult {
    let message = match source.message(id) {
        Ok(Some(message)) => message,
        Ok(None) => {
            return CmdResult::message(CmdMessage::error(format!("No message found for id {}", id)))
        }
        Err(err) => return CmdResult::message(CmdMessage::error(err.to_string())),
    };

    match manager.add_snippet(&message) {
        Ok(()) => CmdResult {
            affected: vec![id.to_string()],
            messages: vec![CmdMessage::success(format!("Added snippet {}", id))],
        },
        Err(err) => CmdResult::message(CmdMessage::error(err.to_string())),
    }
}

fn delete<B: BufferStore>(
    manager: &mut SnippetManager<B>,
    _source: &dyn MessageSource,
    id: &str,
) -> CmdResult {
    match manager.remove_snippet(id) {
        Ok(()) => CmdResult {
            affected: vec![id.to_string()],
            messages: vec![CmdMessage::success(format!("Removed snippet {}", id))],
        },
        Err(err) => CmdResult::message(CmdMessage::error(err.to_string())),
    }
}

fn enable<B: BufferStore>(
    manager: &mut SnippetManager<B>,
    _source: &dyn MessageSource,
    id: &str,
) -> CmdResult {
    match manager.enable_snippet(id) {
        Ok(()) => CmdResult {
            affected: vec![id.to_string()],
            messages: vec![CmdMessage::success(format!("Enabled snippet {}", id))],
        },
        Err(err) => CmdResult::message(CmdMessage::error(err.to_string())),
    }
}

fn disable<B: BufferStore>(
    manager: &mut SnippetManager<B>,
    _source: &dyn MessageSource,
    id: &str,
) -> CmdResult {
    match manager.disable_snippet(id) {
        Ok(()) => CmdResult {
            affected: vec![id.to_string()],
            messages: vec![CmdMessage::success(format!("Disabled snippet {}", id))],
        },
        Err(err) => CmdResult::message(CmdMessage::error(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryBuffer;
    use std::collections::HashMap;

    struct FakeMessages(HashMap<String, Message>);

    impl FakeMessages {
        fn with(id: &str, css: &str) -> Self {
            let mut messages = HashMap::new();
            messages.insert(
                id.to_string(),
                Message::new(id, format!("```css\n{}\n```", css)),
            );
            Self(messages)
        }
    }

    impl MessageSource for FakeMessages {
        fn message(&self, id: &str) -> Result<Option<Message>> {
            Ok(self.0.get(id).cloned())
        }
    }

    fn manager() -> SnippetManager<MemoryBuffer> {
        SnippetManager::new(MemoryBuffer::new()).unwrap()
    }

    fn args(id: &str) -> Vec<String> {
        vec![id.to_string()]
    }

    #[test]
    fn unknown_verb_lists_valid_ones() {
        let mut manager = manager();
        let source = FakeMessages::with("1", ".a{}");
        let result = dispatch(&mut manager, &source, "frobnicate", &args("1"));
        assert!(!result.succeeded());
        let rendered = &result.messages[0].content;
        for verb in VALID_VERBS {
            assert!(rendered.contains(verb), "missing {} in: {}", verb, rendered);
        }
    }

    #[test]
    fn missing_id_is_an_error_result() {
        let mut manager = manager();
        let source = FakeMessages::with("1", ".a{}");
        let result = dispatch(&mut manager, &source, "delete", &[]);
        assert!(!result.succeeded());
    }

    #[test]
    fn add_then_disable_then_enable_then_delete() {
        let mut manager = manager();
        let source = FakeMessages::with("1", ".a{}");

        for verb in ["add", "disable", "enable", "delete"] {
            let result = dispatch(&mut manager, &source, verb, &args("1"));
            assert!(result.succeeded(), "{} failed: {:?}", verb, result.messages);
            assert_eq!(result.affected, vec!["1".to_string()]);
        }
        assert!(manager.store().is_empty());
    }

    #[test]
    fn add_for_unknown_message_fails_cleanly() {
        let mut manager = manager();
        let source = FakeMessages::with("1", ".a{}");
        let result = dispatch(&mut manager, &source, "add", &args("2"));
        assert!(!result.succeeded());
        assert!(result.messages[0].content.contains("No message found"));
    }

    #[test]
    fn duplicate_add_surfaces_as_error_message() {
        let mut manager = manager();
        let source = FakeMessages::with("1", ".a{}");
        dispatch(&mut manager, &source, "add", &args("1"));
        let result = dispatch(&mut manager, &source, "add", &args("1"));
        assert!(!result.succeeded());
    }
}
