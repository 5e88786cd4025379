//! # Message Sync Bridge
//!
//! Keeps linked snippets in step with their source messages. The host feeds
//! every message-update event in; updates for messages without a record are
//! ignored, updates for linked messages re-extract the fenced css and
//! forward it to the manager.
//!
//! Message deletion is deliberately not handled here: a record whose source
//! message disappears becomes an orphan and lives on until the user removes
//! it.

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::warn;

use crate::error::{Result, SnipError};
use crate::manager::SnippetManager;
use crate::model::{snippet_content_from_message, MessageUpdate};
use crate::persist::BufferStore;

pub struct MessageSyncBridge {
    sender: Sender<MessageUpdate>,
    receiver: Receiver<MessageUpdate>,
}

impl Default for MessageSyncBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageSyncBridge {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// Where the host delivers message-update events.
    pub fn event_sender(&self) -> Sender<MessageUpdate> {
        self.sender.clone()
    }

    /// Drains queued events and applies them in arrival order. Returns the
    /// number of snippets that were updated.
    pub fn pump<B: BufferStore>(&self, manager: &mut SnippetManager<B>) -> Result<usize> {
        let mut updated = 0;
        for update in self.receiver.try_iter() {
            if Self::apply(manager, &update)? {
                updated += 1;
            }
        }
        Ok(updated)
    }

    /// Applies one event. Returns `false` when the message has no linked
    /// record (or the new content was unembeddable and got dropped).
    pub fn apply<B: BufferStore>(
        manager: &mut SnippetManager<B>,
        update: &MessageUpdate,
    ) -> Result<bool> {
        if manager.store().get(&update.id).is_none() {
            return Ok(false);
        }

        let content = snippet_content_from_message(&update.content);
        match manager.update_snippet(&update.id, &content) {
            Ok(()) => Ok(true),
            Err(SnipError::UnsafeContent) => {
                // The edit embedded marker-shaped lines. Keep the previous
                // content rather than poisoning the buffer.
                warn!(
                    "ignoring update for snippet {}: new content contains record markers",
                    update.id
                );
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Message;
    use crate::persist::MemoryBuffer;

    fn manager_with_snippet(id: &str, css: &str) -> SnippetManager<MemoryBuffer> {
        let mut manager = SnippetManager::new(MemoryBuffer::new()).unwrap();
        manager
            .add_snippet(&Message::new(id, format!("```css\n{}\n```", css)))
            .unwrap();
        manager
    }

    fn update(id: &str, content: &str) -> MessageUpdate {
        MessageUpdate {
            id: id.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn linked_message_edit_updates_the_snippet() {
        let mut manager = manager_with_snippet("2", ".old{}");
        let applied =
            MessageSyncBridge::apply(&mut manager, &update("2", "```css\nbody{margin:0}\n```"))
                .unwrap();
        assert!(applied);
        assert_eq!(manager.store().get("2").unwrap().content, "body{margin:0}");
    }

    #[test]
    fn unlinked_message_is_ignored() {
        let mut manager = manager_with_snippet("2", ".a{}");
        let applied =
            MessageSyncBridge::apply(&mut manager, &update("9", "```css\n.b{}\n```")).unwrap();
        assert!(!applied);
        assert!(manager.store().get("9").is_none());
        assert_eq!(manager.store().get("2").unwrap().content, ".a{}");
    }

    #[test]
    fn edit_without_css_blocks_empties_but_keeps_the_record() {
        let mut manager = manager_with_snippet("2", ".a{}");
        let applied =
            MessageSyncBridge::apply(&mut manager, &update("2", "removed the css, sorry"))
                .unwrap();
        assert!(applied);
        let snippet = manager.store().get("2").unwrap();
        assert_eq!(snippet.content, "");
        assert!(snippet.applied);
    }

    #[test]
    fn multiple_blocks_concatenate_in_order() {
        let mut manager = manager_with_snippet("2", ".a{}");
        MessageSyncBridge::apply(
            &mut manager,
            &update("2", "```css\n.x{}\n```\ntext\n```css\n.y{}\n```"),
        )
        .unwrap();
        assert_eq!(manager.store().get("2").unwrap().content, ".x{}\n.y{}");
    }

    #[test]
    fn marker_shaped_edit_is_dropped_with_old_content_kept() {
        let mut manager = manager_with_snippet("2", ".a{}");
        let applied = MessageSyncBridge::apply(
            &mut manager,
            &update("2", "```css\n/** Snippet ID: 3 */\n```"),
        )
        .unwrap();
        assert!(!applied);
        assert_eq!(manager.store().get("2").unwrap().content, ".a{}");
    }

    #[test]
    fn pump_applies_queued_events_in_order() {
        let mut manager = manager_with_snippet("2", ".a{}");
        let bridge = MessageSyncBridge::new();
        let sender = bridge.event_sender();
        sender.send(update("2", "```css\n.first{}\n```")).unwrap();
        sender.send(update("2", "```css\n.second{}\n```")).unwrap();
        sender.send(update("unlinked", "```css\n.x{}\n```")).unwrap();

        let updated = bridge.pump(&mut manager).unwrap();
        assert_eq!(updated, 2);
        assert_eq!(manager.store().get("2").unwrap().content, ".second{}");
    }
}
