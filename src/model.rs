//! # Domain Model: Snippets and Message Extraction
//!
//! A [`Snippet`] is a user-authored CSS block logically owned by one external
//! chat message. The message id doubles as the snippet id, which keeps the
//! link between the two trivially stable: an edit to message `X` is always an
//! edit to snippet `X`.
//!
//! ## Where content comes from
//!
//! Snippet content is never typed into the stylesheet by hand. It is lifted
//! out of a message's text by [`extract_css_blocks`]: every fenced code block
//! opened with a ` ```css ` line and closed with a ` ``` ` line contributes
//! its trimmed body. Multiple blocks in one message are joined with a single
//! newline, in message order. A message with no css fences yields an empty
//! string — the snippet survives with empty content rather than being
//! deleted, so a half-finished message edit never destroys the record.
//!
//! ## Applied vs. cached
//!
//! `applied == true` means the snippet is currently embedded in the live
//! stylesheet buffer. Disabled snippets keep their content and metadata in
//! the store (and the sidecar cache on disk) but contribute nothing to the
//! buffer text.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat message as seen by the snippet system. Only the fields the core
/// needs: everything else about messages belongs to the host.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub author_id: Option<String>,
}

impl Message {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            author_id: None,
        }
    }

    pub fn with_author(mut self, author_id: impl Into<String>) -> Self {
        self.author_id = Some(author_id.into());
        self
    }
}

/// Payload of a message-edit event from the host's event stream.
#[derive(Debug, Clone)]
pub struct MessageUpdate {
    pub id: String,
    pub content: String,
}

/// A resolved author profile. Resolution is best-effort and lazy; a snippet
/// is fully functional without one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
}

/// Display metadata attached to a snippet. None of it is required for store
/// correctness; all of it lives in the sidecar cache, not the buffer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnippetDetails {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snippet {
    pub id: String,
    /// Footer marker value. A parsing disambiguator, not a sort key.
    pub order: u32,
    pub content: String,
    pub applied: bool,
    pub details: SnippetDetails,
}

impl Snippet {
    pub fn new(id: impl Into<String>, order: u32, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            order,
            content: content.into(),
            applied: true,
            details: SnippetDetails::default(),
        }
    }

    /// Title shown in listings: explicit title if set, else the snippet id.
    pub fn display_title(&self) -> String {
        self.details
            .title
            .clone()
            .unwrap_or_else(|| format!("Snippet #{}", self.id))
    }
}

/// A disabled snippet's body as held in the sidecar cache. The buffer no
/// longer carries the triple, so the cache is the only copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSnippet {
    pub content: String,
    pub order: u32,
}

/// On-disk shape of the sidecar cache (`snippets.json`). Display metadata is
/// kept for applied snippets too; disabled bodies only for disabled ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnippetCache {
    #[serde(default)]
    pub details: std::collections::HashMap<String, SnippetDetails>,
    #[serde(default)]
    pub disabled: std::collections::HashMap<String, CachedSnippet>,
}

/// Query options for [`crate::store::SnippetStore::get_snippets`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SnippetQuery {
    /// Include disabled (cached-but-not-applied) snippets.
    pub include_cached: bool,
    /// Include content and display metadata. Listings are cheap without it.
    pub include_details: bool,
}

impl SnippetQuery {
    pub fn cached(mut self) -> Self {
        self.include_cached = true;
        self
    }

    pub fn detailed(mut self) -> Self {
        self.include_details = true;
        self
    }
}

/// One row of a store listing. `content` and `details` are populated only
/// when the query asked for details.
#[derive(Debug, Clone, PartialEq)]
pub struct SnippetListing {
    pub id: String,
    pub title: String,
    pub applied: bool,
    pub content: Option<String>,
    pub details: Option<SnippetDetails>,
}

/// Extracts the bodies of all fenced css code blocks from a message's text.
///
/// A block opens on a line whose trimmed text is exactly ` ```css ` (tag
/// matched case-insensitively) and closes on a line whose trimmed text is
/// ` ``` `. Bodies are returned trimmed, in message order. An unclosed fence
/// contributes nothing.
pub fn extract_css_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut body: Option<Vec<&str>> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        body = match body.take() {
            None => {
                let opens = trimmed
                    .strip_prefix("```")
                    .is_some_and(|tag| tag.eq_ignore_ascii_case("css"));
                opens.then(Vec::new)
            }
            Some(mut lines) => {
                if trimmed == "```" {
                    blocks.push(lines.join("\n").trim().to_string());
                    None
                } else {
                    lines.push(line);
                    Some(lines)
                }
            }
        };
    }

    blocks
}

/// The content a linked snippet takes on after a message edit: all css block
/// bodies joined with a newline. No blocks means empty content.
pub fn snippet_content_from_message(text: &str) -> String {
    extract_css_blocks(text).join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_block() {
        let text = "check this out\n```css\nbody{margin:0}\n```\nneat huh";
        assert_eq!(extract_css_blocks(text), vec!["body{margin:0}"]);
    }

    #[test]
    fn extracts_multiple_blocks_in_order() {
        let text = "```css\n.a{}\n```\nand\n```css\n.b{}\n```";
        assert_eq!(extract_css_blocks(text), vec![".a{}", ".b{}"]);
        assert_eq!(snippet_content_from_message(text), ".a{}\n.b{}");
    }

    #[test]
    fn tag_is_case_insensitive() {
        let text = "```CSS\n.a{color:red}\n```";
        assert_eq!(extract_css_blocks(text), vec![".a{color:red}"]);
    }

    #[test]
    fn ignores_other_languages() {
        let text = "```js\nconsole.log(1)\n```\n```css\n.a{}\n```";
        assert_eq!(extract_css_blocks(text), vec![".a{}"]);
    }

    #[test]
    fn unclosed_fence_contributes_nothing() {
        let text = "```css\n.a{}";
        assert!(extract_css_blocks(text).is_empty());
        assert_eq!(snippet_content_from_message(text), "");
    }

    #[test]
    fn no_blocks_yields_empty_content() {
        assert_eq!(snippet_content_from_message("just chatting"), "");
    }

    #[test]
    fn bodies_are_trimmed() {
        let text = "```css\n\n  .a{}  \n\n```";
        assert_eq!(extract_css_blocks(text), vec![".a{}"]);
    }

    #[test]
    fn display_title_falls_back_to_id() {
        let mut snippet = Snippet::new("42", 0, ".a{}");
        assert_eq!(snippet.display_title(), "Snippet #42");
        snippet.details.title = Some("Hide sidebar".into());
        assert_eq!(snippet.display_title(), "Hide sidebar");
    }
}
