//! # Buffer Codec
//!
//! Pure parse/serialize of the shared stylesheet buffer. No I/O, no state.
//!
//! ## The record format
//!
//! Each applied snippet occupies one contiguous triple inside the buffer:
//!
//! ```text
//! /** Snippet ID: 812345678901234567 */
//! .sidebar { display: none; }
//! /** 3 */
//! ```
//!
//! The header comment carries the owning message id; the footer comment
//! carries the order index assigned at insertion. Everything between the two
//! markers is the snippet's content, kept verbatim. Text outside any triple
//! is "free text" — the user's own CSS — and is passed through untouched.
//!
//! ## Scanning
//!
//! Parsing is a single pass over lines with two states: *seeking-header* and
//! *in-record*. This keeps the edge cases deterministic:
//!
//! - header with no footer (EOF, or another header first): the triple is
//!   incomplete. It is reported as a [`ParseWarning`] and its raw lines are
//!   demoted to free text, so nothing the user wrote is lost.
//! - footer with no header: warned and treated as free text.
//! - duplicate id: the first record wins; the later triple is warned and
//!   demoted to free text.
//!
//! A warning never fails the parse — every well-formed triple still loads.
//!
//! Serialization always terminates a triple's footer with a newline, so a
//! buffer whose final line is a footer gains a trailing newline on the next
//! write. That is the only normalization the codec performs; content bytes
//! are never altered.

use std::collections::HashSet;

use thiserror::Error;

const HEADER_PREFIX: &str = "/** Snippet ID: ";
const FOOTER_PREFIX: &str = "/** ";
const MARKER_SUFFIX: &str = " */";

/// A recoverable defect found while parsing the buffer. Logged and skipped;
/// never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    #[error("Record header for snippet {id} has no matching footer; treating it as plain text")]
    UnclosedHeader { id: String },

    #[error("Record footer /** {order} */ has no matching header; treating it as plain text")]
    StrayFooter { order: u32 },

    #[error("Duplicate record for snippet {id}; keeping the first occurrence")]
    DuplicateId { id: String },
}

/// One region of the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text not owned by any record, preserved byte for byte.
    Free(String),
    /// A complete header/content/footer triple.
    Record { id: String, order: u32, content: String },
}

impl Segment {
    pub fn record(id: impl Into<String>, order: u32, content: impl Into<String>) -> Self {
        Segment::Record {
            id: id.into(),
            order,
            content: content.into(),
        }
    }
}

/// Result of [`parse`]: the buffer split into segments, plus any defects
/// encountered along the way.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub segments: Vec<Segment>,
    pub warnings: Vec<ParseWarning>,
}

impl ParseOutcome {
    /// The well-formed records, in buffer order.
    pub fn records(&self) -> impl Iterator<Item = (&str, u32, &str)> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Record { id, order, content } => Some((id.as_str(), *order, content.as_str())),
            Segment::Free(_) => None,
        })
    }
}

fn header_line(id: &str) -> String {
    format!("{}{}{}", HEADER_PREFIX, id, MARKER_SUFFIX)
}

fn footer_line(order: u32) -> String {
    format!("{}{}{}", FOOTER_PREFIX, order, MARKER_SUFFIX)
}

fn parse_header(line: &str) -> Option<&str> {
    let id = line.strip_prefix(HEADER_PREFIX)?.strip_suffix(MARKER_SUFFIX)?;
    if id.is_empty() {
        return None;
    }
    Some(id)
}

fn parse_footer(line: &str) -> Option<u32> {
    let digits = line.strip_prefix(FOOTER_PREFIX)?.strip_suffix(MARKER_SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Whether `content` can be embedded without making the buffer ambiguous.
/// Content containing a marker-shaped line must be rejected before it ever
/// reaches the buffer.
pub fn is_safe_content(content: &str) -> bool {
    content.lines().all(|line| {
        let line = line.trim_end_matches('\r');
        parse_header(line).is_none() && parse_footer(line).is_none()
    })
}

// In-progress triple: the header has been seen, the footer has not.
struct OpenRecord {
    id: String,
    raw_header: String,
    raw_body: String,
}

/// Parses the buffer into an ordered sequence of segments.
pub fn parse(text: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut free_run = String::new();
    let mut open: Option<OpenRecord> = None;

    for raw in text.split_inclusive('\n') {
        let line = raw.trim_end_matches('\n').trim_end_matches('\r');

        open = if let Some(mut record) = open.take() {
            if let Some(order) = parse_footer(line) {
                if seen.contains(&record.id) {
                    outcome.warnings.push(ParseWarning::DuplicateId {
                        id: record.id.clone(),
                    });
                    free_run.push_str(&record.raw_header);
                    free_run.push_str(&record.raw_body);
                    free_run.push_str(raw);
                } else {
                    flush_free(&mut outcome.segments, &mut free_run);
                    seen.insert(record.id.clone());
                    let content = record
                        .raw_body
                        .strip_suffix('\n')
                        .unwrap_or(&record.raw_body)
                        .to_string();
                    outcome.segments.push(Segment::Record {
                        id: record.id,
                        order,
                        content,
                    });
                }
                None
            } else if let Some(id) = parse_header(line) {
                // A header inside an open record: the outer triple can never
                // close. Demote it and start over at the inner header.
                outcome.warnings.push(ParseWarning::UnclosedHeader {
                    id: record.id.clone(),
                });
                free_run.push_str(&record.raw_header);
                free_run.push_str(&record.raw_body);
                Some(OpenRecord {
                    id: id.to_string(),
                    raw_header: raw.to_string(),
                    raw_body: String::new(),
                })
            } else {
                record.raw_body.push_str(raw);
                Some(record)
            }
        } else if let Some(id) = parse_header(line) {
            Some(OpenRecord {
                id: id.to_string(),
                raw_header: raw.to_string(),
                raw_body: String::new(),
            })
        } else {
            if let Some(order) = parse_footer(line) {
                outcome.warnings.push(ParseWarning::StrayFooter { order });
            }
            free_run.push_str(raw);
            None
        };
    }

    if let Some(record) = open.take() {
        outcome.warnings.push(ParseWarning::UnclosedHeader {
            id: record.id.clone(),
        });
        free_run.push_str(&record.raw_header);
        free_run.push_str(&record.raw_body);
    }
    flush_free(&mut outcome.segments, &mut free_run);

    outcome
}

fn flush_free(segments: &mut Vec<Segment>, free_run: &mut String) {
    if free_run.is_empty() {
        return;
    }
    match segments.last_mut() {
        // Adjacent free runs merge so segment boundaries stay canonical.
        Some(Segment::Free(text)) => text.push_str(free_run),
        _ => segments.push(Segment::Free(free_run.clone())),
    }
    free_run.clear();
}

/// Produces the buffer text for an ordered sequence of segments. The inverse
/// of [`parse`] for well-formed input.
pub fn serialize(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Free(text) => out.push_str(text),
            Segment::Record { id, order, content } => {
                out.push_str(&header_line(id));
                out.push('\n');
                out.push_str(content);
                out.push('\n');
                out.push_str(&footer_line(*order));
                out.push('\n');
            }
        }
    }
    out
}
