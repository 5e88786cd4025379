//! # cssnip Architecture
//!
//! cssnip maintains multiple independent, named CSS snippets inside one
//! shared stylesheet buffer. Each snippet is linked to an external chat
//! message that originally carried the CSS: extract the snippet once, then
//! edit it by editing the message, toggle it on and off, or remove it —
//! without ever hand-editing the shared buffer.
//!
//! This is a **UI-agnostic library** with a thin CLI client on top. The
//! library never writes to stdout, never exits the process, and never
//! assumes a terminal.
//!
//! ## Layers
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  CLI (src/cli/, wired by main.rs)                            │
//! │  - clap parsing, rendering, exit codes                       │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Command layer (commands/)                                   │
//! │  - verb contract {add, delete, enable, disable}              │
//! │  - folds every failure into a structured CmdResult           │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Record manager (manager.rs)   ◄── bridges (bridge/)         │
//! │  - the only reader/writer of the persisted buffer            │
//! │  - CRUD + reconciliation, single-writer by &mut self         │
//! └──────────────────────────────────────────────────────────────┘
//!                │                              │
//!                ▼                              ▼
//! ┌──────────────────────────┐   ┌──────────────────────────────┐
//! │  Snippet store (store.rs)│   │  Codec + persistence         │
//! │  - in-memory index       │   │  (codec.rs, persist/)        │
//! │  - change subscriptions  │   │  - record triples ⇄ text     │
//! └──────────────────────────┘   └──────────────────────────────┘
//! ```
//!
//! ## The two sources of truth
//!
//! The persisted buffer is authoritative for applied snippets; the store is
//! a reconciled in-memory view of it (plus disabled snippets from the
//! sidecar cache). Two asynchronous inputs can invalidate the view:
//!
//! - the buffer file changes on disk — the [`bridge::WatchBridge`]
//!   recompiles, compares output, and re-fetches when the change was not
//!   one of the manager's own writes;
//! - a linked chat message is edited — the [`bridge::MessageSyncBridge`]
//!   re-extracts the css and routes it through the normal update path.
//!
//! Both funnel into [`manager::SnippetManager`], whose `&mut self` surface
//! serializes every read-modify-write of the buffer.
//!
//! ## Testing
//!
//! The heavy lifting is unit-tested next to the code against
//! [`persist::MemoryBuffer`]; `tests/` exercises the full lifecycle against
//! real files, and the CLI has smoke tests over the compiled binary.

pub mod bridge;
pub mod codec;
pub mod commands;
pub mod compiler;
pub mod config;
pub mod error;
pub mod identity;
pub mod manager;
pub mod model;
pub mod persist;
pub mod store;

pub mod cli;

pub use error::{Result, SnipError};
pub use manager::SnippetManager;
pub use model::{Message, MessageUpdate, Snippet, SnippetQuery};
pub use store::{SnippetStore, StoreEvent, Subscription};
