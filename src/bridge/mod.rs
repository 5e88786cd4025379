//! # Bridges
//!
//! The two inbound edges of the snippet system. Each bridge translates an
//! external event stream into manager calls; neither holds snippet state of
//! its own.
//!
//! - [`watch::WatchBridge`] — reacts to changes of the persisted buffer
//!   (manual edits, recompiles) and reconciles the store, suppressing
//!   signals caused by the manager's own writes.
//! - [`message::MessageSyncBridge`] — reacts to edits of linked chat
//!   messages and forwards the re-extracted css as a content update.

pub mod message;
pub mod watch;

pub use message::MessageSyncBridge;
pub use watch::{WatchBridge, WatchSignal, WatchState};
