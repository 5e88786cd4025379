//! # Persistence Layer
//!
//! The buffer is one flat text document; everything that cannot live inside
//! it (disabled snippets, display metadata) goes into a JSON sidecar cache.
//! [`BufferStore`] abstracts the raw I/O for both so the manager can run
//! against the filesystem in production and against memory in tests.
//!
//! Two artifacts:
//!
//! ```text
//! quickcss.css      # the shared stylesheet buffer (records + free text)
//! snippets.json     # sidecar: disabled snippet bodies + display metadata
//! ```
//!
//! Buffer writes MUST be atomic (write to tmp, then rename): the watch
//! bridge reacts to every on-disk change, and a torn write would be parsed
//! as corruption.

use std::path::Path;

use crate::error::Result;
use crate::model::SnippetCache;

pub mod fs;
pub mod memory;

pub use fs::FileBuffer;
pub use memory::MemoryBuffer;

/// Abstract interface for the persisted buffer and its sidecar cache.
pub trait BufferStore {
    /// Read the stylesheet buffer. `Ok(None)` if it does not exist yet.
    fn load_buffer(&self) -> Result<Option<String>>;

    /// Persist the stylesheet buffer. Must be atomic.
    fn save_buffer(&self, text: &str) -> Result<()>;

    /// Read the sidecar cache. A missing sidecar is an empty cache.
    fn load_cache(&self) -> Result<SnippetCache>;

    /// Persist the sidecar cache.
    fn save_cache(&self, cache: &SnippetCache) -> Result<()>;

    /// Real on-disk location of the buffer, for file watchers.
    /// `None` for stores with no filesystem presence.
    fn buffer_path(&self) -> Option<&Path>;
}
