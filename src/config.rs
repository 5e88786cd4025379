//! Explicit wiring for the snippet system. Everything the manager and the
//! bridges depend on arrives through [`Context`] at construction time —
//! there is no process-global host object to reach for, which keeps every
//! component constructible in isolation.

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::{Result, SnipError};
use crate::persist::FileBuffer;

pub const BUFFER_FILE: &str = "quickcss.css";
pub const CACHE_FILE: &str = "snippets.json";

#[derive(Debug, Clone)]
pub struct Context {
    pub buffer_path: PathBuf,
    pub cache_path: PathBuf,
}

impl Context {
    pub fn new(buffer_path: PathBuf, cache_path: PathBuf) -> Self {
        Self {
            buffer_path,
            cache_path,
        }
    }

    /// A context for an explicit buffer location; the sidecar cache sits
    /// next to it.
    pub fn for_buffer(buffer_path: PathBuf) -> Self {
        let cache_path = buffer_path
            .parent()
            .map(|parent| parent.join(CACHE_FILE))
            .unwrap_or_else(|| PathBuf::from(CACHE_FILE));
        Self {
            buffer_path,
            cache_path,
        }
    }

    /// The platform's data directory for cssnip.
    pub fn discover() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "cssnip").ok_or_else(|| {
            SnipError::Config("could not determine a data directory for this platform".to_string())
        })?;
        let root = dirs.data_dir();
        Ok(Self {
            buffer_path: root.join(BUFFER_FILE),
            cache_path: root.join(CACHE_FILE),
        })
    }

    pub fn open(&self) -> FileBuffer {
        FileBuffer::new(self.buffer_path.clone(), self.cache_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_sits_next_to_the_buffer() {
        let context = Context::for_buffer(PathBuf::from("/styles/quickcss.css"));
        assert_eq!(context.cache_path, PathBuf::from("/styles/snippets.json"));
    }
}
