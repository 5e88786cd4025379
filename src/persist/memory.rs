use std::cell::RefCell;
use std::path::Path;

use super::BufferStore;
use crate::error::{Result, SnipError};
use crate::model::SnippetCache;

/// In-memory buffer store for testing.
///
/// Uses `RefCell` for interior mutability since the core runs on one thread;
/// the trait can keep `&self` for all methods without locking.
#[derive(Default)]
pub struct MemoryBuffer {
    buffer: RefCell<Option<String>>,
    cache: RefCell<SnippetCache>,
    simulate_write_error: RefCell<bool>,
}

impl MemoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer(text: impl Into<String>) -> Self {
        let store = Self::default();
        *store.buffer.borrow_mut() = Some(text.into());
        store
    }

    /// Enable write-error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        *self.simulate_write_error.borrow_mut() = simulate;
    }

    /// Overwrite the buffer behind the manager's back, as an external editor
    /// would.
    pub fn set_buffer_externally(&self, text: impl Into<String>) {
        *self.buffer.borrow_mut() = Some(text.into());
    }

    pub fn buffer_text(&self) -> Option<String> {
        self.buffer.borrow().clone()
    }

    fn check_write_error(&self) -> Result<()> {
        if *self.simulate_write_error.borrow() {
            return Err(SnipError::Persistence(std::io::Error::other(
                "simulated write failure",
            )));
        }
        Ok(())
    }
}

impl BufferStore for MemoryBuffer {
    fn load_buffer(&self) -> Result<Option<String>> {
        Ok(self.buffer.borrow().clone())
    }

    fn save_buffer(&self, text: &str) -> Result<()> {
        self.check_write_error()?;
        *self.buffer.borrow_mut() = Some(text.to_string());
        Ok(())
    }

    fn load_cache(&self) -> Result<SnippetCache> {
        Ok(self.cache.borrow().clone())
    }

    fn save_cache(&self, cache: &SnippetCache) -> Result<()> {
        self.check_write_error()?;
        *self.cache.borrow_mut() = cache.clone();
        Ok(())
    }

    fn buffer_path(&self) -> Option<&Path> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let store = MemoryBuffer::new();
        assert_eq!(store.load_buffer().unwrap(), None);
    }

    #[test]
    fn write_error_simulation() {
        let store = MemoryBuffer::new();
        store.save_buffer(".a{}").unwrap();
        store.set_simulate_write_error(true);
        assert!(store.save_buffer(".b{}").is_err());
        // Last good write is still there.
        assert_eq!(store.load_buffer().unwrap(), Some(".a{}".to_string()));
    }
}
