use std::fs;
use std::path::{Path, PathBuf};

use super::BufferStore;
use crate::error::{Result, SnipError};
use crate::model::SnippetCache;

pub struct FileBuffer {
    buffer_path: PathBuf,
    cache_path: PathBuf,
}

impl FileBuffer {
    pub fn new(buffer_path: PathBuf, cache_path: PathBuf) -> Self {
        Self {
            buffer_path,
            cache_path,
        }
    }

    fn ensure_parent(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(SnipError::Persistence)?;
            }
        }
        Ok(())
    }

    /// Write to a sibling tmp file, then rename over the target. Rename is
    /// atomic on the same filesystem, so watchers never observe a torn file.
    fn write_atomic(&self, path: &Path, contents: &str) -> Result<()> {
        self.ensure_parent(path)?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("buffer");
        let tmp = path.with_file_name(format!(".{}-{}.tmp", file_name, std::process::id()));
        fs::write(&tmp, contents).map_err(SnipError::Persistence)?;
        fs::rename(&tmp, path).map_err(|err| {
            let _ = fs::remove_file(&tmp);
            SnipError::Persistence(err)
        })?;
        Ok(())
    }
}

impl BufferStore for FileBuffer {
    fn load_buffer(&self) -> Result<Option<String>> {
        if !self.buffer_path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&self.buffer_path)?))
    }

    fn save_buffer(&self, text: &str) -> Result<()> {
        self.write_atomic(&self.buffer_path, text)
    }

    fn load_cache(&self) -> Result<SnippetCache> {
        if !self.cache_path.exists() {
            return Ok(SnippetCache::default());
        }
        let raw = fs::read_to_string(&self.cache_path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn save_cache(&self, cache: &SnippetCache) -> Result<()> {
        let raw = serde_json::to_string_pretty(cache)?;
        self.write_atomic(&self.cache_path, &raw)
    }

    fn buffer_path(&self) -> Option<&Path> {
        Some(&self.buffer_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, FileBuffer) {
        let dir = TempDir::new().unwrap();
        let store = FileBuffer::new(
            dir.path().join("quickcss.css"),
            dir.path().join("snippets.json"),
        );
        (dir, store)
    }

    #[test]
    fn missing_buffer_loads_as_none() {
        let (_dir, store) = setup();
        assert_eq!(store.load_buffer().unwrap(), None);
    }

    #[test]
    fn buffer_round_trips() {
        let (_dir, store) = setup();
        store.save_buffer(".a{}\n").unwrap();
        assert_eq!(store.load_buffer().unwrap(), Some(".a{}\n".to_string()));
    }

    #[test]
    fn atomic_write_leaves_no_tmp_files() {
        let (dir, store) = setup();
        store.save_buffer(".a{}\n").unwrap();
        store.save_cache(&SnippetCache::default()).unwrap();

        for entry in fs::read_dir(dir.path()).unwrap() {
            let name = entry.unwrap().file_name();
            let name = name.to_str().unwrap().to_string();
            assert!(!name.ends_with(".tmp"), "leftover tmp file: {}", name);
        }
    }

    #[test]
    fn missing_cache_loads_as_empty() {
        let (_dir, store) = setup();
        let cache = store.load_cache().unwrap();
        assert!(cache.details.is_empty());
        assert!(cache.disabled.is_empty());
    }

    #[test]
    fn cache_round_trips() {
        let (_dir, store) = setup();
        let mut cache = SnippetCache::default();
        cache.disabled.insert(
            "1".into(),
            crate::model::CachedSnippet {
                content: ".a{}".into(),
                order: 0,
            },
        );
        store.save_cache(&cache).unwrap();
        let loaded = store.load_cache().unwrap();
        assert_eq!(loaded.disabled.get("1").unwrap().content, ".a{}");
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = FileBuffer::new(
            dir.path().join("nested/deeper/quickcss.css"),
            dir.path().join("nested/deeper/snippets.json"),
        );
        store.save_buffer("").unwrap();
        assert!(dir.path().join("nested/deeper/quickcss.css").exists());
    }
}
