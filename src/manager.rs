//! # Record Manager
//!
//! Orchestrates every mutation of the snippet system: it is the only
//! component that reads or writes the persisted buffer. All operations take
//! `&mut self`, so two manager calls can never interleave their
//! read-modify-write of the buffer — the single-writer discipline is
//! enforced by the borrow checker rather than a lock.
//!
//! ## The write path
//!
//! Every write follows the same sequence:
//!
//! 1. re-read and parse the persisted buffer (free text must survive),
//! 2. mutate the affected record triple at the segment level,
//! 3. serialize,
//! 4. bump the shared generation counter (the watch bridge's
//!    self-attribution tag),
//! 5. persist the buffer atomically,
//! 6. settle the in-memory store (this is when change events fire),
//! 7. recompile, refreshing the shared compiled-output cell.
//!
//! The store is settled only after the buffer write succeeded: a failed
//! persist surfaces as [`SnipError::Persistence`] and leaves the store at
//! its last consistent state.
//!
//! Disabled snippets have no triple in the buffer; their bodies live in the
//! sidecar cache together with display metadata for all snippets.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use log::{debug, warn};

use crate::codec::{self, Segment};
use crate::compiler::{compile_with_timeout, PassthroughCompiler, StyleCompiler};
use crate::error::{Result, SnipError};
use crate::identity::IdentityResolver;
use crate::model::{
    snippet_content_from_message, Author, CachedSnippet, Message, Snippet, SnippetCache,
};
use crate::persist::BufferStore;
use crate::store::SnippetStore;

pub const DEFAULT_COMPILE_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared cell holding the last compiled stylesheet output. The manager
/// refreshes it after every write; the watch bridge compares against it to
/// decide whether an observed change is meaningful.
pub type CompiledOutput = Arc<Mutex<Option<String>>>;

pub struct SnippetManager<B: BufferStore> {
    buffer: B,
    store: SnippetStore,
    cache: SnippetCache,
    compiler: Arc<dyn StyleCompiler>,
    compile_timeout: Duration,
    generation: Arc<AtomicU64>,
    compiled: CompiledOutput,
}

impl<B: BufferStore> SnippetManager<B> {
    pub fn new(buffer: B) -> Result<Self> {
        let cache = buffer.load_cache()?;
        Ok(Self {
            buffer,
            store: SnippetStore::new(),
            cache,
            compiler: Arc::new(PassthroughCompiler),
            compile_timeout: DEFAULT_COMPILE_TIMEOUT,
            generation: Arc::new(AtomicU64::new(0)),
            compiled: Arc::new(Mutex::new(None)),
        })
    }

    pub fn with_compiler(mut self, compiler: Arc<dyn StyleCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn with_compile_timeout(mut self, timeout: Duration) -> Self {
        self.compile_timeout = timeout;
        self
    }

    /// Query access to the authoritative index. Mutations go through the
    /// manager only.
    pub fn store(&self) -> &SnippetStore {
        &self.store
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    pub fn buffer_text(&self) -> Result<String> {
        Ok(self.buffer.load_buffer()?.unwrap_or_default())
    }

    /// Monotonic counter bumped before every self-originated buffer write.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn generation_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.generation)
    }

    pub fn compiled_output(&self) -> CompiledOutput {
        Arc::clone(&self.compiled)
    }

    pub fn compiler(&self) -> Arc<dyn StyleCompiler> {
        Arc::clone(&self.compiler)
    }

    pub fn compile_timeout(&self) -> Duration {
        self.compile_timeout
    }

    // --- CRUD surface ---

    /// Creates a record from a message: extracts the fenced css blocks,
    /// embeds a new triple at the end of the buffer, and indexes it.
    pub fn add_snippet(&mut self, message: &Message) -> Result<()> {
        if self.store.get(&message.id).is_some() {
            return Err(SnipError::DuplicateRecord(message.id.clone()));
        }

        let content = snippet_content_from_message(&message.content);
        if !codec::is_safe_content(&content) {
            return Err(SnipError::UnsafeContent);
        }

        let mut segments = self.load_segments()?;
        if segments.iter().any(|segment| matches!(
            segment,
            Segment::Record { id, .. } if *id == message.id
        )) {
            // The buffer already carries a triple the store has not seen yet.
            return Err(SnipError::DuplicateRecord(message.id.clone()));
        }

        let order = self.next_order(&segments);
        ensure_separated(&mut segments);
        segments.push(Segment::record(message.id.clone(), order, content.clone()));
        let text = codec::serialize(&segments);
        self.persist_buffer(&text)?;

        let mut snippet = Snippet::new(message.id.clone(), order, content);
        snippet.details.author_id = message.author_id.clone();
        snippet.details.added_at = Some(Utc::now());
        self.cache
            .details
            .insert(snippet.id.clone(), snippet.details.clone());
        let result = self.store.insert(snippet);
        debug_assert!(result.is_ok(), "store rejected an id the buffer accepted");

        self.buffer.save_cache(&self.cache)?;
        self.recompile(&text);
        Ok(())
    }

    /// Erases the record's triple (if applied) and forgets the entry. Free
    /// text around the triple is untouched.
    pub fn remove_snippet(&mut self, id: &str) -> Result<()> {
        let applied = self
            .store
            .get(id)
            .ok_or_else(|| SnipError::NotFound(id.to_string()))?
            .applied;

        if applied {
            let mut segments = self.load_segments()?;
            segments.retain(|segment| !matches!(
                segment,
                Segment::Record { id: record_id, .. } if record_id == id
            ));
            let text = codec::serialize(&segments);
            self.persist_buffer(&text)?;
            self.recompile(&text);
        }

        self.store.remove(id)?;
        self.cache.details.remove(id);
        self.cache.disabled.remove(id);
        self.buffer.save_cache(&self.cache)?;
        Ok(())
    }

    /// Replaces only the record's content segment. Every other byte of the
    /// buffer stays as it was.
    pub fn update_snippet(&mut self, id: &str, content: &str) -> Result<()> {
        let applied = self
            .store
            .get(id)
            .ok_or_else(|| SnipError::NotFound(id.to_string()))?
            .applied;
        if !codec::is_safe_content(content) {
            return Err(SnipError::UnsafeContent);
        }

        if applied {
            let mut segments = self.load_segments()?;
            let mut found = false;
            for segment in segments.iter_mut() {
                if let Segment::Record {
                    id: record_id,
                    content: record_content,
                    ..
                } = segment
                {
                    if record_id.as_str() == id {
                        *record_content = content.to_string();
                        found = true;
                    }
                }
            }
            if !found {
                warn!("snippet {id} is marked applied but has no triple in the buffer");
            }
            let text = codec::serialize(&segments);
            self.persist_buffer(&text)?;
            self.store.update_content(id, content)?;
            self.recompile(&text);
        } else {
            self.store.update_content(id, content)?;
            if let Some(cached) = self.cache.disabled.get_mut(id) {
                cached.content = content.to_string();
            }
            self.buffer.save_cache(&self.cache)?;
        }
        Ok(())
    }

    /// Moves a disabled record's triple back into the buffer.
    pub fn enable_snippet(&mut self, id: &str) -> Result<()> {
        let snippet = self
            .store
            .get(id)
            .ok_or_else(|| SnipError::NotFound(id.to_string()))?;
        if snippet.applied {
            return Err(SnipError::AlreadyEnabled(id.to_string()));
        }
        let (order, content) = (snippet.order, snippet.content.clone());

        let mut segments = self.load_segments()?;
        ensure_separated(&mut segments);
        segments.push(Segment::record(id.to_string(), order, content));
        let text = codec::serialize(&segments);
        self.persist_buffer(&text)?;

        self.store.set_applied(id, true)?;
        self.cache.disabled.remove(id);
        self.buffer.save_cache(&self.cache)?;
        self.recompile(&text);
        Ok(())
    }

    /// Pulls the record's triple out of the buffer but keeps the entry (and
    /// its body, via the sidecar cache).
    pub fn disable_snippet(&mut self, id: &str) -> Result<()> {
        let snippet = self
            .store
            .get(id)
            .ok_or_else(|| SnipError::NotFound(id.to_string()))?;
        if !snippet.applied {
            return Err(SnipError::AlreadyDisabled(id.to_string()));
        }
        let (order, mut content) = (snippet.order, snippet.content.clone());

        let mut segments = self.load_segments()?;
        // The buffer's copy of the body is authoritative if the two drifted.
        for segment in segments.iter() {
            if let Segment::Record {
                id: record_id,
                content: record_content,
                ..
            } = segment
            {
                if record_id == id {
                    content = record_content.clone();
                }
            }
        }
        segments.retain(|segment| !matches!(
            segment,
            Segment::Record { id: record_id, .. } if record_id == id
        ));
        let text = codec::serialize(&segments);
        self.persist_buffer(&text)?;

        self.store.update_content(id, content.clone())?;
        self.store.set_applied(id, false)?;
        self.cache
            .disabled
            .insert(id.to_string(), CachedSnippet { content, order });
        self.buffer.save_cache(&self.cache)?;
        self.recompile(&text);
        Ok(())
    }

    pub fn toggle_snippet(&mut self, id: &str) -> Result<bool> {
        let applied = self
            .store
            .get(id)
            .ok_or_else(|| SnipError::NotFound(id.to_string()))?
            .applied;
        if applied {
            self.disable_snippet(id)?;
        } else {
            self.enable_snippet(id)?;
        }
        Ok(!applied)
    }

    /// Reconciliation entry point: re-derives the store from the persisted
    /// buffer plus the sidecar cache, as one atomic swap.
    pub fn fetch_snippets(&mut self) -> Result<()> {
        let text = self.buffer_text()?;
        let outcome = codec::parse(&text);
        for warning in &outcome.warnings {
            warn!("{warning}");
        }

        let mut snippets: Vec<Snippet> = outcome
            .records()
            .map(|(id, order, content)| {
                let mut snippet = Snippet::new(id, order, content);
                snippet.details = self.cache.details.get(id).cloned().unwrap_or_default();
                snippet
            })
            .collect();

        // Disabled records live only in the sidecar. Deterministic order:
        // by order index, then id.
        let mut disabled: Vec<(&String, &CachedSnippet)> = self
            .cache
            .disabled
            .iter()
            .filter(|(id, _)| !snippets.iter().any(|snippet| &snippet.id == *id))
            .collect();
        disabled.sort_by(|a, b| a.1.order.cmp(&b.1.order).then_with(|| a.0.cmp(b.0)));
        for (id, cached) in disabled {
            let mut snippet = Snippet::new(id.clone(), cached.order, cached.content.clone());
            snippet.applied = false;
            snippet.details = self.cache.details.get(id).cloned().unwrap_or_default();
            snippets.push(snippet);
        }

        debug!("reconciled {} snippet(s) from the buffer", snippets.len());
        self.store.replace_all(snippets);
        Ok(())
    }

    // --- Display metadata ---

    pub fn set_details(
        &mut self,
        id: &str,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<()> {
        let mut details = self
            .store
            .get(id)
            .ok_or_else(|| SnipError::NotFound(id.to_string()))?
            .details
            .clone();
        details.title = title;
        details.description = description;

        self.store.set_details(id, details.clone())?;
        self.cache.details.insert(id.to_string(), details);
        self.buffer.save_cache(&self.cache)
    }

    /// Best-effort author resolution through the identity seam. The result
    /// is cached; an unknown author leaves the snippet untouched.
    pub fn resolve_author(
        &mut self,
        id: &str,
        resolver: &dyn IdentityResolver,
    ) -> Result<Option<Author>> {
        let details = self
            .store
            .get(id)
            .ok_or_else(|| SnipError::NotFound(id.to_string()))?
            .details
            .clone();

        if details.author.is_some() {
            return Ok(details.author);
        }
        let Some(author_id) = details.author_id.clone() else {
            return Ok(None);
        };

        let resolved = resolver.resolve(&author_id)?;
        if let Some(author) = resolved.clone() {
            let mut details = details;
            details.author = Some(author);
            self.store.set_details(id, details.clone())?;
            self.cache.details.insert(id.to_string(), details);
            self.buffer.save_cache(&self.cache)?;
        }
        Ok(resolved)
    }

    // --- Internals ---

    fn load_segments(&self) -> Result<Vec<Segment>> {
        let text = self.buffer_text()?;
        Ok(codec::parse(&text).segments)
    }

    fn next_order(&self, segments: &[Segment]) -> u32 {
        let in_buffer = segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Record { order, .. } => Some(order + 1),
                Segment::Free(_) => None,
            })
            .max()
            .unwrap_or(0);
        in_buffer.max(self.store.next_order())
    }

    fn persist_buffer(&mut self, text: &str) -> Result<()> {
        // Tag the write before it lands so the watch bridge can attribute
        // the resulting change signal to us.
        self.generation.fetch_add(1, Ordering::SeqCst);
        match self.buffer.save_buffer(text) {
            Ok(()) => Ok(()),
            Err(err) => {
                // The tagged write never landed; untag it or the next
                // external change would be mis-attributed.
                self.generation.fetch_sub(1, Ordering::SeqCst);
                Err(err)
            }
        }
    }

    fn recompile(&self, text: &str) {
        match compile_with_timeout(&self.compiler, text, self.compile_timeout) {
            Ok(output) => {
                if let Ok(mut compiled) = self.compiled.lock() {
                    *compiled = Some(output);
                }
            }
            Err(err) => warn!("stylesheet compile failed after write: {err}"),
        }
    }
}

// A record appended directly after free text that lacks a final newline
// would glue the header onto the user's last line.
fn ensure_separated(segments: &mut [Segment]) {
    if let Some(Segment::Free(text)) = segments.last_mut() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
    }
}
