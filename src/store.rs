//! # Snippet Store
//!
//! The in-memory authoritative index of snippet records. The store never
//! touches the buffer or the disk: the [`crate::manager::SnippetManager`]
//! mutates it and keeps it reconciled against the persisted buffer.
//!
//! ## Change notification
//!
//! Reactive consumers (settings panels, list views) observe the store via
//! [`SnippetStore::subscribe`], which hands back a [`Subscription`] owning a
//! channel receiver. Dropping the subscription unsubscribes — acquisition is
//! scoped to the consumer's lifetime, so a torn-down consumer can never leak
//! a listener.
//!
//! Every mutating operation emits exactly one [`StoreEvent`], and only after
//! the store's visible state has fully settled: a listener that queries the
//! store upon receiving an event sees the post-mutation state.
//! [`SnippetStore::replace_all`] is atomic from the listener's point of view
//! — one `Replaced` event, never a stream of partial updates.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::{Result, SnipError};
use crate::model::{Snippet, SnippetDetails, SnippetListing, SnippetQuery};

/// What changed. Ids refer to the affected snippet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Added(String),
    Updated(String),
    Removed(String),
    /// Applied state flipped; the entry itself survived.
    Toggled(String),
    /// The whole index was swapped by reconciliation.
    Replaced,
}

type Subscribers = Arc<Mutex<Vec<(u64, Sender<StoreEvent>)>>>;

/// Handle to a live store subscription. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    receiver: Receiver<StoreEvent>,
    subscribers: Subscribers,
}

impl Subscription {
    /// Drains every event delivered so far.
    pub fn drain(&self) -> Vec<StoreEvent> {
        self.receiver.try_iter().collect()
    }

    pub fn receiver(&self) -> &Receiver<StoreEvent> {
        &self.receiver
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}

#[derive(Default)]
pub struct SnippetStore {
    // Insertion/parse order is the listing order; orderIndex is only a
    // parsing disambiguator and is never sorted on.
    snippets: Vec<Snippet>,
    subscribers: Subscribers,
    next_subscription: AtomicU64,
}

impl SnippetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = unbounded();
        let id = self.next_subscription.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push((id, sender));
        }
        Subscription {
            id,
            receiver,
            subscribers: Arc::clone(&self.subscribers),
        }
    }

    fn emit(&self, event: StoreEvent) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.retain(|(_, sender)| sender.send(event.clone()).is_ok());
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.snippets.iter().position(|snippet| snippet.id == id)
    }

    // --- Queries ---

    pub fn get(&self, id: &str) -> Option<&Snippet> {
        self.snippets.iter().find(|snippet| snippet.id == id)
    }

    /// Ordered listing. `include_cached` adds disabled snippets;
    /// `include_details` adds content and display metadata to each row.
    pub fn get_snippets(&self, query: SnippetQuery) -> Vec<SnippetListing> {
        self.snippets
            .iter()
            .filter(|snippet| query.include_cached || snippet.applied)
            .map(|snippet| SnippetListing {
                id: snippet.id.clone(),
                title: snippet.display_title(),
                applied: snippet.applied,
                content: query.include_details.then(|| snippet.content.clone()),
                details: query.include_details.then(|| snippet.details.clone()),
            })
            .collect()
    }

    /// The applied records in listing order, for serialization.
    pub fn applied(&self) -> impl Iterator<Item = &Snippet> {
        self.snippets.iter().filter(|snippet| snippet.applied)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snippet> {
        self.snippets.iter()
    }

    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    /// Smallest order index not yet taken by any known record.
    pub fn next_order(&self) -> u32 {
        self.snippets
            .iter()
            .map(|snippet| snippet.order + 1)
            .max()
            .unwrap_or(0)
    }

    // --- Mutations ---

    pub fn insert(&mut self, snippet: Snippet) -> Result<()> {
        if self.position(&snippet.id).is_some() {
            return Err(SnipError::DuplicateRecord(snippet.id));
        }
        let id = snippet.id.clone();
        self.snippets.push(snippet);
        self.emit(StoreEvent::Added(id));
        Ok(())
    }

    pub fn update_content(&mut self, id: &str, content: impl Into<String>) -> Result<()> {
        let index = self
            .position(id)
            .ok_or_else(|| SnipError::NotFound(id.to_string()))?;
        self.snippets[index].content = content.into();
        self.emit(StoreEvent::Updated(id.to_string()));
        Ok(())
    }

    pub fn set_details(&mut self, id: &str, details: SnippetDetails) -> Result<()> {
        let index = self
            .position(id)
            .ok_or_else(|| SnipError::NotFound(id.to_string()))?;
        self.snippets[index].details = details;
        self.emit(StoreEvent::Updated(id.to_string()));
        Ok(())
    }

    /// Flips the applied flag. Returns the previous value.
    pub fn set_applied(&mut self, id: &str, applied: bool) -> Result<bool> {
        let index = self
            .position(id)
            .ok_or_else(|| SnipError::NotFound(id.to_string()))?;
        let was = self.snippets[index].applied;
        if was != applied {
            self.snippets[index].applied = applied;
            self.emit(StoreEvent::Toggled(id.to_string()));
        }
        Ok(was)
    }

    pub fn remove(&mut self, id: &str) -> Result<Snippet> {
        let index = self
            .position(id)
            .ok_or_else(|| SnipError::NotFound(id.to_string()))?;
        let snippet = self.snippets.remove(index);
        self.emit(StoreEvent::Removed(id.to_string()));
        Ok(snippet)
    }

    /// Atomic swap of the whole index. One event, no partial updates.
    pub fn replace_all(&mut self, snippets: Vec<Snippet>) {
        self.snippets = snippets;
        self.emit(StoreEvent::Replaced);
    }
}
