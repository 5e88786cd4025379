//! # Watch Bridge
//!
//! Observes the persisted buffer for changes the manager did not ask for —
//! a user editing the stylesheet by hand, an external tool rewriting it —
//! and reconciles the store when the change is meaningful.
//!
//! Each change signal drives one pass of a small state machine:
//!
//! ```text
//! Idle → Compiling → Comparing → Idle            (output unchanged)
//!                              → Idle            (own write, acknowledged)
//!                              → Reconciling → Idle
//! ```
//!
//! Two independent guards keep the bridge from thrashing on the manager's
//! own writes. The manager bumps a shared generation counter before every
//! persist; a signal observed with an unacknowledged generation is
//! self-attributed and skipped. And because the manager refreshes the shared
//! compiled-output cell after its writes, recompiling a self-written buffer
//! usually compares equal anyway. The generation tag alone is not
//! sufficient — it only works because all buffer writes are serialized
//! through the manager's `&mut self` surface.
//!
//! Compiler failures and timeouts are non-fatal: reconciliation is deferred
//! and the previous store state is retained until the next signal.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, warn};
use notify::{Event, RecursiveMode, Watcher};

use crate::compiler::{compile_with_timeout, StyleCompiler};
use crate::error::Result;
use crate::manager::{CompiledOutput, SnippetManager};
use crate::persist::BufferStore;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// A change notice for the bridge. Carries no payload: the bridge always
/// re-derives state from the buffer itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchSignal {
    BufferChanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Compiling,
    Comparing,
    Reconciling,
}

pub struct WatchBridge {
    state: WatchState,
    compiler: Arc<dyn StyleCompiler>,
    compile_timeout: Duration,
    compiled: CompiledOutput,
    generation: Arc<AtomicU64>,
    acked_generation: u64,
    debounce: Duration,
    sender: Sender<WatchSignal>,
    receiver: Receiver<WatchSignal>,
}

impl WatchBridge {
    /// Builds a bridge wired to the manager's compiler, compiled-output cell
    /// and generation counter.
    pub fn new<B: BufferStore>(manager: &SnippetManager<B>) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            state: WatchState::Idle,
            compiler: manager.compiler(),
            compile_timeout: manager.compile_timeout(),
            compiled: manager.compiled_output(),
            generation: manager.generation_counter(),
            // Writes issued before this bridge existed are already settled;
            // only generations bumped from here on are self-attributed.
            acked_generation: manager.generation(),
            debounce: DEFAULT_DEBOUNCE,
            sender,
            receiver,
        }
    }

    pub fn with_compiler(mut self, compiler: Arc<dyn StyleCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Where change signals come in. Cloneable; the notify watcher and any
    /// manual triggers share it.
    pub fn signal_sender(&self) -> Sender<WatchSignal> {
        self.sender.clone()
    }

    /// Starts a filesystem watcher feeding this bridge's signal channel.
    /// The watcher stops when the returned handle is dropped.
    pub fn spawn_watcher(&self, buffer_path: &Path) -> Result<notify::RecommendedWatcher> {
        let sender = self.sender.clone();
        let file_name = buffer_path.file_name().map(|name| name.to_os_string());
        let mut watcher =
            notify::recommended_watcher(move |res: std::result::Result<Event, notify::Error>| {
                let Ok(event) = res else { return };
                if !event.kind.is_modify() && !event.kind.is_create() {
                    return;
                }
                // The buffer's directory also holds the sidecar cache;
                // only the buffer itself is interesting.
                let ours = file_name.as_ref().is_none_or(|name| {
                    event
                        .paths
                        .iter()
                        .any(|path| path.file_name() == Some(name.as_os_str()))
                });
                if ours {
                    let _ = sender.send(WatchSignal::BufferChanged);
                }
            })?;
        let watch_root = buffer_path.parent().unwrap_or_else(|| Path::new("."));
        watcher.watch(watch_root, RecursiveMode::NonRecursive)?;
        Ok(watcher)
    }

    /// Blocks on the signal channel, coalescing bursts, until `shutdown`
    /// fires or every sender is gone. Errors inside a pass are logged and do
    /// not stop the loop.
    pub fn run<B: BufferStore>(
        &mut self,
        manager: &mut SnippetManager<B>,
        shutdown: &Receiver<()>,
    ) {
        let receiver = self.receiver.clone();
        loop {
            crossbeam_channel::select! {
                recv(receiver) -> signal => {
                    if signal.is_err() {
                        break;
                    }
                    // Coalesce: wait for the burst to go quiet, then act once.
                    while receiver.recv_timeout(self.debounce).is_ok() {}
                    if let Err(err) = self.handle_change(manager) {
                        warn!("reconciliation pass failed: {err}");
                    }
                }
                recv(shutdown) -> _ => break,
            }
        }
    }

    /// One pass of the state machine, for a single (possibly coalesced)
    /// change signal.
    pub fn handle_change<B: BufferStore>(
        &mut self,
        manager: &mut SnippetManager<B>,
    ) -> Result<()> {
        // Attribute first: every generation bumped since the last pass
        // belongs to writes the manager issued itself.
        let generation = self.generation.load(Ordering::SeqCst);
        let self_attributed = generation > self.acked_generation;
        self.acked_generation = generation;

        self.state = WatchState::Compiling;
        let source = match manager.buffer_text() {
            Ok(source) => source,
            Err(err) => {
                self.state = WatchState::Idle;
                return Err(err);
            }
        };
        let output = match compile_with_timeout(&self.compiler, &source, self.compile_timeout) {
            Ok(output) => output,
            Err(err) => {
                warn!("recompile failed; reconciliation deferred: {err}");
                self.state = WatchState::Idle;
                return Ok(());
            }
        };

        self.state = WatchState::Comparing;
        let changed = match self.compiled.lock() {
            Ok(mut compiled) => {
                if compiled.as_deref() == Some(output.as_str()) {
                    false
                } else {
                    *compiled = Some(output);
                    true
                }
            }
            Err(_) => true,
        };

        if !changed {
            debug!("compiled output unchanged; nothing to reconcile");
            self.state = WatchState::Idle;
            return Ok(());
        }
        if self_attributed {
            debug!("change attributed to own write (generation {generation}); skipping reconciliation");
            self.state = WatchState::Idle;
            return Ok(());
        }

        self.state = WatchState::Reconciling;
        let result = manager.fetch_snippets();
        self.state = WatchState::Idle;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::doubles::FailingCompiler;
    use crate::model::Message;
    use crate::persist::MemoryBuffer;
    use crate::store::StoreEvent;

    fn manager_with(text: &str) -> SnippetManager<MemoryBuffer> {
        let mut manager = SnippetManager::new(MemoryBuffer::with_buffer(text)).unwrap();
        manager.fetch_snippets().unwrap();
        manager
    }

    fn css_message(id: &str, css: &str) -> Message {
        Message::new(id, format!("```css\n{}\n```", css))
    }

    #[test]
    fn external_change_triggers_reconciliation() {
        let mut manager = manager_with("");
        let mut bridge = WatchBridge::new(&manager);
        bridge.handle_change(&mut manager).unwrap();

        manager
            .buffer()
            .set_buffer_externally("/** Snippet ID: 5 */\n.ext{}\n/** 0 */\n");
        let subscription = manager.store().subscribe();
        bridge.handle_change(&mut manager).unwrap();

        assert_eq!(subscription.drain(), vec![StoreEvent::Replaced]);
        assert_eq!(manager.store().get("5").unwrap().content, ".ext{}");
        assert_eq!(bridge.state(), WatchState::Idle);
    }

    #[test]
    fn own_write_is_suppressed() {
        let mut manager = manager_with("");
        let mut bridge = WatchBridge::new(&manager);

        manager.add_snippet(&css_message("1", ".a{}")).unwrap();
        let subscription = manager.store().subscribe();
        bridge.handle_change(&mut manager).unwrap();

        // No reconciliation pass reached the store.
        assert!(subscription.drain().is_empty());
        assert!(manager.store().get("1").is_some());
    }

    #[test]
    fn external_change_after_own_write_still_reconciles() {
        let mut manager = manager_with("");
        let mut bridge = WatchBridge::new(&manager);

        manager.add_snippet(&css_message("1", ".a{}")).unwrap();
        bridge.handle_change(&mut manager).unwrap();

        manager.buffer().set_buffer_externally(".hand-edited{}\n");
        let subscription = manager.store().subscribe();
        bridge.handle_change(&mut manager).unwrap();

        assert_eq!(subscription.drain(), vec![StoreEvent::Replaced]);
        assert!(manager.store().get("1").is_none());
    }

    #[test]
    fn unchanged_output_is_ignored() {
        let mut manager = manager_with(".user{}\n");
        let mut bridge = WatchBridge::new(&manager);
        bridge.handle_change(&mut manager).unwrap();

        let subscription = manager.store().subscribe();
        bridge.handle_change(&mut manager).unwrap();
        assert!(subscription.drain().is_empty());
    }

    #[test]
    fn compile_failure_defers_reconciliation() {
        let mut manager = manager_with("/** Snippet ID: 1 */\n.a{}\n/** 0 */\n");
        let mut broken = WatchBridge::new(&manager).with_compiler(Arc::new(FailingCompiler));

        manager.buffer().set_buffer_externally(".changed{}\n");
        let subscription = manager.store().subscribe();
        broken.handle_change(&mut manager).unwrap();

        // Previous store state retained.
        assert!(subscription.drain().is_empty());
        assert!(manager.store().get("1").is_some());
        assert_eq!(broken.state(), WatchState::Idle);

        // The next healthy pass catches up.
        let mut healthy = WatchBridge::new(&manager);
        healthy.handle_change(&mut manager).unwrap();
        assert_eq!(subscription.drain(), vec![StoreEvent::Replaced]);
        assert!(manager.store().get("1").is_none());
    }

    #[test]
    fn signals_flow_through_the_channel() {
        let manager = manager_with("");
        let bridge = WatchBridge::new(&manager);
        let sender = bridge.signal_sender();
        sender.send(WatchSignal::BufferChanged).unwrap();
        assert_eq!(bridge.receiver.try_recv().unwrap(), WatchSignal::BufferChanged);
    }
}
