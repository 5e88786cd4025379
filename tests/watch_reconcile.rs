use std::fs;
use std::thread;
use std::time::Duration;

use crossbeam_channel::unbounded;
use cssnip::bridge::{WatchBridge, WatchSignal};
use cssnip::config::Context;
use cssnip::manager::SnippetManager;
use cssnip::model::Message;
use cssnip::persist::FileBuffer;
use cssnip::store::StoreEvent;
use tempfile::TempDir;

fn setup() -> (TempDir, Context, SnippetManager<FileBuffer>) {
    let dir = TempDir::new().unwrap();
    let context = Context::for_buffer(dir.path().join("quickcss.css"));
    let mut manager = SnippetManager::new(context.open()).unwrap();
    manager.fetch_snippets().unwrap();
    (dir, context, manager)
}

fn css_message(id: &str, css: &str) -> Message {
    Message::new(id, format!("```css\n{}\n```", css))
}

#[test]
fn manual_edit_is_picked_up_and_own_writes_are_not() {
    let (_dir, context, mut manager) = setup();
    let mut bridge = WatchBridge::new(&manager);
    bridge.handle_change(&mut manager).unwrap();

    // Own write: suppressed.
    manager.add_snippet(&css_message("1", ".a{}")).unwrap();
    let subscription = manager.store().subscribe();
    bridge.handle_change(&mut manager).unwrap();
    assert!(subscription.drain().is_empty());

    // Manual edit: a second snippet appears in the file behind our back.
    let mut on_disk = fs::read_to_string(&context.buffer_path).unwrap();
    on_disk.push_str("/** Snippet ID: 2 */\n.manual{}\n/** 1 */\n");
    fs::write(&context.buffer_path, on_disk).unwrap();

    bridge.handle_change(&mut manager).unwrap();
    assert_eq!(subscription.drain(), vec![StoreEvent::Replaced]);
    assert_eq!(manager.store().get("2").unwrap().content, ".manual{}");
}

#[test]
fn run_loop_reconciles_signaled_changes() {
    let (_dir, context, mut manager) = setup();
    manager.add_snippet(&css_message("1", ".a{}")).unwrap();

    let mut bridge = WatchBridge::new(&manager).with_debounce(Duration::from_millis(10));
    let signals = bridge.signal_sender();
    let (shutdown_sender, shutdown_receiver) = unbounded::<()>();

    let buffer_path = context.buffer_path.clone();
    let worker = thread::spawn(move || {
        bridge.run(&mut manager, &shutdown_receiver);
        manager
    });

    // Overwrite the buffer externally, then signal — twice in a burst to
    // exercise coalescing.
    fs::write(
        &buffer_path,
        "/** Snippet ID: 9 */\n.external{}\n/** 0 */\n",
    )
    .unwrap();
    signals.send(WatchSignal::BufferChanged).unwrap();
    signals.send(WatchSignal::BufferChanged).unwrap();

    thread::sleep(Duration::from_millis(300));
    shutdown_sender.send(()).unwrap();
    let manager = worker.join().unwrap();

    assert!(manager.store().get("1").is_none());
    assert_eq!(manager.store().get("9").unwrap().content, ".external{}");
}

#[test]
fn file_watcher_feeds_the_signal_channel() {
    let (_dir, context, manager) = setup();
    let bridge = WatchBridge::new(&manager);
    let _watcher = bridge.spawn_watcher(&context.buffer_path).unwrap();

    fs::write(&context.buffer_path, ".changed{}\n").unwrap();

    // The watcher delivers asynchronously; poll briefly.
    let mut signaled = false;
    for _ in 0..50 {
        if !bridge.signal_sender().is_empty() {
            signaled = true;
            break;
        }
        thread::sleep(Duration::from_millis(20));
    }
    assert!(signaled, "no watch signal arrived within the poll window");
}
