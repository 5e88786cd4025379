//! # CLI Behavior
//!
//! One possible client for the snippet library, and the only layer that
//! knows about stdout/stderr and exit codes. Everything below
//! [`crate::commands`] takes plain Rust values and returns plain Rust
//! types.
//!
//! The four contract verbs (`add`, `delete`, `enable`, `disable`) route
//! through [`crate::commands::dispatch`] so the CLI renders the same
//! structured results any other collaborator would get. `add` reads the
//! message text from a file or stdin — in a host with a real chat backend
//! the [`crate::commands::MessageSource`] implementation would look the
//! message up instead.

mod render;
mod setup;

use std::fs;
use std::io::Read;
use std::path::PathBuf;

use clap::Parser;
use crossbeam_channel::unbounded;

use crate::bridge::WatchBridge;
use crate::commands::{self, CmdMessage, CmdResult, MessageSource};
use crate::config::Context;
use crate::error::Result;
use crate::manager::SnippetManager;
use crate::model::{Message, SnippetQuery};
use crate::persist::FileBuffer;

/// Resolves `add`'s message text from a file or stdin.
struct CliMessageSource {
    file: Option<PathBuf>,
    author: Option<String>,
}

impl MessageSource for CliMessageSource {
    fn message(&self, id: &str) -> Result<Option<Message>> {
        let text = match &self.file {
            Some(path) => fs::read_to_string(path)?,
            None => {
                let mut text = String::new();
                std::io::stdin().read_to_string(&mut text)?;
                text
            }
        };
        let mut message = Message::new(id, text);
        if let Some(author) = &self.author {
            message = message.with_author(author.clone());
        }
        Ok(Some(message))
    }
}

/// Parses arguments and runs one command. Returns whether it succeeded;
/// hard failures (bad paths, broken persistence) bubble up as errors.
pub fn run() -> Result<bool> {
    let cli = setup::Cli::parse();
    let context = match &cli.buffer {
        Some(path) => Context::for_buffer(path.clone()),
        None => Context::discover()?,
    };

    let mut manager = SnippetManager::new(context.open())?;
    manager.fetch_snippets()?;

    match cli.command {
        setup::Commands::Add { id, file, author } => {
            let source = CliMessageSource { file, author };
            let result = commands::dispatch(&mut manager, &source, "add", &[id]);
            render::print_result(&result);
            Ok(result.succeeded())
        }
        setup::Commands::Delete { id } => Ok(run_verb(&mut manager, "delete", id)),
        setup::Commands::Enable { id } => Ok(run_verb(&mut manager, "enable", id)),
        setup::Commands::Disable { id } => Ok(run_verb(&mut manager, "disable", id)),
        setup::Commands::Toggle { id } => {
            let result = match manager.toggle_snippet(&id) {
                Ok(true) => CmdResult::message(CmdMessage::success(format!(
                    "Enabled snippet {}",
                    id
                ))),
                Ok(false) => CmdResult::message(CmdMessage::success(format!(
                    "Disabled snippet {}",
                    id
                ))),
                Err(err) => CmdResult::message(CmdMessage::error(err.to_string())),
            };
            render::print_result(&result);
            Ok(result.succeeded())
        }
        setup::Commands::List { cached, details } => {
            let query = SnippetQuery {
                include_cached: cached,
                include_details: details,
            };
            render::print_listings(&manager.store().get_snippets(query));
            Ok(true)
        }
        setup::Commands::Show { id } => match manager.store().get(&id) {
            Some(snippet) => {
                println!("{}", snippet.content);
                Ok(true)
            }
            None => {
                eprintln!("error: Snippet not found: {}", id);
                Ok(false)
            }
        },
        setup::Commands::Fetch => {
            println!("Indexed {} snippet(s)", manager.store().len());
            Ok(true)
        }
        setup::Commands::Watch => watch(&mut manager, &context),
    }
}

fn run_verb(manager: &mut SnippetManager<FileBuffer>, verb: &str, id: String) -> bool {
    let source = CliMessageSource {
        file: None,
        author: None,
    };
    let result = commands::dispatch(manager, &source, verb, &[id]);
    render::print_result(&result);
    result.succeeded()
}

fn watch(manager: &mut SnippetManager<FileBuffer>, context: &Context) -> Result<bool> {
    let mut bridge = WatchBridge::new(manager);
    let _watcher = bridge.spawn_watcher(&context.buffer_path)?;
    eprintln!("watching {}", context.buffer_path.display());

    // No interactive shutdown; the process runs until killed. The sender
    // half has to stay alive or the loop would read a disconnect.
    let (shutdown_sender, shutdown_receiver) = unbounded::<()>();
    bridge.run(manager, &shutdown_receiver);
    drop(shutdown_sender);
    Ok(true)
}
