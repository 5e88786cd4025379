use crate::commands::{CmdResult, MessageLevel};
use crate::model::SnippetListing;

pub fn print_result(result: &CmdResult) {
    for message in &result.messages {
        match message.level {
            MessageLevel::Error => eprintln!("error: {}", message.content),
            MessageLevel::Warning => eprintln!("warning: {}", message.content),
            _ => println!("{}", message.content),
        }
    }
}

pub fn print_listings(rows: &[SnippetListing]) {
    if rows.is_empty() {
        println!("No snippets.");
        return;
    }
    for row in rows {
        let state = if row.applied { "enabled" } else { "disabled" };
        println!("{:<20} {:<9} {}", row.id, state, row.title);
        if let Some(content) = &row.content {
            if content.is_empty() {
                println!("    (empty)");
            }
            for line in content.lines() {
                println!("    {}", line);
            }
        }
    }
}
