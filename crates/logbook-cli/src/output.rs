use chrono::DateTime;
use is_terminal::IsTerminal;
use logbook_types::{ContentKind, Details, Role, Summary};
use owo_colors::OwoColorize;
use std::path::Path;

fn use_color() -> bool {
    std::io::stdout().is_terminal()
}

fn format_timestamp(timestamp_ms: i64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn print_summaries(summaries: &[Summary]) {
    if summaries.is_empty() {
        eprintln!("no sessions indexed");
        return;
    }

    for summary in summaries {
        let timestamp = format_timestamp(summary.timestamp_ms);
        if use_color() {
            println!(
                "{}  {}  {}",
                timestamp.dimmed(),
                summary.title,
                summary.file_path.display().dimmed()
            );
        } else {
            println!(
                "{}  {}  {}",
                timestamp,
                summary.title,
                summary.file_path.display()
            );
        }
    }
}

pub fn print_details(details: &Details) {
    let timestamp = format_timestamp(details.timestamp_ms);
    println!("{} ({})", details.title, timestamp);
    if let Some(working_dir) = &details.working_dir {
        println!("cwd: {}", working_dir);
    }
    if details.skipped_line_count > 0 {
        eprintln!("({} unparsable lines skipped)", details.skipped_line_count);
    }
    println!();

    for message in &details.messages {
        let label = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
            Role::Meta => "meta",
        };

        for content in &message.content {
            let kind = match content.kind {
                ContentKind::Text => None,
                ContentKind::Instructions => Some("instructions"),
                ContentKind::Environment => Some("environment"),
                ContentKind::Reasoning => Some("reasoning"),
                ContentKind::ToolCall => Some("call"),
                ContentKind::ToolOutput => Some("output"),
                ContentKind::State => Some("state"),
                ContentKind::Meta => Some("meta"),
                ContentKind::Unknown => Some("unknown"),
            };
            let heading = match kind {
                Some(kind) => format!("{} [{}]", label, kind),
                None => label.to_string(),
            };

            if use_color() {
                println!("{}", heading.bold());
            } else {
                println!("{}", heading);
            }
            println!("{}", content.text);
            println!();
        }
    }
}

pub fn print_event(action: &str, summary: &Summary) {
    println!(
        "{} {} {}",
        action,
        format_timestamp(summary.timestamp_ms),
        summary.file_path.display()
    );
}

pub fn print_removed(path: &Path) {
    println!("removed {}", path.display());
}
