use anyhow::Result;
use logbook_runtime::{IndexEvent, SessionIndexService};
use std::path::{Path, PathBuf};

use crate::output;

pub async fn handle_list(service: &SessionIndexService, limit: usize, json: bool) -> Result<()> {
    service.crawl_once().await;

    let mut summaries = service.list_summaries();
    summaries.truncate(limit);

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        output::print_summaries(&summaries);
    }
    Ok(())
}

pub async fn handle_show(service: &SessionIndexService, path: &Path, json: bool) -> Result<()> {
    let Some(details) = service.get_details(path).await? else {
        anyhow::bail!("no session log at {}", path.display());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&details)?);
    } else {
        output::print_details(&details);
    }
    Ok(())
}

pub async fn handle_watch(service: &SessionIndexService) -> Result<()> {
    let mut events = service.subscribe();
    service.start()?;

    let (stop_tx, mut stop_rx) = tokio::sync::mpsc::channel::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_tx.blocking_send(());
    })?;

    eprintln!("watching for session updates, press ctrl-c to stop");
    loop {
        tokio::select! {
            _ = stop_rx.recv() => break,
            event = events.recv() => match event {
                Ok(IndexEvent::Added(batch)) => {
                    for summary in &batch {
                        output::print_event("added", summary);
                    }
                }
                Ok(IndexEvent::Updated(summary)) => output::print_event("updated", &summary),
                Ok(IndexEvent::Removed(path)) => output::print_removed(&path),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    eprintln!("(skipped {} updates)", missed);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    service.stop();
    Ok(())
}

pub fn handle_roots(roots: &[PathBuf]) {
    if roots.is_empty() {
        eprintln!("no log roots configured or detected");
        return;
    }
    for root in roots {
        println!("{}", root.display());
    }
}
