pub mod config;
pub mod events;
pub mod service;

pub(crate) mod crawler;
pub(crate) mod keyed;
pub(crate) mod refresh;
pub(crate) mod rescan;
pub(crate) mod retry;
pub(crate) mod watcher;

pub use config::Config;
pub use crawler::CrawlStats;
pub use events::IndexEvent;
pub use service::{ServiceConfig, SessionIndexService};
