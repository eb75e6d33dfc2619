use logbook_types::Summary;
use std::path::PathBuf;

/// Update notification pushed to consumers (e.g. a display layer).
///
/// `Added` is batched by the crawler to bound notification overhead on large
/// trees; `Updated` and `Removed` are per-file.
#[derive(Debug, Clone)]
pub enum IndexEvent {
    Added(Vec<Summary>),
    Updated(Summary),
    Removed(PathBuf),
}
