use std::path::Path;

/// Whether a root can be trusted to deliver native filesystem change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountKind {
    /// Locally-mounted path; event-driven watching works.
    Local,
    /// Network/remote-style mount; native events are unreliable, poll instead.
    Remote,
}

/// Best-effort classification of a root path's mount style.
///
/// UNC paths and the conventional network/removable mount points are treated
/// as remote. `LOGBOOK_FORCE_POLL=1` forces every root onto the polling
/// watcher, the escape hatch for mounts this heuristic cannot see.
pub fn classify_mount(root: &Path) -> MountKind {
    if std::env::var("LOGBOOK_FORCE_POLL").is_ok_and(|v| v == "1") {
        return MountKind::Remote;
    }

    let text = root.to_string_lossy();
    if text.starts_with(r"\\") || text.starts_with("//") {
        return MountKind::Remote;
    }

    let mut components = root.components().filter_map(|c| match c {
        std::path::Component::Normal(name) => name.to_str(),
        _ => None,
    });
    match components.next() {
        Some("mnt") | Some("Volumes") | Some("net") => MountKind::Remote,
        _ => MountKind::Local,
    }
}
