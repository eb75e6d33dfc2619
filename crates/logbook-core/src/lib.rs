pub mod canonical;
pub mod error;
pub mod mounts;
pub mod partitions;
pub mod paths;
pub mod project;
pub mod signature;

pub use canonical::CanonicalKey;
pub use error::{Error, Result};
pub use mounts::{MountKind, classify_mount};
pub use partitions::{LOG_SUFFIX, list_log_files, list_partition_files, recent_partition_dirs};
pub use paths::{expand_tilde, resolve_state_dir};
pub use project::{project_key_from_cwd, project_key_from_dir};
pub use signature::signature_of;
