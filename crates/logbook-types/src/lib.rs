pub mod error;
pub mod project;
pub mod session;
pub mod signature;
mod util;

pub use error::{Error, Result};
pub use project::ProjectKey;
pub use session::*;
pub use signature::FileSignature;
pub use util::truncate;
