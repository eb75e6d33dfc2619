use std::fmt;

/// Result type for logbook-parser operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the parsing layer.
///
/// Line-level JSON failures are not errors; they are counted on the parsed
/// projection and parsing continues. Only whole-file I/O failures surface.
#[derive(Debug)]
pub enum Error {
    /// IO operation failed
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
