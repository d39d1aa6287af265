use std::fmt;
use std::io;

/// Result alias for writer capability operations.
pub type Result<T> = std::result::Result<T, Error>;

/// An optional response writer capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Pushing buffered data to the client.
    Flush,
    /// Taking over the raw connection.
    Hijack,
    /// Server push of an associated resource.
    Push,
    /// Closing the writer.
    Close,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Capability::Flush => "flush",
            Capability::Hijack => "hijack",
            Capability::Push => "push",
            Capability::Close => "close",
        })
    }
}

/// Errors returned by response writer capability operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying writer does not implement the requested capability.
    #[error("{0} is unavailable on the writer")]
    Unsupported(Capability),
    /// The compressed stream or the transport failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Returns `true` if this error reports a missing capability.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_message() {
        let err = Error::Unsupported(Capability::Hijack);
        assert_eq!(err.to_string(), "hijack is unavailable on the writer");
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_io_is_transparent() {
        let err = Error::from(io::Error::new(io::ErrorKind::BrokenPipe, "peer went away"));
        assert_eq!(err.to_string(), "peer went away");
        assert!(!err.is_unsupported());
    }
}
