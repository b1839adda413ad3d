use thiserror::Error;

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors raised while decoding or encoding resource payloads
#[derive(Error, Debug)]
pub enum CodecError {
    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Payload does not start with the expected magic bytes
    #[error("Invalid magic: expected {expected}, found {found:?}")]
    InvalidMagic {
        expected: &'static str,
        found: String,
    },

    /// Format version this codec cannot read
    #[error("Unsupported {format} version {version}")]
    UnsupportedVersion { format: &'static str, version: u32 },

    /// Payload ended before a complete structure could be read
    #[error("Truncated {0}")]
    Truncated(String),

    /// Container entry compressed with an algorithm this codec lacks
    #[error("Unsupported compression 0x{0:04X}")]
    UnsupportedCompression(u16),

    /// Text payload is not valid UTF-8
    #[error("Invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    /// Text payload has no usable document structure
    #[error("Malformed document: {0}")]
    Malformed(String),

    /// Value too large for the on-disk field
    #[error("{0} exceeds format limits")]
    TooLarge(&'static str),

    /// JSON serialization failed
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl CodecError {
    pub fn truncated(what: impl Into<String>) -> Self {
        Self::Truncated(what.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Map a short read into a `Truncated` error naming the structure.
    pub(crate) fn eof(what: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |err| {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                Self::truncated(what)
            } else {
                Self::IoError(err)
            }
        }
    }
}
