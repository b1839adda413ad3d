use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid hex value: {0}")]
    InvalidHex(String),

    #[error("Value {value:#X} does not fit in {bits} bits")]
    OutOfRange { value: u64, bits: u32 },

    #[error("Invalid resource key: {0}")]
    InvalidKey(String),
}

impl ModelError {
    pub fn invalid_hex(raw: impl Into<String>) -> Self {
        Self::InvalidHex(raw.into())
    }

    pub fn invalid_key(raw: impl Into<String>) -> Self {
        Self::InvalidKey(raw.into())
    }
}
