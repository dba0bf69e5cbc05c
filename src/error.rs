/// Error types for the secure clustering cryptosystems
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    /// A scalar's magnitude does not fall in any partition interval
    #[error("Domain error: {value} is outside every message-space interval")]
    Domain { value: f64 },
    /// Key material could not be produced from the given inputs
    #[error("Key generation error: {0}")]
    KeyGeneration(String),
    /// Decryption hit a zero divisor or produced a non-finite value
    #[error("Arithmetic error: {0}")]
    Arithmetic(String),
    /// Payload checksum did not match the one announced by the store
    #[error("Integrity error: expected checksum {expected}, got {actual}")]
    Integrity { expected: String, actual: String },
    /// Invalid parameter provided (e.g., m < 3, max_range < 2)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Input shape or length validation failed
    #[error("Validation error: {0}")]
    Validation(String),
    /// Socket or file failure at the storage boundary
    #[cfg(feature = "distributed")]
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parameter or response block could not be (de)serialized
    #[cfg(feature = "distributed")]
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Storage node answered with a malformed frame
    #[cfg(feature = "distributed")]
    #[error("Protocol error: {0}")]
    Protocol(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
