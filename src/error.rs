use thiserror::Error;

/// Error taxonomy of the mapper. Every public operation either succeeds or
/// surfaces exactly one of these kinds; nothing is mapped to a catch-all.
#[derive(Error, Debug)]
pub enum TripodError {
    /// A value failed its lexical or range constraint at construction time.
    #[error("Invalid value: {0}")]
    Value(String),
    /// Wire text received from the store could not be parsed.
    #[error("Malformed wire form: {0}")]
    Format(String),
    /// Zero rows came back where exactly one entity was expected.
    #[error("Not found: {0}")]
    NotFound(String),
    /// An entity with the same identifier already exists in the store.
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    /// The entity was modified in the store since it was loaded.
    #[error("Concurrent modification: {0}")]
    Conflict(String),
    /// An attempt was made to change a field declared immutable.
    #[error("Field is immutable: {0}")]
    Immutable(String),
    /// The acting user lacks the capability required for the operation.
    #[error("No permission: {0}")]
    NoPermission(String),
    /// The remote call itself failed (network, HTTP, store-side error).
    #[error("Transport error: {0}")]
    Transport(String),
    /// Configuration could not be read.
    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TripodError>;

impl From<config::ConfigError> for TripodError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl From<serde_json::Error> for TripodError {
    fn from(e: serde_json::Error) -> Self {
        Self::Format(e.to_string())
    }
}
