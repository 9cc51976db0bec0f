use thiserror::Error;

/// Failure taxonomy shared by the store, the adapters, and the index
/// engines. Engines surface these unchanged; in-memory index state is left
/// unspecified after an error and the caller is expected to discard the
/// engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A blob state handle whose encoded size falls outside the malloc
    /// bounds. Fatal to the call, not to the process.
    #[error("invalid blob handle: state size {size} outside [{min}, {max}]")]
    InvalidHandle { size: usize, min: usize, max: usize },

    /// Lower-layer store failure, surfaced unchanged.
    #[error("store error: {0}")]
    Store(String),

    /// Caller contract violation (operating outside a transaction, loading
    /// a removed blob, updating an absent key). A programming error.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// Nonsensical engine knob, rejected at construction.
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
