use thiserror::Error;

/// Errors surfaced by the metadata library.
///
/// Soft misses (no record for a path, an unresolved placeholder) are never
/// reported through this type; they degrade to fallback values instead.
#[derive(Debug, Error)]
pub enum SeoError {
    /// Invalid process configuration, e.g. a registered entity type without
    /// an absolute path accessor.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Rejected editor input, e.g. a second record for the same entity and
    /// language.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// The host failed to load bound entities.
    #[error("entity lookup failed: {0}")]
    EntityLookup(String),

    #[error("store connection lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, SeoError>;
