//! Error taxonomy for building, registering, decoding and configuring problems.
//!
//! Per-request resolution never surfaces any of these: the engine absorbs
//! resolver failures into a fallback problem. These errors belong to the
//! wiring phase (builder validation, duplicate bindings, configuration) and to
//! decoding documents received from elsewhere.

/// A problem could not be built because one of its invariants does not hold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("problem title is required")]
    MissingTitle,
    #[error("status {0} is not a valid status code (expected 100..=599)")]
    InvalidStatus(u16),
    #[error("problem type '{value}' is not an absolute URI: {reason}")]
    InvalidType { value: String, reason: String },
    #[error("extension key '{0}' collides with a reserved problem field")]
    ReservedExtensionKey(String),
}

/// The same exception type was registered twice.
///
/// Raised during wiring and meant to abort startup; the registry never
/// silently replaces a binding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("a resolver is already registered for exception type '{type_name}'")]
pub struct DuplicateBindingError {
    pub type_name: &'static str,
}

/// A document could not be decoded into a problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("problem document must be a JSON object")]
    NotAnObject,
    #[error("field '{field}' must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Configuration could not be loaded or is inconsistent.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load problem configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("invalid fallback problem in configuration: {0}")]
    InvalidFallback(#[from] ValidationError),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}
