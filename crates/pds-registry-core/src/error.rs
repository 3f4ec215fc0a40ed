//! Error kinds for the request pipeline.
//!
//! Every failure the pipeline can report is a [`RegistryError`] variant.
//! Callers discriminate on the variant (or on [`RegistryError::kind`]) instead
//! of matching on message text.

use thiserror::Error;

/// Failures raised while resolving, querying, or assembling a response.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The Accept value matches no registered format.
    #[error(
        "the Accept header value {attempted} is not supported, supported values are {}",
        supported.join(", ")
    )]
    UnsupportedFormat {
        attempted: String,
        supported: Vec<String>,
    },

    /// Version resolution found no candidate for the identifier.
    #[error("could not find lid(vid) in the registry: {identifier}")]
    IdentifierNotFound { identifier: String },

    /// A named constraint group does not exist.
    #[error("unknown group name '{name}', known groups are {}", known.join(", "))]
    UnknownGroupName { name: String, known: Vec<String> },

    /// The free-text query failed to parse.
    #[error("could not parse the query string '{query}' at position {position}: {message}")]
    MalformedQuery {
        query: String,
        position: usize,
        message: String,
    },

    /// The identifier is syntactically broken (e.g. `urn:a::`).
    #[error("invalid product identifier: '{raw}'")]
    InvalidIdentifier { raw: String },

    /// A request parameter is out of range or unparseable.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    /// The search round trip failed or timed out.
    #[error("search backend unavailable: {message}")]
    BackendUnavailable { message: String },

    /// A singular lookup executed successfully but matched nothing.
    #[error("could not find any data given these conditions")]
    NothingFound,

    /// A singular lookup matched more than one document.
    #[error(
        "got {hits} hits for a query which should have returned a singular result, \
         is provenance metadata present and up-to-date?"
    )]
    AmbiguousSingularResult { hits: u64 },
}

/// Coarse classification used by transport layers to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    NotAcceptable,
    NotFound,
    Internal,
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::UnsupportedFormat { .. } => ErrorKind::NotAcceptable,
            RegistryError::IdentifierNotFound { .. } | RegistryError::NothingFound => {
                ErrorKind::NotFound
            }
            RegistryError::UnknownGroupName { .. }
            | RegistryError::MalformedQuery { .. }
            | RegistryError::InvalidIdentifier { .. }
            | RegistryError::InvalidParameter { .. } => ErrorKind::BadRequest,
            RegistryError::BackendUnavailable { .. }
            | RegistryError::AmbiguousSingularResult { .. } => ErrorKind::Internal,
        }
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
