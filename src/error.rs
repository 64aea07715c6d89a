//! Error types shared by schemas, fields and pages

use thiserror::Error;

/// Error produced by a [`DocumentProvider`](crate::DocumentProvider) fetch.
pub type FetchError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, ScrapeError>;

#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Both `extract` and `attribute` were configured on one field
    #[error("extract and attribute are mutually exclusive (selector `{0}`)")]
    ConflictingSource(String),

    #[error("invalid CSS selector `{selector}`: {message}")]
    InvalidSelector { selector: String, message: String },

    /// An option was set on a field kind that cannot honour it
    #[error("`{option}` is not supported on {kind} fields")]
    UnsupportedOption {
        kind: &'static str,
        option: &'static str,
    },

    #[error("malformed URL template `{0}`")]
    InvalidTemplate(String),

    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),

    #[error("{0} has no URL template and no URL was supplied")]
    MissingUrl(String),

    #[error("missing argument `{0}` for URL template")]
    MissingArgument(String),

    #[error("{schema} takes {expected} positional argument(s) but {given} were given")]
    TooManyArguments {
        schema: String,
        expected: usize,
        given: usize,
    },

    /// Lookup of an undeclared page field or group sub-field
    #[error("field `{0}` not found")]
    FieldNotFound(String),

    #[error("no schema registered as `{0}`")]
    UnknownSchema(String),

    /// Transport or read failure, surfaced as the provider reported it
    #[error(transparent)]
    Fetch(FetchError),
}

impl ScrapeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ScrapeError::FieldNotFound(_))
    }
}

impl From<FetchError> for ScrapeError {
    fn from(err: FetchError) -> Self {
        ScrapeError::Fetch(err)
    }
}
