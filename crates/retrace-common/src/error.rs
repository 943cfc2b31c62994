use thiserror::Error;

/// Why a single record of a session log could not be read.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record has no 'type' field")]
    MissingType,
    #[error("malformed '{kind}' record: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("htmlCapture record has neither 'html' nor 'html_file_url'")]
    MissingHtml,
}

/// Failures reported by the external stores (documents, blobs, tree generation, output).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error (status {status:?}): {message}")]
    Http {
        status: Option<u16>,
        message: String,
    },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Whether retrying the same call can succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::NotFound(_) | StoreError::InvalidKey(_) | StoreError::Json(_) => false,
            StoreError::Http {
                status: Some(status),
                ..
            } => *status == 429 || *status >= 500,
            StoreError::Http { status: None, .. } | StoreError::Io(_) | StoreError::Other(_) => {
                true
            }
        }
    }
}
