use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Failed to decode {service} response: {message}")]
    Decode {
        service: &'static str,
        message: String,
    },

    #[error("Not authenticated with {0}")]
    NotAuthenticated(&'static str),

    #[error("Failed to read rows: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to open rows: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing required column: {column}. Available columns: {available:?}")]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },
}

impl SourceError {
    pub fn decode(service: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            service,
            message: err.to_string(),
        }
    }

    /// HTTP status carried by the error, if the remote answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
