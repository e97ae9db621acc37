use thiserror::Error;

/// Raised while assembling an [`IntegrationConfig`](crate::IntegrationConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("URL can not be empty.")]
    EmptyUrl,
    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Timeout can not be equal to zero.")]
    ZeroTimeout,
    #[error("Request headers can not be empty.")]
    EmptyHeaders,
}

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("{message} (argument: {name})")]
    MissingArgument {
        name: &'static str,
        message: &'static str,
    },
    #[error("{message} (argument: {name})")]
    InvalidArgument {
        name: &'static str,
        message: &'static str,
    },
    #[error("Failed to serialize request payload: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Received invalid HTTP response from {url} with status code: {status}. Reason phrase: {reason}")]
    UnsuccessfulResponse {
        url: String,
        status: u16,
        reason: String,
    },
    #[error("There was an error while executing POST to {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl IntegrationError {
    pub(crate) fn missing(name: &'static str, message: &'static str) -> Self {
        Self::MissingArgument { name, message }
    }

    pub(crate) fn invalid(name: &'static str, message: &'static str) -> Self {
        Self::InvalidArgument { name, message }
    }

    /// True for call-site validation failures raised before any network activity.
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            Self::MissingArgument { .. } | Self::InvalidArgument { .. }
        )
    }

    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::UnsuccessfulResponse { .. } | Self::Transport { .. }
        )
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::UnsuccessfulResponse { status, .. } => Some(*status),
            _ => None,
        }
    }
}
