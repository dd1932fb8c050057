use thiserror::Error;

/// Failure talking to the homework status API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("API returned status {status}")]
    Status { status: reqwest::StatusCode },
    #[error("API response is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),
}

impl ApiError {
    pub fn transport(
        endpoint: &str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        ApiError::Transport {
            endpoint: endpoint.to_string(),
            source: source.into(),
        }
    }

    /// Connection-level failures are the only ones worth repeating right away.
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport { .. })
    }
}

/// Everything that can go wrong between startup and delivering a status.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("API response contains an empty `homeworks` list")]
    EmptyHomeworks,
    #[error("unexpected API response shape: {0}")]
    Shape(String),
    #[error("homework record has no `homework_name` key")]
    MissingField,
    #[error("unexpected homework status \"{0}\"")]
    UnknownStatus(String),
}

impl PollError {
    /// Fatal errors stop the polling loop. The rest skip the current cycle or item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PollError::Config(_) | PollError::Api(_) | PollError::EmptyHomeworks
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(PollError::Config("x".into()).is_fatal());
        assert!(PollError::EmptyHomeworks.is_fatal());
        assert!(PollError::from(ApiError::Status {
            status: reqwest::StatusCode::BAD_GATEWAY
        })
        .is_fatal());

        assert!(!PollError::Shape("x".into()).is_fatal());
        assert!(!PollError::MissingField.is_fatal());
        assert!(!PollError::UnknownStatus("done".into()).is_fatal());
    }

    #[test]
    fn test_only_transport_is_transport() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(ApiError::transport("http://localhost", io).is_transport());
        assert!(!ApiError::Status {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR
        }
        .is_transport());
    }

    #[test]
    fn test_api_error_is_displayed_transparently() {
        let err = PollError::from(ApiError::Status {
            status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
        });
        assert_eq!(err.to_string(), "API returned status 503 Service Unavailable");
    }
}
