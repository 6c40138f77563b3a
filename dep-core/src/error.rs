use serde::Serialize;

/// Every failure the SDK can surface. Each variant is a distinct kind so that a
/// caller can tell "retry later" from "fix the input" from "escalate".
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Validation failed on `{field}`: {reason}")]
    ValidationError { field: String, reason: String },

    #[error("Transport failure: {0}")]
    TransportError(String),

    #[error("Remote service rejected the request with HTTP {status}")]
    RemoteRejectionError { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponseError(String),

    #[error("Invalid submission transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Configuration,
    Validation,
    Transport,
    RemoteRejection,
    MalformedResponse,
    InvalidTransition,
}

impl CoreError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::ValidationError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::ConfigurationError(_) => ErrorKind::Configuration,
            CoreError::ValidationError { .. } => ErrorKind::Validation,
            CoreError::TransportError(_) => ErrorKind::Transport,
            CoreError::RemoteRejectionError { .. } => ErrorKind::RemoteRejection,
            CoreError::MalformedResponseError(_) => ErrorKind::MalformedResponse,
            CoreError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
        }
    }

    /// Only connection-level failures are worth a caller-side retry; the SDK
    /// itself never retries.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    /// Name of the offending field for validation failures.
    pub fn field(&self) -> Option<&str> {
        match self {
            CoreError::ValidationError { field, .. } => Some(field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinguishable() {
        let errors = vec![
            CoreError::ConfigurationError("DEP_ENV missing".into()),
            CoreError::validation("serialNumber", "must not be empty"),
            CoreError::TransportError("connection refused".into()),
            CoreError::RemoteRejectionError { status: 503, body: "busy".into() },
            CoreError::MalformedResponseError("not json".into()),
            CoreError::InvalidTransition { from: "BUILT".into(), to: "SUBMITTED".into() },
        ];

        let kinds: std::collections::HashSet<_> = errors.iter().map(|e| e.kind()).collect();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn test_only_transport_is_retryable() {
        assert!(CoreError::TransportError("timeout".into()).is_retryable());
        assert!(!CoreError::ConfigurationError("x".into()).is_retryable());
        assert!(!CoreError::RemoteRejectionError { status: 500, body: String::new() }.is_retryable());
    }

    #[test]
    fn test_validation_message_names_field() {
        let err = CoreError::validation("deliveries", "must contain at least one delivery");
        assert_eq!(err.field(), Some("deliveries"));
        assert_eq!(
            err.to_string(),
            "Validation failed on `deliveries`: must contain at least one delivery"
        );
    }

    #[test]
    fn test_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorKind::RemoteRejection).unwrap();
        assert_eq!(json, "\"REMOTE_REJECTION\"");
    }
}
