//! Error taxonomy shared by the registry and Nexus integrations.
//!
//! Every failure that reaches a caller is a [`CantusError`]. The variant is
//! the failure kind; upstream failures additionally carry the HTTP status
//! (when there was one) and the name of the system that produced them, so a
//! caller can tell which upstream failed.

use thiserror::Error;

/// Result type alias using [`CantusError`] as the error type.
pub type Result<T> = std::result::Result<T, CantusError>;

/// Source system name used for failures raised by Nexus.
pub const NEXUS_SOURCE: &str = "Nexus";

/// Discriminant of a [`CantusError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input rejected before any I/O.
    Validation,
    /// An upstream system answered with an error or could not be reached.
    Upstream,
    /// An upstream system answered successfully but broke a protocol invariant.
    ProtocolViolation,
    /// The requested integration is not configured.
    IntegrationDisabled,
    /// Anything not otherwise classified.
    Unknown,
}

/// Whether an upstream failure is permanent or worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// 4xx responses. Never retried.
    Client,
    /// 5xx responses, network errors and timeouts.
    Transient,
}

/// Errors that can occur while talking to registries or Nexus.
#[derive(Debug, Error)]
pub enum CantusError {
    /// Malformed locator, disallowed registry override or malformed request.
    #[error("{message}")]
    Validation {
        /// Error message.
        message: String,
    },

    /// Upstream answered with a 4xx/5xx status or was unreachable.
    #[error("{source_system}: {message}")]
    Upstream {
        /// Message selected from the status code.
        message: String,
        /// HTTP status, `None` for network-level failures and timeouts.
        status: Option<u16>,
        /// Registry host or [`NEXUS_SOURCE`].
        source_system: String,
        /// Client or transient failure.
        class: FailureClass,
        /// Response body, kept for diagnostics.
        body: Option<String>,
    },

    /// Upstream answered 2xx but omitted a required header or used the wrong format.
    #[error("{source_system}: {message}")]
    ProtocolViolation {
        /// Error message.
        message: String,
        /// Registry host or [`NEXUS_SOURCE`].
        source_system: String,
    },

    /// The integration has no credentials or target configured.
    #[error("{integration} integration is disabled")]
    IntegrationDisabled {
        /// Name of the disabled integration.
        integration: String,
    },

    /// Catch-all that keeps the original cause.
    #[error("{source_system}: unknown error: {message}")]
    Unknown {
        /// Error message.
        message: String,
        /// System the error was observed on.
        source_system: String,
        /// Underlying error.
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// A response status that fits neither the 4xx nor the 5xx range.
#[derive(Debug, Error)]
#[error("unexpected response status {status}")]
pub struct UnexpectedStatus {
    /// The status that was received.
    pub status: u16,
}

impl CantusError {
    /// Creates a validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a protocol violation raised by `source_system`.
    pub fn protocol(message: impl Into<String>, source_system: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            message: message.into(),
            source_system: source_system.into(),
        }
    }

    /// Creates an integration-disabled failure.
    pub fn disabled(integration: impl Into<String>) -> Self {
        Self::IntegrationDisabled {
            integration: integration.into(),
        }
    }

    /// Wraps an arbitrary error as an unknown failure.
    pub fn unknown(
        source_system: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Unknown {
            message: cause.to_string(),
            source_system: source_system.into(),
            cause: Box::new(cause),
        }
    }

    /// Creates a transient upstream failure that has no status, e.g. a timeout.
    pub fn transient(message: impl Into<String>, source_system: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
            status: None,
            source_system: source_system.into(),
            class: FailureClass::Transient,
            body: None,
        }
    }

    /// Classifies an error response by its status code.
    ///
    /// # Examples
    ///
    /// ```
    /// use cantus_core::{CantusError, ErrorKind};
    ///
    /// let err = CantusError::from_status(404, "registry.example.com", None);
    /// assert_eq!(err.kind(), ErrorKind::Upstream);
    /// assert_eq!(err.status(), Some(404));
    /// assert_eq!(err.to_string(), "registry.example.com: resource not found");
    /// ```
    pub fn from_status(status: u16, source_system: impl Into<String>, body: Option<String>) -> Self {
        let source_system = source_system.into();
        let (message, class) = match status {
            400 => ("invalid request".to_string(), FailureClass::Client),
            401 => ("unauthorized".to_string(), FailureClass::Client),
            // Forbidden keeps the upstream explanation when there is one.
            403 => (
                body.clone()
                    .filter(|b| !b.trim().is_empty())
                    .unwrap_or_else(|| "forbidden".to_string()),
                FailureClass::Client,
            ),
            404 => ("resource not found".to_string(), FailureClass::Client),
            402 | 405..=499 => ("client error".to_string(), FailureClass::Client),
            500 => ("server processing error".to_string(), FailureClass::Transient),
            501..=599 => ("server error".to_string(), FailureClass::Transient),
            _ => {
                return Self::Unknown {
                    message: format!("unexpected response status {status}"),
                    source_system,
                    cause: Box::new(UnexpectedStatus { status }),
                }
            }
        };

        Self::Upstream {
            message,
            status: Some(status),
            source_system,
            class,
            body,
        }
    }

    /// Classifies a transport-level error from the HTTP client.
    pub fn from_transport(err: reqwest::Error, source_system: impl Into<String>) -> Self {
        let source_system = source_system.into();

        if let Some(status) = err.status() {
            return Self::from_status(status.as_u16(), source_system, None);
        }

        if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
            return Self::Upstream {
                message: format!("network error: {err}"),
                status: None,
                source_system,
                class: FailureClass::Transient,
                body: None,
            };
        }

        Self::unknown(source_system, err)
    }

    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Upstream { .. } => ErrorKind::Upstream,
            Self::ProtocolViolation { .. } => ErrorKind::ProtocolViolation,
            Self::IntegrationDisabled { .. } => ErrorKind::IntegrationDisabled,
            Self::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// Returns the upstream HTTP status, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => *status,
            _ => None,
        }
    }

    /// Returns the system that produced this error, if it came from upstream.
    #[must_use]
    pub fn source_system(&self) -> Option<&str> {
        match self {
            Self::Upstream { source_system, .. }
            | Self::ProtocolViolation { source_system, .. }
            | Self::Unknown { source_system, .. } => Some(source_system),
            Self::Validation { .. } | Self::IntegrationDisabled { .. } => None,
        }
    }

    /// Returns the human readable message without the source prefix.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Validation { message }
            | Self::Upstream { message, .. }
            | Self::ProtocolViolation { message, .. }
            | Self::Unknown { message, .. } => message.clone(),
            Self::IntegrationDisabled { .. } => self.to_string(),
        }
    }

    /// Returns true if the operation that produced this error may be retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Upstream {
                class: FailureClass::Transient,
                ..
            }
        )
    }
}
