//! WebAuthn error codes and outcome strings.
//!
//! Maps platform authenticator failures onto the numeric codes exposed to
//! applications and the outcome token the server expects in the WebAuthn
//! hidden-value field.

use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Error domain reported alongside WebAuthn error codes.
pub const ERROR_DOMAIN: &str = "org.devprofile.webauthn";

/// Outcome token for authenticators that cannot perform the ceremony.
pub const UNSUPPORTED_OUTCOME: &str = "unsupported";

/// Failure categories of a WebAuthn ceremony.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum WebAuthnErrorKind {
    #[error("Provided data is inadequate")]
    BadData,
    #[error("The operation failed for operation-specific reason")]
    BadOperation,
    #[error("The object is in an invalid state")]
    InvalidState,
    #[error("A mutation operation in a transaction failed because a constraint was not satisfied")]
    Constraint,
    #[error("The operation is cancelled")]
    Cancelled,
    #[error("The operation timed out")]
    Timeout,
    #[error("The request is not allowed by the user agent or the platform in the current context")]
    NotAllowed,
    #[error("The operation is not supported")]
    Unsupported,
    #[error("The operation failed for an unknown reason")]
    Unknown,
}

impl WebAuthnErrorKind {
    pub const ALL: [WebAuthnErrorKind; 9] = [
        WebAuthnErrorKind::BadData,
        WebAuthnErrorKind::BadOperation,
        WebAuthnErrorKind::InvalidState,
        WebAuthnErrorKind::Constraint,
        WebAuthnErrorKind::Cancelled,
        WebAuthnErrorKind::Timeout,
        WebAuthnErrorKind::NotAllowed,
        WebAuthnErrorKind::Unsupported,
        WebAuthnErrorKind::Unknown,
    ];

    /// Stable numeric code in the reserved 1600000 range.
    pub fn code(&self) -> i32 {
        match self {
            WebAuthnErrorKind::BadData => 1_600_001,
            WebAuthnErrorKind::BadOperation => 1_600_002,
            WebAuthnErrorKind::InvalidState => 1_600_003,
            WebAuthnErrorKind::Constraint => 1_600_004,
            WebAuthnErrorKind::Cancelled => 1_600_005,
            WebAuthnErrorKind::Timeout => 1_600_006,
            WebAuthnErrorKind::NotAllowed => 1_600_007,
            WebAuthnErrorKind::Unsupported => 1_600_008,
            WebAuthnErrorKind::Unknown => 1_600_099,
        }
    }

    /// Looks up a kind by its numeric code.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    /// Name of the matching DOMException type on the server side.
    pub fn server_error_type(&self) -> &'static str {
        match self {
            WebAuthnErrorKind::BadData => "DataError",
            WebAuthnErrorKind::InvalidState => "InvalidStateError",
            WebAuthnErrorKind::Constraint => "ConstraintError",
            WebAuthnErrorKind::Timeout => "TimeoutError",
            WebAuthnErrorKind::NotAllowed => "NotAllowedError",
            WebAuthnErrorKind::Unsupported => "NotSupportedError",
            WebAuthnErrorKind::BadOperation
            | WebAuthnErrorKind::Cancelled
            | WebAuthnErrorKind::Unknown => "UnknownError",
        }
    }
}

/// A WebAuthn failure with optional platform detail.
#[derive(Debug)]
pub struct WebAuthnError {
    kind: WebAuthnErrorKind,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    message: Option<String>,
}

impl WebAuthnError {
    pub fn new(kind: WebAuthnErrorKind) -> Self {
        Self {
            kind,
            source: None,
            message: None,
        }
    }

    /// Attaches the underlying platform error.
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Attaches a free-form message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn kind(&self) -> WebAuthnErrorKind {
        self.kind
    }

    pub fn code(&self) -> i32 {
        self.kind.code()
    }

    /// Detail for the outcome string: the platform error's text, else the
    /// attached message.
    pub fn description(&self) -> Option<String> {
        match (&self.source, &self.message) {
            (Some(source), _) => Some(source.to_string()),
            (None, Some(message)) => Some(message.clone()),
            (None, None) => None,
        }
    }

    /// The value submitted in the WebAuthn outcome field.
    pub fn outcome(&self) -> String {
        match self.kind {
            WebAuthnErrorKind::Unsupported => UNSUPPORTED_OUTCOME.to_string(),
            kind => format!(
                "ERROR::{}:{}",
                kind.server_error_type(),
                self.description().unwrap_or_default()
            ),
        }
    }
}

impl From<WebAuthnErrorKind> for WebAuthnError {
    fn from(kind: WebAuthnErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for WebAuthnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.kind.code())
    }
}

impl StdError for WebAuthnError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}
