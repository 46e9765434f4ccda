use thiserror::Error;

use crate::routing::RoutingTransitionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error(transparent)]
    RoutingTransition(#[from] RoutingTransitionError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(DomainError::InvariantViolation(message)) => {
                Self::BadRequest { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Domain(DomainError::RoutingTransition(error)) => Self::Internal {
                message: error.to_string(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

/// Failures the dispatcher recovers from locally. Each maps to a fixed user-safe message.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("caller identity could not be resolved")]
    IdentityNotFound,
    #[error("access denied for {handler} handler: {reason}")]
    AccessDenied { handler: &'static str, reason: String },
    #[error("{handler} handler failed: {detail}")]
    HandlerFailure { handler: &'static str, detail: String },
}

impl RoutingError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::IdentityNotFound => {
                "Please log in with your registered email address to access your account information."
            }
            Self::AccessDenied { .. } => {
                "Your account does not have access to this information. Please log in with the account that owns it."
            }
            Self::HandlerFailure { .. } => {
                "Sorry, I ran into a problem while answering your question. Please try again in a moment."
            }
        }
    }

    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::IdentityNotFound => "identity_not_found",
            Self::AccessDenied { .. } => "access_denied",
            Self::HandlerFailure { .. } => "handler_failure",
        }
    }
}

/// Failure signalled by a handler collaborator. Never shown to the caller verbatim.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HandlerError {
    #[error("handler requires a resolved customer identity")]
    MissingIdentity,
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("store failure: {0}")]
    Store(String),
    #[error("language model failure: {0}")]
    Llm(String),
    #[error("knowledge retrieval failure: {0}")]
    Retrieval(String),
    #[error("prompt template failure: {0}")]
    Template(String),
}

/// Failure reported by an identity or account store implementation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store returned malformed data: {0}")]
    Decode(String),
}

impl From<StoreError> for HandlerError {
    fn from(value: StoreError) -> Self {
        Self::Store(value.to_string())
    }
}

impl From<StoreError> for ApplicationError {
    fn from(value: StoreError) -> Self {
        Self::Persistence(value.to_string())
    }
}
