pub mod inquiry;
pub mod repository;
pub mod live;
pub mod identity;
pub mod clock;
pub mod enhance;
pub mod notify;

pub use inquiry::{ContactInfo, Decision, Inquiry, InquiryStatus, NewInquiry, Quote, QuoteDraft};
pub use repository::{InquiryRepository, Mutation, Precondition};
pub use live::{ChangeKind, InquiryChange, LiveViewHub, Subscription, ViewScope};
pub use identity::{Caller, Role};
pub use clock::{Clock, SystemClock};

use uuid::Uuid;

/// Every way an inquiry operation can be rejected.
///
/// Each variant maps to a distinct user-facing reason; callers must never
/// collapse them into a generic failure.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Invalid transition: cannot {action} an inquiry that is {from}")]
    InvalidTransitionError {
        from: InquiryStatus,
        action: String,
    },
    #[error("Stale state: {0}")]
    StaleStateError(String),
    #[error("Not authorized: {0}")]
    AuthorizationError(String),
    #[error("Response window closed for inquiry {inquiry_id}")]
    ResponseWindowClosed { inquiry_id: Uuid },
    #[error("Inquiry not found: {0}")]
    NotFound(Uuid),
    #[error("Transport error: {0}")]
    TransportError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

impl CoreError {
    /// Stable machine-readable reason, used in API error bodies and logs.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::ValidationError(_) => "validation_error",
            CoreError::InvalidTransitionError { .. } => "invalid_transition",
            CoreError::StaleStateError(_) => "stale_state",
            CoreError::AuthorizationError(_) => "authorization_error",
            CoreError::ResponseWindowClosed { .. } => "response_window_closed",
            CoreError::NotFound(_) => "not_found",
            CoreError::TransportError(_) => "transport_error",
            CoreError::InternalError(_) => "internal_error",
        }
    }

    pub fn invalid_transition(from: InquiryStatus, action: impl Into<String>) -> Self {
        CoreError::InvalidTransitionError {
            from,
            action: action.into(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
