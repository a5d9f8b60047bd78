//! Error handling for operator actions.

use thiserror::Error;

use buildmart_core::ServiceError;

/// Errors returned by operator status changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminError {
    /// The requested value is not selectable from the order's current state.
    #[error("Cannot change {field} from {from} to {to}")]
    TransitionNotAllowed {
        field: &'static str,
        from: String,
        to: String,
    },

    /// The order service failed.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl AdminError {
    /// Report service failures to Sentry. Rejected transitions are operator
    /// input errors and are not reported.
    pub fn capture(&self) {
        if let Self::Service(err) = self {
            let event_id = sentry::capture_error(err);
            tracing::error!(
                error = %err,
                sentry_event_id = %event_id,
                "Order service error"
            );
        }
    }
}
