use serde::{Deserialize, Serialize};

/// Failure categories surfaced to users of the disclosure workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    IllegalTransition,
    Unauthorized,
    NetworkFailure,
}

impl FailureKind {
    /// Only transient failures may be retried, and only by the user.
    pub const fn is_retryable(self) -> bool {
        matches!(self, FailureKind::NetworkFailure)
    }

    pub const fn user_message(self) -> &'static str {
        match self {
            FailureKind::NotFound => "This candidate or job could not be found.",
            FailureKind::IllegalTransition => {
                "This action is no longer available for this candidate."
            }
            FailureKind::Unauthorized => "You are not allowed to perform this action.",
            FailureKind::NetworkFailure => {
                "We could not reach VagaFacil. Nothing was changed; please try again."
            }
        }
    }
}
