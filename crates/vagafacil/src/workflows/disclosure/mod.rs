//! Candidate disclosure workflow: what a company may see about a candidate
//! on a given job, and the mutual-consent handshake that unlocks it.

pub mod client;
pub mod domain;
pub mod failure;
pub mod protocol;
pub mod repository;
pub mod router;
pub mod service;
pub mod session;
pub mod visibility;
pub mod wire;

#[cfg(test)]
mod tests;

pub use client::{ApiError, DisclosureApi, HttpDisclosureApi};
pub use domain::{
    AnonymousId, BusinessFlags, CandidateId, CandidateJobLink, CandidateProfile, CompanyId,
    DeclaredCompetency, DisclosureFlags, InterestRecord, InterestResponse, JobId, KanbanStatus,
    LinkId, Party, PersonalData, Rejection, TestScore, Viewer, ViewerRole,
};
pub use failure::FailureKind;
pub use protocol::{
    available_actions, ActionKind, LinkAction, Readiness, TransitionError, TransitionOutcome,
};
pub use repository::{
    LinkNotification, LinkRepository, NotificationError, NotificationPublisher, RepositoryError,
};
pub use router::disclosure_router;
pub use service::{DisclosureService, DisclosureServiceError};
pub use session::{Banner, DisclosureSession, LinkState, SessionError};
pub use visibility::{
    project, resolve_visibility, CompanyLinkView, LinkView, Visibility, VisibilityTier,
};
