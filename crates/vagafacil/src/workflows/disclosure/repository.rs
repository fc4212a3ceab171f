use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{CandidateId, CandidateJobLink, JobId, LinkId, Party};

/// Storage abstraction for the link authority.
pub trait LinkRepository: Send + Sync {
    fn insert(&self, link: CandidateJobLink) -> Result<CandidateJobLink, RepositoryError>;
    fn update(&self, link: CandidateJobLink) -> Result<(), RepositoryError>;
    fn fetch(&self, id: &LinkId) -> Result<Option<CandidateJobLink>, RepositoryError>;
    fn find_by_pair(
        &self,
        candidate_id: &CandidateId,
        job_id: &JobId,
    ) -> Result<Option<CandidateJobLink>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook (e-mail, push, in-app inbox adapters).
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: LinkNotification) -> Result<(), NotificationError>;
}

/// Notification payload. `details` never carries personal data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkNotification {
    pub template: String,
    pub link_id: LinkId,
    pub recipient: Party,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
