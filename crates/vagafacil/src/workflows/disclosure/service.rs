use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::domain::{
    CandidateId, CandidateJobLink, JobId, KanbanStatus, LinkId, Party, Viewer, ViewerRole,
};
use super::failure::FailureKind;
use super::protocol::{self, LinkAction, TransitionError, TransitionOutcome};
use super::repository::{LinkNotification, LinkRepository, NotificationPublisher, RepositoryError};
use super::visibility::{project, LinkView};
use super::wire::SurfaceCandidateRequest;

/// Authority over link state: authorizes viewers, applies the protocol,
/// persists confirmed transitions and returns role-filtered views.
pub struct DisclosureService<R, N> {
    repository: Arc<R>,
    notifications: Arc<N>,
    writes: Mutex<()>,
}

static LINK_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_link_id() -> LinkId {
    let id = LINK_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    LinkId(format!("link-{id:06}"))
}

impl<R, N> DisclosureService<R, N>
where
    R: LinkRepository + 'static,
    N: NotificationPublisher + 'static,
{
    pub fn new(repository: Arc<R>, notifications: Arc<N>) -> Self {
        Self {
            repository,
            notifications,
            writes: Mutex::new(()),
        }
    }

    /// Record that a company search surfaced a candidate against a job.
    pub fn surface_candidate(
        &self,
        viewer: &Viewer,
        request: SurfaceCandidateRequest,
    ) -> Result<CandidateJobLink, DisclosureServiceError> {
        if viewer.role != ViewerRole::Admin {
            return Err(DisclosureServiceError::Unauthorized {
                role: viewer.role,
                resource: format!("job {}", request.job_id.0),
            });
        }

        let _writes = self.lock_writes()?;
        if self
            .repository
            .find_by_pair(&request.candidate.candidate_id, &request.job_id)?
            .is_some()
        {
            return Err(RepositoryError::Conflict.into());
        }

        let link = CandidateJobLink::surfaced(
            next_link_id(),
            request.job_id,
            request.company_id,
            request.candidate,
        );
        let stored = self.repository.insert(link)?;
        info!(link_id = %stored.id, job_id = %stored.job_id.0, "candidate surfaced for job");
        Ok(stored)
    }

    /// Read a link filtered for the viewer's role.
    pub fn fetch_link(
        &self,
        viewer: &Viewer,
        link_id: &LinkId,
    ) -> Result<LinkView, DisclosureServiceError> {
        let link = self.load(link_id)?;
        authorize(viewer, &link)?;
        Ok(project(&link, viewer.role))
    }

    pub fn express_interest(
        &self,
        viewer: &Viewer,
        candidate_id: &CandidateId,
        job_id: &JobId,
    ) -> Result<LinkView, DisclosureServiceError> {
        let _writes = self.lock_writes()?;
        let link = self
            .repository
            .find_by_pair(candidate_id, job_id)?
            .ok_or(RepositoryError::NotFound)?;
        self.apply_and_store(viewer, link, LinkAction::ExpressInterest)
    }

    pub fn respond_to_interest(
        &self,
        viewer: &Viewer,
        link_id: &LinkId,
        accepted: bool,
        reason: Option<String>,
    ) -> Result<LinkView, DisclosureServiceError> {
        let reason = reason
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        self.transition(
            viewer,
            link_id,
            LinkAction::RespondToInterest { accepted, reason },
        )
    }

    pub fn respond_to_interview_invite(
        &self,
        viewer: &Viewer,
        link_id: &LinkId,
        accepted: bool,
    ) -> Result<LinkView, DisclosureServiceError> {
        self.transition(
            viewer,
            link_id,
            LinkAction::RespondToInterviewInvite { accepted },
        )
    }

    pub fn schedule_interview(
        &self,
        viewer: &Viewer,
        link_id: &LinkId,
        at: chrono::DateTime<Utc>,
    ) -> Result<LinkView, DisclosureServiceError> {
        self.transition(viewer, link_id, LinkAction::ScheduleInterview { at })
    }

    pub fn advance(
        &self,
        viewer: &Viewer,
        link_id: &LinkId,
        to: KanbanStatus,
    ) -> Result<LinkView, DisclosureServiceError> {
        self.transition(viewer, link_id, LinkAction::Advance { to })
    }

    pub fn record_assessment(
        &self,
        viewer: &Viewer,
        link_id: &LinkId,
        completed: bool,
    ) -> Result<LinkView, DisclosureServiceError> {
        self.transition(viewer, link_id, LinkAction::RecordAssessment { completed })
    }

    pub fn withdraw(
        &self,
        viewer: &Viewer,
        link_id: &LinkId,
        reason: Option<String>,
    ) -> Result<LinkView, DisclosureServiceError> {
        self.transition(viewer, link_id, LinkAction::Withdraw { reason })
    }

    /// Append an internal note. Notes never reach candidate views and do
    /// not move the link.
    pub fn add_company_note(
        &self,
        viewer: &Viewer,
        link_id: &LinkId,
        note: &str,
    ) -> Result<LinkView, DisclosureServiceError> {
        if viewer.role == ViewerRole::Candidate {
            return Err(DisclosureServiceError::Unauthorized {
                role: viewer.role,
                resource: format!("notes on link {link_id}"),
            });
        }
        let note = note.trim();
        if note.is_empty() {
            return Err(DisclosureServiceError::EmptyNote);
        }

        let _writes = self.lock_writes()?;
        let mut link = self.load(link_id)?;
        authorize(viewer, &link)?;
        link.company_notes.push(note.to_string());
        self.repository.update(link.clone())?;
        info!(
            link_id = %link.id,
            role = %viewer.role,
            notes = link.company_notes.len(),
            "company note recorded"
        );
        Ok(project(&link, viewer.role))
    }

    fn transition(
        &self,
        viewer: &Viewer,
        link_id: &LinkId,
        action: LinkAction,
    ) -> Result<LinkView, DisclosureServiceError> {
        let _writes = self.lock_writes()?;
        let link = self.load(link_id)?;
        self.apply_and_store(viewer, link, action)
    }

    fn apply_and_store(
        &self,
        viewer: &Viewer,
        mut link: CandidateJobLink,
        action: LinkAction,
    ) -> Result<LinkView, DisclosureServiceError> {
        authorize(viewer, &link)?;

        let kind = action.kind();
        match protocol::apply(&mut link, &action, viewer.role, Utc::now()) {
            Ok(TransitionOutcome::Applied { from, to }) => {
                self.repository.update(link.clone())?;
                info!(
                    link_id = %link.id,
                    role = %viewer.role,
                    action = %kind,
                    %from,
                    %to,
                    unlocked = link.personal_data_unlocked(),
                    "link transitioned"
                );
                self.notify(&link, &action);
            }
            Ok(TransitionOutcome::AlreadySatisfied { status }) => {
                debug!(link_id = %link.id, action = %kind, %status, "action already satisfied");
            }
            Err(err) => {
                debug!(link_id = %link.id, role = %viewer.role, error = %err, "transition refused");
                return Err(err.into());
            }
        }

        Ok(project(&link, viewer.role))
    }

    fn notify(&self, link: &CandidateJobLink, action: &LinkAction) {
        let Some(notification) = notification_for(link, action) else {
            return;
        };
        let template = notification.template.clone();
        if let Err(err) = self.notifications.publish(notification) {
            warn!(link_id = %link.id, %template, error = %err, "notification not delivered");
        }
    }

    fn load(&self, link_id: &LinkId) -> Result<CandidateJobLink, DisclosureServiceError> {
        let link = self
            .repository
            .fetch(link_id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(link)
    }

    fn lock_writes(&self) -> Result<std::sync::MutexGuard<'_, ()>, DisclosureServiceError> {
        self.writes
            .lock()
            .map_err(|_| RepositoryError::Unavailable("write lock poisoned".to_string()).into())
    }
}

fn authorize(viewer: &Viewer, link: &CandidateJobLink) -> Result<(), DisclosureServiceError> {
    let permitted = match viewer.role {
        ViewerRole::Admin => true,
        ViewerRole::Company => link.company_id.0 == viewer.subject,
        ViewerRole::Candidate => link.candidate.candidate_id.0 == viewer.subject,
    };

    if permitted {
        Ok(())
    } else {
        Err(DisclosureServiceError::Unauthorized {
            role: viewer.role,
            resource: format!("link {}", link.id),
        })
    }
}

fn notification_for(link: &CandidateJobLink, action: &LinkAction) -> Option<LinkNotification> {
    let mut details = BTreeMap::new();
    details.insert("job_id".to_string(), link.job_id.0.clone());
    details.insert(
        "kanban_status".to_string(),
        link.kanban_status.label().to_string(),
    );

    let (template, recipient) = match action {
        LinkAction::ExpressInterest => ("company_interest_expressed", Party::Candidate),
        LinkAction::RespondToInterest { accepted: true, .. } => {
            ("candidate_accepted_interest", Party::Company)
        }
        LinkAction::RespondToInterest {
            accepted: false, ..
        } => ("candidate_declined_interest", Party::Company),
        LinkAction::RespondToInterviewInvite { accepted: true } => {
            ("interview_confirmed", Party::Candidate)
        }
        LinkAction::RespondToInterviewInvite { accepted: false } => {
            ("interview_declined", Party::Candidate)
        }
        LinkAction::ScheduleInterview { at } => {
            details.insert("interview_date".to_string(), at.to_rfc3339());
            ("interview_scheduled", Party::Candidate)
        }
        LinkAction::Withdraw { .. } => {
            let recipient = match link.rejection.as_ref().map(|rejection| rejection.by) {
                Some(Party::Candidate) => Party::Company,
                _ => Party::Candidate,
            };
            ("link_withdrawn", recipient)
        }
        LinkAction::Advance { .. } | LinkAction::RecordAssessment { .. } => return None,
    };

    Some(LinkNotification {
        template: template.to_string(),
        link_id: link.id.clone(),
        recipient,
        details,
    })
}

/// Error raised by the disclosure service.
#[derive(Debug, thiserror::Error)]
pub enum DisclosureServiceError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("{role} is not allowed to access {resource}")]
    Unauthorized { role: ViewerRole, resource: String },
    #[error("company notes cannot be blank")]
    EmptyNote,
}

impl DisclosureServiceError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            DisclosureServiceError::Transition(err) => err.failure_kind(),
            DisclosureServiceError::Repository(RepositoryError::NotFound) => FailureKind::NotFound,
            DisclosureServiceError::Repository(RepositoryError::Conflict) => {
                FailureKind::IllegalTransition
            }
            DisclosureServiceError::Repository(RepositoryError::Unavailable(_)) => {
                FailureKind::NetworkFailure
            }
            DisclosureServiceError::Unauthorized { .. } => FailureKind::Unauthorized,
            DisclosureServiceError::EmptyNote => FailureKind::IllegalTransition,
        }
    }
}

