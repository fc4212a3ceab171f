use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::workflows::disclosure::client::{ApiError, DisclosureApi};
use crate::workflows::disclosure::domain::{
    CandidateId, CandidateJobLink, CandidateProfile, CompanyId, DeclaredCompetency, JobId, LinkId,
    PersonalData, TestScore, Viewer,
};
use crate::workflows::disclosure::failure::FailureKind;
use crate::workflows::disclosure::repository::{
    LinkNotification, LinkRepository, NotificationError, NotificationPublisher, RepositoryError,
};
use crate::workflows::disclosure::service::{DisclosureService, DisclosureServiceError};
use crate::workflows::disclosure::visibility::LinkView;
use crate::workflows::disclosure::wire::SurfaceCandidateRequest;

pub(super) const COMPANY: &str = "company-acme";

pub(super) fn candidate_id(suffix: &str) -> CandidateId {
    CandidateId(format!("cand-{suffix}"))
}

pub(super) fn job_id(suffix: &str) -> JobId {
    JobId(format!("job-{suffix}"))
}

pub(super) fn company() -> Viewer {
    Viewer::company(&CompanyId(COMPANY.to_string()))
}

pub(super) fn candidate(suffix: &str) -> Viewer {
    Viewer::candidate(&candidate_id(suffix))
}

pub(super) fn admin() -> Viewer {
    Viewer::admin("ops-desk")
}

pub(super) fn profile(suffix: &str) -> CandidateProfile {
    CandidateProfile {
        candidate_id: candidate_id(suffix),
        competencies: vec![
            DeclaredCompetency {
                name: "Rust".to_string(),
                level: 4,
            },
            DeclaredCompetency {
                name: "SQL".to_string(),
                level: 3,
            },
        ],
        test_scores: vec![TestScore {
            test: "backend-fundamentals".to_string(),
            score: 87,
            completed_at: Utc
                .with_ymd_and_hms(2026, 3, 2, 14, 0, 0)
                .single()
                .expect("valid timestamp"),
        }],
        personal: PersonalData {
            full_name: format!("Marina Costa {suffix}"),
            email: format!("marina.{suffix}@example.com"),
            phone: Some("+55 11 91234-5678".to_string()),
            resume_url: Some(format!("https://files.vagafacil.test/{suffix}.pdf")),
        },
    }
}

pub(super) fn surface_request(suffix: &str) -> SurfaceCandidateRequest {
    SurfaceCandidateRequest {
        job_id: job_id(suffix),
        company_id: CompanyId(COMPANY.to_string()),
        candidate: profile(suffix),
    }
}

/// A stored-shape link that never went through the service.
pub(super) fn raw_link(suffix: &str) -> CandidateJobLink {
    CandidateJobLink::surfaced(
        LinkId(format!("link-{suffix}")),
        job_id(suffix),
        CompanyId(COMPANY.to_string()),
        profile(suffix),
    )
}

pub(super) type MemoryService = DisclosureService<MemoryLinkRepository, MemoryNotifications>;

pub(super) fn build_service() -> (
    MemoryService,
    Arc<MemoryLinkRepository>,
    Arc<MemoryNotifications>,
) {
    let repository = Arc::new(MemoryLinkRepository::default());
    let notifications = Arc::new(MemoryNotifications::default());
    let service = DisclosureService::new(repository.clone(), notifications.clone());
    (service, repository, notifications)
}

/// Surface a candidate and return the new link id.
pub(super) fn surfaced(service: &MemoryService, suffix: &str) -> LinkId {
    service
        .surface_candidate(&admin(), surface_request(suffix))
        .expect("candidate surfaced")
        .id
}

/// Surface a candidate and drive the handshake until the company unlocks.
pub(super) fn unlocked(service: &MemoryService, suffix: &str) -> LinkId {
    let link_id = surfaced(service, suffix);
    service
        .express_interest(&company(), &candidate_id(suffix), &job_id(suffix))
        .expect("interest expressed");
    service
        .respond_to_interest(&candidate(suffix), &link_id, true, None)
        .expect("interest accepted");
    link_id
}

#[derive(Default, Clone)]
pub(super) struct MemoryLinkRepository {
    pub(super) links: Arc<Mutex<HashMap<LinkId, CandidateJobLink>>>,
}

impl MemoryLinkRepository {
    pub(super) fn stored(&self, id: &LinkId) -> CandidateJobLink {
        self.links
            .lock()
            .expect("repository mutex poisoned")
            .get(id)
            .cloned()
            .expect("link stored")
    }
}

impl LinkRepository for MemoryLinkRepository {
    fn insert(&self, link: CandidateJobLink) -> Result<CandidateJobLink, RepositoryError> {
        let mut guard = self.links.lock().expect("repository mutex poisoned");
        if guard.contains_key(&link.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(link.id.clone(), link.clone());
        Ok(link)
    }

    fn update(&self, link: CandidateJobLink) -> Result<(), RepositoryError> {
        let mut guard = self.links.lock().expect("repository mutex poisoned");
        guard.insert(link.id.clone(), link);
        Ok(())
    }

    fn fetch(&self, id: &LinkId) -> Result<Option<CandidateJobLink>, RepositoryError> {
        let guard = self.links.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn find_by_pair(
        &self,
        candidate_id: &CandidateId,
        job_id: &JobId,
    ) -> Result<Option<CandidateJobLink>, RepositoryError> {
        let guard = self.links.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .find(|link| &link.candidate.candidate_id == candidate_id && &link.job_id == job_id)
            .cloned())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifications {
    events: Arc<Mutex<Vec<LinkNotification>>>,
}

impl MemoryNotifications {
    pub(super) fn events(&self) -> Vec<LinkNotification> {
        self.events.lock().expect("notification mutex poisoned").clone()
    }

    pub(super) fn templates(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .map(|event| event.template)
            .collect()
    }
}

impl NotificationPublisher for MemoryNotifications {
    fn publish(&self, notification: LinkNotification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct FailingNotifications;

impl NotificationPublisher for FailingNotifications {
    fn publish(&self, _notification: LinkNotification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay down".to_string()))
    }
}

pub(super) struct UnavailableRepository;

impl LinkRepository for UnavailableRepository {
    fn insert(&self, _link: CandidateJobLink) -> Result<CandidateJobLink, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _link: CandidateJobLink) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &LinkId) -> Result<Option<CandidateJobLink>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_pair(
        &self,
        _candidate_id: &CandidateId,
        _job_id: &JobId,
    ) -> Result<Option<CandidateJobLink>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// In-process [`DisclosureApi`] backed by a real service. It can be taken
/// offline to simulate network failures and slowed down to expose the
/// pending state.
pub(super) struct ServiceApi {
    service: Arc<MemoryService>,
    calls: AtomicUsize,
    offline: AtomicBool,
    yields: AtomicUsize,
}

impl ServiceApi {
    pub(super) fn new(service: Arc<MemoryService>) -> Self {
        Self {
            service,
            calls: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
            yields: AtomicUsize::new(0),
        }
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(super) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Yield to the executor this many times before answering.
    pub(super) fn set_yields(&self, yields: usize) {
        self.yields.store(yields, Ordering::SeqCst);
    }

    async fn call(
        &self,
        op: impl FnOnce(&MemoryService) -> Result<LinkView, DisclosureServiceError>,
    ) -> Result<LinkView, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        for _ in 0..self.yields.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(ApiError::Unavailable("connection reset".to_string()));
        }
        op(&self.service).map_err(|err| {
            let message = err.to_string();
            match err.failure_kind() {
                FailureKind::NotFound => ApiError::NotFound(message),
                FailureKind::IllegalTransition => ApiError::IllegalTransition(message),
                FailureKind::Unauthorized => ApiError::Unauthorized(message),
                FailureKind::NetworkFailure => ApiError::Unavailable(message),
            }
        })
    }
}

#[async_trait]
impl DisclosureApi for ServiceApi {
    async fn fetch_link_details(
        &self,
        viewer: &Viewer,
        link_id: &LinkId,
    ) -> Result<LinkView, ApiError> {
        self.call(|service| service.fetch_link(viewer, link_id))
            .await
    }

    async fn express_interest(
        &self,
        viewer: &Viewer,
        candidate_id: &CandidateId,
        job_id: &JobId,
    ) -> Result<LinkView, ApiError> {
        self.call(|service| service.express_interest(viewer, candidate_id, job_id))
            .await
    }

    async fn respond_to_interest(
        &self,
        viewer: &Viewer,
        link_id: &LinkId,
        accepted: bool,
        reason: Option<&str>,
    ) -> Result<LinkView, ApiError> {
        let reason = reason.map(str::to_string);
        self.call(|service| service.respond_to_interest(viewer, link_id, accepted, reason))
            .await
    }

    async fn respond_to_interview_invite(
        &self,
        viewer: &Viewer,
        link_id: &LinkId,
        accepted: bool,
    ) -> Result<LinkView, ApiError> {
        self.call(|service| service.respond_to_interview_invite(viewer, link_id, accepted))
            .await
    }

    async fn withdraw(
        &self,
        viewer: &Viewer,
        link_id: &LinkId,
        reason: Option<&str>,
    ) -> Result<LinkView, ApiError> {
        let reason = reason.map(str::to_string);
        self.call(|service| service.withdraw(viewer, link_id, reason))
            .await
    }
}

pub(super) async fn read_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}
