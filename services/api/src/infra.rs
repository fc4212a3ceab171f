use chrono::{Duration, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;
use vagafacil::workflows::disclosure::wire::SurfaceCandidateRequest;
use vagafacil::workflows::disclosure::{
    CandidateId, CandidateJobLink, CandidateProfile, CompanyId, DeclaredCompetency,
    DisclosureService, DisclosureServiceError, JobId, LinkId, LinkNotification, LinkRepository,
    NotificationError, NotificationPublisher, PersonalData, RepositoryError, TestScore, Viewer,
    ViewerRole,
};

pub(crate) type InMemoryDisclosureService =
    DisclosureService<InMemoryLinkRepository, NotificationLog>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryLinkRepository {
    links: Arc<Mutex<HashMap<LinkId, CandidateJobLink>>>,
}

impl InMemoryLinkRepository {
    fn guard(&self) -> Result<MutexGuard<'_, HashMap<LinkId, CandidateJobLink>>, RepositoryError> {
        self.links
            .lock()
            .map_err(|_| RepositoryError::Unavailable("link store poisoned".to_string()))
    }
}

impl LinkRepository for InMemoryLinkRepository {
    fn insert(&self, link: CandidateJobLink) -> Result<CandidateJobLink, RepositoryError> {
        let mut guard = self.guard()?;
        if guard.contains_key(&link.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(link.id.clone(), link.clone());
        Ok(link)
    }

    fn update(&self, link: CandidateJobLink) -> Result<(), RepositoryError> {
        let mut guard = self.guard()?;
        if guard.contains_key(&link.id) {
            guard.insert(link.id.clone(), link);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &LinkId) -> Result<Option<CandidateJobLink>, RepositoryError> {
        Ok(self.guard()?.get(id).cloned())
    }

    fn find_by_pair(
        &self,
        candidate_id: &CandidateId,
        job_id: &JobId,
    ) -> Result<Option<CandidateJobLink>, RepositoryError> {
        Ok(self
            .guard()?
            .values()
            .find(|link| &link.candidate.candidate_id == candidate_id && &link.job_id == job_id)
            .cloned())
    }
}

/// Logs every notification and keeps them for the demo transcript.
#[derive(Default, Clone)]
pub(crate) struct NotificationLog {
    events: Arc<Mutex<Vec<LinkNotification>>>,
}

impl NotificationPublisher for NotificationLog {
    fn publish(&self, notification: LinkNotification) -> Result<(), NotificationError> {
        info!(
            template = %notification.template,
            link_id = %notification.link_id,
            recipient = ?notification.recipient,
            "notification queued"
        );
        self.events
            .lock()
            .map_err(|_| NotificationError::Transport("notification log poisoned".to_string()))?
            .push(notification);
        Ok(())
    }
}

impl NotificationLog {
    pub(crate) fn events(&self) -> Vec<LinkNotification> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

pub(crate) fn in_memory_service() -> (Arc<InMemoryDisclosureService>, Arc<NotificationLog>) {
    let notifications = Arc::new(NotificationLog::default());
    let service = Arc::new(DisclosureService::new(
        Arc::new(InMemoryLinkRepository::default()),
        notifications.clone(),
    ));
    (service, notifications)
}

pub(crate) const DEMO_COMPANY: &str = "company-horizonte";

/// Sample candidates surfaced for one demo company.
pub(crate) fn demo_candidates() -> Vec<(JobId, CandidateProfile)> {
    let taken = Utc::now() - Duration::days(3);
    vec![
        (
            JobId("job-backend-rust".to_string()),
            CandidateProfile {
                candidate_id: CandidateId("cand-ana".to_string()),
                competencies: vec![
                    DeclaredCompetency {
                        name: "Rust".to_string(),
                        level: 4,
                    },
                    DeclaredCompetency {
                        name: "PostgreSQL".to_string(),
                        level: 3,
                    },
                ],
                test_scores: vec![TestScore {
                    test: "backend-fundamentals".to_string(),
                    score: 88,
                    completed_at: taken,
                }],
                personal: PersonalData {
                    full_name: "Ana Beatriz Souza".to_string(),
                    email: "ana.souza@example.com".to_string(),
                    phone: Some("+55 11 98765-4321".to_string()),
                    resume_url: Some("https://files.vagafacil.example/cv/ana.pdf".to_string()),
                },
            },
        ),
        (
            JobId("job-data-analyst".to_string()),
            CandidateProfile {
                candidate_id: CandidateId("cand-bruno".to_string()),
                competencies: vec![DeclaredCompetency {
                    name: "SQL".to_string(),
                    level: 5,
                }],
                test_scores: vec![TestScore {
                    test: "analytics-case".to_string(),
                    score: 76,
                    completed_at: taken,
                }],
                personal: PersonalData {
                    full_name: "Bruno Henrique Alves".to_string(),
                    email: "bruno.alves@example.com".to_string(),
                    phone: None,
                    resume_url: None,
                },
            },
        ),
    ]
}

/// Surface the demo candidates; pairs that already exist are skipped.
pub(crate) fn seed_links(
    service: &InMemoryDisclosureService,
) -> Result<Vec<CandidateJobLink>, DisclosureServiceError> {
    let operator = Viewer::admin("seed");
    let mut seeded = Vec::new();
    for (job_id, candidate) in demo_candidates() {
        let request = SurfaceCandidateRequest {
            job_id,
            company_id: CompanyId(DEMO_COMPANY.to_string()),
            candidate,
        };
        match service.surface_candidate(&operator, request) {
            Ok(link) => {
                info!(link_id = %link.id, job_id = %link.job_id.0, "seeded demo link");
                seeded.push(link);
            }
            Err(DisclosureServiceError::Repository(RepositoryError::Conflict)) => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(seeded)
}

pub(crate) fn parse_role(raw: &str) -> Result<ViewerRole, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "company" => Ok(ViewerRole::Company),
        "candidate" => Ok(ViewerRole::Candidate),
        "admin" => Ok(ViewerRole::Admin),
        other => Err(format!(
            "unknown role '{other}' (expected company, candidate or admin)"
        )),
    }
}
