use super::common::*;
use std::sync::Arc;

use crate::workflows::disclosure::domain::{KanbanStatus, LinkId};
use crate::workflows::disclosure::failure::FailureKind;
use crate::workflows::disclosure::protocol::ActionKind;
use crate::workflows::disclosure::session::{DisclosureSession, SessionError};
use crate::workflows::disclosure::visibility::{LinkView, VisibilityTier};

struct Harness {
    service: Arc<MemoryService>,
    api: Arc<ServiceApi>,
}

impl Harness {
    fn new() -> Self {
        let (service, _, _) = build_service();
        let service = Arc::new(service);
        let api = Arc::new(ServiceApi::new(service.clone()));
        Self { service, api }
    }

    fn company(&self) -> DisclosureSession<ServiceApi> {
        DisclosureSession::new(self.api.clone(), company())
    }

    fn candidate(&self, suffix: &str) -> DisclosureSession<ServiceApi> {
        DisclosureSession::new(self.api.clone(), candidate(suffix))
    }

    fn service_link_untouched(&self, link_id: &LinkId) -> bool {
        self.service
            .fetch_link(&admin(), link_id)
            .map(|view| view.kanban_status() == KanbanStatus::AvaliacaoCompetencias)
            .unwrap_or(false)
    }
}

fn tier(view: &LinkView) -> VisibilityTier {
    match view {
        LinkView::Company(company) => company.tier,
        other => panic!("expected company view, got {other:?}"),
    }
}

#[tokio::test]
async fn candidate_acceptance_unlocks_the_company_session() {
    let harness = Harness::new();
    let link_id = surfaced(&harness.service, "c1");
    let company_session = harness.company();
    let candidate_session = harness.candidate("c1");

    let pending = company_session
        .express_interest(&candidate_id("c1"), &job_id("c1"))
        .await
        .expect("interest");
    assert_eq!(tier(&pending), VisibilityTier::InterestPending);

    candidate_session.load(&link_id).await.expect("load");
    assert_eq!(
        candidate_session.available_actions(&link_id),
        vec![ActionKind::RespondToInterest, ActionKind::Withdraw]
    );
    let accepted = candidate_session
        .respond_to_interest(&link_id, true, None)
        .await
        .expect("accepted");
    assert_eq!(accepted.kanban_status(), KanbanStatus::EntrevistaAceita);

    // The company only sees the unlock after re-fetching.
    let cached = company_session.state(&link_id).expect("cached");
    assert_eq!(tier(cached.view()), VisibilityTier::InterestPending);

    let refreshed = company_session.load(&link_id).await.expect("refetch");
    assert_eq!(tier(&refreshed), VisibilityTier::Unlocked);
    assert!(refreshed.personal_data().is_some());
}

#[tokio::test]
async fn declining_with_a_reason_leaves_the_company_anonymous() {
    let harness = Harness::new();
    let link_id = surfaced(&harness.service, "c2");
    let company_session = harness.company();
    company_session
        .express_interest(&candidate_id("c2"), &job_id("c2"))
        .await
        .expect("interest");

    let declined = harness
        .candidate("c2")
        .respond_to_interest(&link_id, false, Some("position is on-site only"))
        .await
        .expect("declined");
    assert_eq!(declined.kanban_status(), KanbanStatus::Rejeitado);

    let view = company_session.load(&link_id).await.expect("refetch");
    assert_eq!(tier(&view), VisibilityTier::Anonymous);
    assert!(view.personal_data().is_none());
    assert!(company_session.available_actions(&link_id).is_empty());
}

#[tokio::test]
async fn network_failures_keep_the_confirmed_view_until_retry() {
    let harness = Harness::new();
    let link_id = surfaced(&harness.service, "c3");
    let company_session = harness.company();
    company_session
        .express_interest(&candidate_id("c3"), &job_id("c3"))
        .await
        .expect("interest");
    let candidate_session = harness.candidate("c3");
    let before = candidate_session.load(&link_id).await.expect("load");

    harness.api.set_offline(true);
    let err = candidate_session
        .respond_to_interest(&link_id, true, None)
        .await
        .expect_err("offline");
    assert_eq!(err.failure_kind(), FailureKind::NetworkFailure);

    let banner = candidate_session.banner(&link_id).expect("banner shown");
    assert!(banner.retryable);
    assert_eq!(banner.kind, FailureKind::NetworkFailure);
    let state = candidate_session.state(&link_id).expect("cached");
    assert!(!state.is_pending());
    assert_eq!(state.view(), &before);
    assert_eq!(
        candidate_session.available_actions(&link_id),
        vec![ActionKind::RespondToInterest, ActionKind::Withdraw]
    );

    harness.api.set_offline(false);
    let accepted = candidate_session
        .respond_to_interest(&link_id, true, None)
        .await
        .expect("retry succeeds");
    assert_eq!(accepted.kanban_status(), KanbanStatus::EntrevistaAceita);
    assert!(candidate_session.banner(&link_id).is_none());
}

#[tokio::test]
async fn satisfied_actions_do_not_reach_the_server() {
    let harness = Harness::new();
    let link_id = surfaced(&harness.service, "c4");
    let company_session = harness.company();

    let first = company_session
        .express_interest(&candidate_id("c4"), &job_id("c4"))
        .await
        .expect("first");
    let calls = harness.api.calls();

    let second = company_session
        .express_interest(&candidate_id("c4"), &job_id("c4"))
        .await
        .expect("second");
    assert_eq!(first, second);
    assert_eq!(harness.api.calls(), calls);

    let candidate_session = harness.candidate("c4");
    candidate_session
        .respond_to_interest(&link_id, true, None)
        .await
        .expect("accepted");
    let calls = harness.api.calls();
    candidate_session
        .respond_to_interest(&link_id, true, None)
        .await
        .expect("repeat");
    assert_eq!(harness.api.calls(), calls);
}

#[tokio::test]
async fn illegal_actions_are_refused_without_submitting() {
    let harness = Harness::new();
    let link_id = surfaced(&harness.service, "c5");
    let candidate_session = harness.candidate("c5");
    candidate_session.load(&link_id).await.expect("load");
    let calls = harness.api.calls();

    let err = candidate_session
        .respond_to_interest(&link_id, true, None)
        .await
        .expect_err("no interest yet");
    assert!(matches!(err, SessionError::Transition(_)));
    assert_eq!(err.failure_kind(), FailureKind::IllegalTransition);
    // One re-fetch confirms the refusal; no response is submitted.
    assert_eq!(harness.api.calls(), calls + 1);
    assert!(harness.service_link_untouched(&link_id));
    let banner = candidate_session.banner(&link_id).expect("banner");
    assert!(!banner.retryable);
}

#[tokio::test]
async fn stale_caches_still_get_the_authoritative_refusal() {
    let harness = Harness::new();
    let link_id = surfaced(&harness.service, "c6");
    let company_session = harness.company();
    company_session.load(&link_id).await.expect("load");

    harness
        .candidate("c6")
        .withdraw(&link_id, Some("found another job"))
        .await
        .expect("withdrawn");

    // No confirmed interest is cached for this pair, so the request goes out.
    let err = company_session
        .express_interest(&candidate_id("c6"), &job_id("c6"))
        .await
        .expect_err("server refuses");
    assert_eq!(err.failure_kind(), FailureKind::IllegalTransition);
    assert!(company_session.last_failure().is_some());

    let view = company_session.load(&link_id).await.expect("refetch");
    assert_eq!(view.kanban_status(), KanbanStatus::Rejeitado);
    assert_eq!(tier(&view), VisibilityTier::Anonymous);
}

#[tokio::test]
async fn stale_cache_refusals_are_rechecked_with_the_server() {
    let harness = Harness::new();
    let link_id = surfaced(&harness.service, "c8");
    let company_session = harness.company();
    company_session
        .express_interest(&candidate_id("c8"), &job_id("c8"))
        .await
        .expect("interest");

    // Accepted from the candidate's own session; the company cache still
    // shows INTERESSE_EMPRESA.
    harness
        .candidate("c8")
        .respond_to_interest(&link_id, true, None)
        .await
        .expect("accepted");
    let cached = company_session.state(&link_id).expect("cached");
    assert_eq!(cached.view().kanban_status(), KanbanStatus::InteresseEmpresa);

    let calls = harness.api.calls();
    let selected = company_session
        .respond_to_interview_invite(&link_id, true)
        .await
        .expect("legal on the server");
    assert_eq!(selected.kanban_status(), KanbanStatus::Selecionado);
    assert_eq!(harness.api.calls(), calls + 2);
    assert!(company_session.banner(&link_id).is_none());
    assert_eq!(
        company_session
            .state(&link_id)
            .expect("cached")
            .view()
            .kanban_status(),
        KanbanStatus::Selecionado
    );
}

#[tokio::test]
async fn stale_cache_refusals_stand_when_the_server_agrees() {
    let harness = Harness::new();
    let link_id = surfaced(&harness.service, "c9");
    let company_session = harness.company();
    company_session
        .express_interest(&candidate_id("c9"), &job_id("c9"))
        .await
        .expect("interest");
    harness
        .candidate("c9")
        .respond_to_interest(&link_id, false, None)
        .await
        .expect("declined");

    let calls = harness.api.calls();
    let err = company_session
        .respond_to_interview_invite(&link_id, true)
        .await
        .expect_err("rejected on the server too");
    assert_eq!(err.failure_kind(), FailureKind::IllegalTransition);
    assert_eq!(harness.api.calls(), calls + 1);
    let banner = company_session.banner(&link_id).expect("banner");
    assert!(!banner.retryable);
    assert_eq!(
        company_session
            .state(&link_id)
            .expect("refreshed")
            .view()
            .kanban_status(),
        KanbanStatus::Rejeitado
    );
}

#[tokio::test]
async fn in_flight_actions_report_pending_and_block_duplicates() {
    let harness = Harness::new();
    let link_id = surfaced(&harness.service, "c7");
    harness
        .company()
        .express_interest(&candidate_id("c7"), &job_id("c7"))
        .await
        .expect("interest");
    let session = harness.candidate("c7");
    let before = session.load(&link_id).await.expect("load");
    harness.api.set_yields(4);

    let observe = async {
        let mut seen = None;
        for _ in 0..16 {
            if let Some(state) = session.state(&link_id).filter(|state| state.is_pending()) {
                let duplicate = session.respond_to_interest(&link_id, true, None).await;
                let offered = session.available_actions(&link_id);
                seen = Some((state, duplicate, offered));
                break;
            }
            tokio::task::yield_now().await;
        }
        seen
    };

    let (result, seen) = tokio::join!(session.respond_to_interest(&link_id, true, None), observe);

    let (state, duplicate, offered) = seen.expect("pending state observed");
    assert_eq!(state.view(), &before);
    assert!(matches!(
        duplicate,
        Err(SessionError::ActionInFlight {
            action: ActionKind::RespondToInterest,
            ..
        })
    ));
    assert!(!offered.contains(&ActionKind::RespondToInterest));

    let accepted = result.expect("accepted");
    assert_eq!(accepted.kanban_status(), KanbanStatus::EntrevistaAceita);
    assert!(!session.state(&link_id).expect("cached").is_pending());
}

#[tokio::test]
async fn unknown_links_surface_not_found() {
    let harness = Harness::new();
    let session = harness.company();
    let missing = LinkId("link-nowhere".to_string());

    let err = session.load(&missing).await.expect_err("missing");
    assert_eq!(err.failure_kind(), FailureKind::NotFound);
    assert!(session.state(&missing).is_none());
    assert_eq!(
        session.last_failure().map(|banner| banner.kind),
        Some(FailureKind::NotFound)
    );
}
