//! Client-side controller for one signed-in viewer.
//!
//! The session caches only server-confirmed views. While a request is in
//! flight the link reports [`LinkState::Pending`] alongside its last
//! confirmed view; on failure the confirmed view is kept and a [`Banner`]
//! is recorded so the user can retry.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use super::client::{ApiError, DisclosureApi};
use super::domain::{
    CandidateId, DisclosureFlags, JobId, KanbanStatus, LinkId, Viewer, ViewerRole,
};
use super::failure::FailureKind;
use super::protocol::{self, ActionKind, LinkAction, Readiness, TransitionError};
use super::visibility::LinkView;

/// What the presentation layer should render for a link.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkState {
    Confirmed(LinkView),
    Pending {
        last_confirmed: LinkView,
        actions: Vec<ActionKind>,
    },
}

impl LinkState {
    /// The view to render; never ahead of what the server confirmed.
    pub fn view(&self) -> &LinkView {
        match self {
            LinkState::Confirmed(view) => view,
            LinkState::Pending { last_confirmed, .. } => last_confirmed,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, LinkState::Pending { .. })
    }
}

/// User-facing failure message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: FailureKind,
    pub message: String,
    pub retryable: bool,
}

impl Banner {
    fn new(kind: FailureKind) -> Self {
        Self {
            kind,
            message: kind.user_message().to_string(),
            retryable: kind.is_retryable(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("{action} is already in flight for {target}")]
    ActionInFlight { target: String, action: ActionKind },
}

impl SessionError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            SessionError::Api(err) => err.failure_kind(),
            SessionError::Transition(err) => err.failure_kind(),
            SessionError::ActionInFlight { .. } => FailureKind::IllegalTransition,
        }
    }
}

type InterestTarget = (CandidateId, JobId);

#[derive(Default)]
struct LinkEntry {
    confirmed: Option<LinkView>,
    pending: Vec<ActionKind>,
    banner: Option<Banner>,
}

#[derive(Default)]
struct SessionState {
    links: HashMap<LinkId, LinkEntry>,
    interest_targets: HashMap<InterestTarget, LinkId>,
    interest_in_flight: Vec<InterestTarget>,
    last_failure: Option<Banner>,
}

pub struct DisclosureSession<A> {
    api: Arc<A>,
    viewer: Viewer,
    state: Mutex<SessionState>,
}

impl<A> DisclosureSession<A>
where
    A: DisclosureApi,
{
    pub fn new(api: Arc<A>, viewer: Viewer) -> Self {
        Self {
            api,
            viewer,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn state(&self, link_id: &LinkId) -> Option<LinkState> {
        let state = self.lock();
        let entry = state.links.get(link_id)?;
        let confirmed = entry.confirmed.clone()?;
        if entry.pending.is_empty() {
            Some(LinkState::Confirmed(confirmed))
        } else {
            Some(LinkState::Pending {
                last_confirmed: confirmed,
                actions: entry.pending.clone(),
            })
        }
    }

    pub fn banner(&self, link_id: &LinkId) -> Option<Banner> {
        self.lock()
            .links
            .get(link_id)
            .and_then(|entry| entry.banner.clone())
    }

    /// Most recent failure across all links, including interest requests
    /// whose link was not known yet.
    pub fn last_failure(&self) -> Option<Banner> {
        self.lock().last_failure.clone()
    }

    /// Actions the UI may offer right now for a cached link.
    pub fn available_actions(&self, link_id: &LinkId) -> Vec<ActionKind> {
        let state = self.lock();
        let Some(entry) = state.links.get(link_id) else {
            return Vec::new();
        };
        let Some(view) = entry.confirmed.as_ref() else {
            return Vec::new();
        };
        protocol::available_actions(view.flags(), self.viewer.role)
            .into_iter()
            .filter(|kind| !entry.pending.contains(kind))
            .collect()
    }

    /// Re-fetch a link from the server. Call before any visibility-sensitive
    /// render; the cache may be stale.
    pub async fn load(&self, link_id: &LinkId) -> Result<LinkView, SessionError> {
        match self.api.fetch_link_details(&self.viewer, link_id).await {
            Ok(view) => {
                let mut state = self.lock();
                let entry = state.links.entry(link_id.clone()).or_default();
                entry.confirmed = Some(view.clone());
                entry.banner = None;
                Ok(view)
            }
            Err(err) => Err(self.record_failure(Some(link_id), err.into())),
        }
    }

    pub async fn express_interest(
        &self,
        candidate_id: &CandidateId,
        job_id: &JobId,
    ) -> Result<LinkView, SessionError> {
        let action = LinkAction::ExpressInterest;
        let target = (candidate_id.clone(), job_id.clone());

        let known = {
            let state = self.lock();
            let view = state
                .interest_targets
                .get(&target)
                .and_then(|link_id| state.links.get(link_id))
                .and_then(|entry| entry.confirmed.clone());
            view
        };
        let known_link = known.as_ref().map(|view| view.link_id().clone());

        let mut readiness = match known {
            Some(view) => precheck(view.flags(), &action, self.viewer.role)
                .map(|readiness| (readiness, Some(view))),
            None if ActionKind::ExpressInterest.permits(self.viewer.role) => {
                Ok((Readiness::Ready, None))
            }
            None => Err(TransitionError::RoleNotPermitted {
                action: ActionKind::ExpressInterest,
                role: self.viewer.role,
            }),
        };
        let refused = matches!(readiness, Err(TransitionError::IllegalTransition { .. }));
        if let (true, Some(link_id)) = (refused, known_link.as_ref()) {
            debug!(%link_id, "cached link refuses interest; re-fetching");
            let fresh = self.load(link_id).await?;
            readiness = precheck(fresh.flags(), &action, self.viewer.role)
                .map(|readiness| (readiness, Some(fresh)));
        }

        match readiness {
            Ok((Readiness::AlreadySatisfied, Some(view))) => {
                debug!(link_id = %view.link_id(), "interest already confirmed");
                return Ok(view);
            }
            Ok(_) => {}
            Err(err) => return Err(self.record_failure(known_link.as_ref(), err.into())),
        }

        {
            let mut state = self.lock();
            if state.interest_in_flight.contains(&target) {
                return Err(SessionError::ActionInFlight {
                    target: format!("candidate {} on job {}", candidate_id.0, job_id.0),
                    action: ActionKind::ExpressInterest,
                });
            }
            state.interest_in_flight.push(target.clone());
        }

        let result = self
            .api
            .express_interest(&self.viewer, candidate_id, job_id)
            .await;

        let mut state = self.lock();
        state.interest_in_flight.retain(|pending| pending != &target);
        match result {
            Ok(view) => {
                let link_id = view.link_id().clone();
                info!(%link_id, status = %view.kanban_status(), "interest confirmed");
                state.interest_targets.insert(target, link_id.clone());
                let entry = state.links.entry(link_id).or_default();
                entry.confirmed = Some(view.clone());
                entry.banner = None;
                Ok(view)
            }
            Err(err) => {
                drop(state);
                Err(self.record_failure(None, err.into()))
            }
        }
    }

    pub async fn respond_to_interest(
        &self,
        link_id: &LinkId,
        accepted: bool,
        reason: Option<&str>,
    ) -> Result<LinkView, SessionError> {
        let action = LinkAction::RespondToInterest {
            accepted,
            reason: reason.map(str::to_string),
        };
        let request = self
            .api
            .respond_to_interest(&self.viewer, link_id, accepted, reason);
        self.perform(link_id, action, request).await
    }

    pub async fn respond_to_interview_invite(
        &self,
        link_id: &LinkId,
        accepted: bool,
    ) -> Result<LinkView, SessionError> {
        let action = LinkAction::RespondToInterviewInvite { accepted };
        let request = self
            .api
            .respond_to_interview_invite(&self.viewer, link_id, accepted);
        self.perform(link_id, action, request).await
    }

    pub async fn withdraw(
        &self,
        link_id: &LinkId,
        reason: Option<&str>,
    ) -> Result<LinkView, SessionError> {
        let action = LinkAction::Withdraw {
            reason: reason.map(str::to_string),
        };
        let request = self.api.withdraw(&self.viewer, link_id, reason);
        self.perform(link_id, action, request).await
    }

    /// Pre-check, mark pending, await the server, then commit or keep the
    /// previous confirmed view. A cached view that refuses the action is
    /// re-fetched once before the refusal stands. `request` is not polled
    /// unless the pre-check says the action is still needed.
    async fn perform<F>(
        &self,
        link_id: &LinkId,
        action: LinkAction,
        request: F,
    ) -> Result<LinkView, SessionError>
    where
        F: Future<Output = Result<LinkView, ApiError>>,
    {
        let kind = action.kind();
        let cached = self
            .lock()
            .links
            .get(link_id)
            .and_then(|entry| entry.confirmed.clone());
        let (mut current, from_cache) = match cached {
            Some(view) => (view, true),
            None => (self.load(link_id).await?, false),
        };

        let mut readiness = precheck(current.flags(), &action, self.viewer.role);
        if from_cache && matches!(readiness, Err(TransitionError::IllegalTransition { .. })) {
            debug!(%link_id, action = %kind, "cached view refuses action; re-fetching");
            current = self.load(link_id).await?;
            readiness = precheck(current.flags(), &action, self.viewer.role);
        }

        match readiness {
            Ok(Readiness::AlreadySatisfied) => {
                debug!(%link_id, action = %kind, "action already satisfied locally");
                return Ok(current);
            }
            Ok(Readiness::Ready) => {}
            Err(err) => return Err(self.record_failure(Some(link_id), err.into())),
        }

        {
            let mut state = self.lock();
            let entry = state.links.entry(link_id.clone()).or_default();
            if entry.pending.contains(&kind) {
                return Err(SessionError::ActionInFlight {
                    target: format!("link {link_id}"),
                    action: kind,
                });
            }
            entry.pending.push(kind);
        }

        let result = request.await;

        let mut state = self.lock();
        let entry = state.links.entry(link_id.clone()).or_default();
        entry.pending.retain(|pending| *pending != kind);
        match result {
            Ok(view) => {
                info!(
                    %link_id,
                    action = %kind,
                    status = %view.kanban_status(),
                    unlocked = view.flags().personal_data_unlocked,
                    "server confirmed action"
                );
                entry.confirmed = Some(view.clone());
                entry.banner = None;
                Ok(view)
            }
            Err(err) => {
                drop(state);
                Err(self.record_failure(Some(link_id), err.into()))
            }
        }
    }

    fn record_failure(&self, link_id: Option<&LinkId>, err: SessionError) -> SessionError {
        let banner = Banner::new(err.failure_kind());
        warn!(
            link_id = link_id.map(|id| id.0.as_str()).unwrap_or("-"),
            role = %self.viewer.role,
            kind = ?banner.kind,
            error = %err,
            "disclosure action failed"
        );

        let mut state = self.lock();
        if let Some(link_id) = link_id {
            state.links.entry(link_id.clone()).or_default().banner = Some(banner.clone());
        }
        state.last_failure = Some(banner);
        err
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Local gate before a request is issued. Withdrawal reachability is the
/// server's call, so only role and terminal status are checked for it.
fn precheck(
    flags: &DisclosureFlags,
    action: &LinkAction,
    role: ViewerRole,
) -> Result<Readiness, TransitionError> {
    let LinkAction::Withdraw { .. } = action else {
        return protocol::check(flags, action, role);
    };

    let kind = action.kind();
    if !kind.permits(role) {
        return Err(TransitionError::RoleNotPermitted { action: kind, role });
    }
    match flags.kanban_status {
        KanbanStatus::Rejeitado => Ok(Readiness::AlreadySatisfied),
        status if status.is_terminal() => Err(TransitionError::IllegalTransition {
            action: kind,
            status,
        }),
        _ => Ok(Readiness::Ready),
    }
}
