//! Client for the remote disclosure API.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ApiClientConfig;

use super::domain::{CandidateId, JobId, LinkId, Viewer};
use super::failure::FailureKind;
use super::visibility::LinkView;
use super::wire::{
    ApiResponse, ErrorCode, ExpressInterestRequest, InterestResponseRequest,
    InterviewResponseRequest, ViewerQuery, WithdrawRequest,
};

/// Logical operations the workflow consumes from the external API.
///
/// Each call returns the authoritative post-transition view; implementations
/// never fabricate state locally.
#[async_trait]
pub trait DisclosureApi: Send + Sync {
    async fn fetch_link_details(
        &self,
        viewer: &Viewer,
        link_id: &LinkId,
    ) -> Result<LinkView, ApiError>;

    async fn express_interest(
        &self,
        viewer: &Viewer,
        candidate_id: &CandidateId,
        job_id: &JobId,
    ) -> Result<LinkView, ApiError>;

    async fn respond_to_interest(
        &self,
        viewer: &Viewer,
        link_id: &LinkId,
        accepted: bool,
        reason: Option<&str>,
    ) -> Result<LinkView, ApiError>;

    async fn respond_to_interview_invite(
        &self,
        viewer: &Viewer,
        link_id: &LinkId,
        accepted: bool,
    ) -> Result<LinkView, ApiError>;

    async fn withdraw(
        &self,
        viewer: &Viewer,
        link_id: &LinkId,
        reason: Option<&str>,
    ) -> Result<LinkView, ApiError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("illegal transition: {0}")]
    IllegalTransition(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("disclosure API unavailable: {0}")]
    Unavailable(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("invalid API url: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ApiError::NotFound(_) => FailureKind::NotFound,
            ApiError::IllegalTransition(_) => FailureKind::IllegalTransition,
            ApiError::Unauthorized(_) => FailureKind::Unauthorized,
            ApiError::Unavailable(_)
            | ApiError::Network(_)
            | ApiError::InvalidResponse(_)
            | ApiError::InvalidUrl(_) => FailureKind::NetworkFailure,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.failure_kind().is_retryable()
    }

    fn from_code(code: ErrorCode, message: String) -> Self {
        match code {
            ErrorCode::NotFound => ApiError::NotFound(message),
            ErrorCode::IllegalTransition | ErrorCode::BadRequest => {
                ApiError::IllegalTransition(message)
            }
            ErrorCode::Unauthorized => ApiError::Unauthorized(message),
            ErrorCode::Unavailable => ApiError::Unavailable(message),
        }
    }
}

/// reqwest-backed [`DisclosureApi`]. Issues exactly one request per call;
/// retries are left to the user.
pub struct HttpDisclosureApi {
    http: Client,
    config: ApiClientConfig,
}

impl HttpDisclosureApi {
    pub fn new(config: ApiClientConfig) -> Result<Self, ApiError> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Base URL extended with `segments`, each percent-encoded so ids
    /// containing `/`, `?` or `#` stay inside their own path segment.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|err| ApiError::InvalidUrl(format!("{}: {err}", self.config.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.config.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn link_url(&self, link_id: &LinkId, action: Option<&str>) -> Result<Url, ApiError> {
        let mut segments = vec!["api", "v1", "links", link_id.0.as_str()];
        segments.extend(action);
        self.url(&segments)
    }

    async fn post<B: Serialize + Sync>(
        &self,
        viewer: &Viewer,
        url: Url,
        body: &B,
    ) -> Result<LinkView, ApiError> {
        let request = self
            .http
            .post(url)
            .query(&ViewerQuery::from(viewer))
            .json(body);
        self.send(viewer, request).await
    }

    async fn send(&self, viewer: &Viewer, request: RequestBuilder) -> Result<LinkView, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!(%status, role = %viewer.role, "disclosure API responded");

        let envelope: ApiResponse = serde_json::from_str(&body).map_err(|err| {
            warn!(%status, error = %err, "unrecognized disclosure API payload");
            ApiError::InvalidResponse(format!("HTTP {status}: {err}"))
        })?;

        match envelope {
            ApiResponse::Link { link } => accept_view(viewer, link),
            ApiResponse::Error { code, message } => Err(ApiError::from_code(code, message)),
        }
    }
}

/// Boundary validation: the view must match the requester's role, and
/// company views are re-resolved so personal data never outruns the flags.
fn accept_view(viewer: &Viewer, view: LinkView) -> Result<LinkView, ApiError> {
    if view.role() != viewer.role {
        return Err(ApiError::InvalidResponse(format!(
            "expected a {} view, received a {} view",
            viewer.role,
            view.role()
        )));
    }

    match view {
        LinkView::Company(mut company) => {
            if company.enforce_disclosure() {
                warn!(
                    link_id = %company.link_id,
                    tier = ?company.tier,
                    "redacted personal data not justified by disclosure flags"
                );
            }
            Ok(LinkView::Company(company))
        }
        other => Ok(other),
    }
}

#[async_trait]
impl DisclosureApi for HttpDisclosureApi {
    async fn fetch_link_details(
        &self,
        viewer: &Viewer,
        link_id: &LinkId,
    ) -> Result<LinkView, ApiError> {
        let request = self
            .http
            .get(self.link_url(link_id, None)?)
            .query(&ViewerQuery::from(viewer));
        self.send(viewer, request).await
    }

    async fn express_interest(
        &self,
        viewer: &Viewer,
        candidate_id: &CandidateId,
        job_id: &JobId,
    ) -> Result<LinkView, ApiError> {
        let body = ExpressInterestRequest {
            candidate_id: candidate_id.clone(),
            job_id: job_id.clone(),
        };
        let url = self.url(&["api", "v1", "interests"])?;
        self.post(viewer, url, &body).await
    }

    async fn respond_to_interest(
        &self,
        viewer: &Viewer,
        link_id: &LinkId,
        accepted: bool,
        reason: Option<&str>,
    ) -> Result<LinkView, ApiError> {
        let body = InterestResponseRequest {
            accepted,
            reason: reason.map(str::to_string),
        };
        let url = self.link_url(link_id, Some("interest-response"))?;
        self.post(viewer, url, &body).await
    }

    async fn respond_to_interview_invite(
        &self,
        viewer: &Viewer,
        link_id: &LinkId,
        accepted: bool,
    ) -> Result<LinkView, ApiError> {
        let body = InterviewResponseRequest { accepted };
        let url = self.link_url(link_id, Some("interview-response"))?;
        self.post(viewer, url, &body).await
    }

    async fn withdraw(
        &self,
        viewer: &Viewer,
        link_id: &LinkId,
        reason: Option<&str>,
    ) -> Result<LinkView, ApiError> {
        let body = WithdrawRequest {
            reason: reason.map(str::to_string),
        };
        let url = self.link_url(link_id, Some("withdraw"))?;
        self.post(viewer, url, &body).await
    }
}
