//! HTTP contracts shared by the router and the client.
//!
//! Every response body is an [`ApiResponse`]; a payload that is not one of
//! its variants fails to deserialize and is treated as invalid by clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    CandidateId, CandidateProfile, CompanyId, JobId, KanbanStatus, Viewer, ViewerRole,
};
use super::failure::FailureKind;
use super::visibility::LinkView;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApiResponse {
    Link { link: LinkView },
    Error { code: ErrorCode, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    IllegalTransition,
    Unauthorized,
    Unavailable,
    BadRequest,
}

impl ErrorCode {
    pub fn failure_kind(self) -> FailureKind {
        match self {
            ErrorCode::NotFound => FailureKind::NotFound,
            ErrorCode::IllegalTransition | ErrorCode::BadRequest => FailureKind::IllegalTransition,
            ErrorCode::Unauthorized => FailureKind::Unauthorized,
            ErrorCode::Unavailable => FailureKind::NetworkFailure,
        }
    }
}

/// Caller identity carried as `?role=&subject=` on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerQuery {
    pub role: ViewerRole,
    pub subject: String,
}

impl From<ViewerQuery> for Viewer {
    fn from(query: ViewerQuery) -> Self {
        Viewer {
            role: query.role,
            subject: query.subject,
        }
    }
}

impl From<&Viewer> for ViewerQuery {
    fn from(viewer: &Viewer) -> Self {
        ViewerQuery {
            role: viewer.role,
            subject: viewer.subject.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceCandidateRequest {
    pub job_id: JobId,
    pub company_id: CompanyId,
    pub candidate: CandidateProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressInterestRequest {
    pub candidate_id: CandidateId,
    pub job_id: JobId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestResponseRequest {
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterviewResponseRequest {
    pub accepted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleInterviewRequest {
    pub interview_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceRequest {
    pub to: KanbanStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentRequest {
    pub completed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyNoteRequest {
    pub note: String,
}
