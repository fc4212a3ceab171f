//! Interest/response handshake and the downstream pipeline transitions.
//!
//! [`check`] is pure and runs on [`DisclosureFlags`], so the same rules gate
//! both the client (against its cached view) and the authority (against the
//! stored link). [`apply`] mutates a link only after `check` reports
//! [`Readiness::Ready`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    CandidateJobLink, DisclosureFlags, InterestRecord, InterestResponse, KanbanStatus, Party,
    Rejection, ViewerRole,
};
use super::failure::FailureKind;

/// A request to move a link along the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    ExpressInterest,
    RespondToInterest {
        accepted: bool,
        reason: Option<String>,
    },
    RespondToInterviewInvite {
        accepted: bool,
    },
    ScheduleInterview {
        at: DateTime<Utc>,
    },
    Advance {
        to: KanbanStatus,
    },
    RecordAssessment {
        completed: bool,
    },
    Withdraw {
        reason: Option<String>,
    },
}

impl LinkAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            LinkAction::ExpressInterest => ActionKind::ExpressInterest,
            LinkAction::RespondToInterest { .. } => ActionKind::RespondToInterest,
            LinkAction::RespondToInterviewInvite { .. } => ActionKind::RespondToInterviewInvite,
            LinkAction::ScheduleInterview { .. } => ActionKind::ScheduleInterview,
            LinkAction::Advance { .. } => ActionKind::Advance,
            LinkAction::RecordAssessment { .. } => ActionKind::RecordAssessment,
            LinkAction::Withdraw { .. } => ActionKind::Withdraw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ExpressInterest,
    RespondToInterest,
    RespondToInterviewInvite,
    ScheduleInterview,
    Advance,
    RecordAssessment,
    Withdraw,
}

impl ActionKind {
    pub const ALL: [ActionKind; 7] = [
        ActionKind::ExpressInterest,
        ActionKind::RespondToInterest,
        ActionKind::RespondToInterviewInvite,
        ActionKind::ScheduleInterview,
        ActionKind::Advance,
        ActionKind::RecordAssessment,
        ActionKind::Withdraw,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ActionKind::ExpressInterest => "express_interest",
            ActionKind::RespondToInterest => "respond_to_interest",
            ActionKind::RespondToInterviewInvite => "respond_to_interview_invite",
            ActionKind::ScheduleInterview => "schedule_interview",
            ActionKind::Advance => "advance",
            ActionKind::RecordAssessment => "record_assessment",
            ActionKind::Withdraw => "withdraw",
        }
    }

    pub const fn permits(self, role: ViewerRole) -> bool {
        match self {
            ActionKind::ExpressInterest | ActionKind::Advance => {
                matches!(role, ViewerRole::Company | ViewerRole::Admin)
            }
            ActionKind::RespondToInterest => matches!(role, ViewerRole::Candidate),
            ActionKind::RespondToInterviewInvite | ActionKind::ScheduleInterview => {
                matches!(role, ViewerRole::Company)
            }
            ActionKind::RecordAssessment => matches!(role, ViewerRole::Admin),
            ActionKind::Withdraw => matches!(role, ViewerRole::Company | ViewerRole::Candidate),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether an action still has work to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    AlreadySatisfied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied {
        from: KanbanStatus,
        to: KanbanStatus,
    },
    AlreadySatisfied {
        status: KanbanStatus,
    },
}

impl TransitionOutcome {
    pub fn status(self) -> KanbanStatus {
        match self {
            TransitionOutcome::Applied { to, .. } => to,
            TransitionOutcome::AlreadySatisfied { status } => status,
        }
    }

    pub fn is_applied(self) -> bool {
        matches!(self, TransitionOutcome::Applied { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("{action} is not available while the link is {status}")]
    IllegalTransition {
        action: ActionKind,
        status: KanbanStatus,
    },
    #[error("{role} may not {action}")]
    RoleNotPermitted { action: ActionKind, role: ViewerRole },
}

impl TransitionError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            TransitionError::IllegalTransition { .. } => FailureKind::IllegalTransition,
            TransitionError::RoleNotPermitted { .. } => FailureKind::Unauthorized,
        }
    }
}

/// Whether `kind` may be offered to a user of `role` in the current state.
pub fn available_actions(flags: &DisclosureFlags, role: ViewerRole) -> Vec<ActionKind> {
    ActionKind::ALL
        .into_iter()
        .filter(|kind| kind.permits(role) && offered(flags, *kind))
        .collect()
}

fn offered(flags: &DisclosureFlags, kind: ActionKind) -> bool {
    let status = flags.kanban_status;
    match kind {
        ActionKind::ExpressInterest => status.is_assessment() && !flags.company_expressed_interest,
        ActionKind::RespondToInterest => {
            status == KanbanStatus::InteresseEmpresa && flags.interest_accepted.is_none()
        }
        ActionKind::RespondToInterviewInvite => status == KanbanStatus::EntrevistaAceita,
        ActionKind::ScheduleInterview => matches!(
            status,
            KanbanStatus::EntrevistaAceita | KanbanStatus::Selecionado
        ),
        ActionKind::Advance => !status.next_pipeline_stages().is_empty(),
        ActionKind::RecordAssessment => status == KanbanStatus::AvaliacaoCompetencias,
        ActionKind::Withdraw => status.is_pre_unlock(),
    }
}

/// Legality of `action` for `role` given the link's current flags.
pub fn check(
    flags: &DisclosureFlags,
    action: &LinkAction,
    role: ViewerRole,
) -> Result<Readiness, TransitionError> {
    let kind = action.kind();
    if !kind.permits(role) {
        return Err(TransitionError::RoleNotPermitted { action: kind, role });
    }

    let status = flags.kanban_status;
    let illegal = TransitionError::IllegalTransition {
        action: kind,
        status,
    };

    let satisfied = match action {
        LinkAction::ExpressInterest => {
            if status == KanbanStatus::Rejeitado {
                return Err(illegal);
            }
            flags.company_expressed_interest
        }
        LinkAction::RespondToInterest { accepted, .. } => {
            flags.interest_accepted == Some(*accepted)
        }
        LinkAction::RespondToInterviewInvite { accepted: true } => {
            status != KanbanStatus::Rejeitado
                && status.rank() >= KanbanStatus::Selecionado.rank()
        }
        LinkAction::RespondToInterviewInvite { accepted: false } => {
            status == KanbanStatus::Rejeitado && flags.candidate_consent_to_interview
        }
        LinkAction::ScheduleInterview { .. } => false,
        LinkAction::Advance { to } => {
            status == *to
                && matches!(
                    to,
                    KanbanStatus::Contratado
                        | KanbanStatus::EmGarantia
                        | KanbanStatus::GarantiaFinalizada
                        | KanbanStatus::ReembolsoSolicitado
                )
        }
        LinkAction::RecordAssessment { completed } => status == assessment_target(*completed),
        LinkAction::Withdraw { .. } => status == KanbanStatus::Rejeitado,
    };

    if satisfied {
        return Ok(Readiness::AlreadySatisfied);
    }

    let ready = offered(flags, kind)
        && match action {
            LinkAction::Advance { to } => status.next_pipeline_stages().contains(to),
            _ => true,
        };

    if ready {
        Ok(Readiness::Ready)
    } else {
        Err(illegal)
    }
}

fn assessment_target(completed: bool) -> KanbanStatus {
    if completed {
        KanbanStatus::TestesRealizados
    } else {
        KanbanStatus::TestesNaoRealizados
    }
}

/// Apply `action` to `link`, leaving it untouched unless the action is legal
/// and not yet satisfied.
pub fn apply(
    link: &mut CandidateJobLink,
    action: &LinkAction,
    role: ViewerRole,
    at: DateTime<Utc>,
) -> Result<TransitionOutcome, TransitionError> {
    let from = link.kanban_status;
    if check(&link.disclosure_flags(), action, role)? == Readiness::AlreadySatisfied {
        return Ok(TransitionOutcome::AlreadySatisfied { status: from });
    }

    match action {
        LinkAction::ExpressInterest => {
            link.company_interest = Some(InterestRecord { expressed_at: at });
            link.kanban_status = KanbanStatus::InteresseEmpresa;
        }
        LinkAction::RespondToInterest { accepted, reason } => {
            link.interest_response = Some(InterestResponse {
                accepted: *accepted,
                reason: reason.clone(),
                responded_at: at,
            });
            if *accepted {
                link.candidate_consent_to_interview = true;
                link.kanban_status = KanbanStatus::EntrevistaAceita;
            } else {
                reject(link, Party::Candidate, reason.clone(), at);
            }
        }
        LinkAction::RespondToInterviewInvite { accepted } => {
            if *accepted {
                link.kanban_status = KanbanStatus::Selecionado;
            } else {
                reject(link, Party::Company, None, at);
            }
        }
        LinkAction::ScheduleInterview { at: date } => {
            if link.interview_date == Some(*date) {
                return Ok(TransitionOutcome::AlreadySatisfied { status: from });
            }
            link.interview_date = Some(*date);
        }
        LinkAction::Advance { to } => {
            link.kanban_status = *to;
            let flags = &mut link.business;
            match to {
                KanbanStatus::Contratado => flags.hired = true,
                KanbanStatus::EmGarantia => {
                    flags.payment_confirmed = true;
                    flags.warranty_active = true;
                }
                KanbanStatus::GarantiaFinalizada => flags.warranty_active = false,
                KanbanStatus::ReembolsoSolicitado => {
                    flags.warranty_active = false;
                    flags.refund_requested = true;
                }
                _ => {}
            }
        }
        LinkAction::RecordAssessment { completed } => {
            link.kanban_status = assessment_target(*completed);
        }
        LinkAction::Withdraw { reason } => {
            let party = match role {
                ViewerRole::Candidate => Party::Candidate,
                ViewerRole::Company | ViewerRole::Admin => Party::Company,
            };
            reject(link, party, reason.clone(), at);
        }
    }

    Ok(TransitionOutcome::Applied {
        from,
        to: link.kanban_status,
    })
}

fn reject(link: &mut CandidateJobLink, by: Party, reason: Option<String>, at: DateTime<Utc>) {
    link.rejection = Some(Rejection {
        by,
        from_status: link.kanban_status,
        reason,
        rejected_at: at,
    });
    link.kanban_status = KanbanStatus::Rejeitado;
}
