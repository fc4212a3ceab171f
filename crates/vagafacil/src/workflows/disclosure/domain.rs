use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a candidate/job pairing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CompanyId(pub String);

/// Stand-in for the candidate id in every company-facing payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnonymousId(pub String);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pipeline stage of a link, also used for kanban column placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KanbanStatus {
    AvaliacaoCompetencias,
    TestesRealizados,
    TestesNaoRealizados,
    InteresseEmpresa,
    EntrevistaAceita,
    Selecionado,
    Contratado,
    EmGarantia,
    GarantiaFinalizada,
    ReembolsoSolicitado,
    Rejeitado,
}

impl KanbanStatus {
    pub const fn label(self) -> &'static str {
        match self {
            KanbanStatus::AvaliacaoCompetencias => "AVALIACAO_COMPETENCIAS",
            KanbanStatus::TestesRealizados => "TESTES_REALIZADOS",
            KanbanStatus::TestesNaoRealizados => "TESTES_NAO_REALIZADOS",
            KanbanStatus::InteresseEmpresa => "INTERESSE_EMPRESA",
            KanbanStatus::EntrevistaAceita => "ENTREVISTA_ACEITA",
            KanbanStatus::Selecionado => "SELECIONADO",
            KanbanStatus::Contratado => "CONTRATADO",
            KanbanStatus::EmGarantia => "EM_GARANTIA",
            KanbanStatus::GarantiaFinalizada => "GARANTIA_FINALIZADA",
            KanbanStatus::ReembolsoSolicitado => "REEMBOLSO_SOLICITADO",
            KanbanStatus::Rejeitado => "REJEITADO",
        }
    }

    /// Position along the pipeline. Forward transitions never decrease it;
    /// the two test branches and the two warranty outcomes share a rank.
    pub const fn rank(self) -> u8 {
        match self {
            KanbanStatus::AvaliacaoCompetencias => 0,
            KanbanStatus::TestesRealizados | KanbanStatus::TestesNaoRealizados => 1,
            KanbanStatus::InteresseEmpresa => 2,
            KanbanStatus::EntrevistaAceita => 3,
            KanbanStatus::Selecionado => 4,
            KanbanStatus::Contratado => 5,
            KanbanStatus::EmGarantia => 6,
            KanbanStatus::GarantiaFinalizada | KanbanStatus::ReembolsoSolicitado => 7,
            KanbanStatus::Rejeitado => u8::MAX,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            KanbanStatus::Rejeitado
                | KanbanStatus::GarantiaFinalizada
                | KanbanStatus::ReembolsoSolicitado
        )
    }

    /// Stages in which personal data has not been released yet.
    pub const fn is_pre_unlock(self) -> bool {
        matches!(
            self,
            KanbanStatus::AvaliacaoCompetencias
                | KanbanStatus::TestesRealizados
                | KanbanStatus::TestesNaoRealizados
                | KanbanStatus::InteresseEmpresa
        )
    }

    /// Stages in which a company has not yet expressed interest.
    pub const fn is_assessment(self) -> bool {
        matches!(
            self,
            KanbanStatus::AvaliacaoCompetencias
                | KanbanStatus::TestesRealizados
                | KanbanStatus::TestesNaoRealizados
        )
    }

    /// Downstream hiring/billing stages reachable with `Advance`.
    pub fn next_pipeline_stages(self) -> &'static [KanbanStatus] {
        match self {
            KanbanStatus::Selecionado => &[KanbanStatus::Contratado],
            KanbanStatus::Contratado => &[KanbanStatus::EmGarantia],
            KanbanStatus::EmGarantia => &[
                KanbanStatus::GarantiaFinalizada,
                KanbanStatus::ReembolsoSolicitado,
            ],
            _ => &[],
        }
    }
}

impl fmt::Display for KanbanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Role of whoever is reading or acting on a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewerRole {
    Company,
    Candidate,
    Admin,
}

impl ViewerRole {
    pub const fn label(self) -> &'static str {
        match self {
            ViewerRole::Company => "company",
            ViewerRole::Candidate => "candidate",
            ViewerRole::Admin => "admin",
        }
    }
}

impl fmt::Display for ViewerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Explicit auth context handed to every resolver, protocol and service call.
///
/// `subject` is the company id for company viewers, the candidate id for
/// candidate viewers and an operator handle for admins.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewer {
    pub role: ViewerRole,
    pub subject: String,
}

impl Viewer {
    pub fn company(id: &CompanyId) -> Self {
        Self {
            role: ViewerRole::Company,
            subject: id.0.clone(),
        }
    }

    pub fn candidate(id: &CandidateId) -> Self {
        Self {
            role: ViewerRole::Candidate,
            subject: id.0.clone(),
        }
    }

    pub fn admin(operator: impl Into<String>) -> Self {
        Self {
            role: ViewerRole::Admin,
            subject: operator.into(),
        }
    }
}

/// Side of the handshake that performed an interest or rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Company,
    Candidate,
}

/// Competency the candidate declared on their profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredCompetency {
    pub name: String,
    pub level: u8,
}

/// Result of a skill test taken on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestScore {
    pub test: String,
    pub score: u8,
    pub completed_at: DateTime<Utc>,
}

/// Fields released to a company only once the link is unlocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalData {
    pub full_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub candidate_id: CandidateId,
    pub competencies: Vec<DeclaredCompetency>,
    pub test_scores: Vec<TestScore>,
    pub personal: PersonalData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestRecord {
    pub expressed_at: DateTime<Utc>,
}

/// Candidate's answer to a company's interest. `reason` is analytics-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestResponse {
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub responded_at: DateTime<Utc>,
}

/// How a link reached `REJEITADO`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub by: Party,
    pub from_status: KanbanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub rejected_at: DateTime<Utc>,
}

/// Hiring and warranty flags stored on the same record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessFlags {
    pub hired: bool,
    pub payment_confirmed: bool,
    pub warranty_active: bool,
    pub refund_requested: bool,
}

/// The record pairing one candidate with one job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateJobLink {
    pub id: LinkId,
    pub job_id: JobId,
    pub company_id: CompanyId,
    pub candidate: CandidateProfile,
    pub kanban_status: KanbanStatus,
    pub company_interest: Option<InterestRecord>,
    pub interest_response: Option<InterestResponse>,
    pub candidate_consent_to_interview: bool,
    pub interview_date: Option<DateTime<Utc>>,
    pub rejection: Option<Rejection>,
    pub company_notes: Vec<String>,
    pub business: BusinessFlags,
}

impl CandidateJobLink {
    /// A freshly surfaced link in `AVALIACAO_COMPETENCIAS`.
    pub fn surfaced(
        id: LinkId,
        job_id: JobId,
        company_id: CompanyId,
        candidate: CandidateProfile,
    ) -> Self {
        Self {
            id,
            job_id,
            company_id,
            candidate,
            kanban_status: KanbanStatus::AvaliacaoCompetencias,
            company_interest: None,
            interest_response: None,
            candidate_consent_to_interview: false,
            interview_date: None,
            rejection: None,
            company_notes: Vec::new(),
            business: BusinessFlags::default(),
        }
    }

    pub fn company_expressed_interest(&self) -> bool {
        self.company_interest.is_some()
    }

    /// Derived: consent, interest and an affirmative answer must all hold.
    pub fn personal_data_unlocked(&self) -> bool {
        self.candidate_consent_to_interview
            && self.company_expressed_interest()
            && self
                .interest_response
                .as_ref()
                .is_some_and(|response| response.accepted)
    }

    pub fn anonymous_id(&self) -> AnonymousId {
        AnonymousId(format!("anon-{}", self.id.0))
    }

    pub fn disclosure_flags(&self) -> DisclosureFlags {
        DisclosureFlags {
            kanban_status: self.kanban_status,
            company_expressed_interest: self.company_expressed_interest(),
            candidate_consent_to_interview: self.candidate_consent_to_interview,
            interest_accepted: self
                .interest_response
                .as_ref()
                .map(|response| response.accepted),
            personal_data_unlocked: self.personal_data_unlocked(),
        }
    }
}

/// Disclosure-relevant state of a link as reported by the authority.
///
/// Every view carries one, so clients can gate actions without seeing
/// personal data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisclosureFlags {
    pub kanban_status: KanbanStatus,
    pub company_expressed_interest: bool,
    pub candidate_consent_to_interview: bool,
    #[serde(default)]
    pub interest_accepted: Option<bool>,
    pub personal_data_unlocked: bool,
}
