//! Disclosure state resolution and role-filtered projections of a link.
//!
//! Resolution is a pure function of the link's [`DisclosureFlags`] and the
//! requesting role. Projections are the only way a link leaves the
//! authority, so personal fields can only reach a company through
//! [`VisibilityTier::Unlocked`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    AnonymousId, BusinessFlags, CandidateJobLink, CandidateProfile, CompanyId, DeclaredCompetency,
    DisclosureFlags, InterestResponse, JobId, KanbanStatus, LinkId, PersonalData, Rejection,
    TestScore, ViewerRole,
};

/// What a company may see about a candidate on a given link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisibilityTier {
    Anonymous,
    InterestPending,
    Unlocked,
}

/// Resolved visibility for a requesting role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Everything, including company notes.
    Administrator,
    /// The candidate's own data, without company notes.
    Owner,
    Company(VisibilityTier),
}

pub fn resolve_visibility(flags: &DisclosureFlags, role: ViewerRole) -> Visibility {
    match role {
        ViewerRole::Admin => Visibility::Administrator,
        ViewerRole::Candidate => Visibility::Owner,
        ViewerRole::Company => Visibility::Company(company_tier(flags)),
    }
}

/// Company tier, failing closed whenever the flags disagree with each other.
pub fn company_tier(flags: &DisclosureFlags) -> VisibilityTier {
    if flags.kanban_status == KanbanStatus::Rejeitado {
        return VisibilityTier::Anonymous;
    }

    if flags.personal_data_unlocked {
        let consistent = flags.candidate_consent_to_interview
            && flags.company_expressed_interest
            && flags.interest_accepted == Some(true);
        return if consistent {
            VisibilityTier::Unlocked
        } else {
            VisibilityTier::Anonymous
        };
    }

    if flags.company_expressed_interest {
        VisibilityTier::InterestPending
    } else {
        VisibilityTier::Anonymous
    }
}

/// Role-filtered link payload, tagged by `view` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum LinkView {
    Company(CompanyLinkView),
    Candidate(CandidateLinkView),
    Admin(AdminLinkView),
}

impl LinkView {
    pub fn role(&self) -> ViewerRole {
        match self {
            LinkView::Company(_) => ViewerRole::Company,
            LinkView::Candidate(_) => ViewerRole::Candidate,
            LinkView::Admin(_) => ViewerRole::Admin,
        }
    }

    pub fn link_id(&self) -> &LinkId {
        match self {
            LinkView::Company(view) => &view.link_id,
            LinkView::Candidate(view) => &view.link_id,
            LinkView::Admin(view) => &view.link.id,
        }
    }

    pub fn flags(&self) -> &DisclosureFlags {
        match self {
            LinkView::Company(view) => &view.flags,
            LinkView::Candidate(view) => &view.flags,
            LinkView::Admin(view) => &view.flags,
        }
    }

    pub fn kanban_status(&self) -> KanbanStatus {
        self.flags().kanban_status
    }

    /// Personal data carried by this view, if any.
    pub fn personal_data(&self) -> Option<&PersonalData> {
        match self {
            LinkView::Company(view) => view.personal.as_ref(),
            LinkView::Candidate(view) => Some(&view.profile.personal),
            LinkView::Admin(view) => Some(&view.link.candidate.personal),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyLinkView {
    pub link_id: LinkId,
    pub job_id: JobId,
    pub anonymous_id: AnonymousId,
    pub tier: VisibilityTier,
    pub flags: DisclosureFlags,
    pub competencies: Vec<DeclaredCompetency>,
    pub test_scores: Vec<TestScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub company_notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal: Option<PersonalData>,
    pub business: BusinessFlags,
}

impl CompanyLinkView {
    /// Re-resolve the tier from the flags and drop personal data they do not
    /// justify. Returns `true` when something had to be redacted.
    pub fn enforce_disclosure(&mut self) -> bool {
        let tier = company_tier(&self.flags);
        let mut redacted = tier != self.tier;
        self.tier = tier;
        if tier != VisibilityTier::Unlocked && self.personal.take().is_some() {
            redacted = true;
        }
        redacted
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateLinkView {
    pub link_id: LinkId,
    pub job_id: JobId,
    pub company_id: CompanyId,
    pub flags: DisclosureFlags,
    pub profile: CandidateProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_response: Option<InterestResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interview_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
    pub business: BusinessFlags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminLinkView {
    pub flags: DisclosureFlags,
    pub link: CandidateJobLink,
}

/// Project a link for the given role.
pub fn project(link: &CandidateJobLink, role: ViewerRole) -> LinkView {
    let flags = link.disclosure_flags();
    match resolve_visibility(&flags, role) {
        Visibility::Administrator => LinkView::Admin(AdminLinkView {
            flags,
            link: link.clone(),
        }),
        Visibility::Owner => LinkView::Candidate(CandidateLinkView {
            link_id: link.id.clone(),
            job_id: link.job_id.clone(),
            company_id: link.company_id.clone(),
            flags,
            profile: link.candidate.clone(),
            interest_response: link.interest_response.clone(),
            interview_date: link.interview_date,
            rejection: link.rejection.clone(),
            business: link.business,
        }),
        Visibility::Company(tier) => {
            let personal = match tier {
                VisibilityTier::Unlocked => Some(link.candidate.personal.clone()),
                VisibilityTier::Anonymous | VisibilityTier::InterestPending => None,
            };
            LinkView::Company(CompanyLinkView {
                link_id: link.id.clone(),
                job_id: link.job_id.clone(),
                anonymous_id: link.anonymous_id(),
                tier,
                flags,
                competencies: link.candidate.competencies.clone(),
                test_scores: link.candidate.test_scores.clone(),
                interview_date: link.interview_date,
                company_notes: link.company_notes.clone(),
                personal,
                business: link.business,
            })
        }
    }
}
