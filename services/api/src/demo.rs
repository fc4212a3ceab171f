use crate::infra::{in_memory_service, parse_role, seed_links, DEMO_COMPANY};
use clap::Args;
use std::sync::Arc;
use vagafacil::config::{ApiClientConfig, AppConfig};
use vagafacil::error::AppError;
use vagafacil::workflows::disclosure::{
    disclosure_router, CandidateJobLink, CompanyId, DisclosureSession, HttpDisclosureApi, LinkId,
    LinkView, SessionError, Viewer, ViewerRole,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reason the second candidate gives when declining.
    #[arg(long)]
    pub(crate) decline_reason: Option<String>,
    /// Skip the declined-interest portion of the demo.
    #[arg(long)]
    pub(crate) skip_decline: bool,
}

#[derive(Args, Debug)]
pub(crate) struct LinkShowArgs {
    /// Base URL of the disclosure API (defaults to APP_API_BASE_URL)
    #[arg(long)]
    pub(crate) api_url: Option<String>,
    /// Viewer role: company, candidate or admin
    #[arg(long, value_parser = parse_role)]
    pub(crate) role: ViewerRole,
    /// Company id, candidate id or operator handle, depending on role
    #[arg(long)]
    pub(crate) subject: String,
    /// Link to fetch
    #[arg(long)]
    pub(crate) link_id: String,
}

pub(crate) async fn run_link_show(args: LinkShowArgs) -> Result<(), AppError> {
    let LinkShowArgs {
        api_url,
        role,
        subject,
        link_id,
    } = args;

    let mut api_config = AppConfig::load()?.api;
    if let Some(url) = api_url {
        api_config.base_url = url.trim_end_matches('/').to_string();
    }

    let api = HttpDisclosureApi::new(api_config).map_err(SessionError::from)?;
    let session = DisclosureSession::new(Arc::new(api), Viewer { role, subject });
    let link_id = LinkId(link_id);
    match session.load(&link_id).await {
        Ok(view) => {
            render_view(&view);
            let actions = session.available_actions(&link_id);
            if !actions.is_empty() {
                let labels: Vec<&str> = actions.iter().map(|action| action.label()).collect();
                println!("Available actions: {}", labels.join(", "));
            }
            Ok(())
        }
        Err(err) => {
            if let Some(banner) = session.last_failure() {
                println!("{}", banner.message);
            }
            Err(err.into())
        }
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        decline_reason,
        skip_decline,
    } = args;

    println!("VagaFacil candidate disclosure demo");
    let (service, notifications) = in_memory_service();
    let links = seed_links(&service)?;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = disclosure_router(service.clone());
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            eprintln!("demo server stopped: {err}");
        }
    });
    println!("- In-process API listening on http://{addr}");

    let api = Arc::new(
        HttpDisclosureApi::new(ApiClientConfig {
            base_url: format!("http://{addr}"),
            ..ApiClientConfig::default()
        })
        .map_err(SessionError::from)?,
    );
    let company = DisclosureSession::new(
        api.clone(),
        Viewer::company(&CompanyId(DEMO_COMPANY.to_string())),
    );

    let mut links = links.into_iter();
    if let Some(link) = links.next() {
        println!("\nScenario 1: candidate accepts the company's interest");
        accept_flow(&api, &company, &link).await?;
    }

    if !skip_decline {
        if let Some(link) = links.next() {
            println!("\nScenario 2: candidate declines the company's interest");
            let reason = decline_reason
                .unwrap_or_else(|| "Looking for remote-only positions".to_string());
            decline_flow(&api, &company, &link, &reason).await?;
        }
    }

    let events = notifications.events();
    if events.is_empty() {
        println!("\nNotifications: none dispatched");
    } else {
        println!("\nNotifications:");
        for event in events {
            println!(
                "  - template={} -> {:?} ({})",
                event.template, event.recipient, event.link_id
            );
        }
    }

    Ok(())
}

async fn accept_flow(
    api: &Arc<HttpDisclosureApi>,
    company: &DisclosureSession<HttpDisclosureApi>,
    link: &CandidateJobLink,
) -> Result<(), AppError> {
    let candidate = DisclosureSession::new(
        api.clone(),
        Viewer::candidate(&link.candidate.candidate_id),
    );

    render_view(&company.load(&link.id).await?);
    let pending = company
        .express_interest(&link.candidate.candidate_id, &link.job_id)
        .await?;
    println!("  After interest:");
    render_view(&pending);

    candidate.respond_to_interest(&link.id, true, None).await?;
    println!("  Candidate accepted; company re-fetches:");
    render_view(&company.load(&link.id).await?);

    let selected = company.respond_to_interview_invite(&link.id, true).await?;
    println!("  Interview confirmed -> {}", selected.kanban_status());
    Ok(())
}

async fn decline_flow(
    api: &Arc<HttpDisclosureApi>,
    company: &DisclosureSession<HttpDisclosureApi>,
    link: &CandidateJobLink,
    reason: &str,
) -> Result<(), AppError> {
    let candidate = DisclosureSession::new(
        api.clone(),
        Viewer::candidate(&link.candidate.candidate_id),
    );

    company
        .express_interest(&link.candidate.candidate_id, &link.job_id)
        .await?;
    candidate
        .respond_to_interest(&link.id, false, Some(reason))
        .await?;
    println!("  Candidate declined (reason kept for analytics only)");
    render_view(&company.load(&link.id).await?);

    match company
        .express_interest(&link.candidate.candidate_id, &link.job_id)
        .await
    {
        Ok(view) => println!("  Unexpected: interest re-opened at {}", view.kanban_status()),
        Err(err) => println!(
            "  Renewed interest refused ({:?}): {}",
            err.failure_kind(),
            err.failure_kind().user_message()
        ),
    }
    Ok(())
}

fn render_view(view: &LinkView) {
    match view {
        LinkView::Company(company) => {
            println!(
                "  - {} [{}] tier {:?}, {} competencies, {} test scores",
                company.anonymous_id.0,
                company.flags.kanban_status,
                company.tier,
                company.competencies.len(),
                company.test_scores.len()
            );
            if let Some(personal) = &company.personal {
                println!("    contact: {} <{}>", personal.full_name, personal.email);
            }
        }
        LinkView::Candidate(candidate) => {
            println!(
                "  - link {} for {} [{}]",
                candidate.link_id, candidate.job_id.0, candidate.flags.kanban_status
            );
        }
        LinkView::Admin(admin) => match serde_json::to_string_pretty(admin) {
            Ok(json) => println!("{json}"),
            Err(err) => println!("  Admin payload unavailable: {err}"),
        },
    }
}
