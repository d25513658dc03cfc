use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use talent_pipeline::config::AppConfig;
use talent_pipeline::error::AppError;
use talent_pipeline::workflows::admission::memory::{
    InMemoryAppointments, InMemoryCompanies, InMemoryCompanyMatches, InMemoryProfiles,
};
use talent_pipeline::workflows::admission::{
    AdmissionNoticeSettings, AdmissionState, AppointmentDesk, AppointmentPorts, CompanyMatcher,
    MatcherPorts,
};
use talent_pipeline::workflows::applications::memory::{
    InMemoryApplications, InMemoryMatchResults, InMemoryTransmissionLog,
};
use talent_pipeline::workflows::applications::{
    ApplicationTriageEngine, EngineSettings, StorageDocumentSource, TriagePorts,
};
use talent_pipeline::workflows::notifications::{
    LoggingDispatcher, NotificationDispatcher, SmtpDispatcher,
};
use talent_pipeline::workflows::retry::{RetryPolicy, RetryingDispatcher, RetryingScoreProvider};
use talent_pipeline::workflows::scoring::{ProcessScoreProvider, ScoreProvider};
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Everything the HTTP layer and background jobs share.
pub(crate) struct Pipeline {
    pub(crate) engine: Arc<ApplicationTriageEngine>,
    pub(crate) admission: AdmissionState,
}

fn dispatcher(config: &AppConfig) -> Result<Arc<dyn NotificationDispatcher>, AppError> {
    match &config.smtp {
        Some(smtp) => {
            let transport = SmtpDispatcher::new(smtp, &config.notifications)?;
            info!(host = %smtp.host, port = smtp.port, "notifications delivered over SMTP");
            Ok(Arc::new(RetryingDispatcher::new(
                transport,
                RetryPolicy::default(),
            )))
        }
        None => {
            warn!("SMTP_HOST not set; notifications are logged and not delivered");
            Ok(Arc::new(LoggingDispatcher))
        }
    }
}

fn scorer(config: &AppConfig) -> Arc<dyn ScoreProvider> {
    let process = ProcessScoreProvider::new(
        config.scoring.program.clone(),
        config.scoring.script.clone(),
        config.scoring.timeout,
    );
    Arc::new(RetryingScoreProvider::new(
        process,
        config.scoring.retry_policy(),
    ))
}

/// Wire the engines over in-process repositories and the configured integrations.
pub(crate) fn build_pipeline(config: &AppConfig) -> Result<Pipeline, AppError> {
    let settings = EngineSettings::from_config(config)?;
    let notifications = dispatcher(config)?;
    let scorer = scorer(config);

    let engine = ApplicationTriageEngine::new(
        TriagePorts {
            applications: Arc::new(InMemoryApplications::default()),
            match_results: Arc::new(InMemoryMatchResults::default()),
            transmissions: Arc::new(InMemoryTransmissionLog::default()),
            documents: Arc::new(StorageDocumentSource::new(&config.documents)),
            notifications: notifications.clone(),
            scorer: scorer.clone(),
        },
        settings.clone(),
    );

    let profiles = Arc::new(InMemoryProfiles::default());
    let companies = Arc::new(InMemoryCompanies::default());
    let matcher = CompanyMatcher::new(
        MatcherPorts {
            profiles: profiles.clone(),
            companies: companies.clone(),
            matches: Arc::new(InMemoryCompanyMatches::default()),
            scorer,
        },
        settings.thresholds,
        settings.score_timeout,
    );
    let desk = AppointmentDesk::new(
        AppointmentPorts {
            profiles,
            companies,
            appointments: Arc::new(InMemoryAppointments::default()),
            notifications,
        },
        AdmissionNoticeSettings {
            admin_email: settings.notices.admin_email.clone(),
            frontend_base_url: settings.notices.frontend_base_url.clone(),
        },
    );

    Ok(Pipeline {
        engine: Arc::new(engine),
        admission: AdmissionState {
            matcher: Arc::new(matcher),
            appointments: Arc::new(desk),
        },
    })
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
