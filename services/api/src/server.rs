use crate::cli::ServeArgs;
use crate::infra::{build_pipeline, AppState};
use crate::routes::with_pipeline_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use talent_pipeline::config::AppConfig;
use talent_pipeline::error::AppError;
use talent_pipeline::telemetry;
use talent_pipeline::workflows::admission::AppointmentDesk;
use tracing::{info, warn};

const REMINDER_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Sweep for due appointment reminders every five minutes.
fn spawn_reminder_sweeps(desk: Arc<AppointmentDesk>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(REMINDER_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(err) = desk.send_due_reminders(Utc::now()).await {
                warn!(error = %err, "reminder sweep failed");
            }
        }
    });
}

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let pipeline = build_pipeline(&config)?;
    spawn_reminder_sweeps(pipeline.admission.appointments.clone());

    let app = with_pipeline_routes(&pipeline)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        auto_send = config.triage.auto_send_threshold,
        manual_review = config.triage.manual_review_threshold,
        "talent pipeline ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
