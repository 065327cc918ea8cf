use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use questionnaire::config::AppConfig;
use questionnaire::error::AppError;
use questionnaire::surveys::{InMemorySurveyStore, SurveyService};
use questionnaire::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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

    let store = Arc::new(InMemorySurveyStore::new());
    let survey_service = Arc::new(SurveyService::new(store, &config.surveys));

    let app = with_service_routes(survey_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        boundary = ?config.surveys.boundary,
        admins = config.surveys.admin_users.len(),
        "questionnaire service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
