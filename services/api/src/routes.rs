use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use questionnaire::surveys::{survey_router, SurveyService, SurveyStore};
use serde_json::json;
use std::sync::Arc;

/// Survey endpoints plus the health and metrics routes.
pub(crate) fn with_service_routes<S>(service: Arc<SurveyService<S>>) -> axum::Router
where
    S: SurveyStore + 'static,
{
    survey_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{Duration, Utc};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use questionnaire::config::SurveyConfig;
    use questionnaire::surveys::{InMemorySurveyStore, QuestionSet, QuestionSetDraft, Repository};
    use serde_json::Value;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn app_state(ready: bool) -> AppState {
        let recorder = PrometheusBuilder::new().build_recorder();
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(recorder.handle()),
        }
    }

    fn app(state: AppState) -> (axum::Router, Arc<InMemorySurveyStore>) {
        let store = Arc::new(InMemorySurveyStore::new());
        let service = Arc::new(SurveyService::new(store.clone(), &SurveyConfig::default()));
        (with_service_routes(service).layer(Extension(state)), store)
    }

    async fn read_json_body(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    #[tokio::test]
    async fn healthcheck_reports_ok() {
        let Json(body) = healthcheck().await;
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn readiness_tracks_flag() {
        let state = app_state(false);
        let response = readiness_endpoint(Extension(state.clone()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            read_json_body(response).await,
            json!({ "status": "initializing" })
        );

        state.readiness.store(true, Ordering::Release);
        let response = readiness_endpoint(Extension(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_are_plain_text() {
        let (router, _) = app(app_state(true));
        let response = router
            .oneshot(
                Request::get("/metrics")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE),
            Some(&header::HeaderValue::from_static("text/plain; version=0.0.4"))
        );
    }

    #[tokio::test]
    async fn survey_routes_are_mounted_alongside_health_routes() {
        let (router, store) = app(app_state(true));
        let set = Repository::<QuestionSet>::create(
            store.as_ref(),
            QuestionSetDraft {
                title: "Pulse".to_string(),
                description: String::new(),
                start_date: Utc::now() - Duration::days(1),
                end_date: None,
            },
        )
        .expect("question set stored");

        let response = router
            .clone()
            .oneshot(
                Request::get("/active_question_sets/")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        assert_eq!(payload[0]["id"], json!(set.id));
        assert_eq!(payload[0]["title"], json!("Pulse"));

        let response = router
            .oneshot(
                Request::get("/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
