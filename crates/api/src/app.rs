use axum::{
    middleware,
    routing::{get, patch},
    Router,
};
use chrono::FixedOffset;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{Config, ConfigValidationError};
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::realtime::RealtimeState;
use crate::routes::{cameras, dashboard, events, health, incidents, timeline};
use domain::services::IncidentStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn IncidentStore>,
    /// Offset applied to timeline times of day.
    pub offset: FixedOffset,
    /// Present when the change channel runs.
    pub realtime: Option<RealtimeState>,
}

pub fn create_app(
    config: Config,
    store: Arc<dyn IncidentStore>,
    realtime: Option<RealtimeState>,
) -> Result<Router, ConfigValidationError> {
    let offset = config.timeline.offset()?;

    let state = AppState {
        store,
        offset,
        realtime,
    };

    // Empty origin list allows any origin (development)
    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let api_routes = Router::new()
        .route("/api/v1/incidents", get(incidents::list_incidents))
        .route("/api/v1/incidents/events", get(events::incident_events))
        .route("/api/v1/incidents/:id", get(incidents::get_incident))
        .route(
            "/api/v1/incidents/:id/resolve",
            patch(incidents::resolve_incident),
        )
        .route("/api/v1/timeline", get(timeline::get_timeline))
        .route("/api/v1/cameras", get(cameras::list_cameras))
        .route("/api/v1/dashboard", get(dashboard::get_dashboard));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    // Bottom layers run first
    let router = Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state);

    Ok(router)
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{get, memory_app, test_config};
    use axum::http::{Method, Request, StatusCode};
    use domain::services::InMemoryIncidentStore;
    use std::sync::Arc;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (app, _) = memory_app().await;
        let response = app.oneshot(get("/api/v1/nothing")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_wrong_method_is_405() {
        let (app, _) = memory_app().await;
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/v1/incidents")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_responses_carry_request_id() {
        let (app, _) = memory_app().await;
        let response = app.oneshot(get("/api/health/live")).await.unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[test]
    fn test_invalid_offset_rejected() {
        let mut config = test_config(false);
        config.timeline.utc_offset_minutes = 5000;
        let store = Arc::new(InMemoryIncidentStore::new());
        assert!(super::create_app(config, store, None).is_err());
    }
}
