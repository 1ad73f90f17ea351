//! HTTP router construction.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::api;
use crate::state::AppState;

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .route("/health", get(api::health))
        .route(
            "/api/members",
            get(api::members_list).post(api::members_create),
        )
        .route(
            "/api/members/{id}",
            get(api::members_get)
                .put(api::members_update)
                .delete(api::members_delete),
        )
        .route(
            "/api/duties",
            get(api::duties_list).post(api::duties_create),
        )
        .route(
            "/api/duties/{id}",
            get(api::duties_get)
                .put(api::duties_update)
                .delete(api::duties_delete),
        )
        .route("/api/assignments/advance", post(api::assignments_advance))
        .route("/api/assignments", get(api::assignments_list))
        .route("/api/assignments/{id}", put(api::assignments_update))
        .route(
            "/api/assignments/{id}/history",
            get(api::assignments_history),
        )
        .route("/api/digest/send", post(api::digest_send))
        .route("/api/digest/preview", get(api::digest_preview))
        .route("/api/config", get(api::config_summary))
        .route(
            "/api/config/webhook-url",
            get(api::webhook_url_get)
                .put(api::webhook_url_put)
                .delete(api::webhook_url_delete),
        )
        .route("/api/config/webhook-url/test", post(api::webhook_url_test))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(e) => {
            warn!(origin, error = %e, "invalid CORS origin, allowing any");
            CorsLayer::permissive()
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use rotator_core::Config;

    async fn test_state() -> Arc<AppState> {
        let mut config = Config::for_profile("ROUTER_TEST");
        config.slack.webhook_url = None;
        config.slack.alert_webhook_url = None;
        config.holiday.api_url = None;
        let state = crate::startup::build_state(config, None)
            .await
            .unwrap();
        Arc::new(state)
    }

    async fn app() -> Router {
        build_router(test_state().await)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_missing_database() {
        let response = app()
            .await
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["database"], false);
        assert_eq!(json["digest_channel"], false);
    }

    #[tokio::test]
    async fn database_endpoints_answer_503_without_postgres() {
        for (method, uri) in [
            ("GET", "/api/members"),
            ("GET", "/api/duties/1"),
            ("GET", "/api/assignments"),
            ("POST", "/api/assignments/advance"),
            ("POST", "/api/digest/send"),
        ] {
            let response = app()
                .await
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE, "{method} {uri}");
            let json = body_json(response).await;
            assert_eq!(json["error"], "PostgreSQL not configured");
        }
    }

    #[tokio::test]
    async fn malformed_rule_is_rejected_before_the_database() {
        let response = app()
            .await
            .oneshot(
                Request::post("/api/duties")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"Standup","rotation_rule":"monthly_foo"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().contains("monthly_foo"));
    }

    #[tokio::test]
    async fn invalid_webhook_url_is_rejected() {
        let response = app()
            .await
            .oneshot(
                Request::put("/api/config/webhook-url")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"webhook_url":"not a url"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn webhook_url_defaults_to_none() {
        let response = app()
            .await
            .oneshot(Request::get("/api/config/webhook-url").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["source"], "none");
        assert!(json["webhook_url"].is_null());
    }

    #[tokio::test]
    async fn webhook_test_without_channel_is_bad_gateway() {
        let response = app()
            .await
            .oneshot(
                Request::post("/api/config/webhook-url/test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn reassignment_waits_for_a_running_pass() {
        let state = test_state().await;
        let app = build_router(state.clone());
        let request = || {
            Request::put("/api/assignments/1")
                .header("content-type", "application/json")
                .body(Body::from(
                    r#"{"handle":"bob","start_date":"2024-01-08","end_date":"2024-01-14"}"#,
                ))
                .unwrap()
        };

        let guard = state.pass_lock.lock().await;
        let blocked = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            app.clone().oneshot(request()),
        )
        .await;
        assert!(blocked.is_err(), "reassignment ran while a pass held the lock");
        drop(guard);

        let response = app.oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn config_summary_is_served() {
        let response = app()
            .await
            .oneshot(Request::get("/api/config").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["postgres"]["configured"].is_boolean());
        assert_eq!(json["slack"]["digest_configured"], false);
    }
}
