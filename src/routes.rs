//! Read-only REST endpoints over the primary store.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::registration::session::ExternalIdentity;
use crate::store::RegistrationStore;

/// Shared state for registration routes.
#[derive(Clone)]
pub struct RegistrationRouteState {
    pub store: Arc<dyn RegistrationStore>,
}

fn internal_error(e: impl std::fmt::Display) -> axum::response::Response {
    tracing::warn!(error = %e, "Registration API query failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({"error": "Store unavailable"})),
    )
        .into_response()
}

/// GET /health
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// GET /api/registrations/stats
async fn get_stats(State(state): State<RegistrationRouteState>) -> impl IntoResponse {
    match state.store.registration_stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => internal_error(e),
    }
}

/// GET /api/registrations/{telegram_id}
///
/// Returns the stored registration, or 404 if the user never completed one.
async fn get_registration(
    State(state): State<RegistrationRouteState>,
    Path(telegram_id): Path<i64>,
) -> impl IntoResponse {
    match state
        .store
        .get_registration(ExternalIdentity(telegram_id))
        .await
    {
        Ok(Some(stored)) => Json(stored).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "No registration for this user"})),
        )
            .into_response(),
        Err(e) => internal_error(e),
    }
}

/// Build the registration REST routes.
pub fn registration_routes(state: RegistrationRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/registrations/stats", get(get_stats))
        .route("/api/registrations/{telegram_id}", get(get_registration))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::registration::package::Package;
    use crate::registration::record::RegistrationRecord;
    use crate::store::LibSqlBackend;

    async fn app() -> Router {
        let db = LibSqlBackend::new_memory().await.unwrap();
        db.upsert_registration(&RegistrationRecord {
            telegram_id: ExternalIdentity(123456789),
            username: None,
            first_name: "Anna".into(),
            last_name: "Ivanova".into(),
            package_type: Package::Business,
            participated_before: false,
            participation_year: None,
            is_graduate: true,
            graduation_year: Some("2019".into()),
        })
        .await
        .unwrap();
        registration_routes(RegistrationRouteState {
            store: Arc::new(db),
        })
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = get_json(app().await, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn stats_reflect_store() {
        let (status, body) = get_json(app().await, "/api/registrations/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["business"], 1);
        assert_eq!(body["graduates"], 1);
    }

    #[tokio::test]
    async fn lookup_by_identity() {
        let (status, body) = get_json(app().await, "/api/registrations/123456789").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["telegram_id"], 123456789);
        assert_eq!(body["package_type"], "business");
        assert_eq!(body["graduation_year"], "2019");

        let (status, _) = get_json(app().await, "/api/registrations/1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
