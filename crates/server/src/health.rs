use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use adesao_core::config::{AppConfig, DuplicateCheckProvider, SubmissionStrategy};

#[derive(Clone)]
pub struct HealthState {
    started_at: DateTime<Utc>,
    submission_strategy: SubmissionStrategy,
    duplicate_check_provider: DuplicateCheckProvider,
    webhook_configured: bool,
}

impl HealthState {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            started_at: Utc::now(),
            submission_strategy: config.submission.strategy,
            duplicate_check_provider: config.duplicate_check.provider,
            webhook_configured: !config.endpoints.webhook_url.trim().is_empty(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub webhook: HealthCheck,
    pub submission_strategy: SubmissionStrategy,
    pub duplicate_check_provider: DuplicateCheckProvider,
    pub started_at: String,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

/// Readiness only reflects the process itself; upstream services are
/// called lazily and fail per request.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let webhook = if state.webhook_configured {
        HealthCheck { status: "ready", detail: "webhook notifications enabled".to_string() }
    } else {
        HealthCheck { status: "disabled", detail: "no webhook url configured".to_string() }
    };

    let payload = HealthResponse {
        status: "ready",
        service: HealthCheck {
            status: "ready",
            detail: "adesao-server runtime initialized".to_string(),
        },
        webhook,
        submission_strategy: state.submission_strategy,
        duplicate_check_provider: state.duplicate_check_provider,
        started_at: state.started_at.to_rfc3339(),
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}

#[cfg(test)]
mod tests {
    use adesao_core::config::{AppConfig, DuplicateCheckProvider, SubmissionStrategy};
    use axum::{body::Body, extract::State, http::Request, http::StatusCode, Json};
    use tower::ServiceExt;

    use crate::health::{health, router, HealthState};

    #[tokio::test]
    async fn health_reports_ready_with_webhook_enabled_by_default() {
        let state = HealthState::from_config(&AppConfig::default());

        let (status, Json(payload)) = health(State(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.webhook.status, "ready");
        assert_eq!(payload.submission_strategy, SubmissionStrategy::Direct);
        assert_eq!(payload.duplicate_check_provider, DuplicateCheckProvider::RegistrySearch);
    }

    #[tokio::test]
    async fn health_reports_opted_out_webhook_as_disabled() {
        let mut config = AppConfig::default();
        config.endpoints.webhook_url = String::new();

        let (_, Json(payload)) = health(State(HealthState::from_config(&config))).await;

        assert_eq!(payload.webhook.status, "disabled");
    }

    #[tokio::test]
    async fn health_route_is_mounted() {
        let app = router(HealthState::from_config(&AppConfig::default()));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }
}
