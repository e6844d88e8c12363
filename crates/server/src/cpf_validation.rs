//! Standalone duplicate-check function for external callers. It answers
//! whether a CPF is already registered by posting a placeholder registration,
//! which registers a new CPF as a side effect. The form flow never calls it:
//! config validation refuses it as `endpoints.duplicate_check_url`.

use adesao_core::config::VALIDATION_FUNCTION_PATH;
use adesao_core::submission::{probe_form, BackendConstants, RegistrationPayload};
use adesao_integrations::DirectRegistrationClient;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

pub const MSG_MISSING_INPUT: &str = "CPF and birthDate are required";
pub const MSG_REGISTERED: &str = "CPF já está cadastrado";
pub const MSG_AVAILABLE: &str = "CPF disponível para cadastro";
pub const MSG_PROBE_FAILED: &str = "Erro ao validar CPF. Tente novamente.";

#[derive(Clone)]
pub struct CpfValidationState {
    probe: DirectRegistrationClient,
    constants: BackendConstants,
}

impl CpfValidationState {
    pub fn new(probe: DirectRegistrationClient, constants: BackendConstants) -> Self {
        Self { probe, constants }
    }
}

pub fn router(state: CpfValidationState) -> Router {
    Router::new()
        .route(VALIDATION_FUNCTION_PATH, post(validate_cpf).options(preflight))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct ValidationRequest {
    #[serde(default)]
    cpf: Option<String>,
    #[serde(default, rename = "birthDate")]
    birth_date: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationAnswer {
    pub available: bool,
    pub registered: bool,
    pub message: String,
}

impl ValidationAnswer {
    fn rejected(message: &str) -> Self {
        Self { available: false, registered: false, message: message.to_string() }
    }
}

fn cors_headers() -> [(HeaderName, &'static str); 3] {
    [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        (
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            "authorization, x-client-info, apikey, content-type",
        ),
        (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
    ]
}

async fn preflight() -> impl IntoResponse {
    (StatusCode::OK, cors_headers(), "ok")
}

async fn validate_cpf(State(state): State<CpfValidationState>, body: Bytes) -> Response {
    let (status, answer) = evaluate(&state, &body).await;
    (status, cors_headers(), Json(answer)).into_response()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

async fn evaluate(state: &CpfValidationState, body: &[u8]) -> (StatusCode, ValidationAnswer) {
    let request: ValidationRequest = match serde_json::from_slice(body) {
        Ok(request) => request,
        Err(parse_error) => {
            error!(
                event_name = "function.validate_cpf.bad_body",
                error = %parse_error,
                "request body is not valid json"
            );
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                ValidationAnswer::rejected(MSG_PROBE_FAILED),
            );
        }
    };

    let (Some(cpf), Some(birth_date)) = (non_blank(request.cpf), non_blank(request.birth_date))
    else {
        return (StatusCode::BAD_REQUEST, ValidationAnswer::rejected(MSG_MISSING_INPUT));
    };

    let payload = RegistrationPayload::build(&probe_form(&cpf, &birth_date), &state.constants);
    match state.probe.probe_duplicate(&payload).await {
        Ok(registered) => {
            info!(event_name = "function.validate_cpf.answered", registered, "cpf probe answered");
            let message = if registered { MSG_REGISTERED } else { MSG_AVAILABLE };
            let answer = ValidationAnswer {
                available: !registered,
                registered,
                message: message.to_string(),
            };
            (StatusCode::OK, answer)
        }
        Err(probe_error) => {
            error!(
                event_name = "function.validate_cpf.probe_failed",
                error = %probe_error,
                "registration probe failed"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, ValidationAnswer::rejected(MSG_PROBE_FAILED))
        }
    }
}
