//! JSON routes that drive one form session per request.
//!
//! - `GET  /api/address/{cep}`   postal-code lookup
//! - `POST /api/tax-id/check`    duplicate check for `{cpf, birthDate}`
//! - `POST /api/registrations`   duplicate check, gate and submission

use std::sync::Arc;

use adesao_core::domain::address::Address;
use adesao_core::errors::{ApplicationError, DomainError, InterfaceError};
use adesao_core::form::{
    FieldStatus, FormController, FormField, FormSession, PostalCodeStatus, StatusKind,
    SubmissionStatus, SubmitOutcome, SuccessDialog, TaxIdStatus, UiEffect,
};
use adesao_core::masks::{is_complete_postal_code, is_complete_tax_id};
use adesao_core::ports::SubmissionError;
use adesao_core::RegistrationForm;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct ApiState {
    controller: Arc<FormController>,
}

pub fn router(controller: Arc<FormController>) -> Router {
    Router::new()
        .route("/api/address/{cep}", get(lookup_address))
        .route("/api/tax-id/check", post(check_tax_id))
        .route("/api/registrations", post(register))
        .with_state(ApiState { controller })
}

#[derive(Debug)]
pub struct ApiError(InterfaceError);

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub detail: String,
    pub correlation_id: String,
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        Self(ApplicationError::from(error).into_interface(Uuid::new_v4().to_string()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            InterfaceError::Conflict { .. } => StatusCode::CONFLICT,
            InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.0.user_message(),
            detail: self.0.to_string(),
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

fn invalid(field: &'static str, message: &str) -> ApiError {
    ApiError::from(DomainError::InvalidField { field, message: message.to_string() })
}

#[derive(Debug, Serialize)]
pub struct AddressResponse {
    pub postal_code: String,
    pub status: PostalCodeStatus,
    pub address: Option<Address>,
    pub message: Option<String>,
}

pub async fn lookup_address(
    State(state): State<ApiState>,
    Path(cep): Path<String>,
) -> Result<Json<AddressResponse>, ApiError> {
    let mut session = FormSession::new();
    session.edit(FormField::PostalCode, &cep)?;
    if !is_complete_postal_code(&session.form().postal_code) {
        return Err(invalid("cep", "postal code must have 8 digits"));
    }

    let status = state.controller.lookup_postal_code(&mut session).await;
    let form = session.form();
    let address = (status == PostalCodeStatus::Found).then(|| Address {
        street: form.street.clone(),
        district: form.district.clone(),
        city: form.city.clone(),
        state_code: form.state_code.clone(),
        complement: form.complement.clone(),
    });

    Ok(Json(AddressResponse {
        postal_code: form.postal_code.clone(),
        status,
        address,
        message: session.status().message.clone(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct TaxIdCheckRequest {
    pub cpf: String,
    #[serde(rename = "birthDate")]
    pub birth_date: String,
}

#[derive(Debug, Serialize)]
pub struct TaxIdCheckResponse {
    pub status: TaxIdStatus,
    pub kind: StatusKind,
    pub message: Option<String>,
    pub name: Option<String>,
    pub name_locked: bool,
}

pub async fn check_tax_id(
    State(state): State<ApiState>,
    Json(request): Json<TaxIdCheckRequest>,
) -> Result<Json<TaxIdCheckResponse>, ApiError> {
    let mut session = FormSession::new();
    session.edit(FormField::TaxId, &request.cpf)?;
    session.edit(FormField::BirthDate, &request.birth_date)?;

    if !is_complete_tax_id(&session.form().tax_id) {
        return Err(invalid("cpf", "tax id must have 11 digits"));
    }
    if session.form().parsed_birth_date().is_none() {
        return Err(invalid("birthDate", "birth date must be YYYY-MM-DD or DD/MM/YYYY"));
    }

    let status = state.controller.check_tax_id(&mut session).await;
    let name_locked = session.is_name_locked();
    Ok(Json(TaxIdCheckResponse {
        status,
        kind: session.status().kind,
        message: session.status().message.clone(),
        name: name_locked.then(|| session.form().full_name.clone()),
        name_locked,
    }))
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum EffectView {
    ScrollToTop,
    BlockingPrompt(String),
    ShowSuccessDialog,
}

impl From<UiEffect> for EffectView {
    fn from(effect: UiEffect) -> Self {
        match effect {
            UiEffect::ScrollToTop => Self::ScrollToTop,
            UiEffect::BlockingPrompt(message) => Self::BlockingPrompt(message),
            UiEffect::ShowSuccessDialog => Self::ShowSuccessDialog,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegistrationResponse {
    pub session_id: Uuid,
    pub outcome: &'static str,
    pub effect: EffectView,
    pub status: SubmissionStatus,
    pub field_status: FieldStatus,
    pub success_dialog: Option<SuccessDialog>,
}

pub async fn register(
    State(state): State<ApiState>,
    Json(form): Json<RegistrationForm>,
) -> (StatusCode, Json<RegistrationResponse>) {
    let mut session = FormSession::from_form(form);
    state.controller.check_tax_id(&mut session).await;
    let outcome = state.controller.submit(&mut session).await;

    let (code, label) = match &outcome {
        SubmitOutcome::Submitted { .. } => (StatusCode::OK, "submitted"),
        SubmitOutcome::Rejected(_) => (StatusCode::UNPROCESSABLE_ENTITY, "rejected"),
        SubmitOutcome::Failed(SubmissionError::DuplicateTaxId) => (StatusCode::CONFLICT, "failed"),
        SubmitOutcome::Failed(_) => (StatusCode::BAD_GATEWAY, "failed"),
    };
    info!(
        event_name = "api.registration.completed",
        session_id = %session.id(),
        outcome = label,
        "registration request handled"
    );

    // The webhook keeps running after the response is sent.
    let effect = EffectView::from(outcome.effect());
    let response = RegistrationResponse {
        session_id: session.id(),
        outcome: label,
        effect,
        status: session.status().clone(),
        field_status: session.field_status(),
        success_dialog: session.success_dialog().cloned(),
    };
    (code, Json(response))
}
