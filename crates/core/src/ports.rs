//! Seams between the form controller and the outside world.
//!
//! Each external service is a trait so the controller can be driven by the
//! reqwest clients in production and by in-memory fakes in tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::domain::address::AddressLookupResult;
use crate::form::state::SubmissionStatus;
use crate::submission::RegistrationPayload;
use crate::webhook::WebhookSummary;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("lookup request failed: {0}")]
    Transport(String),
    #[error("lookup endpoint returned status {0}")]
    Status(u16),
    #[error("lookup response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("registration rejected: tax id already in use")]
    DuplicateTaxId,
    #[error("registration endpoint returned status {0}")]
    Status(u16),
    #[error("registration endpoint reported an error page")]
    ErrorPage,
    #[error("registration request failed: {0}")]
    Transport(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Transport(String),
    #[error("webhook endpoint returned status {0}")]
    Status(u16),
    #[error("webhook task did not complete: {0}")]
    Aborted(String),
}

/// Answer of the duplicate-registration check for one CPF.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxIdCheck {
    pub registered: bool,
    pub available: bool,
    pub registrant_name: Option<String>,
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub http_status: Option<u16>,
    /// `false` when the transport could not observe the backend's answer.
    pub confirmed: bool,
}

#[async_trait]
pub trait AddressLookup: Send + Sync {
    /// `postal_code` holds exactly eight digits.
    async fn lookup(&self, postal_code: &str) -> Result<AddressLookupResult, LookupError>;
}

#[async_trait]
pub trait DuplicateCheck: Send + Sync {
    /// `tax_id` holds exactly eleven digits.
    async fn check(&self, tax_id: &str, birth_date: NaiveDate) -> Result<TaxIdCheck, LookupError>;
}

#[async_trait]
pub trait RegistrationGateway: Send + Sync {
    async fn submit(
        &self,
        payload: &RegistrationPayload,
    ) -> Result<SubmissionReceipt, SubmissionError>;
}

#[async_trait]
pub trait WebhookNotifier: Send + Sync {
    async fn notify(&self, summary: &WebhookSummary) -> Result<(), NotifyError>;
}

/// Receives the failures the controller swallows, plus every status change so
/// a front-end can render progress.
pub trait FormObserver: Send + Sync {
    fn status_changed(&self, _status: &SubmissionStatus) {}
    fn address_lookup_failed(&self, postal_code: &str, error: &LookupError);
    fn duplicate_check_failed(&self, error: &LookupError);
    fn submission_failed(&self, error: &SubmissionError);
    fn notification_failed(&self, error: &NotifyError);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl FormObserver for TracingObserver {
    fn address_lookup_failed(&self, postal_code: &str, error: &LookupError) {
        warn!(
            event_name = "form.address_lookup.failed",
            postal_code,
            error = %error,
            "address lookup failed; treating postal code as not found"
        );
    }

    fn duplicate_check_failed(&self, error: &LookupError) {
        warn!(
            event_name = "form.duplicate_check.failed",
            error = %error,
            "duplicate check failed; tax id left unvalidated"
        );
    }

    fn submission_failed(&self, error: &SubmissionError) {
        warn!(
            event_name = "form.submission.failed",
            error = %error,
            "registration submission failed"
        );
    }

    fn notification_failed(&self, error: &NotifyError) {
        warn!(event_name = "form.webhook.failed", error = %error, "webhook notification failed");
    }
}
