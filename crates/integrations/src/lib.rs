//! reqwest-backed implementations of the `adesao-core` ports.

pub mod address;
pub mod duplicate_check;
pub mod registration;
pub mod webhook;

use std::sync::Arc;

use adesao_core::config::{AppConfig, DuplicateCheckProvider, HttpConfig, SubmissionStrategy};
use adesao_core::errors::ApplicationError;
use adesao_core::form::FormServices;
use adesao_core::ports::{DuplicateCheck, RegistrationGateway, WebhookNotifier};
use reqwest::Client;
use thiserror::Error;
use tracing::warn;

pub use address::ViaCepClient;
pub use duplicate_check::{RegistrySearchClient, ValidationFunctionClient};
pub use registration::{DirectRegistrationClient, SettledRegistrationClient};
pub use webhook::{NoopWebhookNotifier, WebhookClient};

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("failed to build http client: {0}")]
    ClientBuild(String),
    #[error("duplicate check provider `registry_search` needs a registry token")]
    MissingRegistryToken,
}

impl From<IntegrationError> for ApplicationError {
    fn from(error: IntegrationError) -> Self {
        ApplicationError::Integration(error.to_string())
    }
}

pub fn http_client(config: &HttpConfig) -> Result<Client, IntegrationError> {
    Client::builder()
        .timeout(config.timeout())
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|error| IntegrationError::ClientBuild(error.to_string()))
}

/// Wires every port to its configured HTTP implementation.
pub fn services_from_config(config: &AppConfig) -> Result<FormServices, IntegrationError> {
    let client = http_client(&config.http)?;
    let endpoints = &config.endpoints;

    let duplicate_check: Arc<dyn DuplicateCheck> = match config.duplicate_check.provider {
        DuplicateCheckProvider::ValidationFunction => Arc::new(ValidationFunctionClient::new(
            client.clone(),
            endpoints.duplicate_check_url.clone(),
        )),
        DuplicateCheckProvider::RegistrySearch => {
            let token = config
                .duplicate_check
                .registry_token
                .clone()
                .ok_or(IntegrationError::MissingRegistryToken)?;
            Arc::new(RegistrySearchClient::new(
                client.clone(),
                endpoints.registry_search_url.clone(),
                token,
            ))
        }
    };

    let gateway: Arc<dyn RegistrationGateway> = match config.submission.strategy {
        SubmissionStrategy::Direct => Arc::new(DirectRegistrationClient::new(
            client.clone(),
            endpoints.registration_url.clone(),
        )),
        SubmissionStrategy::Settled => Arc::new(SettledRegistrationClient::new(
            client.clone(),
            endpoints.registration_url.clone(),
            config.submission.settle_delay(),
        )),
    };

    let notifier: Arc<dyn WebhookNotifier> = if endpoints.webhook_url.trim().is_empty() {
        warn!(
            event_name = "integration.webhook.disabled",
            "endpoints.webhook_url is empty; successful registrations will not be notified"
        );
        Arc::new(NoopWebhookNotifier)
    } else {
        Arc::new(WebhookClient::new(client.clone(), endpoints.webhook_url.clone()))
    };

    Ok(FormServices {
        address_lookup: Arc::new(ViaCepClient::new(
            client,
            endpoints.address_lookup_base_url.clone(),
        )),
        duplicate_check,
        gateway,
        notifier,
    })
}
