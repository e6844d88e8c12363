use std::sync::Arc;

use adesao_core::config::{AppConfig, ConfigError, LoadOptions};
use adesao_core::form::FormController;
use adesao_integrations::{
    http_client, services_from_config, DirectRegistrationClient, IntegrationError,
};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub controller: Arc<FormController>,
    /// Synchronous client used by the CPF validation function to probe the
    /// registration backend, independent of the configured strategy.
    pub registration_probe: DirectRegistrationClient,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Integration(#[from] IntegrationError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let services = services_from_config(&config)?;
    let controller = FormController::new(
        services,
        config.backend.constants(),
        config.endpoints.success_redirect_url.clone(),
    );
    let registration_probe = DirectRegistrationClient::new(
        http_client(&config.http)?,
        config.endpoints.registration_url.clone(),
    );

    info!(
        event_name = "system.bootstrap.services_wired",
        correlation_id = "bootstrap",
        submission_strategy = ?config.submission.strategy,
        duplicate_check_provider = ?config.duplicate_check.provider,
        "form services wired"
    );

    Ok(Application { config, controller: Arc::new(controller), registration_probe })
}
