use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::submission::BackendConstants;

/// Route of the server's CPF validation function. It answers by posting a
/// placeholder registration, so it must never back the form's own check.
pub const VALIDATION_FUNCTION_PATH: &str = "/functions/validate-cpf";

const DEFAULT_WEBHOOK_URL: &str = "https://webhook.fiqon.app/webhook/\
    a0265c1b-d832-483e-af57-8096334a57a8/e167dea4-079e-4af4-9b3f-4acaf711f432";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub endpoints: EndpointsConfig,
    pub backend: BackendConfig,
    pub submission: SubmissionConfig,
    pub duplicate_check: DuplicateCheckConfig,
    pub http: HttpConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct EndpointsConfig {
    pub address_lookup_base_url: String,
    pub duplicate_check_url: String,
    pub registry_search_url: String,
    pub registration_url: String,
    pub webhook_url: String,
    pub success_redirect_url: String,
}

#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub session_token: SecretString,
    pub father_id: String,
    pub submission_type: String,
    pub status: String,
}

#[derive(Clone, Debug)]
pub struct SubmissionConfig {
    pub strategy: SubmissionStrategy,
    pub settle_delay_ms: u64,
}

#[derive(Clone, Debug)]
pub struct DuplicateCheckConfig {
    pub provider: DuplicateCheckProvider,
    pub registry_token: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// How the registration post learns its outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStrategy {
    /// Wait for the response and inspect status and body.
    Direct,
    /// Post in the background and declare success after a fixed delay unless
    /// a duplicate marker was observed by then.
    Settled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateCheckProvider {
    ValidationFunction,
    RegistrySearch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub session_token: Option<String>,
    pub registry_token: Option<String>,
    pub submission_strategy: Option<SubmissionStrategy>,
    pub settle_delay_ms: Option<u64>,
    pub address_lookup_base_url: Option<String>,
    pub duplicate_check_url: Option<String>,
    pub registration_url: Option<String>,
    pub webhook_url: Option<String>,
    pub server_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoints: EndpointsConfig {
                address_lookup_base_url: "https://viacep.com.br/ws".to_string(),
                duplicate_check_url: String::new(),
                registry_search_url: "https://apicpf.whatsgps.com.br/api/cpf/search".to_string(),
                registration_url: "https://federalassociados.com.br/registroSave".to_string(),
                webhook_url: DEFAULT_WEBHOOK_URL.to_string(),
                success_redirect_url: "https://federalassociados.com.br/boletos".to_string(),
            },
            backend: BackendConfig {
                session_token: String::new().into(),
                father_id: "110956".to_string(),
                submission_type: "Recorrente".to_string(),
                status: "0".to_string(),
            },
            submission: SubmissionConfig {
                strategy: SubmissionStrategy::Direct,
                settle_delay_ms: 3_000,
            },
            duplicate_check: DuplicateCheckConfig {
                provider: DuplicateCheckProvider::RegistrySearch,
                registry_token: None,
            },
            http: HttpConfig { timeout_secs: 15, user_agent: "adesao/0.1".to_string() },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8080 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for SubmissionStrategy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "settled" => Ok(Self::Settled),
            other => Err(ConfigError::Validation(format!(
                "unsupported submission strategy `{other}` (expected direct|settled)"
            ))),
        }
    }
}

impl std::str::FromStr for DuplicateCheckProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "validation_function" => Ok(Self::ValidationFunction),
            "registry_search" => Ok(Self::RegistrySearch),
            other => Err(ConfigError::Validation(format!(
                "unsupported duplicate check provider `{other}` \
                 (expected validation_function|registry_search)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl SubmissionConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl BackendConfig {
    pub fn constants(&self) -> BackendConstants {
        BackendConstants {
            session_token: self.session_token.clone(),
            father_id: self.father_id.clone(),
            submission_type: self.submission_type.clone(),
            status: self.status.clone(),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("adesao.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(endpoints) = patch.endpoints {
            if let Some(value) = endpoints.address_lookup_base_url {
                self.endpoints.address_lookup_base_url = value;
            }
            if let Some(value) = endpoints.duplicate_check_url {
                self.endpoints.duplicate_check_url = value;
            }
            if let Some(value) = endpoints.registry_search_url {
                self.endpoints.registry_search_url = value;
            }
            if let Some(value) = endpoints.registration_url {
                self.endpoints.registration_url = value;
            }
            if let Some(value) = endpoints.webhook_url {
                self.endpoints.webhook_url = value;
            }
            if let Some(value) = endpoints.success_redirect_url {
                self.endpoints.success_redirect_url = value;
            }
        }

        if let Some(backend) = patch.backend {
            if let Some(session_token_value) = backend.session_token {
                self.backend.session_token = secret_value(session_token_value);
            }
            if let Some(father_id) = backend.father_id {
                self.backend.father_id = father_id;
            }
            if let Some(submission_type) = backend.submission_type {
                self.backend.submission_type = submission_type;
            }
            if let Some(status) = backend.status {
                self.backend.status = status;
            }
        }

        if let Some(submission) = patch.submission {
            if let Some(strategy) = submission.strategy {
                self.submission.strategy = strategy;
            }
            if let Some(settle_delay_ms) = submission.settle_delay_ms {
                self.submission.settle_delay_ms = settle_delay_ms;
            }
        }

        if let Some(duplicate_check) = patch.duplicate_check {
            if let Some(provider) = duplicate_check.provider {
                self.duplicate_check.provider = provider;
            }
            if let Some(registry_token_value) = duplicate_check.registry_token {
                self.duplicate_check.registry_token = Some(secret_value(registry_token_value));
            }
        }

        if let Some(http) = patch.http {
            if let Some(timeout_secs) = http.timeout_secs {
                self.http.timeout_secs = timeout_secs;
            }
            if let Some(user_agent) = http.user_agent {
                self.http.user_agent = user_agent;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ADESAO_ENDPOINTS_ADDRESS_LOOKUP_BASE_URL") {
            self.endpoints.address_lookup_base_url = value;
        }
        if let Some(value) = read_env("ADESAO_ENDPOINTS_DUPLICATE_CHECK_URL") {
            self.endpoints.duplicate_check_url = value;
        }
        if let Some(value) = read_env("ADESAO_ENDPOINTS_REGISTRY_SEARCH_URL") {
            self.endpoints.registry_search_url = value;
        }
        if let Some(value) = read_env("ADESAO_ENDPOINTS_REGISTRATION_URL") {
            self.endpoints.registration_url = value;
        }
        if let Some(value) = read_env("ADESAO_ENDPOINTS_WEBHOOK_URL") {
            self.endpoints.webhook_url = value;
        }
        if let Some(value) = read_env("ADESAO_ENDPOINTS_SUCCESS_REDIRECT_URL") {
            self.endpoints.success_redirect_url = value;
        }

        if let Some(value) = read_env("ADESAO_BACKEND_SESSION_TOKEN") {
            self.backend.session_token = secret_value(value);
        }
        if let Some(value) = read_env("ADESAO_BACKEND_FATHER_ID") {
            self.backend.father_id = value;
        }
        if let Some(value) = read_env("ADESAO_BACKEND_SUBMISSION_TYPE") {
            self.backend.submission_type = value;
        }

        if let Some(value) = read_env("ADESAO_SUBMISSION_STRATEGY") {
            self.submission.strategy = value.parse()?;
        }
        if let Some(value) = read_env("ADESAO_SUBMISSION_SETTLE_DELAY_MS") {
            self.submission.settle_delay_ms =
                parse_u64("ADESAO_SUBMISSION_SETTLE_DELAY_MS", &value)?;
        }

        if let Some(value) = read_env("ADESAO_DUPLICATE_CHECK_PROVIDER") {
            self.duplicate_check.provider = value.parse()?;
        }
        if let Some(value) = read_env("ADESAO_DUPLICATE_CHECK_REGISTRY_TOKEN") {
            self.duplicate_check.registry_token = Some(secret_value(value));
        }

        if let Some(value) = read_env("ADESAO_HTTP_TIMEOUT_SECS") {
            self.http.timeout_secs = parse_u64("ADESAO_HTTP_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("ADESAO_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("ADESAO_SERVER_PORT") {
            self.server.port = parse_u16("ADESAO_SERVER_PORT", &value)?;
        }

        let log_level = read_env("ADESAO_LOGGING_LEVEL").or_else(|| read_env("ADESAO_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("ADESAO_LOGGING_FORMAT").or_else(|| read_env("ADESAO_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(session_token) = overrides.session_token {
            self.backend.session_token = secret_value(session_token);
        }
        if let Some(registry_token) = overrides.registry_token {
            self.duplicate_check.registry_token = Some(secret_value(registry_token));
        }
        if let Some(strategy) = overrides.submission_strategy {
            self.submission.strategy = strategy;
        }
        if let Some(settle_delay_ms) = overrides.settle_delay_ms {
            self.submission.settle_delay_ms = settle_delay_ms;
        }
        if let Some(url) = overrides.address_lookup_base_url {
            self.endpoints.address_lookup_base_url = url;
        }
        if let Some(url) = overrides.duplicate_check_url {
            self.endpoints.duplicate_check_url = url;
        }
        if let Some(url) = overrides.registration_url {
            self.endpoints.registration_url = url;
        }
        if let Some(url) = overrides.webhook_url {
            self.endpoints.webhook_url = url;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoints(&self.endpoints, &self.duplicate_check)?;
        validate_backend(&self.backend)?;
        validate_submission(&self.submission)?;
        validate_duplicate_check(&self.duplicate_check)?;
        validate_http(&self.http)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("adesao.toml"), PathBuf::from("config/adesao.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn targets_validation_function(url: &str) -> bool {
    let without_query = url.trim().split(['?', '#']).next().unwrap_or_default();
    without_query.trim_end_matches('/').ends_with(VALIDATION_FUNCTION_PATH)
}

fn validate_endpoints(
    endpoints: &EndpointsConfig,
    duplicate_check: &DuplicateCheckConfig,
) -> Result<(), ConfigError> {
    let required = [
        ("endpoints.address_lookup_base_url", &endpoints.address_lookup_base_url),
        ("endpoints.registration_url", &endpoints.registration_url),
        ("endpoints.success_redirect_url", &endpoints.success_redirect_url),
    ];
    for (key, value) in required {
        if !is_http_url(value.trim()) {
            return Err(ConfigError::Validation(format!(
                "{key} must start with http:// or https://"
            )));
        }
    }

    let duplicate_check_url = match duplicate_check.provider {
        DuplicateCheckProvider::ValidationFunction => {
            ("endpoints.duplicate_check_url", &endpoints.duplicate_check_url)
        }
        DuplicateCheckProvider::RegistrySearch => {
            ("endpoints.registry_search_url", &endpoints.registry_search_url)
        }
    };
    if !is_http_url(duplicate_check_url.1.trim()) {
        return Err(ConfigError::Validation(format!(
            "{} must start with http:// or https://",
            duplicate_check_url.0
        )));
    }
    if duplicate_check.provider == DuplicateCheckProvider::ValidationFunction
        && targets_validation_function(&endpoints.duplicate_check_url)
    {
        return Err(ConfigError::Validation(format!(
            "endpoints.duplicate_check_url must not point at a `{VALIDATION_FUNCTION_PATH}` \
             function: it answers by posting a placeholder registration for the CPF"
        )));
    }

    let webhook_url = endpoints.webhook_url.trim();
    if !webhook_url.is_empty() && !is_http_url(webhook_url) {
        return Err(ConfigError::Validation(
            "endpoints.webhook_url must be empty or start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_backend(backend: &BackendConfig) -> Result<(), ConfigError> {
    if backend.session_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "backend.session_token is required. Copy the `_token` value from the registration \
             page of the association backend"
                .to_string(),
        ));
    }

    if backend.father_id.trim().is_empty() || !backend.father_id.chars().all(|c| c.is_ascii_digit())
    {
        return Err(ConfigError::Validation(
            "backend.father_id must be a non-empty numeric referrer id".to_string(),
        ));
    }

    if backend.submission_type.trim().is_empty() {
        return Err(ConfigError::Validation(
            "backend.submission_type must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_submission(submission: &SubmissionConfig) -> Result<(), ConfigError> {
    if submission.strategy == SubmissionStrategy::Settled
        && (submission.settle_delay_ms == 0 || submission.settle_delay_ms > 60_000)
    {
        return Err(ConfigError::Validation(
            "submission.settle_delay_ms must be in range 1..=60000 for the settled strategy"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_duplicate_check(duplicate_check: &DuplicateCheckConfig) -> Result<(), ConfigError> {
    if duplicate_check.provider == DuplicateCheckProvider::RegistrySearch {
        let missing = duplicate_check
            .registry_token
            .as_ref()
            .map(|value| value.expose_secret().trim().is_empty())
            .unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(
                "duplicate_check.registry_token is required for the registry_search provider"
                    .to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_http(http: &HttpConfig) -> Result<(), ConfigError> {
    if http.timeout_secs == 0 || http.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "http.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    endpoints: Option<EndpointsPatch>,
    backend: Option<BackendPatch>,
    submission: Option<SubmissionPatch>,
    duplicate_check: Option<DuplicateCheckPatch>,
    http: Option<HttpPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct EndpointsPatch {
    address_lookup_base_url: Option<String>,
    duplicate_check_url: Option<String>,
    registry_search_url: Option<String>,
    registration_url: Option<String>,
    webhook_url: Option<String>,
    success_redirect_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BackendPatch {
    session_token: Option<String>,
    father_id: Option<String>,
    submission_type: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SubmissionPatch {
    strategy: Option<SubmissionStrategy>,
    settle_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DuplicateCheckPatch {
    provider: Option<DuplicateCheckProvider>,
    registry_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct HttpPatch {
    timeout_secs: Option<u64>,
    user_agent: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
