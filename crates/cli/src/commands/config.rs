use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use adesao_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let registry_token = match &config.duplicate_check.registry_token {
        Some(token) => redact(token.expose_secret()),
        None => "<unset>".to_string(),
    };
    let webhook_url = if config.endpoints.webhook_url.trim().is_empty() {
        "<disabled>".to_string()
    } else {
        config.endpoints.webhook_url.clone()
    };

    let entries: Vec<(&str, String, &str)> = vec![
        (
            "endpoints.address_lookup_base_url",
            config.endpoints.address_lookup_base_url.clone(),
            "ADESAO_ENDPOINTS_ADDRESS_LOOKUP_BASE_URL",
        ),
        (
            "endpoints.duplicate_check_url",
            config.endpoints.duplicate_check_url.clone(),
            "ADESAO_ENDPOINTS_DUPLICATE_CHECK_URL",
        ),
        (
            "endpoints.registry_search_url",
            config.endpoints.registry_search_url.clone(),
            "ADESAO_ENDPOINTS_REGISTRY_SEARCH_URL",
        ),
        (
            "endpoints.registration_url",
            config.endpoints.registration_url.clone(),
            "ADESAO_ENDPOINTS_REGISTRATION_URL",
        ),
        ("endpoints.webhook_url", webhook_url, "ADESAO_ENDPOINTS_WEBHOOK_URL"),
        (
            "endpoints.success_redirect_url",
            config.endpoints.success_redirect_url.clone(),
            "ADESAO_ENDPOINTS_SUCCESS_REDIRECT_URL",
        ),
        (
            "backend.session_token",
            redact(config.backend.session_token.expose_secret()),
            "ADESAO_BACKEND_SESSION_TOKEN",
        ),
        ("backend.father_id", config.backend.father_id.clone(), "ADESAO_BACKEND_FATHER_ID"),
        (
            "backend.submission_type",
            config.backend.submission_type.clone(),
            "ADESAO_BACKEND_SUBMISSION_TYPE",
        ),
        (
            "submission.strategy",
            format!("{:?}", config.submission.strategy),
            "ADESAO_SUBMISSION_STRATEGY",
        ),
        (
            "submission.settle_delay_ms",
            config.submission.settle_delay_ms.to_string(),
            "ADESAO_SUBMISSION_SETTLE_DELAY_MS",
        ),
        (
            "duplicate_check.provider",
            format!("{:?}", config.duplicate_check.provider),
            "ADESAO_DUPLICATE_CHECK_PROVIDER",
        ),
        ("duplicate_check.registry_token", registry_token, "ADESAO_DUPLICATE_CHECK_REGISTRY_TOKEN"),
        ("http.timeout_secs", config.http.timeout_secs.to_string(), "ADESAO_HTTP_TIMEOUT_SECS"),
        ("server.bind_address", config.server.bind_address.clone(), "ADESAO_SERVER_BIND_ADDRESS"),
        ("server.port", config.server.port.to_string(), "ADESAO_SERVER_PORT"),
        ("logging.level", config.logging.level.clone(), "ADESAO_LOGGING_LEVEL"),
        ("logging.format", format!("{:?}", config.logging.format), "ADESAO_LOGGING_FORMAT"),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_key) in entries {
        let source =
            field_source(key, env_key, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(format!("- {key} = {value} (source: {source})"));
    }
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("adesao.toml"), PathBuf::from("config/adesao.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: &str,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if env::var_os(env_key).is_some() {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

/// Keeps the last four characters so operators can tell tokens apart.
fn redact(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() <= 8 {
        return "<redacted>".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("***{tail}")
}
