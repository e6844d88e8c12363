use adesao_core::config::{AppConfig, DuplicateCheckProvider, LoadOptions};
use adesao_core::ports::AddressLookup;
use adesao_integrations::{http_client, ViaCepClient};
use serde::Serialize;

/// CEP of Praça da Sé, used as a known-good lookup.
const PROBE_POSTAL_CODE: &str = "01001000";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_submission_setup(&config));
            checks.push(check_address_lookup(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["submission_setup", "address_lookup_connectivity"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_submission_setup(config: &AppConfig) -> DoctorCheck {
    let provider = match config.duplicate_check.provider {
        DuplicateCheckProvider::ValidationFunction => {
            format!("validation function at `{}`", config.endpoints.duplicate_check_url)
        }
        DuplicateCheckProvider::RegistrySearch => {
            format!("registry search at `{}`", config.endpoints.registry_search_url)
        }
    };
    let webhook = match config.endpoints.webhook_url.trim() {
        "" => "webhook notifications disabled".to_string(),
        url => format!("webhook to `{url}`"),
    };
    DoctorCheck {
        name: "submission_setup",
        status: CheckStatus::Pass,
        details: format!(
            "{:?} submission to `{}` as father {}; duplicate check via {provider}; {webhook}",
            config.submission.strategy, config.endpoints.registration_url, config.backend.father_id
        ),
    }
}

fn check_address_lookup(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "address_lookup_connectivity",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let client = match http_client(&config.http) {
        Ok(client) => ViaCepClient::new(client, config.endpoints.address_lookup_base_url.clone()),
        Err(error) => {
            return DoctorCheck {
                name: "address_lookup_connectivity",
                status: CheckStatus::Fail,
                details: error.to_string(),
            };
        }
    };

    match runtime.block_on(client.lookup(PROBE_POSTAL_CODE)) {
        Ok(_) => DoctorCheck {
            name: "address_lookup_connectivity",
            status: CheckStatus::Pass,
            details: format!("`{}` answered", config.endpoints.address_lookup_base_url),
        },
        Err(error) => DoctorCheck {
            name: "address_lookup_connectivity",
            status: CheckStatus::Fail,
            details: format!("address lookup failed: {error}"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
