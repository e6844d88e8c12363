use std::env;
use std::fs;
use std::sync::{Mutex, OnceLock};

use adesao_cli::commands::{config, doctor, lookup, register};
use mockito::{Matcher, Server};
use serde_json::Value;
use tempfile::TempDir;

const APPLICANT_TOML: &str = r#"
tax_id = "529.982.247-25"
birth_date = "1990-05-17"
full_name = "Maria da Silva"
email = "maria@example.com"
whatsapp = "(11) 98765-4321"
postal_code = "01310-100"
district = "Bela Vista"
city = "São Paulo"
state_code = "SP"
street = "Avenida Paulista"
number = "1000"
chip_type = "eSim"
plan_id = "181"
"#;

const SESSION_TOKEN: (&str, &str) = ("ADESAO_BACKEND_SESSION_TOKEN", "csrf-token");
const REGISTRY_TOKEN: (&str, &str) = ("ADESAO_DUPLICATE_CHECK_REGISTRY_TOKEN", "registry-token");

#[test]
fn lookup_cep_reports_found_address() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/01310100/json/")
        .with_status(200)
        .with_body(
            r#"{"logradouro":"Avenida Paulista","bairro":"Bela Vista","localidade":"São Paulo","uf":"SP"}"#,
        )
        .create();
    let url = server.url();

    with_env(
        &[
            SESSION_TOKEN,
            REGISTRY_TOKEN,
            ("ADESAO_ENDPOINTS_ADDRESS_LOOKUP_BASE_URL", url.as_str()),
        ],
        || {
            let result = lookup::lookup_cep("01310100");
            assert_eq!(result.exit_code, 0, "expected a found address");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "lookup-cep");
            assert_eq!(payload["status"], "ok");
            let message = payload["message"].as_str().unwrap_or_default();
            assert!(message.contains("01310-100"));
            assert!(message.contains("São Paulo/SP"));
        },
    );
    mock.assert();
}

#[test]
fn lookup_cep_rejects_incomplete_input_before_loading_config() {
    with_env(&[], || {
        let result = lookup::lookup_cep("0131");
        assert_eq!(result.exit_code, 4);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "invalid_input");
    });
}

#[test]
fn lookup_cep_returns_config_failure_without_session_token() {
    with_env(&[], || {
        let result = lookup::lookup_cep("01310-100");
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn check_cpf_reports_existing_registration() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/api/cpf/search")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("numeroDeCpf".into(), "52998224725".into()),
            Matcher::UrlEncoded("dataNascimento".into(), "17-05-1990".into()),
            Matcher::UrlEncoded("token".into(), "registry-token".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"data": {"id": 4412, "nome_da_pf": "MARIA DA SILVA"}}"#)
        .create();
    let url = format!("{}/api/cpf/search", server.url());

    with_env(
        &[SESSION_TOKEN, REGISTRY_TOKEN, ("ADESAO_ENDPOINTS_REGISTRY_SEARCH_URL", url.as_str())],
        || {
            let result = lookup::check_cpf("529.982.247-25", "17/05/1990");
            assert_eq!(result.exit_code, 5);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "tax_id_exists");
        },
    );
    mock.assert();
}

#[test]
fn check_cpf_flags_bad_check_digits_without_network() {
    let mut server = Server::new();
    let mock = server.mock("GET", Matcher::Any).expect(0).create();
    let url = format!("{}/api/cpf/search", server.url());

    with_env(
        &[SESSION_TOKEN, REGISTRY_TOKEN, ("ADESAO_ENDPOINTS_REGISTRY_SEARCH_URL", url.as_str())],
        || {
            let result = lookup::check_cpf("529.982.247-26", "1990-05-17");
            assert_eq!(result.exit_code, 4);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "invalid_tax_id");
        },
    );
    mock.assert();
}

#[test]
fn register_submits_form_file_and_delivers_webhook() {
    let mut server = Server::new();
    let check = server
        .mock("GET", "/api/cpf/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"data": null}"#)
        .create();
    let submit = server
        .mock("POST", "/registroSave")
        .expect(1)
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("cpf".into(), "52998224725".into()),
            Matcher::UrlEncoded("typeChip".into(), "eSim".into()),
            Matcher::UrlEncoded("typeFrete".into(), "eSim".into()),
        ]))
        .with_status(200)
        .with_body("<html>ok</html>")
        .create();
    let webhook = server
        .mock("POST", "/hook")
        .match_body(Matcher::PartialJsonString(
            r#"{"plano": "TIM - 40GB com Ligações Ilimitadas", "forma_envio": "e-SIM"}"#.to_string(),
        ))
        .with_status(200)
        .create();

    let dir = TempDir::new().expect("temp dir");
    let form_path = dir.path().join("applicant.toml");
    fs::write(&form_path, APPLICANT_TOML).expect("write form file");

    let check_url = format!("{}/api/cpf/search", server.url());
    let registration_url = format!("{}/registroSave", server.url());
    let webhook_url = format!("{}/hook", server.url());

    with_env(
        &[
            SESSION_TOKEN,
            REGISTRY_TOKEN,
            ("ADESAO_ENDPOINTS_REGISTRY_SEARCH_URL", check_url.as_str()),
            ("ADESAO_ENDPOINTS_REGISTRATION_URL", registration_url.as_str()),
            ("ADESAO_ENDPOINTS_WEBHOOK_URL", webhook_url.as_str()),
        ],
        || {
            let result = register::run(&form_path);
            assert_eq!(result.exit_code, 0, "unexpected output: {}", result.output);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "register");
            let message = payload["message"].as_str().unwrap_or_default();
            assert!(message.contains("https://federalassociados.com.br/boletos"));
        },
    );

    check.assert();
    submit.assert();
    webhook.assert();
}

#[test]
fn register_rejects_physical_chip_without_shipping_method() {
    let mut server = Server::new();
    let _check = server
        .mock("GET", "/api/cpf/search")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"data": null}"#)
        .create();
    let submit = server.mock("POST", "/registroSave").expect(0).create();

    let dir = TempDir::new().expect("temp dir");
    let form_path = dir.path().join("applicant.toml");
    let physical = APPLICANT_TOML.replace("chip_type = \"eSim\"", "chip_type = \"fisico\"");
    fs::write(&form_path, physical).expect("write form file");

    let check_url = format!("{}/api/cpf/search", server.url());
    let registration_url = format!("{}/registroSave", server.url());

    with_env(
        &[
            SESSION_TOKEN,
            REGISTRY_TOKEN,
            ("ADESAO_ENDPOINTS_REGISTRY_SEARCH_URL", check_url.as_str()),
            ("ADESAO_ENDPOINTS_REGISTRATION_URL", registration_url.as_str()),
        ],
        || {
            let result = register::run(&form_path);
            assert_eq!(result.exit_code, 5);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "gate_rejected");
            assert_eq!(payload["message"], "Por favor, escolha uma forma de envio.");
        },
    );
    submit.assert();
}

#[test]
fn register_reports_unreadable_form_file() {
    with_env(&[SESSION_TOKEN, REGISTRY_TOKEN], || {
        let result = register::run(std::path::Path::new("/nonexistent/applicant.toml"));
        assert_eq!(result.exit_code, 4);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "form_file");
    });
}

#[test]
fn doctor_json_passes_when_address_lookup_answers() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/01001000/json/")
        .with_status(200)
        .with_body(
            r#"{"logradouro":"Praça da Sé","bairro":"Sé","localidade":"São Paulo","uf":"SP"}"#,
        )
        .create();
    let url = server.url();

    with_env(
        &[
            SESSION_TOKEN,
            REGISTRY_TOKEN,
            ("ADESAO_ENDPOINTS_ADDRESS_LOOKUP_BASE_URL", url.as_str()),
        ],
        || {
            let report = parse_payload(&doctor::run(true));
            assert_eq!(report["overall_status"], "pass");
            assert_eq!(report["checks"][0]["name"], "config_validation");
        },
    );
}

#[test]
fn doctor_skips_dependent_checks_when_config_is_invalid() {
    with_env(&[], || {
        let report = parse_payload(&doctor::run(true));
        assert_eq!(report["overall_status"], "fail");
        assert_eq!(report["checks"][1]["status"], "skipped");
        assert_eq!(report["checks"][2]["status"], "skipped");
    });
}

#[test]
fn config_output_attributes_sources_and_redacts_session_token() {
    let vars = [
        ("ADESAO_BACKEND_SESSION_TOKEN", "csrf-secret-session-token"),
        ("ADESAO_DUPLICATE_CHECK_REGISTRY_TOKEN", "registry-secret-token"),
    ];
    with_env(&vars, || {
        let output = config::run();
        assert!(!output.contains("csrf-secret-session-token"));
        assert!(!output.contains("registry-secret-token"));
        assert!(output.contains("- duplicate_check.provider = RegistrySearch (source: default)"));
        assert!(output.contains("- endpoints.webhook_url = https://webhook.fiqon.app/webhook/"));
        assert!(output.contains(
            "- backend.session_token = ***oken (source: env (ADESAO_BACKEND_SESSION_TOKEN))"
        ));
        assert!(output.contains("- backend.father_id = 110956 (source: default)"));
    });
}

#[test]
fn check_cpf_refuses_the_registration_probing_function() {
    let mut server = Server::new();
    let mock = server.mock("POST", Matcher::Any).expect(0).create();
    let url = format!("{}/functions/validate-cpf", server.url());

    with_env(
        &[
            SESSION_TOKEN,
            ("ADESAO_DUPLICATE_CHECK_PROVIDER", "validation_function"),
            ("ADESAO_ENDPOINTS_DUPLICATE_CHECK_URL", url.as_str()),
        ],
        || {
            let result = lookup::check_cpf("529.982.247-25", "1990-05-17");
            assert_eq!(result.exit_code, 2);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["error_class"], "config_validation");
        },
    );
    mock.assert();
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let keys = [
        "ADESAO_ENDPOINTS_ADDRESS_LOOKUP_BASE_URL",
        "ADESAO_ENDPOINTS_DUPLICATE_CHECK_URL",
        "ADESAO_ENDPOINTS_REGISTRY_SEARCH_URL",
        "ADESAO_ENDPOINTS_REGISTRATION_URL",
        "ADESAO_ENDPOINTS_WEBHOOK_URL",
        "ADESAO_ENDPOINTS_SUCCESS_REDIRECT_URL",
        "ADESAO_BACKEND_SESSION_TOKEN",
        "ADESAO_BACKEND_FATHER_ID",
        "ADESAO_BACKEND_SUBMISSION_TYPE",
        "ADESAO_SUBMISSION_STRATEGY",
        "ADESAO_SUBMISSION_SETTLE_DELAY_MS",
        "ADESAO_DUPLICATE_CHECK_PROVIDER",
        "ADESAO_DUPLICATE_CHECK_REGISTRY_TOKEN",
        "ADESAO_HTTP_TIMEOUT_SECS",
        "ADESAO_SERVER_BIND_ADDRESS",
        "ADESAO_SERVER_PORT",
        "ADESAO_LOGGING_LEVEL",
        "ADESAO_LOGGING_FORMAT",
        "ADESAO_LOG_LEVEL",
        "ADESAO_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
