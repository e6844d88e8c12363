//! Duplicate-registration lookups by CPF.

use adesao_core::ports::{DuplicateCheck, LookupError, TaxIdCheck};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Posts `{cpf, birthDate}` to an external validation function answering
/// `{registered, available, message?, name?}`.
#[derive(Clone, Debug)]
pub struct ValidationFunctionClient {
    client: Client,
    url: String,
}

#[derive(Debug, Serialize)]
struct ValidationRequest<'a> {
    cpf: &'a str,
    #[serde(rename = "birthDate")]
    birth_date: String,
}

#[derive(Debug, Deserialize)]
struct ValidationResponse {
    registered: bool,
    #[serde(default)]
    available: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl ValidationFunctionClient {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }
}

#[async_trait]
impl DuplicateCheck for ValidationFunctionClient {
    async fn check(&self, tax_id: &str, birth_date: NaiveDate) -> Result<TaxIdCheck, LookupError> {
        let request = ValidationRequest {
            cpf: tax_id,
            birth_date: birth_date.format("%Y-%m-%d").to_string(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|error| LookupError::Transport(error.to_string()))?;

        if !response.status().is_success() {
            return Err(LookupError::Status(response.status().as_u16()));
        }

        let body: ValidationResponse =
            response.json().await.map_err(|error| LookupError::Decode(error.to_string()))?;
        debug!(
            event_name = "integration.duplicate_check.answered",
            registered = body.registered,
            "validation function answered"
        );

        Ok(TaxIdCheck {
            registered: body.registered,
            available: body.available.unwrap_or(!body.registered),
            registrant_name: body.name,
            message: body.message,
        })
    }
}

/// Third-party registry search: a record with an `id` means the CPF is
/// already registered.
#[derive(Clone, Debug)]
pub struct RegistrySearchClient {
    client: Client,
    url: String,
    token: SecretString,
}

#[derive(Debug, Default, Deserialize)]
struct RegistrySearchResponse {
    #[serde(default)]
    data: Option<RegistryRecord>,
}

#[derive(Debug, Default, Deserialize)]
struct RegistryRecord {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    nome_da_pf: Option<String>,
}

impl RegistrySearchClient {
    pub fn new(client: Client, url: impl Into<String>, token: SecretString) -> Self {
        Self { client, url: url.into(), token }
    }
}

#[async_trait]
impl DuplicateCheck for RegistrySearchClient {
    async fn check(&self, tax_id: &str, birth_date: NaiveDate) -> Result<TaxIdCheck, LookupError> {
        let birth_date = birth_date.format("%d-%m-%Y").to_string();

        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("numeroDeCpf", tax_id),
                ("dataNascimento", birth_date.as_str()),
                ("token", self.token.expose_secret()),
            ])
            .send()
            .await
            .map_err(|error| LookupError::Transport(error.to_string()))?;

        if !response.status().is_success() {
            return Err(LookupError::Status(response.status().as_u16()));
        }

        let body: RegistrySearchResponse =
            response.json().await.map_err(|error| LookupError::Decode(error.to_string()))?;

        let record = body.data.unwrap_or_default();
        let registered = record.id.is_some_and(|id| !id.is_null());
        Ok(TaxIdCheck {
            registered,
            available: !registered,
            registrant_name: if registered { record.nome_da_pf } else { None },
            message: None,
        })
    }
}
