use adesao_core::domain::address::{Address, AddressLookupResult};
use adesao_core::ports::{AddressLookup, LookupError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// CEP lookup against a ViaCEP-compatible service
/// (`GET {base_url}/{cep}/json/`).
#[derive(Clone, Debug)]
pub struct ViaCepClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ViaCepResponse {
    #[serde(default)]
    logradouro: Option<String>,
    #[serde(default)]
    bairro: Option<String>,
    #[serde(default)]
    localidade: Option<String>,
    #[serde(default)]
    uf: Option<String>,
    #[serde(default)]
    complemento: Option<String>,
    #[serde(default)]
    erro: Option<Value>,
}

impl ViaCepResponse {
    // The service has answered both `true` and `"true"` over time.
    fn is_error(&self) -> bool {
        match &self.erro {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::String(flag)) => flag.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    fn into_address(self) -> Address {
        Address {
            street: self.logradouro.unwrap_or_default(),
            district: self.bairro.unwrap_or_default(),
            city: self.localidade.unwrap_or_default(),
            state_code: self.uf.unwrap_or_default(),
            complement: self.complemento.unwrap_or_default(),
        }
    }
}

impl ViaCepClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
    }

    fn lookup_url(&self, postal_code: &str) -> String {
        format!("{}/{}/json/", self.base_url.trim_end_matches('/'), postal_code)
    }
}

#[async_trait]
impl AddressLookup for ViaCepClient {
    async fn lookup(&self, postal_code: &str) -> Result<AddressLookupResult, LookupError> {
        let url = self.lookup_url(postal_code);
        debug!(event_name = "integration.address_lookup.request", %url, "looking up postal code");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|error| LookupError::Transport(error.to_string()))?;

        if !response.status().is_success() {
            return Err(LookupError::Status(response.status().as_u16()));
        }

        let body: ViaCepResponse =
            response.json().await.map_err(|error| LookupError::Decode(error.to_string()))?;

        if body.is_error() {
            return Ok(AddressLookupResult::NotFound);
        }
        Ok(AddressLookupResult::Found(body.into_address()))
    }
}

#[cfg(test)]
mod tests {
    use adesao_core::domain::address::AddressLookupResult;
    use adesao_core::ports::{AddressLookup, LookupError};
    use mockito::Server;
    use reqwest::Client;

    use super::ViaCepClient;

    #[tokio::test]
    async fn found_address_is_mapped_from_portuguese_fields() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/01310100/json/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"cep":"01310-100","logradouro":"Avenida Paulista","complemento":"de 612 a 1510 - lado par","bairro":"Bela Vista","localidade":"São Paulo","uf":"SP"}"#,
            )
            .create_async()
            .await;

        let client = ViaCepClient::new(Client::new(), format!("{}/", server.url()));
        let result = client.lookup("01310100").await.expect("lookup succeeds");

        mock.assert_async().await;
        let AddressLookupResult::Found(address) = result else {
            panic!("expected a found address, got {result:?}");
        };
        assert_eq!(address.street, "Avenida Paulista");
        assert_eq!(address.district, "Bela Vista");
        assert_eq!(address.city, "São Paulo");
        assert_eq!(address.state_code, "SP");
        assert_eq!(address.complement, "de 612 a 1510 - lado par");
    }

    #[tokio::test]
    async fn error_flag_as_bool_or_string_means_not_found() {
        let mut server = Server::new_async().await;
        let bool_mock = server
            .mock("GET", "/99999999/json/")
            .with_status(200)
            .with_body(r#"{"erro": true}"#)
            .create_async()
            .await;
        let string_mock = server
            .mock("GET", "/99999998/json/")
            .with_status(200)
            .with_body(r#"{"erro": "true"}"#)
            .create_async()
            .await;

        let client = ViaCepClient::new(Client::new(), server.url());

        assert_eq!(client.lookup("99999999").await, Ok(AddressLookupResult::NotFound));
        assert_eq!(client.lookup("99999998").await, Ok(AddressLookupResult::NotFound));
        bool_mock.assert_async().await;
        string_mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_errors_and_garbage_are_reported() {
        let mut server = Server::new_async().await;
        let _status = server.mock("GET", "/01310100/json/").with_status(503).create_async().await;
        let _garbage = server
            .mock("GET", "/01310200/json/")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let client = ViaCepClient::new(Client::new(), server.url());

        assert_eq!(client.lookup("01310100").await, Err(LookupError::Status(503)));
        assert!(matches!(client.lookup("01310200").await, Err(LookupError::Decode(_))));
    }
}
