//! Form-encoded posts to the registration backend.

use std::time::Duration;

use adesao_core::ports::{RegistrationGateway, SubmissionError, SubmissionReceipt};
use adesao_core::submission::{
    contains_duplicate_marker, scan_response_body, RegistrationPayload, ResponseVerdict,
};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

/// Waits for the backend's answer and trusts it: non-2xx fails, 2xx bodies
/// are scanned for duplicate and error-page markers.
#[derive(Clone, Debug)]
pub struct DirectRegistrationClient {
    client: Client,
    url: String,
}

impl DirectRegistrationClient {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self { client, url: url.into() }
    }

    async fn post(&self, payload: &RegistrationPayload) -> Result<(u16, String), SubmissionError> {
        let response = self
            .client
            .post(&self.url)
            .form(&payload.form_pairs())
            .send()
            .await
            .map_err(|error| SubmissionError::Transport(error.to_string()))?;
        let status = response.status().as_u16();
        let body =
            response.text().await.map_err(|error| SubmissionError::Transport(error.to_string()))?;
        Ok((status, body))
    }

    /// Posts a probe registration and reports whether the backend answered
    /// with a duplicate marker. The status code is ignored.
    pub async fn probe_duplicate(
        &self,
        payload: &RegistrationPayload,
    ) -> Result<bool, SubmissionError> {
        let (status, body) = self.post(payload).await?;
        let duplicate = contains_duplicate_marker(&body);
        debug!(
            event_name = "integration.registration.probe",
            http_status = status,
            duplicate,
            "registration probe answered"
        );
        Ok(duplicate)
    }
}

#[async_trait]
impl RegistrationGateway for DirectRegistrationClient {
    async fn submit(
        &self,
        payload: &RegistrationPayload,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let (status, body) = self.post(payload).await?;
        if !(200..300).contains(&status) {
            return Err(SubmissionError::Status(status));
        }

        match scan_response_body(&body) {
            ResponseVerdict::DuplicateTaxId => Err(SubmissionError::DuplicateTaxId),
            ResponseVerdict::ErrorPage => Err(SubmissionError::ErrorPage),
            ResponseVerdict::Accepted => {
                info!(
                    event_name = "integration.registration.accepted",
                    http_status = status,
                    "registration accepted"
                );
                Ok(SubmissionReceipt { http_status: Some(status), confirmed: true })
            }
        }
    }
}

/// Dispatches the post in the background and decides after a fixed delay.
/// Only an observed duplicate marker fails the submission; a late answer or
/// a transport failure counts as success.
#[derive(Clone, Debug)]
pub struct SettledRegistrationClient {
    client: Client,
    url: String,
    settle_delay: Duration,
}

impl SettledRegistrationClient {
    pub fn new(client: Client, url: impl Into<String>, settle_delay: Duration) -> Self {
        Self { client, url: url.into(), settle_delay }
    }
}

#[async_trait]
impl RegistrationGateway for SettledRegistrationClient {
    async fn submit(
        &self,
        payload: &RegistrationPayload,
    ) -> Result<SubmissionReceipt, SubmissionError> {
        let request = self.client.post(&self.url).form(&payload.form_pairs());
        let task = tokio::spawn(async move {
            let response = request.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        });

        tokio::time::sleep(self.settle_delay).await;

        if !task.is_finished() {
            debug!(
                event_name = "integration.registration.unsettled",
                "no answer within the settle delay; assuming success"
            );
            return Ok(SubmissionReceipt { http_status: None, confirmed: false });
        }

        match task.await {
            Ok(Ok((status, body))) => {
                if contains_duplicate_marker(&body) {
                    return Err(SubmissionError::DuplicateTaxId);
                }
                Ok(SubmissionReceipt { http_status: Some(status), confirmed: true })
            }
            Ok(Err(error)) => {
                warn!(
                    event_name = "integration.registration.transport_failed",
                    error = %error,
                    "registration post failed; assuming success"
                );
                Ok(SubmissionReceipt { http_status: None, confirmed: false })
            }
            Err(error) => {
                warn!(
                    event_name = "integration.registration.task_failed",
                    error = %error,
                    "registration task did not complete"
                );
                Ok(SubmissionReceipt { http_status: None, confirmed: false })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use adesao_core::domain::registration::{ChipType, RegistrationForm, ShippingMethod};
    use adesao_core::ports::{RegistrationGateway, SubmissionError, SubmissionReceipt};
    use adesao_core::submission::{BackendConstants, RegistrationPayload};
    use mockito::{Matcher, Server};
    use reqwest::Client;
    use secrecy::SecretString;
    use tokio::net::TcpListener;

    use super::{DirectRegistrationClient, SettledRegistrationClient};

    fn payload() -> RegistrationPayload {
        let form = RegistrationForm {
            tax_id: "529.982.247-25".to_string(),
            birth_date: "1990-05-17".to_string(),
            full_name: "Maria da Silva".to_string(),
            whatsapp: "(11) 98765-4321".to_string(),
            postal_code: "01310-100".to_string(),
            chip_type: ChipType::Physical,
            plan_id: Some("178".to_string()),
            shipping_method: Some(ShippingMethod::Carta),
            ..RegistrationForm::default()
        };
        let constants = BackendConstants {
            session_token: SecretString::from("csrf-token".to_string()),
            father_id: "110956".to_string(),
            submission_type: "Recorrente".to_string(),
            status: "0".to_string(),
        };
        RegistrationPayload::build(&form, &constants)
    }

    #[tokio::test]
    async fn direct_submission_posts_cleaned_form_fields() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/registroSave")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("_token".into(), "csrf-token".into()),
                Matcher::UrlEncoded("father".into(), "110956".into()),
                Matcher::UrlEncoded("type".into(), "Recorrente".into()),
                Matcher::UrlEncoded("cpf".into(), "52998224725".into()),
                Matcher::UrlEncoded("cell".into(), "11987654321".into()),
                Matcher::UrlEncoded("typeFrete".into(), "Carta".into()),
            ]))
            .with_status(200)
            .with_body("<html>Cadastro recebido</html>")
            .create_async()
            .await;

        let client =
            DirectRegistrationClient::new(Client::new(), format!("{}/registroSave", server.url()));
        let receipt = client.submit(&payload()).await.expect("submission accepted");

        mock.assert_async().await;
        assert_eq!(receipt.http_status, Some(200));
        assert!(receipt.confirmed);
    }

    #[tokio::test]
    async fn direct_submission_maps_markers_and_status() {
        let mut server = Server::new_async().await;
        let url = format!("{}/registroSave", server.url());
        let client = DirectRegistrationClient::new(Client::new(), url);

        let duplicate = server
            .mock("POST", "/registroSave")
            .with_status(200)
            .with_body("<p>O cpf já está sendo utilizado.</p>")
            .create_async()
            .await;
        assert_eq!(client.submit(&payload()).await, Err(SubmissionError::DuplicateTaxId));
        duplicate.remove_async().await;

        let whoops = server
            .mock("POST", "/registroSave")
            .with_status(200)
            .with_body("Whoops, looks like something went wrong.")
            .create_async()
            .await;
        assert_eq!(client.submit(&payload()).await, Err(SubmissionError::ErrorPage));
        whoops.remove_async().await;

        let _failing = server.mock("POST", "/registroSave").with_status(419).create_async().await;
        assert_eq!(client.submit(&payload()).await, Err(SubmissionError::Status(419)));
    }

    #[tokio::test]
    async fn direct_submission_transport_failure_is_reported() {
        let client =
            DirectRegistrationClient::new(Client::new(), "http://127.0.0.1:9/registroSave");
        assert!(matches!(client.submit(&payload()).await, Err(SubmissionError::Transport(_))));
    }

    #[tokio::test]
    async fn probe_ignores_status_and_reports_duplicate_marker() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/registroSave")
            .with_status(422)
            .with_body("O campo cpf já existe na base.")
            .create_async()
            .await;

        let client =
            DirectRegistrationClient::new(Client::new(), format!("{}/registroSave", server.url()));
        assert_eq!(client.probe_duplicate(&payload()).await, Ok(true));
    }

    #[tokio::test]
    async fn settled_submission_reads_an_early_duplicate_answer() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/registroSave")
            .with_status(200)
            .with_body("CPF já cadastrado")
            .create_async()
            .await;

        let client = SettledRegistrationClient::new(
            Client::new(),
            format!("{}/registroSave", server.url()),
            Duration::from_millis(300),
        );
        assert_eq!(client.submit(&payload()).await, Err(SubmissionError::DuplicateTaxId));
    }

    #[tokio::test]
    async fn settled_submission_accepts_any_other_early_answer() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/registroSave")
            .with_status(500)
            .with_body("Whoops, looks like something went wrong.")
            .create_async()
            .await;

        let client = SettledRegistrationClient::new(
            Client::new(),
            format!("{}/registroSave", server.url()),
            Duration::from_millis(300),
        );
        let receipt = client.submit(&payload()).await.expect("settled submission succeeds");
        assert_eq!(receipt.http_status, Some(500));
        assert!(receipt.confirmed);
    }

    #[tokio::test]
    async fn settled_submission_treats_transport_failure_as_success() {
        let client = SettledRegistrationClient::new(
            Client::new(),
            "http://127.0.0.1:9/registroSave",
            Duration::from_millis(300),
        );
        let receipt = client.submit(&payload()).await.expect("settled submission succeeds");
        assert_eq!(receipt.http_status, None);
        assert!(!receipt.confirmed);
    }

    #[tokio::test]
    async fn settled_submission_assumes_success_when_backend_stays_silent() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
        let address = listener.local_addr().expect("listener address");
        let silent_backend = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.expect("accept connection");
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let settle_delay = Duration::from_millis(250);
        let client = SettledRegistrationClient::new(
            Client::new(),
            format!("http://{address}/registroSave"),
            settle_delay,
        );

        let started = Instant::now();
        let result = client.submit(&payload()).await;
        let elapsed = started.elapsed();
        silent_backend.abort();

        assert_eq!(result, Ok(SubmissionReceipt { http_status: None, confirmed: false }));
        assert!(elapsed >= settle_delay, "returned after {elapsed:?}");
    }
}
