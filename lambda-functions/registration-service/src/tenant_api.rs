use async_trait::async_trait;
use onboarding_common::{OnboardingError, OnboardingResult, Tenant};
use reqwest::header::ACCEPT;
use std::time::Instant;
use tracing::info;

use crate::provision::TenantApi;

pub struct HttpTenantApi {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTenantApi {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn tenants_url(&self) -> String {
        format!("{}/tenants", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl TenantApi for HttpTenantApi {
    async fn create_tenant(&self, tenant: &Tenant) -> OnboardingResult<Tenant> {
        let start = Instant::now();
        let url = self.tenants_url();
        info!("Invoking tenant service at {}", url);

        let response = self
            .client
            .post(&url)
            .header(ACCEPT, "application/json")
            .json(tenant)
            .send()
            .await?;

        if response.status().is_client_error() || response.status().is_server_error() {
            return Err(OnboardingError::TenantApi(response.text().await?));
        }

        let created: Tenant = response.json().await?;
        info!("Tenant service create exec {} ms", start.elapsed().as_millis());
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accepts one connection, answers it with `status` and `body`, and returns the
    /// raw request it received.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&request) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8(request).unwrap()
        });

        (url, handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(end) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..end]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        raw.len() >= end + 4 + length
    }

    fn local_client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    #[test]
    fn test_tenants_url() {
        let api = HttpTenantApi::new(
            reqwest::Client::new(),
            "https://abc123.execute-api.us-east-1.amazonaws.com/v1/",
        );
        assert_eq!(
            api.tenants_url(),
            "https://abc123.execute-api.us-east-1.amazonaws.com/v1/tenants"
        );
    }

    fn acme() -> Tenant {
        Tenant::builder()
            .active(true)
            .company_name("Acme".to_string())
            .database("pool-1.cluster-xyz.us-east-1.rds.amazonaws.com".to_string())
            .build()
    }

    #[tokio::test]
    async fn test_create_tenant_posts_to_tenant_service() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"id":"5b1e7c2a-9f0d-4c3b-8a6e-1d2f3a4b5c6d","active":true,"companyName":"Acme"}"#,
        )
        .await;
        let api = HttpTenantApi::new(local_client(), url);

        let created = api.create_tenant(&acme()).await.unwrap();
        assert_eq!(
            created.id.map(|id| id.to_string()).as_deref(),
            Some("5b1e7c2a-9f0d-4c3b-8a6e-1d2f3a4b5c6d")
        );

        let request = server.await.unwrap();
        let (head, body) = request.split_once("\r\n\r\n").unwrap();
        assert!(head.starts_with("POST /tenants HTTP/1.1"));
        assert!(head.to_ascii_lowercase().contains("accept: application/json"));

        let sent: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(sent["companyName"], "Acme");
        assert!(sent.get("id").is_none());
    }

    #[tokio::test]
    async fn test_error_status_carries_response_body() {
        let (url, server) = serve_once("500 Internal Server Error", r#"{"message":"Internal server error"}"#).await;
        let api = HttpTenantApi::new(local_client(), url);

        let err = api.create_tenant(&acme()).await.unwrap_err();
        assert!(
            matches!(&err, OnboardingError::TenantApi(body) if body == r#"{"message":"Internal server error"}"#),
            "{err:?}"
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_client_error_status_is_an_error() {
        let (url, server) = serve_once("400 Bad Request", r#"{"message":"request body invalid"}"#).await;
        let api = HttpTenantApi::new(local_client(), url);

        assert!(matches!(
            api.create_tenant(&acme()).await,
            Err(OnboardingError::TenantApi(_))
        ));
        server.await.unwrap();
    }
}
