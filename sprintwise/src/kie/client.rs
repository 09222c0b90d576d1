use super::{CreateTaskRequest, GenerationProvider, task_id_from_response};
use crate::config::KieConfig;
use crate::errors::{Error, Result};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

const CREATE_TASK_PATH: &str = "api/v1/jobs/createTask";
const RECORD_INFO_PATH: &str = "api/v1/jobs/recordInfo";

/// kie.ai implementation of [`GenerationProvider`].
///
/// Each operation makes exactly one request, bounded by `request_timeout`; there are no retries.
pub struct KieClient {
    client: Client,
    config: KieConfig,
}

impl KieClient {
    pub fn new(config: KieConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        ensure_slash(&self.config.base_url)
            .join(path)
            .with_context(|| format!("Failed to construct provider URL for {path}"))
            .map_err(Error::from)
    }
}

/// Makes sure a url has a trailing slash, so `join` appends instead of replacing the last segment.
fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let mut path = new_url.path().to_string();
        path.push('/');
        new_url.set_path(&path);
        new_url
    }
}

/// Decode a provider response, surfacing non-success statuses with the provider's raw body.
async fn read_json(response: Response) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(%status, error = %e, "Failed to read provider error body");
                String::new()
            }
        };
        return Err(Error::Remote { status, body });
    }

    let body = response.json::<Value>().await.context("Provider returned an invalid JSON body")?;
    Ok(body)
}

#[async_trait]
impl GenerationProvider for KieClient {
    #[instrument(skip(self), err)]
    async fn create_task(&self, template_url: &str, user_image_url: &str) -> Result<String> {
        let api_key = self.config.require_api_key()?;
        if template_url.is_empty() || user_image_url.is_empty() {
            return Err(Error::BadRequest {
                message: "templateUrl and userImageUrl are required".to_string(),
            });
        }

        let url = self.endpoint(CREATE_TASK_PATH)?;
        let request = CreateTaskRequest::new(&self.config.model, &self.config.prompt, template_url, user_image_url);
        debug!(%url, model = %self.config.model, "Creating generation task");

        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to reach generation provider")?;
        let body = read_json(response).await?;

        let task_id = task_id_from_response(&body).ok_or_else(|| Error::InvalidUpstreamResponse {
            message: "No taskId in response".to_string(),
        })?;

        info!(task_id, "Created generation task");
        Ok(task_id.to_string())
    }

    #[instrument(skip(self), err)]
    async fn task_status(&self, task_id: &str) -> Result<Value> {
        let api_key = self.config.require_api_key()?;

        let mut url = self.endpoint(RECORD_INFO_PATH)?;
        url.query_pairs_mut().append_pair("taskId", task_id);
        debug!(%url, "Fetching task status");

        let response = self
            .client
            .get(url)
            .bearer_auth(api_key)
            .send()
            .await
            .context("Failed to reach generation provider")?;

        read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install_crypto_provider;
    use crate::test_utils::create_test_kie_config;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> KieClient {
        install_crypto_provider();
        KieClient::new(create_test_kie_config(&server.uri())).expect("Failed to create client")
    }

    #[test]
    fn test_ensure_slash() {
        let url = Url::parse("http://localhost:8080/proxy").unwrap();
        assert_eq!(ensure_slash(&url).join("api/v1/jobs/createTask").unwrap().path(), "/proxy/api/v1/jobs/createTask");

        let url = Url::parse("https://api.kie.ai").unwrap();
        assert_eq!(ensure_slash(&url).join("api/v1/jobs/createTask").unwrap().as_str(), "https://api.kie.ai/api/v1/jobs/createTask");
    }

    #[tokio::test]
    async fn test_create_task_sends_fixed_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/jobs/createTask"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_json(json!({
                "model": "nano-banana-pro",
                "input": {
                    "prompt": "test prompt",
                    "image_input": ["https://x/t.png", "https://x/u.png"],
                    "aspect_ratio": "4:3",
                    "resolution": "1K",
                    "output_format": "png"
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 200, "data": {"taskId": "abc123"}})))
            .expect(1)
            .mount(&server)
            .await;

        let task_id = client_for(&server).create_task("https://x/t.png", "https://x/u.png").await.unwrap();

        assert_eq!(task_id, "abc123");
    }

    #[tokio::test]
    async fn test_create_task_missing_task_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 200, "data": {}})))
            .mount(&server)
            .await;

        let err = client_for(&server).create_task("https://x/t.png", "https://x/u.png").await.unwrap_err();

        assert!(matches!(err, Error::InvalidUpstreamResponse { .. }));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "No taskId in response");
    }

    #[tokio::test]
    async fn test_create_task_validates_before_calling() {
        let server = MockServer::start().await;
        Mock::given(method("POST")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let client = client_for(&server);
        for (template, user) in [("", "https://x/u.png"), ("https://x/t.png", ""), ("", "")] {
            let err = client.create_task(template, user).await.unwrap_err();
            assert!(matches!(err, Error::BadRequest { .. }));
            assert_eq!(err.user_message(), "templateUrl and userImageUrl are required");
        }
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_calling() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        install_crypto_provider();
        let mut config = create_test_kie_config(&server.uri());
        config.api_key = None;
        let client = KieClient::new(config).unwrap();

        let err = client.create_task("https://x/t.png", "https://x/u.png").await.unwrap_err();
        assert!(matches!(err, Error::Configuration { setting: "KIE_API_KEY" }));

        let err = client.task_status("abc123").await.unwrap_err();
        assert!(matches!(err, Error::Configuration { setting: "KIE_API_KEY" }));
    }

    #[tokio::test]
    async fn test_remote_errors_mirror_provider() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = client_for(&server);

        for err in [
            client.create_task("https://x/t.png", "https://x/u.png").await.unwrap_err(),
            client.task_status("abc123").await.unwrap_err(),
        ] {
            match err {
                Error::Remote { status, body } => {
                    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
                    assert_eq!(body, "rate limited");
                }
                other => panic!("expected remote error, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_task_status_passes_body_through() {
        let server = MockServer::start().await;
        let record = json!({
            "code": 200,
            "data": {
                "taskId": "abc123",
                "state": "success",
                "resultJson": "{\"resultUrls\":[\"https://cdn/x.png\"]}",
                "somethingNew": [1, 2, 3]
            }
        });
        Mock::given(method("GET"))
            .and(path("/api/v1/jobs/recordInfo"))
            .and(query_param("taskId", "abc123"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(record.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let status = client_for(&server).task_status("abc123").await.unwrap();

        assert_eq!(status, record);
    }

    #[tokio::test]
    async fn test_task_status_forwards_empty_task_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/jobs/recordInfo"))
            .and(query_param("taskId", ""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 422, "data": null})))
            .expect(1)
            .mount(&server)
            .await;

        let status = client_for(&server).task_status("").await.unwrap();

        assert_eq!(status, json!({"code": 422, "data": null}));
    }

    #[tokio::test]
    async fn test_truncated_error_body_keeps_status() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            // Promise more body than is sent, then hang up
            socket
                .write_all(b"HTTP/1.1 503 Service Unavailable\r\ncontent-length: 100\r\n\r\npartial")
                .await
                .unwrap();
        });

        install_crypto_provider();
        let client = KieClient::new(create_test_kie_config(&format!("http://{addr}"))).unwrap();

        match client.task_status("abc123").await.unwrap_err() {
            Error::Remote { status, body } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert!(body.is_empty());
            }
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_internal_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        install_crypto_provider();
        let mut config = create_test_kie_config(&server.uri());
        config.request_timeout = Duration::from_millis(100);
        let client = KieClient::new(config).unwrap();

        let err = client.task_status("abc123").await.unwrap_err();

        assert!(matches!(err, Error::Other(_)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
