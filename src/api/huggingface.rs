use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::info;

use super::{classify_http_error, ImageGenerator};
use crate::error::{Result, VideoError};

const STAGE: &str = "image generation";

/// Hugging Face inference client for text-to-image models.
#[derive(Debug, Clone)]
pub struct HuggingFaceClient {
    token: String,
    url: String,
    timeout: Duration,
    client: Client,
}

impl HuggingFaceClient {
    pub fn new(token: String, url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            token,
            url,
            timeout,
            client,
        })
    }
}

#[async_trait]
impl ImageGenerator for HuggingFaceClient {
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>> {
        info!("Generating image for prompt: {}", prompt);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&json!({ "inputs": prompt }))
            .send()
            .await
            .map_err(|e| classify_http_error(e, STAGE, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(VideoError::Api(format!(
                "Image generation API error ({}): {}",
                status, error_text
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_http_error(e, STAGE, self.timeout))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HuggingFaceClient {
        HuggingFaceClient::new("hf-token".into(), server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn returns_raw_image_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer hf-token"))
            .and(body_json(json!({ "inputs": "a fleshy macro render" })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0x89, b'P', b'N', b'G']))
            .expect(1)
            .mount(&server)
            .await;

        let bytes = client(&server)
            .generate_image("a fleshy macro render")
            .await
            .unwrap();
        assert_eq!(bytes, vec![0x89, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn failure_status_carries_diagnostic_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Model is loading"))
            .mount(&server)
            .await;

        let err = client(&server).generate_image("x").await.unwrap_err();
        match err {
            VideoError::Api(msg) => {
                assert!(msg.contains("503"));
                assert!(msg.contains("Model is loading"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let client =
            HuggingFaceClient::new("t".into(), server.uri(), Duration::from_millis(200)).unwrap();
        let err = client.generate_image("x").await.unwrap_err();
        assert!(matches!(
            err,
            VideoError::Timeout {
                stage: "image generation",
                ..
            }
        ));
    }
}
