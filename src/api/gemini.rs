use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{classify_http_error, TextGenerator};
use crate::error::{Result, VideoError};

const STAGE: &str = "text generation";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
    client: Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    /// Absent when the prompt or answer was blocked.
    content: Option<ResponseContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            model,
            base_url,
            timeout,
            client,
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, topic: &str) -> Result<String> {
        info!("Asking {} to write a script about: {}", self.model, topic);

        let url = format!(
            "{}/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: build_prompt(topic),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_http_error(e, STAGE, self.timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(VideoError::Api(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| classify_http_error(e, STAGE, self.timeout))?;

        let Some(candidate) = body.candidates.into_iter().next() else {
            return Err(VideoError::Api("No candidates in Gemini response".to_string()));
        };

        // Gemini may split a single answer across several parts.
        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(VideoError::Api(format!(
                "Gemini returned no content (finishReason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }
        Ok(text)
    }
}

/// Instruction template for a 30-second short.
pub fn build_prompt(topic: &str) -> String {
    format!(
        r#"Create a 30-second YouTube Short script about: {topic}.
Style: Like Zack D. Films (bizarre science/anatomy facts, slightly gross but fascinating).
Output ONLY valid JSON format. No markdown, no extra text.
Format exactly like this:
{{
  "script": "The 30-second spoken script.",
  "visual_prompts": [
    "Scene 1: 3D render, macro photography, fleshy, medical animation style, highly detailed, Unreal Engine 5",
    "Scene 2: (Add another specific 3D style prompt describing the next scene)",
    "Scene 3: (Add another)",
    "Scene 4: (Add another)"
  ]
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GeminiClient {
        GeminiClient::new(
            "test-key".into(),
            "gemini-2.5-flash".into(),
            server.uri(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn prompt_embeds_topic_and_shape() {
        let prompt = build_prompt("swallowing a spider");
        assert!(prompt.contains("about: swallowing a spider."));
        assert!(prompt.contains("\"visual_prompts\""));
    }

    #[tokio::test]
    async fn joins_candidate_parts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "{\"script\":" }, { "text": "\"x\"}" }] }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = client(&server).generate("spiders").await.unwrap();
        assert_eq!(text, "{\"script\":\"x\"}");
    }

    #[tokio::test]
    async fn error_status_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("API key not valid"))
            .mount(&server)
            .await;

        let err = client(&server).generate("spiders").await.unwrap_err();
        match err {
            VideoError::Api(msg) => assert!(msg.contains("API key not valid")),
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_candidates_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let err = client(&server).generate("spiders").await.unwrap_err();
        assert!(matches!(err, VideoError::Api(_)));
    }

    #[tokio::test]
    async fn blocked_candidate_reports_finish_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "finishReason": "SAFETY", "index": 0 }]
            })))
            .mount(&server)
            .await;

        let err = client(&server).generate("spiders").await.unwrap_err();
        match err {
            VideoError::Api(msg) => assert!(msg.contains("finishReason: SAFETY"), "{msg}"),
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
