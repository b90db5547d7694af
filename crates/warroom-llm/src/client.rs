use std::time::Duration;

use serde_json::{Value, json};
use thiserror::Error;

use crate::attachment::PromptPart;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A composed prompt plus an optional normalized attachment part.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub part: Option<PromptPart>,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            part: None,
        }
    }
}

/// A single model attempt failing. The fallback chain decides what happens
/// next; this error never reaches an API client directly.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("provider returned no candidate text")]
    EmptyResponse,
}

/// Thin client for the `generateContent` endpoint. One instance is built at
/// startup from config and shared; per-call state is just the model name.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Result<Self, reqwest::Error> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    /// Fails if the HTTP client cannot be constructed; callers surface this
    /// at startup rather than running without the request timeout.
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    pub async fn generate(&self, model: &str, req: &GenerationRequest) -> Result<String, GenerateError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        );

        let body = build_request_body(req);

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response.json().await?;
        extract_candidate_text(&payload).ok_or(GenerateError::EmptyResponse)
    }
}

fn build_request_body(req: &GenerationRequest) -> Value {
    let mut parts = vec![json!({ "text": req.prompt })];

    match &req.part {
        Some(PromptPart::InlineImage { mime_type, data_b64 }) => {
            parts.push(json!({
                "inline_data": { "mime_type": mime_type, "data": data_b64 }
            }));
        }
        Some(PromptPart::ExtractedText(text)) => {
            parts.push(json!({ "text": format!("Attached document:\n{}", text) }));
        }
        None => {}
    }

    json!({ "contents": [{ "parts": parts }] })
}

/// Concatenates the text parts of the first candidate, if any.
fn extract_candidate_text(payload: &Value) -> Option<String> {
    let parts = payload
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join("");

    if text.is_empty() { None } else { Some(text) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_construction_reports_builder_failures() {
        let client = GeminiClient::with_base_url("key".into(), "http://127.0.0.1:9".into());
        assert!(client.is_ok());
    }

    #[test]
    fn request_body_carries_inline_image_part() {
        let req = GenerationRequest {
            prompt: "describe this".into(),
            part: Some(PromptPart::InlineImage {
                mime_type: "image/png".into(),
                data_b64: "AAAA".into(),
            }),
        };
        let body = build_request_body(&req);
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["text"], "describe this");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(parts[1]["inline_data"]["data"], "AAAA");
    }

    #[test]
    fn request_body_appends_extracted_document_text() {
        let req = GenerationRequest {
            prompt: "summarize".into(),
            part: Some(PromptPart::ExtractedText("page one".into())),
        };
        let body = build_request_body(&req);
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[1]["text"], "Attached document:\npage one");
    }

    #[test]
    fn candidate_text_is_concatenated() {
        let payload = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Hello" }, { "text": ", world" }] }
            }]
        });
        assert_eq!(extract_candidate_text(&payload).unwrap(), "Hello, world");
    }

    #[test]
    fn missing_candidates_yield_none() {
        assert_eq!(extract_candidate_text(&json!({})), None);
        let empty = json!({ "candidates": [{ "content": { "parts": [] } }] });
        assert_eq!(extract_candidate_text(&empty), None);
    }
}
