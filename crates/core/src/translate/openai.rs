//! OpenAI-compatible chat-completions backend.
//! Requests a schema-constrained JSON array at temperature 0.

use super::prompt::response_schema;
use super::{BatchRequest, Translator};
use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::trace;

/// Translator that delegates to an OpenAI-compatible chat completion API.
pub struct OpenAiTranslator {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

impl OpenAiTranslator {
    /// Create a translator from `config`; the API key is required.
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| anyhow!("OPENAI_API_KEY is not set"))?;
        Ok(Self {
            client: Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
        })
    }

    /// Build the chat completion body for one batch.
    fn request_body(&self, request: &BatchRequest) -> Result<Value> {
        Ok(json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                {"role": "system", "content": request.system_prompt},
                {"role": "user", "content": request.payload()?},
            ],
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "translation_batch",
                    "schema": response_schema(),
                }
            }
        }))
    }

    /// Send a JSON body to the chat completions endpoint and return the parsed response.
    async fn post_chat(&self, body: &Value) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.api_url);
        trace!("post_chat url={url}");
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .with_context(|| format!("sending request to {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("chat completion failed with {status}: {text}"));
        }
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl Translator for OpenAiTranslator {
    /// Issue one completion request and return the raw message content.
    async fn translate_batch(&self, request: &BatchRequest) -> Result<String> {
        let body = self.request_body(request)?;
        let response = self.post_chat(&body).await?;
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("response contained no choices"))?;
        Ok(choice.message.content.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::IndexedLine;
    use httpmock::prelude::*;

    fn translator(server: &MockServer) -> OpenAiTranslator {
        let config = Config {
            api_url: format!("{}/v1/", server.base_url()),
            api_key: Some("sk-test".into()),
            model: "gpt-test".into(),
            ..Config::default()
        };
        OpenAiTranslator::new(&config).unwrap()
    }

    fn request() -> BatchRequest {
        BatchRequest {
            system_prompt: "translate".into(),
            lines: vec![IndexedLine {
                index: 1,
                text: "Hola".into(),
            }],
        }
    }

    #[test]
    fn requires_api_key() {
        assert!(OpenAiTranslator::new(&Config::default()).is_err());
    }

    #[test]
    fn body_carries_schema_and_payload() {
        let config = Config {
            api_key: Some("k".into()),
            ..Config::default()
        };
        let body = OpenAiTranslator::new(&config)
            .unwrap()
            .request_body(&request())
            .unwrap();
        assert_eq!(body["temperature"], 0);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], r#"[{"index":1,"text":"Hola"}]"#);
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(
            body["response_format"]["json_schema"]["schema"]["type"],
            "array"
        );
    }

    #[tokio::test]
    async fn returns_message_content() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer sk-test")
                    .body_contains("translation_batch");
                then.status(200).json_body(serde_json::json!({
                    "choices": [{"message": {"role": "assistant", "content": "[{\"index\":1,\"text\":\"Hello\"}]"}}]
                }));
            })
            .await;
        let raw = translator(&server).translate_batch(&request()).await.unwrap();
        mock.assert_async().await;
        assert_eq!(raw, r#"[{"index":1,"text":"Hello"}]"#);
    }

    #[tokio::test]
    async fn null_content_is_empty() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(serde_json::json!({
                    "choices": [{"message": {"role": "assistant", "content": null}}]
                }));
            })
            .await;
        let raw = translator(&server).translate_batch(&request()).await.unwrap();
        assert!(raw.is_empty());
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(429).body("slow down");
            })
            .await;
        let err = translator(&server)
            .translate_batch(&request())
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("429"));
        assert!(msg.contains("slow down"));
    }
}
