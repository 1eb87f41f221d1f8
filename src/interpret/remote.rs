//! Client for a messages-style text-generation API.

use crate::config::InterpreterConfig;
use crate::interpret::{
    build_prompt, InterpretError, InterpretationSource, Interpreter, SignalSummary,
};
use serde::{Deserialize, Serialize};

/// API version header sent with every request.
const API_VERSION: &str = "2023-06-01";

/// Request body for the messages endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl MessagesRequest {
    pub fn for_summary(config: &InterpreterConfig, summary: &SignalSummary) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: build_prompt(summary),
            }],
        }
    }
}

/// The parts of the response we read.
#[derive(Debug, Clone, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub text: Option<String>,
}

impl MessagesResponse {
    /// Text of the first content block.
    pub fn into_text(self) -> Result<String, InterpretError> {
        self.content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or(InterpretError::EmptyResponse)
    }
}

/// Async client for the remote interpreter.
pub struct MessagesClient {
    config: InterpreterConfig,
    api_key: String,
    client: reqwest::Client,
}

impl MessagesClient {
    /// Create a client. Fails when no API key is configured.
    pub fn new(config: InterpreterConfig) -> Result<Self, InterpretError> {
        let api_key = config
            .api_key()
            .ok_or_else(|| InterpretError::MissingApiKey(config.api_key_env.clone()))?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(
        config: InterpreterConfig,
        api_key: impl Into<String>,
    ) -> Result<Self, InterpretError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| InterpretError::Config(e.to_string()))?;

        Ok(Self {
            config,
            api_key: api_key.into(),
            client,
        })
    }

    /// Ask for an interpretation of `summary`.
    pub async fn interpret(&self, summary: &SignalSummary) -> Result<String, InterpretError> {
        let body = MessagesRequest::for_summary(&self.config, summary);

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| InterpretError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(InterpretError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| InterpretError::Serialization(e.to_string()))?;

        parsed.into_text()
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

/// Blocking client for use in synchronous contexts.
pub struct BlockingMessagesClient {
    inner: MessagesClient,
    runtime: tokio::runtime::Runtime,
}

impl BlockingMessagesClient {
    pub fn new(config: InterpreterConfig) -> Result<Self, InterpretError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| InterpretError::Config(format!("Failed to create runtime: {e}")))?;

        Ok(Self {
            inner: MessagesClient::new(config)?,
            runtime,
        })
    }
}

impl Interpreter for BlockingMessagesClient {
    fn source(&self) -> InterpretationSource {
        InterpretationSource::Remote
    }

    fn interpret(&self, summary: &SignalSummary) -> Result<String, InterpretError> {
        self.runtime.block_on(self.inner.interpret(summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::anomaly::{AnomalyId, AnomalyKind};
    use chrono::Utc;

    fn summary() -> SignalSummary {
        SignalSummary {
            id: AnomalyId(3),
            kind: AnomalyKind::Em,
            timestamp: Utc::now(),
            deviation: Some(12.0),
            peak_count: 0,
            has_pattern: false,
            frequency_profile: None,
        }
    }

    #[test]
    fn test_request_body_shape() {
        let config = InterpreterConfig::default();
        let body = serde_json::to_value(MessagesRequest::for_summary(&config, &summary())).unwrap();

        assert_eq!(body["model"], config.model.as_str());
        assert_eq!(body["max_tokens"], 300);
        assert_eq!(body["messages"][0]["role"], "user");
        let prompt = body["messages"][0]["content"].as_str().unwrap();
        assert!(prompt.contains("Type: EM"));
        assert!(prompt.contains("Frequency profile: N/A"));
    }

    #[test]
    fn test_response_text() {
        let parsed: MessagesResponse = serde_json::from_str(
            r#"{"id":"msg_1","content":[{"type":"text","text":"A faint carrier."}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.into_text().unwrap(), "A faint carrier.");

        let empty: MessagesResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert_eq!(empty.into_text(), Err(InterpretError::EmptyResponse));
    }

    #[test]
    fn test_missing_api_key() {
        let config = InterpreterConfig {
            api_key_env: format!("COSMICLINK_TEST_UNSET_{}", uuid::Uuid::new_v4().simple()),
            ..InterpreterConfig::default()
        };
        assert!(matches!(
            MessagesClient::new(config),
            Err(InterpretError::MissingApiKey(_))
        ));
    }

    #[test]
    fn test_unreachable_endpoint_is_an_error() {
        let config = InterpreterConfig {
            endpoint: "http://127.0.0.1:9/v1/messages".to_string(),
            request_timeout: std::time::Duration::from_secs(2),
            ..InterpreterConfig::default()
        };
        let client = MessagesClient::with_api_key(config, "test-key").unwrap();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let result = runtime.block_on(client.interpret(&summary()));
        assert!(matches!(result, Err(InterpretError::Network(_))));
    }
}
