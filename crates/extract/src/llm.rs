use std::fmt;
use std::time::{Duration, Instant};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::ApiError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";
const TEXT_POINTER: &str = "/candidates/0/content/parts/0/text";

/// Sampling parameters sent with every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl GenerationSettings {
    pub fn text() -> Self {
        Self {
            temperature: 0.2,
            top_k: 40,
            top_p: 0.8,
            max_output_tokens: 4096,
        }
    }

    pub fn vision() -> Self {
        Self {
            temperature: 0.4,
            max_output_tokens: 1024,
            ..Self::text()
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Bearer credential tried once when the API key is rejected.
    #[serde(skip_serializing)]
    pub alternate_token: Option<String>,
    pub model: String,
    /// Model tried once when the primary model is unavailable.
    pub fallback_model: Option<String>,
    pub vision_model: String,
    pub request_timeout_secs: u64,
    pub retry_delay_ms: u64,
    pub text: GenerationSettings,
    pub vision: GenerationSettings,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            alternate_token: None,
            model: "gemini-2.0-pro-exp-02-05".to_string(),
            fallback_model: Some("gemini-1.5-pro".to_string()),
            vision_model: "gemini-pro-vision".to_string(),
            request_timeout_secs: 30,
            retry_delay_ms: 500,
            text: GenerationSettings::text(),
            vision: GenerationSettings::vision(),
        }
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |set: bool| if set { "<redacted>" } else { "<unset>" };
        f.debug_struct("GeminiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(!self.api_key.is_empty()))
            .field("alternate_token", &redact(self.alternate_token.is_some()))
            .field("model", &self.model)
            .field("fallback_model", &self.fallback_model)
            .field("vision_model", &self.vision_model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("text", &self.text)
            .field("vision", &self.vision)
            .finish()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: WireSettings,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: &'a [Part<'a>],
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    Image {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireSettings {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

impl From<&GenerationSettings> for WireSettings {
    fn from(settings: &GenerationSettings) -> Self {
        Self {
            temperature: settings.temperature,
            top_k: settings.top_k,
            top_p: settings.top_p,
            max_output_tokens: settings.max_output_tokens,
        }
    }
}

#[derive(Clone, Copy)]
enum Credential<'a> {
    ApiKey(&'a str),
    Bearer(&'a str),
}

impl Credential<'_> {
    fn label(self) -> &'static str {
        match self {
            Credential::ApiKey(_) => "api_key",
            Credential::Bearer(_) => "bearer",
        }
    }
}

/// Client for the Gemini `generateContent` endpoint. Returns the first candidate's text
/// untouched; interpreting it is left to the extractor.
#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn is_configured(&self) -> bool {
        !self.config.api_key.trim().is_empty()
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Same client with a different API key, sharing the connection pool.
    pub fn with_api_key(&self, api_key: impl Into<String>) -> Self {
        let mut config = self.config.clone();
        config.api_key = api_key.into();
        Self {
            config,
            client: self.client.clone(),
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, ApiError> {
        let parts = [Part::Text { text: prompt }];
        self.complete(
            &self.config.model,
            self.config.fallback_model.as_deref(),
            &parts,
            &self.config.text,
        )
        .await
    }

    /// Prompt plus one inline image, sent to the vision model.
    pub async fn generate_with_image(
        &self,
        prompt: &str,
        image: &[u8],
        mime_type: &str,
    ) -> Result<String, ApiError> {
        let parts = [
            Part::Text { text: prompt },
            Part::Image {
                inline_data: InlineData {
                    mime_type,
                    data: STANDARD.encode(image),
                },
            },
        ];
        self.complete(&self.config.vision_model, None, &parts, &self.config.vision)
            .await
    }

    /// One request, plus at most one retry with the alternate credential and at most one
    /// retry against the fallback model.
    async fn complete<'m>(
        &self,
        model: &'m str,
        fallback_model: Option<&'m str>,
        parts: &[Part<'_>],
        settings: &GenerationSettings,
    ) -> Result<String, ApiError> {
        if !self.is_configured() {
            return Err(ApiError::NotConfigured);
        }

        let request = GenerateRequest {
            contents: [Content { role: "user", parts }],
            generation_config: settings.into(),
        };

        let mut model = model;
        let mut credential = Credential::ApiKey(&self.config.api_key);
        let mut credential_retried = false;
        let mut model_retried = false;

        loop {
            let err = match self.send(model, credential, &request).await {
                Ok(text) => return Ok(text),
                Err(err) => err,
            };

            if matches!(err, ApiError::Auth { .. }) && !credential_retried {
                if let Some(token) = self.alternate_token() {
                    warn!(model, error = %err, "API key rejected, retrying with alternate credential");
                    credential_retried = true;
                    credential = Credential::Bearer(token);
                    continue;
                }
            }

            if err.is_model_unavailable() && !model_retried {
                if let Some(fallback) = fallback_model.filter(|f| !f.is_empty() && *f != model) {
                    warn!(
                        model,
                        fallback,
                        error = %err,
                        "model unavailable, retrying with fallback model"
                    );
                    model_retried = true;
                    model = fallback;
                    sleep(Duration::from_millis(self.config.retry_delay_ms)).await;
                    continue;
                }
            }

            return Err(err);
        }
    }

    fn alternate_token(&self) -> Option<&str> {
        self.config
            .alternate_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }

    async fn send(
        &self,
        model: &str,
        credential: Credential<'_>,
        request: &GenerateRequest<'_>,
    ) -> Result<String, ApiError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        );
        debug!(url = %url, credential = credential.label(), "sending completion request");

        let builder = self.client.post(&url).json(request);
        let builder = match credential {
            Credential::ApiKey(key) => builder.header(API_KEY_HEADER, key),
            Credential::Bearer(token) => builder.bearer_auth(token),
        };

        let started = Instant::now();
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        debug!(
            model,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = body.len(),
            "completion response received"
        );

        if !status.is_success() {
            let err = ApiError::from_status(status, &body);
            warn!(
                model,
                status = status.as_u16(),
                kind = err.kind().as_str(),
                "completion request failed"
            );
            return Err(err);
        }

        candidate_text(&body)
    }
}

/// Pull `candidates[0].content.parts[0].text` out of a response envelope.
fn candidate_text(body: &str) -> Result<String, ApiError> {
    let envelope: Value = serde_json::from_str(body).map_err(ApiError::JsonParse)?;

    let has_candidates = envelope
        .get("candidates")
        .and_then(Value::as_array)
        .is_some_and(|candidates| !candidates.is_empty());
    if !has_candidates {
        return Err(ApiError::MissingCandidates);
    }

    envelope
        .pointer(TEXT_POINTER)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ApiError::UnexpectedStructure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiErrorKind;
    use mockito::Matcher;
    use serde_json::json;

    const PRIMARY_PATH: &str = "/models/gemini-test:generateContent";
    const FALLBACK_PATH: &str = "/models/gemini-fallback:generateContent";

    fn test_config(base_url: String) -> GeminiConfig {
        GeminiConfig {
            base_url,
            api_key: "test-key".to_string(),
            model: "gemini-test".to_string(),
            fallback_model: Some("gemini-fallback".to_string()),
            vision_model: "gemini-vision-test".to_string(),
            retry_delay_ms: 0,
            ..GeminiConfig::default()
        }
    }

    fn envelope(text: &str) -> String {
        json!({
            "candidates": [{"content": {"role": "model", "parts": [{"text": text}]}}]
        })
        .to_string()
    }

    #[test]
    fn test_candidate_text() {
        assert_eq!(candidate_text(&envelope("hello")).unwrap(), "hello");
        assert_eq!(
            candidate_text("not json").unwrap_err().kind(),
            ApiErrorKind::JsonParseError
        );
        assert_eq!(
            candidate_text(r#"{"candidates": []}"#).unwrap_err().kind(),
            ApiErrorKind::MissingCandidates
        );
        assert_eq!(
            candidate_text(r#"{"error": {"message": "quota"}}"#).unwrap_err().kind(),
            ApiErrorKind::MissingCandidates
        );
        assert_eq!(
            candidate_text(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#)
                .unwrap_err()
                .kind(),
            ApiErrorKind::UnexpectedStructure
        );
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let config = GeminiConfig {
            api_key: "secret-key".to_string(),
            alternate_token: Some("secret-token".to_string()),
            ..GeminiConfig::default()
        };
        let printed = format!("{config:?}");
        assert!(!printed.contains("secret"));
        assert!(printed.contains("<redacted>"));

        let serialized = serde_json::to_string(&config).unwrap();
        assert!(!serialized.contains("secret"));
    }

    #[tokio::test]
    async fn test_generate_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", PRIMARY_PATH)
            .match_header(API_KEY_HEADER, "test-key")
            .match_body(Matcher::PartialJson(json!({
                "contents": [{"role": "user", "parts": [{"text": "List tomatoes"}]}],
                "generationConfig": {"topK": 40, "maxOutputTokens": 4096}
            })))
            .with_status(200)
            .with_body(envelope(r#"{"varieties": []}"#))
            .create_async()
            .await;

        let client = GeminiClient::new(test_config(server.url())).unwrap();
        let text = client.generate("List tomatoes").await.unwrap();

        assert_eq!(text, r#"{"varieties": []}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_image_is_sent_inline() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-vision-test:generateContent")
            .match_body(Matcher::PartialJson(json!({
                "contents": [{"parts": [
                    {"text": "What seed is this?"},
                    {"inlineData": {"mimeType": "image/png", "data": "AQID"}}
                ]}],
                "generationConfig": {"maxOutputTokens": 1024}
            })))
            .with_status(200)
            .with_body(envelope("a bean"))
            .create_async()
            .await;

        let client = GeminiClient::new(test_config(server.url())).unwrap();
        let text = client
            .generate_with_image("What seed is this?", &[1, 2, 3], "image/png")
            .await
            .unwrap();

        assert_eq!(text, "a bean");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_auth_failure_retries_once_with_alternate_credential() {
        let mut server = mockito::Server::new_async().await;
        let rejected = server
            .mock("POST", PRIMARY_PATH)
            .match_header(API_KEY_HEADER, "test-key")
            .with_status(401)
            .with_body(r#"{"error": {"message": "API key not valid."}}"#)
            .expect(1)
            .create_async()
            .await;
        let accepted = server
            .mock("POST", PRIMARY_PATH)
            .match_header("authorization", "Bearer alt-token")
            .with_status(200)
            .with_body(envelope("ok"))
            .expect(1)
            .create_async()
            .await;

        let config = GeminiConfig {
            alternate_token: Some("alt-token".to_string()),
            ..test_config(server.url())
        };
        let client = GeminiClient::new(config).unwrap();

        assert_eq!(client.generate("hi").await.unwrap(), "ok");
        rejected.assert_async().await;
        accepted.assert_async().await;
    }

    #[tokio::test]
    async fn test_alternate_credential_is_tried_only_once() {
        let mut server = mockito::Server::new_async().await;
        let rejected_key = server
            .mock("POST", PRIMARY_PATH)
            .match_header(API_KEY_HEADER, "test-key")
            .with_status(401)
            .with_body(r#"{"error": {"message": "API key not valid."}}"#)
            .expect(1)
            .create_async()
            .await;
        let rejected_token = server
            .mock("POST", PRIMARY_PATH)
            .match_header("authorization", "Bearer alt-token")
            .with_status(401)
            .with_body(r#"{"error": {"message": "Token expired."}}"#)
            .expect(1)
            .create_async()
            .await;

        let config = GeminiConfig {
            alternate_token: Some("alt-token".to_string()),
            ..test_config(server.url())
        };
        let client = GeminiClient::new(config).unwrap();
        let err = client.generate("hi").await.unwrap_err();

        assert_eq!(err.kind(), ApiErrorKind::AuthError);
        assert!(err.to_string().contains("Token expired."));
        rejected_key.assert_async().await;
        rejected_token.assert_async().await;
    }

    #[tokio::test]
    async fn test_auth_failure_without_alternate_credential() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", PRIMARY_PATH)
            .with_status(403)
            .with_body(r#"{"error": {"message": "Permission denied."}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = GeminiClient::new(test_config(server.url())).unwrap();
        let err = client.generate("hi").await.unwrap_err();

        assert_eq!(err.kind(), ApiErrorKind::AuthError);
        assert!(err.to_string().contains("Permission denied."));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_retries_fallback_model_once() {
        let mut server = mockito::Server::new_async().await;
        let primary = server
            .mock("POST", PRIMARY_PATH)
            .with_status(503)
            .expect(1)
            .create_async()
            .await;
        let fallback = server
            .mock("POST", FALLBACK_PATH)
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let client = GeminiClient::new(test_config(server.url())).unwrap();
        let err = client.generate("hi").await.unwrap_err();

        assert_eq!(err.kind(), ApiErrorKind::ServerError);
        primary.assert_async().await;
        fallback.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_model_uses_fallback() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", PRIMARY_PATH)
            .with_status(404)
            .with_body(r#"{"error": {"message": "models/gemini-test is not found"}}"#)
            .create_async()
            .await;
        server
            .mock("POST", FALLBACK_PATH)
            .with_status(200)
            .with_body(envelope("from fallback"))
            .create_async()
            .await;

        let client = GeminiClient::new(test_config(server.url())).unwrap();
        assert_eq!(client.generate("hi").await.unwrap(), "from fallback");
    }

    #[tokio::test]
    async fn test_rate_limit_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", PRIMARY_PATH)
            .with_status(429)
            .expect(1)
            .create_async()
            .await;
        let fallback = server
            .mock("POST", FALLBACK_PATH)
            .expect(0)
            .create_async()
            .await;

        let client = GeminiClient::new(test_config(server.url())).unwrap();
        let err = client.generate("hi").await.unwrap_err();

        assert_eq!(err.kind(), ApiErrorKind::RateLimit);
        mock.assert_async().await;
        fallback.assert_async().await;
    }

    #[tokio::test]
    async fn test_envelope_errors() {
        let cases = [
            ("<html>oops</html>", ApiErrorKind::JsonParseError),
            (r#"{"candidates": []}"#, ApiErrorKind::MissingCandidates),
            (
                r#"{"candidates": [{"content": {"parts": []}}]}"#,
                ApiErrorKind::UnexpectedStructure,
            ),
        ];

        for (body, kind) in cases {
            let mut server = mockito::Server::new_async().await;
            server
                .mock("POST", PRIMARY_PATH)
                .with_status(200)
                .with_body(body)
                .create_async()
                .await;

            let client = GeminiClient::new(test_config(server.url())).unwrap();
            let err = client.generate("hi").await.unwrap_err();
            assert_eq!(err.kind(), kind, "body {body}");
        }
    }

    #[tokio::test]
    async fn test_not_configured_makes_no_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", Matcher::Any).expect(0).create_async().await;

        let client = GeminiClient::new(test_config(server.url()))
            .unwrap()
            .with_api_key("  ");
        assert!(!client.is_configured());

        let err = client.generate("hi").await.unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::NotConfigured);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_network_error() {
        let config = GeminiConfig {
            fallback_model: None,
            ..test_config("http://127.0.0.1:1".to_string())
        };
        let client = GeminiClient::new(config).unwrap();

        let err = client.generate("hi").await.unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::NetworkError);
    }
}
