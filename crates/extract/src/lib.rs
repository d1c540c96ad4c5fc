pub mod error;
pub mod extractor;
pub mod fallback;
pub mod heuristic;
pub mod llm;
pub mod normalizer;
pub mod pairing;
pub mod prompt;
pub mod scan;
pub mod schema;

pub use error::{ApiError, ApiErrorKind};
pub use extractor::{extract, extract_record, extract_varieties};
pub use llm::{GeminiClient, GeminiConfig, GenerationSettings};
pub use schema::{
    ConnectionCheck, ExpectedShape, Extracted, ExtractionOutcome, ExtractionResult,
    ImageAnalysis, SeedQuery, SeedRecord, Strategy, Variety, VarietyList,
};

use tracing::{debug, info};

pub const SUPPORTED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// Catalog operations: build a prompt, make one completion call, extract the reply.
#[derive(Clone)]
pub struct SeedAssistant {
    client: GeminiClient,
}

impl SeedAssistant {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: GeminiConfig) -> Result<Self, ApiError> {
        Ok(Self::new(GeminiClient::new(config)?))
    }

    pub fn client(&self) -> &GeminiClient {
        &self.client
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_configured()
    }

    /// Full catalog record for a seed identified by any of variety, plant type, brand or SKU.
    pub async fn seed_details(&self, query: &SeedQuery) -> Result<Extracted<SeedRecord>, ApiError> {
        if query.is_empty() {
            return Err(ApiError::InvalidRequest(
                "Please provide at least a seed variety, plant type, brand or SKU.".to_string(),
            ));
        }

        let context = query.context();
        debug!(context = %context, "requesting seed details");
        let raw = self
            .client
            .generate(&prompt::build_seed_details_prompt(&context))
            .await?;

        Ok(extractor::extract_record(&raw))
    }

    /// Variety suggestions for a search term. Falls back to the curated table keyed by the
    /// term when the reply has no usable list.
    pub async fn search_varieties(&self, term: &str) -> Result<Extracted<VarietyList>, ApiError> {
        let term = required(term, "No search term provided.")?;

        let raw = self
            .client
            .generate(&prompt::build_varieties_prompt(term))
            .await?;
        let extracted = extractor::extract_varieties(&raw, Some(term));

        info!(
            term,
            count = extracted.value.len(),
            strategy = extracted.strategy.as_str(),
            "variety search complete"
        );
        Ok(extracted)
    }

    pub async fn growing_instructions(
        &self,
        seed_name: &str,
        variety: Option<&str>,
    ) -> Result<Extracted<SeedRecord>, ApiError> {
        let plant = prompt::plant_label(required(seed_name, "Seed name is required.")?, variety);
        let raw = self.client.generate(&prompt::build_growing_prompt(&plant)).await?;
        Ok(extractor::extract_record(&raw))
    }

    pub async fn care_instructions(
        &self,
        seed_name: &str,
        variety: Option<&str>,
    ) -> Result<Extracted<SeedRecord>, ApiError> {
        let plant = prompt::plant_label(required(seed_name, "Seed name is required.")?, variety);
        let raw = self.client.generate(&prompt::build_care_prompt(&plant)).await?;
        Ok(extractor::extract_record(&raw))
    }

    /// Catalog description as plain prose.
    pub async fn description(&self, seed_name: &str, variety: Option<&str>) -> Result<String, ApiError> {
        let plant = prompt::plant_label(required(seed_name, "Seed name is required.")?, variety);
        let raw = self
            .client
            .generate(&prompt::build_description_prompt(&plant))
            .await?;
        Ok(raw.trim().to_string())
    }

    /// Free-form question; the reply is returned as is.
    pub async fn search(
        &self,
        query: &str,
        context: Option<&str>,
        seed_context: Option<&str>,
    ) -> Result<String, ApiError> {
        let query = required(query, "No search query provided.")?;
        self.client
            .generate(&prompt::build_search_prompt(query, context, seed_context))
            .await
    }

    /// Identify a seed or plant from a photo.
    pub async fn analyze_image(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<Extracted<ImageAnalysis>, ApiError> {
        let mime_type = image_mime_type(mime_type)?;
        if image.is_empty() {
            return Err(ApiError::InvalidRequest("No image uploaded.".to_string()));
        }

        debug!(mime_type, bytes = image.len(), "analyzing image");
        let raw = self
            .client
            .generate_with_image(prompt::build_image_prompt(), image, mime_type)
            .await?;

        Ok(extractor::extract_record(&raw).map(|record| ImageAnalysis::from_record(&record)))
    }

    /// Round-trip check of the credential. `api_key` overrides the configured key for this
    /// call only. Failures are reported in the result rather than as an error.
    pub async fn test_connection(&self, api_key: Option<&str>) -> ConnectionCheck {
        let client = match api_key.map(str::trim).filter(|key| !key.is_empty()) {
            Some(key) => self.client.with_api_key(key),
            None => self.client.clone(),
        };

        if !client.is_configured() {
            return ConnectionCheck {
                ok: false,
                message: "No API key provided.".to_string(),
                response: String::new(),
                error_type: Some(ApiErrorKind::NotConfigured),
            };
        }

        match client.generate(&prompt::build_connection_test_prompt()).await {
            Ok(reply) if reply.contains(prompt::CONNECTION_TEST_REPLY) => ConnectionCheck {
                ok: true,
                message: "Connection successful.".to_string(),
                response: reply,
                error_type: None,
            },
            Ok(reply) => ConnectionCheck {
                ok: false,
                message: "API responded, but with unexpected content.".to_string(),
                response: reply,
                error_type: None,
            },
            Err(err) => ConnectionCheck {
                ok: false,
                message: err.user_message(),
                response: String::new(),
                error_type: Some(err.kind()),
            },
        }
    }
}

fn required<'a>(value: &'a str, message: &str) -> Result<&'a str, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::InvalidRequest(message.to_string()));
    }
    Ok(value)
}

/// Canonical MIME type for a supported image, ignoring case and parameters.
pub fn image_mime_type(content_type: &str) -> Result<&'static str, ApiError> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let essence = if essence == "image/jpg" { "image/jpeg".to_string() } else { essence };

    SUPPORTED_IMAGE_TYPES
        .into_iter()
        .find(|supported| *supported == essence)
        .ok_or_else(|| {
            ApiError::InvalidRequest(
                "Invalid file type. Please upload a JPEG, PNG or WebP image.".to_string(),
            )
        })
}
