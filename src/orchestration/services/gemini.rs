// Gemini client - REST implementation of the discovery, synthesis and assist
// collaborators

use super::{DiscoveryRequest, GarmentDiscovery, ImageSynthesis, ServiceError, StyleAssist, SynthesisRequest};
use crate::orchestration::config::{ModelConfig, StudioConfig, api_key_from_env};
use crate::orchestration::prompt::SynthesisParameters;
use crate::orchestration::types::{GarmentDescriptor, Gender, ImageData};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

const MAX_REFERENCE_LINKS: usize = 3;
const DEEP_RESEARCH_THINKING_BUDGET: u32 = 32_768;

/// Client for the Gemini `generateContent` endpoint
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    models: ModelConfig,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, config: &StudioConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ServiceError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            models: config.models.clone(),
        })
    }

    /// Build a client with the API key taken from the environment
    pub fn from_env(config: &StudioConfig) -> Result<Self, ServiceError> {
        let api_key = api_key_from_env().map_err(|e| ServiceError::Configuration(e.to_string()))?;
        Self::new(api_key, config)
    }

    async fn generate(&self, model: &str, request: &GenerateContentRequest) -> Result<GenerateContentResponse, ServiceError> {
        let url = format!("{}/{}:generateContent", self.base_url, model);
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, body));
        }

        response
            .json()
            .await
            .map_err(|e| ServiceError::Parse(format!("Failed to parse Gemini response: {}", e)))
    }

    async fn generate_text(&self, model: &str, request: &GenerateContentRequest) -> Result<String, ServiceError> {
        let response = self.generate(model, request).await?;
        response
            .text()
            .ok_or_else(|| ServiceError::EmptyResponse("Gemini returned no text".into()))
    }
}

#[async_trait]
impl GarmentDiscovery for GeminiClient {
    async fn discover(&self, request: &DiscoveryRequest) -> Result<Vec<GarmentDescriptor>, ServiceError> {
        let model = if request.deep_research {
            &self.models.thinking
        } else {
            &self.models.research
        };

        let mut generation_config = GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(discovery_schema()),
            ..Default::default()
        };

        // Search grounding for the quick path, extended thinking for deep research
        let tools = if request.deep_research {
            generation_config.thinking_config = Some(ThinkingConfig {
                thinking_budget: DEEP_RESEARCH_THINKING_BUDGET,
            });
            Vec::new()
        } else {
            vec![json!({ "googleSearch": {} })]
        };

        let body = GenerateContentRequest {
            contents: vec![Content::user(vec![Part::text(discovery_prompt(request))])],
            generation_config: Some(generation_config),
            tools,
        };

        tracing::info!(
            "Discovering garments for {} with {}",
            request.country,
            model
        );
        let response = self.generate(model, &body).await?;
        parse_discovery(response)
    }
}

#[async_trait]
impl ImageSynthesis for GeminiClient {
    async fn synthesize(&self, request: SynthesisRequest<'_>) -> Result<Option<String>, ServiceError> {
        let model = if request.parameters.image_size.is_some() {
            &self.models.pro_image
        } else {
            &self.models.image
        };

        let mut parts = Vec::new();
        if let Some(source) = request.source_image {
            parts.push(Part::inline(source));
        }
        if let Some(pose) = request.pose_reference {
            parts.push(Part::inline(pose));
        }
        parts.push(Part::text(request.prompt));

        let body = GenerateContentRequest {
            contents: vec![Content::user(parts)],
            generation_config: Some(GenerationConfig {
                image_config: Some(request.parameters.clone()),
                ..Default::default()
            }),
            tools: Vec::new(),
        };

        tracing::info!("Synthesizing {} with {}", request.garment.name, model);
        let response = self.generate(model, &body).await?;
        Ok(response.image_data_url())
    }
}

#[async_trait]
impl StyleAssist for GeminiClient {
    async fn analyze(&self, image: &ImageData) -> Result<String, ServiceError> {
        let body = GenerateContentRequest::prompt(vec![
            Part::inline(image),
            Part::text("Analyze this fashion model. Describe the clothing style, colors, and pose in 2 sentences."),
        ]);
        self.generate_text(&self.models.thinking, &body).await
    }

    async fn suggest_style(&self, gender: Gender) -> Result<String, ServiceError> {
        let body = GenerateContentRequest::prompt(vec![Part::text(format!(
            "Suggest a unique, trending 3-word fashion style for a {} model. Just the 3 words.",
            gender
        ))]);
        self.generate_text(&self.models.lite, &body).await
    }

    async fn lookup_location(&self, city: &str, country: &str) -> Result<String, ServiceError> {
        let mut body = GenerateContentRequest::prompt(vec![Part::text(format!(
            "What are 3 top fashion districts or shopping landmarks in {}, {}? Provide a brief list.",
            city, country
        ))]);
        body.tools = vec![json!({ "googleMaps": {} })];
        self.generate_text(&self.models.maps, &body).await
    }
}

fn discovery_prompt(request: &DiscoveryRequest) -> String {
    let subject = request
        .garment_hint
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .unwrap_or("trending or traditional fashion clothing items");
    let place = match request.city.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(city) => format!("{}, {}", city, request.country),
        None => request.country.clone(),
    };

    format!(
        "List 3 distinct {} popular in {} for a {}.\n\
         Be specific about materials, patterns, and style.\n\
         If specific clothing was requested, vary the styles or colors.",
        subject, place, request.gender
    )
}

fn discovery_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "items": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": { "type": "STRING", "description": "Name of the clothing item" },
                        "origin": { "type": "STRING", "description": "City or Region of origin" },
                        "description": { "type": "STRING", "description": "Visual description of the item" }
                    },
                    "required": ["name", "origin"]
                }
            }
        }
    })
}

fn parse_discovery(response: GenerateContentResponse) -> Result<Vec<GarmentDescriptor>, ServiceError> {
    let text = response.text().unwrap_or_else(|| "{}".to_string());
    let payload: DiscoveryPayload = serde_json::from_str(strip_code_fence(&text))
        .map_err(|e| ServiceError::Parse(format!("Invalid discovery JSON: {}", e)))?;

    let mut garments: Vec<GarmentDescriptor> = payload
        .items
        .into_iter()
        .map(|item| GarmentDescriptor {
            name: item.name,
            origin: item.origin,
            description: item.description,
            reference_links: Vec::new(),
        })
        .collect();

    let links = response.grounding_links();
    if let Some(first) = garments.first_mut() {
        first.reference_links = links.into_iter().take(MAX_REFERENCE_LINKS).collect();
    }

    Ok(garments)
}

/// Remove a surrounding Markdown code fence, if any
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn map_http_error(status: StatusCode, body: String) -> ServiceError {
    let message = serde_json::from_str::<ErrorWrapper>(&body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.clone());
            if status_text.is_empty() {
                msg
            } else {
                format!("{}: {}", status_text, msg)
            }
        })
        .unwrap_or_else(|_| body.clone());

    ServiceError::Api {
        status: status.as_u16(),
        message,
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
}

impl GenerateContentRequest {
    fn prompt(parts: Vec<Part>) -> Self {
        Self {
            contents: vec![Content::user(parts)],
            generation_config: None,
            tools: Vec::new(),
        }
    }
}

#[derive(Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

impl Content {
    fn user(parts: Vec<Part>) -> Self {
        Self {
            role: "user".to_string(),
            parts,
        }
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataPayload,
    },
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    fn inline(image: &ImageData) -> Self {
        Part::InlineData {
            inline_data: InlineDataPayload {
                mime_type: image.mime_type.clone(),
                data: image.data.clone(),
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataPayload {
    mime_type: String,
    data: String,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_config: Option<SynthesisParameters>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        if text.trim().is_empty() { None } else { Some(text) }
    }

    /// First inline image of the first candidate, as a data URL
    fn image_data_url(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        parts
            .iter()
            .filter_map(|p| p.inline_data.as_ref())
            .find(|inline| !inline.data.is_empty())
            .map(|inline| {
                let mime = inline.mime_type.as_deref().unwrap_or("image/jpeg");
                ImageData::new(mime, inline.data.clone()).to_data_url()
            })
    }

    fn grounding_links(&self) -> Vec<String> {
        self.candidates
            .first()
            .and_then(|c| c.grounding_metadata.as_ref())
            .map(|meta| {
                meta.grounding_chunks
                    .iter()
                    .filter_map(|chunk| chunk.web.as_ref()?.uri.clone())
                    .filter(|uri| !uri.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<ContentResponse>,
    #[serde(default)]
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineDataResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataResponse {
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Deserialize)]
struct GroundingChunk {
    #[serde(default)]
    web: Option<WebChunk>,
}

#[derive(Deserialize)]
struct WebChunk {
    #[serde(default)]
    uri: Option<String>,
}

#[derive(Deserialize)]
struct DiscoveryPayload {
    #[serde(default)]
    items: Vec<DiscoveredItem>,
}

#[derive(Deserialize)]
struct DiscoveredItem {
    name: String,
    #[serde(default)]
    origin: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}
