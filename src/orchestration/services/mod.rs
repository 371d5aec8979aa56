// Remote collaborators consumed by the generation pipeline

pub mod gemini;

use super::prompt::SynthesisParameters;
use super::types::{GarmentDescriptor, Gender, ImageData};
use async_trait::async_trait;

/// Parameters of a garment discovery call
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryRequest {
    pub country: String,
    pub city: Option<String>,
    pub gender: Gender,
    /// Narrows discovery to a specific kind of garment
    pub garment_hint: Option<String>,
    pub deep_research: bool,
}

/// Everything the synthesis service needs for one image
#[derive(Debug, Clone, Copy)]
pub struct SynthesisRequest<'a> {
    pub source_image: Option<&'a ImageData>,
    pub pose_reference: Option<&'a ImageData>,
    pub garment: &'a GarmentDescriptor,
    pub prompt: &'a str,
    pub parameters: &'a SynthesisParameters,
}

/// Finds garments worth photographing for a location
#[async_trait]
pub trait GarmentDiscovery: Send + Sync {
    async fn discover(&self, request: &DiscoveryRequest) -> Result<Vec<GarmentDescriptor>, ServiceError>;
}

/// Renders one image; `Ok(None)` means the service answered without an image
#[async_trait]
pub trait ImageSynthesis: Send + Sync {
    async fn synthesize(&self, request: SynthesisRequest<'_>) -> Result<Option<String>, ServiceError>;
}

/// Best-effort helpers used to prefill the shoot form
#[async_trait]
pub trait StyleAssist: Send + Sync {
    async fn analyze(&self, image: &ImageData) -> Result<String, ServiceError>;

    async fn suggest_style(&self, gender: Gender) -> Result<String, ServiceError>;

    async fn lookup_location(&self, city: &str, country: &str) -> Result<String, ServiceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Empty response: {0}")]
    EmptyResponse(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}
