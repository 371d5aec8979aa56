// Style assistant - best-effort helpers that prefill the shoot form

use super::services::StyleAssist;
use super::types::{Gender, ImageData};
use std::sync::Arc;

pub const SUGGEST_FALLBACK: &str = "Modern Chic Casual";
pub const SUGGEST_EMPTY: &str = "Avant-Garde Minimalist";
pub const ANALYZE_FALLBACK: &str = "Image analysis failed.";
pub const ANALYZE_EMPTY: &str = "Could not analyze image.";

/// Wraps a [`StyleAssist`] service so that every call yields usable text.
/// Errors are logged and replaced with fixed defaults.
#[derive(Clone)]
pub struct Assistant {
    service: Arc<dyn StyleAssist>,
}

impl Assistant {
    pub fn new(service: Arc<dyn StyleAssist>) -> Self {
        Self { service }
    }

    /// Describe the person and outfit in an uploaded photo
    pub async fn analyze(&self, image: &ImageData) -> String {
        match self.service.analyze(image).await {
            Ok(text) => non_empty(text).unwrap_or_else(|| ANALYZE_EMPTY.to_string()),
            Err(e) => {
                tracing::warn!("Image analysis failed: {}", e);
                ANALYZE_FALLBACK.to_string()
            }
        }
    }

    /// Short photoshoot style name
    pub async fn suggest_style(&self, gender: Gender) -> String {
        match self.service.suggest_style(gender).await {
            Ok(text) => non_empty(text).unwrap_or_else(|| SUGGEST_EMPTY.to_string()),
            Err(e) => {
                tracing::warn!("Style suggestion failed: {}", e);
                SUGGEST_FALLBACK.to_string()
            }
        }
    }

    /// Fashion districts of a city; empty on failure
    pub async fn lookup_location(&self, city: &str, country: &str) -> String {
        match self.service.lookup_location(city, country).await {
            Ok(text) => non_empty(text).unwrap_or_else(|| format!("Fashion districts in {}.", city)),
            Err(e) => {
                tracing::warn!("Location lookup failed for {}: {}", city, e);
                String::new()
            }
        }
    }
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
