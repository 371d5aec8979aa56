// Core types for the photoshoot generation pipeline

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Subject gender used in prompts and discovery requests
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Gender {
    #[default]
    Female,
    Male,
    NonBinary,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Female => "female",
            Gender::Male => "male",
            Gender::NonBinary => "non-binary",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "female" => Ok(Gender::Female),
            "male" => Ok(Gender::Male),
            "non-binary" | "nonbinary" => Ok(Gender::NonBinary),
            other => Err(ParseValueError::Gender(other.to_string())),
        }
    }
}

/// Output aspect ratios supported by the synthesis service
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[default]
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "9:16")]
    Story,
    #[serde(rename = "16:9")]
    Widescreen,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Square,
        AspectRatio::Portrait,
        AspectRatio::Landscape,
        AspectRatio::Story,
        AspectRatio::Widescreen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "3:4",
            AspectRatio::Landscape => "4:3",
            AspectRatio::Story => "9:16",
            AspectRatio::Widescreen => "16:9",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        AspectRatio::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == trimmed)
            .ok_or_else(|| ParseValueError::AspectRatio(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseValueError {
    #[error("Unsupported gender: {0} (expected female, male or non-binary)")]
    Gender(String),

    #[error("Unsupported aspect ratio: {0} (expected one of 1:1, 3:4, 4:3, 9:16, 16:9)")]
    AspectRatio(String),
}

/// An encoded image payload (base64 body plus mime type)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageData {
    pub mime_type: String,
    pub data: String,
}

impl ImageData {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Wrap raw image bytes
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(mime_type, BASE64_STANDARD.encode(bytes))
    }

    /// Parse a `data:<mime>;base64,<body>` URL. Bare base64 is accepted and
    /// assumed to be JPEG.
    pub fn from_data_url(value: &str) -> Self {
        let data = match value.split_once("base64,") {
            Some((_, body)) => body,
            None => value,
        };

        let mime_type = value
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(';'))
            .map(|(mime, _)| mime)
            .filter(|mime| !mime.is_empty())
            .unwrap_or("image/jpeg");

        Self::new(mime_type, data)
    }

    /// Load an image file, guessing the mime type from its extension
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let mime_type = path
            .extension()
            .and_then(|e| e.to_str())
            .map(mime_from_extension)
            .unwrap_or("image/jpeg");

        Ok(Self::from_bytes(mime_type, &bytes))
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64_STANDARD.decode(&self.data)
    }
}

fn mime_from_extension(ext: &str) -> &'static str {
    match ext.to_lowercase().as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        _ => "image/jpeg",
    }
}

/// Structured description of a desired photoshoot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ShootConfig {
    pub country: String,

    #[serde(default)]
    pub city: Option<String>,

    #[serde(default)]
    pub gender: Gender,

    #[serde(default)]
    pub photoshoot_style: String,

    #[serde(default)]
    pub background: String,

    #[serde(default)]
    pub pose: String,

    /// Second image whose pose overrides the `pose` label
    #[serde(default)]
    pub pose_reference: Option<ImageData>,

    #[serde(default)]
    pub aspect_ratio: AspectRatio,

    #[serde(default)]
    pub deep_research: bool,

    #[serde(default)]
    pub high_quality: bool,
}

impl ShootConfig {
    pub fn new(country: impl Into<String>, gender: Gender) -> Self {
        Self {
            country: country.into(),
            gender,
            ..Default::default()
        }
    }

    /// City, ignoring blank values
    pub fn city(&self) -> Option<&str> {
        self.city.as_deref().map(str::trim).filter(|c| !c.is_empty())
    }
}

/// A candidate garment produced by the discovery step
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GarmentDescriptor {
    pub name: String,
    pub origin: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Supporting links, at most three, only on the first descriptor
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_links: Vec<String>,
}

impl GarmentDescriptor {
    pub fn new(name: impl Into<String>, origin: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: origin.into(),
            description: None,
            reference_links: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Synthetic descriptor standing in for discovery when the user typed
    /// their own outfit instruction
    pub fn custom_edit(custom_text: &str) -> Self {
        Self::new("Custom Edit", "User Defined").with_description(custom_text)
    }

    /// Placeholder used when discovery fails
    pub fn fallback(country: &str) -> Self {
        Self::new("Traditional Attire", country).with_description("Standard traditional clothing")
    }
}

/// Lifecycle of a single generated image
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Pending,
    Loading,
    Success,
    Error,
}

impl ItemStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Success | ItemStatus::Error)
    }
}

/// Origin label written onto items whose synthesis call failed
pub const ERROR_ORIGIN: &str = "Error";

/// One image slot in a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedItem {
    pub id: String,

    /// Data URL of the image, empty until the item succeeds
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub prompt: String,

    pub garment_name: String,

    #[serde(default)]
    pub garment_origin: String,

    pub timestamp: i64,

    #[serde(default)]
    pub aspect_ratio: AspectRatio,

    #[serde(default)]
    pub status: ItemStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl GeneratedItem {
    pub fn pending(garment: &GarmentDescriptor, prompt: String, aspect_ratio: AspectRatio, timestamp: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: String::new(),
            prompt,
            garment_name: garment.name.clone(),
            garment_origin: garment.origin.clone(),
            timestamp,
            aspect_ratio,
            status: ItemStatus::Pending,
            error: None,
        }
    }

    /// pending -> loading
    pub fn mark_loading(&mut self) -> bool {
        if self.status != ItemStatus::Pending {
            tracing::debug!("Refusing loading transition for item {} in {:?}", self.id, self.status);
            return false;
        }
        self.status = ItemStatus::Loading;
        true
    }

    /// loading -> success
    pub fn mark_success(&mut self, url: String) -> bool {
        if self.status != ItemStatus::Loading {
            tracing::debug!("Refusing success transition for item {} in {:?}", self.id, self.status);
            return false;
        }
        self.url = url;
        self.status = ItemStatus::Success;
        true
    }

    /// loading -> error; the payload stays empty
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> bool {
        if self.status != ItemStatus::Loading {
            tracing::debug!("Refusing error transition for item {} in {:?}", self.id, self.status);
            return false;
        }
        self.status = ItemStatus::Error;
        self.error = Some(reason.into());
        true
    }

    pub fn is_success(&self) -> bool {
        self.status == ItemStatus::Success
    }
}

/// A completed batch as remembered in history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    /// Creation time in unix milliseconds, also the recency key
    pub id: String,

    #[serde(default)]
    pub date: String,

    #[serde(default)]
    pub images: Vec<GeneratedItem>,
}

impl HistoryEntry {
    /// Keep only the successful items; `None` when nothing succeeded
    pub fn from_batch(items: &[GeneratedItem], created: DateTime<Local>) -> Option<Self> {
        let images: Vec<GeneratedItem> = items.iter().filter(|i| i.is_success()).cloned().collect();
        if images.is_empty() {
            return None;
        }

        Some(Self {
            id: created.timestamp_millis().to_string(),
            date: created.format("%Y-%m-%d").to_string(),
            images,
        })
    }

    /// Numeric recency key; ids that are not numbers sort last
    pub fn recency(&self) -> i64 {
        self.id.parse().unwrap_or(i64::MIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn loading_item() -> GeneratedItem {
        let garment = GarmentDescriptor::new("Kimono", "Kyoto");
        let mut item = GeneratedItem::pending(&garment, "prompt".into(), AspectRatio::Portrait, 1);
        assert!(item.mark_loading());
        item
    }

    #[test]
    fn test_aspect_ratio_parsing() {
        assert_eq!("16:9".parse::<AspectRatio>(), Ok(AspectRatio::Widescreen));
        assert_eq!(" 3:4 ".parse::<AspectRatio>(), Ok(AspectRatio::Portrait));
        assert!("2:3".parse::<AspectRatio>().is_err());
        assert_eq!(AspectRatio::default().as_str(), "3:4");
    }

    #[test]
    fn test_gender_serde_names() {
        assert_eq!(serde_json::to_string(&Gender::NonBinary).unwrap(), "\"non-binary\"");
        assert_eq!("Male".parse::<Gender>(), Ok(Gender::Male));
        assert!("robot".parse::<Gender>().is_err());
    }

    #[test]
    fn test_image_data_from_data_url() {
        let image = ImageData::from_data_url("data:image/png;base64,AAAA");
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, "AAAA");
        assert_eq!(image.to_data_url(), "data:image/png;base64,AAAA");

        let bare = ImageData::from_data_url("QUJD");
        assert_eq!(bare.mime_type, "image/jpeg");
        assert_eq!(bare.decode().unwrap(), b"ABC");
    }

    #[test]
    fn test_item_lifecycle_success() {
        let mut item = loading_item();
        assert!(item.mark_success("data:image/jpeg;base64,AAAA".into()));
        assert_eq!(item.status, ItemStatus::Success);

        // Terminal states are final
        assert!(!item.mark_failed("late failure"));
        assert!(!item.mark_loading());
        assert_eq!(item.status, ItemStatus::Success);
        assert!(item.error.is_none());
    }

    #[test]
    fn test_item_lifecycle_error_keeps_payload_empty() {
        let mut item = loading_item();
        assert!(item.mark_failed("no image returned"));
        assert_eq!(item.status, ItemStatus::Error);
        assert!(item.url.is_empty());
        assert!(!item.mark_success("data:late".into()));
        assert!(item.url.is_empty());
    }

    #[test]
    fn test_pending_item_cannot_finish_without_loading() {
        let garment = GarmentDescriptor::new("Sari", "Varanasi");
        let mut item = GeneratedItem::pending(&garment, String::new(), AspectRatio::Square, 1);
        assert!(!item.mark_success("data:x".into()));
        assert_eq!(item.status, ItemStatus::Pending);
    }

    #[test]
    fn test_history_entry_keeps_only_successes() {
        let mut ok = loading_item();
        ok.mark_success("data:ok".into());
        let mut failed = loading_item();
        failed.mark_failed("boom");

        let created = Local.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let entry = HistoryEntry::from_batch(&[ok.clone(), failed.clone()], created).unwrap();
        assert_eq!(entry.id, "1700000000123");
        assert_eq!(entry.images, vec![ok]);
        assert_eq!(entry.recency(), 1_700_000_000_123);

        assert!(HistoryEntry::from_batch(&[failed], created).is_none());
    }

    #[test]
    fn test_history_entry_tolerates_missing_fields() {
        let json = r#"{"id":"42","images":[{"id":"a","garment_name":"Poncho","timestamp":7}]}"#;
        let entry: HistoryEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.date, "");
        assert_eq!(entry.images[0].status, ItemStatus::Pending);
        assert_eq!(entry.images[0].aspect_ratio, AspectRatio::Portrait);
    }
}
