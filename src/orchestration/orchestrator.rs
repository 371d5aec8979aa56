// Generation orchestrator - discovery followed by paced, sequential synthesis

use super::history::HistoryStore;
use super::prompt::{build_image_config, build_image_prompt};
use super::services::{DiscoveryRequest, GarmentDiscovery, ImageSynthesis, SynthesisRequest};
use super::types::{ERROR_ORIGIN, GarmentDescriptor, GeneratedItem, HistoryEntry, ImageData, ShootConfig};
use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Default wait between consecutive synthesis calls
pub const DEFAULT_PACING: Duration = Duration::from_millis(4_500);

/// One generation request
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    /// Identity photo of the person to dress
    pub source_image: Option<ImageData>,
    pub config: ShootConfig,
    /// Free-text outfit instruction; skips discovery when non-empty
    pub custom_text: Option<String>,
    /// Narrows discovery to a particular kind of garment
    pub garment_hint: Option<String>,
}

impl BatchRequest {
    pub fn new(config: ShootConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    fn custom_text(&self) -> Option<&str> {
        self.custom_text.as_deref().filter(|t| !t.is_empty())
    }
}

/// Where a batch currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    Idle,
    Discovering,
    Synthesizing { index: usize, total: usize },
    Persisting,
}

/// Progress notifications, delivered in order
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    PhaseChanged(BatchPhase),
    /// Supporting links surfaced by discovery
    ReferenceLinks(Vec<String>),
    /// Full list of pending items, sent once before any synthesis starts
    Placeholders(Vec<GeneratedItem>),
    /// Replacement for the item at `index`
    ItemUpdated { index: usize, item: GeneratedItem },
}

/// Final state of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub items: Vec<GeneratedItem>,
    pub reference_links: Vec<String>,
    /// Entry handed to history, `None` when nothing succeeded
    pub history_entry: Option<HistoryEntry>,
}

impl BatchOutcome {
    pub fn success_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_success()).count()
    }
}

/// Drives one batch at a time: discovery, then one synthesis call per
/// garment with a fixed pause between calls, then history.
///
/// `run_batch` takes `&mut self`, so a second batch cannot start on the
/// same orchestrator while one is in flight.
pub struct GenerationOrchestrator {
    discovery: Arc<dyn GarmentDiscovery>,
    synthesis: Arc<dyn ImageSynthesis>,
    history: HistoryStore,
    pacing: Duration,
    progress: Option<UnboundedSender<BatchEvent>>,
    phase: BatchPhase,
}

impl GenerationOrchestrator {
    pub fn new(discovery: Arc<dyn GarmentDiscovery>, synthesis: Arc<dyn ImageSynthesis>, history: HistoryStore) -> Self {
        Self {
            discovery,
            synthesis,
            history,
            pacing: DEFAULT_PACING,
            progress: None,
            phase: BatchPhase::Idle,
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Send progress events to `sender`
    pub fn with_progress(mut self, sender: UnboundedSender<BatchEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn phase(&self) -> BatchPhase {
        self.phase
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Run a full batch. Collaborator failures are absorbed into item
    /// statuses and the discovery fallback, so a batch always completes.
    pub async fn run_batch(&mut self, request: BatchRequest) -> BatchOutcome {
        let outcome = self.drive(&request).await;
        self.set_phase(BatchPhase::Idle);
        outcome
    }

    async fn drive(&mut self, request: &BatchRequest) -> BatchOutcome {
        let config = &request.config;
        let custom_text = request.custom_text();

        let garments = match custom_text {
            Some(text) => vec![GarmentDescriptor::custom_edit(text)],
            None => {
                self.set_phase(BatchPhase::Discovering);
                self.discover(request).await
            }
        };

        let reference_links: Vec<String> = garments
            .iter()
            .flat_map(|g| g.reference_links.iter().cloned())
            .collect();
        self.emit(BatchEvent::ReferenceLinks(reference_links.clone()));

        let source_present = request.source_image.is_some();
        let parameters = build_image_config(config);
        let created = Local::now().timestamp_millis();
        let mut items: Vec<GeneratedItem> = garments
            .iter()
            .map(|garment| {
                let prompt = build_image_prompt(source_present, garment, config, custom_text);
                GeneratedItem::pending(garment, prompt, config.aspect_ratio, created)
            })
            .collect();
        self.emit(BatchEvent::Placeholders(items.clone()));

        let total = items.len();
        for (index, garment) in garments.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.pacing).await;
            }

            self.set_phase(BatchPhase::Synthesizing { index, total });
            let item = &mut items[index];
            item.mark_loading();
            self.emit(BatchEvent::ItemUpdated {
                index,
                item: item.clone(),
            });

            let synthesis_request = SynthesisRequest {
                source_image: request.source_image.as_ref(),
                pose_reference: config.pose_reference.as_ref(),
                garment,
                prompt: &item.prompt,
                parameters: &parameters,
            };

            match self.synthesis.synthesize(synthesis_request).await {
                Ok(Some(url)) if !url.is_empty() => {
                    item.mark_success(url);
                }
                Ok(_) => {
                    tracing::warn!("No image returned for {}", garment.name);
                    item.mark_failed("no image returned");
                }
                Err(e) => {
                    tracing::warn!("Image generation failed for {}: {}", garment.name, e);
                    item.mark_failed(e.to_string());
                    item.garment_origin = ERROR_ORIGIN.to_string();
                }
            }

            self.emit(BatchEvent::ItemUpdated {
                index,
                item: item.clone(),
            });
        }

        let history_entry = HistoryEntry::from_batch(&items, Local::now());
        if let Some(entry) = &history_entry {
            self.set_phase(BatchPhase::Persisting);
            self.history.save(entry).await;
        } else if total > 0 {
            tracing::info!("No successful images in batch, skipping history");
        }

        BatchOutcome {
            items,
            reference_links,
            history_entry,
        }
    }

    /// Discovery never fails the batch: errors fall back to one generic
    /// garment
    async fn discover(&self, request: &BatchRequest) -> Vec<GarmentDescriptor> {
        let config = &request.config;
        let discovery_request = DiscoveryRequest {
            country: config.country.clone(),
            city: config.city().map(str::to_string),
            gender: config.gender,
            garment_hint: request.garment_hint.clone().filter(|h| !h.trim().is_empty()),
            deep_research: config.deep_research,
        };

        match self.discovery.discover(&discovery_request).await {
            Ok(garments) => {
                tracing::info!("Discovered {} garments for {}", garments.len(), config.country);
                garments
            }
            Err(e) => {
                tracing::warn!("Garment discovery failed, using fallback: {}", e);
                vec![GarmentDescriptor::fallback(&config.country)]
            }
        }
    }

    fn set_phase(&mut self, phase: BatchPhase) {
        if self.phase != phase {
            tracing::debug!("Batch phase: {:?}", phase);
            self.phase = phase;
            self.emit(BatchEvent::PhaseChanged(phase));
        }
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(sender) = &self.progress {
            // A closed receiver only means nobody is watching
            let _ = sender.send(event);
        }
    }
}
