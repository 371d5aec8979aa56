// Orchestration system - prompt building, batch generation and history

pub mod assist;
pub mod config;
pub mod history;
pub mod orchestrator;
pub mod prompt;
pub mod services;
pub mod types;

pub use assist::Assistant;
pub use config::StudioConfig;
pub use history::HistoryStore;
pub use orchestrator::{BatchEvent, BatchOutcome, BatchPhase, BatchRequest, GenerationOrchestrator};
pub use prompt::{ImageSize, SynthesisParameters, build_image_config, build_image_prompt};
pub use services::gemini::GeminiClient;
pub use types::*;
