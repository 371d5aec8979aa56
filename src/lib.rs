// lookbook - fashion photoshoot generation pipeline
// Builds prompts from a shoot description, drives garment discovery and
// paced image synthesis, and keeps a local history of finished batches.

pub mod orchestration;

pub use cropframe;
