// cropframe - Crop engine for portrait uploads
// Rotates, flips, pans and zooms an image inside a fixed-shape frame and
// renders the framed region at a fixed output size

mod geometry;
mod raster;
mod state;

pub mod error;

pub use error::{CropError, Result};
pub use geometry::{output_dimensions, rotated_bounds, AspectRatio, Rect};
pub use raster::{compute_output_raster, render_crop, JPEG_QUALITY, MAX_LONG_EDGE};
pub use state::{CropState, Viewport, MAX_ZOOM, MIN_ZOOM};

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;

/// Default long edge of the rendered frame in pixels
pub const DEFAULT_LONG_EDGE: u32 = 1024;

/// Height of the on-screen crop frame in display units
pub const DEFAULT_CONTAINER_HEIGHT: f64 = 400.0;

/// Result of a crop
#[derive(Debug, Clone)]
pub struct CroppedImage {
    /// JPEG bytes
    pub data: Vec<u8>,

    pub width: u32,

    pub height: u32,
}

impl CroppedImage {
    pub fn to_data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", BASE64_STANDARD.encode(&self.data))
    }

    /// Save the image to a file
    pub fn save(&self, path: &std::path::Path) -> Result<()> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }
}
