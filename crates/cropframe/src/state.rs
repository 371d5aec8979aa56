// Interactive crop state - pan, zoom, rotation and flips of the image in the
// crop frame

use crate::geometry::{rotated_bounds, AspectRatio, Rect};
use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 3.0;

/// The crop frame on screen and the natural size of the image shown in it.
///
/// The untransformed image is scaled to cover the frame and centred in it,
/// rather than shown at its natural pixel size anchored at the frame's
/// top-left corner, so pan values do not depend on the source resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub container_width: f64,
    pub container_height: f64,
    pub image_width: f64,
    pub image_height: f64,
}

impl Viewport {
    pub fn new(container_width: f64, container_height: f64, image_width: u32, image_height: u32) -> Self {
        Self {
            container_width,
            container_height,
            image_width: image_width as f64,
            image_height: image_height as f64,
        }
    }

    /// Frame of the given shape and height; width follows from the ratio
    pub fn for_ratio(ratio: AspectRatio, container_height: f64, image_width: u32, image_height: u32) -> Self {
        Self::new(container_height * ratio.value(), container_height, image_width, image_height)
    }

    /// Untransformed on-screen size of the image: scaled so that it covers
    /// the whole frame
    pub fn base_display_size(&self) -> (f64, f64) {
        let scale = (self.container_width / self.image_width).max(self.container_height / self.image_height);
        (self.image_width * scale, self.image_height * scale)
    }

    pub(crate) fn is_valid(&self) -> bool {
        [self.container_width, self.container_height, self.image_width, self.image_height]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }
}

/// Transform applied to the image inside the crop frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropState {
    pub pan_x: f64,
    pub pan_y: f64,
    pub zoom: f64,
    /// Degrees, kept in [0, 360)
    pub rotation: f64,
    pub flip_x: bool,
    pub flip_y: bool,
    pub aspect_ratio: AspectRatio,

    /// Pointer position minus pan at drag start
    #[serde(skip)]
    drag_anchor: Option<(f64, f64)>,
}

impl Default for CropState {
    fn default() -> Self {
        Self::new(AspectRatio::default())
    }
}

impl CropState {
    pub fn new(aspect_ratio: AspectRatio) -> Self {
        Self {
            pan_x: 0.0,
            pan_y: 0.0,
            zoom: 1.0,
            rotation: 0.0,
            flip_x: false,
            flip_y: false,
            aspect_ratio,
            drag_anchor: None,
        }
    }

    pub fn begin_drag(&mut self, x: f64, y: f64) {
        self.drag_anchor = Some((x - self.pan_x, y - self.pan_y));
    }

    /// Move the image with the pointer. Ignored outside a drag.
    pub fn drag_to(&mut self, x: f64, y: f64) {
        if let Some((ax, ay)) = self.drag_anchor {
            self.pan_x = x - ax;
            self.pan_y = y - ay;
        }
    }

    pub fn end_drag(&mut self) {
        self.drag_anchor = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Set zoom, clamped to [`MIN_ZOOM`, `MAX_ZOOM`]. Non-finite values are
    /// ignored.
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    pub fn rotate_by(&mut self, degrees: f64) {
        if degrees.is_finite() {
            self.rotation = (self.rotation + degrees).rem_euclid(360.0);
        }
    }

    pub fn flip_horizontal(&mut self) {
        self.flip_x = !self.flip_x;
    }

    pub fn flip_vertical(&mut self) {
        self.flip_y = !self.flip_y;
    }

    /// Back to the untransformed image, keeping the frame shape
    pub fn reset(&mut self) {
        *self = Self::new(self.aspect_ratio);
    }

    /// Scale factors (±1) for the two axes
    pub fn flip_scale(&self) -> (f64, f64) {
        (
            if self.flip_x { -1.0 } else { 1.0 },
            if self.flip_y { -1.0 } else { 1.0 },
        )
    }

    /// Bounding box of the transformed image in frame coordinates
    pub fn display_rect(&self, viewport: &Viewport) -> Rect {
        let (base_w, base_h) = viewport.base_display_size();
        let (w, h) = rotated_bounds(base_w, base_h, self.rotation);
        Rect::centered(
            viewport.container_width / 2.0 + self.pan_x,
            viewport.container_height / 2.0 + self.pan_y,
            w * self.zoom,
            h * self.zoom,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_is_clamped() {
        let mut state = CropState::default();
        state.set_zoom(10.0);
        assert_eq!(state.zoom, MAX_ZOOM);
        state.set_zoom(0.0);
        assert_eq!(state.zoom, MIN_ZOOM);
        state.set_zoom(f64::NAN);
        assert_eq!(state.zoom, MIN_ZOOM);
        state.set_zoom(1.25);
        assert_eq!(state.zoom, 1.25);
    }

    #[test]
    fn test_rotation_wraps() {
        let mut state = CropState::default();
        state.rotate_by(-90.0);
        assert_eq!(state.rotation, 270.0);
        state.rotate_by(180.0);
        assert_eq!(state.rotation, 90.0);
        state.rotate_by(720.0);
        assert_eq!(state.rotation, 90.0);
    }

    #[test]
    fn test_drag_moves_relative_to_grab_point() {
        let mut state = CropState::default();
        state.pan_by(10.0, 5.0);

        state.drag_to(100.0, 100.0);
        assert_eq!((state.pan_x, state.pan_y), (10.0, 5.0));

        state.begin_drag(50.0, 50.0);
        state.drag_to(70.0, 40.0);
        assert_eq!((state.pan_x, state.pan_y), (30.0, -5.0));
        state.end_drag();
        assert!(!state.is_dragging());

        state.drag_to(0.0, 0.0);
        assert_eq!((state.pan_x, state.pan_y), (30.0, -5.0));
    }

    #[test]
    fn test_flips_toggle_and_reset_keeps_ratio() {
        let ratio: AspectRatio = "16:9".parse().unwrap();
        let mut state = CropState::new(ratio);
        state.flip_horizontal();
        state.flip_vertical();
        state.flip_vertical();
        assert_eq!(state.flip_scale(), (-1.0, 1.0));

        state.rotate_by(90.0);
        state.set_zoom(2.0);
        state.reset();
        assert_eq!(state, CropState::new(ratio));
    }

    #[test]
    fn test_base_display_covers_frame() {
        let viewport = Viewport::for_ratio("3:4".parse().unwrap(), 400.0, 1000, 1000);
        assert_eq!(viewport.container_width, 300.0);
        assert_eq!(viewport.base_display_size(), (400.0, 400.0));

        let wide = Viewport::new(300.0, 400.0, 2000, 1000);
        assert_eq!(wide.base_display_size(), (800.0, 400.0));
    }

    #[test]
    fn test_display_rect_is_centred_and_resolution_independent() {
        let mut state = CropState::default();
        state.pan_by(12.0, -8.0);

        let small = Viewport::new(300.0, 400.0, 600, 800);
        let large = Viewport::new(300.0, 400.0, 3000, 4000);

        let rect = state.display_rect(&small);
        assert_eq!(rect, state.display_rect(&large));
        assert_eq!(rect, Rect { x: 12.0, y: -8.0, width: 300.0, height: 400.0 });
    }

    #[test]
    fn test_display_rect_follows_pan_zoom_rotation() {
        let viewport = Viewport::new(300.0, 400.0, 2000, 1000);
        let mut state = CropState::default();
        assert_eq!(
            state.display_rect(&viewport),
            Rect { x: -250.0, y: 0.0, width: 800.0, height: 400.0 }
        );

        state.rotate_by(90.0);
        state.set_zoom(0.5);
        state.pan_by(10.0, -20.0);
        assert_eq!(
            state.display_rect(&viewport),
            Rect { x: 60.0, y: -20.0, width: 200.0, height: 400.0 }
        );
    }
}
