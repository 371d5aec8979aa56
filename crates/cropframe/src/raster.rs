// Rasterizer - turns a crop state into a fixed-size output image

use crate::geometry::{output_dimensions, sin_cos};
use crate::state::{CropState, Viewport};
use crate::{CropError, CroppedImage, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

pub const JPEG_QUALITY: u8 = 95;

/// Largest accepted long edge of the output frame
pub const MAX_LONG_EDGE: u32 = 16_384;

/// Render the framed region of `source` into a `long_edge`-sized RGB image.
/// Parts of the frame not covered by the image are black.
pub fn render_crop(source: &DynamicImage, state: &CropState, viewport: &Viewport, long_edge: u32) -> Result<RgbImage> {
    validate(source, state, viewport, long_edge)?;

    let rotated = rotate_into_canvas(&source.to_rgba8(), state);
    let (out_w, out_h) = output_dimensions(state.aspect_ratio, long_edge);

    // Frame coordinates to output pixels
    let scale_x = out_w as f64 / viewport.container_width;
    let scale_y = out_h as f64 / viewport.container_height;
    let dest = state.display_rect(viewport).scaled(scale_x, scale_y);

    tracing::debug!(
        "Cropping {}x{} (rotated canvas {}x{}) into {}x{}, dest {:?}",
        source.width(),
        source.height(),
        rotated.width(),
        rotated.height(),
        out_w,
        out_h,
        dest
    );

    let to_canvas_x = rotated.width() as f64 / dest.width;
    let to_canvas_y = rotated.height() as f64 / dest.height;

    let mut output = RgbImage::from_pixel(out_w, out_h, Rgb([0, 0, 0]));
    for (x, y, pixel) in output.enumerate_pixels_mut() {
        let u = (x as f64 + 0.5 - dest.x) * to_canvas_x;
        let v = (y as f64 + 0.5 - dest.y) * to_canvas_y;
        if let Some(Rgba([r, g, b, a])) = sample(&rotated, u, v) {
            let alpha = a as f64 / 255.0;
            *pixel = Rgb([
                (r as f64 * alpha).round() as u8,
                (g as f64 * alpha).round() as u8,
                (b as f64 * alpha).round() as u8,
            ]);
        }
    }

    Ok(output)
}

/// [`render_crop`] followed by JPEG encoding
pub fn compute_output_raster(
    source: &DynamicImage,
    state: &CropState,
    viewport: &Viewport,
    long_edge: u32,
) -> Result<CroppedImage> {
    let frame = render_crop(source, state, viewport, long_edge)?;

    let mut data = Vec::new();
    JpegEncoder::new_with_quality(&mut data, JPEG_QUALITY).encode_image(&frame)?;

    tracing::info!("Cropped image to {}x{} ({} bytes)", frame.width(), frame.height(), data.len());

    Ok(CroppedImage {
        data,
        width: frame.width(),
        height: frame.height(),
    })
}

fn validate(source: &DynamicImage, state: &CropState, viewport: &Viewport, long_edge: u32) -> Result<()> {
    if !(state.zoom.is_finite() && state.zoom > 0.0) {
        return Err(CropError::InvalidConfig(format!("zoom must be positive, got {}", state.zoom)));
    }
    if !state.rotation.is_finite() || !state.pan_x.is_finite() || !state.pan_y.is_finite() {
        return Err(CropError::InvalidConfig("crop transform must be finite".into()));
    }
    if long_edge == 0 || long_edge > MAX_LONG_EDGE {
        return Err(CropError::InvalidConfig(format!(
            "long edge must be between 1 and {}, got {}",
            MAX_LONG_EDGE, long_edge
        )));
    }
    if source.width() == 0 || source.height() == 0 {
        return Err(CropError::InvalidConfig("source image is empty".into()));
    }
    if !viewport.is_valid() {
        return Err(CropError::InvalidConfig(format!("viewport must have positive size, got {:?}", viewport)));
    }
    Ok(())
}

/// Draw `source` rotated about its centre and flipped onto a canvas the
/// size of its rotated bounds. Uncovered canvas pixels stay transparent.
pub(crate) fn rotate_into_canvas(source: &RgbaImage, state: &CropState) -> RgbaImage {
    let (src_w, src_h) = (source.width() as f64, source.height() as f64);
    let (sin, cos) = sin_cos(state.rotation);
    let (flip_x, flip_y) = state.flip_scale();

    let canvas_w = ((src_w * cos.abs() + src_h * sin.abs()).round() as u32).max(1);
    let canvas_h = ((src_w * sin.abs() + src_h * cos.abs()).round() as u32).max(1);
    let (half_w, half_h) = (canvas_w as f64 / 2.0, canvas_h as f64 / 2.0);

    let mut canvas = RgbaImage::new(canvas_w, canvas_h);
    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        let px = x as f64 + 0.5 - half_w;
        let py = y as f64 + 0.5 - half_h;

        // Inverse rotation, then inverse flip
        let qx = (cos * px + sin * py) * flip_x;
        let qy = (-sin * px + cos * py) * flip_y;

        if let Some(color) = sample(source, qx + src_w / 2.0, qy + src_h / 2.0) {
            *pixel = color;
        }
    }

    canvas
}

/// Bilinear sample at continuous coordinates where pixel `i` covers
/// [i, i + 1). `None` outside the image.
fn sample(image: &RgbaImage, x: f64, y: f64) -> Option<Rgba<u8>> {
    let (w, h) = (image.width(), image.height());
    if x < 0.0 || y < 0.0 || x > w as f64 || y > h as f64 {
        return None;
    }

    let fx = (x - 0.5).max(0.0);
    let fy = (y - 0.5).max(0.0);
    let x0 = (fx.floor() as u32).min(w - 1);
    let y0 = (fy.floor() as u32).min(h - 1);
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let tx = (fx - x0 as f64).clamp(0.0, 1.0);
    let ty = (fy - y0 as f64).clamp(0.0, 1.0);

    let (p00, p10) = (image.get_pixel(x0, y0), image.get_pixel(x1, y0));
    let (p01, p11) = (image.get_pixel(x0, y1), image.get_pixel(x1, y1));

    let mut out = [0u8; 4];
    for (c, value) in out.iter_mut().enumerate() {
        let top = p00[c] as f64 * (1.0 - tx) + p10[c] as f64 * tx;
        let bottom = p01[c] as f64 * (1.0 - tx) + p11[c] as f64 * tx;
        *value = (top * (1.0 - ty) + bottom * ty).round() as u8;
    }
    Some(Rgba(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::AspectRatio;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    /// 4x3 image where every pixel has a distinct colour
    fn gradient() -> DynamicImage {
        let img = RgbaImage::from_fn(4, 3, |x, y| Rgba([(x * 60) as u8, (y * 100) as u8, 200, 255]));
        DynamicImage::ImageRgba8(img)
    }

    fn identity_setup() -> (CropState, Viewport) {
        let ratio: AspectRatio = "4:3".parse().unwrap();
        (CropState::new(ratio), Viewport::for_ratio(ratio, 3.0, 4, 3))
    }

    fn rgb(p: Rgba<u8>) -> Rgb<u8> {
        Rgb([p[0], p[1], p[2]])
    }

    #[test]
    fn test_identity_is_pass_through() {
        let source = gradient();
        let (state, viewport) = identity_setup();

        let out = render_crop(&source, &state, &viewport, 4).unwrap();

        assert_eq!(out.dimensions(), (4, 3));
        assert_eq!(out, source.to_rgb8());
    }

    #[test]
    fn test_flip_horizontal_mirrors_rows() {
        let source = gradient();
        let (mut state, viewport) = identity_setup();
        state.flip_horizontal();

        let out = render_crop(&source, &state, &viewport, 4).unwrap();
        let src = source.to_rgb8();
        for y in 0..3 {
            for x in 0..4 {
                assert_eq!(out.get_pixel(x, y), src.get_pixel(3 - x, y));
            }
        }
    }

    #[test]
    fn test_half_turn_equals_double_flip() {
        let source = gradient();
        let (mut rotated, viewport) = identity_setup();
        rotated.rotate_by(180.0);
        let (mut flipped, _) = identity_setup();
        flipped.flip_horizontal();
        flipped.flip_vertical();

        assert_eq!(
            render_crop(&source, &rotated, &viewport, 4).unwrap(),
            render_crop(&source, &flipped, &viewport, 4).unwrap()
        );
    }

    #[test]
    fn test_quarter_turn_swaps_canvas_axes() {
        let source = RgbaImage::from_fn(2, 1, |x, _| if x == 0 { RED } else { BLUE });
        let mut state = CropState::default();
        state.rotate_by(90.0);

        let canvas = rotate_into_canvas(&source, &state);

        assert_eq!(canvas.dimensions(), (1, 2));
        assert_eq!(*canvas.get_pixel(0, 0), RED);
        assert_eq!(*canvas.get_pixel(0, 1), BLUE);
    }

    #[test]
    fn test_diagonal_rotation_leaves_transparent_corners() {
        let source = RgbaImage::from_pixel(10, 10, RED);
        let mut state = CropState::default();
        state.rotate_by(45.0);

        let canvas = rotate_into_canvas(&source, &state);

        assert_eq!(canvas.dimensions(), (14, 14));
        assert_eq!(canvas.get_pixel(0, 0)[3], 0);
        assert_eq!(*canvas.get_pixel(7, 7), RED);
    }

    #[test]
    fn test_zoomed_out_fills_black_border() {
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, RED));
        let ratio: AspectRatio = "1:1".parse().unwrap();
        let mut state = CropState::new(ratio);
        state.set_zoom(0.5);
        let viewport = Viewport::for_ratio(ratio, 100.0, 4, 4);

        let out = render_crop(&source, &state, &viewport, 8).unwrap();

        assert_eq!(out.dimensions(), (8, 8));
        assert_eq!(*out.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*out.get_pixel(7, 7), Rgb([0, 0, 0]));
        assert_eq!(*out.get_pixel(3, 3), rgb(RED));
        assert_eq!(*out.get_pixel(4, 4), rgb(RED));
    }

    #[test]
    fn test_pan_shifts_content() {
        let source = gradient();
        let (mut state, viewport) = identity_setup();
        state.pan_by(1.0, 0.0);

        let out = render_crop(&source, &state, &viewport, 4).unwrap();
        let src = source.to_rgb8();

        assert_eq!(*out.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(1, 1), src.get_pixel(0, 1));
        assert_eq!(out.get_pixel(3, 2), src.get_pixel(2, 2));
    }

    #[test]
    fn test_output_size_follows_ratio_and_long_edge() {
        let source = gradient();
        let ratio: AspectRatio = "3:4".parse().unwrap();
        let state = CropState::new(ratio);
        let viewport = Viewport::for_ratio(ratio, 400.0, 4, 3);

        let out = render_crop(&source, &state, &viewport, 1024).unwrap();
        assert_eq!(out.dimensions(), (768, 1024));
    }

    #[test]
    fn test_rejects_invalid_input() {
        let source = gradient();
        let (state, viewport) = identity_setup();

        let mut zero_zoom = state.clone();
        zero_zoom.zoom = 0.0;
        assert!(matches!(
            render_crop(&source, &zero_zoom, &viewport, 4),
            Err(CropError::InvalidConfig(_))
        ));

        assert!(matches!(
            render_crop(&source, &state, &viewport, 0),
            Err(CropError::InvalidConfig(_))
        ));

        assert!(matches!(
            render_crop(&source, &state, &viewport, 4_000_000_000),
            Err(CropError::InvalidConfig(_))
        ));
        assert!(matches!(
            compute_output_raster(&source, &state, &viewport, MAX_LONG_EDGE + 1),
            Err(CropError::InvalidConfig(_))
        ));

        let flat = Viewport::new(0.0, 3.0, 4, 3);
        assert!(matches!(
            render_crop(&source, &state, &flat, 4),
            Err(CropError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_encodes_jpeg() {
        let source = gradient();
        let (state, viewport) = identity_setup();

        let cropped = compute_output_raster(&source, &state, &viewport, 64).unwrap();

        assert_eq!((cropped.width, cropped.height), (64, 48));
        assert_eq!(&cropped.data[..2], &[0xFF, 0xD8]);
        assert!(cropped.to_data_url().starts_with("data:image/jpeg;base64,/9j/"));

        let decoded = image::load_from_memory(&cropped.data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }
}
