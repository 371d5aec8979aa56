// Plane geometry shared by the crop state and the rasterizer

use crate::{CropError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target frame shape, `w:h` with both sides positive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(CropError::InvalidConfig(format!(
                "aspect ratio sides must be positive, got {}:{}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    /// width / height
    pub fn value(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self { width: 3, height: 4 }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = CropError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CropError::InvalidConfig(format!("aspect ratio must look like w:h, got {:?}", s));
        let (w, h) = s.trim().split_once(':').ok_or_else(invalid)?;
        let w = w.trim().parse().map_err(|_| invalid())?;
        let h = h.trim().parse().map_err(|_| invalid())?;
        Self::new(w, h)
    }
}

/// Axis-aligned rectangle in display or pixel space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn centered(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self {
            x: cx - width / 2.0,
            y: cy - height / 2.0,
            width,
            height,
        }
    }

    pub fn scaled(&self, sx: f64, sy: f64) -> Self {
        Self {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
        }
    }
}

/// Sine and cosine of an angle in degrees. Quarter turns come out exact.
pub fn sin_cos(degrees: f64) -> (f64, f64) {
    let (s, c) = degrees.to_radians().sin_cos();
    (snap(s), snap(c))
}

fn snap(v: f64) -> f64 {
    const EPS: f64 = 1e-12;
    if v.abs() < EPS {
        0.0
    } else if (v.abs() - 1.0).abs() < EPS {
        v.signum()
    } else {
        v
    }
}

/// Size of the box holding a `width` x `height` rectangle rotated by
/// `degrees` about its centre
pub fn rotated_bounds(width: f64, height: f64, degrees: f64) -> (f64, f64) {
    let (s, c) = sin_cos(degrees);
    let (s, c) = (s.abs(), c.abs());
    (width * c + height * s, width * s + height * c)
}

/// Pixel size of the final frame. Landscape and square frames take the
/// long edge as width, portrait frames as height.
pub fn output_dimensions(ratio: AspectRatio, long_edge: u32) -> (u32, u32) {
    let aspect = ratio.value();
    let long = long_edge as f64;
    if aspect >= 1.0 {
        (long_edge, ((long / aspect).round() as u32).max(1))
    } else {
        (((long * aspect).round() as u32).max(1), long_edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ratio() {
        let ratio: AspectRatio = "16:9".parse().unwrap();
        assert_eq!(ratio, AspectRatio { width: 16, height: 9 });
        assert_eq!(ratio.to_string(), "16:9");
        assert_eq!(" 3 : 4 ".parse::<AspectRatio>().unwrap(), AspectRatio::default());
    }

    #[test]
    fn test_parse_ratio_rejects_malformed() {
        for bad in ["", "16", "16:", ":9", "0:1", "4:0", "-1:2", "a:b", "1.5:1"] {
            assert!(matches!(bad.parse::<AspectRatio>(), Err(CropError::InvalidConfig(_))), "{bad}");
        }
    }

    #[test]
    fn test_rotated_bounds() {
        assert_eq!(rotated_bounds(400.0, 300.0, 0.0), (400.0, 300.0));
        assert_eq!(rotated_bounds(400.0, 300.0, 90.0), (300.0, 400.0));
        assert_eq!(rotated_bounds(400.0, 300.0, -270.0), (300.0, 400.0));
        assert_eq!(rotated_bounds(400.0, 300.0, 180.0), (400.0, 300.0));

        let (w, h) = rotated_bounds(100.0, 100.0, 45.0);
        let diagonal = 100.0 * std::f64::consts::SQRT_2;
        assert!((w - diagonal).abs() < 1e-9);
        assert!((h - diagonal).abs() < 1e-9);
    }

    #[test]
    fn test_output_dimensions() {
        let d = |r: &str| output_dimensions(r.parse().unwrap(), 1024);
        assert_eq!(d("1:1"), (1024, 1024));
        assert_eq!(d("16:9"), (1024, 576));
        assert_eq!(d("4:3"), (1024, 768));
        assert_eq!(d("3:4"), (768, 1024));
        assert_eq!(d("9:16"), (576, 1024));
        assert_eq!(output_dimensions("2:3".parse().unwrap(), 1000), (667, 1000));
    }

    #[test]
    fn test_rect_scaling() {
        let rect = Rect::centered(50.0, 40.0, 20.0, 10.0);
        assert_eq!(rect, Rect { x: 40.0, y: 35.0, width: 20.0, height: 10.0 });
        assert_eq!(rect.scaled(2.0, 0.5), Rect { x: 80.0, y: 17.5, width: 40.0, height: 5.0 });
    }
}
