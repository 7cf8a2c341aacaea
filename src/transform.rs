// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Coordinate mapping between original-image space and network-input space.
//!
//! The decoder works entirely in network-input pixel space; detections are
//! mapped back through a [`CoordinateTransform`] that mirrors whichever
//! resize the image-preparation step applied. Both directions are provided
//! so the mapping is round-trip testable.

use std::fmt;
use std::str::FromStr;

/// How the original image was fitted to the square network input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizePolicy {
    /// Plain resize: each axis scaled independently to the input resolution.
    Plain,
    /// Letterbox: isotropic resize, shorter axis centered with padding.
    Letterbox,
}

impl ResizePolicy {
    /// Returns the canonical string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Letterbox => "letterbox",
        }
    }

    /// Returns whether this policy preserves the original aspect ratio.
    #[must_use]
    pub const fn preserves_aspect(&self) -> bool {
        matches!(self, Self::Letterbox)
    }
}

impl fmt::Display for ResizePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResizePolicy {
    type Err = ResizePolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" | "stretch" => Ok(Self::Plain),
            "letterbox" | "pad" | "padded" => Ok(Self::Letterbox),
            _ => Err(ResizePolicyParseError(s.to_string())),
        }
    }
}

impl Default for ResizePolicy {
    fn default() -> Self {
        Self::Plain
    }
}

/// Error returned when parsing an invalid resize policy string.
#[derive(Debug, Clone)]
pub struct ResizePolicyParseError(String);

impl fmt::Display for ResizePolicyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid resize policy '{}', expected one of: plain, letterbox",
            self.0
        )
    }
}

impl std::error::Error for ResizePolicyParseError {}

/// Maps points between network-input space and original-image space.
///
/// Pure arithmetic, no error conditions; confidence values are untouched by
/// coordinate mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateTransform {
    policy: ResizePolicy,
    orig_h: f32,
    orig_w: f32,
    input_res: f32,
}

impl CoordinateTransform {
    /// Create a transform for an original image of `(height, width)` fitted
    /// to a square `input_res` network input under `policy`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(policy: ResizePolicy, orig_shape: (usize, usize), input_res: usize) -> Self {
        Self {
            policy,
            orig_h: orig_shape.0 as f32,
            orig_w: orig_shape.1 as f32,
            input_res: input_res as f32,
        }
    }

    /// The policy this transform mirrors.
    #[must_use]
    pub const fn policy(&self) -> ResizePolicy {
        self.policy
    }

    /// Isotropic scale and per-axis borders for the letterbox case. The
    /// taller image pads the x axis, the wider (or square) image the y axis.
    fn letterbox_params(&self) -> (f32, f32, f32) {
        let scale = self.orig_h.max(self.orig_w) / self.input_res;
        if self.orig_h > self.orig_w {
            let border = (self.input_res - self.orig_w / scale) / 2.0;
            (scale, border, 0.0)
        } else {
            let border = (self.input_res - self.orig_h / scale) / 2.0;
            (scale, 0.0, border)
        }
    }

    /// Map a network-input point back to original-image coordinates.
    #[must_use]
    pub fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        match self.policy {
            ResizePolicy::Plain => (
                x * self.orig_w / self.input_res,
                y * self.orig_h / self.input_res,
            ),
            ResizePolicy::Letterbox => {
                let (scale, border_x, border_y) = self.letterbox_params();
                (scale * (x - border_x), scale * (y - border_y))
            }
        }
    }

    /// Map an original-image point into network-input coordinates (the
    /// forward direction of the resize the image preparation applied).
    #[must_use]
    pub fn to_network(&self, x: f32, y: f32) -> (f32, f32) {
        match self.policy {
            ResizePolicy::Plain => (
                x * self.input_res / self.orig_w,
                y * self.input_res / self.orig_h,
            ),
            ResizePolicy::Letterbox => {
                let (scale, border_x, border_y) = self.letterbox_params();
                (x / scale + border_x, y / scale + border_y)
            }
        }
    }
}
