// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Decoder configuration.
//!
//! This module defines the [`DecoderConfig`] struct, which controls the
//! thresholds and geometry of the assembly pipeline: peak extraction,
//! connection scoring, person filtering, coordinate mapping and the optional
//! multi-scale/smoothing preprocessing of the network maps.

use crate::error::{PoseError, Result};
use crate::transform::ResizePolicy;

/// Configuration for pose decoding.
///
/// This struct is used to customize the behavior of the decoder.
/// It uses a builder pattern for convenient construction.
///
/// # Example
///
/// ```rust
/// use bodypose::DecoderConfig;
///
/// let config = DecoderConfig::new()
///     .with_joint_threshold(0.15)
///     .with_connection_threshold(0.05)
///     .with_min_joints(6);
/// ```
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Minimum absolute heatmap value for a cell to qualify as a peak
    /// (0.0 to 1.0).
    pub joint_threshold: f32,
    /// Minimum per-sample PAF alignment for a line-integral sample to count
    /// toward the acceptance criterion.
    pub connection_threshold: f32,
    /// Minimum number of found joints to keep an assembled person.
    pub min_joints: usize,
    /// Minimum accumulated-score/joint-count ratio to keep an assembled
    /// person. People at exactly this ratio are kept.
    pub min_score_ratio: f32,
    /// Square network input resolution the maps were produced at.
    pub input_resolution: usize,
    /// How the original image was fitted to the network input.
    pub resize_policy: ResizePolicy,
    /// Multi-scale inference factors. Only used by the fused decode path;
    /// single-map decoding ignores it.
    pub scales: Vec<f32>,
    /// Gaussian sigma for pre-extraction heatmap smoothing. `None` disables
    /// smoothing.
    pub smoothing_sigma: Option<f32>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            joint_threshold: 0.1,
            connection_threshold: 0.05,
            min_joints: 4,
            min_score_ratio: 0.4,
            input_resolution: 368,
            resize_policy: ResizePolicy::Plain,
            scales: vec![1.0],
            smoothing_sigma: None,
        }
    }
}

impl DecoderConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum heatmap value for peak extraction.
    ///
    /// # Arguments
    ///
    /// * `threshold` - The minimum confidence score (0.0 to 1.0).
    #[must_use]
    pub const fn with_joint_threshold(mut self, threshold: f32) -> Self {
        self.joint_threshold = threshold;
        self
    }

    /// Set the per-sample PAF alignment threshold for connection scoring.
    ///
    /// # Arguments
    ///
    /// * `threshold` - The minimum dot product a sample must exceed.
    #[must_use]
    pub const fn with_connection_threshold(mut self, threshold: f32) -> Self {
        self.connection_threshold = threshold;
        self
    }

    /// Set the minimum joint count for a person to survive filtering.
    ///
    /// # Arguments
    ///
    /// * `min` - The minimum number of found joints.
    #[must_use]
    pub const fn with_min_joints(mut self, min: usize) -> Self {
        self.min_joints = min;
        self
    }

    /// Set the minimum accumulated-score/joint-count ratio.
    ///
    /// # Arguments
    ///
    /// * `ratio` - People below this ratio are discarded.
    #[must_use]
    pub const fn with_min_score_ratio(mut self, ratio: f32) -> Self {
        self.min_score_ratio = ratio;
        self
    }

    /// Set the square network input resolution.
    ///
    /// # Arguments
    ///
    /// * `resolution` - The side length of the network input in pixels.
    #[must_use]
    pub const fn with_input_resolution(mut self, resolution: usize) -> Self {
        self.input_resolution = resolution;
        self
    }

    /// Set the resize policy used before inference.
    ///
    /// # Arguments
    ///
    /// * `policy` - Plain stretch or letterbox padding.
    #[must_use]
    pub const fn with_resize_policy(mut self, policy: ResizePolicy) -> Self {
        self.resize_policy = policy;
        self
    }

    /// Set the multi-scale inference factors.
    ///
    /// # Arguments
    ///
    /// * `scales` - One factor per scale pass; all must be positive.
    #[must_use]
    pub fn with_scales(mut self, scales: Vec<f32>) -> Self {
        self.scales = scales;
        self
    }

    /// Enable Gaussian heatmap smoothing before peak extraction.
    ///
    /// # Arguments
    ///
    /// * `sigma` - Standard deviation of the smoothing kernel, in cells.
    #[must_use]
    pub const fn with_smoothing_sigma(mut self, sigma: f32) -> Self {
        self.smoothing_sigma = Some(sigma);
        self
    }

    /// Check the configuration for values the decoder cannot run with.
    ///
    /// Called at decoder construction; a failing configuration never
    /// produces a partial result.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ConfigError`] for a zero input resolution,
    /// non-finite thresholds or ratio, an empty or non-positive scale list,
    /// or a non-positive smoothing sigma.
    pub fn validate(&self) -> Result<()> {
        if self.input_resolution == 0 {
            return Err(PoseError::ConfigError(
                "input resolution must be positive".to_string(),
            ));
        }
        if !self.joint_threshold.is_finite() {
            return Err(PoseError::ConfigError(format!(
                "joint threshold must be finite, got {}",
                self.joint_threshold
            )));
        }
        if !self.connection_threshold.is_finite() {
            return Err(PoseError::ConfigError(format!(
                "connection threshold must be finite, got {}",
                self.connection_threshold
            )));
        }
        if !self.min_score_ratio.is_finite() {
            return Err(PoseError::ConfigError(format!(
                "score ratio must be finite, got {}",
                self.min_score_ratio
            )));
        }
        if self.scales.is_empty() {
            return Err(PoseError::ConfigError(
                "at least one scale factor is required".to_string(),
            ));
        }
        if let Some(bad) = self.scales.iter().find(|s| !s.is_finite() || **s <= 0.0) {
            return Err(PoseError::ConfigError(format!(
                "scale factors must be positive, got {bad}"
            )));
        }
        if let Some(sigma) = self.smoothing_sigma
            && (!sigma.is_finite() || sigma <= 0.0)
        {
            return Err(PoseError::ConfigError(format!(
                "smoothing sigma must be positive, got {sigma}"
            )));
        }
        Ok(())
    }
}
