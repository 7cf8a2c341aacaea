// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Network output containers: confidence maps and part affinity fields.
//!
//! This module holds the tensors the external model produces, validates
//! their shapes against a topology, fuses multi-scale outputs by elementwise
//! averaging, and optionally smooths the heatmaps with a Gaussian kernel
//! before peak extraction.

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

use ndarray::{Array2, Array3, ArrayView2, Axis};

use crate::error::{PoseError, Result};
use crate::topology::Topology;

/// Heatmap and PAF tensors for one frame, both `(H, W, C)` at the network
/// input resolution.
///
/// Heatmaps carry one channel per joint type (background excluded); the PAF
/// carries two channels per limb type (x-component, then y-component).
#[derive(Debug, Clone)]
pub struct PoseMaps {
    /// Per-joint confidence maps, shape `(H, W, J)`.
    pub heatmaps: Array3<f32>,
    /// Part affinity fields, shape `(H, W, 2L)`.
    pub pafs: Array3<f32>,
}

impl PoseMaps {
    /// Wrap a heatmap/PAF tensor pair.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ShapeError`] if the two tensors disagree on
    /// spatial resolution.
    pub fn new(heatmaps: Array3<f32>, pafs: Array3<f32>) -> Result<Self> {
        let (hm_h, hm_w, _) = heatmaps.dim();
        let (paf_h, paf_w, _) = pafs.dim();
        if (hm_h, hm_w) != (paf_h, paf_w) {
            return Err(PoseError::ShapeError(format!(
                "heatmaps are {hm_h}x{hm_w} but PAFs are {paf_h}x{paf_w}"
            )));
        }
        Ok(Self { heatmaps, pafs })
    }

    /// All-zero maps of the correct shape for `topology` at `resolution`.
    #[must_use]
    pub fn zeros(resolution: usize, topology: &Topology) -> Self {
        Self {
            heatmaps: Array3::zeros((resolution, resolution, topology.num_joints())),
            pafs: Array3::zeros((resolution, resolution, topology.paf_channels())),
        }
    }

    /// Spatial resolution `(height, width)`.
    #[must_use]
    pub fn resolution(&self) -> (usize, usize) {
        let (h, w, _) = self.heatmaps.dim();
        (h, w)
    }

    /// Validate channel counts against a topology and the spatial size
    /// against the configured square input resolution.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ShapeError`] on any mismatch; the decoder calls
    /// this at entry so no partial result is ever produced from misshapen
    /// tensors.
    pub fn validate_for(&self, topology: &Topology, input_resolution: usize) -> Result<()> {
        let (h, w, joints) = self.heatmaps.dim();
        let (_, _, paf_channels) = self.pafs.dim();
        if joints != topology.num_joints() {
            return Err(PoseError::ShapeError(format!(
                "heatmaps have {joints} channels but the topology defines {} joints",
                topology.num_joints()
            )));
        }
        if paf_channels != topology.paf_channels() {
            return Err(PoseError::ShapeError(format!(
                "PAFs have {paf_channels} channels but the topology needs {}",
                topology.paf_channels()
            )));
        }
        if h != w {
            return Err(PoseError::ShapeError(format!(
                "expected square maps, got {h}x{w}"
            )));
        }
        if h != input_resolution {
            return Err(PoseError::ShapeError(format!(
                "maps are {h}x{w} but the configured input resolution is {input_resolution}"
            )));
        }
        Ok(())
    }

    /// Fuse per-scale outputs into one map pair by elementwise averaging.
    ///
    /// All outputs must share one shape; the whole call fails before any
    /// averaging work if they do not (no partial-average semantics).
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ConfigError`] for an empty slice and
    /// [`PoseError::ShapeError`] for any shape disagreement.
    pub fn average(outputs: &[Self]) -> Result<Self> {
        let first = outputs.first().ok_or_else(|| {
            PoseError::ConfigError("cannot average zero scale outputs".to_string())
        })?;
        let hm_dim = first.heatmaps.dim();
        let paf_dim = first.pafs.dim();
        for (i, maps) in outputs.iter().enumerate().skip(1) {
            if maps.heatmaps.dim() != hm_dim || maps.pafs.dim() != paf_dim {
                return Err(PoseError::ShapeError(format!(
                    "scale output {i} has heatmap shape {:?} and PAF shape {:?}, expected {hm_dim:?} and {paf_dim:?}",
                    maps.heatmaps.dim(),
                    maps.pafs.dim()
                )));
            }
        }
        if outputs.len() == 1 {
            return Ok(first.clone());
        }

        let heatmap_refs: Vec<&Array3<f32>> = outputs.iter().map(|m| &m.heatmaps).collect();
        let paf_refs: Vec<&Array3<f32>> = outputs.iter().map(|m| &m.pafs).collect();
        Ok(Self {
            heatmaps: mean_channels(&heatmap_refs),
            pafs: mean_channels(&paf_refs),
        })
    }

    /// Smooth the heatmaps in place with a depthwise Gaussian of standard
    /// deviation `sigma`. The PAFs are never smoothed.
    ///
    /// Kernel taps sit at integer offsets in `[-floor(3σ), floor(3σ)]` and
    /// carry raw normal-pdf weights; borders are zero-padded. Peak values
    /// therefore shrink slightly, which downstream thresholds account for.
    pub fn smooth_heatmaps(&mut self, sigma: f32) {
        use rayon::prelude::*;

        let taps = gaussian_taps(sigma);
        let channels = self.heatmaps.dim().2;
        let smoothed: Vec<Array2<f32>> = (0..channels)
            .into_par_iter()
            .map(|ch| smooth_channel(self.heatmaps.index_axis(Axis(2), ch), &taps))
            .collect();
        for (ch, channel) in smoothed.iter().enumerate() {
            self.heatmaps.index_axis_mut(Axis(2), ch).assign(channel);
        }
    }
}

/// Per-channel elementwise mean across same-shaped stacks.
fn mean_channels(stacks: &[&Array3<f32>]) -> Array3<f32> {
    use rayon::prelude::*;

    let (h, w, channels) = stacks[0].dim();
    let inv = 1.0 / stacks.len() as f32;
    let means: Vec<Array2<f32>> = (0..channels)
        .into_par_iter()
        .map(|ch| {
            let mut acc = stacks[0].index_axis(Axis(2), ch).to_owned();
            for stack in &stacks[1..] {
                acc += &stack.index_axis(Axis(2), ch);
            }
            acc *= inv;
            acc
        })
        .collect();

    let mut fused = Array3::zeros((h, w, channels));
    for (ch, mean) in means.iter().enumerate() {
        fused.index_axis_mut(Axis(2), ch).assign(mean);
    }
    fused
}

/// 1D Gaussian taps: raw pdf values at integer offsets, not renormalized.
fn gaussian_taps(sigma: f32) -> Vec<f32> {
    let radius = (3.0 * sigma).floor() as isize;
    let norm = 1.0 / (sigma * (2.0 * std::f32::consts::PI).sqrt());
    (-radius..=radius)
        .map(|i| {
            let x = i as f32;
            norm * (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect()
}

/// Separable 2D convolution of one channel with zero padding.
fn smooth_channel(channel: ArrayView2<'_, f32>, taps: &[f32]) -> Array2<f32> {
    let (h, w) = channel.dim();
    let radius = (taps.len() / 2) as isize;

    let mut horizontal = Array2::<f32>::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, &tap) in taps.iter().enumerate() {
                let sx = x as isize + k as isize - radius;
                if sx >= 0 && (sx as usize) < w {
                    acc += tap * channel[[y, sx as usize]];
                }
            }
            horizontal[[y, x]] = acc;
        }
    }

    let mut smoothed = Array2::<f32>::zeros((h, w));
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, &tap) in taps.iter().enumerate() {
                let sy = y as isize + k as isize - radius;
                if sy >= 0 && (sy as usize) < h {
                    acc += tap * horizontal[[sy as usize, x]];
                }
            }
            smoothed[[y, x]] = acc;
        }
    }
    smoothed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::Limb;

    fn tiny_topology() -> Topology {
        Topology::new(2, vec![Limb::new(0, 1, 0, 1)]).unwrap()
    }

    #[test]
    fn test_new_rejects_mismatched_resolution() {
        let heatmaps = Array3::zeros((8, 8, 2));
        let pafs = Array3::zeros((4, 8, 2));
        assert!(PoseMaps::new(heatmaps, pafs).is_err());
    }

    #[test]
    fn test_zeros_matches_topology() {
        let topo = tiny_topology();
        let maps = PoseMaps::zeros(16, &topo);
        assert_eq!(maps.heatmaps.dim(), (16, 16, 2));
        assert_eq!(maps.pafs.dim(), (16, 16, 2));
        assert!(maps.validate_for(&topo, 16).is_ok());
    }

    #[test]
    fn test_validate_rejects_wrong_channels() {
        let topo = tiny_topology();
        let maps = PoseMaps::new(Array3::zeros((16, 16, 3)), Array3::zeros((16, 16, 2))).unwrap();
        let err = maps.validate_for(&topo, 16).unwrap_err();
        assert!(err.to_string().contains("2 joints"));

        let maps = PoseMaps::new(Array3::zeros((16, 16, 2)), Array3::zeros((16, 16, 4))).unwrap();
        assert!(maps.validate_for(&topo, 16).is_err());
    }

    #[test]
    fn test_validate_rejects_wrong_resolution() {
        let topo = tiny_topology();
        let maps = PoseMaps::zeros(16, &topo);
        assert!(maps.validate_for(&topo, 32).is_err());

        let maps = PoseMaps::new(Array3::zeros((8, 16, 2)), Array3::zeros((8, 16, 2))).unwrap();
        assert!(maps.validate_for(&topo, 16).is_err());
    }

    #[test]
    fn test_average_single_is_identity() {
        let topo = tiny_topology();
        let mut maps = PoseMaps::zeros(4, &topo);
        maps.heatmaps[[1, 2, 0]] = 0.7;
        let fused = PoseMaps::average(std::slice::from_ref(&maps)).unwrap();
        assert!((fused.heatmaps[[1, 2, 0]] - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn test_average_is_elementwise_mean() {
        let topo = tiny_topology();
        let mut a = PoseMaps::zeros(4, &topo);
        let mut b = PoseMaps::zeros(4, &topo);
        a.heatmaps[[0, 0, 0]] = 1.0;
        b.heatmaps[[0, 0, 0]] = 0.5;
        a.pafs[[3, 3, 1]] = -1.0;
        b.pafs[[3, 3, 1]] = 1.0;

        let fused = PoseMaps::average(&[a, b]).unwrap();
        assert!((fused.heatmaps[[0, 0, 0]] - 0.75).abs() < 1e-6);
        assert!(fused.pafs[[3, 3, 1]].abs() < 1e-6);
        assert!(fused.heatmaps[[2, 2, 1]].abs() < f32::EPSILON);
    }

    #[test]
    fn test_average_fails_atomically_on_mismatch() {
        let topo = tiny_topology();
        let a = PoseMaps::zeros(4, &topo);
        let b = PoseMaps::zeros(8, &topo);
        assert!(PoseMaps::average(&[a, b]).is_err());
        assert!(PoseMaps::average(&[]).is_err());
    }

    #[test]
    fn test_gaussian_taps_shape() {
        let taps = gaussian_taps(1.0);
        assert_eq!(taps.len(), 7);
        // Symmetric, peaking at the center with the unnormalized pdf value.
        assert!((taps[3] - 0.39894).abs() < 1e-4);
        assert!((taps[0] - taps[6]).abs() < 1e-7);
        assert!(taps[0] < taps[1]);

        let taps = gaussian_taps(3.0);
        assert_eq!(taps.len(), 19);
        assert!((taps[9] - 0.13298).abs() < 1e-4);
    }

    #[test]
    fn test_smoothing_spreads_impulse() {
        let topo = tiny_topology();
        let mut maps = PoseMaps::zeros(16, &topo);
        maps.heatmaps[[8, 8, 0]] = 1.0;
        maps.pafs[[8, 8, 1]] = 1.0;
        maps.smooth_heatmaps(1.0);

        // Impulse response is the outer product of the taps.
        let center = 0.39894_f32;
        let side = 0.24197_f32;
        assert!((maps.heatmaps[[8, 8, 0]] - center * center).abs() < 1e-4);
        assert!((maps.heatmaps[[8, 7, 0]] - center * side).abs() < 1e-4);
        assert!((maps.heatmaps[[7, 7, 0]] - side * side).abs() < 1e-4);
        // Other channels and the PAFs are untouched.
        assert!(maps.heatmaps[[8, 8, 1]].abs() < f32::EPSILON);
        assert!((maps.pafs[[8, 8, 1]] - 1.0).abs() < f32::EPSILON);
    }
}
