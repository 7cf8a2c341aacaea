// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose decoding pipeline.
//!
//! [`PoseDecoder`] wires the stages together: optional heatmap smoothing,
//! peak extraction, limb matching, person assembly and detection packaging.
//! One decoder is reusable across frames; every call is self-contained and
//! carries no state over.

use std::time::Instant;

use ndarray::Array2;

use crate::assembly::PersonAssembler;
use crate::config::DecoderConfig;
use crate::connections::match_limbs;
use crate::error::{PoseError, Result};
use crate::maps::PoseMaps;
use crate::peaks::CandidateSet;
use crate::results::{Detection, PoseResults, Speed};
use crate::topology::Topology;
use crate::transform::CoordinateTransform;

/// Decoder for heatmap/PAF tensor pairs.
#[derive(Debug, Clone)]
pub struct PoseDecoder {
    config: DecoderConfig,
    topology: Topology,
}

impl PoseDecoder {
    /// Create a decoder for the default BODY_25 topology.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ConfigError`] if the configuration is invalid.
    pub fn new(config: DecoderConfig) -> Result<Self> {
        Self::with_topology(config, Topology::default())
    }

    /// Create a decoder for a custom topology.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ConfigError`] if the configuration is invalid.
    pub fn with_topology(config: DecoderConfig, topology: Topology) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, topology })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// The active topology.
    #[must_use]
    pub const fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Decode one frame's maps into detections in original-image space.
    ///
    /// `orig_shape` is the original image shape (height, width) the
    /// candidates are transformed back to.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ShapeError`] when the maps do not fit the
    /// topology and configured resolution or `orig_shape` is degenerate,
    /// and [`PoseError::DecodeError`] on internal inconsistencies.
    pub fn decode(&self, maps: &PoseMaps, orig_shape: (usize, usize)) -> Result<PoseResults> {
        check_orig_shape(orig_shape)?;
        maps.validate_for(&self.topology, self.config.input_resolution)?;

        let started = Instant::now();
        let smoothed;
        let maps = if let Some(sigma) = self.config.smoothing_sigma {
            let mut clone = maps.clone();
            clone.smooth_heatmaps(sigma);
            smoothed = clone;
            &smoothed
        } else {
            maps
        };
        let fusion_ms = elapsed_ms(started);

        let started = Instant::now();
        let candidates = CandidateSet::extract(&maps.heatmaps, self.config.joint_threshold);
        let peaks_ms = elapsed_ms(started);

        let started = Instant::now();
        let matches = match_limbs(&maps.pafs, &candidates, &self.topology, &self.config);
        let matching_ms = elapsed_ms(started);

        let started = Instant::now();
        let mut assembler = PersonAssembler::new(&self.topology, candidates.len());
        assembler.assemble(&matches, &candidates)?;
        let records = assembler.finish(&self.config);

        // Candidates go to original-image space exactly once; detections
        // and renderers share the same table.
        let table = self.transformed_candidates(&candidates, orig_shape);
        let detections = records
            .into_iter()
            .map(|record| Detection::from_record(record, &table, orig_shape))
            .collect::<Result<Vec<_>>>()?;
        let assembly_ms = elapsed_ms(started);

        Ok(PoseResults {
            detections,
            candidates: table,
            orig_shape,
            input_resolution: self.config.input_resolution,
            names: self.topology.joint_names().to_vec(),
            speed: Speed::new(fusion_ms, peaks_ms, matching_ms, assembly_ms),
        })
    }

    /// Average per-scale map outputs and decode the fused pair.
    ///
    /// # Errors
    ///
    /// Fails atomically if the outputs disagree on shape, plus every error
    /// [`PoseDecoder::decode`] can return.
    pub fn decode_fused(
        &self,
        scale_outputs: &[PoseMaps],
        orig_shape: (usize, usize),
    ) -> Result<PoseResults> {
        let started = Instant::now();
        let fused = PoseMaps::average(scale_outputs)?;
        let average_ms = elapsed_ms(started);

        let mut results = self.decode(&fused, orig_shape)?;
        results.speed.fusion = Some(results.speed.fusion.unwrap_or(0.0) + average_ms);
        Ok(results)
    }

    fn transformed_candidates(
        &self,
        candidates: &CandidateSet,
        orig_shape: (usize, usize),
    ) -> Array2<f32> {
        let transform = CoordinateTransform::new(
            self.config.resize_policy,
            orig_shape,
            self.config.input_resolution,
        );
        let mut table = Array2::zeros((candidates.len(), 3));
        for (i, candidate) in candidates.all().iter().enumerate() {
            let (x, y) = transform.to_original(candidate.x, candidate.y);
            table[[i, 0]] = x;
            table[[i, 1]] = y;
            table[[i, 2]] = candidate.score;
        }
        table
    }
}

fn check_orig_shape((h, w): (usize, usize)) -> Result<()> {
    if h == 0 || w == 0 {
        return Err(PoseError::ShapeError(format!(
            "original image shape {h}x{w} is degenerate"
        )));
    }
    Ok(())
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
