// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Heatmap peak extraction.
//!
//! Scans each joint channel for local maxima with a 4-neighbor test and
//! collects the survivors into a flat, globally indexed candidate table that
//! the matching and assembly stages address by id.

#![allow(clippy::cast_precision_loss, clippy::float_cmp)]

use ndarray::{Array3, Axis};

/// One detected joint candidate in network input space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Global id, unique across all joint types of one frame.
    pub id: usize,
    /// Joint type index.
    pub joint: usize,
    /// Column coordinate in the map.
    pub x: f32,
    /// Row coordinate in the map.
    pub y: f32,
    /// Map response at the peak, read from the same (possibly smoothed)
    /// map the peak test ran on.
    pub score: f32,
}

/// All candidates of one frame, grouped by joint type.
///
/// Ids are dense and joint-major: every candidate of joint 0 precedes every
/// candidate of joint 1, and within a joint candidates appear in row-major
/// scan order. A candidate's id therefore equals its index in the table.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    candidates: Vec<Candidate>,
    /// Per-joint ranges into `candidates`, length `joints + 1`.
    offsets: Vec<usize>,
}

impl CandidateSet {
    /// Extract peaks from every joint channel of `heatmaps`.
    ///
    /// A cell is a peak when its value is greater than or equal to each of
    /// its four axis neighbors (out-of-bounds neighbors count as zero) and
    /// greater than or equal to `threshold`. Equal-valued adjacent cells
    /// both register. A zero response is never recorded.
    #[must_use]
    pub fn extract(heatmaps: &Array3<f32>, threshold: f32) -> Self {
        use rayon::prelude::*;

        let (h, w, joints) = heatmaps.dim();
        let per_joint: Vec<Vec<(f32, f32, f32)>> = (0..joints)
            .into_par_iter()
            .map(|joint| {
                let map = heatmaps.index_axis(Axis(2), joint);
                let mut found = Vec::new();
                for y in 0..h {
                    for x in 0..w {
                        let v = map[[y, x]];
                        if v < threshold || v == 0.0 {
                            continue;
                        }
                        let up = if y > 0 { map[[y - 1, x]] } else { 0.0 };
                        let down = if y + 1 < h { map[[y + 1, x]] } else { 0.0 };
                        let left = if x > 0 { map[[y, x - 1]] } else { 0.0 };
                        let right = if x + 1 < w { map[[y, x + 1]] } else { 0.0 };
                        if v >= up && v >= down && v >= left && v >= right {
                            found.push((x as f32, y as f32, v));
                        }
                    }
                }
                found
            })
            .collect();

        let total = per_joint.iter().map(Vec::len).sum();
        let mut candidates = Vec::with_capacity(total);
        let mut offsets = Vec::with_capacity(joints + 1);
        offsets.push(0);
        for (joint, found) in per_joint.into_iter().enumerate() {
            for (x, y, score) in found {
                candidates.push(Candidate {
                    id: candidates.len(),
                    joint,
                    x,
                    y,
                    score,
                });
            }
            offsets.push(candidates.len());
        }
        Self {
            candidates,
            offsets,
        }
    }

    /// Candidates of one joint type, in discovery order.
    #[must_use]
    pub fn for_joint(&self, joint: usize) -> &[Candidate] {
        let start = self.offsets[joint];
        let end = self.offsets[joint + 1];
        &self.candidates[start..end]
    }

    /// Look up a candidate by its global id.
    #[must_use]
    pub fn get(&self, id: usize) -> Option<&Candidate> {
        self.candidates.get(id)
    }

    /// All candidates across all joint types.
    #[must_use]
    pub fn all(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Number of joint types this set was extracted for.
    #[must_use]
    pub fn num_joint_types(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// Total candidate count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// True when no channel produced a peak.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
