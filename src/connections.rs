// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Limb scoring and greedy candidate matching.
//!
//! For every limb of the topology, each candidate pair is scored by a line
//! integral over the part affinity field, then a greedy pass picks the
//! highest-scoring pairs under mutual exclusivity.

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use ndarray::Array3;

use crate::config::DecoderConfig;
use crate::peaks::CandidateSet;
use crate::topology::{Limb, Topology};
use crate::utils::bankers_round;

/// Number of points sampled along a candidate limb, endpoints included.
const PAF_SAMPLES: usize = 10;

/// An accepted pairing of two candidates across one limb.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    /// Global id of the source-joint candidate.
    pub a: usize,
    /// Global id of the destination-joint candidate.
    pub b: usize,
    /// Distance-adjusted mean PAF alignment along the limb.
    pub score: f32,
    /// `score` plus both endpoint confidences.
    pub total: f32,
}

/// Matching outcome for one limb type.
#[derive(Debug, Clone, PartialEq)]
pub enum LimbConnections {
    /// One or both endpoint joints produced no candidates; assembly must
    /// not treat this as evidence against existing records.
    Skipped,
    /// Mutually exclusive accepted pairings, highest score first.
    Matched(Vec<Connection>),
}

impl LimbConnections {
    /// Accepted pairings, if this limb was scored at all.
    #[must_use]
    pub fn connections(&self) -> Option<&[Connection]> {
        match self {
            Self::Skipped => None,
            Self::Matched(connections) => Some(connections),
        }
    }
}

/// Score and match every limb of the topology.
///
/// The returned vector is indexed by limb, in topology order. Limbs run
/// independently and in parallel; all candidate coordinates are expected in
/// the same space as `pafs`.
#[must_use]
pub fn match_limbs(
    pafs: &Array3<f32>,
    candidates: &CandidateSet,
    topology: &Topology,
    config: &DecoderConfig,
) -> Vec<LimbConnections> {
    use rayon::prelude::*;

    topology
        .limbs()
        .par_iter()
        .map(|limb| score_limb(pafs, candidates, limb, config))
        .collect()
}

fn score_limb(
    pafs: &Array3<f32>,
    candidates: &CandidateSet,
    limb: &Limb,
    config: &DecoderConfig,
) -> LimbConnections {
    let cand_a = candidates.for_joint(limb.a);
    let cand_b = candidates.for_joint(limb.b);
    if cand_a.is_empty() || cand_b.is_empty() {
        return LimbConnections::Skipped;
    }

    // Score every pair; local indices keep the exclusivity bookkeeping
    // per limb.
    let mut scored: Vec<(usize, usize, f32, f32)> = Vec::new();
    for (i, a) in cand_a.iter().enumerate() {
        for (j, b) in cand_b.iter().enumerate() {
            if let Some(score) = pair_score(pafs, limb, (a.x, a.y), (b.x, b.y), config) {
                scored.push((i, j, score, score + a.score + b.score));
            }
        }
    }
    scored.sort_by(|l, r| r.2.partial_cmp(&l.2).unwrap_or(std::cmp::Ordering::Equal));

    let limit = cand_a.len().min(cand_b.len());
    let mut used_a = vec![false; cand_a.len()];
    let mut used_b = vec![false; cand_b.len()];
    let mut connections = Vec::new();
    for (i, j, score, total) in scored {
        if used_a[i] || used_b[j] {
            continue;
        }
        used_a[i] = true;
        used_b[j] = true;
        connections.push(Connection {
            a: cand_a[i].id,
            b: cand_b[j].id,
            score,
            total,
        });
        // Every further pairing would reuse an endpoint on the smaller side.
        if connections.len() >= limit {
            break;
        }
    }
    LimbConnections::Matched(connections)
}

/// Line-integral score for one candidate pair, or `None` if it fails the
/// acceptance criteria.
fn pair_score(
    pafs: &Array3<f32>,
    limb: &Limb,
    (ax, ay): (f32, f32),
    (bx, by): (f32, f32),
    config: &DecoderConfig,
) -> Option<f32> {
    let dx = bx - ax;
    let dy = by - ay;
    let norm = (dx * dx + dy * dy).sqrt().max(1e-3);
    let ux = dx / norm;
    let uy = dy / norm;

    let mut integral = 0.0;
    let mut passing = 0usize;
    for s in 0..PAF_SAMPLES {
        let t = s as f32 / (PAF_SAMPLES - 1) as f32;
        let sx = bankers_round(t.mul_add(dx, ax)) as usize;
        let sy = bankers_round(t.mul_add(dy, ay)) as usize;
        let dot = pafs[[sy, sx, limb.paf[0]]].mul_add(ux, pafs[[sy, sx, limb.paf[1]]] * uy);
        integral += dot;
        if dot > config.connection_threshold {
            passing += 1;
        }
    }

    // Penalize pairs farther apart than half the input resolution.
    let prior = (0.5 * config.input_resolution as f32 / norm - 1.0).min(0.0);
    let score = integral / PAF_SAMPLES as f32 + prior;

    let enough_support = passing as f32 > 0.8 * PAF_SAMPLES as f32;
    if enough_support && score > 0.0 {
        Some(score)
    } else {
        None
    }
}
