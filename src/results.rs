// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Decoded pose results.
//!
//! This module packages assembled person records into per-person detections
//! with fixed-length keypoint arrays, confidence arrays and padded bounding
//! boxes, all expressed in original-image coordinates.

use std::collections::HashMap;

use ndarray::{Array1, Array2};
use serde::Serialize;

use crate::assembly::PersonRecord;
use crate::error::{PoseError, Result};
use crate::utils::pluralize;

/// Timing information for the decode stages (in milliseconds).
#[derive(Debug, Clone, Default)]
pub struct Speed {
    /// Time spent fusing and smoothing the input maps.
    pub fusion: Option<f64>,
    /// Time spent extracting heatmap peaks.
    pub peaks: Option<f64>,
    /// Time spent scoring and matching limbs.
    pub matching: Option<f64>,
    /// Time spent assembling and packaging persons.
    pub assembly: Option<f64>,
}

impl Speed {
    /// Create a new Speed instance with all timings.
    ///
    /// # Arguments
    ///
    /// * `fusion` - Time in milliseconds.
    /// * `peaks` - Time in milliseconds.
    /// * `matching` - Time in milliseconds.
    /// * `assembly` - Time in milliseconds.
    ///
    /// # Returns
    ///
    /// * A new `Speed` instance.
    #[must_use]
    pub const fn new(fusion: f64, peaks: f64, matching: f64, assembly: f64) -> Self {
        Self {
            fusion: Some(fusion),
            peaks: Some(peaks),
            matching: Some(matching),
            assembly: Some(assembly),
        }
    }

    /// Get total decode time.
    ///
    /// # Returns
    ///
    /// * Sum of all stage times in milliseconds.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.fusion.unwrap_or(0.0)
            + self.peaks.unwrap_or(0.0)
            + self.matching.unwrap_or(0.0)
            + self.assembly.unwrap_or(0.0)
    }
}

/// One detected person in original-image coordinates.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Keypoints with shape `(J, 2)`; missing joints hold `NaN` in both
    /// columns.
    pub keypoints: Array2<f32>,
    /// Per-joint confidences with shape `(J,)`; missing joints hold 0.
    pub confidences: Array1<f32>,
    /// Bounding box `[x1, y1, x2, y2]`, padded and clipped to the image.
    pub bbox: [f32; 4],
    /// Accumulated evidence score of the underlying record.
    pub score: f32,
    /// The assembled record, for slot-level access.
    pub record: PersonRecord,
}

impl Detection {
    /// Build a detection from an assembled record and the shared candidate
    /// table.
    ///
    /// # Arguments
    ///
    /// * `record` - A surviving person record.
    /// * `candidates` - Candidate table with shape `(n, 3)` holding
    ///   `x, y, confidence` rows already in original-image space.
    /// * `orig_shape` - Original image shape (height, width).
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::DecodeError`] if the record fills no joint slot
    /// or references a row outside the candidate table.
    pub fn from_record(
        record: PersonRecord,
        candidates: &Array2<f32>,
        orig_shape: (usize, usize),
    ) -> Result<Self> {
        let num_joints = record.slots().len();
        let mut keypoints = Array2::from_elem((num_joints, 2), f32::NAN);
        let mut confidences = Array1::zeros(num_joints);
        for (joint, slot) in record.slots().iter().enumerate() {
            if let Some(id) = *slot {
                if id >= candidates.nrows() {
                    return Err(PoseError::DecodeError(format!(
                        "record references candidate {id} but the table has {} rows",
                        candidates.nrows()
                    )));
                }
                keypoints[[joint, 0]] = candidates[[id, 0]];
                keypoints[[joint, 1]] = candidates[[id, 1]];
                confidences[joint] = candidates[[id, 2]];
            }
        }
        let bbox = bounding_box(&keypoints, orig_shape)?;
        Ok(Self {
            keypoints,
            confidences,
            bbox,
            score: record.score(),
            record,
        })
    }

    /// Number of joints found for this person.
    #[must_use]
    pub const fn num_joints(&self) -> usize {
        self.record.num_joints()
    }
}

/// Axis-aligned box around the present joints, padded by a tenth of its
/// diagonal and clipped to the image bounds.
#[allow(clippy::cast_precision_loss)]
fn bounding_box(keypoints: &Array2<f32>, orig_shape: (usize, usize)) -> Result<[f32; 4]> {
    let mut x_min = f32::INFINITY;
    let mut y_min = f32::INFINITY;
    let mut x_max = f32::NEG_INFINITY;
    let mut y_max = f32::NEG_INFINITY;
    for row in keypoints.rows() {
        if row[0].is_nan() {
            continue;
        }
        x_min = x_min.min(row[0]);
        y_min = y_min.min(row[1]);
        x_max = x_max.max(row[0]);
        y_max = y_max.max(row[1]);
    }
    if !x_min.is_finite() {
        return Err(PoseError::DecodeError(
            "cannot box a person with no joints".to_string(),
        ));
    }

    let diag = (x_max - x_min).hypot(y_max - y_min);
    let pad = (diag / 10.0).floor();
    let (h, w) = orig_shape;
    Ok([
        (x_min - pad).max(0.0),
        (y_min - pad).max(0.0),
        (x_max + pad).min(w as f32),
        (y_max + pad).min(h as f32),
    ])
}

/// Main results container for one decoded frame.
#[derive(Debug, Clone)]
pub struct PoseResults {
    /// Detected persons.
    pub detections: Vec<Detection>,
    /// Shared candidate table with shape `(n, 3)` in original-image space;
    /// detections and renderers index into the same rows.
    pub candidates: Array2<f32>,
    /// Original image shape (height, width).
    pub orig_shape: (usize, usize),
    /// Square network input resolution the maps were decoded at.
    pub input_resolution: usize,
    /// Joint type names, indexed by joint.
    pub names: Vec<String>,
    /// Decode timing information.
    pub speed: Speed,
}

impl PoseResults {
    /// Get the number of detected persons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.detections.len()
    }

    /// Check if no person was detected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    /// Get a human-readable summary of the detections.
    ///
    /// # Returns
    ///
    /// * A log-friendly string such as `"2 persons, "`.
    #[must_use]
    pub fn verbose(&self) -> String {
        if self.is_empty() {
            return "(no persons), ".to_string();
        }
        let count = self.len();
        let noun = if count == 1 {
            "person".to_string()
        } else {
            pluralize("person")
        };
        format!("{count} {noun}, ")
    }

    /// Convert results to a list of dictionaries (summary format).
    ///
    /// Missing joints are omitted from the keypoint lists, so the output
    /// never carries `NaN` values.
    ///
    /// # Arguments
    ///
    /// * `normalize` - Whether to normalize coordinates to [0, 1] range.
    ///
    /// # Returns
    ///
    /// * A vector of hashmaps representing the detected persons.
    #[must_use]
    pub fn summary(&self, normalize: bool) -> Vec<HashMap<String, SummaryValue>> {
        let (h, w) = if normalize {
            #[allow(clippy::cast_precision_loss)]
            (self.orig_shape.0 as f32, self.orig_shape.1 as f32)
        } else {
            (1.0, 1.0)
        };

        let mut results = Vec::with_capacity(self.detections.len());
        for detection in &self.detections {
            let mut entry = HashMap::new();
            entry.insert(
                "joints".to_string(),
                SummaryValue::Int(detection.num_joints()),
            );
            entry.insert("score".to_string(), SummaryValue::Float(detection.score));

            let mut box_coords = HashMap::new();
            box_coords.insert("x1".to_string(), SummaryValue::Float(detection.bbox[0] / w));
            box_coords.insert("y1".to_string(), SummaryValue::Float(detection.bbox[1] / h));
            box_coords.insert("x2".to_string(), SummaryValue::Float(detection.bbox[2] / w));
            box_coords.insert("y2".to_string(), SummaryValue::Float(detection.bbox[3] / h));
            entry.insert("box".to_string(), SummaryValue::Box(box_coords));

            let mut joints = Vec::new();
            for (joint, row) in detection.keypoints.rows().into_iter().enumerate() {
                if row[0].is_nan() {
                    continue;
                }
                let mut point = HashMap::new();
                point.insert(
                    "name".to_string(),
                    SummaryValue::String(
                        self.names
                            .get(joint)
                            .cloned()
                            .unwrap_or_else(|| joint.to_string()),
                    ),
                );
                point.insert("x".to_string(), SummaryValue::Float(row[0] / w));
                point.insert("y".to_string(), SummaryValue::Float(row[1] / h));
                point.insert(
                    "confidence".to_string(),
                    SummaryValue::Float(detection.confidences[joint]),
                );
                joints.push(SummaryValue::Box(point));
            }
            entry.insert("keypoints".to_string(), SummaryValue::List(joints));

            results.push(entry);
        }
        results
    }
}

/// Values that can appear in a summary dictionary.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SummaryValue {
    /// String value.
    String(String),
    /// Integer value.
    Int(usize),
    /// Float value.
    Float(f32),
    /// Nested coordinate map.
    Box(HashMap<String, Self>),
    /// List of nested values.
    List(Vec<Self>),
}
