// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Body topology: the joint and limb tables that drive pose assembly.
//!
//! A [`Topology`] names how many joint types exist, which joint pairs form
//! limbs, and which two PAF channels carry each limb's vector field. Limb
//! order matters: the assembler processes limbs in declared order and merge
//! outcomes depend on it. The default table is the BODY_25 layout (25 joints,
//! 26 limbs over a 52-channel PAF tensor).

use crate::error::{PoseError, Result};

/// Joint names for the BODY_25 keypoint layout, indexed by joint type.
pub const BODY_25_JOINT_NAMES: [&str; 25] = [
    "nose",
    "neck",
    "right_shoulder",
    "right_elbow",
    "right_wrist",
    "left_shoulder",
    "left_elbow",
    "left_wrist",
    "mid_hip",
    "right_hip",
    "right_knee",
    "right_ankle",
    "left_hip",
    "left_knee",
    "left_ankle",
    "right_eye",
    "left_eye",
    "right_ear",
    "left_ear",
    "left_big_toe",
    "left_small_toe",
    "left_heel",
    "right_big_toe",
    "right_small_toe",
    "right_heel",
];

/// BODY_25 limb endpoints (pairs of joint indices) in assembly order.
pub const BODY_25_LIMBS: [[usize; 2]; 26] = [
    [1, 8],   // neck to mid hip
    [1, 2],   // neck to right shoulder
    [1, 5],   // neck to left shoulder
    [2, 3],   // right shoulder to right elbow
    [3, 4],   // right elbow to right wrist
    [5, 6],   // left shoulder to left elbow
    [6, 7],   // left elbow to left wrist
    [8, 9],   // mid hip to right hip
    [9, 10],  // right hip to right knee
    [10, 11], // right knee to right ankle
    [8, 12],  // mid hip to left hip
    [12, 13], // left hip to left knee
    [13, 14], // left knee to left ankle
    [1, 0],   // neck to nose
    [0, 15],  // nose to right eye
    [15, 17], // right eye to right ear
    [0, 16],  // nose to left eye
    [16, 18], // left eye to left ear
    [2, 17],  // right shoulder to right ear
    [5, 18],  // left shoulder to left ear
    [14, 19], // left ankle to left big toe
    [19, 20], // left big toe to left small toe
    [14, 21], // left ankle to left heel
    [11, 22], // right ankle to right big toe
    [22, 23], // right big toe to right small toe
    [11, 24], // right ankle to right heel
];

/// PAF channel pairs (x-channel, y-channel) per limb, same order as
/// [`BODY_25_LIMBS`].
pub const BODY_25_PAF_CHANNELS: [[usize; 2]; 26] = [
    [0, 1],
    [14, 15],
    [22, 23],
    [16, 17],
    [18, 19],
    [24, 25],
    [26, 27],
    [6, 7],
    [2, 3],
    [4, 5],
    [8, 9],
    [10, 11],
    [12, 13],
    [30, 31],
    [32, 33],
    [36, 37],
    [34, 35],
    [38, 39],
    [20, 21],
    [28, 29],
    [40, 41],
    [42, 43],
    [44, 45],
    [46, 47],
    [48, 49],
    [50, 51],
];

/// One limb type: an ordered joint pair plus its PAF channel pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limb {
    /// Joint type at the A endpoint.
    pub a: usize,
    /// Joint type at the B endpoint.
    pub b: usize,
    /// PAF channel indices: `[x-component, y-component]`.
    pub paf: [usize; 2],
    /// Limbs marked terminal-only never originate a new person record
    /// during assembly; they can only extend or merge existing ones.
    pub terminal_only: bool,
}

impl Limb {
    /// Create a limb from its endpoints and PAF channel pair.
    #[must_use]
    pub const fn new(a: usize, b: usize, paf_x: usize, paf_y: usize) -> Self {
        Self {
            a,
            b,
            paf: [paf_x, paf_y],
            terminal_only: false,
        }
    }

    /// Mark this limb as terminal-only (no person creation from it).
    #[must_use]
    pub const fn terminal(mut self) -> Self {
        self.terminal_only = true;
        self
    }
}

/// A validated joint/limb table.
///
/// Construction fails with [`PoseError::ConfigError`] if any limb references
/// a joint type or PAF channel outside the table's bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    joints: usize,
    limbs: Vec<Limb>,
    names: Vec<String>,
}

impl Topology {
    /// Build a topology from a joint count and limb table.
    ///
    /// Joint names default to `joint_0..joint_{J-1}`; use
    /// [`Topology::with_joint_names`] to replace them.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ConfigError`] if the joint count is zero, a limb
    /// endpoint is not a valid joint index, a limb connects a joint to
    /// itself, or a PAF channel index falls outside the `2 * L` channels a
    /// PAF tensor for this table carries.
    pub fn new(joints: usize, limbs: Vec<Limb>) -> Result<Self> {
        if joints == 0 {
            return Err(PoseError::ConfigError(
                "topology must define at least one joint type".to_string(),
            ));
        }
        let paf_channels = 2 * limbs.len();
        for (k, limb) in limbs.iter().enumerate() {
            if limb.a >= joints || limb.b >= joints {
                return Err(PoseError::ConfigError(format!(
                    "limb {k} references joint {} but only {joints} joints are defined",
                    limb.a.max(limb.b)
                )));
            }
            if limb.a == limb.b {
                return Err(PoseError::ConfigError(format!(
                    "limb {k} connects joint {} to itself",
                    limb.a
                )));
            }
            if limb.paf[0] >= paf_channels || limb.paf[1] >= paf_channels {
                return Err(PoseError::ConfigError(format!(
                    "limb {k} references PAF channel {} but the field has {paf_channels} channels",
                    limb.paf[0].max(limb.paf[1])
                )));
            }
        }
        let names = (0..joints).map(|i| format!("joint_{i}")).collect();
        Ok(Self {
            joints,
            limbs,
            names,
        })
    }

    /// The default BODY_25 topology.
    #[must_use]
    pub fn body_25() -> Self {
        let limbs = BODY_25_LIMBS
            .iter()
            .zip(BODY_25_PAF_CHANNELS.iter())
            .map(|(&[a, b], &[px, py])| Limb::new(a, b, px, py))
            .collect();
        let names = BODY_25_JOINT_NAMES.iter().map(ToString::to_string).collect();
        Self {
            joints: 25,
            limbs,
            names,
        }
    }

    /// Replace the generated joint names.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ConfigError`] if the name count does not match
    /// the joint count.
    pub fn with_joint_names(mut self, names: Vec<String>) -> Result<Self> {
        if names.len() != self.joints {
            return Err(PoseError::ConfigError(format!(
                "expected {} joint names, got {}",
                self.joints,
                names.len()
            )));
        }
        self.names = names;
        Ok(self)
    }

    /// Number of joint types (heatmap channels, excluding background).
    #[must_use]
    pub const fn num_joints(&self) -> usize {
        self.joints
    }

    /// Number of limb types.
    #[must_use]
    pub fn num_limbs(&self) -> usize {
        self.limbs.len()
    }

    /// Number of PAF channels a field tensor for this topology carries.
    #[must_use]
    pub fn paf_channels(&self) -> usize {
        2 * self.limbs.len()
    }

    /// The limb table in assembly order.
    #[must_use]
    pub fn limbs(&self) -> &[Limb] {
        &self.limbs
    }

    /// Name of a joint type, or `"?"` for an out-of-range index.
    #[must_use]
    pub fn joint_name(&self, joint: usize) -> &str {
        self.names.get(joint).map_or("?", String::as_str)
    }

    /// All joint names, indexed by joint type.
    #[must_use]
    pub fn joint_names(&self) -> &[String] {
        &self.names
    }
}

impl Default for Topology {
    fn default() -> Self {
        Self::body_25()
    }
}
