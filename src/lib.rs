// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]

//! # BODY_25 Pose Decoding Library
//!
//! [![crates.io](https://img.shields.io/crates/v/bodypose.svg)](https://crates.io/crates/bodypose)
//! [![docs.rs](https://docs.rs/bodypose/badge.svg)](https://docs.rs/bodypose)
//! [![License](https://img.shields.io/crates/l/bodypose.svg)](https://crates.io/crates/bodypose)
//!
//! Multi-person 2D pose decoding library written in Rust, turning part
//! affinity field network outputs (BODY_25 heatmaps and PAFs) into assembled
//! persons with keypoints, confidences and bounding boxes in original-image
//! coordinates.
//!
//! ## Features
//!
//! - **Complete Pipeline** - Heatmap peaks, PAF line integrals, greedy limb
//!   matching and person assembly in a single call
//! - **BODY_25 Topology** - 25 joints and 26 limbs wired in, custom
//!   topologies supported
//! - **Parallel** - Peak extraction and limb scoring fan out with Rayon
//! - **Original Coordinates** - Results map back through plain or letterbox
//!   preprocessing automatically
//! - **Multi-Scale** - Map pyramids fuse by channel-wise averaging before a
//!   single decode pass
//! - **JSON Summaries** - Results serialize to per-person dictionaries for
//!   downstream tooling
//!
//! ## Installation
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! bodypose = "0.1"
//! ```
//!
//! Or install the CLI tool:
//!
//! ```bash
//! cargo install bodypose
//! ```
//!
//! ## Quick Start (Library)
//!
//! ```
//! use bodypose::{DecoderConfig, PoseDecoder, PoseMaps};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DecoderConfig::default().with_input_resolution(46);
//!     let decoder = PoseDecoder::new(config)?;
//!
//!     // Heatmaps and PAFs come from your network; zeros stand in here
//!     let maps = PoseMaps::zeros(46, decoder.topology());
//!     let results = decoder.decode(&maps, (1080, 1920))?;
//!
//!     for (i, person) in results.detections.iter().enumerate() {
//!         println!(
//!             "person {}: {} joints, score {:.2}",
//!             i + 1,
//!             person.num_joints(),
//!             person.score
//!         );
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! The `bodypose` CLI decodes tensors dumped to `.npy` files:
//!
//! ```bash
//! # Install the CLI
//! cargo install bodypose
//!
//! # Decode one frame of network outputs
//! bodypose decode --heatmaps maps.npy --pafs fields.npy --width 1920 --height 1080
//!
//! # Inputs preprocessed with letterbox padding
//! bodypose decode --heatmaps maps.npy --pafs fields.npy --width 640 --height 480 --letterbox
//!
//! # Smooth noisy heatmaps before peak extraction
//! bodypose decode --heatmaps maps.npy --pafs fields.npy --width 640 --height 480 --sigma 2.5
//!
//! # Write per-person JSON
//! bodypose decode --heatmaps maps.npy --pafs fields.npy --width 1280 --height 720 -o persons.json
//!
//! # Show help
//! bodypose help
//! ```
//!
//! **CLI Options:**
//!
//! | Option | Short | Description | Default |
//! |--------|-------|-------------|---------|
//! | `--heatmaps` | | Joint heatmap tensor (.npy) | |
//! | `--pafs` | | Part affinity field tensor (.npy) | |
//! | `--width` | | Original image width | |
//! | `--height` | | Original image height | |
//! | `--letterbox` | | Undo letterbox preprocessing | `false` |
//! | `--joint-threshold` | | Peak response threshold | `0.1` |
//! | `--connection-threshold` | | PAF sample threshold | `0.05` |
//! | `--min-joints` | | Minimum joints per person | `4` |
//! | `--sigma` | | Gaussian smoothing sigma | |
//! | `--output` | `-o` | JSON output path | |
//! | `--normalize` | | Normalize JSON coordinates | `false` |
//!
//! ## Tuning the Decoder
//!
//! All pipeline knobs live on [`DecoderConfig`]:
//!
//! ```
//! use bodypose::{DecoderConfig, PoseDecoder, ResizePolicy};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DecoderConfig::default()
//!     .with_input_resolution(368)
//!     .with_joint_threshold(0.15)
//!     .with_min_joints(6)
//!     .with_resize_policy(ResizePolicy::Letterbox)
//!     .with_smoothing_sigma(3.0);
//! let decoder = PoseDecoder::new(config)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Python Integration
//!
//! Dump network outputs with NumPy and call the CLI for decoding:
//!
//! ```python
//! import subprocess
//!
//! import numpy as np
//!
//! def decode_pose(heatmaps, pafs, width: int, height: int) -> str:
//!     """Decode dumped network outputs using the Rust CLI."""
//!     np.save("maps.npy", heatmaps)
//!     np.save("fields.npy", pafs)
//!     result = subprocess.run(
//!         ["bodypose", "decode",
//!          "--heatmaps", "maps.npy",
//!          "--pafs", "fields.npy",
//!          "--width", str(width),
//!          "--height", str(height),
//!          "--output", "persons.json"],
//!         capture_output=True,
//!         text=True,
//!         check=True,
//!     )
//!     return result.stdout
//! ```

pub mod assembly;
pub mod cli;
pub mod config;
pub mod connections;
pub mod decoder;
pub mod error;
pub mod maps;
pub mod peaks;
pub mod results;
pub mod topology;
pub mod transform;
pub mod utils;

// Re-export main types for convenience
pub use config::DecoderConfig;
pub use decoder::PoseDecoder;
pub use error::{PoseError, Result};
pub use maps::PoseMaps;
pub use results::{Detection, PoseResults, Speed, SummaryValue};
pub use topology::{Limb, Topology};
pub use transform::{CoordinateTransform, ResizePolicy};

// Re-export pipeline stages for advanced use
pub use assembly::{PersonAssembler, PersonRecord};
pub use connections::{Connection, LimbConnections, match_limbs};
pub use peaks::{Candidate, CandidateSet};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
