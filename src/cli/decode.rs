// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::process;

use ndarray::{Array3, s};
use ndarray_npy::read_npy;

use crate::cli::args::DecodeArgs;
use crate::error::{PoseError, Result};
use crate::utils::pluralize;
use crate::{DecoderConfig, PoseDecoder, PoseMaps, PoseResults, ResizePolicy, Speed, Topology};
use crate::{VERSION, error, info, success, verbose, warn};

/// Run BODY_25 pose decoding on dumped network tensors.
pub fn run_decode(args: &DecodeArgs) {
    crate::cli::logging::set_verbose(args.verbose);

    info!("bodypose {VERSION} 🚀 BODY_25 pose decoder");

    if args.normalize && args.output.is_none() {
        warn!("'--normalize' only affects JSON output. Pass '--output' to write it.");
    }

    let topology = Topology::default();
    let maps = match load_maps(&args.heatmaps, &args.pafs, &topology) {
        Ok(m) => m,
        Err(e) => {
            error!("Failed to load tensors: {e}");
            process::exit(1);
        }
    };

    let (resolution, _) = maps.resolution();
    let config = build_config(args, resolution);
    let decoder = match PoseDecoder::with_topology(config, topology) {
        Ok(d) => d,
        Err(e) => {
            error!("Invalid configuration: {e}");
            process::exit(1);
        }
    };

    let topology = decoder.topology();
    verbose!(
        "BODY_25 summary: {} joints, {} limbs, maps {}x{}",
        topology.num_joints(),
        topology.num_limbs(),
        resolution,
        resolution
    );
    verbose!("");

    let results = match decoder.decode(&maps, (args.height, args.width)) {
        Ok(r) => r,
        Err(e) => {
            error!("Decoding failed: {e}");
            process::exit(1);
        }
    };

    verbose!(
        "image 1/1 {}: {}x{} {}{:.1}ms",
        args.heatmaps,
        args.height,
        args.width,
        results.verbose(),
        results.speed.total()
    );
    for (i, detection) in results.detections.iter().enumerate() {
        verbose!(
            "{}",
            format_person_line(i, detection.num_joints(), detection.score)
        );
    }

    let channels = topology.num_joints() + topology.paf_channels();
    verbose!("{}", format_speed_line(&results.speed, channels, resolution));

    if let Some(ref path) = args.output {
        if let Err(e) = save_summary(&results, path, args.normalize) {
            error!("Failed to write {path}: {e}");
            process::exit(1);
        }
        let count = results.len();
        let noun = if count == 1 {
            "person".to_string()
        } else {
            pluralize("person")
        };
        success!("Saved {count} {noun} to {path}");
    }
}

/// Load heatmap and PAF tensors from `.npy` dumps.
///
/// Network dumps usually keep the background map as a trailing heatmap
/// channel; it is dropped here so the channel count matches the topology.
fn load_maps(heatmap_path: &str, paf_path: &str, topology: &Topology) -> Result<PoseMaps> {
    let heatmaps: Array3<f32> = read_npy(heatmap_path)?;
    let pafs: Array3<f32> = read_npy(paf_path)?;
    PoseMaps::new(strip_background(heatmaps, topology.num_joints()), pafs)
}

/// Drop the trailing background channel when one is present.
fn strip_background(heatmaps: Array3<f32>, num_joints: usize) -> Array3<f32> {
    if heatmaps.shape()[2] == num_joints + 1 {
        heatmaps.slice(s![.., .., ..num_joints]).to_owned()
    } else {
        heatmaps
    }
}

/// Translate CLI arguments into a decoder configuration.
fn build_config(args: &DecodeArgs, resolution: usize) -> DecoderConfig {
    let policy = if args.letterbox {
        ResizePolicy::Letterbox
    } else {
        ResizePolicy::Plain
    };
    let mut config = DecoderConfig::new()
        .with_joint_threshold(args.joint_threshold)
        .with_connection_threshold(args.connection_threshold)
        .with_min_joints(args.min_joints)
        .with_input_resolution(resolution)
        .with_resize_policy(policy);
    if let Some(sigma) = args.sigma {
        config = config.with_smoothing_sigma(sigma);
    }
    config
}

/// Format a per-person line like "  person 1: 18 joints, score 12.48".
fn format_person_line(index: usize, joints: usize, score: f32) -> String {
    let noun = if joints == 1 {
        "joint".to_string()
    } else {
        pluralize("joint")
    };
    format!("  person {}: {joints} {noun}, score {score:.2}", index + 1)
}

/// Format the stage timing summary printed after decoding.
fn format_speed_line(speed: &Speed, channels: usize, resolution: usize) -> String {
    format!(
        "Speed: {:.1}ms fusion, {:.1}ms peaks, {:.1}ms matching, {:.1}ms assembly per image at shape (1, {channels}, {resolution}, {resolution})",
        speed.fusion.unwrap_or(0.0),
        speed.peaks.unwrap_or(0.0),
        speed.matching.unwrap_or(0.0),
        speed.assembly.unwrap_or(0.0)
    )
}

/// Serialize the per-person summary to a JSON file.
fn save_summary(results: &PoseResults, path: &str, normalize: bool) -> Result<()> {
    let summary = results.summary(normalize);
    let json =
        serde_json::to_string_pretty(&summary).map_err(|e| PoseError::IoError(e.to_string()))?;
    std::fs::write(path, json)?;
    Ok(())
}
