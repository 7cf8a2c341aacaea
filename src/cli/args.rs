// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use clap::{Args, Parser, Subcommand};

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r#"Decode Options:
    --heatmaps <PATH>            Joint heatmap tensor in .npy format (H x W x J)
    --pafs <PATH>                Part affinity field tensor in .npy format (H x W x 2L)
    --width <WIDTH>              Original image width in pixels
    --height <HEIGHT>            Original image height in pixels
    --letterbox                  Undo letterbox preprocessing instead of a plain resize
    --joint-threshold <T>        Peak response threshold [default: 0.1]
    --connection-threshold <T>   PAF sample threshold [default: 0.05]
    --min-joints <N>             Minimum joints per person [default: 4]
    --sigma <SIGMA>              Gaussian smoothing sigma for heatmaps
    --output, -o <PATH>          Write decoded persons to a JSON file
    --normalize                  Normalize JSON coordinates to [0, 1]
    --verbose                    Show verbose output

Examples:
    bodypose decode --heatmaps maps.npy --pafs fields.npy --width 1920 --height 1080
    bodypose decode --heatmaps maps.npy --pafs fields.npy --width 640 --height 480 --letterbox
    bodypose decode --heatmaps maps.npy --pafs fields.npy --width 640 --height 480 --sigma 2.5
    bodypose decode --heatmaps maps.npy --pafs fields.npy --width 1280 --height 720 -o persons.json
    bodypose decode --heatmaps maps.npy --pafs fields.npy --width 1280 --height 720 --min-joints 6"#)]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode heatmap and PAF tensors into assembled persons
    Decode(DecodeArgs),
}

/// Arguments for the decode command.
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Path to the joint heatmap tensor (.npy, H x W x J)
    #[arg(long)]
    pub heatmaps: String,

    /// Path to the part affinity field tensor (.npy, H x W x 2L)
    #[arg(long)]
    pub pafs: String,

    /// Original image width in pixels
    #[arg(long)]
    pub width: usize,

    /// Original image height in pixels
    #[arg(long)]
    pub height: usize,

    /// Undo letterbox preprocessing instead of a plain resize
    #[arg(long, default_value_t = false)]
    pub letterbox: bool,

    /// Peak response threshold for joint candidates
    #[arg(long, default_value_t = 0.1)]
    pub joint_threshold: f32,

    /// Score threshold for individual PAF samples
    #[arg(long, default_value_t = 0.05)]
    pub connection_threshold: f32,

    /// Minimum number of joints a person must keep
    #[arg(long, default_value_t = 4)]
    pub min_joints: usize,

    /// Gaussian smoothing sigma applied to heatmaps before peak extraction
    #[arg(long)]
    pub sigma: Option<f32>,

    /// Write decoded persons to a JSON file
    #[arg(short, long)]
    pub output: Option<String>,

    /// Normalize JSON boxes and keypoints to the [0, 1] range
    #[arg(long, default_value_t = false)]
    pub normalize: bool,

    /// Show verbose output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_decode_args_defaults() {
        let args = Cli::parse_from([
            "app", "decode", "--heatmaps", "maps.npy", "--pafs", "fields.npy", "--width", "1920",
            "--height", "1080",
        ]);
        match args.command {
            Commands::Decode(decode_args) => {
                assert_eq!(decode_args.heatmaps, "maps.npy");
                assert_eq!(decode_args.pafs, "fields.npy");
                assert_eq!(decode_args.width, 1920);
                assert_eq!(decode_args.height, 1080);
                assert!(!decode_args.letterbox);
                assert!((decode_args.joint_threshold - 0.1).abs() < f32::EPSILON);
                assert!((decode_args.connection_threshold - 0.05).abs() < f32::EPSILON);
                assert_eq!(decode_args.min_joints, 4);
                assert!(decode_args.sigma.is_none());
                assert!(decode_args.output.is_none());
                assert!(!decode_args.normalize);
                assert!(decode_args.verbose);
            }
        }
    }

    #[test]
    fn test_decode_args_custom() {
        let args = Cli::parse_from([
            "app",
            "decode",
            "--heatmaps",
            "maps.npy",
            "--pafs",
            "fields.npy",
            "--width",
            "640",
            "--height",
            "480",
            "--letterbox",
            "--joint-threshold",
            "0.2",
            "--min-joints",
            "6",
            "--sigma",
            "2.5",
            "-o",
            "persons.json",
            "--verbose",
            "false",
        ]);
        match args.command {
            Commands::Decode(decode_args) => {
                assert_eq!(decode_args.width, 640);
                assert_eq!(decode_args.height, 480);
                assert!(decode_args.letterbox);
                assert!((decode_args.joint_threshold - 0.2).abs() < f32::EPSILON);
                assert_eq!(decode_args.min_joints, 6);
                assert_eq!(decode_args.sigma, Some(2.5));
                assert_eq!(decode_args.output, Some("persons.json".to_string()));
                assert!(!decode_args.verbose);
            }
        }
    }
}
