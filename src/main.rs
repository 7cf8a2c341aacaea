// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use clap::Parser;

use bodypose::cli::args::{Cli, Commands};
use bodypose::cli::decode::run_decode;

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Decode(args) => run_decode(&args),
    }
}
