use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use mimalloc::MiMalloc;

use meshtrial_evaluator::capture::decode_capture;
use meshtrial_evaluator::config_file::LoadConfigFile;
use meshtrial_evaluator::get_terminal_width::get_terminal_width;
use meshtrial_evaluator::run::config::{DistanceMode, EvaluationConfig};
use meshtrial_evaluator::run::measurement_dir::discover_runs;
use meshtrial_evaluator::run::pipeline::{process_all, PipelineOptions};
use meshtrial_evaluator::utillib::logging::{set_log_level, LogLevelOpt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const PROGRAM_NAME: &str = "meshtrial-evaluator";

#[derive(clap::Parser, Debug)]
#[clap(next_line_help = true)]
#[clap(set_term_width = get_terminal_width())]
struct Opts {
    /// The subcommand to run. Use `--help` after the sub-command to
    /// get a list of the allowed options there.
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Print version
    Version,

    /// Evaluate the measurement runs in a source folder: align GPS,
    /// bandwidth and optionally ICMP logs onto a per-second timeline,
    /// join them, compute distances to the configured reference
    /// point(s) and write one CSV file per run.
    Process {
        #[clap(flatten)]
        log_level: LogLevelOpt,

        /// Path to the reference-point config file (.json5/.json,
        /// .yml/.yaml, or .hcl)
        #[clap(short, long)]
        config: PathBuf,

        /// Compute distances to the mesh center and every configured
        /// access point instead of the single reference point
        #[clap(short, long)]
        mesh: bool,

        /// Also parse and join the ICMP latency log of each run
        #[clap(short, long)]
        icmp: bool,

        /// Where to write the per-run CSV files (default: the source
        /// folder)
        #[clap(short, long)]
        output_dir: Option<PathBuf>,

        /// The folder holding the raw measurement files
        source_folder: PathBuf,
    },

    /// Flatten a packet capture into a `;`-delimited table next to
    /// it, with frame times shifted to absolute time-of-day (requires
    /// `tshark`)
    DecodeCapture {
        #[clap(flatten)]
        log_level: LogLevelOpt,

        /// The `*_HH-MM-SS.pcap` file to decode
        pcap_file: PathBuf,
    },
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    match opts.command {
        Command::Version => {
            println!("{PROGRAM_NAME} {}", env!("CARGO_PKG_VERSION"));
        }

        Command::Process {
            log_level,
            config,
            mesh,
            icmp,
            output_dir,
            source_folder,
        } => {
            set_log_level(log_level.into());

            let config = EvaluationConfig::load_config(&config)?;
            let mode = if mesh {
                DistanceMode::Mesh
            } else {
                DistanceMode::Single
            };
            // Check the config against the mode before touching any
            // run, so a broken config fails once, not per run.
            config.distance_columns(mode)?;

            let output_dir = match output_dir {
                Some(dir) => {
                    std::fs::create_dir_all(&dir)
                        .map_err(|e| anyhow!("creating output dir {dir:?}: {e}"))?;
                    dir
                }
                None => source_folder.clone(),
            };

            let runs = discover_runs(&source_folder)?;
            let options = PipelineOptions {
                with_icmp: icmp,
                mode,
                output_dir,
            };
            process_all(&runs, &config, &options)?;
        }

        Command::DecodeCapture {
            log_level,
            pcap_file,
        } => {
            set_log_level(log_level.into());
            let output = decode_capture(&pcap_file)?;
            println!("{}", output.display());
        }
    }

    Ok(())
}
