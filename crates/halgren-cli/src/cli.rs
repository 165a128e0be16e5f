use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "The Halgren Developers",
    version,
    about = "Halgren CLI - Buffered 14-7 van der Waals energies, gradients and softcore lambda scans for periodic and aperiodic systems.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Number of worker threads of the non-bonded engine.
    /// Overrides `threads` from the config file; defaults to the number of logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate the van der Waals energy, and optionally its gradients, once.
    Energy(EnergyArgs),
    /// Scan dE/dlambda over evenly spaced lambda windows and integrate it.
    Scan(ScanArgs),
}

/// Inputs shared by every engine command.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// Path to the system description in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path to the van der Waals parameter file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub forcefield: PathBuf,

    /// Path to the engine configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write the results as TOML to this path.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S vdw-cutoff=9.0
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `energy` subcommand.
#[derive(Args, Debug)]
pub struct EnergyArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    /// Also compute the vdW gradient and, when Born data is present, the
    /// Born-radius chain-rule gradient.
    #[arg(short, long)]
    pub gradient: bool,

    /// Evaluate at this lambda. Implies `lambda-term = true`.
    #[arg(short, long, value_name = "FLOAT")]
    pub lambda: Option<f64>,
}

/// Arguments for the `scan` subcommand.
#[derive(Args, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    /// Number of lambda windows; the scan visits `windows + 1` points.
    #[arg(short, long, default_value_t = 10, value_name = "INT")]
    pub windows: usize,
}
