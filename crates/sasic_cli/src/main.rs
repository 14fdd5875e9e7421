//! The sasic command-line interface for the structured-ASIC flow.
//!
//! Provides `sasic place` for placement, `sasic eco` for clock-tree synthesis
//! and the power-down ECO on an existing placement, `sasic flow` for both in
//! one run, and `sasic init-config` for writing a starter `sasic.toml`.

#![warn(missing_docs)]

mod eco;
mod flow;
mod init;
mod pipeline;
mod place;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Placement and ECO for structured-ASIC fabrics.
#[derive(Parser, Debug)]
#[command(name = "sasic", version, about = "Structured-ASIC placement and ECO flow")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print per-stage detail.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a `sasic.toml` file or the directory holding one.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Place the design onto the fabric and write the placement map.
    Place(PlaceArgs),
    /// Run CTS and the power-down ECO on a saved placement.
    Eco(EcoArgs),
    /// Place, then run CTS and the power-down ECO.
    Flow(FlowArgs),
    /// Write a starter `sasic.toml`.
    InitConfig {
        /// Design name recorded in the file.
        name: Option<String>,

        /// Output path (default: `./sasic.toml`).
        #[arg(short, long)]
        output: Option<String>,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// Arguments for the `sasic place` subcommand.
#[derive(Parser, Debug)]
pub struct PlaceArgs {
    /// Override the annealing seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Keep the greedy placement and skip annealing.
    #[arg(long)]
    pub greedy_only: bool,

    /// Override the output directory.
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Exit with status 1 when placement validation fails.
    #[arg(long)]
    pub strict: bool,

    /// Output format for diagnostics.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `sasic eco` subcommand.
#[derive(Parser, Debug)]
pub struct EcoArgs {
    /// Placement map to start from (default: `<output_dir>/<name>.map`).
    #[arg(short, long)]
    pub map: Option<String>,

    /// Skip clock-tree synthesis.
    #[arg(long)]
    pub no_cts: bool,

    /// Skip the power-down ECO.
    #[arg(long)]
    pub no_power_down: bool,

    /// Override the output directory.
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Exit with status 1 when placement or ECO validation fails.
    #[arg(long)]
    pub strict: bool,

    /// Output format for diagnostics.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `sasic flow` subcommand.
#[derive(Parser, Debug)]
pub struct FlowArgs {
    /// Override the annealing seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Keep the greedy placement and skip annealing.
    #[arg(long)]
    pub greedy_only: bool,

    /// Skip clock-tree synthesis.
    #[arg(long)]
    pub no_cts: bool,

    /// Skip the power-down ECO.
    #[arg(long)]
    pub no_power_down: bool,

    /// Override the output directory.
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Exit with status 1 when placement or ECO validation fails.
    #[arg(long)]
    pub strict: bool,

    /// Output format for diagnostics.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Diagnostic output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// One JSON object per line.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print per-stage detail.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to the config file or its directory.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => atty_is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Place(ref args) => place::run(args, &global),
        Command::Eco(ref args) => eco::run(args, &global),
        Command::Flow(ref args) => flow::run(args, &global),
        Command::InitConfig {
            name,
            output,
            force,
        } => init::run(name, output, force, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Rough terminal detection from the TERM env var.
fn atty_is_terminal() -> bool {
    std::env::var("TERM").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_place_default() {
        let cli = Cli::parse_from(["sasic", "place"]);
        match cli.command {
            Command::Place(ref args) => {
                assert!(args.seed.is_none());
                assert!(!args.greedy_only);
                assert!(args.output_dir.is_none());
                assert!(!args.strict);
                assert_eq!(args.format, ReportFormat::Text);
            }
            _ => panic!("expected Place command"),
        }
    }

    #[test]
    fn parse_place_with_args() {
        let cli = Cli::parse_from([
            "sasic",
            "place",
            "--seed",
            "7",
            "--greedy-only",
            "-o",
            "out",
            "--format",
            "json",
            "--strict",
        ]);
        match cli.command {
            Command::Place(ref args) => {
                assert_eq!(args.seed, Some(7));
                assert!(args.greedy_only);
                assert_eq!(args.output_dir.as_deref(), Some("out"));
                assert_eq!(args.format, ReportFormat::Json);
                assert!(args.strict);
            }
            _ => panic!("expected Place command"),
        }
    }

    #[test]
    fn parse_eco_with_map() {
        let cli = Cli::parse_from([
            "sasic", "eco", "--map", "build/6502/6502.map", "--no-cts", "--strict",
        ]);
        match cli.command {
            Command::Eco(ref args) => {
                assert_eq!(args.map.as_deref(), Some("build/6502/6502.map"));
                assert!(args.no_cts);
                assert!(!args.no_power_down);
                assert!(args.strict);
            }
            _ => panic!("expected Eco command"),
        }
    }

    #[test]
    fn parse_flow_switches() {
        let cli = Cli::parse_from(["sasic", "flow", "--no-power-down", "--seed", "1"]);
        match cli.command {
            Command::Flow(ref args) => {
                assert!(args.no_power_down);
                assert!(!args.no_cts);
                assert_eq!(args.seed, Some(1));
            }
            _ => panic!("expected Flow command"),
        }
    }

    #[test]
    fn parse_init_config() {
        let cli = Cli::parse_from(["sasic", "init-config", "6502", "--force"]);
        match cli.command {
            Command::InitConfig {
                name,
                output,
                force,
            } => {
                assert_eq!(name.as_deref(), Some("6502"));
                assert!(output.is_none());
                assert!(force);
            }
            _ => panic!("expected InitConfig command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["sasic", "--quiet", "--color", "never", "flow"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.color, ColorChoice::Never);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["sasic", "place", "--verbose", "--config", "proj/sasic.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config.as_deref(), Some("proj/sasic.toml"));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["sasic", "route"]).is_err());
    }
}
