use clap::{Parser, Subcommand};
use farmflow::cli;
use farmflow::error::ReportResult;
use farmflow::excel::DEFAULT_OUTPUT;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "farmflow")]
#[command(about = "Excel data-movement report for NDVI yield prediction and farmer monitoring")]
#[command(long_about = "Farmflow - two-sheet Excel data-movement report

Turns already-computed yield-prediction artifacts and a farmer portfolio
into one workbook:

  Yield_Prediction_Flow   - NDVI → weather → merge → features → CV → prediction
  Farmer_Monitoring_Flow  - one row per crop with soil, moisture and anomaly status

COMMANDS:
  export    - Build the workbook from an input bundle
  validate  - Check input bundles without writing anything
  inspect   - Summarize a written workbook

EXAMPLES:
  farmflow export pipeline.yaml --lookups lookups.yaml
  farmflow validate pipeline.yaml
  farmflow inspect Complete_System_Data_Movement.xlsx --json

LOGGING:
  Progress is logged to stderr. Set RUST_LOG (e.g. RUST_LOG=farmflow=debug)
  to change the level.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Build the two-sheet Excel report from a YAML input bundle.

The bundle holds every pipeline artifact (timeseries, weather, combined,
season_features, feature_importance, cv_result, final_prediction) and the
farmer portfolio (farmers).

Soil, moisture and anomaly values come from a recorded lookups file. A farmer
missing from that file, or a failed lookup, shows N/A / Unknown for that
farmer only. An existing output file is overwritten.

EXAMPLE:
  farmflow export pipeline.yaml --lookups lookups.yaml -o report.xlsx")]
    /// Build the Excel report from an input bundle
    Export {
        /// Path to the YAML input bundle
        input: PathBuf,

        /// Recorded soil/moisture/anomaly lookups (YAML)
        #[arg(short, long, env = "FARMFLOW_LOOKUPS")]
        lookups: Option<PathBuf>,

        /// Output Excel file path (.xlsx)
        #[arg(short, long, env = "FARMFLOW_OUTPUT", default_value = DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Show verbose export steps
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate input bundles without writing a report
    Validate {
        /// Path to YAML input bundle(s)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Summarize sheets and step row counts of a written report
    Inspect {
        /// Path to the .xlsx report
        file: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "farmflow=debug" } else { "farmflow=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ReportResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            input,
            lookups,
            output,
            verbose,
        } => {
            init_tracing(verbose);
            cli::export(input, lookups, output, verbose)
        }

        Commands::Validate { files } => {
            init_tracing(false);
            cli::validate(files)
        }

        Commands::Inspect { file, json } => {
            init_tracing(false);
            cli::inspect(file, json)
        }
    }
}
