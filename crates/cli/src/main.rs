//! Energy Cost Predictor CLI
//!
//! A command-line tool for requesting predictions from a running server
//! and for checking model artifacts offline.

mod client;
mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use commands::{local, remote};
use energy_core::{predictor::UnseenCategoryPolicy, ArtifactPaths, RawObservation};

/// Energy Cost Predictor CLI
#[derive(Parser)]
#[command(name = "energy-cli")]
#[command(author, version, about = "CLI for the Energy Cost Predictor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via ENERGY_API_URL env var)
    #[arg(long, env = "ENERGY_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict energy use and bill for one observation
    Predict(ObservationArgs),

    /// Show server status and billing rate
    Status,

    /// Show the feature vector an observation encodes to
    Encode {
        #[command(flatten)]
        observation: ObservationArgs,

        /// Schema file (JSON array of column names)
        #[arg(long, default_value = "model_columns.json")]
        schema: PathBuf,

        /// Handling of machine statuses absent from the schema
        #[arg(long, value_enum, default_value = "zero-fill")]
        unseen: PolicyArg,
    },

    /// Load a model artifact and describe it
    Inspect {
        /// Directory holding the default artifact file names
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Model file (overrides --dir)
        #[arg(long)]
        model: Option<PathBuf>,

        /// Schema file (overrides --dir)
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Expected SHA-256 of the model file
        #[arg(long)]
        checksum: Option<String>,
    },
}

#[derive(Args)]
pub struct ObservationArgs {
    /// Hour of day
    #[arg(long)]
    pub hour: f64,

    /// Ambient temperature
    #[arg(long, allow_hyphen_values = true)]
    pub temperature: f64,

    /// Machine operating state (e.g. Off, Idle, Running)
    #[arg(long)]
    pub machine_status: String,
}

impl ObservationArgs {
    fn to_observation(&self) -> RawObservation {
        RawObservation::new(self.hour, self.temperature, &self.machine_status)
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    ZeroFill,
    Reject,
}

impl From<PolicyArg> for UnseenCategoryPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::ZeroFill => UnseenCategoryPolicy::ZeroFill,
            PolicyArg::Reject => UnseenCategoryPolicy::Reject,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Predict(args) => {
            let client = client::ApiClient::new(&cli.api_url)?;
            remote::predict(&client, &args.to_observation(), cli.format).await?;
        }
        Commands::Status => {
            let client = client::ApiClient::new(&cli.api_url)?;
            remote::status(&client, cli.format).await?;
        }
        Commands::Encode {
            observation,
            schema,
            unseen,
        } => {
            local::encode(&schema, &observation.to_observation(), unseen.into(), cli.format)?;
        }
        Commands::Inspect {
            dir,
            model,
            schema,
            checksum,
        } => {
            let defaults = ArtifactPaths::in_dir(&dir);
            let mut paths = ArtifactPaths::new(
                model.unwrap_or(defaults.model),
                schema.unwrap_or(defaults.schema),
            );
            if let Some(checksum) = checksum {
                paths = paths.with_checksum(checksum);
            }
            local::inspect(&paths, cli.format)?;
        }
    }

    Ok(())
}
