use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{RawInputs, StackSettings};
use crate::plan::{ManifestBackend, ProvisioningBackend, ServiceEndpoint};

pub mod classify;
pub mod config;
pub mod domains;
pub mod outputs;
pub mod plan;
pub mod policy;
pub mod request;
pub mod writer;

#[derive(Parser)]
#[command(name = "ecs-deploy-request")]
#[command(about = "Build validated ECS deployment requests from environment inputs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the deployment request and write the provisioning plan
    Plan {
        /// YAML inputs file, environment variables take precedence
        #[arg(short, long)]
        inputs: Option<PathBuf>,

        /// Where to write the plan
        #[arg(short, long, default_value = "deployment-plan.json")]
        out: PathBuf,
    },

    /// Print the service URLs of an already deployed stack
    Outputs {
        /// Write the endpoint to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = StackSettings::from_env()?;

    let endpoint = match cli.command {
        Commands::Plan { inputs, out } => {
            let file_inputs = match inputs {
                Some(path) => config::parse(&path)?,
                None => RawInputs::default(),
            };
            let raw = file_inputs.merged_with(RawInputs::from_env());

            let request = request::build(&raw)?;
            info!(
                stack = %settings.stack_name,
                primary_domain = ?request.primary_domain(),
                "deployment request ready"
            );

            ManifestBackend::new(out).provision(&settings, request).await?
        }
        Commands::Outputs { out } => {
            let endpoint = outputs::Stack::new(&settings).await.endpoint().await?;
            if let Some(path) = out {
                writer::write_endpoint(&path, &endpoint)?;
                return Ok(());
            }
            endpoint
        }
    };

    print_endpoint(&endpoint)?;
    return Ok(());
}

fn print_endpoint(endpoint: &ServiceEndpoint) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(endpoint)?);
    return Ok(());
}
