use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "verdant")]
#[command(about = "Verdant - identify plants and chat about their care", long_about = None)]
struct Cli {
    /// Run without network connectivity (forces the on-device pipeline).
    #[arg(long, global = true)]
    offline: bool,

    /// Path to a config file (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Identify the plant in a photo
    Identify {
        /// Path to the image file
        image: PathBuf,
    },
    /// Chat about plant care, optionally identifying a photo first
    Chat {
        /// Identify this image before starting the conversation
        #[arg(long)]
        image: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Identify { image } => {
            commands::identify::run(&image, cli.offline, cli.config.as_deref()).await?
        }
        Commands::Chat { image } => {
            commands::chat::run(image.as_deref(), cli.offline, cli.config.as_deref()).await?
        }
    }

    Ok(())
}
