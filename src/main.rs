use std::net::SocketAddr;

use anyhow::Result;
use clap::Parser;
use sentiment_storyteller::story::{load_models, GenerationSettings, Submission};
use sentiment_storyteller::ui::{self, AppState};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    // Reject bad settings before spending time on model downloads.
    let run_settings = match &cli.command {
        Commands::Run(args) => Some(GenerationSettings::new(args.max_length, args.temperature)?),
        Commands::Serve(_) => None,
    };

    let spec = cli.models.spec();
    info!(
        sentiment = %spec.sentiment,
        generator = %spec.generator,
        device = ?spec.device,
        "loading models"
    );

    let models = match load_models(&spec) {
        Ok(models) => models,
        Err(e) => {
            tracing::error!(error = %e, "model loading failed");
            eprintln!("Error loading models: {e}");
            std::process::exit(1);
        }
    };
    let storyteller = models.storyteller();

    match cli.command {
        Commands::Serve(args) => {
            let state = AppState::new(storyteller)?;
            let addr = SocketAddr::new(args.host, args.port);
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(ui::serve(state, addr))?;
        }
        Commands::Run(args) => {
            let settings = run_settings.unwrap_or_default();
            match storyteller.submit(&args.prompt, &settings)? {
                Submission::MissingPrompt => {
                    eprintln!("{}", Submission::MissingPrompt.warning().unwrap_or_default());
                }
                Submission::Story(story) => {
                    println!("{}", story.sentiment_display());
                    println!();
                    println!("Generated Output:");
                    println!("{}", story.text);
                }
            }
        }
    }

    Ok(())
}
