mod interactive;
mod terminal;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use modelchat_client::{HttpBackend, ImageAttachment, ModelChatApp, PollEnd};
use modelchat_core::{ClientConfig, DownloadSource, ModelCatalog, ModelStatus};
use terminal::{TerminalDisplay, TerminalTranscript};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "modelchat")]
#[command(about = "ModelChat - download local models and chat with them", long_about = None)]
struct Cli {
    /// Backend base URL (overrides MODELCHAT_BACKEND and the config file)
    #[arg(long, global = true)]
    backend: Option<String>,

    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List available models
    Models,

    /// Show backend health and a model's download status
    Status {
        /// Model index or ID (defaults to the auto-selected model)
        model: Option<String>,
    },

    /// Start a model download and follow its progress
    Download {
        /// Model index or ID
        model: String,

        /// Download source (huggingface, modelscope)
        #[arg(short, long)]
        source: Option<DownloadSource>,
    },

    /// Send a single chat message
    Chat {
        /// Model index or ID
        #[arg(short, long)]
        model: String,

        /// Image to attach
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Message text
        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("modelchat_client=info,modelchat_cli=info")
        }))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let backend = HttpBackend::new(&config)?;
    tracing::debug!(backend = backend.base_url(), "Using backend");

    let mut app = ModelChatApp::new(Arc::new(backend), Arc::new(TerminalDisplay), &config);

    match cli.command {
        Some(Commands::Models) => cmd_models(&mut app).await?,
        Some(Commands::Status { model }) => cmd_status(&mut app, model.as_deref()).await?,
        Some(Commands::Download { model, source }) => {
            cmd_download(&mut app, &model, source).await?
        }
        Some(Commands::Chat {
            model,
            image,
            message,
        }) => cmd_chat(&mut app, &model, image, &message.join(" ")).await?,
        None => interactive::run(&mut app, &config).await?,
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::from_file(path)?,
        None => ClientConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    if let Some(url) = &cli.backend {
        config.backend.base_url = url.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Resolve a 1-based index or id against the catalog; unknown ids pass through.
pub(crate) fn resolve_model_id(catalog: &ModelCatalog, input: &str) -> Result<String> {
    if let Some(model) = catalog.resolve(input) {
        return Ok(model.id.clone());
    }
    if input.parse::<usize>().is_ok() {
        anyhow::bail!("Invalid model index: {}. Use 1-{}", input, catalog.len());
    }
    Ok(input.to_string())
}

pub(crate) fn print_models(catalog: &ModelCatalog, current: Option<&str>) {
    println!();
    println!("Available Models:");
    println!("{:-<78}", "");
    println!("  {:<4} {:<40} {:<22} {}", "#", "ID", "Name", "State");
    println!("{:-<78}", "");
    for (i, m) in catalog.iter().enumerate() {
        let marker = if current == Some(m.id.as_str()) { "*" } else { " " };
        let state = if m.downloaded {
            "downloaded"
        } else if m.downloading {
            "downloading"
        } else {
            "-"
        };
        println!("{} {:<4} {:<40} {:<22} {}", marker, i + 1, m.id, m.label(), state);
    }
    println!();
}

async fn cmd_models(app: &mut ModelChatApp) -> Result<()> {
    let current = {
        app.load_models().await?;
        app.current_model()
    };
    print_models(app.catalog(), current.as_deref());
    Ok(())
}

async fn cmd_status(app: &mut ModelChatApp, model: Option<&str>) -> Result<()> {
    println!("System Status:");
    println!("{:-<40}", "");

    match app.backend().health().await {
        Ok(true) => println!("  Backend: healthy"),
        Ok(false) => println!("  Backend: reachable, not healthy"),
        Err(e) => {
            println!("  Backend: disconnected ({})", e);
            return Ok(());
        }
    }

    match model {
        Some(input) => {
            app.refresh_models().await?;
            let id = resolve_model_id(app.catalog(), input)?;
            println!("  Model: {}", id);
            app.select_model(&id).await;
        }
        None => {
            app.load_models().await?;
            match app.current_model() {
                Some(id) => println!("  Model: {} (auto-selected)", id),
                None => println!("  Model: none available"),
            }
        }
    }
    Ok(())
}

async fn cmd_download(
    app: &mut ModelChatApp,
    model: &str,
    source: Option<DownloadSource>,
) -> Result<()> {
    app.refresh_models().await?;
    let id = resolve_model_id(app.catalog(), model)?;
    app.select_model(&id).await;
    if let Some(source) = source {
        app.set_source(source);
    }

    println!();
    println!("Downloading {} from {}...", id, app.source().label());
    app.download().await?;

    match app.wait_for_download().await {
        Some(PollEnd::Finished(ModelStatus::Downloaded)) => {
            println!("Done.");
            Ok(())
        }
        Some(PollEnd::Finished(status)) => anyhow::bail!("{}", status),
        Some(PollEnd::FetchFailed(reason)) => {
            anyhow::bail!("Lost track of download progress: {}", reason)
        }
        Some(PollEnd::Cancelled) | None => Ok(()),
    }
}

async fn cmd_chat(
    app: &mut ModelChatApp,
    model: &str,
    image: Option<PathBuf>,
    message: &str,
) -> Result<()> {
    app.refresh_models().await?;
    let id = resolve_model_id(app.catalog(), model)?;
    app.select_model(&id).await;
    if let Some(path) = image {
        app.attach_image(ImageAttachment::new(path));
    }

    let mut transcript = TerminalTranscript;
    app.send_message(message, &mut transcript)
        .await
        .context("chat turn failed")?;
    Ok(())
}
