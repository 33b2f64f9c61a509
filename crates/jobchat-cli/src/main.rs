//! jobchat - terminal client for a job-based chat agent
//!
//! Prompts are submitted as background jobs; progress is polled and answers
//! are printed as they are revealed.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use jobchat_core::api::JobBackend;
use jobchat_core::{paths, ChatClient, ClientConfig, HttpBackend, RetryConfig, RetryingBackend};

mod render;
mod repl;

use render::Renderer;

/// jobchat - chat with an asynchronous agent backend
#[derive(Parser)]
#[command(name = "jobchat", version)]
#[command(about = "Chat with an agent that answers through background jobs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Backend API base URL (overrides config and environment)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Bearer token for the backend
    #[arg(long, global = true)]
    token: Option<String>,

    /// Config file (defaults to ~/.jobchat/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Retry failed status and history queries with backoff
    #[arg(long, global = true)]
    retry: bool,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat session
    Chat,

    /// Submit one prompt and print the answer
    Send {
        text: String,

        /// Existing chat to post into
        #[arg(long)]
        chat: Option<String>,

        /// Run the job in agent mode
        #[arg(long)]
        agent: bool,

        /// Knowledge-base file id to attach
        #[arg(long)]
        attachment: Option<String>,
    },

    /// Open a chat and follow its running job, if any
    Resume { chat_id: String },

    /// List chats
    Chats,
}

fn init_logging(verbose: bool) {
    let log_dir = paths::logs_dir();
    std::fs::create_dir_all(&log_dir).ok();

    #[cfg(unix)]
    let null_device = "/dev/null";
    #[cfg(windows)]
    let null_device = "NUL";

    let Some(log_file) = std::fs::File::create(log_dir.join("jobchat.log"))
        .or_else(|_| std::fs::File::create(null_device))
        .ok()
    else {
        return;
    };

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .init();
}

fn resolve_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    if let Some(token) = &cli.token {
        config.api_token = Some(token.clone());
    }
    config.validate()?;
    Ok(config)
}

fn build_backend(config: &ClientConfig, retry: bool) -> Arc<dyn JobBackend> {
    let http = HttpBackend::new(config);
    if retry {
        return Arc::new(RetryingBackend::new(http, RetryConfig::gentle()));
    }
    Arc::new(http)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = resolve_config(&cli)?;
    tracing::info!(base_url = %config.base_url, retry = cli.retry, "Starting jobchat");
    let client = ChatClient::new(build_backend(&config, cli.retry), &config);

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => repl::run(&client).await?,
        Commands::Send {
            text,
            chat,
            agent,
            attachment,
        } => {
            let renderer = Renderer::spawn(client.subscribe());
            if let Some(chat_id) = chat {
                client.select_chat(&chat_id).await?;
            }
            client.set_agent_mode(agent);
            client.select_attachment(attachment);
            let submitted = client.submit(&text).await?;
            if submitted.is_none() {
                anyhow::bail!("Nothing to send");
            }
            client.wait_idle().await;
            renderer.finish().await;
        }
        Commands::Resume { chat_id } => {
            let renderer = Renderer::spawn(client.subscribe());
            client.select_chat(&chat_id).await?;
            client.wait_idle().await;
            renderer.finish().await;
        }
        Commands::Chats => {
            client.refresh_chats().await?;
            let chats = client.state().chats;
            if chats.is_empty() {
                println!("No chats yet.");
            }
            for chat in chats {
                println!("  {}  {}", chat.id, chat.title);
            }
        }
    }

    Ok(())
}
