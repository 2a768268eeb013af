use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::core::AppConfig;

pub mod recipients;
pub mod send;
pub mod serve;
pub mod subscribe;

#[derive(Subcommand)]
enum Command {
    /// Send a notification to every recipient, a topic, or one device
    Send {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        body: Option<String>,
        /// Broadcast to a topic instead of each recipient on record
        #[arg(long, conflicts_with = "token")]
        topic: Option<String>,
        /// Send to a single registration token
        #[arg(long)]
        token: Option<String>,
        /// Skip the confirmation prompt
        #[arg(long, short, action, default_value = "false")]
        yes: bool,
    },
    /// Subscribe a registration token to a topic
    Subscribe {
        #[arg(long)]
        token: String,
        /// Defaults to PUSHCAST_DEFAULT_TOPIC
        #[arg(long)]
        topic: Option<String>,
    },
    /// Print how many recipients are on record
    Recipients {},
    /// Run the HTTP API
    Serve {
        /// Set the server host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Set the server port
        #[arg(long, default_value = "2222")]
        port: String,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

fn init_tracing(default_filter: String) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();
    let crate_name = env!("CARGO_CRATE_NAME");

    match args.command {
        Some(Command::Serve { .. }) => init_tracing(format!(
            "{}=debug,tower_http=debug,axum::rejection=trace",
            crate_name
        )),
        _ => init_tracing(format!("{}=info", crate_name)),
    }

    let config = AppConfig::from_env()?;

    // Handle each sub command
    match args.command {
        Some(Command::Send {
            title,
            body,
            topic,
            token,
            yes,
        }) => {
            send::run(&config, title, body, topic, token, yes).await?;
        }
        Some(Command::Subscribe { token, topic }) => {
            subscribe::run(&config, &token, topic.as_deref()).await?;
        }
        Some(Command::Recipients {}) => {
            recipients::run(&config).await?;
        }
        Some(Command::Serve { host, port }) => {
            serve::run(host, port, config).await?;
        }
        None => {}
    }

    Ok(())
}
