//! CLI entry point for inkwell

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inkwell::commands::artifact::Artifact;
use inkwell::config::ContentArgs;
use inkwell::render::{PageRenderer, ShellRenderer};
use inkwell::server::AppState;
use inkwell::ContentStore;

#[derive(Parser)]
#[command(name = "inkwell")]
#[command(version)]
#[command(about = "A file-backed blog server for Markdown posts", long_about = None)]
struct Cli {
    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(flatten)]
    content: ContentArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the blog server
    #[command(alias = "s")]
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value = "3000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Public origin used in feeds and structured data
        /// (defaults to the request Host header)
        #[arg(long, env = "BASE_URL")]
        base_url: Option<String>,

        /// HTML shell with %APP_TITLE% / <!--app-html--> style placeholders
        #[arg(long)]
        template: Option<PathBuf>,
    },

    /// List site information
    List {
        /// Type of content to list (post, tag, category)
        #[arg(default_value = "post")]
        r#type: String,
    },

    /// Print feed.xml, sitemap.xml or robots.txt
    Artifact {
        #[arg(value_enum)]
        kind: Artifact,

        /// Public origin, e.g. https://blog.example.com
        #[arg(long, env = "BASE_URL", default_value = "http://localhost:3000")]
        base_url: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "inkwell=debug,info"
    } else {
        "inkwell=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine content base directory
    let cwd = std::env::current_dir().context("Cannot determine the current directory")?;
    let settings = cli.content.into_settings(cwd);
    let store = ContentStore::new(settings);

    match cli.command {
        Commands::Serve {
            port,
            ip,
            base_url,
            template,
        } => {
            let renderer: Box<dyn PageRenderer> = match template {
                Some(path) => Box::new(ShellRenderer::from_file(path)?),
                None => Box::new(ShellRenderer::new()),
            };
            let state = AppState::new(store, renderer).with_base_url(base_url);

            tracing::info!("Starting server at http://{}:{}", ip, port);
            inkwell::server::start(state, &ip, port).await?;
        }

        Commands::List { r#type } => {
            inkwell::commands::list::run(&store, &r#type).await?;
        }

        Commands::Artifact {
            kind,
            base_url,
            output,
        } => {
            inkwell::commands::artifact::run(&store, kind, &base_url, output.as_deref()).await?;
        }
    }

    Ok(())
}
