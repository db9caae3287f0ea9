mod cli;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use recollect::config::RecollectConfig;
use recollect::memory::types::FilterType;
use recollect::server;

#[derive(Parser)]
#[command(
    name = "recollect",
    version,
    about = "Persistent memory server for local AI agents"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the server (HTTP by default, or MCP over stdio)
    Serve {
        /// Overrides `server.transport` from the config file
        #[arg(long, value_enum)]
        transport: Option<Transport>,
    },
    /// Store a memory
    Add {
        content: String,
        #[arg(long = "type", default_value = "fact")]
        memory_type: String,
        #[arg(long = "source", default_value = "user_statement")]
        source_type: String,
        #[arg(long)]
        user: Option<String>,
    },
    /// Search memories
    Search {
        query: String,
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        limit: Option<i64>,
        #[arg(long, value_enum, default_value_t = Filter::UserOnly)]
        filter: Filter,
    },
    /// Show memory statistics
    Stats {
        /// Limit to one user; all users when omitted
        #[arg(long)]
        user: Option<String>,
    },
    /// Show recently logged conversations
    Recent {
        #[arg(long)]
        user: Option<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Check database health
    Doctor,
    /// Delete all memories and conversations
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Rebuild cached embeddings with the configured model
    ReEmbed,
}

#[derive(Clone, Copy, ValueEnum)]
enum Transport {
    Http,
    Stdio,
}

#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    UserOnly,
    AssistantOnly,
    All,
}

impl From<Filter> for FilterType {
    fn from(f: Filter) -> Self {
        match f {
            Filter::UserOnly => FilterType::UserOnly,
            Filter::AssistantOnly => FilterType::AssistantOnly,
            Filter::All => FilterType::All,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = RecollectConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve { transport } => {
            let transport = match transport {
                Some(t) => t,
                None => match config.server.transport.as_str() {
                    "http" => Transport::Http,
                    "stdio" => Transport::Stdio,
                    other => bail!("unknown transport in config: {other} (expected http or stdio)"),
                },
            };
            match transport {
                Transport::Http => server::serve_http(config).await?,
                Transport::Stdio => server::serve_stdio(config).await?,
            }
        }
        Command::Add {
            content,
            memory_type,
            source_type,
            user,
        } => cli::add::add(&config, &content, &memory_type, &source_type, user.as_deref())?,
        Command::Search {
            query,
            user,
            limit,
            filter,
        } => cli::search::search(&config, &query, user.as_deref(), limit, filter.into()).await?,
        Command::Stats { user } => cli::stats::stats(&config, user.as_deref())?,
        Command::Recent { user, limit } => cli::recent::recent(&config, user.as_deref(), limit)?,
        Command::Doctor => cli::doctor::doctor(&config)?,
        Command::Reset { yes } => cli::reset::reset(&config, yes)?,
        Command::ReEmbed => cli::re_embed::re_embed(&config).await?,
    }

    Ok(())
}
