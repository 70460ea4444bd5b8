pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::config::config;

#[derive(Parser)]
#[command(name = "tenant-scope")]
#[command(about = "Tenant scope service - host resolution, scoped settings and plan quotas")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP API")]
    Serve {
        #[arg(long, help = "Port to listen on (defaults to API_PORT)")]
        port: Option<u16>,
        #[arg(long, help = "Use in-memory stores instead of PostgreSQL")]
        in_memory: bool,
    },

    #[command(about = "Apply database migrations")]
    Migrate,

    #[command(about = "List the plan catalog")]
    Plans,

    #[command(about = "Show which scope a host name resolves to")]
    Resolve {
        #[arg(help = "Host header value, e.g. acme.example.com:8080")]
        host: String,
    },

    #[command(about = "Issue a bearer token for local testing")]
    Token {
        #[arg(help = "Subject claim")]
        sub: String,
        #[arg(long, help = "Tenant the caller belongs to; omit for a platform caller")]
        tenant: Option<Uuid>,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = config().clone();

    match cli.command {
        Commands::Serve { port, in_memory } => commands::server::serve(config, port, in_memory).await,
        Commands::Migrate => commands::server::migrate(config).await,
        Commands::Plans => commands::plans::handle(&config, output_format),
        Commands::Resolve { host } => commands::resolve::handle(&config, &host, output_format),
        Commands::Token { sub, tenant } => commands::token::handle(&config, &sub, tenant, output_format),
    }
}
