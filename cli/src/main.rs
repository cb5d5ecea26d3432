//! assetmeta CLI
//!
//! Command-line interface for structured metadata fields.
//!
//! # Usage
//!
//! ```bash
//! assetmeta fields list
//! assetmeta fields create --type enum --external-id color --label Color \
//!     --entry blue=Blue --entry yellow=Yellow --default blue
//! assetmeta fields update color --type enum --label Colour
//! assetmeta datasource update color --entry green --entry blue=Navy
//! assetmeta datasource delete color yellow
//! assetmeta config set cloud_name demo
//! ```

use assetmeta::FieldType;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod output;

#[derive(Parser)]
#[command(name = "assetmeta")]
#[command(version)]
#[command(about = "Manage structured metadata fields and their datasources", long_about = None)]
struct Cli {
    /// Admin API base URL
    #[arg(long, env = "ASSETMETA_BASE_URL")]
    base_url: Option<String>,

    /// Cloud (account) name
    #[arg(long, env = "ASSETMETA_CLOUD_NAME")]
    cloud_name: Option<String>,

    /// API key
    #[arg(long, env = "ASSETMETA_API_KEY")]
    api_key: Option<String>,

    /// API secret
    #[arg(long, env = "ASSETMETA_API_SECRET", hide_env_values = true)]
    api_secret: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    format: output::OutputFormat,

    /// Profile name from config file
    #[arg(long, short)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage metadata field definitions
    Fields {
        #[command(subcommand)]
        action: FieldCommands,
    },
    /// Manage datasource entries of enum and set fields
    Datasource {
        #[command(subcommand)]
        action: DatasourceCommands,
    },
    /// Configure CLI
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum FieldCommands {
    /// List all fields
    List,
    /// Get field details
    Get { external_id: String },
    /// Create a new field
    Create {
        #[arg(long = "type", value_name = "TYPE")]
        field_type: FieldType,
        #[arg(long)]
        external_id: String,
        #[arg(long)]
        label: String,
        #[arg(long)]
        mandatory: bool,
        /// Default value; comma separated entry ids for set fields
        #[arg(long = "default", value_name = "VALUE")]
        default_value: Option<String>,
        /// Datasource entry as ID=VALUE, or VALUE to let the server pick the id
        #[arg(long = "entry", value_name = "ENTRY")]
        entries: Vec<String>,
        /// Validation rule as JSON
        #[arg(long, value_name = "JSON")]
        validation: Option<String>,
    },
    /// Update a field; only the given options are changed
    Update {
        external_id: String,
        /// Current type of the field, used to read --default
        #[arg(long = "type", value_name = "TYPE")]
        field_type: FieldType,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        mandatory: Option<bool>,
        #[arg(long = "default", value_name = "VALUE", conflicts_with = "clear_default")]
        default_value: Option<String>,
        #[arg(long)]
        clear_default: bool,
        #[arg(long, value_name = "JSON", conflicts_with = "clear_validation")]
        validation: Option<String>,
        #[arg(long)]
        clear_validation: bool,
    },
    /// Delete a field
    Delete { external_id: String },
}

#[derive(Subcommand)]
enum DatasourceCommands {
    /// Add entries or change entry values
    Update {
        external_id: String,
        /// Entry as ID=VALUE, or VALUE to append a new entry
        #[arg(long = "entry", value_name = "ENTRY", required = true)]
        entries: Vec<String>,
    },
    /// Mark entries inactive
    Delete {
        external_id: String,
        #[arg(required = true)]
        entry_ids: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Set configuration value
    Set { key: String, value: String },
    /// Get configuration value
    Get { key: String },
    /// List all configuration
    List,
    /// Initialize configuration
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let profile = cli.profile.as_deref();
    let overrides = config::Overrides {
        base_url: cli.base_url,
        cloud_name: cli.cloud_name,
        api_key: cli.api_key,
        api_secret: cli.api_secret,
    };

    match cli.command {
        Commands::Config { action } => commands::config::handle(action, profile),
        Commands::Fields { action } => {
            let fields = connect(profile, overrides)?;
            commands::fields::handle(action, &fields, cli.format).await
        }
        Commands::Datasource { action } => {
            let fields = connect(profile, overrides)?;
            commands::datasource::handle(action, &fields, cli.format).await
        }
    }
}

fn connect(
    profile: Option<&str>,
    overrides: config::Overrides,
) -> anyhow::Result<assetmeta::MetadataFields> {
    let client_config = config::Config::load(profile)?.client_config(overrides)?;
    tracing::debug!(?client_config, "using configuration");
    let client = assetmeta::Client::with_config(client_config)?;
    Ok(client.metadata_fields())
}
