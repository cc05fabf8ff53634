mod commands;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use icinga2_http::{read_client_config, ClientConfig, HttpTransport};
use icinga2_iom::Session;
use tracing_subscriber::EnvFilter;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Icinga 2 API client.
#[derive(Parser)]
#[command(name = "icinga2", version, about = "Icinga 2 API client")]
struct Cli {
    /// Path to a TOML config file with an [api] section
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API URL; overrides the config file and ICINGA2_API_URL
    #[arg(long, global = true)]
    url: Option<String>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List objects of a type
    Query {
        /// Type name, singular or plural (Host, services)
        type_name: String,
        /// Filter expression
        #[arg(long)]
        filter: Option<String>,
        /// Attribute to show; repeatable
        #[arg(long = "attr")]
        attrs: Vec<String>,
    },

    /// List types, or show the fields of one
    Types {
        /// Type name to describe
        name: Option<String>,
    },

    /// Partially update an object
    Modify {
        type_name: String,
        name: String,
        /// Assignments as <path>=<json>, e.g. vars.os="Linux"
        #[arg(required = true)]
        assignments: Vec<String>,
    },

    /// Delete an object
    Delete {
        type_name: String,
        name: String,
        /// Also delete dependent objects
        #[arg(long)]
        cascade: bool,
    },

    /// Run an action on every matching object
    Action {
        /// Action name, e.g. reschedule-check
        action: String,
        type_name: String,
        /// Filter expression selecting the objects
        #[arg(long)]
        filter: Option<String>,
        /// Action parameter as <key>=<json>; repeatable
        #[arg(long = "param")]
        params: Vec<String>,
    },

    /// Print events from an event stream queue
    Events {
        /// Queue name
        #[arg(long)]
        queue: String,
        /// Event type, e.g. CheckResult; repeatable
        #[arg(long = "type", required = true)]
        types: Vec<String>,
        /// Filter expression
        #[arg(long)]
        filter: Option<String>,
        /// Stop after this many events
        #[arg(long)]
        limit: Option<usize>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let output = cli.output;
    let quiet = cli.quiet;

    let result = connect(&cli).and_then(|(session, transport)| match cli.command {
        Commands::Query {
            type_name,
            filter,
            attrs,
        } => commands::query::cmd_query(&session, &type_name, filter.as_deref(), &attrs, output),
        Commands::Types { name } => commands::types::cmd_types(&session, name.as_deref(), output),
        Commands::Modify {
            type_name,
            name,
            assignments,
        } => commands::modify::cmd_modify(&session, &type_name, &name, &assignments, output),
        Commands::Delete {
            type_name,
            name,
            cascade,
        } => commands::modify::cmd_delete(&session, &type_name, &name, cascade, output),
        Commands::Action {
            action,
            type_name,
            filter,
            params,
        } => commands::action::cmd_action(
            &session,
            &action,
            &type_name,
            filter.as_deref(),
            &params,
            output,
        ),
        Commands::Events {
            queue,
            types,
            filter,
            limit,
        } => commands::events::cmd_events(
            &transport,
            &queue,
            &types,
            filter.as_deref(),
            limit,
            output,
        ),
    });

    if let Err(msg) = result {
        report_error(&msg, output, quiet);
        process::exit(1);
    }
}

/// Builds the transport and session from the config file, the environment
/// and `--url`, in increasing precedence.
fn connect(cli: &Cli) -> Result<(Session, Arc<HttpTransport>), String> {
    let mut config = match &cli.config {
        Some(path) => read_client_config(path).map_err(|e| e.to_string())?,
        None => ClientConfig::default(),
    };
    config.apply_env();
    if let Some(url) = &cli.url {
        config.url = Some(url.clone());
    }

    let transport = Arc::new(HttpTransport::new(&config).map_err(|e| e.to_string())?);
    let session = Session::new(transport.clone(), config.cache_duration());
    Ok((session, transport))
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
