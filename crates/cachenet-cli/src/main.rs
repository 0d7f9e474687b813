//! cnctl: command line for the cachenet admin console.
//!
//! ```text
//! cnctl nodes list
//! cnctl nodes apply --add 1:7:3f0c... --delete 4 --dry-run
//! cnctl apps apply ks_orders --install 7
//! cnctl watch
//! ```

use std::path::PathBuf;

use clap::{ArgMatches, Args, CommandFactory, FromArgMatches, Parser, Subcommand};

use cachenet_client::LogLevel;
use cachenet_console::{ConsoleConfig, ConsoleSession};
use cachenet_topology::{NodeId, StagedAddition};

use commands::apps::AppEdit;
use commands::nodes::NodeEdit;

mod commands;
mod render;

use render::OutputFormat;

#[derive(Parser)]
#[command(
    name = "cnctl",
    about = "cachenet admin console",
    version,
    propagate_version = true
)]
struct Cli {
    /// Path to cachenet.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API base URL (overrides the config file).
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect and change the deployment tree
    Nodes {
        #[command(subcommand)]
        action: NodesAction,
    },
    /// Manage servers
    Servers {
        #[command(subcommand)]
        action: ServersAction,
    },
    /// Manage applications and their installations
    Apps {
        #[command(subcommand)]
        action: AppsAction,
    },
    /// Browse node logs
    Logs {
        #[command(subcommand)]
        action: LogsAction,
    },
    /// Poll the API and log topology summaries until Ctrl-C
    Watch,
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Subcommand)]
enum NodesAction {
    /// Show the deployment tree
    List,
    /// Stage additions and deletions, print the diff and submit it.
    ///
    /// Operations are staged in the order they appear on the command line.
    Apply {
        /// PARENT:NODE:SERVER
        #[arg(long = "add", value_parser = parse_addition)]
        add: Vec<StagedAddition>,
        /// Delete NODE and its subtree
        #[arg(long = "delete")]
        delete: Vec<NodeId>,
        /// Print the diff without submitting
        #[arg(long)]
        dry_run: bool,
    },
    /// Retry a FAILED node
    Retry { node: NodeId },
}

#[derive(Args)]
pub struct ServerArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub ip: String,
    #[arg(long)]
    pub username: String,
    #[arg(long, default_value = "22")]
    pub ssh_port: u16,
    #[arg(long)]
    pub grpc_port: u16,
    /// SSH password
    #[arg(long, conflicts_with = "key_file", required_unless_present = "key_file")]
    pub password: Option<String>,
    /// Path to an SSH private key
    #[arg(long)]
    pub key_file: Option<PathBuf>,
    /// Passphrase of the private key
    #[arg(long, requires = "key_file")]
    pub passphrase: Option<String>,
}

#[derive(Subcommand)]
enum ServersAction {
    List,
    Create(ServerArgs),
    Update {
        server: String,
        #[command(flatten)]
        args: ServerArgs,
    },
    Delete { server: String },
}

#[derive(Args)]
pub struct AppArgs {
    #[arg(long)]
    pub name: String,
    /// Schema file to upload
    #[arg(long)]
    pub schema: PathBuf,
    #[arg(long)]
    pub master_password: String,
    #[arg(long)]
    pub confirm_password: String,
    /// Client lease time in seconds
    #[arg(long)]
    pub client_lease_time: u64,
    /// Extra server-side lease time in seconds
    #[arg(long)]
    pub server_additional_time: u64,
}

#[derive(Subcommand)]
enum AppsAction {
    List,
    Create(AppArgs),
    Remove { name: String },
    /// Show where an application is installed
    Status { app: String },
    /// Stage installs and uninstalls for one application and submit them.
    ///
    /// Operations are staged in the order they appear on the command line.
    Apply {
        app: String,
        #[arg(long = "install")]
        install: Vec<NodeId>,
        #[arg(long = "uninstall")]
        uninstall: Vec<NodeId>,
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum LogsAction {
    /// List dates with logs per node
    Dates,
    Fetch {
        #[arg(long)]
        node: NodeId,
        #[arg(long)]
        date: String,
        /// debug, info, warning or error
        #[arg(long, default_value = "info", value_parser = parse_level)]
        level: LogLevel,
    },
}

fn parse_addition(s: &str) -> Result<StagedAddition, String> {
    let mut parts = s.splitn(3, ':');
    let (Some(parent), Some(node), Some(server)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected PARENT:NODE:SERVER, got {s:?}"));
    };
    let parent: NodeId = parent.parse().map_err(|e| format!("parent {parent:?}: {e}"))?;
    let node: NodeId = node.parse().map_err(|e| format!("node {node:?}: {e}"))?;
    if server.is_empty() {
        return Err("server must not be empty".to_string());
    }
    Ok(StagedAddition::new(parent, node, server))
}

fn parse_level(s: &str) -> Result<LogLevel, String> {
    match s.to_ascii_lowercase().as_str() {
        "debug" => Ok(LogLevel::Debug),
        "info" => Ok(LogLevel::Info),
        "warning" | "warn" => Ok(LogLevel::Warning),
        "error" => Ok(LogLevel::Error),
        other => Err(format!("unknown log level {other:?}")),
    }
}

/// Merge the values of repeatable flags back into the order they were
/// given. `groups` pairs each argument id with its parsed values.
fn in_command_line_order<T>(matches: Option<&ArgMatches>, groups: Vec<(&str, Vec<T>)>) -> Vec<T> {
    let mut indexed: Vec<(usize, T)> = Vec::new();
    for (id, values) in groups {
        let indices: Vec<usize> = matches
            .and_then(|m| m.indices_of(id))
            .map(|i| i.collect())
            .unwrap_or_default();
        for (n, value) in values.into_iter().enumerate() {
            indexed.push((indices.get(n).copied().unwrap_or(usize::MAX), value));
        }
    }
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, value)| value).collect()
}

fn node_edits(matches: &ArgMatches, add: Vec<StagedAddition>, delete: Vec<NodeId>) -> Vec<NodeEdit> {
    let apply = matches
        .subcommand_matches("nodes")
        .and_then(|m| m.subcommand_matches("apply"));
    in_command_line_order(
        apply,
        vec![
            ("add", add.into_iter().map(NodeEdit::Add).collect()),
            ("delete", delete.into_iter().map(NodeEdit::Delete).collect()),
        ],
    )
}

fn app_edits(matches: &ArgMatches, install: Vec<NodeId>, uninstall: Vec<NodeId>) -> Vec<AppEdit> {
    let apply = matches
        .subcommand_matches("apps")
        .and_then(|m| m.subcommand_matches("apply"));
    in_command_line_order(
        apply,
        vec![
            ("install", install.into_iter().map(AppEdit::Install).collect()),
            ("uninstall", uninstall.into_iter().map(AppEdit::Uninstall).collect()),
        ],
    )
}

fn load_config(cli: &Cli) -> anyhow::Result<ConsoleConfig> {
    let mut config = match &cli.config {
        Some(path) => ConsoleConfig::from_file(path)?,
        None => ConsoleConfig::default(),
    };
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,cnctl=debug,cachenet=debug"))?,
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    let config = load_config(&cli)?;
    let format = cli.format;

    if let Commands::Config = cli.command {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    let session = ConsoleSession::connect(config)?;
    session.refresh().await;

    match cli.command {
        Commands::Nodes { action } => match action {
            NodesAction::List => commands::nodes::list(&session, format).await,
            NodesAction::Apply {
                add,
                delete,
                dry_run,
            } => {
                let edits = node_edits(&matches, add, delete);
                commands::nodes::apply(&session, edits, dry_run, format).await
            }
            NodesAction::Retry { node } => commands::nodes::retry(&session, node).await,
        },
        Commands::Servers { action } => match action {
            ServersAction::List => commands::servers::list(&session, format).await,
            ServersAction::Create(args) => commands::servers::create(&session, args).await,
            ServersAction::Update { server, args } => {
                commands::servers::update(&session, &server, args).await
            }
            ServersAction::Delete { server } => commands::servers::delete(&session, &server).await,
        },
        Commands::Apps { action } => match action {
            AppsAction::List => commands::apps::list(&session, format).await,
            AppsAction::Create(args) => commands::apps::create(&session, args).await,
            AppsAction::Remove { name } => commands::apps::remove(&session, &name).await,
            AppsAction::Status { app } => commands::apps::status(&session, &app, format).await,
            AppsAction::Apply {
                app,
                install,
                uninstall,
                dry_run,
            } => {
                let edits = app_edits(&matches, install, uninstall);
                commands::apps::apply(&session, &app, edits, dry_run, format).await
            }
        },
        Commands::Logs { action } => match action {
            LogsAction::Dates => commands::logs::dates(&session, format).await,
            LogsAction::Fetch { node, date, level } => {
                commands::logs::fetch(&session, node, date, level, format).await
            }
        },
        Commands::Watch => commands::watch::run(&session).await,
        Commands::Config => Ok(()),
    }
}
