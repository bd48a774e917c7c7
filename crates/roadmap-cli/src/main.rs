mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, FilterArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "roadmap",
    about = "Turn YAML planning data into dependency-ordered GitHub issues and pick the next task for a coding agent",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .roadmap/ or .git/)
    #[arg(long, global = true, env = "ROADMAP_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default .roadmap/config.yaml
    Init {
        /// Repository as owner/name
        #[arg(long)]
        repo: Option<String>,
    },

    /// List planned tasks in file order
    Tasks {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Show tasks in dependency order
    Order {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Pick the task a coding agent should start on next
    Next {
        /// YAML file with `issues: {KEY: number}` and `nodes: {KEY: node_id}`
        #[arg(long)]
        issues: PathBuf,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Print the instructions handed to the coding agent for a task
    Instructions {
        key: String,

        /// Do not clamp to agent.max_instruction_chars
        #[arg(long)]
        full: bool,
    },

    /// Create GitHub issues for planned tasks
    Sync {
        #[command(flatten)]
        filter: FilterArgs,

        /// Show what would be created without calling GitHub
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,

        /// Do not assign the coding agent to the next ready task
        #[arg(long)]
        no_assign: bool,
    },

    /// Create repository labels from the planning label catalogue
    Labels {
        /// Show what would change without calling GitHub
        #[arg(long)]
        dry_run: bool,

        /// Also refresh colour and description of existing labels
        #[arg(long)]
        update: bool,
    },

    /// Inspect and validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Sync { dry_run: false, .. } | Commands::Labels { dry_run: false, .. } => {
            tracing::Level::INFO
        }
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { repo } => cmd::init::run(&root, repo.as_deref(), cli.json),
        Commands::Tasks { filter } => cmd::tasks::run(&root, &filter, cli.json),
        Commands::Order { filter } => cmd::order::run(&root, &filter, cli.json),
        Commands::Next { issues, filter } => cmd::next::run(&root, &issues, &filter, cli.json),
        Commands::Instructions { key, full } => cmd::instructions::run(&root, &key, full, cli.json),
        Commands::Sync {
            filter,
            dry_run,
            yes,
            no_assign,
        } => cmd::sync::run(
            &root,
            &filter,
            cmd::sync::SyncFlags {
                dry_run,
                yes,
                assign: !no_assign,
            },
            cli.json,
        ),
        Commands::Labels { dry_run, update } => cmd::labels::run(&root, dry_run, update, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
