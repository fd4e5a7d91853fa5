mod config;
mod http;
mod llm;
mod oracle;
mod pipeline;
mod poster;
mod server;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rmcp::{ServiceExt, transport::stdio};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use blank_core::{DraftKind, DraftStatus};
use blank_store::{JournalQuery, Store};

use crate::config::Config;
use crate::llm::AnthropicGenerator;
use crate::oracle::SolanaOracle;
use crate::pipeline::{DraftRequest, Pipeline, PipelineSettings};

#[derive(Parser)]
#[command(name = "blank", about = "Daily memory formation pipeline: CLI, MCP server and HTTP API")]
struct Cli {
    /// Config file (default: $BLANK_DATA_DIR/blank.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server on stdio transport
    Serve,

    /// Start the public HTTP API
    Http {
        /// Bind address (default from config)
        #[arg(long)]
        addr: Option<String>,
    },

    /// Submit a journal entry
    Submit {
        /// Author wallet address
        author_id: String,
        /// Entry text
        text: String,
        /// Request a permanent core memory (tier III only)
        #[arg(long)]
        core: bool,
        /// Use this balance instead of asking the oracle
        #[arg(long)]
        balance: Option<f64>,
    },

    /// List entries awaiting moderation
    Pending {
        /// Id of the last entry of the previous page
        #[arg(long)]
        cursor: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Approve a pending entry
    Approve { id: String },

    /// Reject a pending entry
    Reject { id: String },

    /// Annotate an approved entry (generated when no text is given)
    Annotate { id: String, text: Option<String> },

    /// Form the synthesis for a cycle
    Synthesize {
        #[arg(long)]
        cycle: Option<u32>,
    },

    /// Show the assembled context for a cycle
    Context {
        #[arg(long)]
        cycle: Option<u32>,
        /// Print the rendered system prompt instead of JSON
        #[arg(long)]
        prompt: bool,
    },

    /// List approved journal entries
    Journal {
        #[arg(long)]
        cycle: Option<u32>,
        #[arg(long)]
        core_only: bool,
        #[arg(long, default_value_t = 50)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Show the current cycle
    Cycle,

    /// Generate and review post drafts
    #[command(subcommand)]
    Drafts(DraftsCommand),

    /// Waking announcements
    #[command(subcommand)]
    Waking(WakingCommand),
}

#[derive(Subcommand)]
enum DraftsCommand {
    /// Generate drafts of one kind
    Generate {
        /// morning, midday_decision, evening_result or final_thought
        kind: String,
        #[arg(long, default_value_t = 3)]
        count: usize,
        #[arg(long)]
        decision: Option<String>,
        #[arg(long)]
        result: Option<String>,
        /// Replace the summary of today's journal
        #[arg(long)]
        context: Option<String>,
    },
    /// List drafts by status
    List {
        #[arg(long, default_value = "draft")]
        status: String,
    },
    Approve { id: String },
    Edit { id: String, text: String },
    Post { id: String },
    Delete { id: String },
}

#[derive(Subcommand)]
enum WakingCommand {
    /// Generate the two waking posts (not stored)
    Draft,
    /// Record a posted waking announcement
    Post {
        first: String,
        second: Option<String>,
    },
    /// List posted announcements
    List {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let db_path = config.db_path();
    let store = Store::open(&db_path)
        .with_context(|| format!("failed to open store at {}", db_path.display()))?;
    let generator = Arc::new(AnthropicGenerator::new(config.generator.clone()));
    let oracle = Arc::new(SolanaOracle::new(config.oracle.clone()));

    Ok(Pipeline::new(store, generator, oracle)
        .with_clock(config.clock()?)
        .with_policies(config.policy_table()?)
        .with_persona(config.persona())
        .with_settings(PipelineSettings {
            generator_timeout: config.generator_timeout(),
            oracle_timeout: config.oracle_timeout(),
        }))
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id.trim()).with_context(|| format!("'{id}' is not a valid id"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::Serve => cmd_serve(&config).await,
        Commands::Http { addr } => cmd_http(&config, addr.as_deref()).await,
        command => {
            let pipeline = build_pipeline(&config)?;
            let result = run_command(&pipeline, command).await;
            pipeline.shutdown().await;
            result
        }
    }
}

async fn run_command(pipeline: &Pipeline, command: Commands) -> Result<()> {
    match command {
        Commands::Submit {
            author_id,
            text,
            core,
            balance,
        } => {
            let entry = match balance {
                Some(balance) => pipeline.submit(&author_id, &text, core, balance).await?,
                None => pipeline.submit_entry(&author_id, &text, core).await?,
            };
            print_json(&entry)
        }
        Commands::Pending { cursor, limit } => {
            let cursor = cursor.as_deref().map(parse_id).transpose()?;
            print_json(&pipeline.list_pending(cursor, limit).await?)
        }
        Commands::Approve { id } => print_json(&pipeline.approve(parse_id(&id)?).await?),
        Commands::Reject { id } => print_json(&pipeline.reject(parse_id(&id)?).await?),
        Commands::Annotate { id, text } => {
            print_json(&pipeline.annotate(parse_id(&id)?, text.as_deref()).await?)
        }
        Commands::Synthesize { cycle } => print_json(&pipeline.run_synthesis(cycle).await?),
        Commands::Context { cycle, prompt } => {
            if prompt {
                println!("{}", pipeline.render_context_prompt(cycle).await?);
                Ok(())
            } else {
                print_json(&pipeline.get_context(cycle).await?)
            }
        }
        Commands::Journal {
            cycle,
            core_only,
            limit,
            offset,
        } => print_json(
            &pipeline
                .list_journal(JournalQuery {
                    cycle_number: cycle,
                    core_only,
                    limit,
                    offset,
                })
                .await?,
        ),
        Commands::Cycle => print_json(&pipeline.cycle_info()),
        Commands::Drafts(cmd) => run_drafts(pipeline, cmd).await,
        Commands::Waking(cmd) => run_waking(pipeline, cmd).await,
        Commands::Serve | Commands::Http { .. } => {
            bail!("serve and http are long-running and cannot run as one-shot commands")
        }
    }
}

async fn run_drafts(pipeline: &Pipeline, command: DraftsCommand) -> Result<()> {
    match command {
        DraftsCommand::Generate {
            kind,
            count,
            decision,
            result,
            context,
        } => {
            let kind: DraftKind = kind.parse()?;
            let drafts = pipeline
                .generate_drafts(DraftRequest {
                    decision,
                    result,
                    context,
                    ..DraftRequest::new(kind, count)
                })
                .await?;
            print_json(&drafts)
        }
        DraftsCommand::List { status } => {
            let status: DraftStatus = status.parse()?;
            print_json(&pipeline.list_drafts(status).await?)
        }
        DraftsCommand::Approve { id } => print_json(&pipeline.approve_draft(parse_id(&id)?).await?),
        DraftsCommand::Edit { id, text } => {
            print_json(&pipeline.edit_draft(parse_id(&id)?, &text).await?)
        }
        DraftsCommand::Post { id } => print_json(&pipeline.post_draft(parse_id(&id)?).await?),
        DraftsCommand::Delete { id } => print_json(&pipeline.delete_draft(parse_id(&id)?).await?),
    }
}

async fn run_waking(pipeline: &Pipeline, command: WakingCommand) -> Result<()> {
    match command {
        WakingCommand::Draft => print_json(&pipeline.waking_draft().await?),
        WakingCommand::Post { first, second } => {
            print_json(&pipeline.post_waking(&first, second.as_deref()).await?)
        }
        WakingCommand::List { limit } => print_json(&pipeline.list_waking(limit).await?),
    }
}

// ---------------------------------------------------------------------------
// Advisory pidfile for observability
// ---------------------------------------------------------------------------

/// Check for an existing pidfile and log accordingly, then write our own.
fn acquire_pidfile(path: &Path) -> Option<PathBuf> {
    if let Ok(content) = std::fs::read_to_string(path)
        && let Ok(pid) = content.trim().parse::<u32>()
    {
        if is_process_alive(pid) {
            tracing::warn!("another blank serve (PID {pid}) is running, sharing the store via busy_timeout");
        } else {
            tracing::info!("cleaned up stale pidfile (PID {pid} is dead)");
            let _ = std::fs::remove_file(path);
        }
    }

    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match std::fs::File::create(path) {
        Ok(mut f) => {
            let _ = write!(f, "{}", std::process::id());
            tracing::info!("wrote pidfile: {}", path.display());
            Some(path.to_path_buf())
        }
        Err(e) => {
            tracing::warn!("failed to write pidfile: {e}");
            None
        }
    }
}

fn release_pidfile(path: &Path) {
    let _ = std::fs::remove_file(path);
    tracing::info!("removed pidfile: {}", path.display());
}

#[cfg(unix)]
fn is_process_alive(pid: u32) -> bool {
    // kill(pid, 0) probes without signalling
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    false
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

async fn cmd_serve(config: &Config) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    tracing::info!(cycle = pipeline.current_cycle(), "starting MCP server");

    let pidfile = acquire_pidfile(&config.pidfile_path());

    let server = server::BlankServer::new(pipeline);
    let outcome = match server.clone().serve(stdio()).await {
        Ok(service) => {
            tokio::select! {
                quit = service.waiting() => quit.map(|_| ()).context("MCP server task failed"),
                _ = shutdown_signal() => {
                    tracing::info!("signal received, shutting down");
                    Ok(())
                }
            }
        }
        // Client went away before the handshake finished.
        Err(e) => {
            tracing::info!("MCP session ended before initialization: {e}");
            Ok(())
        }
    };

    server.shutdown().await;
    if let Some(path) = pidfile {
        release_pidfile(&path);
    }
    outcome
}

async fn cmd_http(config: &Config, addr: Option<&str>) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let addr = addr.unwrap_or(&config.http.addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.cancel();
    });

    http::serve(listener, pipeline.clone(), token)
        .await
        .context("HTTP server failed")?;
    pipeline.shutdown().await;
    Ok(())
}
