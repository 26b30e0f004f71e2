use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Parser, Subcommand};
use jetstream::{
    AppContext,
    config::JetStreamConfig,
    dashboard::{self, RECENT_ACTIVITY_LIMIT},
    observability::logging::{LoggingConfig, init_logging},
    workflow::{Schedule, WorkflowDraft, WorkflowId, WorkflowKind},
};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "jetstream")]
#[command(about = "JetStream - Office Workflow Automation Suite")]
#[command(long_about = r#"
JetStream - define, trigger and monitor office automation workflows

Examples:
  # Create a workflow
  jetstream --store jetstream.json create --name "Daily Report" --type word-to-pdf --schedule daily

  # Run it and wait for the outcome
  jetstream --store jetstream.json run 1700000000000

  # Overview
  jetstream --store jetstream.json dashboard
"#)]
struct Cli {
    /// JSON file holding workflows and logs; omit to keep state in memory
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[arg(long, global = true, default_value_t = jetstream::DEFAULT_LOG_CAPACITY)]
    log_capacity: usize,

    #[arg(
        long,
        global = true,
        default_value = "warn",
        value_parser = ["trace", "debug", "info", "warn", "error"]
    )]
    log_level: String,

    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[arg(long, global = true, default_value_t = false)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Statistics and recent activity
    Dashboard,
    /// List workflows, newest first
    List,
    /// Create a workflow
    Create {
        #[arg(long)]
        name: String,
        #[arg(long = "type", default_value = "word-to-pdf")]
        kind: WorkflowKind,
        #[arg(long, default_value = "manual")]
        schedule: Schedule,
        /// Create the workflow disabled
        #[arg(long, default_value_t = false)]
        disabled: bool,
    },
    /// Run a workflow and wait for its outcome
    Run { id: String },
    /// Enable or disable a workflow
    Toggle { id: String },
    /// Delete a workflow
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y', default_value_t = false)]
        yes: bool,
    },
    /// Show the activity log
    Logs {
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Delete every log entry
    ClearLogs {
        #[arg(long, short = 'y', default_value_t = false)]
        yes: bool,
    },
    /// Write the activity log to jetstream-logs-<date>.json
    ExportLogs {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Available workflow types
    Types,
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

async fn execute(ctx: &AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::Dashboard => {
            let recent = ctx.activity.recent(RECENT_ACTIVITY_LIMIT);
            println!("{}", dashboard::render_dashboard(&ctx.stats(), &recent));
        }
        Commands::List => {
            println!("{}", dashboard::render_workflows(&ctx.registry.snapshot()));
        }
        Commands::Create {
            name,
            kind,
            schedule,
            disabled,
        } => {
            let draft = WorkflowDraft::new(name, kind)
                .with_schedule(schedule)
                .with_enabled(!disabled);
            let workflow = ctx
                .registry
                .create(draft)
                .await
                .context("Failed to create workflow")?;
            println!("{}", dashboard::render_workflow(&workflow));
        }
        Commands::Run { id } => {
            let id = WorkflowId::new(id);
            let Some(handle) = ctx.runner.run(&id).await? else {
                bail!("Workflow {id} is disabled or already running");
            };
            println!("Started workflow {id}");
            match handle.wait().await {
                Some(workflow) => println!("{}", dashboard::render_workflow(&workflow)),
                None => println!("Workflow {id} was deleted before it finished"),
            }
        }
        Commands::Toggle { id } => {
            let workflow = ctx.registry.toggle_enabled(&WorkflowId::new(id)).await?;
            println!("{}", dashboard::render_workflow(&workflow));
        }
        Commands::Delete { id, yes } => {
            if !yes && !confirm("Are you sure you want to delete this workflow?")? {
                return Ok(());
            }
            let id = WorkflowId::new(id);
            if ctx.registry.delete(&id).await? {
                println!("Deleted workflow {id}");
            } else {
                println!("No workflow with id {id}");
            }
        }
        Commands::Logs { limit } => {
            let entries = match limit {
                Some(limit) => ctx.activity.recent(limit),
                None => ctx.activity.entries(),
            };
            println!("{}", dashboard::render_logs(&entries));
        }
        Commands::ClearLogs { yes } => {
            if !yes && !confirm("Clear all logs?")? {
                return Ok(());
            }
            let deleted = ctx.activity.clear().await?;
            println!("Cleared {deleted} log entries");
        }
        Commands::ExportLogs { dir } => {
            let export = ctx.activity.export(Local::now().date_naive())?;
            let path = dir.join(&export.file_name);
            tokio::fs::write(&path, export.contents)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Exported {} entries to {}", ctx.activity.len(), path.display());
        }
        Commands::Types => println!("{}", dashboard::render_catalog()),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_logging(LoggingConfig {
        level: cli
            .log_level
            .to_uppercase()
            .parse::<Level>()
            .unwrap_or(Level::WARN),
        json_format: cli.log_json,
        log_dir: cli.log_dir.clone(),
        ..Default::default()
    });

    let config = JetStreamConfig::builder()
        .maybe_store_path(cli.store.clone())
        .log_capacity(cli.log_capacity)
        .build()?;
    if config.store_path.is_none() {
        tracing::warn!("No --store given, state will not outlive this command");
    }

    let ctx = AppContext::builder(config).build().await?;
    let result = execute(&ctx, cli.command).await;

    if !ctx.shutdown().await {
        eprintln!("Some workflow runs did not finish before shutdown");
    }
    result
}
