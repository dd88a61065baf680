//! One-shot commands for the `documind` binary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use tracing::debug;

use super::presentation::{
    format_file_size, render_answer, render_detailed_health, render_document_card,
    render_health, render_library, render_query_stats, upload_status_text, Label, Tone,
};
use super::shell;
use crate::application::dtos::UploadFile;
use crate::application::services::{
    PollOutcome, UploadObserver, UploadPhase, UploadSnapshot, PROCESSING_FAILED_MESSAGE,
    PROCESSING_TIMEOUT_MESSAGE, UPLOAD_FAILED_MESSAGE,
};
use crate::domain::DomainError;
use crate::settings::ConfigManager;
use crate::{build_environment, resolve_data_dir, Overrides, Workspace};

#[derive(Debug, Parser)]
#[command(
    name = "documind",
    version,
    about = "Upload documents and ask questions against a DocuMind backend"
)]
pub struct Cli {
    /// Backend base URL (overrides the stored configuration)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check that the backend is reachable
    Health {
        /// Include document, chunk and vector counts
        #[arg(long)]
        detailed: bool,
    },
    /// Show backend query statistics
    Stats,
    /// List uploaded documents
    List,
    /// Show one document
    Show { document_id: String },
    /// Delete a document
    Delete {
        document_id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Upload a PDF, DOCX or TXT file and wait for processing
    Upload {
        path: PathBuf,
        /// Return once the backend accepted the file
        #[arg(long)]
        no_wait: bool,
    },
    /// Ask a question, optionally scoped to specific documents
    Ask {
        question: String,
        /// Restrict the search to this document (repeatable)
        #[arg(long = "doc", value_name = "DOCUMENT_ID")]
        documents: Vec<String>,
    },
    /// Inspect or change the stored configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
    /// Interactive session with upload, documents, query and system sections
    Shell,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Persist a new backend base URL
    SetUrl { url: String },
    /// Persist the bearer API key; omit KEY to clear it
    SetKey { key: Option<String> },
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            base_url: self.base_url.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    if let Command::Config { action } = &cli.command {
        return run_config(action, &cli.overrides());
    }

    let handles = build_environment(&cli.overrides())?;
    let workspace = handles.workspace;
    debug!(target: "documind::cli", command = ?cli.command, "dispatching");

    match cli.command {
        Command::Health { detailed } => health(&workspace, detailed).await,
        Command::Stats => {
            let stats = workspace.queries.stats().await.context("failed to load query stats")?;
            println!("{}", render_query_stats(&stats));
            Ok(())
        }
        Command::List => list(&workspace).await,
        Command::Show { document_id } => show(&workspace, &document_id).await,
        Command::Delete { document_id, yes } => delete(&workspace, &document_id, yes).await,
        Command::Upload { path, no_wait } => upload(&workspace, path, no_wait).await,
        Command::Ask {
            question,
            documents,
        } => ask(&workspace, &question, &documents).await,
        Command::Shell => shell::run(workspace).await,
        Command::Config { .. } => Ok(()),
    }
}

fn run_config(action: &ConfigCommand, overrides: &Overrides) -> Result<()> {
    let data_dir = resolve_data_dir()?;
    let config = ConfigManager::load(&data_dir).context("failed to load config file")?;

    match action {
        ConfigCommand::Show => {
            let mut effective = config.effective();
            if let Some(url) = &overrides.base_url {
                effective.base_url = url.clone();
            }
            if let Some(secs) = overrides.timeout_secs {
                effective.timeout_secs = secs;
            }
            if effective.api_key.is_some() {
                effective.api_key = Some("********".into());
            }
            println!("{}", style(config.path().display()).dim());
            println!("{}", serde_json::to_string_pretty(&effective)?);
        }
        ConfigCommand::SetUrl { url } => {
            let updated = config.set_base_url(url)?;
            println!("Base URL set to {}", style(updated.base_url).bold());
        }
        ConfigCommand::SetKey { key } => {
            let updated = config.set_api_key(key.clone())?;
            if updated.api_key.is_some() {
                println!("API key saved to {}", style(config.path().display()).dim());
            } else {
                println!("API key cleared.");
            }
        }
    }
    Ok(())
}

async fn health(workspace: &Workspace, detailed: bool) -> Result<()> {
    if detailed {
        let health = workspace.backend.detailed_health().await?;
        println!("{}", render_detailed_health(&health));
    } else {
        let health = workspace.backend.health().await?;
        println!("{}", render_health(&health));
    }
    Ok(())
}

async fn list(workspace: &Workspace) -> Result<()> {
    let loaded = workspace.library.refresh().await;
    println!("{}", render_library(&workspace.library.view()));
    loaded.map(|_| ()).map_err(|err| anyhow!(err))
}

async fn show(workspace: &Workspace, document_id: &str) -> Result<()> {
    let document = workspace.backend.get_document(document_id).await?;
    println!("{}", render_document_card(1, &document, None));

    for chunk in document.chunks.iter().take(3) {
        let preview: String = chunk.text.chars().take(160).collect();
        println!(
            "\n  {} {}\n  {}",
            style("Chunk").dim(),
            chunk.chunk_id,
            preview.trim()
        );
    }
    if document.chunks.len() > 3 {
        println!("\n  … {} more chunks", document.chunks.len() - 3);
    }
    Ok(())
}

async fn delete(workspace: &Workspace, document_id: &str, yes: bool) -> Result<()> {
    if !yes && !confirm(format!("Delete document {document_id}?")).await? {
        println!("Cancelled.");
        return Ok(());
    }

    workspace.library.delete(document_id).await?;
    println!("{}", Label::new(format!("Deleted {document_id}"), Tone::Success));
    Ok(())
}

async fn confirm(prompt: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || -> Result<bool> {
        let term = Term::stderr();
        term.write_str(&format!("{prompt} [y/N] "))?;
        let answer = term.read_line()?;
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    })
    .await
    .context("confirmation prompt failed")?
}

async fn ask(workspace: &Workspace, question: &str, documents: &[String]) -> Result<()> {
    match workspace.queries.ask(question, documents).await {
        Ok(response) => {
            println!("{}", render_answer(&response));
            Ok(())
        }
        Err(err @ DomainError::Validation(_)) => Err(err.into()),
        Err(err) => {
            let banner = workspace
                .queries
                .last_error()
                .unwrap_or_else(|| err.to_string());
            bail!(banner)
        }
    }
}

/// Feeds orchestrator snapshots into a progress bar.
struct ProgressObserver {
    bar: ProgressBar,
    phase: Mutex<UploadPhase>,
    error: Mutex<Option<String>>,
}

impl ProgressObserver {
    fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{bar:32.cyan/blue}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self {
            bar,
            phase: Mutex::new(UploadPhase::Idle),
            error: Mutex::new(None),
        }
    }
}

impl UploadObserver for ProgressObserver {
    fn on_change(&self, snapshot: &UploadSnapshot) {
        self.bar.set_position(u64::from(snapshot.progress.percent()));

        let mut phase = self.phase.lock();
        if *phase != snapshot.phase {
            *phase = snapshot.phase;
            self.bar.set_message(upload_status_text(snapshot.phase));
            if snapshot.phase == UploadPhase::Processing {
                self.bar.enable_steady_tick(Duration::from_millis(120));
            }
        }
    }

    fn on_complete(&self, _document_id: &str) {
        self.bar.finish_with_message(upload_status_text(UploadPhase::Completed));
    }

    fn on_error(&self, _error: &DomainError, message: &str) {
        *self.error.lock() = Some(message.to_string());
        self.bar.abandon_with_message(upload_status_text(UploadPhase::Error));
    }
}

async fn upload(workspace: &Workspace, path: PathBuf, no_wait: bool) -> Result<()> {
    let file = UploadFile::from_path(&path).await?;
    println!(
        "{} ({}, {})",
        style(&file.filename).bold(),
        file.media_type,
        format_file_size(file.size)
    );

    let observer = Arc::new(ProgressObserver::new());
    let orchestrator = workspace.upload_orchestrator(observer.clone());

    let receipt = match orchestrator.submit(file).await {
        Ok(receipt) => receipt,
        Err(err) => {
            let message = observer
                .error
                .lock()
                .clone()
                .unwrap_or_else(|| err.banner(UPLOAD_FAILED_MESSAGE));
            bail!(message);
        }
    };

    if no_wait {
        observer.bar.finish_and_clear();
        println!(
            "Accepted as {}; processing continues on the server.",
            style(&receipt.document_id).bold()
        );
        return Ok(());
    }

    let document_id = receipt.document_id.clone();
    let outcome = tokio::select! {
        outcome = receipt.poll.outcome() => outcome,
        _ = tokio::signal::ctrl_c() => PollOutcome::Cancelled,
    };

    match outcome {
        PollOutcome::Completed => {
            println!("Ready for querying: {}", style(document_id).bold());
            Ok(())
        }
        PollOutcome::Failed => bail!(PROCESSING_FAILED_MESSAGE),
        PollOutcome::TimedOut { .. } => bail!(PROCESSING_TIMEOUT_MESSAGE),
        PollOutcome::Cancelled => {
            observer.bar.abandon_with_message("Stopped waiting");
            println!(
                "Stopped tracking {}; check later with `documind show {}`.",
                document_id, document_id
            );
            Ok(())
        }
    }
}
