//! Interactive session: one library, one query history and one upload area
//! shared across the four sections.

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use super::presentation::{
    render_answer, render_detailed_health, render_history, render_library, render_navigation,
    render_query_stats, render_section_header, render_upload, Label, Section, Tone,
};
use crate::application::dtos::UploadFile;
use crate::application::services::{
    PollHandle, UploadObserver, UploadOrchestrator, UploadPhase, UploadReceipt, UploadSnapshot,
};
use crate::domain::DomainError;
use crate::Workspace;

const HELP: &str = "\
Sections: upload | documents | query | system   (switch with `go <section>`)
  refresh                 reload the document list
  toggle <n|id>           select or deselect a completed document
  all                     select all completed documents (again to clear)
  none                    clear the selection
  delete <n|id>           delete a document (asks for confirmation)
  upload <path>           upload a PDF, DOCX or TXT file
  retry                   clear an upload error
  ask <question>          ask about the selected documents (all when none)
  history                 show the last three answers
  health | stats          backend status and query statistics
  help | quit";

/// Messages from background tasks to the session loop.
enum ShellEvent {
    Upload(UploadSnapshot),
    Completed(String),
    Failed(String),
    Accepted(UploadReceipt),
}

/// Forwards phase changes only; progress ticks are shown on demand.
struct ChannelObserver {
    events: mpsc::UnboundedSender<ShellEvent>,
    last_phase: Mutex<UploadPhase>,
}

impl UploadObserver for ChannelObserver {
    fn on_change(&self, snapshot: &UploadSnapshot) {
        let mut last = self.last_phase.lock();
        if *last != snapshot.phase {
            *last = snapshot.phase;
            let _ = self.events.send(ShellEvent::Upload(snapshot.clone()));
        }
    }

    fn on_complete(&self, document_id: &str) {
        let _ = self.events.send(ShellEvent::Completed(document_id.to_string()));
    }

    fn on_error(&self, _error: &DomainError, message: &str) {
        let _ = self.events.send(ShellEvent::Failed(message.to_string()));
    }
}

enum Flow {
    Continue,
    Quit,
}

struct Session {
    workspace: Workspace,
    uploads: Arc<UploadOrchestrator>,
    events: mpsc::UnboundedSender<ShellEvent>,
    section: Section,
    tracking: Vec<PollHandle>,
    pending_delete: Option<String>,
}

pub async fn run(workspace: Workspace) -> Result<()> {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let observer = Arc::new(ChannelObserver {
        events: events_tx.clone(),
        last_phase: Mutex::new(UploadPhase::Idle),
    });
    let uploads = Arc::new(workspace.upload_orchestrator(observer));

    let mut session = Session {
        workspace,
        uploads,
        events: events_tx,
        section: Section::Upload,
        tracking: Vec::new(),
        pending_delete: None,
    };

    println!("{}", style("DocuMind").bold());
    println!("{}", style("Type `help` for commands.").dim());
    if let Err(err) = session.workspace.library.refresh().await {
        debug!(target: "documind::shell", "initial load failed: {err}");
    }
    session.show_section();
    prompt(&session);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read input")? else {
                    break;
                };
                if let Flow::Quit = session.handle(line.trim()).await {
                    break;
                }
                prompt(&session);
            }
            Some(event) = events_rx.recv() => {
                session.on_event(event);
            }
        }
    }

    // Dropping the session drops every poll handle it still holds.
    let tracked = session.tracking.iter().filter(|handle| !handle.is_finished()).count();
    if tracked > 0 {
        println!("Stopped tracking {tracked} upload(s).");
    }
    Ok(())
}

fn prompt(session: &Session) {
    let name = match session.section {
        Section::Upload => "upload",
        Section::Documents => "documents",
        Section::Query => "query",
        Section::System => "system",
    };
    if session.pending_delete.is_some() {
        print!("confirm [y/N]> ");
    } else {
        print!("{}> ", style(name).cyan());
    }
    let _ = std::io::stdout().flush();
}

impl Session {
    async fn handle(&mut self, line: &str) -> Flow {
        if let Some(document_id) = self.pending_delete.take() {
            if matches!(line.to_ascii_lowercase().as_str(), "y" | "yes") {
                self.delete(&document_id).await;
            } else {
                println!("Cancelled.");
            }
            return Flow::Continue;
        }

        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "" => {}
            "help" | "?" => println!("{HELP}"),
            "quit" | "exit" | "q" => return Flow::Quit,
            "go" => match Section::parse(rest) {
                Some(section) => {
                    self.section = section;
                    self.show_section();
                }
                None => println!("Unknown section '{rest}'."),
            },
            "upload" | "put" if !rest.is_empty() => self.upload(rest).await,
            "upload" | "documents" | "query" | "system" => {
                if let Some(section) = Section::parse(command) {
                    self.section = section;
                    self.show_section();
                }
            }
            "refresh" | "ls" => {
                let _ = self.workspace.library.refresh().await;
                println!("{}", render_library(&self.workspace.library.view()));
            }
            "toggle" => self.toggle(rest),
            "all" => {
                let selected = self.workspace.library.select_all();
                println!("{} selected.", selected.len());
            }
            "none" => {
                self.workspace.library.clear_selection();
                println!("Selection cleared; queries search all documents.");
            }
            "delete" | "rm" => match self.resolve(rest) {
                Some(document_id) => self.pending_delete = Some(document_id),
                None => println!("No document '{rest}'."),
            },
            "retry" => {
                if self.uploads.retry() {
                    println!("{}", render_upload(&self.uploads.snapshot()));
                }
            }
            "ask" => self.ask(rest).await,
            "history" => println!("{}", render_history(&self.workspace.queries.recent())),
            "health" => self.health().await,
            "stats" => match self.workspace.queries.stats().await {
                Ok(stats) => println!("{}", render_query_stats(&stats)),
                Err(err) => println!("{}", Label::new(err.to_string(), Tone::Error)),
            },
            _ => println!("Unknown command '{command}'. Type `help`."),
        }
        Flow::Continue
    }

    fn show_section(&self) {
        println!("\n{}", render_navigation(self.section));
        println!("{}\n", render_section_header(self.section));
        match self.section {
            Section::Upload => {
                println!("{}", render_upload(&self.uploads.snapshot()));
                println!("{}", style("Use `upload <path>` to upload.").dim());
            }
            Section::Documents => println!("{}", render_library(&self.workspace.library.view())),
            Section::Query => {
                let selected = self.workspace.library.selection().len();
                if selected == 0 {
                    println!("Searching all documents.");
                } else {
                    println!("Searching {selected} selected document(s).");
                }
                println!("{}", render_history(&self.workspace.queries.recent()));
            }
            Section::System => println!("{}", style("Use `health` to query the backend.").dim()),
        }
    }

    /// A 1-based position in the current list, or a document id.
    fn resolve(&self, token: &str) -> Option<String> {
        let view = self.workspace.library.view();
        if let Ok(position) = token.parse::<usize>() {
            return position
                .checked_sub(1)
                .and_then(|idx| view.documents.get(idx))
                .map(|doc| doc.document_id.clone());
        }
        view.documents
            .iter()
            .find(|doc| doc.document_id == token)
            .map(|doc| doc.document_id.clone())
    }

    fn toggle(&self, token: &str) {
        let Some(document_id) = self.resolve(token) else {
            println!("No document '{token}'.");
            return;
        };
        match self.workspace.library.toggle(&document_id) {
            Ok(true) => println!("Selected {document_id}."),
            Ok(false) => println!("Deselected {document_id}."),
            Err(err) => println!("{}", Label::new(err.to_string(), Tone::Warning)),
        }
    }

    async fn delete(&self, document_id: &str) {
        match self.workspace.library.delete(document_id).await {
            Ok(()) => println!("{}", Label::new(format!("Deleted {document_id}"), Tone::Success)),
            Err(_) => println!("{}", render_library(&self.workspace.library.view())),
        }
    }

    async fn upload(&self, raw_path: &str) {
        if raw_path.is_empty() {
            println!("Usage: upload <path>");
            return;
        }
        let file = match UploadFile::from_path(PathBuf::from(raw_path)).await {
            Ok(file) => file,
            Err(err) => {
                println!("{}", Label::new(err.to_string(), Tone::Error));
                return;
            }
        };

        let uploads = Arc::clone(&self.uploads);
        let events = self.events.clone();
        tokio::spawn(async move {
            // Rejections reach the session through the observer.
            if let Ok(receipt) = uploads.submit(file).await {
                let _ = events.send(ShellEvent::Accepted(receipt));
            }
        });
    }

    async fn ask(&self, question: &str) {
        let selection = self.workspace.library.selection();
        match self.workspace.queries.ask(question, &selection).await {
            Ok(response) => println!("{}", render_answer(&response)),
            Err(DomainError::Validation(message)) => println!("{message}"),
            Err(_) => {
                if let Some(banner) = self.workspace.queries.last_error() {
                    println!("{}", Label::new(banner, Tone::Error));
                }
            }
        }
    }

    async fn health(&self) {
        match self.workspace.backend.detailed_health().await {
            Ok(health) => println!("{}", render_detailed_health(&health)),
            Err(err) => println!(
                "{}",
                Label::new(format!("Unable to load system status: {err}"), Tone::Error)
            ),
        }
    }

    fn on_event(&mut self, event: ShellEvent) {
        match event {
            ShellEvent::Upload(snapshot) => println!("\n{}", render_upload(&snapshot)),
            ShellEvent::Completed(document_id) => println!(
                "\n{} {}",
                Label::new("Document uploaded successfully!", Tone::Success),
                style(document_id).dim()
            ),
            ShellEvent::Failed(message) => println!("\n{}", Label::new(message, Tone::Error)),
            ShellEvent::Accepted(receipt) => {
                self.tracking.retain(|handle| !handle.is_finished());
                self.tracking.push(receipt.poll);
                return;
            }
        }
        prompt(self);
    }
}
