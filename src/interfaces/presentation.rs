//! Terminal renderers. Everything here is pure: data in, text out.

use std::fmt::{self, Display, Write as _};

use console::{style, Style};

use crate::application::dtos::{
    DetailedHealthResponse, HealthCheckResponse, QueryResponse, QueryStats,
};
use crate::application::services::{LibraryView, QueryExchange, UploadPhase, UploadSnapshot};
use crate::domain::models::parse_timestamp;
use crate::domain::{DocumentMetadata, DocumentStatus, SourceInfo};

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Colour family of a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Warning,
    Error,
    Info,
    Neutral,
}

impl Tone {
    fn style(self) -> Style {
        match self {
            Tone::Success => Style::new().green(),
            Tone::Warning => Style::new().yellow(),
            Tone::Error => Style::new().red(),
            Tone::Info => Style::new().blue(),
            Tone::Neutral => Style::new().dim(),
        }
    }
}

/// Text plus the tone it is painted with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub text: String,
    pub tone: Tone,
}

impl Label {
    pub fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tone.style().apply_to(&self.text))
    }
}

/// Base-1024 size with at most two decimals, trailing zeros trimmed.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut exponent = 0;
    let mut scale = 1u64;
    while exponent + 1 < SIZE_UNITS.len() && bytes >= scale * 1024 {
        scale *= 1024;
        exponent += 1;
    }
    let value = bytes as f64 / scale as f64;
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');

    format!("{trimmed} {}", SIZE_UNITS[exponent])
}

/// "Mar 5, 2024, 02:07 PM". Unparseable input is returned as is.
pub fn format_date(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(at) => at.format("%b %-d, %Y, %I:%M %p").to_string(),
        None => raw.to_string(),
    }
}

pub fn format_uptime(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}h {}m", total / 3600, (total % 3600) / 60)
}

/// Integer with `,` thousands separators.
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

pub fn confidence_tone(confidence: f64) -> Tone {
    if confidence >= 0.8 {
        Tone::Success
    } else if confidence >= 0.6 {
        Tone::Warning
    } else {
        Tone::Error
    }
}

pub fn format_confidence(confidence: f64) -> Label {
    Label::new(percent(confidence), confidence_tone(confidence))
}

pub fn format_similarity(similarity: f64) -> String {
    percent(similarity)
}

pub fn status_badge(status: DocumentStatus) -> Label {
    match status {
        DocumentStatus::Uploading => Label::new("Uploading", Tone::Info),
        DocumentStatus::Processing => Label::new("Processing", Tone::Warning),
        DocumentStatus::Completed => Label::new("Completed", Tone::Success),
        DocumentStatus::Failed => Label::new("Failed", Tone::Error),
    }
}

/// Last path segment of a model identifier.
pub fn short_model_name(model: &str) -> &str {
    model
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("Unknown")
}

/// Top-level navigation areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Upload,
    Documents,
    Query,
    System,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::Upload,
        Section::Documents,
        Section::Query,
        Section::System,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Section::Upload => "Upload Documents",
            Section::Documents => "Document Library",
            Section::Query => "Query Interface",
            Section::System => "System Status",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Section::Upload => "Welcome to DocuMind",
            Section::Documents => "Documents",
            Section::Query => "Query Your Documents",
            Section::System => "System Status",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Section::Upload => {
                "Upload your documents and start asking intelligent questions."
            }
            Section::Documents => "Browse, select and delete uploaded documents.",
            Section::Query => {
                "Ask questions about your uploaded documents and get intelligent answers with source references."
            }
            Section::System => "Monitor the health and performance of your DocuMind system.",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "upload" | "u" => Some(Section::Upload),
            "documents" | "docs" | "d" => Some(Section::Documents),
            "query" | "q" => Some(Section::Query),
            "system" | "s" => Some(Section::System),
            _ => None,
        }
    }
}

pub fn render_navigation(active: Section) -> String {
    Section::ALL
        .iter()
        .map(|section| {
            if *section == active {
                style(format!("[{}]", section.label())).bold().to_string()
            } else {
                style(section.label()).dim().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}

pub fn render_section_header(section: Section) -> String {
    format!(
        "{}\n{}",
        style(section.title()).bold(),
        style(section.description()).dim()
    )
}

/// One document card. `selected` is `None` when the document cannot be
/// selected (anything but completed).
pub fn render_document_card(
    position: usize,
    document: &DocumentMetadata,
    selected: Option<bool>,
) -> String {
    let checkbox = match selected {
        Some(true) => "[x]",
        Some(false) => "[ ]",
        None => "   ",
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{checkbox} {position:>2}. {}  {}",
        style(&document.filename).bold(),
        status_badge(document.status)
    );
    let _ = writeln!(
        out,
        "         {} • {}",
        format_file_size(document.file_size),
        document.file_type.to_uppercase()
    );
    let _ = writeln!(
        out,
        "         {} chunks • {} tokens",
        document.total_chunks,
        format_count(document.total_tokens)
    );
    let _ = write!(
        out,
        "         {}  {}",
        format_date(&document.upload_time),
        style(&document.document_id).dim()
    );
    out
}

pub fn library_summary(view: &LibraryView) -> String {
    let count = view.documents.len();
    format!(
        "{count} document{} • {} ready for querying",
        if count == 1 { "" } else { "s" },
        view.completed_count()
    )
}

pub fn select_all_label(view: &LibraryView) -> &'static str {
    if view.all_completed_selected() {
        "Deselect All"
    } else {
        "Select All"
    }
}

pub fn render_library(view: &LibraryView) -> String {
    let mut out = String::new();

    if let Some(error) = &view.error {
        let _ = writeln!(out, "{}", Label::new(error, Tone::Error));
    }

    if view.documents.is_empty() {
        if view.loaded {
            let _ = writeln!(out, "{}", style("No documents uploaded").bold());
            let _ = write!(out, "{}", style("Upload a document to get started.").dim());
        }
        return out;
    }

    let _ = writeln!(out, "{}", style(library_summary(view)).dim());
    if view.completed_count() > 0 {
        let _ = writeln!(out, "{}", style(format!("({})", select_all_label(view))).dim());
    }

    for (idx, document) in view.documents.iter().enumerate() {
        let selected = document
            .is_completed()
            .then(|| view.is_selected(&document.document_id));
        let _ = write!(out, "\n{}\n", render_document_card(idx + 1, document, selected));
    }
    out
}

pub fn render_source(position: usize, source: &SourceInfo) -> String {
    format!(
        "  {position}. {}  {}\n     Chunk {}\n     \"{}\"\n     {}",
        style(&source.filename).bold(),
        style(format!("Similarity: {}", format_similarity(source.similarity_score))).cyan(),
        source.chunk_id,
        source.text.trim(),
        style(format!("Position: {} - {}", source.start_index, source.end_index)).dim()
    )
}

pub fn render_answer(response: &QueryResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", style("Answer").bold());
    let _ = writeln!(out, "{}", response.answer.trim());
    let _ = write!(
        out,
        "\nConfidence: {}  •  {:.2}s  •  {} sources",
        format_confidence(response.confidence),
        response.processing_time,
        response.total_sources_found
    );

    if !response.sources.is_empty() {
        let _ = write!(out, "\n\n{}", style("Sources").bold());
        for (idx, source) in response.sources.iter().enumerate() {
            let _ = write!(out, "\n{}", render_source(idx + 1, source));
        }
    }
    out
}

pub fn render_history(recent: &[QueryExchange]) -> String {
    if recent.is_empty() {
        return style("No queries yet.").dim().to_string();
    }

    let mut out = format!("{}", style("Recent Queries").bold());
    for exchange in recent {
        let _ = write!(
            out,
            "\n- {}\n  {} • {:.2}s • {} sources",
            exchange.question,
            format_confidence(exchange.response.confidence),
            exchange.response.processing_time,
            exchange.response.total_sources_found
        );
    }
    out
}

pub fn upload_status_text(phase: UploadPhase) -> &'static str {
    match phase {
        UploadPhase::Idle => "Choose a PDF, DOCX, or TXT file to upload",
        UploadPhase::Uploading => "Uploading document...",
        UploadPhase::Processing => "Processing document...",
        UploadPhase::Completed => "Document uploaded successfully!",
        UploadPhase::Error => "Upload failed",
    }
}

pub fn render_upload(snapshot: &UploadSnapshot) -> String {
    let status = upload_status_text(snapshot.phase);
    match snapshot.phase {
        UploadPhase::Idle => format!("{status}\n{}", style("Maximum file size: 50MB").dim()),
        UploadPhase::Uploading | UploadPhase::Processing => format!(
            "{status}\n{}% complete",
            snapshot.progress.percent()
        ),
        UploadPhase::Completed => Label::new(status, Tone::Success).to_string(),
        UploadPhase::Error => {
            let mut out = Label::new(status, Tone::Error).to_string();
            if let Some(message) = &snapshot.error {
                let _ = write!(out, "\n{}", Label::new(message, Tone::Error));
            }
            out
        }
    }
}

pub fn render_health(health: &HealthCheckResponse) -> String {
    let tone = if health.status == "healthy" {
        Tone::Success
    } else {
        Tone::Error
    };
    format!(
        "{} {} v{}",
        Label::new(&health.status, tone),
        health.service,
        health.version
    )
}

pub fn render_detailed_health(health: &DetailedHealthResponse) -> String {
    let stats = &health.system_stats;
    let rows = [
        ("Status", Label::new("Healthy", Tone::Success).to_string()),
        ("Documents", format_count(stats.total_documents)),
        ("Chunks", format_count(stats.total_chunks)),
        ("Vectors", format_count(stats.total_vectors)),
        ("Uptime", format_uptime(stats.uptime)),
        ("Model", short_model_name(&stats.embedding_model).to_string()),
        ("Dimension", stats.vector_dimension.to_string()),
        ("Index", stats.index_type.clone()),
    ];

    let mut out = format!("{} v{}", style(&health.service).bold(), health.version);
    for (name, value) in rows {
        let _ = write!(out, "\n  {:<10} {value}", style(name).dim());
    }
    out
}

pub fn render_query_stats(stats: &QueryStats) -> String {
    let mut out = format!(
        "Total queries: {}\nAverage processing time: {:.2}s\nDocuments queried: {}",
        format_count(stats.total_queries),
        stats.average_processing_time,
        format_count(stats.total_documents_queried)
    );
    if !stats.most_common_questions.is_empty() {
        out.push_str("\nMost common questions:");
        for question in &stats.most_common_questions {
            let _ = write!(out, "\n  - {question}");
        }
    }
    out
}
