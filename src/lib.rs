use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod settings;

use application::services::{
    DocumentBackend, DocumentLibrary, QueryService, StatusPoller, UploadObserver,
    UploadOrchestrator, UploadSnapshot,
};
use domain::DomainError;
use infrastructure::ApiClient;
use settings::{AppConfig, ConfigManager};

/// Environment variable holding the tracing filter directive.
pub const ENV_LOG: &str = "DOCUMIND_LOG";
/// Environment variable overriding the data directory.
pub const ENV_DATA_DIR: &str = "DOCUMIND_DATA_DIR";

/// Services shared by every surface for one backend.
pub struct Workspace {
    pub backend: Arc<dyn DocumentBackend>,
    pub library: Arc<DocumentLibrary>,
    pub queries: Arc<QueryService>,
    pub poller: StatusPoller,
    pub settings: AppConfig,
}

impl Workspace {
    pub fn new(backend: Arc<dyn DocumentBackend>, settings: AppConfig) -> Self {
        Self {
            library: Arc::new(DocumentLibrary::new(Arc::clone(&backend))),
            queries: Arc::new(QueryService::new(Arc::clone(&backend)).with_top_k(settings.top_k)),
            poller: StatusPoller::new(Arc::clone(&backend), settings.poll_config()),
            backend,
            settings,
        }
    }

    /// Orchestrator whose completions also reload the document library.
    pub fn upload_orchestrator(&self, observer: Arc<dyn UploadObserver>) -> UploadOrchestrator {
        let observer = Arc::new(RefreshOnComplete {
            library: Arc::clone(&self.library),
            inner: observer,
        });
        UploadOrchestrator::new(Arc::clone(&self.backend), self.poller.clone(), observer)
            .with_display_delay(self.settings.completion_display())
    }
}

/// Reloads the document list once per completed upload, then forwards.
struct RefreshOnComplete {
    library: Arc<DocumentLibrary>,
    inner: Arc<dyn UploadObserver>,
}

impl UploadObserver for RefreshOnComplete {
    fn on_change(&self, snapshot: &UploadSnapshot) {
        self.inner.on_change(snapshot);
    }

    fn on_complete(&self, document_id: &str) {
        self.inner.on_complete(document_id);

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(target: "documind::library", "no runtime to refresh the document list on");
            return;
        };
        let library = Arc::clone(&self.library);
        let document_id = document_id.to_string();
        runtime.spawn(async move {
            debug!(
                target: "documind::library",
                document_id = %document_id,
                "refreshing after upload"
            );
            // The library records its own error banner.
            let _ = library.refresh().await;
        });
    }

    fn on_error(&self, error: &DomainError, message: &str) {
        self.inner.on_error(error, message);
    }
}

/// Command-line overrides applied on top of the stored configuration.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

pub struct AppHandles {
    pub workspace: Workspace,
    pub config: Arc<ConfigManager>,
    pub data_dir: PathBuf,
}

/// Load configuration and wire the HTTP client into a [`Workspace`].
pub fn build_environment(overrides: &Overrides) -> Result<AppHandles> {
    let data_dir = resolve_data_dir()?;
    let config = Arc::new(ConfigManager::load(&data_dir).context("failed to load config file")?);

    let mut settings = config.effective();
    if let Some(base_url) = &overrides.base_url {
        settings.base_url = base_url.clone();
    }
    if let Some(secs) = overrides.timeout_secs {
        settings.timeout_secs = secs;
    }

    debug!(
        target: "documind::config",
        base_url = %settings.base_url,
        timeout_secs = settings.timeout_secs,
        data_dir = %data_dir.display(),
        "configuration resolved"
    );

    let client =
        ApiClient::new(&settings.client_config()).context("failed to create API client")?;
    let backend: Arc<dyn DocumentBackend> = Arc::new(client);

    Ok(AppHandles {
        workspace: Workspace::new(backend, settings),
        config,
        data_dir,
    })
}

pub fn resolve_data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os(ENV_DATA_DIR) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => directories::ProjectDirs::from("dev", "documind", "DocuMind")
            .ok_or_else(|| anyhow!("unable to determine OS data dir"))?
            .data_dir()
            .to_path_buf(),
    };
    std::fs::create_dir_all(&dir).context("failed to create data directory")?;
    Ok(dir)
}

/// Install the stderr subscriber once; `default_filter` applies when
/// `DOCUMIND_LOG` is unset.
pub fn init_tracing(default_filter: &str) {
    init_tracing_with_writer(default_filter, std::io::stderr);
}

fn init_tracing_with_writer<W>(default_filter: &str, make_writer: fn() -> W)
where
    W: std::io::Write + Send + Sync + 'static,
{
    static INIT: std::sync::OnceLock<()> = std::sync::OnceLock::new();

    let _ = INIT.get_or_init(|| {
        let filter = std::env::var(ENV_LOG).unwrap_or_else(|_| default_filter.into());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(make_writer)
            .compact()
            .try_init();
    });
}
