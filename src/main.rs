use clap::Parser;

use documind_lib::init_tracing;
use documind_lib::interfaces::cli::{self, Cli};

/// Terminal client for a DocuMind backend.
///
/// # Environment Variables
///
/// - `DOCUMIND_LOG`: tracing filter (default `warn`)
/// - `DOCUMIND_DATA_DIR`: override the configuration directory
/// - `DOCUMIND_BASE_URL`, `DOCUMIND_TIMEOUT_SECS`, `DOCUMIND_API_KEY`:
///   override the stored connection settings
#[tokio::main]
async fn main() {
    let args = Cli::parse();
    init_tracing("warn");

    if let Err(err) = cli::run(args).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
