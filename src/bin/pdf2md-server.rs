//! Server binary for pdf2md-service.
//!
//! A thin shim over the library crate that maps CLI flags and environment
//! variables to `ServiceConfig`, installs logging and runs the server.

use anyhow::{Context, Result};
use clap::Parser;
use pdf2md_service::pipeline::engine;
use pdf2md_service::{server, AppState, ServiceConfig, TesseractCli};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"ENDPOINTS:
  POST /convert   {"file": "gs://bucket/path/doc.pdf", "mode": "ocr" | "direct"}
                  → 200 {"markdown": "..."}   or   400 {"error": "..."}
  GET  /          → 200 {"status": "ok"}

EXAMPLES:
  # Listen on the Cloud Run port
  PORT=8080 pdf2md-server

  # Local development against a GCS emulator, German OCR
  pdf2md-server --storage-endpoint http://localhost:4443 --ocr-language deu

  curl -s localhost:8080/convert -H 'content-type: application/json' \
       -d '{"file": "gs://my-bucket/report.pdf", "mode": "direct"}'

CREDENTIALS:
  With a storage emulator (STORAGE_EMULATOR_HOST) requests are anonymous.
  With --access-token (GOOGLE_OAUTH_ACCESS_TOKEN) that token is sent as-is.
  Otherwise, in order: the key file named by --credentials-file
  (GOOGLE_APPLICATION_CREDENTIALS), gcloud's application-default
  credentials, then the GCE / Cloud Run metadata server.

RUNTIME DEPENDENCIES:
  libpdfium   on the library search path, or PDFIUM_LIB_PATH=/path/to/libpdfium
  tesseract   on PATH (OCR mode), or TESSERACT_CMD=/path/to/tesseract
"#;

/// Convert PDFs in Google Cloud Storage to Markdown over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2md-server",
    version,
    about = "Convert PDFs in Google Cloud Storage to Markdown over HTTP",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Storage API root; set to use an emulator (requests become anonymous).
    #[arg(long, env = "STORAGE_EMULATOR_HOST")]
    storage_endpoint: Option<String>,

    /// OAuth bearer token for Cloud Storage instead of the metadata server.
    #[arg(long, env = "GOOGLE_OAUTH_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Service-account key or gcloud user credentials JSON.
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS")]
    credentials_file: Option<PathBuf>,

    /// Tesseract executable.
    #[arg(long, env = "TESSERACT_CMD", default_value = "tesseract")]
    tesseract_cmd: String,

    /// Tesseract language(s), e.g. eng or eng+fra.
    #[arg(long, env = "OCR_LANGUAGE", default_value = "eng")]
    ocr_language: String,

    /// Page magnification before OCR.
    #[arg(long, env = "OCR_SCALE", default_value_t = 1.2)]
    ocr_scale: f32,

    /// Path to libpdfium; defaults to the system library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib_path: Option<PathBuf>,

    /// Directory for per-request scratch files.
    #[arg(long, env = "SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Result<ServiceConfig> {
        let mut builder = ServiceConfig::builder()
            .host(self.host)
            .port(self.port)
            .tesseract_cmd(self.tesseract_cmd)
            .ocr_language(self.ocr_language)
            .ocr_scale(self.ocr_scale);

        if let Some(endpoint) = self.storage_endpoint {
            // The emulator convention allows a bare host:port.
            let endpoint = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
                endpoint
            } else {
                format!("http://{endpoint}")
            };
            builder = builder.storage_endpoint(endpoint).anonymous_storage(true);
        }
        if let Some(token) = self.access_token {
            builder = builder.access_token(token).anonymous_storage(false);
        }
        if let Some(path) = self.credentials_file {
            builder = builder.credentials_file(path);
        }
        if let Some(path) = self.pdfium_lib_path {
            builder = builder.pdfium_lib_path(path);
        }
        if let Some(dir) = self.scratch_dir {
            builder = builder.scratch_dir(dir);
        }

        builder.build().context("Invalid configuration")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "pdf2md_service=debug,tower_http=debug,info"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    let config = cli.into_config()?;
    info!("Starting pdf2md service v{}", env!("CARGO_PKG_VERSION"));
    info!("Storage endpoint: {}", config.storage.endpoint);

    // ── Preflight: the service still starts, but say what will fail ──────
    if let Err(e) = engine::bind_pdfium(config.engine.pdfium_lib_path.as_deref()) {
        warn!("pdfium is not available; every conversion will fail: {e}");
    }
    if !TesseractCli::from_config(&config.ocr).is_available() {
        warn!(
            "'{}' is not runnable; OCR mode will fail",
            config.ocr.tesseract_cmd
        );
    }

    let state = AppState::from_config(&config).context("Failed to initialise storage client")?;
    server::serve(&config, state)
        .await
        .context("Server terminated with an error")?;

    Ok(())
}
