//! Configuration types for the conversion service.
//!
//! Everything the service needs at startup lives in [`ServiceConfig`], built
//! via [`ServiceConfigBuilder`]. The binary maps CLI flags and environment
//! variables onto the builder. The only environment lookups the library
//! makes itself are Google's credential conventions, see
//! [`crate::storage::TokenSource::from_config`].

use crate::error::ConfigError;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Public Google Cloud Storage endpoint.
pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";

/// Magnification applied to each page before OCR.
pub const DEFAULT_OCR_SCALE: f32 = 1.2;

/// Top-level service configuration.
///
/// # Example
/// ```rust
/// use pdf2md_service::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .port(9090)
///     .ocr_language("deu")
///     .build()
///     .unwrap();
/// assert_eq!(config.port, 9090);
/// ```
#[derive(Clone)]
pub struct ServiceConfig {
    /// Interface to bind. Default: `0.0.0.0`.
    pub host: String,

    /// Listening port. Default: 8080.
    pub port: u16,

    /// Directory for per-request scratch files. Default: the OS temp dir.
    pub scratch_dir: Option<PathBuf>,

    pub storage: StorageConfig,
    pub ocr: OcrConfig,
    pub engine: EngineConfig,
}

/// Object-store access settings.
#[derive(Clone)]
pub struct StorageConfig {
    /// Base URL of the storage JSON API. Default: [`DEFAULT_STORAGE_ENDPOINT`].
    pub endpoint: String,

    /// Explicit OAuth bearer token. When `None` the metadata server is asked.
    pub access_token: Option<String>,

    /// Send requests without credentials (emulators, public buckets).
    pub anonymous: bool,

    /// Service-account key or gcloud user credentials file. When `None`,
    /// `GOOGLE_APPLICATION_CREDENTIALS` and the gcloud default file are tried.
    pub credentials_file: Option<PathBuf>,
}

/// Text-recognition settings for OCR mode.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Page magnification in both axes. Default: 1.2.
    pub scale: f32,

    /// Tesseract executable. Default: `tesseract`.
    pub tesseract_cmd: String,

    /// Tesseract language pack(s), e.g. `eng` or `eng+deu`. Default: `eng`.
    pub language: String,
}

/// PDF engine settings.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Explicit libpdfium path; `None` binds the system library.
    pub pdfium_lib_path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_STORAGE_ENDPOINT.to_string(),
            access_token: None,
            anonymous: false,
            credentials_file: None,
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            scale: DEFAULT_OCR_SCALE,
            tesseract_cmd: "tesseract".to_string(),
            language: "eng".to_string(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            scratch_dir: None,
            storage: StorageConfig::default(),
            ocr: OcrConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("endpoint", &self.endpoint)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("anonymous", &self.anonymous)
            .field("credentials_file", &self.credentials_file)
            .finish()
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("scratch_dir", &self.scratch_dir)
            .field("storage", &self.storage)
            .field("ocr", &self.ocr)
            .field("engine", &self.engine)
            .finish()
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    /// Socket address the server binds to.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("bad listen address '{}': {e}", self.host)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = Some(dir.into());
        self
    }

    /// Point the storage client at a different API root, e.g. an emulator.
    pub fn storage_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.storage.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.config.storage.access_token = Some(token.into());
        self
    }

    pub fn credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.storage.credentials_file = Some(path.into());
        self
    }

    pub fn anonymous_storage(mut self, v: bool) -> Self {
        self.config.storage.anonymous = v;
        self
    }

    pub fn ocr_scale(mut self, scale: f32) -> Self {
        self.config.ocr.scale = scale;
        self
    }

    pub fn tesseract_cmd(mut self, cmd: impl Into<String>) -> Self {
        self.config.ocr.tesseract_cmd = cmd.into();
        self
    }

    pub fn ocr_language(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr.language = lang.into();
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.engine.pdfium_lib_path = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ServiceConfig, ConfigError> {
        let c = &self.config;
        if c.port == 0 {
            return Err(ConfigError::Invalid("port must be non-zero".into()));
        }
        if !(c.ocr.scale > 0.0 && c.ocr.scale <= 8.0) {
            return Err(ConfigError::Invalid(format!(
                "OCR scale must be in (0, 8], got {}",
                c.ocr.scale
            )));
        }
        if c.ocr.tesseract_cmd.trim().is_empty() {
            return Err(ConfigError::Invalid("tesseract command is empty".into()));
        }
        if c.ocr.language.trim().is_empty() {
            return Err(ConfigError::Invalid("OCR language is empty".into()));
        }
        if !(c.storage.endpoint.starts_with("http://") || c.storage.endpoint.starts_with("https://"))
        {
            return Err(ConfigError::Invalid(format!(
                "storage endpoint must be an http(s) URL, got '{}'",
                c.storage.endpoint
            )));
        }
        c.bind_addr()?;
        Ok(self.config)
    }
}
