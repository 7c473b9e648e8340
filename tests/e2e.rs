//! End-to-end tests against a real pdfium library.
//!
//! These tests use real PDF files in `./test_cases/` and need `libpdfium`
//! (and, for the OCR test, `tesseract`). They are gated behind the
//! `E2E_ENABLED` environment variable so they do not run in CI unless
//! explicitly requested.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/path/to/libpdfium.so cargo test --test e2e -- --nocapture

use axum::body::Body;
use axum::http::{Request, StatusCode};
use pdf2md_service::{
    convert_direct, convert_ocr, router, AppState, ConversionMode, DocumentConverter,
    EngineConfig, GcsClient, OcrConfig, OcrError, PdfConverter, StorageConfig, TesseractCli,
    TextRecognizer,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn test_cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases")
}

fn engine_config() -> EngineConfig {
    EngineConfig {
        pdfium_lib_path: std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from),
    }
}

/// Skip this test if E2E_ENABLED is not set *or* no PDF file at `path`.
macro_rules! e2e_skip_unless_ready {
    ($path:expr) => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        let p: PathBuf = $path;
        if !p.exists() {
            println!("SKIP — test file not found: {}", p.display());
            return;
        }
        p
    }};
}

/// Answers "page N" for the Nth bitmap it is handed.
#[derive(Default)]
struct NumberingRecognizer {
    calls: AtomicUsize,
}

impl TextRecognizer for NumberingRecognizer {
    fn recognize(&self, jpeg: &[u8]) -> Result<String, OcrError> {
        assert!(jpeg.starts_with(&[0xFF, 0xD8]), "recogniser must receive JPEG bytes");
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("page {n}"))
    }
}

// ── Direct mode ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_direct_extracts_text_layer() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));

    let md = convert_direct(&path, &engine_config())
        .await
        .expect("direct conversion should succeed");

    assert!(md.ends_with('\n'), "Markdown must end with a newline");
    assert!(!md.contains("\n\n\n"), "Output has runs of blank lines");
    for title in ["# Quarterly Report", "# Pipeline Notes", "# Price List"] {
        assert!(md.contains(title), "missing heading {title:?} in:\n{md}");
    }
    let first = md.find("Quarterly Report").unwrap();
    let last = md.find("Price List").unwrap();
    assert!(first < last, "pages out of order");
    assert!(md.contains("| Item"), "price list is not a table:\n{md}");
    assert!(md.contains("| Apples |"), "price list is not a table:\n{md}");
    println!("{md}");
}

#[tokio::test]
async fn test_direct_rejects_non_pdf() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("bogus.pdf");
    std::fs::write(&bogus, b"this is not a pdf").unwrap();

    let result = convert_direct(&bogus, &engine_config()).await;
    assert!(result.is_err(), "garbage input must not convert");
}

// ── OCR mode ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_ocr_visits_pages_in_order() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));

    let recognizer = Arc::new(NumberingRecognizer::default());
    let text = convert_ocr(&path, &OcrConfig::default(), &engine_config(), recognizer.clone())
        .await
        .expect("OCR conversion should succeed");

    let pages = recognizer.calls.load(Ordering::SeqCst);
    assert_eq!(pages, 3, "sample.pdf has three pages");
    let expected: String = (1..=pages).map(|n| format!("page {n}\n")).collect();
    assert_eq!(text, expected);
}

#[tokio::test]
async fn test_ocr_with_tesseract() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));
    let tesseract = TesseractCli::from_config(&OcrConfig::default());
    if !tesseract.is_available() {
        println!("SKIP — tesseract not on PATH");
        return;
    }

    let text = convert_ocr(&path, &OcrConfig::default(), &engine_config(), Arc::new(tesseract))
        .await
        .expect("OCR conversion should succeed");

    assert!(text.ends_with('\n'));
    assert!(text.contains("Quarterly"), "first page not recognised:\n{text}");
    assert!(text.contains("Apples"), "last page not recognised:\n{text}");
    println!("{text}");
}

// ── Full service ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_service_converts_object_from_storage() {
    let pdf_path = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));
    let pdf = std::fs::read(&pdf_path).unwrap();

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/storage/v1/b/fixtures/o/sample.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(pdf))
        .mount(&server)
        .await;

    let store = GcsClient::new(&StorageConfig {
        endpoint: server.uri(),
        access_token: None,
        anonymous: true,
        credentials_file: None,
    })
    .unwrap();
    let converter = PdfConverter::with_recognizer(
        OcrConfig::default(),
        engine_config(),
        Arc::new(NumberingRecognizer::default()),
    );
    let scratch = tempfile::tempdir().unwrap();
    let app = router(
        AppState::new(Arc::new(store), Arc::new(converter)).with_scratch_dir(scratch.path()),
    );

    let request = Request::builder()
        .method("POST")
        .uri("/convert")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"file": "gs://fixtures/sample.pdf"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["markdown"], "page 1\npage 2\npage 3\n");
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_converter_trait_dispatches_both_modes() {
    let path = e2e_skip_unless_ready!(test_cases_dir().join("sample.pdf"));

    let converter = PdfConverter::with_recognizer(
        OcrConfig::default(),
        engine_config(),
        Arc::new(NumberingRecognizer::default()),
    );
    let ocr = converter.convert(&path, ConversionMode::Ocr).await.unwrap();
    let direct = converter.convert(&path, ConversionMode::Direct).await.unwrap();

    assert_eq!(ocr, "page 1\npage 2\npage 3\n");
    assert!(direct.starts_with("# Quarterly Report"));
}
