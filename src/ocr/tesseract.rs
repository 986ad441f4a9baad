//! Tesseract OCR text source.
//!
//! Runs the tesseract binary via subprocess on a fetched, normalized image.

use std::path::Path;
use std::process::Command;

use async_trait::async_trait;
use image::DynamicImage;
use tempfile::TempDir;
use tracing::{debug, info};

use super::fetch::{clean_text, fetch_document, prepare_image};
use super::{OcrError, TextSource, TextSourceConfig};

/// Text source backed by a Tesseract subprocess.
pub struct TesseractTextSource {
    config: TextSourceConfig,
    client: reqwest::Client,
}

impl TesseractTextSource {
    pub fn new(config: TextSourceConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.fetch_timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }
}

/// Run Tesseract on an image file.
fn run_tesseract(cmd: &str, language: &str, image_path: &Path) -> Result<String, OcrError> {
    let output = Command::new(cmd)
        .arg(image_path)
        .arg("stdout")
        .args(["-l", language])
        .args(["--oem", "3", "--psm", "6"])
        .output();

    match output {
        Ok(output) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(OcrError::OcrFailed(format!("tesseract failed: {}", stderr)))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(OcrError::BackendNotAvailable(
            "tesseract not found (install tesseract-ocr)".to_string(),
        )),
        Err(e) => Err(OcrError::Io(e)),
    }
}

/// Write the image to a scratch file and OCR it. Blocking.
fn ocr_image(cmd: &str, language: &str, img: &DynamicImage) -> Result<String, OcrError> {
    let temp_dir = TempDir::new()?;
    let image_path = temp_dir.path().join("page.png");
    img.save(&image_path)
        .map_err(|e| OcrError::Decode(e.to_string()))?;
    run_tesseract(cmd, language, &image_path)
}

#[async_trait]
impl TextSource for TesseractTextSource {
    async fn extract(&self, document_url: &str) -> Result<String, OcrError> {
        debug!("fetching document");
        let bytes = fetch_document(&self.client, document_url).await?;
        debug!("downloaded {} bytes", bytes.len());

        let img = prepare_image(&bytes, self.config.max_dimension)?;

        let cmd = self
            .config
            .tesseract_cmd
            .clone()
            .unwrap_or_else(|| "tesseract".to_string());
        let language = self.config.language.clone();

        // PNG encode + subprocess are blocking; keep them off the serving task.
        let text = tokio::task::spawn_blocking(move || ocr_image(&cmd, &language, &img))
            .await
            .map_err(|e| OcrError::OcrFailed(format!("OCR task panicked: {}", e)))??;

        let text = clean_text(&text);
        info!("OCR extraction complete, {} chars", text.len());
        Ok(text)
    }
}
