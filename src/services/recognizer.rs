use base64::{engine::general_purpose, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::RecognitionError;

static DESIGN_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)D\.?(?:No\.?\s*)?(\d+)").expect("design number pattern"));

/// Turns an image (or a PDF design sheet) into raw text.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, path: &Path) -> Result<String, RecognitionError>;
}

/// Reads embedded PDF text when there is any, otherwise runs Tesseract.
pub struct SheetRecognizer {
    language: String,
}

impl SheetRecognizer {
    pub fn new(language: impl Into<String>) -> Self {
        SheetRecognizer {
            language: language.into(),
        }
    }

    #[cfg(feature = "ocr")]
    fn extract_via_ocr(&self, path: &Path) -> Result<String, RecognitionError> {
        let path = path
            .to_str()
            .ok_or_else(|| RecognitionError::InvalidImage("Invalid path".to_string()))?;
        tesseract::Tesseract::new(None, Some(&self.language))
            .map_err(|e| RecognitionError::Engine(format!("Tesseract init: {}", e)))?
            .set_image(path)
            .map_err(|e| RecognitionError::InvalidImage(format!("Tesseract image: {}", e)))?
            .recognize()
            .map_err(|e| RecognitionError::Engine(format!("Tesseract recognize: {}", e)))?
            .get_text()
            .map_err(|e| RecognitionError::Engine(format!("OCR text: {}", e)))
    }

    #[cfg(not(feature = "ocr"))]
    fn extract_via_ocr(&self, _path: &Path) -> Result<String, RecognitionError> {
        Err(RecognitionError::Engine(format!(
            "OCR ({}) is not available in this build",
            self.language
        )))
    }
}

impl TextRecognizer for SheetRecognizer {
    fn recognize(&self, path: &Path) -> Result<String, RecognitionError> {
        if is_pdf(path) {
            if let Ok(text) = pdf_extract::extract_text(path) {
                if !text.trim().is_empty() {
                    return Ok(text);
                }
            }
        }
        self.extract_via_ocr(path)
    }
}

/// First design number printed in `text`, e.g. `D.No 452` or `D.17`.
/// Whitespace is only allowed after `No`, so `blend 60` is not a match.
pub fn extract_design_number(text: &str) -> Option<String> {
    DESIGN_NUMBER
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|digits| digits.as_str().to_string())
}

/// Runs the recognizer off the async runtime and pulls the design number out
/// of whatever text comes back.
pub async fn recognize_design_number(
    recognizer: Arc<dyn TextRecognizer>,
    image: PathBuf,
    timeout: Duration,
) -> Result<String, RecognitionError> {
    info!(path = %image.display(), "Recognizing design number");
    let task = tokio::task::spawn_blocking(move || recognizer.recognize(&image));
    let text = match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result?,
        Ok(Err(join)) => return Err(RecognitionError::Engine(join.to_string())),
        Err(_) => {
            warn!(?timeout, "Recognition timed out");
            return Err(RecognitionError::TimedOut(timeout));
        }
    };

    match extract_design_number(&text) {
        Some(number) => {
            info!(design_number = %number, "Design number found");
            Ok(number)
        }
        None => Err(RecognitionError::NoDesignNumber),
    }
}

/// An uploaded image written to the temp dir. Removed on drop.
pub struct UploadedImage {
    path: PathBuf,
}

impl UploadedImage {
    /// Accepts raw base64 or a `data:<mime>;base64,` URL.
    pub fn from_base64(data: &str) -> Result<Self, RecognitionError> {
        let (mime, payload) = match data.strip_prefix("data:") {
            Some(rest) => {
                let (header, payload) = rest.split_once(',').ok_or_else(|| {
                    RecognitionError::InvalidImage("Malformed data URL".to_string())
                })?;
                (header.split(';').next().unwrap_or_default(), payload)
            }
            None => ("", data),
        };

        let bytes = general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| RecognitionError::InvalidImage(format!("Decode image: {}", e)))?;
        if bytes.is_empty() {
            return Err(RecognitionError::InvalidImage("Empty image".to_string()));
        }

        let extension = match mime {
            "application/pdf" => "pdf",
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/tiff" => "tiff",
            _ => "png",
        };
        let path = std::env::temp_dir().join(format!(
            "stitchbook-upload-{}.{}",
            uuid::Uuid::new_v4(),
            extension
        ));
        std::fs::write(&path, bytes)
            .map_err(|e| RecognitionError::InvalidImage(format!("Write image: {}", e)))?;
        Ok(UploadedImage { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UploadedImage {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Counts recognitions in flight so the UI can disable its trigger until
/// the last one finishes.
#[derive(Default)]
pub struct RecognitionFlag {
    in_flight: AtomicUsize,
}

impl RecognitionFlag {
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn begin(&self) -> RecognitionGuard<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        RecognitionGuard { flag: self }
    }
}

pub struct RecognitionGuard<'a> {
    flag: &'a RecognitionFlag,
}

impl Drop for RecognitionGuard<'_> {
    fn drop(&mut self) {
        self.flag.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}
