use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use thiserror::Error;

use crate::types::{RawRecognition, RecognizerConfig};

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
    #[error("Tesseract not available; install it or build with the `tesseract` feature")]
    NotAvailable,
    #[error("All {attempts} recognition attempts failed; last error: {last}")]
    AllAttemptsFailed { attempts: usize, last: String },
}

/// Abstraction over an OCR backend.
///
/// Implementations accept PNG image bytes plus one recognizer configuration
/// and return the recognized text with its mean confidence. `progress`
/// receives the fraction (0.0–1.0) of this run completed so far.
pub trait OcrBackend: Send + Sync {
    fn recognize(
        &self,
        image_png: &[u8],
        config: &RecognizerConfig,
        progress: &mut dyn FnMut(f32),
    ) -> Result<RawRecognition, OcrError>;
}

// ── Mock backends (always available, used for tests) ──────────────────────────

/// Returns the same text and confidence for every configuration.
pub struct MockRecognizer {
    pub text: String,
    pub confidence: f32,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self { text: text.into(), confidence }
    }
}

impl OcrBackend for MockRecognizer {
    fn recognize(
        &self,
        _image_png: &[u8],
        _config: &RecognizerConfig,
        progress: &mut dyn FnMut(f32),
    ) -> Result<RawRecognition, OcrError> {
        progress(1.0);
        Ok(RawRecognition::new(self.text.clone(), self.confidence))
    }
}

/// Plays back one scripted outcome per call, in order, and records which
/// configurations were asked for. Calls past the end of the script fail.
#[derive(Default)]
pub struct ScriptedRecognizer {
    script: Mutex<VecDeque<Result<RawRecognition, OcrError>>>,
    seen: Mutex<Vec<&'static str>>,
    calls: AtomicUsize,
}

impl ScriptedRecognizer {
    pub fn new(script: Vec<Result<RawRecognition, OcrError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Names of the configurations requested so far.
    pub fn seen(&self) -> Vec<&'static str> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl OcrBackend for ScriptedRecognizer {
    fn recognize(
        &self,
        _image_png: &[u8],
        config: &RecognizerConfig,
        progress: &mut dyn FnMut(f32),
    ) -> Result<RawRecognition, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(config.name);
        }
        progress(0.5);
        let next = self
            .script
            .lock()
            .map_err(|_| OcrError::Engine("script lock poisoned".into()))?
            .pop_front();
        let outcome = next.unwrap_or_else(|| Err(OcrError::Engine("script exhausted".into())));
        if outcome.is_ok() {
            progress(1.0);
        }
        outcome
    }
}

// ── libtesseract backend (optional, gated behind `tesseract` feature) ─────────

#[cfg(feature = "tesseract")]
pub mod leptess_backend {
    use super::{OcrBackend, OcrError};
    use crate::types::{EngineMode, RawRecognition, RecognizerConfig};
    use leptess::{LepTess, Variable};

    /// In-process Tesseract via leptess. The engine mode is fixed when the
    /// API is initialised, so every attempt runs with the library default.
    pub struct LepTessRecognizer {
        data_path: Option<String>,
        lang: String,
    }

    impl LepTessRecognizer {
        pub fn new(data_path: Option<String>, lang: &str) -> Self {
            Self { data_path, lang: lang.to_string() }
        }
    }

    impl OcrBackend for LepTessRecognizer {
        fn recognize(
            &self,
            image_png: &[u8],
            config: &RecognizerConfig,
            progress: &mut dyn FnMut(f32),
        ) -> Result<RawRecognition, OcrError> {
            progress(0.0);
            let mut lt = LepTess::new(self.data_path.as_deref(), &self.lang)
                .map_err(|e| OcrError::Engine(format!("{e:?}")))?;
            if config.oem != EngineMode::Lstm {
                tracing::debug!(config = config.name, "engine mode not selectable through leptess");
            }
            lt.set_variable(Variable::TesseditPagesegMode, &config.psm.code().to_string())
                .map_err(|e| OcrError::Engine(format!("{e:?}")))?;
            lt.set_image_from_mem(image_png)
                .map_err(|e| OcrError::ImageDecode(format!("{e:?}")))?;
            let text = lt.get_utf8_text().map_err(|e| OcrError::Engine(e.to_string()))?;
            let confidence = lt.mean_text_conf() as f32;
            progress(1.0);
            Ok(RawRecognition::new(text, confidence))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_ATTEMPTS;

    fn run(backend: &dyn OcrBackend) -> (Result<RawRecognition, OcrError>, Vec<f32>) {
        let mut ticks = Vec::new();
        let out = backend.recognize(b"fake image data", &DEFAULT_ATTEMPTS[0], &mut |p| ticks.push(p));
        (out, ticks)
    }

    #[test]
    fn mock_returns_preset_text() {
        let r = MockRecognizer::new("OLD TOM\n750 ML", 91.0);
        let (out, ticks) = run(&r);
        let out = out.unwrap();
        assert_eq!(out.text, "OLD TOM\n750 ML");
        assert_eq!(out.confidence, 91.0);
        assert_eq!(ticks, vec![1.0]);
    }

    #[test]
    fn scripted_plays_back_in_order() {
        let r = ScriptedRecognizer::new(vec![
            Err(OcrError::Engine("boom".into())),
            Ok(RawRecognition::new("second", 50.0)),
        ]);
        assert!(run(&r).0.is_err());
        assert_eq!(run(&r).0.unwrap().text, "second");
        assert!(matches!(run(&r).0, Err(OcrError::Engine(msg)) if msg == "script exhausted"));
        assert_eq!(r.calls(), 3);
        assert_eq!(r.seen(), vec!["sparse_text"; 3]);
    }

    #[test]
    fn all_attempts_failed_message() {
        let e = OcrError::AllAttemptsFailed { attempts: 4, last: "no text".into() };
        assert_eq!(e.to_string(), "All 4 recognition attempts failed; last error: no text");
    }
}
