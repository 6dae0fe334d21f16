use labelcheck_core::{FieldEntry, VerificationResult};
use labelcheck_verify::{verify_all, VerifyError};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::engine::{Attempt, OcrEngine, Recognition};
use crate::preprocess::{self, PreprocessError, PreprocessingBank, Technique, Variant, VariantSource};
use crate::recognizer::{OcrBackend, OcrError};
use crate::types::RecognizerConfig;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No image provided")]
    NoImage,
    #[error("No expected values provided; fill in at least one field")]
    NoExpectedValues,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
    #[error("Verification failed: {0}")]
    Verify(#[from] VerifyError),
    #[error("Preprocessing produced no '{0}' variant")]
    MissingVariant(Technique),
}

/// Which image is handed to the OCR engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OcrInput {
    /// The decoded (and possibly downscaled) source image.
    #[default]
    Source,
    /// One of the preprocessed variants.
    Variant(Technique),
}

impl fmt::Display for OcrInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OcrInput::Source => f.write_str("source"),
            OcrInput::Variant(t) => write!(f, "{t}"),
        }
    }
}

impl FromStr for OcrInput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "source" | "original" => Ok(OcrInput::Source),
            other => other
                .parse::<Technique>()
                .map(OcrInput::Variant)
                .map_err(|_| format!("Unknown OCR input '{s}': expected 'source' or a technique name")),
        }
    }
}

/// Everything one verification run produced.
#[derive(Debug)]
pub struct LabelReport {
    /// One result per non-empty field, in the order the fields were given.
    pub results: Vec<VerificationResult>,
    pub recognition: Recognition,
    /// Preprocessed variants, kept only when the pipeline is asked to.
    pub variants: Vec<Variant>,
}

impl LabelReport {
    pub fn ocr_text(&self) -> &str {
        &self.recognition.text
    }

    pub fn ocr_confidence(&self) -> f32 {
        self.recognition.confidence
    }

    pub fn ocr_config(&self) -> &RecognizerConfig {
        &self.recognition.config
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.recognition.attempts
    }

    pub fn all_matched(&self) -> bool {
        self.results.iter().all(|r| r.matched)
    }
}

/// Orchestrates: decode → preprocess → OCR → normalize → verify.
pub struct LabelPipeline<R: OcrBackend, P: VariantSource = PreprocessingBank> {
    engine: OcrEngine<R>,
    preprocessor: P,
    ocr_input: OcrInput,
    keep_variants: bool,
}

impl<R: OcrBackend + 'static> LabelPipeline<R, PreprocessingBank> {
    pub fn new(recognizer: R) -> Self {
        Self::with_engine(OcrEngine::new(recognizer))
    }

    pub fn with_engine(engine: OcrEngine<R>) -> Self {
        Self {
            engine,
            preprocessor: PreprocessingBank,
            ocr_input: OcrInput::Source,
            keep_variants: false,
        }
    }
}

impl<R: OcrBackend + 'static, P: VariantSource> LabelPipeline<R, P> {
    pub fn with_preprocessor<Q: VariantSource>(self, preprocessor: Q) -> LabelPipeline<R, Q> {
        LabelPipeline {
            engine: self.engine,
            preprocessor,
            ocr_input: self.ocr_input,
            keep_variants: self.keep_variants,
        }
    }

    pub fn with_ocr_input(mut self, input: OcrInput) -> Self {
        self.ocr_input = input;
        self
    }

    /// Return the preprocessed variants in the report (for compositing).
    pub fn keep_variants(mut self, keep: bool) -> Self {
        self.keep_variants = keep;
        self
    }

    pub fn engine(&self) -> &OcrEngine<R> {
        &self.engine
    }

    /// Verify an image file on disk.
    pub async fn verify_file<F>(
        &self,
        path: &Path,
        fields: &[FieldEntry],
        progress: F,
    ) -> Result<LabelReport, PipelineError>
    where
        F: FnMut(u8),
    {
        if !fields.iter().any(|f| !f.is_empty()) {
            return Err(PipelineError::NoExpectedValues);
        }
        let bytes = tokio::fs::read(path).await?;
        self.verify_bytes(&bytes, fields, progress).await
    }

    /// Verify raw image bytes against the expected field values.
    ///
    /// `progress` sees 10 after input checks, 40–70 during OCR, 70–100 during
    /// field verification, and ends at 100.
    pub async fn verify_bytes<F>(
        &self,
        data: &[u8],
        fields: &[FieldEntry],
        mut progress: F,
    ) -> Result<LabelReport, PipelineError>
    where
        F: FnMut(u8),
    {
        if data.is_empty() {
            return Err(PipelineError::NoImage);
        }
        if !fields.iter().any(|f| !f.is_empty()) {
            return Err(PipelineError::NoExpectedValues);
        }
        progress(10);

        // 1. Decode.
        let image = preprocess::load_image(data)?;
        tokio::task::yield_now().await;

        // 2. Preprocess and pick the OCR input.
        let variants = self.preprocessor.produce_variants(&image)?;
        let ocr_png = match self.ocr_input {
            OcrInput::Source => preprocess::encode_png(&image)?,
            OcrInput::Variant(technique) => {
                let variant = variants
                    .iter()
                    .find(|v| v.technique == technique)
                    .ok_or(PipelineError::MissingVariant(technique))?;
                preprocess::encode_png(&image::DynamicImage::ImageLuma8(variant.image.clone()))?
            }
        };
        drop(image);
        let variants = if self.keep_variants { variants } else { Vec::new() };
        progress(40);

        // 3. OCR (attempts, scoring, normalization).
        let recognition = self
            .engine
            .recognize(&ocr_png, |pct| progress(40 + scale(pct, 30)))
            .await?;
        drop(ocr_png);
        progress(70);

        // 4. Field verification.
        let results = verify_all(fields, &recognition.text, |done, total| {
            let pct = if total == 0 { 100 } else { (done * 100 / total) as u8 };
            progress(70 + scale(pct, 30));
        })
        .await?;
        progress(100);

        tracing::info!(
            fields = results.len(),
            matched = results.iter().filter(|r| r.matched).count(),
            config = recognition.config.name,
            "Label verified"
        );

        Ok(LabelReport { results, recognition, variants })
    }
}

/// Map a 0–100 percentage onto a span of `width` points.
fn scale(pct: u8, width: u8) -> u8 {
    (u16::from(pct.min(100)) * u16::from(width) / 100) as u8
}
