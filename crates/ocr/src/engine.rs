use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::normalize::normalize;
use crate::recognizer::{OcrBackend, OcrError};
use crate::types::{RecognizerConfig, DEFAULT_ATTEMPTS};

/// An attempt this confident, with this much text, ends the search early.
pub const EARLY_EXIT_CONFIDENCE: f32 = 80.0;
pub const EARLY_EXIT_MIN_CHARS: usize = 50;

/// Where one recognizer configuration ended up in a recognition run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AttemptState {
    Pending,
    Attempted { score: f64 },
    Selected { score: f64 },
    Skipped,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attempt {
    pub config: RecognizerConfig,
    #[serde(flatten)]
    pub state: AttemptState,
}

/// The selected attempt plus the ledger of every configuration considered.
#[derive(Debug, Clone, Serialize)]
pub struct Recognition {
    /// Normalized text of the selected attempt.
    pub text: String,
    /// Backend output before normalization.
    pub raw_text: String,
    pub confidence: f32,
    pub config: RecognizerConfig,
    pub score: f64,
    pub attempts: Vec<Attempt>,
}

/// Runs an [`OcrBackend`] over a fixed, ordered list of configurations and
/// keeps the best-scoring output.
pub struct OcrEngine<R: OcrBackend> {
    backend: Arc<R>,
    configs: Vec<RecognizerConfig>,
    // Held for a whole run; one recognition at a time per engine.
    in_flight: Mutex<()>,
}

impl<R: OcrBackend + 'static> OcrEngine<R> {
    pub fn new(backend: R) -> Self {
        Self::with_configs(backend, DEFAULT_ATTEMPTS.to_vec())
    }

    pub fn with_configs(backend: R, configs: Vec<RecognizerConfig>) -> Self {
        Self {
            backend: Arc::new(backend),
            configs,
            in_flight: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &R {
        &self.backend
    }

    /// Recognize `image_png`, trying each configuration in order.
    ///
    /// `on_progress` receives overall completion as a percentage; values never
    /// decrease and the last one is 100.
    pub async fn recognize<F>(&self, image_png: &[u8], mut on_progress: F) -> Result<Recognition, OcrError>
    where
        F: FnMut(u8),
    {
        let _guard = self.in_flight.lock().await;

        let image: Arc<[u8]> = Arc::from(image_png);
        let total = self.configs.len();
        let mut attempts: Vec<Attempt> = self
            .configs
            .iter()
            .map(|&config| Attempt { config, state: AttemptState::Pending })
            .collect();
        let mut progress = ProgressReporter::default();
        let mut best: Option<Candidate> = None;
        let mut last_error: Option<String> = None;

        for (index, config) in self.configs.iter().copied().enumerate() {
            let (tx, mut rx) = mpsc::unbounded_channel::<f32>();
            let backend = Arc::clone(&self.backend);
            let image = Arc::clone(&image);
            let task = tokio::task::spawn_blocking(move || {
                let mut forward = |p: f32| {
                    let _ = tx.send(p);
                };
                backend.recognize(&image, &config, &mut forward)
            });

            while let Some(fraction) = rx.recv().await {
                progress.report(overall_progress(index, total, fraction), &mut on_progress);
            }

            let outcome = match task.await {
                Ok(result) => result,
                Err(e) => Err(OcrError::Engine(format!("Recognition task failed: {e}"))),
            };

            match outcome {
                Ok(raw) => {
                    let text = normalize(&raw.text);
                    let chars = text.chars().count();
                    let score = score(raw.confidence, chars);
                    tracing::debug!(
                        config = config.name,
                        confidence = raw.confidence,
                        chars,
                        score,
                        "OCR attempt finished"
                    );
                    attempts[index].state = AttemptState::Attempted { score };

                    if best.as_ref().map_or(true, |b| score > b.score) {
                        best = Some(Candidate {
                            index,
                            text,
                            raw_text: raw.text,
                            confidence: raw.confidence,
                            score,
                        });
                    }

                    if raw.confidence > EARLY_EXIT_CONFIDENCE && chars > EARLY_EXIT_MIN_CHARS {
                        tracing::debug!(config = config.name, "Confident result, skipping remaining attempts");
                        for later in attempts.iter_mut().skip(index + 1) {
                            later.state = AttemptState::Skipped;
                        }
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("OCR attempt {config} failed: {e}");
                    attempts[index].state = AttemptState::Failed { reason: e.to_string() };
                    last_error = Some(e.to_string());
                }
            }
        }

        progress.report(100, &mut on_progress);

        let Some(best) = best else {
            return Err(OcrError::AllAttemptsFailed {
                attempts: total,
                last: last_error.unwrap_or_else(|| "no recognizer configurations".to_string()),
            });
        };

        attempts[best.index].state = AttemptState::Selected { score: best.score };
        let config = attempts[best.index].config;
        tracing::info!(
            config = config.name,
            confidence = best.confidence,
            score = best.score,
            "OCR selected"
        );

        Ok(Recognition {
            text: best.text,
            raw_text: best.raw_text,
            confidence: best.confidence,
            config,
            score: best.score,
            attempts,
        })
    }
}

struct Candidate {
    index: usize,
    text: String,
    raw_text: String,
    confidence: f32,
    score: f64,
}

/// Confidence weighted by the log of the normalized text length, so a
/// confident empty read never beats a slightly less confident full one.
pub fn score(confidence: f32, chars: usize) -> f64 {
    f64::from(confidence) * ((chars + 1) as f64).ln()
}

/// Percentage complete after `fraction` of attempt `index` out of `total`.
pub fn overall_progress(index: usize, total: usize, fraction: f32) -> u8 {
    if total == 0 {
        return 100;
    }
    let fraction = f64::from(fraction.clamp(0.0, 1.0));
    let pct = (index as f64 + fraction) / total as f64 * 100.0;
    pct.round().clamp(0.0, 100.0) as u8
}

/// Drops any value that would not advance the last one reported.
#[derive(Default)]
struct ProgressReporter {
    last: Option<u8>,
}

impl ProgressReporter {
    fn report(&mut self, pct: u8, sink: &mut impl FnMut(u8)) {
        if self.last.map_or(true, |last| pct > last) {
            self.last = Some(pct);
            sink(pct);
        }
    }
}
