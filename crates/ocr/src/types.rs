use serde::Serialize;
use std::fmt;

/// Tesseract page segmentation modes used by the attempt list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSegMode {
    /// Fully automatic page segmentation (PSM 3).
    Auto,
    /// A single uniform block of text (PSM 6).
    SingleBlock,
    /// A single text line (PSM 7).
    SingleLine,
    /// As much text as possible, in no particular order (PSM 11).
    SparseText,
}

impl PageSegMode {
    pub fn code(self) -> u8 {
        match self {
            PageSegMode::Auto => 3,
            PageSegMode::SingleBlock => 6,
            PageSegMode::SingleLine => 7,
            PageSegMode::SparseText => 11,
        }
    }
}

/// Tesseract OCR engine modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    /// Neural (LSTM) recognizer only (OEM 1).
    Lstm,
    /// Legacy recognizer combined with LSTM (OEM 2).
    LegacyAndLstm,
}

impl EngineMode {
    pub fn code(self) -> u8 {
        match self {
            EngineMode::Lstm => 1,
            EngineMode::LegacyAndLstm => 2,
        }
    }
}

/// One recognizer configuration tried by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecognizerConfig {
    pub name: &'static str,
    pub psm: PageSegMode,
    pub oem: EngineMode,
}

impl fmt::Display for RecognizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (psm {}, oem {})", self.name, self.psm.code(), self.oem.code())
    }
}

/// Attempt order: specialized layouts first, single-line fallback last.
pub const DEFAULT_ATTEMPTS: [RecognizerConfig; 4] = [
    RecognizerConfig { name: "sparse_text", psm: PageSegMode::SparseText, oem: EngineMode::Lstm },
    RecognizerConfig { name: "auto", psm: PageSegMode::Auto, oem: EngineMode::Lstm },
    RecognizerConfig { name: "single_block", psm: PageSegMode::SingleBlock, oem: EngineMode::Lstm },
    RecognizerConfig {
        name: "single_line",
        psm: PageSegMode::SingleLine,
        oem: EngineMode::LegacyAndLstm,
    },
];

/// Text and mean confidence (0–100) reported by a backend for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRecognition {
    pub text: String,
    pub confidence: f32,
}

impl RawRecognition {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self { text: text.into(), confidence: confidence.clamp(0.0, 100.0) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_attempts_priority_order() {
        let names: Vec<&str> = DEFAULT_ATTEMPTS.iter().map(|c| c.name).collect();
        assert_eq!(names, ["sparse_text", "auto", "single_block", "single_line"]);
        assert_eq!(DEFAULT_ATTEMPTS[3].oem, EngineMode::LegacyAndLstm);
    }

    #[test]
    fn tesseract_codes() {
        assert_eq!(PageSegMode::SparseText.code(), 11);
        assert_eq!(PageSegMode::SingleLine.code(), 7);
        assert_eq!(EngineMode::LegacyAndLstm.code(), 2);
    }

    #[test]
    fn raw_recognition_clamps_confidence() {
        assert_eq!(RawRecognition::new("x", -1.0).confidence, 0.0);
        assert_eq!(RawRecognition::new("x", 140.0).confidence, 100.0);
    }

    #[test]
    fn config_display() {
        assert_eq!(DEFAULT_ATTEMPTS[0].to_string(), "sparse_text (psm 11, oem 1)");
    }
}
