use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::process::Command;
use tempfile::NamedTempFile;

use crate::recognizer::{OcrBackend, OcrError};
use crate::types::{RawRecognition, RecognizerConfig};

/// Runs the `tesseract` executable once per attempt and reads its TSV output.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    executable: PathBuf,
    tessdata_dir: Option<PathBuf>,
    language: String,
}

impl TesseractCli {
    pub fn new(executable: impl Into<PathBuf>, language: &str) -> Self {
        Self {
            executable: executable.into(),
            tessdata_dir: None,
            language: language.to_string(),
        }
    }

    pub fn with_tessdata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tessdata_dir = Some(dir.into());
        self
    }
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self::new("tesseract", "eng")
    }
}

impl OcrBackend for TesseractCli {
    fn recognize(
        &self,
        image_png: &[u8],
        config: &RecognizerConfig,
        progress: &mut dyn FnMut(f32),
    ) -> Result<RawRecognition, OcrError> {
        progress(0.0);

        let mut input = NamedTempFile::with_suffix(".png")
            .map_err(|e| OcrError::Engine(format!("Failed to create temp file: {e}")))?;
        input
            .write_all(image_png)
            .and_then(|_| input.flush())
            .map_err(|e| OcrError::Engine(format!("Failed to write temp image: {e}")))?;

        let mut cmd = Command::new(&self.executable);
        cmd.arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .arg("--psm")
            .arg(config.psm.code().to_string())
            .arg("--oem")
            .arg(config.oem.code().to_string());
        if let Some(dir) = &self.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd.arg("tsv");

        let output = cmd.output().map_err(|e| match e.kind() {
            ErrorKind::NotFound => OcrError::NotAvailable,
            _ => OcrError::Engine(format!("Failed to run tesseract: {e}")),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let recognition = parse_tsv(&String::from_utf8_lossy(&output.stdout));
        progress(1.0);
        Ok(recognition)
    }
}

/// Collapse Tesseract TSV output into text plus mean word confidence.
///
/// Words on the same (block, paragraph, line) are joined by spaces, lines by
/// newlines. Words reported with negative confidence are not averaged.
pub fn parse_tsv(tsv: &str) -> RawRecognition {
    let mut lines: Vec<Vec<&str>> = Vec::new();
    let mut current_key: Option<(&str, &str, &str)> = None;
    let (mut conf_sum, mut conf_count) = (0.0f32, 0usize);

    // Skip header
    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != "5" {
            continue;
        }
        let word = cols[11].trim();
        if word.is_empty() {
            continue;
        }

        let key = (cols[2], cols[3], cols[4]);
        if current_key != Some(key) {
            lines.push(Vec::new());
            current_key = Some(key);
        }
        if let Some(line) = lines.last_mut() {
            line.push(word);
        }

        if let Ok(conf) = cols[10].trim().parse::<f32>() {
            if conf >= 0.0 {
                conf_sum += conf;
                conf_count += 1;
            }
        }
    }

    let text = lines
        .iter()
        .map(|words| words.join(" "))
        .collect::<Vec<_>>()
        .join("\n");
    let confidence = if conf_count > 0 { conf_sum / conf_count as f32 } else { 0.0 };
    RawRecognition::new(text, confidence)
}
