use labelcheck_core::{LogRecord, VerificationResult};
use labelcheck_ocr::{Attempt, LabelReport};
use serde::Serialize;
use std::fmt::Write;

/// One line of human-readable explanation for a field result.
pub fn explain(result: &VerificationResult) -> String {
    match (&result.excerpt, result.matched) {
        (Some(excerpt), true) => format!("found \"{excerpt}\""),
        (Some(excerpt), false) => format!("closest match \"{excerpt}\""),
        (None, _) => "not found".to_string(),
    }
}

pub fn render(report: &LabelReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "OCR: {} ({}% confidence)",
        report.ocr_config(),
        report.ocr_confidence().round()
    );
    for result in &report.results {
        let mark = if result.matched { '✓' } else { '✗' };
        let _ = writeln!(
            out,
            "{mark} {:<22} {:>3}%  {}",
            result.field.label(),
            result.percent(),
            explain(result)
        );
    }
    let matched = report.results.iter().filter(|r| r.matched).count();
    let _ = write!(out, "{matched}/{} fields matched", report.results.len());
    out
}

pub fn render_log_line(record: &LogRecord) -> String {
    format!(
        "{}  {}  {}/{} matched",
        record.timestamp,
        record.image_name,
        record.matched_count(),
        record.results.len()
    )
}

/// Machine-readable form of a [`LabelReport`] for `--json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JsonReport<'a> {
    pub image_name: &'a str,
    pub ocr_text: &'a str,
    pub ocr_confidence: f32,
    pub ocr_config: &'static str,
    pub results: &'a [VerificationResult],
    pub attempts: &'a [Attempt],
}

impl<'a> JsonReport<'a> {
    pub fn new(image_name: &'a str, report: &'a LabelReport) -> Self {
        Self {
            image_name,
            ocr_text: report.ocr_text(),
            ocr_confidence: report.ocr_confidence(),
            ocr_config: report.ocr_config().name,
            results: &report.results,
            attempts: report.attempts(),
        }
    }
}
