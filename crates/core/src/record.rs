use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::field::LabelFields;
use crate::result::VerificationResult;

/// One persisted verification run. External tooling reads these by key name,
/// so field names and their order must stay stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub image_name: String,
    pub fields: LabelFields,
    pub ocr_text: String,
    pub results: Vec<VerificationResult>,
    /// RFC 3339, UTC, millisecond precision (`2024-01-15T09:30:00.000Z`).
    pub timestamp: String,
}

impl LogRecord {
    pub fn new(
        image_name: impl Into<String>,
        fields: LabelFields,
        ocr_text: impl Into<String>,
        results: Vec<VerificationResult>,
    ) -> Self {
        Self::at(image_name, fields, ocr_text, results, Utc::now())
    }

    pub fn at(
        image_name: impl Into<String>,
        fields: LabelFields,
        ocr_text: impl Into<String>,
        results: Vec<VerificationResult>,
        when: DateTime<Utc>,
    ) -> Self {
        Self {
            image_name: image_name.into(),
            fields,
            ocr_text: ocr_text.into(),
            results,
            timestamp: when.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn matched_count(&self) -> usize {
        self.results.iter().filter(|r| r.matched).count()
    }
}
