use serde::{Deserialize, Serialize};

use crate::field::FieldName;

/// A field is considered present on the label when its confidence exceeds this.
pub const MATCH_THRESHOLD: f64 = 0.7;

pub fn is_match(confidence: f64) -> bool {
    confidence > MATCH_THRESHOLD
}

/// Outcome of checking one expected value against the label text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub field: FieldName,
    pub expected: String,
    pub matched: bool,
    /// Similarity of the closest excerpt (0.0 = nothing alike, 1.0 = verbatim).
    pub confidence: f64,
    /// The word or phrase of the label text that scored best.
    pub excerpt: Option<String>,
}

impl VerificationResult {
    pub fn new(
        field: FieldName,
        expected: impl Into<String>,
        confidence: f64,
        excerpt: Option<String>,
    ) -> Self {
        let confidence = confidence.clamp(0.0, 1.0);
        Self {
            field,
            expected: expected.into(),
            matched: is_match(confidence),
            confidence,
            excerpt,
        }
    }

    /// Confidence as a whole percentage, for display.
    pub fn percent(&self) -> u32 {
        (self.confidence * 100.0).round() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_exclusive() {
        assert!(!is_match(0.7));
        assert!(is_match(0.7001));
        assert!(!is_match(0.0));
    }

    #[test]
    fn new_clamps_and_derives_matched() {
        let r = VerificationResult::new(FieldName::BrandName, "ABC", 1.4, None);
        assert_eq!(r.confidence, 1.0);
        assert!(r.matched);

        let r = VerificationResult::new(FieldName::BrandName, "ABC", -0.2, None);
        assert_eq!(r.confidence, 0.0);
        assert!(!r.matched);
    }

    #[test]
    fn percent_rounds() {
        let r = VerificationResult::new(FieldName::NetContents, "750 ML", 0.666, None);
        assert_eq!(r.percent(), 67);
    }
}
