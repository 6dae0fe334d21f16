use labelcheck_core::{FieldEntry, VerificationResult};
use thiserror::Error;

use crate::distance::levenshtein_distance;

/// Longest run of consecutive words compared against an expected value.
pub const MAX_PHRASE_WORDS: usize = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("No label text to verify against")]
    EmptyText,
}

/// Closest word or phrase of the label text to an expected value.
#[derive(Debug, Clone, PartialEq)]
pub struct BestMatch {
    pub distance: usize,
    pub confidence: f64,
    pub excerpt: Option<String>,
}

/// Locate `expected` in `text`, exactly or approximately.
///
/// Both inputs are compared as given; [`verify_field`] folds case before
/// calling this. An exact substring hit short-circuits with distance 0.
/// Otherwise every single word and every 2- and 3-word phrase is scored by
/// edit distance and the first minimum wins.
pub fn find_best_match(expected: &str, text: &str) -> BestMatch {
    if text.contains(expected) {
        return BestMatch {
            distance: 0,
            confidence: 1.0,
            excerpt: Some(expected.to_string()),
        };
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let mut best: Option<(usize, String)> = None;

    for start in 0..words.len() {
        for len in 1..=MAX_PHRASE_WORDS {
            let Some(window) = words.get(start..start + len) else {
                break;
            };
            let candidate = window.join(" ");
            let distance = levenshtein_distance(expected, &candidate);
            if best.as_ref().map_or(true, |(d, _)| distance < *d) {
                best = Some((distance, candidate));
            }
        }
    }

    match best {
        Some((distance, excerpt)) => BestMatch {
            distance,
            confidence: similarity(distance, expected.chars().count(), excerpt.chars().count()),
            excerpt: Some(excerpt),
        },
        None => BestMatch {
            distance: expected.chars().count(),
            confidence: 0.0,
            excerpt: None,
        },
    }
}

/// `1 - distance / longer_length`, floored at zero.
pub(crate) fn similarity(distance: usize, expected_len: usize, excerpt_len: usize) -> f64 {
    let longest = expected_len.max(excerpt_len);
    if longest == 0 {
        return 1.0;
    }
    (1.0 - distance as f64 / longest as f64).max(0.0)
}

/// Check one expected value against normalized label text, ignoring case.
pub fn verify_field(entry: &FieldEntry, text: &str) -> VerificationResult {
    let expected = entry.expected.trim().to_lowercase();
    let haystack = text.to_lowercase();
    let best = find_best_match(&expected, &haystack);
    VerificationResult::new(entry.field, entry.expected.clone(), best.confidence, best.excerpt)
}

/// Verify every non-empty entry, in order.
///
/// `progress` receives `(done, total)` after each verified field, where
/// `total` counts only non-empty entries. Control is handed back to the
/// scheduler between fields.
pub async fn verify_all<F>(
    fields: &[FieldEntry],
    text: &str,
    mut progress: F,
) -> Result<Vec<VerificationResult>, VerifyError>
where
    F: FnMut(usize, usize),
{
    if text.trim().is_empty() {
        return Err(VerifyError::EmptyText);
    }

    let pending: Vec<&FieldEntry> = fields.iter().filter(|f| !f.is_empty()).collect();
    let total = pending.len();
    let mut results = Vec::with_capacity(total);

    for (idx, entry) in pending.into_iter().enumerate() {
        let result = verify_field(entry, text);
        tracing::debug!(
            field = %result.field,
            confidence = result.confidence,
            matched = result.matched,
            "field verified"
        );
        results.push(result);
        progress(idx + 1, total);
        tokio::task::yield_now().await;
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use labelcheck_core::FieldName;

    fn entry(field: FieldName, expected: &str) -> FieldEntry {
        FieldEntry::new(field, expected)
    }

    #[test]
    fn exact_substring_short_circuits() {
        let m = find_best_match("old tom", "distilled by old tom distillery");
        assert_eq!(m.distance, 0);
        assert_eq!(m.confidence, 1.0);
        assert_eq!(m.excerpt.as_deref(), Some("old tom"));
    }

    #[test]
    fn substring_inside_a_word_still_counts() {
        let m = find_best_match("40%", "alc.40% by vol");
        assert_eq!(m.confidence, 1.0);
    }

    #[test]
    fn phrase_window_finds_multi_word_value() {
        let m = find_best_match("kentucky straight bourbon", "a kentuky straight bourbon whiskey");
        assert_eq!(m.excerpt.as_deref(), Some("kentuky straight bourbon"));
        assert_eq!(m.distance, 1);
        assert!(m.confidence > 0.95);
    }

    #[test]
    fn phrase_window_stops_at_three_words() {
        let m = find_best_match("one two three four", "one two three four five");
        // exact substring; no window needed
        assert_eq!(m.confidence, 1.0);

        let m = find_best_match("one two three four", "one tw0 three four five");
        let excerpt = m.excerpt.unwrap();
        assert!(excerpt.split(' ').count() <= MAX_PHRASE_WORDS, "{excerpt}");
    }

    #[test]
    fn first_minimum_wins_ties() {
        let m = find_best_match("cat", "bat hat");
        assert_eq!(m.distance, 1);
        assert_eq!(m.excerpt.as_deref(), Some("bat"));
    }

    #[test]
    fn no_words_means_zero_confidence() {
        let m = find_best_match("abc", "   ");
        assert_eq!(m.confidence, 0.0);
        assert_eq!(m.excerpt, None);
    }

    #[test]
    fn confidence_never_negative() {
        let m = find_best_match("a", "zzzzzzzzzz");
        assert_eq!(m.confidence, 0.0);
    }

    #[test]
    fn similarity_is_monotonic_in_distance() {
        for expected_len in 1..12 {
            for excerpt_len in 1..12 {
                let longest = expected_len.max(excerpt_len);
                let scores: Vec<f64> = (0..=longest)
                    .map(|d| similarity(d, expected_len, excerpt_len))
                    .collect();
                assert!(scores.windows(2).all(|w| w[0] >= w[1]), "{scores:?}");
            }
        }
    }

    #[test]
    fn verify_field_confidence_falls_as_text_drifts() {
        let expected = entry(FieldName::BrandName, "Old Tom Distillery");
        let confidences: Vec<f64> = [
            "old tom distillery",
            "old tam distillery",
            "old tam distilkery",
            "xyz",
        ]
        .into_iter()
        .map(|text| verify_field(&expected, text).confidence)
        .collect();

        assert_eq!(confidences[0], 1.0);
        assert!(confidences.windows(2).all(|w| w[0] > w[1]), "{confidences:?}");
    }

    #[test]
    fn verify_field_ignores_case() {
        let r = verify_field(&entry(FieldName::NetContents, "750 ML"), "product of usa 750 ml");
        assert!(r.matched);
        assert_eq!(r.confidence, 1.0);
        assert_eq!(r.expected, "750 ML");
    }

    #[test]
    fn verify_field_unrelated_text_does_not_match() {
        let text = "totally unrelated content with no resemblance";
        let r = verify_field(&entry(FieldName::BrandName, "ABC"), text);
        assert!(!r.matched);
        assert!(r.confidence < 0.7);
        assert_eq!(r.excerpt.as_deref(), Some("no"));

        let again = verify_field(&entry(FieldName::BrandName, "ABC"), text);
        assert_eq!(again, r);
    }

    #[test]
    fn verify_field_tolerates_small_ocr_errors() {
        let r = verify_field(
            &entry(FieldName::ManufacturerName, "Heaven Hill Distillery"),
            "bottled by heaven hil distilery bardstown",
        );
        assert!(r.matched, "confidence {}", r.confidence);
        assert!(r.confidence < 1.0);
    }

    #[tokio::test]
    async fn verify_all_skips_empty_and_keeps_order() {
        let fields = vec![
            entry(FieldName::BrandName, "Old Tom"),
            entry(FieldName::ProductClass, ""),
            entry(FieldName::AlcoholContent, "40%"),
            entry(FieldName::NetContents, "   "),
            entry(FieldName::ManufacturerName, "Tom Distilling"),
        ];
        let results = verify_all(&fields, "old tom gin 40% tom distilling co", |_, _| {})
            .await
            .unwrap();
        let order: Vec<FieldName> = results.iter().map(|r| r.field).collect();
        assert_eq!(
            order,
            vec![FieldName::BrandName, FieldName::AlcoholContent, FieldName::ManufacturerName]
        );
    }

    #[tokio::test]
    async fn verify_all_reports_progress_per_field() {
        let fields = vec![
            entry(FieldName::BrandName, "a"),
            entry(FieldName::ProductClass, ""),
            entry(FieldName::AlcoholContent, "b"),
        ];
        let mut seen = Vec::new();
        verify_all(&fields, "a b", |done, total| seen.push((done, total)))
            .await
            .unwrap();
        assert_eq!(seen, vec![(1, 2), (2, 2)]);
    }

    #[tokio::test]
    async fn verify_all_six_exact_fields() {
        let text = "old tom distillery kentucky straight bourbon whiskey 45% alc/vol 750 ml \
                    bottled by old tom distilling co louisville ky";
        let fields = vec![
            entry(FieldName::BrandName, "Old Tom Distillery"),
            entry(FieldName::ProductClass, "Kentucky Straight Bourbon Whiskey"),
            entry(FieldName::AlcoholContent, "45% ALC/VOL"),
            entry(FieldName::NetContents, "750 ML"),
            entry(FieldName::ManufacturerName, "Old Tom Distilling Co"),
            entry(FieldName::ManufacturerAddress, "Louisville KY"),
        ];
        let results = verify_all(&fields, text, |_, _| {}).await.unwrap();
        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|r| r.matched && r.confidence == 1.0));
    }

    #[tokio::test]
    async fn verify_all_rejects_empty_text() {
        let fields = vec![entry(FieldName::BrandName, "ABC")];
        let err = verify_all(&fields, " \n ", |_, _| {}).await.unwrap_err();
        assert_eq!(err, VerifyError::EmptyText);
    }
}
