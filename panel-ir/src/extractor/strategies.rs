//! Extraction strategies, in fallback order

use super::{Candidate, ExtractionStrategy, FieldSpec};

/// Confidence assigned to a structured-pattern match
pub const STRUCTURED_CONFIDENCE: f64 = 0.95;

/// Score for an exact label hit with a `label: value` delimiter
const EXACT_DELIMITED_SCORE: f64 = 1.0;
/// Score for an exact label hit where the value is the next token
const EXACT_TRAILING_SCORE: f64 = 0.9;

// ============================================================================
// Structured pattern
// ============================================================================

/// Field regex applied to the newline-joined text
///
/// The value is the first participating capture group with internal
/// whitespace collapsed.
/// Provenance is the first raw line containing the value verbatim.
pub struct StructuredPattern;

impl ExtractionStrategy for StructuredPattern {
    fn name(&self) -> &'static str {
        "structured_pattern"
    }

    fn find(&self, lines: &[&str], spec: &FieldSpec) -> Option<Candidate> {
        let pattern = spec.pattern.as_ref()?;
        let joined = lines.join("\n");
        let captures = pattern.captures(&joined)?;
        let raw = captures.iter().skip(1).flatten().next()?.as_str();
        let value = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if value.is_empty() {
            return None;
        }

        let source_line = lines
            .iter()
            .find(|line| line.contains(value.as_str()))
            .map(|line| line.to_string());

        Some(Candidate {
            value,
            confidence: STRUCTURED_CONFIDENCE,
            match_score: 1.0,
            source_line,
        })
    }
}

// ============================================================================
// Label variant scan
// ============================================================================

/// Per-line label matching
///
/// For every line and every variant:
/// - variant contained in the line as a whole word and the line has a
///   colon: value after the colon, score 1.0
/// - variant contained, no colon: first token after the variant, score 0.9
/// - otherwise normalized similarity between line and variant; at or above
///   the threshold and with a colon, value after the colon, score = ratio
///
/// The highest score wins; ties keep the first candidate in line order.
pub struct LabelVariantScan {
    threshold: f64,
}

impl LabelVariantScan {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    fn score_line(&self, line: &str, variant: &str) -> Option<(String, f64)> {
        // ASCII upper-casing keeps byte offsets aligned with `line`
        let upper = line.to_ascii_uppercase();

        if let Some(idx) = find_word(&upper, variant) {
            if let Some((_, after)) = line.split_once(':') {
                let value = after.trim();
                return (!value.is_empty()).then(|| (value.to_string(), EXACT_DELIMITED_SCORE));
            }
            let after = line[idx + variant.len()..]
                .trim_start_matches(|c: char| c == '=' || c == '-' || c.is_whitespace());
            return after
                .split_whitespace()
                .next()
                .map(|token| (token.to_string(), EXACT_TRAILING_SCORE));
        }

        let ratio = strsim::normalized_levenshtein(&line.to_uppercase(), variant);
        if ratio < self.threshold {
            return None;
        }
        let (_, after) = line.split_once(':')?;
        let value = after.trim();
        (!value.is_empty()).then(|| (value.to_string(), ratio))
    }
}

/// Byte offset of `variant` in `upper` where it is not part of a longer word
fn find_word(upper: &str, variant: &str) -> Option<usize> {
    upper.match_indices(variant).map(|(idx, _)| idx).find(|&idx| {
        let before = upper[..idx].chars().next_back();
        let after = upper[idx + variant.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

impl ExtractionStrategy for LabelVariantScan {
    fn name(&self) -> &'static str {
        "label_variant_scan"
    }

    fn find(&self, lines: &[&str], spec: &FieldSpec) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;

        for line in lines {
            for variant in &spec.variants {
                let Some((value, score)) = self.score_line(line, variant) else {
                    continue;
                };
                if best.as_ref().map_or(true, |b| score > b.match_score) {
                    best = Some(Candidate {
                        value,
                        confidence: score,
                        match_score: score,
                        source_line: Some(line.to_string()),
                    });
                }
            }
        }

        best
    }
}
