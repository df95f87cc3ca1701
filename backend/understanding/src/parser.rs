//! Scrapes a structured result out of free-form vision model output.
//!
//! The model is asked to answer with "Summary: ... Confidence: N ...
//! Recommendations: ...". Nothing enforces that shape, so every extractor
//! falls back to a fixed default instead of failing.

use once_cell::sync::Lazy;
use regex::Regex;

use oracare_core::types::{AnalysisResult, MAX_CONFIDENCE};

pub const NO_SUMMARY: &str = "No summary available";
pub const NO_RECOMMENDATIONS: &str = "No specific recommendations available";
pub const DEFAULT_CONFIDENCE: u8 = 50;

/// Everything between "Summary" and the next "Confidence" (or end of text).
static SUMMARY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)Summary:?(.*?)(?:Confidence|\z)").unwrap());

static CONFIDENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Confidence:?\s*([0-9]+)").unwrap());

static RECOMMENDATIONS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)Recommendations:?(.*)").unwrap());

pub fn extract_summary(text: &str) -> String {
    SUMMARY_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| NO_SUMMARY.to_string())
}

/// First digit run after "Confidence", clamped to `[0, 100]`.
pub fn extract_confidence(text: &str) -> u8 {
    let Some(digits) = CONFIDENCE_RE.captures(text).and_then(|caps| caps.get(1)) else {
        return DEFAULT_CONFIDENCE;
    };
    // Too many digits to fit still means "more than 100".
    let value = digits.as_str().parse::<u64>().unwrap_or(u64::MAX);
    value.min(u64::from(MAX_CONFIDENCE)) as u8
}

pub fn extract_recommendations(text: &str) -> String {
    RECOMMENDATIONS_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| NO_RECOMMENDATIONS.to_string())
}

/// Run all three extractors over one model answer.
pub fn parse_analysis(text: &str) -> AnalysisResult {
    AnalysisResult {
        summary: extract_summary(text),
        confidence: extract_confidence(text),
        recommendations: extract_recommendations(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_template_answer() {
        let result = parse_analysis("Summary: X Confidence: 73 Recommendations: Y");
        assert_eq!(result.summary, "X");
        assert_eq!(result.confidence, 73);
        assert_eq!(result.recommendations, "Y");
    }

    #[test]
    fn parses_mild_irritation_answer() {
        let text = "Summary: Mild irritation noted. Confidence: 42 Recommendations: Monitor and revisit in two weeks.";
        let result = parse_analysis(text);
        assert_eq!(result.summary, "Mild irritation noted.");
        assert_eq!(result.confidence, 42);
        assert_eq!(result.recommendations, "Monitor and revisit in two weeks.");
    }

    #[test]
    fn missing_confidence_defaults_to_fifty() {
        assert_eq!(extract_confidence("Summary: nothing to see"), 50);
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(extract_confidence("Confidence: 250"), 100);
        assert_eq!(extract_confidence("Confidence: 0"), 0);
        assert_eq!(extract_confidence("Confidence: 99999999999999999999999"), 100);
        // A minus sign is not part of the digit run.
        assert_eq!(extract_confidence("Confidence: -20"), 50);
        for n in [0u32, 1, 50, 99, 100, 101, 1000] {
            let value = extract_confidence(&format!("Confidence {n}"));
            assert!(value <= 100);
        }
    }

    #[test]
    fn missing_markers_use_fallbacks() {
        let result = parse_analysis("The image looks fine.");
        assert_eq!(result.summary, NO_SUMMARY);
        assert_eq!(result.recommendations, NO_RECOMMENDATIONS);
        assert_eq!(result.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn case_insensitive_and_multiline() {
        let text = "**SUMMARY**:\nSmall white patch\non the left buccal mucosa.\n\nconfidence: 65%\n\nRECOMMENDATIONS:\n- See a dentist\n- Avoid tobacco\n";
        let result = parse_analysis(text);
        assert_eq!(result.summary, "**:\nSmall white patch\non the left buccal mucosa.");
        assert_eq!(result.confidence, 65);
        assert_eq!(result.recommendations, "- See a dentist\n- Avoid tobacco");
    }

    #[test]
    fn summary_without_confidence_runs_to_end() {
        let result = parse_analysis("Summary: only this");
        assert_eq!(result.summary, "only this");
    }

    #[test]
    fn numbered_template_from_prompt() {
        let text = "1. Summary of findings: No lesions visible.\n2. Confidence score (0-100): 80\n3. Specific recommendations: Routine check-up.";
        let result = parse_analysis(text);
        assert_eq!(result.summary, "of findings: No lesions visible.\n2.");
        // Digits have to follow the marker directly.
        assert_eq!(result.confidence, DEFAULT_CONFIDENCE);
        assert_eq!(result.recommendations, "Routine check-up.");
    }
}
