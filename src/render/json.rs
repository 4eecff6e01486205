//! JSON rendering for extraction results.

use serde::Serialize;

use crate::error::{Error, Result};

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Serialize an extraction result (or any part of one) to JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T, format: JsonFormat) -> Result<String> {
    let result = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(value),
        JsonFormat::Compact => serde_json::to_string(value),
    };

    result.map_err(|e| Error::Serialize(format!("JSON serialization error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExtractionResult, Question, QuestionOption};

    fn sample() -> ExtractionResult {
        ExtractionResult {
            full_text: "प्रश्न 1. कौन?".to_string(),
            questions: vec![Question {
                question_number: "1".to_string(),
                question_text: "कौन?".to_string(),
                options: vec![QuestionOption::new("A", "राम"), QuestionOption::new("B", "श्याम")],
                correct_answer: Some("A".to_string()),
                confidence: 0.9,
                out_of_order: false,
            }],
            overall_confidence: 0.8,
            ..Default::default()
        }
    }

    #[test]
    fn test_to_json_pretty() {
        let json = to_json(&sample(), JsonFormat::Pretty).unwrap();
        assert!(json.contains("\"question_number\""));
        assert!(json.contains("राम"));
        assert!(json.contains('\n'));
    }

    #[test]
    fn test_to_json_compact() {
        let json = to_json(&sample(), JsonFormat::Compact).unwrap();
        assert!(!json.contains('\n'));
    }

    #[test]
    fn test_round_trip_keeps_questions() {
        let json = to_json(&sample(), JsonFormat::Compact).unwrap();
        let back: ExtractionResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.questions, sample().questions);
    }
}
