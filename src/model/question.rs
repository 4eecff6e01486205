//! Structured question types.

use serde::{Deserialize, Serialize};

/// A labeled answer choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    /// Label as printed, Latin letters uppercased (e.g. "A", "ख", "1")
    pub label: String,

    /// Option text
    pub text: String,
}

impl QuestionOption {
    /// Create a new option.
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

/// A multiple-choice question recovered from the document text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Question number exactly as printed ("1", "१", "एक", ...)
    pub question_number: String,

    /// Question text, continuation lines joined with single spaces
    pub question_text: String,

    /// Options in source order; labels are unique
    pub options: Vec<QuestionOption>,

    /// Label of the correct option, when an answer marker was found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,

    /// Completeness confidence in `[0, 1]`
    pub confidence: f32,

    /// Number did not increase over the previous question
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub out_of_order: bool,
}

impl Question {
    /// Look up an option by label.
    pub fn option(&self, label: &str) -> Option<&QuestionOption> {
        self.options.iter().find(|o| o.label == label)
    }

    /// Whether the question has the structure of a usable MCQ.
    pub fn is_complete(&self) -> bool {
        !self.question_text.is_empty() && self.options.len() >= 2 && self.correct_answer.is_some()
    }

    /// Option labels in order.
    pub fn labels(&self) -> Vec<&str> {
        self.options.iter().map(|o| o.label.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Question {
        Question {
            question_number: "1".to_string(),
            question_text: "भारत की राजधानी क्या है?".to_string(),
            options: vec![
                QuestionOption::new("A", "मुंबई"),
                QuestionOption::new("B", "दिल्ली"),
            ],
            correct_answer: Some("B".to_string()),
            confidence: 0.9,
            out_of_order: false,
        }
    }

    #[test]
    fn test_option_lookup() {
        let q = sample();
        assert_eq!(q.option("B").map(|o| o.text.as_str()), Some("दिल्ली"));
        assert!(q.option("C").is_none());
        assert_eq!(q.labels(), vec!["A", "B"]);
        assert!(q.is_complete());
    }

    #[test]
    fn test_serialized_keys() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["question_number"], "1");
        assert_eq!(json["correct_answer"], "B");
        assert_eq!(json["options"][1]["label"], "B");
        assert!(json.get("out_of_order").is_none());

        let mut q = sample();
        q.correct_answer = None;
        q.out_of_order = true;
        let json = serde_json::to_value(q).unwrap();
        assert!(json.get("correct_answer").is_none());
        assert_eq!(json["out_of_order"], true);
    }
}
