//! Plain text rendering of detected questions.

use std::fmt::Write;

use crate::model::{ExtractionResult, Question};

/// Render questions as a readable listing, one block per question.
///
/// The correct option is marked with `*`.
pub fn to_text(result: &ExtractionResult) -> String {
    let mut output = String::new();
    for (i, question) in result.questions.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        write_question(&mut output, question);
    }
    output.trim_end().to_string()
}

fn write_question(output: &mut String, question: &Question) {
    let _ = writeln!(
        output,
        "{}. {}",
        question.question_number, question.question_text
    );
    for option in &question.options {
        let marker = if question.correct_answer.as_deref() == Some(option.label.as_str()) {
            '*'
        } else {
            ' '
        };
        let _ = writeln!(output, "  {} ({}) {}", marker, option.label, option.text);
    }
    if let Some(answer) = &question.correct_answer {
        if question.option(answer).is_none() {
            let _ = writeln!(output, "  उत्तर: {}", answer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionOption;

    #[test]
    fn test_to_text() {
        let result = ExtractionResult {
            questions: vec![Question {
                question_number: "1".to_string(),
                question_text: "भारत की राजधानी क्या है?".to_string(),
                options: vec![
                    QuestionOption::new("A", "मुंबई"),
                    QuestionOption::new("B", "दिल्ली"),
                ],
                correct_answer: Some("B".to_string()),
                confidence: 0.95,
                out_of_order: false,
            }],
            ..Default::default()
        };

        let text = to_text(&result);
        assert_eq!(
            text,
            "1. भारत की राजधानी क्या है?\n    (A) मुंबई\n  * (B) दिल्ली"
        );
    }

    #[test]
    fn test_empty_result() {
        assert_eq!(to_text(&ExtractionResult::default()), "");
    }
}
