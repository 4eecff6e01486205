//! MCQ segmentation over normalized, page-concatenated text.
//!
//! Lines are classified lexically ([`lines`]) and fed through an explicit
//! state machine ([`machine`]). Finished drafts are turned into
//! [`Question`]s here: numbering, answer resolution and completeness scoring.

pub mod lines;
pub mod machine;

use crate::model::{Question, QuestionOption};
use lines::AnswerRef;
use machine::{Draft, Effect, State};

/// Options a complete question is expected to have.
const EXPECTED_OPTIONS: usize = 4;

/// Penalties applied to a question's completeness confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidencePenalties {
    pub empty_text: f32,
    pub too_few_options: f32,
    pub per_missing_option: f32,
    pub no_answer: f32,
    pub out_of_order: f32,
}

impl Default for ConfidencePenalties {
    fn default() -> Self {
        Self {
            empty_text: 0.3,
            too_few_options: 0.4,
            per_missing_option: 0.05,
            no_answer: 0.1,
            out_of_order: 0.1,
        }
    }
}

/// Segments text into questions.
#[derive(Debug, Clone, Default)]
pub struct McqDetector {
    penalties: ConfidencePenalties,
}

impl McqDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use custom completeness penalties.
    pub fn with_penalties(mut self, penalties: ConfidencePenalties) -> Self {
        self.penalties = penalties;
        self
    }

    /// Detect all questions in `text`, in document order.
    pub fn detect(&self, text: &str) -> Vec<Question> {
        let mut questions = Vec::new();
        let mut previous: Option<u32> = None;
        let mut state = State::SeekingQuestion;

        for raw in text.lines() {
            let (next, effect) = machine::transition(state, lines::classify(raw));
            state = next;
            if let Effect::Emit(draft) = effect {
                questions.push(self.finalize(draft, &mut previous, questions.len()));
            }
        }
        if let Some(draft) = machine::finish(state) {
            questions.push(self.finalize(draft, &mut previous, questions.len()));
        }

        log::debug!("detected {} questions", questions.len());
        questions
    }

    fn finalize(&self, draft: Draft, previous: &mut Option<u32>, seen: usize) -> Question {
        let value = draft.value.unwrap_or(previous.map_or(seen as u32 + 1, |p| p + 1));
        let number = draft.number.clone().unwrap_or_else(|| value.to_string());

        let out_of_order = previous.is_some_and(|p| value <= p);
        if out_of_order {
            log::warn!(
                "question {} follows {} out of order",
                number,
                previous.unwrap_or_default()
            );
        }
        *previous = Some(value);

        let correct_answer = draft.answer.as_ref().and_then(|a| resolve_answer(a, &draft));
        let options: Vec<QuestionOption> = draft
            .options
            .into_iter()
            .map(|o| QuestionOption::new(o.label.text, o.text))
            .collect();

        let mut question = Question {
            question_number: number,
            question_text: draft.text,
            options,
            correct_answer,
            confidence: 0.0,
            out_of_order,
        };
        question.confidence = self.completeness(&question);
        question
    }

    /// Completeness confidence in `[0, 1]`.
    pub fn completeness(&self, question: &Question) -> f32 {
        let p = &self.penalties;
        let mut confidence = 1.0f32;
        if question.question_text.trim().is_empty() {
            confidence -= p.empty_text;
        }
        let count = question.options.len();
        if count < 2 {
            confidence -= p.too_few_options;
        } else if count < EXPECTED_OPTIONS {
            confidence -= p.per_missing_option * (EXPECTED_OPTIONS - count) as f32;
        }
        if question.correct_answer.is_none() {
            confidence -= p.no_answer;
        }
        if question.out_of_order {
            confidence -= p.out_of_order;
        }
        confidence.clamp(0.0, 1.0)
    }
}

/// Map an answer marker onto the question's own labels.
///
/// Labels are matched exactly first, then by position so that `B`, `ख`,
/// `2` and `ii` all name the second option. Answer text is matched against
/// option texts. Without options the label is kept as written.
fn resolve_answer(answer: &AnswerRef, draft: &Draft) -> Option<String> {
    match answer {
        AnswerRef::Label(label) => {
            if draft.options.is_empty() {
                return Some(label.text.clone());
            }
            if let Some(option) = draft.options.iter().find(|o| o.label.text == label.text) {
                return Some(option.label.text.clone());
            }
            match draft.options.iter().find(|o| o.label.index == label.index) {
                Some(option) => Some(option.label.text.clone()),
                None => {
                    log::debug!("answer {} names no option", label.text);
                    Some(label.text.clone())
                }
            }
        }
        AnswerRef::Text(text) => {
            let wanted = text.trim().to_lowercase();
            draft
                .options
                .iter()
                .find(|o| o.text.trim().to_lowercase() == wanted)
                .or_else(|| {
                    draft.options.iter().find(|o| {
                        let option = o.text.trim().to_lowercase();
                        !option.is_empty() && wanted.starts_with(&option)
                    })
                })
                .map(|o| o.label.text.clone())
        }
    }
}
