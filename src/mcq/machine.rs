//! The question segmentation state machine.
//!
//! `transition` is a pure function of the current state and one classified
//! line. It never looks ahead and never inspects raw text, so every policy
//! below can be tested line by line.

use super::lines::{split_inline, AnswerRef, Label, LabelFamily, Line, NumberStyle, OptionItem};

/// A question under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    /// Number as printed, if the marker carried one
    pub number: Option<String>,
    pub value: Option<u32>,
    pub text: String,
    pub options: Vec<OptionItem>,
    pub answer: Option<AnswerRef>,
    /// Style of a bare-number stem ("4." or "(4)")
    pub marker: Option<NumberStyle>,
    /// Style of digit option labels, once the first one is seen
    pub option_style: Option<NumberStyle>,
}

impl Draft {
    fn new(number: Option<String>, value: Option<u32>, text: String) -> Self {
        Self {
            number,
            value,
            text,
            options: Vec::new(),
            answer: None,
            marker: None,
            option_style: None,
        }
    }

    fn bare(number: String, value: u32, text: String, style: NumberStyle) -> Self {
        Self {
            marker: Some(style),
            ..Self::new(Some(number), Some(value), text)
        }
    }

    fn append_text(&mut self, line: &str) {
        append(&mut self.text, line);
    }

    /// Add an option; a repeated label continues the current option instead.
    fn push_option(&mut self, item: OptionItem) {
        if self.options.iter().any(|o| o.label.text == item.label.text) {
            if let Some(last) = self.options.last_mut() {
                append(&mut last.text, &format!("{}) {}", item.label.raw, item.text));
            }
            return;
        }
        self.options.push(item);
    }

    /// Whether a bare number continues a digit-labeled option list.
    ///
    /// The number must be the next label in sequence and written like the
    /// labels before it. After a "4." stem with two or more options, "5."
    /// is the next stem even when it would also be the next label.
    fn accepts_numeric_option(&self, value: u32, style: NumberStyle) -> bool {
        let Some(first) = self.options.first() else {
            return value == 1;
        };
        if first.label.family != LabelFamily::Digit || value as usize != self.options.len() + 1 {
            return false;
        }
        if self.option_style.is_some_and(|s| s != style) {
            return false;
        }
        let next_stem = self.marker == Some(style) && self.value.is_some_and(|q| q + 1 == value);
        !(next_stem && self.options.len() >= 2)
    }
}

fn append(target: &mut String, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(line);
}

/// Detector state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    SeekingQuestion,
    InQuestionBody(Draft),
    InOptions(Draft),
}

/// Side effect of a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    /// A question is complete
    Emit(Draft),
}

/// Advance the machine by one line.
pub fn transition(state: State, line: Line) -> (State, Effect) {
    match (state, line) {
        // Page breaks and blank lines never change state, so an open
        // question continues across pages.
        (state, Line::Blank) | (state, Line::PageBreak) => (state, Effect::None),

        (State::SeekingQuestion, Line::Question { number, value, text }) => (
            State::InQuestionBody(Draft::new(number, value, text)),
            Effect::None,
        ),
        (State::SeekingQuestion, Line::Numbered { number, value, text, style }) => (
            State::InQuestionBody(Draft::bare(number, value, text, style)),
            Effect::None,
        ),
        (State::SeekingQuestion, _) => (State::SeekingQuestion, Effect::None),

        (State::InQuestionBody(draft) | State::InOptions(draft), Line::Question { number, value, text }) => (
            State::InQuestionBody(Draft::new(number, value, text)),
            Effect::Emit(draft),
        ),

        (
            State::InQuestionBody(mut draft) | State::InOptions(mut draft),
            Line::Numbered { number, value, text, style },
        ) => {
            let label = draft
                .accepts_numeric_option(value, style)
                .then(|| Label::parse(&number))
                .flatten();
            match label {
                Some(label) => {
                    draft.option_style = Some(style);
                    for item in split_inline(label, &text) {
                        draft.push_option(item);
                    }
                    (State::InOptions(draft), Effect::None)
                }
                None => (
                    State::InQuestionBody(Draft::bare(number, value, text, style)),
                    Effect::Emit(draft),
                ),
            }
        }

        (State::InQuestionBody(mut draft) | State::InOptions(mut draft), Line::Options(items)) => {
            for item in items {
                draft.push_option(item);
            }
            (State::InOptions(draft), Effect::None)
        }

        (State::InQuestionBody(mut draft), Line::Answer(answer)) => {
            draft.answer = Some(answer);
            (State::InQuestionBody(draft), Effect::None)
        }
        (State::InOptions(mut draft), Line::Answer(answer)) => {
            draft.answer = Some(answer);
            (State::InOptions(draft), Effect::None)
        }

        (State::InQuestionBody(mut draft), Line::Text(text)) => {
            draft.append_text(&text);
            (State::InQuestionBody(draft), Effect::None)
        }
        (State::InOptions(mut draft), Line::Text(text)) => {
            if let Some(last) = draft.options.last_mut() {
                append(&mut last.text, &text);
            }
            (State::InOptions(draft), Effect::None)
        }
    }
}

/// Close the machine at end of input.
pub fn finish(state: State) -> Option<Draft> {
    match state {
        State::SeekingQuestion => None,
        State::InQuestionBody(draft) | State::InOptions(draft) => Some(draft),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcq::lines::classify;

    fn run(lines: &[&str]) -> (Vec<Draft>, State) {
        let mut state = State::SeekingQuestion;
        let mut emitted = Vec::new();
        for line in lines {
            let (next, effect) = transition(state, classify(line));
            if let Effect::Emit(draft) = effect {
                emitted.push(draft);
            }
            state = next;
        }
        (emitted, state)
    }

    #[test]
    fn test_question_then_options() {
        let (emitted, state) = run(&["प्रश्न 1. भारत की राजधानी क्या है?", "A) मुंबई", "B) दिल्ली"]);
        assert!(emitted.is_empty());
        match state {
            State::InOptions(draft) => {
                assert_eq!(draft.number.as_deref(), Some("1"));
                assert_eq!(draft.options.len(), 2);
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn test_new_question_in_options_goes_straight_to_body() {
        let (state, effect) = transition(
            State::InOptions(Draft::new(Some("1".into()), Some(1), "q".into())),
            classify("प्रश्न 2. अगला"),
        );
        assert!(matches!(effect, Effect::Emit(_)));
        assert!(matches!(state, State::InQuestionBody(ref d) if d.text == "अगला"));
    }

    #[test]
    fn test_blank_and_page_break_are_no_ops() {
        let draft = Draft::new(Some("3".into()), Some(3), "आधा".into());
        for line in [Line::Blank, Line::PageBreak] {
            let (state, effect) = transition(State::InQuestionBody(draft.clone()), line);
            assert_eq!(state, State::InQuestionBody(draft.clone()));
            assert_eq!(effect, Effect::None);
        }
    }

    #[test]
    fn test_continuation_lines() {
        let (_, state) = run(&[
            "प्रश्न 7. निम्नलिखित में से कौन",
            "सा ग्रह सबसे बड़ा है?",
            "(क) पृथ्वी",
            "और मंगल",
        ]);
        match state {
            State::InOptions(draft) => {
                assert_eq!(draft.text, "निम्नलिखित में से कौन सा ग्रह सबसे बड़ा है?");
                assert_eq!(draft.options[0].text, "पृथ्वी और मंगल");
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn test_numeric_options_versus_next_question() {
        let (emitted, state) = run(&[
            "प्रश्न 1. सही संख्या चुनें",
            "1. दस",
            "2. बीस",
            "3. तीस",
            "2. अगला प्रश्न",
        ]);
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].options.len(), 3);
        assert_eq!(emitted[0].options[2].label.text, "3");
        assert!(matches!(state, State::InQuestionBody(ref d) if d.value == Some(2)));
    }

    #[test]
    fn test_bare_stem_after_bracketed_digit_options() {
        let (emitted, state) = run(&[
            "4. भारत की राजधानी क्या है?",
            "(1) मुंबई (2) दिल्ली (3) चेन्नई (4) कोलकाता",
            "5. सबसे बड़ा ग्रह कौन सा है?",
        ]);
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].options.len(), 4);
        assert_eq!(emitted[0].option_style, Some(NumberStyle::Paren));
        assert!(matches!(state, State::InQuestionBody(ref d) if d.value == Some(5)));
    }

    #[test]
    fn test_same_style_stem_and_options() {
        // "5." follows a "4." stem: next question, not a fifth option.
        let (emitted, state) =
            run(&["4. पहला", "1. क", "2. ख", "3. ग", "4. घ", "5. अगला"]);
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].options.len(), 4);
        assert!(matches!(state, State::InQuestionBody(ref d) if d.value == Some(5)));

        // After an explicit stem the same numbers stay options.
        let (emitted, state) = run(&["प्रश्न 3. कौन?", "1. क", "2. ख", "3. ग", "4. घ"]);
        assert!(emitted.is_empty());
        assert!(matches!(state, State::InOptions(ref d) if d.options.len() == 4));
    }

    #[test]
    fn test_bare_numbers_start_questions() {
        let (emitted, state) = run(&["1. पहला प्रश्न", "A) हाँ", "B) नहीं", "2. दूसरा प्रश्न"]);
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].text, "पहला प्रश्न");
        assert!(matches!(state, State::InQuestionBody(ref d) if d.number.as_deref() == Some("2")));
    }

    #[test]
    fn test_duplicate_label_is_continuation() {
        let (_, state) = run(&["प्रश्न 1. कौन?", "A) पहला", "B) दूसरा", "B) फिर से"]);
        match state {
            State::InOptions(draft) => {
                assert_eq!(draft.options.len(), 2);
                assert_eq!(draft.options[1].text, "दूसरा B) फिर से");
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn test_answer_does_not_start_option() {
        let (_, state) = run(&["प्रश्न 1. कौन?", "A) पहला", "उत्तर: A"]);
        match state {
            State::InOptions(draft) => {
                assert_eq!(draft.options.len(), 1);
                assert!(matches!(draft.answer, Some(AnswerRef::Label(ref l)) if l.text == "A"));
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn test_seeking_ignores_stray_lines() {
        let (emitted, state) = run(&["अध्याय 3", "A) अकेला विकल्प", "उत्तर: A"]);
        assert!(emitted.is_empty());
        assert_eq!(state, State::SeekingQuestion);
        assert_eq!(finish(state), None);
    }
}
