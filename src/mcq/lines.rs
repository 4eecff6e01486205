//! Line classification for the MCQ state machine.
//!
//! Every input line maps to exactly one [`Line`]. Classification is purely
//! lexical; whether a bare number starts a question or an option is decided
//! by the state machine.

use std::sync::LazyLock;

use regex::Regex;

/// Page boundary marker inserted between page texts.
pub const PAGE_BREAK: char = '\u{000C}';

const NUM: &str = r"(?:[0-9]+|[०-९]+|एक|दो|तीन|चार|पाँच|पांच|छह|छः|सात|आठ|नौ|दस|ग्यारह|बारह|तेरह|चौदह|पंद्रह|पन्द्रह|सोलह|सत्रह|अठारह|उन्नीस|बीस)";

const LABEL: &str = r"(?:[A-Ea-e]|[कखगघङच]|iv|iii|ii|i|IV|III|II|I)";

const NUMBER_WORDS: &[&str] = &[
    "एक", "दो", "तीन", "चार", "पाँच", "छह", "सात", "आठ", "नौ", "दस", "ग्यारह", "बारह", "तेरह",
    "चौदह", "पंद्रह", "सोलह", "सत्रह", "अठारह", "उन्नीस", "बीस",
];

const DEVANAGARI_LABELS: &[char] = &['क', 'ख', 'ग', 'घ', 'ङ', 'च'];

const ROMAN_LABELS: &[&str] = &["i", "ii", "iii", "iv"];

static HINDI_QUESTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^\s*(?:प्रश्न|प्र\.)\s*(?:संख्या|सं\.)?\s*[-:.]?\s*\(?({NUM})\)?(?:\s*[.:)\-–]\s*|\s+|$)(.*)$"
    ))
    .unwrap()
});

static LATIN_QUESTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)^\s*(?:question|ques|que|q)\s*(?:no\.?)?\s*[.:\-]?\s*\(?({NUM})\)?(?:\s*[.:)\-]\s*|\s+|$)(.*)$"
    ))
    .unwrap()
});

static HINDI_QUESTION_UNNUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*प्रश्न\s*[:.\-–]\s*(.*)$").unwrap());

static LATIN_QUESTION_UNNUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:question|ques|que|q)\s*[.:\-]\s*(.*)$").unwrap());

static BARE_PAREN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^\s*\(\s*({NUM})\s*\)\s*(.*)$")).unwrap());

static BARE_DOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^\s*({NUM})\s*[.)](?:\s+|$)(.*)$")).unwrap());

static OPTION_BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^\s*[\(\[]\s*({LABEL})\s*[\)\]]\s*(.*)$")).unwrap());

static OPTION_PLAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^\s*({LABEL})\s*(?:\)\s*|[.:](?:\s+|$))(.*)$")).unwrap());

static ANSWER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:सही\s+)?(?:उत्तर|उ\.|correct\s+answer|answer|ans)\s*(?P<sep>[:\-–=.]|\s)\s*(?P<rest>.*)$",
    )
    .unwrap()
});

/// Script family of an option label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelFamily {
    Latin,
    Devanagari,
    Digit,
    Roman,
}

/// How a bare number was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberStyle {
    /// "(3)"
    Paren,
    /// "3." or "3)"
    Dot,
}

/// An option label with its position in its family's sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Normalized form: Latin uppercased, Roman lowercased
    pub text: String,
    /// As written, used to find the next label on the same line
    pub raw: String,
    pub family: LabelFamily,
    /// 0-based position (A, क, 1 and i are all 0)
    pub index: usize,
}

impl Label {
    /// Parse a bare label token.
    pub fn parse(token: &str) -> Option<Label> {
        let mut chars = token.chars();
        let first = chars.next()?;
        let single = chars.next().is_none();

        if single && ('A'..='E').contains(&first.to_ascii_uppercase()) && first.is_ascii() {
            let upper = first.to_ascii_uppercase();
            return Some(Label {
                text: upper.to_string(),
                raw: token.to_string(),
                family: LabelFamily::Latin,
                index: (upper as u8 - b'A') as usize,
            });
        }
        if single {
            if let Some(index) = DEVANAGARI_LABELS.iter().position(|&c| c == first) {
                return Some(Label {
                    text: token.to_string(),
                    raw: token.to_string(),
                    family: LabelFamily::Devanagari,
                    index,
                });
            }
        }
        let lower = token.to_ascii_lowercase();
        if let Some(index) = ROMAN_LABELS.iter().position(|r| *r == lower) {
            return Some(Label {
                text: lower,
                raw: token.to_string(),
                family: LabelFamily::Roman,
                index,
            });
        }
        if let Some(value) = digits_value(token) {
            if (1..=10).contains(&value) {
                return Some(Label {
                    text: token.to_string(),
                    raw: token.to_string(),
                    family: LabelFamily::Digit,
                    index: value as usize - 1,
                });
            }
        }
        None
    }

    /// The label that follows this one, written in the same script and case.
    pub fn successor(&self) -> Option<String> {
        let next = self.index + 1;
        match self.family {
            LabelFamily::Latin => {
                let base = if self.raw.chars().all(|c| c.is_ascii_lowercase()) {
                    b'a'
                } else {
                    b'A'
                };
                (next < 5).then(|| ((base + next as u8) as char).to_string())
            }
            LabelFamily::Devanagari => DEVANAGARI_LABELS.get(next).map(|c| c.to_string()),
            LabelFamily::Roman => ROMAN_LABELS.get(next).map(|r| {
                if self.raw.chars().all(|c| c.is_ascii_uppercase()) {
                    r.to_ascii_uppercase()
                } else {
                    r.to_string()
                }
            }),
            LabelFamily::Digit => {
                let value = next as u32 + 1;
                if self.raw.chars().all(|c| c.is_ascii_digit()) {
                    Some(value.to_string())
                } else {
                    Some(to_devanagari_digits(value))
                }
            }
        }
    }
}

/// One option on a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionItem {
    pub label: Label,
    pub text: String,
}

/// What an answer marker points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerRef {
    Label(Label),
    Text(String),
}

/// A classified input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Blank,
    PageBreak,
    /// Explicit question marker ("प्रश्न 3.", "Q.3", "Q.")
    Question {
        number: Option<String>,
        value: Option<u32>,
        text: String,
    },
    /// Bare "(3)" or "3." prefix: a question or a numeric option
    Numbered {
        number: String,
        value: u32,
        text: String,
        style: NumberStyle,
    },
    Options(Vec<OptionItem>),
    Answer(AnswerRef),
    Text(String),
}

struct Candidate {
    specificity: u8,
    marker_len: usize,
    line: Line,
}

/// Classify one line.
pub fn classify(line: &str) -> Line {
    if line.contains(PAGE_BREAK) && line.chars().all(|c| c == PAGE_BREAK || c.is_whitespace()) {
        return Line::PageBreak;
    }
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Line::Blank;
    }
    if let Some(answer) = answer(trimmed) {
        return Line::Answer(answer);
    }
    if let Some(question) = question_marker(trimmed) {
        return question;
    }
    if let Some(options) = options(trimmed) {
        return Line::Options(options);
    }
    Line::Text(trimmed.to_string())
}

/// Pick the most specific question pattern; the longer marker wins ties.
fn question_marker(line: &str) -> Option<Line> {
    let mut candidates: Vec<Candidate> = Vec::new();

    for re in [&*HINDI_QUESTION, &*LATIN_QUESTION] {
        if let Some(caps) = re.captures(line) {
            let number = caps[1].to_string();
            let text = caps[2].trim().to_string();
            candidates.push(Candidate {
                specificity: 3,
                marker_len: line.len() - caps[2].len(),
                line: Line::Question {
                    value: number_value(&number),
                    number: Some(number),
                    text,
                },
            });
        }
    }
    for re in [&*HINDI_QUESTION_UNNUMBERED, &*LATIN_QUESTION_UNNUMBERED] {
        if let Some(caps) = re.captures(line) {
            candidates.push(Candidate {
                specificity: 2,
                marker_len: line.len() - caps[1].len(),
                line: Line::Question {
                    number: None,
                    value: None,
                    text: caps[1].trim().to_string(),
                },
            });
        }
    }
    for (re, style) in [(&*BARE_PAREN, NumberStyle::Paren), (&*BARE_DOT, NumberStyle::Dot)] {
        if let Some(caps) = re.captures(line) {
            let number = caps[1].to_string();
            if let Some(value) = number_value(&number) {
                candidates.push(Candidate {
                    specificity: 1,
                    marker_len: line.len() - caps[2].len(),
                    line: Line::Numbered {
                        number,
                        value,
                        text: caps[2].trim().to_string(),
                        style,
                    },
                });
            }
        }
    }

    candidates
        .into_iter()
        .max_by_key(|c| (c.specificity, c.marker_len))
        .map(|c| c.line)
}

fn options(line: &str) -> Option<Vec<OptionItem>> {
    let caps = OPTION_BRACKETED
        .captures(line)
        .or_else(|| OPTION_PLAIN.captures(line))?;
    let label = Label::parse(&caps[1])?;
    Some(split_inline(label, caps[2].trim()))
}

/// Split "100 B) 125 C) 150" following `first` into consecutive options.
pub fn split_inline(first: Label, text: &str) -> Vec<OptionItem> {
    let mut items = Vec::new();
    let mut label = first;
    let mut rest = text;

    loop {
        let next = label.successor().and_then(|raw| {
            find_inline_label(rest, &raw).and_then(|(start, end)| {
                Label::parse(&raw).map(|parsed| (start, end, parsed))
            })
        });
        match next {
            Some((start, end, next_label)) => {
                items.push(OptionItem {
                    label,
                    text: rest[..start].trim().to_string(),
                });
                label = next_label;
                rest = &rest[end..];
            }
            None => {
                items.push(OptionItem {
                    label,
                    text: rest.trim().to_string(),
                });
                return items;
            }
        }
    }
}

/// Byte range of a whitespace-preceded "(L)", "[L]", "L)" or "L." in `text`.
fn find_inline_label(text: &str, raw: &str) -> Option<(usize, usize)> {
    let forms = [
        format!("({})", raw),
        format!("[{}]", raw),
        format!("{})", raw),
        format!("{}.", raw),
    ];
    for (pos, c) in text.char_indices() {
        if !c.is_whitespace() {
            continue;
        }
        let after = pos + c.len_utf8();
        let tail = &text[after..];
        for form in &forms {
            if let Some(rest) = tail.strip_prefix(form.as_str()) {
                let dotted = form.ends_with('.');
                if dotted && !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
                    continue;
                }
                return Some((pos, after + form.len()));
            }
        }
    }
    None
}

fn answer(line: &str) -> Option<AnswerRef> {
    let caps = ANSWER.captures(line)?;
    let strict = !caps["sep"].trim().is_empty();
    let rest = caps["rest"].trim();

    let unwrapped = rest.trim_start_matches(|c: char| c == '(' || c == '[' || c.is_whitespace());
    let token: String = unwrapped
        .chars()
        .take_while(|c| !c.is_whitespace() && !"()[].:,-–".contains(*c))
        .collect();
    let text = rest.trim_matches(|c: char| "()[].:,-– ".contains(c));

    // Without a separator the label has to stand alone ("उत्तर (ख)").
    if strict || text == token {
        if let Some(label) = Label::parse(&token) {
            return Some(AnswerRef::Label(label));
        }
    }

    (strict && !text.is_empty()).then(|| AnswerRef::Text(text.to_string()))
}

/// Numeric value of a question number (Latin digits, Devanagari digits or a number word).
pub fn number_value(number: &str) -> Option<u32> {
    if let Some(v) = digits_value(number) {
        return Some(v);
    }
    match number {
        "पांच" => Some(5),
        "छः" => Some(6),
        "पन्द्रह" => Some(15),
        _ => NUMBER_WORDS
            .iter()
            .position(|w| *w == number)
            .map(|i| i as u32 + 1),
    }
}

fn digits_value(text: &str) -> Option<u32> {
    if text.is_empty() || text.chars().count() > 9 {
        return None;
    }
    let mut value = 0u32;
    for c in text.chars() {
        let d = match c {
            '0'..='9' => c as u32 - '0' as u32,
            '०'..='९' => c as u32 - '०' as u32,
            _ => return None,
        };
        value = value * 10 + d;
    }
    Some(value)
}

fn to_devanagari_digits(value: u32) -> String {
    value
        .to_string()
        .chars()
        .filter_map(|c| c.to_digit(10))
        .filter_map(|d| char::from_u32('०' as u32 + d))
        .collect()
}
