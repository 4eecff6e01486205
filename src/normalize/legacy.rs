//! Legacy 8-bit Hindi font (KrutiDev 010) detection and remapping.
//!
//! Text typed in KrutiDev renders as Devanagari only with the font
//! installed; extracted, it reads as ASCII gibberish such as
//! `Hkkjr dh jkt/kkuh`. Remapping is a greedy longest-match over a static
//! glyph table followed by the two reordering rules the font relies on:
//! the short i sign is typed before its consonant and the reph after its
//! syllable.

use std::collections::HashMap;
use std::sync::LazyLock;

use super::matra::{cluster_len, is_consonant, is_devanagari};

/// Glyph sequences and their Unicode equivalents.
static KRUTIDEV: &[(&str, &str)] = &[
    // independent vowels
    ("vkS", "औ"),
    ("vks", "ओ"),
    ("vk", "आ"),
    ("v", "अ"),
    ("bZ", "ई"),
    ("b", "इ"),
    ("m", "उ"),
    ("Å", "ऊ"),
    (",s", "ऐ"),
    (",", "ए"),
    ("_", "ऋ"),
    // full consonants written as half form + aa stroke
    ("Dk", "क"),
    ("[k", "ख"),
    ("Xk", "ग"),
    ("?k", "घ"),
    ("Pk", "च"),
    ("Tk", "ज"),
    (".k", "ण"),
    ("Rk", "त"),
    ("Ùk", "त्त"),
    ("Fk", "थ"),
    ("/k", "ध"),
    ("Uk", "न"),
    ("Ik", "प"),
    ("Ck", "ब"),
    ("Hk", "भ"),
    ("Ek", "म"),
    ("Yk", "ल"),
    ("Ok", "व"),
    ("'k", "श"),
    ("\"k", "ष"),
    ("Lk", "स"),
    ("{k", "क्ष"),
    // nukta forms
    ("d+", "क़"),
    ("[+", "ख़"),
    ("x+", "ग़"),
    ("t+", "ज़"),
    ("M+", "ड़"),
    ("<+", "ढ़"),
    ("Q+", "फ़"),
    // consonants
    ("d", "क"),
    ("D", "क्"),
    ("[", "ख्"),
    ("x", "ग"),
    ("X", "ग्"),
    ("?", "घ्"),
    ("p", "च"),
    ("P", "च्"),
    ("N", "छ"),
    ("t", "ज"),
    ("T", "ज्"),
    (">", "झ"),
    ("V", "ट"),
    ("B", "ठ"),
    ("M", "ड"),
    ("<", "ढ"),
    (".", "ण्"),
    ("r", "त"),
    ("R", "त्"),
    ("Ù", "त्त्"),
    ("F", "थ्"),
    ("n", "द"),
    ("/", "ध्"),
    ("u", "न"),
    ("U", "न्"),
    ("i", "प"),
    ("I", "प्"),
    ("Q", "फ"),
    ("c", "ब"),
    ("C", "ब्"),
    ("H", "भ्"),
    ("e", "म"),
    ("E", "म्"),
    (";", "य"),
    ("j", "र"),
    ("y", "ल"),
    ("Y", "ल्"),
    ("G", "ळ"),
    ("o", "व"),
    ("O", "व्"),
    ("'", "श्"),
    ("\"", "ष्"),
    ("l", "स"),
    ("L", "स्"),
    ("g", "ह"),
    // conjuncts
    ("{", "क्ष्"),
    ("=", "त्र"),
    ("K", "ज्ञ"),
    ("J", "श्र"),
    ("}", "द्व"),
    ("|", "द्य"),
    (")", "द्ध"),
    ("ç", "प्र"),
    ("Ø", "क्र"),
    ("#", "रु"),
    (":", "रू"),
    // dependent signs
    ("ks", "ो"),
    ("kS", "ौ"),
    ("k", "ा"),
    ("h", "ी"),
    ("q", "ु"),
    ("w", "ू"),
    ("`", "ृ"),
    ("s", "े"),
    ("S", "ै"),
    ("a", "ं"),
    ("¡", "ँ"),
    ("W", "ॅ"),
    ("z", "्र"),
    ("~", "्"),
    ("+", "़"),
    // punctuation
    ("A", "।"),
    ("\\", "?"),
    ("-", "."),
    ("]", ","),
    ("&", "-"),
    ("(", ";"),
    ("%", ":"),
    ("@", "/"),
    ("^", "‘"),
    ("*", "’"),
    ("¼", "("),
    ("½", ")"),
];

/// Placeholder for the short i sign until it is moved after its cluster.
const I_MARK: char = '\u{E000}';
/// Placeholder for the reph until it is moved before its syllable.
const REPH_MARK: char = '\u{E001}';

static TABLE: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| KRUTIDEV.iter().copied().collect());

static MAX_KEY_CHARS: LazyLock<usize> = LazyLock::new(|| {
    KRUTIDEV
        .iter()
        .map(|(k, _)| k.chars().count())
        .max()
        .unwrap_or(1)
});

/// Letter pairs that occur in nearly every KrutiDev word and rarely in English.
const SIGNATURES: &[&str] = &[
    "kk", "Hk", "dk", "dh", "ds", "gS", "vk", "fd", "fg", "fo", "fp", "fj", "fu", "fy", "fl",
    "esa", "ksa", "us", "jk", "uk", "rk", "Dk", ";k", "'k", "/k", "[k",
];

/// Single glyphs (reph, anusvara, visarga) that also occur in plain English
/// capitals; they only count inside a word with lowercase letters.
const WEAK_SIGNATURES: &[char] = &['Z', 'z', 'A', '%'];

const ENGLISH_STOPWORDS: &[&str] = &[
    "the", "of", "and", "a", "to", "in", "is", "it", "that", "for", "on", "with", "as", "was",
    "are", "be", "by", "this", "which", "what", "an", "or", "from", "at", "not",
];

/// Evidence gathered by [`detect`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegacyScore {
    /// Share of ASCII words containing a KrutiDev signature
    pub signature_ratio: f32,
    /// Share of ASCII words that are common English words
    pub stopword_ratio: f32,
    /// Share of letters that are already Unicode Devanagari
    pub devanagari_ratio: f32,
    /// Share of ASCII letters that are lowercase
    pub lowercase_ratio: f32,
    /// ASCII letters seen
    pub ascii_letters: usize,
}

/// Score `text` for KrutiDev encoding.
pub fn score(text: &str) -> LegacyScore {
    let mut ascii_letters = 0usize;
    let mut lowercase = 0usize;
    let mut devanagari = 0usize;
    for c in text.chars() {
        if c.is_ascii_alphabetic() {
            ascii_letters += 1;
            if c.is_ascii_lowercase() {
                lowercase += 1;
            }
        } else if is_devanagari(c) && c.is_alphabetic() {
            devanagari += 1;
        }
    }

    let words: Vec<&str> = text
        .split_whitespace()
        .filter(|w| w.chars().any(|c| c.is_ascii_alphabetic()))
        .collect();
    let signed = words
        .iter()
        .filter(|w| has_signature(w))
        .count();
    let stopwords = words
        .iter()
        .filter(|w| {
            let bare = w.trim_matches(|c: char| !c.is_ascii_alphabetic()).to_ascii_lowercase();
            ENGLISH_STOPWORDS.contains(&bare.as_str())
        })
        .count();

    let ratio = |n: usize, d: usize| if d == 0 { 0.0 } else { n as f32 / d as f32 };
    LegacyScore {
        signature_ratio: ratio(signed, words.len()),
        stopword_ratio: ratio(stopwords, words.len()),
        devanagari_ratio: ratio(devanagari, devanagari + ascii_letters),
        lowercase_ratio: ratio(lowercase, ascii_letters),
        ascii_letters,
    }
}

fn has_signature(word: &str) -> bool {
    SIGNATURES.iter().any(|s| word.contains(s))
        || (word.contains(WEAK_SIGNATURES) && word.chars().any(|c| c.is_ascii_lowercase()))
}

/// Whether `text` looks like KrutiDev-encoded Hindi.
pub fn detect(text: &str, threshold: f32) -> bool {
    let s = score(text);
    s.ascii_letters >= 12
        && s.devanagari_ratio < 0.05
        && s.lowercase_ratio >= 0.5
        && s.stopword_ratio < 0.10
        && s.signature_ratio >= threshold
}

/// Result of remapping legacy text.
#[derive(Debug, Clone, PartialEq)]
pub struct Remapped {
    pub text: String,
    /// Glyph sequences replaced through the table
    pub mapped: usize,
    /// Characters with no table entry, left as they were
    pub unmapped: usize,
}

/// Convert KrutiDev glyphs to Unicode Devanagari.
pub fn remap(text: &str) -> Remapped {
    let chars: Vec<char> = text.chars().collect();
    let mut out: Vec<char> = Vec::with_capacity(chars.len() * 2);
    let mut mapped = 0;
    let mut unmapped = 0;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == 'f' {
            out.push(I_MARK);
            mapped += 1;
            i += 1;
            continue;
        }
        if c == 'Z' {
            out.push(REPH_MARK);
            mapped += 1;
            i += 1;
            continue;
        }

        let longest = (*MAX_KEY_CHARS).min(chars.len() - i);
        let hit = (1..=longest).rev().find_map(|len| {
            let key: String = chars[i..i + len].iter().collect();
            TABLE.get(key.as_str()).map(|value| (len, *value))
        });

        match hit {
            Some((len, value)) => {
                out.extend(value.chars());
                mapped += 1;
                i += len;
            }
            None => {
                if !passes_through(c) {
                    unmapped += 1;
                }
                out.push(c);
                i += 1;
            }
        }
    }

    place_short_i(&mut out);
    place_reph(&mut out);

    Remapped {
        text: out.into_iter().collect(),
        mapped,
        unmapped,
    }
}

fn passes_through(c: char) -> bool {
    c.is_whitespace() || c.is_ascii_digit() || c == '!' || is_devanagari(c)
}

/// Move each short i placeholder after the consonant cluster that follows it.
fn place_short_i(chars: &mut Vec<char>) {
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == I_MARK {
            let len = cluster_len(chars, i + 1);
            chars[i..=i + len].rotate_left(1);
            chars[i + len] = '\u{093F}';
            i += len + 1;
        } else {
            i += 1;
        }
    }
}

/// Replace each reph placeholder with र् placed before the preceding syllable.
fn place_reph(chars: &mut Vec<char>) {
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != REPH_MARK {
            i += 1;
            continue;
        }
        chars.remove(i);

        // Walk back over dependent signs, then over the consonant cluster.
        let mut start = i;
        while start > 0 && is_sign(chars[start - 1]) {
            start -= 1;
        }
        if start > 0 && is_consonant(chars[start - 1]) {
            start -= 1;
            while start >= 2 && chars[start - 1] == '\u{094D}' && is_consonant(chars[start - 2]) {
                start -= 2;
            }
        }
        chars.splice(start..start, ['र', '\u{094D}']);
        i += 2;
    }
}

fn is_sign(c: char) -> bool {
    ('\u{093E}'..='\u{094C}').contains(&c)
        || ('\u{0901}'..='\u{0903}').contains(&c)
        || c == '\u{093C}'
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPITAL: &str = "Hkkjr dh jkt/kkuh D;k gS\\";

    #[test]
    fn test_remap_sentence() {
        let out = remap(CAPITAL);
        assert_eq!(out.text, "भारत की राजधानी क्या है?");
        assert_eq!(out.unmapped, 0);
        assert!(out.mapped > 0);
    }

    #[test]
    fn test_short_i_and_reph() {
        assert_eq!(remap("fdrkc").text, "किताब");
        assert_eq!(remap("fLFkfr").text, "स्थिति");
        assert_eq!(remap("dk;Z").text, "कार्य");
        assert_eq!(remap("/keZ").text, "धर्म");
    }

    #[test]
    fn test_question_markers_survive() {
        assert_eq!(remap("iz'u 1-").text, "प्रश्न 1.");
        assert_eq!(remap("¼d½ fnYyh").text, "(क) दिल्ली");
        assert_eq!(remap("mÙkj % [k").text, "उत्तर : ख");
    }

    #[test]
    fn test_unmapped_counted_and_kept() {
        let out = remap("dé");
        assert_eq!(out.text, "कé");
        assert_eq!(out.unmapped, 1);
    }

    #[test]
    fn test_detection() {
        let legacy = "iz'u 1- Hkkjr dh jkt/kkuh D;k gS\\ ¼d½ eqacbZ ¼[k½ fnYyh";
        assert!(detect(legacy, 0.35));
        assert!(!detect("Q. What is the capital of India? A) Mumbai B) Delhi", 0.35));
        assert!(!detect("प्रश्न 1. भारत की राजधानी क्या है?", 0.35));
        assert!(!detect("dk", 0.35));
    }

    #[test]
    fn test_english_capitals_are_not_legacy() {
        for heading in [
            "GENERAL AWARENESS PAPER QUIZ SECTION",
            "SECTION A ANSWER KEY",
            "PART Z: QUANTITATIVE APTITUDE 25% WEIGHTAGE",
        ] {
            assert!(!detect(heading, 0.35), "{heading}");
        }
        assert!(score("GENERAL AWARENESS").lowercase_ratio < 0.5);
        // The same glyphs still count inside lowercase KrutiDev words.
        assert!(has_signature("eqacbZ"));
        assert!(!has_signature("QUIZ"));
    }

    #[test]
    fn test_threshold_is_respected() {
        let mixed = "Hkkjr dh jkt/kkuh D;k gS\\ Mumbai Chennai Kolkata Pune";
        let s = score(mixed);
        assert!(s.signature_ratio > 0.3 && s.signature_ratio < 1.0);
        assert!(detect(mixed, s.signature_ratio));
        assert!(!detect(mixed, (s.signature_ratio + 0.05).min(1.0)));
    }
}
