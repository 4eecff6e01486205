//! Devanagari sequence repair.
//!
//! OCR engines frequently emit dependent vowel signs in visual rather than
//! logical order, split two-part vowels, and duplicate combining marks. Each
//! pass here fixes one such artifact and reports how many edits it made.

use unicode_normalization::UnicodeNormalization;

/// Upper bound on repair rounds; each round is a full set of passes.
const MAX_ROUNDS: usize = 16;

const SIGN_I: char = '\u{093F}';
const NUKTA: char = '\u{093C}';
const VIRAMA: char = '\u{094D}';
const DANDA: char = '\u{0964}';
const DOUBLE_DANDA: char = '\u{0965}';

pub(crate) fn is_devanagari(c: char) -> bool {
    ('\u{0900}'..='\u{097F}').contains(&c)
}

pub(crate) fn is_consonant(c: char) -> bool {
    ('\u{0915}'..='\u{0939}').contains(&c) || ('\u{0958}'..='\u{095F}').contains(&c)
}

/// Dependent vowel signs (matras).
fn is_vowel_sign(c: char) -> bool {
    ('\u{093E}'..='\u{094C}').contains(&c) || c == '\u{0962}' || c == '\u{0963}'
}

fn is_nasal(c: char) -> bool {
    c == '\u{0901}' || c == '\u{0902}'
}

/// Signs that attach to the preceding letter.
fn is_dependent(c: char) -> bool {
    is_vowel_sign(c) || is_nasal(c) || c == '\u{0903}' || c == NUKTA || c == VIRAMA
}

fn is_combining(c: char) -> bool {
    ('\u{0900}'..='\u{0903}').contains(&c)
        || c == NUKTA
        || ('\u{093E}'..='\u{094D}').contains(&c)
        || ('\u{0951}'..='\u{0957}').contains(&c)
        || c == '\u{0962}'
        || c == '\u{0963}'
}

/// Split vowel pieces and their composed form.
const COMPOSITIONS: &[(char, char, char)] = &[
    ('\u{093E}', '\u{0947}', '\u{094B}'), // ा + े -> ो
    ('\u{0947}', '\u{093E}', '\u{094B}'), // े + ा -> ो
    ('\u{093E}', '\u{0948}', '\u{094C}'), // ा + ै -> ौ
    ('\u{0948}', '\u{093E}', '\u{094C}'), // ै + ा -> ौ
    ('\u{0905}', '\u{093E}', '\u{0906}'), // अ + ा -> आ
    ('\u{0905}', '\u{094B}', '\u{0913}'), // अ + ो -> ओ
    ('\u{0905}', '\u{094C}', '\u{0914}'), // अ + ौ -> औ
    ('\u{090F}', '\u{0947}', '\u{0910}'), // ए + े -> ऐ
];

/// Repair `text` until no pass changes it. Returns the text and the edit count.
pub fn repair(text: &str) -> (String, usize) {
    let mut current = text.to_string();
    let mut total = 0;
    for _ in 0..MAX_ROUNDS {
        let (next, edits) = repair_round(&current);
        current = next;
        if edits == 0 {
            break;
        }
        total += edits;
    }
    (current, total)
}

fn repair_round(text: &str) -> (String, usize) {
    let mut edits = 0;

    let composed: String = text.nfc().collect();
    if composed != text {
        edits += text.chars().count().abs_diff(composed.chars().count()).max(1);
    }

    let mut chars: Vec<char> = composed.chars().collect();
    edits += drop_garbage(&mut chars);
    edits += join_detached_signs(&mut chars);
    edits += compose_split_vowels(&mut chars);
    edits += reorder_orphan_i(&mut chars);
    edits += reorder_nukta(&mut chars);
    edits += reorder_nasal(&mut chars);
    edits += collapse_duplicate_marks(&mut chars);
    edits += fix_danda(&mut chars);

    (chars.into_iter().collect(), edits)
}

/// Replacement characters and byte-order marks.
fn drop_garbage(chars: &mut Vec<char>) -> usize {
    let before = chars.len();
    chars.retain(|&c| c != '\u{FFFD}' && c != '\u{FEFF}');
    before - chars.len()
}

/// "क ा" -> "का". The short i sign is exempt: it is reordered separately.
fn join_detached_signs(chars: &mut Vec<char>) -> usize {
    let mut out = Vec::with_capacity(chars.len());
    let mut edits = 0;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == ' ' || c == '\t' {
            let mut j = i;
            while j < chars.len() && (chars[j] == ' ' || chars[j] == '\t') {
                j += 1;
            }
            let prev_is_letter = out
                .last()
                .is_some_and(|&p: &char| is_devanagari(p) && p != DANDA && p != DOUBLE_DANDA);
            let next_is_sign = j < chars.len() && is_dependent(chars[j]) && chars[j] != SIGN_I;
            if prev_is_letter && next_is_sign {
                edits += j - i;
                i = j;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }
    *chars = out;
    edits
}

fn compose_split_vowels(chars: &mut Vec<char>) -> usize {
    let mut out: Vec<char> = Vec::with_capacity(chars.len());
    let mut edits = 0;
    for &c in chars.iter() {
        if let Some(&prev) = out.last() {
            if let Some(&(_, _, composed)) =
                COMPOSITIONS.iter().find(|(a, b, _)| *a == prev && *b == c)
            {
                out.pop();
                out.push(composed);
                edits += 1;
                continue;
            }
        }
        out.push(c);
    }
    *chars = out;
    edits
}

/// Length of the consonant cluster starting at `start`: C(़)(्C(़))*.
pub(crate) fn cluster_len(chars: &[char], start: usize) -> usize {
    if start >= chars.len() || !is_consonant(chars[start]) {
        return 0;
    }
    let mut end = start + 1;
    if end < chars.len() && chars[end] == NUKTA {
        end += 1;
    }
    while end + 1 < chars.len() && chars[end] == VIRAMA && is_consonant(chars[end + 1]) {
        end += 2;
        if end < chars.len() && chars[end] == NUKTA {
            end += 1;
        }
    }
    end - start
}

/// Move a short i sign that precedes its consonant cluster to after it.
fn reorder_orphan_i(chars: &mut [char]) -> usize {
    let mut edits = 0;
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == SIGN_I {
            let attached = i > 0 && (is_consonant(chars[i - 1]) || chars[i - 1] == NUKTA);
            let len = cluster_len(chars, i + 1);
            if !attached && len > 0 {
                chars[i..=i + len].rotate_left(1);
                edits += 1;
                i += len + 1;
                continue;
            }
        }
        i += 1;
    }
    edits
}

/// C + matra + nukta -> C + nukta + matra.
fn reorder_nukta(chars: &mut [char]) -> usize {
    let mut edits = 0;
    for i in 1..chars.len().saturating_sub(1) {
        if is_consonant(chars[i - 1]) && is_vowel_sign(chars[i]) && chars[i + 1] == NUKTA {
            chars.swap(i, i + 1);
            edits += 1;
        }
    }
    edits
}

/// C + anusvara/candrabindu + matra -> C + matra + anusvara/candrabindu.
fn reorder_nasal(chars: &mut [char]) -> usize {
    let mut edits = 0;
    for i in 1..chars.len().saturating_sub(1) {
        let base = chars[i - 1];
        if (is_consonant(base) || base == NUKTA) && is_nasal(chars[i]) && is_vowel_sign(chars[i + 1])
        {
            chars.swap(i, i + 1);
            edits += 1;
        }
    }
    edits
}

fn collapse_duplicate_marks(chars: &mut Vec<char>) -> usize {
    let before = chars.len();
    chars.dedup_by(|next, prev| is_combining(*next) && next == prev);
    before - chars.len()
}

/// `|` after Devanagari becomes a danda; two dandas become a double danda.
fn fix_danda(chars: &mut Vec<char>) -> usize {
    let mut out: Vec<char> = Vec::with_capacity(chars.len());
    let mut edits = 0;
    for &c in chars.iter() {
        let c = if c == '|' && out.iter().rev().find(|p| **p != ' ').is_some_and(|&p| is_devanagari(p)) {
            edits += 1;
            DANDA
        } else {
            c
        };
        if c == DANDA && out.last() == Some(&DANDA) {
            out.pop();
            out.push(DOUBLE_DANDA);
            edits += 1;
            continue;
        }
        out.push(c);
    }
    *chars = out;
    edits
}
