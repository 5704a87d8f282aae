//! FZF v2 fuzzy scoring: a 64-bit bitmask pre-filter for O(1) candidate
//! rejection, then Smith-Waterman dynamic programming with word-boundary,
//! CamelCase and consecutive-character bonuses.
//!
//! Used by [`crate::engine::WeightedEngine`] to score item fields.

// ---------------------------------------------------------------------------
// Scoring constants (fzf v2)
// ---------------------------------------------------------------------------

const SCORE_MATCH: i32 = 16;
const SCORE_GAP_START: i32 = -3;
const SCORE_GAP_EXTENSION: i32 = -1;
const BONUS_BOUNDARY: i32 = 8;
const BONUS_CAMEL_CASE: i32 = 7;
const BONUS_CONSECUTIVE: i32 = 4;
const BONUS_FIRST_CHAR_MULTIPLIER: i32 = 2;
const BONUS_BOUNDARY_WHITE: i32 = 10;
const BONUS_BOUNDARY_DELIMITER: i32 = 9;

const UNREACHABLE: i32 = i32::MIN / 2;

// ---------------------------------------------------------------------------
// Character classification
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq)]
enum CharClass {
    Lower,
    Upper,
    Digit,
    White,
    Delimiter,
    NonWord,
}

fn char_class(b: u8) -> CharClass {
    match b {
        b'a'..=b'z' => CharClass::Lower,
        b'A'..=b'Z' => CharClass::Upper,
        b'0'..=b'9' => CharClass::Digit,
        b' ' | b'\t' | b'\n' | b'\r' => CharClass::White,
        b'/' | b'_' | b'-' | b'.' | b',' | b':' | b';' | b'|' => CharClass::Delimiter,
        _ => CharClass::NonWord,
    }
}

fn boundary_bonus(prev: CharClass, curr: CharClass) -> i32 {
    match (prev, curr) {
        (CharClass::White, CharClass::White) => 0,
        (CharClass::White, _) => BONUS_BOUNDARY_WHITE,
        (CharClass::Delimiter, CharClass::Delimiter) => 0,
        (CharClass::Delimiter, _) => BONUS_BOUNDARY_DELIMITER,
        (CharClass::NonWord, CharClass::NonWord) => 0,
        (CharClass::NonWord, _) => BONUS_BOUNDARY,
        (CharClass::Lower, CharClass::Upper) => BONUS_CAMEL_CASE,
        (CharClass::Digit, CharClass::Lower | CharClass::Upper) => BONUS_BOUNDARY,
        _ => 0,
    }
}

// ---------------------------------------------------------------------------
// Bitmask pre-filter
// ---------------------------------------------------------------------------

/// 64-bit character bitmask: a-z → bits 0-25, 0-9 → bits 26-35, `_-./` → bits 36-39.
pub fn char_bitmask(s: &str) -> u64 {
    s.bytes().fold(0u64, |mask, b| {
        let idx = match b {
            b'a'..=b'z' => (b - b'a') as u32,
            b'A'..=b'Z' => (b.to_ascii_lowercase() - b'a') as u32,
            b'0'..=b'9' => (b - b'0') as u32 + 26,
            b'_' => 36,
            b'-' => 37,
            b'.' => 38,
            b'/' => 39,
            _ => return mask,
        };
        mask | (1u64 << idx)
    })
}

/// A query term prepared for repeated scoring.
#[derive(Debug, Clone)]
pub struct Term {
    pub text: String,
    /// Smart case: a term with an uppercase letter matches case-sensitively.
    pub case_sensitive: bool,
    pub mask: u64,
}

impl Term {
    pub fn new(raw: &str) -> Self {
        let case_sensitive = raw.bytes().any(|b| b.is_ascii_uppercase());
        let text = if case_sensitive { raw.to_string() } else { raw.to_lowercase() };
        let mask = char_bitmask(&text);
        Self { text, case_sensitive, mask }
    }

    /// Whether every maskable character of the term occurs in a field with `field_mask`.
    #[inline]
    pub fn may_match(&self, field_mask: u64) -> bool {
        self.mask & field_mask == self.mask
    }
}

/// Split a query into scoring terms.
pub fn terms(query: &str) -> Vec<Term> {
    query.split_whitespace().map(Term::new).collect()
}

#[inline]
fn chars_match(text_byte: u8, pattern_byte: u8, case_sensitive: bool) -> bool {
    if case_sensitive {
        text_byte == pattern_byte
    } else {
        text_byte.eq_ignore_ascii_case(&pattern_byte)
    }
}

fn find_substring(text: &[u8], pattern: &[u8], case_sensitive: bool) -> Option<usize> {
    if pattern.len() > text.len() {
        return None;
    }
    (0..=text.len() - pattern.len()).find(|&i| {
        pattern.iter().enumerate().all(|(j, &pb)| chars_match(text[i + j], pb, case_sensitive))
    })
}

// ---------------------------------------------------------------------------
// Smith-Waterman scorer
// ---------------------------------------------------------------------------

/// Score `pattern` as a fuzzy subsequence of `text`. `None` when it does not match.
pub fn fuzzy_score(text: &str, pattern: &str, case_sensitive: bool) -> Option<i32> {
    let tb = text.as_bytes();
    let pb = pattern.as_bytes();
    let m = pb.len();
    if m == 0 {
        return Some(0);
    }
    if m > tb.len() {
        return None;
    }

    // Leftmost subsequence end, then the rightmost start that still fits.
    let mut pi = 0;
    let mut end = 0;
    for (i, &b) in tb.iter().enumerate() {
        if pi < m && chars_match(b, pb[pi], case_sensitive) {
            pi += 1;
            end = i;
        }
    }
    if pi < m {
        return None;
    }
    let mut start = end;
    for i in (0..=end).rev() {
        if pi > 0 && chars_match(tb[i], pb[pi - 1], case_sensitive) {
            pi -= 1;
            start = i;
        }
    }

    let window = &tb[start..=end];
    let w = window.len();
    let bonus: Vec<i32> = (0..w)
        .map(|j| {
            let pos = start + j;
            let prev = if pos == 0 { CharClass::White } else { char_class(tb[pos - 1]) };
            boundary_bonus(prev, char_class(tb[pos]))
        })
        .collect();

    // Contiguous occurrences score without the DP.
    if let Some(offset) = find_substring(window, pb, case_sensitive) {
        let mut score = SCORE_MATCH * m as i32 + bonus[offset] * BONUS_FIRST_CHAR_MULTIPLIER;
        for k in 1..m {
            score += bonus[offset + k].max(BONUS_CONSECUTIVE);
        }
        return Some(score);
    }

    // h: best score ending at (i, j); run: consecutive matches ending there.
    let mut h = vec![UNREACHABLE; m * w];
    let mut run = vec![0u16; m * w];

    for i in 0..m {
        let mut in_gap = false;
        for j in 0..w {
            let idx = i * w + j;
            let gap = if j > 0 {
                h[idx - 1] + if in_gap { SCORE_GAP_EXTENSION } else { SCORE_GAP_START }
            } else {
                UNREACHABLE
            };

            if !chars_match(window[j], pb[i], case_sensitive) {
                h[idx] = gap;
                in_gap = true;
                continue;
            }

            let prev_run = if i > 0 && j > 0 { run[idx - w - 1] } else { 0 };
            let mut score = SCORE_MATCH
                + if prev_run > 0 { bonus[j].max(BONUS_CONSECUTIVE) } else { bonus[j] };
            if i == 0 {
                score += bonus[j] * (BONUS_FIRST_CHAR_MULTIPLIER - 1);
            }
            let diag = match (i, j) {
                (0, _) => 0,
                (_, 0) => UNREACHABLE,
                _ => h[idx - w - 1],
            };
            let matched = diag.saturating_add(score);

            if matched >= gap {
                h[idx] = matched;
                run[idx] = prev_run + 1;
            } else {
                h[idx] = gap;
            }
            in_gap = false;
        }
    }

    let best = h[(m - 1) * w..].iter().copied().max().unwrap_or(UNREACHABLE);
    (best > 0).then_some(best)
}
