use std::sync::OnceLock;

use regex::{Captures, Regex};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// A number (O read for 0 allowed) then "o/o" or "0/0"; must not run into a word.
re!(re_percent, r"(?i)\b(\d[\d.o]*)\s?[o0]/[o0](\W|$)");

re!(re_proof, r"(?i)\bpr[o0][o0]f\b");
re!(re_whiskey, r"(?i)\bwh[i1l]sk[e3]y\b");
re!(re_whisky, r"(?i)\bwh[i1l]sky\b");
re!(re_vodka, r"(?i)\bv[o0]dk[a4]\b");
re!(re_tequila, r"(?i)\bt[e3]qu[i1l][l1i][a4]\b");
re!(re_bourbon, r"(?i)\b[b8][o0]urb[o0]n\b");
re!(re_cognac, r"(?i)\bc[o0]gn[a4@]c\b");
re!(re_brandy, r"(?i)\b[b8]r[a4@]ndy\b");

re!(re_millilitres, r"(?i)(^|[\d\s])m[li1]\b");
re!(re_ounces, r"(?i)(^|[\d\s])[o0]z\b");

/// Spirit and strength words with the OCR confusions they commonly suffer.
fn vocabulary() -> [(&'static Regex, &'static str); 8] {
    [
        (re_proof(), "proof"),
        (re_whiskey(), "whiskey"),
        (re_whisky(), "whisky"),
        (re_vodka(), "vodka"),
        (re_tequila(), "tequila"),
        (re_bourbon(), "bourbon"),
        (re_cognac(), "cognac"),
        (re_brandy(), "brandy"),
    ]
}

/// Clean raw OCR output before matching.
///
/// Rules run in a fixed order, each on the previous one's output:
/// digit/letter repair between letters, percent-sign repair, spirit
/// vocabulary, volume units, whitespace collapse, and finally collapsing runs
/// of more than three identical characters down to two.
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let text = fix_digits_between_letters(raw);
    let text = fix_percent_signs(&text);
    let text = canonicalize_vocabulary(&text);
    let text = canonicalize_units(&text);
    let text = collapse_whitespace(&text);
    collapse_repeats(&text)
}

/// `0→O`, `1→I`, `5→S` when both neighbours are ASCII letters ("B0X" → "BOX").
fn fix_digits_between_letters(text: &str) -> String {
    let mut chars: Vec<char> = text.chars().collect();
    for (digit, letter) in [('0', 'O'), ('1', 'I'), ('5', 'S')] {
        for i in 1..chars.len().saturating_sub(1) {
            if chars[i] == digit
                && chars[i - 1].is_ascii_alphabetic()
                && chars[i + 1].is_ascii_alphabetic()
            {
                chars[i] = letter;
            }
        }
    }
    chars.into_iter().collect()
}

/// "40 o/o" → "40%", "4O o/o" → "40%".
fn fix_percent_signs(text: &str) -> String {
    re_percent()
        .replace_all(text, |caps: &Captures| {
            let number: String = caps[1]
                .chars()
                .map(|c| if c.eq_ignore_ascii_case(&'o') { '0' } else { c })
                .collect();
            format!("{number}%{}", &caps[2])
        })
        .into_owned()
}

fn canonicalize_vocabulary(text: &str) -> String {
    vocabulary().iter().fold(text.to_string(), |acc, (re, canonical)| {
        re.replace_all(&acc, |caps: &Captures| match_case(&caps[0], canonical))
            .into_owned()
    })
}

/// Render `canonical` in the case style of `found`: UPPER, Capitalized or lower.
fn match_case(found: &str, canonical: &str) -> String {
    let mut letters = found.chars().filter(|c| c.is_alphabetic()).peekable();
    let first_upper = letters.peek().is_some_and(|c| c.is_uppercase());
    if first_upper && letters.all(|c| c.is_uppercase()) {
        return canonical.to_uppercase();
    }
    if first_upper {
        let mut chars = canonical.chars();
        return chars
            .next()
            .map(|c| c.to_uppercase().chain(chars).collect())
            .unwrap_or_default();
    }
    canonical.to_string()
}

fn canonicalize_units(text: &str) -> String {
    let text = re_millilitres().replace_all(text, "${1}ml");
    re_ounces().replace_all(&text, "${1}oz").into_owned()
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Runs longer than three collapse to exactly two ("IIIIII" → "II").
pub(crate) fn collapse_repeats(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let run = chars[i..].iter().take_while(|&&x| x == c).count();
        let keep = if run > 3 { 2 } else { run };
        out.extend(std::iter::repeat(c).take(keep));
        i += run;
    }
    out
}
