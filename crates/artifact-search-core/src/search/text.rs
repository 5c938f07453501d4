//! Text helpers shared by the parser, scorer and similarity engine
//!
//! Tokenization here is a Unicode-block heuristic, not a dictionary
//! tokenizer: ASCII letter runs and CJK runs (ideographs, hiragana,
//! katakana) are cut at anything else.

use regex::RegexBuilder;

/// Map full-width digits and Latin letters to their ASCII forms.
pub fn fold_full_width(c: char) -> char {
    match c {
        '\u{FF10}'..='\u{FF19}' | '\u{FF21}'..='\u{FF3A}' | '\u{FF41}'..='\u{FF5A}' => {
            char::from_u32(c as u32 - 0xFEE0).unwrap_or(c)
        }
        _ => c,
    }
}

/// Trim and collapse whitespace runs to a single space
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FAF}'   // CJK unified ideographs
        | '\u{3040}'..='\u{309F}' // hiragana
        | '\u{30A0}'..='\u{30FF}' // katakana
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunKind {
    Ascii,
    Cjk,
}

fn run_kind(c: char) -> Option<RunKind> {
    if c.is_ascii_alphabetic() {
        Some(RunKind::Ascii)
    } else if is_cjk(c) {
        Some(RunKind::Cjk)
    } else {
        None
    }
}

/// Split text into ASCII letter runs and CJK runs, in order of appearance.
fn runs(text: &str) -> Vec<(RunKind, String)> {
    let mut out = Vec::new();
    let mut current: Option<(RunKind, String)> = None;

    for c in text.chars() {
        let kind = run_kind(c);
        if let (Some((k, buf)), Some(next)) = (current.as_mut(), kind) {
            if *k == next {
                buf.push(c);
                continue;
            }
        }
        if let Some(done) = current.take() {
            out.push(done);
        }
        if let Some(next) = kind {
            current = Some((next, c.to_string()));
        }
    }
    if let Some(done) = current {
        out.push(done);
    }
    out
}

/// Title tokens: lower-cased ASCII runs of at least `min_ascii` letters and
/// CJK runs of at least `min_cjk` characters.
pub fn title_tokens(title: &str, min_ascii: usize, min_cjk: usize) -> Vec<String> {
    let mut tokens = Vec::new();
    for (kind, run) in runs(title) {
        let token = match kind {
            RunKind::Ascii if run.len() >= min_ascii => run.to_ascii_lowercase(),
            RunKind::Cjk if run.chars().count() >= min_cjk => run,
            _ => continue,
        };
        push_unique(&mut tokens, token);
    }
    tokens
}

/// First `limit` lower-cased ASCII words of at least `min_len` letters.
/// Repeated words still count toward the limit.
pub fn leading_ascii_words(text: &str, min_len: usize, limit: usize) -> Vec<String> {
    runs(text)
        .into_iter()
        .filter(|(kind, run)| *kind == RunKind::Ascii && run.len() >= min_len)
        .take(limit)
        .map(|(_, run)| run.to_ascii_lowercase())
        .collect()
}

/// Append `item` unless already present
pub fn push_unique(items: &mut Vec<String>, item: String) {
    if !items.contains(&item) {
        items.push(item);
    }
}

/// Wrap case-insensitive occurrences of `terms` in `<mark>` tags, keeping the
/// original casing of the matched text.
pub fn highlight(text: &str, terms: &[String]) -> String {
    let mut escaped: Vec<String> = terms
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(regex::escape)
        .collect();
    if text.is_empty() || escaped.is_empty() {
        return text.to_string();
    }
    // Longest first so "machine learning" wins over "machine"
    escaped.sort_by_key(|t| std::cmp::Reverse(t.len()));
    escaped.dedup();

    match RegexBuilder::new(&escaped.join("|"))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re.replace_all(text, "<mark>$0</mark>").into_owned(),
        Err(e) => {
            log::debug!("[Highlight] Skipping highlight: {}", e);
            text.to_string()
        }
    }
}
