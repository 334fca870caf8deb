use crate::meme::types::truncate_caption;

const PREAMBLES: &[&str] = &[
    "here's a",
    "here is a",
    "caption:",
    "meme:",
    "text:",
    "sure,",
    "certainly",
];

const MARKUP: &[char] = &['*', '"', '\'', '`'];

/// Reduce raw model output to a single display line, or `None` when nothing
/// usable is left. Steps run in a fixed order; moving the quote strip after the
/// preamble strip changes results for inputs like `"Sure, ..."`.
pub fn clean_completion(raw: &str) -> Option<String> {
    let text = raw.trim();
    let text = strip_one_quote(text);
    let text = strip_preamble(text).trim();
    let first_line = text.lines().next().unwrap_or("");
    let cleaned: String = first_line.chars().filter(|c| !MARKUP.contains(c)).collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        return None;
    }
    Some(truncate_caption(cleaned))
}

fn strip_one_quote(text: &str) -> &str {
    let is_quote = |c: char| c == '"' || c == '\'';
    let text = text.strip_prefix(is_quote).unwrap_or(text);
    text.strip_suffix(is_quote).unwrap_or(text)
}

fn strip_preamble(text: &str) -> &str {
    for preamble in PREAMBLES {
        let matches = text
            .get(..preamble.len())
            .map(|head| head.eq_ignore_ascii_case(preamble))
            .unwrap_or(false);
        if matches {
            return &text[preamble.len()..];
        }
    }
    text
}
