//! Global helper functions bound into every compiled rule.

use url::form_urlencoded;

/// Words kept lowercase in titles unless they open or close the title.
const SMALL_WORDS: [&str; 16] = [
    "a", "an", "and", "the", "in", "on", "at", "by", "for", "of", "with", "to", "but", "or",
    "nor", "as",
];

/// Escape a string for use in a URL query, spaces as `+`.
pub fn url_encode(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

/// Title-case a sentence, keeping small words lowercase in the middle.
///
/// A single dash-joined token (`"lord-of-the-rings"`) is cased per segment.
/// Words with two or more capitals are treated as acronyms and left alone
/// apart from the first letter.
pub fn to_title_case(sentence: &str) -> String {
    if sentence.contains('-') && !sentence.contains(' ') {
        let parts: Vec<&str> = sentence.split('-').collect();
        let last = parts.len() - 1;
        return parts
            .iter()
            .enumerate()
            .map(|(i, word)| {
                if i == 0 || i == last || !keeps_lowercase(word) {
                    cap_first(word)
                } else {
                    word.to_lowercase()
                }
            })
            .collect::<Vec<_>>()
            .join("-");
    }

    let words: Vec<&str> = sentence.split_whitespace().collect();
    let last = words.len().saturating_sub(1);
    words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let after_break = i > 0 && words[i - 1].ends_with([':', '-']);
            if i == 0 || i == last || after_break || !keeps_lowercase(word) {
                cap_first(word)
            } else {
                word.to_lowercase()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn keeps_lowercase(word: &str) -> bool {
    SMALL_WORDS.contains(&word.to_lowercase().as_str()) && !has_multiple_caps(word)
}

fn has_multiple_caps(word: &str) -> bool {
    word.chars().filter(|c| c.is_uppercase()).nth(1).is_some()
}

fn cap_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
