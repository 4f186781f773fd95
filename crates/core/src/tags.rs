//! Tag text helpers.

use std::sync::LazyLock;

use regex::Regex;

use crate::Tag;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").expect("valid regex"));

/// Removes markup: everything from `<` to the next `>`, or to the end when unterminated.
pub fn strip_tags(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_tag = false;
    for ch in value.chars() {
        match (in_tag, ch) {
            (false, '<') => in_tag = true,
            (false, _) => out.push(ch),
            (true, '>') => in_tag = false,
            (true, _) => {}
        }
    }
    out
}

/// Uppercases the first letter of every word and lowercases the rest.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for ch in value.chars() {
        if ch.is_alphanumeric() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

/// Canonical form of a tag: no markup, title-cased, runs of non-word
/// characters replaced by one space, trimmed.
pub fn normalize_tag(value: &str) -> String {
    let value = title_case(&strip_tags(value));
    NON_WORD.replace_all(&value, " ").trim().to_string()
}

/// Splits a comma-delimited tag list into normalized, non-empty tags.
pub fn string_to_tags(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(normalize_tag)
        .filter(|tag| !tag.is_empty())
        .collect()
}

/// Comma-joined tag text in alphabetical order.
pub fn tags_to_string(tags: &[Tag]) -> String {
    let mut names: Vec<&str> = tags.iter().map(|tag| tag.tag.as_str()).collect();
    names.sort_by(|a, b| {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });
    names.join(", ")
}
