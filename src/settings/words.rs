//! Word list normalization
//!
//! Every write path funnels through these transforms so the stored word
//! lists are always trimmed, deduplicated, and sorted the same way, no
//! matter whether they land in a config document or a dictionary file.

use std::collections::HashSet;

/// Sort words case-insensitively. The sort is stable, so words that compare
/// equal when lowercased keep their input order.
pub fn sort_words(mut words: Vec<String>) -> Vec<String> {
    words.sort_by_key(|w| w.to_lowercase());
    words
}

/// Remove duplicates, keeping the first occurrence. Case-sensitive.
pub fn unique(words: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    words.into_iter().filter(|w| seen.insert(w.clone())).collect()
}

/// Trim entries and drop blanks.
fn clean(words: Vec<String>) -> Vec<String> {
    words
        .into_iter()
        .map(|w| w.trim().to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Merge new words into an existing list: trim, drop blanks, dedupe, sort.
pub fn merge_words(current: &[String], to_add: &[String]) -> Vec<String> {
    let combined = current.iter().chain(to_add.iter()).cloned().collect();
    sort_words(unique(clean(combined)))
}

/// Remove words by exact match and renormalize what remains.
pub fn remove_words(current: &[String], to_remove: &[String]) -> Vec<String> {
    let remove: HashSet<&str> = to_remove.iter().map(|w| w.as_str()).collect();
    let remaining = current
        .iter()
        .filter(|w| !remove.contains(w.as_str()))
        .cloned()
        .collect();
    sort_words(unique(clean(remaining)))
}

/// Remove words by case-insensitive match, preserving the order and casing
/// of the retained entries. Used for settings-level removal, where the
/// stored list is not renormalized.
pub fn filter_out_words(words: &[String], to_remove: &[String]) -> Vec<String> {
    let remove: HashSet<String> = to_remove.iter().map(|w| w.to_lowercase()).collect();
    words
        .iter()
        .filter(|w| !remove.contains(&w.to_lowercase()))
        .cloned()
        .collect()
}

/// Split word inputs on whitespace, trim, and drop blanks. A single entry
/// "red green" becomes two words.
pub fn normalize_words<I, S>(input: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    input
        .into_iter()
        .flat_map(|s| {
            s.as_ref()
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}
