//! Last-chance recovery of variety pairs from JSON that is too broken to decode.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::{Variety, VarietyList};

/// A `"name": "..."` followed by a `"description": "..."` inside the same object.
static NAME_DESCRIPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""name"\s*:\s*"([^"]+)"[^}]+?"description"\s*:\s*"([^"]+)""#)
        .expect("Invalid regex pattern")
});

/// Fewer pairs than this is more likely an echoed schema than real data.
const MIN_PAIRS: usize = 2;

/// Collects `(name, description)` pairs in order of appearance, dropping placeholder names.
/// Yields nothing unless at least two pairs survive.
pub fn pair_varieties(text: &str) -> Option<VarietyList> {
    let varieties: Vec<Variety> = NAME_DESCRIPTION
        .captures_iter(text)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().trim();
            let description = caps.get(2)?.as_str().trim();
            (!is_placeholder(name)).then(|| Variety::new(name, description))
        })
        .collect();

    (varieties.len() >= MIN_PAIRS).then(|| VarietyList::new(varieties))
}

/// Names copied from a prompt's example schema rather than produced as data.
fn is_placeholder(name: &str) -> bool {
    let name = name.to_lowercase();
    name.is_empty() || name.contains("json") || name.starts_with("variety") || name.starts_with("name")
}
