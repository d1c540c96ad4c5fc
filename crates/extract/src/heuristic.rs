//! Free-text reading of a record when the model answered in prose.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::schema::SeedRecord;

static LABELLED_IDENTIFICATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[\s*#-]*(?:identification|plant(?:\s+type)?|seed(?:\s+type)?)\s*:\s*([^\n]+?)\s*$")
        .expect("Invalid regex pattern")
});

static LOOSE_IDENTIFICATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:plant|seed)(?:\s+type)?[:\s]+([^.\n]+)").expect("Invalid regex pattern")
});

static LABELLED_VARIETY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[\s*#-]*variety\s*:\s*([^\n]+?)\s*$").expect("Invalid regex pattern")
});

static LOOSE_VARIETY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bvariety[:\s]+([^.\n]+)").expect("Invalid regex pattern"));

/// Bulleted (`•`, `-`, `*`) or numbered (`1.`, `2)`) list items.
static LIST_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:[•*-]|\d+[.)])\s+([^\n]+)").expect("Invalid regex pattern")
});

static CHARACTERISTICS_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)characteristics?\s*:\s*([^.\n]+)").expect("Invalid regex pattern")
});

static CONFIDENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)confidence(?:[\s_]+level)?[:\s]+(high|medium|low)\b")
        .expect("Invalid regex pattern")
});

const DEFAULT_CONFIDENCE: &str = "low";

/// Builds a record from prose. Always succeeds; unmatched fields stay empty and the raw
/// text is kept verbatim under `notes`.
pub fn record_from_text(text: &str) -> SeedRecord {
    let identification = first_capture(&[&LABELLED_IDENTIFICATION, &LOOSE_IDENTIFICATION], text);
    let variety = first_capture(&[&LABELLED_VARIETY, &LOOSE_VARIETY], text);

    let confidence = CONFIDENCE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_else(|| DEFAULT_CONFIDENCE.to_string());

    let mut record = SeedRecord::new();
    record.insert("identification", identification);
    record.insert("variety", variety);
    record.insert(
        "characteristics",
        Value::Array(characteristics(text).into_iter().map(Value::String).collect()),
    );
    record.insert("confidence_level", confidence);
    record.insert("notes", text);
    record
}

fn first_capture(patterns: &[&Regex], text: &str) -> String {
    patterns
        .iter()
        .find_map(|re| re.captures(text).and_then(|caps| caps.get(1)))
        .map(|m| clean(m.as_str()))
        .unwrap_or_default()
}

fn characteristics(text: &str) -> Vec<String> {
    let items: Vec<String> = LIST_ITEM
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| clean(m.as_str()))
        .filter(|item| !item.is_empty())
        .collect();

    if !items.is_empty() {
        return items;
    }

    CHARACTERISTICS_LINE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| {
            m.as_str()
                .split(',')
                .map(clean)
                .filter(|item| !item.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn clean(value: &str) -> String {
    value.trim().trim_end_matches('.').trim().to_string()
}
