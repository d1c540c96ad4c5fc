use once_cell::sync::Lazy;
use regex::Regex;

static PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.,!?;:'\x22()]").expect("Invalid regex pattern"));

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

/// Normalize a plant-type name: lowercase, drop punctuation, collapse whitespace
pub fn normalize(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped = PUNCTUATION.replace_all(&lowered, "");
    WHITESPACE.replace_all(stripped.trim(), " ").into_owned()
}

/// Lookup keys for a plant-type hint, most specific first: the whole normalized hint and its
/// singular forms, then the same for its last word ("cherry tomatoes" -> "tomato").
pub fn lookup_keys(hint: &str) -> Vec<String> {
    let normalized = normalize(hint);
    if normalized.is_empty() {
        return Vec::new();
    }

    let mut keys = singular_forms(&normalized);
    if let Some((_, last)) = normalized.rsplit_once(' ') {
        for key in singular_forms(last) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    keys
}

/// The word itself, then with a plural `es` or `s` removed ("grass" keeps its `ss`).
fn singular_forms(word: &str) -> Vec<String> {
    let mut forms = vec![word.to_string()];
    if let Some(stem) = word.strip_suffix("es").filter(|stem| !stem.is_empty()) {
        forms.push(stem.to_string());
    }
    if let Some(stem) = word
        .strip_suffix('s')
        .filter(|stem| !stem.is_empty() && !stem.ends_with('s'))
    {
        forms.push(stem.to_string());
    }
    forms
}
