//! Scanners that cut candidate JSON out of model output. Nothing here parses JSON; each
//! function only proposes a substring for a strict decode.

use once_cell::sync::Lazy;
use regex::Regex;

/// Triple-backtick fence with an optional language tag. An unterminated fence runs to the
/// end of the text, which happens when the model's output is truncated.
static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*(.*?)(?:```|\z)").expect("Invalid regex pattern")
});

/// `{` followed by a quoted key and a colon.
static OBJECT_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\{\s*"[^"]+"\s*:"#).expect("Invalid regex pattern"));

static VARIETIES_ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""varieties"\s*:\s*\[\s*\{"#).expect("Invalid regex pattern"));

/// Trimmed interiors of fenced code blocks, in order of appearance. Empty blocks are skipped.
pub fn fenced_blocks(text: &str) -> impl Iterator<Item = &str> {
    FENCED_BLOCK
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|block| !block.is_empty())
}

/// Returns the object that starts at the first `{"key":` in `text`, ending at the brace
/// that brings the depth back to zero. Braces inside string literals are not counted and a
/// backslash always consumes the character after it. `None` if the object never closes.
pub fn balanced_object(text: &str) -> Option<&str> {
    let start = OBJECT_START.find(text)?.start();
    let candidate = &text[start..];

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in candidate.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }

        match c {
            '\\' => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&candidate[..i + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Rebuilds an object from a `"varieties": [{...` run whose opening brace is missing:
/// everything from the key to the end of the text, prefixed with `{`, with one `}`
/// appended for every brace left open.
pub fn anchored_varieties(text: &str) -> Option<String> {
    let start = VARIETIES_ANCHOR.find(text)?.start();
    let tail = text[start..].trim_end();

    let mut candidate = String::with_capacity(tail.len() + 4);
    candidate.push('{');
    candidate.push_str(tail);

    let opened = candidate.matches('{').count();
    let closed = candidate.matches('}').count();
    if opened > closed {
        candidate.push_str(&"}".repeat(opened - closed));
    }

    Some(candidate)
}
