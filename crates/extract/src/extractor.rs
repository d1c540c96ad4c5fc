//! Tolerant extraction of structured data from completion text.
//!
//! Strategies run in a fixed order and the first one that yields a usable value wins:
//!
//! 1. fenced code block, strict decode
//! 2. whole string, strict decode
//! 3. first balanced `{"key": ...}` object, strict decode
//! 4. `"varieties": [{...` run with its missing braces restored (variety lists only)
//! 5. regex pairing of `"name"`/`"description"` (variety lists only)
//! 6. free-text field heuristics (records only)
//! 7. curated fallback table (variety lists only)
//!
//! Every entry point is total: records always come back from step 6 at worst and variety
//! lists from step 7.

use serde_json::Value;
use tracing::debug;

use crate::schema::{
    ExpectedShape, Extracted, ExtractionOutcome, ExtractionResult, SeedRecord, Strategy,
    VarietyList,
};
use crate::{fallback, heuristic, pairing, scan};

const SNIPPET_CHARS: usize = 100;

/// Extract a value of the expected shape from raw completion text. Never fails.
pub fn extract(raw: &str, shape: ExpectedShape, plant_type_hint: Option<&str>) -> ExtractionOutcome {
    match shape {
        ExpectedShape::Record => extract_record(raw).map(ExtractionResult::Record),
        ExpectedShape::VarietyList => {
            extract_varieties(raw, plant_type_hint).map(ExtractionResult::Varieties)
        }
    }
}

pub fn extract_record(raw: &str) -> Extracted<SeedRecord> {
    debug!(input = snippet(raw, SNIPPET_CHARS), "extracting record");

    let extracted = decode_structured(raw, false, SeedRecord::from_value)
        .unwrap_or_else(|| Extracted::new(heuristic::record_from_text(raw), Strategy::FreeText));

    debug!(
        strategy = extracted.strategy.as_str(),
        fields = extracted.value.fields().len(),
        "record extracted"
    );
    extracted
}

pub fn extract_varieties(raw: &str, plant_type_hint: Option<&str>) -> Extracted<VarietyList> {
    debug!(input = snippet(raw, SNIPPET_CHARS), "extracting variety list");

    let extracted = decode_structured(raw, true, VarietyList::from_value)
        .or_else(|| {
            pairing::pair_varieties(raw).map(|list| Extracted::new(list, Strategy::FieldPairing))
        })
        .unwrap_or_else(|| {
            debug!(hint = plant_type_hint, "no varieties in response, using fallback table");
            Extracted::new(fallback::varieties_for(plant_type_hint), Strategy::FallbackTable)
        });

    debug!(
        strategy = extracted.strategy.as_str(),
        count = extracted.value.len(),
        first = extracted.value.names().next(),
        "variety list extracted"
    );
    extracted
}

/// Steps 1-4. `accept` decides whether a decoded value has the right shape; a value it
/// rejects counts as a miss and the next strategy runs.
fn decode_structured<T>(
    raw: &str,
    anchored: bool,
    accept: impl Fn(Value) -> Option<T>,
) -> Option<Extracted<T>> {
    let attempt = |candidate: &str, strategy: Strategy| -> Option<Extracted<T>> {
        match serde_json::from_str::<Value>(candidate) {
            Ok(value) => {
                let accepted = accept(value);
                if accepted.is_none() {
                    debug!(strategy = strategy.as_str(), "decoded JSON has the wrong shape");
                }
                accepted.map(|value| Extracted::new(value, strategy))
            }
            Err(err) => {
                debug!(
                    strategy = strategy.as_str(),
                    error = %err,
                    candidate = snippet(candidate, SNIPPET_CHARS),
                    "candidate is not valid JSON"
                );
                None
            }
        }
    };

    scan::fenced_blocks(raw)
        .find_map(|block| attempt(block, Strategy::FencedBlock))
        .or_else(|| attempt(raw.trim(), Strategy::WholeString))
        .or_else(|| {
            scan::balanced_object(raw).and_then(|object| attempt(object, Strategy::BalancedBrace))
        })
        .or_else(|| {
            if !anchored {
                return None;
            }
            scan::anchored_varieties(raw)
                .and_then(|candidate| attempt(&candidate, Strategy::AnchoredArray))
        })
}

/// At most `max_chars` characters of `text`, cut on a char boundary.
pub(crate) fn snippet(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
