use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiErrorKind;

/// What the caller expects a completion to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedShape {
    Record,
    VarietyList,
}

/// A single suggested variety. Keys other than `name` and `description` are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variety {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Variety {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            extra: Map::new(),
        }
    }

    /// Accepts an object with a non-blank string `name`. A missing or null description
    /// becomes empty; numbers, booleans and nested values are kept as their JSON text.
    fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut object) = value else {
            return None;
        };

        let name = match object.remove("name")? {
            Value::String(name) if !name.trim().is_empty() => name,
            _ => return None,
        };
        let description = match object.remove("description") {
            Some(Value::String(description)) => description,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        Some(Self {
            name,
            description,
            extra: object,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VarietyList {
    pub varieties: Vec<Variety>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VarietyList {
    pub fn new(varieties: Vec<Variety>) -> Self {
        Self {
            varieties,
            extra: Map::new(),
        }
    }

    /// Accepts `{"varieties": [...]}` or a bare array of variety objects. Entries without a
    /// usable name are dropped; at least one must remain.
    pub fn from_value(value: Value) -> Option<Self> {
        let (entries, extra) = match value {
            Value::Object(mut object) => match object.remove("varieties")? {
                Value::Array(entries) => (entries, object),
                _ => return None,
            },
            Value::Array(entries) => (entries, Map::new()),
            _ => return None,
        };

        let varieties: Vec<Variety> = entries.into_iter().filter_map(Variety::from_value).collect();
        if varieties.is_empty() {
            return None;
        }

        Some(Self { varieties, extra })
    }

    pub fn len(&self) -> usize {
        self.varieties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.varieties.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.varieties.iter().map(|v| v.name.as_str())
    }
}

/// Structured horticultural record. Field order follows the source text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeedRecord(Map<String, Value>);

impl SeedRecord {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Only non-empty JSON objects are records.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) if !fields.is_empty() => Some(Self(fields)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExtractionResult {
    Record(SeedRecord),
    Varieties(VarietyList),
}

impl ExtractionResult {
    pub fn as_record(&self) -> Option<&SeedRecord> {
        match self {
            Self::Record(record) => Some(record),
            Self::Varieties(_) => None,
        }
    }

    pub fn as_varieties(&self) -> Option<&VarietyList> {
        match self {
            Self::Varieties(list) => Some(list),
            Self::Record(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Record(record) => Value::Object(record.fields().clone()),
            Self::Varieties(list) => serde_json::to_value(list).unwrap_or(Value::Null),
        }
    }
}

/// The extraction step that produced a result, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    FencedBlock,
    WholeString,
    BalancedBrace,
    AnchoredArray,
    FieldPairing,
    FreeText,
    FallbackTable,
}

impl Strategy {
    pub const ALL: [Strategy; 7] = [
        Strategy::FencedBlock,
        Strategy::WholeString,
        Strategy::BalancedBrace,
        Strategy::AnchoredArray,
        Strategy::FieldPairing,
        Strategy::FreeText,
        Strategy::FallbackTable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::FencedBlock => "fenced_block",
            Strategy::WholeString => "whole_string",
            Strategy::BalancedBrace => "balanced_brace",
            Strategy::AnchoredArray => "anchored_array",
            Strategy::FieldPairing => "field_pairing",
            Strategy::FreeText => "free_text",
            Strategy::FallbackTable => "fallback_table",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// True when the result was decoded from actual JSON in the response.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            Strategy::FencedBlock
                | Strategy::WholeString
                | Strategy::BalancedBrace
                | Strategy::AnchoredArray
        )
    }
}

/// A value together with the strategy that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted<T> {
    pub value: T,
    pub strategy: Strategy,
}

impl<T> Extracted<T> {
    pub fn new(value: T, strategy: Strategy) -> Self {
        Self { value, strategy }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Extracted<U> {
        Extracted {
            value: f(self.value),
            strategy: self.strategy,
        }
    }
}

pub type ExtractionOutcome = Extracted<ExtractionResult>;

/// Search parameters for a seed lookup. At least one field must be non-blank.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedQuery {
    #[serde(default)]
    pub variety: Option<String>,
    #[serde(default)]
    pub plant_type: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
}

impl SeedQuery {
    fn labelled(&self) -> [(&'static str, Option<&str>); 4] {
        [
            ("seed variety", self.variety.as_deref()),
            ("plant type", self.plant_type.as_deref()),
            ("brand", self.brand.as_deref()),
            ("SKU/UPC", self.sku.as_deref()),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.labelled()
            .into_iter()
            .all(|(_, value)| value.is_none_or(|v| v.trim().is_empty()))
    }

    /// "seed variety: Roma, plant type: tomato"
    pub fn context(&self) -> String {
        self.labelled()
            .into_iter()
            .filter_map(|(label, value)| {
                let value = value?.trim();
                (!value.is_empty()).then(|| format!("{label}: {value}"))
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Result of identifying a seed or plant from a photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAnalysis {
    pub identification: String,
    pub variety: String,
    pub characteristics: Vec<String>,
    pub confidence_level: String,
    pub notes: String,
}

impl ImageAnalysis {
    pub fn from_record(record: &SeedRecord) -> Self {
        let text = |key: &str| record.get_str(key).unwrap_or_default().trim().to_string();

        let characteristics = match record.get("characteristics") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.trim().to_string(),
                    other => other.to_string(),
                })
                .filter(|s| !s.is_empty())
                .collect(),
            Some(Value::String(list)) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };

        let confidence_level = record
            .get_str("confidence_level")
            .map(|level| level.trim().to_lowercase())
            .filter(|level| matches!(level.as_str(), "high" | "medium" | "low"))
            .unwrap_or_else(|| "low".to_string());

        Self {
            identification: text("identification"),
            variety: text("variety"),
            characteristics,
            confidence_level,
            notes: text("notes"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionCheck {
    pub ok: bool,
    pub message: String,
    /// Raw reply text, empty when the call itself failed.
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ApiErrorKind>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_variety_list_accepts_wrapped_and_bare_arrays() {
        let wrapped = VarietyList::from_value(json!({
            "varieties": [{"name": "Roma", "description": "Paste tomato"}]
        }))
        .unwrap();
        let bare = VarietyList::from_value(json!([
            {"name": "Roma", "description": "Paste tomato"}
        ]))
        .unwrap();

        assert_eq!(wrapped, bare);
        assert_eq!(wrapped.names().collect::<Vec<_>>(), vec!["Roma"]);
    }

    #[test]
    fn test_variety_list_keeps_extra_fields() {
        let list = VarietyList::from_value(json!({
            "plant": "tomato",
            "varieties": [{"name": "Roma", "botanical_name": "Solanum lycopersicum"}]
        }))
        .unwrap();

        assert_eq!(list.extra["plant"], "tomato");
        assert_eq!(list.varieties[0].description, "");
        assert_eq!(
            list.varieties[0].extra["botanical_name"],
            "Solanum lycopersicum"
        );
    }

    #[test]
    fn test_variety_list_rejects_lists_without_usable_entries() {
        assert!(VarietyList::from_value(json!({"varieties": []})).is_none());
        assert!(VarietyList::from_value(json!({"varieties": [{"name": ""}, "B", 3]})).is_none());
        assert!(VarietyList::from_value(json!({"name": "A", "description": "B"})).is_none());
        assert!(VarietyList::from_value(json!("Roma")).is_none());
    }

    #[test]
    fn test_variety_list_keeps_imperfect_entries() {
        let list = VarietyList::from_value(json!({"varieties": [
            {"name": "Roma", "description": "Paste"},
            {"name": "Cherry", "description": 42},
            {"name": "  ", "description": "no name"},
            "Brandywine",
            {"name": "Celebrity", "description": true}
        ]}))
        .unwrap();

        assert_eq!(list.names().collect::<Vec<_>>(), vec!["Roma", "Cherry", "Celebrity"]);
        assert_eq!(list.varieties[1].description, "42");
        assert_eq!(list.varieties[2].description, "true");
    }

    #[test]
    fn test_record_requires_non_empty_object() {
        assert!(SeedRecord::from_value(json!({})).is_none());
        assert!(SeedRecord::from_value(json!([{"seed_name": "Tomato"}])).is_none());
        assert!(SeedRecord::from_value(json!(null)).is_none());

        let record = SeedRecord::from_value(json!({"seed_name": "Tomato"})).unwrap();
        assert_eq!(record.get_str("seed_name"), Some("Tomato"));
    }

    #[test]
    fn test_seed_query_context() {
        let query = SeedQuery {
            variety: Some("Roma".into()),
            plant_type: Some("  ".into()),
            brand: None,
            sku: Some("0123".into()),
        };

        assert!(!query.is_empty());
        assert_eq!(query.context(), "seed variety: Roma, SKU/UPC: 0123");
        assert!(SeedQuery::default().is_empty());
    }

    #[test]
    fn test_image_analysis_defaults() {
        let record = SeedRecord::from_value(json!({
            "identification": "Sunflower",
            "characteristics": "tall, yellow petals, ",
            "confidence_level": "certain"
        }))
        .unwrap();

        let analysis = ImageAnalysis::from_record(&record);
        assert_eq!(analysis.identification, "Sunflower");
        assert_eq!(analysis.variety, "");
        assert_eq!(analysis.characteristics, vec!["tall", "yellow petals"]);
        assert_eq!(analysis.confidence_level, "low");
    }
}
