//! Schema types

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// JSON Schema type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Null,
}

impl JsonType {
    /// Check whether a (non-null) JSON value is of this type
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            JsonType::String => value.is_string(),
            JsonType::Number => value.is_number(),
            JsonType::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            JsonType::Boolean => value.is_boolean(),
            JsonType::Object => value.is_object(),
            JsonType::Array => value.is_array(),
            JsonType::Null => value.is_null(),
        }
    }
}

impl std::fmt::Display for JsonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsonType::String => write!(f, "string"),
            JsonType::Number => write!(f, "number"),
            JsonType::Integer => write!(f, "integer"),
            JsonType::Boolean => write!(f, "boolean"),
            JsonType::Object => write!(f, "object"),
            JsonType::Array => write!(f, "array"),
            JsonType::Null => write!(f, "null"),
        }
    }
}

/// JSON type can be a single type or array of types (for nullable)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonTypeOrArray {
    Single(JsonType),
    Multiple(Vec<JsonType>),
}

impl JsonTypeOrArray {
    /// Create a single type
    pub fn single(t: JsonType) -> Self {
        JsonTypeOrArray::Single(t)
    }

    /// Create a nullable type
    pub fn nullable(t: JsonType) -> Self {
        if t == JsonType::Null {
            JsonTypeOrArray::Single(JsonType::Null)
        } else {
            JsonTypeOrArray::Multiple(vec![t, JsonType::Null])
        }
    }

    /// Check if this type is nullable
    pub fn is_nullable(&self) -> bool {
        match self {
            JsonTypeOrArray::Single(t) => *t == JsonType::Null,
            JsonTypeOrArray::Multiple(types) => types.contains(&JsonType::Null),
        }
    }

    /// Get the primary (non-null) type
    pub fn primary_type(&self) -> Option<JsonType> {
        match self {
            JsonTypeOrArray::Single(t) => Some(*t),
            JsonTypeOrArray::Multiple(types) => types.iter().copied().find(|t| *t != JsonType::Null),
        }
    }

    /// Check whether a value matches any of the listed types
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            JsonTypeOrArray::Single(t) => t.matches(value),
            JsonTypeOrArray::Multiple(types) => types.iter().any(|t| t.matches(value)),
        }
    }
}

impl std::fmt::Display for JsonTypeOrArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JsonTypeOrArray::Single(t) => write!(f, "{t}"),
            JsonTypeOrArray::Multiple(types) => {
                let names: Vec<String> = types.iter().map(ToString::to_string).collect();
                write!(f, "{}", names.join("|"))
            }
        }
    }
}

/// JSON Schema property definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaProperty {
    /// Property type(s)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub json_type: Option<JsonTypeOrArray>,

    /// Format hint (e.g., "date-time")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Nested properties (for objects)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, SchemaProperty>>,

    /// Array items schema
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaProperty>>,

    /// Alternative schemas, any of which may match
    #[serde(rename = "anyOf", skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<SchemaProperty>>,
}

impl SchemaProperty {
    /// Create a nullable property of the given type
    pub fn nullable(json_type: JsonType) -> Self {
        Self {
            json_type: Some(JsonTypeOrArray::nullable(json_type)),
            format: None,
            properties: None,
            items: None,
            any_of: None,
        }
    }

    /// Nullable RFC 3339 timestamp
    pub fn date_time() -> Self {
        Self::nullable(JsonType::String).with_format("date-time")
    }

    /// Nullable free-form object
    pub fn object() -> Self {
        Self {
            properties: Some(BTreeMap::new()),
            ..Self::nullable(JsonType::Object)
        }
    }

    /// Nullable array with item schema
    pub fn array(items: SchemaProperty) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::nullable(JsonType::Array)
        }
    }

    /// Value may match any of the given schemas
    pub fn any_of(options: Vec<SchemaProperty>) -> Self {
        Self {
            json_type: None,
            format: None,
            properties: None,
            items: None,
            any_of: Some(options),
        }
    }

    /// Set format hint
    #[must_use]
    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    /// Check if nullable
    pub fn is_nullable(&self) -> bool {
        self.json_type.as_ref().is_some_and(JsonTypeOrArray::is_nullable)
            || self
                .any_of
                .as_ref()
                .is_some_and(|options| options.iter().any(SchemaProperty::is_nullable))
    }

    /// Check whether a value conforms to this property
    ///
    /// Only the top-level type, array items and the `date-time` format are
    /// checked.
    pub fn accepts(&self, value: &Value) -> bool {
        if let Some(options) = &self.any_of {
            return options.iter().any(|o| o.accepts(value));
        }
        if value.is_null() {
            return self.is_nullable();
        }
        let Some(json_type) = &self.json_type else {
            return true;
        };
        if !json_type.matches(value) {
            return false;
        }
        if let (Some(items), Some(values)) = (&self.items, value.as_array()) {
            return values.iter().all(|v| items.accepts(v));
        }
        match (self.format.as_deref(), value.as_str()) {
            (Some("date-time"), Some(s)) => DateTime::parse_from_rfc3339(s).is_ok(),
            _ => true,
        }
    }

    /// Human readable type description for log messages
    pub fn describe(&self) -> String {
        if let Some(options) = &self.any_of {
            let names: Vec<String> = options.iter().map(SchemaProperty::describe).collect();
            return format!("anyOf({})", names.join(", "));
        }
        let base = self
            .json_type
            .as_ref()
            .map_or_else(|| "any".to_string(), ToString::to_string);
        match &self.format {
            Some(format) => format!("{base} ({format})"),
            None => base,
        }
    }
}

/// Full JSON Schema document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSchema {
    /// Schema type (always "object" for top-level)
    #[serde(rename = "type")]
    pub json_type: JsonType,

    /// Object properties
    #[serde(default)]
    pub properties: BTreeMap<String, SchemaProperty>,
}

impl Default for JsonSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonSchema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self {
            json_type: JsonType::Object,
            properties: BTreeMap::new(),
        }
    }

    /// Add a property
    #[must_use]
    pub fn property(mut self, name: &str, property: SchemaProperty) -> Self {
        self.properties.insert(name.to_string(), property);
        self
    }

    /// Add a nullable string property
    #[must_use]
    pub fn string(self, name: &str) -> Self {
        self.property(name, SchemaProperty::nullable(JsonType::String))
    }

    /// Add a nullable boolean property
    #[must_use]
    pub fn boolean(self, name: &str) -> Self {
        self.property(name, SchemaProperty::nullable(JsonType::Boolean))
    }

    /// Add a nullable number property
    #[must_use]
    pub fn number(self, name: &str) -> Self {
        self.property(name, SchemaProperty::nullable(JsonType::Number))
    }

    /// Add a nullable integer property
    #[must_use]
    pub fn integer(self, name: &str) -> Self {
        self.property(name, SchemaProperty::nullable(JsonType::Integer))
    }

    /// Add a nullable date-time property
    #[must_use]
    pub fn date_time(self, name: &str) -> Self {
        self.property(name, SchemaProperty::date_time())
    }

    /// Add a nullable object property
    #[must_use]
    pub fn object(self, name: &str) -> Self {
        self.property(name, SchemaProperty::object())
    }

    /// Add a nullable array-of-strings property
    #[must_use]
    pub fn string_array(self, name: &str) -> Self {
        self.property(
            name,
            SchemaProperty::array(SchemaProperty::nullable(JsonType::String)),
        )
    }

    /// Add a property that is either a string or a number
    #[must_use]
    pub fn string_or_number(self, name: &str) -> Self {
        self.property(
            name,
            SchemaProperty::any_of(vec![
                SchemaProperty::nullable(JsonType::String),
                SchemaProperty::nullable(JsonType::Number),
            ]),
        )
    }

    /// Get a property
    pub fn get_property(&self, name: &str) -> Option<&SchemaProperty> {
        self.properties.get(name)
    }

    /// Check whether a property is declared
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Keep only the properties for which `keep` returns true
    #[must_use]
    pub fn retain_properties(mut self, mut keep: impl FnMut(&str) -> bool) -> Self {
        self.properties.retain(|name, _| keep(name));
        self
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
