use crate::error::BuildError;
use crate::model::NodeKind;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// How the editor should treat a property's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueType {
    Expression,
    Identifier,
    Type,
    Enum,
    Boolean,
    String,
    Number,
}

/// A single typed, self-describing value carried by a flow node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    #[serde(skip)]
    pub key: String,
    #[serde(default)]
    pub display_label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub value_type: ValueType,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub optional: bool,
    #[serde(default = "default_editable")]
    pub editable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

fn default_editable() -> bool {
    true
}

impl Property {
    pub const VARIABLE_KEY: &'static str = "variable";
    pub const EXPRESSION_KEY: &'static str = "expression";
    pub const CONDITION_KEY: &'static str = "condition";
    pub const CONNECTION_KEY: &'static str = "connection";
    pub const SCOPE_KEY: &'static str = "scope";
    pub const DATA_TYPE_KEY: &'static str = "type";
    pub const TARGET_TYPE_KEY: &'static str = "targetType";
    pub const FUNCTION_NAME_KEY: &'static str = "functionName";
    pub const INPUTS_KEY: &'static str = "inputs";

    /// Keys that describe the shape of a call rather than one of its arguments.
    pub const STRUCTURAL_KEYS: [&'static str; 5] = [
        Self::CONNECTION_KEY,
        Self::VARIABLE_KEY,
        Self::DATA_TYPE_KEY,
        Self::TARGET_TYPE_KEY,
        Self::SCOPE_KEY,
    ];

    pub fn new(key: &str, display_label: &str, value_type: ValueType) -> Self {
        Self {
            key: key.to_string(),
            display_label: display_label.to_string(),
            description: String::new(),
            value_type,
            value: Value::Null,
            optional: false,
            editable: true,
            default_value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    /// Sets both the default and the current value, as templates do.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.default_value = Some(value.clone());
        self.value = value;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn variable(name: &str) -> Self {
        Property::new(Self::VARIABLE_KEY, "Variable", ValueType::Identifier)
            .with_value(name)
            .with_description("Name of the variable")
    }

    pub fn data_type(type_desc: &str) -> Self {
        Property::new(Self::DATA_TYPE_KEY, "Type", ValueType::Type)
            .with_value(type_desc)
            .with_description("Type of the variable")
    }

    pub fn connection(name: &str) -> Self {
        Property::new(Self::CONNECTION_KEY, "Connection", ValueType::Identifier)
            .with_value(name)
            .editable(false)
    }

    pub fn expression(text: &str) -> Self {
        Property::new(Self::EXPRESSION_KEY, "Expression", ValueType::Expression).with_value(text)
    }

    pub fn condition(text: &str) -> Self {
        Property::new(Self::CONDITION_KEY, "Condition", ValueType::Expression)
            .with_value(text)
            .with_description("Boolean condition")
    }

    /// The value rendered as source text. `null` renders as the empty string.
    pub fn source_text(&self) -> String {
        match &self.value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.source_text().trim().is_empty()
    }
}

/// The lexical tier a declaration lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Local,
    Global,
    Service,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Local => "Local",
            Scope::Global => "Global",
            Scope::Service => "Service",
        }
    }

    /// The `scope` property a connection node carries.
    pub fn property(&self) -> Property {
        Property::new(Property::SCOPE_KEY, "Connection Scope", ValueType::Enum)
            .with_value(self.as_str())
            .with_description("Where the connection is declared")
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Local" => Ok(Scope::Local),
            "Global" => Ok(Scope::Global),
            "Service" => Ok(Scope::Service),
            other => Err(BuildError::InvalidScope {
                value: other.to_string(),
            }),
        }
    }
}

/// Ordered property bag with unique keys.
///
/// Insertion order is significant: call arguments are rendered in the order their
/// properties were added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    entries: Vec<Property>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a property, replacing (in place) any existing property with the same key.
    pub fn insert(&mut self, property: Property) {
        match self.entries.iter_mut().find(|p| p.key == property.key) {
            Some(existing) => *existing = property,
            None => self.entries.push(property),
        }
    }

    /// Inserts the property only when its key is not present yet.
    pub fn insert_if_absent(&mut self, property: Property) {
        if !self.contains_key(&property.key) {
            self.entries.push(property);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Property> {
        self.entries.iter().find(|p| p.key == key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Property> {
        self.entries.iter_mut().find(|p| p.key == key)
    }

    /// Returns the property's source text when present and non-empty.
    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key)
            .filter(|p| !p.is_empty())
            .map(Property::source_text)
    }

    /// Like [`Properties::text`], but absence is a contract violation for `kind`.
    pub fn require(&self, kind: NodeKind, key: &str) -> Result<String, BuildError> {
        self.text(key)
            .ok_or_else(|| BuildError::MissingRequiredProperty {
                kind,
                key: key.to_string(),
            })
    }

    pub fn remove(&mut self, key: &str) -> Option<Property> {
        let index = self.entries.iter().position(|p| p.key == key)?;
        Some(self.entries.remove(index))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|p| p.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|p| p.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<Property> for Properties {
    fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
        let mut properties = Properties::new();
        for property in iter {
            properties.insert(property);
        }
        properties
    }
}

impl IntoIterator for Properties {
    type Item = Property;
    type IntoIter = std::vec::IntoIter<Property>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for Properties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for property in &self.entries {
            map.serialize_entry(&property.key, property)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Properties {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PropertiesVisitor;

        impl<'de> Visitor<'de> for PropertiesVisitor {
            type Value = Properties;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of property keys to properties")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Properties, A::Error> {
                let mut properties = Properties::new();
                while let Some((key, mut property)) = access.next_entry::<String, Property>()? {
                    if properties.contains_key(&key) {
                        return Err(de::Error::custom(format!(
                            "duplicate property key '{}'",
                            key
                        )));
                    }
                    property.key = key;
                    properties.entries.push(property);
                }
                Ok(properties)
            }
        }

        deserializer.deserialize_map(PropertiesVisitor)
    }
}
