//! This module provides functionality for custom
//! [properties](https://doc.mapeditor.org/en/stable/reference/tmx-map-format/#properties)

use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::{Color, Error, Result};

/// Maximum nesting of class properties inside of each other.
pub(crate) const MAX_CLASS_DEPTH: usize = 32;

/// Reference type to an object stored in this map.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct ObjectReference(pub u32);

#[derive(Debug, PartialEq, Clone)]
#[non_exhaustive]
pub enum PropertyValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Color(Color),
    File(String),
    Object(ObjectReference),
    /// A custom class, consisting of further (nested) properties.
    Class {
        propertytype: String,
        properties: PropertyContainer,
    },
}

impl PropertyValue {
    fn from_xml(tmx: &roxmltree::Node, depth: usize) -> Result<Self> {
        use PropertyValue::*;

        // Multi-line strings are stored as text content instead of the value attribute
        let text = tmx.attribute("value").or_else(|| tmx.text()).unwrap_or_default();

        macro_rules! parse {
            () => {
                if text.is_empty() { Default::default() } else { text.trim().parse()? }
            };
        }

        match tmx.attribute("type").unwrap_or("string") {
            "string" => Ok(String(text.into())),
            "int" => Ok(Int(parse!())),
            "float" => Ok(Float(parse!())),
            "bool" => Ok(Bool(parse!())),
            "color" => Ok(PropertyValue::Color(parse!())),
            "file" => Ok(File(text.into())),
            "object" => Ok(Object(ObjectReference(parse!()))),
            "class" => Ok(Class {
                propertytype: tmx.attribute("propertytype").unwrap_or_default().into(),
                properties: PropertyContainer::from_xml_nested(tmx, depth + 1)?,
            }),
            other => {
                tracing::warn!(
                    "unknown type '{}' for property '{}', keeping it as string",
                    other, tmx.attribute("name").unwrap_or("")
                );
                Ok(String(text.into()))
            }
        }
    }

    fn from_json(property: &JsonProperty) -> Result<Self> {
        use PropertyValue::*;

        let value = &property.value;
        let mismatch = || Error::StructureError{
            tag: "property".into(),
            msg: format!(
                "Value of property '{}' does not match its type '{}'",
                property.name, property.kind
            ),
        };

        let text = || value.as_str().map(|s| s.to_string()).ok_or_else(mismatch);

        Ok(match property.kind.as_str() {
            "string" => String(text()?),
            "int" => Int(value.as_i64().ok_or_else(mismatch)?),
            "float" => Float(value.as_f64().ok_or_else(mismatch)?),
            "bool" => Bool(value.as_bool().ok_or_else(mismatch)?),
            // Tiled writes an empty string for unset colors
            "color" => match value.as_str().ok_or_else(mismatch)? {
                "" => PropertyValue::Color(Default::default()),
                color => PropertyValue::Color(color.parse()?),
            },
            "file" => File(text()?),
            "object" => Object(ObjectReference(
                value.as_u64().ok_or_else(mismatch)?.try_into().map_err(|_| mismatch())?
            )),
            "class" => Class {
                propertytype: property.propertytype.clone(),
                properties: PropertyContainer::from_json_members(value),
            },
            other => {
                tracing::warn!(
                    "unknown type '{}' for property '{}', inferring it from the value",
                    other, property.name
                );
                Self::infer(value)
            }
        })
    }

    /// Guess the type of an untyped json value, as found in the members of class properties.
    fn infer(value: &JsonValue) -> Self {
        use PropertyValue::*;
        match value {
            JsonValue::Bool(b) => Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Int(i),
                None => Float(n.as_f64().unwrap_or_default()),
            },
            JsonValue::String(s) => String(s.clone()),
            JsonValue::Object(_) => Class {
                propertytype: std::string::String::new(),
                properties: PropertyContainer::from_json_members(value),
            },
            JsonValue::Null | JsonValue::Array(_) => String(value.to_string()),
        }
    }
}

/// Property entry as it appears in TMJ and TSJ files.
#[derive(Deserialize, Debug)]
pub(crate) struct JsonProperty {
    name: String,
    #[serde(default = "default_property_type", rename = "type")]
    kind: String,
    #[serde(default)]
    propertytype: String,
    #[serde(default)]
    value: JsonValue,
}

fn default_property_type() -> String {
    "string".into()
}

#[derive(Debug, PartialEq, Clone)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
}

/// A list of custom properties attached to a map, layer, tileset, tile or object.
/// Properties keep the order in which they appear in the file.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct PropertyContainer {
    properties: Vec<Property>
}

impl PropertyContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the properties from an tmx xml node.
    /// This function takes any node in the tmx file that supports properties
    /// and looks for a child node "properties".
    pub(crate) fn from_xml(tmx: &roxmltree::Node) -> Result<Self> {
        Self::from_xml_nested(tmx, 0)
    }

    fn from_xml_nested(tmx: &roxmltree::Node, depth: usize) -> Result<Self> {
        if depth > MAX_CLASS_DEPTH {
            return Err(Error::DepthExceeded{ limit: MAX_CLASS_DEPTH });
        }
        let mut container = PropertyContainer::new();

        let properties = match crate::child(tmx, "properties") {
            Some(properties) => properties,
            None => return Ok(container),
        };

        for property in properties.children().filter(|c| c.tag_name().name() == "property") {
            let name = match property.attribute("name") {
                Some(name) => name,
                None => return Err(
                    Error::StructureError{
                        tag: property.tag_name().name().into(),
                        msg: "Property is missing a name!".into()
                    }
                )
            };

            container.insert(name, PropertyValue::from_xml(&property, depth)?);
        }

        Ok(container)
    }

    pub(crate) fn from_json(properties: &[JsonProperty]) -> Result<Self> {
        let mut container = PropertyContainer::new();
        for property in properties {
            container.insert(&property.name, PropertyValue::from_json(property)?);
        }
        Ok(container)
    }

    /// Class property values are stored as a plain json object of member name to value.
    fn from_json_members(value: &JsonValue) -> Self {
        let mut container = PropertyContainer::new();
        if let JsonValue::Object(members) = value {
            for (name, member) in members {
                container.insert(name, PropertyValue::infer(member));
            }
        }
        container
    }

    /// Insert a property, replacing an existing one with the same name.
    pub fn insert(&mut self, name: &str, value: PropertyValue) {
        match self.properties.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.value = value,
            None => self.properties.push(Property{ name: name.into(), value }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            PropertyValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats and ints are both returned as float.
    pub fn get_float(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            PropertyValue::Float(f) => Some(*f),
            PropertyValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// String and file properties.
    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            PropertyValue::String(s) | PropertyValue::File(s) => Some(s),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item=&Property> {
        self.properties.iter()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
