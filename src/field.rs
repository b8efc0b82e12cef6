//! Field descriptors: the immutable per-property records a model is built from.
//!
//! A descriptor is exactly one of three kinds:
//!
//! - a primitive field carrying one type tag or a union of tags (`["string", "null"]`)
//! - a reference to another model, resolved by name when the registry is finalized
//! - an array whose items are either a primitive item descriptor or a reference
//!
//! Objects are never declared inline. A nested object is always a reference to a
//! named model, which is what lets the schema compiler share nodes and represent cycles.
//!
//! # Example
//!
//! ```
//! use openapi_from_models::field::{FieldDescriptor, ItemDescriptor};
//! use serde_json::json;
//!
//! let currency = FieldDescriptor::string("currency")
//!     .required()
//!     .enum_values(vec![json!("USD"), json!("EUR"), json!("CNY")]);
//! let tags = FieldDescriptor::array_of("tags", ItemDescriptor::string());
//! let owner = FieldDescriptor::reference("owner", "User").required();
//!
//! assert!(currency.is_required());
//! assert!(!tags.is_required());
//! assert_eq!(owner.reference_target(), Some("User"));
//! ```

use crate::error::{Error, Result};
use crate::registry::ModelRef;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Primitive type tags accepted on field descriptors.
///
/// There is no `object` tag: nested objects are references to named models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Null,
}

impl TypeTag {
    /// Parse a textual tag, rejecting unknown tags and `object`.
    pub fn parse(field: &str, tag: &str) -> Result<Self> {
        match tag {
            "string" => Ok(TypeTag::String),
            "integer" => Ok(TypeTag::Integer),
            "number" => Ok(TypeTag::Number),
            "boolean" => Ok(TypeTag::Boolean),
            "array" => Ok(TypeTag::Array),
            "null" => Ok(TypeTag::Null),
            "object" => Err(Error::invalid_field(
                field,
                "inline objects are not allowed; reference a named model instead",
            )),
            other => Err(Error::invalid_field(
                field,
                format!(
                    "unknown type tag '{}' (allowed: string, integer, number, boolean, array, null)",
                    other
                ),
            )),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::Integer => "integer",
            TypeTag::Number => "number",
            TypeTag::Boolean => "boolean",
            TypeTag::Array => "array",
            TypeTag::Null => "null",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TypeTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TypeTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        TypeTag::parse("type", &tag).map_err(serde::de::Error::custom)
    }
}

/// Parse a non-empty union of textual tags.
fn parse_union(field: &str, tags: &[&str]) -> Result<Vec<TypeTag>> {
    if tags.is_empty() {
        return Err(Error::invalid_field(field, "type union must not be empty"));
    }
    let mut parsed: Vec<TypeTag> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = TypeTag::parse(field, tag)?;
        if !parsed.contains(&tag) {
            parsed.push(tag);
        }
    }
    Ok(parsed)
}

/// Primitive item descriptor for array fields.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveItem {
    types: Vec<TypeTag>,
    format: Option<String>,
    enum_values: Option<Vec<Value>>,
}

impl PrimitiveItem {
    pub fn types(&self) -> &[TypeTag] {
        &self.types
    }

    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    pub fn enum_values(&self) -> Option<&[Value]> {
        self.enum_values.as_deref()
    }
}

/// Describes the items of an array field.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemDescriptor {
    Primitive(PrimitiveItem),
    Reference(ModelRef),
}

impl ItemDescriptor {
    fn primitive(tag: TypeTag) -> Self {
        ItemDescriptor::Primitive(PrimitiveItem {
            types: vec![tag],
            format: None,
            enum_values: None,
        })
    }

    pub fn string() -> Self {
        Self::primitive(TypeTag::String)
    }

    pub fn integer() -> Self {
        Self::primitive(TypeTag::Integer)
    }

    pub fn number() -> Self {
        Self::primitive(TypeTag::Number)
    }

    pub fn boolean() -> Self {
        Self::primitive(TypeTag::Boolean)
    }

    /// Items typed by a textual union. Nested arrays are not supported.
    pub fn typed(tags: &[&str]) -> Result<Self> {
        let types = parse_union("items", tags)?;
        if types.contains(&TypeTag::Array) {
            return Err(Error::invalid_field("items", "nested arrays are not supported"));
        }
        Ok(ItemDescriptor::Primitive(PrimitiveItem {
            types,
            format: None,
            enum_values: None,
        }))
    }

    pub fn reference(target: impl Into<ModelRef>) -> Self {
        ItemDescriptor::Reference(target.into())
    }

    /// Set the item format. Ignored on reference items.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        if let ItemDescriptor::Primitive(item) = &mut self {
            item.format = Some(format.into());
        }
        self
    }

    /// Set the item enum. Ignored on reference items.
    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        if let ItemDescriptor::Primitive(item) = &mut self {
            item.enum_values = Some(values);
        }
        self
    }
}

/// The shape of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// One primitive tag or a union of tags (never `array`, never `object`)
    Primitive(Vec<TypeTag>),
    /// A lazily resolved reference to another model
    Reference { target: ModelRef, nullable: bool },
    /// An array of primitives or references
    Array { items: ItemDescriptor, nullable: bool },
}

/// Immutable metadata for one model property.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    name: String,
    kind: FieldKind,
    required: bool,
    description: Option<String>,
    format: Option<String>,
    enum_values: Option<Vec<Value>>,
    default: Option<Value>,
    example: Option<Value>,
}

impl FieldDescriptor {
    fn with_kind(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            description: None,
            format: None,
            enum_values: None,
            default: None,
            example: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::Primitive(vec![TypeTag::String]))
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::Primitive(vec![TypeTag::Integer]))
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::Primitive(vec![TypeTag::Number]))
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::Primitive(vec![TypeTag::Boolean]))
    }

    /// A primitive field typed by textual tags, e.g. `&["string", "null"]`.
    ///
    /// Unknown tags and `object` are rejected here, as is `array`: array
    /// fields need an item descriptor and are built with [`FieldDescriptor::array_of`].
    pub fn typed(name: impl Into<String>, tags: &[&str]) -> Result<Self> {
        let name = name.into();
        let types = parse_union(&name, tags)?;
        if types.contains(&TypeTag::Array) {
            return Err(Error::invalid_field(
                &name,
                "array fields must provide an item descriptor",
            ));
        }
        Ok(Self::with_kind(name, FieldKind::Primitive(types)))
    }

    pub fn reference(name: impl Into<String>, target: impl Into<ModelRef>) -> Self {
        Self::with_kind(
            name,
            FieldKind::Reference {
                target: target.into(),
                nullable: false,
            },
        )
    }

    pub fn array_of(name: impl Into<String>, items: ItemDescriptor) -> Self {
        Self::with_kind(
            name,
            FieldKind::Array {
                items,
                nullable: false,
            },
        )
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Add `null` to the field's type union.
    pub fn nullable(mut self) -> Self {
        match &mut self.kind {
            FieldKind::Primitive(types) => {
                if !types.contains(&TypeTag::Null) {
                    types.push(TypeTag::Null);
                }
            }
            FieldKind::Reference { nullable, .. } | FieldKind::Array { nullable, .. } => {
                *nullable = true;
            }
        }
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn enum_values(mut self, values: Vec<Value>) -> Self {
        self.enum_values = Some(values);
        self
    }

    /// Declared default. `null` counts as no default.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = (!value.is_null()).then_some(value);
        self
    }

    /// Explicit example literal. `null` counts as no example.
    pub fn example(mut self, value: Value) -> Self {
        self.example = (!value.is_null()).then_some(value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn format_name(&self) -> Option<&str> {
        self.format.as_deref()
    }

    pub fn enum_list(&self) -> Option<&[Value]> {
        self.enum_values.as_deref()
    }

    pub fn default_literal(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn example_literal(&self) -> Option<&Value> {
        self.example.as_ref()
    }

    /// Name of the model this field points at, directly or through its items.
    pub fn reference_target(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Reference { target, .. } => Some(target.name()),
            FieldKind::Array {
                items: ItemDescriptor::Reference(target),
                ..
            } => Some(target.name()),
            _ => None,
        }
    }

    /// Check the descriptor rules that builders cannot enforce on their own.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_field(&self.name, "field name must not be empty"));
        }
        match &self.kind {
            FieldKind::Primitive(types) => {
                if types.is_empty() {
                    return Err(Error::invalid_field(&self.name, "type union must not be empty"));
                }
                if types.contains(&TypeTag::Array) {
                    return Err(Error::invalid_field(
                        &self.name,
                        "array fields must provide an item descriptor",
                    ));
                }
            }
            FieldKind::Reference { nullable, .. } => {
                if *nullable {
                    return Err(Error::invalid_field(
                        &self.name,
                        "reference fields cannot be nullable",
                    ));
                }
                if self.format.is_some() || self.enum_values.is_some() {
                    return Err(Error::invalid_field(
                        &self.name,
                        "format and enum are not allowed on reference fields",
                    ));
                }
            }
            FieldKind::Array { items, .. } => {
                if self.format.is_some() || self.enum_values.is_some() {
                    return Err(Error::invalid_field(
                        &self.name,
                        "format and enum belong on the item descriptor of an array field",
                    ));
                }
                if let ItemDescriptor::Primitive(item) = items {
                    if item.types.is_empty() {
                        return Err(Error::invalid_field(
                            &self.name,
                            "item type union must not be empty",
                        ));
                    }
                    if item.types.contains(&TypeTag::Array) {
                        return Err(Error::invalid_field(
                            &self.name,
                            "nested arrays are not supported",
                        ));
                    }
                }
            }
        }
        if let Some(values) = &self.enum_values {
            if values.is_empty() {
                return Err(Error::invalid_field(&self.name, "enum must not be empty"));
            }
        }
        Ok(())
    }
}
