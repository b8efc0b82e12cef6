//! Definition file loader.
//!
//! Definition files are YAML or JSON documents with two optional top-level
//! lists:
//!
//! ```yaml
//! models:
//!   - name: MenuItem
//!     fields:
//!       - { name: name, type: string, required: true }
//!       - { name: price, type: number, required: true, format: double }
//!       - { name: tags, type: array, items: { type: string } }
//!       - { name: note, type: [string, "null"] }
//!   - name: Menu
//!     fields:
//!       - { name: items, type: array, items: { ref: MenuItem }, required: true }
//! routes:
//!   - path: /menus/{id}
//!     parameters: [{ name: id, in: path, type: integer }]
//!     operations:
//!       - method: get
//!         responses: [{ status: 200, schema: Menu, description: OK }]
//! ```
//!
//! Every loaded file feeds the same [`ModelRegistry`], so a model may reference
//! one declared in a later file.

use crate::error::{Error, Result};
use crate::field::{FieldDescriptor, ItemDescriptor};
use crate::registry::ModelRegistry;
use crate::route::RouteDefinition;
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// On-disk encoding of a definition file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Yaml,
    Json,
}

impl SourceFormat {
    /// Pick the format from a file extension (`.yaml`, `.yml`, `.json`)
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Some(SourceFormat::Yaml),
            Some("json") => Some(SourceFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DefinitionFile {
    #[serde(default)]
    models: Vec<ModelEntry>,
    #[serde(default)]
    routes: Vec<RouteDefinition>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelEntry {
    name: String,
    #[serde(default)]
    fields: Vec<FieldEntry>,
}

/// `type: string` or `type: [string, "null"]`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TypeSpec {
    One(String),
    Union(Vec<String>),
}

impl TypeSpec {
    fn tags(&self) -> Vec<&str> {
        match self {
            TypeSpec::One(tag) => vec![tag.as_str()],
            TypeSpec::Union(tags) => tags.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldEntry {
    name: String,
    #[serde(rename = "type")]
    type_spec: Option<TypeSpec>,
    #[serde(rename = "ref")]
    reference: Option<String>,
    items: Option<ItemEntry>,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    nullable: bool,
    description: Option<String>,
    format: Option<String>,
    #[serde(rename = "enum")]
    enum_values: Option<Vec<Value>>,
    default: Option<Value>,
    example: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ItemEntry {
    #[serde(rename = "type")]
    type_spec: Option<TypeSpec>,
    #[serde(rename = "ref")]
    reference: Option<String>,
    format: Option<String>,
    #[serde(rename = "enum")]
    enum_values: Option<Vec<Value>>,
}

impl ItemEntry {
    fn into_descriptor(self, field: &str) -> Result<ItemDescriptor> {
        let mut item = match (self.reference, self.type_spec) {
            (Some(_), Some(_)) => {
                return Err(Error::invalid_field(field, "items declare both 'type' and 'ref'"))
            }
            (Some(target), None) => return Ok(ItemDescriptor::reference(target)),
            (None, Some(spec)) => ItemDescriptor::typed(&spec.tags())?,
            (None, None) => {
                return Err(Error::invalid_field(field, "items need a 'type' or a 'ref'"))
            }
        };
        if let Some(format) = self.format {
            item = item.with_format(format);
        }
        if let Some(values) = self.enum_values {
            item = item.with_enum(values);
        }
        Ok(item)
    }
}

impl FieldEntry {
    fn into_descriptor(self) -> Result<FieldDescriptor> {
        let name = self.name;
        let is_array = self
            .type_spec
            .as_ref()
            .is_some_and(|spec| spec.tags().contains(&"array"));
        if self.items.is_some() && !is_array {
            return Err(Error::invalid_field(&name, "'items' is only allowed on array fields"));
        }

        let mut field = match (self.reference, self.type_spec) {
            (Some(_), Some(_)) => {
                return Err(Error::invalid_field(&name, "declare either 'type' or 'ref', not both"))
            }
            (Some(target), None) => FieldDescriptor::reference(&name, target),
            (None, Some(spec)) => {
                let tags = spec.tags();
                if is_array {
                    Self::array_descriptor(&name, &tags, self.items)?
                } else {
                    FieldDescriptor::typed(&name, &tags)?
                }
            }
            (None, None) => return Err(Error::invalid_field(&name, "missing 'type' or 'ref'")),
        };

        if self.required {
            field = field.required();
        }
        if self.nullable {
            field = field.nullable();
        }
        if let Some(description) = self.description {
            field = field.description(description);
        }
        if let Some(format) = self.format {
            field = field.format(format);
        }
        if let Some(values) = self.enum_values {
            field = field.enum_values(values);
        }
        if let Some(value) = self.default {
            field = field.default_value(value);
        }
        if let Some(value) = self.example {
            field = field.example(value);
        }
        Ok(field)
    }

    /// `type: array` or `type: [array, "null"]`
    fn array_descriptor(
        name: &str,
        tags: &[&str],
        items: Option<ItemEntry>,
    ) -> Result<FieldDescriptor> {
        if let Some(other) = tags.iter().find(|tag| **tag != "array" && **tag != "null") {
            return Err(Error::invalid_field(
                name,
                format!("'array' cannot be combined with '{}'", other),
            ));
        }
        let items = items
            .ok_or_else(|| Error::invalid_field(name, "array fields must provide 'items'"))?;
        let field = FieldDescriptor::array_of(name, items.into_descriptor(name)?);
        Ok(if tags.contains(&"null") {
            field.nullable()
        } else {
            field
        })
    }
}

/// Models and routes gathered from one or more definition files
#[derive(Debug, Default)]
pub struct Definitions {
    pub registry: ModelRegistry,
    pub routes: Vec<RouteDefinition>,
}

impl Definitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every file in order into one registry
    pub fn from_files<P: AsRef<Path>>(files: &[P]) -> Result<Self> {
        let mut definitions = Self::new();
        for file in files {
            definitions.load_file(file.as_ref())?;
        }
        info!(
            "Loaded {} models and {} routes from {} files",
            definitions.registry.len(),
            definitions.routes.len(),
            files.len()
        );
        Ok(definitions)
    }

    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        debug!("Loading definition file: {}", path.display());
        let format = SourceFormat::from_path(path).ok_or_else(|| Error::Parse {
            file: path.to_path_buf(),
            message: "expected a .yaml, .yml or .json file".to_string(),
        })?;
        let content = fs::read_to_string(path)?;
        self.load_str(&content, format, path)
    }

    /// Load definitions from text; `origin` only labels parse errors
    pub fn load_str(&mut self, content: &str, format: SourceFormat, origin: &Path) -> Result<()> {
        let parsed: DefinitionFile = match format {
            SourceFormat::Yaml if content.trim().is_empty() => return Ok(()),
            SourceFormat::Yaml => serde_yaml::from_str(content).map_err(|e| Error::Parse {
                file: origin.to_path_buf(),
                message: e.to_string(),
            })?,
            SourceFormat::Json => serde_json::from_str(content).map_err(|e| Error::Parse {
                file: origin.to_path_buf(),
                message: e.to_string(),
            })?,
        };

        for model in parsed.models {
            let fields = model
                .fields
                .into_iter()
                .map(FieldEntry::into_descriptor)
                .collect::<Result<Vec<_>>>()?;
            self.registry.register(model.name, fields)?;
        }
        self.routes.extend(parsed.routes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldKind, TypeTag};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::PathBuf;

    fn load_yaml(content: &str) -> Result<Definitions> {
        let mut definitions = Definitions::new();
        definitions.load_str(content, SourceFormat::Yaml, Path::new("inline.yaml"))?;
        Ok(definitions)
    }

    #[test]
    fn test_load_models_and_routes() {
        let definitions = load_yaml(
            r#"
models:
  - name: MenuItem
    fields:
      - name: name
        type: string
        required: true
        example: Fried Rice
      - name: price
        type: number
        format: double
        required: true
      - name: tags
        type: array
        items: { type: string, enum: [spicy, vegan] }
      - name: note
        type: [string, "null"]
routes:
  - path: /items
    operations:
      - method: get
        responses:
          - { status: 200, schema: MenuItem, description: OK }
"#,
        )
        .unwrap();

        let item = definitions.registry.get("MenuItem").unwrap();
        let names: Vec<_> = item.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["name", "price", "tags", "note"]);
        assert_eq!(item.fields()[0].example_literal(), Some(&json!("Fried Rice")));
        assert_eq!(item.fields()[1].format_name(), Some("double"));
        assert_eq!(
            item.fields()[3].kind(),
            &FieldKind::Primitive(vec![TypeTag::String, TypeTag::Null])
        );
        assert_eq!(definitions.routes.len(), 1);
    }

    #[test]
    fn test_nullable_array_and_reference_items() {
        let definitions = load_yaml(
            r#"
models:
  - name: Menu
    fields:
      - { name: items, type: [array, "null"], items: { ref: MenuItem } }
  - name: MenuItem
    fields: []
"#,
        )
        .unwrap();

        let field = &definitions.registry.get("Menu").unwrap().fields()[0];
        assert_eq!(
            field.kind(),
            &FieldKind::Array {
                items: ItemDescriptor::reference("MenuItem"),
                nullable: true
            }
        );
    }

    #[test]
    fn test_array_without_items_is_rejected() {
        let err = load_yaml("models:\n  - name: A\n    fields:\n      - { name: xs, type: array }\n")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidField { ref field, .. } if field == "xs"));
    }

    #[test]
    fn test_items_outside_array_fields_are_rejected() {
        for field in [
            "{ name: tags, type: string, items: { type: integer } }",
            "{ name: b, ref: A, items: { ref: A } }",
        ] {
            let content = format!("models:\n  - name: A\n    fields:\n      - {}\n", field);
            match load_yaml(&content).unwrap_err() {
                Error::InvalidField { message, .. } => {
                    assert_eq!(message, "'items' is only allowed on array fields")
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_object_tag_is_rejected() {
        let err = load_yaml("models:\n  - name: A\n    fields:\n      - { name: meta, type: object }\n")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidField { .. }));
    }

    #[test]
    fn test_type_and_ref_together_are_rejected() {
        let err = load_yaml(
            "models:\n  - name: A\n    fields:\n      - { name: b, type: string, ref: B }\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidField { .. }));
    }

    #[test]
    fn test_duplicate_model_across_loads() {
        let mut definitions = Definitions::new();
        let content = "models:\n  - name: A\n    fields: []\n";
        definitions
            .load_str(content, SourceFormat::Yaml, Path::new("a.yaml"))
            .unwrap();
        let err = definitions
            .load_str(content, SourceFormat::Yaml, Path::new("b.yaml"))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateModel { .. }));
    }

    #[test]
    fn test_parse_error_names_the_file() {
        let err = load_yaml("models: [unterminated").unwrap_err();
        match err {
            Error::Parse { file, .. } => assert_eq!(file, PathBuf::from("inline.yaml")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = load_yaml("modles: []\n").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_json_source() {
        let mut definitions = Definitions::new();
        definitions
            .load_str(
                r#"{"models": [{"name": "Tag", "fields": [{"name": "label", "type": "string", "required": true}]}]}"#,
                SourceFormat::Json,
                Path::new("tags.json"),
            )
            .unwrap();
        assert!(definitions.registry.contains("Tag"));
    }

    #[test]
    fn test_empty_yaml_file_is_ignored() {
        let definitions = load_yaml("   \n").unwrap();
        assert!(definitions.registry.is_empty());
    }

    #[test]
    fn test_source_format_from_path() {
        assert_eq!(SourceFormat::from_path(Path::new("a.yml")), Some(SourceFormat::Yaml));
        assert_eq!(SourceFormat::from_path(Path::new("a.json")), Some(SourceFormat::Json));
        assert_eq!(SourceFormat::from_path(Path::new("a.rs")), None);
    }
}
