//! Serialization of assembled documents to YAML or JSON.
//!
//! Besides single-file output this module can split a document into a docs
//! tree: one file per schema, one file per path and an `openapi.yaml` index
//! that points at them with relative `$ref`s.

use crate::document::OpenApiDocument;
use crate::schema_compiler::COMPONENTS_SCHEMAS;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::{debug, info};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const INDEX_FILE: &str = "openapi.yaml";
pub const SCHEMAS_DIR: &str = "schemas";
pub const PATHS_DIR: &str = "paths";

/// Serializes a document to YAML, keeping declaration order.
pub fn serialize_yaml(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to YAML");
    serde_yaml::to_string(doc).context("Failed to serialize OpenAPI document to YAML")
}

/// Serializes a document to pretty-printed JSON.
pub fn serialize_json(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON");
    serde_json::to_string_pretty(doc).context("Failed to serialize OpenAPI document to JSON")
}

/// Writes string content to a file, creating parent directories as needed.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}

/// A document split into files, keyed by path relative to the docs root.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitTree {
    pub files: IndexMap<PathBuf, Value>,
}

impl SplitTree {
    pub fn index(&self) -> Option<&Value> {
        self.files.get(Path::new(INDEX_FILE))
    }
}

/// Split a document into schema files, path files and an index.
///
/// Component references are rewritten to relative file references:
/// `./Name.yaml` between schema files, `../schemas/Name.yaml` from path files.
pub fn split_document(doc: &OpenApiDocument) -> Result<SplitTree> {
    let mut files = IndexMap::new();
    let mut index_schemas = Map::new();
    let mut index_paths = Map::new();

    if let Some(components) = &doc.components {
        for (name, schema) in &components.schemas {
            let mut value = serde_json::to_value(schema)
                .with_context(|| format!("Failed to convert schema {}", name))?;
            rewrite_refs(&mut value, "./");
            let file = Path::new(SCHEMAS_DIR).join(format!("{}.yaml", name));
            index_schemas.insert(name.clone(), json!({ "$ref": relative_ref(&file) }));
            files.insert(file, value);
        }
    }

    let mut taken = HashSet::new();
    for (path, item) in &doc.paths {
        let mut value = serde_json::to_value(item)
            .with_context(|| format!("Failed to convert path item {}", path))?;
        rewrite_refs(&mut value, &format!("../{}/", SCHEMAS_DIR));
        let file = Path::new(PATHS_DIR).join(format!("{}.yaml", unique_slug(path, &mut taken)));
        index_paths.insert(path.clone(), json!({ "$ref": relative_ref(&file) }));
        files.insert(file, value);
    }

    let mut index = Map::new();
    index.insert("openapi".to_string(), Value::String(doc.openapi.clone()));
    index.insert(
        "info".to_string(),
        serde_json::to_value(&doc.info).context("Failed to convert info")?,
    );
    index.insert("paths".to_string(), Value::Object(index_paths));
    if !index_schemas.is_empty() {
        index.insert(
            "components".to_string(),
            json!({ "schemas": Value::Object(index_schemas) }),
        );
    }
    files.insert(PathBuf::from(INDEX_FILE), Value::Object(index));

    Ok(SplitTree { files })
}

/// Write the split docs tree under `root` and return the index path.
pub fn write_split_tree(doc: &OpenApiDocument, root: &Path) -> Result<PathBuf> {
    let tree = split_document(doc)?;
    for (relative, value) in &tree.files {
        let content = serde_yaml::to_string(value)
            .with_context(|| format!("Failed to serialize {}", relative.display()))?;
        write_to_file(&content, &root.join(relative))?;
    }
    info!("Wrote {} files under {}", tree.files.len(), root.display());
    Ok(root.join(INDEX_FILE))
}

fn relative_ref(file: &Path) -> String {
    let parts: Vec<_> = file.iter().map(|part| part.to_string_lossy()).collect();
    format!("./{}", parts.join("/"))
}

fn rewrite_refs(value: &mut Value, prefix: &str) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get_mut("$ref") {
                if let Some(name) = reference.strip_prefix(COMPONENTS_SCHEMAS) {
                    *reference = format!("{}{}.yaml", prefix, name);
                }
            }
            for child in map.values_mut() {
                rewrite_refs(child, prefix);
            }
        }
        Value::Array(items) => {
            for item in items {
                rewrite_refs(item, prefix);
            }
        }
        _ => {}
    }
}

/// File stem for a path template: `/menus/{id}/items` becomes `menus_id_items`.
fn unique_slug(path: &str, taken: &mut HashSet<String>) -> String {
    let slug: String = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            segment
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
                .collect::<String>()
        })
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    let base = if slug.is_empty() { "root".to_string() } else { slug };

    let mut candidate = base.clone();
    let mut counter = 2;
    while !taken.insert(candidate.clone()) {
        candidate = format!("{}_{}", base, counter);
        counter += 1;
    }
    candidate
}
