use crate::error::{Error, Result};
use crate::field::{FieldDescriptor, FieldKind, ItemDescriptor, TypeTag};
use crate::registry::ModelRegistry;
use indexmap::{IndexMap, IndexSet};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix of every component reference in the generated document
pub const COMPONENTS_SCHEMAS: &str = "#/components/schemas/";

/// Stable reference identifier for a named schema
pub fn reference_path(name: &str) -> String {
    format!("{}{}", COMPONENTS_SCHEMAS, name)
}

/// Identity of a schema node inside its graph.
///
/// Two references resolve to the same node exactly when their ids are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Primitive type data shared by primitive fields and primitive array items
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveSchema {
    pub types: Vec<TypeTag>,
    pub format: Option<String>,
    pub enum_values: Option<Vec<Value>>,
}

impl PrimitiveSchema {
    pub fn allows_null(&self) -> bool {
        self.types.contains(&TypeTag::Null)
    }

    /// First non-null tag of the union, if any
    pub fn value_tag(&self) -> Option<TypeTag> {
        self.types.iter().copied().find(|t| *t != TypeTag::Null)
    }
}

/// Resolved form of a field type
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedType {
    Primitive(PrimitiveSchema),
    ArrayOf {
        items: Box<ResolvedType>,
        nullable: bool,
    },
    /// Indirect link to another node of the same graph
    NodeRef(NodeId),
}

/// One resolved property of a schema node
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySchema {
    pub ty: ResolvedType,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub example: Option<Value>,
}

impl PropertySchema {
    /// Whether `null` is a permitted value for this property
    pub fn allows_null(&self) -> bool {
        match &self.ty {
            ResolvedType::Primitive(p) => p.allows_null(),
            ResolvedType::ArrayOf { nullable, .. } => *nullable,
            ResolvedType::NodeRef(_) => false,
        }
    }
}

/// Canonical, resolved form of a model definition
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    pub id: NodeId,
    pub name: String,
    /// Properties in declaration order
    pub properties: IndexMap<String, PropertySchema>,
    /// Names of the fields declared `required`, in declaration order
    pub required: IndexSet<String>,
}

/// Arena of schema nodes plus a name index.
///
/// Nodes never contain each other; nested models are [`ResolvedType::NodeRef`]
/// links, so shared and cyclic structure costs one node per model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaGraph {
    nodes: Vec<SchemaNode>,
    index: IndexMap<String, NodeId>,
}

impl SchemaGraph {
    /// # Panics
    ///
    /// Panics when `id` was not issued by this graph. Use [`SchemaGraph::try_node`]
    /// for ids of unknown origin.
    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id.0]
    }

    pub fn try_node(&self, id: NodeId) -> Option<&SchemaNode> {
        self.nodes.get(id.0)
    }

    pub fn id_of(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.id_of(name).map(|id| self.node(id))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Nodes in registration order
    pub fn nodes(&self) -> impl Iterator<Item = &SchemaNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Render a node as an OpenAPI object schema. Panics like [`SchemaGraph::node`].
    pub fn render_node(&self, id: NodeId) -> Schema {
        let node = self.node(id);
        let properties = node
            .properties
            .iter()
            .map(|(name, property)| (name.clone(), self.render_property(property)))
            .collect();
        let required: Vec<String> = node.required.iter().cloned().collect();

        Schema {
            schema_type: Some(SchemaType::Single("object".to_string())),
            properties: Some(properties),
            required: (!required.is_empty()).then_some(required),
            ..Default::default()
        }
    }

    fn render_property(&self, property: &PropertySchema) -> Schema {
        // References render as a bare $ref
        if let ResolvedType::NodeRef(id) = &property.ty {
            return Schema::reference_to(&self.node(*id).name);
        }

        let mut schema = self.render_type(&property.ty);
        schema.description = property.description.clone();
        schema.example = property.example.clone();
        schema.default = property.default.clone();
        schema
    }

    fn render_type(&self, ty: &ResolvedType) -> Schema {
        match ty {
            ResolvedType::NodeRef(id) => Schema::reference_to(&self.node(*id).name),
            ResolvedType::Primitive(primitive) => Schema {
                schema_type: Some(SchemaType::from_tags(&primitive.types)),
                format: primitive.format.clone(),
                enum_values: primitive.enum_values.clone(),
                ..Default::default()
            },
            ResolvedType::ArrayOf { items, nullable } => {
                let tags = if *nullable {
                    vec![TypeTag::Array, TypeTag::Null]
                } else {
                    vec![TypeTag::Array]
                };
                Schema {
                    schema_type: Some(SchemaType::from_tags(&tags)),
                    items: Some(Box::new(self.render_type(items))),
                    ..Default::default()
                }
            }
        }
    }
}

/// Schema compiler - turns a finalized model registry into a schema graph
#[derive(Debug, Default)]
pub struct SchemaCompiler;

impl SchemaCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Compile every registered model.
    ///
    /// Runs in two phases: first every model name gets a placeholder node, then
    /// each node's properties are filled in with references looked up by name.
    /// Registration order therefore never matters.
    pub fn compile(&self, registry: &ModelRegistry) -> Result<SchemaGraph> {
        if !registry.is_finalized() {
            let names = registry.unresolved();
            if !names.is_empty() {
                return Err(Error::UnresolvedReference { names });
            }
        }

        let mut graph = SchemaGraph::default();
        for (position, model) in registry.models().enumerate() {
            let id = NodeId(position);
            graph.index.insert(model.name().to_string(), id);
            graph.nodes.push(SchemaNode {
                id,
                name: model.name().to_string(),
                properties: IndexMap::new(),
                required: IndexSet::new(),
            });
        }
        debug!("Allocated {} schema nodes", graph.nodes.len());

        for model in registry.models() {
            debug!("Compiling model: {}", model.name());
            let mut properties = IndexMap::with_capacity(model.fields().len());
            let mut required = IndexSet::new();
            for field in model.fields() {
                let property = Self::resolve_field(&graph.index, field)?;
                if properties.insert(field.name().to_string(), property).is_some() {
                    return Err(Error::DuplicateModel {
                        model: model.name().to_string(),
                        field: Some(field.name().to_string()),
                    });
                }
                if field.is_required() {
                    required.insert(field.name().to_string());
                }
            }

            let id = graph.index[model.name()];
            let node = &mut graph.nodes[id.0];
            node.properties = properties;
            node.required = required;
        }

        Ok(graph)
    }

    fn resolve_field(
        index: &IndexMap<String, NodeId>,
        field: &FieldDescriptor,
    ) -> Result<PropertySchema> {
        let ty = match field.kind() {
            FieldKind::Primitive(types) => ResolvedType::Primitive(PrimitiveSchema {
                types: types.clone(),
                format: field.format_name().map(str::to_string),
                enum_values: field.enum_list().map(<[Value]>::to_vec),
            }),
            FieldKind::Reference { target, .. } => {
                ResolvedType::NodeRef(Self::lookup(index, target.name())?)
            }
            FieldKind::Array { items, nullable } => ResolvedType::ArrayOf {
                items: Box::new(Self::resolve_items(index, items)?),
                nullable: *nullable,
            },
        };

        Ok(PropertySchema {
            ty,
            description: field.description_text().map(str::to_string),
            default: field.default_literal().cloned(),
            example: field.example_literal().cloned(),
        })
    }

    fn resolve_items(
        index: &IndexMap<String, NodeId>,
        items: &ItemDescriptor,
    ) -> Result<ResolvedType> {
        match items {
            ItemDescriptor::Primitive(item) => Ok(ResolvedType::Primitive(PrimitiveSchema {
                types: item.types().to_vec(),
                format: item.format().map(str::to_string),
                enum_values: item.enum_values().map(<[Value]>::to_vec),
            })),
            ItemDescriptor::Reference(target) => {
                Ok(ResolvedType::NodeRef(Self::lookup(index, target.name())?))
            }
        }
    }

    fn lookup(index: &IndexMap<String, NodeId>, name: &str) -> Result<NodeId> {
        index
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnresolvedReference {
                names: vec![name.to_string()],
            })
    }
}

/// The `type` keyword: one tag or a union of tags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Union(Vec<String>),
}

impl SchemaType {
    pub fn from_tags(tags: &[TypeTag]) -> Self {
        match tags {
            [single] => SchemaType::Single(single.as_str().to_string()),
            _ => SchemaType::Union(tags.iter().map(|t| t.as_str().to_string()).collect()),
        }
    }
}

/// OpenAPI Schema definition
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Reference to another schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// The type of the schema (string, integer, object, array, etc.)
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    /// Format for primitive types (e.g., "int64", "date-time")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Enum values
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Items schema for array types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Properties for object types, in declaration order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<IndexMap<String, Schema>>,
    /// Required field names for object types
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl Schema {
    /// A bare `$ref` schema pointing at a named component
    pub fn reference_to(name: &str) -> Self {
        Schema {
            reference: Some(reference_path(name)),
            ..Default::default()
        }
    }

    /// A primitive schema with an optional format
    pub fn primitive(tag: TypeTag, format: Option<String>) -> Self {
        Schema {
            schema_type: Some(SchemaType::Single(tag.as_str().to_string())),
            format,
            ..Default::default()
        }
    }
}
