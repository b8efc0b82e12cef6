//! Example synthesis for schema nodes.
//!
//! Each property is filled by the first rule that applies:
//!
//! 1. the caller's override for that field name
//! 2. the example literal on the descriptor
//! 3. the declared default
//! 4. the first enum member
//! 5. a fixed stand-in for the type (required fields only)
//! 6. `null`, when the type union allows it
//!
//! Optional fields that reach the end of the list are omitted. Required fields
//! always get a value or the call fails with [`Error::IncompleteExample`].
//!
//! Arrays get exactly one synthesized item. Nested models are synthesized
//! recursively while a per-node counter tracks how often each node sits on the
//! current path; once a node hits the cycle limit its next occurrence becomes
//! an empty object, so synthesis terminates on any graph.

use crate::error::{Error, Result};
use crate::field::TypeTag;
use crate::schema_compiler::{NodeId, PropertySchema, ResolvedType, SchemaGraph};
use log::{debug, warn};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Caller-supplied field values, keyed by field name
pub type Overrides = Map<String, Value>;

/// Tuning knobs for example synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisOptions {
    /// How many times one node may appear on the current synthesis path
    /// before further occurrences are replaced by `{}`
    pub cycle_limit: usize,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self { cycle_limit: 1 }
    }
}

/// Example synthesizer - builds deterministic example values from a schema graph
pub struct ExampleSynthesizer<'g> {
    graph: &'g SchemaGraph,
    options: SynthesisOptions,
}

/// Per-node occurrence counts along the current path
type SynthesisPath = HashMap<NodeId, usize>;

impl<'g> ExampleSynthesizer<'g> {
    pub fn new(graph: &'g SchemaGraph) -> Self {
        Self::with_options(graph, SynthesisOptions::default())
    }

    pub fn with_options(graph: &'g SchemaGraph, options: SynthesisOptions) -> Self {
        let options = SynthesisOptions {
            cycle_limit: options.cycle_limit.max(1),
        };
        Self { graph, options }
    }

    /// Synthesize one example object for a node
    ///
    /// # Errors
    ///
    /// An id that does not belong to this synthesizer's graph is reported as
    /// [`Error::UnresolvedReference`].
    pub fn synthesize(&self, id: NodeId, overrides: Option<&Overrides>) -> Result<Value> {
        if self.graph.try_node(id).is_none() {
            return Err(Error::UnresolvedReference {
                names: vec![format!("node #{}", id.index())],
            });
        }
        let mut path = SynthesisPath::new();
        self.synthesize_node(id, overrides, &mut path)
    }

    /// Synthesize one example object for a model looked up by name
    pub fn synthesize_named(&self, name: &str, overrides: Option<&Overrides>) -> Result<Value> {
        let id = self
            .graph
            .id_of(name)
            .ok_or_else(|| Error::UnresolvedReference {
                names: vec![name.to_string()],
            })?;
        self.synthesize(id, overrides)
    }

    /// Synthesize a value for a bare resolved type
    pub fn synthesize_type(&self, ty: &ResolvedType) -> Result<Value> {
        let mut path = SynthesisPath::new();
        self.item_value(ty, &mut path)
    }

    fn synthesize_node(
        &self,
        id: NodeId,
        overrides: Option<&Overrides>,
        path: &mut SynthesisPath,
    ) -> Result<Value> {
        let node = self.graph.node(id);
        debug!("Synthesizing example for: {}", node.name);

        if let Some(overrides) = overrides {
            for key in overrides.keys() {
                if !node.properties.contains_key(key) {
                    warn!("Ignoring override '{}': {} has no such field", key, node.name);
                }
            }
        }

        *path.entry(id).or_insert(0) += 1;
        let mut object = Map::new();
        let mut outcome = Ok(());
        for (name, property) in &node.properties {
            let required = node.required.contains(name);
            let supplied = overrides.and_then(|o| o.get(name));
            match self.field_value(&node.name, name, property, required, supplied, path) {
                Ok(Some(value)) => {
                    object.insert(name.clone(), value);
                }
                Ok(None) => {}
                Err(err) => {
                    outcome = Err(err);
                    break;
                }
            }
        }
        if let Some(count) = path.get_mut(&id) {
            *count -= 1;
        }

        outcome.map(|_| Value::Object(object))
    }

    fn field_value(
        &self,
        model: &str,
        name: &str,
        property: &PropertySchema,
        required: bool,
        supplied: Option<&Value>,
        path: &mut SynthesisPath,
    ) -> Result<Option<Value>> {
        if let Some(value) = supplied {
            if value.is_null() && !property.allows_null() {
                if required {
                    return Err(Error::IncompleteExample {
                        model: model.to_string(),
                        field: name.to_string(),
                        reason: "null override on a field that does not allow null".to_string(),
                    });
                }
                return Ok(None);
            }
            return Ok(Some(value.clone()));
        }

        if let Some(example) = &property.example {
            return Ok(Some(example.clone()));
        }
        if let Some(default) = &property.default {
            return Ok(Some(default.clone()));
        }
        if let ResolvedType::Primitive(primitive) = &property.ty {
            if let Some(first) = primitive.enum_values.as_ref().and_then(|v| v.first()) {
                return Ok(Some(first.clone()));
            }
        }

        if required {
            if let Some(value) = self.stand_in(&property.ty, path)? {
                return Ok(Some(value));
            }
        }

        if property.allows_null() {
            return Ok(Some(Value::Null));
        }

        if required {
            return Err(Error::IncompleteExample {
                model: model.to_string(),
                field: name.to_string(),
                reason: "no override, example, default, enum or type stand-in applies".to_string(),
            });
        }
        Ok(None)
    }

    /// Type stand-in for a required field, `None` when the type is only `null`
    fn stand_in(&self, ty: &ResolvedType, path: &mut SynthesisPath) -> Result<Option<Value>> {
        match ty {
            ResolvedType::Primitive(primitive) => Ok(primitive
                .value_tag()
                .map(|tag| placeholder(tag, primitive.format.as_deref()))),
            ResolvedType::ArrayOf { items, .. } => {
                let item = self.item_value(items, path)?;
                Ok(Some(Value::Array(vec![item])))
            }
            ResolvedType::NodeRef(id) => self.nested(*id, path).map(Some),
        }
    }

    /// Value for an array item or a bare type: enum, then stand-in, then null
    fn item_value(&self, ty: &ResolvedType, path: &mut SynthesisPath) -> Result<Value> {
        match ty {
            ResolvedType::Primitive(primitive) => {
                if let Some(first) = primitive.enum_values.as_ref().and_then(|v| v.first()) {
                    return Ok(first.clone());
                }
                Ok(primitive
                    .value_tag()
                    .map(|tag| placeholder(tag, primitive.format.as_deref()))
                    .unwrap_or(Value::Null))
            }
            ResolvedType::ArrayOf { items, .. } => {
                Ok(Value::Array(vec![self.item_value(items, path)?]))
            }
            ResolvedType::NodeRef(id) => self.nested(*id, path),
        }
    }

    fn nested(&self, id: NodeId, path: &mut SynthesisPath) -> Result<Value> {
        let seen = path.get(&id).copied().unwrap_or(0);
        if seen >= self.options.cycle_limit {
            debug!(
                "Cycle on {}: emitting empty stand-in",
                self.graph.node(id).name
            );
            return Ok(Value::Object(Map::new()));
        }
        self.synthesize_node(id, None, path)
    }
}

/// Fixed stand-in value for a primitive tag
pub fn placeholder(tag: TypeTag, format: Option<&str>) -> Value {
    match tag {
        TypeTag::String => Value::String(string_placeholder(format).to_string()),
        TypeTag::Integer => Value::from(0),
        TypeTag::Number => Value::from(0.0),
        TypeTag::Boolean => Value::Bool(true),
        TypeTag::Array => Value::Array(Vec::new()),
        TypeTag::Null => Value::Null,
    }
}

fn string_placeholder(format: Option<&str>) -> &'static str {
    match format {
        Some("date-time") => "2024-01-01T00:00:00Z",
        Some("date") => "2024-01-01",
        Some("time") => "00:00:00",
        Some("email") => "user@example.com",
        Some("uuid") => "00000000-0000-0000-0000-000000000000",
        Some("uri") | Some("url") => "https://example.com",
        Some("hostname") => "example.com",
        Some("ipv4") => "192.0.2.1",
        Some("ipv6") => "2001:db8::1",
        Some("byte") => "ZXhhbXBsZQ==",
        _ => "string",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldDescriptor, ItemDescriptor};
    use crate::registry::ModelRegistry;
    use crate::schema_compiler::SchemaCompiler;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn graph_of(models: Vec<(&str, Vec<FieldDescriptor>)>) -> SchemaGraph {
        let mut registry = ModelRegistry::new();
        for (name, fields) in models {
            registry.register(name, fields).unwrap();
        }
        registry.finalize().unwrap();
        SchemaCompiler::new().compile(&registry).unwrap()
    }

    fn overrides(value: Value) -> Overrides {
        match value {
            Value::Object(map) => map,
            other => panic!("overrides must be an object, got {other}"),
        }
    }

    #[test]
    fn test_price_example() {
        let graph = graph_of(vec![(
            "Price",
            vec![
                FieldDescriptor::string("currency")
                    .required()
                    .enum_values(vec![json!("USD"), json!("EUR"), json!("CNY")]),
                FieldDescriptor::number("amount").required(),
                FieldDescriptor::boolean("discounted").default_value(json!(false)),
            ],
        )]);

        let example = ExampleSynthesizer::new(&graph)
            .synthesize_named("Price", None)
            .unwrap();
        assert_eq!(
            example,
            json!({"currency": "USD", "amount": 0.0, "discounted": false})
        );
    }

    #[test]
    fn test_mutual_cycle_terminates_with_stand_in() {
        let graph = graph_of(vec![
            ("A", vec![FieldDescriptor::reference("next", "B").required()]),
            ("B", vec![FieldDescriptor::reference("next", "A").required()]),
        ]);

        let example = ExampleSynthesizer::new(&graph)
            .synthesize_named("A", None)
            .unwrap();
        assert_eq!(example, json!({"next": {"next": {}}}));
    }

    #[test]
    fn test_self_reference_through_array() {
        let graph = graph_of(vec![(
            "Category",
            vec![
                FieldDescriptor::string("label").required(),
                FieldDescriptor::array_of("children", ItemDescriptor::reference("Category"))
                    .required(),
            ],
        )]);

        let example = ExampleSynthesizer::new(&graph)
            .synthesize_named("Category", None)
            .unwrap();
        assert_eq!(example, json!({"label": "string", "children": [{}]}));
    }

    #[test]
    fn test_cycle_limit_allows_deeper_expansion() {
        let graph = graph_of(vec![(
            "Node",
            vec![FieldDescriptor::reference("parent", "Node").required()],
        )]);

        let synthesizer =
            ExampleSynthesizer::with_options(&graph, SynthesisOptions { cycle_limit: 2 });
        let example = synthesizer.synthesize_named("Node", None).unwrap();
        assert_eq!(example, json!({"parent": {"parent": {}}}));
    }

    #[test]
    fn test_optional_field_is_omitted() {
        let graph = graph_of(vec![(
            "User",
            vec![
                FieldDescriptor::integer("id").required(),
                FieldDescriptor::string("nickname"),
                FieldDescriptor::reference("manager", "User"),
                FieldDescriptor::array_of("tags", ItemDescriptor::string()),
            ],
        )]);

        let example = ExampleSynthesizer::new(&graph)
            .synthesize_named("User", None)
            .unwrap();
        assert_eq!(example, json!({"id": 0}));
    }

    #[test]
    fn test_optional_nullable_field_gets_null() {
        let graph = graph_of(vec![(
            "Profile",
            vec![FieldDescriptor::typed("bio", &["string", "null"]).unwrap()],
        )]);

        let example = ExampleSynthesizer::new(&graph)
            .synthesize_named("Profile", None)
            .unwrap();
        assert_eq!(example, json!({"bio": null}));
    }

    #[test]
    fn test_required_nullable_field_gets_non_null_value() {
        let graph = graph_of(vec![(
            "Profile",
            vec![
                FieldDescriptor::typed("bio", &["null", "string"]).unwrap().required(),
                FieldDescriptor::typed("nothing", &["null"]).unwrap().required(),
            ],
        )]);

        let example = ExampleSynthesizer::new(&graph)
            .synthesize_named("Profile", None)
            .unwrap();
        assert_eq!(example, json!({"bio": "string", "nothing": null}));
    }

    #[test]
    fn test_precedence_override_example_default_enum() {
        let graph = graph_of(vec![(
            "Item",
            vec![
                FieldDescriptor::string("a")
                    .required()
                    .example(json!("from-example"))
                    .default_value(json!("from-default")),
                FieldDescriptor::string("b")
                    .example(json!("from-example"))
                    .default_value(json!("from-default")),
                FieldDescriptor::string("c")
                    .default_value(json!("from-default"))
                    .enum_values(vec![json!("first"), json!("from-default")]),
                FieldDescriptor::string("d").enum_values(vec![json!("first"), json!("second")]),
            ],
        )]);

        let supplied = overrides(json!({"a": "from-override"}));
        let example = ExampleSynthesizer::new(&graph)
            .synthesize_named("Item", Some(&supplied))
            .unwrap();
        assert_eq!(
            example,
            json!({
                "a": "from-override",
                "b": "from-example",
                "c": "from-default",
                "d": "first"
            })
        );
    }

    #[test]
    fn test_override_list_for_array_is_used_as_is() {
        let graph = graph_of(vec![(
            "Menu",
            vec![FieldDescriptor::array_of("items", ItemDescriptor::string()).required()],
        )]);

        let supplied = overrides(json!({"items": ["Fried Rice", "Noodles", "Dumplings"]}));
        let example = ExampleSynthesizer::new(&graph)
            .synthesize_named("Menu", Some(&supplied))
            .unwrap();
        assert_eq!(example, json!({"items": ["Fried Rice", "Noodles", "Dumplings"]}));
    }

    #[test]
    fn test_array_gets_single_item() {
        let graph = graph_of(vec![(
            "Menu",
            vec![
                FieldDescriptor::array_of("items", ItemDescriptor::reference("MenuItem")).required(),
                FieldDescriptor::array_of(
                    "sizes",
                    ItemDescriptor::string().with_enum(vec![json!("S"), json!("M")]),
                )
                .required(),
            ],
        ), (
            "MenuItem",
            vec![
                FieldDescriptor::string("name").required(),
                FieldDescriptor::number("price").required(),
            ],
        )]);

        let example = ExampleSynthesizer::new(&graph)
            .synthesize_named("Menu", None)
            .unwrap();
        assert_eq!(
            example,
            json!({"items": [{"name": "string", "price": 0.0}], "sizes": ["S"]})
        );
    }

    #[test]
    fn test_null_override_on_required_non_nullable_fails() {
        let graph = graph_of(vec![(
            "Catalog",
            vec![FieldDescriptor::string("version").required()],
        )]);

        let supplied = overrides(json!({"version": null}));
        let err = ExampleSynthesizer::new(&graph)
            .synthesize_named("Catalog", Some(&supplied))
            .unwrap_err();
        match err {
            Error::IncompleteExample { model, field, .. } => {
                assert_eq!(model, "Catalog");
                assert_eq!(field, "version");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_null_override_on_nullable_field_is_kept() {
        let graph = graph_of(vec![(
            "Catalog",
            vec![FieldDescriptor::string("note").nullable().required()],
        )]);

        let supplied = overrides(json!({"note": null}));
        let example = ExampleSynthesizer::new(&graph)
            .synthesize_named("Catalog", Some(&supplied))
            .unwrap();
        assert_eq!(example, json!({"note": null}));
    }

    #[test]
    fn test_null_override_on_required_reference_fails() {
        let graph = graph_of(vec![
            ("Outer", vec![FieldDescriptor::reference("inner", "Inner").required()]),
            ("Inner", vec![FieldDescriptor::string("value").required()]),
        ]);

        let supplied = overrides(json!({"inner": null}));
        let err = ExampleSynthesizer::new(&graph)
            .synthesize_named("Outer", Some(&supplied))
            .unwrap_err();
        assert!(matches!(err, Error::IncompleteExample { ref field, .. } if field == "inner"));
    }

    #[test]
    fn test_partial_override_fills_remaining_required_fields() {
        let graph = graph_of(vec![
            (
                "Catalog",
                vec![
                    FieldDescriptor::string("version").required(),
                    FieldDescriptor::string("generatedAt").format("date-time").required(),
                    FieldDescriptor::array_of("categories", ItemDescriptor::reference("Category"))
                        .required(),
                    FieldDescriptor::reference("featuredProduct", "Product").required(),
                ],
            ),
            ("Category", vec![FieldDescriptor::string("name").required()]),
            (
                "Product",
                vec![
                    FieldDescriptor::integer("id").format("int64").required(),
                    FieldDescriptor::reference("category", "Category"),
                ],
            ),
        ]);

        let supplied = overrides(json!({"version": "1.0"}));
        let example = ExampleSynthesizer::new(&graph)
            .synthesize_named("Catalog", Some(&supplied))
            .unwrap();
        assert_eq!(
            example,
            json!({
                "version": "1.0",
                "generatedAt": "2024-01-01T00:00:00Z",
                "categories": [{"name": "string"}],
                "featuredProduct": {"id": 0}
            })
        );
    }

    #[test]
    fn test_every_required_name_is_present() {
        let graph = graph_of(vec![
            (
                "Order",
                vec![
                    FieldDescriptor::integer("id").required(),
                    FieldDescriptor::typed("note", &["string", "null"]).unwrap().required(),
                    FieldDescriptor::boolean("gift"),
                    FieldDescriptor::reference("buyer", "Customer").required(),
                    FieldDescriptor::array_of("lines", ItemDescriptor::integer()).required(),
                ],
            ),
            (
                "Customer",
                vec![
                    FieldDescriptor::string("email").format("email").required(),
                    FieldDescriptor::reference("lastOrder", "Order").required(),
                ],
            ),
        ]);

        let synthesizer = ExampleSynthesizer::new(&graph);
        for node in graph.nodes() {
            let example = synthesizer.synthesize(node.id, None).unwrap();
            for name in &node.required {
                assert!(
                    example.get(name).is_some(),
                    "{} example is missing required field {}",
                    node.name,
                    name
                );
            }
        }
    }

    #[test]
    fn test_unknown_override_key_is_ignored() {
        let graph = graph_of(vec![("Tiny", vec![FieldDescriptor::string("a").required()])]);

        let supplied = overrides(json!({"zzz": 1}));
        let example = ExampleSynthesizer::new(&graph)
            .synthesize_named("Tiny", Some(&supplied))
            .unwrap();
        assert_eq!(example, json!({"a": "string"}));
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let graph = graph_of(vec![(
            "Event",
            vec![
                FieldDescriptor::string("id").format("uuid").required(),
                FieldDescriptor::string("at").format("date").required(),
                FieldDescriptor::boolean("public").required(),
            ],
        )]);

        let synthesizer = ExampleSynthesizer::new(&graph);
        let first = synthesizer.synthesize_named("Event", None).unwrap();
        let second = synthesizer.synthesize_named("Event", None).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            json!({"id": "00000000-0000-0000-0000-000000000000", "at": "2024-01-01", "public": true})
        );
    }

    #[test]
    fn test_node_from_another_graph_is_an_error() {
        let big = graph_of(vec![
            ("A", vec![FieldDescriptor::string("a")]),
            ("B", vec![FieldDescriptor::string("b")]),
        ]);
        let small = graph_of(vec![("Only", vec![FieldDescriptor::string("x")])]);
        let foreign = big.id_of("B").unwrap();

        assert!(small.try_node(foreign).is_none());
        let err = ExampleSynthesizer::new(&small)
            .synthesize(foreign, None)
            .unwrap_err();
        match err {
            Error::UnresolvedReference { names } => assert_eq!(names, vec!["node #1".to_string()]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_synthesize_named_unknown_model() {
        let graph = SchemaGraph::default();
        let err = ExampleSynthesizer::new(&graph)
            .synthesize_named("Ghost", None)
            .unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference { .. }));
    }
}
