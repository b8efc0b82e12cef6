//! Route definitions and the route collector.
//!
//! A [`RouteDefinition`] describes one path template with its path-level
//! parameters and one or more operations. The [`RouteCollector`] turns it into
//! a [`CollectedRoute`]: parameters merged per operation, responses kept in
//! declaration order, and every response with a body bound to an example.
//!
//! Examples are supplied per operation as an ordered list of slots, one per
//! declared response. A slot holding an object is used as overrides for the
//! example synthesizer, any other non-null value is used verbatim, and an
//! empty slot (or no list at all) means "synthesize". For a response offered
//! in several content types the slot may instead be an object keyed by content
//! type, each value following the same rules for that content type alone.
//!
//! A body is either one named model or an array of it ([`BodySchema`]).

use crate::error::{Error, Result};
use crate::example::{ExampleSynthesizer, SynthesisOptions};
use crate::field::TypeTag;
use crate::schema_compiler::{NodeId, ResolvedType, SchemaGraph};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

pub const APPLICATION_JSON: &str = "application/json";

fn default_content_type() -> String {
    APPLICATION_JSON.to_string()
}

/// HTTP methods an operation can be declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    /// Lowercase method name as used for OpenAPI path item keys
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Put => "put",
            HttpMethod::Post => "post",
            HttpMethod::Delete => "delete",
            HttpMethod::Patch => "patch",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

/// The location where a parameter value is carried in an HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    /// Path parameter embedded in the URL (e.g., `/users/{id}`)
    Path,
    /// Query string parameter (e.g., `?page=1&limit=10`)
    Query,
    /// HTTP header parameter
    Header,
    /// Cookie parameter
    Cookie,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
        }
    }
}

/// Scalar types a parameter can carry. Arrays and bare `null` are not
/// parameter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Integer,
    Number,
    Boolean,
}

impl From<ParameterType> for TypeTag {
    fn from(value: ParameterType) -> Self {
        match value {
            ParameterType::String => TypeTag::String,
            ParameterType::Integer => TypeTag::Integer,
            ParameterType::Number => TypeTag::Number,
            ParameterType::Boolean => TypeTag::Boolean,
        }
    }
}

/// A single primitive parameter of a path or operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Path parameters are always treated as required
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(default)]
    pub deprecated: bool,
}

impl Parameter {
    pub fn new(
        name: impl Into<String>,
        location: ParameterLocation,
        param_type: ParameterType,
        required: bool,
    ) -> Self {
        Self {
            name: name.into(),
            location,
            param_type,
            format: None,
            required,
            description: None,
            default: None,
            example: None,
            deprecated: false,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_example(mut self, value: Value) -> Self {
        self.example = Some(value);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    fn same_slot(&self, other: &Parameter) -> bool {
        self.name == other.name && self.location == other.location
    }
}

pub fn path_param(name: impl Into<String>, param_type: ParameterType) -> Parameter {
    Parameter::new(name, ParameterLocation::Path, param_type, true)
}

pub fn query_param(name: impl Into<String>, param_type: ParameterType) -> Parameter {
    Parameter::new(name, ParameterLocation::Query, param_type, false)
}

pub fn header_param(name: impl Into<String>, param_type: ParameterType) -> Parameter {
    Parameter::new(name, ParameterLocation::Header, param_type, false)
}

pub fn cookie_param(name: impl Into<String>, param_type: ParameterType) -> Parameter {
    Parameter::new(name, ParameterLocation::Cookie, param_type, false)
}

/// Shape of a request or response body.
///
/// Written as `schema: Menu` or `schema: { array_of: Menu }` in definition files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BodySchema {
    Model(String),
    ArrayOf { array_of: String },
}

impl BodySchema {
    pub fn array_of(model: impl Into<String>) -> Self {
        BodySchema::ArrayOf {
            array_of: model.into(),
        }
    }

    /// The model the body is built from
    pub fn model_name(&self) -> &str {
        match self {
            BodySchema::Model(name) => name,
            BodySchema::ArrayOf { array_of } => array_of,
        }
    }
}

impl From<&str> for BodySchema {
    fn from(name: &str) -> Self {
        BodySchema::Model(name.to_string())
    }
}

impl From<String> for BodySchema {
    fn from(name: String) -> Self {
        BodySchema::Model(name)
    }
}

/// Request body bound to a model or an array of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBodySpec {
    pub schema: BodySchema,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

impl RequestBodySpec {
    pub fn json(schema: impl Into<BodySchema>) -> Self {
        Self {
            schema: schema.into(),
            required: false,
            description: None,
            content_type: default_content_type(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// One declared response: status, optional body, content types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSpec {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<BodySchema>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_content_types: Vec<String>,
}

impl ResponseSpec {
    /// A JSON response with a body
    pub fn json(
        status: u16,
        schema: impl Into<BodySchema>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            status,
            schema: Some(schema.into()),
            description: description.into(),
            content_type: default_content_type(),
            extra_content_types: Vec::new(),
        }
    }

    /// A response without a body
    pub fn empty(status: u16, description: impl Into<String>) -> Self {
        Self {
            status,
            schema: None,
            description: description.into(),
            content_type: default_content_type(),
            extra_content_types: Vec::new(),
        }
    }

    pub fn with_extra_type(mut self, content_type: impl Into<String>) -> Self {
        self.extra_content_types.push(content_type.into());
        self
    }

    /// Every content type the body is offered in, primary first
    pub fn content_types(&self) -> Vec<String> {
        let mut types = vec![self.content_type.clone()];
        for extra in &self.extra_content_types {
            if !types.contains(extra) {
                types.push(extra.clone());
            }
        }
        types
    }
}

/// One HTTP operation on a path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationSpec {
    pub method: HttpMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBodySpec>,
    #[serde(default)]
    pub responses: Vec<ResponseSpec>,
    /// Example slots, one per declared response, in the same order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<Option<Value>>>,
}

impl OperationSpec {
    pub fn new(method: HttpMethod) -> Self {
        Self {
            method,
            summary: None,
            operation_id: None,
            description: None,
            tags: Vec::new(),
            parameters: Vec::new(),
            request_body: None,
            responses: Vec::new(),
            examples: None,
        }
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = Some(id.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn param(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn request_body(mut self, body: RequestBodySpec) -> Self {
        self.request_body = Some(body);
        self
    }

    pub fn response(mut self, response: ResponseSpec) -> Self {
        self.responses.push(response);
        self
    }

    pub fn examples(mut self, slots: Vec<Option<Value>>) -> Self {
        self.examples = Some(slots);
        self
    }
}

/// A path template with its path-level parameters and operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteDefinition {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub operations: Vec<OperationSpec>,
}

impl RouteDefinition {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            summary: None,
            description: None,
            tags: Vec::new(),
            parameters: Vec::new(),
            operations: Vec::new(),
        }
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn param(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn operation(mut self, operation: OperationSpec) -> Self {
        self.operations.push(operation);
        self
    }

    /// Every model name referenced by request bodies and responses
    pub fn referenced_schemas(&self) -> Vec<&str> {
        let mut names = Vec::new();
        for operation in &self.operations {
            if let Some(body) = &operation.request_body {
                names.push(body.schema.model_name());
            }
            for response in &operation.responses {
                if let Some(schema) = &response.schema {
                    names.push(schema.model_name());
                }
            }
        }
        names
    }
}

/// A response with its example bound
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedResponse {
    pub status: u16,
    pub description: String,
    pub schema: Option<BodySchema>,
    pub content_types: Vec<String>,
    /// Example per content type, empty exactly when the response has no body
    pub examples: IndexMap<String, Value>,
}

/// An operation with merged parameters and bound responses
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedOperation {
    pub method: HttpMethod,
    pub summary: Option<String>,
    pub operation_id: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBodySpec>,
    pub responses: Vec<CollectedResponse>,
}

/// A route ready for document assembly
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedRoute {
    /// Path template in `{param}` form
    pub path: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub parameters: Vec<Parameter>,
    pub operations: Vec<CollectedOperation>,
}

/// Route collector - merges parameters and binds response examples
pub struct RouteCollector<'g> {
    graph: &'g SchemaGraph,
    synthesizer: ExampleSynthesizer<'g>,
}

impl<'g> RouteCollector<'g> {
    pub fn new(graph: &'g SchemaGraph) -> Self {
        Self::with_options(graph, SynthesisOptions::default())
    }

    pub fn with_options(graph: &'g SchemaGraph, options: SynthesisOptions) -> Self {
        Self {
            graph,
            synthesizer: ExampleSynthesizer::with_options(graph, options),
        }
    }

    /// Collect every operation of a route
    pub fn collect(&self, route: &RouteDefinition) -> Result<CollectedRoute> {
        let path = normalize_path(&route.path);
        debug!("Collecting route: {}", path);

        let path_parameters: Vec<Parameter> =
            route.parameters.iter().map(normalize_parameter).collect();
        warn_undeclared_path_params(&path, route);

        let operations = route
            .operations
            .iter()
            .map(|operation| self.collect_operation(&path, route, &path_parameters, operation))
            .collect::<Result<Vec<_>>>()?;

        Ok(CollectedRoute {
            path,
            summary: route.summary.clone(),
            description: route.description.clone(),
            parameters: path_parameters,
            operations,
        })
    }

    fn collect_operation(
        &self,
        path: &str,
        route: &RouteDefinition,
        path_parameters: &[Parameter],
        operation: &OperationSpec,
    ) -> Result<CollectedOperation> {
        let label = format!("{} {}", operation.method, path);
        debug!("Collecting operation: {}", label);

        let slots = Self::example_slots(&label, operation)?;

        if let Some(body) = &operation.request_body {
            self.ensure_schema(&label, body.schema.model_name())?;
        }

        let mut responses = Vec::with_capacity(operation.responses.len());
        for (response, slot) in operation.responses.iter().zip(slots) {
            let content_types = response.content_types();
            let examples = match &response.schema {
                Some(body) => self.bind_examples(&label, body, &content_types, slot)?,
                None => IndexMap::new(),
            };
            responses.push(CollectedResponse {
                status: response.status,
                description: response.description.clone(),
                schema: response.schema.clone(),
                content_types,
                examples,
            });
        }

        let mut tags = route.tags.clone();
        for tag in &operation.tags {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }

        Ok(CollectedOperation {
            method: operation.method,
            summary: operation.summary.clone(),
            operation_id: operation.operation_id.clone(),
            description: operation.description.clone(),
            tags,
            parameters: merge_parameters(path_parameters, &operation.parameters),
            request_body: operation.request_body.clone(),
            responses,
        })
    }

    /// Line the example slots up with the declared responses.
    fn example_slots<'a>(label: &str, operation: &'a OperationSpec) -> Result<Vec<Option<&'a Value>>> {
        let mut statuses = HashSet::new();
        for response in &operation.responses {
            if !statuses.insert(response.status) {
                return Err(Error::InvalidResponseOrder {
                    operation: label.to_string(),
                    message: format!("status {} is declared more than once", response.status),
                });
            }
        }

        let Some(examples) = &operation.examples else {
            return Ok(vec![None; operation.responses.len()]);
        };

        if examples.len() != operation.responses.len() {
            return Err(Error::InvalidResponseOrder {
                operation: label.to_string(),
                message: format!(
                    "{} example slots for {} declared responses",
                    examples.len(),
                    operation.responses.len()
                ),
            });
        }

        let mut slots = Vec::with_capacity(examples.len());
        for (position, (response, slot)) in operation.responses.iter().zip(examples).enumerate() {
            let slot = slot.as_ref().filter(|value| !value.is_null());
            if response.schema.is_none() && slot.is_some() {
                return Err(Error::InvalidResponseOrder {
                    operation: label.to_string(),
                    message: format!(
                        "slot {} carries an example but response {} has no body",
                        position, response.status
                    ),
                });
            }
            slots.push(slot);
        }
        Ok(slots)
    }

    /// Bind one example per content type.
    ///
    /// With several content types, an object slot whose keys are all among
    /// them is read per content type; content types it leaves out are
    /// synthesized. Any other slot applies to every content type.
    fn bind_examples(
        &self,
        label: &str,
        body: &BodySchema,
        content_types: &[String],
        slot: Option<&Value>,
    ) -> Result<IndexMap<String, Value>> {
        let id = self.ensure_schema(label, body.model_name())?;

        if let Some(Value::Object(keyed)) = slot {
            let per_type = content_types.len() > 1
                && !keyed.is_empty()
                && keyed.keys().all(|key| content_types.contains(key));
            if per_type {
                return content_types
                    .iter()
                    .map(|content_type| -> Result<(String, Value)> {
                        let slot = keyed.get(content_type).filter(|value| !value.is_null());
                        Ok((content_type.clone(), self.example_for(id, body, slot)?))
                    })
                    .collect();
            }
        }

        let example = self.example_for(id, body, slot)?;
        Ok(content_types
            .iter()
            .map(|content_type| (content_type.clone(), example.clone()))
            .collect())
    }

    fn example_for(&self, id: NodeId, body: &BodySchema, slot: Option<&Value>) -> Result<Value> {
        match (body, slot) {
            (BodySchema::Model(_), Some(Value::Object(overrides))) => {
                self.synthesizer.synthesize(id, Some(overrides))
            }
            // Overrides for an array body apply to its single item
            (BodySchema::ArrayOf { .. }, Some(Value::Object(overrides))) => {
                let item = self.synthesizer.synthesize(id, Some(overrides))?;
                Ok(Value::Array(vec![item]))
            }
            (_, Some(literal)) => Ok(literal.clone()),
            (BodySchema::Model(_), None) => self.synthesizer.synthesize(id, None),
            (BodySchema::ArrayOf { .. }, None) => {
                self.synthesizer.synthesize_type(&ResolvedType::ArrayOf {
                    items: Box::new(ResolvedType::NodeRef(id)),
                    nullable: false,
                })
            }
        }
    }

    fn ensure_schema(&self, label: &str, schema: &str) -> Result<NodeId> {
        self.graph.id_of(schema).ok_or_else(|| {
            Error::DocumentAssembly(format!(
                "{} references unknown schema '{}'",
                label, schema
            ))
        })
    }
}

/// Merge path-level and operation-level parameters.
///
/// An operation parameter with the same (name, location) as a path parameter
/// replaces it in place; the rest are appended in declaration order.
pub fn merge_parameters(path_level: &[Parameter], operation_level: &[Parameter]) -> Vec<Parameter> {
    let mut merged: Vec<Parameter> = path_level.to_vec();
    for parameter in operation_level.iter().map(normalize_parameter) {
        match merged.iter_mut().find(|existing| existing.same_slot(&parameter)) {
            Some(existing) => *existing = parameter,
            None => merged.push(parameter),
        }
    }
    merged
}

fn normalize_parameter(parameter: &Parameter) -> Parameter {
    let mut parameter = parameter.clone();
    if parameter.location == ParameterLocation::Path {
        parameter.required = true;
    }
    parameter
}

/// Convert `:param` segments to OpenAPI `{param}` form
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|part| match part.strip_prefix(':') {
            Some(name) => format!("{{{}}}", name),
            None => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn warn_undeclared_path_params(path: &str, route: &RouteDefinition) {
    for segment in path.split('/') {
        let Some(name) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) else {
            continue;
        };
        let declared = route
            .parameters
            .iter()
            .chain(route.operations.iter().flat_map(|op| op.parameters.iter()))
            .any(|p| p.location == ParameterLocation::Path && p.name == name);
        if !declared {
            warn!("Path {} uses {{{}}} without declaring it", path, name);
        }
    }
}
