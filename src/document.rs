use crate::error::{Error, Result};
use crate::example::SynthesisOptions;
use crate::route::{
    merge_parameters, normalize_path, BodySchema, CollectedOperation, CollectedResponse,
    CollectedRoute, HttpMethod, Parameter, RequestBodySpec, RouteCollector, RouteDefinition,
};
use crate::schema_compiler::{Schema, SchemaGraph, SchemaType};
use indexmap::{IndexMap, IndexSet};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_OPENAPI_VERSION: &str = "3.0.1";

/// Document assembler - combines the schema graph and route definitions
pub struct DocumentAssembler {
    info: Info,
    openapi_version: String,
    options: SynthesisOptions,
}

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API version
    pub version: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for Info {
    fn default() -> Self {
        Self {
            title: "Generated API".to_string(),
            version: "1.0.0".to_string(),
            description: None,
        }
    }
}

/// OpenAPI PathItem object - represents all operations for a single path
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Parameters shared by every operation on this path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<ParameterObject>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
}

impl PathItem {
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        match method {
            HttpMethod::Get => self.get.as_ref(),
            HttpMethod::Put => self.put.as_ref(),
            HttpMethod::Post => self.post.as_ref(),
            HttpMethod::Delete => self.delete.as_ref(),
            HttpMethod::Patch => self.patch.as_ref(),
            HttpMethod::Options => self.options.as_ref(),
            HttpMethod::Head => self.head.as_ref(),
        }
    }

    fn slot(&mut self, method: HttpMethod) -> &mut Option<Operation> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
        }
    }
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
    /// Operation summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Operation ID
    #[serde(rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Operation description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Parameters (path, query, header, cookie)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<ParameterObject>>,
    /// Request body
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code, in declaration order
    pub responses: IndexMap<String, Response>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterObject {
    /// Parameter name
    pub name: String,
    /// Parameter location (path, query, header, cookie)
    #[serde(rename = "in")]
    pub location: String,
    /// Whether the parameter is required
    pub required: bool,
    /// Parameter schema
    pub schema: Schema,
    /// Parameter description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub deprecated: bool,
}

impl From<&Parameter> for ParameterObject {
    fn from(parameter: &Parameter) -> Self {
        let mut schema = Schema::primitive(parameter.param_type.into(), parameter.format.clone());
        schema.default = parameter.default.clone();
        Self {
            name: parameter.name.clone(),
            location: parameter.location.as_str().to_string(),
            required: parameter.required,
            schema,
            description: parameter.description.clone(),
            example: parameter.example.clone(),
            deprecated: parameter.deprecated,
        }
    }
}

/// OpenAPI RequestBody object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Request body description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the request body is required
    pub required: bool,
    /// Content types and their schemas
    pub content: IndexMap<String, MediaType>,
}

impl From<&RequestBodySpec> for RequestBody {
    fn from(body: &RequestBodySpec) -> Self {
        let mut content = IndexMap::new();
        content.insert(
            body.content_type.clone(),
            MediaType {
                schema: body_schema(&body.schema),
                example: None,
            },
        );
        Self {
            description: body.description.clone(),
            required: body.required,
            content,
        }
    }
}

/// OpenAPI MediaType object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    /// Schema for this media type
    pub schema: Schema,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

/// OpenAPI Response object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Response description
    pub description: String,
    /// Response content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<IndexMap<String, MediaType>>,
}

impl From<&CollectedResponse> for Response {
    fn from(response: &CollectedResponse) -> Self {
        let content = response.schema.as_ref().map(|body| {
            response
                .content_types
                .iter()
                .map(|content_type| {
                    let media = MediaType {
                        schema: body_schema(body),
                        example: response.examples.get(content_type).cloned(),
                    };
                    (content_type.clone(), media)
                })
                .collect()
        });
        Self {
            description: response.description.clone(),
            content,
        }
    }
}

/// `$ref` to the model, or an array schema whose items are that `$ref`
fn body_schema(body: &BodySchema) -> Schema {
    match body {
        BodySchema::Model(name) => Schema::reference_to(name),
        BodySchema::ArrayOf { array_of } => Schema {
            schema_type: Some(SchemaType::Single("array".to_string())),
            items: Some(Box::new(Schema::reference_to(array_of))),
            ..Default::default()
        },
    }
}

/// OpenAPI Components object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Components {
    /// Schema definitions, one per schema node
    pub schemas: IndexMap<String, Schema>,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    pub info: Info,
    /// API paths, in first-declared order
    pub paths: IndexMap<String, PathItem>,
    /// Components (schemas)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
}

impl OpenApiDocument {
    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.components.as_ref()?.schemas.get(name)
    }

    pub fn operation(&self, path: &str, method: HttpMethod) -> Option<&Operation> {
        self.paths.get(path)?.operation(method)
    }
}

impl DocumentAssembler {
    /// Create a new DocumentAssembler with default info
    pub fn new() -> Self {
        debug!("Initializing DocumentAssembler");
        Self {
            info: Info::default(),
            openapi_version: DEFAULT_OPENAPI_VERSION.to_string(),
            options: SynthesisOptions::default(),
        }
    }

    /// Set custom info for the API
    pub fn with_info(mut self, info: Info) -> Self {
        self.info = info;
        self
    }

    pub fn with_openapi_version(mut self, version: impl Into<String>) -> Self {
        self.openapi_version = version.into();
        self
    }

    pub fn with_options(mut self, options: SynthesisOptions) -> Self {
        self.options = options;
        self
    }

    /// Assemble the document.
    ///
    /// Every schema name used by a route is checked against the graph before
    /// any example is synthesized; the error lists all unknown names.
    ///
    /// Several definitions may share a path. Their path-level parameters are
    /// merged first, so every operation on the path sees all of them.
    pub fn assemble(
        &self,
        graph: &SchemaGraph,
        routes: &[RouteDefinition],
    ) -> Result<OpenApiDocument> {
        debug!(
            "Assembling document from {} schemas and {} routes",
            graph.len(),
            routes.len()
        );

        let missing: IndexSet<&str> = routes
            .iter()
            .flat_map(|route| route.referenced_schemas())
            .filter(|name| !graph.contains(name))
            .collect();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.into_iter().collect();
            return Err(Error::DocumentAssembly(format!(
                "routes reference unknown schemas: {}",
                names.join(", ")
            )));
        }

        let mut shared: IndexMap<String, Vec<Parameter>> = IndexMap::new();
        for route in routes {
            let merged = shared.entry(normalize_path(&route.path)).or_default();
            *merged = merge_parameters(merged, &route.parameters);
        }

        let collector = RouteCollector::with_options(graph, self.options);
        let mut paths: IndexMap<String, PathItem> = IndexMap::new();
        for route in routes {
            let parameters = shared
                .get(&normalize_path(&route.path))
                .cloned()
                .unwrap_or_default();
            let route = RouteDefinition {
                parameters,
                ..route.clone()
            };
            let collected = collector.collect(&route)?;
            Self::merge_route(&mut paths, collected);
        }

        let schemas: IndexMap<String, Schema> = graph
            .nodes()
            .map(|node| (node.name.clone(), graph.render_node(node.id)))
            .collect();
        let components = if schemas.is_empty() {
            None
        } else {
            Some(Components { schemas })
        };

        Ok(OpenApiDocument {
            openapi: self.openapi_version.clone(),
            info: self.info.clone(),
            paths,
            components,
        })
    }

    fn merge_route(paths: &mut IndexMap<String, PathItem>, route: CollectedRoute) {
        let path_item = paths.entry(route.path.clone()).or_default();

        if path_item.summary.is_none() {
            path_item.summary = route.summary;
        }
        if path_item.description.is_none() {
            path_item.description = route.description;
        }

        if !route.parameters.is_empty() {
            let shared = path_item.parameters.get_or_insert_with(Vec::new);
            for parameter in &route.parameters {
                let object = ParameterObject::from(parameter);
                match shared
                    .iter_mut()
                    .find(|p| p.name == object.name && p.location == object.location)
                {
                    Some(existing) => *existing = object,
                    None => shared.push(object),
                }
            }
        }

        for operation in route.operations {
            let method = operation.method;
            let slot = path_item.slot(method);
            if slot.is_some() {
                warn!(
                    "{} {} declared more than once, keeping the later definition",
                    method, route.path
                );
            }
            *slot = Some(Self::build_operation(operation));
        }
    }

    fn build_operation(operation: CollectedOperation) -> Operation {
        let parameters = if operation.parameters.is_empty() {
            None
        } else {
            Some(operation.parameters.iter().map(ParameterObject::from).collect())
        };

        let responses = operation
            .responses
            .iter()
            .map(|response| (response.status.to_string(), Response::from(response)))
            .collect();

        Operation {
            tags: operation.tags,
            summary: operation.summary,
            operation_id: operation.operation_id,
            description: operation.description,
            parameters,
            request_body: operation.request_body.as_ref().map(RequestBody::from),
            responses,
        }
    }
}

impl Default for DocumentAssembler {
    fn default() -> Self {
        Self::new()
    }
}
