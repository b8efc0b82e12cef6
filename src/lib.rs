//! OpenAPI from Models - OpenAPI documents with examples from declarative definitions.
//!
//! Models are declared as ordered lists of field descriptors, routes as path
//! templates with typed parameters and responses bound to models. The library
//! compiles the models into a schema graph that shares one node per model
//! (cycles included), synthesizes a deterministic example for every response
//! body and assembles a complete OpenAPI document.
//!
//! # Architecture
//!
//! 1. [`field`] - Field descriptors and type tags
//! 2. [`registry`] - Model registry with forward references and finalization
//! 3. [`schema_compiler`] - Two-phase compilation into a [`schema_compiler::SchemaGraph`]
//! 4. [`example`] - Example synthesis with overrides and a cycle guard
//! 5. [`route`] - Route definitions and the route collector
//! 6. [`document`] - Document assembly
//! 7. [`loader`] / [`scanner`] - Definition files on disk
//! 8. [`serializer`] - YAML/JSON output and split docs trees
//!
//! # Example Usage
//!
//! ```
//! use openapi_from_models::{
//!     document::DocumentAssembler,
//!     field::{FieldDescriptor, ItemDescriptor},
//!     registry::ModelRegistry,
//!     route::{path_param, HttpMethod, OperationSpec, ParameterType, ResponseSpec, RouteDefinition},
//!     schema_compiler::SchemaCompiler,
//!     serializer::serialize_yaml,
//! };
//!
//! let mut registry = ModelRegistry::new();
//! registry.register("MenuItem", vec![
//!     FieldDescriptor::string("name").required(),
//!     FieldDescriptor::number("price").required(),
//! ])?;
//! registry.register("Menu", vec![
//!     FieldDescriptor::array_of("items", ItemDescriptor::reference("MenuItem")).required(),
//! ])?;
//! registry.finalize()?;
//!
//! let graph = SchemaCompiler::new().compile(&registry)?;
//! let route = RouteDefinition::new("/restaurants/{id}/menu")
//!     .param(path_param("id", ParameterType::Integer))
//!     .operation(
//!         OperationSpec::new(HttpMethod::Get).response(ResponseSpec::json(200, "Menu", "OK")),
//!     );
//!
//! let document = DocumentAssembler::new().assemble(&graph, &[route])?;
//! let yaml = serialize_yaml(&document)?;
//! assert!(yaml.contains("/restaurants/{id}/menu"));
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! # Command-Line Interface
//!
//! For command-line usage, see the [`cli`] module.

pub mod cli;
pub mod document;
pub mod error;
pub mod example;
pub mod field;
pub mod loader;
pub mod registry;
pub mod route;
pub mod scanner;
pub mod schema_compiler;
pub mod serializer;
