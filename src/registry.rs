use crate::error::{Error, Result};
use crate::field::FieldDescriptor;
use indexmap::{IndexMap, IndexSet};
use log::debug;
use std::collections::HashSet;
use std::fmt;

/// Lazy handle to a model, valid before the model itself is registered.
///
/// The handle only carries the name; the lookup is deferred until the
/// registry is finalized and the schema compiler resolves it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelRef(String);

impl ModelRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModelRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ModelRef {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named, ordered set of field descriptors. Immutable once registered.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDefinition {
    name: String,
    fields: Vec<FieldDescriptor>,
}

impl ModelDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }
}

/// Model registry - maps model names to their definitions
#[derive(Debug, Default)]
pub struct ModelRegistry {
    /// Registered models in registration order
    models: IndexMap<String, ModelDefinition>,
    /// Names handed out through `reference`, registered or not
    handles: IndexSet<String>,
    finalized: bool,
}

impl ModelRegistry {
    pub fn new() -> Self {
        debug!("Initializing ModelRegistry");
        Self::default()
    }

    /// Register a model under `name`.
    ///
    /// Every descriptor is validated here so authoring mistakes surface before
    /// compilation. Fails with [`Error::DuplicateModel`] when the model name is
    /// taken or when two fields share a name.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        fields: Vec<FieldDescriptor>,
    ) -> Result<ModelRef> {
        let name = name.into();
        if self.models.contains_key(&name) {
            return Err(Error::DuplicateModel {
                model: name,
                field: None,
            });
        }

        let mut seen = HashSet::new();
        for field in &fields {
            field.validate()?;
            if !seen.insert(field.name()) {
                return Err(Error::DuplicateModel {
                    model: name,
                    field: Some(field.name().to_string()),
                });
            }
        }

        debug!("Registered model {} with {} fields", name, fields.len());
        self.models.insert(
            name.clone(),
            ModelDefinition {
                name: name.clone(),
                fields,
            },
        );
        // A new model may introduce new references
        self.finalized = false;
        Ok(ModelRef(name))
    }

    /// Hand out a lazy reference to `name`, registered or not.
    pub fn reference(&mut self, name: impl Into<String>) -> ModelRef {
        let name = name.into();
        self.handles.insert(name.clone());
        ModelRef(name)
    }

    /// Every referenced name that has no registered model, in first-seen order.
    pub fn unresolved(&self) -> Vec<String> {
        let field_targets = self
            .models
            .values()
            .flat_map(|model| model.fields.iter())
            .filter_map(|field| field.reference_target());
        let handle_targets = self.handles.iter().map(String::as_str);

        let mut missing: IndexSet<&str> = IndexSet::new();
        for target in field_targets.chain(handle_targets) {
            if !self.models.contains_key(target) {
                missing.insert(target);
            }
        }
        missing.into_iter().map(str::to_string).collect()
    }

    /// Check that every reference resolves.
    ///
    /// All-or-nothing: on failure the registry stays unfinalized and the error
    /// lists every dangling name.
    pub fn finalize(&mut self) -> Result<()> {
        let names = self.unresolved();
        if !names.is_empty() {
            debug!("Finalize failed, unresolved: {:?}", names);
            return Err(Error::UnresolvedReference { names });
        }
        self.finalized = true;
        debug!("Registry finalized with {} models", self.models.len());
        Ok(())
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn get(&self, name: &str) -> Option<&ModelDefinition> {
        self.models.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Models in registration order
    pub fn models(&self) -> impl Iterator<Item = &ModelDefinition> {
        self.models.values()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
