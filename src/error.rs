use std::path::PathBuf;

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the crate
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A model name, or a field name within one model, was registered twice
    #[error("{}", describe_duplicate(model, field.as_deref()))]
    DuplicateModel { model: String, field: Option<String> },

    /// Models referenced by name but never registered
    #[error("unresolved model references: {}", names.join(", "))]
    UnresolvedReference { names: Vec<String> },

    /// A field descriptor violates the descriptor rules
    #[error("invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    /// A required field could not be given an example value
    #[error("cannot build example for required field '{field}' of '{model}': {reason}")]
    IncompleteExample {
        model: String,
        field: String,
        reason: String,
    },

    /// Example slots do not line up with the declared responses
    #[error("invalid response examples for {operation}: {message}")]
    InvalidResponseOrder { operation: String, message: String },

    /// A route points at something the schema graph does not contain
    #[error("document assembly failed: {0}")]
    DocumentAssembly(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error in {}: {}", file.display(), message)]
    Parse { file: PathBuf, message: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

fn describe_duplicate(model: &str, field: Option<&str>) -> String {
    match field {
        Some(field) => format!("duplicate field '{}' in model '{}'", field, model),
        None => format!("duplicate model '{}'", model),
    }
}

impl Error {
    pub(crate) fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(format!("JSON: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Serialization(format!("YAML: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_model_message() {
        let err = Error::DuplicateModel {
            model: "User".to_string(),
            field: None,
        };
        assert_eq!(err.to_string(), "duplicate model 'User'");
    }

    #[test]
    fn test_duplicate_field_message() {
        let err = Error::DuplicateModel {
            model: "User".to_string(),
            field: Some("id".to_string()),
        };
        assert_eq!(err.to_string(), "duplicate field 'id' in model 'User'");
    }

    #[test]
    fn test_unresolved_reference_lists_all_names() {
        let err = Error::UnresolvedReference {
            names: vec!["Menu".to_string(), "Owner".to_string()],
        };
        assert_eq!(err.to_string(), "unresolved model references: Menu, Owner");
    }
}
