use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Failed to parse {dataset} payload: {reason}")]
    Parse { dataset: String, reason: String },

    #[error("Malformed {dataset} record: {reason}")]
    Transform { dataset: String, reason: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Build a [`CoreError::Transform`] for a payload whose top level is
    /// not the object shape the transformer expects.
    pub fn not_an_object(dataset: &str, value: &Value) -> Self {
        let kind = match value {
            Value::Null => "null",
            Value::Bool(_) => "a boolean",
            Value::Number(_) => "a number",
            Value::String(_) => "a string",
            Value::Array(_) => "an array",
            Value::Object(_) => "an object",
        };
        CoreError::Transform {
            dataset: dataset.to_string(),
            reason: format!("expected a top-level object, got {kind}"),
        }
    }
}
