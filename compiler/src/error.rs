use brine_proto_schema::ValidationErrors;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("Schema validation failed:\n{0}")]
    Validation(#[from] ValidationErrors),

    #[error("Failed to render {file}: {message}")]
    Render {
        file:    String,
        message: String,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
