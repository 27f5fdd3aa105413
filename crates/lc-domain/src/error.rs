/// Shared error type used across all lit-critic crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("validation: {0}")]
    Validation(String),

    #[error("coordination failed after {attempts} attempt(s): {message}")]
    Coordination {
        message: String,
        raw_output_excerpt: String,
        attempts: u32,
    },

    #[error("scene validation: {0}")]
    SceneValidation(SceneValidationError),

    #[error("repo preflight ({reason_code}): {message}")]
    RepoPreflight {
        reason_code: &'static str,
        message: String,
    },

    #[error("persistence: {0}")]
    Persistence(String),

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("{0}")]
    Other(String),
}

/// Structured detail for `Error::SceneValidation`, carrying enough context
/// for the UI to prompt the author to re-point the session at the right file.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SceneValidationError {
    pub message: String,
    pub saved_paths: Vec<String>,
    pub attempted_paths: Vec<String>,
}

impl std::fmt::Display for SceneValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
