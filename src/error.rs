//! CLI-facing error type. Unlike the Stateless Core Service's wire boundary,
//! nothing here ever becomes an HTTP response — the binary only ever prints
//! this to stderr and exits non-zero.

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Domain(#[from] lc_domain::error::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
