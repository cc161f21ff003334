use thiserror::Error;

/// Prefix shared by every diagnostic the static compilation passes emit.
pub const STATIC_ERROR_PREFIX: &str = "[Static type checking] - ";

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("[Static type checking] - Unimplemented node type: {kind} at {line}:{column}")]
    UnsupportedNode {
        kind: &'static str,
        line: u32,
        column: u32,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported config file extension: {0}")]
    UnsupportedFormat(String),
}
