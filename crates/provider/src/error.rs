use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Platform config {path} unreadable: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Platform config {path} invalid: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Provider executable {path} unavailable: {reason}")]
    Unavailable { path: PathBuf, reason: String },

    #[error("I/O failure reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Provider command `{command}` failed: {details}")]
    Command { command: String, details: String },

    #[error("Provider command `{command}` timed out after {secs}s")]
    Timeout { command: String, secs: u64 },

    #[error("Malformed output from `{command}`: {source}")]
    Output {
        command: String,
        #[source]
        source: serde_json::Error,
    },
}
