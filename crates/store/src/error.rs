use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("State directory {path} unavailable: {source}")]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O failure on table {table} at {path}: {source}")]
    Io {
        table: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt table document {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode table {table}: {source}")]
    Encode {
        table: String,
        #[source]
        source: serde_json::Error,
    },
}
