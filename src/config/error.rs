use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("Config resource not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read config resource {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config resource {name}: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid kernel config: size {size}, stride {stride} (both must be > 0)")]
    InvalidKernel { size: usize, stride: usize },
}
