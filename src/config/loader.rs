use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::ConfigLoadError;

/// Loads a typed configuration object from a named resource.
///
/// Components take a loader by generic parameter so tests can swap in a
/// loader that never touches the filesystem.
pub trait ConfigLoader {
    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T, ConfigLoadError>;
}

/// Resolves resource names as JSON files relative to a base directory.
#[derive(Clone, Debug)]
pub struct JsonConfigLoader {
    resource_dir: PathBuf,
}

impl JsonConfigLoader {
    pub fn new(resource_dir: impl Into<PathBuf>) -> Self {
        Self {
            resource_dir: resource_dir.into(),
        }
    }

    pub fn resource_dir(&self) -> &Path {
        &self.resource_dir
    }

    fn read_resource(&self, name: &str) -> Result<String, ConfigLoadError> {
        let path = self.resource_dir.join(name);
        std::fs::read_to_string(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ConfigLoadError::NotFound { path },
            _ => ConfigLoadError::Io { path, source },
        })
    }
}

impl ConfigLoader for JsonConfigLoader {
    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T, ConfigLoadError> {
        let contents = self.read_resource(name)?;
        let value = parse_json(name, &contents)?;
        debug!("Loaded config resource {} from {}", name, self.resource_dir.display());
        Ok(value)
    }
}

pub fn parse_json<T: DeserializeOwned>(name: &str, contents: &str) -> Result<T, ConfigLoadError> {
    serde_json::from_str(contents).map_err(|source| ConfigLoadError::Parse {
        name: name.to_string(),
        source,
    })
}
