use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use bincode::Options;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::model::{ModelBuilder, NetworkSpec, OptimizerState, TrainedNetwork};
use crate::tensor::{Tensor, TensorDesc};

use super::error::PersistenceError;

const MAGIC: &[u8; 8] = b"IMGCLSNN";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = MAGIC.len() + std::mem::size_of::<u32>();

#[derive(Serialize)]
struct ArtifactRef<'a> {
    spec: &'a NetworkSpec,
    parameters: Vec<&'a Tensor>,
    optimizer: &'a OptimizerState,
}

#[derive(Deserialize)]
struct Artifact {
    spec: NetworkSpec,
    parameters: Vec<Tensor>,
    optimizer: OptimizerState,
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new().with_fixint_encoding()
}

/// Single-file save and restore of a network with its optimizer state.
pub struct ModelPersistence;

impl ModelPersistence {
    /// Writes `network` to a temporary sibling of `path`, then renames it
    /// into place. On failure the temporary file is removed.
    pub fn save(network: &TrainedNetwork, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        let path = path.as_ref();
        let tmp = temp_sibling(path);
        let artifact = ArtifactRef {
            spec: network.spec(),
            parameters: network.parameters(),
            optimizer: network.optimizer_state(),
        };

        let written = write_artifact(&tmp, &artifact).and_then(|()| {
            fs::rename(&tmp, path).map_err(|source| PersistenceError::Io {
                path: path.to_owned(),
                source,
            })
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        info!(
            "Saved model ({} parameters, iteration {}) to {}",
            network.parameter_count(),
            network.iteration(),
            path.display()
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<TrainedNetwork, PersistenceError> {
        let path = path.as_ref();
        let bytes = read_artifact(path)?;
        let corrupt = |reason: String| PersistenceError::Corrupt {
            path: path.to_owned(),
            reason,
        };

        if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
            return Err(corrupt("missing model header".to_string()));
        }
        let mut version = [0u8; 4];
        version.copy_from_slice(&bytes[MAGIC.len()..HEADER_LEN]);
        let version = u32::from_le_bytes(version);
        if version != FORMAT_VERSION {
            return Err(corrupt(format!("unsupported format version {version}")));
        }

        let body = &bytes[HEADER_LEN..];
        let artifact: Artifact = codec()
            .with_limit(body.len() as u64)
            .deserialize(body)
            .map_err(|e| corrupt(e.to_string()))?;

        // Shapes first: a damaged declaration must not size an allocation.
        let expected = artifact.spec.parameter_descs();
        check_tensors(&expected, &artifact.parameters)?;
        check_tensors(&expected, &artifact.optimizer.velocities)?;
        artifact
            .spec
            .revalidate()
            .map_err(|e| corrupt(format!("stored architecture is invalid: {e}")))?;

        let network = restore(artifact)?;
        info!(
            "Loaded model ({} parameters, iteration {}) from {}",
            network.parameter_count(),
            network.iteration(),
            path.display()
        );
        Ok(network)
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());
    path.with_file_name(format!(".{name}.tmp"))
}

fn write_artifact(tmp: &Path, artifact: &ArtifactRef<'_>) -> Result<(), PersistenceError> {
    let io_err = |source| PersistenceError::Io {
        path: tmp.to_owned(),
        source,
    };
    let file = File::create(tmp).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(MAGIC).map_err(io_err)?;
    writer.write_all(&FORMAT_VERSION.to_le_bytes()).map_err(io_err)?;
    codec().serialize_into(&mut writer, artifact)?;
    let file = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
    file.sync_all().map_err(io_err)
}

/// Anything but a missing file reads as corrupt.
fn read_artifact(path: &Path) -> Result<Vec<u8>, PersistenceError> {
    let unreadable = |source: std::io::Error| PersistenceError::Corrupt {
        path: path.to_owned(),
        reason: format!("unreadable: {source}"),
    };
    let mut file = File::open(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => PersistenceError::NotFound { path: path.to_owned() },
        _ => unreadable(source),
    })?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(unreadable)?;
    Ok(bytes)
}

/// Checks every stored tensor against the shapes the spec declares, and its
/// data against the element count of its own descriptor.
fn check_tensors(expected: &[TensorDesc], actual: &[Tensor]) -> Result<(), PersistenceError> {
    if expected.len() != actual.len() {
        return Err(PersistenceError::TensorCountMismatch {
            expected: expected.len(),
            actual: actual.len(),
        });
    }
    for (index, (want, got)) in expected.iter().zip(actual).enumerate() {
        if want != got.desc() || got.desc().checked_num_elements() != Some(got.len()) {
            return Err(PersistenceError::ShapeMismatch {
                index,
                expected: *want,
                actual: *got.desc(),
            });
        }
    }
    Ok(())
}

fn restore(artifact: Artifact) -> Result<TrainedNetwork, PersistenceError> {
    let Artifact {
        spec,
        parameters,
        optimizer,
    } = artifact;

    let mut stages = ModelBuilder::materialize(&spec);
    let mut stored = parameters.into_iter();
    for stage in stages.iter_mut() {
        for (slot, value) in stage.parameters_mut().iter_mut().zip(stored.by_ref()) {
            *slot = value;
        }
    }

    Ok(TrainedNetwork::from_parts(spec, stages, optimizer))
}
