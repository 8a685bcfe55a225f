use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use super::error::DatasetError;

/// Image files grouped by label, labels in lexicographic order.
///
/// `by_label[i]` holds the files whose parent directory is `label_names[i]`,
/// themselves sorted by path.
#[derive(Debug, Clone)]
pub struct DiscoveredFiles {
    pub label_names: Vec<String>,
    pub by_label: Vec<Vec<PathBuf>>,
}

impl DiscoveredFiles {
    pub fn total(&self) -> usize {
        self.by_label.iter().map(Vec::len).sum()
    }

    pub fn counts(&self) -> Vec<usize> {
        self.by_label.iter().map(Vec::len).collect()
    }
}

pub fn discover_images(
    root: &Path,
    extensions: &[String],
    num_classes: usize,
) -> Result<DiscoveredFiles, DatasetError> {
    if !root.is_dir() {
        return Err(DatasetError::MissingDirectory(root.to_owned()));
    }

    let valid: HashSet<&str> = extensions.iter().map(String::as_str).collect();
    let mut grouped: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || !has_valid_extension(entry.path(), &valid) {
            continue;
        }

        let Some(label) = parent_label(entry.path()) else {
            continue;
        };
        grouped.entry(label).or_default().push(entry.into_path());
    }

    if grouped.is_empty() {
        return Err(DatasetError::EmptyDataset {
            root: root.to_owned(),
            extensions: extensions.to_vec(),
        });
    }

    if grouped.len() > num_classes {
        return Err(DatasetError::TooManyLabels {
            found: grouped.len(),
            declared: num_classes,
        });
    }
    if grouped.len() < num_classes {
        warn!(
            "Found {} labels under {} but {} classes are declared",
            grouped.len(),
            root.display(),
            num_classes
        );
    }

    let mut label_names = Vec::with_capacity(grouped.len());
    let mut by_label = Vec::with_capacity(grouped.len());
    for (label, mut files) in grouped {
        files.sort();
        debug!("Label {} ({}): {} files", label_names.len(), label, files.len());
        label_names.push(label);
        by_label.push(files);
    }

    Ok(DiscoveredFiles {
        label_names,
        by_label,
    })
}

fn has_valid_extension(path: &Path, valid: &HashSet<&str>) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| valid.contains(ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn parent_label(path: &Path) -> Option<String> {
    path.parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
}
