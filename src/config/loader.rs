//! Configuration loading from disk.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::ConfigDocument;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file (or an imported file) does not exist.
    #[error("config file {} is not present", path.display())]
    Missing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::Missing { path, source }
        } else {
            ConfigError::Io { path, source }
        }
    }
}

/// Load a configuration document and merge in the projects of every imported file.
///
/// Imports are resolved one level deep; an imported file's own imports are ignored.
pub async fn load_document(path: &Path) -> Result<ConfigDocument, ConfigError> {
    let mut document = read_document(path).await?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

    let imports = document.imported_configurations.clone();
    for import in &imports {
        let import_path = if import.path.is_absolute() {
            import.path.clone()
        } else {
            base_dir.join(&import.path)
        };

        let imported = read_document(&import_path).await?;
        if !imported.imported_configurations.is_empty() {
            tracing::debug!(
                path = %import_path.display(),
                "Ignoring nested imports of an imported configuration"
            );
        }

        tracing::debug!(
            path = %import_path.display(),
            projects = imported.projects.len(),
            "Merged imported configuration"
        );
        document.projects.extend(imported.projects);
    }

    Ok(document)
}

async fn read_document(path: &Path) -> Result<ConfigDocument, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::from_io(path, e))?;
    parse_document(path, &content)
}

/// Parse a document from its JSON text. `path` is only used for error reporting.
pub fn parse_document(path: &Path, content: &str) -> Result<ConfigDocument, ConfigError> {
    serde_json::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
