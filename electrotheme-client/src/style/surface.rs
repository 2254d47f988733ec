//! File-backed consumer.

use electrotheme_core::error::ConsumerError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::registry::{Consumer, ConsumerId};
use super::store::StylePayload;

/// Configuration for one file surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceConfig {
    /// Consumer id. Defaults to the path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// File the stylesheet is written to.
    pub path: PathBuf,
}

/// Writes each delivered stylesheet to a file, replacing it atomically.
///
/// Lets anything that can watch a file (a dev server, a browser extension,
/// another process) pick up theme changes.
#[derive(Debug, Clone)]
pub struct FileSurface {
    id: ConsumerId,
    path: PathBuf,
}

impl FileSurface {
    /// Creates a surface writing to `path`, identified by the path itself.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            id: ConsumerId::new(path.display().to_string()),
            path,
        }
    }

    /// Creates a surface with an explicit id.
    #[must_use]
    pub fn with_id(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: ConsumerId::new(id),
            path: path.into(),
        }
    }

    /// Returns the target path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write(&self, css: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let temp = self.temp_path();
        {
            let mut file = fs::File::create(&temp)?;
            file.write_all(css.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&temp, &self.path).inspect_err(|_| {
            let _ = fs::remove_file(&temp);
        })
    }
}

impl From<&SurfaceConfig> for FileSurface {
    fn from(config: &SurfaceConfig) -> Self {
        match &config.name {
            Some(name) => Self::with_id(name.clone(), config.path.clone()),
            None => Self::new(config.path.clone()),
        }
    }
}

impl Consumer for FileSurface {
    fn id(&self) -> ConsumerId {
        self.id.clone()
    }

    fn deliver(&self, payload: &StylePayload) -> Result<(), ConsumerError> {
        self.write(payload.as_str())
            .map_err(|e| ConsumerError::DeliveryFailed {
                consumer: self.id.to_string(),
                reason: format!("{}: {e}", self.path.display()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_deliver_writes_and_replaces_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("themes").join("current.css");
        let surface = FileSurface::new(&path);

        surface.deliver(&StylePayload::new("body{color:red}")).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "body{color:red}");

        surface.deliver(&StylePayload::new("")).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
        assert!(!surface.temp_path().exists());
    }

    #[test]
    fn test_deliver_reports_unwritable_target() {
        let dir = TempDir::new().unwrap();
        // The target is an existing directory, so the rename fails.
        let surface = FileSurface::with_id("blocked", dir.path());

        let err = surface.deliver(&StylePayload::new("a{}")).unwrap_err();
        assert!(matches!(err, ConsumerError::DeliveryFailed { ref consumer, .. } if consumer == "blocked"));
    }

    #[test]
    fn test_surface_from_config() {
        let named = FileSurface::from(&SurfaceConfig {
            name: Some("main".to_string()),
            path: PathBuf::from("/tmp/a.css"),
        });
        assert_eq!(named.id(), ConsumerId::new("main"));

        let unnamed = FileSurface::from(&SurfaceConfig {
            name: None,
            path: PathBuf::from("/tmp/a.css"),
        });
        assert_eq!(unnamed.id(), ConsumerId::new("/tmp/a.css"));
    }
}
