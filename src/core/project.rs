//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the directory that marks a project root
pub const PROJECT_DIR: &str = ".hab";

/// Represents a habilitation tracking project
#[derive(Debug)]
pub struct Project {
    /// Root directory of the project (parent of .hab/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Open the project rooted exactly at `root`, without walking up
    pub fn at(root: &Path) -> Result<Self, ProjectError> {
        let root = root
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        if !root.join(PROJECT_DIR).is_dir() {
            return Err(ProjectError::NotFound { searched_from: root });
        }
        Ok(Self { root })
    }

    /// Create a new project structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());

        if root.join(PROJECT_DIR).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }
        Self::write_structure(root)
    }

    /// Initialize even if .hab/ exists; the config is rewritten, the database kept
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path
            .canonicalize()
            .unwrap_or_else(|_| path.to_path_buf());
        Self::write_structure(root)
    }

    fn write_structure(root: PathBuf) -> Result<Self, ProjectError> {
        let hab_dir = root.join(PROJECT_DIR);
        std::fs::create_dir_all(&hab_dir).map_err(|e| ProjectError::IoError(e.to_string()))?;
        std::fs::write(hab_dir.join("config.yaml"), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;
        Ok(Self { root })
    }

    fn default_config() -> &'static str {
        r#"# Habilitation tracker project configuration

# Default output format (auto, yaml, tsv, json, csv, md, id)
# default_format: auto

# Organizational structure file (YAML), relative to the project root.
# The built-in division/service/team tree is used when unset.
# org_structure: org.yaml

# Number of import issues printed after `hab import`
# issue_limit: 20
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .hab configuration directory
    pub fn hab_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.hab_dir().join("config.yaml")
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a habilitation project (searched from {searched_from:?}). Run 'hab init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("habilitation project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_project_init_creates_structure() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        assert!(project.hab_dir().is_dir());
        assert!(project.config_path().exists());
    }

    #[test]
    fn test_project_init_fails_if_exists() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let err = Project::init(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::AlreadyExists(_)));
        assert!(Project::init_force(tmp.path()).is_ok());
    }

    #[test]
    fn test_project_discover_finds_hab_dir() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();

        let subdir = tmp.path().join("some/nested/dir");
        std::fs::create_dir_all(&subdir).unwrap();

        let project = Project::discover_from(&subdir).unwrap();
        assert_eq!(
            project.root().canonicalize().unwrap(),
            tmp.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_project_discover_fails_without_hab_dir() {
        let tmp = tempdir().unwrap();
        let err = Project::discover_from(tmp.path()).unwrap_err();
        assert!(matches!(err, ProjectError::NotFound { .. }));
    }

    #[test]
    fn test_project_at_does_not_walk_up() {
        let tmp = tempdir().unwrap();
        Project::init(tmp.path()).unwrap();
        let subdir = tmp.path().join("nested");
        std::fs::create_dir_all(&subdir).unwrap();

        assert!(Project::at(tmp.path()).is_ok());
        assert!(Project::at(&subdir).is_err());
    }
}
