//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::error::HabResult;
use crate::core::org::OrgTree;
use crate::core::Project;

/// Issues printed after an import when nothing else is configured
pub const DEFAULT_ISSUE_LIMIT: usize = 20;

/// Tracker configuration with layered hierarchy
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Default output format
    pub default_format: Option<String>,

    /// YAML file replacing the built-in organizational tree
    pub org_structure: Option<PathBuf>,

    /// Number of import issues to print
    pub issue_limit: Option<usize>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load_for(project: Option<&Project>) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/hab/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.hab/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read_file(&project.config_path()) {
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        config.apply_env(|key| std::env::var(key).ok());

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
                None
            }
        }
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "hab")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
        if other.org_structure.is_some() {
            self.org_structure = other.org_structure;
        }
        if other.issue_limit.is_some() {
            self.issue_limit = other.issue_limit;
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(format) = lookup("HAB_FORMAT") {
            self.default_format = Some(format);
        }
        if let Some(path) = lookup("HAB_ORG_STRUCTURE") {
            self.org_structure = Some(PathBuf::from(path));
        }
        if let Some(limit) = lookup("HAB_ISSUE_LIMIT") {
            match limit.trim().parse() {
                Ok(n) => self.issue_limit = Some(n),
                Err(_) => tracing::warn!(value = %limit, "HAB_ISSUE_LIMIT is not a number"),
            }
        }
    }

    pub fn issue_limit(&self) -> usize {
        self.issue_limit.unwrap_or(DEFAULT_ISSUE_LIMIT)
    }

    /// The organizational tree: the configured file, else the built-in one
    ///
    /// Relative paths are resolved against the project root.
    pub fn org_tree(&self, project: Option<&Project>) -> HabResult<OrgTree> {
        match self.org_structure {
            Some(ref path) => {
                let path = match project {
                    Some(p) if path.is_relative() => p.root().join(path),
                    _ => path.clone(),
                };
                OrgTree::load(&path)
            }
            None => Ok(OrgTree::builtin()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_merge_prefers_later_layer() {
        let mut config: Config = serde_yml::from_str("default_format: json\nissue_limit: 5\n").unwrap();
        let project: Config = serde_yml::from_str("issue_limit: 50\n").unwrap();
        config.merge(project);
        assert_eq!(config.default_format.as_deref(), Some("json"));
        assert_eq!(config.issue_limit(), 50);
    }

    #[test]
    fn test_env_overrides_files() {
        let env: HashMap<&str, &str> = [("HAB_FORMAT", "csv"), ("HAB_ISSUE_LIMIT", "3")].into();
        let mut config = Config {
            default_format: Some("yaml".to_string()),
            ..Default::default()
        };
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.default_format.as_deref(), Some("csv"));
        assert_eq!(config.issue_limit(), 3);
    }

    #[test]
    fn test_bad_env_limit_is_ignored() {
        let mut config = Config::default();
        config.apply_env(|k| (k == "HAB_ISSUE_LIMIT").then(|| "lots".to_string()));
        assert_eq!(config.issue_limit(), DEFAULT_ISSUE_LIMIT);
    }

    #[test]
    fn test_org_tree_from_project_file() {
        let tmp = tempfile::tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        std::fs::write(
            tmp.path().join("org.yaml"),
            "divisions:\n  - name: North\n    services:\n      - name: Ops\n        teams: [Alpha]\n",
        )
        .unwrap();

        let config = Config {
            org_structure: Some(PathBuf::from("org.yaml")),
            ..Default::default()
        };
        let tree = config.org_tree(Some(&project)).unwrap();
        assert_eq!(tree.divisions[0].name, "North");

        assert_eq!(Config::default().org_tree(None).unwrap(), OrgTree::builtin());
    }

    #[test]
    fn test_missing_org_file_is_an_error() {
        let config = Config {
            org_structure: Some(PathBuf::from("/nonexistent/org.yaml")),
            ..Default::default()
        };
        assert!(config.org_tree(None).is_err());
    }
}
