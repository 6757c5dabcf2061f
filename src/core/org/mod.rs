//! Organizational hierarchy: division -> service -> team
//!
//! The tree is immutable configuration. It is built once per command (either
//! the built-in tree or a YAML file named in config) and passed explicitly to
//! the [`Resolver`] and the store.

mod resolver;

pub use resolver::{ResolveFailure, Resolver};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use crate::core::error::{HabError, HabResult};
use crate::core::text::normalize;

/// Canonical (division, service, team) names of one hierarchy leaf
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub division: String,
    pub service: String,
    pub team: String,
}

impl Placement {
    pub fn new(division: &str, service: &str, team: &str) -> Self {
        Self {
            division: division.to_string(),
            service: service.to_string(),
            team: team.to_string(),
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.division, self.service, self.team)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceNode {
    pub name: String,
    /// Fallback hints, matched as substrings of the normalized raw text
    #[serde(default)]
    pub keywords: Vec<String>,
    pub teams: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivisionNode {
    pub name: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub services: Vec<ServiceNode>,
}

impl DivisionNode {
    pub fn service(&self, name: &str) -> Option<&ServiceNode> {
        self.services.iter().find(|s| s.name == name)
    }
}

impl ServiceNode {
    pub fn has_team(&self, name: &str) -> bool {
        self.teams.iter().any(|t| t == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgTree {
    pub divisions: Vec<DivisionNode>,
}

impl OrgTree {
    /// Parse and validate a tree from YAML
    pub fn from_yaml(source: &str) -> HabResult<Self> {
        let tree: OrgTree =
            serde_yml::from_str(source).map_err(|e| HabError::Org(e.to_string()))?;
        tree.validate()?;
        Ok(tree)
    }

    pub fn load(path: &Path) -> HabResult<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| HabError::Org(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_yaml(&source)
    }

    /// Reject empty levels and duplicate names under one parent
    pub fn validate(&self) -> HabResult<()> {
        if self.divisions.is_empty() {
            return Err(HabError::Org("the tree has no divisions".to_string()));
        }
        check_unique("division", self.divisions.iter().map(|d| d.name.as_str()))?;
        for division in &self.divisions {
            if division.services.is_empty() {
                return Err(HabError::Org(format!("division '{}' has no services", division.name)));
            }
            check_unique("service", division.services.iter().map(|s| s.name.as_str()))?;
            for service in &division.services {
                if service.teams.is_empty() {
                    return Err(HabError::Org(format!("service '{}' has no teams", service.name)));
                }
                check_unique("team", service.teams.iter().map(String::as_str))?;
            }
        }
        Ok(())
    }

    pub fn division(&self, name: &str) -> Option<&DivisionNode> {
        self.divisions.iter().find(|d| d.name == name)
    }

    /// True when the placement names an existing leaf with a consistent chain
    pub fn contains(&self, placement: &Placement) -> bool {
        self.division(&placement.division)
            .and_then(|d| d.service(&placement.service))
            .is_some_and(|s| s.has_team(&placement.team))
    }

    /// Every leaf in declaration order
    pub fn placements(&self) -> Vec<Placement> {
        let mut out = Vec::new();
        for division in &self.divisions {
            for service in &division.services {
                for team in &service.teams {
                    out.push(Placement::new(&division.name, &service.name, team));
                }
            }
        }
        out
    }

    /// The built-in tree: the three "Division Exploitation" divisions
    pub fn builtin() -> Self {
        Self {
            divisions: vec![
                builtin_division(
                    "Casa",
                    "casa",
                    &["Equipe Conduite Casa", "Equipe Conduite Settat", "Equipe TST Postes Casa"],
                    &[
                        "Equipe Maintenance Lignes Casa",
                        "Equipe Maintenance Lignes Settat",
                        "Equipe Maintenance Postes Casa",
                        "Equipe Maintenance Postes Settat",
                        "Equipe Contrôle Commande et Télécom Casa",
                        "Equipe Contrôle Commande et Télécom Settat",
                        "Equipe TST Lignes Casa",
                    ],
                ),
                builtin_division(
                    "El Jadida",
                    "jadida",
                    &[
                        "Equipe Conduite El Jadida",
                        "Equipe Conduite Safi",
                        "Equipe Conduite Bouguedra",
                        "Equipe TST Postes El Jadida",
                    ],
                    &[
                        "Equipe Maintenance Lignes El Jadida",
                        "Equipe Maintenance Lignes Safi",
                        "Equipe Maintenance Postes El Jadida",
                        "Equipe Maintenance Postes Safi",
                        "Equipe Maintenance Postes Bouguedra",
                        "Equipe Contrôle Commande et Télécom El Jadida",
                        "Equipe Contrôle Commande et Télécom Safi",
                        "Equipe TST Lignes El Jadida",
                    ],
                ),
                builtin_division(
                    "Afourer",
                    "afourer",
                    &[
                        "Equipe Conduite Afourer",
                        "Equipe Conduite Kalaa",
                        "Equipe Conduite Tadla",
                        "Equipe Conduite Khouribga",
                        "Equipe Conduite Benguerir",
                        "Equipe TST Postes Afourer",
                    ],
                    &[
                        "Equipe Maintenance Lignes Afourer",
                        "Equipe Maintenance Lignes Kalaa",
                        "Equipe Maintenance Lignes Tadla",
                        "Equipe Maintenance Lignes Khouribga",
                        "Equipe Maintenance Lignes Benguerir",
                        "Equipe Maintenance Postes Afourer",
                        "Equipe Maintenance Postes Kalaa",
                        "Equipe Maintenance Postes Tadla",
                        "Equipe Maintenance Postes Khouribga",
                        "Equipe Maintenance Postes Benguerir",
                        "Equipe Contrôle Commande et Télécom Afourer",
                        "Equipe Contrôle Commande et Télécom Kalaa",
                        "Equipe Contrôle Commande et Télécom Tadla",
                        "Equipe Contrôle Commande et Télécom Khouribga",
                        "Equipe Contrôle Commande et Télécom Benguerir",
                        "Equipe TST Lignes Afourer",
                    ],
                ),
            ],
        }
    }
}

impl Default for OrgTree {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_division(site: &str, keyword: &str, operations: &[&str], maintenance: &[&str]) -> DivisionNode {
    let teams = |names: &[&str]| names.iter().map(|t| t.to_string()).collect::<Vec<_>>();
    DivisionNode {
        name: format!("Division Exploitation {}", site),
        keywords: vec![keyword.to_string()],
        services: vec![
            ServiceNode {
                name: format!("Service Conduite et Exploitation {}", site),
                keywords: vec!["conduite".to_string(), "exploitation".to_string()],
                teams: teams(operations),
            },
            ServiceNode {
                name: format!("Service Maintenance {}", site),
                keywords: vec!["maintenance".to_string()],
                teams: teams(maintenance),
            },
        ],
    }
}

fn check_unique<'a>(level: &str, names: impl Iterator<Item = &'a str>) -> HabResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        let key = normalize(name);
        if key.is_empty() {
            return Err(HabError::Org(format!("empty {} name", level)));
        }
        if !seen.insert(key) {
            return Err(HabError::Org(format!("duplicate {} name '{}'", level, name)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tree_is_valid() {
        let tree = OrgTree::builtin();
        tree.validate().unwrap();
        assert_eq!(tree.divisions.len(), 3);
        assert_eq!(tree.placements().len(), 10 + 12 + 22);
    }

    #[test]
    fn test_contains_checks_chain() {
        let tree = OrgTree::builtin();
        assert!(tree.contains(&Placement::new(
            "Division Exploitation Casa",
            "Service Maintenance Casa",
            "Equipe TST Lignes Casa"
        )));
        // Team exists, but under another division's service
        assert!(!tree.contains(&Placement::new(
            "Division Exploitation Casa",
            "Service Maintenance Casa",
            "Equipe TST Lignes Afourer"
        )));
    }

    #[test]
    fn test_tree_from_yaml() {
        let yaml = r#"
divisions:
  - name: North
    keywords: [nord]
    services:
      - name: Ops North
        teams: [Alpha, Beta]
"#;
        let tree = OrgTree::from_yaml(yaml).unwrap();
        assert_eq!(tree.divisions[0].keywords, vec!["nord"]);
        assert!(tree.divisions[0].services[0].keywords.is_empty());
    }

    #[test]
    fn test_tree_rejects_duplicates() {
        let yaml = r#"
divisions:
  - name: North
    services:
      - name: Ops
        teams: [Alpha, "alpha "]
"#;
        assert!(matches!(OrgTree::from_yaml(yaml), Err(HabError::Org(_))));
        assert!(OrgTree::from_yaml("divisions: []").is_err());
    }
}
