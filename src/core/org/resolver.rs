//! Fuzzy resolution of free-text organization names onto the canonical tree
//!
//! Each level tries an exact normalized match first, then a fallback:
//! - division: keyword hint contained in the raw text
//! - service: keyword hint contained in the raw text, within the division
//! - team: substring containment in either direction, within the service
//!
//! Fallbacks take the first candidate in declaration order. That is
//! deterministic, not "best match": "Equipe Conduite" resolves to whichever
//! conduite team is declared first.

use std::fmt;

use super::{DivisionNode, OrgTree, Placement, ServiceNode};
use crate::core::text::normalize;

/// Level at which hierarchical resolution stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveFailure {
    Division,
    Service,
    Team,
}

impl fmt::Display for ResolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveFailure::Division => write!(f, "division not matched"),
            ResolveFailure::Service => write!(f, "service not matched"),
            ResolveFailure::Team => write!(f, "team not matched"),
        }
    }
}

pub struct Resolver<'a> {
    tree: &'a OrgTree,
}

impl<'a> Resolver<'a> {
    pub fn new(tree: &'a OrgTree) -> Self {
        Self { tree }
    }

    pub fn resolve_division(&self, raw: &str) -> Option<&'a DivisionNode> {
        let target = normalize(raw);
        if target.is_empty() {
            return None;
        }

        self.tree
            .divisions
            .iter()
            .find(|d| normalize(&d.name) == target)
            .or_else(|| {
                self.tree
                    .divisions
                    .iter()
                    .find(|d| contains_keyword(&target, &d.keywords))
            })
    }

    pub fn resolve_service(&self, raw: &str, division: &'a DivisionNode) -> Option<&'a ServiceNode> {
        let target = normalize(raw);
        if target.is_empty() {
            return None;
        }

        division
            .services
            .iter()
            .find(|s| normalize(&s.name) == target)
            .or_else(|| {
                division
                    .services
                    .iter()
                    .find(|s| contains_keyword(&target, &s.keywords))
            })
    }

    pub fn resolve_team(&self, raw: &str, service: &'a ServiceNode) -> Option<&'a str> {
        let target = normalize(raw);
        if target.is_empty() {
            return None;
        }

        service
            .teams
            .iter()
            .find(|t| normalize(t) == target)
            .or_else(|| {
                service.teams.iter().find(|t| {
                    let name = normalize(t);
                    name.contains(&target) || target.contains(&name)
                })
            })
            .map(String::as_str)
    }

    /// Resolve all three levels, short-circuiting on the first failure
    pub fn resolve(&self, division: &str, service: &str, team: &str) -> Result<Placement, ResolveFailure> {
        let div = self
            .resolve_division(division)
            .ok_or(ResolveFailure::Division)?;
        let svc = self
            .resolve_service(service, div)
            .ok_or(ResolveFailure::Service)?;
        let team = self.resolve_team(team, svc).ok_or(ResolveFailure::Team)?;

        Ok(Placement::new(&div.name, &svc.name, team))
    }

    /// Exact normalized lookup only, for direct entry where guessing is unwanted
    pub fn resolve_exact(&self, division: &str, service: &str, team: &str) -> Result<Placement, ResolveFailure> {
        let (division, service, team) = (normalize(division), normalize(service), normalize(team));
        let div = self
            .tree
            .divisions
            .iter()
            .find(|d| normalize(&d.name) == division)
            .ok_or(ResolveFailure::Division)?;
        let svc = div
            .services
            .iter()
            .find(|s| normalize(&s.name) == service)
            .ok_or(ResolveFailure::Service)?;
        let team = svc
            .teams
            .iter()
            .find(|t| normalize(t) == team)
            .ok_or(ResolveFailure::Team)?;

        Ok(Placement::new(&div.name, &svc.name, team))
    }
}

fn contains_keyword(target: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| {
        let k = normalize(k);
        !k.is_empty() && target.contains(&k)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(div: &str, svc: &str, team: &str) -> Result<Placement, ResolveFailure> {
        let tree = OrgTree::builtin();
        Resolver::new(&tree).resolve(div, svc, team)
    }

    #[test]
    fn test_exact_match_ignores_case_and_accents() {
        let p = resolve(
            "division exploitation el jadida",
            "SERVICE MAINTENANCE EL JADIDA",
            "equipe controle commande et telecom safi",
        )
        .unwrap();
        assert_eq!(p.division, "Division Exploitation El Jadida");
        assert_eq!(p.team, "Equipe Contrôle Commande et Télécom Safi");
    }

    #[test]
    fn test_division_keyword_fallback() {
        let tree = OrgTree::builtin();
        let r = Resolver::new(&tree);
        assert_eq!(r.resolve_division("DE Casa").unwrap().name, "Division Exploitation Casa");
        assert_eq!(r.resolve_division("Jadida").unwrap().name, "Division Exploitation El Jadida");
        assert!(r.resolve_division("Division Rabat").is_none());
    }

    #[test]
    fn test_service_keyword_fallback() {
        let tree = OrgTree::builtin();
        let r = Resolver::new(&tree);
        let div = r.resolve_division("afourer").unwrap();
        assert_eq!(r.resolve_service("Exploitation", div).unwrap().name, "Service Conduite et Exploitation Afourer");
        assert_eq!(r.resolve_service("maint.", div).map(|s| s.name.as_str()), None);
        assert_eq!(r.resolve_service("SCE maintenance", div).unwrap().name, "Service Maintenance Afourer");
    }

    #[test]
    fn test_team_containment_both_directions() {
        let tree = OrgTree::builtin();
        let r = Resolver::new(&tree);
        let div = r.resolve_division("casa").unwrap();
        let svc = r.resolve_service("maintenance", div).unwrap();
        // raw contained in canonical
        assert_eq!(r.resolve_team("TST Lignes", svc), Some("Equipe TST Lignes Casa"));
        // canonical contained in raw
        assert_eq!(
            r.resolve_team("Equipe TST Lignes Casa (ex-Ain Sebaa)", svc),
            Some("Equipe TST Lignes Casa")
        );
    }

    #[test]
    fn test_team_tie_break_is_declaration_order() {
        let tree = OrgTree::builtin();
        let r = Resolver::new(&tree);
        let div = r.resolve_division("casa").unwrap();
        let svc = r.resolve_service("maintenance", div).unwrap();
        assert_eq!(r.resolve_team("Maintenance Lignes", svc), Some("Equipe Maintenance Lignes Casa"));
    }

    #[test]
    fn test_resolution_is_total() {
        for raw in ["", "   ", "\t", "???", "zzzz"] {
            assert_eq!(resolve(raw, raw, raw), Err(ResolveFailure::Division));
        }
    }

    #[test]
    fn test_short_circuit_reports_first_failing_level() {
        assert_eq!(resolve("casa", "", "x"), Err(ResolveFailure::Service));
        assert_eq!(resolve("casa", "conduite", "nowhere"), Err(ResolveFailure::Team));
    }

    #[test]
    fn test_alternate_tree() {
        let tree = OrgTree::from_yaml(
            r#"
divisions:
  - name: North
    keywords: [nord]
    services:
      - name: Ops North
        keywords: [ops]
        teams: [Alpha Crew, Beta Crew]
"#,
        )
        .unwrap();
        let p = Resolver::new(&tree).resolve("Region Nord", "ops", "beta").unwrap();
        assert_eq!(p, Placement::new("North", "Ops North", "Beta Crew"));
    }

    #[test]
    fn test_exact_lookup_refuses_fallbacks() {
        let tree = OrgTree::builtin();
        let r = Resolver::new(&tree);
        assert_eq!(r.resolve_exact("casa", "maintenance", "tst"), Err(ResolveFailure::Division));
        assert!(r
            .resolve_exact(
                "Division Exploitation Casa",
                "Service Maintenance Casa",
                "equipe tst lignes casa"
            )
            .is_ok());
    }
}
