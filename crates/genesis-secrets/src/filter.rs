//! Path-filter engine.
//!
//! A filter list is an implicit conjunction. Each element is either a
//! literal plan path (an explicit inclusion) or one or more `||`-joined
//! atoms (`key=value`, `key!=value`, `[!]/regex/[i]`); an element's result
//! is the union of its atoms. The final selection is the intersection of
//! all non-literal elements, unioned with the literal inclusions.

use crate::plan::PlanSet;
use genesis_types::{GenesisError, Result};
use regex::RegexBuilder;
use std::collections::HashSet;

enum Atom {
    Eq(String, String),
    Ne(String, String),
    Matches { regex: regex::Regex, negate: bool },
}

impl Atom {
    fn parse(raw: &str) -> Result<Self> {
        let (negate, body) = match raw.strip_prefix('!') {
            Some(rest) if rest.starts_with('/') => (true, rest),
            _ => (false, raw),
        };

        if let Some(rest) = body.strip_prefix('/') {
            let (pattern, insensitive) = match rest.strip_suffix("/i") {
                Some(p) => (p, true),
                None => match rest.strip_suffix('/') {
                    Some(p) => (p, false),
                    None => {
                        return Err(GenesisError::Filter(format!(
                            "unterminated regex filter '{}'",
                            raw
                        )))
                    }
                },
            };
            let regex = RegexBuilder::new(pattern)
                .case_insensitive(insensitive)
                .build()
                .map_err(|e| GenesisError::Filter(format!("bad regex '{}': {}", raw, e)))?;
            return Ok(Atom::Matches { regex, negate });
        }

        if let Some((key, value)) = body.split_once("!=") {
            if key.is_empty() {
                return Err(GenesisError::Filter(format!("missing key in '{}'", raw)));
            }
            return Ok(Atom::Ne(key.to_string(), value.to_string()));
        }
        if let Some((key, value)) = body.split_once('=') {
            if key.is_empty() {
                return Err(GenesisError::Filter(format!("missing key in '{}'", raw)));
            }
            return Ok(Atom::Eq(key.to_string(), value.to_string()));
        }

        Err(GenesisError::Filter(format!("unparseable filter atom '{}'", raw)))
    }

    fn matches(&self, plan: &crate::plan::Plan) -> bool {
        match self {
            Atom::Eq(key, value) => plan.kind.attribute(key).as_deref() == Some(value.as_str()),
            Atom::Ne(key, value) => plan.kind.attribute(key).as_deref() != Some(value.as_str()),
            Atom::Matches { regex, negate } => regex.is_match(&plan.path) != *negate,
        }
    }
}

enum Element {
    Literal(String),
    Clause(Vec<Atom>),
}

fn parse_element(set: &PlanSet, raw: &str) -> Result<Element> {
    let looks_like_atom =
        raw.contains("||") || raw.contains('=') || raw.starts_with('/') || raw.starts_with("!/");

    if !looks_like_atom {
        if set.contains(raw) {
            return Ok(Element::Literal(raw.to_string()));
        }
        return Err(GenesisError::Filter(format!("no such secret path '{}'", raw)));
    }

    let atoms = raw
        .split("||")
        .map(|part| Atom::parse(part.trim()))
        .collect::<Result<Vec<_>>>()?;
    Ok(Element::Clause(atoms))
}

/// Narrow a plan set by user-supplied filters, returning the selected paths
/// in the set's resolved order. An empty filter list selects everything.
pub fn apply_filters(set: &PlanSet, filters: &[String]) -> Result<Vec<String>> {
    if filters.is_empty() {
        return Ok(set.paths().into_iter().map(String::from).collect());
    }

    let mut literals: HashSet<String> = HashSet::new();
    let mut clause_result: Option<HashSet<String>> = None;

    for raw in filters {
        match parse_element(set, raw)? {
            Element::Literal(path) => {
                literals.insert(path);
            }
            Element::Clause(atoms) => {
                let matched: HashSet<String> = set
                    .iter()
                    .filter(|plan| atoms.iter().any(|a| a.matches(plan)))
                    .map(|plan| plan.path.clone())
                    .collect();
                clause_result = Some(match clause_result.take() {
                    None => matched,
                    Some(prev) => prev.intersection(&matched).cloned().collect(),
                });
            }
        }
    }

    let selected: HashSet<String> = match clause_result {
        Some(clauses) => clauses.union(&literals).cloned().collect(),
        None => literals,
    };

    Ok(set
        .paths()
        .into_iter()
        .filter(|p| selected.contains(*p))
        .map(String::from)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Plan;
    use crate::types::{RandomPlan, RsaPlan, SecretKind, SshPlan};

    fn sample_set() -> PlanSet {
        PlanSet::from_plans(vec![
            Plan::new("work/signing_key", SecretKind::Rsa(RsaPlan { size: 2048, fixed: true })),
            Plan::new("work/ssh_key", SecretKind::Ssh(SshPlan { size: 2048, fixed: false })),
            Plan::new(
                "crazy/thing:token",
                SecretKind::Random(RandomPlan {
                    size: 16,
                    format: None,
                    destination: None,
                    valid_chars: None,
                    fixed: false,
                }),
            ),
        ])
        .unwrap()
    }

    fn select(filters: &[&str]) -> Vec<String> {
        apply_filters(&sample_set(), &filters.iter().map(|s| s.to_string()).collect::<Vec<_>>())
            .unwrap()
    }

    #[test]
    fn test_no_filters_selects_all() {
        assert_eq!(select(&[]).len(), 3);
    }

    #[test]
    fn test_literal_inclusion() {
        assert_eq!(select(&["work/ssh_key"]), vec!["work/ssh_key"]);
    }

    #[test]
    fn test_unknown_literal_is_bad_filter() {
        let err = apply_filters(&sample_set(), &["nope/nothing".to_string()]).unwrap_err();
        assert!(matches!(err, GenesisError::Filter(_)));
    }

    #[test]
    fn test_attribute_equality_and_negation() {
        assert_eq!(select(&["type=rsa"]), vec!["work/signing_key"]);
        assert_eq!(
            select(&["type!=random"]),
            vec!["work/signing_key", "work/ssh_key"]
        );
        assert_eq!(select(&["fixed=true"]), vec!["work/signing_key"]);
    }

    #[test]
    fn test_regex_atoms() {
        assert_eq!(
            select(&["/^work//"]),
            vec!["work/signing_key", "work/ssh_key"]
        );
        assert_eq!(select(&["!/^work//"]), vec!["crazy/thing:token"]);
        assert_eq!(select(&["/^WORK//i"]).len(), 2);
        assert!(apply_filters(&sample_set(), &["/unterminated".to_string()]).is_err());
    }

    #[test]
    fn test_disjunction_within_element() {
        assert_eq!(
            select(&["type=rsa||type=random"]),
            vec!["work/signing_key", "crazy/thing:token"]
        );
    }

    #[test]
    fn test_conjunction_across_elements() {
        // size=2048 matches rsa+ssh; intersect with type=ssh
        assert_eq!(select(&["size=2048", "type=ssh"]), vec!["work/ssh_key"]);
    }

    #[test]
    fn test_filter_algebra_matches_set_operations() {
        // F1 AND (F2 OR F3) as two elements
        let got = select(&["size=2048", "type=ssh||type=rsa"]);

        let set = sample_set();
        let f1: HashSet<String> = apply_filters(&set, &["size=2048".to_string()])
            .unwrap()
            .into_iter()
            .collect();
        let f2: HashSet<String> = apply_filters(&set, &["type=ssh".to_string()])
            .unwrap()
            .into_iter()
            .collect();
        let f3: HashSet<String> = apply_filters(&set, &["type=rsa".to_string()])
            .unwrap()
            .into_iter()
            .collect();
        let expected: HashSet<String> =
            f1.intersection(&f2.union(&f3).cloned().collect()).cloned().collect();

        assert_eq!(got.iter().cloned().collect::<HashSet<_>>(), expected);
    }

    #[test]
    fn test_literals_union_with_clauses() {
        let got = select(&["type=rsa", "crazy/thing:token"]);
        assert_eq!(got, vec!["work/signing_key", "crazy/thing:token"]);
    }
}
