//! Plans and plan sets.

use crate::types::{InvalidPlan, SecretKind};
use genesis_types::{GenesisError, Result, SecretType};
use std::collections::HashMap;

/// A single declarative secret request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Vault path relative to the environment prefix (`P` or `P:K`)
    pub path: String,
    /// What to build there
    pub kind: SecretKind,
}

impl Plan {
    /// Create a plan.
    pub fn new(path: impl Into<String>, kind: SecretKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Create an error plan carrying a parse or resolution diagnostic.
    pub fn invalid(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: SecretKind::Invalid(InvalidPlan::new(error)),
        }
    }

    /// Whether this plan carries a diagnostic instead of a buildable secret.
    pub fn is_error(&self) -> bool {
        self.kind.secret_type() == SecretType::Invalid
    }

    /// Human one-liner.
    pub fn describe(&self) -> String {
        format!("{} ({})", self.path, self.kind.describe())
    }
}

/// The ordered, resolved collection of plans for an environment.
///
/// Paths are unique; iteration follows the resolver's emitted order, where
/// every signing CA precedes its signees.
#[derive(Debug, Clone, Default)]
pub struct PlanSet {
    plans: Vec<Plan>,
    index: HashMap<String, usize>,
}

impl PlanSet {
    /// Build a set from resolver-ordered plans. Duplicate paths are a bug
    /// in the caller.
    pub fn from_plans(plans: Vec<Plan>) -> Result<Self> {
        let mut index = HashMap::with_capacity(plans.len());
        for (i, plan) in plans.iter().enumerate() {
            if index.insert(plan.path.clone(), i).is_some() {
                return Err(GenesisError::Bug(format!(
                    "Duplicate plan path '{}' in resolved set",
                    plan.path
                )));
            }
        }
        Ok(Self { plans, index })
    }

    /// Look up a plan by path.
    pub fn get(&self, path: &str) -> Option<&Plan> {
        self.index.get(path).map(|&i| &self.plans[i])
    }

    /// Whether a path is planned.
    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Iterate in resolved order.
    pub fn iter(&self) -> impl Iterator<Item = &Plan> {
        self.plans.iter()
    }

    /// All paths in resolved order.
    pub fn paths(&self) -> Vec<&str> {
        self.plans.iter().map(|p| p.path.as_str()).collect()
    }

    /// Number of plans.
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// A new set containing only the given paths, preserving this set's
    /// order.
    pub fn narrowed(&self, keep: &[&str]) -> Self {
        let keep: std::collections::HashSet<&str> = keep.iter().copied().collect();
        let plans: Vec<Plan> = self
            .plans
            .iter()
            .filter(|p| keep.contains(p.path.as_str()))
            .cloned()
            .collect();
        Self::from_plans(plans).expect("narrowing cannot introduce duplicates")
    }
}

impl IntoIterator for PlanSet {
    type Item = Plan;
    type IntoIter = std::vec::IntoIter<Plan>;

    fn into_iter(self) -> Self::IntoIter {
        self.plans.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RsaPlan;

    fn rsa_plan(path: &str) -> Plan {
        Plan::new(path, SecretKind::Rsa(RsaPlan { size: 2048, fixed: false }))
    }

    #[test]
    fn test_duplicate_paths_rejected() {
        let result = PlanSet::from_plans(vec![rsa_plan("a"), rsa_plan("a")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_narrowed_preserves_order() {
        let set =
            PlanSet::from_plans(vec![rsa_plan("a"), rsa_plan("b"), rsa_plan("c")]).unwrap();
        let narrowed = set.narrowed(&["c", "a"]);
        assert_eq!(narrowed.paths(), vec!["a", "c"]);
        assert!(narrowed.get("b").is_none());
    }
}
