//! Dependency resolution for x509 plans.
//!
//! Converts parsed plans into a build order obeying signer→signee edges:
//! CA inference per base path, default-signer assignment, topological
//! emission, cycle and orphan detection. Non-x509 plans follow the x509
//! sequence in lexicographic path order.

use crate::plan::{Plan, PlanSet};
use crate::types::SecretKind;
use genesis_types::Result;
use std::collections::{HashMap, HashSet};

/// Knobs for a resolution pass.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Mount-absolute path of a shared root CA that signs otherwise
    /// unsigned top-level certificates
    pub root_ca_path: Option<String>,
    /// Run per-kind plan sanity checks, converting failures to error plans
    pub validate: bool,
}

const ERR_AMBIGUOUS: &str = "Ambiguous or missing signing CA";
const ERR_CYCLE: &str = "Cyclical CA signage detected";
const ERR_ORPHAN: &str = "Could not find associated signing CA";

/// Resolve parsed plans into an ordered [`PlanSet`].
///
/// Every x509 plan is emitted exactly once, each signer strictly before its
/// signees; a self-signed CA precedes its own dependents. Later
/// declarations of the same path (a feature overriding `base`) replace
/// earlier ones.
pub fn resolve(plans: Vec<Plan>, opts: &ResolveOptions) -> Result<PlanSet> {
    // Feature-ordered dedup: last declaration of a path wins
    let mut order: Vec<String> = Vec::new();
    let mut by_path: HashMap<String, Plan> = HashMap::new();
    for plan in plans {
        if !by_path.contains_key(&plan.path) {
            order.push(plan.path.clone());
        } else {
            tracing::debug!(path = %plan.path, "secret plan redefined by a later feature");
        }
        by_path.insert(plan.path.clone(), plan);
    }

    let x509_paths: Vec<String> = order
        .iter()
        .filter(|p| matches!(by_path[*p].kind, SecretKind::X509(_)))
        .cloned()
        .collect();

    infer_base_cas(&x509_paths, &mut by_path);
    assign_default_signers(&x509_paths, &mut by_path, opts.root_ca_path.as_deref());
    normalize_self_references(&x509_paths, &mut by_path);

    let emitted = emit_in_signing_order(&x509_paths, &mut by_path);

    // Orphans: x509 plans never reached by the emission walk
    for path in &x509_paths {
        if !emitted.contains(path) && matches!(by_path[path].kind, SecretKind::X509(_)) {
            invalidate(&mut by_path, path, ERR_ORPHAN);
        }
    }

    let mut sequence: Vec<Plan> = emitted
        .iter()
        .map(|p| by_path.remove(p).expect("emitted plan exists"))
        .collect();

    let remaining_paths: Vec<String> = order
        .iter()
        .filter(|p| by_path.contains_key(*p))
        .cloned()
        .collect();
    let mut rest: Vec<Plan> = remaining_paths
        .iter()
        .map(|p| by_path.remove(p).expect("remaining plan exists"))
        .collect();
    rest.sort_by(|a, b| a.path.cmp(&b.path));
    sequence.extend(rest);

    if opts.validate {
        for plan in &mut sequence {
            if let Err(e) = plan.kind.validate_plan(&plan.path) {
                plan.kind = SecretKind::Invalid(crate::types::InvalidPlan::new(e.to_string()));
            }
        }
    }

    PlanSet::from_plans(sequence)
}

fn invalidate(by_path: &mut HashMap<String, Plan>, path: &str, error: &str) {
    if let Some(plan) = by_path.get_mut(path) {
        plan.kind = SecretKind::Invalid(crate::types::InvalidPlan::new(error));
    }
}

fn x509_of<'a>(by_path: &'a HashMap<String, Plan>, path: &str) -> Option<&'a crate::types::X509Plan> {
    match &by_path.get(path)?.kind {
        SecretKind::X509(x) => Some(x),
        _ => None,
    }
}

fn with_x509<F: FnOnce(&mut crate::types::X509Plan)>(
    by_path: &mut HashMap<String, Plan>,
    path: &str,
    f: F,
) {
    if let Some(plan) = by_path.get_mut(path) {
        if let SecretKind::X509(x) = &mut plan.kind {
            f(x);
        }
    }
}

/// For each base path, find the CA that signs its unsigned leaves.
///
/// Exactly one candidate (a leaf named `ca`, or one flagged `is_ca`) wins
/// outright; with several, a literal `<base>/ca` breaks the tie; otherwise
/// every unsigned leaf in the group is marked ambiguous. A group with no
/// candidates has top-level leaves handled by the default-signer pass.
fn infer_base_cas(x509_paths: &[String], by_path: &mut HashMap<String, Plan>) {
    let mut groups: HashMap<String, Vec<String>> = HashMap::new();
    let mut group_order: Vec<String> = Vec::new();
    for path in x509_paths {
        let base = x509_of(by_path, path).expect("x509 plan").base_path.clone();
        if !groups.contains_key(&base) {
            group_order.push(base.clone());
        }
        groups.entry(base).or_default().push(path.clone());
    }

    for base in group_order {
        let members = &groups[&base];
        let candidates: Vec<String> = members
            .iter()
            .filter(|p| {
                let x = x509_of(by_path, p).expect("x509 plan");
                x.is_ca || **p == format!("{}/ca", base)
            })
            .cloned()
            .collect();

        let winner = match candidates.len() {
            0 => continue,
            1 => Some(candidates[0].clone()),
            _ => {
                let default = format!("{}/ca", base);
                if candidates.contains(&default) {
                    Some(default)
                } else {
                    None
                }
            }
        };

        match winner {
            Some(ca_path) => {
                with_x509(by_path, &ca_path, |x| x.is_ca = true);
                for member in members {
                    if member == &ca_path {
                        continue;
                    }
                    let unsigned =
                        x509_of(by_path, member).map(|x| x.signed_by.is_none()).unwrap_or(false);
                    if unsigned {
                        with_x509(by_path, member, |x| {
                            x.signed_by = Some(ca_path.clone());
                        });
                    }
                }
            }
            None => {
                for member in members {
                    let unsigned =
                        x509_of(by_path, member).map(|x| x.signed_by.is_none()).unwrap_or(false);
                    if unsigned {
                        invalidate(by_path, member, ERR_AMBIGUOUS);
                    }
                }
            }
        }
    }
}

/// Truly-unsigned plans (base CAs and leaves in CA-less groups) bind to the
/// root CA when one is configured, otherwise become self-signed (level 1).
fn assign_default_signers(
    x509_paths: &[String],
    by_path: &mut HashMap<String, Plan>,
    root_ca_path: Option<&str>,
) {
    for path in x509_paths {
        let unsigned = x509_of(by_path, path).map(|x| x.signed_by.is_none()).unwrap_or(false);
        if !unsigned {
            continue;
        }
        match root_ca_path {
            Some(root) => with_x509(by_path, path, |x| {
                x.signed_by = Some(root.to_string());
                x.signed_by_abs_path = true;
            }),
            None => with_x509(by_path, path, |x| x.self_signed = 1),
        }
    }
}

/// An explicit self-reference in `signed_by` means "definitely self-signed":
/// promote to a CA at level 2 and clear the edge so it roots its own group.
fn normalize_self_references(x509_paths: &[String], by_path: &mut HashMap<String, Plan>) {
    for path in x509_paths {
        let self_ref = x509_of(by_path, path)
            .map(|x| x.signed_by.as_deref() == Some(path.as_str()))
            .unwrap_or(false);
        if self_ref {
            with_x509(by_path, path, |x| {
                x.self_signed = 2;
                x.is_ca = true;
                x.signed_by = None;
            });
        }
    }
}

/// Group plans by signer and emit depth-first from the root set (plans with
/// no in-set signer). Re-encountering an emitted plan marks it cyclical.
fn emit_in_signing_order(
    x509_paths: &[String],
    by_path: &mut HashMap<String, Plan>,
) -> Vec<String> {
    let mut by_signer: HashMap<String, Vec<String>> = HashMap::new();
    for path in x509_paths {
        let Some(x) = x509_of(by_path, path) else {
            continue;
        };
        let signer = match (&x.signed_by, x.signed_by_abs_path) {
            (None, _) => String::new(),
            // An absolute signer lives outside this plan set
            (Some(_), true) => String::new(),
            (Some(s), false) => s.clone(),
        };
        by_signer.entry(signer).or_default().push(path.clone());
    }

    fn emit(
        path: &str,
        by_signer: &mut HashMap<String, Vec<String>>,
        emitted: &mut HashSet<String>,
        order: &mut Vec<String>,
        cyclical: &mut Vec<String>,
    ) {
        if !emitted.insert(path.to_string()) {
            cyclical.push(path.to_string());
            return;
        }
        order.push(path.to_string());
        if let Some(dependents) = by_signer.remove(path) {
            for dependent in dependents {
                emit(&dependent, by_signer, emitted, order, cyclical);
            }
        }
    }

    let mut emitted = HashSet::new();
    let mut order = Vec::new();
    let mut cyclical = Vec::new();

    for root in by_signer.remove("").unwrap_or_default() {
        emit(&root, &mut by_signer, &mut emitted, &mut order, &mut cyclical);
    }

    for path in cyclical {
        invalidate(by_path, &path, ERR_CYCLE);
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_kit_secrets;
    use crate::types::{InvalidPlan, RsaPlan};
    use genesis_kit::KitMetadata;

    fn plans_from(yaml: &str) -> Vec<Plan> {
        let kit =
            KitMetadata::from_yaml(&format!("name: t\nversion: 0.0.1\n{}", yaml)).unwrap();
        parse_kit_secrets(&kit.secrets, &["base".to_string()])
    }

    fn x509<'a>(set: &'a PlanSet, path: &str) -> &'a crate::types::X509Plan {
        match &set.get(path).expect("plan exists").kind {
            SecretKind::X509(x) => x,
            other => panic!("expected x509 at {}, got {:?}", path, other),
        }
    }

    #[test]
    fn test_ca_inference_and_order() {
        let plans = plans_from(
            "certificates:\n  base:\n    my-cert:\n      ca: { is_ca: true }\n      server: { names: [srv.example] }\n",
        );
        let set = resolve(plans, &ResolveOptions::default()).unwrap();

        assert_eq!(set.paths(), vec!["my-cert/ca", "my-cert/server"]);
        assert_eq!(x509(&set, "my-cert/ca").self_signed, 1);
        assert_eq!(
            x509(&set, "my-cert/server").signed_by.as_deref(),
            Some("my-cert/ca")
        );
    }

    #[test]
    fn test_leaf_named_ca_is_promoted() {
        let plans = plans_from(
            "certificates:\n  base:\n    things:\n      ca: {}\n      leaf: { names: [leaf.example] }\n",
        );
        let set = resolve(plans, &ResolveOptions::default()).unwrap();
        assert!(x509(&set, "things/ca").is_ca);
        assert_eq!(
            x509(&set, "things/leaf").signed_by.as_deref(),
            Some("things/ca")
        );
    }

    #[test]
    fn test_ambiguous_cas_error_unsigned_leaves() {
        let plans = plans_from(
            "certificates:\n  base:\n    things:\n      first: { is_ca: true }\n      second: { is_ca: true }\n      leaf: { names: [leaf.example] }\n",
        );
        let set = resolve(plans, &ResolveOptions::default()).unwrap();

        for path in ["things/first", "things/second", "things/leaf"] {
            match &set.get(path).unwrap().kind {
                SecretKind::Invalid(InvalidPlan { error }) => {
                    assert_eq!(error, ERR_AMBIGUOUS)
                }
                other => panic!("expected error plan at {}, got {:?}", path, other),
            }
        }
    }

    #[test]
    fn test_literal_ca_leaf_breaks_ties() {
        let plans = plans_from(
            "certificates:\n  base:\n    things:\n      ca: { is_ca: true }\n      other: { is_ca: true }\n      leaf: { names: [leaf.example] }\n",
        );
        let set = resolve(plans, &ResolveOptions::default()).unwrap();
        assert_eq!(
            x509(&set, "things/leaf").signed_by.as_deref(),
            Some("things/ca")
        );
        // the losing candidate is an unsigned leaf like any other
        assert_eq!(
            x509(&set, "things/other").signed_by.as_deref(),
            Some("things/ca")
        );
    }

    #[test]
    fn test_root_ca_binds_top_level_certs() {
        let plans = plans_from(
            "certificates:\n  base:\n    my-cert:\n      ca: { is_ca: true }\n      server: { names: [srv.example] }\n",
        );
        let opts = ResolveOptions {
            root_ca_path: Some("common/ca".to_string()),
            validate: false,
        };
        let set = resolve(plans, &opts).unwrap();

        let ca = x509(&set, "my-cert/ca");
        assert_eq!(ca.signed_by.as_deref(), Some("common/ca"));
        assert!(ca.signed_by_abs_path);
        assert_eq!(ca.self_signed, 0);
        // leaves still chain to their base CA, not the root
        assert_eq!(
            x509(&set, "my-cert/server").signed_by.as_deref(),
            Some("my-cert/ca")
        );
    }

    #[test]
    fn test_explicit_self_reference_is_level_two() {
        let plans = plans_from(
            "certificates:\n  base:\n    loop:\n      ca: { signed_by: loop/ca }\n      leaf: { names: [leaf.example] }\n",
        );
        let set = resolve(plans, &ResolveOptions::default()).unwrap();

        let ca = x509(&set, "loop/ca");
        assert_eq!(ca.self_signed, 2);
        assert!(ca.is_ca);
        assert_eq!(ca.signed_by, None);
        assert_eq!(set.paths()[0], "loop/ca");
    }

    #[test]
    fn test_chained_cas_emit_signers_first() {
        let plans = plans_from(
            "certificates:\n  base:\n    top:\n      ca: { is_ca: true }\n    mid:\n      ca: { is_ca: true, signed_by: top/ca }\n      leaf: { names: [leaf.example] }\n",
        );
        let set = resolve(plans, &ResolveOptions::default()).unwrap();
        let paths = set.paths();
        let pos = |p: &str| paths.iter().position(|x| *x == p).unwrap();

        assert!(pos("top/ca") < pos("mid/ca"));
        assert!(pos("mid/ca") < pos("mid/leaf"));
    }

    #[test]
    fn test_missing_signer_is_orphan_error() {
        let plans = plans_from(
            "certificates:\n  base:\n    things:\n      leaf: { names: [leaf.example], signed_by: nowhere/ca }\n",
        );
        let set = resolve(plans, &ResolveOptions::default()).unwrap();
        match &set.get("things/leaf").unwrap().kind {
            SecretKind::Invalid(InvalidPlan { error }) => assert_eq!(error, ERR_ORPHAN),
            other => panic!("expected orphan error, got {:?}", other),
        }
    }

    #[test]
    fn test_mutual_cycle_is_unreachable() {
        let plans = plans_from(
            "certificates:\n  base:\n    a:\n      ca: { is_ca: true, signed_by: b/ca }\n    b:\n      ca: { is_ca: true, signed_by: a/ca }\n",
        );
        let set = resolve(plans, &ResolveOptions::default()).unwrap();
        assert!(set.iter().all(|p| p.is_error()));
    }

    #[test]
    fn test_non_x509_append_lexicographically() {
        let mut plans = plans_from(
            "certificates:\n  base:\n    my-cert:\n      ca: { is_ca: true }\n",
        );
        plans.push(Plan::new(
            "zz/key",
            SecretKind::Rsa(RsaPlan { size: 2048, fixed: false }),
        ));
        plans.push(Plan::new(
            "aa/key",
            SecretKind::Rsa(RsaPlan { size: 2048, fixed: false }),
        ));

        let set = resolve(plans, &ResolveOptions::default()).unwrap();
        assert_eq!(set.paths(), vec!["my-cert/ca", "aa/key", "zz/key"]);
    }

    #[test]
    fn test_validate_converts_bad_plans() {
        let mut plans = plans_from("credentials:\n  base:\n    small/key: rsa 512\n");
        plans.push(Plan::new(
            "ok/key",
            SecretKind::Rsa(RsaPlan { size: 2048, fixed: false }),
        ));

        let opts = ResolveOptions { root_ca_path: None, validate: true };
        let set = resolve(plans, &opts).unwrap();
        assert!(set.get("small/key").unwrap().is_error());
        assert!(!set.get("ok/key").unwrap().is_error());
    }
}
