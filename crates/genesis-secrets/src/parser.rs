//! Plan parsing from kit metadata.
//!
//! Walks the three feature-keyed secret groupings of the (already merged)
//! kit metadata and produces one plan per declared secret. Parse failures
//! become error plans carrying a diagnostic; they are never dropped and
//! never abort the walk.

use crate::plan::Plan;
use crate::types::{
    DhParamsPlan, ProvidedPlan, RandomPlan, RsaPlan, SecretKind, SshPlan, UuidPlan, X509Plan,
};
use genesis_kit::SecretsMetadata;
use genesis_types::{GenesisError, Result, UuidVersion};
use serde_yaml::Value;

/// Parse every secret declared by the enabled features.
///
/// Features are walked in the order given (`base` first by convention);
/// within a feature, the groupings walk in declaration order. Each plan's
/// path is its map key, so plans are self-contained from here on.
pub fn parse_kit_secrets(secrets: &SecretsMetadata, features: &[String]) -> Vec<Plan> {
    let mut plans = Vec::new();

    for feature in features {
        if let Some(block) = SecretsMetadata::feature_block(&secrets.certificates, feature) {
            parse_certificates(feature, block, &mut plans);
        }
        if let Some(block) = SecretsMetadata::feature_block(&secrets.credentials, feature) {
            parse_credentials(feature, block, &mut plans);
        }
        if let Some(block) = SecretsMetadata::feature_block(&secrets.provided, feature) {
            parse_provided(feature, block, &mut plans);
        }
    }

    plans
}

fn path_has_colon(path: &str) -> bool {
    path.contains(':')
}

fn parse_certificates(feature: &str, block: &Value, plans: &mut Vec<Plan>) {
    let Some(bases) = block.as_mapping() else {
        plans.push(Plan::invalid(
            format!("certificates.{}", feature),
            format!("certificates for feature '{}' must be a map of base paths", feature),
        ));
        return;
    };

    for (base, leaves) in bases {
        let Some(base) = base.as_str() else {
            plans.push(Plan::invalid(
                format!("certificates.{}", feature),
                "certificate base paths must be strings",
            ));
            continue;
        };

        if path_has_colon(base) {
            plans.push(Plan::invalid(
                base,
                format!("certificate base path '{}' must not contain ':'", base),
            ));
            continue;
        }

        let Some(leaves) = leaves.as_mapping() else {
            plans.push(Plan::invalid(
                base,
                format!("certificates under '{}' must be a map of leaf names to x509 specs", base),
            ));
            continue;
        };

        for (leaf, spec) in leaves {
            let Some(leaf) = leaf.as_str() else {
                plans.push(Plan::invalid(base, "certificate leaf names must be strings"));
                continue;
            };
            let path = format!("{}/{}", base, leaf);

            if path_has_colon(leaf) {
                plans.push(Plan::invalid(
                    &path,
                    format!("certificate leaf '{}' must not contain ':'", leaf),
                ));
                continue;
            }

            match X509Plan::from_spec(base, spec) {
                Ok(plan) => plans.push(Plan::new(&path, SecretKind::X509(plan))),
                Err(e) => plans.push(Plan::invalid(&path, e.to_string())),
            }
        }
    }
}

fn parse_credentials(feature: &str, block: &Value, plans: &mut Vec<Plan>) {
    let Some(paths) = block.as_mapping() else {
        plans.push(Plan::invalid(
            format!("credentials.{}", feature),
            format!("credentials for feature '{}' must be a map of paths", feature),
        ));
        return;
    };

    for (path, spec) in paths {
        let Some(path) = path.as_str() else {
            plans.push(Plan::invalid(
                format!("credentials.{}", feature),
                "credential paths must be strings",
            ));
            continue;
        };

        if path_has_colon(path) {
            plans.push(Plan::invalid(
                path,
                format!("credential path '{}' must not contain ':'", path),
            ));
            continue;
        }

        match spec {
            Value::String(line) => match parse_string_spec(path, line) {
                Ok(kind) => plans.push(Plan::new(path, kind)),
                Err(e) => plans.push(Plan::invalid(path, e.to_string())),
            },
            Value::Mapping(keys) => {
                for (key, line) in keys {
                    let Some(key) = key.as_str() else {
                        plans.push(Plan::invalid(path, "credential keys must be strings"));
                        continue;
                    };
                    let keyed_path = format!("{}:{}", path, key);

                    if key.contains(':') {
                        plans.push(Plan::invalid(
                            &keyed_path,
                            format!("credential key '{}' must not contain ':'", key),
                        ));
                        continue;
                    }

                    let Some(line) = line.as_str() else {
                        plans.push(Plan::invalid(
                            &keyed_path,
                            format!("credential '{}' under '{}' must be a string", key, path),
                        ));
                        continue;
                    };

                    match parse_cred_line(line) {
                        Ok(kind) => plans.push(Plan::new(&keyed_path, kind)),
                        Err(e) => plans.push(Plan::invalid(&keyed_path, e.to_string())),
                    }
                }
            }
            _ => plans.push(Plan::invalid(
                path,
                format!("credential '{}' must be a string spec or a map of keys", path),
            )),
        }
    }
}

fn parse_provided(feature: &str, block: &Value, plans: &mut Vec<Plan>) {
    let Some(paths) = block.as_mapping() else {
        plans.push(Plan::invalid(
            format!("provided.{}", feature),
            format!("provided secrets for feature '{}' must be a map of paths", feature),
        ));
        return;
    };

    for (path, spec) in paths {
        let Some(path) = path.as_str() else {
            plans.push(Plan::invalid(
                format!("provided.{}", feature),
                "provided paths must be strings",
            ));
            continue;
        };

        if path_has_colon(path) {
            plans.push(Plan::invalid(
                path,
                format!("provided path '{}' must not contain ':'", path),
            ));
            continue;
        }

        let Some(spec) = spec.as_mapping() else {
            plans.push(Plan::invalid(
                path,
                format!("provided secret '{}' must be a map", path),
            ));
            continue;
        };

        let subtype = spec.get("type").and_then(Value::as_str).unwrap_or("generic");
        if subtype != "generic" {
            plans.push(Plan::invalid(
                path,
                format!("provided secret '{}' has unknown type '{}'", path, subtype),
            ));
            continue;
        }

        let Some(keys) = spec.get("keys").and_then(Value::as_mapping) else {
            plans.push(Plan::invalid(
                path,
                format!("provided secret '{}' must declare a keys map", path),
            ));
            continue;
        };

        for (key, key_spec) in keys {
            let Some(key) = key.as_str() else {
                plans.push(Plan::invalid(path, "provided keys must be strings"));
                continue;
            };
            let keyed_path = format!("{}:{}", path, key);

            if key.contains(':') {
                plans.push(Plan::invalid(
                    &keyed_path,
                    format!("provided key '{}' must not contain ':'", key),
                ));
                continue;
            }

            match ProvidedPlan::from_spec(path, key, subtype, key_spec) {
                Ok(plan) => plans.push(Plan::new(&keyed_path, SecretKind::Provided(plan))),
                Err(e) => plans.push(Plan::invalid(&keyed_path, e.to_string())),
            }
        }
    }
}

/// Parse a path-level string spec: `ssh <bits> [fixed]`, `rsa <bits>
/// [fixed]`, or `dhparam[s] <bits> [fixed]`.
pub fn parse_string_spec(path: &str, line: &str) -> Result<SecretKind> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(&kind) = tokens.first() else {
        return Err(GenesisError::Secret("empty credential spec".to_string()));
    };

    // Bare per-key grammars at path level get the clearer diagnostic
    if kind == "random" || kind == "uuid" {
        return Err(GenesisError::Secret(format!(
            "{} credentials must be specified per key, e.g. {}: {{ <key>: \"{}\" }}",
            kind, path, line
        )));
    }

    if !matches!(kind, "ssh" | "rsa" | "dhparam" | "dhparams") {
        return Err(GenesisError::Secret(format!(
            "unknown credential type '{}'",
            kind
        )));
    }

    let bits: u32 = tokens
        .get(1)
        .ok_or_else(|| GenesisError::Secret(format!("'{}' requires a bit size", kind)))?
        .parse()
        .map_err(|_| {
            GenesisError::Secret(format!("invalid bit size '{}' for '{}'", tokens[1], kind))
        })?;

    let fixed = match tokens.get(2) {
        None => false,
        Some(&"fixed") => true,
        Some(other) => {
            return Err(GenesisError::Secret(format!(
                "unexpected token '{}' in '{}'",
                other, line
            )))
        }
    };
    if tokens.len() > 3 {
        return Err(GenesisError::Secret(format!(
            "unexpected token '{}' in '{}'",
            tokens[3], line
        )));
    }

    Ok(match kind {
        "ssh" => SecretKind::Ssh(SshPlan { size: bits, fixed }),
        "rsa" => SecretKind::Rsa(RsaPlan { size: bits, fixed }),
        _ => SecretKind::DhParams(DhParamsPlan { size: bits, fixed }),
    })
}

/// Parse a per-key cred-line: `random ...` or `uuid ...`.
pub fn parse_cred_line(line: &str) -> Result<SecretKind> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.first() {
        Some(&"random") => parse_random(&tokens[1..], line),
        Some(&"uuid") => parse_uuid(&tokens[1..], line),
        Some(other) => Err(GenesisError::Secret(format!(
            "unknown credential type '{}'",
            other
        ))),
        None => Err(GenesisError::Secret("empty credential line".to_string())),
    }
}

/// `random <N> [fmt <F> [at <K>]] [allowed-chars <S>] [fixed]`
fn parse_random(tokens: &[&str], line: &str) -> Result<SecretKind> {
    let size: usize = tokens
        .first()
        .ok_or_else(|| GenesisError::Secret(format!("'{}' is missing a size", line)))?
        .parse()
        .map_err(|_| GenesisError::Secret(format!("invalid size '{}' in '{}'", tokens[0], line)))?;

    let mut format = None;
    let mut destination = None;
    let mut valid_chars = None;
    let mut fixed = false;
    let mut i = 1;

    let arg = |tokens: &[&str], i: usize, what: &str| -> Result<String> {
        tokens
            .get(i)
            .map(|s| s.to_string())
            .ok_or_else(|| GenesisError::Secret(format!("'{}' expects a value in '{}'", what, line)))
    };

    if tokens.get(i) == Some(&"fmt") {
        format = Some(arg(tokens, i + 1, "fmt")?);
        i += 2;
        if tokens.get(i) == Some(&"at") {
            destination = Some(arg(tokens, i + 1, "at")?);
            i += 2;
        }
    }
    if tokens.get(i) == Some(&"allowed-chars") {
        valid_chars = Some(arg(tokens, i + 1, "allowed-chars")?);
        i += 2;
    }
    if tokens.get(i) == Some(&"fixed") {
        fixed = true;
        i += 1;
    }
    if let Some(extra) = tokens.get(i) {
        return Err(GenesisError::Secret(format!(
            "unexpected token '{}' in '{}'",
            extra, line
        )));
    }

    Ok(SecretKind::Random(RandomPlan {
        size,
        format,
        destination,
        valid_chars,
        fixed,
    }))
}

/// `uuid [v1|time|v3|md5|v4|random|v5|sha1] [namespace <...>] [name <s>] [fixed]`
fn parse_uuid(tokens: &[&str], line: &str) -> Result<SecretKind> {
    let mut version = UuidVersion::V4;
    let mut namespace = None;
    let mut name = None;
    let mut fixed = false;
    let mut i = 0;

    if let Some(token) = tokens.first() {
        if !matches!(*token, "namespace" | "name" | "fixed") {
            version = UuidVersion::from_token(token).map_err(|_| {
                GenesisError::Secret(format!("unknown UUID version '{}' in '{}'", token, line))
            })?;
            i = 1;
        }
    }

    if tokens.get(i) == Some(&"namespace") {
        namespace = Some(
            tokens
                .get(i + 1)
                .map(|s| s.to_string())
                .ok_or_else(|| {
                    GenesisError::Secret(format!("'namespace' expects a value in '{}'", line))
                })?,
        );
        i += 2;
    }

    if tokens.get(i) == Some(&"name") {
        // The name runs to the end of the line, bar a trailing `fixed`
        let mut rest: Vec<&str> = tokens[i + 1..].to_vec();
        if rest.last() == Some(&"fixed") {
            fixed = true;
            rest.pop();
        }
        if rest.is_empty() {
            return Err(GenesisError::Secret(format!(
                "'name' expects a value in '{}'",
                line
            )));
        }
        name = Some(rest.join(" "));
        i = tokens.len();
    }

    if tokens.get(i) == Some(&"fixed") {
        fixed = true;
        i += 1;
    }
    if let Some(extra) = tokens.get(i) {
        return Err(GenesisError::Secret(format!(
            "unexpected token '{}' in '{}'",
            extra, line
        )));
    }

    Ok(SecretKind::Uuid(UuidPlan {
        version,
        namespace,
        name,
        fixed,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use genesis_kit::KitMetadata;

    fn secrets(yaml: &str) -> SecretsMetadata {
        KitMetadata::from_yaml(&format!("name: test\nversion: 0.0.1\n{}", yaml))
            .unwrap()
            .secrets
    }

    fn base() -> Vec<String> {
        vec!["base".to_string()]
    }

    #[test]
    fn test_certificates_produce_leaf_plans() {
        let meta = secrets(
            "certificates:\n  base:\n    my-cert:\n      ca: { is_ca: true }\n      server: { names: [srv.example] }\n",
        );
        let plans = parse_kit_secrets(&meta, &base());
        assert_eq!(plans.len(), 2);

        let ca = plans.iter().find(|p| p.path == "my-cert/ca").unwrap();
        match &ca.kind {
            SecretKind::X509(x) => {
                assert!(x.is_ca);
                assert_eq!(x.base_path, "my-cert");
            }
            other => panic!("expected x509, got {:?}", other),
        }
        assert!(plans.iter().any(|p| p.path == "my-cert/server"));
    }

    #[test]
    fn test_features_gate_blocks() {
        let meta = secrets(
            "credentials:\n  base:\n    a: rsa 2048\n  ha:\n    b: ssh 2048\n",
        );
        assert_eq!(parse_kit_secrets(&meta, &base()).len(), 1);
        assert_eq!(
            parse_kit_secrets(&meta, &["base".into(), "ha".into()]).len(),
            2
        );
    }

    #[test]
    fn test_cred_line_grammar() {
        match parse_cred_line("random 32 fmt base64 at token-b64 allowed-chars a-z0-9 fixed")
            .unwrap()
        {
            SecretKind::Random(r) => {
                assert_eq!(r.size, 32);
                assert_eq!(r.format.as_deref(), Some("base64"));
                assert_eq!(r.destination.as_deref(), Some("token-b64"));
                assert_eq!(r.valid_chars.as_deref(), Some("a-z0-9"));
                assert!(r.fixed);
            }
            other => panic!("expected random, got {:?}", other),
        }

        match parse_cred_line("uuid v5 namespace dns name foo.example").unwrap() {
            SecretKind::Uuid(u) => {
                assert_eq!(u.version, UuidVersion::V5);
                assert_eq!(u.namespace.as_deref(), Some("dns"));
                assert_eq!(u.name.as_deref(), Some("foo.example"));
                assert!(!u.fixed);
            }
            other => panic!("expected uuid, got {:?}", other),
        }

        // bare uuid defaults to v4
        assert!(matches!(
            parse_cred_line("uuid").unwrap(),
            SecretKind::Uuid(UuidPlan { version: UuidVersion::V4, .. })
        ));

        assert!(parse_cred_line("random").is_err());
        assert!(parse_cred_line("random twelve").is_err());
        assert!(parse_cred_line("random 16 surprise").is_err());
        assert!(parse_cred_line("uuid v2").is_err());
    }

    #[test]
    fn test_cred_line_round_trip() {
        for line in [
            "random 32 fixed",
            "random 16 fmt base64 at token-b64",
            "random 64 allowed-chars a-f0-9",
            "uuid v4",
            "uuid v5 namespace url name http://example.com fixed",
            "uuid v1 fixed",
        ] {
            let kind = parse_cred_line(line).unwrap();
            let emitted = match &kind {
                SecretKind::Random(r) => r.to_cred_line(),
                SecretKind::Uuid(u) => u.to_cred_line(),
                other => panic!("unexpected kind {:?}", other),
            };
            assert_eq!(parse_cred_line(&emitted).unwrap(), kind, "line: {}", line);
        }
    }

    #[test]
    fn test_string_spec_round_trip() {
        for line in ["ssh 2048", "rsa 4096 fixed", "dhparams 2048"] {
            let kind = parse_string_spec("p", line).unwrap();
            let emitted = match &kind {
                SecretKind::Ssh(s) => s.to_cred_line(),
                SecretKind::Rsa(r) => r.to_cred_line(),
                SecretKind::DhParams(d) => d.to_cred_line(),
                other => panic!("unexpected kind {:?}", other),
            };
            assert_eq!(parse_string_spec("p", &emitted).unwrap(), kind);
        }
    }

    #[test]
    fn test_bare_random_at_path_level_gets_clear_diagnostic() {
        let meta = secrets("credentials:\n  base:\n    things/creds: random 32\n");
        let plans = parse_kit_secrets(&meta, &base());
        assert_eq!(plans.len(), 1);
        assert!(plans[0].is_error());
        match &plans[0].kind {
            SecretKind::Invalid(inv) => {
                assert!(inv.error.contains("per key"), "got: {}", inv.error)
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_colon_in_path_is_error_plan() {
        let meta = secrets("credentials:\n  base:\n    'bad:path': rsa 2048\n");
        let plans = parse_kit_secrets(&meta, &base());
        assert_eq!(plans.len(), 1);
        assert!(plans[0].is_error());
    }

    #[test]
    fn test_provided_produces_per_key_plans() {
        let meta = secrets(
            "provided:\n  base:\n    creds/manual:\n      type: generic\n      keys:\n        username: { sensitive: false }\n        password: {}\n",
        );
        let mut plans = parse_kit_secrets(&meta, &base());
        plans.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].path, "creds/manual:password");
        assert_eq!(plans[1].path, "creds/manual:username");
        assert!(matches!(plans[0].kind, SecretKind::Provided(_)));
    }

    #[test]
    fn test_wrong_shapes_become_error_plans() {
        let meta = secrets("certificates:\n  base:\n    my-cert: just-a-string\n");
        let plans = parse_kit_secrets(&meta, &base());
        assert_eq!(plans.len(), 1);
        assert!(plans[0].is_error());

        let meta = secrets("provided:\n  base:\n    creds/manual:\n      type: generic\n");
        let plans = parse_kit_secrets(&meta, &base());
        assert!(plans[0].is_error());
    }
}
