//! Path alias resolution
//!
//! Maps an absolute project file to the alias it should be imported through,
//! given TypeScript `paths`-style rules. Callers fall back to a relative
//! specifier when no rule applies.

use std::path::Path;

use crate::config::Settings;
use crate::models::AliasRule;
use crate::parsers::tsconfig::load_alias_rules;
use crate::paths::{lexical_normalize, unixify};

/// Alias rules for a project: tsconfig/jsconfig `paths`, then `[[typescript_paths]]` settings
///
/// Order matters because [`resolve_alias`] keeps the earlier rule on a tie.
pub fn project_alias_rules(settings: &Settings, import_root: &Path) -> Vec<AliasRule> {
    let mut rules = load_alias_rules(import_root);
    rules.extend(settings.alias_rules(import_root));
    rules
}

/// Alias specifier for `filepath`, or None if no rule applies
///
/// Only rules whose `base_dir` contains the file are considered. The rule
/// with the longest literal `path_value` wins; on a tie the earlier rule is
/// kept. A rule with a wildcard on only one side is skipped.
pub fn resolve_alias(filepath: &str, rules: &[AliasRule]) -> Option<String> {
    let target = unixify(filepath);
    let mut best: Option<(usize, String)> = None;

    for rule in rules {
        let Some((specificity, alias)) = apply_rule(&target, rule) else {
            continue;
        };

        log::trace!(
            "Alias rule {} => {} matches {} as {} (specificity {})",
            rule.path_to,
            rule.path_value,
            target,
            alias,
            specificity
        );

        let better = match &best {
            Some((current, _)) => specificity > *current,
            None => true,
        };
        if better {
            best = Some((specificity, alias));
        }
    }

    best.map(|(_, alias)| alias)
}

/// Alias and specificity of one rule applied to a normalized target path
fn apply_rule(target: &str, rule: &AliasRule) -> Option<(usize, String)> {
    let wildcard_to = rule.path_to.contains('*');
    let wildcard_value = rule.path_value.contains('*');
    if wildcard_to != wildcard_value {
        log::trace!("Skipping alias rule {} with one-sided wildcard", rule.path_to);
        return None;
    }

    let base = slashed(&rule.base_dir);
    if !is_under(target, &base) {
        return None;
    }

    let value = slashed(&lexical_normalize(&rule.base_dir.join(&rule.path_value)));

    if !wildcard_value {
        let value = unixify(&value);
        return (target == value).then(|| (value.len(), rule.path_to.clone()));
    }

    let (prefix, suffix) = value.split_once('*')?;
    let suffix = normalize_suffix(suffix);

    let middle = target.strip_prefix(prefix)?.strip_suffix(suffix.as_str())?;
    if middle.is_empty() {
        return None;
    }

    Some((prefix.len() + suffix.len(), rule.path_to.replacen('*', middle, 1)))
}

/// Forward-slash path text without a trailing slash
fn slashed(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    if text.len() > 1 {
        text.trim_end_matches('/').to_string()
    } else {
        text
    }
}

fn is_under(target: &str, base: &str) -> bool {
    if base == "/" {
        return target.starts_with('/');
    }
    target == base
        || target
            .strip_prefix(base)
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false)
}

/// Wildcard suffixes such as `.ts` or `/index.ts` vanish under normalization
fn normalize_suffix(suffix: &str) -> String {
    let sample = format!("x{}", suffix);
    unixify(&sample)[1..].to_string()
}
