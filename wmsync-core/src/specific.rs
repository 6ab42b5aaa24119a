//! Branch-specific items.
//!
//! Two predicates drive the flattener's branch policy and must stay distinct:
//!
//! - [`is_item_type_configured`]: the path's kind has an entry in the
//!   specific-items block, whatever its value (an empty list counts).
//! - [`is_specific_item`]: the kind is configured *and* the entry selects
//!   this path (a glob matches, or `settings: true`).

use glob::{MatchOptions, Pattern};

use crate::config::{SpecificItems, SyncConfig};
use crate::paths::PathConvention;
use crate::types::{normalize_separators, ResourceKind};

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// True when any pattern glob-matches `path`. Malformed patterns never match;
/// they are rejected when the configuration is loaded.
pub fn matches_any(path: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|p| {
        Pattern::new(p)
            .map(|pattern| pattern.matches_with(path, MATCH_OPTIONS))
            .unwrap_or(false)
    })
}

fn branch_kind(path: &str) -> Option<ResourceKind> {
    PathConvention::default()
        .classify(path)
        .filter(|kind| kind.is_branch_eligible())
}

fn entry_for(kind: ResourceKind, items: &SpecificItems) -> Option<&Vec<String>> {
    match kind {
        ResourceKind::Variable => items.variables.as_ref(),
        ResourceKind::Resource => items.resources.as_ref(),
        ResourceKind::Trigger(_) => items.triggers.as_ref(),
        ResourceKind::Folder => items.folders.as_ref(),
        _ => None,
    }
}

/// Does the specific-items block mention the kind of `path` at all?
pub fn is_item_type_configured(path: &str, items: Option<&SpecificItems>) -> bool {
    let Some(items) = items else {
        return false;
    };
    let path = normalize_separators(path);
    match branch_kind(&path) {
        Some(ResourceKind::Settings) => items.settings.is_some(),
        Some(kind) => entry_for(kind, items).is_some(),
        None => false,
    }
}

/// Is `path` selected as branch-specific?
///
/// Folders are matched on their directory (`f/env_prod`) as well as on the
/// metadata file path.
pub fn is_specific_item(path: &str, items: Option<&SpecificItems>) -> bool {
    let Some(items) = items else {
        return false;
    };
    let path = normalize_separators(path);
    match branch_kind(&path) {
        Some(ResourceKind::Settings) => items.settings == Some(true),
        Some(ResourceKind::Folder) => {
            let Some(patterns) = items.folders.as_ref() else {
                return false;
            };
            let dir = path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
            matches_any(dir, patterns) || matches_any(&path, patterns)
        }
        Some(kind) => entry_for(kind, items)
            .map(|patterns| matches_any(&path, patterns))
            .unwrap_or(false),
        None => false,
    }
}

fn concat(common: &Option<Vec<String>>, branch: &Option<Vec<String>>) -> Option<Vec<String>> {
    match (common, branch) {
        (None, None) => None,
        (c, b) => Some(
            c.iter()
                .flatten()
                .chain(b.iter().flatten())
                .cloned()
                .collect(),
        ),
    }
}

/// Merge `commonSpecificItems` with the branch's own `specificItems`.
///
/// Lists concatenate (common first); `settings` from the branch wins.
/// `None` when neither side has anything.
pub fn specific_items_for_branch(config: &SyncConfig, branch: &str) -> Option<SpecificItems> {
    let git = config.git_branches.as_ref()?;
    let common = git.common_specific_items.as_ref();
    let own = git
        .branches
        .get(branch)
        .and_then(|b| b.specific_items.as_ref());
    if common.is_none() && own.is_none() {
        return None;
    }

    let empty = SpecificItems::default();
    let common = common.unwrap_or(&empty);
    let own = own.unwrap_or(&empty);
    Some(SpecificItems {
        variables: concat(&common.variables, &own.variables),
        resources: concat(&common.resources, &own.resources),
        triggers: concat(&common.triggers, &own.triggers),
        folders: concat(&common.folders, &own.folders),
        settings: own.settings.or(common.settings),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse;

    fn items(yaml: &str) -> SpecificItems {
        serde_yaml::from_str(yaml).expect("items")
    }

    #[test]
    fn configured_is_distinct_from_matching() {
        let cfg = items("folders: [\"f/env_*\"]");
        assert!(is_item_type_configured("f/other/folder.meta.yaml", Some(&cfg)));
        assert!(!is_specific_item("f/other/folder.meta.yaml", Some(&cfg)));
        assert!(is_specific_item("f/env_prod/folder.meta.yaml", Some(&cfg)));
        assert!(!is_item_type_configured("f/other/x.variable.yaml", Some(&cfg)));
    }

    #[test]
    fn empty_list_counts_as_configured() {
        let cfg = items("variables: []");
        assert!(is_item_type_configured("f/a/k.variable.yaml", Some(&cfg)));
        assert!(!is_specific_item("f/a/k.variable.yaml", Some(&cfg)));
    }

    #[test]
    fn settings_is_boolean() {
        let off = items("settings: false");
        assert!(is_item_type_configured("settings.yaml", Some(&off)));
        assert!(!is_specific_item("settings.yaml", Some(&off)));
        let on = items("settings: true");
        assert!(is_specific_item("settings.yaml", Some(&on)));
    }

    #[test]
    fn nothing_configured_without_items() {
        assert!(!is_item_type_configured("f/a/k.variable.yaml", None));
        assert!(!is_specific_item("f/a/k.variable.yaml", None));
    }

    #[test]
    fn scripts_are_never_configured() {
        let cfg = items("variables: [\"**\"]\nresources: [\"**\"]");
        assert!(!is_item_type_configured("f/a/job.py", Some(&cfg)));
    }

    #[test]
    fn branch_merge_concatenates_common_first() {
        let config = parse(
            r#"
gitBranches:
  commonSpecificItems:
    variables: ["f/common/**"]
    settings: false
  staging:
    specificItems:
      variables: ["f/staging/**"]
      triggers: ["f/hooks/**"]
      settings: true
"#,
        )
        .unwrap();
        let merged = specific_items_for_branch(&config, "staging").expect("merged");
        assert_eq!(
            merged.variables,
            Some(vec!["f/common/**".to_string(), "f/staging/**".to_string()])
        );
        assert_eq!(merged.triggers, Some(vec!["f/hooks/**".to_string()]));
        assert_eq!(merged.resources, None);
        assert_eq!(merged.settings, Some(true));

        let other = specific_items_for_branch(&config, "prod").expect("common only");
        assert_eq!(other.variables, Some(vec!["f/common/**".to_string()]));
        assert_eq!(other.settings, Some(false));
    }

    #[test]
    fn branch_merge_is_none_without_items() {
        let config = parse("gitBranches:\n  staging:\n    overrides:\n      skipFlows: true\n").unwrap();
        assert_eq!(specific_items_for_branch(&config, "staging"), None);
        assert_eq!(specific_items_for_branch(&SyncConfig::default(), "staging"), None);
    }
}
