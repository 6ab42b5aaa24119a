//! `wmill.yaml` — sync configuration.
//!
//! # Layout
//!
//! ```yaml
//! defaultTs: bun
//! includes: ["f/**"]
//! skipVariables: true
//! nonDottedPaths: true
//! gitBranches:
//!   commonSpecificItems:
//!     variables: ["f/shared/**"]
//!   staging:
//!     overrides:
//!       skipVariables: false
//!     specificItems:
//!       resources: ["f/db/**"]
//! ```
//!
//! Loading mirrors the rest of the workspace: `load_at(dir)` reads
//! `<dir>/wmill.yaml`; saving writes a `.tmp` sibling and renames it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::language::Language;
use crate::paths::PathConvention;

/// File name of the sync configuration at the root of a sync directory.
pub const CONFIG_FILE_NAME: &str = "wmill.yaml";

/// Default include glob when `includes` is absent.
pub const DEFAULT_INCLUDE: &str = "f/**";

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Every setting a branch may override.
///
/// All fields are optional so the same type serves as the base layer and as
/// an override block: a present field replaces, an absent one inherits.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_ts: Option<Language>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub includes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excludes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_variables: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_resources: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_resource_types: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_secrets: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_scripts: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_flows: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_apps: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_folders: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_schedules: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_triggers: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_users: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_groups: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_settings: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_key: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_dotted_paths: Option<bool>,
}

macro_rules! overlay_fields {
    ($base:expr, $top:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = &$top.$field {
                $base.$field = Some(value.clone());
            }
        )+
    };
}

impl SyncOptions {
    /// Field-by-field shallow merge: fields present in `overrides` win.
    pub fn overlay(&self, overrides: &SyncOptions) -> SyncOptions {
        let mut merged = self.clone();
        overlay_fields!(
            merged,
            overrides,
            default_ts,
            includes,
            excludes,
            skip_variables,
            skip_resources,
            skip_resource_types,
            skip_secrets,
            skip_scripts,
            skip_flows,
            skip_apps,
            skip_folders,
            include_schedules,
            include_triggers,
            include_users,
            include_groups,
            include_settings,
            include_key,
            non_dotted_paths,
        );
        merged
    }

    pub fn path_convention(&self) -> PathConvention {
        PathConvention::from_non_dotted(self.non_dotted_paths.unwrap_or(false))
    }

    pub fn default_ts(&self) -> Language {
        self.default_ts.unwrap_or(Language::Bun)
    }

    pub fn include_patterns(&self) -> Vec<String> {
        self.includes
            .clone()
            .unwrap_or_else(|| vec![DEFAULT_INCLUDE.to_string()])
    }

    pub fn exclude_patterns(&self) -> Vec<String> {
        self.excludes.clone().unwrap_or_default()
    }
}

/// Which resources of a kind are branch-specific.
///
/// A list that is present but empty still counts as "configured".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecificItems {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggers: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folders: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<bool>,
}

impl SpecificItems {
    pub fn is_empty(&self) -> bool {
        self == &SpecificItems::default()
    }

    fn patterns(&self) -> impl Iterator<Item = &String> {
        [&self.variables, &self.resources, &self.triggers, &self.folders]
            .into_iter()
            .flatten()
            .flatten()
    }
}

/// Per-branch block under `gitBranches`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<SyncOptions>,
    /// Applied instead of `overrides` when this branch is the promotion target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion_overrides: Option<SyncOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_items: Option<SpecificItems>,
}

/// The `gitBranches` block: shared specific items plus one entry per branch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitBranches {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_specific_items: Option<SpecificItems>,
    #[serde(flatten)]
    pub branches: BTreeMap<String, BranchConfig>,
}

/// Root of `wmill.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    #[serde(flatten)]
    pub options: SyncOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_branches: Option<GitBranches>,
}

impl SyncConfig {
    pub fn branch(&self, name: &str) -> Option<&BranchConfig> {
        self.git_branches.as_ref()?.branches.get(name)
    }

    /// Check every glob the configuration carries.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut patterns: Vec<&String> = Vec::new();
        patterns.extend(self.options.includes.iter().flatten());
        patterns.extend(self.options.excludes.iter().flatten());
        if let Some(git) = &self.git_branches {
            if let Some(common) = &git.common_specific_items {
                patterns.extend(common.patterns());
            }
            for branch in git.branches.values() {
                if let Some(items) = &branch.specific_items {
                    patterns.extend(items.patterns());
                }
                for layer in [&branch.overrides, &branch.promotion_overrides].into_iter().flatten() {
                    patterns.extend(layer.includes.iter().flatten());
                    patterns.extend(layer.excludes.iter().flatten());
                }
            }
        }

        for pattern in patterns {
            if let Err(e) = glob::Pattern::new(pattern) {
                return Err(ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    message: e.msg.to_string(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// `<dir>/wmill.yaml` — pure, no I/O.
pub fn config_path_at(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}

/// Load and validate `<dir>/wmill.yaml`.
///
/// Returns `ConfigError::ConfigNotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(dir: &Path) -> Result<SyncConfig, ConfigError> {
    load_file(&config_path_at(dir))
}

/// Load and validate a configuration file at an explicit path.
pub fn load_file(path: &Path) -> Result<SyncConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    let config = parse(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration text. An empty document is the default configuration.
pub fn parse(contents: &str) -> Result<SyncConfig, serde_yaml::Error> {
    if contents.trim().is_empty() {
        return Ok(SyncConfig::default());
    }
    serde_yaml::from_str(contents)
}

/// Atomically save `<dir>/wmill.yaml`.
///
/// Write flow: serialize → `wmill.yaml.tmp` sibling → `rename`.
pub fn save_at(dir: &Path, config: &SyncConfig) -> Result<(), ConfigError> {
    std::fs::create_dir_all(dir)?;
    let path = config_path_at(dir);
    let tmp_path = path.with_file_name(format!("{CONFIG_FILE_NAME}.tmp"));

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_git_branches_with_common_items() {
        let yaml = r#"
defaultTs: deno
skipVariables: true
gitBranches:
  commonSpecificItems:
    variables: ["f/shared/**"]
  staging:
    overrides:
      skipVariables: false
    specificItems:
      resources: []
"#;
        let config = parse(yaml).expect("parse");
        assert_eq!(config.options.default_ts, Some(Language::Deno));
        assert_eq!(config.options.skip_variables, Some(true));

        let git = config.git_branches.as_ref().expect("gitBranches");
        assert_eq!(
            git.common_specific_items.as_ref().unwrap().variables,
            Some(vec!["f/shared/**".to_string()])
        );
        let staging = config.branch("staging").expect("staging");
        assert_eq!(
            staging.overrides.as_ref().unwrap().skip_variables,
            Some(false)
        );
        assert_eq!(
            staging.specific_items.as_ref().unwrap().resources,
            Some(vec![])
        );
        assert!(config.branch("commonSpecificItems").is_none());
    }

    #[test]
    fn overlay_replaces_present_fields_only() {
        let base = SyncOptions {
            skip_variables: Some(true),
            skip_resources: Some(true),
            ..Default::default()
        };
        let top = SyncOptions {
            skip_variables: Some(false),
            ..Default::default()
        };
        let merged = base.overlay(&top);
        assert_eq!(merged.skip_variables, Some(false));
        assert_eq!(merged.skip_resources, Some(true));
        assert_eq!(merged.skip_flows, None);
    }

    #[test]
    fn empty_document_is_default() {
        assert_eq!(parse("  \n").unwrap(), SyncConfig::default());
    }

    #[test]
    fn defaults_when_unset() {
        let options = SyncOptions::default();
        assert_eq!(options.include_patterns(), vec!["f/**".to_string()]);
        assert!(options.exclude_patterns().is_empty());
        assert_eq!(options.default_ts(), Language::Bun);
    }

    #[test]
    fn invalid_glob_is_rejected() {
        let config = parse("includes: [\"f/[abc\"]\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }), "got: {err}");
    }
}
