//! Branch-qualified resource paths.
//!
//! A branch-qualified path carries a sanitized branch segment immediately in
//! front of the type suffix:
//!
//! ```text
//! f/shared/api_key.variable.yaml      ->  f/shared/api_key.staging.variable.yaml
//! f/shared/cert.resource.file.pem     ->  f/shared/cert.staging.resource.file.pem
//! f/shared/folder.meta.yaml           ->  f/shared/folder.staging.meta.yaml
//! settings.yaml                       ->  settings.staging.yaml
//! ```
//!
//! Only variables, resources, triggers, folders and settings are eligible;
//! every other path goes through both conversions untouched.
//!
//! Sanitization is lossy (`release/1.0` and `release_1_0` collide). The
//! config resolver reports such collisions, see
//! [`find_sanitization_collision`].

use crate::types::{normalize_separators, TriggerKind};

const RESOURCE_FILE_MARKER: &str = ".resource.file.";
const FOLDER_META: &str = "folder.meta.yaml";
const SETTINGS: &str = "settings.yaml";

/// Replace every `/` and `.` in a branch name with `_`.
pub fn sanitize_branch_name(branch: &str) -> String {
    branch.replace(['/', '.'], "_")
}

fn single_file_suffixes() -> Vec<String> {
    let mut suffixes = vec![".variable.yaml".to_string(), ".resource.yaml".to_string()];
    suffixes.extend(TriggerKind::all().iter().map(|t| format!(".{}.yaml", t.as_str())));
    suffixes
}

fn split_file_name(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => path.split_at(idx + 1),
        None => ("", path),
    }
}

/// Insert `.<branch>` in front of the type suffix of an eligible path.
pub fn to_branch_specific_path(path: &str, branch: &str) -> String {
    let path = normalize_separators(path);
    let segment = sanitize_branch_name(branch);
    let (dir, name) = split_file_name(&path);

    if let Some(idx) = name.find(RESOURCE_FILE_MARKER) {
        let (stem, rest) = name.split_at(idx);
        return format!("{dir}{stem}.{segment}{rest}");
    }
    if let Some(suffix) = single_file_suffixes()
        .into_iter()
        .find(|s| name.ends_with(s.as_str()))
    {
        let stem = &name[..name.len() - suffix.len()];
        return format!("{dir}{stem}.{segment}{suffix}");
    }
    if name == FOLDER_META {
        return format!("{dir}folder.{segment}.meta.yaml");
    }
    if path == SETTINGS {
        return format!("settings.{segment}.yaml");
    }
    path
}

/// Inverse of [`to_branch_specific_path`] for the same branch.
///
/// Paths that are not branch-qualified for `branch` come back unchanged.
pub fn from_branch_specific_path(path: &str, branch: &str) -> String {
    let path = normalize_separators(path);
    let segment = format!(".{}", sanitize_branch_name(branch));
    let (dir, name) = split_file_name(&path);

    let marker = format!("{segment}{RESOURCE_FILE_MARKER}");
    if let Some(idx) = name.find(&marker) {
        return format!("{dir}{}{}", &name[..idx], &name[idx + segment.len()..]);
    }
    for suffix in single_file_suffixes() {
        let qualified = format!("{segment}{suffix}");
        if let Some(stem) = name.strip_suffix(&qualified) {
            return format!("{dir}{stem}{suffix}");
        }
    }
    if name == format!("folder{segment}.meta.yaml") {
        return format!("{dir}{FOLDER_META}");
    }
    if path == format!("settings{segment}.yaml") {
        return SETTINGS.to_string();
    }
    path
}

/// Non-empty segment with no further dots, preceded by a non-empty stem.
fn has_branch_segment(stem: &str) -> bool {
    match stem.rsplit_once('.') {
        Some((head, segment)) => !head.is_empty() && !segment.is_empty(),
        None => false,
    }
}

fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty() && !segment.contains('.')
}

/// Structural check: does `path` look branch-qualified for *some* branch?
pub fn is_branch_specific_file(path: &str) -> bool {
    let path = normalize_separators(path);
    let (dir, name) = split_file_name(&path);

    if let Some(idx) = name.find(RESOURCE_FILE_MARKER) {
        return has_branch_segment(&name[..idx]);
    }
    if let Some(suffix) = single_file_suffixes()
        .into_iter()
        .find(|s| name.ends_with(s.as_str()))
    {
        return has_branch_segment(&name[..name.len() - suffix.len()]);
    }
    if let Some(segment) = name
        .strip_prefix("folder.")
        .and_then(|rest| rest.strip_suffix(".meta.yaml"))
    {
        return is_plain_segment(segment);
    }
    if dir.is_empty() {
        if let Some(segment) = name
            .strip_prefix("settings.")
            .and_then(|rest| rest.strip_suffix(".yaml"))
        {
            return is_plain_segment(segment);
        }
    }
    false
}

/// True when `path` is branch-qualified for exactly `branch`.
pub fn is_current_branch_file(path: &str, branch: &str) -> bool {
    is_branch_specific_file(path) && from_branch_specific_path(path, branch) != normalize_separators(path)
}

/// First pair of distinct branch names that sanitize to the same segment.
///
/// Returns `(first, second, sanitized)` in input order.
pub fn find_sanitization_collision<'a>(
    branches: impl IntoIterator<Item = &'a str>,
) -> Option<(String, String, String)> {
    let mut seen: Vec<(&str, String)> = Vec::new();
    for branch in branches {
        let sanitized = sanitize_branch_name(branch);
        if let Some((first, _)) = seen.iter().find(|(b, s)| *s == sanitized && *b != branch) {
            return Some((first.to_string(), branch.to_string(), sanitized));
        }
        seen.push((branch, sanitized));
    }
    None
}
