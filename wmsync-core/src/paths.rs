//! Resource path conventions.
//!
//! Folder kinds (flows, apps, raw apps) live in a directory whose name carries
//! a type suffix. Two regimes exist:
//!
//! ```text
//! dotted       f/team/etl.flow/flow.yaml
//! non-dotted   f/team/etl__flow/flow.yaml
//! ```
//!
//! The regime is chosen once from configuration (`nonDottedPaths`) and carried
//! by a [`PathConvention`] value; there is no process-wide flag. The remote API
//! always emits the dotted form, so metadata-file detection accepts it in both
//! regimes.

use crate::error::PathError;
use crate::language::Language;
use crate::types::{normalize_separators, MetadataFormat, ResourceKind, TriggerKind};

/// Which folder-suffix regime is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FolderNaming {
    #[default]
    Dotted,
    NonDotted,
}

/// Path rules for one sync invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PathConvention {
    naming: FolderNaming,
}

fn dotted_suffix(kind: ResourceKind) -> Option<&'static str> {
    match kind {
        ResourceKind::Flow => Some(".flow"),
        ResourceKind::App => Some(".app"),
        ResourceKind::RawApp => Some(".raw_app"),
        _ => None,
    }
}

fn non_dotted_suffix(kind: ResourceKind) -> Option<&'static str> {
    match kind {
        ResourceKind::Flow => Some("__flow"),
        ResourceKind::App => Some("__app"),
        ResourceKind::RawApp => Some("__raw_app"),
        _ => None,
    }
}

/// Raw apps first: their suffix is the longest.
const FOLDER_KINDS: [ResourceKind; 3] = [ResourceKind::RawApp, ResourceKind::Flow, ResourceKind::App];

impl PathConvention {
    pub fn new(naming: FolderNaming) -> Self {
        Self { naming }
    }

    /// Convention matching the `nonDottedPaths` configuration flag.
    pub fn from_non_dotted(non_dotted: bool) -> Self {
        Self::new(if non_dotted {
            FolderNaming::NonDotted
        } else {
            FolderNaming::Dotted
        })
    }

    pub fn naming(&self) -> FolderNaming {
        self.naming
    }

    /// Active-regime folder suffix, `None` for kinds that are not folders.
    pub fn folder_suffix(&self, kind: ResourceKind) -> Option<&'static str> {
        match self.naming {
            FolderNaming::Dotted => dotted_suffix(kind),
            FolderNaming::NonDotted => non_dotted_suffix(kind),
        }
    }

    /// True when `path` lies inside (or is) a folder of `kind` in the active regime.
    ///
    /// The other regime's suffix is not recognised.
    pub fn is_path(&self, kind: ResourceKind, path: &str) -> bool {
        let Some(suffix) = self.folder_suffix(kind) else {
            return false;
        };
        let path = normalize_separators(path);
        path.contains(&format!("{suffix}/")) || path.trim_end_matches('/').ends_with(suffix)
    }

    /// True when `path` is the metadata file of a folder kind.
    ///
    /// Accepts the active regime and, always, the dotted API form.
    pub fn is_metadata_file(&self, kind: ResourceKind, path: &str) -> bool {
        let Some(stem) = kind.metadata_stem() else {
            return false;
        };
        let path = normalize_separators(path);
        let suffixes = [self.folder_suffix(kind), dotted_suffix(kind)];
        suffixes.into_iter().flatten().any(|suffix| {
            ["yaml", "json"]
                .iter()
                .any(|ext| path.ends_with(&format!("{suffix}/{stem}.{ext}")))
        })
    }

    pub fn build_folder_path(&self, name: &str, kind: ResourceKind) -> String {
        let name = normalize_separators(name);
        match self.folder_suffix(kind) {
            Some(suffix) => format!("{name}{suffix}"),
            None => name,
        }
    }

    pub fn build_metadata_path(
        &self,
        name: &str,
        kind: ResourceKind,
        format: MetadataFormat,
    ) -> String {
        let folder = self.build_folder_path(name, kind);
        let stem = kind.metadata_stem().unwrap_or(kind.as_str());
        format!("{folder}/{stem}.{}", format.extension())
    }

    /// Resource name in front of the active folder suffix, e.g. `f/team/etl`.
    pub fn extract_resource_name(&self, path: &str, kind: ResourceKind) -> Option<String> {
        let suffix = self.folder_suffix(kind)?;
        let path = normalize_separators(path);
        if let Some(idx) = path.find(&format!("{suffix}/")) {
            return Some(path[..idx].to_string());
        }
        path.trim_end_matches('/')
            .strip_suffix(suffix)
            .map(str::to_string)
    }

    /// Folder portion of `path` including the suffix and a trailing `/`.
    pub fn extract_folder_path(&self, path: &str, kind: ResourceKind) -> Option<String> {
        let suffix = self.folder_suffix(kind)?;
        self.extract_resource_name(path, kind)
            .map(|name| format!("{name}{suffix}/"))
    }

    pub fn has_folder_suffix(&self, path: &str, kind: ResourceKind) -> bool {
        match self.folder_suffix(kind) {
            Some(suffix) => normalize_separators(path)
                .trim_end_matches('/')
                .ends_with(suffix),
            None => false,
        }
    }

    /// `None` when `folder_name` carries the active suffix, otherwise a message
    /// naming the folder and the expected suffix.
    pub fn validate_folder_name(&self, folder_name: &str, kind: ResourceKind) -> Option<String> {
        let suffix = self.folder_suffix(kind)?;
        if self.has_folder_suffix(folder_name, kind) {
            return None;
        }
        Some(format!(
            "'{folder_name}' is not a valid {kind} folder: the name must end with '{suffix}'"
        ))
    }

    /// Map an API-style dotted metadata name (`f/a/etl.flow.json`) to the
    /// on-disk folder form (`f/a/etl__flow/flow.json` in non-dotted mode).
    pub fn api_metadata_to_disk(&self, path: &str, kind: ResourceKind) -> Option<String> {
        let dotted = dotted_suffix(kind)?;
        let stem = kind.metadata_stem()?;
        let path = normalize_separators(path);
        ["yaml", "json"].iter().find_map(|ext| {
            path.strip_suffix(&format!("{dotted}.{ext}"))
                .map(|name| format!("{}/{stem}.{ext}", self.build_folder_path(name, kind)))
        })
    }

    /// Rewrite a path as the remote API emits it into the active on-disk form.
    ///
    /// Dotted folder segments (`etl.flow/`) take the active suffix and a
    /// dotted metadata name (`etl.flow.json`) moves into its folder. Other
    /// paths only have their separators normalized.
    pub fn api_path_to_disk(&self, path: &str) -> String {
        let path = normalize_separators(path);
        if let Some(disk) = FOLDER_KINDS
            .iter()
            .find_map(|kind| self.api_metadata_to_disk(&path, *kind))
        {
            return disk;
        }
        if self.naming == FolderNaming::Dotted {
            return path;
        }

        let mut segments: Vec<&str> = path.split('/').collect();
        let file_name = segments.pop().unwrap_or_default();
        let mut disk: Vec<String> = segments
            .into_iter()
            .map(|segment| {
                FOLDER_KINDS
                    .iter()
                    .find_map(|kind| {
                        let name = segment.strip_suffix(dotted_suffix(*kind)?)?;
                        Some(self.build_folder_path(name, *kind))
                    })
                    .unwrap_or_else(|| segment.to_string())
            })
            .collect();
        disk.push(file_name.to_string());
        disk.join("/")
    }

    /// Kind of the resource a file belongs to, or `None` for unrelated files.
    ///
    /// Branch-qualified names classify like their base form.
    pub fn classify(&self, path: &str) -> Option<ResourceKind> {
        let path = normalize_separators(path);
        for kind in FOLDER_KINDS {
            if self.is_path(kind, &path) || self.is_metadata_file(kind, &path) {
                return Some(kind);
            }
        }

        let file_name = path.rsplit('/').next().unwrap_or(&path);
        if file_name.contains(".resource.file.") {
            return Some(ResourceKind::Resource);
        }
        if file_name.ends_with(".script.lock") {
            return Some(ResourceKind::Script);
        }

        if let Some(stem) = strip_format(file_name) {
            if let Some(kind) = classify_stem(stem, !path.contains('/')) {
                return Some(kind);
            }
        }

        Language::from_script_path(file_name, Language::Bun).map(|_| ResourceKind::Script)
    }
}

fn strip_format(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(".yaml")
        .or_else(|| file_name.strip_suffix(".json"))
}

fn classify_stem(stem: &str, at_root: bool) -> Option<ResourceKind> {
    if stem == "folder.meta" || (stem.starts_with("folder.") && stem.ends_with(".meta")) {
        return Some(ResourceKind::Folder);
    }
    if at_root && (stem == "settings" || stem.starts_with("settings.")) {
        return Some(ResourceKind::Settings);
    }

    let fixed = [
        (".variable", ResourceKind::Variable),
        (".resource", ResourceKind::Resource),
        (".resource-type", ResourceKind::ResourceType),
        (".schedule", ResourceKind::Schedule),
        (".user", ResourceKind::User),
        (".group", ResourceKind::Group),
        (".script", ResourceKind::Script),
    ];
    if let Some((_, kind)) = fixed.iter().find(|(s, _)| stem.ends_with(s)) {
        return Some(*kind);
    }
    TriggerKind::all()
        .iter()
        .find(|t| stem.ends_with(&format!(".{}", t.as_str())))
        .map(|t| ResourceKind::Trigger(*t))
}

/// Strip the type suffix of a single-file resource: `f/a/db.resource.yaml` → `f/a/db`.
///
/// A missing suffix is a caller bug, reported as [`PathError::MissingSuffix`].
pub fn remove_type(path: &str, kind: ResourceKind) -> Result<String, PathError> {
    let suffix = kind.file_suffix().ok_or_else(|| PathError::NotSingleFile {
        kind: kind.to_string(),
    })?;
    let stem = suffix.trim_end_matches(".yaml");
    let path = normalize_separators(path);
    for ext in ["yaml", "json"] {
        if let Some(rest) = path.strip_suffix(&format!("{stem}.{ext}")) {
            return Ok(rest.trim_end_matches('/').to_string());
        }
    }
    Err(PathError::MissingSuffix { path, suffix })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_paths_follow_active_regime() {
        let conv = non_dotted();
        assert_eq!(conv.api_path_to_disk("f/a/etl.flow/flow.yaml"), "f/a/etl__flow/flow.yaml");
        assert_eq!(conv.api_path_to_disk("f/a/etl.flow/a.py"), "f/a/etl__flow/a.py");
        assert_eq!(
            conv.api_path_to_disk("f/a/ui.raw_app/src/index.tsx"),
            "f/a/ui__raw_app/src/index.tsx"
        );
        assert_eq!(conv.api_path_to_disk("f/a/etl.flow.json"), "f/a/etl__flow/flow.json");
        assert_eq!(conv.api_path_to_disk("f/a/api.v2.resource.yaml"), "f/a/api.v2.resource.yaml");
        assert_eq!(conv.api_path_to_disk("f\\a\\job.py"), "f/a/job.py");

        let conv = dotted();
        assert_eq!(conv.api_path_to_disk("f/a/etl.flow/a.py"), "f/a/etl.flow/a.py");
        assert_eq!(conv.api_path_to_disk("f/a/etl.flow.json"), "f/a/etl.flow/flow.json");
    }

    fn dotted() -> PathConvention {
        PathConvention::new(FolderNaming::Dotted)
    }

    fn non_dotted() -> PathConvention {
        PathConvention::new(FolderNaming::NonDotted)
    }

    #[test]
    fn suffix_follows_regime() {
        assert_eq!(dotted().folder_suffix(ResourceKind::Flow), Some(".flow"));
        assert_eq!(non_dotted().folder_suffix(ResourceKind::RawApp), Some("__raw_app"));
        assert_eq!(dotted().folder_suffix(ResourceKind::Script), None);
    }

    #[test]
    fn is_path_ignores_other_regime() {
        assert!(non_dotted().is_path(ResourceKind::Flow, "f/a/etl__flow/flow.yaml"));
        assert!(!non_dotted().is_path(ResourceKind::Flow, "f/a/etl.flow/a.py"));
        assert!(!dotted().is_path(ResourceKind::Flow, "f/a/etl__flow/a.py"));
    }

    #[test]
    fn metadata_detection_always_accepts_dotted_form() {
        assert!(non_dotted().is_metadata_file(ResourceKind::Flow, "f/a/etl.flow/flow.yaml"));
        assert!(non_dotted().is_metadata_file(ResourceKind::App, "f/a/ui__app/app.json"));
        assert!(!dotted().is_metadata_file(ResourceKind::App, "f/a/ui__app/app.json"));
    }

    #[test]
    fn build_and_extract_are_inverse() {
        let conv = non_dotted();
        let meta = conv.build_metadata_path("f/a/etl", ResourceKind::Flow, MetadataFormat::Yaml);
        assert_eq!(meta, "f/a/etl__flow/flow.yaml");
        assert_eq!(
            conv.extract_resource_name(&meta, ResourceKind::Flow).as_deref(),
            Some("f/a/etl")
        );
        assert_eq!(
            conv.extract_folder_path(&meta, ResourceKind::Flow).as_deref(),
            Some("f/a/etl__flow/")
        );
        assert_eq!(conv.extract_resource_name("f/a/x.py", ResourceKind::Flow), None);
    }

    #[test]
    fn validate_folder_name_names_folder_and_suffix() {
        let msg = dotted()
            .validate_folder_name("f/a/etl", ResourceKind::Flow)
            .expect("must be rejected");
        assert!(msg.contains("f/a/etl"));
        assert!(msg.contains(".flow"));
        assert!(dotted().validate_folder_name("f/a/etl.flow", ResourceKind::Flow).is_none());
    }

    #[test]
    fn api_metadata_maps_to_folder_form() {
        assert_eq!(
            non_dotted()
                .api_metadata_to_disk("f/a/etl.flow.json", ResourceKind::Flow)
                .as_deref(),
            Some("f/a/etl__flow/flow.json")
        );
        assert_eq!(
            dotted()
                .api_metadata_to_disk("f/a/ui.raw_app.yaml", ResourceKind::RawApp)
                .as_deref(),
            Some("f/a/ui.raw_app/raw_app.yaml")
        );
    }

    #[test]
    fn backslashes_are_normalized() {
        assert_eq!(
            dotted().build_folder_path("f\\a\\etl", ResourceKind::Flow),
            "f/a/etl.flow"
        );
        assert!(dotted().is_path(ResourceKind::Flow, "f\\a\\etl.flow\\inline.py"));
    }

    #[test]
    fn classify_recognises_every_family() {
        let conv = dotted();
        let cases = [
            ("f/a/db.resource.yaml", ResourceKind::Resource),
            ("f/a/cert.resource.file.pem", ResourceKind::Resource),
            ("f/a/k.staging.variable.yaml", ResourceKind::Variable),
            ("f/a/hook.http_trigger.yaml", ResourceKind::Trigger(TriggerKind::Http)),
            ("f/a/folder.meta.yaml", ResourceKind::Folder),
            ("f/a/folder.main.meta.yaml", ResourceKind::Folder),
            ("settings.yaml", ResourceKind::Settings),
            ("settings.prod.yaml", ResourceKind::Settings),
            ("f/a/job.py", ResourceKind::Script),
            ("f/a/job.script.yaml", ResourceKind::Script),
            ("f/a/etl.flow/inline.py", ResourceKind::Flow),
            ("f/a/ui.raw_app/index.tsx", ResourceKind::RawApp),
            ("f/a/pg.resource-type.yaml", ResourceKind::ResourceType),
        ];
        for (path, kind) in cases {
            assert_eq!(conv.classify(path), Some(kind), "{path}");
        }
        assert_eq!(conv.classify("README.md"), None);
    }

    #[test]
    fn remove_type_errors_on_missing_suffix() {
        assert_eq!(
            remove_type("f/a/db.resource.yaml", ResourceKind::Resource).unwrap(),
            "f/a/db"
        );
        assert_eq!(
            remove_type("f/env/folder.meta.yaml", ResourceKind::Folder).unwrap(),
            "f/env"
        );
        let err = remove_type("f/a/db.variable.yaml", ResourceKind::Resource).unwrap_err();
        assert!(matches!(err, PathError::MissingSuffix { .. }));
        assert!(remove_type("f/a/etl.flow", ResourceKind::Flow).is_err());
    }
}
