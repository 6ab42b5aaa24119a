//! Shared dependency-lock cache.
//!
//! Scripts whose effective dependency inputs agree (language, inline
//! annotation, workspace dependency files) resolve to the same lock. The
//! cache keys on a digest of those inputs and resolves each key at most once
//! per process, even under concurrent requests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, OnceCell};

use wmsync_core::language::Language;
use wmsync_core::types::normalize_separators;

use crate::error::LockError;

/// Directory holding workspace-level dependency manifests.
pub const DEPENDENCIES_DIR: &str = "dependencies/";

// ---------------------------------------------------------------------------
// Annotations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationMode {
    /// `<keyword>:` lists the only dependency files to use.
    Manual,
    /// `extra_<keyword>:` adds named files to the default one.
    Extra,
}

impl AnnotationMode {
    pub fn as_str(self) -> &'static str {
        match self {
            AnnotationMode::Manual => "manual",
            AnnotationMode::Extra => "extra",
        }
    }
}

/// Inline dependency annotation found in a script header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyAnnotation {
    pub mode: AnnotationMode,
    /// Names of workspace dependency files referenced on the marker line.
    pub external: Vec<String>,
    /// Dependency lines written directly below the marker.
    pub inline: Option<String>,
}

impl DependencyAnnotation {
    fn descriptor(&self) -> String {
        format!(
            "{}|{}|{}",
            self.mode.as_str(),
            self.external.join(","),
            self.inline.as_deref().unwrap_or("none")
        )
    }
}

static PYTHON_REQUIREMENT_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#\s?(\S+)\s*$").expect("valid regex"));

/// Find the dependency annotation of `content`.
///
/// `None` when the language has no annotation keyword or no marker line is
/// present.
pub fn extract_annotation(content: &str, language: Language) -> Option<DependencyAnnotation> {
    let keyword = language.dependency_keyword()?;
    let prefix = language.comment_prefix();
    let extra_marker = format!("extra_{keyword}:");
    let manual_marker = format!("{keyword}:");

    let mut lines = content.lines();
    let (mode, remainder) = lines.by_ref().find_map(|line| {
        let comment = line.trim_start().strip_prefix(prefix)?.trim_start();
        if let Some(rest) = comment.strip_prefix(&extra_marker) {
            Some((AnnotationMode::Extra, rest))
        } else {
            comment
                .strip_prefix(&manual_marker)
                .map(|rest| (AnnotationMode::Manual, rest))
        }
    })?;

    let external = remainder
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();

    let mut inline = Vec::new();
    for line in lines {
        if language == Language::Python3 {
            match PYTHON_REQUIREMENT_LINE.captures(line) {
                Some(caps) => inline.push(caps[1].to_string()),
                None => break,
            }
        } else {
            match line.trim_start().strip_prefix(prefix) {
                Some(rest) => inline.push(rest.strip_prefix(' ').unwrap_or(rest).to_string()),
                None => break,
            }
        }
    }

    Some(DependencyAnnotation {
        mode,
        external,
        inline: (!inline.is_empty()).then(|| inline.join("\n")),
    })
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Digest of the dependency inputs of a script.
///
/// The script body only contributes through its annotation, and the
/// dependency map is sorted first, so key order never matters.
pub fn compute_lock_cache_key<I, K, V>(
    content: &str,
    language: Language,
    raw_workspace_dependencies: I,
) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let annotation = extract_annotation(content, language)
        .map(|a| a.descriptor())
        .unwrap_or_else(|| "none".to_string());

    let mut deps: Vec<(String, String)> = raw_workspace_dependencies
        .into_iter()
        .map(|(k, v)| (normalize_separators(k.as_ref()), v.as_ref().to_string()))
        .collect();
    deps.sort();
    let deps = deps
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(";");

    let composite = format!("{}|{annotation}|{deps}", language.as_str());
    hex::encode(Sha256::digest(composite.as_bytes()))
}

/// Workspace dependency files that apply to a script.
///
/// `files` maps paths (`dependencies/requirements.in`,
/// `dependencies/ml.requirements.in`, ...) to their content. The unnamed
/// default file applies unless the annotation is manual; named files apply
/// when the annotation references them.
pub fn workspace_dependencies_for(
    language: Language,
    annotation: Option<&DependencyAnnotation>,
    files: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let Some(file_name) = language.dependency_file_name() else {
        return BTreeMap::new();
    };
    let named_suffix = format!(".{file_name}");
    let manual = annotation.is_some_and(|a| a.mode == AnnotationMode::Manual);
    let external: &[String] = annotation.map(|a| a.external.as_slice()).unwrap_or_default();

    files
        .iter()
        .filter_map(|(path, content)| {
            let path = normalize_separators(path);
            let name = path.strip_prefix(DEPENDENCIES_DIR)?;
            let selected = if name == file_name {
                !manual
            } else if let Some(stem) = name.strip_suffix(&named_suffix) {
                external.iter().any(|e| e == stem || e == name)
            } else {
                false
            };
            selected.then(|| (path.clone(), content.clone()))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

/// Everything a resolver needs to produce a lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRequest {
    pub path: String,
    pub language: Language,
    pub content: String,
    pub raw_workspace_dependencies: BTreeMap<String, String>,
}

impl LockRequest {
    /// Build a request, selecting the applicable files out of
    /// `workspace_files`.
    pub fn for_script(
        path: impl AsRef<str>,
        language: Language,
        content: impl Into<String>,
        workspace_files: &BTreeMap<String, String>,
    ) -> Self {
        let content = content.into();
        let annotation = extract_annotation(&content, language);
        Self {
            path: normalize_separators(path.as_ref()),
            language,
            raw_workspace_dependencies: workspace_dependencies_for(
                language,
                annotation.as_ref(),
                workspace_files,
            ),
            content,
        }
    }

    pub fn cache_key(&self) -> String {
        compute_lock_cache_key(&self.content, self.language, &self.raw_workspace_dependencies)
    }
}

/// Turns a script into lock text; in practice a call to the remote API.
#[async_trait]
pub trait LockResolver: Send + Sync {
    async fn resolve(&self, request: &LockRequest) -> Result<String, LockError>;
}

/// In-memory, per-invocation lock cache.
#[derive(Debug, Default)]
pub struct LockCache {
    cells: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
}

impl LockCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `request` through the cache.
    ///
    /// Requests without workspace dependencies bypass the cache entirely.
    /// Concurrent requests for one key share a single resolver call; a failed
    /// call leaves the key unresolved and removes its entry.
    pub async fn fetch(
        &self,
        resolver: &dyn LockResolver,
        request: &LockRequest,
    ) -> Result<String, LockError> {
        if request.raw_workspace_dependencies.is_empty() {
            tracing::debug!("{}: no workspace dependencies, resolving directly", request.path);
            return resolver.resolve(request).await;
        }

        let key = request.cache_key();
        let cell = {
            let mut cells = self.cells.lock().await;
            Arc::clone(cells.entry(key.clone()).or_default())
        };
        if cell.initialized() {
            tracing::debug!("{}: lock cache hit {}", request.path, &key[..12]);
        }
        let resolved = cell
            .get_or_try_init(|| async {
                tracing::debug!("{}: lock cache miss {}", request.path, &key[..12]);
                resolver.resolve(request).await
            })
            .await;
        match resolved {
            Ok(lock) => Ok(lock.clone()),
            Err(e) => {
                self.forget_unresolved(&key, &cell).await;
                Err(e)
            }
        }
    }

    /// Drop `key` after a failed resolution, unless a retry already filled it.
    async fn forget_unresolved(&self, key: &str, cell: &Arc<OnceCell<String>>) {
        let mut cells = self.cells.lock().await;
        let stale = cells
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, cell) && !current.initialized());
        if stale {
            cells.remove(key);
        }
    }

    /// Number of keys with a resolved lock.
    pub async fn len(&self) -> usize {
        self.cells
            .lock()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flaky {
        fail: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl LockResolver for Flaky {
        async fn resolve(&self, request: &LockRequest) -> Result<String, LockError> {
            if self.fail.swap(false, std::sync::atomic::Ordering::SeqCst) {
                return Err(LockError::Resolution {
                    path: request.path.clone(),
                    message: "timeout".to_string(),
                });
            }
            Ok(format!("lock for {}", request.path))
        }
    }

    #[tokio::test]
    async fn failed_resolution_leaves_no_entry_behind() {
        let files: BTreeMap<String, String> =
            [("dependencies/requirements.in".to_string(), "requests".to_string())]
                .into_iter()
                .collect();
        let request = LockRequest::for_script("f/a/job.py", Language::Python3, "print(1)\n", &files);
        let cache = LockCache::new();
        let resolver = Flaky {
            fail: std::sync::atomic::AtomicBool::new(true),
        };

        assert!(cache.fetch(&resolver, &request).await.is_err());
        assert!(cache.cells.lock().await.is_empty());

        let lock = cache.fetch(&resolver, &request).await.expect("retry");
        assert_eq!(lock, "lock for f/a/job.py");
        assert_eq!(cache.cells.lock().await.len(), 1);
    }

    #[test]
    fn python_manual_annotation_with_inline_lines() {
        let script = "# requirements: ml, shared\n#numpy==1.26\n# pandas\n\nimport numpy\n";
        let ann = extract_annotation(script, Language::Python3).expect("annotation");
        assert_eq!(ann.mode, AnnotationMode::Manual);
        assert_eq!(ann.external, vec!["ml", "shared"]);
        assert_eq!(ann.inline.as_deref(), Some("numpy==1.26\npandas"));
    }

    #[test]
    fn python_inline_stops_at_non_matching_comment() {
        let script = "# extra_requirements:\n# requests\n# not a requirement\n# httpx\n";
        let ann = extract_annotation(script, Language::Python3).expect("annotation");
        assert_eq!(ann.mode, AnnotationMode::Extra);
        assert!(ann.external.is_empty());
        assert_eq!(ann.inline.as_deref(), Some("requests"));
    }

    #[test]
    fn bun_annotation_collects_comment_block() {
        let script = "// package_json: default\n// {\"dependencies\": {}}\nexport async function main() {}\n";
        let ann = extract_annotation(script, Language::Bun).expect("annotation");
        assert_eq!(ann.external, vec!["default"]);
        assert_eq!(ann.inline.as_deref(), Some("{\"dependencies\": {}}"));
    }

    #[test]
    fn no_annotation_for_unsupported_language_or_missing_marker() {
        assert_eq!(extract_annotation("// package_json: x\n", Language::Deno), None);
        assert_eq!(extract_annotation("echo hi\n", Language::Bash), None);
        assert_eq!(extract_annotation("import os\n", Language::Python3), None);
    }

    #[test]
    fn key_ignores_body_outside_annotation() {
        let deps = [("dependencies/requirements.in", "requests")];
        let a = compute_lock_cache_key("# requirements:\nprint(1)\n", Language::Python3, deps);
        let b = compute_lock_cache_key("# requirements:\nprint(2)\n", Language::Python3, deps);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn key_separates_languages() {
        let deps: [(&str, &str); 0] = [];
        assert_ne!(
            compute_lock_cache_key("", Language::Bun, deps),
            compute_lock_cache_key("", Language::Deno, deps)
        );
    }

    #[test]
    fn manual_mode_drops_default_file() {
        let files: BTreeMap<String, String> = [
            ("dependencies/requirements.in", "requests"),
            ("dependencies/ml.requirements.in", "numpy"),
            ("dependencies/package.json", "{}"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let none = workspace_dependencies_for(Language::Python3, None, &files);
        assert_eq!(none.keys().collect::<Vec<_>>(), vec!["dependencies/requirements.in"]);

        let manual = extract_annotation("# requirements: ml\n", Language::Python3);
        let selected = workspace_dependencies_for(Language::Python3, manual.as_ref(), &files);
        assert_eq!(selected.keys().collect::<Vec<_>>(), vec!["dependencies/ml.requirements.in"]);

        let extra = extract_annotation("# extra_requirements: ml\n", Language::Python3);
        let selected = workspace_dependencies_for(Language::Python3, extra.as_ref(), &files);
        assert_eq!(selected.len(), 2);

        assert!(workspace_dependencies_for(Language::Bash, None, &files).is_empty());
    }
}
