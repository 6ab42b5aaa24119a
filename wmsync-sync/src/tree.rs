//! Sources of resource trees.
//!
//! The flattener does not care where entries come from: a checked-out
//! directory ([`DirTree`]) or a snapshot held in memory ([`SnapshotTree`],
//! typically an unpacked remote export).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use wmsync_core::types::normalize_separators;

use crate::error::{io_err, SyncError};

/// One node of a resource tree. Paths are relative to the tree root and
/// `/`-separated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub is_directory: bool,
    /// File text; `None` for directories.
    pub content: Option<String>,
}

impl TreeEntry {
    pub fn file(path: impl AsRef<str>, content: impl Into<String>) -> Self {
        Self {
            path: normalize_separators(path.as_ref()),
            is_directory: false,
            content: Some(content.into()),
        }
    }

    pub fn directory(path: impl AsRef<str>) -> Self {
        Self {
            path: normalize_separators(path.as_ref()),
            is_directory: true,
            content: None,
        }
    }
}

/// Text of a file, or a digest line standing in for non-UTF-8 content so that
/// different binaries never compare equal.
pub fn file_content(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => {
            let digest = Sha256::digest(e.as_bytes());
            format!("binary content, sha256 {}\n", hex::encode(digest))
        }
    }
}

/// Anything that can list its entries, depth-first.
pub trait ResourceTree {
    fn entries(&self) -> Result<Vec<TreeEntry>, SyncError>;
}

/// A directory on disk.
///
/// Hidden directories (`.git`, `.wmill`, ...) are not descended into.
#[derive(Debug, Clone)]
pub struct DirTree {
    root: PathBuf,
}

impl DirTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn walk(&self, dir: &Path, prefix: &str, out: &mut Vec<TreeEntry>) -> Result<(), SyncError> {
        let mut children = std::fs::read_dir(dir)
            .map_err(|e| io_err(dir, e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| io_err(dir, e))?;
        children.sort_by_key(|entry| entry.file_name());

        for child in children {
            let name = child.file_name().to_string_lossy().into_owned();
            let path = child.path();
            let relative = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}/{name}")
            };
            let file_type = child.file_type().map_err(|e| io_err(&path, e))?;

            if file_type.is_dir() {
                if name.starts_with('.') {
                    continue;
                }
                out.push(TreeEntry::directory(&relative));
                self.walk(&path, &relative, out)?;
            } else if file_type.is_file() {
                let bytes = std::fs::read(&path).map_err(|e| io_err(&path, e))?;
                out.push(TreeEntry::file(&relative, file_content(bytes)));
            }
        }
        Ok(())
    }
}

impl ResourceTree for DirTree {
    fn entries(&self) -> Result<Vec<TreeEntry>, SyncError> {
        let mut out = Vec::new();
        self.walk(&self.root, "", &mut out)?;
        tracing::debug!("{}: {} entries", self.root.display(), out.len());
        Ok(out)
    }
}

/// An in-memory tree of files. Parent directories are implied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotTree {
    files: BTreeMap<String, String>,
}

impl SnapshotTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl AsRef<str>, content: impl Into<String>) -> &mut Self {
        self.files
            .insert(normalize_separators(path.as_ref()), content.into());
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<P: AsRef<str>, C: Into<String>> FromIterator<(P, C)> for SnapshotTree {
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        let mut tree = SnapshotTree::new();
        for (path, content) in iter {
            tree.insert(path, content);
        }
        tree
    }
}

impl ResourceTree for SnapshotTree {
    fn entries(&self) -> Result<Vec<TreeEntry>, SyncError> {
        Ok(self
            .files
            .iter()
            .map(|(path, content)| TreeEntry::file(path, content.as_str()))
            .collect())
    }
}
