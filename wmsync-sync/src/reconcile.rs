//! Compare two flattened trees.
//!
//! `old` is the side being brought up to date, `new` is the side it should
//! match. Contents are compared after normalizing `\r\n` to `\n`.

use serde::Serialize;

use wmsync_core::types::CanonicalPath;

use crate::flatten::FlattenedTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Added => "added",
            ChangeKind::Modified => "modified",
            ChangeKind::Deleted => "deleted",
        }
    }
}

/// One difference between the two trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEntry {
    pub path: CanonicalPath,
    pub kind: ChangeKind,
    /// Content on the `old` side; absent for additions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    /// Content on the `new` side; absent for deletions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSummary {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
}

/// Changes sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ChangeSet {
    entries: Vec<ChangeEntry>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[ChangeEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeEntry> {
        self.entries.iter()
    }

    pub fn paths(&self, kind: ChangeKind) -> impl Iterator<Item = &CanonicalPath> {
        self.entries
            .iter()
            .filter(move |e| e.kind == kind)
            .map(|e| &e.path)
    }

    pub fn summary(&self) -> ChangeSummary {
        let mut summary = ChangeSummary::default();
        for entry in &self.entries {
            match entry.kind {
                ChangeKind::Added => summary.added += 1,
                ChangeKind::Modified => summary.modified += 1,
                ChangeKind::Deleted => summary.deleted += 1,
            }
        }
        summary
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a ChangeEntry;
    type IntoIter = std::slice::Iter<'a, ChangeEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

pub(crate) fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n")
}

/// Everything needed to turn `old` into `new`.
pub fn reconcile(old: &FlattenedTree, new: &FlattenedTree) -> ChangeSet {
    let mut entries = Vec::new();

    for (path, after) in new {
        match old.get(path) {
            None => entries.push(ChangeEntry {
                path: path.clone(),
                kind: ChangeKind::Added,
                before: None,
                after: Some(after.clone()),
            }),
            Some(before) if normalize_line_endings(before) != normalize_line_endings(after) => {
                entries.push(ChangeEntry {
                    path: path.clone(),
                    kind: ChangeKind::Modified,
                    before: Some(before.clone()),
                    after: Some(after.clone()),
                })
            }
            Some(_) => {}
        }
    }
    for (path, before) in old {
        if !new.contains_key(path) {
            entries.push(ChangeEntry {
                path: path.clone(),
                kind: ChangeKind::Deleted,
                before: Some(before.clone()),
                after: None,
            });
        }
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    ChangeSet { entries }
}
