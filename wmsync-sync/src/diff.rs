//! Dry-run unified diffs for a [`ChangeSet`].

use similar::TextDiff;

use wmsync_core::types::CanonicalPath;

use crate::reconcile::{normalize_line_endings, ChangeEntry, ChangeKind, ChangeSet};

/// A single file diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: CanonicalPath,
    pub kind: ChangeKind,
    pub unified_diff: String,
}

/// Unified diff of one change. Missing sides diff against empty text.
pub fn render_change(entry: &ChangeEntry) -> FileDiff {
    let before = normalize_line_endings(entry.before.as_deref().unwrap_or_default());
    let after = normalize_line_endings(entry.after.as_deref().unwrap_or_default());

    let old_header = match entry.kind {
        ChangeKind::Added => "/dev/null".to_string(),
        _ => format!("a/{}", entry.path),
    };
    let new_header = match entry.kind {
        ChangeKind::Deleted => "/dev/null".to_string(),
        _ => format!("b/{}", entry.path),
    };
    let unified = TextDiff::from_lines(&before, &after)
        .unified_diff()
        .header(&old_header, &new_header)
        .context_radius(3)
        .to_string();

    FileDiff {
        path: entry.path.clone(),
        kind: entry.kind,
        unified_diff: unified,
    }
}

/// Diff every change, in path order.
pub fn render_changes(changes: &ChangeSet) -> Vec<FileDiff> {
    changes.iter().map(render_change).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::FlattenedTree;
    use crate::reconcile::reconcile;

    fn tree(files: &[(&str, &str)]) -> FlattenedTree {
        files
            .iter()
            .map(|(p, c)| (CanonicalPath::new(p), c.to_string()))
            .collect()
    }

    #[test]
    fn modified_file_has_both_headers() {
        let old = tree(&[("f/a/job.py", "print(1)\n")]);
        let new = tree(&[("f/a/job.py", "print(2)\n")]);
        let diffs = render_changes(&reconcile(&old, &new));
        assert_eq!(diffs.len(), 1);
        let diff = &diffs[0].unified_diff;
        assert!(diff.contains("--- a/f/a/job.py"));
        assert!(diff.contains("+++ b/f/a/job.py"));
        assert!(diff.contains("-print(1)"));
        assert!(diff.contains("+print(2)"));
        assert!(diff.contains("@@"));
    }

    #[test]
    fn added_and_deleted_use_dev_null() {
        let old = tree(&[("f/a/old.py", "x\n")]);
        let new = tree(&[("f/a/new.py", "y\n")]);
        let diffs = render_changes(&reconcile(&old, &new));
        assert!(diffs[0].unified_diff.contains("--- /dev/null"));
        assert!(diffs[1].unified_diff.contains("+++ /dev/null"));
    }
}
