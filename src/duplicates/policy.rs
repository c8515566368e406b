//! Keeper selection.
//!
//! For every duplicate class exactly one file is kept. The keeper is the
//! member with the fewest path components below the scan root; ties go to
//! the lexicographically smallest full path. Selection looks at paths only,
//! never at timestamps, so the same tree always resolves the same way.

use std::cmp::Ordering;
use std::path::Path;

use super::groups::{DuplicateGroup, DuplicateIndex, Fingerprint};
use crate::scanner::FileRecord;

/// Number of path components of `path` below `root`.
///
/// Paths outside `root` count all their components.
#[must_use]
pub fn path_depth(path: &Path, root: &Path) -> usize {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .count()
}

/// Byte-wise order of the full path string.
///
/// Unlike `Path::cmp`, separators get no special rank, so `a b/x` sorts
/// before `a/x`.
#[must_use]
pub fn path_order(a: &Path, b: &Path) -> Ordering {
    a.as_os_str()
        .as_encoded_bytes()
        .cmp(b.as_os_str().as_encoded_bytes())
}

/// Keeper ordering: shallower first, then by full path.
#[must_use]
pub fn keeper_order(a: &Path, b: &Path, root: &Path) -> Ordering {
    path_depth(a, root)
        .cmp(&path_depth(b, root))
        .then_with(|| path_order(a, b))
}

/// Pick the keeper among `members`.
///
/// Returns `None` for an empty slice.
#[must_use]
pub fn select_keeper<'a>(members: &'a [FileRecord], root: &Path) -> Option<&'a FileRecord> {
    members
        .iter()
        .min_by(|a, b| keeper_order(&a.path, &b.path, root))
}

/// Resolve one class into a keeper and its candidates.
///
/// Returns `None` when the class has fewer than two members.
#[must_use]
pub fn resolve<'a>(
    fingerprint: Fingerprint,
    members: &'a [FileRecord],
    root: &Path,
) -> Option<DuplicateGroup<'a>> {
    if members.len() < 2 {
        return None;
    }
    let keeper = select_keeper(members, root)?;

    let mut candidates: Vec<&FileRecord> = members
        .iter()
        .filter(|m| !std::ptr::eq(*m, keeper))
        .collect();
    candidates.sort_by(|a, b| path_order(&a.path, &b.path));

    log::trace!(
        "Keeper {} with {} candidate(s)",
        keeper.path.display(),
        candidates.len()
    );

    Some(DuplicateGroup {
        fingerprint,
        keeper,
        candidates,
    })
}

/// Resolve every class of the index, in fingerprint order.
#[must_use]
pub fn resolve_all<'a>(index: &'a DuplicateIndex, root: &Path) -> Vec<DuplicateGroup<'a>> {
    index
        .classes()
        .filter_map(|(fp, members)| resolve(*fp, members, root))
        .collect()
}
