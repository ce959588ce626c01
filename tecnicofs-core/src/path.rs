//! Deadlock-free path resolution.
//!
//! Every filesystem operation that needs to mutate the tree walks a path
//! top-down, locking each ancestor directory in read mode and the final
//! parent (the directory the target entry actually lives in) in write
//! mode. Locks accumulate in a [`LockedPath`] and are released together
//! when it drops, rather than one at a time as the walk unwinds — this is
//! what keeps the whole operation atomic with respect to concurrent
//! walkers.
//!
//! `move` resolves two paths against the same table in the same call.
//! Naively locking origin-then-destination (or vice versa) opens a
//! classic lock-ordering deadlock: two concurrent moves in opposite
//! directions can each hold the first path's lock while waiting on the
//! second's. [`crate::ops::move_`] avoids this by resolving the two paths
//! in a fixed global order (shorter parent path first, then
//! lexicographic) and threading the first resolution's [`LockedPath`] into
//! the second as `previously_locked`, so any inumber the two paths share
//! an ancestor on is locked exactly once.

use crate::dir;
use crate::error::{DirError, PathError};
use crate::table::{
    InodeTable, InodeType, Inumber, LockMode, Payload, SlotGuard, FS_ROOT, MAX_FILE_NAME,
};

/// Why a path is being resolved; determines which node gets the write lock
/// and whether the final component, if it exists, is locked too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Every node is locked for reading; nothing is mutated.
    Lookup,
    /// The final parent is locked for writing; the target must not exist.
    Create,
    /// The final parent is locked for writing; if the target exists it is
    /// additionally locked for reading, to block concurrent mutation of it
    /// while this operation decides whether to remove it.
    Delete,
    /// The final parent is locked for writing; if the target exists it is
    /// additionally locked for reading, same as `Delete` — the moved node
    /// itself is never mutated in place (`relink` only ever touches the old
    /// and new parent directories), so a write lock on it would only block
    /// concurrent readers for no reason.
    Move,
}

/// The accumulated set of locks held over the course of one path
/// resolution. Dropping this releases every lock it holds, in the reverse
/// of acquisition order.
pub struct LockedPath<'a> {
    entries: Vec<(Inumber, SlotGuard<'a>)>,
}

impl<'a> LockedPath<'a> {
    fn new() -> Self {
        LockedPath {
            entries: Vec::new(),
        }
    }

    fn push(&mut self, inumber: Inumber, guard: SlotGuard<'a>) {
        self.entries.push((inumber, guard));
    }

    /// Whether this resolution already holds a lock on `inumber`.
    pub fn contains(&self, inumber: Inumber) -> bool {
        self.entries.iter().any(|(i, _)| *i == inumber)
    }

    fn payload_of(&self, inumber: Inumber) -> Option<&Payload> {
        self.entries
            .iter()
            .find(|(i, _)| *i == inumber)
            .map(|(_, g)| g.payload())
    }

    /// Public variant of [`Self::payload_of`], for callers in [`crate::ops`]
    /// that only need to read a node they had this resolution lock.
    pub fn payload(&self, inumber: Inumber) -> Option<&Payload> {
        self.payload_of(inumber)
    }

    /// Mutable access to the payload of a node this resolution locked for
    /// writing. Returns `None` if the node isn't held, or is held only for
    /// reading.
    pub fn payload_mut(&mut self, inumber: Inumber) -> Option<&mut Payload> {
        self.entries
            .iter_mut()
            .find(|(i, _)| *i == inumber)
            .map(|(_, g)| g.payload_mut())
    }
}

/// The result of successfully resolving a path down to its final parent
/// and target component.
pub struct Resolved<'a> {
    pub locked: LockedPath<'a>,
    pub parent: Inumber,
    pub child_name: String,
    pub child: Option<Inumber>,
}

/// Split `/a/b/c` (or `a/b/c` — a leading slash is optional, every path is
/// rooted regardless) into `["a", "b", "c"]`, validating each component.
/// Rejects a path longer than [`MAX_FILE_NAME`] bytes (matching the
/// original's use of one `MAX_FILE_NAME`-sized buffer for a whole path, not
/// just one component) and a path that reduces to zero components (the
/// empty string, `/`, or any run of only `/` characters), since every
/// caller of [`resolve`] names a non-root target.
pub fn split_path(path: &str) -> Result<Vec<String>, PathError> {
    if path.len() > MAX_FILE_NAME {
        return Err(PathError::PathTooLong(path.to_string()));
    }
    let components: Vec<String> = path
        .split('/')
        .filter(|c| !c.is_empty())
        .map(|c| c.to_string())
        .collect();
    if components.is_empty() {
        return Err(PathError::ComponentMissing(path.to_string()));
    }
    for c in &components {
        if !dir::valid_name(c) {
            return Err(PathError::ComponentMissing(c.clone()));
        }
    }
    Ok(components)
}

fn payload_at<'a, 'b>(
    locked: &'b LockedPath<'a>,
    previously_locked: Option<&'b LockedPath<'a>>,
    inumber: Inumber,
) -> &'b Payload {
    locked
        .payload_of(inumber)
        .or_else(|| previously_locked.and_then(|p| p.payload_of(inumber)))
        .expect("resolve() only reads nodes it just locked, or that previously_locked holds")
}

fn lock_step<'a>(
    table: &'a InodeTable,
    locked: &mut LockedPath<'a>,
    previously_locked: Option<&LockedPath<'a>>,
    inumber: Inumber,
    mode: LockMode,
) -> Result<(), PathError> {
    if locked.contains(inumber) {
        return Ok(());
    }
    if let Some(prev) = previously_locked {
        if prev.contains(inumber) {
            return Ok(());
        }
    }
    let guard = table
        .lock(inumber, mode)
        .map_err(|e| PathError::Dir(DirError::Table(e)))?;
    locked.push(inumber, guard);
    Ok(())
}

/// Walk `path` from the root, locking ancestors for reading and the final
/// parent (and, depending on `intent`, the target itself) as described on
/// [`Intent`].
///
/// `previously_locked` should be `Some` only when resolving the second of
/// two paths in the same `move`, so that any shared ancestor is not locked
/// twice — see the module docs.
pub fn resolve<'a>(
    table: &'a InodeTable,
    path: &str,
    intent: Intent,
    previously_locked: Option<&LockedPath<'a>>,
) -> Result<Resolved<'a>, PathError> {
    let components = split_path(path)?;
    let mut locked = LockedPath::new();

    let root_is_parent = components.len() == 1;
    lock_step(
        table,
        &mut locked,
        previously_locked,
        FS_ROOT,
        parent_or_ancestor_mode(intent, root_is_parent),
    )?;

    let mut current = FS_ROOT;
    for (i, component) in components.iter().enumerate().take(components.len() - 1) {
        let payload = payload_at(&locked, previously_locked, current);
        if !matches!(payload, Payload::Directory(_)) {
            return Err(PathError::NotADirectory(component.clone()));
        }
        let next = dir::lookup_sub_node(payload, component)
            .ok_or_else(|| PathError::ComponentMissing(component.clone()))?;
        let is_parent = i == components.len() - 2;
        lock_step(
            table,
            &mut locked,
            previously_locked,
            next,
            parent_or_ancestor_mode(intent, is_parent),
        )?;
        current = next;
    }

    let parent = current;
    let parent_payload = payload_at(&locked, previously_locked, parent);
    if !matches!(parent_payload, Payload::Directory(_)) {
        return Err(PathError::NotADirectory(
            components[components.len() - 2].clone(),
        ));
    }
    let child_name = components.last().unwrap().clone();
    let child = dir::lookup_sub_node(parent_payload, &child_name);

    if let Some(child_inumber) = child {
        let child_mode = match intent {
            Intent::Delete | Intent::Move => Some(LockMode::Read),
            Intent::Lookup | Intent::Create => None,
        };
        if let Some(mode) = child_mode {
            lock_step(table, &mut locked, previously_locked, child_inumber, mode)?;
        }
    }

    Ok(Resolved {
        locked,
        parent,
        child_name,
        child,
    })
}

fn parent_or_ancestor_mode(intent: Intent, is_parent: bool) -> LockMode {
    if is_parent && intent != Intent::Lookup {
        LockMode::Write
    } else {
        LockMode::Read
    }
}

/// Order two move paths deterministically by their *parent* path: the one
/// with fewer components resolves first; ties break on byte-wise
/// (`strcmp`-equivalent) comparison of the parent path string. Returns
/// `true` if `a`'s parent should be resolved before `b`'s.
pub fn resolve_first(a_parent: &str, b_parent: &str) -> bool {
    let a_depth = a_parent.matches('/').count();
    let b_depth = b_parent.matches('/').count();
    if a_depth != b_depth {
        a_depth < b_depth
    } else {
        a_parent <= b_parent
    }
}

/// Split a path into its parent path and final component name, e.g.
/// `/a/b/c` into (`/a/b`, `c`). The root has no parent; passing `/` back
/// is the caller's signal to treat it specially.
pub fn split_parent_child(path: &str) -> Result<(String, String), PathError> {
    let components = split_path(path)?;
    let child = components.last().unwrap().clone();
    let parent = if components.len() == 1 {
        "/".to_string()
    } else {
        format!("/{}", components[..components.len() - 1].join("/"))
    };
    Ok((parent, child))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::InodeType;

    #[test]
    fn split_path_accepts_a_missing_leading_slash() {
        // A leading slash is optional — every path is rooted regardless,
        // per spec.md §6.
        assert_eq!(
            split_path("a/b").unwrap(),
            split_path("/a/b").unwrap()
        );
    }

    #[test]
    fn split_path_rejects_a_path_longer_than_max_file_name() {
        let long = "/".to_string() + &"a".repeat(MAX_FILE_NAME + 1);
        assert!(matches!(
            split_path(&long),
            Err(PathError::PathTooLong(_))
        ));
    }

    #[test]
    fn split_parent_child_of_top_level_name() {
        let (parent, child) = split_parent_child("/a").unwrap();
        assert_eq!(parent, "/");
        assert_eq!(child, "a");
    }

    #[test]
    fn split_parent_child_of_nested_name() {
        let (parent, child) = split_parent_child("/a/b/c").unwrap();
        assert_eq!(parent, "/a/b");
        assert_eq!(child, "c");
    }

    #[test]
    fn resolve_create_locks_parent_for_writing_and_finds_no_child() {
        let table = InodeTable::new();
        let resolved = resolve(&table, "/a", Intent::Create, None).unwrap();
        assert_eq!(resolved.parent, FS_ROOT);
        assert_eq!(resolved.child_name, "a");
        assert_eq!(resolved.child, None);
    }

    #[test]
    fn resolve_lookup_walks_through_existing_directories() {
        let table = InodeTable::new();
        let a = table.create(InodeType::Directory).unwrap();
        {
            let mut root = table.lock(FS_ROOT, LockMode::Write).unwrap();
            dir::dir_add_entry(root.payload_mut(), "a", a).unwrap();
        }
        let b = table.create(InodeType::File).unwrap();
        {
            let mut a_guard = table.lock(a, LockMode::Write).unwrap();
            dir::dir_add_entry(a_guard.payload_mut(), "b", b).unwrap();
        }
        let resolved = resolve(&table, "/a/b", Intent::Lookup, None).unwrap();
        assert_eq!(resolved.parent, a);
        assert_eq!(resolved.child, Some(b));
    }

    #[test]
    fn resolve_first_prefers_shallower_parent() {
        assert!(resolve_first("/", "/a/b"));
        assert!(!resolve_first("/a/b", "/"));
        assert!(resolve_first("/a", "/b"));
    }
}
