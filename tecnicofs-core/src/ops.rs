//! The five filesystem operations: `create`, `delete`, `lookup`, `move`,
//! and `print`. Everything above this module (the server's dispatch loop,
//! the client library) talks to a [`Filesystem`] and never touches the
//! inode table, directory helpers, or path resolver directly.

use std::io::Write;

use crate::dir;
use crate::error::OpError;
use crate::path::{self, Intent, LockedPath};
use crate::table::{InodeTable, InodeType, Inumber, LockMode, Payload, FS_ROOT};

/// An in-memory hierarchical filesystem: an inode table plus the five
/// operations that give it meaning. Safe to share across worker threads
/// behind an `Arc`; every operation takes `&self`.
pub struct Filesystem {
    table: InodeTable,
}

impl Filesystem {
    /// A fresh filesystem containing only the root directory.
    pub fn new() -> Self {
        Filesystem {
            table: InodeTable::new(),
        }
    }

    /// Create a file or directory at `path`. Fails if the root was named,
    /// the parent does not exist or is not a directory, or `path` already
    /// names an entry.
    pub fn create(&self, path: &str, kind: InodeType) -> Result<(), OpError> {
        if path == "/" {
            return Err(OpError::RootImmutable);
        }
        let resolved = path::resolve(&self.table, path, Intent::Create, None)?;
        if resolved.child.is_some() {
            return Err(OpError::AlreadyExists(path.to_string()));
        }
        let mut resolved = resolved;
        let new_inumber = self.table.create(kind)?;
        let parent_payload = resolved
            .locked
            .payload_mut(resolved.parent)
            .expect("Intent::Create locks the parent for writing");
        if let Err(e) = dir::dir_add_entry(parent_payload, &resolved.child_name, new_inumber) {
            // Nothing else references the slot we just claimed; free it
            // rather than leaking an inode the directory never linked.
            let _ = self.table.delete(new_inumber);
            return Err(e.into());
        }
        Ok(())
    }

    /// Delete the file or empty directory at `path`.
    pub fn delete(&self, path: &str) -> Result<(), OpError> {
        if path == "/" {
            return Err(OpError::RootImmutable);
        }
        let mut resolved = path::resolve(&self.table, path, Intent::Delete, None)?;
        let child = resolved
            .child
            .ok_or_else(|| OpError::InvalidPath(path.to_string()))?;
        let child_payload = resolved
            .locked
            .payload(child)
            .expect("Intent::Delete locks the target for reading when it exists");
        if matches!(child_payload, Payload::Directory(_)) && !dir::is_dir_empty(child_payload) {
            return Err(OpError::NotEmpty(path.to_string()));
        }
        let parent_payload = resolved
            .locked
            .payload_mut(resolved.parent)
            .expect("Intent::Delete locks the parent for writing");
        dir::dir_reset_entry(parent_payload, child)?;
        self.table.delete(child)?;
        Ok(())
    }

    /// Resolve `path` to its inumber, if it names an entry. A result of
    /// `Ok(None)` is a normal miss, not an error; wire-level callers map it
    /// to `FAIL` the same way they map every other `Err`.
    pub fn lookup(&self, path: &str) -> Result<Option<Inumber>, OpError> {
        if path == "/" {
            return Ok(Some(FS_ROOT));
        }
        match path::resolve(&self.table, path, Intent::Lookup, None) {
            Ok(resolved) => Ok(resolved.child),
            Err(crate::error::PathError::ComponentMissing(_))
            | Err(crate::error::PathError::NotADirectory(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The type of an already-resolved inumber, for callers (mostly tests)
    /// that already hold one from [`Self::lookup`] and want to confirm it
    /// names a file or a directory. Not part of the wire protocol.
    pub fn kind_of(&self, inumber: Inumber) -> Result<InodeType, OpError> {
        let guard = self.table.lock(inumber, LockMode::Read)?;
        Ok(guard.inode_type())
    }

    /// Move the entry at `from` to `to`, which must name a not-yet-existing
    /// entry in an existing directory. Resolves both paths under a single
    /// global lock order (see [`path`]'s module docs) so that two
    /// concurrent moves can never deadlock against each other, however
    /// much of their ancestry they share.
    pub fn move_(&self, from: &str, to: &str) -> Result<(), OpError> {
        if from == "/" || to == "/" {
            return Err(OpError::RootImmutable);
        }
        if to == from || to.starts_with(&format!("{from}/")) {
            return Err(OpError::MoveCycle(from.to_string()));
        }
        let (from_parent, _) = path::split_parent_child(from)?;
        let (to_parent, _) = path::split_parent_child(to)?;

        if path::resolve_first(&from_parent, &to_parent) {
            let orig = path::resolve(&self.table, from, Intent::Move, None)?;
            let dest = path::resolve(&self.table, to, Intent::Create, Some(&orig.locked))?;
            self.relink(orig, dest, from, to)
        } else {
            let dest = path::resolve(&self.table, to, Intent::Create, None)?;
            let orig = path::resolve(&self.table, from, Intent::Move, Some(&dest.locked))?;
            self.relink(orig, dest, from, to)
        }
    }

    fn relink(
        &self,
        mut orig: path::Resolved<'_>,
        mut dest: path::Resolved<'_>,
        from: &str,
        to: &str,
    ) -> Result<(), OpError> {
        let moved = orig
            .child
            .ok_or_else(|| OpError::InvalidPath(from.to_string()))?;
        if dest.child.is_some() {
            return Err(OpError::AlreadyExists(to.to_string()));
        }

        let from_name = orig.child_name.clone();
        let to_name = dest.child_name.clone();

        {
            let parent_payload = write_payload(&mut orig.locked, &mut dest.locked, orig.parent);
            dir::dir_reset_entry(parent_payload, moved)?;
        }

        let dest_payload = write_payload(&mut dest.locked, &mut orig.locked, dest.parent);
        if let Err(e) = dir::dir_add_entry(dest_payload, &to_name, moved) {
            // Put it back where it came from rather than stranding it.
            let parent_payload = write_payload(&mut orig.locked, &mut dest.locked, orig.parent);
            let _ = dir::dir_add_entry(parent_payload, &from_name, moved);
            return Err(e.into());
        }
        Ok(())
    }

    /// Write the whole tree, one entry per line, to `out`.
    pub fn print(&self, out: &mut dyn Write) -> Result<(), OpError> {
        let root = self.table.lock(FS_ROOT, LockMode::Write)?;
        self.table
            .print_tree(root.payload(), "/", out)
            .map_err(|e| OpError::Other(e.into()))
    }
}

impl Default for Filesystem {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch the write-locked payload for `inumber` from whichever of the two
/// move resolutions actually holds it — shared ancestors are locked by
/// only one of the two, per [`path`]'s `previously_locked` protocol.
fn write_payload<'p, 'a>(
    primary: &'p mut LockedPath<'a>,
    secondary: &'p mut LockedPath<'a>,
    inumber: Inumber,
) -> &'p mut Payload {
    if primary.contains(inumber) {
        primary
            .payload_mut(inumber)
            .expect("contains() implies payload_mut() succeeds")
    } else {
        secondary
            .payload_mut(inumber)
            .expect("must be locked by whichever resolution ran first")
    }
}
