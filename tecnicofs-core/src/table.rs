//! The inode table: a fixed-size array of slots, each independently
//! lockable, with atomic claim/release for allocation.
//!
//! Two separate synchronization mechanisms live here and should not be
//! confused:
//!
//! - an [`std::sync::atomic::AtomicBool`] per slot tracks whether the slot
//!   is in use, letting `create` scan for a free slot and claim it with a
//!   single compare-exchange instead of contending on every slot's content
//!   lock;
//! - an [`std::sync::RwLock`] per slot guards the slot's *content* (its type
//!   and, for directories, its entries) and implements the read/write
//!   locking protocol that [`crate::path`] drives while walking a path.
//!
//! `delete` takes the content lock only briefly, to reset the slot to
//! `Free`, then clears the atomic flag. Callers that have already locked a
//! slot for reading as part of path resolution are not required to hold
//! that lock across the call to `delete` — the table's own brief internal
//! lock is enough to make the reset atomic with respect to other `create`s
//! racing for the same slot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::TableError;

/// Number of inodes the table can hold at once. Chosen to comfortably cover
/// the test scenarios in spec.md §8 without wasting memory; raise it if a
/// deployment needs a bigger namespace.
pub const INODE_TABLE_SIZE: usize = 64;

/// Maximum number of entries a single directory can hold.
pub const MAX_DIR_ENTRIES: usize = 32;

/// Maximum length, in bytes, of a single path component.
pub const MAX_FILE_NAME: usize = 40;

/// Upper bound on the number of inodes a single operation may lock at once.
/// `move` on two branches of depth up to `INODE_TABLE_SIZE` is the worst
/// case; this is generous headroom over that.
pub const MAXIMUM_LOCKED_INODES: usize = 64;

/// The inumber of the filesystem root. Always a directory, never freed.
pub const FS_ROOT: Inumber = 0;

/// An inode number: an index into the table.
pub type Inumber = u32;

/// A single directory entry: a name paired with the inumber it names. Free
/// slots within a directory's entry array are represented by `inumber ==
/// None` rather than a sentinel value, since nothing here needs to survive
/// serialization to disk.
#[derive(Debug, Clone)]
pub struct DirEntry {
    pub name: String,
    pub inumber: Option<Inumber>,
}

impl DirEntry {
    fn free() -> Self {
        DirEntry {
            name: String::new(),
            inumber: None,
        }
    }

    /// Whether this slot in the directory's entry array is occupied.
    pub fn is_used(&self) -> bool {
        self.inumber.is_some()
    }
}

/// The type-specific payload of an occupied slot.
#[derive(Debug, Clone)]
pub enum Payload {
    File,
    Directory(Vec<DirEntry>),
}

impl Payload {
    fn new_directory() -> Self {
        Payload::Directory(vec![DirEntry::free(); MAX_DIR_ENTRIES])
    }
}

/// What kind of inode to allocate in [`InodeTable::create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeType {
    File,
    Directory,
}

enum SlotState {
    Free,
    Occupied(Payload),
}

struct Slot {
    in_use: AtomicBool,
    content: RwLock<SlotState>,
}

impl Slot {
    fn free() -> Self {
        Slot {
            in_use: AtomicBool::new(false),
            content: RwLock::new(SlotState::Free),
        }
    }
}

/// A read or write guard over an occupied slot's content, borrowed from the
/// table for the duration of a path-resolution step.
pub enum SlotGuard<'a> {
    Read(RwLockReadGuard<'a, SlotState>),
    Write(RwLockWriteGuard<'a, SlotState>),
}

impl<'a> SlotGuard<'a> {
    /// The inode's type and, for directories, its entries.
    pub fn payload(&self) -> &Payload {
        let state = match self {
            SlotGuard::Read(g) => &**g,
            SlotGuard::Write(g) => &**g,
        };
        match state {
            SlotState::Occupied(p) => p,
            SlotState::Free => unreachable!("locked slot is never free"),
        }
    }

    /// Mutable access to the payload. Only available through a write guard.
    pub fn payload_mut(&mut self) -> &mut Payload {
        match self {
            SlotGuard::Write(g) => match &mut **g {
                SlotState::Occupied(p) => p,
                SlotState::Free => unreachable!("locked slot is never free"),
            },
            SlotGuard::Read(_) => panic!("payload_mut called through a read guard"),
        }
    }

    pub fn inode_type(&self) -> InodeType {
        match self.payload() {
            Payload::File => InodeType::File,
            Payload::Directory(_) => InodeType::Directory,
        }
    }
}

/// The mode under which a slot is locked; determines whether the caller
/// gets shared or exclusive access to the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Read,
    Write,
}

/// A fixed-size, concurrently accessible table of inodes.
pub struct InodeTable {
    slots: Vec<Slot>,
}

impl InodeTable {
    /// Build a fresh table with an empty root directory at [`FS_ROOT`].
    pub fn new() -> Self {
        let slots: Vec<Slot> = (0..INODE_TABLE_SIZE).map(|_| Slot::free()).collect();
        let table = InodeTable { slots };
        table.slots[FS_ROOT as usize]
            .in_use
            .store(true, Ordering::SeqCst);
        *table.slots[FS_ROOT as usize].content.write().unwrap() =
            SlotState::Occupied(Payload::new_directory());
        table
    }

    fn slot(&self, inumber: Inumber) -> Result<&Slot, TableError> {
        self.slots
            .get(inumber as usize)
            .ok_or(TableError::OutOfRange(inumber))
    }

    /// Claim a free slot and initialize it as the given type. Returns
    /// [`TableError::Full`] if every slot is occupied.
    pub fn create(&self, kind: InodeType) -> Result<Inumber, TableError> {
        for (i, slot) in self.slots.iter().enumerate() {
            if slot
                .in_use
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                let payload = match kind {
                    InodeType::File => Payload::File,
                    InodeType::Directory => Payload::new_directory(),
                };
                *slot.content.write().unwrap() = SlotState::Occupied(payload);
                return Ok(i as Inumber);
            }
        }
        Err(TableError::Full)
    }

    /// Reset a slot to free. The caller is responsible for having already
    /// detached the inode from its parent directory.
    pub fn delete(&self, inumber: Inumber) -> Result<(), TableError> {
        let slot = self.slot(inumber)?;
        if slot
            .in_use
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(TableError::AlreadyFree(inumber));
        }
        *slot.content.write().unwrap() = SlotState::Free;
        Ok(())
    }

    /// Acquire the slot's content lock in the given mode. Borrows the table
    /// for the lifetime of the guard, matching the usual `RwLock` shape.
    pub fn lock(&self, inumber: Inumber, mode: LockMode) -> Result<SlotGuard<'_>, TableError> {
        let slot = self.slot(inumber)?;
        Ok(match mode {
            LockMode::Read => SlotGuard::Read(slot.content.read().unwrap()),
            LockMode::Write => SlotGuard::Write(slot.content.write().unwrap()),
        })
    }

    /// Write `payload`'s subtree, indented, to `out`. `payload` is the
    /// caller's own already-open guard on the starting inode (normally
    /// [`FS_ROOT`], held for writing by [`crate::ops::Filesystem::print`])
    /// — this function never locks that slot itself, only the slots of
    /// entries it descends into, since `std::sync::RwLock` is not
    /// reentrant and re-locking a slot the caller already holds from the
    /// same thread would deadlock unconditionally. Every mutating path in
    /// [`crate::ops`] takes a lock on the root before descending, so a
    /// writer parked on the root blocks all of them, and the transient
    /// read locks taken here while descending can never contend with a
    /// concurrent mutation.
    pub fn print_tree(
        &self,
        payload: &Payload,
        prefix: &str,
        out: &mut dyn std::io::Write,
    ) -> std::io::Result<()> {
        if let Payload::Directory(entries) = payload {
            let children: Vec<(String, Inumber)> = entries
                .iter()
                .filter(|e| e.is_used())
                .map(|e| (e.name.clone(), e.inumber.unwrap()))
                .collect();
            for (name, child) in children {
                writeln!(out, "{}{}", prefix, name)?;
                let child_prefix = format!("{}{}/", prefix, name);
                let slot = match self.slot(child) {
                    Ok(s) => s,
                    Err(_) => continue,
                };
                let guard = slot.content.read().unwrap();
                let child_payload = match &*guard {
                    SlotState::Occupied(p) => p,
                    SlotState::Free => continue,
                };
                self.print_tree(child_payload, &child_prefix, out)?;
            }
        }
        Ok(())
    }
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_starts_as_empty_directory() {
        let table = InodeTable::new();
        let guard = table.lock(FS_ROOT, LockMode::Read).unwrap();
        assert_eq!(guard.inode_type(), InodeType::Directory);
        match guard.payload() {
            Payload::Directory(entries) => assert!(entries.iter().all(|e| !e.is_used())),
            Payload::File => panic!("root must be a directory"),
        }
    }

    #[test]
    fn create_then_delete_frees_the_slot() {
        let table = InodeTable::new();
        let inum = table.create(InodeType::File).unwrap();
        assert!(inum != FS_ROOT);
        table.delete(inum).unwrap();
        assert!(matches!(
            table.delete(inum),
            Err(TableError::AlreadyFree(_))
        ));
    }

    #[test]
    fn create_fails_once_table_is_full() {
        let table = InodeTable::new();
        let mut created = Vec::new();
        loop {
            match table.create(InodeType::File) {
                Ok(i) => created.push(i),
                Err(TableError::Full) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(created.len(), INODE_TABLE_SIZE - 1);
    }

    #[test]
    fn out_of_range_inumber_is_rejected() {
        let table = InodeTable::new();
        assert!(matches!(
            table.lock(INODE_TABLE_SIZE as Inumber, LockMode::Read),
            Err(TableError::OutOfRange(_))
        ));
    }
}
