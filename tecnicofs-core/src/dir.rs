//! Directory entry manipulation: everything that reads or writes a
//! directory's entry array. These functions take the already-locked
//! [`Payload`] directly; callers in [`crate::path`] and [`crate::ops`] are
//! responsible for holding the right lock mode first.

use crate::error::DirError;
use crate::table::{DirEntry, Inumber, Payload, MAX_FILE_NAME};

/// A path component name must be non-empty, at most [`MAX_FILE_NAME`]
/// bytes, and must not contain `/`.
pub fn valid_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= MAX_FILE_NAME && !name.contains('/')
}

/// Find the inumber an entry named `name` points to, if any.
pub fn lookup_sub_node(payload: &Payload, name: &str) -> Option<Inumber> {
    let entries = as_entries(payload)?;
    entries
        .iter()
        .find(|e| e.is_used() && e.name == name)
        .and_then(|e| e.inumber)
}

/// Link `name -> inumber` into a directory's entry array.
///
/// Fails if `payload` is not a directory, `name` is invalid, an entry with
/// the same name already exists, or the directory has no free entry slots.
pub fn dir_add_entry(payload: &mut Payload, name: &str, inumber: Inumber) -> Result<(), DirError> {
    if !valid_name(name) {
        return Err(DirError::InvalidName(name.to_string()));
    }
    let entries = as_entries_mut(payload);
    if entries.iter().any(|e| e.is_used() && e.name == name) {
        // Caller (ops::create) turns this into OpError::AlreadyExists with
        // the full path attached; here we only know the component name.
        return Err(DirError::InvalidName(format!("{name} (duplicate)")));
    }
    let slot = entries
        .iter_mut()
        .find(|e| !e.is_used())
        .ok_or(DirError::DirectoryFull)?;
    slot.name = name.to_string();
    slot.inumber = Some(inumber);
    Ok(())
}

/// Remove the entry pointing at `inumber` from a directory's entry array.
pub fn dir_reset_entry(payload: &mut Payload, inumber: Inumber) -> Result<(), DirError> {
    let entries = as_entries_mut(payload);
    let slot = entries
        .iter_mut()
        .find(|e| e.is_used() && e.inumber == Some(inumber))
        .ok_or(DirError::EntryNotFound(inumber))?;
    *slot = DirEntry {
        name: String::new(),
        inumber: None,
    };
    Ok(())
}

/// Whether a directory has zero occupied entries. A non-directory payload
/// counts as empty, since callers only ask this of things already known to
/// be directories.
pub fn is_dir_empty(payload: &Payload) -> bool {
    match as_entries(payload) {
        Some(entries) => entries.iter().all(|e| !e.is_used()),
        None => true,
    }
}

fn as_entries(payload: &Payload) -> Option<&[DirEntry]> {
    match payload {
        Payload::Directory(entries) => Some(entries),
        Payload::File => None,
    }
}

fn as_entries_mut(payload: &mut Payload) -> &mut [DirEntry] {
    match payload {
        Payload::Directory(entries) => entries,
        Payload::File => unreachable!("dir_add_entry/dir_reset_entry called on a file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::InodeType;

    fn new_dir() -> Payload {
        Payload::Directory(vec![
            DirEntry {
                name: String::new(),
                inumber: None
            };
            4
        ])
    }

    #[test]
    fn add_then_lookup_round_trips() {
        let mut dir = new_dir();
        dir_add_entry(&mut dir, "a.txt", 7).unwrap();
        assert_eq!(lookup_sub_node(&dir, "a.txt"), Some(7));
        assert_eq!(lookup_sub_node(&dir, "missing"), None);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut dir = new_dir();
        dir_add_entry(&mut dir, "a.txt", 7).unwrap();
        assert!(dir_add_entry(&mut dir, "a.txt", 9).is_err());
    }

    #[test]
    fn full_directory_is_rejected() {
        let mut dir = new_dir();
        for i in 0..4 {
            dir_add_entry(&mut dir, &format!("f{i}"), i as Inumber).unwrap();
        }
        assert!(matches!(
            dir_add_entry(&mut dir, "one-more", 99),
            Err(DirError::DirectoryFull)
        ));
    }

    #[test]
    fn reset_entry_frees_the_slot() {
        let mut dir = new_dir();
        dir_add_entry(&mut dir, "a.txt", 7).unwrap();
        dir_reset_entry(&mut dir, 7).unwrap();
        assert_eq!(lookup_sub_node(&dir, "a.txt"), None);
        assert!(is_dir_empty(&dir));
    }

    #[test]
    fn file_payload_has_no_entries() {
        let file = Payload::File;
        assert_eq!(lookup_sub_node(&file, "x"), None);
        assert!(is_dir_empty(&file));
        let _ = InodeType::File;
    }
}
