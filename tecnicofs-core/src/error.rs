//! Layered error types for the filesystem core.
//!
//! Each layer defines its own error enum and wraps the layer below it with
//! `#[from]`, following the same chain the rest of this workspace's sibling
//! crates use internally: a failure deep in the inode table surfaces, with
//! its original cause still attached, all the way up through directory
//! operations, path resolution, and the five filesystem operations. None of
//! this detail crosses the wire — see [`crate::wire`] for the flattened
//! `SUCCESS`/`FAIL` reply clients actually see.

use thiserror::Error;

/// Errors raised by the inode table itself: allocation, bounds, and the
/// free/in-use bookkeeping around a slot.
#[derive(Error, Debug)]
pub enum TableError {
    /// No free slot was available to satisfy `create`.
    #[error("inode table is full")]
    Full,
    /// The inumber does not name a slot in the table.
    #[error("inumber {0} is out of range")]
    OutOfRange(u32),
    /// `delete` was called on a slot that was already free.
    #[error("inode {0} is already free")]
    AlreadyFree(u32),
}

/// Errors raised by directory entry manipulation.
#[derive(Error, Debug)]
pub enum DirError {
    /// Propagated from the inode table.
    #[error(transparent)]
    Table(#[from] TableError),
    /// `name` was empty or longer than `MAX_FILE_NAME`.
    #[error("invalid entry name: {0}")]
    InvalidName(String),
    /// No free entry slot remained in the directory.
    #[error("directory has no free entry slots")]
    DirectoryFull,
    /// `dir_reset_entry` could not find an entry for the given child.
    #[error("no entry for inode {0} in this directory")]
    EntryNotFound(u32),
}

/// Errors raised while walking a path.
#[derive(Error, Debug)]
pub enum PathError {
    /// Propagated from directory operations encountered along the walk.
    #[error(transparent)]
    Dir(#[from] DirError),
    /// A path component did not resolve to an existing entry.
    #[error("path component not found: {0}")]
    ComponentMissing(String),
    /// An intermediate component resolved to a file, not a directory.
    #[error("{0} is not a directory")]
    NotADirectory(String),
    /// The full path string exceeded `MAX_FILE_NAME` bytes.
    #[error("path longer than MAX_FILE_NAME: {0}")]
    PathTooLong(String),
}

/// Errors raised by the five filesystem operations. This is the error type
/// most callers of `tecnicofs-core` interact with directly.
#[derive(Error, Debug)]
pub enum OpError {
    /// Propagated from path resolution.
    #[error(transparent)]
    Path(#[from] PathError),
    /// Propagated from directory operations performed after a successful
    /// resolution (e.g. a racing `dir_add_entry` failure).
    #[error(transparent)]
    Dir(#[from] DirError),
    /// Propagated from the inode table (e.g. table full on `create`).
    #[error(transparent)]
    Table(#[from] TableError),
    /// `create` targeted a path that already exists.
    #[error("{0} already exists")]
    AlreadyExists(String),
    /// `delete` targeted a non-empty directory.
    #[error("{0} is not empty")]
    NotEmpty(String),
    /// An operation's parent path component is not a directory.
    #[error("{0} is not a directory")]
    NotADirectory(String),
    /// `delete`/`move` targeted the root.
    #[error("the root cannot be deleted or moved")]
    RootImmutable,
    /// `move` would nest a directory inside itself.
    #[error("cannot move {0} inside itself")]
    MoveCycle(String),
    /// A path was empty, or a name in it failed validation.
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// Anything else that should still surface as `FAIL` to a client but
    /// does not deserve a dedicated variant.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Shorthand used throughout `tecnicofs-core`.
pub type Result<T, E = OpError> = std::result::Result<T, E>;

/// The wire-facing result code: `0` for success, `-1` for failure, matching
/// spec.md §7's taxonomy. `lookup` uses the richer [`crate::ops::lookup`]
/// signature instead, since it needs to return the found inumber.
pub const SUCCESS: i32 = 0;
/// See [`SUCCESS`].
pub const FAIL: i32 = -1;

/// Collapse any `tecnicofs-core` result into the wire result code.
pub fn as_code<T>(r: &Result<T>) -> i32 {
    match r {
        Ok(_) => SUCCESS,
        Err(_) => FAIL,
    }
}
