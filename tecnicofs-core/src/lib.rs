//! In-memory hierarchical filesystem core.
//!
//! This crate has no knowledge of sockets, threads, or the wire format a
//! server speaks over them — it is the part of TecnicoFS that would stay
//! identical whether the transport were a Unix datagram socket, an
//! in-process API, or a test harness calling [`ops::Filesystem`] directly.
//! `tecnicofs-server` and `tecnicofs-client` both depend on it: the server
//! for the actual filesystem and the wire vocabulary, the client for the
//! wire vocabulary alone.

pub mod dir;
pub mod error;
pub mod ops;
pub mod path;
pub mod table;
pub mod wire;

pub use error::OpError;
pub use ops::Filesystem;
pub use table::{InodeType, Inumber, FS_ROOT, MAX_DIR_ENTRIES, MAX_FILE_NAME};
