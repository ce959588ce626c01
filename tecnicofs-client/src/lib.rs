//! Client library for TecnicoFS: a thin `UnixDatagram` wrapper that speaks
//! the same wire vocabulary the server decodes, plus one method per
//! filesystem operation.
//!
//! A [`Client`] owns an ephemeral socket of its own, bound to a unique
//! path under the system temp directory and connected to the server's
//! socket, mirroring the C original's `tfsMount`/`createClientSocket`
//! pair. The temp socket is removed on `unmount` or, if the caller never
//! calls it, on drop.

use std::os::unix::net::UnixDatagram;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use tecnicofs_core::error::FAIL;
use tecnicofs_core::table::Inumber;
use tecnicofs_core::wire::{self, Command, WireError};
use tecnicofs_core::InodeType;

/// Longest reply a server will ever send back: a decimal `i32` plus its
/// terminator comfortably fits in far less than this.
const REPLY_BUF: usize = 32;

/// Everything that can go wrong talking to a mounted server.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed reply: {0}")]
    Wire(#[from] WireError),
    /// The server reported failure (wire code `-1`) for an operation whose
    /// contract allows only success or failure.
    #[error("{0} failed")]
    OperationFailed(&'static str),
}

static CLIENT_COUNTER: AtomicU64 = AtomicU64::new(0);

fn ephemeral_socket_path() -> PathBuf {
    let nonce = CLIENT_COUNTER.fetch_add(1, Ordering::Relaxed);
    let pid = std::process::id();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!("tecnicofs-client-{pid}-{nonce}-{nanos}.socket"))
}

/// A mounted connection to a TecnicoFS server.
pub struct Client {
    socket: UnixDatagram,
    socket_path: PathBuf,
}

impl Client {
    /// Bind an ephemeral socket and connect it to the server listening at
    /// `server_socket`.
    pub fn mount(server_socket: impl AsRef<Path>) -> Result<Self, ClientError> {
        let socket_path = ephemeral_socket_path();
        let socket = UnixDatagram::bind(&socket_path)?;
        socket.connect(server_socket.as_ref())?;
        Ok(Client {
            socket,
            socket_path,
        })
    }

    fn roundtrip(&self, cmd: Command) -> Result<i32, ClientError> {
        let request = wire::encode_command(&cmd);
        self.socket.send(&request)?;
        let mut buf = [0u8; REPLY_BUF];
        let n = self.socket.recv(&mut buf)?;
        Ok(wire::parse_reply(&buf[..n])?)
    }

    /// Create a file or directory at `path`.
    pub fn create(&self, path: &str, kind: InodeType) -> Result<(), ClientError> {
        let code = self.roundtrip(Command::Create {
            path: path.to_string(),
            kind,
        })?;
        require_success(code, "create")
    }

    /// Delete the file or empty directory at `path`.
    pub fn delete(&self, path: &str) -> Result<(), ClientError> {
        let code = self.roundtrip(Command::Delete {
            path: path.to_string(),
        })?;
        require_success(code, "delete")
    }

    /// Look up `path`, returning its inumber if it exists.
    pub fn lookup(&self, path: &str) -> Result<Option<Inumber>, ClientError> {
        let code = self.roundtrip(Command::Lookup {
            path: path.to_string(),
        })?;
        if code == FAIL {
            Ok(None)
        } else {
            Ok(Some(code as Inumber))
        }
    }

    /// Move the entry at `from` to `to`.
    pub fn move_(&self, from: &str, to: &str) -> Result<(), ClientError> {
        let code = self.roundtrip(Command::Move {
            from: from.to_string(),
            to: to.to_string(),
        })?;
        require_success(code, "move")
    }

    /// Ask the server to write its whole tree to `out_path` on the
    /// server's own filesystem.
    pub fn print(&self, out_path: &str) -> Result<(), ClientError> {
        let code = self.roundtrip(Command::Print {
            out_path: out_path.to_string(),
        })?;
        require_success(code, "print")
    }

    /// Release the ephemeral socket. Equivalent to dropping the client,
    /// spelled out for callers who want the unmount to be explicit.
    pub fn unmount(self) -> Result<(), ClientError> {
        Ok(())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

fn require_success(code: i32, op: &'static str) -> Result<(), ClientError> {
    if code == FAIL {
        Err(ClientError::OperationFailed(op))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ephemeral_paths_are_unique() {
        let a = ephemeral_socket_path();
        let b = ephemeral_socket_path();
        assert_ne!(a, b);
    }
}
