//! Server half of TecnicoFS: CLI argument handling, socket setup, and the
//! fixed-size worker pool that drains it. The actual filesystem lives in
//! `tecnicofs-core`; this crate's only job is to get decoded commands to
//! it and encoded replies back out.

use std::os::unix::net::UnixDatagram;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tecnicofs_core::error::{as_code, FAIL};
use tecnicofs_core::wire::{self, Command};
use tecnicofs_core::Filesystem;

/// Longest datagram this server will accept. Comfortably covers two full
/// paths plus a command code, per spec's component-count and name-length
/// limits.
const MAX_DATAGRAM: usize = 2 * (tecnicofs_core::MAX_FILE_NAME + 1) * 32 + 16;

/// Command-line arguments for the `tecnicofs-server` binary.
#[derive(Parser, Debug)]
#[command(name = "tecnicofs-server", about = "In-memory filesystem server")]
pub struct Args {
    /// Path of the Unix datagram socket to bind and serve on.
    #[arg(short, long)]
    pub socket: PathBuf,

    /// Number of worker threads draining the socket.
    #[arg(short, long, default_value_t = 4)]
    pub threads: usize,
}

/// Bind `args.socket` and serve until every worker thread exits (which, in
/// practice, only happens on an unrecoverable socket error — this function
/// does not return under ordinary operation).
pub fn run(args: Args) -> Result<()> {
    if args.threads == 0 {
        bail!("--threads must be at least 1");
    }
    if args.socket.exists() {
        std::fs::remove_file(&args.socket)
            .with_context(|| format!("removing stale socket at {:?}", args.socket))?;
    }
    let socket = UnixDatagram::bind(&args.socket)
        .with_context(|| format!("binding socket at {:?}", args.socket))?;
    let socket = Arc::new(socket);
    let fs = Arc::new(Filesystem::new());

    tracing::info!(socket = ?args.socket, threads = args.threads, "tecnicofs-server listening");

    let handles: Vec<_> = (0..args.threads)
        .map(|id| {
            let socket = Arc::clone(&socket);
            let fs = Arc::clone(&fs);
            thread::spawn(move || worker_loop(id, socket, fs))
        })
        .collect();

    for handle in handles {
        if handle.join().is_err() {
            tracing::error!("a worker thread panicked");
        }
    }
    Ok(())
}

/// One worker's receive-decode-dispatch-reply loop. Every iteration uses a
/// fresh, zeroed buffer: the stale-buffer bug in the C original's
/// equivalent loop (where a shorter command could leave trailing bytes
/// from a longer previous one in a reused buffer) has no counterpart here.
fn worker_loop(id: usize, socket: Arc<UnixDatagram>, fs: Arc<Filesystem>) {
    loop {
        let mut buf = [0u8; MAX_DATAGRAM];
        let (len, peer) = match socket.recv_from(&mut buf) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!(worker = id, error = %e, "recv_from failed");
                continue;
            }
        };
        let reply = match wire::parse_command(&buf[..len]) {
            Ok(cmd) => {
                tracing::debug!(worker = id, ?cmd, "dispatching command");
                dispatch(&fs, cmd)
            }
            Err(e) => {
                tracing::warn!(worker = id, error = %e, "malformed command");
                FAIL
            }
        };
        if let Some(path) = peer.as_pathname() {
            if let Err(e) = socket.send_to(&wire::encode_reply(reply), path) {
                tracing::warn!(worker = id, error = %e, "failed to reply to client");
            }
        } else {
            tracing::warn!(worker = id, "client datagram carried no reply address");
        }
    }
}

/// Apply one decoded command to the filesystem and collapse the result to
/// a wire reply code.
fn dispatch(fs: &Filesystem, cmd: Command) -> i32 {
    match cmd {
        Command::Create { path, kind } => as_code(&fs.create(&path, kind)),
        Command::Delete { path } => as_code(&fs.delete(&path)),
        Command::Lookup { path } => match fs.lookup(&path) {
            Ok(Some(inumber)) => inumber as i32,
            Ok(None) => FAIL,
            Err(_) => FAIL,
        },
        Command::Move { from, to } => as_code(&fs.move_(&from, &to)),
        Command::Print { out_path } => print_to_file(fs, &out_path),
    }
}

fn print_to_file(fs: &Filesystem, out_path: &str) -> i32 {
    match std::fs::File::create(out_path) {
        Ok(mut file) => as_code(&fs.print(&mut file)),
        Err(e) => {
            tracing::warn!(path = out_path, error = %e, "could not create print output file");
            FAIL
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tecnicofs_core::InodeType;

    #[test]
    fn dispatch_create_then_lookup() {
        let fs = Filesystem::new();
        assert_eq!(
            dispatch(
                &fs,
                Command::Create {
                    path: "/a.txt".to_string(),
                    kind: InodeType::File,
                }
            ),
            0
        );
        assert_eq!(
            dispatch(
                &fs,
                Command::Lookup {
                    path: "/a.txt".to_string(),
                }
            ),
            0
        );
    }

    #[test]
    fn dispatch_lookup_miss_reports_fail() {
        let fs = Filesystem::new();
        assert_eq!(
            dispatch(
                &fs,
                Command::Lookup {
                    path: "/missing".to_string(),
                }
            ),
            FAIL
        );
    }
}
