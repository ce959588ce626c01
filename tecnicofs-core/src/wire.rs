//! The wire vocabulary shared by `tecnicofs-server` and `tecnicofs-client`:
//! null-terminated ASCII command lines going one way, null-terminated
//! decimal ASCII reply codes going the other. Neither side needs to agree
//! on anything more elaborate than that, which keeps a `Command` just as
//! easy to build from a CLI argument as to decode off a socket.
//!
//! Commands:
//!
//! ```text
//! c <path> <f|d>     create a file (f) or directory (d) at <path>
//! d <path>            delete the file or empty directory at <path>
//! l <path>            look up <path>, replying with its inumber
//! m <from> <to>       move the entry at <from> to <to>
//! p <out path>        print the whole tree to a file on the server's disk
//! ```
//!
//! Replies are always a single decimal integer: `0` for success, `-1` for
//! failure, or a non-negative inumber in response to a successful `l`.

use thiserror::Error;

use crate::table::InodeType;

/// A decoded request. The wire-level type is intentionally bare — it is
/// [`crate::ops::Filesystem`]'s job to give these meaning, not this
/// module's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create { path: String, kind: InodeType },
    Delete { path: String },
    Lookup { path: String },
    Move { from: String, to: String },
    Print { out_path: String },
}

/// Something went wrong turning bytes into a [`Command`] or back.
#[derive(Error, Debug)]
pub enum WireError {
    #[error("empty command")]
    Empty,
    #[error("unknown command code: {0:?}")]
    UnknownCode(char),
    #[error("command {0} expects {1} argument(s)")]
    WrongArity(char, usize),
    #[error("invalid inode type: {0:?}, expected 'f' or 'd'")]
    InvalidType(char),
    #[error("command bytes are not valid UTF-8")]
    NotUtf8,
    #[error("reply is not a valid integer: {0}")]
    InvalidReply(String),
}

/// Decode a null-terminated (or otherwise terminated) command line. Any
/// trailing `\0` is trimmed before splitting on whitespace, matching the
/// fixed-size receive buffers both ends of the wire use.
pub fn parse_command(buf: &[u8]) -> Result<Command, WireError> {
    let text = std::str::from_utf8(buf).map_err(|_| WireError::NotUtf8)?;
    let text = text.trim_end_matches('\0').trim();
    let mut parts = text.split_whitespace();
    let code = parts.next().ok_or(WireError::Empty)?;
    let mut code_chars = code.chars();
    let code = code_chars.next().ok_or(WireError::Empty)?;
    if code_chars.next().is_some() {
        return Err(WireError::UnknownCode(code));
    }
    let rest: Vec<&str> = parts.collect();
    match code {
        'c' => {
            if rest.len() != 2 {
                return Err(WireError::WrongArity('c', 2));
            }
            let kind = match rest[1].chars().next() {
                Some('f') => InodeType::File,
                Some('d') => InodeType::Directory,
                other => return Err(WireError::InvalidType(other.unwrap_or('?'))),
            };
            Ok(Command::Create {
                path: rest[0].to_string(),
                kind,
            })
        }
        'd' => {
            if rest.len() != 1 {
                return Err(WireError::WrongArity('d', 1));
            }
            Ok(Command::Delete {
                path: rest[0].to_string(),
            })
        }
        'l' => {
            if rest.len() != 1 {
                return Err(WireError::WrongArity('l', 1));
            }
            Ok(Command::Lookup {
                path: rest[0].to_string(),
            })
        }
        'm' => {
            if rest.len() != 2 {
                return Err(WireError::WrongArity('m', 2));
            }
            Ok(Command::Move {
                from: rest[0].to_string(),
                to: rest[1].to_string(),
            })
        }
        'p' => {
            if rest.len() != 1 {
                return Err(WireError::WrongArity('p', 1));
            }
            Ok(Command::Print {
                out_path: rest[0].to_string(),
            })
        }
        other => Err(WireError::UnknownCode(other)),
    }
}

/// Encode a [`Command`] as a null-terminated line, ready to hand to
/// `UnixDatagram::send`.
pub fn encode_command(cmd: &Command) -> Vec<u8> {
    let mut line = match cmd {
        Command::Create { path, kind } => {
            let t = match kind {
                InodeType::File => 'f',
                InodeType::Directory => 'd',
            };
            format!("c {path} {t}")
        }
        Command::Delete { path } => format!("d {path}"),
        Command::Lookup { path } => format!("l {path}"),
        Command::Move { from, to } => format!("m {from} {to}"),
        Command::Print { out_path } => format!("p {out_path}"),
    };
    line.push('\0');
    line.into_bytes()
}

/// Encode a reply code as a null-terminated decimal string.
pub fn encode_reply(code: i32) -> Vec<u8> {
    let mut s = code.to_string();
    s.push('\0');
    s.into_bytes()
}

/// Decode a reply previously produced by [`encode_reply`].
pub fn parse_reply(buf: &[u8]) -> Result<i32, WireError> {
    let text = std::str::from_utf8(buf).map_err(|_| WireError::NotUtf8)?;
    let text = text.trim_end_matches('\0').trim();
    text.parse::<i32>()
        .map_err(|_| WireError::InvalidReply(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_round_trips() {
        let cmd = Command::Create {
            path: "/a.txt".to_string(),
            kind: InodeType::File,
        };
        let bytes = encode_command(&cmd);
        assert_eq!(parse_command(&bytes).unwrap(), cmd);
    }

    #[test]
    fn move_round_trips() {
        let cmd = Command::Move {
            from: "/a".to_string(),
            to: "/b/a".to_string(),
        };
        let bytes = encode_command(&cmd);
        assert_eq!(parse_command(&bytes).unwrap(), cmd);
    }

    #[test]
    fn unknown_command_code_is_rejected() {
        assert!(matches!(
            parse_command(b"x /a\0"),
            Err(WireError::UnknownCode('x'))
        ));
    }

    #[test]
    fn wrong_arity_is_rejected() {
        assert!(matches!(
            parse_command(b"d /a /b\0"),
            Err(WireError::WrongArity('d', 1))
        ));
    }

    #[test]
    fn reply_round_trips() {
        assert_eq!(parse_reply(&encode_reply(0)).unwrap(), 0);
        assert_eq!(parse_reply(&encode_reply(-1)).unwrap(), -1);
        assert_eq!(parse_reply(&encode_reply(42)).unwrap(), 42);
    }
}
