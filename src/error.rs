use std::fmt;
use std::fmt::Display;
use std::io;

/// Which half of the transport an I/O error occurred on.
#[derive(Debug)]
pub enum ConnectionErrorKind {
    /// Error opening the endpoint.
    Open,
    /// Error reading data.
    Read,
    /// Error writing data.
    Write,
}

/// An error which may occur while talking to a remote stub.
///
/// Most variants are fatal: the wire is in an unknown state and the session
/// cannot continue. Data-plane failures (an `E..` reply to a memory or file
/// request, or a reply the client cannot decode) are not; callers can test
/// with [`Error::is_fatal`] and carry on after the non-fatal ones.
#[derive(Debug)]
pub enum Error {
    /// Transport I/O failure.
    Connection(io::Error, ConnectionErrorKind),
    /// The remote closed the connection.
    ClosedByRemote,
    /// A `%`-packet arrived whose payload does not begin with `Stop:`.
    UnknownNotification([u8; 5]),
    /// The remote sent an empty stop reply.
    EmptyStopReply,
    /// The remote sent a stop reply the client cannot classify.
    UnknownStopReply(String),
    /// A stop reply did not carry a usable thread id.
    UnknownThread(String),
    /// The remote lacks a capability required by the requested operation.
    MissingCapability(&'static str),
    /// The remote answered a command with an error or an empty reply.
    CommandFailed {
        /// The command that failed.
        command: &'static str,
        /// The remote's reply, lossily decoded.
        reply: String,
    },
    /// The remote answered a process-control command with the wrong stop.
    UnexpectedStop {
        /// The command that was answered.
        command: &'static str,
        /// The remote's reply, lossily decoded.
        reply: String,
    },
    /// An `E..` reply to a data-plane request. Not fatal.
    Remote(u32),
    /// A data-plane reply that could not be decoded. Not fatal.
    MalformedReply(&'static str),
}

impl Error {
    pub(crate) fn conn_open(e: io::Error) -> Self {
        Error::Connection(e, ConnectionErrorKind::Open)
    }

    pub(crate) fn conn_read(e: io::Error) -> Self {
        Error::Connection(e, ConnectionErrorKind::Read)
    }

    pub(crate) fn conn_write(e: io::Error) -> Self {
        Error::Connection(e, ConnectionErrorKind::Write)
    }

    /// Whether the session is unusable after this error.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Remote(_) | Error::MalformedReply(_))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use self::Error::*;
        match self {
            Connection(e, ConnectionErrorKind::Open) => {
                write!(f, "connection error while opening the endpoint: {}", e)
            }
            Connection(e, ConnectionErrorKind::Read) => {
                write!(f, "connection error while reading a packet: {}", e)
            }
            Connection(e, ConnectionErrorKind::Write) => {
                write!(f, "connection error while writing a packet: {}", e)
            }
            ClosedByRemote => write!(f, "remote closed the connection"),
            UnknownNotification(prefix) => write!(
                f,
                "unknown notification packet: %{}...",
                String::from_utf8_lossy(prefix)
            ),
            EmptyStopReply => write!(f, "remote sent an empty stop reply"),
            UnknownStopReply(reply) => write!(f, "remote stop reply unknown: {}", reply),
            UnknownThread(reply) => {
                write!(f, "couldn't read a thread id from stop reply: {}", reply)
            }
            MissingCapability(what) => write!(f, "{}", what),
            CommandFailed { command, reply } => {
                write!(f, "remote failed {} with {:?}", command, reply)
            }
            UnexpectedStop { command, reply } => {
                write!(f, "remote answered {} with an unexpected stop: {}", command, reply)
            }
            Remote(code) => write!(f, "remote replied with error code {:#x}", code),
            MalformedReply(op) => write!(f, "malformed reply to {}", op),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e, _) => Some(e),
            _ => None,
        }
    }
}
