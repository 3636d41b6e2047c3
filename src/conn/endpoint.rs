//! Opening the three endpoint forms a remote stub can live behind: a TCP
//! `host:port`, a filesystem path (serial device, FIFO), or the stdio of a
//! spawned shell command.

use std::fs::OpenOptions;
use std::io;
use std::io::BufReader;
use std::net::SocketAddr;
use std::net::TcpStream;
use std::net::ToSocketAddrs;
use std::os::fd::OwnedFd;
use std::os::unix::net::UnixStream;
use std::process::Child;
use std::process::Command;
use std::process::Stdio;

use nix::sys::signal::signal;
use nix::sys::signal::SigHandler;
use nix::sys::signal::Signal;

use crate::conn::Connection;
use crate::conn::ConnectionExt;

/// An owned, type-erased transport to the remote stub.
pub type BoxedConnection = Box<dyn ConnectionExt<Error = io::Error>>;

/// Open a transport to the stub named by `endpoint`:
///
/// - `|<command>` spawns `<command>` under `/bin/sh -c` with its stdio bound
///   to our end of a socket pair;
/// - `<host>:<port>` (a `:` and no `/`) connects over TCP, IPv4 only;
/// - anything else is opened read/write as a filesystem path.
pub fn connect(endpoint: &str) -> io::Result<BoxedConnection> {
    if let Some(command) = endpoint.strip_prefix('|') {
        connect_command(command)
    } else if endpoint.contains(':') && !endpoint.contains('/') {
        connect_tcp(endpoint)
    } else {
        connect_path(endpoint)
    }
}

fn connect_tcp(endpoint: &str) -> io::Result<BoxedConnection> {
    let addr = endpoint
        .to_socket_addrs()?
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("no IPv4 address for {}", endpoint),
            )
        })?;
    let stream = TcpStream::connect(addr)?;
    Ok(Box::new(BufReader::new(stream)))
}

fn connect_path(path: &str) -> io::Result<BoxedConnection> {
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    Ok(Box::new(BufReader::new(file)))
}

fn connect_command(command: &str) -> io::Result<BoxedConnection> {
    // A bidirectional "pipe": one end for us, one for the command's stdio.
    let (ours, theirs) = UnixStream::pair()?;
    let child = Command::new("/bin/sh")
        .arg("-c")
        .arg(command)
        .stdin(Stdio::from(OwnedFd::from(theirs.try_clone()?)))
        .stdout(Stdio::from(OwnedFd::from(theirs)))
        .spawn()?;

    // The command quitting mid-write must not take the tracer down with it.
    unsafe { signal(Signal::SIGPIPE, SigHandler::SigIgn) }
        .map_err(|errno| io::Error::from_raw_os_error(errno as i32))?;

    Ok(Box::new(CommandStdio {
        stream: BufReader::new(ours),
        child,
    }))
}

/// Transport over the stdin/stdout of a spawned shell command.
///
/// The child is deliberately never killed or waited on: closing our socket
/// end at session teardown gives it EOF, and it is expected to exit on its
/// own, exactly as if the user had run it in a pipeline.
pub struct CommandStdio {
    stream: BufReader<UnixStream>,
    #[allow(dead_code)]
    child: Child,
}

impl Connection for CommandStdio {
    type Error = io::Error;

    fn write(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.stream.write(byte)
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        Connection::write_all(&mut self.stream, buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Connection::flush(&mut self.stream)
    }
}

impl ConnectionExt for CommandStdio {
    fn read(&mut self) -> Result<u8, Self::Error> {
        self.stream.read()
    }
}
