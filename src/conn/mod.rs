//! Traits to perform in-order, serial, byte-wise I/O against a remote stub.

mod endpoint;
mod impls;

pub use self::endpoint::connect;
pub use self::endpoint::BoxedConnection;
pub use self::endpoint::CommandStdio;

/// A trait to perform in-order, serial, byte-wise I/O.
///
/// Implementations are provided for `BufReader`-wrapped `TcpStream`,
/// `UnixStream` and `File` (reads buffered, writes flushed through), and for
/// [`CommandStdio`], the stdio of a spawned shell command.
pub trait Connection {
    /// Transport-specific error type.
    type Error;

    /// Write a single byte.
    fn write(&mut self, byte: u8) -> Result<(), Self::Error>;

    /// Write the entire buffer, blocking until complete.
    ///
    /// This method's default implementation calls `self.write()` on each byte
    /// in the buffer. This can be quite inefficient, so if a more efficient
    /// implementation exists (such as calling `write_all()` on an underlying
    /// `std::io::Write` object), this method should be overwritten.
    fn write_all(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        for b in buf {
            self.write(*b)?;
        }
        Ok(())
    }

    /// Flush this Connection, ensuring that all intermediately buffered
    /// contents reach their destination.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Called once, before any packets have been exchanged.
    ///
    /// This method's default implementation is a no-op.
    ///
    /// The implementation for TCP transports enables `TCP_NODELAY`: the
    /// protocol is many small packets in both directions, and Nagle
    /// batching makes a stopped tracee visibly laggy.
    fn on_session_start(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Extends [`Connection`] with a blocking `read` method.
pub trait ConnectionExt: Connection {
    /// Read a single byte, blocking until one is available.
    fn read(&mut self) -> Result<u8, Self::Error>;
}
