use log::trace;

use crate::client::notifications::NotificationQueue;
use crate::conn;
use crate::conn::BoxedConnection;
use crate::conn::Connection;
use crate::error::Error;
use crate::protocol::frame;

/// One protocol session: the transport plus the wire-level state that
/// changes over its lifetime (ack mode, non-stop mode, and the queue of
/// deferred stop notifications).
///
/// Exactly one request is outstanding at a time; every `send` is paired
/// with the `recv` of its reply by the caller. Dropping the session closes
/// the transport.
pub struct GdbSession {
    conn: BoxedConnection,
    ack: bool,
    non_stop: bool,
    notifications: NotificationQueue,
}

impl GdbSession {
    /// Open a transport to `endpoint` (see [`crate::conn::connect`] for the
    /// accepted forms).
    pub fn open(endpoint: &str) -> Result<GdbSession, Error> {
        let conn = conn::connect(endpoint).map_err(Error::conn_open)?;
        GdbSession::from_connection(conn)
    }

    /// Wrap an already-open transport, priming the remote's line discipline
    /// by acking any earlier input.
    pub fn from_connection(mut conn: BoxedConnection) -> Result<GdbSession, Error> {
        conn.on_session_start().map_err(Error::conn_open)?;

        conn.write(b'+').map_err(Error::conn_write)?;
        conn.flush().map_err(Error::conn_write)?;

        Ok(GdbSession {
            conn,
            ack: true,
            non_stop: false,
            notifications: NotificationQueue::new(),
        })
    }

    /// Send one command, resending until the remote acks it (when ack mode
    /// is still on).
    pub fn send(&mut self, payload: &[u8]) -> Result<(), Error> {
        loop {
            frame::write_frame(&mut self.conn, payload)?;

            if !self.ack {
                return Ok(());
            }

            // '+' ack, '-' (or anything else) means resend
            if frame::read_ack(&mut self.conn)? == b'+' {
                return Ok(());
            }
        }
    }

    /// Receive one reply.
    ///
    /// In ack mode a checksum mismatch is nacked and the read retried, with
    /// no cap; without acks the transport is trusted. When a synchronous
    /// reply is expected (`want_stop == false`) but a syscall stop
    /// notification arrives first (the non-stop race between `%Stop:` and a
    /// pending `OK`), the notification is deferred onto the queue and the
    /// read repeated.
    pub fn recv(&mut self, want_stop: bool) -> Result<Vec<u8>, Error> {
        loop {
            let (reply, sum_ok) = frame::read_frame(&mut self.conn)?;

            if self.ack {
                self.conn
                    .write(if sum_ok { b'+' } else { b'-' })
                    .map_err(Error::conn_write)?;
                self.conn.flush().map_err(Error::conn_write)?;
                if !sum_ok {
                    continue;
                }
            }

            if !want_stop && reply.starts_with(b"T05syscall") {
                self.notifications.push(&reply);
                continue;
            }

            return Ok(reply);
        }
    }

    /// Receive a reply and test it for exactly `OK`.
    pub fn recv_ok(&mut self) -> Result<bool, Error> {
        Ok(self.recv(false)? == b"OK")
    }

    /// Ask the remote to drop per-packet acks. Returns whether it agreed;
    /// either way the session keeps working.
    pub fn start_noack(&mut self) -> Result<bool, Error> {
        self.send(b"QStartNoAckMode")?;
        let ok = self.recv_ok()?;
        if ok {
            trace!("ack mode disabled");
            self.ack = false;
        }
        Ok(ok)
    }

    pub fn set_non_stop(&mut self, val: bool) {
        self.non_stop = val;
    }

    pub fn non_stop(&self) -> bool {
        self.non_stop
    }

    pub fn push_notification(&mut self, payload: &[u8]) {
        self.notifications.push(payload);
    }

    pub fn pop_notification(&mut self) -> Option<Vec<u8>> {
        self.notifications.pop()
    }

    #[cfg(test)]
    pub(crate) fn ack(&self) -> bool {
        self.ack
    }
}
