//! Scripted transports for driving the client against canned server
//! transcripts.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

use crate::client::session::GdbSession;
use crate::conn::Connection;
use crate::conn::ConnectionExt;
use crate::protocol::hex;

pub(crate) struct ScriptedConn {
    rx: VecDeque<u8>,
    sent: Rc<RefCell<Vec<u8>>>,
}

impl Connection for ScriptedConn {
    type Error = io::Error;

    fn write(&mut self, byte: u8) -> Result<(), Self::Error> {
        self.sent.borrow_mut().push(byte);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl ConnectionExt for ScriptedConn {
    fn read(&mut self) -> Result<u8, Self::Error> {
        self.rx
            .pop_front()
            .ok_or_else(|| io::Error::from(io::ErrorKind::UnexpectedEof))
    }
}

/// A view of everything the client wrote to the wire.
pub(crate) struct SentLog(Rc<RefCell<Vec<u8>>>);

impl SentLog {
    /// The framed command payloads sent so far, in order (acks skipped).
    pub(crate) fn sent(&self) -> Vec<Vec<u8>> {
        let bytes = self.0.borrow();
        let mut cmds = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'$' {
                let start = i + 1;
                let body_len = bytes[start..]
                    .iter()
                    .position(|b| *b == b'#')
                    .expect("unterminated outbound frame");
                cmds.push(bytes[start..start + body_len].to_vec());
                i = start + body_len + 3;
            } else {
                i += 1;
            }
        }
        cmds
    }
}

/// Wrap `payload` in `$…#cc` reply framing.
pub(crate) fn frame(payload: &[u8]) -> Vec<u8> {
    let sum = payload.iter().fold(0u8, |a, x| a.wrapping_add(*x));
    let mut out = vec![b'$'];
    out.extend_from_slice(payload);
    out.push(b'#');
    out.extend_from_slice(&hex::encode_byte(sum));
    out
}

/// Wrap `payload` in `%Stop:…#cc` notification framing.
pub(crate) fn notify(payload: &[u8]) -> Vec<u8> {
    let mut body = b"Stop:".to_vec();
    body.extend_from_slice(payload);
    let sum = body.iter().fold(0u8, |a, x| a.wrapping_add(*x));
    let mut out = vec![b'%'];
    out.extend_from_slice(&body);
    out.push(b'#');
    out.extend_from_slice(&hex::encode_byte(sum));
    out
}

fn build(rx: Vec<u8>) -> (GdbSession, SentLog) {
    let sent = Rc::new(RefCell::new(Vec::new()));
    let conn = ScriptedConn {
        rx: rx.into_iter().collect(),
        sent: Rc::clone(&sent),
    };
    let session = GdbSession::from_connection(Box::new(conn)).unwrap();
    (session, SentLog(sent))
}

/// A session whose ack mode stays on: each scripted reply is preceded by
/// the `+` that acks the command requesting it.
pub(crate) fn script_session(replies: &[&[u8]]) -> (GdbSession, SentLog) {
    let mut rx = Vec::new();
    for reply in replies {
        rx.push(b'+');
        rx.extend(frame(reply));
    }
    build(rx)
}

/// A session fed raw wire chunks, plus the single `+` that acks the
/// opening `QStartNoAckMode` (transcripts are expected to grant it).
pub(crate) fn script_wire(chunks: &[Vec<u8>]) -> (GdbSession, SentLog) {
    let mut rx = vec![b'+'];
    for chunk in chunks {
        rx.extend_from_slice(chunk);
    }
    build(rx)
}

/// Linux x86-64 signal numbering, the way a host tracer would name it.
pub(crate) fn linux_signal_name(sig: u32) -> Option<&'static str> {
    Some(match sig {
        1 => "SIGHUP",
        2 => "SIGINT",
        3 => "SIGQUIT",
        4 => "SIGILL",
        5 => "SIGTRAP",
        6 => "SIGABRT",
        7 => "SIGBUS",
        8 => "SIGFPE",
        9 => "SIGKILL",
        10 => "SIGUSR1",
        11 => "SIGSEGV",
        12 => "SIGUSR2",
        13 => "SIGPIPE",
        14 => "SIGALRM",
        15 => "SIGTERM",
        16 => "SIGSTKFLT",
        17 => "SIGCHLD",
        18 => "SIGCONT",
        19 => "SIGSTOP",
        20 => "SIGTSTP",
        21 => "SIGTTIN",
        22 => "SIGTTOU",
        23 => "SIGURG",
        24 => "SIGXCPU",
        25 => "SIGXFSZ",
        26 => "SIGVTALRM",
        27 => "SIGPROF",
        28 => "SIGWINCH",
        29 => "SIGIO",
        30 => "SIGPWR",
        31 => "SIGSYS",
        _ => return None,
    })
}
