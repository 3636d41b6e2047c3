use crate::common::Pid;
use crate::common::Signal;
use crate::common::Tid;
use crate::protocol::hex::decode_hex;
use crate::protocol::hex::decode_hex_prefix;
use crate::protocol::thread_id::ThreadId;

/// What a stop reply says happened on the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopEvent {
    /// `O`, `F`, or anything else the client does not drive.
    Unknown,
    /// `E nn`: the previous resume failed.
    Error(u8),
    /// `S`/`T` with SIGTRAP or signal 0 and no recognized stop reason.
    Trap,
    /// `S`/`T` with a real signal (protocol numbering).
    Signal(u8),
    /// `T05` with a `syscall_entry` stop reason.
    SyscallEntry(u64),
    /// `T05` with a `syscall_return` stop reason.
    SyscallReturn(u64),
    /// `W`: the process exited with this status.
    Exited(i32),
    /// `X`: the process was terminated by this signal (protocol numbering).
    Terminated(u32),
}

/// One decoded stop reply. `pid`/`tid` are -1 when the reply did not say.
#[derive(Debug)]
pub struct StopReply {
    pub event: StopEvent,
    pub pid: Pid,
    pub tid: Tid,
    raw: Vec<u8>,
}

impl StopReply {
    pub fn parse(raw: Vec<u8>) -> StopReply {
        let mut stop = StopReply {
            event: StopEvent::Unknown,
            pid: -1,
            tid: -1,
            raw,
        };

        // all good packets are at least three bytes
        if stop.raw.len() < 3 {
            return stop;
        }

        match stop.raw[0] {
            b'E' => {
                if let Ok(code) = decode_hex::<u8>(&stop.raw[1..3]) {
                    stop.event = StopEvent::Error(code);
                }
            }
            b'S' | b'T' => parse_signal_stop(&mut stop),
            b'W' | b'X' => parse_exit_stop(&mut stop),
            _ => {}
        }

        stop
    }

    /// Whether the reply was empty (no payload at all).
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// The raw payload, lossily decoded for error messages.
    pub fn raw_lossy(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }
}

fn parse_signal_stop(stop: &mut StopReply) {
    let code = match decode_hex::<u8>(&stop.raw[1..3]) {
        Ok(code) => code,
        Err(_) => return,
    };

    let mut event = if code == Signal::SIGTRAP.0 || code == Signal::SIGZERO.0 {
        StopEvent::Trap
    } else {
        StopEvent::Signal(code)
    };
    let mut pid = stop.pid;
    let mut tid = stop.tid;

    // tokenize the name:value stop-reason pairs
    for pair in stop.raw[3..].split(|b| *b == b';') {
        let colon = match pair.iter().position(|b| *b == b':') {
            Some(i) => i,
            None => continue,
        };
        let (name, value) = (&pair[..colon], &pair[colon + 1..]);

        match name {
            b"thread" => {
                if let Some(id) = ThreadId::parse(value) {
                    pid = id.pid;
                    tid = id.tid;
                }
            }
            // only a plain trap can be promoted; a real signal with a
            // syscall stop reason would be a stub bug
            b"syscall_entry" => {
                if event == StopEvent::Trap {
                    event = StopEvent::SyscallEntry(decode_hex_prefix(value));
                }
            }
            b"syscall_return" => {
                if event == StopEvent::Trap {
                    event = StopEvent::SyscallReturn(decode_hex_prefix(value));
                }
            }
            _ => {}
        }
    }

    stop.event = event;
    stop.pid = pid;
    stop.tid = tid;
}

fn parse_exit_stop(stop: &mut StopReply) {
    let code = decode_hex_prefix(&stop.raw[1..]);
    stop.event = if stop.raw[0] == b'W' {
        StopEvent::Exited(code as i32)
    } else {
        StopEvent::Terminated(code as u32)
    };

    const PROCESS: &[u8] = b";process:";
    if let Some(at) = stop
        .raw
        .windows(PROCESS.len())
        .position(|w| w == PROCESS)
    {
        stop.pid = decode_hex_prefix(&stop.raw[at + PROCESS.len()..]) as Pid;
        // we don't really know the tid, so just use the PID
        stop.tid = stop.pid;
    }
}
