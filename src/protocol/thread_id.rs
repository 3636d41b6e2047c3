use crate::common::Tid;
use crate::protocol::hex::decode_hex;

/// A thread id as it appears in stop replies and thread lists: either a bare
/// `TID` (the process id is assumed equal to it) or the multiprocess form
/// `pPID.TID`. The protocol's `-1` ("all threads") is carried through
/// literally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadId {
    /// Process id, aka kernel tgid.
    pub pid: Tid,
    /// Thread id, aka kernel tid.
    pub tid: Tid,
}

impl ThreadId {
    pub fn parse(s: &[u8]) -> Option<ThreadId> {
        match s {
            [b'p', rest @ ..] => {
                // pPID or pPID.TID
                let mut parts = rest.splitn(2, |b| *b == b'.');
                let pid = parse_id(parts.next()?)?;
                // stop messages should always carry the TID, but if not,
                // just use the PID
                let tid = match parts.next() {
                    Some(t) => parse_id(t)?,
                    None => pid,
                };
                Some(ThreadId { pid, tid })
            }
            _ => {
                // just a TID, assume the same PID
                let tid = parse_id(s)?;
                Some(ThreadId { pid: tid, tid })
            }
        }
    }
}

fn parse_id(s: &[u8]) -> Option<Tid> {
    match s {
        b"-1" => Some(-1),
        s => decode_hex::<u32>(s).ok().map(|id| id as Tid),
    }
}
