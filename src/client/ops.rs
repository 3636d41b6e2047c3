//! Data-plane operations: register and memory reads, `qXfer` object
//! transfers, and `vFile` host-filesystem requests.
//!
//! Failures here are non-fatal (`Error::Remote` / `Error::MalformedReply`);
//! the session stays usable and the caller reports the miss however it
//! likes.

use crate::client::session::GdbSession;
use crate::common::Tid;
use crate::error::Error;
use crate::protocol::hex;

/// Outcome of a successful [`GdbSession::read_mem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemRead {
    /// The whole range was read.
    Complete,
    /// `check_nul` was set and a NUL terminator appeared mid-range; the
    /// bytes up to and including it are valid.
    Nul,
}

// matches gdbserver's PacketSize
const XFER_CHUNK: usize = 0xfff;
const MEM_CHUNK: usize = 0x1000;

impl GdbSession {
    /// Read the current thread's registers, returning the stub's raw `g`
    /// payload (hex-encoded bytes in the target's register order).
    ///
    /// NB: this assumes the stub's current thread is the one the caller
    /// cares about. If that may not hold, send `Hg<tid>` first.
    pub fn read_registers(&mut self) -> Result<Vec<u8>, Error> {
        self.send(b"g")?;
        let reply = self.recv(false)?;
        if reply.first() == Some(&b'E') {
            return Err(Error::Remote(hex::decode_hex_prefix(&reply[1..]) as u32));
        }
        Ok(reply)
    }

    /// Read `out.len()` bytes of the current thread's memory starting at
    /// `addr`, in ascending chunks of at most 0x1000 bytes. With
    /// `check_nul`, stop as soon as a decoded chunk contains a NUL: the
    /// usual mode for fetching C strings of unknown length.
    pub fn read_mem(
        &mut self,
        addr: u64,
        out: &mut [u8],
        check_nul: bool,
    ) -> Result<MemRead, Error> {
        let mut addr = addr;
        let mut done = 0;

        while done < out.len() {
            let chunk_len = (out.len() - done).min(MEM_CHUNK);
            self.send(format!("m{:x},{:x}", addr, chunk_len).as_bytes())?;

            let reply = self.recv(false)?;
            if reply.first() == Some(&b'E') {
                return Err(Error::Remote(hex::decode_hex_prefix(&reply[1..]) as u32));
            }
            if reply.len() < 2 || reply.len() > chunk_len * 2 {
                return Err(Error::MalformedReply("m"));
            }

            // the stub may answer short; the next chunk picks up from there
            let decoded = hex::decode_hex_buf(&reply, &mut out[done..done + chunk_len])
                .ok_or(Error::MalformedReply("m"))?;

            if check_nul && out[done..done + decoded].contains(&0) {
                return Ok(MemRead::Nul);
            }

            addr += decoded as u64;
            done += decoded;
        }

        Ok(MemRead::Complete)
    }

    /// Read a complete `qXfer` object, concatenating `m`/`l` chunks.
    pub fn xfer_read(&mut self, object: &str, annex: &str) -> Result<Vec<u8>, Error> {
        let mut data: Vec<u8> = Vec::new();

        loop {
            self.send(
                format!(
                    "qXfer:{}:read:{}:{:x},{:x}",
                    object,
                    annex,
                    data.len(),
                    XFER_CHUNK
                )
                .as_bytes(),
            )?;

            let reply = self.recv(false)?;
            match reply.first() {
                Some(b'm') | Some(b'l') => {
                    data.extend_from_slice(&reply[1..]);
                    if reply[0] == b'l' {
                        return Ok(data);
                    }
                }
                Some(b'E') => {
                    return Err(Error::Remote(hex::decode_hex_prefix(&reply[1..]) as u32))
                }
                _ => return Err(Error::MalformedReply("qXfer")),
            }
        }
    }

    /// Resolve a symlink on the remote's filesystem into `out`, truncating
    /// to `out.len() - 1` and NUL-terminating. Returns the copied length.
    pub fn readlink(&mut self, path: &[u8], out: &mut [u8]) -> Result<usize, Error> {
        if out.is_empty() {
            return Err(Error::MalformedReply("vFile:readlink"));
        }

        let res = self.vfile("readlink", &hex::encode_hex_string(path))?;
        match res.attachment {
            Some(data) if res.result >= 0 && res.result as usize == data.len() => {
                let len = data.len().min(out.len() - 1);
                out[..len].copy_from_slice(&data[..len]);
                out[len] = 0;
                Ok(len)
            }
            _ if res.errnum > 0 => Err(Error::Remote(res.errnum as u32)),
            _ => Err(Error::MalformedReply("vFile:readlink")),
        }
    }

    /// Resolve the path behind a tracee's file descriptor.
    ///
    /// As long as the target runs Linux we can peek at its procfs just like
    /// a local tracer would. Maybe that won't always be true.
    pub fn fd_path(&mut self, tid: Tid, fd: i32, out: &mut [u8]) -> Result<usize, Error> {
        self.readlink(format!("/proc/{}/fd/{}", tid, fd).as_bytes(), out)
    }

    fn vfile(&mut self, operation: &str, parameters: &[u8]) -> Result<VfileResponse, Error> {
        let mut cmd = format!("vFile:{}:", operation).into_bytes();
        cmd.extend_from_slice(parameters);
        self.send(&cmd)?;

        let reply = self.recv(false)?;
        if reply.len() < 2 || reply[0] != b'F' {
            return Err(Error::MalformedReply("vFile"));
        }

        // F result [, errno] [; attachment]
        let result = hex::decode_signed_hex_prefix(&reply[1..]);

        let semi = reply.iter().position(|b| *b == b';');
        let attachment = semi.map(|at| reply[at + 1..].to_vec());

        let header = &reply[..semi.unwrap_or(reply.len())];
        let errnum = match header.iter().position(|b| *b == b',') {
            Some(at) => hex::decode_signed_hex_prefix(&header[at + 1..]),
            None => 0,
        };

        Ok(VfileResponse {
            result,
            errnum,
            attachment,
        })
    }
}

struct VfileResponse {
    result: i64,
    errnum: i64,
    attachment: Option<Vec<u8>>,
}
