//! The `$…#cc` packet framing codec.
//!
//! Outbound frames are written verbatim: stubs do not generally expect
//! escaping or run-length encoding on commands (gdbserver answers an RLE'd
//! address with "invalid hex digit"). Inbound frames expand `}`-escapes and
//! `*`-run-lengths, and may arrive as `%Stop:` notifications, which share
//! the body framing with regular `$` replies.

use std::io;

use log::trace;

use crate::conn::Connection;
use crate::conn::ConnectionExt;
use crate::error::Error;
use crate::protocol::hex;

fn get_byte<C>(conn: &mut C) -> Result<u8, Error>
where
    C: ConnectionExt<Error = io::Error> + ?Sized,
{
    conn.read().map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::ClosedByRemote,
        _ => Error::conn_read(e),
    })
}

/// Read one ack byte (`+`/`-`) after a send.
pub fn read_ack<C>(conn: &mut C) -> Result<u8, Error>
where
    C: ConnectionExt<Error = io::Error> + ?Sized,
{
    get_byte(conn)
}

/// Write one outbound frame: `$`, the payload bytes verbatim, `#`, and the
/// two-digit mod-256 checksum, then flush.
pub fn write_frame<C>(conn: &mut C, payload: &[u8]) -> Result<(), Error>
where
    C: Connection<Error = io::Error> + ?Sized,
{
    let checksum = payload.iter().fold(0u8, |a, x| a.wrapping_add(*x));

    trace!("--> ${}#{:02x}", String::from_utf8_lossy(payload), checksum);

    conn.write(b'$').map_err(Error::conn_write)?;
    conn.write_all(payload).map_err(Error::conn_write)?;
    conn.write(b'#').map_err(Error::conn_write)?;
    conn.write_all(&hex::encode_byte(checksum))
        .map_err(Error::conn_write)?;
    conn.flush().map_err(Error::conn_write)
}

/// Read one inbound frame, expanding escapes and run-lengths. Returns the
/// payload and whether the received checksum matched the computed one; the
/// caller decides what a mismatch means (ack mode nacks and retries, no-ack
/// mode trusts the transport).
pub fn read_frame<C>(conn: &mut C) -> Result<(Vec<u8>, bool), Error>
where
    C: ConnectionExt<Error = io::Error> + ?Sized,
{
    let mut reply: Vec<u8> = Vec::with_capacity(4096);
    let mut sum: u8 = 0;
    let mut escape = false;
    // one byte of lookahead, for rejected run-length counts
    let mut pending: Option<u8> = None;

    // fast-forward to the first start of packet
    loop {
        let c = get_byte(conn)?;
        if c == b'$' {
            break;
        }
        if c == b'%' {
            pending = Some(c);
            break;
        }
    }

    loop {
        let c = match pending.take() {
            Some(c) => c,
            None => get_byte(conn)?,
        };
        sum = sum.wrapping_add(c);

        match c {
            b'$' => {
                // new packet? start over...
                reply.clear();
                sum = 0;
                escape = false;
                continue;
            }
            b'%' => {
                reply.clear();
                sum = 0;
                escape = false;

                // the notification type is checksummed but not part of the
                // payload; only stop notifications exist today
                let mut kind = [0u8; 5];
                for slot in kind.iter_mut() {
                    *slot = get_byte(conn)?;
                    sum = sum.wrapping_add(*slot);
                }
                if &kind != b"Stop:" {
                    return Err(Error::UnknownNotification(kind));
                }
                continue;
            }
            b'#' => {
                // end of packet; '#' is not part of the checksum
                sum = sum.wrapping_sub(c);
                let msb = get_byte(conn)?;
                let lsb = get_byte(conn)?;
                let sum_ok = matches!(hex::decode_hex::<u8>(&[msb, lsb]), Ok(cs) if cs == sum);

                trace!(
                    "<-- ${}#{}{}",
                    String::from_utf8_lossy(&reply),
                    msb as char,
                    lsb as char
                );

                return Ok((reply, sum_ok));
            }
            b'}' => {
                // escape: the next byte is XORed with 0x20
                escape = true;
                continue;
            }
            b'*' if !reply.is_empty() => {
                // Run-length encoding: the next byte says how many times to
                // repeat the previous one, offset by 29 so that the minimum
                // useful run of 3 lands on the first printable character.
                // Counts above 126 or colliding with '$'/'#' are invalid; an
                // invalid count demotes '*' to a literal and the count byte
                // is reprocessed as ordinary input.
                let c2 = get_byte(conn)?;
                if (29..=126).contains(&c2) && c2 != b'$' && c2 != b'#' {
                    sum = sum.wrapping_add(c2);
                    let count = usize::from(c2 - 29);
                    let last = *reply.last().unwrap();
                    reply.extend(std::iter::repeat(last).take(count));
                    continue;
                }
                pending = Some(c2);
            }
            _ => {}
        }

        let mut c = c;
        if escape {
            c ^= 0x20;
            escape = false;
        }
        reply.push(c);
    }
}
