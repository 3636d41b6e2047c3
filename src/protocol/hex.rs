use btoi::btou_radix;
use btoi::ParseIntegerError;
use num_traits::CheckedAdd;
use num_traits::CheckedMul;
use num_traits::FromPrimitive;
use num_traits::Zero;

/// Strictly decode a big-endian hex string into an integer, rejecting
/// anything that is not entirely hex digits.
#[inline]
pub fn decode_hex<I>(buf: &[u8]) -> Result<I, ParseIntegerError>
where
    I: FromPrimitive + Zero + CheckedAdd + CheckedMul,
{
    btou_radix(buf, 16)
}

fn ascii2byte(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Decode the hex-digit prefix of `buf`, stopping at the first byte that is
/// not a hex digit. Several reply fields (exit statuses, syscall numbers,
/// `vFile` results) are terminated by `,`, `;`, or end-of-packet rather
/// than by a known width.
pub fn decode_hex_prefix(buf: &[u8]) -> u64 {
    let mut value: u64 = 0;
    for &c in buf {
        match ascii2byte(c) {
            Some(nibble) => value = (value << 4) | u64::from(nibble),
            None => break,
        }
    }
    value
}

/// [`decode_hex_prefix`] with an optional leading `-`.
pub fn decode_signed_hex_prefix(buf: &[u8]) -> i64 {
    match buf.first() {
        Some(b'-') => -(decode_hex_prefix(&buf[1..]) as i64),
        _ => decode_hex_prefix(buf) as i64,
    }
}

/// Decode a pairwise hex buffer into `out`, returning the decoded length.
/// `None` if the input has odd length, overflows `out`, or contains a
/// non-hex byte.
pub fn decode_hex_buf(buf: &[u8], out: &mut [u8]) -> Option<usize> {
    if buf.len() % 2 != 0 || buf.len() / 2 > out.len() {
        return None;
    }

    for (i, pair) in buf.chunks_exact(2).enumerate() {
        out[i] = ascii2byte(pair[0])? << 4 | ascii2byte(pair[1])?;
    }

    Some(buf.len() / 2)
}

/// Encode a byte as two lowercase hex chars.
pub fn encode_byte(byte: u8) -> [u8; 2] {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    [
        DIGITS[(byte >> 4) as usize],
        DIGITS[(byte & 0xf) as usize],
    ]
}

/// Hex-encode an entire byte string (two chars per byte).
pub fn encode_hex_string(data: &[u8]) -> Vec<u8> {
    data.iter().flat_map(|b| encode_byte(*b)).collect()
}
