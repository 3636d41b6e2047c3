use std::fs::File;
use std::io::BufReader;

use crate::conn::Connection;
use crate::conn::ConnectionExt;

// Serial devices and FIFOs are opened read/write and driven through the same
// descriptor; writes bypass the read buffer.
impl Connection for BufReader<File> {
    type Error = std::io::Error;

    fn write(&mut self, byte: u8) -> Result<(), Self::Error> {
        use std::io::Write;

        Write::write_all(self.get_mut(), &[byte])
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        use std::io::Write;

        Write::write_all(self.get_mut(), buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        use std::io::Write;

        Write::flush(self.get_mut())
    }
}

impl ConnectionExt for BufReader<File> {
    fn read(&mut self) -> Result<u8, Self::Error> {
        use std::io::Read;

        let mut buf = [0u8];
        Read::read_exact(self, &mut buf)?;
        Ok(buf[0])
    }
}
