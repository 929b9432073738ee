use anyhow::{bail, Result};

/// A growable byte buffer with a read/write cursor, used for the binary map format. All
/// integers are little-endian. Reads past the end are errors, never panics.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataBuffer {
    bytes: Vec<u8>,
    pos: usize,
}

impl DataBuffer {
    pub fn new() -> DataBuffer {
        DataBuffer::default()
    }

    pub fn with_capacity(capacity: usize) -> DataBuffer {
        DataBuffer {
            bytes: Vec::with_capacity(capacity),
            pos: 0,
        }
    }

    /// Wraps existing bytes for reading, with the cursor at the start.
    pub fn from_bytes(bytes: Vec<u8>) -> DataBuffer {
        DataBuffer { bytes, pos: 0 }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.bytes.len() {
            bail!("Can't seek to {}, buffer only has {} bytes", pos, self.bytes.len());
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.seek(self.pos + n)
    }

    /// Moves the cursor forward to the next multiple of `alignment`, writing zeroes if the
    /// cursor is at the end.
    pub fn align_to(&mut self, alignment: usize) {
        while self.pos % alignment != 0 {
            if self.pos == self.bytes.len() {
                self.bytes.push(0);
            }
            self.pos += 1;
        }
    }

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        if self.remaining() < n {
            bail!(
                "Wanted {} bytes at offset {}, but only {} remain",
                n,
                self.pos,
                self.remaining()
            );
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.bytes[start..start + n])
    }

    fn put(&mut self, data: &[u8]) {
        let end = self.pos + data.len();
        if end > self.bytes.len() {
            self.bytes.resize(end, 0);
        }
        self.bytes[self.pos..end].copy_from_slice(data);
        self.pos = end;
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let raw = self.take(2)?;
        Ok(u16::from_le_bytes([raw[0], raw[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let raw = self.take(4)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        Ok(self.take(n)?.to_vec())
    }

    /// A u32 byte length followed by UTF-8 bytes.
    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_u32()? as usize;
        let raw = self.take(len)?.to_vec();
        match String::from_utf8(raw) {
            Ok(s) => Ok(s),
            Err(err) => bail!("Bad string before offset {}: {}", self.pos, err),
        }
    }

    pub fn write_u8(&mut self, x: u8) {
        self.put(&[x]);
    }

    pub fn write_bool(&mut self, x: bool) {
        self.write_u8(u8::from(x));
    }

    pub fn write_i8(&mut self, x: i8) {
        self.write_u8(x as u8);
    }

    pub fn write_u16(&mut self, x: u16) {
        self.put(&x.to_le_bytes());
    }

    pub fn write_u32(&mut self, x: u32) {
        self.put(&x.to_le_bytes());
    }

    pub fn write_i32(&mut self, x: i32) {
        self.put(&x.to_le_bytes());
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.put(data);
    }

    pub fn write_string(&mut self, s: &str) {
        self.write_u32(s.len() as u32);
        self.put(s.as_bytes());
    }

    /// Overwrites 4 bytes at an earlier offset without moving the cursor. Used to fill in
    /// length prefixes once the framed data has been written.
    pub fn patch_u32(&mut self, at: usize, x: u32) -> Result<()> {
        if at + 4 > self.bytes.len() {
            bail!("Can't patch offset {}, buffer only has {} bytes", at, self.bytes.len());
        }
        self.bytes[at..at + 4].copy_from_slice(&x.to_le_bytes());
        Ok(())
    }

    /// Reserves a u32 length slot, runs `body`, then fills in how many bytes `body` wrote.
    pub fn write_framed<F: FnOnce(&mut DataBuffer) -> Result<()>>(&mut self, body: F) -> Result<()> {
        let at = self.pos;
        self.write_u32(0);
        body(self)?;
        let len = self.pos - at - 4;
        self.patch_u32(at, len as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_reads_are_errors() {
        let mut buf = DataBuffer::from_bytes(vec![1, 2, 3]);
        assert_eq!(buf.read_u16().unwrap(), 0x0201);
        assert!(buf.read_u32().is_err());
        // A failed read doesn't consume anything
        assert_eq!(buf.read_u8().unwrap(), 3);
    }

    #[test]
    fn alignment_pads_with_zeroes() {
        let mut buf = DataBuffer::new();
        buf.write_u8(7);
        buf.align_to(4);
        buf.write_u32(0xdeadbeef);
        assert_eq!(buf.len(), 8);
        assert_eq!(&buf.as_bytes()[0..4], &[7, 0, 0, 0]);

        let mut read = DataBuffer::from_bytes(buf.into_bytes());
        assert_eq!(read.read_u8().unwrap(), 7);
        read.align_to(4);
        assert_eq!(read.read_u32().unwrap(), 0xdeadbeef);
    }

    #[test]
    fn framed_sections_know_their_length() {
        let mut buf = DataBuffer::new();
        buf.write_framed(|b| {
            b.write_string("hello");
            b.write_u16(3);
            Ok(())
        })
        .unwrap();
        let mut read = DataBuffer::from_bytes(buf.into_bytes());
        assert_eq!(read.read_u32().unwrap(), 4 + 5 + 2);
        assert_eq!(read.read_string().unwrap(), "hello");
        assert_eq!(read.read_u16().unwrap(), 3);
        assert_eq!(read.remaining(), 0);
    }
}
