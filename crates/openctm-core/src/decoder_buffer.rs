use byteorder::{ByteOrder, LittleEndian};

use crate::status::{CtmError, CtmResult};
use crate::version::fourcc_display;

/// Input cursor over a compressed OpenCTM stream.
///
/// Every read is bounds checked; running off the end of the data is reported
/// as [`CtmError::BadFormat`], never as a panic.
///
/// # Example
///
/// ```
/// use openctm_core::DecoderBuffer;
///
/// let data = [b'O', b'C', b'T', b'M', 5, 0, 0, 0];
/// let mut buffer = DecoderBuffer::new(&data);
///
/// buffer.expect_fourcc(*b"OCTM").unwrap();
/// assert_eq!(buffer.decode_u32().unwrap(), 5);
/// assert_eq!(buffer.remaining_size(), 0);
/// ```
pub struct DecoderBuffer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> DecoderBuffer<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current read position in bytes.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining_size(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Decodes and returns a slice of the specified size.
    pub fn decode_slice(&mut self, size: usize) -> CtmResult<&'a [u8]> {
        if size > self.remaining_size() {
            return Err(CtmError::BadFormat(format!(
                "unexpected end of stream at offset {}: need {} bytes, have {}",
                self.pos,
                size,
                self.remaining_size()
            )));
        }
        let slice = &self.data[self.pos..self.pos + size];
        self.pos += size;
        Ok(slice)
    }

    pub fn decode_bytes(&mut self, out: &mut [u8]) -> CtmResult<()> {
        let slice = self.decode_slice(out.len())?;
        out.copy_from_slice(slice);
        Ok(())
    }

    pub fn decode_u32(&mut self) -> CtmResult<u32> {
        Ok(LittleEndian::read_u32(self.decode_slice(4)?))
    }

    pub fn decode_f32(&mut self) -> CtmResult<f32> {
        Ok(LittleEndian::read_f32(self.decode_slice(4)?))
    }

    pub fn decode_fourcc(&mut self) -> CtmResult<[u8; 4]> {
        let mut tag = [0u8; 4];
        self.decode_bytes(&mut tag)?;
        Ok(tag)
    }

    /// Reads a section tag and fails unless it is `expected`.
    pub fn expect_fourcc(&mut self, expected: [u8; 4]) -> CtmResult<()> {
        let offset = self.pos;
        let tag = self.decode_fourcc()?;
        if tag != expected {
            return Err(CtmError::BadFormat(format!(
                "expected section {:?} at offset {}, found {:?}",
                fourcc_display(&expected),
                offset,
                fourcc_display(&tag)
            )));
        }
        Ok(())
    }

    /// Decodes a length-prefixed string. A zero length yields `None`.
    ///
    /// Strings carry no declared encoding; bytes that are not UTF-8 (Latin-1
    /// names, for instance) become `U+FFFD` rather than failing the load.
    pub fn decode_string(&mut self) -> CtmResult<Option<String>> {
        let len = self.decode_u32()? as usize;
        if len == 0 {
            return Ok(None);
        }
        let bytes = self.decode_slice(len)?;
        Ok(Some(String::from_utf8_lossy(bytes).into_owned()))
    }
}
