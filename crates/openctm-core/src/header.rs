//! The fixed part of every OpenCTM stream, in front of the method body.

use log::warn;

use crate::compression_config::CompressionMethod;
use crate::decoder_buffer::DecoderBuffer;
use crate::encoder_buffer::EncoderBuffer;
use crate::status::{CtmError, CtmResult};
use crate::version::{FORMAT_VERSION, HAS_NORMALS_BIT, MAGIC};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub method: CompressionMethod,
    pub vertex_count: u32,
    pub triangle_count: u32,
    pub uv_map_count: u32,
    pub attrib_map_count: u32,
    pub flags: u32,
    pub comment: Option<String>,
}

impl FileHeader {
    pub fn has_normals(&self) -> bool {
        self.flags & HAS_NORMALS_BIT != 0
    }

    pub fn encode(&self, out: &mut EncoderBuffer) {
        out.encode_fourcc(MAGIC);
        out.encode_u32(FORMAT_VERSION);
        out.encode_fourcc(self.method.fourcc());
        out.encode_u32(self.vertex_count);
        out.encode_u32(self.triangle_count);
        out.encode_u32(self.uv_map_count);
        out.encode_u32(self.attrib_map_count);
        out.encode_u32(self.flags);
        out.encode_string(self.comment.as_deref());
    }

    pub fn decode(buffer: &mut DecoderBuffer<'_>) -> CtmResult<Self> {
        let magic = buffer.decode_fourcc()?;
        if magic != MAGIC {
            warn!("rejecting stream with magic {:02x?}", magic);
            return Err(CtmError::bad_format("not an OpenCTM stream (bad magic)"));
        }
        let version = buffer.decode_u32()?;
        if version != FORMAT_VERSION {
            warn!("rejecting stream with format version {}", version);
            return Err(CtmError::UnsupportedFormatVersion(version));
        }
        let method = CompressionMethod::from_fourcc(buffer.decode_fourcc()?)?;
        let vertex_count = buffer.decode_u32()?;
        if vertex_count == 0 {
            return Err(CtmError::bad_format("stream declares zero vertices"));
        }
        let triangle_count = buffer.decode_u32()?;
        if triangle_count == 0 {
            return Err(CtmError::bad_format("stream declares zero triangles"));
        }
        let uv_map_count = buffer.decode_u32()?;
        let attrib_map_count = buffer.decode_u32()?;
        let flags = buffer.decode_u32()?;
        let comment = buffer.decode_string()?;

        Ok(Self {
            method,
            vertex_count,
            triangle_count,
            uv_map_count,
            attrib_map_count,
            flags,
            comment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::ErrorKind;

    fn header() -> FileHeader {
        FileHeader {
            method: CompressionMethod::Mg2,
            vertex_count: 8,
            triangle_count: 12,
            uv_map_count: 1,
            attrib_map_count: 0,
            flags: HAS_NORMALS_BIT,
            comment: Some("cube".into()),
        }
    }

    #[test]
    fn test_header_layout() {
        let mut out = EncoderBuffer::new();
        header().encode(&mut out);
        let data = out.data();
        assert_eq!(&data[0..4], b"OCTM");
        assert_eq!(&data[4..8], &[5, 0, 0, 0]);
        assert_eq!(&data[8..12], b"MG2\0");
        assert_eq!(&data[12..16], &[8, 0, 0, 0]);
        assert_eq!(&data[28..32], &[1, 0, 0, 0]);
        assert_eq!(&data[32..36], &[4, 0, 0, 0]);
        assert_eq!(&data[36..], b"cube");

        let decoded = FileHeader::decode(&mut DecoderBuffer::new(data)).unwrap();
        assert_eq!(decoded, header());
        assert!(decoded.has_normals());
    }

    fn decode_error(mutate: impl FnOnce(&mut Vec<u8>)) -> ErrorKind {
        let mut out = EncoderBuffer::new();
        header().encode(&mut out);
        let mut data = out.into_inner();
        mutate(&mut data);
        FileHeader::decode(&mut DecoderBuffer::new(&data)).unwrap_err().kind()
    }

    #[test]
    fn test_header_rejections() {
        assert_eq!(decode_error(|d| d[0] = b'X'), ErrorKind::BadFormat);
        assert_eq!(decode_error(|d| d[4] = 4), ErrorKind::UnsupportedFormatVersion);
        assert_eq!(decode_error(|d| d[8..12].copy_from_slice(b"RAW\0")), ErrorKind::BadFormat);
        assert_eq!(decode_error(|d| d[12] = 0), ErrorKind::BadFormat);
        assert_eq!(decode_error(|d| d[16] = 0), ErrorKind::BadFormat);
        assert_eq!(decode_error(|d| d.truncate(30)), ErrorKind::BadFormat);
    }
}
