use byteorder::{ByteOrder, LittleEndian};

/// Output buffer for OpenCTM serialization.
///
/// All multi-byte values are written little endian byte by byte, independent
/// of the host byte order.
#[derive(Debug, Clone, Default)]
pub struct EncoderBuffer {
    buffer: Vec<u8>,
}

impl EncoderBuffer {
    /// Create a new empty encoder buffer
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a buffer with initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    /// Encode raw bytes
    pub fn encode(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    pub fn encode_fourcc(&mut self, tag: [u8; 4]) {
        self.buffer.extend_from_slice(&tag);
    }

    pub fn encode_u32(&mut self, value: u32) {
        let mut bytes = [0u8; 4];
        LittleEndian::write_u32(&mut bytes, value);
        self.buffer.extend_from_slice(&bytes);
    }

    pub fn encode_f32(&mut self, value: f32) {
        let mut bytes = [0u8; 4];
        LittleEndian::write_f32(&mut bytes, value);
        self.buffer.extend_from_slice(&bytes);
    }

    /// Length-prefixed string without terminator. `None` and `""` both encode
    /// as a zero length.
    pub fn encode_string(&mut self, value: Option<&str>) {
        let bytes = value.map(str::as_bytes).unwrap_or_default();
        self.encode_u32(bytes.len() as u32);
        self.buffer.extend_from_slice(bytes);
    }
}
