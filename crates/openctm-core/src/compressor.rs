//! Entropy coding backend.
//!
//! The codec only needs a general purpose byte compressor that reports a
//! fixed 5-byte properties block next to its payload, so that a decoder can
//! be configured from the stream alone. [`LzmaCompressor`] provides that with
//! a raw LZMA stream whose properties are the standard LZMA header
//! (lc/lp/pb byte followed by the little endian dictionary size).
//!
//! Encoding goes through liblzma (`xz2`) so the level selects a real preset
//! with match finding. Decoding uses `lzma-rs`, which accepts streams both
//! with and without an end marker once the unpacked size is known.

use std::io::Read;

use log::trace;
use lzma_rs::decompress::{Options as DecompressOptions, UnpackedSize as DecompressUnpackedSize};
use xz2::read::XzEncoder;
use xz2::stream::{LzmaOptions, Stream};

use crate::status::{try_with_capacity, CtmError, CtmResult};

/// Size of the properties block written in front of every packed section.
pub const PROPS_SIZE: usize = 5;

/// `.lzma` header: properties followed by a 64-bit unpacked size.
const ALONE_HEADER_SIZE: usize = PROPS_SIZE + 8;

/// Smallest dictionary liblzma accepts.
const MIN_DICT_SIZE: usize = 4096;

/// Dictionary size of LZMA preset `level`.
fn preset_dict_size(level: u32) -> usize {
    match level {
        0 => 256 << 10,
        1 => 1 << 20,
        2 => 2 << 20,
        3 | 4 => 4 << 20,
        5 | 6 => 8 << 20,
        7 => 16 << 20,
        8 => 32 << 20,
        _ => 64 << 20,
    }
}

/// Output of a compressor: properties block plus compressed bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packed {
    pub props: [u8; PROPS_SIZE],
    pub payload: Vec<u8>,
}

/// Byte stream compressor used for every packed array section.
pub trait Compressor {
    /// Compresses `data`. `level` is the requested effort (0..=9).
    fn compress(&self, data: &[u8], level: u32) -> CtmResult<Packed>;

    /// Decompresses `payload`, which must expand to exactly `expected_size` bytes.
    fn decompress(&self, payload: &[u8], props: &[u8; PROPS_SIZE], expected_size: usize) -> CtmResult<Vec<u8>>;
}

/// Raw LZMA backend. Compression level `n` uses LZMA preset `n`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LzmaCompressor;

impl LzmaCompressor {
    pub fn new() -> Self {
        Self
    }
}

impl Compressor for LzmaCompressor {
    fn compress(&self, data: &[u8], level: u32) -> CtmResult<Packed> {
        let mut options = LzmaOptions::new_preset(level)
            .map_err(|e| CtmError::LzmaError(format!("no preset for level {}: {}", level, e)))?;
        // A window larger than the input finds nothing more.
        let window = data
            .len()
            .max(MIN_DICT_SIZE)
            .checked_next_power_of_two()
            .unwrap_or(usize::MAX)
            .min(preset_dict_size(level));
        options.dict_size(window as u32);
        let stream = Stream::new_lzma_encoder(&options)
            .map_err(|e| CtmError::LzmaError(format!("encoder setup failed: {}", e)))?;

        let mut encoder = XzEncoder::new_stream(data, stream);
        let mut output = Vec::with_capacity(data.len() / 2 + ALONE_HEADER_SIZE);
        encoder
            .read_to_end(&mut output)
            .map_err(|e| CtmError::LzmaError(format!("compression failed: {}", e)))?;

        if output.len() < ALONE_HEADER_SIZE {
            return Err(CtmError::LzmaError("compressor produced no header".into()));
        }
        let mut props = [0u8; PROPS_SIZE];
        props.copy_from_slice(&output[..PROPS_SIZE]);
        // The section frame carries the unpacked size itself.
        let payload = output.split_off(ALONE_HEADER_SIZE);
        trace!("lzma: {} -> {} bytes (level {})", data.len(), payload.len(), level);
        Ok(Packed { props, payload })
    }

    fn decompress(&self, payload: &[u8], props: &[u8; PROPS_SIZE], expected_size: usize) -> CtmResult<Vec<u8>> {
        let mut options = DecompressOptions::default();
        options.unpacked_size = DecompressUnpackedSize::UseProvided(Some(expected_size as u64));

        let mut input = (&props[..]).chain(payload);
        let mut output: Vec<u8> = try_with_capacity(expected_size)?;
        lzma_rs::lzma_decompress_with_options(&mut input, &mut output, &options)
            .map_err(|e| CtmError::LzmaError(format!("decompression failed: {:?}", e)))?;

        if output.len() != expected_size {
            return Err(CtmError::LzmaError(format!(
                "decompressed {} bytes, expected {}",
                output.len(),
                expected_size
            )));
        }
        Ok(output)
    }
}
