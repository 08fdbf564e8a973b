//! Byte-planar packing of integer and float arrays.
//!
//! An array of `count` elements with `size` components each is split into
//! `4 * size` byte planes before it is handed to the compressor. Planes are
//! ordered by byte significance (most significant first) and, inside one
//! significance level, by component; each plane holds `count` bytes. Small
//! deltas then turn into long runs of identical high bytes.
//!
//! Every section is framed as `u32 payload size`, `5 property bytes`, payload.

use log::trace;

use crate::compressor::{Compressor, PROPS_SIZE};
use crate::decoder_buffer::DecoderBuffer;
use crate::encoder_buffer::EncoderBuffer;
use crate::status::{CtmError, CtmResult, Status};

/// Folds the sign into the lowest bit: `v < 0 ? -1 - 2v : 2v`.
#[inline]
pub fn fold_signed(value: i32) -> u32 {
    (value.wrapping_shl(1) ^ (value >> 31)) as u32
}

/// Inverse of [`fold_signed`].
#[inline]
pub fn unfold_signed(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

#[inline]
fn plane_offset(i: usize, k: usize, byte: usize, count: usize, size: usize) -> usize {
    i + (k + (3 - byte) * size) * count
}

/// Splits 32-bit words into byte planes. `words.len()` must be `count * size`.
pub fn interleave_words(words: &[u32], count: usize, size: usize) -> Vec<u8> {
    debug_assert_eq!(words.len(), count * size);
    let mut packed = vec![0u8; count * size * 4];
    for i in 0..count {
        for k in 0..size {
            let mut x = words[i * size + k];
            for byte in 0..4 {
                packed[plane_offset(i, k, byte, count, size)] = (x & 0xff) as u8;
                x >>= 8;
            }
        }
    }
    packed
}

/// Reassembles 32-bit words from byte planes.
pub fn deinterleave_words(packed: &[u8], count: usize, size: usize) -> Vec<u32> {
    debug_assert_eq!(packed.len(), count * size * 4);
    let mut words = vec![0u32; count * size];
    for i in 0..count {
        for k in 0..size {
            let mut value = 0u32;
            for byte in 0..4 {
                value |= (packed[plane_offset(i, k, byte, count, size)] as u32) << (byte * 8);
            }
            words[i * size + k] = value;
        }
    }
    words
}

pub fn interleave_ints(data: &[i32], count: usize, size: usize, signed: bool) -> Vec<u8> {
    let words: Vec<u32> = if signed {
        data.iter().map(|&v| fold_signed(v)).collect()
    } else {
        bytemuck::cast_slice::<i32, u32>(data).to_vec()
    };
    interleave_words(&words, count, size)
}

pub fn deinterleave_ints(packed: &[u8], count: usize, size: usize, signed: bool) -> Vec<i32> {
    let words = deinterleave_words(packed, count, size);
    if signed {
        words.into_iter().map(unfold_signed).collect()
    } else {
        words.into_iter().map(|w| w as i32).collect()
    }
}

/// Floats are planarized through their IEEE-754 bit patterns.
pub fn interleave_floats(data: &[f32], count: usize, size: usize) -> Vec<u8> {
    interleave_words(bytemuck::cast_slice(data), count, size)
}

pub fn deinterleave_floats(packed: &[u8], count: usize, size: usize) -> Vec<f32> {
    deinterleave_words(packed, count, size)
        .into_iter()
        .map(f32::from_bits)
        .collect()
}

/// Regroups a flat array into fixed-size tuples. Trailing values that do not
/// fill a whole tuple are dropped.
pub fn into_tuples<T: Copy + Default, const N: usize>(flat: &[T]) -> Vec<[T; N]> {
    flat.chunks_exact(N)
        .map(|chunk| {
            let mut tuple = [T::default(); N];
            tuple.copy_from_slice(chunk);
            tuple
        })
        .collect()
}

fn unpacked_size(count: usize, size: usize) -> CtmResult<usize> {
    count
        .checked_mul(size)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| CtmError::bad_format(format!("packed array of {} x {} elements is too large", count, size)))
}

/// Writes packed array sections through a compressor.
pub struct PackedWriter<'a> {
    compressor: &'a dyn Compressor,
    level: u32,
}

impl<'a> PackedWriter<'a> {
    pub fn new(compressor: &'a dyn Compressor, level: u32) -> Self {
        Self { compressor, level }
    }

    pub fn write_ints(&self, out: &mut EncoderBuffer, data: &[i32], count: usize, size: usize, signed: bool) -> Status {
        if data.len() != count * size {
            return Err(CtmError::InternalError(format!(
                "packed int array has {} values, expected {} x {}",
                data.len(),
                count,
                size
            )));
        }
        self.write_planes(out, &interleave_ints(data, count, size, signed))
    }

    pub fn write_floats(&self, out: &mut EncoderBuffer, data: &[f32], count: usize, size: usize) -> Status {
        if data.len() != count * size {
            return Err(CtmError::InternalError(format!(
                "packed float array has {} values, expected {} x {}",
                data.len(),
                count,
                size
            )));
        }
        self.write_planes(out, &interleave_floats(data, count, size))
    }

    fn write_planes(&self, out: &mut EncoderBuffer, planes: &[u8]) -> Status {
        let packed = self.compressor.compress(planes, self.level)?;
        let payload_size = u32::try_from(packed.payload.len())
            .map_err(|_| CtmError::LzmaError(format!("packed payload of {} bytes exceeds 4 GiB", packed.payload.len())))?;
        out.encode_u32(payload_size);
        out.encode(&packed.props);
        out.encode(&packed.payload);
        trace!("packed section: {} -> {} bytes", planes.len(), packed.payload.len());
        Ok(())
    }
}

/// Reads packed array sections through a compressor.
pub struct PackedReader<'a> {
    compressor: &'a dyn Compressor,
}

impl<'a> PackedReader<'a> {
    pub fn new(compressor: &'a dyn Compressor) -> Self {
        Self { compressor }
    }

    pub fn read_ints(&self, buffer: &mut DecoderBuffer<'_>, count: usize, size: usize, signed: bool) -> CtmResult<Vec<i32>> {
        let planes = self.read_planes(buffer, count, size)?;
        Ok(deinterleave_ints(&planes, count, size, signed))
    }

    pub fn read_floats(&self, buffer: &mut DecoderBuffer<'_>, count: usize, size: usize) -> CtmResult<Vec<f32>> {
        let planes = self.read_planes(buffer, count, size)?;
        Ok(deinterleave_floats(&planes, count, size))
    }

    fn read_planes(&self, buffer: &mut DecoderBuffer<'_>, count: usize, size: usize) -> CtmResult<Vec<u8>> {
        let expected = unpacked_size(count, size)?;
        let payload_size = buffer.decode_u32()? as usize;
        let mut props = [0u8; PROPS_SIZE];
        buffer.decode_bytes(&mut props)?;
        let payload = buffer.decode_slice(payload_size)?;
        self.compressor.decompress(payload, &props, expected)
    }
}
