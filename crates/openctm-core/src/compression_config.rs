use crate::status::{CtmError, CtmResult};
use crate::version::{FOURCC_MG1, FOURCC_MG2, FOURCC_RAW};

/// Default vertex coordinate precision (2^-10).
pub const DEFAULT_VERTEX_PRECISION: f32 = 1.0 / 1024.0;
/// Default normal precision (2^-8).
pub const DEFAULT_NORMAL_PRECISION: f32 = 1.0 / 256.0;
/// Default UV coordinate precision (2^-12).
pub const DEFAULT_UV_PRECISION: f32 = 1.0 / 4096.0;
/// Default custom attribute precision (2^-8).
pub const DEFAULT_ATTRIB_PRECISION: f32 = 1.0 / 256.0;

pub const DEFAULT_COMPRESSION_LEVEL: u32 = 1;
pub const MAX_COMPRESSION_LEVEL: u32 = 9;

/// Mesh compression method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionMethod {
    /// Lossless: sorted and delta coded triangles, verbatim floats.
    #[default]
    Mg1,
    /// Fixed point: spatial grid sort, quantized vertices and normals.
    Mg2,
}

impl CompressionMethod {
    pub fn fourcc(self) -> [u8; 4] {
        match self {
            CompressionMethod::Mg1 => FOURCC_MG1,
            CompressionMethod::Mg2 => FOURCC_MG2,
        }
    }

    pub fn from_fourcc(tag: [u8; 4]) -> CtmResult<Self> {
        match tag {
            FOURCC_MG1 => Ok(CompressionMethod::Mg1),
            FOURCC_MG2 => Ok(CompressionMethod::Mg2),
            FOURCC_RAW => Err(CtmError::bad_format("RAW method streams are not supported")),
            other => Err(CtmError::bad_format(format!(
                "unknown compression method {:?}",
                crate::version::fourcc_display(&other)
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            CompressionMethod::Mg1 => "MG1",
            CompressionMethod::Mg2 => "MG2",
        }
    }
}

/// Mesh-level compression settings. Per-map precisions live on the maps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressionOptions {
    pub method: CompressionMethod,
    /// LZMA effort, 0..=9.
    pub level: u32,
    pub vertex_precision: f32,
    pub normal_precision: f32,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            method: CompressionMethod::default(),
            level: DEFAULT_COMPRESSION_LEVEL,
            vertex_precision: DEFAULT_VERTEX_PRECISION,
            normal_precision: DEFAULT_NORMAL_PRECISION,
        }
    }
}

/// Checks that a fixed-point precision can be divided by.
pub fn validate_precision(precision: f32) -> CtmResult<f32> {
    if precision.is_finite() && precision > 0.0 {
        Ok(precision)
    } else {
        Err(CtmError::invalid_argument(format!("precision must be positive, got {}", precision)))
    }
}
