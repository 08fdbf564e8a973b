//! OpenCTM Core Library
//!
//! Compression and decompression of triangle meshes in the OpenCTM format
//! (version 5), using the lossless MG1 or the fixed-point MG2 method.

#![allow(clippy::needless_range_loop)] // Per-axis loops index several arrays at once

// =============================================================================
// Stream layer
// =============================================================================

pub mod compressor;
pub mod decoder_buffer;
pub mod encoder_buffer;
pub mod packed_stream;
pub mod status;
pub mod version;

// =============================================================================
// Mesh model and coding stages
// =============================================================================

pub mod compression_config;
pub mod grid;
pub mod index_coding;
pub mod map_coding;
pub mod math_utils;
pub mod mesh;
pub mod normal_coding;
pub mod vertex_coding;

// =============================================================================
// Container and methods
// =============================================================================

pub mod context;
pub mod header;
pub mod mg1;
pub mod mg2;

// =============================================================================
// Re-exports
// =============================================================================

pub use compression_config::{CompressionMethod, CompressionOptions};
pub use compressor::{Compressor, LzmaCompressor, Packed};
pub use context::{Context, ContextMode};
pub use decoder_buffer::DecoderBuffer;
pub use encoder_buffer::EncoderBuffer;
pub use grid::Grid;
pub use header::FileHeader;
pub use mesh::{AttribMap, AttribMapId, Mesh, UvMap, UvMapId};
pub use status::{CtmError, CtmResult, ErrorKind, Status};
