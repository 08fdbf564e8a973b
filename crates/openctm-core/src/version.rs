// OpenCTM stream format constants.
//
// Magic, format version and the four-character section tags that frame every
// part of a compressed stream.

/// File magic at offset zero.
pub const MAGIC: [u8; 4] = *b"OCTM";

/// The only stream format version this library reads and writes.
pub const FORMAT_VERSION: u32 = 5;

/// Header flag: the mesh carries per-vertex normals.
pub const HAS_NORMALS_BIT: u32 = 0x0000_0001;

// =============================================================================
// Method identifiers
// =============================================================================

pub const FOURCC_RAW: [u8; 4] = *b"RAW\0";
pub const FOURCC_MG1: [u8; 4] = *b"MG1\0";
pub const FOURCC_MG2: [u8; 4] = *b"MG2\0";

// =============================================================================
// Section tags
// =============================================================================

/// MG2 header (precisions and grid definition).
pub const FOURCC_MG2_HEADER: [u8; 4] = *b"MG2H";
pub const FOURCC_VERTICES: [u8; 4] = *b"VERT";
pub const FOURCC_GRID_INDICES: [u8; 4] = *b"GIDX";
pub const FOURCC_INDICES: [u8; 4] = *b"INDX";
pub const FOURCC_NORMALS: [u8; 4] = *b"NORM";
pub const FOURCC_UV_MAP: [u8; 4] = *b"TEXC";
pub const FOURCC_ATTRIB_MAP: [u8; 4] = *b"ATTR";

/// Renders a tag for log and error messages, replacing NUL padding.
pub fn fourcc_display(tag: &[u8; 4]) -> String {
    tag.iter()
        .map(|&b| if b.is_ascii_graphic() { b as char } else { '.' })
        .collect()
}
