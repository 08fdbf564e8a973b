//! MG2: fixed-point method.
//!
//! Vertices are sorted into a uniform grid and quantized relative to their
//! cell origin. Normals are coded as angles against a smooth normal that the
//! decoder can recompute from the quantized geometry, so everything downstream
//! of `VERT` is built from the restored vertices rather than the originals.

use log::debug;

use crate::compression_config::CompressionOptions;
use crate::decoder_buffer::DecoderBuffer;
use crate::encoder_buffer::EncoderBuffer;
use crate::grid::Grid;
use crate::header::FileHeader;
use crate::index_coding::{
    check_indices, make_index_deltas, rearrange_triangles, reindex_triangles, restore_indices, Triangle,
};
use crate::map_coding::{
    make_attrib_deltas, make_uv_deltas, restore_attrib_values, restore_uv_coords,
};
use crate::mesh::{AttribMap, Mesh, UvMap};
use crate::normal_coding::{make_normal_deltas, restore_normals};
use crate::packed_stream::{into_tuples, PackedReader, PackedWriter};
use crate::status::{CtmError, CtmResult, Status};
use crate::vertex_coding::{grid_index_deltas, make_vertex_deltas, restore_grid_indices, restore_vertices, sort_vertices};
use crate::version::{
    FOURCC_ATTRIB_MAP, FOURCC_GRID_INDICES, FOURCC_INDICES, FOURCC_MG2_HEADER, FOURCC_NORMALS, FOURCC_UV_MAP,
    FOURCC_VERTICES,
};

pub fn encode_mg2(
    mesh: &Mesh,
    options: &CompressionOptions,
    writer: &PackedWriter<'_>,
    out: &mut EncoderBuffer,
) -> Status {
    let vertex_count = mesh.vertex_count();
    let triangle_count = mesh.triangle_count();

    let grid = Grid::from_vertices(&mesh.vertices);

    out.encode_fourcc(FOURCC_MG2_HEADER);
    out.encode_f32(options.vertex_precision);
    out.encode_f32(options.normal_precision);
    for v in grid.min() {
        out.encode_f32(v);
    }
    for v in grid.max() {
        out.encode_f32(v);
    }
    for d in grid.division() {
        out.encode_u32(d);
    }

    let sorted = sort_vertices(&mesh.vertices, &grid);

    let int_vertices = make_vertex_deltas(&mesh.vertices, &sorted, &grid, options.vertex_precision)?;
    let start = out.size();
    out.encode_fourcc(FOURCC_VERTICES);
    writer.write_ints(out, &int_vertices, vertex_count, 3, false)?;
    debug!("MG2 VERT: {} vertices, {} bytes", vertex_count, out.size() - start);

    let gidx = grid_index_deltas(&sorted);
    let start = out.size();
    out.encode_fourcc(FOURCC_GRID_INDICES);
    writer.write_ints(out, bytemuck::cast_slice(&gidx), vertex_count, 1, false)?;
    debug!("MG2 GIDX: {} bytes", out.size() - start);

    // The decoder only ever sees quantized positions.
    let grid_indices: Vec<u32> = sorted.iter().map(|sv| sv.grid_index).collect();
    let restored = restore_vertices(&int_vertices, &grid_indices, &grid, options.vertex_precision);

    let mut indices = reindex_triangles(&mesh.indices, &sorted)?;
    rearrange_triangles(&mut indices);
    let sorted_indices: Vec<Triangle> = indices.clone();
    make_index_deltas(&mut indices);
    let start = out.size();
    out.encode_fourcc(FOURCC_INDICES);
    writer.write_ints(out, bytemuck::cast_slice(&indices), triangle_count, 3, false)?;
    debug!("MG2 INDX: {} triangles, {} bytes", triangle_count, out.size() - start);

    if let Some(normals) = &mesh.normals {
        let deltas = make_normal_deltas(normals, &restored, &sorted_indices, &sorted, options.normal_precision)?;
        let start = out.size();
        out.encode_fourcc(FOURCC_NORMALS);
        writer.write_ints(out, &deltas, vertex_count, 3, false)?;
        debug!("MG2 NORM: {} bytes", out.size() - start);
    }

    for map in &mesh.uv_maps {
        let deltas = make_uv_deltas(map, &sorted)?;
        let start = out.size();
        out.encode_fourcc(FOURCC_UV_MAP);
        out.encode_string(Some(&map.name));
        out.encode_string(map.file_name.as_deref());
        out.encode_f32(map.precision);
        writer.write_ints(out, &deltas, vertex_count, 2, true)?;
        debug!("MG2 TEXC {:?}: {} bytes", map.name, out.size() - start);
    }

    for map in &mesh.attrib_maps {
        let deltas = make_attrib_deltas(map, &sorted)?;
        let start = out.size();
        out.encode_fourcc(FOURCC_ATTRIB_MAP);
        out.encode_string(Some(&map.name));
        out.encode_f32(map.precision);
        writer.write_ints(out, &deltas, vertex_count, 4, true)?;
        debug!("MG2 ATTR {:?}: {} bytes", map.name, out.size() - start);
    }

    Ok(())
}

/// Decodes an MG2 body. The stored vertex and normal precisions are written
/// back into `options`.
pub fn decode_mg2(
    header: &FileHeader,
    reader: &PackedReader<'_>,
    buffer: &mut DecoderBuffer<'_>,
    options: &mut CompressionOptions,
) -> CtmResult<Mesh> {
    let vertex_count = header.vertex_count as usize;
    let triangle_count = header.triangle_count as usize;

    buffer.expect_fourcc(FOURCC_MG2_HEADER)?;
    let vertex_precision = decode_precision(buffer, "vertex")?;
    let normal_precision = decode_precision(buffer, "normal")?;
    let min = decode_vec3(buffer)?;
    let max = decode_vec3(buffer)?;
    let mut division = [0u32; 3];
    for d in division.iter_mut() {
        *d = buffer.decode_u32()?;
    }
    let grid = Grid::from_parts(min, max, division)?;
    debug!(
        "MG2 header: vertex precision {}, normal precision {}, division {:?}",
        vertex_precision, normal_precision, division
    );

    buffer.expect_fourcc(FOURCC_VERTICES)?;
    let int_vertices = reader.read_ints(buffer, vertex_count, 3, false)?;

    buffer.expect_fourcc(FOURCC_GRID_INDICES)?;
    let mut grid_indices: Vec<u32> = reader
        .read_ints(buffer, vertex_count, 1, false)?
        .into_iter()
        .map(|v| v as u32)
        .collect();
    restore_grid_indices(&mut grid_indices, &grid)?;

    let vertices = restore_vertices(&int_vertices, &grid_indices, &grid, vertex_precision);

    buffer.expect_fourcc(FOURCC_INDICES)?;
    let flat = reader.read_ints(buffer, triangle_count, 3, false)?;
    let mut indices: Vec<Triangle> = into_tuples(bytemuck::cast_slice::<i32, u32>(&flat));
    restore_indices(&mut indices);
    check_indices(&indices, vertex_count)?;

    let mut mesh = Mesh::new(vertices, indices);

    if header.has_normals() {
        buffer.expect_fourcc(FOURCC_NORMALS)?;
        let deltas = reader.read_ints(buffer, vertex_count, 3, false)?;
        mesh.normals = Some(restore_normals(&deltas, &mesh.vertices, &mesh.indices, normal_precision));
    }

    for _ in 0..header.uv_map_count {
        buffer.expect_fourcc(FOURCC_UV_MAP)?;
        let name = buffer.decode_string()?.unwrap_or_default();
        let file_name = buffer.decode_string()?;
        let precision = decode_precision(buffer, "UV map")?;
        let deltas = reader.read_ints(buffer, vertex_count, 2, true)?;
        mesh.uv_maps.push(UvMap {
            name,
            file_name,
            precision,
            coords: restore_uv_coords(&deltas, precision),
        });
    }

    for _ in 0..header.attrib_map_count {
        buffer.expect_fourcc(FOURCC_ATTRIB_MAP)?;
        let name = buffer.decode_string()?.unwrap_or_default();
        let precision = decode_precision(buffer, "attribute map")?;
        let deltas = reader.read_ints(buffer, vertex_count, 4, true)?;
        mesh.attrib_maps.push(AttribMap {
            name,
            precision,
            values: restore_attrib_values(&deltas, precision),
        });
    }

    options.vertex_precision = vertex_precision;
    options.normal_precision = normal_precision;
    Ok(mesh)
}

fn decode_precision(buffer: &mut DecoderBuffer<'_>, what: &str) -> CtmResult<f32> {
    let precision = buffer.decode_f32()?;
    if !precision.is_finite() || precision <= 0.0 {
        return Err(CtmError::bad_format(format!("invalid {} precision {}", what, precision)));
    }
    Ok(precision)
}

fn decode_vec3(buffer: &mut DecoderBuffer<'_>) -> CtmResult<[f32; 3]> {
    Ok([buffer.decode_f32()?, buffer.decode_f32()?, buffer.decode_f32()?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression_config::CompressionMethod;
    use crate::compressor::LzmaCompressor;
    use crate::status::ErrorKind;
    use crate::version::HAS_NORMALS_BIT;

    fn header_for(mesh: &Mesh) -> FileHeader {
        FileHeader {
            method: CompressionMethod::Mg2,
            vertex_count: mesh.vertex_count() as u32,
            triangle_count: mesh.triangle_count() as u32,
            uv_map_count: mesh.uv_maps.len() as u32,
            attrib_map_count: mesh.attrib_maps.len() as u32,
            flags: if mesh.has_normals() { HAS_NORMALS_BIT } else { 0 },
            comment: None,
        }
    }

    fn encode(mesh: &Mesh, options: &CompressionOptions) -> Vec<u8> {
        let compressor = LzmaCompressor::new();
        let mut out = EncoderBuffer::new();
        encode_mg2(mesh, options, &PackedWriter::new(&compressor, options.level), &mut out).unwrap();
        out.into_inner()
    }

    fn decode(mesh: &Mesh, data: &[u8]) -> CtmResult<Mesh> {
        let compressor = LzmaCompressor::new();
        let mut buffer = DecoderBuffer::new(data);
        let mut options = CompressionOptions::default();
        let decoded = decode_mg2(&header_for(mesh), &PackedReader::new(&compressor), &mut buffer, &mut options)?;
        assert_eq!(buffer.remaining_size(), 0);
        Ok(decoded)
    }

    #[test]
    fn test_grid_quantization_error() {
        let mesh = Mesh::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.3, 0.7, 0.25]],
            vec![[0, 1, 2], [1, 3, 2]],
        );
        let options = CompressionOptions {
            method: CompressionMethod::Mg2,
            ..Default::default()
        };
        let data = encode(&mesh, &options);

        let decoded = decode(&mesh, &data).unwrap();

        assert_eq!(decoded.vertex_count(), 4);
        assert_eq!(decoded.triangle_count(), 2);
        let mut expected: Vec<[f32; 3]> = mesh.vertices.clone();
        let mut actual: Vec<[f32; 3]> = decoded.vertices.clone();
        let by_pos = |a: &[f32; 3], b: &[f32; 3]| a.partial_cmp(b).unwrap();
        expected.sort_by(by_pos);
        actual.sort_by(by_pos);
        for (e, a) in expected.iter().zip(&actual) {
            for axis in 0..3 {
                assert!((e[axis] - a[axis]).abs() <= 0.5 * options.vertex_precision + 1e-6);
            }
        }
    }

    #[test]
    fn test_rejects_bad_precision() {
        let mesh = Mesh::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], vec![[0, 1, 2]]);
        let mut data = encode(&mesh, &CompressionOptions::default());
        // Vertex precision sits right after the MG2H tag.
        data[4..8].copy_from_slice(&(-1.0f32).to_le_bytes());

        let err = decode(&mesh, &data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadFormat);
    }

    #[test]
    fn test_rejects_zero_division() {
        let mesh = Mesh::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], vec![[0, 1, 2]]);
        let mut data = encode(&mesh, &CompressionOptions::default());
        // MG2H tag, two precisions, min and max, then the division.
        let offset = 4 + 8 + 24;
        data[offset..offset + 4].copy_from_slice(&0u32.to_le_bytes());

        let err = decode(&mesh, &data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadFormat);
    }
}
