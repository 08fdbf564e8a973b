//! MG1: lossless method.
//!
//! Only the triangle list is transformed (rotated, sorted and delta coded);
//! vertex data is stored as verbatim floats in planar layout.

use log::debug;

use crate::compression_config::{DEFAULT_ATTRIB_PRECISION, DEFAULT_UV_PRECISION};
use crate::decoder_buffer::DecoderBuffer;
use crate::encoder_buffer::EncoderBuffer;
use crate::header::FileHeader;
use crate::index_coding::{make_index_deltas, rearrange_triangles, restore_indices};
use crate::mesh::{AttribMap, Mesh, UvMap};
use crate::packed_stream::{into_tuples, PackedReader, PackedWriter};
use crate::status::{CtmResult, Status};
use crate::version::{FOURCC_ATTRIB_MAP, FOURCC_INDICES, FOURCC_NORMALS, FOURCC_UV_MAP, FOURCC_VERTICES};

pub fn encode_mg1(mesh: &Mesh, writer: &PackedWriter<'_>, out: &mut EncoderBuffer) -> Status {
    let vertex_count = mesh.vertex_count();
    let triangle_count = mesh.triangle_count();

    let mut indices = mesh.indices.clone();
    rearrange_triangles(&mut indices);
    make_index_deltas(&mut indices);

    let start = out.size();
    out.encode_fourcc(FOURCC_INDICES);
    writer.write_ints(out, bytemuck::cast_slice(&indices), triangle_count, 3, false)?;
    debug!("MG1 INDX: {} triangles, {} bytes", triangle_count, out.size() - start);

    let start = out.size();
    out.encode_fourcc(FOURCC_VERTICES);
    writer.write_floats(out, bytemuck::cast_slice(&mesh.vertices), vertex_count * 3, 1)?;
    debug!("MG1 VERT: {} vertices, {} bytes", vertex_count, out.size() - start);

    if let Some(normals) = &mesh.normals {
        let start = out.size();
        out.encode_fourcc(FOURCC_NORMALS);
        writer.write_floats(out, bytemuck::cast_slice(normals), vertex_count, 3)?;
        debug!("MG1 NORM: {} bytes", out.size() - start);
    }

    for map in &mesh.uv_maps {
        let start = out.size();
        out.encode_fourcc(FOURCC_UV_MAP);
        out.encode_string(Some(&map.name));
        out.encode_string(map.file_name.as_deref());
        writer.write_floats(out, bytemuck::cast_slice(&map.coords), vertex_count, 2)?;
        debug!("MG1 TEXC {:?}: {} bytes", map.name, out.size() - start);
    }

    for map in &mesh.attrib_maps {
        let start = out.size();
        out.encode_fourcc(FOURCC_ATTRIB_MAP);
        out.encode_string(Some(&map.name));
        writer.write_floats(out, bytemuck::cast_slice(&map.values), vertex_count, 4)?;
        debug!("MG1 ATTR {:?}: {} bytes", map.name, out.size() - start);
    }

    Ok(())
}

pub fn decode_mg1(header: &FileHeader, reader: &PackedReader<'_>, buffer: &mut DecoderBuffer<'_>) -> CtmResult<Mesh> {
    let vertex_count = header.vertex_count as usize;
    let triangle_count = header.triangle_count as usize;

    buffer.expect_fourcc(FOURCC_INDICES)?;
    let flat = reader.read_ints(buffer, triangle_count, 3, false)?;
    let mut indices: Vec<[u32; 3]> = into_tuples(bytemuck::cast_slice::<i32, u32>(&flat));
    restore_indices(&mut indices);

    buffer.expect_fourcc(FOURCC_VERTICES)?;
    let vertices = into_tuples(&reader.read_floats(buffer, vertex_count * 3, 1)?);

    let mut mesh = Mesh::new(vertices, indices);

    if header.has_normals() {
        buffer.expect_fourcc(FOURCC_NORMALS)?;
        mesh.normals = Some(into_tuples(&reader.read_floats(buffer, vertex_count, 3)?));
    }

    for _ in 0..header.uv_map_count {
        buffer.expect_fourcc(FOURCC_UV_MAP)?;
        let name = buffer.decode_string()?.unwrap_or_default();
        let file_name = buffer.decode_string()?;
        let coords = into_tuples(&reader.read_floats(buffer, vertex_count, 2)?);
        mesh.uv_maps.push(UvMap {
            name,
            file_name,
            precision: DEFAULT_UV_PRECISION,
            coords,
        });
    }

    for _ in 0..header.attrib_map_count {
        buffer.expect_fourcc(FOURCC_ATTRIB_MAP)?;
        let name = buffer.decode_string()?.unwrap_or_default();
        let values = into_tuples(&reader.read_floats(buffer, vertex_count, 4)?);
        mesh.attrib_maps.push(AttribMap {
            name,
            precision: DEFAULT_ATTRIB_PRECISION,
            values,
        });
    }

    Ok(mesh)
}
