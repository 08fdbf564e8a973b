//! Fixed-point running deltas for UV maps and custom attribute maps.

use crate::math_utils::quantize;
use crate::mesh::{AttribMap, UvMap};
use crate::status::CtmResult;
use crate::vertex_coding::SortVertex;

/// Quantizes `values` (visited in sorted vertex order) and stores each
/// component as the difference to the same component of the previous vertex.
pub fn make_deltas<const N: usize>(
    values: &[[f32; N]],
    sorted: &[SortVertex],
    precision: f32,
) -> CtmResult<Vec<i32>> {
    let scale = 1.0 / precision;
    let mut prev = [0i32; N];
    let mut out = Vec::with_capacity(sorted.len() * N);
    for sv in sorted {
        let value = &values[sv.original_index as usize];
        for k in 0..N {
            let q = quantize(scale * value[k])?;
            out.push(q.wrapping_sub(prev[k]));
            prev[k] = q;
        }
    }
    Ok(out)
}

/// Accumulates the deltas per component and rescales them.
pub fn restore_values<const N: usize>(deltas: &[i32], precision: f32) -> Vec<[f32; N]> {
    let mut prev = [0i32; N];
    deltas
        .chunks_exact(N)
        .map(|d| {
            let mut value = [0.0f32; N];
            for k in 0..N {
                prev[k] = prev[k].wrapping_add(d[k]);
                value[k] = prev[k] as f32 * precision;
            }
            value
        })
        .collect()
}

pub fn make_uv_deltas(map: &UvMap, sorted: &[SortVertex]) -> CtmResult<Vec<i32>> {
    make_deltas(&map.coords, sorted, map.precision)
}

pub fn restore_uv_coords(deltas: &[i32], precision: f32) -> Vec<[f32; 2]> {
    restore_values(deltas, precision)
}

pub fn make_attrib_deltas(map: &AttribMap, sorted: &[SortVertex]) -> CtmResult<Vec<i32>> {
    make_deltas(&map.values, sorted, map.precision)
}

pub fn restore_attrib_values(deltas: &[i32], precision: f32) -> Vec<[f32; 4]> {
    restore_values(deltas, precision)
}
