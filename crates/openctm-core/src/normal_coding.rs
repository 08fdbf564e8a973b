//! MG2 normal coding.
//!
//! Each normal is expressed relative to a smooth normal predicted from the
//! decoded geometry: a signed magnitude plus spherical angles (phi, theta) in
//! a local frame whose Z axis is the prediction. The azimuth resolution shrinks
//! towards the pole of that frame, where it carries little information.

use std::f32::consts::PI;

use log::warn;

use crate::index_coding::Triangle;
use crate::math_utils::{cross, dot, length, normalize_or_keep, quantize, scale, sub, Vec3};
use crate::status::CtmResult;
use crate::vertex_coding::SortVertex;

/// Orthonormal frame, rows are the X, Y and Z axes.
pub type Basis = [Vec3; 3];

/// Per-vertex average of the unit face normals of all adjacent triangles.
///
/// Degenerate triangles contribute their unnormalized (near zero) cross
/// product, and vertices without usable neighbours keep their raw sum.
pub fn calc_smooth_normals(vertices: &[Vec3], indices: &[Triangle]) -> Vec<Vec3> {
    let mut sums = vec![[0.0f32; 3]; vertices.len()];
    for tri in indices {
        let p0 = vertices[tri[0] as usize];
        let e1 = sub(vertices[tri[1] as usize], p0);
        let e2 = sub(vertices[tri[2] as usize], p0);
        let n = normalize_or_keep(cross(e1, e2), 1e-10);
        for &corner in tri {
            let sum = &mut sums[corner as usize];
            for axis in 0..3 {
                sum[axis] += n[axis];
            }
        }
    }
    sums.into_iter().map(|n| normalize_or_keep(n, 1e-10)).collect()
}

/// Builds a frame with `normal` (unit length) as its Z axis.
///
/// X is `(0,0,1) x n + (1,0,0) x n`, which varies continuously with `n`, so
/// nearby normals get nearby frames. It only vanishes for `n = ±(1,0,1)/√2`;
/// encoder and decoder then share the same degenerate frame.
pub fn make_normal_coord_sys(normal: Vec3) -> Basis {
    let z = normal;
    let mut x = [-normal[1], normal[0] - normal[2], normal[1]];
    // |x[2]| == |x[0]|
    let len = (2.0 * x[0] * x[0] + x[1] * x[1]).sqrt();
    if len > 1.0e-20 {
        x = scale(x, 1.0 / len);
    }
    let y = cross(z, x);
    [x, y, z]
}

/// Azimuth steps per radian for a given polar step count.
#[inline]
fn theta_scale(int_phi: i32) -> f32 {
    if int_phi == 0 {
        0.0
    } else if int_phi <= 4 {
        2.0 / PI
    } else {
        int_phi as f32 / PI
    }
}

/// Radians per azimuth step, the inverse of [`theta_scale`].
#[inline]
fn theta_step(int_phi: i32) -> f32 {
    if int_phi == 0 {
        0.0
    } else if int_phi <= 4 {
        PI / 2.0
    } else {
        PI / int_phi as f32
    }
}

/// Number of non-zero normals whose prediction is the zero vector. These
/// belong to vertices no triangle references and decode as `[0, 0, 0]`.
fn count_unpredictable(normals: &[Vec3], sorted: &[SortVertex], smooth: &[Vec3]) -> usize {
    sorted
        .iter()
        .zip(smooth)
        .filter(|&(sv, predicted)| *predicted == [0.0; 3] && length(normals[sv.original_index as usize]) >= 1e-10)
        .count()
}

/// Quantizes normals (in sorted order) against smooth normals computed from
/// the decoder-side `vertices` and `indices`. Returns `3 * V` integers:
/// signed magnitude, polar step, azimuth step.
pub fn make_normal_deltas(
    normals: &[Vec3],
    vertices: &[Vec3],
    indices: &[Triangle],
    sorted: &[SortVertex],
    precision: f32,
) -> CtmResult<Vec<i32>> {
    let smooth = calc_smooth_normals(vertices, indices);
    let lost = count_unpredictable(normals, sorted, &smooth);
    if lost > 0 {
        warn!("{} normal(s) on unreferenced vertices will decode as zero", lost);
    }
    let inv_precision = 1.0 / precision;
    let mut out = Vec::with_capacity(sorted.len() * 3);

    for (sv, &predicted) in sorted.iter().zip(&smooth) {
        let normal = normals[sv.original_index as usize];

        let mut magnitude = length(normal);
        if magnitude < 1e-10 {
            magnitude = 1.0;
        }
        if dot(predicted, normal) < 0.0 {
            magnitude = -magnitude;
        }
        out.push(quantize(inv_precision * magnitude)?);

        // Unit normal, flipped onto the predicted hemisphere.
        let n = scale(normal, 1.0 / magnitude);
        let basis = make_normal_coord_sys(predicted);
        let local = [dot(basis[0], n), dot(basis[1], n), dot(basis[2], n)];

        let phi = if local[2] >= 1.0 { 0.0 } else { local[2].max(-1.0).acos() };
        let theta = local[1].atan2(local[0]);

        let int_phi = quantize(phi * (inv_precision / (0.5 * PI)))?;
        let int_theta = quantize((theta + PI) * theta_scale(int_phi))?;
        out.push(int_phi);
        out.push(int_theta);
    }
    Ok(out)
}

/// Reconstructs normals from [`make_normal_deltas`] output.
pub fn restore_normals(deltas: &[i32], vertices: &[Vec3], indices: &[Triangle], precision: f32) -> Vec<Vec3> {
    let smooth = calc_smooth_normals(vertices, indices);

    deltas
        .chunks_exact(3)
        .zip(&smooth)
        .map(|(d, &predicted)| {
            let magnitude = d[0] as f32 * precision;
            let int_phi = d[1];
            let phi = int_phi as f32 * (0.5 * PI) * precision;
            let theta = d[2] as f32 * theta_step(int_phi) - PI;

            let local = [phi.sin() * theta.cos(), phi.sin() * theta.sin(), phi.cos()];
            let basis = make_normal_coord_sys(predicted);
            let mut n = [0.0f32; 3];
            for axis in 0..3 {
                n[axis] = basis[0][axis] * local[0] + basis[1][axis] * local[1] + basis[2][axis] * local[2];
            }
            scale(n, magnitude)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_orthonormal(basis: &Basis) {
        for i in 0..3 {
            assert!((length(basis[i]) - 1.0).abs() < 1e-5, "axis {} not unit: {:?}", i, basis);
            for j in (i + 1)..3 {
                assert!(dot(basis[i], basis[j]).abs() < 1e-5, "axes {} {} not orthogonal", i, j);
            }
        }
        // Right handed: X x Y == Z.
        let z = cross(basis[0], basis[1]);
        for axis in 0..3 {
            assert!((z[axis] - basis[2][axis]).abs() < 1e-5);
        }
    }

    #[test]
    fn test_basis_is_orthonormal() {
        let normals = [
            [0.0, 0.0, 1.0],
            [0.0, 0.0, -1.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.577_350_3, 0.577_350_3, 0.577_350_3],
        ];
        for n in normals {
            assert_orthonormal(&make_normal_coord_sys(n));
        }
    }

    #[test]
    fn test_smooth_normals_of_flat_quad() {
        let vertices = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]];
        let indices = vec![[0, 1, 2], [0, 2, 3]];
        for n in calc_smooth_normals(&vertices, &indices) {
            assert!((n[2] - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_unreferenced_vertex_gets_zero_prediction() {
        let vertices = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [5.0, 5.0, 5.0]];
        let smooth = calc_smooth_normals(&vertices, &[[0, 1, 2]]);
        assert_eq!(smooth[3], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unreferenced_normal_is_counted_and_decodes_to_zero() {
        let vertices = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [5.0, 5.0, 5.0]];
        let indices = vec![[0, 1, 2]];
        let sorted: Vec<SortVertex> = (0..4)
            .map(|i| SortVertex { x: 0.0, grid_index: 0, original_index: i })
            .collect();
        let mut normals = vec![[0.0, 0.0, 1.0]; 3];
        normals.push([0.0, 1.0, 0.0]);

        let smooth = calc_smooth_normals(&vertices, &indices);
        assert_eq!(count_unpredictable(&normals, &sorted, &smooth), 1);
        normals[3] = [0.0; 3];
        assert_eq!(count_unpredictable(&normals, &sorted, &smooth), 0);
        normals[3] = [0.0, 1.0, 0.0];

        let precision = 1.0 / 256.0;
        let deltas = make_normal_deltas(&normals, &vertices, &indices, &sorted, precision).unwrap();
        let restored = restore_normals(&deltas, &vertices, &indices, precision);
        assert_eq!(restored[3], [0.0, 0.0, 0.0]);
        assert!((restored[0][2] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_theta_resolution_thresholds() {
        assert_eq!(theta_scale(0), 0.0);
        assert_eq!(theta_scale(3), 2.0 / PI);
        assert_eq!(theta_scale(10), 10.0 / PI);
        for int_phi in [1, 4, 5, 100] {
            assert!((theta_scale(int_phi) * theta_step(int_phi) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_normal_round_trip() {
        // A bent strip so the smooth normals differ per vertex.
        let vertices = vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.2],
            [0.0, 1.0, 0.1],
            [1.0, 1.0, 0.6],
            [0.5, 2.0, 0.9],
        ];
        let indices = vec![[0, 1, 2], [1, 3, 2], [2, 3, 4]];
        let normals = vec![
            [0.0, 0.0, 1.0],
            [0.3, -0.2, 0.93],
            [-0.6, 0.0, 0.8],
            [0.0, 0.0, -1.0],
            [0.0, 0.0, 2.0],
        ];
        let sorted: Vec<SortVertex> = (0..5)
            .map(|i| SortVertex { x: 0.0, grid_index: 0, original_index: i })
            .collect();
        let precision = 1.0 / 256.0;

        let deltas = make_normal_deltas(&normals, &vertices, &indices, &sorted, precision).unwrap();
        let restored = restore_normals(&deltas, &vertices, &indices, precision);

        for (original, r) in normals.iter().zip(&restored) {
            let len = length(*original);
            let angle = (dot(*original, *r) / (len * length(*r))).clamp(-1.0, 1.0).acos();
            assert!(angle < 0.03, "angle error {} for {:?} -> {:?}", angle, original, r);
            assert!((len - length(*r)).abs() <= precision, "magnitude {:?} -> {:?}", original, r);
        }
        // The opposing normal is coded with a negative magnitude.
        assert!(deltas[9] < 0);
    }
}
