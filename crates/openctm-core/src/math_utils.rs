//! Small fixed-size vector helpers shared by the codec stages.

use crate::status::{CtmError, CtmResult};

pub type Vec3 = [f32; 3];

#[inline]
pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn dot(a: Vec3, b: Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
pub fn length(a: Vec3) -> f32 {
    dot(a, a).sqrt()
}

#[inline]
pub fn scale(a: Vec3, s: f32) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

/// Scales `a` to unit length unless its length is at most `epsilon`, in which
/// case it is returned unchanged.
#[inline]
pub fn normalize_or_keep(a: Vec3, epsilon: f32) -> Vec3 {
    let len = length(a);
    if len > epsilon {
        scale(a, 1.0 / len)
    } else {
        a
    }
}

/// `floor(x + 0.5)` as an integer, the rounding used by every quantizer.
///
/// Values whose rounded form does not fit an `i32` (including NaN and
/// infinities) are rejected instead of saturating, since a clamped step count
/// would decode to a different value.
#[inline]
pub fn quantize(x: f32) -> CtmResult<i32> {
    let rounded = (x + 0.5).floor();
    // 2^31 is exact in f32, i32::MAX is not.
    if rounded >= i32::MIN as f32 && rounded < 2_147_483_648.0 {
        Ok(rounded as i32)
    } else {
        Err(CtmError::invalid_argument(format!(
            "precision too fine for mesh extent: {} steps do not fit 32 bits",
            x
        )))
    }
}
