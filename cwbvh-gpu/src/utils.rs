mod u32_ext;

pub use self::u32_ext::*;

/// Returns `1.0 / x`, saturating tiny values to [`crate::BVH_FAR`] so that
/// axis-parallel rays don't produce NaNs in slab tests.
pub fn safe_rcp(x: f32) -> f32 {
    if x > 1e-12 || x < -1e-12 {
        1.0 / x
    } else {
        crate::BVH_FAR
    }
}

/// Sign-extends the lowest byte of `x`.
pub fn sign_extend_byte(x: u32) -> i32 {
    ((x << 24) as i32) >> 24
}

/// Returns `2 ^ exponent` for an exponent in the normal range of `f32`.
pub fn exp2i(exponent: i32) -> f32 {
    f32::from_bits(((exponent + 127) as u32) << 23)
}
