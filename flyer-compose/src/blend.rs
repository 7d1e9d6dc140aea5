// SPDX-License-Identifier: MIT
//! Straight (non-premultiplied) alpha source-over blending.
//!
//! Layer images come back from decoders with straight alpha, and the final
//! canvas is encoded as straight-alpha PNG, so blending stays in that space
//! instead of converting the whole canvas back and forth.

pub type Rgba8 = [u8; 4];

/// `src` over `dst`, both straight alpha.
///
/// `out_a = sa + da * (1 - sa)`,
/// `out_c = (sc * sa + dc * da * (1 - sa)) / out_a`.
#[inline]
pub fn over(dst: Rgba8, src: Rgba8) -> Rgba8 {
    let sa = u32::from(src[3]);
    if sa == 255 {
        return src;
    }
    if sa == 0 {
        return dst;
    }
    let da = u32::from(dst[3]);
    let inv = 255 - sa;

    // Alpha scaled by 255 * 255.
    let out_a = sa * 255 + da * inv;
    if out_a == 0 {
        return [0, 0, 0, 0];
    }

    let mut out = [0u8; 4];
    for i in 0..3 {
        let num = u32::from(src[i]) * sa * 255 + u32::from(dst[i]) * da * inv;
        out[i] = ((num + out_a / 2) / out_a).min(255) as u8;
    }
    out[3] = ((out_a + 127) / 255).min(255) as u8;
    out
}

/// Blend an equally sized RGBA8 `src` buffer over `dst` in place.
///
/// Returns `false` without touching `dst` when the buffers differ in length
/// or are not a whole number of pixels.
pub fn over_in_place(dst: &mut [u8], src: &[u8]) -> bool {
    if dst.len() != src.len() || dst.len() % 4 != 0 {
        return false;
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
        d.copy_from_slice(&out);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_source_replaces_destination() {
        assert_eq!(over([1, 2, 3, 255], [9, 8, 7, 255]), [9, 8, 7, 255]);
        assert_eq!(over([0, 0, 0, 0], [9, 8, 7, 255]), [9, 8, 7, 255]);
    }

    #[test]
    fn transparent_source_keeps_destination() {
        assert_eq!(over([1, 2, 3, 200], [255, 255, 255, 0]), [1, 2, 3, 200]);
    }

    #[test]
    fn half_alpha_over_opaque_mixes_evenly() {
        let out = over([0, 0, 0, 255], [255, 255, 255, 128]);
        assert_eq!(out[3], 255);
        assert!(out[0].abs_diff(128) <= 1);
    }

    #[test]
    fn half_alpha_over_transparent_keeps_colour() {
        let out = over([0, 0, 0, 0], [200, 100, 50, 128]);
        assert_eq!(out, [200, 100, 50, 128]);
    }

    #[test]
    fn in_place_rejects_mismatched_buffers() {
        let mut dst = [0u8; 8];
        assert!(!over_in_place(&mut dst, &[255u8; 4]));
        assert_eq!(dst, [0u8; 8]);
    }
}
