//! Bit-depth rescaling of sample planes.
//!
//! Samples are widened by a plain left shift, and narrowed by a rounding right
//! shift followed by a clip into a legal range. The narrowing direction is
//! where BT.709 "studio range" clipping may be requested.

/// An inclusive range samples are clipped into when narrowing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ClipRange {
    pub min: i32,
    pub max: i32,
}

impl ClipRange {
    /// The full range of a `depth`-bit sample: `0..=(1 << depth) - 1`.
    pub fn full(depth: u32) -> Self {
        Self {
            min: 0,
            max: (1 << depth) - 1,
        }
    }

    /// The ITU-R BT.709 legal range of a `depth`-bit sample.
    ///
    /// `depth` must be at least 8.
    pub fn rec709(depth: u32) -> Self {
        debug_assert!(depth >= 8);

        Self {
            min: 1 << (depth - 8),
            max: (0xFF << (depth - 8)) - 1,
        }
    }

    /// Pick the range for converting to a `depth`-bit result with the given
    /// shift.
    ///
    /// BT.709 clipping only ever applies to a downward rescale into at least
    /// eight bits; everything else clips to the full range.
    pub fn for_rescale(depth: u32, shift: i32, clip_to_rec709: bool) -> Self {
        if clip_to_rec709 && shift < 0 && depth >= 8 {
            Self::rec709(depth)
        } else {
            Self::full(depth)
        }
    }
}

mod scalar_impl {
    use super::ClipRange;

    /// Rescale one sample by a positive (widening) shift.
    #[inline]
    pub fn widen(sample: i16, shift: i32) -> i16 {
        ((sample as i32) << shift) as i16
    }

    /// Rescale one sample by a negative (narrowing) shift, with rounding.
    #[inline]
    pub fn narrow(sample: i16, shift: i32, range: ClipRange) -> i16 {
        let rounding = 1 << (shift - 1);

        ((sample as i32 + rounding) >> shift).clamp(range.min, range.max) as i16
    }
}

mod simd_impl {
    use super::ClipRange;
    use wide::i32x8;

    /// Utility to upcast a slice of 8 samples into an `i32x8` vector.
    #[inline]
    fn into_simd32(a: &[i16]) -> i32x8 {
        debug_assert!(a.len() == 8);
        i32x8::from([
            a[0] as i32,
            a[1] as i32,
            a[2] as i32,
            a[3] as i32,
            a[4] as i32,
            a[5] as i32,
            a[6] as i32,
            a[7] as i32,
        ])
    }

    /// Store an `i32x8` vector back into 8 samples, truncating each lane.
    #[inline]
    fn store(v: i32x8, a: &mut [i16]) {
        for (dst, lane) in a.iter_mut().zip(v.as_array_ref()) {
            *dst = *lane as i16;
        }
    }

    /// Same as `scalar_impl::widen`, but on 8 samples at a time.
    #[inline]
    pub fn widen_simd(a: &mut [i16], shift: i32) {
        store(into_simd32(a) << shift, a);
    }

    /// Same as `scalar_impl::narrow`, but on 8 samples at a time.
    #[inline]
    pub fn narrow_simd(a: &mut [i16], shift: i32, range: ClipRange) {
        let rounding = i32x8::splat(1 << (shift - 1));
        let v = (into_simd32(a) + rounding) >> shift;

        store(
            v.max(i32x8::splat(range.min)).min(i32x8::splat(range.max)),
            a,
        );
    }
}

use scalar_impl::{narrow, widen};
use simd_impl::{narrow_simd, widen_simd};

/// Rescale a row of samples by `2^shift`.
///
/// A positive shift widens every sample without clipping; a negative shift
/// divides with rounding and clips into `range`; zero leaves the row alone.
pub fn scale_row(row: &mut [i16], shift: i32, range: ClipRange) {
    if shift > 0 {
        let mut chunks = row.chunks_exact_mut(8);
        for chunk in &mut chunks {
            widen_simd(chunk, shift);
        }

        for sample in chunks.into_remainder() {
            *sample = widen(*sample, shift);
        }
    } else if shift < 0 {
        let shift = -shift;
        let mut chunks = row.chunks_exact_mut(8);
        for chunk in &mut chunks {
            narrow_simd(chunk, shift, range);
        }

        for sample in chunks.into_remainder() {
            *sample = narrow(*sample, shift, range);
        }
    }
}

/// Rescale the `width` by `height` region of a strided plane by `2^shift`.
///
/// `plane` starts at the first sample of the region and successive rows are
/// `stride` samples apart. See `scale_row` for the per-sample behavior.
pub fn scale_plane(
    plane: &mut [i16],
    stride: usize,
    width: usize,
    height: usize,
    shift: i32,
    range: ClipRange,
) {
    if shift == 0 || width == 0 {
        return;
    }

    for row in plane.chunks_mut(stride).take(height) {
        let len = width.min(row.len());
        scale_row(&mut row[..len], shift, range);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_and_rec709_ranges() {
        assert_eq!(ClipRange { min: 0, max: 255 }, ClipRange::full(8));
        assert_eq!(ClipRange { min: 0, max: 1023 }, ClipRange::full(10));
        assert_eq!(ClipRange { min: 1, max: 254 }, ClipRange::rec709(8));
        assert_eq!(ClipRange { min: 4, max: 1019 }, ClipRange::rec709(10));
    }

    #[test]
    fn rec709_only_when_narrowing() {
        assert_eq!(ClipRange::rec709(8), ClipRange::for_rescale(8, -2, true));
        assert_eq!(ClipRange::full(8), ClipRange::for_rescale(8, -2, false));
        assert_eq!(ClipRange::full(10), ClipRange::for_rescale(10, 2, true));
        assert_eq!(ClipRange::full(6), ClipRange::for_rescale(6, -2, true));
    }

    #[test]
    fn widen_multiplies_without_clipping() {
        let mut row: Vec<i16> = (0..19).map(|v| v * 60).collect();
        scale_row(&mut row, 2, ClipRange::full(8));

        for (i, sample) in row.iter().enumerate() {
            assert_eq!(i as i16 * 240, *sample);
        }
    }

    #[test]
    fn narrow_rounds_then_clips() {
        // 11 samples so both the SIMD and scalar paths see the same values.
        let mut row = [1023, 1022, 1021, 2, 1, 0, 6, 1023, 1022, 1021, 2];
        scale_row(&mut row, -2, ClipRange::full(8));

        assert_eq!([255, 255, 255, 1, 0, 0, 2, 255, 255, 255, 1], row);
    }

    #[test]
    fn narrow_with_rec709_range() {
        let mut row = [0, 4, 1023, 1016];
        scale_row(&mut row, -2, ClipRange::rec709(8));

        assert_eq!([1, 1, 254, 254], row);
    }

    #[test]
    fn zero_shift_is_noop() {
        let mut row = [1023, -5, 7];
        scale_row(&mut row, 0, ClipRange::full(8));

        assert_eq!([1023, -5, 7], row);
    }

    #[test]
    fn scale_plane_leaves_margins_alone() {
        #[rustfmt::skip]
        let mut plane: Vec<i16> = vec![
            1, 2, 3, 9,
            4, 5, 6, 9,
            9, 9, 9, 9,
        ];
        scale_plane(&mut plane, 4, 3, 2, 1, ClipRange::full(8));

        #[rustfmt::skip]
        let expected: Vec<i16> = vec![
            2, 4,  6, 9,
            8, 10, 12, 9,
            9, 9,  9, 9,
        ];
        assert_eq!(expected, plane);
    }
}
