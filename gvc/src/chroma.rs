//! Chroma format geometry
//!
//! Everything that depends on how a chroma format subsamples its components
//! is derived here, so that the rest of the crate never has to special-case a
//! format.

use crate::types::{ChannelDepths, ChannelType, ChromaFormat, ComponentId};

/// The channel type a component belongs to.
pub fn channel_of(component: ComponentId) -> ChannelType {
    match component {
        ComponentId::Y => ChannelType::Luma,
        ComponentId::Cb | ComponentId::Cr => ChannelType::Chroma,
    }
}

/// The horizontal subsampling shift of a channel in a given format.
pub fn channel_scale_x(channel: ChannelType, format: ChromaFormat) -> u32 {
    if channel == ChannelType::Luma || format == ChromaFormat::Yuv444 {
        0
    } else {
        1
    }
}

/// The vertical subsampling shift of a channel in a given format.
pub fn channel_scale_y(channel: ChannelType, format: ChromaFormat) -> u32 {
    if channel == ChannelType::Luma || format != ChromaFormat::Yuv420 {
        0
    } else {
        1
    }
}

/// The horizontal subsampling shift of a component in a given format.
pub fn scale_x(component: ComponentId, format: ChromaFormat) -> u32 {
    channel_scale_x(channel_of(component), format)
}

/// The vertical subsampling shift of a component in a given format.
pub fn scale_y(component: ComponentId, format: ChromaFormat) -> u32 {
    channel_scale_y(channel_of(component), format)
}

/// How many components a picture of this format carries.
pub fn valid_component_count(format: ChromaFormat) -> usize {
    if format == ChromaFormat::Mono {
        1
    } else {
        3
    }
}

/// How many channel types a picture of this format carries.
pub fn valid_channel_count(format: ChromaFormat) -> usize {
    if format == ChromaFormat::Mono {
        1
    } else {
        2
    }
}

/// Whether a component exists in pictures of this format.
pub fn is_valid_component(component: ComponentId, format: ChromaFormat) -> bool {
    component.index() < valid_component_count(format)
}

/// The components a picture of this format carries, in file order.
pub fn valid_components(format: ChromaFormat) -> impl Iterator<Item = ComponentId> {
    ComponentId::ALL
        .into_iter()
        .take(valid_component_count(format))
}

/// Total number of samples across all components of a `width` by `height`
/// picture.
pub fn total_samples(width: usize, height: usize, format: ChromaFormat) -> usize {
    let samples_per_channel = width * height;

    match format {
        ChromaFormat::Mono => samples_per_channel,
        ChromaFormat::Yuv420 => (samples_per_channel * 3) >> 1,
        ChromaFormat::Yuv422 => samples_per_channel * 2,
        ChromaFormat::Yuv444 => samples_per_channel * 3,
    }
}

/// Total number of bits across all components of a `width` by `height`
/// picture with the given channel depths.
pub fn total_bits(width: usize, height: usize, format: ChromaFormat, depths: ChannelDepths) -> usize {
    let samples_per_channel = width * height;
    let luma = depths[ChannelType::Luma] as usize;
    let chroma = depths[ChannelType::Chroma] as usize;

    match format {
        ChromaFormat::Mono => samples_per_channel * luma,
        ChromaFormat::Yuv420 => (samples_per_channel * (luma * 2 + chroma)) >> 1,
        ChromaFormat::Yuv422 => samples_per_channel * (luma + chroma),
        ChromaFormat::Yuv444 => samples_per_channel * (luma + 2 * chroma),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORMATS: [ChromaFormat; 4] = [
        ChromaFormat::Mono,
        ChromaFormat::Yuv420,
        ChromaFormat::Yuv422,
        ChromaFormat::Yuv444,
    ];

    #[test]
    fn channels_of_components() {
        assert_eq!(ChannelType::Luma, channel_of(ComponentId::Y));
        assert_eq!(ChannelType::Chroma, channel_of(ComponentId::Cb));
        assert_eq!(ChannelType::Chroma, channel_of(ComponentId::Cr));
    }

    #[test]
    fn luma_is_never_subsampled() {
        for format in FORMATS {
            assert_eq!(0, scale_x(ComponentId::Y, format));
            assert_eq!(0, scale_y(ComponentId::Y, format));
        }
    }

    #[test]
    fn chroma_subsampling() {
        #[rustfmt::skip]
        let expected: [(ChromaFormat, u32, u32); 4] = [
            (ChromaFormat::Mono,   1, 0),
            (ChromaFormat::Yuv420, 1, 1),
            (ChromaFormat::Yuv422, 1, 0),
            (ChromaFormat::Yuv444, 0, 0),
        ];

        for (format, sx, sy) in expected {
            for component in [ComponentId::Cb, ComponentId::Cr] {
                assert_eq!(sx, scale_x(component, format), "{:?}", format);
                assert_eq!(sy, scale_y(component, format), "{:?}", format);
            }
        }
    }

    #[test]
    fn component_counts() {
        assert_eq!(1, valid_component_count(ChromaFormat::Mono));
        assert_eq!(1, valid_channel_count(ChromaFormat::Mono));
        for format in &FORMATS[1..] {
            assert_eq!(3, valid_component_count(*format));
            assert_eq!(2, valid_channel_count(*format));
        }

        assert_eq!(
            vec![ComponentId::Y],
            valid_components(ChromaFormat::Mono).collect::<Vec<_>>()
        );
        assert!(!is_valid_component(ComponentId::Cr, ChromaFormat::Mono));
        assert!(is_valid_component(ComponentId::Cr, ChromaFormat::Yuv420));
    }

    #[test]
    fn total_sample_counts() {
        let (w, h) = (64, 48);
        assert_eq!(w * h, total_samples(w, h, ChromaFormat::Mono));
        assert_eq!(3 * w * h / 2, total_samples(w, h, ChromaFormat::Yuv420));
        assert_eq!(2 * w * h, total_samples(w, h, ChromaFormat::Yuv422));
        assert_eq!(3 * w * h, total_samples(w, h, ChromaFormat::Yuv444));
    }

    #[test]
    fn total_sample_counts_match_component_sizes() {
        let (w, h) = (32, 16);
        for format in FORMATS {
            let sum: usize = valid_components(format)
                .map(|c| (w >> scale_x(c, format)) * (h >> scale_y(c, format)))
                .sum();
            assert_eq!(sum, total_samples(w, h, format), "{:?}", format);
        }
    }

    #[test]
    fn total_bit_counts() {
        let depths = ChannelDepths::new(10, 8);
        let (w, h) = (16, 16);
        assert_eq!(w * h * 10, total_bits(w, h, ChromaFormat::Mono, depths));
        assert_eq!(w * h * 14, total_bits(w, h, ChromaFormat::Yuv420, depths));
        assert_eq!(w * h * 18, total_bits(w, h, ChromaFormat::Yuv422, depths));
        assert_eq!(w * h * 26, total_bits(w, h, ChromaFormat::Yuv444, depths));
    }
}
