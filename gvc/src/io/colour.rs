//! Colour channel permutations

use crate::chroma;
use crate::error::{Error, Result};
use crate::frame::PlaneSet;
use crate::types::{ChromaFormat, ColourConversion, ComponentId, MAX_NUM_COMPONENT};

/// Which source component feeds each destination component, as
/// `(source, destination)` pairs.
fn mapping(conversion: ColourConversion, forwards: bool) -> [(usize, usize); MAX_NUM_COMPONENT] {
    let mut pairs = [(0, 0); MAX_NUM_COMPONENT];

    for (c, pair) in pairs.iter_mut().enumerate() {
        *pair = match conversion {
            ColourConversion::Unchanged => (c, c),
            ColourConversion::SwapCbCr => (c, (MAX_NUM_COMPONENT - c) % MAX_NUM_COMPONENT),
            ColourConversion::LumaReplicate if forwards => (0, c),
            ColourConversion::LumaReplicate => (c, c),
            ColourConversion::RgbToGbr if forwards => ((c + 1) % MAX_NUM_COMPONENT, c),
            ColourConversion::RgbToGbr => (c, (c + 1) % MAX_NUM_COMPONENT),
        };
    }

    pairs
}

/// Reject conversions which only make sense for 4:4:4 pictures.
fn check_format(conversion: ColourConversion, format: ChromaFormat) -> Result<()> {
    let needs_444 = matches!(
        conversion,
        ColourConversion::LumaReplicate | ColourConversion::RgbToGbr
    );

    if needs_444 && format != ChromaFormat::Yuv444 {
        return Err(Error::FormatMismatch {
            expected: ChromaFormat::Yuv444,
            found: format,
        });
    }

    Ok(())
}

/// Copy `src` into `dest`, permuting components as `conversion` asks.
///
/// `forwards` converts file data into the encoder's colour space; otherwise
/// the conversion is undone.
pub fn convert(
    src: &PlaneSet,
    dest: &mut PlaneSet,
    conversion: ColourConversion,
    forwards: bool,
) -> Result<()> {
    let format = src.chroma_format();
    check_format(conversion, format)?;

    if dest.chroma_format() != format {
        return Err(Error::FormatMismatch {
            expected: format,
            found: dest.chroma_format(),
        });
    }

    let valid = chroma::valid_component_count(format);
    for (from, to) in mapping(conversion, forwards) {
        if from >= valid || to >= valid {
            continue;
        }

        let to = ComponentId::ALL[to];
        let source = src.plane(ComponentId::ALL[from])?;
        if !dest.plane_mut(to)?.copy_from(source) {
            return Err(Error::GeometryMismatch(to));
        }
    }

    Ok(())
}

/// Permute the components of `planes` as `conversion` asks, without copying
/// samples where possible.
pub fn convert_in_place(
    planes: &mut PlaneSet,
    conversion: ColourConversion,
    forwards: bool,
) -> Result<()> {
    check_format(conversion, planes.chroma_format())?;

    match conversion {
        ColourConversion::Unchanged => {}
        ColourConversion::LumaReplicate if !forwards => {}
        ColourConversion::LumaReplicate => {
            let [luma, cb, cr] = planes.raw_planes_mut();
            for plane in [cb, cr] {
                if !plane.copy_from(luma) {
                    return Err(Error::GeometryMismatch(ComponentId::Cb));
                }
            }
        }
        ColourConversion::SwapCbCr | ColourConversion::RgbToGbr => {
            let slots = planes.raw_planes_mut();
            let mut old = std::mem::take(slots);

            for (from, to) in mapping(conversion, forwards) {
                std::mem::swap(&mut slots[to], &mut old[from]);
            }
        }
    }

    Ok(())
}
