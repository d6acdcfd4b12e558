//! Picture and codec parameter types

use crate::error::{Error, Result};
use std::convert::TryFrom;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

/// The number of colour components a picture may carry.
pub const MAX_NUM_COMPONENT: usize = 3;

/// The number of channel types (luma and chroma).
pub const MAX_NUM_CHANNEL_TYPE: usize = 2;

/// The chroma subsampling scheme of a picture or file.
///
/// The discriminants match the `chroma_format_idc` numbering.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChromaFormat {
    /// 4:0:0, luma only.
    Mono = 0,

    /// 4:2:0, chroma halved in both directions.
    Yuv420 = 1,

    /// 4:2:2, chroma halved horizontally.
    Yuv422 = 2,

    /// 4:4:4, no chroma subsampling.
    Yuv444 = 3,
}

impl ChromaFormat {
    /// Map the configuration spelling of a chroma format (`400`, `420`,
    /// `422` or `444`) to a format.
    pub fn from_config_number(value: u32) -> Result<Self> {
        match value {
            400 => Ok(Self::Mono),
            420 => Ok(Self::Yuv420),
            422 => Ok(Self::Yuv422),
            444 => Ok(Self::Yuv444),
            _ => Err(Error::UnsupportedFormat(value)),
        }
    }
}

impl TryFrom<u32> for ChromaFormat {
    type Error = Error;

    /// Map a `chroma_format_idc` value to a format.
    fn try_from(idc: u32) -> Result<Self> {
        match idc {
            0 => Ok(Self::Mono),
            1 => Ok(Self::Yuv420),
            2 => Ok(Self::Yuv422),
            3 => Ok(Self::Yuv444),
            _ => Err(Error::UnsupportedFormat(idc)),
        }
    }
}

/// Identifies one colour component of a picture.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ComponentId {
    Y = 0,
    Cb = 1,
    Cr = 2,
}

impl ComponentId {
    /// All components, in file order.
    pub const ALL: [ComponentId; MAX_NUM_COMPONENT] =
        [ComponentId::Y, ComponentId::Cb, ComponentId::Cr];

    /// The component stored at a given plane index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// The plane index of this component.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Whether a component carries luma or chroma information.
///
/// Both chroma components share subsampling and bit depth.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChannelType {
    Luma = 0,
    Chroma = 1,
}

impl ChannelType {
    /// Both channel types, luma first.
    pub const ALL: [ChannelType; MAX_NUM_CHANNEL_TYPE] = [ChannelType::Luma, ChannelType::Chroma];
}

/// A bit depth for each channel type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChannelDepths(pub [u32; MAX_NUM_CHANNEL_TYPE]);

impl ChannelDepths {
    /// The same depth for luma and chroma.
    pub fn uniform(depth: u32) -> Self {
        Self([depth; MAX_NUM_CHANNEL_TYPE])
    }

    /// Separate luma and chroma depths.
    pub fn new(luma: u32, chroma: u32) -> Self {
        Self([luma, chroma])
    }

    /// The deepest of the two channels.
    pub fn max(&self) -> u32 {
        self.0[0].max(self.0[1])
    }
}

impl Default for ChannelDepths {
    fn default() -> Self {
        Self::uniform(8)
    }
}

impl Index<ChannelType> for ChannelDepths {
    type Output = u32;

    fn index(&self, channel: ChannelType) -> &u32 {
        &self.0[channel as usize]
    }
}

impl IndexMut<ChannelType> for ChannelDepths {
    fn index_mut(&mut self, channel: ChannelType) -> &mut u32 {
        &mut self.0[channel as usize]
    }
}

/// The purpose a set of picture buffers is allocated for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PictureRole {
    /// Source samples, as read from the input file.
    Original = 0,

    /// Reconstructed samples, as written to the output file.
    Reconstructed = 1,

    /// Prediction samples.
    Prediction = 2,

    /// Residual samples.
    Residual = 3,
}

impl PictureRole {
    /// All roles, in allocation order.
    pub const ALL: [PictureRole; 4] = [
        PictureRole::Original,
        PictureRole::Reconstructed,
        PictureRole::Prediction,
        PictureRole::Residual,
    ];

    /// The role flag corresponding to this role.
    pub fn as_flag(self) -> PictureRoles {
        match self {
            Self::Original => PictureRoles::ORIGINAL,
            Self::Reconstructed => PictureRoles::RECONSTRUCTED,
            Self::Prediction => PictureRoles::PREDICTION,
            Self::Residual => PictureRoles::RESIDUAL,
        }
    }
}

bitflags! {
    /// The set of roles a picture allocates buffers for.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct PictureRoles : u8 {
        const ORIGINAL = 0b1;
        const RECONSTRUCTED = 0b10;
        const PREDICTION = 0b100;
        const RESIDUAL = 0b1000;
    }
}

bitflags! {
    /// Options which influence how frames are moved to and from files.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
    pub struct CodecOptions : u8 {
        /// Clip to the ITU-R BT.709 legal range when a bit-depth reduction
        /// into 8 or more bits is required, as if the file had been provided
        /// at the lower bit depth.
        const CLIP_TO_REC709 = 0b1;

        /// When writing interlaced frames, emit the top field's row first.
        const TOP_FIELD_FIRST = 0b10;
    }
}

/// A fixed colour channel permutation applied after reading (and undone
/// before writing).
///
/// These are defined in terms of the conversion applied to file data on its
/// way into the encoder.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ColourConversion {
    /// Components are passed through untouched.
    #[default]
    Unchanged,

    /// Y Cb Cr becomes Y Cr Cb.
    SwapCbCr,

    /// The luma plane is copied into all three components.
    ///
    /// Only valid for 4:4:4 pictures.
    LumaReplicate,

    /// R G B planes become G B R.
    ///
    /// Only valid for 4:4:4 pictures.
    RgbToGbr,
}

impl FromStr for ColourConversion {
    type Err = Error;

    /// Parse the configuration spelling of a colour conversion.
    fn from_str(value: &str) -> Result<Self> {
        match value {
            "UNCHANGED" => Ok(Self::Unchanged),
            "YCbCrtoYCrCb" => Ok(Self::SwapCbCr),
            "YCbCrtoYYY" => Ok(Self::LumaReplicate),
            "RGBtoGBR" => Ok(Self::RgbToGbr),
            _ => Err(Error::InvalidConfig(vec![
                "colour space conversion must be one of UNCHANGED, YCbCrtoYCrCb, YCbCrtoYYY or RGBtoGBR",
            ])),
        }
    }
}

/// The direction a raw frame codec moves samples in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}
