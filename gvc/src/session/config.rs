//! Session configuration

use crate::chroma;
use crate::error::{Error, Result};
use crate::frame::PictureGeometry;
use crate::io::{RawFrameCodec, MAX_FILE_BIT_DEPTH};
use crate::types::{
    ChannelDepths, ChromaFormat, CodecOptions, ColourConversion, ComponentId, OpenMode,
};
use std::path::Path;

/// Coded frame dimensions must be a multiple of this.
pub const MIN_BLOCK_SIZE: usize = 4;

/// What to do with a final frame the input ended partway through.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TrailingFramePolicy {
    /// Drop the frame.
    #[default]
    Discard,

    /// Process and write the frame as if it were complete.
    Flush,
}

/// Everything a session needs to know about its pictures and files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Luma width of the pictures, padding included.
    pub source_width: usize,

    /// Luma height of the pictures, padding included.
    pub source_height: usize,

    /// The chroma format pictures are processed in.
    pub chroma_format: ChromaFormat,

    /// The chroma format of the files, if different.
    pub file_chroma_format: Option<ChromaFormat>,

    pub max_block_width: usize,
    pub max_block_height: usize,
    pub max_partition_depth: u32,

    /// Depth of samples in the input file.
    pub input_bit_depths: ChannelDepths,

    /// Depth input samples are treated as having before being rescaled to the
    /// internal depth.
    pub msb_extended_bit_depths: ChannelDepths,

    /// Depth pictures are processed at.
    pub internal_bit_depths: ChannelDepths,

    /// Depth of samples in the output file.
    pub output_bit_depths: ChannelDepths,

    /// Horizontal and vertical luma padding added to the right and bottom of
    /// the input.
    pub pad: [usize; 2],

    /// How many frames to skip at the start of the input.
    pub frames_to_skip: usize,

    /// How many frames to process; zero processes the whole input.
    pub frames_to_process: usize,

    pub colour_conversion: ColourConversion,
    pub options: CodecOptions,
    pub trailing_frame_policy: TrailingFramePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            source_width: 0,
            source_height: 0,
            chroma_format: ChromaFormat::Yuv420,
            file_chroma_format: None,
            max_block_width: 64,
            max_block_height: 64,
            max_partition_depth: 4,
            input_bit_depths: ChannelDepths::default(),
            msb_extended_bit_depths: ChannelDepths::default(),
            internal_bit_depths: ChannelDepths::default(),
            output_bit_depths: ChannelDepths::default(),
            pad: [0, 0],
            frames_to_skip: 0,
            frames_to_process: 0,
            colour_conversion: ColourConversion::Unchanged,
            options: CodecOptions::empty(),
            trailing_frame_policy: TrailingFramePolicy::Discard,
        }
    }
}

impl SessionConfig {
    /// Check every parameter, reporting all problems at once.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        let mut confirm = |failed: bool, message: &'static str| {
            if failed {
                problems.push(message);
            }
        };

        confirm(
            self.source_width == 0 || self.source_height == 0,
            "source width and height must be specified",
        );
        confirm(
            self.source_width % MIN_BLOCK_SIZE != 0,
            "coded frame width must be a multiple of the minimum block size (4)",
        );
        confirm(
            self.source_height % MIN_BLOCK_SIZE != 0,
            "coded frame height must be a multiple of the minimum block size (4)",
        );
        confirm(
            !self.max_block_width.is_power_of_two() || !self.max_block_height.is_power_of_two(),
            "max block size must be a power of 2",
        );
        confirm(
            self.max_block_width.checked_shr(self.max_partition_depth).unwrap_or(0) == 0
                || self.max_block_height.checked_shr(self.max_partition_depth).unwrap_or(0) == 0,
            "max partition depth splits blocks below one sample",
        );
        confirm(
            self.pad[0] >= self.source_width.max(1) || self.pad[1] >= self.source_height.max(1),
            "padding must be smaller than the picture",
        );

        confirm(
            [self.chroma_format, self.file_format()]
                .into_iter()
                .filter(|format| *format != ChromaFormat::Mono)
                .any(|format| {
                    self.pad[0] % (1 << chroma::scale_x(ComponentId::Cb, format)) != 0
                        || self.pad[1] % (1 << chroma::scale_y(ComponentId::Cb, format)) != 0
                }),
            "padding must be a multiple of the chroma subsampling",
        );

        let all_depths = [
            self.input_bit_depths,
            self.msb_extended_bit_depths,
            self.internal_bit_depths,
            self.output_bit_depths,
        ];
        confirm(
            all_depths
                .iter()
                .flat_map(|depths| depths.0)
                .any(|depth| !(1..=MAX_FILE_BIT_DEPTH).contains(&depth)),
            "bit depth must be between 1 and 16",
        );

        let needs_444 = matches!(
            self.colour_conversion,
            ColourConversion::LumaReplicate | ColourConversion::RgbToGbr
        );
        confirm(
            needs_444 && self.chroma_format != ChromaFormat::Yuv444,
            "colour space conversion requires 4:4:4 pictures",
        );

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidConfig(problems))
        }
    }

    /// The geometry of every picture in the session.
    pub fn geometry(&self) -> PictureGeometry {
        PictureGeometry::new(
            self.source_width,
            self.source_height,
            self.chroma_format,
            self.max_block_width,
            self.max_block_height,
            self.max_partition_depth,
        )
    }

    /// The chroma format of the files.
    pub fn file_format(&self) -> ChromaFormat {
        self.file_chroma_format.unwrap_or(self.chroma_format)
    }

    /// Open the input file with this configuration's bit depths.
    pub fn open_input<P>(&self, path: P) -> Result<RawFrameCodec>
    where
        P: AsRef<Path>,
    {
        RawFrameCodec::open(
            path,
            OpenMode::Read,
            self.input_bit_depths,
            self.msb_extended_bit_depths,
            self.internal_bit_depths,
        )
    }

    /// Open the reconstruction file with this configuration's bit depths.
    pub fn open_output<P>(&self, path: P) -> Result<RawFrameCodec>
    where
        P: AsRef<Path>,
    {
        RawFrameCodec::open(
            path,
            OpenMode::Write,
            self.output_bit_depths,
            self.output_bit_depths,
            self.internal_bit_depths,
        )
    }
}
