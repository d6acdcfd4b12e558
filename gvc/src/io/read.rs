//! Raw frame input

use crate::chroma;
use crate::error::{Error, Result};
use crate::frame::{PlaneBuffer, PlaneSet};
use crate::io::codec::{RawFrameCodec, Stream};
use crate::io::colour;
use crate::io::stream::{fill, ByteSource};
use crate::types::{ChromaFormat, CodecOptions, ColourConversion, ComponentId};
use gvc_rs_yuv::rescale::ClipRange;
use gvc_rs_yuv::words::WordSize;
use std::io;
use tracing::{debug, trace};

/// How much of a frame a read obtained.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameStatus {
    /// The whole frame was read.
    Complete,

    /// The input ended before any of the frame.
    EndOfStream,

    /// The input ended partway through the frame.
    ///
    /// Whatever was read is left in the destination, and the rest of it is
    /// unspecified.
    Truncated,
}

/// The layout of one component being moved between a file and a plane.
#[derive(Copy, Clone, Debug)]
pub(crate) struct ComponentLayout {
    /// Luma size of the area carried by the file.
    pub width444: usize,
    pub height444: usize,

    pub file_scale: (u32, u32),
    pub plane_scale: (u32, u32),

    pub word: WordSize,
}

impl ComponentLayout {
    pub fn new(
        component: ComponentId,
        width444: usize,
        height444: usize,
        file_format: ChromaFormat,
        plane_format: ChromaFormat,
        word: WordSize,
    ) -> Self {
        Self {
            width444,
            height444,
            file_scale: (
                chroma::scale_x(component, file_format),
                chroma::scale_y(component, file_format),
            ),
            plane_scale: (
                chroma::scale_x(component, plane_format),
                chroma::scale_y(component, plane_format),
            ),
            word,
        }
    }

    pub fn file_width(&self) -> usize {
        self.width444 >> self.file_scale.0
    }

    pub fn file_height(&self) -> usize {
        self.height444 >> self.file_scale.1
    }

    pub fn plane_width(&self) -> usize {
        self.width444 >> self.plane_scale.0
    }

    pub fn plane_height(&self) -> usize {
        self.height444 >> self.plane_scale.1
    }

    /// Bytes in one file row.
    pub fn file_row_bytes(&self) -> usize {
        self.file_width() * self.word.bytes()
    }

    /// Whether luma row `y444` starts a new file row.
    pub fn is_file_row(&self, y444: usize) -> bool {
        y444 & ((1 << self.file_scale.1) - 1) == 0
    }

    /// Whether luma row `y444` starts a new plane row.
    pub fn is_plane_row(&self, y444: usize) -> bool {
        y444 & ((1 << self.plane_scale.1) - 1) == 0
    }
}

/// Reject a `width444` by `height444` luma area that doesn't split into whole
/// chroma samples in every one of `formats`.
pub(crate) fn check_alignment(
    width444: usize,
    height444: usize,
    formats: [ChromaFormat; 2],
) -> Result<()> {
    for format in formats {
        for component in chroma::valid_components(format).skip(1) {
            let mask_x = (1 << chroma::scale_x(component, format)) - 1;
            let mask_y = (1 << chroma::scale_y(component, format)) - 1;

            if width444 & mask_x != 0 || height444 & mask_y != 0 {
                return Err(Error::GeometryMismatch(component));
            }
        }
    }

    Ok(())
}

/// Remap one row of samples between horizontal subsamplings.
///
/// Going to a coarser subsampling keeps every other sample; going to a finer
/// one repeats each sample.
pub(crate) fn remap_row(src: &[i16], src_scale_x: u32, dst: &mut [i16], dst_scale_x: u32) {
    if src_scale_x <= dst_scale_x {
        let sx = dst_scale_x - src_scale_x;
        for (x, sample) in dst.iter_mut().enumerate() {
            *sample = src[x << sx];
        }
    } else {
        let sx = src_scale_x - dst_scale_x;
        for (x, sample) in dst.iter_mut().enumerate() {
            *sample = src[x >> sx];
        }
    }
}

/// The result of reading one component.
enum PlaneRead {
    /// Every byte was read; this many in total.
    Full(usize),

    /// The input ended after this many bytes.
    Short(usize),
}

impl RawFrameCodec {
    /// Read the next frame.
    ///
    /// Samples are read into `true_org` if given, or directly into `dest`
    /// otherwise, then rescaled to the internal bit depth. Finally the forward
    /// `conversion` is applied, leaving the result in `dest`. `true_org` must
    /// then match the layout of `dest`.
    ///
    /// The file only carries the top-left `width - pad[0]` by
    /// `height - pad[1]` luma samples of the frame. The remaining columns and
    /// rows are filled by repeating the last column and row read.
    ///
    /// `file_format` is the chroma format of the file if it differs from that
    /// of the destination; chroma is resampled between the two. A monochrome
    /// file gives the destination mid-grey chroma. The area carried by the
    /// file must split into whole chroma samples in both formats, or this
    /// fails with `GeometryMismatch`.
    pub fn read_frame(
        &mut self,
        dest: &mut PlaneSet,
        true_org: Option<&mut PlaneSet>,
        conversion: ColourConversion,
        pad: [usize; 2],
        file_format: Option<ChromaFormat>,
        options: CodecOptions,
    ) -> Result<FrameStatus> {
        if self.eof && matches!(self.stream, Stream::Reading(_)) {
            return Ok(FrameStatus::EndOfStream);
        }

        let status = match true_org {
            Some(true_org) => {
                if !true_org.same_layout(dest) {
                    return Err(Error::GeometryMismatch(ComponentId::Y));
                }

                let status = self.read_planes(true_org, pad, file_format, options)?;
                colour::convert(true_org, dest, conversion, true)?;
                status
            }
            None => {
                let status = self.read_planes(dest, pad, file_format, options)?;
                colour::convert_in_place(dest, conversion, true)?;
                status
            }
        };

        Ok(status)
    }

    /// Read and rescale every component of one frame into `planes`.
    fn read_planes(
        &mut self,
        planes: &mut PlaneSet,
        pad: [usize; 2],
        file_format: Option<ChromaFormat>,
        options: CodecOptions,
    ) -> Result<FrameStatus> {
        let plane_format = planes.chroma_format();
        let file_format = file_format.unwrap_or(plane_format);
        let word = self.word_size();

        let width444 = planes.luma_width().saturating_sub(pad[0]);
        let height444 = planes.luma_height().saturating_sub(pad[1]);
        check_alignment(width444, height444, [file_format, plane_format])?;

        let span = self.span.clone();
        let _enter = span.enter();

        let source = match &mut self.stream {
            Stream::Reading(source) => source.as_mut(),
            Stream::Writing(_) => return Err(Error::InvalidCodecState("open for writing")),
            Stream::Closed => return Err(Error::InvalidCodecState("closed")),
        };
        let mut bytes_read = 0;

        for component in ComponentId::ALL {
            let channel = chroma::channel_of(component);
            let layout = ComponentLayout::new(
                component,
                width444,
                height444,
                file_format,
                plane_format,
                word,
            );

            let outcome = read_component(
                source,
                planes.plane_mut(component).ok(),
                component,
                &layout,
                pad,
                file_format,
                self.file_depths[channel],
            );

            match outcome {
                Ok(PlaneRead::Full(got)) => bytes_read += got,
                Ok(PlaneRead::Short(got)) => {
                    self.eof = true;
                    bytes_read += got;

                    return Ok(if bytes_read == 0 {
                        debug!("end of stream");
                        FrameStatus::EndOfStream
                    } else {
                        debug!(bytes_read, "frame truncated by end of stream");
                        FrameStatus::Truncated
                    });
                }
                Err(e) => {
                    self.failed = true;
                    return Err(e.into());
                }
            }

            if let Ok(plane) = planes.plane_mut(component) {
                let shift = self.shift[channel as usize];
                let depth = (self.msb_extended_depths[channel] as i32 + shift).max(0) as u32;
                let range = ClipRange::for_rescale(
                    depth,
                    shift,
                    options.contains(CodecOptions::CLIP_TO_REC709),
                );
                plane.scale(shift, range);
            }
        }

        trace!(bytes_read, "read frame");

        Ok(FrameStatus::Complete)
    }
}

/// Read one component of a frame into `plane`, if the destination has it.
fn read_component(
    source: &mut dyn ByteSource,
    plane: Option<&mut PlaneBuffer>,
    component: ComponentId,
    layout: &ComponentLayout,
    pad: [usize; 2],
    file_format: ChromaFormat,
    file_depth: u32,
) -> io::Result<PlaneRead> {
    let file_has_chroma = file_format != ChromaFormat::Mono;

    if component != ComponentId::Y && !(file_has_chroma && plane.is_some()) {
        if let Some(plane) = plane {
            let full_width = layout.plane_width() + (pad[0] >> layout.plane_scale.0);
            let full_height = layout.plane_height() + (pad[1] >> layout.plane_scale.1);
            let value = (1i32 << file_depth.saturating_sub(1)) as i16;

            for y in 0..full_height.min(plane.height()) {
                let row = plane.row_mut(y);
                let end = full_width.min(row.len());
                row[..end].fill(value);
            }
        }

        if !file_has_chroma {
            return Ok(PlaneRead::Full(0));
        }

        let wanted = (layout.file_row_bytes() * layout.file_height()) as u64;
        let skipped = source.skip(wanted)?;

        return Ok(if skipped < wanted {
            PlaneRead::Short(skipped as usize)
        } else {
            PlaneRead::Full(skipped as usize)
        });
    }

    let Some(plane) = plane else {
        return Ok(PlaneRead::Full(0));
    };

    let stride = plane.stride();
    let plane_width = layout.plane_width();
    let plane_height = layout.plane_height();
    let full_width = (plane_width + (pad[0] >> layout.plane_scale.0)).min(plane.width());
    let full_height = (plane_height + (pad[1] >> layout.plane_scale.1)).min(plane.height());

    let mut bytes = vec![0; layout.file_row_bytes()];
    let mut file_row = vec![0; layout.file_width()];
    let mut read_so_far = 0;

    for y444 in 0..layout.height444 {
        if layout.is_file_row(y444) {
            let got = fill(source, &mut bytes)?;
            read_so_far += got;

            if got < bytes.len() {
                return Ok(PlaneRead::Short(read_so_far));
            }

            layout.word.unpack_row(&bytes, &mut file_row);
        }

        if !layout.is_plane_row(y444) {
            continue;
        }

        let row = plane.row_mut(y444 >> layout.plane_scale.1);
        remap_row(
            &file_row,
            layout.file_scale.0,
            &mut row[..plane_width],
            layout.plane_scale.0,
        );

        if plane_width > 0 {
            let last = row[plane_width - 1];
            row[plane_width..full_width].fill(last);
        }
    }

    if plane_height > 0 {
        for y in plane_height..full_height {
            let (above, rest) = plane.origin_mut().split_at_mut(y * stride);
            rest[..full_width].copy_from_slice(&above[(y - 1) * stride..][..full_width]);
        }
    }

    Ok(PlaneRead::Full(read_so_far))
}
