//! Raw frame codec state

use crate::chroma;
use crate::error::{Error, Result};
use crate::io::stream::{ByteSource, Seekable, Unseekable};
use crate::types::{ChannelDepths, ChannelType, ChromaFormat, OpenMode, MAX_NUM_CHANNEL_TYPE};
use gvc_rs_yuv::words::WordSize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use tracing::{debug, debug_span, warn, Span};

/// Files cannot carry samples deeper than this.
pub const MAX_FILE_BIT_DEPTH: u32 = 16;

/// The stream a codec is attached to.
pub(crate) enum Stream {
    Closed,
    Reading(Box<dyn ByteSource>),
    Writing(Box<dyn Write>),
}

/// Reads and writes frames of raw, headerless planar YUV.
///
/// A file is a sequence of frames, each of which is every plane of the file's
/// chroma format in component order, with samples stored row by row as 8-bit
/// words if every channel is at most 8 bits deep, or 16-bit little endian words
/// otherwise.
///
/// Three bit depths are tracked for each channel: the depth of samples in the
/// file, the MSB-extended depth they are notionally expanded to, and the
/// internal depth pictures are processed at. Samples are rescaled by the
/// difference between the last two on their way in, and back again on their
/// way out.
pub struct RawFrameCodec {
    pub(crate) stream: Stream,

    /// Whether a read has run out of input.
    pub(crate) eof: bool,

    /// Whether a read or write has failed for any other reason.
    pub(crate) failed: bool,

    pub(crate) file_depths: ChannelDepths,
    pub(crate) msb_extended_depths: ChannelDepths,
    pub(crate) internal_depths: ChannelDepths,

    /// `internal - msb_extended`, per channel.
    pub(crate) shift: [i32; MAX_NUM_CHANNEL_TYPE],

    /// All diagnostics for this codec are emitted within this span.
    pub(crate) span: Span,
}

impl RawFrameCodec {
    /// Open a file for reading or writing.
    ///
    /// Files can't be read at a depth of more than 16 bits. When writing,
    /// deeper file depths are clamped to 16 bits instead.
    pub fn open<P>(
        path: P,
        mode: OpenMode,
        file_depths: ChannelDepths,
        msb_extended_depths: ChannelDepths,
        internal_depths: ChannelDepths,
    ) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let span = debug_span!("raw_frame_codec", path = %path.display(), ?mode);
        let mut codec = Self::closed(
            mode,
            file_depths,
            msb_extended_depths,
            internal_depths,
            span,
        )?;

        let file = match mode {
            OpenMode::Read => File::open(path),
            OpenMode::Write => File::create(path),
        }
        .map_err(|source| Error::FileOpenFailure {
            path: path.to_path_buf(),
            source,
        })?;

        codec.stream = match mode {
            OpenMode::Read => Stream::Reading(Box::new(Seekable(BufReader::new(file)))),
            OpenMode::Write => Stream::Writing(Box::new(BufWriter::new(file))),
        };
        codec.log_open();

        Ok(codec)
    }

    /// Read frames from any seekable stream.
    pub fn from_reader<R>(
        reader: R,
        file_depths: ChannelDepths,
        msb_extended_depths: ChannelDepths,
        internal_depths: ChannelDepths,
    ) -> Result<Self>
    where
        R: Read + Seek + 'static,
    {
        let span = debug_span!("raw_frame_codec", mode = ?OpenMode::Read);
        let mut codec = Self::closed(
            OpenMode::Read,
            file_depths,
            msb_extended_depths,
            internal_depths,
            span,
        )?;
        codec.stream = Stream::Reading(Box::new(Seekable(reader)));
        codec.log_open();

        Ok(codec)
    }

    /// Read frames from a stream which cannot seek, such as a pipe.
    pub fn from_unseekable_reader<R>(
        reader: R,
        file_depths: ChannelDepths,
        msb_extended_depths: ChannelDepths,
        internal_depths: ChannelDepths,
    ) -> Result<Self>
    where
        R: Read + 'static,
    {
        let span = debug_span!("raw_frame_codec", mode = ?OpenMode::Read, seekable = false);
        let mut codec = Self::closed(
            OpenMode::Read,
            file_depths,
            msb_extended_depths,
            internal_depths,
            span,
        )?;
        codec.stream = Stream::Reading(Box::new(Unseekable(reader)));
        codec.log_open();

        Ok(codec)
    }

    /// Write frames to any stream.
    pub fn from_writer<W>(
        writer: W,
        file_depths: ChannelDepths,
        msb_extended_depths: ChannelDepths,
        internal_depths: ChannelDepths,
    ) -> Result<Self>
    where
        W: Write + 'static,
    {
        let span = debug_span!("raw_frame_codec", mode = ?OpenMode::Write);
        let mut codec = Self::closed(
            OpenMode::Write,
            file_depths,
            msb_extended_depths,
            internal_depths,
            span,
        )?;
        codec.stream = Stream::Writing(Box::new(writer));
        codec.log_open();

        Ok(codec)
    }

    /// Emit this codec's diagnostics within `span` instead of its own.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Validate the bit depths and set up an unattached codec.
    fn closed(
        mode: OpenMode,
        mut file_depths: ChannelDepths,
        msb_extended_depths: ChannelDepths,
        internal_depths: ChannelDepths,
        span: Span,
    ) -> Result<Self> {
        for channel in ChannelType::ALL {
            let depth = file_depths[channel];
            if depth <= MAX_FILE_BIT_DEPTH {
                continue;
            }

            match mode {
                OpenMode::Read => return Err(Error::UnsupportedBitDepth(depth)),
                OpenMode::Write => {
                    let _enter = span.enter();
                    warn!(
                        ?channel,
                        depth, "cannot write deeper than 16 bits, output will be right-shifted"
                    );
                    file_depths[channel] = MAX_FILE_BIT_DEPTH;
                }
            }
        }

        let mut shift = [0; MAX_NUM_CHANNEL_TYPE];
        for channel in ChannelType::ALL {
            shift[channel as usize] =
                internal_depths[channel] as i32 - msb_extended_depths[channel] as i32;
        }

        Ok(Self {
            stream: Stream::Closed,
            eof: false,
            failed: false,
            file_depths,
            msb_extended_depths,
            internal_depths,
            shift,
            span,
        })
    }

    fn log_open(&self) {
        let _enter = self.span.enter();
        debug!(
            file = ?self.file_depths,
            msb_extended = ?self.msb_extended_depths,
            internal = ?self.internal_depths,
            "opened raw frame stream"
        );
    }

    /// Flush and detach the stream. Closing a closed codec does nothing.
    pub fn close(&mut self) -> Result<()> {
        let stream = std::mem::replace(&mut self.stream, Stream::Closed);

        if let Stream::Writing(mut writer) = stream {
            let _enter = self.span.enter();
            debug!("closing raw frame stream");
            writer.flush().map_err(Error::WriteFailure)?;
        }

        Ok(())
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.stream, Stream::Closed)
    }

    /// Whether a read ran out of input.
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Whether a read ran out of input or a stream operation failed.
    pub fn is_failed(&self) -> bool {
        self.eof || self.failed
    }

    pub fn file_depths(&self) -> ChannelDepths {
        self.file_depths
    }

    pub fn msb_extended_depths(&self) -> ChannelDepths {
        self.msb_extended_depths
    }

    pub fn internal_depths(&self) -> ChannelDepths {
        self.internal_depths
    }

    /// The rescale applied to a channel on its way in.
    pub fn bit_depth_shift(&self, channel: ChannelType) -> i32 {
        self.shift[channel as usize]
    }

    /// The word size of every sample in the file.
    pub fn word_size(&self) -> WordSize {
        WordSize::for_bit_depth(self.file_depths.max())
    }

    /// The size, in bytes, of one frame of the given luma size and format.
    pub fn frame_size(&self, width: usize, height: usize, format: ChromaFormat) -> u64 {
        let mut samples = 0;
        let mut word_size = WordSize::Byte;

        for component in chroma::valid_components(format) {
            samples += (width >> chroma::scale_x(component, format))
                * (height >> chroma::scale_y(component, format));

            if self.file_depths[chroma::channel_of(component)] > 8 {
                word_size = WordSize::Word;
            }
        }

        (samples * word_size.bytes()) as u64
    }

    /// Skip `count` frames of input.
    ///
    /// Seekable streams are seeked past the frames; anything else has them read
    /// and discarded. Running out of input sets the end-of-stream state.
    pub fn skip_frames(
        &mut self,
        count: usize,
        width: usize,
        height: usize,
        format: ChromaFormat,
    ) -> Result<()> {
        if count == 0 {
            return Ok(());
        }

        let wanted = self.frame_size(width, height, format) * count as u64;
        let source = match &mut self.stream {
            Stream::Reading(source) => source,
            Stream::Writing(_) => return Err(Error::InvalidCodecState("open for writing")),
            Stream::Closed => return Err(Error::InvalidCodecState("closed")),
        };

        let skipped = match source.skip(wanted) {
            Ok(skipped) => skipped,
            Err(e) => {
                self.failed = true;
                return Err(e.into());
            }
        };

        let _enter = self.span.enter();
        debug!(count, bytes = skipped, "skipped frames");

        if skipped < wanted {
            self.eof = true;
            return Err(Error::EndOfStream);
        }

        Ok(())
    }
}

impl Drop for RawFrameCodec {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            let _enter = self.span.enter();
            warn!("failed to flush raw frame stream: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RawFrameCodec;
    use crate::error::Error;
    use crate::types::{ChannelDepths, ChannelType, ChromaFormat, OpenMode};
    use std::io::Cursor;

    #[test]
    fn shift_is_internal_minus_msb_extended() {
        let codec = RawFrameCodec::from_reader(
            Cursor::new(Vec::new()),
            ChannelDepths::uniform(8),
            ChannelDepths::new(8, 10),
            ChannelDepths::new(10, 8),
        )
        .unwrap();

        assert_eq!(2, codec.bit_depth_shift(ChannelType::Luma));
        assert_eq!(-2, codec.bit_depth_shift(ChannelType::Chroma));
    }

    #[test]
    fn reading_past_16_bits_fails() {
        let result = RawFrameCodec::from_reader(
            Cursor::new(Vec::new()),
            ChannelDepths::new(17, 8),
            ChannelDepths::uniform(8),
            ChannelDepths::uniform(8),
        );

        assert!(matches!(result, Err(Error::UnsupportedBitDepth(17))));
    }

    #[test]
    fn writing_past_16_bits_clamps() {
        let codec = RawFrameCodec::from_writer(
            Vec::new(),
            ChannelDepths::new(8, 20),
            ChannelDepths::uniform(8),
            ChannelDepths::uniform(8),
        )
        .unwrap();

        assert_eq!(ChannelDepths::new(8, 16), codec.file_depths());
    }

    #[test]
    fn frame_sizes() {
        let eight = RawFrameCodec::from_writer(
            Vec::new(),
            ChannelDepths::uniform(8),
            ChannelDepths::uniform(8),
            ChannelDepths::uniform(8),
        )
        .unwrap();
        assert_eq!(384, eight.frame_size(16, 16, ChromaFormat::Yuv420));
        assert_eq!(256, eight.frame_size(16, 16, ChromaFormat::Mono));

        let ten = RawFrameCodec::from_writer(
            Vec::new(),
            ChannelDepths::new(8, 10),
            ChannelDepths::uniform(8),
            ChannelDepths::uniform(8),
        )
        .unwrap();
        assert_eq!(1536, ten.frame_size(16, 16, ChromaFormat::Yuv444));

        // Chroma depth doesn't matter for files without chroma.
        assert_eq!(256, ten.frame_size(16, 16, ChromaFormat::Mono));
    }

    #[test]
    fn skip_past_end() {
        let mut codec = RawFrameCodec::from_unseekable_reader(
            Cursor::new(vec![0; 500]),
            ChannelDepths::uniform(8),
            ChannelDepths::uniform(8),
            ChannelDepths::uniform(8),
        )
        .unwrap();

        assert!(matches!(
            codec.skip_frames(2, 16, 16, ChromaFormat::Yuv420),
            Err(Error::EndOfStream)
        ));
        assert!(codec.is_eof());
    }

    #[test]
    fn open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = RawFrameCodec::open(
            dir.path().join("missing.yuv"),
            OpenMode::Read,
            ChannelDepths::uniform(8),
            ChannelDepths::uniform(8),
            ChannelDepths::uniform(8),
        );

        assert!(matches!(result, Err(Error::FileOpenFailure { .. })));
    }

    #[test]
    fn close_twice() {
        let mut codec = RawFrameCodec::from_writer(
            Vec::new(),
            ChannelDepths::uniform(8),
            ChannelDepths::uniform(8),
            ChannelDepths::uniform(8),
        )
        .unwrap();

        codec.close().unwrap();
        codec.close().unwrap();
        assert!(!codec.is_open());
        assert!(matches!(
            codec.skip_frames(1, 16, 16, ChromaFormat::Yuv420),
            Err(Error::InvalidCodecState(_))
        ));
    }
}
