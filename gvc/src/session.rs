//! Frame-by-frame processing sessions

mod config;
mod processor;

pub use config::{SessionConfig, TrailingFramePolicy, MIN_BLOCK_SIZE};
pub use processor::{FrameProcessor, PassThrough};

use crate::error::{Error, Result};
use crate::frame::Picture;
use crate::io::{ConformanceWindow, FrameStatus, RawFrameCodec};
use crate::types::{PictureRole, PictureRoles};
use tracing::{debug, info, info_span, warn};

/// Counts of what a session did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub frames_read: usize,
    pub frames_written: usize,

    /// Frames dropped because the input ended partway through them.
    pub frames_discarded: usize,
}

/// Reads frames from one raw file, hands each to a processor, and writes the
/// reconstruction to another.
pub struct Session {
    config: SessionConfig,
    original: Picture,
    reconstructed: Picture,
}

impl Session {
    /// Validate `config` and allocate the session's pictures.
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;

        let geometry = config.geometry();
        let original = Picture::create(geometry, PictureRoles::ORIGINAL, false)?;
        let reconstructed = Picture::create(geometry, PictureRoles::RECONSTRUCTED, false)?;

        Ok(Self {
            config,
            original,
            reconstructed,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The most recently read frame.
    pub fn original(&self) -> &Picture {
        &self.original
    }

    /// The most recently processed frame.
    pub fn reconstructed(&self) -> &Picture {
        &self.reconstructed
    }

    /// Run frames from `input` through `processor` until the input ends or
    /// the configured number of frames has been processed.
    ///
    /// Each reconstruction is written to `output`, if there is one.
    pub fn run<P>(
        &mut self,
        input: &mut RawFrameCodec,
        mut output: Option<&mut RawFrameCodec>,
        processor: &mut P,
    ) -> Result<SessionSummary>
    where
        P: FrameProcessor + ?Sized,
    {
        let span = info_span!("session");
        let _enter = span.enter();

        let config = &self.config;
        let mut summary = SessionSummary::default();

        let coded_width = config.source_width - config.pad[0];
        let coded_height = config.source_height - config.pad[1];
        match input.skip_frames(
            config.frames_to_skip,
            coded_width,
            coded_height,
            config.file_format(),
        ) {
            Ok(()) => {}
            Err(Error::EndOfStream) => {
                warn!(
                    skip = config.frames_to_skip,
                    "input ended while skipping frames"
                );
                return Ok(summary);
            }
            Err(e) => return Err(e),
        }

        while config.frames_to_process == 0 || summary.frames_read < config.frames_to_process {
            let status = input.read_frame(
                self.original.planes_mut(PictureRole::Original)?,
                None,
                config.colour_conversion,
                config.pad,
                config.file_chroma_format,
                config.options,
            )?;

            match (status, config.trailing_frame_policy) {
                (FrameStatus::EndOfStream, _) => break,
                (FrameStatus::Truncated, TrailingFramePolicy::Discard) => {
                    debug!(frame = summary.frames_read, "discarding truncated frame");
                    summary.frames_discarded += 1;
                    break;
                }
                (FrameStatus::Truncated, TrailingFramePolicy::Flush) => {
                    debug!(frame = summary.frames_read, "flushing truncated frame");
                }
                (FrameStatus::Complete, _) => {}
            }

            summary.frames_read += 1;
            processor.process(&self.original, &mut self.reconstructed)?;

            if let Some(output) = output.as_deref_mut() {
                output.write_frame(
                    self.reconstructed.planes(PictureRole::Reconstructed)?,
                    config.colour_conversion,
                    ConformanceWindow::default(),
                    config.file_chroma_format,
                    config.options,
                )?;
                summary.frames_written += 1;
            }

            debug!(frame = summary.frames_read - 1, "processed frame");

            if status == FrameStatus::Truncated {
                break;
            }
        }

        info!(
            read = summary.frames_read,
            written = summary.frames_written,
            discarded = summary.frames_discarded,
            "session finished"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::{PassThrough, Session, SessionConfig, SessionSummary, TrailingFramePolicy};
    use crate::error::{Error, Result};
    use crate::frame::Picture;
    use crate::io::RawFrameCodec;
    use crate::types::{ChannelDepths, ChromaFormat, ComponentId, PictureRole};
    use std::cell::RefCell;
    use std::io::{self, Cursor, Write};
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// 16x8 4:2:0 frames are 192 bytes.
    const FRAME_BYTES: usize = 16 * 8 * 3 / 2;

    fn config() -> SessionConfig {
        SessionConfig {
            source_width: 16,
            source_height: 8,
            max_block_width: 8,
            max_block_height: 8,
            max_partition_depth: 1,
            ..SessionConfig::default()
        }
    }

    /// Input made of whole frames, each filled with its frame number, then
    /// `extra` more bytes.
    fn input(frames: usize, extra: usize) -> RawFrameCodec {
        let mut data: Vec<u8> = (0..frames)
            .flat_map(|frame| std::iter::repeat(frame as u8).take(FRAME_BYTES))
            .collect();
        data.extend(std::iter::repeat(0xEE).take(extra));

        let depths = ChannelDepths::uniform(8);
        RawFrameCodec::from_reader(Cursor::new(data), depths, depths, depths).unwrap()
    }

    fn output() -> (RawFrameCodec, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let depths = ChannelDepths::uniform(8);
        let codec = RawFrameCodec::from_writer(buffer.clone(), depths, depths, depths).unwrap();

        (codec, buffer)
    }

    #[test]
    fn rejects_bad_config() {
        let config = SessionConfig {
            source_width: 18,
            ..config()
        };

        assert!(matches!(Session::new(config), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_padding_that_splits_chroma_samples() {
        let config = SessionConfig {
            chroma_format: ChromaFormat::Yuv444,
            file_chroma_format: Some(ChromaFormat::Yuv422),
            pad: [1, 0],
            ..config()
        };

        assert!(matches!(Session::new(config), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn pass_through_copies_input() {
        let mut session = Session::new(config()).unwrap();
        let mut input = input(3, 0);
        let (mut output, buffer) = output();

        let summary = session
            .run(&mut input, Some(&mut output), &mut PassThrough)
            .unwrap();
        output.close().unwrap();

        assert_eq!(
            SessionSummary {
                frames_read: 3,
                frames_written: 3,
                frames_discarded: 0,
            },
            summary
        );

        let written = buffer.0.borrow();
        assert_eq!(3 * FRAME_BYTES, written.len());
        assert!(written[..FRAME_BYTES].iter().all(|b| *b == 0));
        assert!(written[2 * FRAME_BYTES..].iter().all(|b| *b == 2));
    }

    #[test]
    fn frame_limit_and_skip() {
        let config = SessionConfig {
            frames_to_skip: 1,
            frames_to_process: 2,
            ..config()
        };
        let mut session = Session::new(config).unwrap();
        let mut input = input(5, 0);
        let (mut output, buffer) = output();

        let summary = session
            .run(&mut input, Some(&mut output), &mut PassThrough)
            .unwrap();
        output.close().unwrap();

        assert_eq!(2, summary.frames_read);
        let written = buffer.0.borrow();
        assert_eq!(2 * FRAME_BYTES, written.len());
        assert_eq!(1, written[0]);
        assert_eq!(2, written[FRAME_BYTES]);
    }

    #[test]
    fn skip_past_end() {
        let config = SessionConfig {
            frames_to_skip: 4,
            ..config()
        };
        let mut session = Session::new(config).unwrap();
        let mut input = input(2, 0);

        let summary = session.run(&mut input, None, &mut PassThrough).unwrap();

        assert_eq!(SessionSummary::default(), summary);
    }

    #[test]
    fn truncated_frame_discarded() {
        let mut session = Session::new(config()).unwrap();
        let mut input = input(2, 100);
        let (mut output, buffer) = output();

        let summary = session
            .run(&mut input, Some(&mut output), &mut PassThrough)
            .unwrap();
        output.close().unwrap();

        assert_eq!(2, summary.frames_read);
        assert_eq!(1, summary.frames_discarded);
        assert_eq!(2 * FRAME_BYTES, buffer.0.borrow().len());
    }

    #[test]
    fn truncated_frame_flushed() {
        let config = SessionConfig {
            trailing_frame_policy: TrailingFramePolicy::Flush,
            ..config()
        };
        let mut session = Session::new(config).unwrap();
        let mut input = input(1, 100);
        let (mut output, buffer) = output();

        let summary = session
            .run(&mut input, Some(&mut output), &mut PassThrough)
            .unwrap();
        output.close().unwrap();

        assert_eq!(2, summary.frames_read);
        assert_eq!(2, summary.frames_written);
        assert_eq!(0, summary.frames_discarded);

        let written = buffer.0.borrow();
        assert_eq!(2 * FRAME_BYTES, written.len());
        assert_eq!(0xEE, written[FRAME_BYTES]);
    }

    #[test]
    fn processor_errors_stop_the_session() {
        let mut session = Session::new(config()).unwrap();
        let mut input = input(3, 0);
        let mut seen = 0;
        let mut processor = |original: &Picture, _: &mut Picture| -> Result<()> {
            seen += 1;
            original.plane(PictureRole::Reconstructed, ComponentId::Y)?;
            Ok(())
        };

        assert!(matches!(
            session.run(&mut input, None, &mut processor),
            Err(Error::InvalidRole(PictureRole::Reconstructed))
        ));
        assert_eq!(1, seen);
    }

    #[test]
    fn file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.yuv");
        let recon = dir.path().join("recon.yuv");

        let data: Vec<u8> = (0..2 * FRAME_BYTES).map(|i| (i % 251) as u8).collect();
        std::fs::write(&source, &data).unwrap();

        let config = SessionConfig {
            chroma_format: ChromaFormat::Yuv420,
            ..config()
        };
        let mut session = Session::new(config.clone()).unwrap();
        let mut input = config.open_input(&source).unwrap();
        let mut output = config.open_output(&recon).unwrap();

        session
            .run(&mut input, Some(&mut output), &mut PassThrough)
            .unwrap();
        output.close().unwrap();

        assert_eq!(data, std::fs::read(&recon).unwrap());
    }
}
