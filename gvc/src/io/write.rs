//! Raw frame output

use crate::chroma;
use crate::error::{Error, Result};
use crate::frame::{PlaneBuffer, PlaneSet};
use crate::io::codec::{RawFrameCodec, Stream};
use crate::io::colour;
use crate::io::read::{check_alignment, remap_row, ComponentLayout};
use crate::types::{ChromaFormat, CodecOptions, ColourConversion, ComponentId};
use gvc_rs_yuv::rescale::ClipRange;
use std::borrow::Cow;
use std::io::Write;
use tracing::{trace, warn};

/// The luma border cropped off a picture when writing it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ConformanceWindow {
    pub left: usize,
    pub right: usize,
    pub top: usize,
    pub bottom: usize,
}

impl ConformanceWindow {
    pub fn new(left: usize, right: usize, top: usize, bottom: usize) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }
}

impl RawFrameCodec {
    /// Write one frame.
    ///
    /// The inverse of `conversion` is applied and samples are rescaled from the
    /// internal bit depth back to the MSB-extended depth, on copies of `src`
    /// if either is needed. Only the part of each plane inside `window` is
    /// written, resampled into `file_format` if given.
    ///
    /// A window that crops away the whole picture writes nothing, which is
    /// logged but not an error. A window that leaves a part chroma sample in
    /// either format is a `GeometryMismatch`.
    pub fn write_frame(
        &mut self,
        src: &PlaneSet,
        conversion: ColourConversion,
        window: ConformanceWindow,
        file_format: Option<ChromaFormat>,
        options: CodecOptions,
    ) -> Result<()> {
        let prepared = self.prepare(src, conversion, options)?;

        self.write_fields(&[prepared.as_ref()], window, file_format)
    }

    /// Write a frame made of two interlaced fields.
    ///
    /// Each file row is taken alternately from each field, starting with the
    /// top field if `options` has `TOP_FIELD_FIRST` and the bottom field
    /// otherwise. Both fields must share a layout.
    pub fn write_interlaced_frame(
        &mut self,
        top: &PlaneSet,
        bottom: &PlaneSet,
        conversion: ColourConversion,
        window: ConformanceWindow,
        file_format: Option<ChromaFormat>,
        options: CodecOptions,
    ) -> Result<()> {
        if !top.same_layout(bottom) {
            let mismatched = ComponentId::ALL
                .into_iter()
                .find(|c| top.width(*c) != bottom.width(*c) || top.height(*c) != bottom.height(*c))
                .unwrap_or(ComponentId::Y);

            return Err(Error::GeometryMismatch(mismatched));
        }

        let top = self.prepare(top, conversion, options)?;
        let bottom = self.prepare(bottom, conversion, options)?;

        let fields = if options.contains(CodecOptions::TOP_FIELD_FIRST) {
            [top.as_ref(), bottom.as_ref()]
        } else {
            [bottom.as_ref(), top.as_ref()]
        };

        self.write_fields(&fields, window, file_format)
    }

    /// Undo the colour conversion and bit-depth rescale of a picture, copying
    /// it only if either changes anything.
    fn prepare<'a>(
        &self,
        src: &'a PlaneSet,
        conversion: ColourConversion,
        options: CodecOptions,
    ) -> Result<Cow<'a, PlaneSet>> {
        let mut planes = Cow::Borrowed(src);

        if conversion != ColourConversion::Unchanged {
            colour::convert_in_place(planes.to_mut(), conversion, false)?;
        }

        if self.shift.iter().any(|shift| *shift != 0) {
            let planes = planes.to_mut();
            for component in chroma::valid_components(planes.chroma_format()) {
                let channel = chroma::channel_of(component);
                let shift = -self.shift[channel as usize];
                let depth = self.msb_extended_depths[channel];
                let range = ClipRange::for_rescale(
                    depth,
                    shift,
                    options.contains(CodecOptions::CLIP_TO_REC709),
                );

                planes.plane_mut(component)?.scale(shift, range);
            }
        }

        Ok(planes)
    }

    /// Write every component of one frame, interleaving rows from each of
    /// `fields`.
    fn write_fields(
        &mut self,
        fields: &[&PlaneSet],
        window: ConformanceWindow,
        file_format: Option<ChromaFormat>,
    ) -> Result<()> {
        let first = fields[0];
        let src_format = first.chroma_format();
        let file_format = file_format.unwrap_or(src_format);
        let word = self.word_size();

        if window.left + window.right > first.luma_width()
            || window.top + window.bottom > first.luma_height()
        {
            return Err(Error::GeometryMismatch(ComponentId::Y));
        }

        let width444 = first.luma_width() - window.left - window.right;
        let height444 = first.luma_height() - window.top - window.bottom;
        check_alignment(width444, height444, [file_format, src_format])?;

        let span = self.span.clone();
        let _enter = span.enter();

        if width444 == 0 || height444 == 0 {
            warn!(width444, height444, "writing an empty output picture");
        }

        let sink = match &mut self.stream {
            Stream::Writing(sink) => sink.as_mut(),
            Stream::Reading(_) => return Err(Error::InvalidCodecState("open for reading")),
            Stream::Closed => return Err(Error::InvalidCodecState("closed")),
        };

        for component in ComponentId::ALL {
            let layout = ComponentLayout::new(
                component,
                width444,
                height444,
                file_format,
                src_format,
                word,
            );
            let depth = self.file_depths[chroma::channel_of(component)];
            let result = write_component(sink, fields, component, &layout, window, file_format, depth);

            if let Err(e) = result {
                self.failed = true;
                return Err(e);
            }
        }

        trace!(width444, height444, fields = fields.len(), "wrote frame");

        Ok(())
    }
}

/// Write one component of a frame.
fn write_component(
    sink: &mut dyn Write,
    fields: &[&PlaneSet],
    component: ComponentId,
    layout: &ComponentLayout,
    window: ConformanceWindow,
    file_format: ChromaFormat,
    file_depth: u32,
) -> Result<()> {
    let row_bytes = layout.file_row_bytes();
    let mut buffer = vec![0; row_bytes * fields.len()];
    let file_has_chroma = file_format != ChromaFormat::Mono;

    let planes: Option<Vec<&PlaneBuffer>> = fields
        .iter()
        .map(|field| field.plane(component).ok())
        .collect();

    if component != ComponentId::Y && !(file_has_chroma && planes.is_some()) {
        if !file_has_chroma {
            return Ok(());
        }

        let value = (1i32 << file_depth.saturating_sub(1)) as i16;
        layout.word.fill_row(value, &mut buffer);
        for _ in 0..layout.file_height() {
            sink.write_all(&buffer).map_err(Error::WriteFailure)?;
        }

        return Ok(());
    }

    let Some(planes) = planes else {
        return Ok(());
    };

    let left = window.left >> layout.plane_scale.0;
    let top = window.top >> layout.plane_scale.1;
    let file_width = layout.file_width();
    let mut samples = vec![0; file_width];

    for y444 in 0..layout.height444 {
        if !layout.is_file_row(y444) {
            continue;
        }

        let src_y = top + (y444 >> layout.plane_scale.1);
        for (plane, chunk) in planes.iter().zip(buffer.chunks_exact_mut(row_bytes.max(1))) {
            let row = &plane.row(src_y)[left..];
            remap_row(row, layout.plane_scale.0, &mut samples, layout.file_scale.0);
            layout.word.pack_row(&samples, chunk);
        }

        sink.write_all(&buffer).map_err(Error::WriteFailure)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::ConformanceWindow;
    use crate::error::Error;
    use crate::frame::{PictureGeometry, PlaneSet};
    use crate::io::{FrameStatus, RawFrameCodec};
    use crate::types::{
        ChannelDepths, ChromaFormat, CodecOptions, ColourConversion, ComponentId, OpenMode,
    };
    use std::cell::RefCell;
    use std::io::{self, Cursor, Write};
    use std::rc::Rc;

    /// A writer whose output can be inspected after the codec owns it.
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

    /// A writer that refuses everything.
    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn planes(width: usize, height: usize, format: ChromaFormat) -> PlaneSet {
        PlaneSet::allocate(&PictureGeometry::new(width, height, format, 8, 8, 1)).unwrap()
    }

    /// Fill every visible sample with a per-position pattern.
    fn pattern(set: &mut PlaneSet, seed: usize) {
        for component in ComponentId::ALL {
            if let Ok(plane) = set.plane_mut(component) {
                for y in 0..plane.height() {
                    for (x, sample) in plane.row_mut(y).iter_mut().enumerate() {
                        *sample = ((seed + x * 7 + y * 13 + component.index() * 50) % 256) as i16;
                    }
                }
            }
        }
    }

    fn writer(depths: ChannelDepths, internal: ChannelDepths) -> (RawFrameCodec, SharedBuffer) {
        let buffer = SharedBuffer::default();
        let codec = RawFrameCodec::from_writer(buffer.clone(), depths, depths, internal).unwrap();

        (codec, buffer)
    }

    #[test]
    fn file_roundtrip_420() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.yuv");
        let depths = ChannelDepths::uniform(8);

        let mut src = planes(16, 16, ChromaFormat::Yuv420);
        pattern(&mut src, 3);

        let mut output = RawFrameCodec::open(&path, OpenMode::Write, depths, depths, depths).unwrap();
        output
            .write_frame(
                &src,
                ColourConversion::Unchanged,
                ConformanceWindow::default(),
                None,
                CodecOptions::empty(),
            )
            .unwrap();
        output.close().unwrap();

        assert_eq!(384, std::fs::metadata(&path).unwrap().len());

        let mut input = RawFrameCodec::open(&path, OpenMode::Read, depths, depths, depths).unwrap();
        let mut dest = planes(16, 16, ChromaFormat::Yuv420);
        let status = input
            .read_frame(
                &mut dest,
                None,
                ColourConversion::Unchanged,
                [0, 0],
                None,
                CodecOptions::empty(),
            )
            .unwrap();

        assert_eq!(FrameStatus::Complete, status);
        for component in ComponentId::ALL {
            let a = src.plane(component).unwrap();
            let b = dest.plane(component).unwrap();
            for y in 0..a.height() {
                assert_eq!(a.row(y), b.row(y), "{:?} row {}", component, y);
            }
        }
    }

    #[test]
    fn skip_on_unseekable_stream() {
        let depths = ChannelDepths::uniform(8);
        let (mut output, buffer) = writer(depths, depths);

        let mut frames = Vec::new();
        for seed in [1, 2] {
            let mut frame = planes(8, 8, ChromaFormat::Yuv420);
            pattern(&mut frame, seed);
            output
                .write_frame(
                    &frame,
                    ColourConversion::Unchanged,
                    ConformanceWindow::default(),
                    None,
                    CodecOptions::empty(),
                )
                .unwrap();
            frames.push(frame);
        }

        let data = buffer.0.borrow().clone();
        let mut input =
            RawFrameCodec::from_unseekable_reader(Cursor::new(data), depths, depths, depths).unwrap();
        input.skip_frames(1, 8, 8, ChromaFormat::Yuv420).unwrap();

        let mut dest = planes(8, 8, ChromaFormat::Yuv420);
        input
            .read_frame(
                &mut dest,
                None,
                ColourConversion::Unchanged,
                [0, 0],
                None,
                CodecOptions::empty(),
            )
            .unwrap();

        assert_eq!(frames[1], dest);
    }

    #[test]
    fn sixteen_bit_words_are_little_endian() {
        let depths = ChannelDepths::uniform(10);
        let (mut output, buffer) = writer(depths, depths);
        let mut src = planes(2, 1, ChromaFormat::Mono);
        src.plane_mut(ComponentId::Y)
            .unwrap()
            .row_mut(0)
            .copy_from_slice(&[0x3FF, 0x102]);

        output
            .write_frame(
                &src,
                ColourConversion::Unchanged,
                ConformanceWindow::default(),
                None,
                CodecOptions::empty(),
            )
            .unwrap();

        assert_eq!(vec![0xFF, 0x03, 0x02, 0x01], *buffer.0.borrow());
    }

    #[test]
    fn internal_depth_is_scaled_back() {
        let (mut output, buffer) = writer(ChannelDepths::uniform(8), ChannelDepths::uniform(10));
        let mut src = planes(4, 1, ChromaFormat::Mono);
        src.plane_mut(ComponentId::Y)
            .unwrap()
            .row_mut(0)
            .copy_from_slice(&[1023, 0, 514, 4]);

        output
            .write_frame(
                &src,
                ColourConversion::Unchanged,
                ConformanceWindow::default(),
                None,
                CodecOptions::CLIP_TO_REC709,
            )
            .unwrap();

        assert_eq!(vec![254, 1, 129, 1], *buffer.0.borrow());

        // The caller's picture is left alone.
        assert_eq!(1023, src.plane(ComponentId::Y).unwrap().row(0)[0]);
    }

    #[test]
    fn conformance_window_crops() {
        let depths = ChannelDepths::uniform(8);
        let (mut output, buffer) = writer(depths, depths);
        let mut src = planes(4, 4, ChromaFormat::Yuv420);
        pattern(&mut src, 0);

        output
            .write_frame(
                &src,
                ColourConversion::Unchanged,
                ConformanceWindow::new(2, 0, 2, 0),
                None,
                CodecOptions::empty(),
            )
            .unwrap();

        let luma = src.plane(ComponentId::Y).unwrap();
        let cb = src.plane(ComponentId::Cb).unwrap();
        let cr = src.plane(ComponentId::Cr).unwrap();
        let mut expected = Vec::new();
        for y in 2..4 {
            expected.extend(luma.row(y)[2..].iter().map(|s| *s as u8));
        }
        expected.push(cb.row(1)[1] as u8);
        expected.push(cr.row(1)[1] as u8);

        assert_eq!(expected, *buffer.0.borrow());
    }

    #[test]
    fn empty_window_writes_nothing() {
        let depths = ChannelDepths::uniform(8);
        let (mut output, buffer) = writer(depths, depths);
        let src = planes(4, 4, ChromaFormat::Yuv420);

        output
            .write_frame(
                &src,
                ColourConversion::Unchanged,
                ConformanceWindow::new(2, 2, 0, 0),
                None,
                CodecOptions::empty(),
            )
            .unwrap();
        assert!(buffer.0.borrow().is_empty());

        assert!(matches!(
            output.write_frame(
                &src,
                ColourConversion::Unchanged,
                ConformanceWindow::new(4, 2, 0, 0),
                None,
                CodecOptions::empty(),
            ),
            Err(Error::GeometryMismatch(ComponentId::Y))
        ));
    }

    #[test]
    fn mono_source_into_420_file() {
        let depths = ChannelDepths::uniform(8);
        let (mut output, buffer) = writer(depths, depths);
        let mut src = planes(4, 2, ChromaFormat::Mono);
        src.plane_mut(ComponentId::Y).unwrap().fill(9);

        output
            .write_frame(
                &src,
                ColourConversion::Unchanged,
                ConformanceWindow::default(),
                Some(ChromaFormat::Yuv420),
                CodecOptions::empty(),
            )
            .unwrap();

        let mut expected = vec![9; 8];
        expected.extend([128; 4]);
        assert_eq!(expected, *buffer.0.borrow());
    }

    #[test]
    fn source_444_into_422_file() {
        let depths = ChannelDepths::uniform(8);
        let (mut output, buffer) = writer(depths, depths);
        let mut src = planes(4, 1, ChromaFormat::Yuv444);
        src.plane_mut(ComponentId::Cb)
            .unwrap()
            .row_mut(0)
            .copy_from_slice(&[1, 2, 3, 4]);

        output
            .write_frame(
                &src,
                ColourConversion::Unchanged,
                ConformanceWindow::default(),
                Some(ChromaFormat::Yuv422),
                CodecOptions::empty(),
            )
            .unwrap();

        assert_eq!(vec![0, 0, 0, 0, 1, 3, 0, 0], *buffer.0.borrow());
    }

    #[test]
    fn source_420_into_444_file() {
        let depths = ChannelDepths::uniform(8);
        let (mut output, buffer) = writer(depths, depths);
        let mut src = planes(4, 4, ChromaFormat::Yuv420);
        for (component, base) in [(ComponentId::Cb, 1), (ComponentId::Cr, 5)] {
            let plane = src.plane_mut(component).unwrap();
            plane.row_mut(0).copy_from_slice(&[base, base + 1]);
            plane.row_mut(1).copy_from_slice(&[base + 2, base + 3]);
        }

        output
            .write_frame(
                &src,
                ColourConversion::Unchanged,
                ConformanceWindow::default(),
                Some(ChromaFormat::Yuv444),
                CodecOptions::empty(),
            )
            .unwrap();

        // Each chroma row is written twice, each sample twice across.
        let mut expected: Vec<u8> = vec![0; 16];
        for base in [1, 5] {
            for row in [[base, base + 1], [base, base + 1], [base + 2, base + 3], [base + 2, base + 3]] {
                expected.extend([row[0], row[0], row[1], row[1]]);
            }
        }
        assert_eq!(expected, *buffer.0.borrow());
    }

    #[test]
    fn source_444_into_420_file() {
        let depths = ChannelDepths::uniform(8);
        let (mut output, buffer) = writer(depths, depths);
        let mut src = planes(4, 4, ChromaFormat::Yuv444);
        for (component, base) in [(ComponentId::Cb, 0), (ComponentId::Cr, 100)] {
            let plane = src.plane_mut(component).unwrap();
            for y in 0..4 {
                for (x, sample) in plane.row_mut(y).iter_mut().enumerate() {
                    *sample = (base + y * 10 + x + 1) as i16;
                }
            }
        }

        output
            .write_frame(
                &src,
                ColourConversion::Unchanged,
                ConformanceWindow::default(),
                Some(ChromaFormat::Yuv420),
                CodecOptions::empty(),
            )
            .unwrap();

        // Only even rows and columns of chroma survive.
        let mut expected: Vec<u8> = vec![0; 16];
        expected.extend([1, 3, 21, 23, 101, 103, 121, 123]);
        assert_eq!(expected, *buffer.0.borrow());
    }

    #[test]
    fn odd_height_420_is_rejected() {
        let depths = ChannelDepths::uniform(8);
        let (mut output, buffer) = writer(depths, depths);
        let src = planes(4, 3, ChromaFormat::Yuv420);

        assert!(matches!(
            output.write_frame(
                &src,
                ColourConversion::Unchanged,
                ConformanceWindow::default(),
                None,
                CodecOptions::empty(),
            ),
            Err(Error::GeometryMismatch(ComponentId::Cb))
        ));
        assert!(buffer.0.borrow().is_empty());

        output
            .write_frame(
                &src,
                ColourConversion::Unchanged,
                ConformanceWindow::new(0, 0, 0, 1),
                None,
                CodecOptions::empty(),
            )
            .unwrap();
        assert_eq!(12, buffer.0.borrow().len());
    }

    #[test]
    fn odd_window_into_coarser_file_is_rejected() {
        let depths = ChannelDepths::uniform(8);
        let (mut output, _) = writer(depths, depths);
        let src = planes(4, 2, ChromaFormat::Yuv444);

        assert!(matches!(
            output.write_frame(
                &src,
                ColourConversion::Unchanged,
                ConformanceWindow::new(1, 0, 0, 0),
                Some(ChromaFormat::Yuv422),
                CodecOptions::empty(),
            ),
            Err(Error::GeometryMismatch(ComponentId::Cb))
        ));
    }

    #[test]
    fn swap_is_undone_on_write() {
        let depths = ChannelDepths::uniform(8);
        let (mut output, buffer) = writer(depths, depths);
        let mut src = planes(2, 1, ChromaFormat::Yuv444);
        src.plane_mut(ComponentId::Cb).unwrap().fill(1);
        src.plane_mut(ComponentId::Cr).unwrap().fill(2);

        output
            .write_frame(
                &src,
                ColourConversion::SwapCbCr,
                ConformanceWindow::default(),
                None,
                CodecOptions::empty(),
            )
            .unwrap();

        assert_eq!(vec![0, 0, 2, 2, 1, 1], *buffer.0.borrow());
    }

    #[test]
    fn interlaced_field_order() {
        let depths = ChannelDepths::uniform(8);
        let mut top = planes(2, 1, ChromaFormat::Mono);
        let mut bottom = planes(2, 1, ChromaFormat::Mono);
        top.plane_mut(ComponentId::Y).unwrap().fill(1);
        bottom.plane_mut(ComponentId::Y).unwrap().fill(2);

        let (mut output, buffer) = writer(depths, depths);
        output
            .write_interlaced_frame(
                &top,
                &bottom,
                ColourConversion::Unchanged,
                ConformanceWindow::default(),
                None,
                CodecOptions::TOP_FIELD_FIRST,
            )
            .unwrap();
        assert_eq!(vec![1, 1, 2, 2], *buffer.0.borrow());

        let (mut output, buffer) = writer(depths, depths);
        output
            .write_interlaced_frame(
                &top,
                &bottom,
                ColourConversion::Unchanged,
                ConformanceWindow::default(),
                None,
                CodecOptions::empty(),
            )
            .unwrap();
        assert_eq!(vec![2, 2, 1, 1], *buffer.0.borrow());
    }

    #[test]
    fn interlaced_fields_must_match() {
        let depths = ChannelDepths::uniform(8);
        let (mut output, _) = writer(depths, depths);
        let top = planes(4, 2, ChromaFormat::Yuv420);
        let bottom = planes(4, 4, ChromaFormat::Yuv420);

        assert!(matches!(
            output.write_interlaced_frame(
                &top,
                &bottom,
                ColourConversion::Unchanged,
                ConformanceWindow::default(),
                None,
                CodecOptions::TOP_FIELD_FIRST,
            ),
            Err(Error::GeometryMismatch(ComponentId::Y))
        ));
    }

    #[test]
    fn stream_failure() {
        let depths = ChannelDepths::uniform(8);
        let mut output = RawFrameCodec::from_writer(Broken, depths, depths, depths).unwrap();
        let src = planes(4, 4, ChromaFormat::Yuv420);

        assert!(matches!(
            output.write_frame(
                &src,
                ColourConversion::Unchanged,
                ConformanceWindow::default(),
                None,
                CodecOptions::empty(),
            ),
            Err(Error::WriteFailure(_))
        ));
        assert!(output.is_failed());
    }

    #[test]
    fn cannot_write_to_reader() {
        let depths = ChannelDepths::uniform(8);
        let mut input =
            RawFrameCodec::from_reader(Cursor::new(Vec::new()), depths, depths, depths).unwrap();
        let src = planes(4, 4, ChromaFormat::Yuv420);

        assert!(matches!(
            input.write_frame(
                &src,
                ColourConversion::Unchanged,
                ConformanceWindow::default(),
                None,
                CodecOptions::empty(),
            ),
            Err(Error::InvalidCodecState(_))
        ));
    }
}
