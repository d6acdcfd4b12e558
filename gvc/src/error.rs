//! Error type

use crate::types::{ChromaFormat, ComponentId, PictureRole};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// All errors which can occur while allocating, addressing, reading or
/// writing pictures.
#[derive(Error, Debug)]
pub enum Error {
    /// The backing store for a sample plane could not be obtained.
    #[error("failed to allocate a plane of {samples} samples")]
    AllocationFailure { samples: usize },

    /// A raw YUV file could not be opened or created.
    #[error("failed to open YUV file `{}`", path.display())]
    FileOpenFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Files cannot be read with samples deeper than 16 bits.
    #[error("cannot read a YUV file of bit depth {0}, the maximum is 16")]
    UnsupportedBitDepth(u32),

    /// A chroma format tag did not name any known format.
    #[error("unrecognised chroma format {0}")]
    UnsupportedFormat(u32),

    /// Two pictures (or planes) that were required to share dimensions did
    /// not.
    #[error("plane geometry of component {0:?} does not match")]
    GeometryMismatch(ComponentId),

    /// The quadtree depth would shrink the minimum block size to nothing.
    #[error("block size {width}x{height} cannot be split to depth {depth}")]
    InvalidDepth { width: u32, height: u32, depth: u32 },

    /// The requested picture role has no buffers allocated.
    #[error("picture has no {0:?} buffers")]
    InvalidRole(PictureRole),

    /// The requested component does not exist in this chroma format.
    #[error("component {0:?} does not exist in this chroma format")]
    InvalidComponent(ComponentId),

    /// A table index was past the end of the table.
    #[error("index {index} is out of range for {len} entries")]
    OutOfRange { index: usize, len: usize },

    /// A colour conversion or copy was requested on an incompatible chroma
    /// format.
    #[error("expected {expected:?} samples, got {found:?}")]
    FormatMismatch {
        expected: ChromaFormat,
        found: ChromaFormat,
    },

    /// The output stream refused some or all of a frame.
    #[error("failed to write frame data")]
    WriteFailure(#[source] io::Error),

    /// The input stream ran out of data.
    ///
    /// This is the normal way for a read loop to end.
    #[error("end of stream")]
    EndOfStream,

    /// The codec was asked to do something its current state doesn't allow,
    /// such as reading from a file opened for writing.
    #[error("raw frame codec is {0}")]
    InvalidCodecState(&'static str),

    /// Session parameters failed validation.
    ///
    /// Each failed check contributes one message.
    #[error("invalid configuration: {}", .0.join("; "))]
    InvalidConfig(Vec<&'static str>),

    /// An I/O error other than end of stream occurred while reading.
    #[error("an unhandled I/O error occurred")]
    UnhandledIoError(#[from] io::Error),
}

impl Error {
    /// Whether this error just signals the end of the input.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }

    /// Whether this error is a precondition violation by the caller, as
    /// opposed to an I/O condition.
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            Self::GeometryMismatch(_)
                | Self::InvalidDepth { .. }
                | Self::FormatMismatch { .. }
                | Self::OutOfRange { .. }
                | Self::InvalidRole(_)
                | Self::InvalidComponent(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
