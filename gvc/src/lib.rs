//! Planar picture buffers and raw YUV frame I/O for block-based video coding

#[macro_use]
extern crate bitflags;

pub mod chroma;
mod error;
pub mod frame;
pub mod io;
pub mod session;
mod types;

pub use error::{Error, Result};
pub use frame::{Picture, PictureGeometry, PlaneBuffer, PlaneSet};
pub use io::{ConformanceWindow, FrameStatus, RawFrameCodec};
pub use session::{FrameProcessor, PassThrough, Session, SessionConfig, SessionSummary};
pub use types::{
    ChannelDepths, ChannelType, ChromaFormat, CodecOptions, ColourConversion, ComponentId,
    OpenMode, PictureRole, PictureRoles, MAX_NUM_CHANNEL_TYPE, MAX_NUM_COMPONENT,
};
