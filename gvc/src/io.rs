//! Raw YUV frame file I/O.

mod codec;
mod colour;
mod read;
mod stream;
mod write;

pub use codec::{RawFrameCodec, MAX_FILE_BIT_DEPTH};
pub use colour::{convert as convert_colour, convert_in_place as convert_colour_in_place};
pub use read::FrameStatus;
pub use stream::{ByteSource, Seekable, Unseekable};
pub use write::ConformanceWindow;
