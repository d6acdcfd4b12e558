//! Frame processors

use crate::error::Result;
use crate::frame::Picture;
use crate::types::PictureRole;

/// Whatever a session does to each frame between reading and writing it.
///
/// `original` holds the frame just read in its `Original` planes;
/// `reconstructed` is written out from its `Reconstructed` planes once this
/// returns.
pub trait FrameProcessor {
    fn process(&mut self, original: &Picture, reconstructed: &mut Picture) -> Result<()>;
}

/// Reconstructs every frame as an exact copy of the original.
#[derive(Copy, Clone, Debug, Default)]
pub struct PassThrough;

impl FrameProcessor for PassThrough {
    fn process(&mut self, original: &Picture, reconstructed: &mut Picture) -> Result<()> {
        let source = original.planes(PictureRole::Original)?;
        source.copy_to(reconstructed.planes_mut(PictureRole::Reconstructed)?)
    }
}

impl<F> FrameProcessor for F
where
    F: FnMut(&Picture, &mut Picture) -> Result<()>,
{
    fn process(&mut self, original: &Picture, reconstructed: &mut Picture) -> Result<()> {
        self(original, reconstructed)
    }
}
