//! Picture geometry

use crate::chroma;
use crate::types::{ChannelType, ChromaFormat, ComponentId};

/// Extra border samples kept around every plane on top of the block-size
/// margin, enough for an 8-tap filter and 16-sample alignment.
pub const FILTER_MARGIN: usize = 16;

/// The parameters a picture's buffers and block tables are derived from.
///
/// Every stride, margin and table offset of a picture is computed from one of
/// these, so two pictures created from equal geometries have identical
/// layouts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PictureGeometry {
    /// Luma width of the picture, in samples.
    pub width: usize,

    /// Luma height of the picture, in samples.
    pub height: usize,

    /// The chroma subsampling of the picture.
    pub format: ChromaFormat,

    /// Width of the largest coding block, in luma samples.
    pub max_block_width: usize,

    /// Height of the largest coding block, in luma samples.
    pub max_block_height: usize,

    /// How many times the largest coding block may be quartered.
    pub max_depth: u32,

    /// Whether to reserve a block-sized margin around each plane in addition
    /// to the filter margin.
    pub use_margin: bool,
}

impl PictureGeometry {
    /// Geometry for a picture with block-sized margins.
    pub fn new(
        width: usize,
        height: usize,
        format: ChromaFormat,
        max_block_width: usize,
        max_block_height: usize,
        max_depth: u32,
    ) -> Self {
        Self {
            width,
            height,
            format,
            max_block_width,
            max_block_height,
            max_depth,
            use_margin: true,
        }
    }

    /// The same geometry without the block-sized part of the margin.
    pub fn without_block_margin(self) -> Self {
        Self {
            use_margin: false,
            ..self
        }
    }

    /// Horizontal luma margin.
    pub fn margin_x(&self) -> usize {
        (if self.use_margin { self.max_block_width } else { 0 }) + FILTER_MARGIN
    }

    /// Vertical luma margin.
    pub fn margin_y(&self) -> usize {
        (if self.use_margin { self.max_block_height } else { 0 }) + FILTER_MARGIN
    }

    /// Visible width of a component.
    pub fn component_width(&self, component: ComponentId) -> usize {
        self.width >> chroma::scale_x(component, self.format)
    }

    /// Visible height of a component.
    pub fn component_height(&self, component: ComponentId) -> usize {
        self.height >> chroma::scale_y(component, self.format)
    }

    /// Horizontal margin of a component.
    pub fn component_margin_x(&self, component: ComponentId) -> usize {
        self.margin_x() >> chroma::scale_x(component, self.format)
    }

    /// Vertical margin of a component.
    pub fn component_margin_y(&self, component: ComponentId) -> usize {
        self.margin_y() >> chroma::scale_y(component, self.format)
    }

    /// Distance between vertically adjacent samples of a channel's planes.
    pub fn channel_stride(&self, channel: ChannelType) -> usize {
        let sx = chroma::channel_scale_x(channel, self.format);

        (self.width >> sx) + 2 * (self.margin_x() >> sx)
    }

    /// Distance between vertically adjacent samples of a component's plane.
    pub fn component_stride(&self, component: ComponentId) -> usize {
        self.channel_stride(chroma::channel_of(component))
    }
}
