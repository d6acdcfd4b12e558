//! Coding block addressing
//!
//! A picture is tiled in raster order by blocks of the maximum coding size,
//! and each block is further split by a quadtree down to a minimum partition
//! size. The tables here map both kinds of address to sample offsets inside
//! the picture's planes, relative to each plane's origin.

use crate::chroma;
use crate::error::{Error, Result};
use crate::frame::geometry::PictureGeometry;
use crate::types::{ChannelType, MAX_NUM_CHANNEL_TYPE};
use itertools::iproduct;

/// The position of one maximum-size coding block within its picture.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockDescriptor {
    /// Raster scan address of the block.
    pub address: usize,

    /// Luma column of the block's top-left sample.
    pub pel_x: usize,

    /// Luma row of the block's top-left sample.
    pub pel_y: usize,

    /// How many minimum partitions the block splits into.
    pub num_partitions: usize,
}

/// Offset tables for locating blocks and partitions in a picture's planes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartitionTable {
    frame_width_in_blocks: usize,
    frame_height_in_blocks: usize,
    num_blocks_in_frame: usize,

    /// Luma size of a minimum partition.
    min_block_width: usize,
    min_block_height: usize,

    max_depth: u32,
    num_partitions_in_block: usize,

    /// Per channel, the offset of each block's first sample.
    ctu_offsets: [Vec<usize>; MAX_NUM_CHANNEL_TYPE],

    /// Per channel, the offset of each minimum partition within its block.
    ///
    /// Indexed by `(row << max_depth) + col`.
    partition_offsets: [Vec<usize>; MAX_NUM_CHANNEL_TYPE],

    descriptors: Vec<BlockDescriptor>,
}

impl PartitionTable {
    /// Build the tables for a picture of the given geometry.
    ///
    /// The strides used are the ones planes allocated from the same geometry
    /// will have.
    pub fn build(geometry: &PictureGeometry) -> Result<Self> {
        let max_depth = geometry.max_depth;
        let min_block_width = geometry.max_block_width.checked_shr(max_depth).unwrap_or(0);
        let min_block_height = geometry.max_block_height.checked_shr(max_depth).unwrap_or(0);

        if min_block_width == 0 || min_block_height == 0 {
            return Err(Error::InvalidDepth {
                width: geometry.max_block_width as u32,
                height: geometry.max_block_height as u32,
                depth: max_depth,
            });
        }

        let frame_width_in_blocks = ceil_div(geometry.width, geometry.max_block_width);
        let frame_height_in_blocks = ceil_div(geometry.height, geometry.max_block_height);
        let num_blocks_in_frame = frame_width_in_blocks * frame_height_in_blocks;
        let partitions_per_side = 1usize << max_depth;
        let num_partitions_in_block = partitions_per_side * partitions_per_side;

        let mut ctu_offsets: [Vec<usize>; MAX_NUM_CHANNEL_TYPE] = Default::default();
        let mut partition_offsets: [Vec<usize>; MAX_NUM_CHANNEL_TYPE] = Default::default();

        for channel in ChannelType::ALL {
            let stride = geometry.channel_stride(channel);
            let ctu_width = geometry.max_block_width >> chroma::channel_scale_x(channel, geometry.format);
            let ctu_height =
                geometry.max_block_height >> chroma::channel_scale_y(channel, geometry.format);

            ctu_offsets[channel as usize] =
                iproduct!(0..frame_height_in_blocks, 0..frame_width_in_blocks)
                    .map(|(row, col)| stride * row * ctu_height + col * ctu_width)
                    .collect();

            let part_width = ctu_width >> max_depth;
            let part_height = ctu_height >> max_depth;

            // Row-major iteration yields exactly `(row << max_depth) + col`.
            partition_offsets[channel as usize] =
                iproduct!(0..partitions_per_side, 0..partitions_per_side)
                    .map(|(row, col)| stride * row * part_height + col * part_width)
                    .collect();
        }

        let descriptors = iproduct!(0..frame_height_in_blocks, 0..frame_width_in_blocks)
            .enumerate()
            .map(|(address, (row, col))| BlockDescriptor {
                address,
                pel_x: col * geometry.max_block_width,
                pel_y: row * geometry.max_block_height,
                num_partitions: num_partitions_in_block,
            })
            .collect();

        Ok(Self {
            frame_width_in_blocks,
            frame_height_in_blocks,
            num_blocks_in_frame,
            min_block_width,
            min_block_height,
            max_depth,
            num_partitions_in_block,
            ctu_offsets,
            partition_offsets,
            descriptors,
        })
    }

    pub fn frame_width_in_blocks(&self) -> usize {
        self.frame_width_in_blocks
    }

    pub fn frame_height_in_blocks(&self) -> usize {
        self.frame_height_in_blocks
    }

    pub fn num_blocks_in_frame(&self) -> usize {
        self.num_blocks_in_frame
    }

    /// Luma width of a minimum partition.
    pub fn min_block_width(&self) -> usize {
        self.min_block_width
    }

    /// Luma height of a minimum partition.
    pub fn min_block_height(&self) -> usize {
        self.min_block_height
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn num_partitions_in_block(&self) -> usize {
        self.num_partitions_in_block
    }

    /// The descriptor of the block at a raster address.
    pub fn block_at(&self, address: usize) -> Result<&BlockDescriptor> {
        self.descriptors.get(address).ok_or(Error::OutOfRange {
            index: address,
            len: self.descriptors.len(),
        })
    }

    /// All block descriptors, in raster order.
    pub fn blocks(&self) -> &[BlockDescriptor] {
        &self.descriptors
    }

    /// Offset of a block's first sample from the plane origin.
    pub fn ctu_offset(&self, channel: ChannelType, address: usize) -> Result<usize> {
        let table = &self.ctu_offsets[channel as usize];

        table.get(address).copied().ok_or(Error::OutOfRange {
            index: address,
            len: table.len(),
        })
    }

    /// Offset of a minimum partition's first sample from its block's first
    /// sample.
    pub fn partition_offset(&self, channel: ChannelType, index: usize) -> Result<usize> {
        let table = &self.partition_offsets[channel as usize];

        table.get(index).copied().ok_or(Error::OutOfRange {
            index,
            len: table.len(),
        })
    }
}

fn ceil_div(value: usize, divisor: usize) -> usize {
    value / divisor + usize::from(value % divisor != 0)
}
