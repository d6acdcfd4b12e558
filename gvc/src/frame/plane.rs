//! Sample plane storage

use crate::error::{Error, Result};
use gvc_rs_yuv::rescale::{scale_plane, ClipRange};

/// One plane of samples, surrounded by a margin.
///
/// The plane owns a single contiguous array of `stride * total_height`
/// samples. The visible `width` by `height` area starts `margin_y` rows and
/// `margin_x` columns into that array; everything else is margin, reserved for
/// filters that read past the picture edge.
///
/// All geometry is fixed when the plane is allocated. A released plane has no
/// storage and zero geometry, so any attempt to address a sample in it falls
/// out of bounds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlaneBuffer {
    /// The backing store, including margins.
    data: Vec<i16>,

    /// Visible width, in samples.
    width: usize,

    /// Visible height, in samples.
    height: usize,

    /// Margin on the left and right of each row.
    margin_x: usize,

    /// Margin above and below the visible rows.
    margin_y: usize,

    /// Distance between vertically adjacent samples.
    stride: usize,

    /// Number of rows in the backing store.
    total_height: usize,

    /// Index of the first visible sample in the backing store.
    origin: usize,

    /// Whether the plane currently holds storage.
    allocated: bool,
}

impl PlaneBuffer {
    /// Allocate a zeroed plane with the given visible size and margins.
    ///
    /// Fails with `AllocationFailure` if the backing store cannot be
    /// obtained.
    pub fn allocate(width: usize, height: usize, margin_x: usize, margin_y: usize) -> Result<Self> {
        let stride = width + 2 * margin_x;
        let total_height = height + 2 * margin_y;
        let samples = stride
            .checked_mul(total_height)
            .ok_or(Error::AllocationFailure { samples: usize::MAX })?;

        let mut data = Vec::new();
        data.try_reserve_exact(samples)
            .map_err(|_| Error::AllocationFailure { samples })?;
        data.resize(samples, 0);

        Ok(Self {
            data,
            width,
            height,
            margin_x,
            margin_y,
            stride,
            total_height,
            origin: margin_y * stride + margin_x,
            allocated: true,
        })
    }

    /// Free the backing store.
    ///
    /// Releasing an already released plane does nothing.
    pub fn release(&mut self) {
        *self = Self::default();
    }

    /// Release the plane, then allocate it again with new geometry.
    pub fn reallocate(
        &mut self,
        width: usize,
        height: usize,
        margin_x: usize,
        margin_y: usize,
    ) -> Result<()> {
        self.release();
        *self = Self::allocate(width, height, margin_x, margin_y)?;

        Ok(())
    }

    /// Whether the plane currently holds storage.
    pub fn is_allocated(&self) -> bool {
        self.allocated
    }

    /// Visible width, in samples.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Visible height, in samples.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Distance between vertically adjacent samples.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of rows in the backing store, margins included.
    pub fn total_height(&self) -> usize {
        self.total_height
    }

    pub fn margin_x(&self) -> usize {
        self.margin_x
    }

    pub fn margin_y(&self) -> usize {
        self.margin_y
    }

    /// Index of the first visible sample within `buffer()`.
    pub fn origin_offset(&self) -> usize {
        self.origin
    }

    /// The whole backing store, margins included.
    pub fn buffer(&self) -> &[i16] {
        &self.data
    }

    /// The whole backing store, margins included.
    pub fn buffer_mut(&mut self) -> &mut [i16] {
        &mut self.data
    }

    /// The backing store from the first visible sample onwards.
    pub fn origin(&self) -> &[i16] {
        &self.data[self.origin..]
    }

    /// The backing store from the first visible sample onwards.
    pub fn origin_mut(&mut self) -> &mut [i16] {
        let origin = self.origin;
        &mut self.data[origin..]
    }

    /// The backing store from `offset` samples past the first visible sample
    /// onwards, or `None` if that lies outside the plane.
    pub fn from_origin(&self, offset: usize) -> Option<&[i16]> {
        self.data.get(self.origin.checked_add(offset)?..)
    }

    /// The visible samples of row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `y` is not a visible row.
    pub fn row(&self, y: usize) -> &[i16] {
        assert!(y < self.height, "row {} out of {}", y, self.height);
        let start = self.origin + y * self.stride;
        &self.data[start..start + self.width]
    }

    /// The visible samples of row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `y` is not a visible row.
    pub fn row_mut(&mut self, y: usize) -> &mut [i16] {
        assert!(y < self.height, "row {} out of {}", y, self.height);
        let start = self.origin + y * self.stride;
        &mut self.data[start..start + self.width]
    }

    /// Row `y` of the backing store, margins included.
    ///
    /// Rows are numbered from the top of the margin.
    pub fn raw_row(&self, y: usize) -> &[i16] {
        &self.data[y * self.stride..(y + 1) * self.stride]
    }

    /// Row `y` of the backing store, margins included.
    pub fn raw_row_mut(&mut self, y: usize) -> &mut [i16] {
        &mut self.data[y * self.stride..(y + 1) * self.stride]
    }

    /// The visible sample at `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> Option<i16> {
        if x < self.width && y < self.height {
            self.data.get(self.origin + y * self.stride + x).copied()
        } else {
            None
        }
    }

    /// The visible sample at `(x, y)`.
    pub fn get_mut(&mut self, x: usize, y: usize) -> Option<&mut i16> {
        if x < self.width && y < self.height {
            self.data.get_mut(self.origin + y * self.stride + x)
        } else {
            None
        }
    }

    /// Set every visible sample to `value`.
    pub fn fill(&mut self, value: i16) {
        for y in 0..self.height {
            self.row_mut(y).fill(value);
        }
    }

    /// Copy the visible samples of `src` into this plane.
    ///
    /// Both planes must have the same visible size. When the strides also
    /// match, the backing stores are copied wholesale, margins included.
    pub(crate) fn copy_from(&mut self, src: &PlaneBuffer) -> bool {
        if self.width != src.width || self.height != src.height {
            return false;
        }

        if self.stride == src.stride && self.data.len() == src.data.len() {
            self.data.copy_from_slice(&src.data);
        } else {
            for y in 0..self.height {
                self.row_mut(y).copy_from_slice(src.row(y));
            }
        }

        true
    }

    /// Rescale every visible sample by `2^shift`, clipping into `range` when
    /// narrowing.
    pub fn scale(&mut self, shift: i32, range: ClipRange) {
        let (stride, width, height) = (self.stride, self.width, self.height);
        scale_plane(self.origin_mut(), stride, width, height, shift, range);
    }
}
