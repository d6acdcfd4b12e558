//! Picture buffers and block addressing.

mod geometry;
mod partition;
mod picture;
mod plane;
mod planes;

pub use geometry::{PictureGeometry, FILTER_MARGIN};
pub use partition::{BlockDescriptor, PartitionTable};
pub use picture::{BlockView, Picture};
pub use plane::PlaneBuffer;
pub use planes::PlaneSet;
