//! Pictures

use crate::chroma;
use crate::error::{Error, Result};
use crate::frame::geometry::PictureGeometry;
use crate::frame::partition::{BlockDescriptor, PartitionTable};
use crate::frame::planes::PlaneSet;
use crate::types::{ChromaFormat, ComponentId, PictureRole, PictureRoles};

/// A picture: plane sets for each allocated role, and the block tables which
/// address into them.
///
/// Every plane set of a picture is allocated from the same geometry, so the
/// offsets in the partition table are valid for all of them.
#[derive(Clone, Debug, Default)]
pub struct Picture {
    geometry: Option<PictureGeometry>,

    /// Plane sets indexed by `PictureRole`.
    planes: [Option<PlaneSet>; 4],

    partitions: PartitionTable,
}

impl Picture {
    /// Allocate a picture with buffers for each of `roles`.
    ///
    /// Virtual pictures never hold original samples, so `ORIGINAL` is dropped
    /// from their roles.
    pub fn create(geometry: PictureGeometry, roles: PictureRoles, is_virtual: bool) -> Result<Self> {
        let mut roles = roles;
        if is_virtual {
            roles.remove(PictureRoles::ORIGINAL);
        }

        let partitions = PartitionTable::build(&geometry)?;
        let mut picture = Self {
            geometry: Some(geometry),
            planes: Default::default(),
            partitions,
        };

        for role in PictureRole::ALL {
            if roles.contains(role.as_flag()) {
                picture.planes[role as usize] = Some(PlaneSet::allocate(&geometry)?);
            }
        }

        Ok(picture)
    }

    /// Release all buffers, most recently allocated role first.
    ///
    /// Destroying an already destroyed picture does nothing.
    pub fn destroy(&mut self) {
        for set in self.planes.iter_mut().rev() {
            if let Some(mut set) = set.take() {
                set.release();
            }
        }

        self.partitions = PartitionTable::default();
        self.geometry = None;
    }

    pub fn geometry(&self) -> Option<&PictureGeometry> {
        self.geometry.as_ref()
    }

    pub fn chroma_format(&self) -> ChromaFormat {
        self.geometry
            .map(|g| g.format)
            .unwrap_or(ChromaFormat::Mono)
    }

    pub fn valid_component_count(&self) -> usize {
        chroma::valid_component_count(self.chroma_format())
    }

    /// Stride of a component's planes.
    pub fn stride(&self, component: ComponentId) -> usize {
        self.geometry
            .map(|g| g.component_stride(component))
            .unwrap_or(0)
    }

    /// Visible width of a component's planes.
    pub fn width(&self, component: ComponentId) -> usize {
        self.geometry
            .map(|g| g.component_width(component))
            .unwrap_or(0)
    }

    /// Visible height of a component's planes.
    pub fn height(&self, component: ComponentId) -> usize {
        self.geometry
            .map(|g| g.component_height(component))
            .unwrap_or(0)
    }

    pub fn component_scale_x(&self, component: ComponentId) -> u32 {
        chroma::scale_x(component, self.chroma_format())
    }

    pub fn component_scale_y(&self, component: ComponentId) -> u32 {
        chroma::scale_y(component, self.chroma_format())
    }

    pub fn partitions(&self) -> &PartitionTable {
        &self.partitions
    }

    /// Whether buffers for `role` are allocated.
    pub fn has_role(&self, role: PictureRole) -> bool {
        self.planes[role as usize].is_some()
    }

    /// The plane set of a role.
    pub fn planes(&self, role: PictureRole) -> Result<&PlaneSet> {
        self.planes[role as usize]
            .as_ref()
            .ok_or(Error::InvalidRole(role))
    }

    /// The plane set of a role.
    pub fn planes_mut(&mut self, role: PictureRole) -> Result<&mut PlaneSet> {
        self.planes[role as usize]
            .as_mut()
            .ok_or(Error::InvalidRole(role))
    }

    /// The samples of one component of one role, starting at the plane
    /// origin.
    pub fn plane(&self, role: PictureRole, component: ComponentId) -> Result<&[i16]> {
        Ok(self.planes(role)?.plane(component)?.origin())
    }

    /// The samples of one component of one role, starting at the plane
    /// origin.
    pub fn plane_mut(&mut self, role: PictureRole, component: ComponentId) -> Result<&mut [i16]> {
        Ok(self.planes_mut(role)?.plane_mut(component)?.origin_mut())
    }

    /// Copy the samples of every role this picture holds into `other`.
    ///
    /// `other` must have the same chroma format, and must hold every role this
    /// picture does at the same size.
    pub fn copy_samples_to(&self, other: &mut Picture) -> Result<()> {
        if self.chroma_format() != other.chroma_format() {
            return Err(Error::FormatMismatch {
                expected: self.chroma_format(),
                found: other.chroma_format(),
            });
        }

        for role in PictureRole::ALL {
            if let Some(src) = &self.planes[role as usize] {
                src.copy_to(other.planes_mut(role)?)?;
            }
        }

        Ok(())
    }

    /// Borrow the coding block at a raster address.
    pub fn block(&self, address: usize) -> Result<BlockView<'_>> {
        let descriptor = *self.partitions.block_at(address)?;

        Ok(BlockView {
            picture: self,
            descriptor,
        })
    }

    /// Iterate over every coding block, in raster order.
    pub fn blocks(&self) -> impl Iterator<Item = BlockView<'_>> {
        self.partitions.blocks().iter().map(move |descriptor| BlockView {
            picture: self,
            descriptor: *descriptor,
        })
    }
}

/// A coding block of a picture.
#[derive(Copy, Clone, Debug)]
pub struct BlockView<'a> {
    picture: &'a Picture,
    descriptor: BlockDescriptor,
}

impl<'a> BlockView<'a> {
    pub fn descriptor(&self) -> &BlockDescriptor {
        &self.descriptor
    }

    pub fn picture(&self) -> &'a Picture {
        self.picture
    }

    /// The samples of a role and component, starting at the first sample of
    /// the given minimum partition of this block.
    ///
    /// Successive rows are `picture().stride(component)` samples apart.
    pub fn samples(
        &self,
        role: PictureRole,
        component: ComponentId,
        partition: usize,
    ) -> Result<&'a [i16]> {
        let picture = self.picture;
        let channel = chroma::channel_of(component);
        let offset = picture
            .partitions
            .ctu_offset(channel, self.descriptor.address)?
            + picture.partitions.partition_offset(channel, partition)?;
        let plane = picture.planes(role)?.plane(component)?;

        plane.from_origin(offset).ok_or(Error::OutOfRange {
            index: offset,
            len: plane.buffer().len() - plane.origin_offset(),
        })
    }
}
