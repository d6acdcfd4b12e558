//! The planes of one picture role

use crate::chroma;
use crate::error::{Error, Result};
use crate::frame::geometry::PictureGeometry;
use crate::frame::plane::PlaneBuffer;
use crate::types::{ChromaFormat, ComponentId, MAX_NUM_COMPONENT};

/// One sample plane per valid component, all sharing a luma size, chroma
/// format and margin.
///
/// Components which don't exist in the format (the chroma components of a
/// monochrome picture) are kept as released planes and cannot be addressed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlaneSet {
    /// The chroma format the planes were allocated for.
    format: Option<ChromaFormat>,

    /// Luma width and height.
    size: (usize, usize),

    /// Planes indexed by component.
    planes: [PlaneBuffer; MAX_NUM_COMPONENT],
}

impl PlaneSet {
    /// Allocate zeroed planes for every component the geometry's format
    /// carries.
    pub fn allocate(geometry: &PictureGeometry) -> Result<Self> {
        let mut set = Self {
            format: Some(geometry.format),
            size: (geometry.width, geometry.height),
            planes: Default::default(),
        };

        for component in chroma::valid_components(geometry.format) {
            set.planes[component.index()] = PlaneBuffer::allocate(
                geometry.component_width(component),
                geometry.component_height(component),
                geometry.component_margin_x(component),
                geometry.component_margin_y(component),
            )?;
        }

        Ok(set)
    }

    /// Release every plane. Releasing twice does nothing.
    pub fn release(&mut self) {
        for plane in self.planes.iter_mut().rev() {
            plane.release();
        }

        self.format = None;
        self.size = (0, 0);
    }

    pub fn is_allocated(&self) -> bool {
        self.format.is_some()
    }

    /// The chroma format the planes were allocated for.
    ///
    /// Released sets report monochrome.
    pub fn chroma_format(&self) -> ChromaFormat {
        self.format.unwrap_or(ChromaFormat::Mono)
    }

    /// Luma width.
    pub fn luma_width(&self) -> usize {
        self.size.0
    }

    /// Luma height.
    pub fn luma_height(&self) -> usize {
        self.size.1
    }

    pub fn valid_component_count(&self) -> usize {
        if self.is_allocated() {
            chroma::valid_component_count(self.chroma_format())
        } else {
            0
        }
    }

    /// Visible width of a component's plane, zero if it doesn't exist.
    pub fn width(&self, component: ComponentId) -> usize {
        self.planes[component.index()].width()
    }

    /// Visible height of a component's plane, zero if it doesn't exist.
    pub fn height(&self, component: ComponentId) -> usize {
        self.planes[component.index()].height()
    }

    /// Stride of a component's plane, zero if it doesn't exist.
    pub fn stride(&self, component: ComponentId) -> usize {
        self.planes[component.index()].stride()
    }

    pub fn scale_x(&self, component: ComponentId) -> u32 {
        chroma::scale_x(component, self.chroma_format())
    }

    pub fn scale_y(&self, component: ComponentId) -> u32 {
        chroma::scale_y(component, self.chroma_format())
    }

    /// Whether `component` has a plane in this set.
    pub fn has_component(&self, component: ComponentId) -> bool {
        self.is_allocated() && chroma::is_valid_component(component, self.chroma_format())
    }

    /// The plane of a component.
    pub fn plane(&self, component: ComponentId) -> Result<&PlaneBuffer> {
        if self.has_component(component) {
            Ok(&self.planes[component.index()])
        } else {
            Err(Error::InvalidComponent(component))
        }
    }

    /// The plane of a component.
    pub fn plane_mut(&mut self, component: ComponentId) -> Result<&mut PlaneBuffer> {
        if self.has_component(component) {
            Ok(&mut self.planes[component.index()])
        } else {
            Err(Error::InvalidComponent(component))
        }
    }

    /// Iterate over the planes of all valid components, in file order.
    pub fn iter(&self) -> impl Iterator<Item = (ComponentId, &PlaneBuffer)> {
        ComponentId::ALL
            .into_iter()
            .zip(self.planes.iter())
            .take(self.valid_component_count())
    }

    /// All plane slots, including those of components the format lacks.
    pub(crate) fn raw_planes_mut(&mut self) -> &mut [PlaneBuffer; MAX_NUM_COMPONENT] {
        &mut self.planes
    }

    /// Copy every visible sample of this set into `other`.
    ///
    /// Both sets must share a chroma format, and every plane must share a
    /// visible size with its counterpart.
    pub fn copy_to(&self, other: &mut PlaneSet) -> Result<()> {
        if self.chroma_format() != other.chroma_format() {
            return Err(Error::FormatMismatch {
                expected: self.chroma_format(),
                found: other.chroma_format(),
            });
        }

        for component in chroma::valid_components(self.chroma_format()) {
            let dst = &mut other.planes[component.index()];
            if !dst.copy_from(&self.planes[component.index()]) {
                return Err(Error::GeometryMismatch(component));
            }
        }

        Ok(())
    }

    /// Whether `other` has the same format and plane sizes as this set.
    pub fn same_layout(&self, other: &PlaneSet) -> bool {
        self.chroma_format() == other.chroma_format()
            && ComponentId::ALL.into_iter().all(|c| {
                self.width(c) == other.width(c) && self.height(c) == other.height(c)
            })
    }
}
