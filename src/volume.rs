use std::fmt;

use image::{ImageBuffer, RgbaImage};
use ndarray::Array3;
use ndarray::ArrayView2;
use ndarray::s;
use rayon::prelude::*;

use crate::bounds::Bounds;
use crate::enums::Axis;
use crate::transfer_function::TransferFunction;

/// Stable identifier of a registered volume, e.g. `"t1"` or `"ses-01/flair"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VolumeId(String);

impl VolumeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VolumeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A scalar grid placed in world space.
///
/// Voxels are stored `(depth, height, width)`, i.e. `(z, y, x)`. Spacing and
/// origin are given in `(x, y, z)` order, matching [`Bounds`].
#[derive(Debug, Clone)]
pub struct Volume {
    pub data: Array3<f32>,
    pub spacing: (f64, f64, f64),
    pub origin: (f64, f64, f64),
    scalar_range: (f32, f32),
}

impl Volume {
    pub fn new(data: Array3<f32>, spacing: (f64, f64, f64)) -> Self {
        Self::with_origin(data, spacing, (0.0, 0.0, 0.0))
    }

    pub fn with_origin(
        data: Array3<f32>,
        spacing: (f64, f64, f64),
        origin: (f64, f64, f64),
    ) -> Self {
        let scalar_range = Self::compute_scalar_range(&data);
        Self {
            data,
            spacing,
            origin,
            scalar_range,
        }
    }

    /// Get the dimensions of the volume (depth, height, width)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    /// Get a reference to the underlying data
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// Minimum and maximum over all finite voxels, `(0, 0)` for an empty grid.
    pub fn scalar_range(&self) -> (f32, f32) {
        self.scalar_range
    }

    /// World-space box spanned by the voxel centers.
    pub fn bounds(&self) -> Bounds {
        let (depth, height, width) = self.dim();
        let extent = |origin: f64, spacing: f64, count: usize| {
            let end = origin + count.saturating_sub(1) as f64 * spacing;
            (origin.min(end), origin.max(end))
        };
        let (xmin, xmax) = extent(self.origin.0, self.spacing.0, width);
        let (ymin, ymax) = extent(self.origin.1, self.spacing.1, height);
        let (zmin, zmax) = extent(self.origin.2, self.spacing.2, depth);
        Bounds::new(xmin, xmax, ymin, ymax, zmin, zmax)
    }

    /// Voxel plane at `index` perpendicular to `axis`, `None` when out of range.
    pub fn get_slice_from_axis(&self, index: usize, axis: Axis) -> Option<ArrayView2<'_, f32>> {
        let (depth, height, width) = self.dim();
        let slice = match axis {
            Axis::Coronal if index < width => self.data.slice(s![.., .., index]),
            Axis::Axial if index < height => self.data.slice(s![.., index, ..]),
            Axis::Sagittal if index < depth => self.data.slice(s![index, .., ..]),
            _ => return None,
        };
        Some(slice)
    }

    /// Voxel index nearest to world coordinate `world` along `axis`.
    pub fn voxel_index(&self, world: f64, axis: Axis) -> Option<usize> {
        let (depth, height, width) = self.dim();
        let (origin, spacing, count) = match axis {
            Axis::Coronal => (self.origin.0, self.spacing.0, width),
            Axis::Axial => (self.origin.1, self.spacing.1, height),
            Axis::Sagittal => (self.origin.2, self.spacing.2, depth),
        };
        if count == 0 || spacing == 0.0 || !world.is_finite() {
            return None;
        }
        let index = ((world - origin) / spacing).round();
        (index >= 0.0 && index < count as f64).then_some(index as usize)
    }

    /// Render the plane through the middle of `slab` along `axis` with `tf`.
    ///
    /// Returns `None` when the slab does not intersect the volume.
    pub fn slab_preview(
        &self,
        slab: &Bounds,
        axis: Axis,
        tf: &TransferFunction,
    ) -> Option<RgbaImage> {
        let (lo, hi) = slab.range(axis);
        let index = self.voxel_index(lo + (hi - lo) / 2.0, axis)?;
        let slice = self.get_slice_from_axis(index, axis)?;
        Self::slice_to_image(&slice, tf)
    }

    fn slice_to_image(slice: &ArrayView2<'_, f32>, tf: &TransferFunction) -> Option<RgbaImage> {
        let (height, width) = slice.dim();
        let pixel_data: Vec<u8> = slice
            .into_par_iter()
            .flat_map_iter(|&v| tf.rgba_at(v).0)
            .collect();
        ImageBuffer::from_raw(width as u32, height as u32, pixel_data)
    }

    fn compute_scalar_range(data: &Array3<f32>) -> (f32, f32) {
        data.par_iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(
                || None,
                |acc: Option<(f32, f32)>, v| match acc {
                    Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                    None => Some((v, v)),
                },
            )
            .reduce(
                || None,
                |a, b| match (a, b) {
                    (Some((alo, ahi)), Some((blo, bhi))) => Some((alo.min(blo), ahi.max(bhi))),
                    (a, None) => a,
                    (None, b) => b,
                },
            )
            .unwrap_or((0.0, 0.0))
    }
}
