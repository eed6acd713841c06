use std::cell::RefCell;
use std::rc::Rc;

use crate::bounds::Bounds;
use crate::enums::Axis;

/// Camera distance from the frame center, in multiples of the framing span.
pub const K_DISTANCE: f64 = 1.5;
/// Initial parallel scale, in multiples of the framing span.
pub const K_ZOOM: f64 = 0.5;

/// Parallel-projection camera shared by every view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: [f64; 3],
    pub focal_point: [f64; 3],
    pub view_up: [f64; 3],
    pub parallel_scale: f64,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 1.0],
            focal_point: [0.0; 3],
            view_up: [0.0, 1.0, 0.0],
            parallel_scale: 1.0,
        }
    }
}

impl CameraPose {
    /// Frame `frame` looking along `axis`.
    pub fn frame(frame: &Bounds, axis: Axis) -> Self {
        let (direction, view_up) = orientation(axis);
        let center = frame.center();
        let (a, b) = axis.others();
        let span = frame.extent(a).max(frame.extent(b));
        let span = if span > 0.0 { span } else { 1.0 };

        let distance = span * K_DISTANCE;
        let position = [0, 1, 2].map(|i| center[i] + distance * direction[i]);
        Self {
            position,
            focal_point: center,
            view_up,
            parallel_scale: span * K_ZOOM,
        }
    }

    /// Magnify by `factor`; values above one zoom in.
    pub fn zoom(&mut self, factor: f64) {
        if factor.is_finite() && factor > 0.0 {
            self.parallel_scale /= factor;
        }
    }

    /// Unit vector from the focal point towards the camera.
    pub fn direction(&self) -> [f64; 3] {
        let d = [0, 1, 2].map(|i| self.position[i] - self.focal_point[i]);
        let norm = (d[0] * d[0] + d[1] * d[1] + d[2] * d[2]).sqrt();
        if norm > 0.0 { d.map(|c| c / norm) } else { d }
    }
}

/// Offset direction and view-up per axis, following radiological convention.
fn orientation(axis: Axis) -> ([f64; 3], [f64; 3]) {
    match axis {
        Axis::Coronal => ([-1.0, 0.0, 0.0], [0.0, -1.0, 0.0]),
        Axis::Axial => ([0.0, 1.0, 0.0], [0.0, 0.0, -1.0]),
        Axis::Sagittal => ([0.0, 0.0, 1.0], [0.0, -1.0, 0.0]),
    }
}

/// Handle to the single camera all renderers draw with.
///
/// Cloning the handle shares the pose; use [`SharedCamera::get`] for a copy.
#[derive(Debug, Clone, Default)]
pub struct SharedCamera(Rc<RefCell<CameraPose>>);

impl SharedCamera {
    pub fn new(pose: CameraPose) -> Self {
        Self(Rc::new(RefCell::new(pose)))
    }

    pub fn get(&self) -> CameraPose {
        *self.0.borrow()
    }

    pub fn set(&self, pose: CameraPose) {
        *self.0.borrow_mut() = pose;
    }

    /// Apply an interactive change (rotate, pan, zoom) seen by every view.
    pub fn update(&self, f: impl FnOnce(&mut CameraPose)) {
        f(&mut *self.0.borrow_mut());
    }

    pub fn ptr_eq(&self, other: &SharedCamera) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
