use std::cell::RefCell;
use std::rc::Rc;

use crate::camera::SharedCamera;
use crate::slice_state::CroppingBox;
use crate::transfer_function::TransferFunction;

/// Render surface of one volume (or overlay) as seen by the engine.
///
/// Implementations wrap whatever draws the volume; the engine only pushes
/// state into them and asks them to draw at the redraw cadence.
pub trait VolumeRenderer {
    fn set_cropping_box(&mut self, cropping: CroppingBox);

    fn set_transfer_function(&mut self, tf: &TransferFunction);

    /// Called once on registration. The renderer keeps the handle and reads
    /// the pose from it on every draw.
    fn attach_camera(&mut self, camera: SharedCamera);

    fn set_visible(&mut self, _visible: bool) {}

    fn render(&mut self);
}

/// Last state pushed into a [`RecordingRenderer`].
#[derive(Debug, Default)]
pub struct RenderLog {
    pub cropping: Option<CroppingBox>,
    pub transfer_function: Option<TransferFunction>,
    pub camera: Option<SharedCamera>,
    pub visible: bool,
    pub cropping_updates: usize,
    pub frames: usize,
}

/// Headless renderer that records what it was told.
///
/// Clones share the same log, so a host can keep one half and hand the other
/// to the engine.
#[derive(Debug, Clone)]
pub struct RecordingRenderer(Rc<RefCell<RenderLog>>);

impl Default for RecordingRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(RenderLog {
            visible: true,
            ..RenderLog::default()
        })))
    }

    pub fn log(&self) -> std::cell::Ref<'_, RenderLog> {
        self.0.borrow()
    }
}

impl VolumeRenderer for RecordingRenderer {
    fn set_cropping_box(&mut self, cropping: CroppingBox) {
        let mut log = self.0.borrow_mut();
        log.cropping = Some(cropping);
        log.cropping_updates += 1;
    }

    fn set_transfer_function(&mut self, tf: &TransferFunction) {
        self.0.borrow_mut().transfer_function = Some(tf.clone());
    }

    fn attach_camera(&mut self, camera: SharedCamera) {
        self.0.borrow_mut().camera = Some(camera);
    }

    fn set_visible(&mut self, visible: bool) {
        self.0.borrow_mut().visible = visible;
    }

    fn render(&mut self) {
        self.0.borrow_mut().frames += 1;
    }
}
