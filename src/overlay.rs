use std::collections::BTreeMap;

use log::debug;

use crate::bounds::Bounds;
use crate::camera::SharedCamera;
use crate::enums::OverlayKind;
use crate::error::EngineError;
use crate::renderer::VolumeRenderer;
use crate::slice_state::{CroppingBox, SliceState};
use crate::transfer_function::TransferFunction;
use crate::volume::VolumeId;

/// Outcome of pushing the slab to the overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayStatus {
    /// Number of overlay renderers updated.
    Synced(usize),
    NoOverlay,
    NoFrame,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayStyle {
    pub visible: bool,
    pub opacity: f32,
}

struct OverlayLayer {
    bounds: Bounds,
    renderer: Box<dyn VolumeRenderer>,
}

impl OverlayLayer {
    /// Push `cropping` restricted to the mask's own box. A slab missing the
    /// mask is pushed unchanged; nothing of the mask lies inside it.
    fn crop(&mut self, cropping: CroppingBox) {
        let cropping = self.bounds.intersection(&cropping).unwrap_or(cropping);
        self.renderer.set_cropping_box(cropping);
    }
}

/// Lesion and PRL masks drawn on top of the base volumes.
///
/// Each base view may carry one mask per [`OverlayKind`]. Overlays follow the
/// slab of the base volumes but come and go on their own; a session without
/// masks is a normal state, not an error.
pub struct OverlaySync {
    layers: BTreeMap<(VolumeId, OverlayKind), OverlayLayer>,
    styles: BTreeMap<OverlayKind, OverlayStyle>,
}

impl OverlaySync {
    pub fn new(opacity: f32) -> Self {
        let style = OverlayStyle {
            visible: true,
            opacity: opacity.clamp(0.0, 1.0),
        };
        Self {
            layers: BTreeMap::new(),
            styles: OverlayKind::ALL.iter().map(|kind| (*kind, style)).collect(),
        }
    }

    pub fn style(&self, kind: OverlayKind) -> OverlayStyle {
        self.styles[&kind]
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn bounds(&self, host: &VolumeId, kind: OverlayKind) -> Option<&Bounds> {
        self.layers.get(&(host.clone(), kind)).map(|layer| &layer.bounds)
    }

    /// Attach a mask to the view of `host`, replacing any previous mask of
    /// the same kind there.
    pub fn attach(
        &mut self,
        host: VolumeId,
        kind: OverlayKind,
        bounds: Bounds,
        mut renderer: Box<dyn VolumeRenderer>,
        camera: &SharedCamera,
        cropping: Option<CroppingBox>,
    ) {
        let style = self.style(kind);
        renderer.attach_camera(camera.clone());
        renderer.set_transfer_function(&TransferFunction::for_overlay(kind, style.opacity));
        renderer.set_visible(style.visible);
        let mut layer = OverlayLayer { bounds, renderer };
        if let Some(cropping) = cropping {
            layer.crop(cropping);
        }
        debug!("attached {kind} overlay to {host}");
        self.layers.insert((host, kind), layer);
    }

    /// Drop every mask shown on the view of `host`.
    pub fn detach(&mut self, host: &VolumeId) -> usize {
        let before = self.layers.len();
        self.layers.retain(|(id, _), _| id != host);
        before - self.layers.len()
    }

    /// Forget all masks, e.g. when the session changes.
    pub fn clear(&mut self) {
        self.layers.clear();
    }

    /// Fails with `MissingOverlay` when no mask of `kind` is attached, so a UI
    /// can disable the matching controls.
    pub fn require(&self, kind: OverlayKind) -> Result<(), EngineError> {
        if self.layers.keys().any(|(_, k)| *k == kind) {
            Ok(())
        } else {
            Err(EngineError::MissingOverlay(kind))
        }
    }

    /// Push the current slab to every overlay, clipped to its bounds.
    pub fn sync(&mut self, slice: &SliceState) -> OverlayStatus {
        if self.layers.is_empty() {
            debug!("no overlay to sync");
            return OverlayStatus::NoOverlay;
        }
        let Ok(cropping) = slice.cropping_box() else {
            return OverlayStatus::NoFrame;
        };
        for layer in self.layers.values_mut() {
            layer.crop(cropping);
        }
        OverlayStatus::Synced(self.layers.len())
    }

    pub fn set_visible(&mut self, kind: OverlayKind, visible: bool) {
        if let Some(style) = self.styles.get_mut(&kind) {
            style.visible = visible;
        }
        for layer in self.layers_of(kind) {
            layer.renderer.set_visible(visible);
        }
    }

    /// Clamp `opacity` to `[0, 1]` and apply it to every mask of `kind`.
    pub fn set_opacity(&mut self, kind: OverlayKind, opacity: f32) -> f32 {
        let opacity = if opacity.is_nan() {
            self.style(kind).opacity
        } else {
            opacity.clamp(0.0, 1.0)
        };
        if let Some(style) = self.styles.get_mut(&kind) {
            style.opacity = opacity;
        }
        let tf = TransferFunction::for_overlay(kind, opacity);
        for layer in self.layers_of(kind) {
            layer.renderer.set_transfer_function(&tf);
        }
        opacity
    }

    pub fn render(&mut self) {
        for layer in self.layers.values_mut() {
            layer.renderer.render();
        }
    }

    fn layers_of(&mut self, kind: OverlayKind) -> impl Iterator<Item = &mut OverlayLayer> {
        self.layers
            .iter_mut()
            .filter(move |((_, k), _)| *k == kind)
            .map(|(_, layer)| layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::Axis;
    use crate::renderer::RecordingRenderer;
    use crate::slice_state::SliceLimits;
    use approx::assert_abs_diff_eq;

    fn slice() -> SliceState {
        let mut state = SliceState::new(Axis::Sagittal, 12.0, 5.0, SliceLimits::default());
        state.set_frame(Some(Bounds::new(-10.0, 100.0, 0.0, 120.0, 0.0, 100.0)));
        state
    }

    fn mask_bounds() -> Bounds {
        Bounds::new(0.0, 100.0, 0.0, 100.0, 0.0, 100.0)
    }

    fn attach(
        overlays: &mut OverlaySync,
        host: &str,
        kind: OverlayKind,
        camera: &SharedCamera,
    ) -> RecordingRenderer {
        let renderer = RecordingRenderer::new();
        let boxed = Box::new(renderer.clone());
        overlays.attach(host.into(), kind, mask_bounds(), boxed, camera, None);
        renderer
    }

    #[test]
    fn sync_without_overlays_is_soft() {
        let mut overlays = OverlaySync::new(0.4);
        assert_eq!(overlays.sync(&slice()), OverlayStatus::NoOverlay);
        assert_eq!(
            overlays.require(OverlayKind::Prl),
            Err(EngineError::MissingOverlay(OverlayKind::Prl))
        );
    }

    #[test]
    fn sync_clips_slab_to_mask_bounds() {
        let mut overlays = OverlaySync::new(0.4);
        let camera = SharedCamera::default();
        let lesion = attach(&mut overlays, "t1", OverlayKind::Lesion, &camera);
        let prl = attach(&mut overlays, "t1", OverlayKind::Prl, &camera);

        let mut state = slice();
        state.advance(5.0).unwrap();
        assert_eq!(overlays.sync(&state), OverlayStatus::Synced(2));
        let expected = Bounds::new(0.0, 100.0, 0.0, 100.0, 49.0, 61.0);
        assert_eq!(lesion.log().cropping, Some(expected));
        assert_eq!(prl.log().cropping, Some(expected));
        assert!(lesion.log().camera.as_ref().unwrap().ptr_eq(&camera));
        assert!(overlays.require(OverlayKind::Lesion).is_ok());
    }

    #[test]
    fn slab_outside_mask_is_pushed_unchanged() {
        let mut overlays = OverlaySync::new(0.4);
        let mask = RecordingRenderer::new();
        let small = Bounds::new(0.0, 10.0, 0.0, 10.0, 0.0, 10.0);
        let camera = SharedCamera::default();
        overlays.attach(
            "t1".into(),
            OverlayKind::Lesion,
            small,
            Box::new(mask.clone()),
            &camera,
            None,
        );

        let state = slice();
        overlays.sync(&state);
        assert_eq!(mask.log().cropping, Some(state.cropping_box().unwrap()));
    }

    #[test]
    fn attach_pushes_current_slab() {
        let mut overlays = OverlaySync::new(0.4);
        let mask = RecordingRenderer::new();
        let cropping = slice().cropping_box().unwrap();
        let camera = SharedCamera::default();
        let boxed = Box::new(mask.clone());
        overlays.attach(
            "t1".into(),
            OverlayKind::Prl,
            mask_bounds(),
            boxed,
            &camera,
            Some(cropping),
        );
        assert_eq!(mask.log().cropping.unwrap().x(), (0.0, 100.0));
        assert_eq!(mask.log().cropping.unwrap().z(), (44.0, 56.0));
    }

    #[test]
    fn sync_before_frame_reports_no_frame() {
        let mut overlays = OverlaySync::new(0.4);
        attach(&mut overlays, "t1", OverlayKind::Lesion, &SharedCamera::default());
        let state = SliceState::new(Axis::Axial, 10.0, 5.0, SliceLimits::default());
        assert_eq!(overlays.sync(&state), OverlayStatus::NoFrame);
    }

    #[test]
    fn style_changes_reach_matching_kind_only() {
        let mut overlays = OverlaySync::new(0.4);
        let camera = SharedCamera::default();
        let lesion = attach(&mut overlays, "flair", OverlayKind::Lesion, &camera);
        let prl = attach(&mut overlays, "flair", OverlayKind::Prl, &camera);

        overlays.set_visible(OverlayKind::Prl, false);
        assert!(lesion.log().visible);
        assert!(!prl.log().visible);

        assert_eq!(overlays.set_opacity(OverlayKind::Lesion, 1.5), 1.0);
        let tf = lesion.log().transfer_function.clone().unwrap();
        assert_eq!(tf.opacity_at(1.0), 1.0);
        let tf = prl.log().transfer_function.clone().unwrap();
        assert_abs_diff_eq!(tf.opacity_at(1.0), 0.4);
    }

    #[test]
    fn new_overlays_inherit_current_style() {
        let mut overlays = OverlaySync::new(0.4);
        overlays.set_visible(OverlayKind::Lesion, false);
        overlays.set_opacity(OverlayKind::Lesion, 0.8);
        let lesion = attach(&mut overlays, "swi", OverlayKind::Lesion, &SharedCamera::default());
        assert!(!lesion.log().visible);
        let tf = lesion.log().transfer_function.clone().unwrap();
        assert_abs_diff_eq!(tf.opacity_at(1.0), 0.8);
    }

    #[test]
    fn detach_and_clear() {
        let mut overlays = OverlaySync::new(0.4);
        let camera = SharedCamera::default();
        for host in ["t1", "flair"] {
            for kind in OverlayKind::ALL {
                attach(&mut overlays, host, kind, &camera);
            }
        }
        assert_eq!(overlays.len(), 4);
        assert_eq!(overlays.detach(&"t1".into()), 2);
        assert_eq!(
            overlays.bounds(&"flair".into(), OverlayKind::Prl),
            Some(&mask_bounds())
        );
        overlays.clear();
        assert!(overlays.is_empty());
    }
}
