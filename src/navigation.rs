use std::collections::BTreeMap;
use std::time::Duration;

use image::RgbaImage;
use log::{debug, info};
use web_time::Instant;

use crate::bounds::{Bounds, BoundsRegistry};
use crate::camera::{CameraPose, SharedCamera};
use crate::config::ViewerConfig;
use crate::enums::{Axis, Modality, OverlayKind};
use crate::error::EngineError;
use crate::intensity::{OptimalRange, compute_optimal_range};
use crate::overlay::{OverlayStatus, OverlaySync};
use crate::redraw::{FrameClock, RedrawTick};
use crate::renderer::VolumeRenderer;
use crate::slice_state::{CroppingBox, SliceState};
use crate::transfer_function::TransferFunction;
use crate::volume::{Volume, VolumeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Advance,
    Retreat,
}

/// One scroll tick. With the precision modifier held it zooms instead of
/// moving the slab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub kind: InputKind,
    pub precision: bool,
}

impl InputEvent {
    pub fn advance() -> Self {
        Self {
            kind: InputKind::Advance,
            precision: false,
        }
    }

    pub fn retreat() -> Self {
        Self {
            kind: InputKind::Retreat,
            precision: false,
        }
    }

    pub fn with_precision(mut self) -> Self {
        self.precision = true;
        self
    }
}

struct RegisteredVolume {
    modality: Modality,
    range: OptimalRange,
    transfer_function: TransferFunction,
    renderer: Box<dyn VolumeRenderer>,
}

/// Owner of the slice state and the shared camera of one viewing session.
///
/// Every registered volume gets the same cropping box and the same camera
/// handle; only the transfer function differs per volume.
pub struct NavigationController {
    config: ViewerConfig,
    bounds: BoundsRegistry,
    slice: SliceState,
    camera: SharedCamera,
    volumes: BTreeMap<VolumeId, RegisteredVolume>,
    overlays: OverlaySync,
    clock: FrameClock,
    synced_revision: Option<u64>,
}

impl NavigationController {
    pub fn new(config: ViewerConfig) -> Self {
        let config = config.validated();
        Self {
            bounds: BoundsRegistry::new(),
            slice: SliceState::from_config(&config),
            camera: SharedCamera::default(),
            volumes: BTreeMap::new(),
            overlays: OverlaySync::new(config.overlay_opacity),
            clock: FrameClock::new(Duration::from_millis(config.redraw_interval_ms)),
            synced_revision: None,
            config,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn slice(&self) -> &SliceState {
        &self.slice
    }

    pub fn camera(&self) -> &SharedCamera {
        &self.camera
    }

    pub fn overlays(&self) -> &OverlaySync {
        &self.overlays
    }

    pub fn volume_ids(&self) -> impl Iterator<Item = &VolumeId> {
        self.volumes.keys()
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    pub fn modality(&self, id: &VolumeId) -> Option<Modality> {
        self.volumes.get(id).map(|v| v.modality)
    }

    pub fn optimal_range(&self, id: &VolumeId) -> Option<OptimalRange> {
        self.volumes.get(id).map(|v| v.range)
    }

    pub fn transfer_function(&self, id: &VolumeId) -> Option<&TransferFunction> {
        self.volumes.get(id).map(|v| &v.transfer_function)
    }

    pub fn global_frame(&self) -> Result<Bounds, EngineError> {
        self.bounds.global_frame()
    }

    pub fn cropping_box(&self) -> Result<CroppingBox, EngineError> {
        self.slice.cropping_box()
    }

    /// Mid-slab image of the registered volume `id`, `None` when the slab
    /// misses `volume`.
    pub fn slab_preview(
        &self,
        id: &VolumeId,
        volume: &Volume,
    ) -> Result<Option<RgbaImage>, EngineError> {
        let tf = self
            .transfer_function(id)
            .ok_or_else(|| EngineError::UnknownVolume(id.clone()))?;
        let cropping = self.slice.cropping_box()?;
        Ok(volume.slab_preview(&cropping, self.slice.axis(), tf))
    }

    /// Register a loaded volume, computing its display window once.
    pub fn register_volume(
        &mut self,
        id: VolumeId,
        modality: Modality,
        volume: &Volume,
        renderer: Box<dyn VolumeRenderer>,
    ) -> OptimalRange {
        let range = compute_optimal_range(volume);
        self.register_with_range(id, modality, volume.bounds(), range, renderer);
        range
    }

    /// Register a volume whose bounds and display window are already known.
    pub fn register_with_range(
        &mut self,
        id: VolumeId,
        modality: Modality,
        bounds: Bounds,
        range: OptimalRange,
        mut renderer: Box<dyn VolumeRenderer>,
    ) {
        let transfer_function =
            TransferFunction::for_modality(modality, range, self.slice.thickness());
        renderer.attach_camera(self.camera.clone());
        renderer.set_transfer_function(&transfer_function);
        info!(
            "registered {modality} volume {id}, window [{}, {}]",
            range.min, range.max
        );

        self.bounds.register(id.clone(), bounds);
        self.volumes.insert(
            id,
            RegisteredVolume {
                modality,
                range,
                transfer_function,
                renderer,
            },
        );
        self.refresh();
    }

    pub fn unregister_volume(&mut self, id: &VolumeId) -> Result<(), EngineError> {
        if self.volumes.remove(id).is_none() {
            return Err(EngineError::UnknownVolume(id.clone()));
        }
        self.bounds.unregister(id);
        self.overlays.detach(id);
        info!("unregistered volume {id}");
        self.refresh();
        Ok(())
    }

    /// Drop all volumes and overlays, the global frame and every remembered
    /// slab position. Used when the session changes.
    pub fn reset(&mut self) {
        info!("resetting navigation state");
        self.volumes.clear();
        self.overlays.clear();
        self.bounds.reset();
        self.slice.set_frame(None);
        self.camera.set(CameraPose::default());
        self.synced_revision = None;
        self.clock.request_redraw();
    }

    /// Attach a mask to the view of `host`.
    pub fn attach_overlay(
        &mut self,
        host: &VolumeId,
        kind: OverlayKind,
        bounds: Bounds,
        renderer: Box<dyn VolumeRenderer>,
    ) -> Result<(), EngineError> {
        if !self.volumes.contains_key(host) {
            return Err(EngineError::UnknownVolume(host.clone()));
        }
        let cropping = self.slice.cropping_box().ok();
        self.overlays
            .attach(host.clone(), kind, bounds, renderer, &self.camera, cropping);
        self.clock.request_redraw();
        Ok(())
    }

    pub fn set_overlay_visible(&mut self, kind: OverlayKind, visible: bool) {
        self.overlays.set_visible(kind, visible);
        self.clock.request_redraw();
    }

    pub fn set_overlay_opacity(&mut self, kind: OverlayKind, opacity: f32) -> f32 {
        let opacity = self.overlays.set_opacity(kind, opacity);
        self.clock.request_redraw();
        opacity
    }

    /// Switch the viewing axis and reframe the camera for it.
    pub fn set_axis(&mut self, axis: Axis) -> Result<(), EngineError> {
        let frame = self.slice.frame().copied().ok_or(EngineError::NoFrame)?;
        self.slice.set_axis(axis)?;
        self.camera.set(CameraPose::frame(&frame, axis));
        self.broadcast();
        Ok(())
    }

    /// Clamp and apply a new slab thickness; transfer functions are rebuilt
    /// so brightness stays constant.
    pub fn set_thickness(&mut self, thickness: f64) -> f64 {
        let thickness = self.slice.set_thickness(thickness);
        for volume in self.volumes.values_mut() {
            volume.transfer_function =
                TransferFunction::for_modality(volume.modality, volume.range, thickness);
            volume
                .renderer
                .set_transfer_function(&volume.transfer_function);
        }
        debug!("slab thickness {thickness}");
        if self.slice.frame().is_some() {
            self.broadcast();
        } else {
            self.clock.request_redraw();
        }
        thickness
    }

    pub fn set_step(&mut self, step: f64) -> f64 {
        self.slice.set_step(step)
    }

    /// Apply one input event: move the slab by the configured step, or zoom
    /// the shared camera when the precision modifier is held.
    pub fn handle_event(&mut self, event: InputEvent) -> Result<(), EngineError> {
        if event.precision {
            let factor = match event.kind {
                InputKind::Advance => self.config.zoom_factor,
                InputKind::Retreat => 1.0 / self.config.zoom_factor,
            };
            self.camera.update(|pose| pose.zoom(factor));
            debug!("zoom by {factor}");
            self.clock.request_redraw();
            return Ok(());
        }

        let step = self.slice.step();
        let position = match event.kind {
            InputKind::Advance => self.slice.advance(step)?,
            InputKind::Retreat => self.slice.retreat(step)?,
        };
        debug!("slab along {} at {position}", self.slice.axis());
        self.broadcast();
        Ok(())
    }

    /// Restore the framed camera for the current axis.
    pub fn reset_view(&mut self) -> Result<(), EngineError> {
        let frame = self.slice.frame().copied().ok_or(EngineError::NoFrame)?;
        self.camera.set(CameraPose::frame(&frame, self.slice.axis()));
        self.clock.request_redraw();
        Ok(())
    }

    pub fn request_redraw(&mut self) {
        self.clock.request_redraw();
    }

    /// Draw every view if the redraw interval has elapsed.
    pub fn poll_redraw(&mut self, now: Instant) -> Option<RedrawTick> {
        self.refresh();
        let tick = self.clock.poll(now)?;
        for volume in self.volumes.values_mut() {
            volume.renderer.render();
        }
        self.overlays.render();
        Some(tick)
    }

    /// Recompute frame, camera and cropping box after the registered set
    /// changed.
    fn refresh(&mut self) {
        let revision = self.bounds.revision();
        if self.synced_revision == Some(revision) {
            return;
        }
        self.synced_revision = Some(revision);

        match self.bounds.global_frame() {
            Ok(frame) => {
                self.slice.set_frame(Some(frame));
                self.camera
                    .set(CameraPose::frame(&frame, self.slice.axis()));
                debug!("global frame {:?}", frame.planes());
                self.broadcast();
            }
            Err(_) => {
                self.slice.set_frame(None);
                self.clock.request_redraw();
            }
        }
    }

    fn broadcast(&mut self) {
        if let Ok(cropping) = self.slice.cropping_box() {
            for volume in self.volumes.values_mut() {
                volume.renderer.set_cropping_box(cropping);
            }
        }
        if let OverlayStatus::Synced(count) = self.overlays.sync(&self.slice) {
            debug!("synced {count} overlays");
        }
        self.clock.request_redraw();
    }
}
