//! Viewer configuration schema and loader
//!
//! Configuration is stored as YAML next to the session data, e.g.
//! `viewer.yaml`. Every field is optional and falls back to its default.

use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::enums::Axis;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid viewer configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Root viewer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Initial slab thickness in world units
    pub slice_thickness: u32,
    /// Distance the slab moves per scroll tick
    pub step_size: u32,
    /// Camera zoom per precision-modified scroll tick
    pub zoom_factor: f64,
    /// Axis activated when the first volume is registered
    pub default_axis: Axis,
    pub min_thickness: u32,
    pub max_thickness: u32,
    pub min_step: u32,
    pub max_step: u32,
    /// Fixed redraw cadence shared by all views
    pub redraw_interval_ms: u64,
    /// Initial opacity of lesion and PRL overlays
    pub overlay_opacity: f32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            slice_thickness: 10,
            step_size: 5,
            zoom_factor: 1.1,
            default_axis: Axis::Axial,
            min_thickness: 1,
            max_thickness: 30,
            min_step: 1,
            max_step: 15,
            redraw_interval_ms: 8,
            overlay_opacity: 0.4,
        }
    }
}

impl ViewerConfig {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        info!("loading viewer config from {:?}", path);
        if !path.exists() {
            info!("viewer config doesn't exist, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config: ViewerConfig = serde_yaml::from_str(&contents)?;
        Ok(config.validated())
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = serde_yaml::to_string(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Repair values the engine cannot work with.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();
        if self.min_thickness == 0 {
            warn!("min_thickness must be positive, using 1");
            self.min_thickness = 1;
        }
        if self.max_thickness < self.min_thickness {
            warn!(
                "max_thickness {} below min_thickness {}, raising it",
                self.max_thickness, self.min_thickness
            );
            self.max_thickness = self.min_thickness;
        }
        if self.min_step == 0 {
            warn!("min_step must be positive, using 1");
            self.min_step = 1;
        }
        if self.max_step < self.min_step {
            warn!(
                "max_step {} below min_step {}, raising it",
                self.max_step, self.min_step
            );
            self.max_step = self.min_step;
        }
        let thickness = self
            .slice_thickness
            .clamp(self.min_thickness, self.max_thickness);
        if thickness != self.slice_thickness {
            warn!("slice_thickness {} clamped to {thickness}", self.slice_thickness);
            self.slice_thickness = thickness;
        }
        let step = self.step_size.clamp(self.min_step, self.max_step);
        if step != self.step_size {
            warn!("step_size {} clamped to {step}", self.step_size);
            self.step_size = step;
        }
        if !(self.zoom_factor.is_finite() && self.zoom_factor > 0.0) {
            warn!("zoom_factor {} is not positive, using default", self.zoom_factor);
            self.zoom_factor = defaults.zoom_factor;
        }
        if self.redraw_interval_ms == 0 {
            warn!("redraw_interval_ms must be positive, using default");
            self.redraw_interval_ms = defaults.redraw_interval_ms;
        }
        if !(0.0..=1.0).contains(&self.overlay_opacity) {
            self.overlay_opacity = if self.overlay_opacity.is_nan() {
                defaults.overlay_opacity
            } else {
                self.overlay_opacity.clamp(0.0, 1.0)
            };
            warn!("overlay_opacity clamped to {}", self.overlay_opacity);
        }
        self
    }
}
