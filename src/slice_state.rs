use log::debug;

use crate::bounds::Bounds;
use crate::config::ViewerConfig;
use crate::enums::Axis;
use crate::error::EngineError;

/// Region made visible to every renderer; equal to the global frame except
/// on the active axis.
pub type CroppingBox = Bounds;

/// Accepted ranges for slab thickness and step size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceLimits {
    pub thickness: (f64, f64),
    pub step: (f64, f64),
}

impl SliceLimits {
    pub fn new(thickness: (f64, f64), step: (f64, f64)) -> Self {
        let positive = |(lo, hi): (f64, f64)| {
            let lo = lo.max(f64::EPSILON);
            (lo, hi.max(lo))
        };
        Self {
            thickness: positive(thickness),
            step: positive(step),
        }
    }
}

impl Default for SliceLimits {
    fn default() -> Self {
        Self::new((1.0, 30.0), (1.0, 15.0))
    }
}

/// Active axis, slab thickness, step and the slab position along each axis.
///
/// Positions are remembered per axis; an axis that was never visited starts
/// with the slab centered in the global frame. Out-of-range inputs are
/// clamped instead of rejected.
#[derive(Debug, Clone)]
pub struct SliceState {
    axis: Axis,
    thickness: f64,
    step: f64,
    positions: [Option<f64>; 3],
    frame: Option<Bounds>,
    limits: SliceLimits,
}

impl SliceState {
    pub fn new(axis: Axis, thickness: f64, step: f64, limits: SliceLimits) -> Self {
        let mut state = Self {
            axis,
            thickness: limits.thickness.0,
            step: limits.step.0,
            positions: [None; 3],
            frame: None,
            limits,
        };
        state.set_thickness(thickness);
        state.set_step(step);
        state
    }

    pub fn from_config(config: &ViewerConfig) -> Self {
        let limits = SliceLimits::new(
            (config.min_thickness as f64, config.max_thickness as f64),
            (config.min_step as f64, config.max_step as f64),
        );
        Self::new(
            config.default_axis,
            config.slice_thickness as f64,
            config.step_size as f64,
            limits,
        )
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn thickness(&self) -> f64 {
        self.thickness
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn frame(&self) -> Option<&Bounds> {
        self.frame.as_ref()
    }

    /// Replace the global frame. `None` also forgets every remembered position.
    pub fn set_frame(&mut self, frame: Option<Bounds>) {
        if frame.is_none() {
            self.positions = [None; 3];
        }
        self.frame = frame;
    }

    /// Switch the active axis. A remembered position is clamped to the
    /// current frame and thickness; re-selecting the current axis leaves
    /// position and thickness untouched.
    pub fn set_axis(&mut self, axis: Axis) -> Result<f64, EngineError> {
        let frame = self.frame.ok_or(EngineError::NoFrame)?;
        let reselected = axis == self.axis;
        self.axis = axis;
        let position = match self.positions[axis.index()] {
            Some(position) if reselected => position,
            Some(position) => self.clamp(position, &frame),
            None => self.clamp(Self::centered(&frame, axis, self.thickness), &frame),
        };
        self.positions[axis.index()] = Some(position);
        debug!("slicing along {axis} at {position}");
        Ok(position)
    }

    /// Clamp `thickness` into the configured range; non-finite values are
    /// ignored. The slab start does not move.
    pub fn set_thickness(&mut self, thickness: f64) -> f64 {
        if thickness.is_finite() {
            self.pin_position();
            let (lo, hi) = self.limits.thickness;
            self.thickness = thickness.clamp(lo, hi);
        }
        self.thickness
    }

    pub fn set_step(&mut self, step: f64) -> f64 {
        if step.is_finite() {
            let (lo, hi) = self.limits.step;
            self.step = step.clamp(lo, hi);
        }
        self.step
    }

    /// Current slab start on the active axis.
    pub fn position(&self) -> Result<f64, EngineError> {
        let frame = self.frame.ok_or(EngineError::NoFrame)?;
        Ok(self.positions[self.axis.index()].unwrap_or_else(|| {
            self.clamp(Self::centered(&frame, self.axis, self.thickness), &frame)
        }))
    }

    pub fn advance(&mut self, step: f64) -> Result<f64, EngineError> {
        self.shift(Self::sanitize_step(step))
    }

    pub fn retreat(&mut self, step: f64) -> Result<f64, EngineError> {
        self.shift(-Self::sanitize_step(step))
    }

    pub fn cropping_box(&self) -> Result<CroppingBox, EngineError> {
        let frame = self.frame.ok_or(EngineError::NoFrame)?;
        let position = self.position()?;
        let (_, max) = frame.range(self.axis);
        let far = (position + self.thickness).min(max);
        Ok(frame.with_range(self.axis, position, far))
    }

    fn shift(&mut self, delta: f64) -> Result<f64, EngineError> {
        let frame = self.frame.ok_or(EngineError::NoFrame)?;
        let position = self.clamp(self.position()? + delta, &frame);
        self.positions[self.axis.index()] = Some(position);
        Ok(position)
    }

    /// Remember the lazily centered position of the active axis.
    fn pin_position(&mut self) {
        if let Ok(position) = self.position() {
            self.positions[self.axis.index()] = Some(position);
        }
    }

    fn centered(frame: &Bounds, axis: Axis, thickness: f64) -> f64 {
        let (min, max) = frame.range(axis);
        min + (max - min) / 2.0 - thickness / 2.0
    }

    /// Keep the slab inside `[min, max - thickness]`; the lower edge wins
    /// when the slab is thicker than the frame.
    fn clamp(&self, position: f64, frame: &Bounds) -> f64 {
        let (min, max) = frame.range(self.axis);
        position.min(max - self.thickness).max(min)
    }

    fn sanitize_step(step: f64) -> f64 {
        if step.is_finite() { step.max(0.0) } else { 0.0 }
    }
}
