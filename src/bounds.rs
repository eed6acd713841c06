use std::collections::BTreeMap;

use log::debug;

use crate::enums::Axis;
use crate::error::EngineError;
use crate::volume::VolumeId;

/// Axis-aligned world-space box `(xmin, xmax, ymin, ymax, zmin, zmax)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Bounds {
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64, zmin: f64, zmax: f64) -> Self {
        Self {
            min: [xmin, ymin, zmin],
            max: [xmax, ymax, zmax],
        }
    }

    pub fn planes(&self) -> [f64; 6] {
        [
            self.min[0], self.max[0], self.min[1], self.max[1], self.min[2], self.max[2],
        ]
    }

    pub fn x(&self) -> (f64, f64) {
        self.range(Axis::Coronal)
    }

    pub fn y(&self) -> (f64, f64) {
        self.range(Axis::Axial)
    }

    pub fn z(&self) -> (f64, f64) {
        self.range(Axis::Sagittal)
    }

    pub fn range(&self, axis: Axis) -> (f64, f64) {
        (self.min[axis.index()], self.max[axis.index()])
    }

    pub fn extent(&self, axis: Axis) -> f64 {
        self.max[axis.index()] - self.min[axis.index()]
    }

    pub fn center(&self) -> [f64; 3] {
        [0, 1, 2].map(|i| self.min[i] + (self.max[i] - self.min[i]) / 2.0)
    }

    /// Component-wise union: min of mins, max of maxes.
    pub fn union(&self, other: &Bounds) -> Bounds {
        let mut out = *self;
        for i in 0..3 {
            out.min[i] = out.min[i].min(other.min[i]);
            out.max[i] = out.max[i].max(other.max[i]);
        }
        out
    }

    /// Overlap of both boxes, `None` when they are disjoint on some axis.
    pub fn intersection(&self, other: &Bounds) -> Option<Bounds> {
        let mut out = *self;
        for i in 0..3 {
            out.min[i] = out.min[i].max(other.min[i]);
            out.max[i] = out.max[i].min(other.max[i]);
            if out.min[i] > out.max[i] {
                return None;
            }
        }
        Some(out)
    }

    pub fn contains(&self, other: &Bounds) -> bool {
        (0..3).all(|i| self.min[i] <= other.min[i] && self.max[i] >= other.max[i])
    }

    /// Copy of `self` with `axis` restricted to `[lo, hi]`.
    pub fn with_range(&self, axis: Axis, lo: f64, hi: f64) -> Bounds {
        let mut out = *self;
        out.min[axis.index()] = lo;
        out.max[axis.index()] = hi;
        out
    }
}

/// World boxes of all registered volumes and their union.
///
/// The union only grows while members come and go; it is cleared by
/// [`BoundsRegistry::reset`] or when the last member is removed.
#[derive(Debug, Default)]
pub struct BoundsRegistry {
    members: BTreeMap<VolumeId, Bounds>,
    frame: Option<Bounds>,
    revision: u64,
}

impl BoundsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the box of `id`.
    pub fn register(&mut self, id: VolumeId, bounds: Bounds) {
        self.frame = Some(match self.frame {
            Some(frame) => frame.union(&bounds),
            None => bounds,
        });
        debug!("registered bounds of {id}: {:?}", bounds.planes());
        self.members.insert(id, bounds);
        self.revision += 1;
    }

    pub fn unregister(&mut self, id: &VolumeId) -> Option<Bounds> {
        let removed = self.members.remove(id)?;
        if self.members.is_empty() {
            self.frame = None;
        }
        self.revision += 1;
        Some(removed)
    }

    pub fn reset(&mut self) {
        self.members.clear();
        self.frame = None;
        self.revision += 1;
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Bumped on every change; consumers compare it to know when cached
    /// camera poses and cropping boxes are stale.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn global_frame(&self) -> Result<Bounds, EngineError> {
        match self.frame {
            Some(frame) if !self.members.is_empty() => Ok(frame),
            _ => Err(EngineError::EmptyRegistry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a() -> Bounds {
        Bounds::new(0.0, 100.0, 0.0, 100.0, 0.0, 100.0)
    }

    fn b() -> Bounds {
        Bounds::new(-10.0, 50.0, 20.0, 120.0, 0.0, 80.0)
    }

    fn c() -> Bounds {
        Bounds::new(5.0, 6.0, -30.0, 10.0, 40.0, 140.0)
    }

    #[test]
    fn empty_registry_has_no_frame() {
        let registry = BoundsRegistry::new();
        assert_eq!(registry.global_frame(), Err(EngineError::EmptyRegistry));
    }

    #[test]
    fn frame_is_union_of_two_volumes() {
        let mut registry = BoundsRegistry::new();
        registry.register("a".into(), a());
        registry.register("b".into(), b());
        let frame = registry.global_frame().unwrap();
        assert_eq!(frame.planes(), [-10.0, 100.0, 0.0, 120.0, 0.0, 100.0]);
    }

    #[test]
    fn frame_contains_every_member_for_all_orders() {
        let boxes = [("a", a()), ("b", b()), ("c", c())];
        let orders = [
            [0, 1, 2],
            [0, 2, 1],
            [1, 0, 2],
            [1, 2, 0],
            [2, 0, 1],
            [2, 1, 0],
        ];
        let mut frames = Vec::new();
        for order in orders {
            let mut registry = BoundsRegistry::new();
            for i in order {
                registry.register(boxes[i].0.into(), boxes[i].1);
            }
            let frame = registry.global_frame().unwrap();
            for (_, bounds) in &boxes {
                assert!(frame.contains(bounds));
            }
            frames.push(frame);
        }
        assert!(frames.windows(2).all(|w| w[0] == w[1]));
        // middle box is neither first nor last in some orders
        assert_eq!(frames[0].planes(), [-10.0, 100.0, -30.0, 120.0, 0.0, 140.0]);
    }

    #[test]
    fn frame_does_not_shrink_until_reset() {
        let mut registry = BoundsRegistry::new();
        registry.register("a".into(), a());
        registry.register("b".into(), b());
        registry.register("b".into(), Bounds::new(10.0, 20.0, 10.0, 20.0, 10.0, 20.0));
        assert_eq!(registry.global_frame().unwrap().planes()[0], -10.0);

        registry.unregister(&"b".into());
        assert_eq!(registry.global_frame().unwrap().planes()[3], 120.0);

        registry.reset();
        assert_eq!(registry.global_frame(), Err(EngineError::EmptyRegistry));
    }

    #[test]
    fn removing_last_member_clears_frame() {
        let mut registry = BoundsRegistry::new();
        registry.register("a".into(), a());
        assert!(registry.unregister(&"a".into()).is_some());
        assert!(registry.unregister(&"a".into()).is_none());
        assert!(registry.global_frame().is_err());
    }

    #[test]
    fn intersection_is_none_when_disjoint() {
        assert_eq!(
            a().intersection(&b()).unwrap().planes(),
            [0.0, 50.0, 20.0, 100.0, 0.0, 80.0]
        );
        assert_eq!(a().intersection(&c()).unwrap().z(), (40.0, 100.0));
        let far = Bounds::new(200.0, 300.0, 0.0, 100.0, 0.0, 100.0);
        assert!(a().intersection(&far).is_none());
    }

    #[test]
    fn revision_tracks_changes() {
        let mut registry = BoundsRegistry::new();
        let start = registry.revision();
        registry.register("a".into(), a());
        registry.register("a".into(), a());
        assert_eq!(registry.revision(), start + 2);
    }
}
