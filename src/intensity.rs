use log::warn;
use rayon::prelude::*;

use crate::error::EngineError;
use crate::volume::Volume;

pub const HISTOGRAM_BINS: usize = 256;
const LOWER_PERCENTILE: f64 = 0.01;
const UPPER_PERCENTILE: f64 = 0.99;

/// Display window `(p1, p99)` of a volume's intensities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimalRange {
    pub min: f32,
    pub max: f32,
}

impl OptimalRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn mid(&self) -> f32 {
        self.min + (self.max - self.min) / 2.0
    }

    pub fn width(&self) -> f32 {
        self.max - self.min
    }

    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0
    }

    /// Fails with `DegenerateRange` when the window has zero width.
    pub fn require_width(&self) -> Result<f32, EngineError> {
        if self.is_degenerate() {
            Err(EngineError::DegenerateRange(self.min))
        } else {
            Ok(self.width())
        }
    }

    /// Value at fraction `t` of the window.
    pub fn lerp(&self, t: f32) -> f32 {
        self.min + t * self.width()
    }
}

/// Fixed-width histogram over `[min, max]`.
#[derive(Debug, Clone)]
pub struct Histogram {
    pub min: f32,
    pub max: f32,
    pub counts: Vec<u64>,
}

impl Histogram {
    pub fn from_volume(volume: &Volume, bins: usize) -> Self {
        let (min, max) = volume.scalar_range();
        let bins = bins.max(1);
        let width = (max - min) / bins as f32;
        let counts = volume
            .data()
            .par_iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(
                || vec![0u64; bins],
                |mut counts, v| {
                    let bin = if width > 0.0 {
                        (((v - min) / width) as usize).min(bins - 1)
                    } else {
                        0
                    };
                    counts[bin] += 1;
                    counts
                },
            )
            .reduce(
                || vec![0u64; bins],
                |mut a, b| {
                    a.iter_mut().zip(b).for_each(|(a, b)| *a += b);
                    a
                },
            );
        Self { min, max, counts }
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn bin_width(&self) -> f32 {
        (self.max - self.min) / self.counts.len() as f32
    }

    /// Lower edge of bin `index`.
    pub fn bin_value(&self, index: usize) -> f32 {
        self.min + index as f32 * self.bin_width()
    }

    /// Lower edges of the bins where the running total first reaches 1% and 99%.
    pub fn percentile_range(&self) -> OptimalRange {
        let total = self.total() as f64;
        if total == 0.0 || self.max <= self.min {
            return OptimalRange::new(self.min, self.min);
        }
        let lower_target = total * LOWER_PERCENTILE;
        let upper_target = total * UPPER_PERCENTILE;

        let mut p1 = None;
        let mut p99 = self.max;
        let mut cumulative = 0u64;
        for (index, count) in self.counts.iter().enumerate() {
            cumulative += count;
            if p1.is_none() && cumulative as f64 >= lower_target {
                p1 = Some(self.bin_value(index));
            }
            if cumulative as f64 >= upper_target {
                p99 = self.bin_value(index);
                break;
            }
        }
        OptimalRange::new(p1.unwrap_or(self.min), p99)
    }
}

/// Robust display window of `volume` from its 256-bin histogram.
pub fn compute_optimal_range(volume: &Volume) -> OptimalRange {
    let range = Histogram::from_volume(volume, HISTOGRAM_BINS).percentile_range();
    if range.is_degenerate() {
        warn!("degenerate intensity range at {}", range.min);
    }
    range
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array3;

    fn ramp(len: usize) -> Volume {
        let data = Array3::from_shape_fn((1, 1, len), |(_, _, i)| i as f32);
        Volume::new(data, (1.0, 1.0, 1.0))
    }

    #[test]
    fn histogram_counts_every_finite_voxel() {
        let mut data = Array3::from_shape_fn((4, 5, 6), |(z, y, x)| (z + y + x) as f32);
        data[[0, 0, 1]] = f32::NAN;
        let volume = Volume::new(data, (1.0, 1.0, 1.0));
        let histogram = Histogram::from_volume(&volume, HISTOGRAM_BINS);
        assert_eq!(histogram.counts.len(), 256);
        assert_eq!(histogram.total(), 4 * 5 * 6 - 1);
        // the maximum lands in the last bin, not past it
        assert_eq!(*histogram.counts.last().unwrap(), 1);
    }

    #[test]
    fn uniform_ramp_clips_one_percent_each_side() {
        let volume = ramp(25600);
        let range = compute_optimal_range(&volume);
        let width = 25599.0 / 256.0;
        assert_abs_diff_eq!(range.min, 2.0 * width, epsilon = 1e-2);
        assert_abs_diff_eq!(range.max, 253.0 * width, epsilon = 1e-2);
    }

    #[test]
    fn outliers_are_suppressed() {
        let mut data = Array3::from_elem((10, 10, 10), 100.0_f32);
        for i in 0..1000 {
            data[[i / 100, (i / 10) % 10, i % 10]] = 100.0 + (i % 50) as f32;
        }
        data[[0, 0, 0]] = 10_000.0;
        let volume = Volume::new(data, (1.0, 1.0, 1.0));
        let range = compute_optimal_range(&volume);
        assert!(range.max < 200.0);
        assert!(range.min >= 100.0);
    }

    #[test]
    fn percentiles_are_ordered_and_inside_scalar_range() {
        let shapes: [fn(usize) -> f32; 4] = [
            |i| (i % 7) as f32,
            |i| ((i * 31) % 1000) as f32 - 500.0,
            |i| if i % 97 == 0 { 1e6 } else { 1.0 },
            |i| (i as f32).sqrt(),
        ];
        for shape in shapes {
            let data = Array3::from_shape_fn((8, 8, 8), |(z, y, x)| shape(z * 64 + y * 8 + x));
            let volume = Volume::new(data, (1.0, 1.0, 1.0));
            let (lo, hi) = volume.scalar_range();
            let range = compute_optimal_range(&volume);
            assert!(range.min <= range.max);
            assert!(range.min >= lo && range.max <= hi);
        }
    }

    #[test]
    fn constant_volume_is_degenerate() {
        let volume = Volume::new(Array3::from_elem((3, 3, 3), 5.0), (1.0, 1.0, 1.0));
        let range = compute_optimal_range(&volume);
        assert_eq!(range, OptimalRange::new(5.0, 5.0));
        assert_eq!(range.require_width(), Err(EngineError::DegenerateRange(5.0)));
    }

    #[test]
    fn empty_volume_is_degenerate() {
        let volume = Volume::new(Array3::zeros((0, 0, 0)), (1.0, 1.0, 1.0));
        assert!(compute_optimal_range(&volume).is_degenerate());
    }
}
