//! Color and opacity transfer functions per modality.
//!
//! Every modality owns a table of control points expressed relative to its
//! display window. Building a [`TransferFunction`] places those points on the
//! window computed by [`crate::intensity::compute_optimal_range`] and scales
//! opacity so that apparent brightness stays roughly constant when the slab
//! gets thinner or thicker.

use image::{Rgba, RgbaImage};

use crate::enums::{Modality, OverlayKind};
use crate::intensity::OptimalRange;

/// Slab thickness at which table opacities are used unscaled.
pub const REFERENCE_THICKNESS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorPoint {
    pub value: f32,
    pub rgb: [f32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpacityPoint {
    pub value: f32,
    pub opacity: f32,
}

/// Piecewise-linear scalar → RGB and scalar → opacity mappings.
///
/// Outside the control points the nearest end value is held.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunction {
    pub color: Vec<ColorPoint>,
    pub opacity: Vec<OpacityPoint>,
}

/// Control point of a table, `t` is a fraction of the window.
struct Anchor {
    t: f32,
    rgb: [f32; 3],
    opacity: f32,
}

const fn anchor(t: f32, gray: f32, opacity: f32) -> Anchor {
    Anchor {
        t,
        rgb: [gray, gray, gray],
        opacity,
    }
}

// CSF dark, gray matter mid, white matter bright.
const T1_TABLE: [Anchor; 5] = [
    anchor(0.0, 0.0, 0.0),
    anchor(0.25, 0.2, 0.15),
    anchor(0.5, 0.6, 0.25),
    anchor(0.75, 0.9, 0.3),
    anchor(1.0, 1.0, 0.35),
];

// CSF suppressed, lesions brightest and most opaque.
const FLAIR_TABLE: [Anchor; 4] = [
    anchor(0.0, 0.0, 0.0),
    anchor(0.5, 0.4, 0.2),
    anchor(0.75, 0.8, 0.3),
    anchor(1.0, 1.0, 0.4),
];

// Veins and microbleeds are dark, so opacity falls with intensity.
const SWI_MAGNITUDE_TABLE: [Anchor; 4] = [
    anchor(0.0, 0.0, 0.5),
    anchor(1.0 / 3.0, 0.3, 0.3),
    anchor(0.5, 0.5, 0.25),
    anchor(1.0, 1.0, 0.1),
];

// Diverging around zero phase; `t` runs over [-h, h].
const SWI_PHASE_TABLE: [Anchor; 5] = [
    Anchor {
        t: 0.0,
        rgb: [0.0, 0.0, 1.0],
        opacity: 0.3,
    },
    Anchor {
        t: 0.25,
        rgb: [0.0, 0.5, 0.5],
        opacity: 0.2,
    },
    Anchor {
        t: 0.5,
        rgb: [0.5, 0.5, 0.5],
        opacity: 0.1,
    },
    Anchor {
        t: 0.75,
        rgb: [0.5, 0.0, 0.0],
        opacity: 0.2,
    },
    Anchor {
        t: 1.0,
        rgb: [1.0, 0.0, 0.0],
        opacity: 0.3,
    },
];

impl Modality {
    fn table(self) -> &'static [Anchor] {
        match self {
            Modality::T1 => &T1_TABLE,
            Modality::Flair => &FLAIR_TABLE,
            Modality::SwiMagnitude => &SWI_MAGNITUDE_TABLE,
            Modality::SwiPhase => &SWI_PHASE_TABLE,
        }
    }

    /// Window the table is laid over. Phase is signed and periodic, so its
    /// window is made symmetric about zero.
    fn window(self, range: OptimalRange) -> OptimalRange {
        match self {
            Modality::SwiPhase => {
                let half = range.min.abs().max(range.max.abs());
                OptimalRange::new(-half, half)
            }
            _ => range,
        }
    }
}

/// Opacity multiplier keeping apparent brightness constant across slab thicknesses.
pub fn opacity_scale(thickness: f64) -> f32 {
    if thickness.is_finite() && thickness > 0.0 {
        (REFERENCE_THICKNESS / thickness) as f32
    } else {
        1.0
    }
}

impl TransferFunction {
    /// Transfer function of `modality` over `range` for a slab of `thickness`.
    pub fn for_modality(modality: Modality, range: OptimalRange, thickness: f64) -> Self {
        let window = modality.window(range);
        let table = modality.table();
        let scale = opacity_scale(thickness);

        if window.is_degenerate() {
            let last = &table[table.len() - 1];
            return Self::flat(window.min, last.rgb);
        }

        let color = table
            .iter()
            .map(|a| ColorPoint {
                value: window.lerp(a.t),
                rgb: a.rgb,
            })
            .collect();
        let opacity = table
            .iter()
            .map(|a| OpacityPoint {
                value: window.lerp(a.t),
                opacity: (a.opacity * scale).clamp(0.0, 1.0),
            })
            .collect();
        Self { color, opacity }
    }

    /// Binary mask: background transparent, foreground in the kind's color.
    pub fn for_overlay(kind: OverlayKind, opacity: f32) -> Self {
        let opacity = opacity.clamp(0.0, 1.0);
        Self {
            color: vec![
                ColorPoint {
                    value: 0.0,
                    rgb: [0.0; 3],
                },
                ColorPoint {
                    value: 1.0,
                    rgb: kind.color(),
                },
            ],
            opacity: vec![
                OpacityPoint {
                    value: 0.0,
                    opacity: 0.0,
                },
                OpacityPoint {
                    value: 0.5,
                    opacity,
                },
                OpacityPoint {
                    value: 1.0,
                    opacity,
                },
            ],
        }
    }

    /// Fully opaque single-point function for a zero-width window.
    pub fn flat(value: f32, rgb: [f32; 3]) -> Self {
        Self {
            color: vec![ColorPoint { value, rgb }],
            opacity: vec![OpacityPoint {
                value,
                opacity: 1.0,
            }],
        }
    }

    pub fn color_at(&self, value: f32) -> [f32; 3] {
        [0, 1, 2].map(|c| {
            interpolate(self.color.iter().map(|p| (p.value, p.rgb[c])), value).unwrap_or(0.0)
        })
    }

    pub fn opacity_at(&self, value: f32) -> f32 {
        interpolate(self.opacity.iter().map(|p| (p.value, p.opacity)), value).unwrap_or(0.0)
    }

    /// Color and opacity at `value` as an 8-bit pixel.
    pub fn rgba_at(&self, value: f32) -> Rgba<u8> {
        let [r, g, b] = self.color_at(value);
        Rgba([to_u8(r), to_u8(g), to_u8(b), to_u8(self.opacity_at(value))])
    }

    /// Horizontal legend strip from the first to the last color point,
    /// opacity in the alpha channel.
    pub fn colorbar(&self, width: u32, height: u32) -> RgbaImage {
        let lo = self.color.first().map_or(0.0, |p| p.value);
        let hi = self.color.last().map_or(0.0, |p| p.value);
        let columns: Vec<Rgba<u8>> = (0..width)
            .map(|x| {
                let t = if width > 1 {
                    x as f32 / (width - 1) as f32
                } else {
                    0.0
                };
                self.rgba_at(lo + t * (hi - lo))
            })
            .collect();
        RgbaImage::from_fn(width, height, |x, _| columns[x as usize])
    }
}

#[inline]
pub(crate) fn to_u8(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Piecewise-linear lookup over points sorted by value.
fn interpolate(points: impl Iterator<Item = (f32, f32)>, x: f32) -> Option<f32> {
    let mut previous: Option<(f32, f32)> = None;
    for (value, y) in points {
        if x == value {
            return Some(y);
        }
        match previous {
            None if x <= value => return Some(y),
            Some((v0, y0)) if x <= value => {
                let span = value - v0;
                if span <= 0.0 {
                    return Some(y);
                }
                let t = (x - v0) / span;
                return Some(y0 + t * (y - y0));
            }
            _ => previous = Some((value, y)),
        }
    }
    previous.map(|(_, y)| y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn range() -> OptimalRange {
        OptimalRange::new(100.0, 500.0)
    }

    #[test]
    fn anchors_cover_min_mid_max() {
        for modality in [Modality::T1, Modality::Flair, Modality::SwiMagnitude] {
            let tf = TransferFunction::for_modality(modality, range(), REFERENCE_THICKNESS);
            let values: Vec<f32> = tf.opacity.iter().map(|p| p.value).collect();
            assert_eq!(values.first(), Some(&100.0));
            assert!(values.contains(&300.0), "{modality} misses mid anchor");
            assert_eq!(values.last(), Some(&500.0));
        }
    }

    #[test]
    fn sequential_opacity_is_monotonic() {
        let rising = [Modality::T1, Modality::Flair];
        for modality in rising {
            let tf = TransferFunction::for_modality(modality, range(), 10.0);
            assert!(tf.opacity.windows(2).all(|w| w[0].opacity <= w[1].opacity));
        }
        let tf = TransferFunction::for_modality(Modality::SwiMagnitude, range(), 10.0);
        assert!(tf.opacity.windows(2).all(|w| w[0].opacity >= w[1].opacity));
    }

    #[test]
    fn phase_is_symmetric_about_zero() {
        let phase = OptimalRange::new(-3.0, 3.14159);
        let tf = TransferFunction::for_modality(Modality::SwiPhase, phase, 10.0);
        assert_abs_diff_eq!(tf.opacity[0].value, -3.14159);
        assert_abs_diff_eq!(tf.opacity[4].value, 3.14159);
        assert_abs_diff_eq!(tf.opacity_at(-2.0), tf.opacity_at(2.0), epsilon = 1e-6);
        assert!(tf.opacity_at(0.0) < tf.opacity_at(3.0));
        assert!(tf.opacity_at(0.0) < tf.opacity_at(-3.0));
        assert!(tf.color_at(-3.1)[2] > 0.9);
        assert!(tf.color_at(3.1)[0] > 0.9);
    }

    #[test]
    fn thinner_slabs_are_more_opaque() {
        let thick = TransferFunction::for_modality(Modality::Flair, range(), 20.0);
        let reference = TransferFunction::for_modality(Modality::Flair, range(), 10.0);
        let thin = TransferFunction::for_modality(Modality::Flair, range(), 5.0);
        assert_abs_diff_eq!(thick.opacity_at(500.0), 0.2);
        assert_abs_diff_eq!(reference.opacity_at(500.0), 0.4);
        assert_abs_diff_eq!(thin.opacity_at(500.0), 0.8);
        let thinnest = TransferFunction::for_modality(Modality::Flair, range(), 1.0);
        assert_eq!(thinnest.opacity_at(500.0), 1.0);
    }

    #[test]
    fn zero_width_window_gives_flat_function() {
        let tf = TransferFunction::for_modality(Modality::T1, OptimalRange::new(5.0, 5.0), 10.0);
        assert_eq!(tf.opacity.len(), 1);
        assert_eq!(tf.opacity_at(5.0), 1.0);
        assert!(tf.color_at(5.0).iter().all(|c| c.is_finite()));
        assert!(tf.opacity_at(4.0).is_finite());

        let flat = OptimalRange::new(0.0, 0.0);
        let phase = TransferFunction::for_modality(Modality::SwiPhase, flat, 3.0);
        assert_eq!(phase.opacity_at(0.0), 1.0);
    }

    #[test]
    fn lookup_interpolates_and_holds_ends() {
        let tf = TransferFunction::for_modality(Modality::T1, OptimalRange::new(0.0, 1000.0), 10.0);
        assert_eq!(tf.opacity_at(-50.0), 0.0);
        assert_abs_diff_eq!(tf.opacity_at(125.0), 0.075);
        assert_abs_diff_eq!(tf.opacity_at(5000.0), 0.35);
        assert_abs_diff_eq!(tf.color_at(500.0)[1], 0.6);
    }

    #[test]
    fn overlay_function_uses_kind_color() {
        let tf = TransferFunction::for_overlay(OverlayKind::Lesion, 0.4);
        assert_eq!(tf.color_at(1.0), [1.0, 0.2, 1.0]);
        assert_eq!(tf.opacity_at(0.0), 0.0);
        assert_abs_diff_eq!(tf.opacity_at(0.75), 0.4);
        let clamped = TransferFunction::for_overlay(OverlayKind::Prl, 7.0);
        assert_eq!(clamped.opacity_at(1.0), 1.0);
    }

    #[test]
    fn colorbar_spans_the_color_points() {
        let tf = TransferFunction::for_modality(Modality::T1, range(), 10.0);
        let bar = tf.colorbar(64, 4);
        assert_eq!(bar.dimensions(), (64, 4));
        assert_eq!(bar.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
        assert_eq!(bar.get_pixel(63, 3).0[0], 255);
    }
}
