//! Scalar to color encodings.
//!
//! Every policy returns a fresh buffer with channels in `[0, 1]`. Ranges of
//! zero width (or non-finite bounds) divide by 1.0 instead.

use std::collections::HashMap;
use std::hash::Hash;

use nalgebra::DMatrix;
use rand::Rng;

pub type Rgb = [f64; 3];
pub type Rgba = [f64; 4];

pub const BLACK: Rgb = [0.0, 0.0, 0.0];
pub const WHITE: Rgb = [1.0, 1.0, 1.0];
pub const RED: Rgb = [1.0, 0.0, 0.0];
pub const GREEN: Rgb = [0.0, 1.0, 0.0];
pub const BLUE: Rgb = [0.0, 0.0, 1.0];
pub const LINK_GREEN: Rgb = [0.0, 0.5, 0.0];

pub const MODE_SENSING: i64 = 1;
pub const MODE_TRANSMITTING: i64 = 2;

// NWS precipitation palette, light to heavy.
pub const NWS_PRECIPITATION: [[u8; 3]; 12] = [
    [0x04, 0xe9, 0xe7],
    [0x01, 0x9f, 0xf4],
    [0x03, 0x00, 0xf4],
    [0x01, 0xc5, 0x01],
    [0xfd, 0xf8, 0x02],
    [0xfd, 0x95, 0x00],
    [0xd4, 0x00, 0x00],
    [0xf8, 0x00, 0xfd],
    [0x98, 0x54, 0xc6],
    [0x98, 0x54, 0xc6],
    [0xfd, 0xfd, 0xfd],
    [0xfd, 0xfd, 0xfd],
];

pub fn safe_denominator(value: f64) -> f64 {
    if value == 0.0 || !value.is_finite() {
        1.0
    } else {
        value
    }
}

pub fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

// (x, y) control points of a piecewise-linear channel.
type Segments = &'static [(f64, f64)];

const JET_RED: Segments = &[(0.0, 0.0), (0.35, 0.0), (0.66, 1.0), (0.89, 1.0), (1.0, 0.5)];
const JET_GREEN: Segments = &[
    (0.0, 0.0),
    (0.125, 0.0),
    (0.375, 1.0),
    (0.64, 1.0),
    (0.91, 0.0),
    (1.0, 0.0),
];
const JET_BLUE: Segments = &[(0.0, 0.5), (0.11, 1.0), (0.34, 1.0), (0.65, 0.0), (1.0, 0.0)];

fn interpolate(segments: Segments, x: f64) -> f64 {
    for pair in segments.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];
        if x <= x1 {
            return y0 + (y1 - y0) * (x - x0) / (x1 - x0);
        }
    }
    segments.last().map_or(0.0, |&(_, y)| y)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Colormap {
    Gray,
    Jet,
    Listed(&'static [[u8; 3]]),
}

impl Colormap {
    pub fn sample(&self, x: f64) -> Rgb {
        let x = if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) };
        match self {
            Colormap::Gray => [x, x, x],
            Colormap::Jet => [
                interpolate(JET_RED, x),
                interpolate(JET_GREEN, x),
                interpolate(JET_BLUE, x),
            ],
            Colormap::Listed(palette) => {
                if palette.is_empty() {
                    return BLACK;
                }
                let bin = ((x * palette.len() as f64) as usize).min(palette.len() - 1);
                let [r, g, b] = palette[bin];
                [r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0]
            }
        }
    }
}

/// Colors `values` (clipped to `[0, 1]`) through `cmap` and takes alpha from
/// the separately shaped `alphas`. Missing alphas are opaque.
pub fn magnitude_colors(values: &[f64], cmap: Colormap, alphas: &[f64]) -> Vec<Rgba> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let [r, g, b] = cmap.sample(v);
            let a = alphas.get(i).copied().unwrap_or(1.0);
            [r, g, b, if a.is_finite() { a.clamp(0.0, 1.0) } else { 0.0 }]
        })
        .collect()
}

pub fn normalize(values: &[f64], min: f64, max: f64) -> Vec<f64> {
    let span = safe_denominator(max - min);
    values.iter().map(|v| (v - min) / span).collect()
}

pub fn shaped_alpha(values: &[f64], exponent: f64, threshold: Option<f64>) -> Vec<f64> {
    let max = safe_denominator(finite_range(values).map_or(1.0, |(_, hi)| hi));
    values
        .iter()
        .map(|&v| {
            let v = match threshold {
                Some(t) if v < t => 0.0,
                _ => v,
            };
            (v / max).max(0.0).powf(exponent)
        })
        .collect()
}

pub fn cloud_colors(values: &[f64]) -> Vec<Rgba> {
    let cleared: Vec<f64> = values
        .iter()
        .map(|&v| if v < 4.0 { 0.0 } else { v })
        .collect();
    let alphas = shaped_alpha(&cleared, 0.3, None);
    magnitude_colors(&cleared, Colormap::Gray, &alphas)
}

pub fn precipitation_colors(values: &[f64]) -> Vec<Rgba> {
    let max = safe_denominator(finite_range(values).map_or(1.0, |(_, hi)| hi));
    let shaped: Vec<f64> = values
        .iter()
        .map(|&v| {
            let s = (v / max).max(0.0).powf(0.16);
            if s < 0.25 {
                0.0
            } else {
                s
            }
        })
        .collect();
    let alphas: Vec<f64> = shaped.iter().map(|a| a.powf(0.7)).collect();
    magnitude_colors(&shaped, Colormap::Listed(&NWS_PRECIPITATION), &alphas)
}

/// Signed battery energy: red for deficits, green for surplus, both with a
/// 10th-power falloff against the batch extremes.
pub fn energy_colors(values: &[f64]) -> Vec<Rgb> {
    let (min, max) = finite_range(values).unwrap_or((0.0, 0.0));
    let (min, max) = (safe_denominator(min), safe_denominator(max));
    values
        .iter()
        .map(|&v| {
            if v < 0.0 {
                [(v / min).powi(10), 0.0, 0.0]
            } else if v > 0.0 {
                [0.0, (v / max).powi(10), 0.0]
            } else {
                BLACK
            }
        })
        .collect()
}

pub fn charging_colors(values: &[f64]) -> Vec<Rgb> {
    values
        .iter()
        .map(|&v| if v <= 0.0 { RED } else { GREEN })
        .collect()
}

pub fn mode_colors(values: &[f64]) -> Vec<Rgb> {
    values
        .iter()
        .map(|&v| match v as i64 {
            _ if v.fract() != 0.0 => BLACK,
            MODE_SENSING => RED,
            MODE_TRANSMITTING => BLUE,
            _ => BLACK,
        })
        .collect()
}

pub fn generate_random_colors<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<Rgb> {
    (0..count)
        .map(|_| [rng.gen::<f64>(), rng.gen::<f64>(), rng.gen::<f64>()])
        .collect()
}

pub fn random_group_colors<G, R>(groups: &[G], rng: &mut R) -> Vec<Rgb>
where
    G: Eq + Hash + Ord + Clone,
    R: Rng + ?Sized,
{
    let mut unique: Vec<G> = groups.to_vec();
    unique.sort();
    unique.dedup();
    let palette = generate_random_colors(unique.len(), rng);
    let lookup: HashMap<G, Rgb> = unique.into_iter().zip(palette).collect();
    groups
        .iter()
        .map(|g| lookup.get(g).copied().unwrap_or(BLACK))
        .collect()
}

pub fn weighted_edge_color(value: f64, min: f64, max: f64) -> Rgb {
    if value < 0.0 {
        [value / safe_denominator(min), 0.0, 0.0]
    } else if value > 0.0 {
        let t = (value - min) / safe_denominator(max - min);
        [0.0, (1.0 - t).max(0.0).powf(1.3), 0.0]
    } else {
        BLACK
    }
}

pub fn weighted_edge_colors(weights: &DMatrix<f64>, min: f64, max: f64) -> DMatrix<Rgb> {
    weights.map(|v| weighted_edge_color(v, min, max))
}

pub fn to_u8(channel: f64) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn close(a: Rgb, b: Rgb) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn energy_extremes() {
        let colors = energy_colors(&[-4.0, -2.0, 0.0, 3.0, 6.0]);
        assert!(close(colors[0], RED));
        assert!(close(colors[2], BLACK));
        assert!(close(colors[4], GREEN));
        assert!((colors[1][0] - 0.5f64.powi(10)).abs() < 1e-12);
    }

    #[test]
    fn energy_without_negatives_does_not_divide_by_zero() {
        let colors = energy_colors(&[0.0, 0.0]);
        assert_eq!(colors, vec![BLACK, BLACK]);
        assert!(energy_colors(&[]).is_empty());
    }

    #[test]
    fn charging_is_binary() {
        assert_eq!(charging_colors(&[0.0, -1.0, 0.2]), vec![RED, RED, GREEN]);
    }

    #[test]
    fn modes_use_fixed_palette() {
        assert_eq!(
            mode_colors(&[1.0, 2.0, 0.0, 3.0, 1.5]),
            vec![RED, BLUE, BLACK, BLACK, BLACK]
        );
    }

    #[test]
    fn weighted_edge_bounds() {
        assert!(close(weighted_edge_color(-2.0, -2.0, 5.0), RED));
        assert!(close(weighted_edge_color(5.0, -2.0, 5.0), BLACK));
        assert!(close(weighted_edge_color(0.0, -2.0, 5.0), BLACK));
        let faint = weighted_edge_color(4.0, 0.0, 5.0)[1];
        let bright = weighted_edge_color(1.0, 0.0, 5.0)[1];
        assert!(bright > faint);
    }

    #[test]
    fn weighted_edge_flat_range() {
        let c = weighted_edge_color(1.0, 1.0, 1.0);
        assert!(c.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn group_colors_are_shared_within_a_generation() {
        let mut rng = StdRng::seed_from_u64(7);
        let colors = random_group_colors(&[2, 0, 2, 1, 0], &mut rng);
        assert_eq!(colors[0], colors[2]);
        assert_eq!(colors[1], colors[4]);
        assert_ne!(colors[0], colors[3]);
        assert!(colors.iter().flatten().all(|c| (0.0..1.0).contains(c)));

        let mut again = StdRng::seed_from_u64(7);
        assert_eq!(random_group_colors(&[2, 0, 2, 1, 0], &mut again), colors);
    }

    #[test]
    fn magnitude_alpha_is_independent_of_color() {
        let colors = magnitude_colors(&[2.0, 0.5], Colormap::Gray, &[0.25, 1.0]);
        assert_eq!(colors[0], [1.0, 1.0, 1.0, 0.25]);
        assert_eq!(colors[1], [0.5, 0.5, 0.5, 1.0]);
    }

    #[test]
    fn cloud_clears_thin_values() {
        let colors = cloud_colors(&[3.0, 8.0]);
        assert_eq!(colors[0][3], 0.0);
        assert_eq!(colors[1][3], 1.0);
    }

    #[test]
    fn precipitation_clears_light_rates() {
        let colors = precipitation_colors(&[0.0, 1e-12, 1.0]);
        assert_eq!(colors[0][3], 0.0);
        assert_eq!(colors[1][3], 0.0);
        assert_eq!(colors[2][3], 1.0);
        let top = NWS_PRECIPITATION[11];
        assert_eq!(to_u8(colors[2][0]), top[0]);
    }

    #[test]
    fn jet_endpoints() {
        assert!(close(Colormap::Jet.sample(0.0), [0.0, 0.0, 0.5]));
        assert!(close(Colormap::Jet.sample(1.0), [0.5, 0.0, 0.0]));
        assert!(close(Colormap::Gray.sample(f64::NAN), BLACK));
    }

    #[test]
    fn normalize_flat_range() {
        assert_eq!(normalize(&[3.0, 3.0], 3.0, 3.0), vec![0.0, 0.0]);
    }

    #[test]
    fn weighted_edge_matrix_uses_shared_range() {
        let weights = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 2.0, 0.0]);
        let colors = weighted_edge_colors(&weights, 1.0, 2.0);
        assert_eq!(colors[(0, 0)], BLACK);
        assert_eq!(colors[(0, 1)], GREEN);
        assert_eq!(colors[(1, 0)], [0.0, 0.0, 0.0]);
    }
}
