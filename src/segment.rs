//! Antimeridian-aware connection geometry.
//!
//! A link between two points whose longitudes differ by more than 180°
//! would cross the whole map if drawn straight. It is drawn instead as two
//! copies, each shifted by a full turn, which the map frame then clips.

use nalgebra::DMatrix;

use crate::adjacency::active_edges;

// Fraction of a channel covered by its arrow head.
pub const ARROW_HEAD_FRACTION: f64 = 0.4;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeoSegment {
    pub lons: (f64, f64),
    pub lats: (f64, f64),
    pub clip: bool,
}

impl GeoSegment {
    pub fn new(lons: (f64, f64), lats: (f64, f64)) -> Self {
        Self {
            lons,
            lats,
            clip: true,
        }
    }

    pub fn point_at(&self, t: f64) -> (f64, f64) {
        (
            self.lons.0 + (self.lons.1 - self.lons.0) * t,
            self.lats.0 + (self.lats.1 - self.lats.0) * t,
        )
    }

    pub fn start(&self) -> (f64, f64) {
        (self.lons.0, self.lats.0)
    }

    pub fn end(&self) -> (f64, f64) {
        (self.lons.1, self.lats.1)
    }

    pub fn arrow_head(&self) -> GeoSegment {
        let (lon, lat) = self.point_at(ARROW_HEAD_FRACTION);
        GeoSegment {
            lons: (self.lons.0, lon),
            lats: (self.lats.0, lat),
            clip: self.clip,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SegmentSplit {
    Single(GeoSegment),
    Wrapped(GeoSegment, GeoSegment),
}

impl SegmentSplit {
    pub fn segments(&self) -> Vec<GeoSegment> {
        match *self {
            SegmentSplit::Single(s) => vec![s],
            SegmentSplit::Wrapped(a, b) => vec![a, b],
        }
    }

    pub fn is_wrapped(&self) -> bool {
        matches!(self, SegmentSplit::Wrapped(..))
    }
}

/// Splits the link from `(lon_a, lat_a)` to `(lon_b, lat_b)` at the
/// antimeridian when needed. Longitudes are degrees in `[-180, 180]`.
pub fn split(lon_a: f64, lon_b: f64, lat_a: f64, lat_b: f64) -> SegmentSplit {
    let lats = (lat_a, lat_b);
    if (lon_a - lon_b).abs() > 180.0 {
        if lon_a < 0.0 {
            return SegmentSplit::Wrapped(
                GeoSegment::new((lon_a + 360.0, lon_b), lats),
                GeoSegment::new((lon_a, lon_b - 360.0), lats),
            );
        }
        if lon_b < 0.0 {
            return SegmentSplit::Wrapped(
                GeoSegment::new((lon_a, lon_b + 360.0), lats),
                GeoSegment::new((lon_a - 360.0, lon_b), lats),
            );
        }
        debug_assert!(
            false,
            "longitudes {lon_a} and {lon_b} are outside [-180, 180]"
        );
    }
    SegmentSplit::Single(GeoSegment::new((lon_a, lon_b), lats))
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Arrow {
    pub shaft: GeoSegment,
    pub head: GeoSegment,
}

impl Arrow {
    pub fn head_triangle(&self, size: f64) -> [(f64, f64); 3] {
        let tip = self.head.end();
        let (dx, dy) = (tip.0 - self.head.lons.0, tip.1 - self.head.lats.0);
        let len = dx.hypot(dy);
        if len == 0.0 {
            return [tip; 3];
        }
        let (ux, uy) = (dx / len, dy / len);
        let base = (tip.0 - ux * size, tip.1 - uy * size);
        let half = size / 2.0;
        [
            tip,
            (base.0 - uy * half, base.1 + ux * half),
            (base.0 + uy * half, base.1 - ux * half),
        ]
    }
}

pub fn arrows(tx_lon: f64, rx_lon: f64, tx_lat: f64, rx_lat: f64) -> Vec<Arrow> {
    split(tx_lon, rx_lon, tx_lat, rx_lat)
        .segments()
        .into_iter()
        .map(|shaft| Arrow {
            shaft,
            head: shaft.arrow_head(),
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeSegments {
    pub tx: usize,
    pub rx: usize,
    pub weight: f64,
    pub split: SegmentSplit,
}

pub fn edge_segments(frame: &DMatrix<f64>, lons: &[f64], lats: &[f64]) -> Vec<EdgeSegments> {
    active_edges(frame)
        .filter(|&(tx, rx, _)| tx < lons.len() && rx < lons.len() && tx < lats.len() && rx < lats.len())
        .map(|(tx, rx, weight)| EdgeSegments {
            tx,
            rx,
            weight,
            split: split(lons[tx], lons[rx], lats[tx], lats[rx]),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_links_are_untouched() {
        let grid: Vec<f64> = (-24..=24).map(|i| i as f64 * 7.5).collect();
        for &a in &grid {
            for &b in &grid {
                if (a - b).abs() > 180.0 {
                    continue;
                }
                assert_eq!(
                    split(a, b, 1.0, 2.0),
                    SegmentSplit::Single(GeoSegment::new((a, b), (1.0, 2.0))),
                    "{a} -> {b}"
                );
            }
        }
    }

    #[test]
    fn long_links_always_wrap() {
        let grid: Vec<f64> = (-24..=24).map(|i| i as f64 * 7.5).collect();
        for &a in &grid {
            for &b in &grid {
                if (a - b).abs() > 180.0 {
                    assert!(split(a, b, 0.0, 0.0).is_wrapped(), "{a} -> {b}");
                }
            }
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "outside [-180, 180]")]
    fn out_of_range_longitudes_trip_the_assertion() {
        split(10.0, 200.0, 0.0, 0.0);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn out_of_range_longitudes_stay_single() {
        assert!(!split(10.0, 200.0, 0.0, 0.0).is_wrapped());
    }

    #[test]
    fn negative_first_point_wraps() {
        let pieces = split(-170.0, 170.0, 5.0, -5.0).segments();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].lons, (190.0, 170.0));
        assert_eq!(pieces[1].lons, (-170.0, -190.0));
        assert!(pieces.iter().all(|s| s.lats == (5.0, -5.0)));
    }

    #[test]
    fn negative_second_point_wraps() {
        let pieces = split(170.0, -170.0, 0.0, 0.0).segments();
        assert_eq!(pieces[0].lons, (170.0, 190.0));
        assert_eq!(pieces[1].lons, (-190.0, -170.0));
    }

    #[test]
    fn arrow_head_covers_leading_part() {
        let arrow = arrows(0.0, 10.0, 0.0, 20.0)[0];
        assert_eq!(arrow.head.end(), (4.0, 8.0));
        assert_eq!(arrow.shaft.end(), (10.0, 20.0));
    }

    #[test]
    fn head_triangle_points_along_the_link() {
        let arrow = arrows(0.0, 100.0, 0.0, 0.0)[0];
        let [tip, left, right] = arrow.head_triangle(6.0);
        assert_eq!(tip, (40.0, 0.0));
        assert_eq!(left, (34.0, 3.0));
        assert_eq!(right, (34.0, -3.0));

        let wrapped = arrows(-170.0, 170.0, 0.0, 0.0);
        assert_eq!(wrapped.len(), 2);
        assert!(wrapped.iter().all(|a| a.head_triangle(6.0)[0] == a.head.end()));
    }

    #[test]
    fn edges_follow_positive_cells() {
        let frame = DMatrix::from_row_slice(3, 3, &[0.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0]);
        let lons = [-170.0, 170.0, 0.0];
        let lats = [0.0, 10.0, 20.0];
        let edges = edge_segments(&frame, &lons, &lats);
        assert_eq!(edges.len(), 2);
        assert!(edges[0].split.is_wrapped());
        assert_eq!((edges[1].tx, edges[1].rx, edges[1].weight), (1, 2, 2.0));
        assert!(!edges[1].split.is_wrapped());
    }
}
