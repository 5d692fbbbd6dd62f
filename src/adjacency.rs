//! Per-timestep contact graphs.
//!
//! The simulator logs an `edges` variable over `(rx, tx, time)`. Each frame
//! becomes a square matrix whose values are square-root weighted for
//! display.

use std::path::Path;

use nalgebra::DMatrix;
use tracing::info;

use crate::container::Container;
use crate::error::{Result, VizError};

pub const EDGE_VARIABLE: &str = "edges";

pub fn edge_weight(raw: f64) -> f64 {
    raw.sqrt()
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdjacencySeries {
    frames: Vec<DMatrix<f64>>,
}

impl AdjacencySeries {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Reads a contact graph log. `None` or an empty path yields a disabled
    /// series.
    pub fn read(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) if !p.as_os_str().is_empty() => {
                info!("Processing \"{}\"", p.display());
                Self::from_container(&Container::open(p)?)
            }
            _ => Ok(Self::disabled()),
        }
    }

    pub fn from_container(container: &Container) -> Result<Self> {
        let edges = container.variable(EDGE_VARIABLE)?;
        let [rows, cols, steps] = match edges.dims.as_slice() {
            [a, b, c] => [
                container.dimension(a)?,
                container.dimension(b)?,
                container.dimension(c)?,
            ],
            other => {
                return Err(VizError::malformed(format!(
                    "\"{EDGE_VARIABLE}\" should span (rx, tx, time), found {other:?}"
                )))
            }
        };
        if rows != cols {
            return Err(VizError::malformed(format!(
                "contact matrices must be square, found {rows}x{cols}"
            )));
        }

        let data = edges.values();
        let frames = (0..steps)
            .map(|t| DMatrix::from_fn(rows, cols, |i, j| data[(i * cols + j) * steps + t]))
            .collect();
        Ok(Self::from_raw(frames))
    }

    pub fn from_raw(frames: Vec<DMatrix<f64>>) -> Self {
        Self {
            frames: frames.into_iter().map(|m| m.map(edge_weight)).collect(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame(&self, index: usize) -> Option<&DMatrix<f64>> {
        self.frames.get(index)
    }

    pub fn frames(&self) -> &[DMatrix<f64>] {
        &self.frames
    }

    pub fn range(&self) -> Option<(f64, f64)> {
        self.frames
            .iter()
            .flat_map(|m| m.iter().copied())
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    pub fn order(&self) -> Option<usize> {
        self.frames.first().map(|m| m.nrows())
    }
}

pub fn active_edges(frame: &DMatrix<f64>) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
    (0..frame.nrows()).flat_map(move |i| {
        (0..frame.ncols()).filter_map(move |j| {
            let w = frame[(i, j)];
            (w > 0.0).then_some((i, j, w))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Variable;

    #[test]
    fn weights_are_square_rooted() {
        assert_eq!(edge_weight(4.0), 2.0);
        assert_eq!(edge_weight(1.0), 1.0);
        assert_eq!(edge_weight(0.0), 0.0);
    }

    #[test]
    fn empty_path_disables_feature() {
        assert!(!AdjacencySeries::read(None).unwrap().is_enabled());
        assert!(!AdjacencySeries::read(Some(Path::new(""))).unwrap().is_enabled());
    }

    #[test]
    fn frames_follow_time_axis() {
        let mut c = Container::default();
        c.dimensions.insert("rx".into(), 2);
        c.dimensions.insert("tx".into(), 2);
        c.dimensions.insert("time".into(), 3);
        // (i, j, t) -> i*6 + j*3 + t
        let data: Vec<f64> = (0..12).map(|v| v as f64).collect();
        c.variables
            .insert("edges".into(), Variable::new(&["rx", "tx", "time"], data));

        let series = AdjacencySeries::from_container(&c).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.order(), Some(2));
        let frame = series.frame(1).unwrap();
        assert_eq!(frame[(0, 1)], 4.0f64.sqrt());
        assert_eq!(frame[(1, 1)], 10.0f64.sqrt());
        assert_eq!(series.range(), Some((0.0, 11.0f64.sqrt())));
    }

    #[test]
    fn non_square_matrices_are_rejected() {
        let mut c = Container::default();
        c.dimensions.insert("rx".into(), 2);
        c.dimensions.insert("tx".into(), 3);
        c.dimensions.insert("time".into(), 1);
        c.variables
            .insert("edges".into(), Variable::new(&["rx", "tx", "time"], vec![0.0; 6]));
        assert!(AdjacencySeries::from_container(&c).is_err());
    }

    #[test]
    fn active_edges_skip_zero_weights() {
        let frame = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 0.5, 0.0]);
        let edges: Vec<_> = active_edges(&frame).collect();
        assert_eq!(edges, vec![(0, 1, 1.0), (1, 0, 0.5)]);
    }
}
