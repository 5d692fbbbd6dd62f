//! Parses simulator log containers into [`TimeSeriesLog`] tables.

use std::path::Path;

use tracing::{debug, info};

use crate::container::Container;
use crate::error::{Result, VizError};
use crate::schema::SourceKind;
use crate::table::{RecordKey, TimeSeriesLog};
use crate::time::{DateTimeTuple, DATETIME_FIELDS};

pub fn read_log(path: &Path, kind: SourceKind) -> Result<TimeSeriesLog> {
    info!("Processing {} log \"{}\"", kind.label(), path.display());
    let container = Container::open(path)?;
    archive(&container, kind)
}

pub fn archive(container: &Container, kind: SourceKind) -> Result<TimeSeriesLog> {
    let ticks = container.dimension(kind.time_dimension())?;
    let stamps = timestamps(container, ticks)?;

    let mut log = TimeSeriesLog::new(kind);
    if kind.is_grouped() {
        let mut groups = Vec::new();
        for (name, group) in container.groups() {
            groups.push((name, read_fields(group, kind, ticks)?));
        }
        if groups.is_empty() {
            return Err(VizError::malformed("node parameter log has no node groups"));
        }
        debug!(nodes = groups.len(), ticks, "stacking node groups");
        for (t, stamp) in stamps.iter().enumerate() {
            for (name, columns) in &groups {
                let row: Vec<f64> = columns.iter().map(|c| c[t]).collect();
                log.push_row(
                    RecordKey {
                        time: stamp.clone(),
                        entity: Some(name.to_string()),
                    },
                    &row,
                )?;
            }
        }
    } else {
        let columns = read_fields(container, kind, ticks)?;
        for (t, stamp) in stamps.iter().enumerate() {
            let row: Vec<f64> = columns.iter().map(|c| c[t]).collect();
            log.push_row(
                RecordKey {
                    time: stamp.clone(),
                    entity: None,
                },
                &row,
            )?;
        }
    }

    log.validate()?;
    Ok(log)
}

fn timestamps(container: &Container, ticks: usize) -> Result<Vec<String>> {
    let fields = DATETIME_FIELDS
        .iter()
        .map(|name| container.series(name, ticks))
        .collect::<Result<Vec<_>>>()?;
    (0..ticks)
        .map(|t| {
            let mut tuple = [0.0; 7];
            for (slot, field) in tuple.iter_mut().zip(&fields) {
                *slot = field[t];
            }
            DateTimeTuple::from_fields(tuple)?.key()
        })
        .collect()
}

fn read_fields(group: &Container, kind: SourceKind, ticks: usize) -> Result<Vec<Vec<f64>>> {
    kind.fields()
        .iter()
        .map(|field| -> Result<Vec<f64>> {
            let values = group.series(field.variable, ticks)?;
            Ok(values.iter().map(|v| field.transform.apply(*v)).collect())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Variable;

    fn with_clock(c: &mut Container, dim: &str, seconds: &[f64]) {
        let n = seconds.len();
        c.dimensions.insert(dim.into(), n);
        for (name, value) in DATETIME_FIELDS.iter().zip([2019.0, 4.0, 23.0, 12.0, 41.0]) {
            c.variables
                .insert(name.to_string(), Variable::new(&[dim], vec![value; n]));
        }
        c.variables
            .insert("second".into(), Variable::new(&[dim], seconds.to_vec()));
        c.variables
            .insert("microsecond".into(), Variable::new(&[dim], vec![0.0; n]));
    }

    fn measurement() -> Container {
        let mut c = Container::default();
        with_clock(&mut c, "ticks", &[19.0, 20.0]);
        for field in SourceKind::Measurement.fields() {
            c.variables.insert(
                field.variable.to_string(),
                Variable::new(&["ticks"], vec![std::f64::consts::PI, 0.0]),
            );
        }
        c
    }

    #[test]
    fn measurement_angles_are_degrees() {
        let log = archive(&measurement(), SourceKind::Measurement).unwrap();
        assert_eq!(log.len(), 2);
        assert!((log.column("latitude").unwrap()[0] - 180.0).abs() < 1e-9);
        assert_eq!(log.column("altitude").unwrap()[0], std::f64::consts::PI);
        assert_eq!(log.keys()[1].time, "2019-04-23 12:41:20:000000");
        assert!(log.keys()[0].entity.is_none());
    }

    #[test]
    fn missing_variable_is_fatal() {
        let mut c = measurement();
        c.variables.remove("resolution");
        assert!(matches!(
            archive(&c, SourceKind::Measurement),
            Err(VizError::MissingVariable(_))
        ));
    }

    #[test]
    fn wrong_time_dimension_is_fatal() {
        assert!(matches!(
            archive(&measurement(), SourceKind::NodeParameters),
            Err(VizError::MissingDimension(_))
        ));
    }
}
