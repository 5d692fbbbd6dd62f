//! In-memory indexed table built from a simulator log.
//!
//! Rows are keyed by timestamp and, for grouped sources, by entity. Values
//! are stored column by column. Tables are immutable once the reader hands
//! them out.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VizError};
use crate::schema::SourceKind;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub time: String,
    pub entity: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesLog {
    kind: SourceKind,
    columns: Vec<String>,
    keys: Vec<RecordKey>,
    data: Vec<Vec<f64>>,
}

impl TimeSeriesLog {
    pub fn new(kind: SourceKind) -> Self {
        let columns = kind.columns();
        let data = vec![Vec::new(); columns.len()];
        Self {
            kind,
            columns,
            keys: Vec::new(),
            data,
        }
    }

    pub(crate) fn push_row(&mut self, key: RecordKey, values: &[f64]) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(VizError::malformed(format!(
                "row for {} has {} values, expected {}",
                key.time,
                values.len(),
                self.columns.len()
            )));
        }
        for (column, value) in self.data.iter_mut().zip(values) {
            column.push(*value);
        }
        self.keys.push(key);
        Ok(())
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn keys(&self) -> &[RecordKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| VizError::UnknownColumn(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Result<&[f64]> {
        Ok(&self.data[self.column_index(name)?])
    }

    pub fn timestamps(&self) -> Vec<&str> {
        let mut times: Vec<&str> = self.keys.iter().map(|k| k.time.as_str()).collect();
        times.sort_unstable();
        times.dedup();
        times
    }

    pub fn entities(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.keys
            .iter()
            .filter_map(|k| k.entity.as_deref())
            .filter(|e| seen.insert(*e))
            .collect()
    }

    /// Checks that (timestamp, entity) pairs are unique and that every
    /// timestamp carries the same entities.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.keys.len());
        for key in &self.keys {
            if !seen.insert(key) {
                return Err(VizError::malformed(format!(
                    "duplicate record for {} {:?}",
                    key.time, key.entity
                )));
            }
        }

        let mut per_time: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for key in &self.keys {
            if let Some(entity) = key.entity.as_deref() {
                per_time.entry(key.time.as_str()).or_default().push(entity);
            }
        }
        let mut expected: Option<Vec<&str>> = None;
        for (time, mut entities) in per_time {
            entities.sort_unstable();
            match &expected {
                None => expected = Some(entities),
                Some(first) if *first != entities => {
                    return Err(VizError::malformed(format!(
                        "timestamp {time} has {} entities, expected {}",
                        entities.len(),
                        first.len()
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    pub fn frames(&self) -> FrameIndex {
        let mut rows: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (row, key) in self.keys.iter().enumerate() {
            rows.entry(key.time.as_str()).or_default().push(row);
        }
        FrameIndex {
            frames: rows
                .into_iter()
                .map(|(time, rows)| (time.to_string(), rows))
                .collect(),
        }
    }

    pub fn slice<'a>(&'a self, index: &'a FrameIndex, frame: usize) -> Result<TimeSlice<'a>> {
        let (time, rows) = index.frames.get(frame).ok_or(VizError::FrameOutOfRange {
            index: frame,
            total: index.len(),
        })?;
        Ok(TimeSlice {
            log: self,
            time,
            rows,
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct FrameIndex {
    frames: Vec<(String, Vec<usize>)>,
}

impl FrameIndex {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn timestamp(&self, frame: usize) -> Option<&str> {
        self.frames.get(frame).map(|(t, _)| t.as_str())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TimeSlice<'a> {
    log: &'a TimeSeriesLog,
    time: &'a str,
    rows: &'a [usize],
}

impl<'a> TimeSlice<'a> {
    pub fn time(&self) -> &'a str {
        self.time
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Result<Vec<f64>> {
        let values = self.log.column(name)?;
        Ok(self.rows.iter().map(|&r| values[r]).collect())
    }

    pub fn entities(&self) -> Vec<Option<&'a str>> {
        self.rows
            .iter()
            .map(|&r| self.log.keys[r].entity.as_deref())
            .collect()
    }
}
