//! Self-describing array container for simulator logs.
//!
//! A container is a JSON document holding named dimensions, named variables
//! laid out over those dimensions (row-major), and nested groups that
//! inherit their ancestors' dimensions.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VizError};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub dims: Vec<String>,
    pub data: Vec<f64>,
}

impl Variable {
    pub fn new(dims: &[&str], data: Vec<f64>) -> Self {
        Self {
            dims: dims.iter().map(|d| d.to_string()).collect(),
            data,
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Container {
    #[serde(default)]
    pub dimensions: BTreeMap<String, usize>,
    #[serde(default)]
    pub variables: BTreeMap<String, Variable>,
    #[serde(default)]
    pub groups: BTreeMap<String, Container>,
}

impl Container {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(VizError::MissingSource(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|e| VizError::io(path, e))?;
        let container: Container = serde_json::from_str(&text).map_err(|source| VizError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        container.validate()?;
        Ok(container)
    }

    pub fn validate(&self) -> Result<()> {
        self.validate_with(&BTreeMap::new())
    }

    fn validate_with(&self, inherited: &BTreeMap<String, usize>) -> Result<()> {
        let mut scope = inherited.clone();
        scope.extend(self.dimensions.iter().map(|(k, v)| (k.clone(), *v)));

        for (name, var) in &self.variables {
            let mut expected = 1usize;
            for dim in &var.dims {
                let size = scope
                    .get(dim)
                    .ok_or_else(|| VizError::MissingDimension(format!("{dim} (used by {name})")))?;
                expected = expected.checked_mul(*size).ok_or_else(|| {
                    VizError::malformed(format!(
                        "dimensions {:?} of \"{name}\" overflow the element count",
                        var.dims
                    ))
                })?;
            }
            if expected != var.data.len() {
                return Err(VizError::malformed(format!(
                    "variable \"{}\" holds {} values but its dimensions {:?} require {}",
                    name,
                    var.data.len(),
                    var.dims,
                    expected
                )));
            }
        }

        for group in self.groups.values() {
            group.validate_with(&scope)?;
        }
        Ok(())
    }

    pub fn dimension(&self, name: &str) -> Result<usize> {
        self.dimensions
            .get(name)
            .copied()
            .ok_or_else(|| VizError::MissingDimension(name.to_string()))
    }

    pub fn variable(&self, name: &str) -> Result<&Variable> {
        self.variables
            .get(name)
            .ok_or_else(|| VizError::MissingVariable(name.to_string()))
    }

    pub fn group(&self, name: &str) -> Option<&Container> {
        self.groups.get(name)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &Container)> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn series(&self, name: &str, len: usize) -> Result<&[f64]> {
        let var = self.variable(name)?;
        if var.dims.len() != 1 || var.data.len() != len {
            return Err(VizError::malformed(format!(
                "variable \"{}\" should be one-dimensional with {} values, found {:?} with {}",
                name,
                len,
                var.dims,
                var.data.len()
            )));
        }
        Ok(&var.data)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| VizError::malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Container {
        let mut c = Container::default();
        c.dimensions.insert("time".into(), 2);
        c.variables
            .insert("year".into(), Variable::new(&["time"], vec![2019.0, 2019.0]));
        let mut g = Container::default();
        g.variables
            .insert("energy".into(), Variable::new(&["time"], vec![1.0, 2.0]));
        c.groups.insert("000000".into(), g);
        c
    }

    #[test]
    fn groups_inherit_parent_dimensions() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn size_mismatch_is_rejected() {
        let mut c = sample();
        c.variables
            .insert("month".into(), Variable::new(&["time"], vec![4.0]));
        assert!(matches!(c.validate(), Err(VizError::Malformed(_))));
    }

    #[test]
    fn unknown_dimension_is_rejected() {
        let mut c = sample();
        c.variables
            .insert("day".into(), Variable::new(&["ticks"], vec![1.0, 2.0]));
        assert!(matches!(c.validate(), Err(VizError::MissingDimension(_))));
    }

    #[test]
    fn oversized_dimensions_are_malformed() {
        let json = r#"{
            "dimensions": {"a": 4294967296, "b": 4294967296},
            "variables": {"x": {"dims": ["a", "b"], "data": []}}
        }"#;
        let c: Container = serde_json::from_str(json).unwrap();
        assert!(matches!(c.validate(), Err(VizError::Malformed(_))));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = Container::open(Path::new("/nonexistent/log.json")).unwrap_err();
        assert!(matches!(err, VizError::MissingSource(_)));
    }

    #[test]
    fn parses_json_layout() {
        let json = r#"{
            "dimensions": {"ticks": 3},
            "variables": {"time": {"dims": ["ticks"], "data": [0, 1, 2]}}
        }"#;
        let c: Container = serde_json::from_str(json).unwrap();
        c.validate().unwrap();
        assert_eq!(c.dimension("ticks").unwrap(), 3);
        assert_eq!(c.series("time", 3).unwrap(), &[0.0, 1.0, 2.0]);
        assert!(c.series("time", 4).is_err());
    }
}
