//! Record schemas for the three simulator log kinds.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldTransform {
    Identity,
    // Radians stored on disk, degrees in the table.
    Degrees,
    // Angular rate converted to a frequency in hertz.
    Frequency,
}

impl FieldTransform {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            FieldTransform::Identity => value,
            FieldTransform::Degrees => value.to_degrees(),
            FieldTransform::Frequency => value / (2.0 * PI),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
    pub column: &'static str,
    pub variable: &'static str,
    pub transform: FieldTransform,
}

const fn field(column: &'static str) -> Field {
    Field {
        column,
        variable: column,
        transform: FieldTransform::Identity,
    }
}

const fn degrees(column: &'static str) -> Field {
    Field {
        column,
        variable: column,
        transform: FieldTransform::Degrees,
    }
}

const TICK: Field = Field {
    column: "tick",
    variable: "time",
    transform: FieldTransform::Identity,
};

const FREQ: Field = Field {
    column: "freq",
    variable: "omega",
    transform: FieldTransform::Frequency,
};

const CHANNEL_FIELDS: [Field; 21] = [
    TICK,
    field("los_speed"),
    field("omega"),
    FREQ,
    field("distance"),
    field("delay"),
    field("data_rate"),
    field("tx_idx"),
    field("tx_buffer"),
    degrees("tx_lon"),
    degrees("tx_lat"),
    field("tx_alt"),
    field("tx_gain"),
    field("tx_power"),
    field("rx_idx"),
    field("rx_buffer"),
    degrees("rx_lon"),
    degrees("rx_lat"),
    field("rx_alt"),
    field("rx_gain"),
    field("rx_power"),
];

const MEASUREMENT_FIELDS: [Field; 7] = [
    TICK,
    degrees("latitude"),
    degrees("longitude"),
    field("altitude"),
    field("measurement"),
    field("resolution"),
    field("index"),
];

const NODE_FIELDS: [Field; 9] = [
    field("area"),
    field("charging"),
    field("constellation"),
    field("energy"),
    field("index"),
    degrees("latitude"),
    degrees("longitude"),
    field("mode"),
    field("num_neighbors"),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    Channel,
    Measurement,
    NodeParameters,
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Channel => "channel",
            SourceKind::Measurement => "measurement",
            SourceKind::NodeParameters => "node parameters",
        }
    }

    pub fn time_dimension(&self) -> &'static str {
        match self {
            SourceKind::Channel | SourceKind::Measurement => "ticks",
            SourceKind::NodeParameters => "time",
        }
    }

    pub fn fields(&self) -> &'static [Field] {
        match self {
            SourceKind::Channel => &CHANNEL_FIELDS,
            SourceKind::Measurement => &MEASUREMENT_FIELDS,
            SourceKind::NodeParameters => &NODE_FIELDS,
        }
    }

    pub fn is_grouped(&self) -> bool {
        matches!(self, SourceKind::NodeParameters)
    }

    pub fn columns(&self) -> Vec<String> {
        self.fields().iter().map(|f| f.column.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_is_derived_from_omega() {
        let freq = SourceKind::Channel
            .fields()
            .iter()
            .find(|f| f.column == "freq")
            .unwrap();
        assert_eq!(freq.variable, "omega");
        assert!((freq.transform.apply(2.0 * PI * 5.0) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn angular_fields_become_degrees() {
        let lat = SourceKind::NodeParameters
            .fields()
            .iter()
            .find(|f| f.column == "latitude")
            .unwrap();
        assert!((lat.transform.apply(PI / 2.0) - 90.0).abs() < 1e-12);
    }
}
