//! Field table for `PredictionRequest`: wire name, kind and bounds.
//!
//! The service checks presence and kind in table order and reports the first
//! violation. Bounds and defaults are applied by the client's input form only.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::RequestError;
use super::request::{PredictionRequest, DATETIME_FIELD};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Timestamp,
    Float,
    Integer,
}

impl FieldKind {
    pub fn describe(&self) -> &'static str {
        match self {
            FieldKind::Timestamp => "an ISO-8601 date-time string",
            FieldKind::Float => "a number",
            FieldKind::Integer => "an integer",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

const fn numeric(name: &'static str, label: &'static str, kind: FieldKind, min: f64, max: f64, default: f64) -> FieldSpec {
    FieldSpec {
        name,
        label,
        kind,
        min,
        max,
        default,
    }
}

pub static PREDICTION_SCHEMA: [FieldSpec; 11] = [
    FieldSpec {
        name: DATETIME_FIELD,
        label: "Date/Time",
        kind: FieldKind::Timestamp,
        min: f64::NEG_INFINITY,
        max: f64::INFINITY,
        default: 0.0,
    },
    numeric("Avg_Zenith_Angle_degrees", "Avg Zenith Angle [degrees]", FieldKind::Float, 0.0, 180.0, 85.0),
    numeric("Avg_Sun_Flag", "Avg Sun Flag", FieldKind::Integer, 0.0, 10.0, 8.0),
    numeric("Avg_Opaque_Cloud_Cover", "Avg Opaque Cloud Cover [%]", FieldKind::Float, 0.0, 100.0, 10.0),
    numeric("Avg_Blue_Red_min", "Avg Blue/Red_min", FieldKind::Float, 0.0, f64::INFINITY, 0.96),
    numeric("Avg_Global_CMP22_vent_cor", "Avg CMP22 Vent Correlation", FieldKind::Float, 0.0, f64::INFINITY, 0.96),
    numeric("Avg_BRBG_Total_Cloud_Cover", "Avg Blue/Red_Total Cloud Cover", FieldKind::Float, 0.0, f64::INFINITY, 0.96),
    numeric("Avg_Azimuth_Angle_degrees", "Avg Azimuthal Angle", FieldKind::Float, 0.0, f64::INFINITY, 0.96),
    numeric("Avg_Albedo_CMP11", "Avg Albedo", FieldKind::Float, 0.0, f64::INFINITY, 0.96),
    numeric("Avg_Tower_Dew_Point_Temp_deg_C", "Avg Dew Point Temp [°C]", FieldKind::Float, 0.0, f64::INFINITY, 0.96),
    numeric("Avg_Total_Cloud_Cover", "Avg Cloud Cover [%]", FieldKind::Float, 0.0, f64::INFINITY, 0.96),
];

pub fn field_spec(name: &str) -> Option<&'static FieldSpec> {
    PREDICTION_SCHEMA.iter().find(|spec| spec.name == name)
}

#[derive(Debug, Clone, PartialEq)]
enum FieldValue {
    Text(String),
    Number(f64),
    Integer(i64),
}

impl FieldSpec {
    fn check(&self, value: Option<&Value>) -> Result<FieldValue, RequestError> {
        let value = match value {
            None | Some(Value::Null) => return Err(self.violation("field required")),
            Some(value) => value,
        };

        match self.kind {
            FieldKind::Timestamp => value
                .as_str()
                .map(|s| FieldValue::Text(s.to_string()))
                .ok_or_else(|| self.wrong_kind()),
            FieldKind::Float => {
                let number = value.as_f64().ok_or_else(|| self.wrong_kind())?;
                if !number.is_finite() {
                    return Err(self.violation("value must be finite"));
                }
                Ok(FieldValue::Number(number))
            }
            FieldKind::Integer => {
                if let Some(integer) = value.as_i64() {
                    return Ok(FieldValue::Integer(integer));
                }
                let number = value.as_f64().ok_or_else(|| self.wrong_kind())?;
                if !number.is_finite() {
                    return Err(self.violation("value must be finite"));
                }
                // whole floats such as 8.0 are accepted as integers
                if number.fract() != 0.0 || number.abs() > i64::MAX as f64 {
                    return Err(self.wrong_kind());
                }
                Ok(FieldValue::Integer(number as i64))
            }
        }
    }

    fn wrong_kind(&self) -> RequestError {
        self.violation(&format!("expected {}", self.kind.describe()))
    }

    fn violation(&self, reason: &str) -> RequestError {
        RequestError::ValidationError {
            field: self.name.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Checks `payload` against `PREDICTION_SCHEMA` and builds the typed request.
/// Unknown keys are ignored.
pub fn validate(payload: &Value) -> Result<PredictionRequest, RequestError> {
    let object = payload.as_object().ok_or_else(|| RequestError::ValidationError {
        field: "body".to_string(),
        reason: "expected a JSON object".to_string(),
    })?;

    let mut checked = BTreeMap::new();
    for spec in &PREDICTION_SCHEMA {
        checked.insert(spec.name, spec.check(object.get(spec.name))?);
    }

    build_request(&checked)
}

fn build_request(checked: &BTreeMap<&'static str, FieldValue>) -> Result<PredictionRequest, RequestError> {
    let missing = |name: &str| RequestError::ValidationError {
        field: name.to_string(),
        reason: "field required".to_string(),
    };
    let number = |name: &'static str| match checked.get(name) {
        Some(FieldValue::Number(n)) => Ok(*n),
        Some(FieldValue::Integer(i)) => Ok(*i as f64),
        _ => Err(missing(name)),
    };

    let datetime = match checked.get(DATETIME_FIELD) {
        Some(FieldValue::Text(text)) => text.clone(),
        _ => return Err(missing(DATETIME_FIELD)),
    };
    let sun_flag = match checked.get("Avg_Sun_Flag") {
        Some(FieldValue::Integer(i)) => *i,
        _ => return Err(missing("Avg_Sun_Flag")),
    };

    Ok(PredictionRequest {
        datetime,
        zenith_angle_degrees: number("Avg_Zenith_Angle_degrees")?,
        sun_flag,
        opaque_cloud_cover: number("Avg_Opaque_Cloud_Cover")?,
        blue_red_min: number("Avg_Blue_Red_min")?,
        global_cmp22_vent_cor: number("Avg_Global_CMP22_vent_cor")?,
        brbg_total_cloud_cover: number("Avg_BRBG_Total_Cloud_Cover")?,
        azimuth_angle_degrees: number("Avg_Azimuth_Angle_degrees")?,
        albedo_cmp11: number("Avg_Albedo_CMP11")?,
        tower_dew_point_temp_deg_c: number("Avg_Tower_Dew_Point_Temp_deg_C")?,
        total_cloud_cover: number("Avg_Total_Cloud_Cover")?,
    })
}
