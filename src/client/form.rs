use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveTime};

use crate::api::{field_spec, FieldKind, PredictionRequest, PREDICTION_SCHEMA};
use crate::error::ClientError;

/// The collected inputs for one submission, seeded from schema defaults.
#[derive(Debug, Clone)]
pub struct InputForm {
    date: NaiveDate,
    time: NaiveTime,
    values: BTreeMap<&'static str, f64>,
}

impl InputForm {
    pub fn new(date: NaiveDate, time: NaiveTime) -> Self {
        let values = PREDICTION_SCHEMA
            .iter()
            .filter(|spec| spec.kind != FieldKind::Timestamp)
            .map(|spec| (spec.name, spec.default))
            .collect();

        Self { date, time, values }
    }

    /// Sets a numeric input, enforcing the field's bounds (and integrality
    /// for integer fields).
    pub fn set(&mut self, name: &str, value: f64) -> Result<(), ClientError> {
        let spec = field_spec(name)
            .filter(|spec| spec.kind != FieldKind::Timestamp)
            .ok_or_else(|| ClientError::UnknownField(name.to_string()))?;

        let out_of_range = || ClientError::OutOfRange {
            field: spec.label,
            min: spec.min,
            max: spec.max,
            value,
        };
        if !value.is_finite() || value < spec.min || value > spec.max {
            return Err(out_of_range());
        }
        if spec.kind == FieldKind::Integer && value.fract() != 0.0 {
            return Err(out_of_range());
        }

        self.values.insert(spec.name, value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Date and time combined into one ISO-8601 string.
    pub fn timestamp(&self) -> String {
        self.date.and_time(self.time).format("%Y-%m-%dT%H:%M:%S").to_string()
    }

    pub fn to_request(&self) -> PredictionRequest {
        let value = |name: &str| self.values.get(name).copied().unwrap_or_default();

        PredictionRequest {
            datetime: self.timestamp(),
            zenith_angle_degrees: value("Avg_Zenith_Angle_degrees"),
            sun_flag: value("Avg_Sun_Flag") as i64,
            opaque_cloud_cover: value("Avg_Opaque_Cloud_Cover"),
            blue_red_min: value("Avg_Blue_Red_min"),
            global_cmp22_vent_cor: value("Avg_Global_CMP22_vent_cor"),
            brbg_total_cloud_cover: value("Avg_BRBG_Total_Cloud_Cover"),
            azimuth_angle_degrees: value("Avg_Azimuth_Angle_degrees"),
            albedo_cmp11: value("Avg_Albedo_CMP11"),
            tower_dew_point_temp_deg_c: value("Avg_Tower_Dew_Point_Temp_deg_C"),
            total_cloud_cover: value("Avg_Total_Cloud_Cover"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::request::tests::example_request;

    fn noon_form() -> InputForm {
        InputForm::new(
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_defaults_build_example_request() {
        assert_eq!(noon_form().to_request(), example_request());
    }

    #[test]
    fn test_bounds_enforced() {
        let mut form = noon_form();

        assert!(form.set("Avg_Zenith_Angle_degrees", 180.0).is_ok());
        let err = form.set("Avg_Zenith_Angle_degrees", 180.5).unwrap_err();
        assert!(matches!(err, ClientError::OutOfRange { .. }));
        assert!(form.set("Avg_Opaque_Cloud_Cover", 101.0).is_err());
        assert!(form.set("Avg_Albedo_CMP11", -0.1).is_err());
        assert!(form.set("Avg_Albedo_CMP11", 1.0e6).is_ok());

        // rejected values leave the previous one in place
        assert_eq!(form.get("Avg_Zenith_Angle_degrees"), Some(180.0));
    }

    #[test]
    fn test_sun_flag_must_be_whole() {
        let mut form = noon_form();

        assert!(form.set("Avg_Sun_Flag", 3.5).is_err());
        assert!(form.set("Avg_Sun_Flag", 11.0).is_err());
        form.set("Avg_Sun_Flag", 3.0).unwrap();
        assert_eq!(form.to_request().sun_flag, 3);
    }

    #[test]
    fn test_timestamp_is_not_a_settable_field() {
        let mut form = noon_form();
        assert!(form.set("DATETIME", 0.0).is_err());
        assert_eq!(form.timestamp(), "2024-06-01T12:00:00");
    }
}
