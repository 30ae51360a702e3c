use serde::{Deserialize, Serialize};

pub const DATETIME_FIELD: &str = "DATETIME";

/// One row of measurements submitted for forecasting. Field names match the
/// wire format exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    #[serde(rename = "DATETIME")]
    pub datetime: String,
    #[serde(rename = "Avg_Zenith_Angle_degrees")]
    pub zenith_angle_degrees: f64,
    #[serde(rename = "Avg_Sun_Flag")]
    pub sun_flag: i64,
    #[serde(rename = "Avg_Opaque_Cloud_Cover")]
    pub opaque_cloud_cover: f64,
    #[serde(rename = "Avg_Blue_Red_min")]
    pub blue_red_min: f64,
    #[serde(rename = "Avg_Global_CMP22_vent_cor")]
    pub global_cmp22_vent_cor: f64,
    #[serde(rename = "Avg_BRBG_Total_Cloud_Cover")]
    pub brbg_total_cloud_cover: f64,
    #[serde(rename = "Avg_Azimuth_Angle_degrees")]
    pub azimuth_angle_degrees: f64,
    #[serde(rename = "Avg_Albedo_CMP11")]
    pub albedo_cmp11: f64,
    #[serde(rename = "Avg_Tower_Dew_Point_Temp_deg_C")]
    pub tower_dew_point_temp_deg_c: f64,
    #[serde(rename = "Avg_Total_Cloud_Cover")]
    pub total_cloud_cover: f64,
}

impl PredictionRequest {
    /// Every numeric column under its wire name, i.e. the row without `DATETIME`.
    pub fn numeric_columns(&self) -> [(&'static str, f64); 10] {
        [
            ("Avg_Zenith_Angle_degrees", self.zenith_angle_degrees),
            ("Avg_Sun_Flag", self.sun_flag as f64),
            ("Avg_Opaque_Cloud_Cover", self.opaque_cloud_cover),
            ("Avg_Blue_Red_min", self.blue_red_min),
            ("Avg_Global_CMP22_vent_cor", self.global_cmp22_vent_cor),
            ("Avg_BRBG_Total_Cloud_Cover", self.brbg_total_cloud_cover),
            ("Avg_Azimuth_Angle_degrees", self.azimuth_angle_degrees),
            ("Avg_Albedo_CMP11", self.albedo_cmp11),
            ("Avg_Tower_Dew_Point_Temp_deg_C", self.tower_dew_point_temp_deg_c),
            ("Avg_Total_Cloud_Cover", self.total_cloud_cover),
        ]
    }
}
