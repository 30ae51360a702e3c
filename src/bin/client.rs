use anyhow::Result;
use chrono::{Local, NaiveDate, NaiveTime};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use solar_forecast::client::{render_state, ForecastClient, InputForm, Session, SubmissionState};
use solar_forecast::config::Config;

/// Collects one row of measurements and asks the prediction service for a
/// solar irradiance forecast. Unset inputs use their form defaults.
#[derive(Parser)]
#[command(name = "solar-forecast-client")]
#[command(about = "Solar irradiance prediction client")]
struct Cli {
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Overrides `client.service_url`
    #[arg(long)]
    url: Option<String>,

    /// Date to forecast (YYYY-MM-DD), defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Time to forecast (HH:MM:SS), defaults to now
    #[arg(long)]
    time: Option<NaiveTime>,

    /// Avg Zenith Angle [degrees], 0-180
    #[arg(long)]
    zenith_angle: Option<f64>,

    /// Avg Sun Flag, 0-10
    #[arg(long)]
    sun_flag: Option<f64>,

    /// Avg Opaque Cloud Cover [%], 0-100
    #[arg(long)]
    opaque_cloud_cover: Option<f64>,

    /// Avg Blue/Red_min
    #[arg(long)]
    blue_red_min: Option<f64>,

    /// Avg CMP22 Vent Correlation
    #[arg(long)]
    cmp22_vent_cor: Option<f64>,

    /// Avg Blue/Red_Total Cloud Cover
    #[arg(long)]
    brbg_total_cloud_cover: Option<f64>,

    /// Avg Azimuthal Angle
    #[arg(long)]
    azimuth_angle: Option<f64>,

    /// Avg Albedo
    #[arg(long)]
    albedo: Option<f64>,

    /// Avg Dew Point Temp [°C]
    #[arg(long)]
    dew_point_temp: Option<f64>,

    /// Avg Cloud Cover [%]
    #[arg(long)]
    total_cloud_cover: Option<f64>,
}

impl Cli {
    fn form(&self) -> Result<InputForm> {
        let now = Local::now().naive_local();
        let mut form = InputForm::new(self.date.unwrap_or(now.date()), self.time.unwrap_or(now.time()));

        let inputs = [
            ("Avg_Zenith_Angle_degrees", self.zenith_angle),
            ("Avg_Sun_Flag", self.sun_flag),
            ("Avg_Opaque_Cloud_Cover", self.opaque_cloud_cover),
            ("Avg_Blue_Red_min", self.blue_red_min),
            ("Avg_Global_CMP22_vent_cor", self.cmp22_vent_cor),
            ("Avg_BRBG_Total_Cloud_Cover", self.brbg_total_cloud_cover),
            ("Avg_Azimuth_Angle_degrees", self.azimuth_angle),
            ("Avg_Albedo_CMP11", self.albedo),
            ("Avg_Tower_Dew_Point_Temp_deg_C", self.dew_point_temp),
            ("Avg_Total_Cloud_Cover", self.total_cloud_cover),
        ];
        for (name, value) in inputs {
            if let Some(value) = value {
                form.set(name, value)?;
            }
        }

        Ok(form)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;
    if let Some(url) = cli.url.clone() {
        config.client.service_url = url;
    }

    let form = cli.form()?;
    let client = ForecastClient::new(&config.client)?;
    let mut session = Session::new();

    let state = client.submit(&mut session, &form).await?;
    if let Some(text) = render_state(state) {
        println!("{}", text);
    }

    if matches!(state, SubmissionState::Failure(_)) {
        std::process::exit(1);
    }
    Ok(())
}
