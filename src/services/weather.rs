use serde::{Deserialize, Serialize};

use crate::{config::WeatherConfig, error::AppError};

use super::upstream::{build_http, send_json};

const SERVICE: &str = "weather";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSummary {
    pub location: Option<String>,
    pub temperature: Option<f64>,
    pub description: Option<String>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CurrentWeather {
    name: Option<String>,
    #[serde(default)]
    main: MainReadings,
    #[serde(default)]
    weather: Vec<Condition>,
    #[serde(default)]
    wind: Wind,
    #[serde(default)]
    sys: Sys,
}

#[derive(Debug, Default, Deserialize)]
struct MainReadings {
    temp: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Condition {
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Wind {
    speed: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Sys {
    country: Option<String>,
}

impl From<CurrentWeather> for WeatherSummary {
    fn from(raw: CurrentWeather) -> Self {
        Self {
            location: raw.name,
            temperature: raw.main.temp,
            description: raw.weather.into_iter().next().and_then(|c| c.description),
            humidity: raw.main.humidity,
            wind_speed: raw.wind.speed,
            country: raw.sys.country,
        }
    }
}

#[derive(Clone)]
pub struct WeatherClient {
    http: reqwest::Client,
    config: WeatherConfig,
}

impl WeatherClient {
    pub fn new(config: WeatherConfig) -> Result<Self, AppError> {
        let http = build_http(SERVICE, config.timeout)?;
        Ok(Self { http, config })
    }

    /// Current conditions for a free-text location, in metric units.
    pub async fn current(&self, location: &str) -> Result<WeatherSummary, AppError> {
        let request = self
            .http
            .get(format!("{}/data/2.5/weather", self.config.base_url))
            .query(&[
                ("q", location),
                ("appid", self.config.api_key.as_str()),
                ("units", "metric"),
            ]);
        let raw: CurrentWeather = send_json(SERVICE, request).await?;
        Ok(raw.into())
    }
}
