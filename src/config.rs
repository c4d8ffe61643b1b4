use std::{env, net::SocketAddr, time::Duration};

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub cookie_secret: String,
    pub weather: WeatherConfig,
    pub ai: AiConfig,
    pub routing: RoutingConfig,
}

/// Connection settings for the weather provider.
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

/// Connection settings for the text-generation provider.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

/// Connection settings for the geocoding and routing provider.
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://voyage.db".to_string());
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let cookie_secret = env::var("COOKIE_SECRET")
            .unwrap_or_else(|_| "change-me-voyage-session-cookie-secret".to_string());

        let timeout = match env::var("UPSTREAM_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(raw.parse().map_err(|err| {
                AppError::Config(format!("invalid UPSTREAM_TIMEOUT_SECS: {err}"))
            })?),
            Err(_) => Duration::from_secs(10),
        };

        let weather = WeatherConfig {
            base_url: url_var("WEATHER_API_URL", "https://api.openweathermap.org")?,
            api_key: env::var("WEATHER_API_KEY").unwrap_or_default(),
            timeout,
        };

        let ai = AiConfig {
            base_url: url_var("AI_API_URL", "https://generativelanguage.googleapis.com")?,
            api_key: env::var("AI_API_KEY").unwrap_or_default(),
            model: env::var("AI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            timeout,
        };

        let routing = RoutingConfig {
            base_url: url_var("ROUTING_API_URL", "https://api.openrouteservice.org")?,
            api_key: env::var("ROUTING_API_KEY").unwrap_or_default(),
            timeout,
        };

        Ok(Self {
            database_url,
            listen_addr,
            cookie_secret,
            weather,
            ai,
            routing,
        })
    }
}

fn url_var(name: &str, default: &str) -> Result<String, AppError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    url::Url::parse(&raw).map_err(|err| AppError::Config(format!("invalid {name}: {err}")))?;
    Ok(raw.trim_end_matches('/').to_string())
}
