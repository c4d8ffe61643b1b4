use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use chrono::{NaiveDate, Utc};
use sha2::{Digest, Sha512};

use crate::{
    config::AppConfig,
    db::DbPool,
    error::AppError,
    services::{
        directions::DirectionsClient, itineraries::ItineraryStore,
        recommendations::RecommendationClient, weather::WeatherClient,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub itineraries: ItineraryStore,
    pub weather: WeatherClient,
    pub recommendations: RecommendationClient,
    pub directions: DirectionsClient,
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool) -> Result<Self, AppError> {
        let digest = Sha512::digest(config.cookie_secret.as_bytes());
        let cookie_key = Key::from(&digest[..]);
        Ok(Self {
            itineraries: ItineraryStore::new(db.clone()),
            weather: WeatherClient::new(config.weather.clone())?,
            recommendations: RecommendationClient::new(config.ai.clone())?,
            directions: DirectionsClient::new(config.routing.clone())?,
            config,
            db,
            cookie_key,
        })
    }

    /// Current calendar date (UTC) handed to the itinerary policies.
    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
