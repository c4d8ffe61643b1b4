use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use crate::{
    auth::CurrentUser,
    error::AppError,
    services::{
        directions::{Directions, DEFAULT_PROFILE},
        recommendations::{Preferences, Recommendations},
        weather::WeatherSummary,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/weather/:location", get(weather))
        .route("/recommendations", post(recommendations))
        .route("/map/directions", get(directions))
}

async fn weather(
    State(state): State<AppState>,
    Path(location): Path<String>,
) -> Result<Json<WeatherSummary>, AppError> {
    Ok(Json(state.weather.current(&location).await?))
}

async fn recommendations(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(Json(preferences), _): WithRejection<Json<Preferences>, AppError>,
) -> Result<Json<Recommendations>, AppError> {
    current.require_user()?;
    Ok(Json(state.recommendations.recommend(preferences).await?))
}

#[derive(Debug, Deserialize)]
struct DirectionsQuery {
    start: Option<String>,
    end: Option<String>,
    profile: Option<String>,
}

async fn directions(
    State(state): State<AppState>,
    Query(query): Query<DirectionsQuery>,
) -> Result<Json<Directions>, AppError> {
    let (Some(start), Some(end)) = (non_blank(query.start), non_blank(query.end)) else {
        return Err(AppError::BadRequest(
            "Start and end parameters are required".into(),
        ));
    };
    let profile = non_blank(query.profile).unwrap_or_else(|| DEFAULT_PROFILE.to_string());
    Ok(Json(
        state.directions.directions(&start, &end, &profile).await?,
    ))
}

fn non_blank(input: Option<String>) -> Option<String> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
