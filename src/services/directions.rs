use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::{config::RoutingConfig, error::AppError};

use super::upstream::{build_http, send_json};

const SERVICE: &str = "directions";
const MAP_LINK_BASE: &str = "https://www.google.com/maps/dir/";
pub const DEFAULT_PROFILE: &str = "driving-car";

const PROFILES: &[&str] = &[
    "driving-car",
    "driving-hgv",
    "cycling-regular",
    "cycling-road",
    "cycling-mountain",
    "cycling-electric",
    "foot-walking",
    "foot-hiking",
    "wheelchair",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directions {
    pub distance_km: f64,
    pub map_link: String,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection<F> {
    #[serde(default = "Vec::new")]
    features: Vec<F>,
}

/// Geocoder hit; the geometry is a GeoJSON `Point`.
#[derive(Debug, Deserialize)]
struct PlaceFeature {
    geometry: Option<PointGeometry>,
}

#[derive(Debug, Deserialize)]
struct PointGeometry {
    coordinates: Vec<f64>,
}

/// Route feature. Its `LineString` geometry is not needed and left undecoded.
#[derive(Debug, Deserialize)]
struct RouteFeature {
    properties: Option<RouteProperties>,
}

#[derive(Debug, Deserialize)]
struct RouteProperties {
    #[serde(default)]
    segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
struct Segment {
    distance: f64,
}

#[derive(Clone)]
pub struct DirectionsClient {
    http: reqwest::Client,
    config: RoutingConfig,
}

impl DirectionsClient {
    pub fn new(config: RoutingConfig) -> Result<Self, AppError> {
        let http = build_http(SERVICE, config.timeout)?;
        Ok(Self { http, config })
    }

    /// Geocodes both ends and asks the router for the distance between them.
    pub async fn directions(
        &self,
        start: &str,
        end: &str,
        profile: &str,
    ) -> Result<Directions, AppError> {
        if !PROFILES.contains(&profile) {
            return Err(AppError::BadRequest(format!(
                "Unsupported routing profile: {profile}"
            )));
        }

        let from = self
            .geocode(start)
            .await?
            .ok_or_else(|| AppError::BadRequest(format!("Could not geocode start location: {start}")))?;
        let to = self
            .geocode(end)
            .await?
            .ok_or_else(|| AppError::BadRequest(format!("Could not geocode end location: {end}")))?;

        let request = self
            .http
            .post(format!(
                "{}/v2/directions/{profile}/geojson",
                self.config.base_url
            ))
            .header(reqwest::header::AUTHORIZATION, &self.config.api_key)
            .json(&json!({ "coordinates": [from, to] }));
        let route: FeatureCollection<RouteFeature> = send_json(SERVICE, request).await?;

        let meters = route
            .features
            .into_iter()
            .next()
            .and_then(|feature| feature.properties)
            .and_then(|props| props.segments.into_iter().next())
            .map(|segment| segment.distance)
            .ok_or_else(|| AppError::upstream(SERVICE, "route without segments"))?;

        Ok(Directions {
            distance_km: meters / 1000.0,
            map_link: map_link(start, end)?,
        })
    }

    /// `[longitude, latitude]` of the best match, or `None` when nothing matched.
    pub async fn geocode(&self, location: &str) -> Result<Option<[f64; 2]>, AppError> {
        let request = self
            .http
            .get(format!("{}/geocode/search", self.config.base_url))
            .query(&[("api_key", self.config.api_key.as_str()), ("text", location)]);
        let found: FeatureCollection<PlaceFeature> = send_json(SERVICE, request).await?;

        let coords = found
            .features
            .into_iter()
            .filter_map(|feature| feature.geometry)
            .find(|geometry| geometry.coordinates.len() >= 2)
            .map(|geometry| [geometry.coordinates[0], geometry.coordinates[1]]);
        debug!(location, ?coords, "geocoded");
        Ok(coords)
    }
}

fn map_link(start: &str, end: &str) -> Result<String, AppError> {
    let url = Url::parse_with_params(
        MAP_LINK_BASE,
        &[("api", "1"), ("origin", start), ("destination", end)],
    )
    .map_err(|err| AppError::Other(err.into()))?;
    Ok(url.into())
}
