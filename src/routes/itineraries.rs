use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use serde_with::{serde_as, DefaultOnNull};
use tracing::{debug, info};

use crate::{
    auth::CurrentUser,
    error::{AppError, FieldErrors},
    models::itinerary::{
        Itinerary, ItineraryDetails, ItineraryDraft, ItineraryStatus, LineItem, TripType,
    },
    state::AppState,
};

const TITLE_MAX_LEN: usize = 200;
const REQUIRED: &str = "This field is required.";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(retrieve).put(update).delete(destroy))
        .route("/:id/share", post(share))
        .route("/:id/viewers", post(add_viewer))
        .route("/:id/total-cost", post(recalculate_total_cost))
}

/// Itinerary plus the policy flags evaluated for the current date.
#[derive(Debug, Serialize)]
pub struct ItineraryView {
    #[serde(flatten)]
    pub itinerary: Itinerary,
    pub duration_days: i64,
    pub is_active: bool,
    pub can_edit: bool,
}

impl ItineraryView {
    pub fn new(itinerary: Itinerary, today: NaiveDate) -> Self {
        Self {
            duration_days: itinerary.duration_days(),
            is_active: itinerary.is_active(today),
            can_edit: itinerary.can_edit(today),
            itinerary,
        }
    }
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
pub struct ItineraryPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub trip_type: Option<String>,
    /// Whole number, as a JSON number or a numeric string.
    pub number_of_travelers: Option<Value>,
    /// Decimal amount, as a JSON number or a decimal string such as `"100.00"`.
    pub budget: Option<Value>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub preferences: Map<String, Value>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub destinations: Vec<Value>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub accommodations: Vec<LineItem>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub transportation: Vec<LineItem>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub activities: Vec<LineItem>,
    #[serde(flatten)]
    pub details: ItineraryDetails,
}

impl ItineraryPayload {
    /// Checks every field and reports all problems at once, keyed by field.
    pub fn validate(self) -> Result<ItineraryDraft, AppError> {
        let mut errors = FieldErrors::new();

        let title = match self.title.as_deref().map(str::trim) {
            None => {
                errors.add("title", REQUIRED);
                String::new()
            }
            Some("") => {
                errors.add("title", "This field may not be blank.");
                String::new()
            }
            Some(title) if title.chars().count() > TITLE_MAX_LEN => {
                errors.add(
                    "title",
                    format!("Ensure this field has no more than {TITLE_MAX_LEN} characters."),
                );
                String::new()
            }
            Some(title) => title.to_string(),
        };

        let status = match self.status.as_deref() {
            None => ItineraryStatus::default(),
            Some(raw) => raw.parse().unwrap_or_else(|msg: String| {
                errors.add("status", msg);
                ItineraryStatus::default()
            }),
        };

        let start_date = parse_date(&mut errors, "start_date", self.start_date.as_deref());
        let end_date = parse_date(&mut errors, "end_date", self.end_date.as_deref());
        if let (Some(start), Some(end)) = (start_date, end_date) {
            if end < start {
                errors.add("end_date", "End date must not be before start date.");
            }
        }

        let trip_type = match self.trip_type.as_deref() {
            None => {
                errors.add("trip_type", REQUIRED);
                None
            }
            Some(raw) => match raw.parse::<TripType>() {
                Ok(trip_type) => Some(trip_type),
                Err(msg) => {
                    errors.add("trip_type", msg);
                    None
                }
            },
        };

        let number_of_travelers = match self.number_of_travelers.as_ref().map(parse_travelers) {
            None => {
                errors.add("number_of_travelers", REQUIRED);
                None
            }
            Some(Ok(n)) => Some(n),
            Some(Err(msg)) => {
                errors.add("number_of_travelers", msg);
                None
            }
        };

        let budget = match self.budget.as_ref().map(parse_budget) {
            None => {
                errors.add("budget", REQUIRED);
                None
            }
            Some(Ok(b)) => Some(b),
            Some(Err(msg)) => {
                errors.add("budget", msg);
                None
            }
        };

        match (start_date, end_date, trip_type, number_of_travelers, budget) {
            (Some(start_date), Some(end_date), Some(trip_type), Some(number_of_travelers), Some(budget))
                if errors.is_empty() =>
            {
                Ok(ItineraryDraft {
                    title,
                    description: self.description.unwrap_or_default(),
                    status,
                    start_date,
                    end_date,
                    trip_type,
                    number_of_travelers,
                    budget,
                    preferences: self.preferences,
                    destinations: self.destinations,
                    accommodations: self.accommodations,
                    transportation: self.transportation,
                    activities: self.activities,
                    details: self.details,
                })
            }
            _ => Err(AppError::Validation(errors)),
        }
    }
}

fn parse_travelers(raw: &Value) -> Result<u32, &'static str> {
    const INVALID: &str = "A valid integer is required.";
    let n = match raw {
        Value::Number(number) => match (number.as_i64(), number.as_f64()) {
            (Some(n), _) => n,
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => f as i64,
            _ => return Err(INVALID),
        },
        Value::String(text) => text.trim().parse::<i64>().map_err(|_| INVALID)?,
        _ => return Err(INVALID),
    };
    if n < 1 {
        return Err("Ensure this value is greater than or equal to 1.");
    }
    u32::try_from(n).map_err(|_| INVALID)
}

fn parse_budget(raw: &Value) -> Result<f64, &'static str> {
    const INVALID: &str = "A valid number is required.";
    let budget = match raw {
        Value::Number(number) => number.as_f64().ok_or(INVALID)?,
        Value::String(text) => text.trim().parse::<f64>().map_err(|_| INVALID)?,
        _ => return Err(INVALID),
    };
    if !budget.is_finite() {
        return Err(INVALID);
    }
    if budget < 0.0 {
        return Err("Ensure this value is greater than or equal to 0.");
    }
    Ok(budget)
}

fn parse_date(errors: &mut FieldErrors, field: &str, raw: Option<&str>) -> Option<NaiveDate> {
    let Some(raw) = raw else {
        errors.add(field, REQUIRED);
        return None;
    };
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add(field, "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.");
            None
        }
    }
}

async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<ItineraryView>>, AppError> {
    let user = current.require_user()?;
    let today = state.today();
    let items = state.itineraries.list(user.id).await?;
    Ok(Json(
        items
            .into_iter()
            .map(|itinerary| ItineraryView::new(itinerary, today))
            .collect(),
    ))
}

async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    WithRejection(Json(payload), _): WithRejection<Json<ItineraryPayload>, AppError>,
) -> Result<(StatusCode, Json<ItineraryView>), AppError> {
    let user = current.require_user()?;
    let draft = payload.validate()?;
    let itinerary = state.itineraries.create(user.id, draft).await?;
    info!(itinerary_id = itinerary.id, user_id = user.id, "itinerary created");
    Ok((
        StatusCode::CREATED,
        Json(ItineraryView::new(itinerary, state.today())),
    ))
}

async fn retrieve(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ItineraryView>, AppError> {
    let user = current.require_user()?;
    let itinerary = state.itineraries.fetch(user.id, id).await?;
    Ok(Json(ItineraryView::new(itinerary, state.today())))
}

async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    WithRejection(Json(payload), _): WithRejection<Json<ItineraryPayload>, AppError>,
) -> Result<Json<ItineraryView>, AppError> {
    let user = current.require_user()?;
    let mut itinerary = state.itineraries.fetch(user.id, id).await?;
    let draft = payload.validate()?;
    itinerary.apply_draft(draft);
    if !state.itineraries.update(&mut itinerary).await? {
        return Err(AppError::NotFound);
    }
    debug!(itinerary_id = id, "itinerary updated");
    Ok(Json(ItineraryView::new(itinerary, state.today())))
}

async fn destroy(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let user = current.require_user()?;
    if !state.itineraries.delete(user.id, id).await? {
        return Err(AppError::NotFound);
    }
    info!(itinerary_id = id, user_id = user.id, "itinerary deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn share(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let user = current.require_user()?;
    let mut itinerary = state.itineraries.fetch(user.id, id).await?;
    itinerary.share();
    if !state.itineraries.update(&mut itinerary).await? {
        return Err(AppError::NotFound);
    }
    Ok(Json(json!({ "message": "Itinerary shared successfully" })))
}

#[derive(Debug, Deserialize)]
struct ViewerForm {
    viewer: String,
}

async fn add_viewer(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
    WithRejection(Json(form), _): WithRejection<Json<ViewerForm>, AppError>,
) -> Result<Json<Value>, AppError> {
    let user = current.require_user()?;
    let viewer = form.viewer.trim();
    if viewer.is_empty() {
        return Err(AppError::invalid_field("viewer", "This field may not be blank."));
    }

    let mut itinerary = state.itineraries.fetch(user.id, id).await?;
    let added = itinerary.add_viewer(viewer);
    if added && !state.itineraries.update(&mut itinerary).await? {
        return Err(AppError::NotFound);
    }
    Ok(Json(json!({
        "added": added,
        "shared_with": itinerary.shared_with,
    })))
}

async fn recalculate_total_cost(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let user = current.require_user()?;
    let mut itinerary = state.itineraries.fetch(user.id, id).await?;
    let total = itinerary.recalculate_total_cost();
    if !state.itineraries.update(&mut itinerary).await? {
        return Err(AppError::NotFound);
    }
    debug!(itinerary_id = id, total, "total cost recalculated");
    Ok(Json(json!({ "total_cost": total })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(value: Value) -> ItineraryPayload {
        serde_json::from_value(value).expect("payload")
    }

    fn valid() -> Value {
        json!({
            "title": "Danakil expedition",
            "start_date": "2030-03-01",
            "end_date": "2030-03-04",
            "trip_type": "friends",
            "number_of_travelers": 4,
            "budget": 2500.0
        })
    }

    #[test]
    fn valid_payload_becomes_draft_with_defaults() {
        let draft = payload(valid()).validate().expect("valid");
        assert_eq!(draft.title, "Danakil expedition");
        assert_eq!(draft.status, ItineraryStatus::Draft);
        assert_eq!(draft.description, "");
        assert!(draft.accommodations.is_empty());
    }

    #[test]
    fn null_collections_default_to_empty() {
        let mut body = valid();
        body["activities"] = Value::Null;
        body["preferences"] = Value::Null;
        let draft = payload(body).validate().expect("valid");
        assert!(draft.activities.is_empty());
        assert!(draft.preferences.is_empty());
    }

    #[test]
    fn missing_fields_are_reported_per_field() {
        let err = payload(json!({})).validate().unwrap_err();
        let AppError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        for field in [
            "title",
            "start_date",
            "end_date",
            "trip_type",
            "number_of_travelers",
            "budget",
        ] {
            assert_eq!(errors.get(field), Some(&[REQUIRED.to_string()][..]), "{field}");
        }
    }

    #[test]
    fn end_before_start_is_rejected_on_end_date() {
        let mut body = valid();
        body["end_date"] = json!("2030-02-27");
        let AppError::Validation(errors) = payload(body).validate().unwrap_err() else {
            panic!("expected validation error");
        };
        assert!(errors.get("end_date").is_some());
        assert!(errors.get("start_date").is_none());
    }

    #[test]
    fn same_day_trip_is_fine() {
        let mut body = valid();
        body["end_date"] = json!("2030-03-01");
        assert!(payload(body).validate().is_ok());
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let mut body = valid();
        body["number_of_travelers"] = json!("2");
        body["budget"] = json!(" 100.00 ");
        let draft = payload(body).validate().expect("valid");
        assert_eq!(draft.number_of_travelers, 2);
        assert_eq!(draft.budget, 100.0);
    }

    #[test]
    fn wrong_number_types_are_reported_per_field() {
        let mut body = valid();
        body["number_of_travelers"] = json!("two");
        body["budget"] = json!([100]);
        let AppError::Validation(errors) = payload(body).validate().unwrap_err() else {
            panic!("expected validation error");
        };
        assert_eq!(
            errors.get("number_of_travelers"),
            Some(&["A valid integer is required.".to_string()][..])
        );
        assert_eq!(
            errors.get("budget"),
            Some(&["A valid number is required.".to_string()][..])
        );
    }

    #[test]
    fn details_are_carried_into_the_draft() {
        let mut body = valid();
        body["safety_tips"] = json!(["stay hydrated"]);
        body["medical_info"] = json!("none");
        body["payment_status"] = json!({ "deposit": "paid" });
        let draft = payload(body).validate().expect("valid");
        assert_eq!(draft.details.safety_tips, vec![json!("stay hydrated")]);
        assert_eq!(draft.details.medical_info, "none");
        assert_eq!(draft.details.payment_status["deposit"], "paid");
    }

    #[test]
    fn bad_choices_and_numbers_are_rejected() {
        let mut body = valid();
        body["status"] = json!("archived");
        body["trip_type"] = json!("solo-ish");
        body["number_of_travelers"] = json!(0);
        body["budget"] = json!(-1.0);
        body["start_date"] = json!("01/03/2030");
        let AppError::Validation(errors) = payload(body).validate().unwrap_err() else {
            panic!("expected validation error");
        };
        for field in ["status", "trip_type", "number_of_travelers", "budget", "start_date"] {
            assert!(errors.get(field).is_some(), "{field}");
        }
    }
}
