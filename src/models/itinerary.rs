use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{serde_as, DefaultOnNull};
use std::{fmt, str::FromStr};

/// One accommodation, transport or activity booking. Free-form; may carry a `cost`.
pub type LineItem = Map<String, Value>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ItineraryStatus {
    #[default]
    Draft,
    Active,
    Completed,
    Cancelled,
}

impl ItineraryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItineraryStatus::Draft => "draft",
            ItineraryStatus::Active => "active",
            ItineraryStatus::Completed => "completed",
            ItineraryStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ItineraryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ItineraryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("\"{other}\" is not a valid choice.")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TripType {
    Solo,
    Couple,
    Family,
    Friends,
    Business,
}

impl TripType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripType::Solo => "solo",
            TripType::Couple => "couple",
            TripType::Family => "family",
            TripType::Friends => "friends",
            TripType::Business => "business",
        }
    }
}

impl FromStr for TripType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "solo" => Ok(Self::Solo),
            "couple" => Ok(Self::Couple),
            "family" => Ok(Self::Family),
            "friends" => Ok(Self::Friends),
            "business" => Ok(Self::Business),
            other => Err(format!("\"{other}\" is not a valid choice.")),
        }
    }
}

/// Trip companions to the plan: generated guidance, bookings and emergency
/// data. Stored verbatim; nothing here feeds the cost or policy rules.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItineraryDetails {
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub ai_recommendations: Vec<Value>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub cultural_notes: Vec<Value>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub weather_info: Map<String, Value>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub safety_tips: Vec<Value>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub bookings: Vec<Value>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub payment_status: Map<String, Value>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub emergency_contacts: Vec<Value>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub medical_info: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    pub insurance_info: Map<String, Value>,
    /// When the generated content was last refreshed.
    #[serde(default)]
    pub last_generated_at: Option<DateTime<Utc>>,
}

/// The caller-editable part of an itinerary. Cost and visibility are
/// only changed through their dedicated operations.
#[derive(Debug, Clone, PartialEq)]
pub struct ItineraryDraft {
    pub title: String,
    pub description: String,
    pub status: ItineraryStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub trip_type: TripType,
    pub number_of_travelers: u32,
    pub budget: f64,
    pub preferences: Map<String, Value>,
    pub destinations: Vec<Value>,
    pub accommodations: Vec<LineItem>,
    pub transportation: Vec<LineItem>,
    pub activities: Vec<LineItem>,
    pub details: ItineraryDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Itinerary {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub status: ItineraryStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub trip_type: TripType,
    pub number_of_travelers: u32,
    pub budget: f64,
    pub preferences: Map<String, Value>,
    pub destinations: Vec<Value>,
    pub accommodations: Vec<LineItem>,
    pub transportation: Vec<LineItem>,
    pub activities: Vec<LineItem>,
    #[serde(flatten)]
    pub details: ItineraryDetails,
    pub total_cost: f64,
    pub is_public: bool,
    pub shared_with: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Itinerary {
    /// Sum of every line item's `cost` across accommodations, transportation
    /// and activities. Does not touch the recorded `total_cost`.
    pub fn compute_total_cost(&self) -> f64 {
        self.accommodations
            .iter()
            .chain(&self.transportation)
            .chain(&self.activities)
            .map(line_item_cost)
            .sum()
    }

    /// Recomputes the total and records it on the itinerary. Persisting is
    /// up to the caller.
    pub fn recalculate_total_cost(&mut self) -> f64 {
        self.total_cost = self.compute_total_cost();
        self.total_cost
    }

    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    pub fn is_active(&self, today: NaiveDate) -> bool {
        self.status == ItineraryStatus::Active
            && self.start_date <= today
            && today <= self.end_date
    }

    /// Editing closes on the first day of the trip, whatever the status.
    pub fn can_edit(&self, today: NaiveDate) -> bool {
        today < self.start_date
    }

    pub fn share(&mut self) {
        self.is_public = true;
    }

    /// Returns `true` when the viewer was not present yet and got appended.
    pub fn add_viewer(&mut self, viewer: &str) -> bool {
        if self.shared_with.iter().any(|existing| existing == viewer) {
            return false;
        }
        self.shared_with.push(viewer.to_string());
        true
    }

    pub fn apply_draft(&mut self, draft: ItineraryDraft) {
        self.title = draft.title;
        self.description = draft.description;
        self.status = draft.status;
        self.start_date = draft.start_date;
        self.end_date = draft.end_date;
        self.trip_type = draft.trip_type;
        self.number_of_travelers = draft.number_of_travelers;
        self.budget = draft.budget;
        self.preferences = draft.preferences;
        self.destinations = draft.destinations;
        self.accommodations = draft.accommodations;
        self.transportation = draft.transportation;
        self.activities = draft.activities;
        self.details = draft.details;
    }
}

/// Cost of a single line item. Missing, null, boolean, non-finite or
/// unparseable values count as zero.
pub fn line_item_cost(item: &LineItem) -> f64 {
    let cost = match item.get("cost") {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Value::String(raw)) => raw.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if cost.is_finite() {
        cost
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid date")
    }

    fn items(value: Value) -> Vec<LineItem> {
        serde_json::from_value(value).expect("line items")
    }

    fn sample() -> Itinerary {
        let now = Utc::now();
        Itinerary {
            id: 1,
            user_id: 7,
            title: "Simien Mountains".into(),
            description: String::new(),
            status: ItineraryStatus::Draft,
            start_date: date("2025-01-10"),
            end_date: date("2025-01-14"),
            trip_type: TripType::Friends,
            number_of_travelers: 3,
            budget: 1200.0,
            preferences: Map::new(),
            destinations: Vec::new(),
            accommodations: Vec::new(),
            transportation: Vec::new(),
            activities: Vec::new(),
            details: ItineraryDetails::default(),
            total_cost: 0.0,
            is_public: false,
            shared_with: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn total_cost_sums_numbers_and_numeric_strings() {
        let mut itinerary = sample();
        itinerary.accommodations = items(json!([{ "cost": 100 }]));
        itinerary.transportation = items(json!([{ "cost": "50" }, { "cost": null }]));
        assert_eq!(itinerary.compute_total_cost(), 150.0);
    }

    #[test]
    fn total_cost_treats_garbage_as_zero() {
        let mut itinerary = sample();
        itinerary.accommodations = items(json!([
            { "name": "no cost field" },
            { "cost": "twelve" },
            { "cost": true },
            { "cost": { "amount": 5 } },
            { "cost": "inf" },
        ]));
        itinerary.activities = items(json!([{ "cost": 12.5 }, { "cost": " 7.5 " }]));
        assert_eq!(itinerary.compute_total_cost(), 20.0);
    }

    #[test]
    fn total_cost_of_empty_itinerary_is_zero() {
        assert_eq!(sample().compute_total_cost(), 0.0);
    }

    #[test]
    fn recorded_total_is_stale_until_recalculated() {
        let mut itinerary = sample();
        itinerary.activities = items(json!([{ "cost": 40 }]));
        assert_eq!(itinerary.recalculate_total_cost(), 40.0);

        itinerary.activities.push(items(json!([{ "cost": 60 }])).remove(0));
        assert_eq!(itinerary.total_cost, 40.0);
        assert_eq!(itinerary.recalculate_total_cost(), 100.0);
        assert_eq!(itinerary.total_cost, 100.0);
    }

    #[test]
    fn can_edit_closes_on_start_date() {
        let itinerary = sample();
        assert!(itinerary.can_edit(date("2025-01-09")));
        assert!(!itinerary.can_edit(date("2025-01-10")));
        assert!(!itinerary.can_edit(date("2025-02-01")));
    }

    #[test]
    fn can_edit_ignores_status() {
        let mut itinerary = sample();
        itinerary.status = ItineraryStatus::Cancelled;
        assert!(itinerary.can_edit(date("2025-01-01")));
    }

    #[test]
    fn is_active_within_dates_inclusive() {
        let mut itinerary = sample();
        itinerary.status = ItineraryStatus::Active;
        itinerary.start_date = date("2025-01-01");
        itinerary.end_date = date("2025-01-05");
        assert!(itinerary.is_active(date("2025-01-01")));
        assert!(itinerary.is_active(date("2025-01-03")));
        assert!(itinerary.is_active(date("2025-01-05")));
        assert!(!itinerary.is_active(date("2025-01-06")));
        assert!(!itinerary.is_active(date("2024-12-31")));
    }

    #[test]
    fn is_active_requires_active_status() {
        let mut itinerary = sample();
        itinerary.start_date = date("2025-01-01");
        itinerary.end_date = date("2025-01-05");
        for status in [
            ItineraryStatus::Draft,
            ItineraryStatus::Completed,
            ItineraryStatus::Cancelled,
        ] {
            itinerary.status = status;
            assert!(!itinerary.is_active(date("2025-01-03")), "{status}");
        }
    }

    #[test]
    fn share_is_idempotent() {
        let mut itinerary = sample();
        itinerary.share();
        let once = itinerary.clone();
        itinerary.share();
        assert_eq!(itinerary, once);
        assert!(itinerary.is_public);
    }

    #[test]
    fn add_viewer_dedups() {
        let mut itinerary = sample();
        assert!(itinerary.add_viewer("abebe@example.com"));
        assert!(itinerary.add_viewer("selam@example.com"));
        assert!(!itinerary.add_viewer("abebe@example.com"));
        assert_eq!(
            itinerary.shared_with,
            vec!["abebe@example.com".to_string(), "selam@example.com".to_string()]
        );
    }

    #[test]
    fn duration_counts_both_ends() {
        assert_eq!(sample().duration_days(), 5);
    }

    #[test]
    fn details_serialize_inline_with_defaults() {
        let value = serde_json::to_value(sample()).expect("serialize");
        assert_eq!(value["ai_recommendations"], json!([]));
        assert_eq!(value["weather_info"], json!({}));
        assert_eq!(value["medical_info"], json!(""));
        assert_eq!(value["last_generated_at"], Value::Null);
        assert!(value.get("details").is_none());
    }

    #[test]
    fn null_details_fall_back_to_defaults() {
        let details: ItineraryDetails = serde_json::from_value(json!({
            "bookings": null,
            "medical_info": null,
            "insurance_info": { "provider": "Nyala" }
        }))
        .expect("details");
        assert!(details.bookings.is_empty());
        assert_eq!(details.medical_info, "");
        assert_eq!(details.insurance_info["provider"], "Nyala");
    }

    #[test]
    fn status_parses_known_choices_only() {
        assert_eq!("active".parse::<ItineraryStatus>(), Ok(ItineraryStatus::Active));
        assert!("archived".parse::<ItineraryStatus>().is_err());
        assert_eq!("family".parse::<TripType>(), Ok(TripType::Family));
    }
}
