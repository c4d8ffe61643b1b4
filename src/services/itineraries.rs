use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use sqlx::{types::Json, FromRow};
use tracing::debug;

use crate::{
    db::DbPool,
    error::AppError,
    models::itinerary::{Itinerary, ItineraryDetails, ItineraryDraft, ItineraryStatus, LineItem, TripType},
};

const SELECT_COLUMNS: &str = "id, user_id, title, description, status, start_date, end_date, \
     trip_type, number_of_travelers, budget, preferences, destinations, accommodations, \
     transportation, activities, ai_recommendations, cultural_notes, weather_info, safety_tips, \
     bookings, payment_status, emergency_contacts, medical_info, insurance_info, total_cost, \
     is_public, shared_with, created_at, updated_at, last_generated_at";

#[derive(Debug, FromRow)]
struct ItineraryRow {
    id: i64,
    user_id: i64,
    title: String,
    description: String,
    status: ItineraryStatus,
    start_date: NaiveDate,
    end_date: NaiveDate,
    trip_type: TripType,
    number_of_travelers: u32,
    budget: f64,
    preferences: Json<Map<String, Value>>,
    destinations: Json<Vec<Value>>,
    accommodations: Json<Vec<LineItem>>,
    transportation: Json<Vec<LineItem>>,
    activities: Json<Vec<LineItem>>,
    ai_recommendations: Json<Vec<Value>>,
    cultural_notes: Json<Vec<Value>>,
    weather_info: Json<Map<String, Value>>,
    safety_tips: Json<Vec<Value>>,
    bookings: Json<Vec<Value>>,
    payment_status: Json<Map<String, Value>>,
    emergency_contacts: Json<Vec<Value>>,
    medical_info: String,
    insurance_info: Json<Map<String, Value>>,
    total_cost: f64,
    is_public: bool,
    shared_with: Json<Vec<String>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_generated_at: Option<DateTime<Utc>>,
}

impl From<ItineraryRow> for Itinerary {
    fn from(row: ItineraryRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            status: row.status,
            start_date: row.start_date,
            end_date: row.end_date,
            trip_type: row.trip_type,
            number_of_travelers: row.number_of_travelers,
            budget: row.budget,
            preferences: row.preferences.0,
            destinations: row.destinations.0,
            accommodations: row.accommodations.0,
            transportation: row.transportation.0,
            activities: row.activities.0,
            details: ItineraryDetails {
                ai_recommendations: row.ai_recommendations.0,
                cultural_notes: row.cultural_notes.0,
                weather_info: row.weather_info.0,
                safety_tips: row.safety_tips.0,
                bookings: row.bookings.0,
                payment_status: row.payment_status.0,
                emergency_contacts: row.emergency_contacts.0,
                medical_info: row.medical_info,
                insurance_info: row.insurance_info.0,
                last_generated_at: row.last_generated_at,
            },
            total_cost: row.total_cost,
            is_public: row.is_public,
            shared_with: row.shared_with.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// SQLite-backed itinerary persistence. Every lookup is scoped to the owner,
/// so a foreign id behaves exactly like a missing one.
#[derive(Clone)]
pub struct ItineraryStore {
    db: DbPool,
}

impl ItineraryStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn list(&self, owner_id: i64) -> Result<Vec<Itinerary>, AppError> {
        let rows: Vec<ItineraryRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM itineraries WHERE user_id = ? \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Itinerary::from).collect())
    }

    pub async fn get(&self, owner_id: i64, id: i64) -> Result<Option<Itinerary>, AppError> {
        let row: Option<ItineraryRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM itineraries WHERE id = ? AND user_id = ?"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Itinerary::from))
    }

    /// Same as [`get`](Self::get) but turns absence into [`AppError::NotFound`].
    pub async fn fetch(&self, owner_id: i64, id: i64) -> Result<Itinerary, AppError> {
        self.get(owner_id, id).await?.ok_or(AppError::NotFound)
    }

    pub async fn create(&self, owner_id: i64, draft: ItineraryDraft) -> Result<Itinerary, AppError> {
        let now = Utc::now();
        let row: ItineraryRow = sqlx::query_as(&format!(
            "INSERT INTO itineraries (user_id, title, description, status, start_date, end_date, \
             trip_type, number_of_travelers, budget, preferences, destinations, accommodations, \
             transportation, activities, ai_recommendations, cultural_notes, weather_info, \
             safety_tips, bookings, payment_status, emergency_contacts, medical_info, \
             insurance_info, last_generated_at, total_cost, is_public, shared_with, created_at, \
             updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, \
             0, 0, '[]', ?, ?) \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(owner_id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.status)
        .bind(draft.start_date)
        .bind(draft.end_date)
        .bind(draft.trip_type)
        .bind(draft.number_of_travelers)
        .bind(draft.budget)
        .bind(Json(&draft.preferences))
        .bind(Json(&draft.destinations))
        .bind(Json(&draft.accommodations))
        .bind(Json(&draft.transportation))
        .bind(Json(&draft.activities))
        .bind(Json(&draft.details.ai_recommendations))
        .bind(Json(&draft.details.cultural_notes))
        .bind(Json(&draft.details.weather_info))
        .bind(Json(&draft.details.safety_tips))
        .bind(Json(&draft.details.bookings))
        .bind(Json(&draft.details.payment_status))
        .bind(Json(&draft.details.emergency_contacts))
        .bind(&draft.details.medical_info)
        .bind(Json(&draft.details.insurance_info))
        .bind(draft.details.last_generated_at)
        .bind(now)
        .bind(now)
        .fetch_one(&self.db)
        .await?;
        debug!(itinerary_id = row.id, owner_id, "itinerary created");
        Ok(row.into())
    }

    /// Writes every mutable column of `itinerary` back. Returns `false` when
    /// no row with that id belongs to the itinerary's owner.
    pub async fn update(&self, itinerary: &mut Itinerary) -> Result<bool, AppError> {
        itinerary.updated_at = Utc::now();
        let result = sqlx::query(
            "UPDATE itineraries SET title = ?, description = ?, status = ?, start_date = ?, \
             end_date = ?, trip_type = ?, number_of_travelers = ?, budget = ?, preferences = ?, \
             destinations = ?, accommodations = ?, transportation = ?, activities = ?, \
             ai_recommendations = ?, cultural_notes = ?, weather_info = ?, safety_tips = ?, \
             bookings = ?, payment_status = ?, emergency_contacts = ?, medical_info = ?, \
             insurance_info = ?, last_generated_at = ?, \
             total_cost = ?, is_public = ?, shared_with = ?, updated_at = ? \
             WHERE id = ? AND user_id = ?",
        )
        .bind(&itinerary.title)
        .bind(&itinerary.description)
        .bind(itinerary.status)
        .bind(itinerary.start_date)
        .bind(itinerary.end_date)
        .bind(itinerary.trip_type)
        .bind(itinerary.number_of_travelers)
        .bind(itinerary.budget)
        .bind(Json(&itinerary.preferences))
        .bind(Json(&itinerary.destinations))
        .bind(Json(&itinerary.accommodations))
        .bind(Json(&itinerary.transportation))
        .bind(Json(&itinerary.activities))
        .bind(Json(&itinerary.details.ai_recommendations))
        .bind(Json(&itinerary.details.cultural_notes))
        .bind(Json(&itinerary.details.weather_info))
        .bind(Json(&itinerary.details.safety_tips))
        .bind(Json(&itinerary.details.bookings))
        .bind(Json(&itinerary.details.payment_status))
        .bind(Json(&itinerary.details.emergency_contacts))
        .bind(&itinerary.details.medical_info)
        .bind(Json(&itinerary.details.insurance_info))
        .bind(itinerary.details.last_generated_at)
        .bind(itinerary.total_cost)
        .bind(itinerary.is_public)
        .bind(Json(&itinerary.shared_with))
        .bind(itinerary.updated_at)
        .bind(itinerary.id)
        .bind(itinerary.user_id)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, owner_id: i64, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM itineraries WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
