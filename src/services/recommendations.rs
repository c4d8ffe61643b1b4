use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::{config::AiConfig, error::AppError};

use super::upstream::{build_http, send_json};

const SERVICE: &str = "recommendation";
pub const DEFAULT_BUDGET: &str = "mid-range";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default = "default_budget")]
    pub budget: String,
}

fn default_budget() -> String {
    DEFAULT_BUDGET.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub recommendations: String,
    pub based_on: Preferences,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Clone)]
pub struct RecommendationClient {
    http: reqwest::Client,
    config: AiConfig,
}

impl RecommendationClient {
    pub fn new(config: AiConfig) -> Result<Self, AppError> {
        let http = build_http(SERVICE, config.timeout)?;
        Ok(Self { http, config })
    }

    pub async fn recommend(&self, preferences: Preferences) -> Result<Recommendations, AppError> {
        info!(
            interests = ?preferences.interests,
            budget = %preferences.budget,
            "generating recommendations"
        );
        let text = self.generate(&build_prompt(&preferences)).await?;
        Ok(Recommendations {
            recommendations: text,
            based_on: preferences,
        })
    }

    /// Sends a single-turn prompt and returns the first candidate's text.
    pub async fn generate(&self, prompt: &str) -> Result<String, AppError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url, self.config.model
        );
        let request = self
            .http
            .post(url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&json!({ "contents": [{ "parts": [{ "text": prompt }] }] }));
        let response: GenerateResponse = send_json(SERVICE, request).await?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AppError::upstream(SERVICE, "no candidates in response"))?
            .content
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .map(|text| text.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(AppError::upstream(SERVICE, "no text in response"));
        }
        Ok(text)
    }
}

fn build_prompt(preferences: &Preferences) -> String {
    let interests = if preferences.interests.is_empty() {
        "open to anything".to_string()
    } else {
        preferences.interests.join(", ")
    };
    format!(
        "Generate personalized travel recommendations for a traveller with:\n\
         - Interests: {interests}\n\
         - Budget: {budget}\n\n\
         Include:\n\
         1. Top 3 destinations and what makes each one special.\n\
         2. Why they match the traveller's interests, with historical or cultural detail.\n\
         3. Budget tips: local transport, affordable dining, bargaining.\n\
         4. Cultural highlights such as traditions, festivals and local experiences.\n\
         5. Tours, dining options and activities that fit these preferences.",
        budget = preferences.budget,
    )
}
