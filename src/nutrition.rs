//! Free-text food descriptions in, [`FoodItem`]s out, via an
//! OpenAI-compatible chat-completion endpoint.

use crate::config::OpenAiConfig;
use crate::models::FoodItem;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = concat!(
    "You are a nutrition expert. Analyze food descriptions and return ONLY valid JSON ",
    "with nutrition data. Always return a JSON object with these exact fields: ",
    "name (string), calories (number), protein (number in grams), carbs (number in grams), ",
    "fats (number in grams), fiber (number in grams). ",
    "Optionally include weight (string) if mentioned. ",
    "Do not include any text outside the JSON."
);

const TEMPERATURE: f32 = 0.3;

#[derive(Debug, Error)]
pub enum NutritionError {
    #[error("Food description is required")]
    MissingDescription,

    #[error("OpenAI API key is not configured")]
    MissingApiKey,

    #[error("Failed to reach OpenAI: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("OpenAI API error: {message}")]
    Upstream { status: u16, message: String },

    #[error("No response content from OpenAI")]
    EmptyResponse,

    #[error("Could not parse nutrition data: {0}")]
    InvalidContent(#[from] serde_json::Error),
}

impl NutritionError {
    /// Input problems the caller can fix, as opposed to configuration or
    /// upstream failures.
    pub fn is_validation(&self) -> bool {
        matches!(self, NutritionError::MissingDescription)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage; 2],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct UpstreamErrorBody {
    error: Option<UpstreamErrorDetail>,
}

#[derive(Deserialize)]
struct UpstreamErrorDetail {
    message: Option<String>,
}

#[derive(Clone)]
pub struct NutritionEstimator {
    config: OpenAiConfig,
    http_client: reqwest::Client,
}

impl NutritionEstimator {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    pub async fn estimate(&self, description: &str) -> Result<FoodItem, NutritionError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(NutritionError::MissingDescription);
        }
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(NutritionError::MissingApiKey)?;

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!(
                        "Analyze this food entry and return nutrition info as JSON: \
                         \"{description}\". Return only valid JSON with fields: name, \
                         calories, protein, carbs, fats, fiber, and optionally weight."
                    ),
                },
            ],
            temperature: TEMPERATURE,
            response_format: ResponseFormat { kind: "json_object" },
        };

        debug!(model = %self.config.model, "requesting nutrition estimate");
        let response = self
            .http_client
            .post(url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<UpstreamErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .and_then(|detail| detail.message)
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                });
            warn!(status = status.as_u16(), "nutrition upstream failed: {message}");
            return Err(NutritionError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        let completion: ChatResponse = serde_json::from_slice(&bytes)?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(NutritionError::EmptyResponse)?;

        food_item_from_content(&content, description)
    }
}

/// Builds a [`FoodItem`] from the model's JSON answer. Numeric fields that
/// are missing or not numbers become 0; a missing name falls back to the
/// description.
pub fn food_item_from_content(
    content: &str,
    description: &str,
) -> Result<FoodItem, NutritionError> {
    let data: Value = serde_json::from_str(content)?;

    let name = match data.get("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
        Some(Value::Number(number)) => number.to_string(),
        _ => description.to_string(),
    };

    let weight = match data.get("weight") {
        Some(Value::String(label)) if !label.trim().is_empty() => Some(label.trim().to_string()),
        Some(Value::Number(number)) if number.as_f64() != Some(0.0) => Some(number.to_string()),
        _ => None,
    };

    Ok(FoodItem {
        name,
        weight,
        calories: coerce_number(data.get("calories")),
        protein: coerce_number(data.get("protein")),
        carbs: coerce_number(data.get("carbs")),
        fats: coerce_number(data.get("fats")),
        fiber: coerce_number(data.get("fiber")),
    })
}

fn coerce_number(value: Option<&Value>) -> f64 {
    let number = match value {
        Some(Value::Number(number)) => number.as_f64().unwrap_or(0.0),
        Some(Value::String(text)) => text.trim().parse::<f64>().unwrap_or(0.0),
        Some(Value::Bool(true)) => 1.0,
        _ => 0.0,
    };
    if number.is_finite() { number.max(0.0) } else { 0.0 }
}
