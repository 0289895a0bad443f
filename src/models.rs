use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub date: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalorieBurnEntry {
    pub date: String,
    pub burned: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FoodItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
    pub fiber: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodLog {
    pub date: String,
    #[serde(default)]
    pub items: Vec<FoodItem>,
}

/// One document per calendar day. Absent sub-entries are omitted from the
/// stored JSON entirely, never written as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<WeightEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub burned: Option<CalorieBurnEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food: Option<FoodLog>,
}

impl DailyRecord {
    pub fn empty(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            weight: None,
            burned: None,
            food: None,
        }
    }

    /// True when the record carries weight, burned calories, or at least one
    /// food item.
    pub fn has_data(&self) -> bool {
        self.weight.is_some()
            || self.burned.is_some()
            || self.food.as_ref().is_some_and(|food| !food.items.is_empty())
    }

    pub fn food_items(&self) -> &[FoodItem] {
        self.food.as_ref().map(|food| food.items.as_slice()).unwrap_or(&[])
    }

    /// Rewrites the record and every embedded sub-entry date to `date`.
    pub fn redate(mut self, date: &str) -> Self {
        self.date = date.to_string();
        if let Some(weight) = self.weight.as_mut() {
            weight.date = date.to_string();
        }
        if let Some(burned) = self.burned.as_mut() {
            burned.date = date.to_string();
        }
        if let Some(food) = self.food.as_mut() {
            food.date = date.to_string();
        }
        self
    }

    pub fn set_field(&mut self, field: RecordField) {
        match field {
            RecordField::Weight(entry) => self.weight = Some(entry),
            RecordField::Burned(entry) => self.burned = Some(entry),
            RecordField::Food(log) => self.food = Some(log),
        }
    }
}

/// A single sub-entry of a [`DailyRecord`], the unit of a merge-write.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordField {
    Weight(WeightEntry),
    Burned(CalorieBurnEntry),
    Food(FoodLog),
}

impl RecordField {
    pub fn name(&self) -> &'static str {
        match self {
            RecordField::Weight(_) => "weight",
            RecordField::Burned(_) => "burned",
            RecordField::Food(_) => "food",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct WeightRequest {
    pub weight: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct BurnedRequest {
    pub burned: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    pub period: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AdminResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
