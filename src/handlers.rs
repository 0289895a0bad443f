use crate::clear::clear_all;
use crate::dates::{parse_date_key, today};
use crate::errors::AppError;
use crate::migration::shift_dates_back;
use crate::models::{
    AdminResponse, BurnedRequest, DailyRecord, FoodItem, RangeQuery, TrendsQuery, WeightRequest,
};
use crate::profile::{Profile, ProfileView};
use crate::state::AppState;
use crate::targets::{DaySummary, day_summary};
use crate::trends::{TrendPeriod, TrendsResponse, build_trends_at};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{error, info};

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn clear_data(State(state): State<AppState>) -> (StatusCode, Json<AdminResponse>) {
    match clear_all(&state.records).await {
        Ok(deleted) => {
            info!(deleted, "cleared all daily data");
            (
                StatusCode::OK,
                Json(AdminResponse::ok("All data cleared successfully")),
            )
        }
        Err(err) => {
            error!("clear data failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AdminResponse::failed(err.to_string())),
            )
        }
    }
}

pub async fn migrate(State(state): State<AppState>) -> (StatusCode, Json<AdminResponse>) {
    match shift_dates_back(&state.records).await {
        Ok(_) => (
            StatusCode::OK,
            Json(AdminResponse::ok("Date migration completed successfully")),
        ),
        Err(err) => {
            error!("migration failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AdminResponse::failed(err.to_string())),
            )
        }
    }
}

pub async fn estimate_nutrition(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<FoodItem>, AppError> {
    let description = payload
        .ok()
        .and_then(|Json(body)| match body.get("foodDescription") {
            Some(Value::String(text)) if !text.trim().is_empty() => Some(text.clone()),
            _ => None,
        })
        .ok_or_else(|| AppError::bad_request("Food description is required"))?;

    let item = state.estimator.estimate(&description).await.map_err(|err| {
        error!("nutrition estimate failed: {err}");
        AppError::from(err)
    })?;
    Ok(Json(item))
}

pub async fn get_day(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<Option<DailyRecord>>, AppError> {
    parse_date(&date)?;
    Ok(Json(state.records.read(&date).await))
}

pub async fn put_weight(
    State(state): State<AppState>,
    Path(date): Path<String>,
    payload: Result<Json<WeightRequest>, JsonRejection>,
) -> Result<Json<DailyRecord>, AppError> {
    parse_date(&date)?;
    let Json(payload) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let weight = payload
        .weight
        .filter(|weight| weight.is_finite() && *weight > 0.0)
        .ok_or_else(|| AppError::bad_request("weight must be a positive number"))?;

    let record = state.records.save_weight(&date, weight).await?;
    Ok(Json(record))
}

pub async fn put_burned(
    State(state): State<AppState>,
    Path(date): Path<String>,
    payload: Result<Json<BurnedRequest>, JsonRejection>,
) -> Result<Json<DailyRecord>, AppError> {
    parse_date(&date)?;
    let Json(payload) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let burned = payload
        .burned
        .and_then(|burned| u32::try_from(burned).ok())
        .ok_or_else(|| AppError::bad_request("burned must be a non-negative whole number"))?;

    let record = state.records.save_calories_burned(&date, burned).await?;
    Ok(Json(record))
}

pub async fn add_food(
    State(state): State<AppState>,
    Path(date): Path<String>,
    payload: Result<Json<FoodItem>, JsonRejection>,
) -> Result<Json<DailyRecord>, AppError> {
    parse_date(&date)?;
    let Json(item) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let item = validate_food_item(item)?;

    let record = state.records.append_food_item(&date, item).await?;
    Ok(Json(record))
}

pub async fn get_day_summary(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<DaySummary>, AppError> {
    parse_date(&date)?;
    let record = state.records.read(&date).await;
    Ok(Json(day_summary(&date, record.as_ref())))
}

pub async fn get_range(
    State(state): State<AppState>,
    query: Result<Query<RangeQuery>, QueryRejection>,
) -> Result<Json<Vec<DailyRecord>>, AppError> {
    let Query(query) = query.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let start = parse_date(&query.start)?;
    let end = parse_date(&query.end)?;

    let mut records = state.records.range_read(start, end).await;
    records.sort_by(|a, b| a.date.cmp(&b.date));
    Ok(Json(records))
}

pub async fn get_trends(
    State(state): State<AppState>,
    query: Result<Query<TrendsQuery>, QueryRejection>,
) -> Result<Json<TrendsResponse>, AppError> {
    let Query(query) = query.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let period = match query.period.as_deref() {
        Some(value) => value.parse::<TrendPeriod>().map_err(AppError::bad_request)?,
        None => TrendPeriod::default(),
    };

    let today = today();
    let records = state.records.range_read(period.start(today), today).await;
    Ok(Json(build_trends_at(today, period, records)))
}

pub async fn get_profile(State(state): State<AppState>) -> Json<ProfileView> {
    Json(ProfileView::from(state.profiles.load().await))
}

pub async fn put_profile(
    State(state): State<AppState>,
    payload: Result<Json<Profile>, JsonRejection>,
) -> Result<Json<ProfileView>, AppError> {
    let Json(profile) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    profile.validate().map_err(AppError::bad_request)?;

    let saved = state.profiles.save(profile).await?;
    Ok(Json(ProfileView::from(saved)))
}

fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    parse_date_key(value)
        .ok_or_else(|| AppError::bad_request(format!("'{value}' is not a valid YYYY-MM-DD date")))
}

fn validate_food_item(item: FoodItem) -> Result<FoodItem, AppError> {
    let name = item.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::bad_request("food name is required"));
    }
    for (field, value) in [
        ("calories", item.calories),
        ("protein", item.protein),
        ("carbs", item.carbs),
        ("fats", item.fats),
        ("fiber", item.fiber),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(AppError::bad_request(format!("{field} must be a non-negative number")));
        }
    }

    Ok(FoodItem {
        name,
        weight: item
            .weight
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty()),
        ..item
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn food_item_validation_trims_and_rejects_negatives() {
        let item = validate_food_item(FoodItem {
            name: "  soup ".into(),
            weight: Some("   ".into()),
            calories: 120.0,
            ..FoodItem::default()
        })
        .unwrap();
        assert_eq!(item.name, "soup");
        assert!(item.weight.is_none());

        let negative = FoodItem {
            name: "soup".into(),
            fats: -1.0,
            ..FoodItem::default()
        };
        assert!(validate_food_item(negative).is_err());
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert!(parse_date("2024-02-30").is_err());
        assert!(parse_date("yesterday").is_err());
        assert!(parse_date("2024-02-29").is_ok());
    }
}
