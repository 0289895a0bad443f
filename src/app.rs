use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post, put},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/api/clear-data", post(handlers::clear_data))
        .route("/api/migrate", post(handlers::migrate))
        .route("/api/nutrition", post(handlers::estimate_nutrition))
        .route("/api/days/:date", get(handlers::get_day))
        .route("/api/days/:date/weight", put(handlers::put_weight))
        .route("/api/days/:date/burned", put(handlers::put_burned))
        .route("/api/days/:date/food", post(handlers::add_food))
        .route("/api/days/:date/summary", get(handlers::get_day_summary))
        .route("/api/range", get(handlers::get_range))
        .route("/api/trends", get(handlers::get_trends))
        .route("/api/profile", get(handlers::get_profile).put(handlers::put_profile))
        .with_state(state)
}
