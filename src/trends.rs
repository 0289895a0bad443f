use crate::dates::date_key;
use crate::models::DailyRecord;
use crate::targets::{NutritionSummary, summarize};
use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendPeriod {
    #[default]
    #[serde(rename = "7days")]
    SevenDays,
    #[serde(rename = "month")]
    Month,
    #[serde(rename = "3months")]
    ThreeMonths,
}

impl FromStr for TrendPeriod {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "7days" => Ok(TrendPeriod::SevenDays),
            "month" => Ok(TrendPeriod::Month),
            "3months" => Ok(TrendPeriod::ThreeMonths),
            other => Err(format!("period must be '7days', 'month' or '3months', got '{other}'")),
        }
    }
}

impl TrendPeriod {
    /// First day of the window ending on `today`.
    pub fn start(self, today: NaiveDate) -> NaiveDate {
        match self {
            TrendPeriod::SevenDays => today - Duration::days(6),
            TrendPeriod::Month => today.checked_sub_months(Months::new(1)).unwrap_or(today),
            TrendPeriod::ThreeMonths => today.checked_sub_months(Months::new(3)).unwrap_or(today),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightPoint {
    pub date: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BurnedPoint {
    pub date: String,
    pub burned: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutritionPoint {
    pub date: String,
    #[serde(flatten)]
    pub totals: NutritionSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendSummary {
    pub latest_weight: Option<f64>,
    pub weight_change: Option<f64>,
    pub avg_burned: Option<f64>,
    pub avg_calories: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendsResponse {
    pub period: TrendPeriod,
    pub start_date: String,
    pub end_date: String,
    pub weight: Vec<WeightPoint>,
    pub burned: Vec<BurnedPoint>,
    pub nutrition: Vec<NutritionPoint>,
    pub summary: TrendSummary,
}

/// Chart series for the window ending on `today`. Records outside the window
/// are ignored; series come out sorted by date.
pub fn build_trends_at(
    today: NaiveDate,
    period: TrendPeriod,
    mut records: Vec<DailyRecord>,
) -> TrendsResponse {
    let start = date_key(period.start(today));
    let end = date_key(today);
    records.retain(|record| record.date >= start && record.date <= end);
    records.sort_by(|a, b| a.date.cmp(&b.date));

    let weight: Vec<WeightPoint> = records
        .iter()
        .filter_map(|record| {
            record.weight.as_ref().map(|entry| WeightPoint {
                date: record.date.clone(),
                weight: entry.weight,
            })
        })
        .collect();

    let burned: Vec<BurnedPoint> = records
        .iter()
        .filter_map(|record| {
            record.burned.as_ref().map(|entry| BurnedPoint {
                date: record.date.clone(),
                burned: entry.burned,
            })
        })
        .collect();

    let nutrition: Vec<NutritionPoint> = records
        .iter()
        .filter(|record| !record.food_items().is_empty())
        .map(|record| NutritionPoint {
            date: record.date.clone(),
            totals: summarize(record.food_items()),
        })
        .collect();

    let summary = TrendSummary {
        latest_weight: weight.last().map(|point| point.weight),
        weight_change: match (weight.first(), weight.last()) {
            (Some(first), Some(last)) if weight.len() > 1 => Some(last.weight - first.weight),
            _ => None,
        },
        avg_burned: average(burned.iter().map(|point| f64::from(point.burned))),
        avg_calories: average(nutrition.iter().map(|point| point.totals.calories)),
    };

    TrendsResponse {
        period,
        start_date: start,
        end_date: end,
        weight,
        burned,
        nutrition,
        summary,
    }
}

fn average(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0u32), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / f64::from(count))
}
