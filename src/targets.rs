//! Daily nutrition totals and how they compare to the default targets.

use crate::models::{DailyRecord, FoodItem};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionTargets {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

impl Default for NutritionTargets {
    fn default() -> Self {
        Self {
            calories: 1800.0,
            protein: 100.0,
            carbs: 180.0,
            fats: 55.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionSummary {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
    pub fiber: f64,
}

impl From<&FoodItem> for NutritionSummary {
    fn from(item: &FoodItem) -> Self {
        Self {
            calories: item.calories,
            protein: item.protein,
            carbs: item.carbs,
            fats: item.fats,
            fiber: item.fiber,
        }
    }
}

impl std::ops::Add for NutritionSummary {
    type Output = NutritionSummary;

    fn add(self, other: NutritionSummary) -> NutritionSummary {
        NutritionSummary {
            calories: self.calories + other.calories,
            protein: self.protein + other.protein,
            carbs: self.carbs + other.carbs,
            fats: self.fats + other.fats,
            fiber: self.fiber + other.fiber,
        }
    }
}

impl std::iter::Sum for NutritionSummary {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(NutritionSummary::default(), |acc, n| acc + n)
    }
}

pub fn summarize(items: &[FoodItem]) -> NutritionSummary {
    items.iter().map(NutritionSummary::from).sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Progress {
    Below,
    OnTarget,
    Above,
}

/// Within 95-105% of the target counts as on target.
pub fn progress(current: f64, target: f64) -> Progress {
    if target <= 0.0 {
        return if current <= 0.0 { Progress::Below } else { Progress::Above };
    }
    let percentage = current / target * 100.0;
    if percentage < 95.0 {
        Progress::Below
    } else if percentage <= 105.0 {
        Progress::OnTarget
    } else {
        Progress::Above
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroProgress {
    pub calories: Progress,
    pub protein: Progress,
    pub carbs: Progress,
    pub fats: Progress,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: String,
    pub eaten: NutritionSummary,
    pub burned: u32,
    pub net_calories: f64,
    pub targets: NutritionTargets,
    pub progress: MacroProgress,
}

/// Summary for a day; a missing record reads as an empty day.
pub fn day_summary(date: &str, record: Option<&DailyRecord>) -> DaySummary {
    let eaten = record.map(|r| summarize(r.food_items())).unwrap_or_default();
    let burned = record
        .and_then(|r| r.burned.as_ref())
        .map(|entry| entry.burned)
        .unwrap_or(0);
    let targets = NutritionTargets::default();

    DaySummary {
        date: date.to_string(),
        net_calories: eaten.calories - f64::from(burned),
        progress: MacroProgress {
            calories: progress(eaten.calories, targets.calories),
            protein: progress(eaten.protein, targets.protein),
            carbs: progress(eaten.carbs, targets.carbs),
            fats: progress(eaten.fats, targets.fats),
        },
        eaten,
        burned,
        targets,
    }
}
