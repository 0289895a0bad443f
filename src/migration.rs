//! One-off repair for records that were filed one day late: every dated
//! record moves to the previous calendar day.
//!
//! Not transactional. The first store error aborts the run and already
//! shifted records stay shifted. Running it twice moves populated records two
//! days back.

use crate::daily::{DailyRecords, sanitize};
use crate::dates::{date_key, is_date_key, parse_date_key, previous_day};
use crate::models::{DailyRecord, FoodLog};
use crate::storage::StoreResult;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub scanned: usize,
    pub moved: usize,
    pub merged: usize,
    pub skipped: usize,
}

pub async fn shift_dates_back(records: &DailyRecords) -> StoreResult<MigrationReport> {
    let store = records.store();
    let collection = records.collection();

    let mut documents: Vec<(String, DailyRecord)> = store
        .list(collection)
        .await
        .into_iter()
        .filter(|(key, _)| is_date_key(key))
        .collect();
    documents.sort_by(|a, b| a.0.cmp(&b.0));

    info!("starting date migration, {} documents to process", documents.len());

    let snapshot: BTreeMap<String, DailyRecord> = documents.iter().cloned().collect();
    // Days that already received a shifted record in this run hold corrected
    // data and are not moved again.
    let mut claimed: BTreeSet<String> = BTreeSet::new();
    let mut report = MigrationReport {
        scanned: documents.len(),
        ..MigrationReport::default()
    };

    for (key, record) in documents.into_iter().rev() {
        if claimed.contains(&key) {
            debug!(%key, "already holds migrated data, leaving in place");
            report.skipped += 1;
            continue;
        }
        let Some(record) = sanitize(&key, record) else {
            report.skipped += 1;
            continue;
        };
        if !record.has_data() {
            debug!(%key, "no data, skipping");
            report.skipped += 1;
            continue;
        }
        let Some(target_day) = parse_date_key(&key).and_then(previous_day) else {
            warn!(%key, "not a calendar date, skipping");
            report.skipped += 1;
            continue;
        };
        let target = date_key(target_day);
        let incoming = record.redate(&target);

        // A misfiled target is overwritten; misdated sub-entries are dropped.
        let existing = snapshot
            .get(&target)
            .cloned()
            .and_then(|record| sanitize(&target, record));
        let shifted = match existing {
            Some(existing) => {
                info!("merging {key} -> {target} (target exists)");
                report.merged += 1;
                merge_records(existing, incoming)
            }
            None => {
                info!("moving {key} -> {target}");
                report.moved += 1;
                incoming
            }
        };

        store.set(collection, &target, shifted).await?;
        claimed.insert(target.clone());

        if target != key {
            store.delete(collection, &key).await?;
        }
    }

    info!(
        scanned = report.scanned,
        moved = report.moved,
        merged = report.merged,
        skipped = report.skipped,
        "date migration complete"
    );
    Ok(report)
}

/// Weight and burned: incoming wins, else existing. Food: existing items
/// followed by incoming items, duplicates kept.
fn merge_records(existing: DailyRecord, incoming: DailyRecord) -> DailyRecord {
    let food = match (existing.food, incoming.food) {
        (Some(mut old), Some(new)) => {
            old.items.extend(new.items);
            Some(FoodLog {
                date: incoming.date.clone(),
                items: old.items,
            })
        }
        (old, new) => new.or(old),
    };

    DailyRecord {
        weight: incoming.weight.or(existing.weight),
        burned: incoming.burned.or(existing.burned),
        food,
        date: incoming.date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CalorieBurnEntry, FoodItem, WeightEntry};
    use crate::storage::{DocumentStore, StoreData};
    use serde_json::json;

    fn records() -> DailyRecords {
        DailyRecords::new(DocumentStore::in_memory(), "test-user")
    }

    fn item(name: &str) -> FoodItem {
        FoodItem {
            name: name.to_string(),
            calories: 100.0,
            ..FoodItem::default()
        }
    }

    async fn keys(records: &DailyRecords) -> Vec<String> {
        records
            .store()
            .list(records.collection())
            .await
            .into_iter()
            .map(|(key, _)| key)
            .collect()
    }

    #[tokio::test]
    async fn moves_record_to_previous_day() {
        let records = records();
        records.save_weight("2024-11-29", 70.0).await.unwrap();

        let report = shift_dates_back(&records).await.unwrap();

        assert_eq!(report.moved, 1);
        assert!(records.read("2024-11-29").await.is_none());
        let stored = records
            .store()
            .get(records.collection(), "2024-11-28")
            .await
            .unwrap();
        assert_eq!(
            serde_json::to_value(&stored).unwrap(),
            json!({"date": "2024-11-28", "weight": {"date": "2024-11-28", "weight": 70.0}})
        );
    }

    #[tokio::test]
    async fn merges_food_across_leap_day() {
        let records = records();
        records.append_food_item("2024-02-29", item("B")).await.unwrap();
        records.append_food_item("2024-03-01", item("A")).await.unwrap();

        let report = shift_dates_back(&records).await.unwrap();

        assert_eq!(report.merged, 1);
        assert!(records.read("2024-03-01").await.is_none());
        let merged = records.read("2024-02-29").await.unwrap();
        let names: Vec<&str> = merged.food_items().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["B", "A"]);
        assert_eq!(merged.food.unwrap().date, "2024-02-29");
    }

    #[tokio::test]
    async fn incoming_scalars_win_and_missing_ones_keep_existing() {
        let records = records();
        records.save_weight("2024-05-09", 80.0).await.unwrap();
        records.save_calories_burned("2024-05-09", 300).await.unwrap();
        records.save_weight("2024-05-10", 79.0).await.unwrap();

        shift_dates_back(&records).await.unwrap();

        let merged = records.read("2024-05-09").await.unwrap();
        assert_eq!(
            merged.weight,
            Some(WeightEntry {
                date: "2024-05-09".into(),
                weight: 79.0
            })
        );
        assert_eq!(
            merged.burned,
            Some(CalorieBurnEntry {
                date: "2024-05-09".into(),
                burned: 300
            })
        );
    }

    #[tokio::test]
    async fn crosses_year_boundary() {
        let records = records();
        records.save_calories_burned("2025-01-01", 250).await.unwrap();

        shift_dates_back(&records).await.unwrap();

        assert_eq!(keys(&records).await, ["2024-12-31"]);
    }

    #[tokio::test]
    async fn empty_store_is_a_no_op_twice() {
        let records = records();
        let first = shift_dates_back(&records).await.unwrap();
        let second = shift_dates_back(&records).await.unwrap();

        assert_eq!(first, MigrationReport::default());
        assert_eq!(second, MigrationReport::default());
        assert!(keys(&records).await.is_empty());
    }

    #[tokio::test]
    async fn second_run_shifts_populated_records_again() {
        let records = records();
        records.save_weight("2024-11-29", 70.0).await.unwrap();

        shift_dates_back(&records).await.unwrap();
        shift_dates_back(&records).await.unwrap();

        assert_eq!(keys(&records).await, ["2024-11-27"]);
        let record = records.read("2024-11-27").await.unwrap();
        assert_eq!(record.weight.unwrap().date, "2024-11-27");
    }

    #[tokio::test]
    async fn records_without_data_and_foreign_keys_stay_put() {
        let records = records();
        let store = records.store();
        let mut empty_food = DailyRecord::empty("2024-04-02");
        empty_food.food = Some(FoodLog {
            date: "2024-04-02".into(),
            items: vec![],
        });
        store.set(records.collection(), "2024-04-02", empty_food).await.unwrap();
        store
            .set(records.collection(), "settings", DailyRecord::empty("settings"))
            .await
            .unwrap();

        let report = shift_dates_back(&records).await.unwrap();

        assert_eq!(report.scanned, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(keys(&records).await, ["2024-04-02", "settings"]);
    }

    #[tokio::test]
    async fn consecutive_days_lose_no_data() {
        let records = records();
        records.append_food_item("2024-07-03", item("late")).await.unwrap();
        records.append_food_item("2024-07-02", item("early")).await.unwrap();

        shift_dates_back(&records).await.unwrap();

        assert_eq!(keys(&records).await, ["2024-07-02"]);
        let record = records.read("2024-07-02").await.unwrap();
        let names: Vec<&str> = record.food_items().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["early", "late"]);
    }

    #[tokio::test]
    async fn misdated_entries_are_not_revived_by_the_shift() {
        let records = records();
        let mut source = DailyRecord::empty("2024-06-02");
        source.weight = Some(WeightEntry {
            date: "2023-01-01".into(),
            weight: 99.0,
        });
        source.burned = Some(CalorieBurnEntry {
            date: "2024-06-02".into(),
            burned: 200,
        });
        let store = records.store();
        store.set(records.collection(), "2024-06-02", source).await.unwrap();

        shift_dates_back(&records).await.unwrap();

        let shifted = records.read("2024-06-01").await.unwrap();
        assert!(shifted.weight.is_none());
        assert_eq!(shifted.burned.unwrap().burned, 200);
    }

    #[tokio::test]
    async fn misfiled_source_stays_and_misfiled_target_is_replaced() {
        let records = records();
        let store = records.store();
        let mut misfiled = DailyRecord::empty("2023-03-03");
        misfiled.weight = Some(WeightEntry {
            date: "2023-03-03".into(),
            weight: 50.0,
        });
        store
            .set(records.collection(), "2024-08-10", misfiled.clone())
            .await
            .unwrap();
        store.set(records.collection(), "2024-08-04", misfiled).await.unwrap();
        records.save_weight("2024-08-05", 81.0).await.unwrap();

        let report = shift_dates_back(&records).await.unwrap();

        assert_eq!(report.moved, 1);
        assert_eq!(report.merged, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(keys(&records).await, ["2024-08-04", "2024-08-10"]);
        let moved = records.read("2024-08-04").await.unwrap();
        assert_eq!(moved.weight.unwrap().weight, 81.0);
        assert!(records.read("2024-08-10").await.is_none());
    }

    #[tokio::test]
    async fn store_failure_aborts_and_surfaces_error() {
        let collection = crate::daily::collection_path("test-user");
        let mut record = DailyRecord::empty("2024-11-29");
        record.weight = Some(WeightEntry {
            date: "2024-11-29".into(),
            weight: 70.0,
        });
        let mut data = StoreData::default();
        data.collections
            .entry(collection.clone())
            .or_default()
            .insert("2024-11-29".into(), record);

        let unwritable = std::env::temp_dir()
            .join("health_tracker_no_such_dir")
            .join("state.json");
        let records = DailyRecords::new(DocumentStore::new(unwritable, data), "test-user");

        assert!(shift_dates_back(&records).await.is_err());
        assert!(records.read("2024-11-29").await.is_some());
        assert!(records.read("2024-11-28").await.is_none());
    }
}
