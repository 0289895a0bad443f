//! Date-keyed access to one user's daily records.
//!
//! Every calendar day maps to a single document under
//! `users/{user_id}/dailyData/{YYYY-MM-DD}`. Writes merge one field at a time;
//! reads return exactly what is stored, minus anything whose embedded date
//! does not match its key.

use crate::dates::{date_key, days_between};
use crate::models::{CalorieBurnEntry, DailyRecord, FoodItem, FoodLog, RecordField, WeightEntry};
use crate::storage::{DocumentStore, StoreResult};
use chrono::NaiveDate;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::{sync::broadcast::error::RecvError, task::AbortHandle};
use tracing::{debug, warn};

pub fn collection_path(user_id: &str) -> String {
    format!("users/{user_id}/dailyData")
}

#[derive(Clone)]
pub struct DailyRecords {
    store: DocumentStore,
    collection: String,
}

impl DailyRecords {
    pub fn new(store: DocumentStore, user_id: &str) -> Self {
        Self {
            store,
            collection: collection_path(user_id),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Creates the record with only `field` if none exists, otherwise
    /// overwrites that one field and leaves the others alone. Misdated data
    /// already stored at `date` is dropped first, as [`DailyRecords::read`]
    /// would.
    pub async fn write(&self, date: &str, field: RecordField) -> StoreResult<DailyRecord> {
        debug!(date, field = field.name(), "writing field");
        self.store
            .upsert(
                &self.collection,
                date,
                || DailyRecord::empty(date),
                |record| {
                    let stored = std::mem::replace(record, DailyRecord::empty(date));
                    if let Some(valid) = sanitize(date, stored) {
                        *record = valid;
                    }
                    record.set_field(field);
                },
            )
            .await
    }

    pub async fn save_weight(&self, date: &str, weight: f64) -> StoreResult<DailyRecord> {
        let entry = WeightEntry {
            date: date.to_string(),
            weight,
        };
        self.write(date, RecordField::Weight(entry)).await
    }

    pub async fn save_calories_burned(&self, date: &str, burned: u32) -> StoreResult<DailyRecord> {
        let entry = CalorieBurnEntry {
            date: date.to_string(),
            burned,
        };
        self.write(date, RecordField::Burned(entry)).await
    }

    /// Appends `item` after any items already logged for `date`.
    ///
    /// Two writers appending to the same day from separate processes can
    /// still lose an item: the last full-document write wins.
    pub async fn append_food_item(&self, date: &str, item: FoodItem) -> StoreResult<DailyRecord> {
        let mut items = self
            .read(date)
            .await
            .and_then(|record| record.food)
            .map(|food| food.items)
            .unwrap_or_default();
        items.push(item);

        let log = FoodLog {
            date: date.to_string(),
            items,
        };
        self.write(date, RecordField::Food(log)).await
    }

    /// The record for `date`, or `None` when nothing valid is stored there.
    pub async fn read(&self, date: &str) -> Option<DailyRecord> {
        let record = self.store.get(&self.collection, date).await?;
        sanitize(date, record)
    }

    /// Registers `callback` for changes to the record at `date`.
    ///
    /// The callback runs once with the current state and then after every
    /// change to that key. Must be called from within a tokio runtime.
    pub fn subscribe<F>(&self, date: &str, mut callback: F) -> Subscription
    where
        F: FnMut(Option<DailyRecord>) + Send + 'static,
    {
        let active = Arc::new(AtomicBool::new(true));
        // Take the receiver before the first read so no change slips between.
        let mut changes = self.store.changes();
        let records = self.clone();
        let key = date.to_string();
        let flag = Arc::clone(&active);

        let task = tokio::spawn(async move {
            let snapshot = records.read(&key).await;
            if !flag.load(Ordering::SeqCst) {
                return;
            }
            callback(snapshot);

            loop {
                match changes.recv().await {
                    Ok(change) if change.collection == records.collection && change.key == key => {}
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(date = %key, skipped, "subscription lagged, re-reading");
                    }
                    Err(RecvError::Closed) => break,
                }

                let snapshot = records.read(&key).await;
                if !flag.load(Ordering::SeqCst) {
                    break;
                }
                callback(snapshot);
            }
        });

        Subscription {
            active,
            task: task.abort_handle(),
        }
    }

    /// One point read per calendar day from `start` through `end`. Days with
    /// no record are left out; callers sort the result themselves.
    pub async fn range_read(&self, start: NaiveDate, end: NaiveDate) -> Vec<DailyRecord> {
        let mut records = Vec::new();
        for day in days_between(start, end) {
            if let Some(record) = self.read(&date_key(day)).await {
                records.push(record);
            }
        }
        records
    }
}

/// Cancellation handle returned by [`DailyRecords::subscribe`]. Dropping it
/// cancels as well.
pub struct Subscription {
    active: Arc<AtomicBool>,
    task: AbortHandle,
}

impl Subscription {
    pub fn cancel(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.task.abort();
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Drops a record filed under the wrong key, and any sub-entry whose own
/// date disagrees with the key.
pub(crate) fn sanitize(key: &str, mut record: DailyRecord) -> Option<DailyRecord> {
    if record.date != key {
        warn!(key, embedded = %record.date, "discarding record with mismatched date");
        return None;
    }
    if record.weight.as_ref().is_some_and(|entry| entry.date != key) {
        warn!(key, "discarding weight entry with mismatched date");
        record.weight = None;
    }
    if record.burned.as_ref().is_some_and(|entry| entry.date != key) {
        warn!(key, "discarding burned entry with mismatched date");
        record.burned = None;
    }
    if record.food.as_ref().is_some_and(|log| log.date != key) {
        warn!(key, "discarding food log with mismatched date");
        record.food = None;
    }
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    fn records() -> DailyRecords {
        DailyRecords::new(DocumentStore::in_memory(), "test-user")
    }

    fn item(name: &str, calories: f64) -> FoodItem {
        FoodItem {
            name: name.to_string(),
            calories,
            ..FoodItem::default()
        }
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<Option<DailyRecord>>) -> Option<DailyRecord> {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("callback not delivered")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn write_creates_record_with_only_that_field() {
        let records = records();
        let stored = records.save_weight("2024-06-01", 72.5).await.unwrap();

        assert_eq!(stored.date, "2024-06-01");
        assert_eq!(stored.weight.unwrap().weight, 72.5);
        assert!(stored.burned.is_none());
        assert!(stored.food.is_none());
    }

    #[tokio::test]
    async fn write_merges_into_existing_record() {
        let records = records();
        records.append_food_item("2024-06-01", item("oats", 150.0)).await.unwrap();
        records.save_calories_burned("2024-06-01", 400).await.unwrap();
        records.save_calories_burned("2024-06-01", 450).await.unwrap();

        let record = records.read("2024-06-01").await.unwrap();
        assert_eq!(record.food_items().len(), 1);
        assert_eq!(record.burned.unwrap().burned, 450);
    }

    #[tokio::test]
    async fn writing_one_date_leaves_other_dates_alone() {
        let records = records();
        records.save_weight("2024-06-02", 70.0).await.unwrap();
        records.save_calories_burned("2024-06-02", 200).await.unwrap();
        let before = records.read("2024-06-02").await;

        records.save_weight("2024-06-01", 71.0).await.unwrap();

        assert_eq!(records.read("2024-06-02").await, before);
    }

    #[tokio::test]
    async fn appended_food_items_keep_insertion_order() {
        let records = records();
        records.append_food_item("2024-06-01", item("eggs", 140.0)).await.unwrap();
        records.append_food_item("2024-06-01", item("toast", 90.0)).await.unwrap();

        let record = records.read("2024-06-01").await.unwrap();
        let names: Vec<&str> = record.food_items().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["eggs", "toast"]);
    }

    #[tokio::test]
    async fn read_reports_absent_days() {
        assert!(records().read("2024-06-01").await.is_none());
    }

    #[tokio::test]
    async fn read_discards_misfiled_records() {
        let records = records();
        records
            .store()
            .set(records.collection(), "2024-06-02", DailyRecord::empty("2024-06-01"))
            .await
            .unwrap();

        assert!(records.read("2024-06-02").await.is_none());
    }

    #[tokio::test]
    async fn write_over_misfiled_record_is_readable() {
        let records = records();
        let mut misfiled = DailyRecord::empty("2024-06-01");
        misfiled.burned = Some(CalorieBurnEntry {
            date: "2024-06-01".into(),
            burned: 500,
        });
        records
            .store()
            .set(records.collection(), "2024-06-02", misfiled)
            .await
            .unwrap();

        let stored = records.save_weight("2024-06-02", 70.0).await.unwrap();
        assert_eq!(stored.date, "2024-06-02");
        assert!(stored.burned.is_none());

        let read = records.read("2024-06-02").await.unwrap();
        assert_eq!(read.weight.unwrap().weight, 70.0);
        assert!(read.burned.is_none());
    }

    #[tokio::test]
    async fn append_drops_misdated_food_log() {
        let records = records();
        let mut record = DailyRecord::empty("2024-06-02");
        record.food = Some(FoodLog {
            date: "2024-05-30".into(),
            items: vec![item("stale", 300.0)],
        });
        records
            .store()
            .set(records.collection(), "2024-06-02", record)
            .await
            .unwrap();

        records.append_food_item("2024-06-02", item("fresh", 200.0)).await.unwrap();

        let read = records.read("2024-06-02").await.unwrap();
        let names: Vec<&str> = read.food_items().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["fresh"]);
    }

    #[tokio::test]
    async fn read_discards_sub_entry_with_wrong_date() {
        let records = records();
        let mut record = DailyRecord::empty("2024-06-02");
        record.weight = Some(WeightEntry {
            date: "2024-06-01".into(),
            weight: 80.0,
        });
        record.burned = Some(CalorieBurnEntry {
            date: "2024-06-02".into(),
            burned: 100,
        });
        records
            .store()
            .set(records.collection(), "2024-06-02", record)
            .await
            .unwrap();

        let read = records.read("2024-06-02").await.unwrap();
        assert!(read.weight.is_none());
        assert_eq!(read.burned.unwrap().burned, 100);
    }

    #[tokio::test]
    async fn subscription_delivers_current_state_then_changes() {
        let records = records();
        records.save_weight("2024-06-01", 70.0).await.unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = records.subscribe("2024-06-01", move |snapshot| {
            let _ = tx.send(snapshot);
        });

        let first = next(&mut rx).await.unwrap();
        assert_eq!(first.weight.unwrap().weight, 70.0);

        records.save_weight("2024-06-02", 10.0).await.unwrap();
        records.save_weight("2024-06-01", 69.5).await.unwrap();
        let second = next(&mut rx).await.unwrap();
        assert_eq!(second.weight.unwrap().weight, 69.5);

        subscription.cancel();
        assert!(!subscription.is_active());
    }

    #[tokio::test]
    async fn subscription_reports_misrouted_payload_as_absent() {
        let records = records();
        records
            .store()
            .set(records.collection(), "2024-06-03", DailyRecord::empty("2024-06-09"))
            .await
            .unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let _subscription = records.subscribe("2024-06-03", move |snapshot| {
            let _ = tx.send(snapshot);
        });

        assert!(next(&mut rx).await.is_none());
    }

    #[tokio::test]
    async fn cancelled_subscription_stops_callbacks() {
        let records = records();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = records.subscribe("2024-06-01", move |snapshot| {
            let _ = tx.send(snapshot);
        });
        assert!(next(&mut rx).await.is_none());

        subscription.cancel();
        records.save_weight("2024-06-01", 70.0).await.unwrap();

        let late = timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(matches!(late, Ok(None) | Err(_)));
    }

    #[tokio::test]
    async fn range_read_omits_missing_days() {
        let records = records();
        records.save_weight("2024-02-28", 70.0).await.unwrap();
        records.save_weight("2024-03-01", 69.0).await.unwrap();
        records.save_weight("2024-03-05", 68.0).await.unwrap();

        let start = NaiveDate::from_ymd_opt(2024, 2, 27).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut dates: Vec<String> = records
            .range_read(start, end)
            .await
            .into_iter()
            .map(|r| r.date)
            .collect();
        dates.sort();
        assert_eq!(dates, ["2024-02-28", "2024-03-01"]);
    }
}
