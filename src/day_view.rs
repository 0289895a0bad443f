//! State behind the day screen: one selected date, kept current by a
//! subscription that is replaced whenever the selection changes.
//!
//! Switching dates can race a subscription that is still being set up or is
//! mid-delivery. Every delivery therefore carries the generation and date it
//! was registered for, and is dropped unless both still match.

use crate::daily::{DailyRecords, Subscription};
use crate::models::DailyRecord;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryToken {
    pub generation: u64,
    pub date: String,
}

#[derive(Debug)]
struct ViewState {
    generation: u64,
    selected: String,
    record: DailyRecord,
}

#[derive(Clone)]
pub struct DayView {
    records: DailyRecords,
    state: Arc<Mutex<ViewState>>,
    subscription: Arc<Mutex<Option<Subscription>>>,
}

impl DayView {
    /// A view showing an empty `date`; call [`DayView::select`] to start
    /// listening.
    pub fn new(records: DailyRecords, date: &str) -> Self {
        Self {
            records,
            state: Arc::new(Mutex::new(ViewState {
                generation: 0,
                selected: date.to_string(),
                record: DailyRecord::empty(date),
            })),
            subscription: Arc::new(Mutex::new(None)),
        }
    }

    /// Switches to `date`: cancels the previous subscription, resets the
    /// shown record, and subscribes to the new day.
    pub fn select(&self, date: &str) -> DeliveryToken {
        if let Some(previous) = lock(&self.subscription).take() {
            previous.cancel();
        }

        let token = {
            let mut state = lock(&self.state);
            state.generation += 1;
            state.selected = date.to_string();
            state.record = DailyRecord::empty(date);
            DeliveryToken {
                generation: state.generation,
                date: date.to_string(),
            }
        };

        let state = Arc::clone(&self.state);
        let delivery = token.clone();
        let subscription = self.records.subscribe(date, move |snapshot| {
            apply_to(&state, &delivery, snapshot);
        });
        *lock(&self.subscription) = Some(subscription);

        token
    }

    /// Applies a delivered snapshot. Returns `false`, leaving the state
    /// untouched, when the delivery no longer matches the selection.
    pub fn apply(&self, token: &DeliveryToken, snapshot: Option<DailyRecord>) -> bool {
        apply_to(&self.state, token, snapshot)
    }

    pub fn current(&self) -> DailyRecord {
        lock(&self.state).record.clone()
    }

    pub fn selected_date(&self) -> String {
        lock(&self.state).selected.clone()
    }

    pub fn generation(&self) -> u64 {
        lock(&self.state).generation
    }

    pub fn close(&self) {
        if let Some(subscription) = lock(&self.subscription).take() {
            subscription.cancel();
        }
    }
}

fn apply_to(
    state: &Mutex<ViewState>,
    token: &DeliveryToken,
    snapshot: Option<DailyRecord>,
) -> bool {
    let mut state = lock(state);
    if token.generation != state.generation || token.date != state.selected {
        debug!(
            delivered = %token.date,
            selected = %state.selected,
            "dropping stale delivery"
        );
        return false;
    }

    match snapshot {
        Some(record) if record.date == state.selected => state.record = record,
        Some(record) => {
            debug!(
                embedded = %record.date,
                selected = %state.selected,
                "dropping misrouted snapshot"
            );
            return false;
        }
        None => state.record = DailyRecord::empty(state.selected.clone()),
    }
    true
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
