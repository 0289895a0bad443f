use crate::daily::DailyRecords;
use crate::nutrition::NutritionEstimator;
use crate::profile::ProfileStore;

#[derive(Clone)]
pub struct AppState {
    pub records: DailyRecords,
    pub profiles: ProfileStore,
    pub estimator: NutritionEstimator,
}

impl AppState {
    pub fn new(
        records: DailyRecords,
        profiles: ProfileStore,
        estimator: NutritionEstimator,
    ) -> Self {
        Self {
            records,
            profiles,
            estimator,
        }
    }
}
