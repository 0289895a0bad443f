//! The user profile lives in its own small JSON file under a fixed key,
//! independent of the dated-record store.

use crate::storage::StoreResult;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{fs, sync::Mutex};
use tracing::error;

pub const PROFILE_KEY: &str = "userProfile";

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub age: u32,
    /// Kilograms.
    #[serde(default)]
    pub weight: f64,
    /// Centimetres.
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub target_weight: f64,
}

impl Profile {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("weight", self.weight),
            ("height", self.height),
            ("targetWeight", self.target_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{name} must be a non-negative number"));
            }
        }
        Ok(())
    }

    /// Body-mass index rounded to one decimal; 0 when height is unset.
    pub fn bmi(&self) -> f64 {
        if self.height <= 0.0 {
            return 0.0;
        }
        let meters = self.height / 100.0;
        (self.weight / (meters * meters) * 10.0).round() / 10.0
    }
}

pub fn bmi_category(bmi: f64) -> &'static str {
    if bmi <= 0.0 {
        "Not set"
    } else if bmi < 18.5 {
        "Underweight"
    } else if bmi < 25.0 {
        "Normal"
    } else if bmi < 30.0 {
        "Overweight"
    } else {
        "Obese"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    #[serde(flatten)]
    pub profile: Profile,
    pub bmi: f64,
    pub bmi_category: String,
}

impl From<Profile> for ProfileView {
    fn from(profile: Profile) -> Self {
        let bmi = profile.bmi();
        Self {
            profile,
            bmi,
            bmi_category: bmi_category(bmi).to_string(),
        }
    }
}

#[derive(Clone)]
pub struct ProfileStore {
    path: PathBuf,
    entries: Arc<Mutex<BTreeMap<String, Profile>>>,
}

impl ProfileStore {
    pub async fn open(path: PathBuf) -> Self {
        let entries = load_entries(&path).await;
        Self {
            path,
            entries: Arc::new(Mutex::new(entries)),
        }
    }

    pub async fn load(&self) -> Profile {
        let entries = self.entries.lock().await;
        entries.get(PROFILE_KEY).copied().unwrap_or_default()
    }

    pub async fn save(&self, profile: Profile) -> StoreResult<Profile> {
        let mut entries = self.entries.lock().await;
        let mut next = entries.clone();
        next.insert(PROFILE_KEY.to_string(), profile);

        let payload = serde_json::to_vec_pretty(&next)?;
        fs::write(&self.path, payload).await?;
        *entries = next;
        Ok(profile)
    }
}

async fn load_entries(path: &Path) -> BTreeMap<String, Profile> {
    match fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
            error!("failed to parse profile file: {err}");
            BTreeMap::new()
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
        Err(err) => {
            error!("failed to read profile file: {err}");
            BTreeMap::new()
        }
    }
}
