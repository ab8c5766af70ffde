use crate::errors::StoreError;
use crate::models::{AppData, Mood};
use std::path::Path;
use tokio::fs;
use tracing::{error, info};

const SEED_MOODS: [&str; 10] = [
    "Happy", "Sad", "Angry", "Shy", "Excited", "Neutral", "Romance", "Calm", "Awkward", "Silly",
];

/// Reads the journal document. A missing, unreadable or corrupt file yields a
/// fresh document; the reference moods are seeded whenever none exist.
pub async fn load_data(path: &Path) -> AppData {
    let mut data = match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!("failed to parse data file: {err}");
                AppData::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => AppData::default(),
        Err(err) => {
            error!("failed to read data file: {err}");
            AppData::default()
        }
    };

    if seed_moods(&mut data) {
        info!("seeded {} moods", data.moods.len());
    }
    data
}

pub fn seed_moods(data: &mut AppData) -> bool {
    if !data.moods.is_empty() {
        return false;
    }
    data.moods = SEED_MOODS
        .iter()
        .zip(1..)
        .map(|(name, id)| Mood {
            id,
            name: (*name).to_string(),
        })
        .collect();
    true
}

pub async fn persist_data(path: &Path, data: &AppData) -> Result<(), StoreError> {
    let payload = serde_json::to_vec_pretty(data)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    fs::write(path, payload).await?;
    Ok(())
}
