//! Daily song store: one JSON object keyed by `YYYY-MM-DD`.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{DailyCollection, SongRequest};

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SongStore {
    path: PathBuf,
    days: BTreeMap<String, Vec<SongRequest>>,
}

impl SongStore {
    /// Open the store at `path`. A missing file is an empty store; a file
    /// that does not parse is an error, so it is never silently overwritten.
    pub fn open(path: &Path) -> Result<Self> {
        let days = if path.exists() {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read store {}", path.display()))?;
            if json.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&json)
                    .with_context(|| format!("Failed to parse store {}", path.display()))?
            }
        } else {
            info!("No store at {}, starting empty", path.display());
            BTreeMap::new()
        };

        let store = Self {
            path: path.to_path_buf(),
            days,
        };
        for key in store.days.keys() {
            if NaiveDate::parse_from_str(key, DATE_FORMAT).is_err() {
                warn!("Ignoring store key that is not a date: {}", key);
            }
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The songs stored for `date` (empty if none yet).
    pub fn collection(&self, date: NaiveDate) -> DailyCollection {
        let key = date.format(DATE_FORMAT).to_string();
        let songs = self.days.get(&key).cloned().unwrap_or_default();
        DailyCollection::with_songs(date, songs)
    }

    /// Replace the stored songs for the collection's date.
    pub fn replace(&mut self, collection: DailyCollection) {
        self.days.insert(collection.date_key(), collection.songs);
    }

    /// Dates with stored songs, oldest first.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.days
            .keys()
            .filter_map(|k| NaiveDate::parse_from_str(k, DATE_FORMAT).ok())
            .collect()
    }

    pub fn total_songs(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    /// Write the whole store: temp file next to the target, then rename.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(&self.days)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Status, StrategyId};
    use tempfile::tempdir;

    fn song(title: &str) -> SongRequest {
        let seen = NaiveDate::from_ymd_opt(2026, 10, 17)
            .unwrap()
            .and_hms_opt(20, 15, 0)
            .unwrap();
        SongRequest {
            title: title.to_string(),
            duration: Some("3:24".to_string()),
            requester: None,
            status: Some(Status::Playing),
            video_url: None,
            first_seen: seen,
            last_seen: seen,
            strategy: Some(StrategyId::StructuredRow),
        }
    }

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let store = SongStore::open(&dir.path().join("songs_data.json")).unwrap();
        assert_eq!(store.total_songs(), 0);
        assert!(store.dates().is_empty());
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("output").join("songs_data.json");
        let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();

        let mut store = SongStore::open(&path).unwrap();
        store.replace(DailyCollection::with_songs(date, vec![song("Believer"), song("Conga")]));
        store.save().unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = SongStore::open(&path).unwrap();
        assert_eq!(reopened.dates(), vec![date]);
        let day = reopened.collection(date);
        assert_eq!(day.len(), 2);
        assert_eq!(day.songs[0], song("Believer"));
        assert!(reopened
            .collection(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap())
            .is_empty());

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"2026-10-17\""));
        assert!(raw.contains("\"status\": \"playing\""));
    }

    #[test]
    fn test_corrupt_store_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("songs_data.json");
        fs::write(&path, "{not json").unwrap();
        assert!(SongStore::open(&path).is_err());
    }

    #[test]
    fn test_replace_is_per_day() {
        let dir = tempdir().unwrap();
        let mut store = SongStore::open(&dir.path().join("s.json")).unwrap();
        let d1 = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        store.replace(DailyCollection::with_songs(d1, vec![song("Conga")]));
        store.replace(DailyCollection::with_songs(d2, vec![song("Believer")]));
        store.replace(DailyCollection::with_songs(d2, vec![song("Believer"), song("Thunder")]));
        assert_eq!(store.total_songs(), 3);
        assert_eq!(store.dates(), vec![d1, d2]);
    }
}
