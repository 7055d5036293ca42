use std::collections::{BTreeMap, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::storage::{KeyValueStore, RECORDS_KEY, StorageError};

pub const LEVEL_HISTORY_LIMIT: usize = 10;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub date: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moves: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LevelRecords {
    pub max_level: u32,
    pub high_score: u32,
    pub history: VecDeque<GameRecord>,
}

impl Default for LevelRecords {
    fn default() -> Self {
        LevelRecords {
            max_level: 1,
            high_score: 0,
            history: VecDeque::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecords {
    #[serde(default)]
    pub casual: BTreeMap<String, GameRecord>,
    #[serde(default)]
    pub level: LevelRecords,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// Lower time wins; equal time falls back to fewer moves.
pub fn is_better_casual(existing: Option<&GameRecord>, moves: u32, time_secs: u32) -> bool {
    let Some(existing) = existing else {
        return true;
    };
    match (existing.time, existing.moves) {
        (Some(old_time), Some(old_moves)) => {
            time_secs < old_time || (time_secs == old_time && moves < old_moves)
        }
        _ => true,
    }
}

pub struct RecordsStore {
    store: Box<dyn KeyValueStore>,
    records: GameRecords,
}

impl RecordsStore {
    pub fn load(store: Box<dyn KeyValueStore>) -> Self {
        let records = match read_snapshot(store.as_ref()) {
            Ok(Some(records)) => records,
            Ok(None) => GameRecords::default(),
            Err(err) => {
                warn!("discarding unreadable records snapshot: {err}");
                GameRecords::default()
            }
        };
        RecordsStore { store, records }
    }

    pub fn records(&self) -> &GameRecords {
        &self.records
    }

    pub fn best_casual(&self, difficulty_id: &str) -> Option<&GameRecord> {
        self.records.casual.get(difficulty_id)
    }

    pub fn record_casual(&mut self, difficulty_id: &str, moves: u32, time_secs: u32) -> bool {
        if !is_better_casual(self.records.casual.get(difficulty_id), moves, time_secs) {
            debug!(difficulty_id, moves, time_secs, "casual result did not beat the record");
            self.persist();
            return false;
        }
        self.records.casual.insert(
            difficulty_id.to_string(),
            GameRecord {
                date: now_millis(),
                moves: Some(moves),
                time: Some(time_secs),
                ..GameRecord::default()
            },
        );
        self.persist();
        true
    }

    pub fn record_level(&mut self, level: u32, score: u32) {
        let level_records = &mut self.records.level;
        level_records.max_level = level_records.max_level.max(level);
        level_records.high_score = level_records.high_score.max(score);
        level_records.history.push_back(GameRecord {
            date: now_millis(),
            score: Some(score),
            level: Some(level),
            ..GameRecord::default()
        });
        while level_records.history.len() > LEVEL_HISTORY_LIMIT {
            level_records.history.pop_front();
        }
        self.persist();
    }

    fn persist(&mut self) {
        if let Err(err) = write_snapshot(self.store.as_mut(), &self.records) {
            warn!("failed to persist records: {err}");
        }
    }
}

fn read_snapshot(store: &dyn KeyValueStore) -> Result<Option<GameRecords>, StorageError> {
    match store.get(RECORDS_KEY)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

fn write_snapshot(store: &mut dyn KeyValueStore, records: &GameRecords) -> Result<(), StorageError> {
    let raw = serde_json::to_string(records)?;
    store.set(RECORDS_KEY, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn casual(time: u32, moves: u32) -> GameRecord {
        GameRecord {
            date: 1,
            moves: Some(moves),
            time: Some(time),
            ..GameRecord::default()
        }
    }

    #[test]
    fn casual_replacement_policy() {
        let existing = casual(60, 20);
        assert!(is_better_casual(Some(&existing), 18, 60));
        assert!(!is_better_casual(Some(&existing), 5, 61));
        assert!(!is_better_casual(Some(&existing), 20, 60));
        assert!(is_better_casual(Some(&existing), 40, 59));
        assert!(is_better_casual(None, 99, 999));
    }

    #[test]
    fn casual_slot_only_improves() {
        let mut store = RecordsStore::load(Box::new(MemoryStore::new()));
        assert!(store.record_casual("hard", 20, 60));
        assert!(store.record_casual("hard", 18, 60));
        assert!(!store.record_casual("hard", 5, 61));
        let best = store.best_casual("hard").unwrap();
        assert_eq!((best.time, best.moves), (Some(60), Some(18)));
        assert!(store.best_casual("easy").is_none());
    }

    #[test]
    fn level_ratchets_and_bounded_history() {
        let mut store = RecordsStore::load(Box::new(MemoryStore::new()));
        store.record_level(2, 3000);
        store.record_level(1, 1200);
        assert_eq!(store.records().level.max_level, 2);
        assert_eq!(store.records().level.high_score, 3000);

        for level in 1..=12 {
            store.record_level(level, level * 100);
        }
        let history = &store.records().level.history;
        assert_eq!(history.len(), LEVEL_HISTORY_LIMIT);
        assert_eq!(history.front().unwrap().level, Some(3));
        assert_eq!(history.back().unwrap().level, Some(12));
        assert_eq!(store.records().level.max_level, 12);
    }

    #[test]
    fn snapshot_survives_reload() {
        let shared = MemoryStore::new();
        let mut store = RecordsStore::load(Box::new(shared.clone()));
        store.record_casual("easy", 12, 40);
        store.record_level(3, 4100);

        let raw = shared.get(RECORDS_KEY).unwrap().unwrap();
        assert!(raw.contains("\"maxLevel\":3"));
        assert!(raw.contains("\"highScore\":4100"));

        let reloaded = RecordsStore::load(Box::new(shared));
        assert_eq!(reloaded.records(), store.records());
    }

    #[test]
    fn corrupt_snapshot_falls_back_to_defaults() {
        let mut shared = MemoryStore::new();
        shared.set(RECORDS_KEY, "{not json").unwrap();
        let store = RecordsStore::load(Box::new(shared));
        assert_eq!(store.records(), &GameRecords::default());
        assert_eq!(store.records().level.max_level, 1);
    }
}
