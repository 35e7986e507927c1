//! Persisted, deduplicated leaderboard.
//!
//! The whole board is one JSON array stored under [`LEADERBOARD_KEY`]. Every
//! submit re-reads that blob, merges the new run, and writes it back; two
//! processes writing at once resolve as last-write-wins.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use race_core::model::{GameSettings, LeaderboardEntry};
use tracing::{debug, warn};

use crate::repository::{KeyValueStore, StorageError};

/// Namespaced key of the persisted board.
pub const LEADERBOARD_KEY: &str = "hamster-space-race/leaderboard";

/// Result of a submit.
///
/// The in-memory board is always updated; `persist_error` is set when the
/// backend write failed and the change only lives in this process.
#[derive(Debug)]
pub struct SubmitReceipt {
    pub ranked: Vec<LeaderboardEntry>,
    pub persist_error: Option<StorageError>,
}

impl SubmitReceipt {
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.persist_error.is_none()
    }
}

/// Fake network delays applied before reads and writes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulatedLatency {
    pub read: Duration,
    pub write: Duration,
}

impl SimulatedLatency {
    /// Delays of the hosted demo board.
    #[must_use]
    pub fn hosted() -> Self {
        Self {
            read: Duration::from_millis(300),
            write: Duration::from_millis(200),
        }
    }
}

/// Ranked run results shared by every play session.
pub struct LeaderboardStore {
    backend: Arc<dyn KeyValueStore>,
    entries: Mutex<Vec<LeaderboardEntry>>,
    default_limit: usize,
    duplicate_window_ms: u64,
    latency: SimulatedLatency,
}

impl LeaderboardStore {
    /// Store with an empty cache. Call [`LeaderboardStore::reload`] or use
    /// [`LeaderboardStore::open`] to read what is persisted.
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend,
            entries: Mutex::new(Vec::new()),
            default_limit: GameSettings::DEFAULT_LEADERBOARD_LIMIT,
            duplicate_window_ms: GameSettings::DEFAULT_DUPLICATE_WINDOW_MS,
            latency: SimulatedLatency::default(),
        }
    }

    /// Build a store and load the persisted board.
    pub async fn open(backend: Arc<dyn KeyValueStore>, settings: &GameSettings) -> Self {
        let store = Self::new(backend).with_settings(settings);
        store.reload().await;
        store
    }

    #[must_use]
    pub fn with_settings(mut self, settings: &GameSettings) -> Self {
        self.default_limit = settings.leaderboard_limit();
        self.duplicate_window_ms = settings.duplicate_window_ms();
        self
    }

    #[must_use]
    pub fn with_latency(mut self, latency: SimulatedLatency) -> Self {
        self.latency = latency;
        self
    }

    #[must_use]
    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    /// Replace the cache with the persisted board.
    ///
    /// A failed read keeps the current cache; unreadable data counts as empty.
    pub async fn reload(&self) {
        match self.read_persisted().await {
            Ok(entries) => *self.cache() = entries,
            Err(err) => warn!(error = %err, "leaderboard read failed, using cached board"),
        }
    }

    /// Entries sorted fastest first, cut to `limit`.
    pub async fn get_ranked(&self, limit: usize) -> Vec<LeaderboardEntry> {
        pause(self.latency.read).await;
        rank_entries(self.cache().clone(), limit)
    }

    /// [`LeaderboardStore::get_ranked`] with the configured limit.
    pub async fn top(&self) -> Vec<LeaderboardEntry> {
        self.get_ranked(self.default_limit).await
    }

    /// Insert or replace a run's entry and persist the board.
    ///
    /// Resubmitting a run id replaces its entry. Older rows from the same
    /// player with the same question counts and a time within the duplicate
    /// window are dropped before the insert.
    ///
    /// If the persisted board cannot be read, the entry is merged into the
    /// cache only and nothing is written; the read error is reported as the
    /// receipt's `persist_error`.
    pub async fn submit(&self, entry: LeaderboardEntry) -> SubmitReceipt {
        pause(self.latency.write).await;

        let (base, read_error) = match self.read_persisted().await {
            Ok(entries) => (entries, None),
            Err(err) => (self.cache().clone(), Some(err)),
        };

        let merged = merge_submission(base, entry, self.duplicate_window_ms);
        *self.cache() = merged.clone();

        let persist_error = match read_error {
            Some(err) => {
                warn!(error = %err, "leaderboard read failed, board not written");
                Some(err)
            }
            None => {
                let written = match encode_entries(&merged) {
                    Ok(blob) => self.backend.put(LEADERBOARD_KEY, &blob).await.err(),
                    Err(e) => Some(e),
                };
                if let Some(err) = &written {
                    warn!(error = %err, "leaderboard write failed, keeping in-memory board");
                }
                written
            }
        };

        SubmitReceipt {
            ranked: rank_entries(merged, self.default_limit),
            persist_error,
        }
    }

    /// Drop every entry, in memory and in the backend.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    pub async fn clear(&self) -> Result<(), StorageError> {
        self.cache().clear();
        self.backend.remove(LEADERBOARD_KEY).await
    }

    async fn read_persisted(&self) -> Result<Vec<LeaderboardEntry>, StorageError> {
        Ok(match self.backend.get(LEADERBOARD_KEY).await? {
            Some(blob) => dedupe_entries(decode_entries(&blob)),
            None => Vec::new(),
        })
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, Vec<LeaderboardEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Decode a persisted blob. Anything that is not a JSON array is an empty
/// board; array items that do not parse as entries are skipped.
#[must_use]
pub fn decode_entries(blob: &str) -> Vec<LeaderboardEntry> {
    let value: serde_json::Value = match serde_json::from_str(blob) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "leaderboard blob is not JSON, treating as empty");
            return Vec::new();
        }
    };
    let serde_json::Value::Array(items) = value else {
        warn!("leaderboard blob is not an array, treating as empty");
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<LeaderboardEntry>(item) {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!(error = %err, "skipping unreadable leaderboard entry");
                None
            }
        })
        .collect()
}

/// # Errors
///
/// Returns `StorageError::Serialization` if the entries cannot be encoded.
pub fn encode_entries(entries: &[LeaderboardEntry]) -> Result<String, StorageError> {
    serde_json::to_string(entries).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Keep one entry per dedupe key, the latest occurrence winning, in order.
#[must_use]
pub fn dedupe_entries(entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    let mut seen = HashSet::with_capacity(entries.len());
    let mut kept: Vec<LeaderboardEntry> = entries
        .into_iter()
        .rev()
        .filter(|entry| seen.insert(entry.dedupe_key()))
        .collect();
    kept.reverse();
    kept
}

/// Fastest first; ties keep their stored order.
#[must_use]
pub fn rank_entries(mut entries: Vec<LeaderboardEntry>, limit: usize) -> Vec<LeaderboardEntry> {
    entries.sort_by_key(|entry| entry.time_ms);
    entries.truncate(limit);
    entries
}

fn merge_submission(
    mut base: Vec<LeaderboardEntry>,
    entry: LeaderboardEntry,
    window_ms: u64,
) -> Vec<LeaderboardEntry> {
    base.retain(|existing| {
        let same_run = entry.run_id.is_some() && existing.run_id == entry.run_id;
        !same_run && !existing.resembles(&entry, window_ms)
    });
    base.push(entry);
    dedupe_entries(base)
}

/// The racers a fresh demo board starts with. None of them carry a run id.
#[must_use]
pub fn demo_racers() -> Vec<LeaderboardEntry> {
    const RACERS: [(&str, u64, u32); 28] = [
        ("Luna", 90_000, 23),
        ("Cosmo", 120_000, 25),
        ("Star", 135_000, 27),
        ("Nova", 150_000, 29),
        ("Orbit", 180_000, 31),
        ("Astro", 195_000, 24),
        ("Galaxy", 210_000, 26),
        ("Rocket", 225_000, 28),
        ("Comet", 240_000, 30),
        ("Meteor", 255_000, 32),
        ("Nebula", 270_000, 25),
        ("Stellar", 285_000, 27),
        ("Eclipse", 300_000, 29),
        ("Pulsar", 315_000, 31),
        ("Quasar", 330_000, 33),
        ("Saturn", 345_000, 35),
        ("Jupiter", 360_000, 28),
        ("Mars", 375_000, 30),
        ("Venus", 390_000, 32),
        ("Mercury", 405_000, 34),
        ("Neptune", 420_000, 36),
        ("Uranus", 435_000, 38),
        ("Pluto", 450_000, 40),
        ("Sirius", 465_000, 42),
        ("Vega", 480_000, 44),
        ("Polaris", 495_000, 46),
        ("Andromeda", 510_000, 48),
        ("Cassiopeia", 525_000, 50),
    ];
    RACERS
        .iter()
        .map(|(name, time_ms, total)| LeaderboardEntry::legacy(*name, *time_ms, *total, 23))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryKeyValueStore;
    use async_trait::async_trait;
    use race_core::model::RunId;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn run(id: &str) -> RunId {
        id.parse().unwrap()
    }

    fn store() -> (InMemoryKeyValueStore, LeaderboardStore) {
        let backend = InMemoryKeyValueStore::new();
        let store = LeaderboardStore::new(Arc::new(backend.clone()));
        (backend, store)
    }

    #[tokio::test]
    async fn empty_store_ranks_nothing() {
        let (_, store) = store();
        store.reload().await;
        assert!(store.get_ranked(30).await.is_empty());
    }

    #[tokio::test]
    async fn same_run_id_is_replaced() {
        let (_, store) = store();
        store
            .submit(LeaderboardEntry::new(run("r1"), "Luna", 90_000, 23, 23))
            .await;
        let receipt = store
            .submit(LeaderboardEntry::new(run("r1"), "Luna", 95_000, 25, 23))
            .await;

        assert!(receipt.is_persisted());
        assert_eq!(receipt.ranked.len(), 1);
        assert_eq!(receipt.ranked[0].time_ms, 95_000);
        assert_eq!(receipt.ranked[0].total_questions, 25);
    }

    #[tokio::test]
    async fn identical_resubmission_keeps_length() {
        let (_, store) = store();
        let entry = LeaderboardEntry::new(run("r7"), "Comet", 240_000, 30, 23);
        let first = store.submit(entry.clone()).await;
        let second = store.submit(entry).await;
        assert_eq!(first.ranked.len(), second.ranked.len());
        assert_eq!(store.get_ranked(30).await.len(), 1);
    }

    #[tokio::test]
    async fn near_duplicate_from_same_player_is_merged() {
        let (_, store) = store();
        store
            .submit(LeaderboardEntry::legacy("Nova", 150_000, 29, 23))
            .await;
        let receipt = store
            .submit(LeaderboardEntry::new(run("r2"), "Nova", 151_500, 29, 23))
            .await;
        assert_eq!(receipt.ranked.len(), 1);
        assert_eq!(receipt.ranked[0].run_id, Some(run("r2")));
    }

    #[tokio::test]
    async fn different_players_are_kept_apart() {
        let (_, store) = store();
        store
            .submit(LeaderboardEntry::new(run("a"), "Nova", 150_000, 29, 23))
            .await;
        let receipt = store
            .submit(LeaderboardEntry::new(run("b"), "Vega", 150_100, 29, 23))
            .await;
        assert_eq!(receipt.ranked.len(), 2);
    }

    #[tokio::test]
    async fn ranked_is_sorted_and_limited() {
        let (_, store) = store();
        for (i, time) in [300_000_u64, 90_000, 150_000, 120_000].iter().enumerate() {
            store
                .submit(LeaderboardEntry::new(
                    run(&format!("r{i}")),
                    format!("P{i}"),
                    *time,
                    23,
                    23,
                ))
                .await;
        }
        let top = store.get_ranked(3).await;
        let times: Vec<u64> = top.iter().map(|e| e.time_ms).collect();
        assert_eq!(times, vec![90_000, 120_000, 150_000]);
    }

    #[tokio::test]
    async fn submit_persists_under_fixed_key() {
        let (backend, store) = store();
        store
            .submit(LeaderboardEntry::new(run("r1"), "Luna", 90_000, 23, 23))
            .await;

        let blob = backend.get(LEADERBOARD_KEY).await.unwrap().unwrap();
        assert_eq!(decode_entries(&blob).len(), 1);

        let reopened =
            LeaderboardStore::open(Arc::new(backend.clone()), &GameSettings::default()).await;
        assert_eq!(reopened.top().await.len(), 1);
    }

    #[tokio::test]
    async fn malformed_blobs_load_as_empty() {
        for blob in ["not json", r#"{"runId":"x"}"#, "42", "null"] {
            let (backend, store) = store();
            backend.put(LEADERBOARD_KEY, blob).await.unwrap();
            store.reload().await;
            assert!(store.top().await.is_empty(), "blob {blob:?}");
        }
    }

    #[tokio::test]
    async fn bad_items_are_skipped() {
        let (backend, store) = store();
        backend
            .put(
                LEADERBOARD_KEY,
                r#"[{"name":"Luna","timeMs":90000,"totalQuestions":23,"correctAnswers":23},{"timeMs":"soon"},7]"#,
            )
            .await
            .unwrap();
        store.reload().await;
        let top = store.top().await;
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].player_name, "Luna");
    }

    #[tokio::test]
    async fn load_dedupes_persisted_duplicates() {
        let (backend, store) = store();
        let entries = vec![
            LeaderboardEntry::new(run("r1"), "Luna", 90_000, 23, 23),
            LeaderboardEntry::legacy("Star", 135_000, 27, 23),
            LeaderboardEntry::legacy("Star", 135_000, 27, 23),
            LeaderboardEntry::new(run("r1"), "Luna", 91_000, 23, 23),
        ];
        backend
            .put(LEADERBOARD_KEY, &encode_entries(&entries).unwrap())
            .await
            .unwrap();
        store.reload().await;

        let top = store.top().await;
        assert_eq!(top.len(), 2);
        assert!(top.iter().any(|e| e.time_ms == 91_000));
    }

    #[tokio::test]
    async fn demo_board_has_luna_on_top() {
        let (_, store) = store();
        for racer in demo_racers() {
            store.submit(racer).await;
        }
        let top = store.top().await;
        assert_eq!(top.len(), 28);
        assert_eq!(top[0].player_name, "Luna");
    }

    /// Backend whose reads can be switched off; writes always succeed.
    #[derive(Clone, Default)]
    struct UnreadableStore {
        inner: InMemoryKeyValueStore,
        fail_reads: Arc<AtomicBool>,
    }

    #[async_trait]
    impl KeyValueStore for UnreadableStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StorageError::Unavailable("read timed out".into()));
            }
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.inner.put(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key).await
        }
    }

    #[tokio::test]
    async fn unreadable_board_is_never_overwritten() {
        let backend = UnreadableStore::default();
        backend
            .inner
            .put(LEADERBOARD_KEY, &encode_entries(&demo_racers()).unwrap())
            .await
            .unwrap();
        backend.fail_reads.store(true, Ordering::SeqCst);

        let store =
            LeaderboardStore::open(Arc::new(backend.clone()), &GameSettings::default()).await;
        let receipt = store
            .submit(LeaderboardEntry::new(run("r1"), "Me", 100_000, 23, 23))
            .await;

        assert!(!receipt.is_persisted());
        assert_eq!(receipt.ranked.len(), 1);
        let blob = backend.inner.get(LEADERBOARD_KEY).await.unwrap().unwrap();
        assert_eq!(decode_entries(&blob).len(), 28);

        backend.fail_reads.store(false, Ordering::SeqCst);
        let retried = store
            .submit(LeaderboardEntry::new(run("r1"), "Me", 100_000, 23, 23))
            .await;
        assert!(retried.is_persisted());
        let blob = backend.inner.get(LEADERBOARD_KEY).await.unwrap().unwrap();
        assert_eq!(decode_entries(&blob).len(), 29);
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_latency_delays_reads() {
        let backend = InMemoryKeyValueStore::new();
        let store = LeaderboardStore::new(Arc::new(backend)).with_latency(SimulatedLatency::hosted());
        let started = tokio::time::Instant::now();
        store.get_ranked(30).await;
        assert!(started.elapsed() >= Duration::from_millis(300));
    }
}
