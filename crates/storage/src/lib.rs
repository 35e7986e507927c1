#![forbid(unsafe_code)]

pub mod leaderboard;
pub mod repository;
pub mod sqlite;

pub use leaderboard::{LEADERBOARD_KEY, LeaderboardStore, SimulatedLatency, SubmitReceipt};
pub use repository::{InMemoryKeyValueStore, KeyValueStore, Storage, StorageError};
