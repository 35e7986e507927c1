mod avatar;
mod ids;
mod leaderboard;
mod question;
mod run;
mod settings;

pub use avatar::{Accessory, AvatarConfig, FurColor, PlayerError, PlayerName};
pub use ids::{ParseIdError, QuestionId, RunId};
pub use leaderboard::{DedupeKey, EntrySignature, LeaderboardEntry};
pub use question::{OPTION_COUNT, Question, QuestionDraft, QuestionError};
pub use run::{RunSession, RunSessionError};
pub use settings::{GameSettings, MILESTONES, Milestone, SettingsError, milestone_at};
