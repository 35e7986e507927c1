use std::sync::Arc;

use tracing::debug;

use race_core::bank::QuestionBank;
use race_core::model::{Accessory, AvatarConfig, FurColor, GameSettings, PlayerName, RunSession};
use storage::leaderboard::LeaderboardStore;

use crate::Clock;
use crate::error::GameError;
use crate::run::RunOrchestrator;

/// Everything one player session carries between screens.
///
/// Holds the player's name and avatar and owns the race in progress. Going
/// back to the start (or playing again) resets all of it.
pub struct GameSession {
    clock: Clock,
    settings: GameSettings,
    player_name: Option<PlayerName>,
    avatar: AvatarConfig,
    run: Option<RunOrchestrator>,
    seed: Option<u64>,
}

impl GameSession {
    #[must_use]
    pub fn new(settings: GameSettings, clock: Clock) -> Self {
        Self {
            clock,
            settings,
            player_name: None,
            avatar: AvatarConfig::default(),
            run: None,
            seed: None,
        }
    }

    /// Deal questions and options in a fixed order for every race.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    #[must_use]
    pub fn player_name(&self) -> Option<&PlayerName> {
        self.player_name.as_ref()
    }

    #[must_use]
    pub fn avatar(&self) -> AvatarConfig {
        self.avatar
    }

    /// # Errors
    ///
    /// Returns `GameError::Player` for a blank name.
    pub fn set_player_name(&mut self, raw: &str) -> Result<(), GameError> {
        self.player_name = Some(PlayerName::new(raw)?);
        Ok(())
    }

    pub fn set_color(&mut self, color: FurColor) {
        self.avatar.color = color;
    }

    /// Put on `accessory`, or take it off if it is already worn.
    pub fn toggle_accessory(&mut self, accessory: Accessory) {
        self.avatar.toggle_accessory(accessory);
    }

    pub fn set_avatar(&mut self, avatar: AvatarConfig) {
        self.avatar = avatar;
    }

    #[must_use]
    pub fn run(&self) -> Option<&RunOrchestrator> {
        self.run.as_ref()
    }

    #[must_use]
    pub fn run_mut(&mut self) -> Option<&mut RunOrchestrator> {
        self.run.as_mut()
    }

    /// Start a fresh race for the configured player.
    ///
    /// A finished or abandoned race is replaced; one still in progress is not.
    ///
    /// # Errors
    ///
    /// Returns `GameError::MissingPlayerName` before a name is set, or
    /// `GameError::RunInProgress` while a race is running.
    pub fn start_game(
        &mut self,
        bank: &QuestionBank,
        leaderboard: Arc<LeaderboardStore>,
    ) -> Result<&mut RunOrchestrator, GameError> {
        if self.run.as_ref().is_some_and(RunOrchestrator::is_racing) {
            return Err(GameError::RunInProgress);
        }
        let name = self
            .player_name
            .clone()
            .ok_or(GameError::MissingPlayerName)?;

        let session = RunSession::start(name, self.avatar, self.clock.now());
        let run = match self.seed {
            Some(seed) => RunOrchestrator::start_seeded(
                session,
                bank,
                leaderboard,
                &self.settings,
                self.clock,
                seed,
            ),
            None => RunOrchestrator::start(session, bank, leaderboard, &self.settings, self.clock),
        };
        Ok(self.run.insert(run))
    }

    /// End the race in progress without submitting it.
    ///
    /// # Errors
    ///
    /// Returns `GameError::NoActiveRun` when there is nothing to end.
    pub fn end_game(&mut self) -> Result<(), GameError> {
        let run = self.run.as_mut().ok_or(GameError::NoActiveRun)?;
        run.abandon();
        Ok(())
    }

    /// Forget the player and any race, back to the landing screen.
    pub fn reset(&mut self) {
        debug!("game session reset");
        self.player_name = None;
        self.avatar = AvatarConfig::default();
        self.run = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::RunStatus;
    use race_core::time::fixed_clock;
    use storage::repository::InMemoryKeyValueStore;

    fn board() -> Arc<LeaderboardStore> {
        Arc::new(LeaderboardStore::new(Arc::new(InMemoryKeyValueStore::new())))
    }

    fn game() -> GameSession {
        GameSession::new(GameSettings::default(), fixed_clock()).with_seed(9)
    }

    #[test]
    fn starting_requires_a_name() {
        let mut game = game();
        let bank = QuestionBank::builtin().unwrap();
        assert!(matches!(
            game.start_game(&bank, board()),
            Err(GameError::MissingPlayerName)
        ));
        assert!(matches!(
            game.set_player_name("   "),
            Err(GameError::Player(_))
        ));
    }

    #[test]
    fn run_carries_the_player_setup() {
        let mut game = game();
        let bank = QuestionBank::builtin().unwrap();
        game.set_player_name("  Comet ").unwrap();
        game.set_color(FurColor::ALL[2]);
        game.toggle_accessory(Accessory::ALL[0]);

        let run = game.start_game(&bank, board()).unwrap();
        assert_eq!(run.session().player_name().as_str(), "Comet");
        assert_eq!(run.session().avatar().color, FurColor::ALL[2]);
        assert_eq!(run.session().avatar().accessory, Some(Accessory::ALL[0]));
        assert_eq!(run.session().score(), 0);
    }

    #[test]
    fn one_race_at_a_time() {
        let mut game = game();
        let bank = QuestionBank::builtin().unwrap();
        game.set_player_name("Comet").unwrap();
        game.start_game(&bank, board()).unwrap();
        assert!(matches!(
            game.start_game(&bank, board()),
            Err(GameError::RunInProgress)
        ));

        game.end_game().unwrap();
        assert_eq!(game.run().map(RunOrchestrator::status), Some(RunStatus::Abandoned));
        let again = game.start_game(&bank, board()).unwrap();
        assert!(again.is_racing());
    }

    #[test]
    fn reset_clears_everything() {
        let mut game = game();
        let bank = QuestionBank::builtin().unwrap();
        game.set_player_name("Comet").unwrap();
        game.toggle_accessory(Accessory::ALL[3]);
        game.start_game(&bank, board()).unwrap();

        game.reset();
        assert!(game.player_name().is_none());
        assert_eq!(game.avatar(), AvatarConfig::default());
        assert!(game.run().is_none());
        assert!(matches!(game.end_game(), Err(GameError::NoActiveRun)));
    }
}
