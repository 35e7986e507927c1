use thiserror::Error;

use crate::model::{PlayerError, QuestionError, RunSessionError, SettingsError};

/// Umbrella error for the domain crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Player(#[from] PlayerError),
    #[error(transparent)]
    RunSession(#[from] RunSessionError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlayerName;

    #[test]
    fn layer_errors_convert_into_the_umbrella() {
        let err: Error = PlayerName::new(" ").unwrap_err().into();
        assert!(matches!(err, Error::Player(PlayerError::EmptyName)));
    }
}
