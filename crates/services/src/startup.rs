use std::sync::Arc;

use tracing::warn;

use storage::repository::KeyValueStore;

/// Session-scoped flag recording that the intro was shown.
pub const INTRO_SEEN_KEY: &str = "hamster-space-race/intro-seen";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialScreen {
    Intro,
    Landing,
}

/// Decides whether a play session opens on the intro or the landing screen.
#[derive(Clone)]
pub struct IntroGate {
    session: Arc<dyn KeyValueStore>,
}

impl IntroGate {
    #[must_use]
    pub fn new(session: Arc<dyn KeyValueStore>) -> Self {
        Self { session }
    }

    /// Intro the first time in a session, landing afterwards.
    ///
    /// An unreadable flag shows the intro again rather than failing.
    pub async fn initial_screen(&self) -> InitialScreen {
        match self.session.get(INTRO_SEEN_KEY).await {
            Ok(Some(_)) => InitialScreen::Landing,
            Ok(None) => InitialScreen::Intro,
            Err(err) => {
                warn!(error = %err, "could not read intro flag");
                InitialScreen::Intro
            }
        }
    }

    /// Remember that the intro was shown. Failures are logged and ignored.
    pub async fn mark_intro_seen(&self) {
        if let Err(err) = self.session.put(INTRO_SEEN_KEY, "true").await {
            warn!(error = %err, "could not store intro flag");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryKeyValueStore;

    #[tokio::test]
    async fn intro_only_once_per_session() {
        let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::new());
        let gate = IntroGate::new(Arc::clone(&store));
        assert_eq!(gate.initial_screen().await, InitialScreen::Intro);

        gate.mark_intro_seen().await;
        assert_eq!(gate.initial_screen().await, InitialScreen::Landing);

        let fresh = IntroGate::new(Arc::new(InMemoryKeyValueStore::new()));
        assert_eq!(fresh.initial_screen().await, InitialScreen::Intro);
    }
}
