/// Signed-in user context
///
/// Credentials are handled by the web service; this side only carries the
/// identity needed to attribute new reviews. The context is created once on
/// load and torn down on sign-out, and is handed to whoever needs it.

use crate::config::SessionConfig;
use crate::error::ReviewError;

/// The user reviews are posted as
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Default)]
pub struct SessionContext {
    current: Option<Session>,
}

impl SessionContext {
    /// Build the context from configuration; no user configured means signed out
    pub fn init(config: &SessionConfig) -> Self {
        let current = config.user_id.map(|user_id| Session {
            user_id,
            username: config
                .username
                .clone()
                .unwrap_or_else(|| format!("user-{}", user_id)),
        });

        match &current {
            Some(session) => log::info!("👤 Signed in as {} (#{})", session.username, session.user_id),
            None => log::info!("👤 No user configured; browsing only"),
        }

        Self { current }
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// The session, or the message shown when posting is attempted while signed out
    pub fn require(&self) -> Result<&Session, ReviewError> {
        self.current
            .as_ref()
            .ok_or_else(|| ReviewError::validation("Sign in to post a review."))
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.is_some()
    }

    pub fn teardown(&mut self) {
        if let Some(session) = self.current.take() {
            log::info!("👋 Signed out {}", session.username);
        }
    }
}
