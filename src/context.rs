use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::storage::{KeyValueStore, LocalState, MemoryStore, SessionState, StorageError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
}

/// What the auth provider hands to every page. Sign-in itself happens elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<User>,
    pub access_token: Option<String>,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn from_local(local: &LocalState, user_id: Option<String>) -> Self {
        let user = match (user_id, local.username.clone()) {
            (Some(id), Some(username)) => Some(User { id, username }),
            _ => None,
        };
        Self {
            user,
            access_token: local.access_token.clone(),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}

/// Everything a page needs, passed explicitly instead of read from globals.
pub struct AppContext {
    pub config: Config,
    pub session: Box<dyn KeyValueStore>,
    pub local: Box<dyn KeyValueStore>,
    pub auth: AuthState,
}

impl AppContext {
    pub fn new(
        config: Config,
        session: Box<dyn KeyValueStore>,
        local: Box<dyn KeyValueStore>,
        auth: AuthState,
    ) -> Self {
        Self {
            config,
            session,
            local,
            auth,
        }
    }

    /// Context backed by in-memory stores, for the CLI and tests.
    pub fn in_memory(config: Config) -> Self {
        Self::new(
            config,
            Box::new(MemoryStore::new()),
            Box::new(MemoryStore::new()),
            AuthState::default(),
        )
    }

    pub fn session_state(&self) -> Result<SessionState, StorageError> {
        SessionState::load(self.session.as_ref())
    }

    pub fn local_state(&self) -> LocalState {
        LocalState::load(self.local.as_ref())
    }

    pub fn update_local(&mut self, update: impl FnOnce(&mut LocalState)) {
        let mut state = self.local_state();
        update(&mut state);
        state.save(self.local.as_mut());
    }
}
