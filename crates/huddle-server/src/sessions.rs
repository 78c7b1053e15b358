//! In-memory session registry.
//!
//! The domain layer never sees session state; it only receives the acting
//! [`UserId`] that this registry resolved from the request's bearer token.
//! Tokens are random UUIDs and live until logout or restart.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use huddle_shared::UserId;

#[derive(Clone, Default)]
pub struct SessionRegistry {
    tokens: Arc<RwLock<HashMap<String, UserId>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh session token for a logged-in user.
    pub async fn issue(&self, user: UserId) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens.write().await.insert(token.clone(), user);
        token
    }

    /// Resolve a bearer token to the user it was issued for.
    pub async fn resolve(&self, token: &str) -> Option<UserId> {
        self.tokens.read().await.get(token).copied()
    }

    /// Drop a session (logout).  Returns whether the token existed.
    pub async fn revoke(&self, token: &str) -> bool {
        self.tokens.write().await.remove(token).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn issue_resolve_revoke() {
        let sessions = SessionRegistry::new();
        let user = UserId::new();

        let token = sessions.issue(user).await;
        assert_eq!(sessions.resolve(&token).await, Some(user));

        assert!(sessions.revoke(&token).await);
        assert_eq!(sessions.resolve(&token).await, None);
        assert!(!sessions.revoke(&token).await);
    }

    #[tokio::test]
    async fn unknown_token_does_not_resolve() {
        let sessions = SessionRegistry::new();
        assert_eq!(sessions.resolve("nope").await, None);
    }
}
