//! Identity collaborator trait and in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::UserId;

use crate::error::CheckoutError;

/// Trait for the user/auth collaborator.
///
/// Two narrow operations: existence checks at checkout time, and
/// bearer-token resolution for the authenticated history listing.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Returns true if the user reference is valid.
    async fn user_exists(&self, user_id: UserId) -> Result<bool, CheckoutError>;

    /// Resolves a caller token to a user, or None when unknown.
    async fn authenticate(&self, token: &str) -> Result<Option<UserId>, CheckoutError>;
}

#[derive(Debug, Default)]
struct InMemoryIdentityState {
    users: HashSet<UserId>,
    tokens: HashMap<String, UserId>,
}

/// In-memory identity service for testing and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityService {
    state: Arc<RwLock<InMemoryIdentityState>>,
}

impl InMemoryIdentityService {
    /// Creates a new empty in-memory identity service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a known user.
    pub fn register_user(&self, user_id: UserId) {
        self.state.write().unwrap().users.insert(user_id);
    }

    /// Registers a token for a user (the user becomes known too).
    pub fn register_token(&self, token: impl Into<String>, user_id: UserId) {
        let mut state = self.state.write().unwrap();
        state.users.insert(user_id);
        state.tokens.insert(token.into(), user_id);
    }
}

#[async_trait]
impl IdentityService for InMemoryIdentityService {
    async fn user_exists(&self, user_id: UserId) -> Result<bool, CheckoutError> {
        Ok(self.state.read().unwrap().users.contains(&user_id))
    }

    async fn authenticate(&self, token: &str) -> Result<Option<UserId>, CheckoutError> {
        Ok(self.state.read().unwrap().tokens.get(token).copied())
    }
}
