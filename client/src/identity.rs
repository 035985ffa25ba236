//! Identity provider abstraction.
//!
//! Issuing user ids is someone else's job; the sync engine only asks who is
//! signed in right now.

use parking_lot::RwLock;
use tally_engine::UserId;

/// Answers "which user is signed in?".
pub trait IdentityProvider: Send + Sync {
    /// The signed-in user's id, or `None` when nobody is authenticated.
    fn current_user_id(&self) -> Option<UserId>;
}

/// Identity held in memory, switchable at runtime.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    user_id: RwLock<Option<UserId>>,
}

impl StaticIdentity {
    /// Signed in as `user_id`.
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: RwLock::new(Some(user_id.into())),
        }
    }

    /// Nobody signed in.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, user_id: impl Into<UserId>) {
        *self.user_id.write() = Some(user_id.into());
    }

    pub fn sign_out(&self) {
        *self.user_id.write() = None;
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> Option<UserId> {
        self.user_id.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_and_out() {
        let identity = StaticIdentity::anonymous();
        assert_eq!(identity.current_user_id(), None);

        identity.sign_in("player-1");
        assert_eq!(identity.current_user_id().as_deref(), Some("player-1"));

        identity.sign_out();
        assert_eq!(identity.current_user_id(), None);

        assert_eq!(
            StaticIdentity::new("p2").current_user_id(),
            Some("p2".to_string())
        );
    }
}
