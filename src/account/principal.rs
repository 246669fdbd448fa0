//! Authenticated principal.

use serde::{Deserialize, Serialize};

use crate::db::Account;

/// The only role a member holds.
pub const ROLE_USER: &str = "ROLE_USER";

/// A persisted account seen as an authenticated principal.
///
/// Carries only what request handling needs; handlers reload the full
/// [`Account`] when they mutate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub account_id: i64,
    pub nickname: String,
    pub role: String,
}

impl UserAccount {
    /// Check whether the principal represents `account`.
    pub fn is(&self, account: &Account) -> bool {
        self.account_id == account.id
    }
}

impl From<&Account> for UserAccount {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.id,
            nickname: account.nickname.clone(),
            role: ROLE_USER.to_string(),
        }
    }
}
