//! Authorization logic.

use std::time::Duration;

pub mod client_credentials;
pub mod token_manager;

pub use self::client_credentials::{AuthError, ClientCredentials, Credentials};
pub use self::token_manager::TokenManager;

#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    type Token: Token;
    type Error: Send + Sync;

    async fn get_auth_token(&self) -> Result<Self::Token, Self::Error>;
}

/// A token provider holding state that can be thrown away, so that the next
/// [`TokenProvider::get_auth_token`] call goes back to the source.
#[async_trait::async_trait]
pub trait RenewableTokenProvider: TokenProvider {
    async fn invalidate(&self);
}

pub trait Token: Send {
    fn access_token(&self) -> &str;
}

pub trait ExpiringToken: Token {
    /// Lifetime of the token, counted from the moment it was received.
    fn expires_in(&self) -> Duration;
}
