use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{ExpiringToken, RenewableTokenProvider, TokenProvider};

/// Tokens are renewed this long before their stated expiry.
pub const EXPIRY_SKEW: Duration = Duration::from_secs(60);

/// Upper bound on how long a token is cached, whatever the provider claims.
pub const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Caches the token of an underlying provider until it is about to expire.
///
/// The cache lock is held across a refresh, so concurrent callers wait for the
/// in-flight exchange instead of starting their own.
pub struct TokenManager<Provider>
where
    Provider: TokenProvider,
{
    provider: Provider,
    clock: Arc<dyn Clock>,
    cached_token: Mutex<Option<Record>>,
}

#[derive(Debug, Clone)]
pub struct Record {
    pub access_token: String,
    pub expires_at: Instant,
}

impl Record {
    pub fn from_expiring_token<T: ExpiringToken>(token: T, now: Instant) -> Self {
        let lifetime = token.expires_in().min(MAX_TOKEN_LIFETIME);
        Self {
            access_token: token.access_token().to_owned(),
            // An unrepresentable expiry yields a token that is never reused.
            expires_at: now.checked_add(lifetime).unwrap_or(now),
        }
    }

    /// Whether the token can still be handed out at `now`, skew included.
    pub fn is_usable_at(&self, now: Instant) -> bool {
        now.checked_add(EXPIRY_SKEW)
            .map_or(false, |deadline| deadline < self.expires_at)
    }
}

impl super::Token for Record {
    fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl<Provider> TokenManager<Provider>
where
    Provider: TokenProvider,
    <Provider as TokenProvider>::Token: ExpiringToken,
{
    pub fn new(provider: Provider) -> Self {
        Self::with_clock(provider, Arc::new(SystemClock))
    }

    pub fn with_clock(provider: Provider, clock: Arc<dyn Clock>) -> Self {
        Self {
            provider,
            clock,
            cached_token: Mutex::const_new(None),
        }
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    async fn fetch_new_token(&self) -> Result<Record, Provider::Error> {
        let token = self.provider.get_auth_token().await?;
        let record = Record::from_expiring_token(token, self.clock.now());
        Ok(record)
    }

    pub async fn get_token(&self) -> Result<Record, Provider::Error> {
        let mut cached_token = self.cached_token.lock().await;

        if let Some(ref cached_token) = *cached_token {
            if cached_token.is_usable_at(self.clock.now()) {
                debug!(message = "Using preexisting token", token_expires_at = ?cached_token.expires_at);
                return Ok(cached_token.clone());
            }
            debug!(message = "Existing token expired, refreshing", token_expires_at = ?cached_token.expires_at);
        }

        info!(
            message = "No active token found, about to get a new one",
            token_is_stale = cached_token.is_some(),
        );

        // A failed exchange leaves the slot empty rather than holding a stale token.
        cached_token.take();
        let new_record = self.fetch_new_token().await?;
        cached_token.replace(new_record.clone());

        debug!(message = "Got new token", token_expires_at = ?new_record.expires_at);

        Ok(new_record)
    }

    pub async fn invalidate(&self) {
        let previous = self.cached_token.lock().await.take();
        info!(
            message = "Cached token invalidated",
            had_token = previous.is_some(),
        );
    }
}

#[async_trait::async_trait]
impl<Provider> TokenProvider for TokenManager<Provider>
where
    Provider: TokenProvider,
    <Provider as TokenProvider>::Token: ExpiringToken,
{
    type Token = Record;
    type Error = Provider::Error;

    async fn get_auth_token(&self) -> Result<Self::Token, Self::Error> {
        let token = self.get_token().await?;
        Ok(token)
    }
}

#[async_trait::async_trait]
impl<Provider> RenewableTokenProvider for TokenManager<Provider>
where
    Provider: TokenProvider,
    <Provider as TokenProvider>::Token: ExpiringToken,
{
    async fn invalidate(&self) {
        TokenManager::invalidate(self).await;
    }
}
