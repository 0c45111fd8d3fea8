//! Session-scoped owner of the token store, claims cache, access evaluator
//! and refresh coordinator.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::access::AccessEvaluator;
use crate::cache::ClaimsCache;
use crate::config::SessionConfig;
use crate::models::{AccountSnapshot, TokenPair};
use crate::refresh::{RefreshCoordinator, RefreshError};
use crate::store::{
    ACCESS_TOKEN_KEY, FileTokenStore, REFRESH_TOKEN_KEY, StoreError, TokenStore,
};
use crate::token::{ClaimsDecoder, JwtCodec};
use crate::transport::{HttpTransport, RefreshTransport, TransportError};

/// Errors building a session from configuration.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// One signed-in (or signed-out) console session.
///
/// Construct one per identity context and share it by reference; nothing
/// here is global.
pub struct AuthSession {
    store: Arc<dyn TokenStore>,
    cache: Arc<ClaimsCache>,
    access: AccessEvaluator,
    refresher: RefreshCoordinator,
}

impl AuthSession {
    pub fn new(
        config: &SessionConfig,
        store: Arc<dyn TokenStore>,
        transport: Arc<dyn RefreshTransport>,
    ) -> Self {
        Self::with_decoder(config, store, transport, Arc::new(JwtCodec))
    }

    pub fn with_decoder(
        config: &SessionConfig,
        store: Arc<dyn TokenStore>,
        transport: Arc<dyn RefreshTransport>,
        decoder: Arc<dyn ClaimsDecoder>,
    ) -> Self {
        let cache = Arc::new(ClaimsCache::with_ttl(
            store.clone(),
            decoder.clone(),
            config.claims_ttl,
        ));
        let refresher = RefreshCoordinator::new(
            store.clone(),
            transport,
            decoder,
            cache.clone(),
            config.refresh_path.clone(),
            config.expiry_grace,
        );
        Self {
            access: AccessEvaluator::new(cache.clone()),
            store,
            cache,
            refresher,
        }
    }

    /// File-backed store at `config.token_file`, HTTP transport at
    /// `config.api_url`.
    pub fn from_config(config: &SessionConfig) -> Result<Self, SessionError> {
        let store = Arc::new(FileTokenStore::open(&config.token_file)?);
        let transport = Arc::new(HttpTransport::new(&config.api_url, config.http_timeout)?);
        Ok(Self::new(config, store, transport))
    }

    pub fn access(&self) -> &AccessEvaluator {
        &self.access
    }

    pub fn cache(&self) -> &ClaimsCache {
        &self.cache
    }

    pub fn access_token(&self) -> Option<String> {
        self.store.get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.store.get(REFRESH_TOKEN_KEY)
    }

    /// Replace the stored tokens after a successful sign-in.
    pub fn login(&self, pair: &TokenPair) -> Result<(), StoreError> {
        self.store.set(ACCESS_TOKEN_KEY, &pair.access_token)?;
        match &pair.refresh_token {
            Some(refresh_token) => self.store.set(REFRESH_TOKEN_KEY, refresh_token)?,
            None => self.store.remove(REFRESH_TOKEN_KEY)?,
        }
        self.cache.invalidate();
        info!("session tokens replaced");
        Ok(())
    }

    /// Remove both tokens and forget all cached state.
    ///
    /// Cached state is cleared even if the store fails.
    pub fn logout(&self) -> Result<(), StoreError> {
        let access = self.store.remove(ACCESS_TOKEN_KEY);
        let refresh = self.store.remove(REFRESH_TOKEN_KEY);
        self.cache.clear_state();
        info!("session cleared");
        access.and(refresh)
    }

    pub fn set_account(&self, snapshot: AccountSnapshot) {
        self.cache.set_account(snapshot);
    }

    pub async fn ensure_fresh(&self) -> Result<Option<String>, RefreshError> {
        self.refresher.ensure_fresh().await
    }

    pub async fn refresh(&self) -> Result<TokenPair, RefreshError> {
        self.refresher.refresh().await
    }

    pub fn refresher(&self) -> &RefreshCoordinator {
        &self.refresher
    }
}
