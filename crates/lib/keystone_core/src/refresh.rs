//! Single-flight access token refresh.
//!
//! The coordinator is either idle or refreshing. While refreshing, every
//! caller of [`RefreshCoordinator::refresh`] awaits the same shared future,
//! so exactly one POST goes out per cycle and all callers observe the same
//! outcome. The future returns the coordinator to idle before it resolves.

use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::ClaimsCache;
use crate::models::TokenPair;
use crate::store::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TokenStore};
use crate::token::ClaimsDecoder;
use crate::transport::RefreshTransport;

/// Default refresh endpoint path.
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

/// Refresh errors. Cloneable so one outcome can be handed to every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Token refresh failed: {0}")]
    NetworkOrServer(String),

    #[error("Failed to persist refreshed tokens: {0}")]
    Store(String),
}

/// Body returned by the refresh endpoint.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

type PendingRefresh = Shared<BoxFuture<'static, Result<TokenPair, RefreshError>>>;

enum RefreshState {
    Idle,
    Refreshing(PendingRefresh),
}

struct Inner {
    store: Arc<dyn TokenStore>,
    transport: Arc<dyn RefreshTransport>,
    decoder: Arc<dyn ClaimsDecoder>,
    cache: Arc<ClaimsCache>,
    refresh_path: String,
    grace: Duration,
    state: Mutex<RefreshState>,
}

/// Keeps the stored access token fresh.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    /// `cache` is invalidated whenever a refresh settles.
    pub fn new(
        store: Arc<dyn TokenStore>,
        transport: Arc<dyn RefreshTransport>,
        decoder: Arc<dyn ClaimsDecoder>,
        cache: Arc<ClaimsCache>,
        refresh_path: impl Into<String>,
        grace: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                transport,
                decoder,
                cache,
                refresh_path: refresh_path.into(),
                grace,
                state: Mutex::new(RefreshState::Idle),
            }),
        }
    }

    /// Return a usable access token, refreshing first if the stored one is
    /// expired or inside the grace window. `Ok(None)` means no session.
    pub async fn ensure_fresh(&self) -> Result<Option<String>, RefreshError> {
        let Some(token) = self.inner.store.get(ACCESS_TOKEN_KEY) else {
            return Ok(None);
        };
        if !self
            .inner
            .decoder
            .is_expired_at(&token, self.inner.grace, Utc::now())
        {
            return Ok(Some(token));
        }
        debug!("access token expired or about to expire");
        let pair = self.refresh().await?;
        Ok(Some(pair.access_token))
    }

    /// Refresh the token pair, joining the in-flight refresh if there is one.
    pub async fn refresh(&self) -> Result<TokenPair, RefreshError> {
        let pending = {
            let mut state = self.inner.state.lock().await;
            if let RefreshState::Refreshing(pending) = &*state {
                debug!("joining in-flight token refresh");
                pending.clone()
            } else {
                let inner = Arc::clone(&self.inner);
                let pending = async move {
                    let outcome = inner.perform_refresh().await;
                    inner.settle().await;
                    outcome
                }
                .boxed()
                .shared();
                *state = RefreshState::Refreshing(pending.clone());
                pending
            }
        };
        pending.await
    }

    pub async fn is_refreshing(&self) -> bool {
        matches!(*self.inner.state.lock().await, RefreshState::Refreshing(_))
    }
}

impl Inner {
    async fn perform_refresh(&self) -> Result<TokenPair, RefreshError> {
        let Some(refresh_token) = self.store.get(REFRESH_TOKEN_KEY) else {
            warn!("no refresh token stored, clearing session tokens");
            self.evict_tokens();
            return Err(RefreshError::NoRefreshToken);
        };

        info!(path = %self.refresh_path, "refreshing access token");
        let body = serde_json::json!({ "refresh_token": refresh_token });
        let outcome = match self.transport.post_json(&self.refresh_path, body).await {
            Ok(value) => parse_response(value).and_then(|pair| {
                self.persist(&pair)?;
                Ok(pair)
            }),
            Err(e) => Err(RefreshError::NetworkOrServer(e.to_string())),
        };

        match &outcome {
            Ok(pair) => info!(
                rotated = pair.refresh_token.is_some(),
                "access token refreshed"
            ),
            Err(e) => {
                warn!(error = %e, "token refresh failed, clearing session tokens");
                self.evict_tokens();
            }
        }
        outcome
    }

    fn persist(&self, pair: &TokenPair) -> Result<(), RefreshError> {
        self.store
            .set(ACCESS_TOKEN_KEY, &pair.access_token)
            .map_err(|e| RefreshError::Store(e.to_string()))?;
        if let Some(refresh_token) = &pair.refresh_token {
            self.store
                .set(REFRESH_TOKEN_KEY, refresh_token)
                .map_err(|e| RefreshError::Store(e.to_string()))?;
        }
        Ok(())
    }

    fn evict_tokens(&self) {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "failed to evict token");
            }
        }
    }

    async fn settle(&self) {
        *self.state.lock().await = RefreshState::Idle;
        self.cache.invalidate();
    }
}

fn parse_response(value: serde_json::Value) -> Result<TokenPair, RefreshError> {
    let resp: RefreshResponse = serde_json::from_value(value)
        .map_err(|e| RefreshError::NetworkOrServer(format!("malformed refresh response: {e}")))?;
    if resp.access_token.is_empty() {
        return Err(RefreshError::NetworkOrServer(
            "malformed refresh response: empty access_token".into(),
        ));
    }
    Ok(TokenPair {
        access_token: resp.access_token,
        refresh_token: resp.refresh_token.filter(|t| !t.is_empty()),
    })
}
