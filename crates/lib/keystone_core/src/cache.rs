//! Claims cache for the currently stored access token.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::models::{AccountSnapshot, Claims};
use crate::store::{ACCESS_TOKEN_KEY, TokenStore};
use crate::token::ClaimsDecoder;

/// Default claims TTL: 5 minutes.
pub const DEFAULT_CLAIMS_TTL_SECS: i64 = 5 * 60;

/// Claims decoded from one specific token string.
#[derive(Debug, Clone)]
struct CacheEntry {
    token: String,
    claims: Claims,
    decoded_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CacheState {
    entry: Option<CacheEntry>,
    /// Set when the stored token failed to decode.
    decode_failed: bool,
    account: Option<AccountSnapshot>,
}

/// Memoizes decoded claims keyed by the raw stored token.
///
/// An entry is served only while it is younger than the TTL and its token
/// still equals the stored one. After a decode failure the cache returns
/// `None` without decoding again until [`ClaimsCache::invalidate`] runs.
pub struct ClaimsCache {
    store: Arc<dyn TokenStore>,
    decoder: Arc<dyn ClaimsDecoder>,
    ttl: Duration,
    state: RwLock<CacheState>,
}

impl ClaimsCache {
    pub fn new(store: Arc<dyn TokenStore>, decoder: Arc<dyn ClaimsDecoder>) -> Self {
        Self::with_ttl(store, decoder, Duration::seconds(DEFAULT_CLAIMS_TTL_SECS))
    }

    pub fn with_ttl(
        store: Arc<dyn TokenStore>,
        decoder: Arc<dyn ClaimsDecoder>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            decoder,
            ttl,
            state: RwLock::new(CacheState::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims of the stored access token, or `None` if there is no usable
    /// token.
    ///
    /// A token that fails to decode is removed from the store.
    pub fn get(&self) -> Option<Claims> {
        let token = self.store.get(ACCESS_TOKEN_KEY)?;

        {
            let state = self.read();
            if state.decode_failed {
                return None;
            }
            if let Some(entry) = &state.entry
                && entry.token == token
                && Utc::now() - entry.decoded_at < self.ttl
            {
                debug!("claims cache hit");
                return Some(entry.claims.clone());
            }
        }

        debug!("claims cache miss, decoding stored token");
        match self.decoder.decode(&token) {
            Ok(decoded) => {
                let mut state = self.write();
                state.entry = Some(CacheEntry {
                    token,
                    claims: decoded.claims.clone(),
                    decoded_at: Utc::now(),
                });
                state.decode_failed = false;
                Some(decoded.claims)
            }
            Err(e) => {
                // The store may have been rewritten while decoding; only the
                // token that failed is discarded.
                let mut state = self.write();
                if self.store.get(ACCESS_TOKEN_KEY).as_deref() != Some(token.as_str()) {
                    debug!("stored access token replaced during decode");
                    return None;
                }
                warn!(error = %e, "stored access token is unusable, discarding it");
                state.entry = None;
                state.decode_failed = true;
                if let Err(e) = self.store.remove(ACCESS_TOKEN_KEY) {
                    warn!(error = %e, "failed to remove unusable access token");
                }
                None
            }
        }
    }

    /// Token claims, falling back to the account snapshot when no valid
    /// token is stored.
    pub fn claims(&self) -> Option<Claims> {
        self.get().or_else(|| self.account().map(Claims::from))
    }

    /// Drop the cached entry and the decode-failure flag.
    pub fn invalidate(&self) {
        let mut state = self.write();
        state.entry = None;
        state.decode_failed = false;
    }

    /// Record claims fetched from the account endpoint.
    pub fn set_account(&self, snapshot: AccountSnapshot) {
        self.write().account = Some(snapshot);
    }

    pub fn account(&self) -> Option<AccountSnapshot> {
        self.read().account.clone()
    }

    /// Forget everything: cached entry, failure flag and account snapshot.
    pub fn clear_state(&self) {
        *self.write() = CacheState::default();
    }
}
