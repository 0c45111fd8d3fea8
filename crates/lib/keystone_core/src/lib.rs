//! # keystone_core
//!
//! Session token lifecycle and access-control evaluation for the Keystone
//! admin console.
//!
//! The pieces, leaves first:
//!
//! * [`token`] decodes bearer tokens into [`models::Claims`].
//! * [`cache`] memoizes decoded claims for the currently stored token.
//! * [`access`] answers role / permission / wildcard queries.
//! * [`refresh`] refreshes an expiring access token with at most one request
//!   in flight.
//!
//! [`session::AuthSession`] owns one of each and is the entry point for
//! callers.

pub mod access;
pub mod cache;
pub mod config;
pub mod models;
pub mod refresh;
pub mod session;
pub mod store;
pub mod token;
pub mod transport;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
