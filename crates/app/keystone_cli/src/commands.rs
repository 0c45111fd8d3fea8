use std::sync::Arc;

use keystone_core::config::SessionConfig;
use keystone_core::models::{AccessOptions, MenuDescriptor, TokenPair};
use keystone_core::session::AuthSession;
use keystone_core::store::{ACCESS_TOKEN_KEY, MemoryTokenStore, TokenStore};
use keystone_core::token::decode_token;
use keystone_core::transport::HttpTransport;

use crate::cli::CheckArgs;
use crate::{Error, Result};

pub fn decode(token: &str) -> Result<()> {
    let decoded = decode_token(token)?;
    println!("{}", serde_json::to_string_pretty(&decoded)?);
    Ok(())
}

/// Returns whether access is allowed.
pub fn check(config: &SessionConfig, args: &CheckArgs) -> Result<bool> {
    let session = match &args.token {
        Some(token) => {
            decode_token(token)?;
            let store = MemoryTokenStore::new();
            store.set(ACCESS_TOKEN_KEY, token)?;
            let transport = HttpTransport::new(&config.api_url, config.http_timeout)
                .map_err(keystone_core::session::SessionError::from)?;
            AuthSession::new(config, Arc::new(store), Arc::new(transport))
        }
        None => AuthSession::from_config(config)?,
    };

    let access = session.access();
    let allowed = match &args.menu_perms {
        Some(perms) => access.can_access_menu(&MenuDescriptor {
            perms: Some(perms.clone()),
            ..Default::default()
        }),
        None => access.can_access(&AccessOptions {
            permission: args.permission.clone(),
            role: args.role.clone(),
            permissions: args.permissions.clone(),
            roles: args.roles.clone(),
            any: args.any,
        }),
    };

    println!("{}", if allowed { "allowed" } else { "denied" });
    Ok(allowed)
}

pub fn login(config: &SessionConfig, access_token: &str, refresh_token: Option<&str>) -> Result<()> {
    let session = AuthSession::from_config(config)?;
    session.login(&TokenPair {
        access_token: access_token.to_string(),
        refresh_token: refresh_token.map(str::to_string),
    })?;
    log::info!("stored tokens in {}", config.token_file.display());
    Ok(())
}

pub fn logout(config: &SessionConfig) -> Result<()> {
    AuthSession::from_config(config)?.logout()?;
    log::info!("cleared tokens in {}", config.token_file.display());
    Ok(())
}

pub fn refresh(config: &SessionConfig) -> Result<()> {
    let session = AuthSession::from_config(config)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let token = runtime
        .block_on(session.ensure_fresh())?
        .ok_or_else(|| Error::Custom("no access token stored; log in first".into()))?;

    let decoded = decode_token(&token)?;
    println!("access token valid until {}", decoded.expires_at.to_rfc3339());
    Ok(())
}
