use crate::config::toml_config::ApiConfig;
use crate::utils::error::{Result, SyncError};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

pub const TOKEN_ENV_VAR: &str = "PIPEDRIVE_API_TOKEN";

#[derive(Deserialize)]
struct TokenFile {
    token: String,
}

/// Pipedrive API token. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

fn usable(candidate: Option<&str>) -> Option<String> {
    candidate
        .map(str::trim)
        .filter(|token| !token.is_empty() && !token.contains("${"))
        .map(str::to_string)
}

/// Resolve the token from `api.token`, then `PIPEDRIVE_API_TOKEN`, then the
/// JSON token file.
pub fn resolve_token(api: &ApiConfig) -> Result<ApiToken> {
    resolve_token_with(api, |name| std::env::var(name).ok())
}

pub fn resolve_token_with<E>(api: &ApiConfig, env: E) -> Result<ApiToken>
where
    E: Fn(&str) -> Option<String>,
{
    if let Some(token) = usable(api.token.as_deref()) {
        return Ok(ApiToken(token));
    }
    if let Some(token) = usable(env(TOKEN_ENV_VAR).as_deref()) {
        tracing::debug!("Using API token from {}", TOKEN_ENV_VAR);
        return Ok(ApiToken(token));
    }

    let path = Path::new(&api.token_file);
    if path.exists() {
        let content = std::fs::read(path)?;
        let file: TokenFile = serde_json::from_slice(&content)?;
        if let Some(token) = usable(Some(&file.token)) {
            tracing::debug!("Using API token from {}", path.display());
            return Ok(ApiToken(token));
        }
    }

    Err(SyncError::MissingCredential {
        location: format!("api.token, ${}, {}", TOKEN_ENV_VAR, api.token_file),
    })
}
