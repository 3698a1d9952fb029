use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::SESSION_EXPIRY_SKEW;

/// Microsoft OAuth token pair.
///
/// The refresh token is the unit of persistence across runs; the access
/// token only feeds the next stage and is always re-derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl OAuthToken {
    pub fn new(access_token: String, refresh_token: String, expires_in: u64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in as i64),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Opaque Xbox Live bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XblToken(String);

impl XblToken {
    pub fn new(token: String) -> Self {
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// XSTS token plus the user hash required for the Minecraft identity header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XstsToken {
    pub token: String,
    pub user_hash: String,
}

impl XstsToken {
    /// Format the `XBL3.0 x=<uhs>;<token>` identity used to log into
    /// Minecraft services.
    pub fn identity_token(&self) -> String {
        format!("XBL3.0 x={};{}", self.user_hash, self.token)
    }
}

/// Minecraft game session, the bearer credential for the optional
/// entitlement and profile calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinecraftSession {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl MinecraftSession {
    pub fn new(access_token: String, expires_in: u64) -> Self {
        Self {
            access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in as i64),
        }
    }

    pub fn is_expired(&self) -> bool {
        let skew = chrono::Duration::from_std(SESSION_EXPIRY_SKEW)
            .unwrap_or(chrono::Duration::seconds(300));
        Utc::now() + skew >= self.expires_at
    }
}

/// Store entitlements attached to the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entitlement {
    pub items: Vec<String>,
}

impl Entitlement {
    /// Ownership check: the store reports both the product and the game
    /// entry for accounts that bought the game.
    pub fn owns_minecraft(&self) -> bool {
        let has = |name: &str| self.items.iter().any(|item| item == name);
        has("product_minecraft") && has("game_minecraft")
    }
}

/// Minecraft player profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Profile {
    /// Player UUID without dashes.
    pub id: String,
    /// Player name.
    pub name: String,
}
