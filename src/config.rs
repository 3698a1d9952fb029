use std::time::Duration;

use url::Url;

/// Fixed remote endpoints consumed by the authentication chain.
///
/// The exact path strings matter for interoperability and mirror the
/// services' published URLs.
pub mod endpoints {
    pub const OAUTH_AUTHORIZE: &str = "https://login.live.com/oauth20_authorize.srf";
    pub const OAUTH_TOKEN: &str = "https://login.live.com/oauth20_token.srf";
    pub const XBL_AUTHENTICATE: &str = "https://user.auth.xboxlive.com/user/authenticate";
    pub const XSTS_AUTHORIZE: &str = "https://xsts.auth.xboxlive.com/xsts/authorize";
    pub const MC_LOGIN: &str = "https://api.minecraftservices.com/authentication/login_with_xbox";
    pub const MC_ENTITLEMENTS: &str = "https://api.minecraftservices.com/entitlements/mcstore";
    pub const MC_PROFILE: &str = "https://api.minecraftservices.com/minecraft/profile";
}

/// Well-known application registration used when no custom one is supplied.
pub mod well_known {
    /// Client id of the Minecraft launcher application.
    pub const CLIENT_ID: &str = "00000000402b5328";
    pub const REDIRECT_URL: &str = "https://login.live.com/oauth20_desktop.srf";
}

/// OAuth scope requested during authorization.
pub const OAUTH_SCOPE: &str = "XboxLive.signin offline_access";

/// Relying party the Minecraft services XSTS token is scoped to.
pub const RP_MINECRAFT: &str = "rp://api.minecraftservices.com/";

/// Relying party used for the Xbox Live user-authentication stage.
pub const RP_XBOXLIVE_AUTH: &str = "http://auth.xboxlive.com";

/// Default XSTS sandbox id.
pub const SANDBOX_RETAIL: &str = "RETAIL";

/// Minecraft session tokens are treated as expired this long before their
/// actual expiry.
pub const SESSION_EXPIRY_SKEW: Duration = Duration::from_secs(300);

/// Connect and read timeouts applied to every chain call.
#[derive(Debug, Clone)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(15),
            request: Duration::from_secs(30),
        }
    }
}

/// The seven service URLs the chain talks to.
///
/// Defaults point at the live services; tests and alternate deployments can
/// rebase them onto another host with [`ServiceEndpoints::with_base`].
#[derive(Debug, Clone)]
pub struct ServiceEndpoints {
    pub oauth_authorize: String,
    pub oauth_token: String,
    pub xbl_authenticate: String,
    pub xsts_authorize: String,
    pub mc_login: String,
    pub mc_entitlements: String,
    pub mc_profile: String,
}

impl Default for ServiceEndpoints {
    fn default() -> Self {
        Self {
            oauth_authorize: endpoints::OAUTH_AUTHORIZE.to_string(),
            oauth_token: endpoints::OAUTH_TOKEN.to_string(),
            xbl_authenticate: endpoints::XBL_AUTHENTICATE.to_string(),
            xsts_authorize: endpoints::XSTS_AUTHORIZE.to_string(),
            mc_login: endpoints::MC_LOGIN.to_string(),
            mc_entitlements: endpoints::MC_ENTITLEMENTS.to_string(),
            mc_profile: endpoints::MC_PROFILE.to_string(),
        }
    }
}

impl ServiceEndpoints {
    /// Point every endpoint at a single base URL, keeping the well-known
    /// paths.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            oauth_authorize: format!("{base}/oauth20_authorize.srf"),
            oauth_token: format!("{base}/oauth20_token.srf"),
            xbl_authenticate: format!("{base}/user/authenticate"),
            xsts_authorize: format!("{base}/xsts/authorize"),
            mc_login: format!("{base}/authentication/login_with_xbox"),
            mc_entitlements: format!("{base}/entitlements/mcstore"),
            mc_profile: format!("{base}/minecraft/profile"),
        }
    }
}

/// Immutable configuration injected into the authentication chain.
///
/// The client id and redirect URL belong to one application registration and
/// are only substitutable as a pair; use [`AuthConfig::custom`] rather than
/// patching one of the two fields.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub client_id: String,
    pub redirect_url: String,
    pub endpoints: ServiceEndpoints,
    pub timeouts: HttpTimeouts,
    pub user_agent: Option<String>,
}

impl AuthConfig {
    /// Configuration using the well-known Minecraft launcher registration.
    pub fn well_known() -> Self {
        Self {
            client_id: well_known::CLIENT_ID.to_string(),
            redirect_url: well_known::REDIRECT_URL.to_string(),
            endpoints: ServiceEndpoints::default(),
            timeouts: HttpTimeouts::default(),
            user_agent: Some("mc-msa-auth".to_string()),
        }
    }

    /// Configuration for a custom Azure application registration. The client
    /// id and redirect URL are replaced together.
    pub fn custom(client_id: impl Into<String>, redirect_url: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_url: redirect_url.into(),
            ..Self::well_known()
        }
    }

    /// Build the browser authorization URL the user visits to obtain the
    /// single-use authorization code.
    pub fn oauth_authorize_url(&self) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.endpoints.oauth_authorize)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("scope", OAUTH_SCOPE)
            .append_pair("redirect_uri", &self.redirect_url);
        Ok(url)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::well_known()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_url_carries_registration_pair() {
        let config = AuthConfig::custom("my-client", "http://localhost:8000/callback");
        let url = config.oauth_authorize_url().unwrap();

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("client_id".to_string(), "my-client".to_string())));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&("scope".to_string(), OAUTH_SCOPE.to_string())));
        assert!(pairs.contains(&(
            "redirect_uri".to_string(),
            "http://localhost:8000/callback".to_string()
        )));
    }

    #[test]
    fn rebased_endpoints_keep_well_known_paths() {
        let endpoints = ServiceEndpoints::with_base("http://127.0.0.1:9000/");
        assert_eq!(endpoints.oauth_token, "http://127.0.0.1:9000/oauth20_token.srf");
        assert_eq!(
            endpoints.mc_login,
            "http://127.0.0.1:9000/authentication/login_with_xbox"
        );
    }
}
