use reqwest::Client;
use tracing::{debug, instrument};

use crate::config::AuthConfig;
use crate::errors::TransportError;
use crate::models::{
    EntitlementResponse, McLoginRequest, McLoginResponse, OAuthErrorResponse, OAuthTokenResponse,
    XblAuthProperties, XblAuthRequest, XblAuthResponse, XstsAuthProperties, XstsAuthRequest,
    XstsAuthResponse, XstsErrorResponse,
};
use crate::outcome::StageOutcome;
use crate::session::{Entitlement, MinecraftSession, OAuthToken, Profile, XblToken, XstsToken};

/// The six HTTP-backed chain stages.
///
/// Each stage turns one remote call into a [`StageOutcome`] using its own
/// detection rule for success versus domain rejection versus transport
/// failure; none of them panic or retry. Stages consume the previous stage's
/// output, so skipping or reordering is not possible through this API alone,
/// but the [`Authenticator`](crate::Authenticator) enforces the sequence.
#[derive(Debug, Clone)]
pub struct MicrosoftService {
    config: AuthConfig,
    http: Client,
}

impl MicrosoftService {
    pub fn new(config: AuthConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder()
            .connect_timeout(config.timeouts.connect)
            .timeout(config.timeouts.request);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent);
        }
        let http = builder.build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Exchange a single-use authorization code for an OAuth token pair.
    #[instrument(skip(self, authorization_code))]
    pub async fn oauth_token_from_code(
        &self,
        authorization_code: &str,
    ) -> StageOutcome<OAuthToken, OAuthErrorResponse> {
        debug!("Exchanging authorization code for oauth tokens");
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("code", authorization_code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.config.redirect_url.as_str()),
        ];
        self.oauth_token_request(&params)
            .await
            .unwrap_or_else(StageOutcome::TransportFailure)
    }

    /// Renew the OAuth token pair from a stored refresh token.
    #[instrument(skip(self, refresh_token))]
    pub async fn oauth_token_from_refresh_token(
        &self,
        refresh_token: &str,
    ) -> StageOutcome<OAuthToken, OAuthErrorResponse> {
        debug!("Refreshing oauth tokens");
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
            ("redirect_uri", self.config.redirect_url.as_str()),
        ];
        self.oauth_token_request(&params)
            .await
            .unwrap_or_else(StageOutcome::TransportFailure)
    }

    async fn oauth_token_request(
        &self,
        params: &[(&str, &str)],
    ) -> Result<StageOutcome<OAuthToken, OAuthErrorResponse>, TransportError> {
        let response = self
            .http
            .post(self.config.endpoints.oauth_token.as_str())
            .form(params)
            .send()
            .await?;

        // The token endpoint can answer 200 with an error payload; the
        // "error" field is the signal, not the status code.
        let bytes = response.bytes().await?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)?;
        if body.get("error").is_some() {
            let error: OAuthErrorResponse = serde_json::from_value(body)?;
            return Ok(StageOutcome::DomainError(error));
        }

        let token: OAuthTokenResponse = serde_json::from_value(body)?;
        Ok(StageOutcome::Value(OAuthToken::new(
            token.access_token,
            token.refresh_token,
            token.expires_in,
        )))
    }

    /// Present the OAuth access token to Xbox Live user authentication.
    #[instrument(skip(self, access_token))]
    pub async fn xbl_authenticate(&self, access_token: &str) -> StageOutcome<XblToken, u16> {
        debug!("Authenticating with xbox live");
        let request = XblAuthRequest {
            properties: XblAuthProperties {
                auth_method: "RPS".to_string(),
                site_name: "user.auth.xboxlive.com".to_string(),
                rps_ticket: format!("d={access_token}"),
            },
            relying_party: crate::config::RP_XBOXLIVE_AUTH.to_string(),
            token_type: "JWT".to_string(),
        };
        self.xbl_request(&request)
            .await
            .unwrap_or_else(StageOutcome::TransportFailure)
    }

    async fn xbl_request(
        &self,
        request: &XblAuthRequest,
    ) -> Result<StageOutcome<XblToken, u16>, TransportError> {
        let response = self
            .http
            .post(self.config.endpoints.xbl_authenticate.as_str())
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await?;

        // This stage carries no structured rejection body; a bare status
        // code is the whole domain error.
        let status = response.status().as_u16();
        if status >= 400 {
            return Ok(StageOutcome::DomainError(status));
        }

        let bytes = response.bytes().await?;
        let body: XblAuthResponse = serde_json::from_slice(&bytes)?;
        Ok(StageOutcome::Value(XblToken::new(body.token)))
    }

    /// Exchange the XBL token for a relying-party scoped XSTS token.
    #[instrument(skip(self, xbl_token))]
    pub async fn xsts_authorize(
        &self,
        xbl_token: &XblToken,
        relying_party: &str,
        sandbox_id: &str,
    ) -> StageOutcome<XstsToken, XstsErrorResponse> {
        debug!(relying_party, "Authorizing with xsts");
        let request = XstsAuthRequest {
            properties: XstsAuthProperties {
                sandbox_id: sandbox_id.to_string(),
                user_tokens: vec![xbl_token.as_str().to_string()],
            },
            relying_party: relying_party.to_string(),
            token_type: "JWT".to_string(),
        };
        self.xsts_request(&request)
            .await
            .unwrap_or_else(StageOutcome::TransportFailure)
    }

    async fn xsts_request(
        &self,
        request: &XstsAuthRequest,
    ) -> Result<StageOutcome<XstsToken, XstsErrorResponse>, TransportError> {
        let response = self
            .http
            .post(self.config.endpoints.xsts_authorize.as_str())
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await?;

        // Rejections can arrive with status 200, so the XErr field is
        // checked before any success field is touched.
        let bytes = response.bytes().await?;
        let body: serde_json::Value = serde_json::from_slice(&bytes)?;
        if body.get("XErr").is_some() {
            let error: XstsErrorResponse = serde_json::from_value(body)?;
            return Ok(StageOutcome::DomainError(error));
        }

        let success: XstsAuthResponse = serde_json::from_value(body)?;
        let user_hash = success
            .display_claims
            .xui
            .first()
            .map(|claim| claim.uhs.clone())
            .ok_or_else(|| TransportError::InvalidResponse("missing xui claim".to_string()))?;

        Ok(StageOutcome::Value(XstsToken {
            token: success.token,
            user_hash,
        }))
    }

    /// Log into Minecraft services with the XSTS identity.
    #[instrument(skip(self, xsts_token))]
    pub async fn minecraft_login_with_xsts(
        &self,
        xsts_token: &XstsToken,
    ) -> StageOutcome<MinecraftSession, u16> {
        debug!("Logging in to minecraft services");
        let request = McLoginRequest {
            identity_token: xsts_token.identity_token(),
        };
        self.minecraft_login_request(&request)
            .await
            .unwrap_or_else(StageOutcome::TransportFailure)
    }

    async fn minecraft_login_request(
        &self,
        request: &McLoginRequest,
    ) -> Result<StageOutcome<MinecraftSession, u16>, TransportError> {
        let response = self
            .http
            .post(self.config.endpoints.mc_login.as_str())
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status >= 300 {
            return Ok(StageOutcome::DomainError(status));
        }

        let bytes = response.bytes().await?;
        let body: McLoginResponse = serde_json::from_slice(&bytes)?;
        Ok(StageOutcome::Value(MinecraftSession::new(
            body.access_token,
            body.expires_in,
        )))
    }

    /// Query the store entitlements attached to the session's account.
    #[instrument(skip(self, session))]
    pub async fn minecraft_has_purchased(
        &self,
        session: &MinecraftSession,
    ) -> StageOutcome<Entitlement, u16> {
        debug!("Checking minecraft entitlement");
        self.entitlement_request(session)
            .await
            .unwrap_or_else(StageOutcome::TransportFailure)
    }

    async fn entitlement_request(
        &self,
        session: &MinecraftSession,
    ) -> Result<StageOutcome<Entitlement, u16>, TransportError> {
        let response = self
            .bearer_get(&self.config.endpoints.mc_entitlements, session)
            .await?;

        let status = response.status().as_u16();
        if status >= 300 {
            return Ok(StageOutcome::DomainError(status));
        }

        let bytes = response.bytes().await?;
        let body: EntitlementResponse = serde_json::from_slice(&bytes)?;
        Ok(StageOutcome::Value(Entitlement {
            items: body.items.into_iter().map(|item| item.name).collect(),
        }))
    }

    /// Fetch the player profile for the session's account.
    #[instrument(skip(self, session))]
    pub async fn minecraft_profile(
        &self,
        session: &MinecraftSession,
    ) -> StageOutcome<Profile, u16> {
        debug!("Fetching minecraft profile");
        self.profile_request(session)
            .await
            .unwrap_or_else(StageOutcome::TransportFailure)
    }

    async fn profile_request(
        &self,
        session: &MinecraftSession,
    ) -> Result<StageOutcome<Profile, u16>, TransportError> {
        let response = self
            .bearer_get(&self.config.endpoints.mc_profile, session)
            .await?;

        let status = response.status().as_u16();
        if status >= 300 {
            return Ok(StageOutcome::DomainError(status));
        }

        let bytes = response.bytes().await?;
        let profile: Profile = serde_json::from_slice(&bytes)?;
        Ok(StageOutcome::Value(profile))
    }

    async fn bearer_get(
        &self,
        url: &str,
        session: &MinecraftSession,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.http
            .get(url)
            .header("Accept", "application/json")
            .header(
                "Authorization",
                format!("Bearer {}", session.access_token),
            )
            .send()
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::{RP_MINECRAFT, SANDBOX_RETAIL, ServiceEndpoints};

    fn test_service(server: &MockServer) -> MicrosoftService {
        let mut config = AuthConfig::well_known();
        config.endpoints = ServiceEndpoints::with_base(&server.uri());
        MicrosoftService::new(config).unwrap()
    }

    #[tokio::test]
    async fn oauth_error_body_wins_over_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth20_token.srf"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "The provided grant is expired",
            })))
            .mount(&server)
            .await;

        let service = test_service(&server);
        let outcome = service.oauth_token_from_refresh_token("stale").await;

        let error = outcome.into_domain_error().expect("domain error");
        assert_eq!(error.error, "invalid_grant");
    }

    #[tokio::test]
    async fn oauth_code_exchange_posts_form_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth20_token.srf"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=ABC"))
            .and(body_string_contains("client_id=00000000402b5328"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "A1",
                "refresh_token": "R1",
                "expires_in": 86400,
                "token_type": "bearer",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let service = test_service(&server);
        let token = service
            .oauth_token_from_code("ABC")
            .await
            .into_value()
            .expect("oauth token");
        assert_eq!(token.access_token, "A1");
        assert_eq!(token.refresh_token, "R1");
        assert!(!token.is_expired());
    }

    #[tokio::test]
    async fn xbl_sends_prefixed_ticket_and_reads_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/authenticate"))
            .and(body_string_contains("\"RpsTicket\":\"d=A1\""))
            .and(body_string_contains("\"AuthMethod\":\"RPS\""))
            .and(body_string_contains("\"RelyingParty\":\"http://auth.xboxlive.com\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Token": "XBL1",
                "DisplayClaims": { "xui": [{ "uhs": "H1" }] },
            })))
            .mount(&server)
            .await;

        let service = test_service(&server);
        let token = service
            .xbl_authenticate("A1")
            .await
            .into_value()
            .expect("xbl token");
        assert_eq!(token.as_str(), "XBL1");
    }

    #[tokio::test]
    async fn xbl_rejection_is_the_bare_status_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/authenticate"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let service = test_service(&server);
        let outcome = service.xbl_authenticate("A1").await;
        assert_eq!(outcome.into_domain_error(), Some(401));
    }

    #[tokio::test]
    async fn xsts_xerr_body_wins_over_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/xsts/authorize"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Identity": "0",
                "XErr": 2148916233u64,
                "Message": "",
                "Redirect": "https://start.ui.xboxlive.com/CreateAccount",
            })))
            .mount(&server)
            .await;

        let service = test_service(&server);
        let outcome = service
            .xsts_authorize(&XblToken::new("XBL1".to_string()), RP_MINECRAFT, SANDBOX_RETAIL)
            .await;

        let error = outcome.into_domain_error().expect("domain error");
        assert_eq!(error.xerr, 2148916233);
    }

    #[tokio::test]
    async fn xsts_success_extracts_token_and_user_hash() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/xsts/authorize"))
            .and(body_string_contains("\"SandboxId\":\"RETAIL\""))
            .and(body_string_contains("\"UserTokens\":[\"XBL1\"]"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Token": "X1",
                "DisplayClaims": { "xui": [{ "uhs": "H1" }] },
            })))
            .mount(&server)
            .await;

        let service = test_service(&server);
        let token = service
            .xsts_authorize(&XblToken::new("XBL1".to_string()), RP_MINECRAFT, SANDBOX_RETAIL)
            .await
            .into_value()
            .expect("xsts token");
        assert_eq!(token.token, "X1");
        assert_eq!(token.user_hash, "H1");
    }

    #[tokio::test]
    async fn xsts_without_claims_is_a_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/xsts/authorize"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Token": "X1",
                "DisplayClaims": { "xui": [] },
            })))
            .mount(&server)
            .await;

        let service = test_service(&server);
        let outcome = service
            .xsts_authorize(&XblToken::new("XBL1".to_string()), RP_MINECRAFT, SANDBOX_RETAIL)
            .await;
        assert!(outcome.has_transport_failure());
    }

    #[tokio::test]
    async fn minecraft_login_sends_identity_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authentication/login_with_xbox"))
            .and(body_string_contains("\"identityToken\":\"XBL3.0 x=H1;X1\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "username": "9e0",
                "access_token": "M1",
                "token_type": "Bearer",
                "expires_in": 86400,
            })))
            .mount(&server)
            .await;

        let service = test_service(&server);
        let xsts = XstsToken {
            token: "X1".to_string(),
            user_hash: "H1".to_string(),
        };
        let session = service
            .minecraft_login_with_xsts(&xsts)
            .await
            .into_value()
            .expect("session");
        assert_eq!(session.access_token, "M1");
    }

    #[tokio::test]
    async fn minecraft_login_rejection_is_the_bare_status_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/authentication/login_with_xbox"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let service = test_service(&server);
        let xsts = XstsToken {
            token: "X1".to_string(),
            user_hash: "H1".to_string(),
        };
        let outcome = service.minecraft_login_with_xsts(&xsts).await;
        assert_eq!(outcome.into_domain_error(), Some(403));
    }

    #[tokio::test]
    async fn entitlement_and_profile_use_the_session_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/entitlements/mcstore"))
            .and(header("Authorization", "Bearer M1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    { "name": "product_minecraft", "signature": "sig" },
                    { "name": "game_minecraft", "signature": "sig" },
                ],
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/minecraft/profile"))
            .and(header("Authorization", "Bearer M1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "069a79f444e94726a5befca90e38aaf5",
                "name": "Notch",
            })))
            .mount(&server)
            .await;

        let service = test_service(&server);
        let session = MinecraftSession::new("M1".to_string(), 86400);

        let entitlement = service
            .minecraft_has_purchased(&session)
            .await
            .into_value()
            .expect("entitlement");
        assert!(entitlement.owns_minecraft());

        let profile = service
            .minecraft_profile(&session)
            .await
            .into_value()
            .expect("profile");
        assert_eq!(profile.id, "069a79f444e94726a5befca90e38aaf5");
        assert_eq!(profile.name, "Notch");
    }

    #[tokio::test]
    async fn profile_rejection_is_the_bare_status_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/minecraft/profile"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": "NOT_FOUND",
            })))
            .mount(&server)
            .await;

        let service = test_service(&server);
        let session = MinecraftSession::new("M1".to_string(), 86400);
        let outcome = service.minecraft_profile(&session).await;
        assert_eq!(outcome.into_domain_error(), Some(404));
    }
}
