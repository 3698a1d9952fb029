use tracing::{debug, instrument};

use crate::config::{AuthConfig, RP_MINECRAFT, SANDBOX_RETAIL};
use crate::errors::{AuthenticationError, FailureKind, Result, Stage, TransportError};
use crate::file::{CredentialFile, MicrosoftCredentials};
use crate::outcome::StageOutcome;
use crate::service::MicrosoftService;
use crate::session::{Entitlement, MinecraftSession, OAuthToken, Profile};

/// Everything one successful chain run produces.
#[derive(Debug, Clone)]
pub struct AuthenticationResult {
    pub oauth: OAuthToken,
    pub session: MinecraftSession,
    pub entitlement: Option<Entitlement>,
    pub profile: Option<Profile>,
    /// Fresh credential file wrapping the new refresh token; persist this
    /// to skip the browser login next time.
    pub file: CredentialFile,
}

/// Sequences the chain stages into one authentication attempt.
///
/// Strictly sequential: each stage runs only after the previous stage
/// produced a plain value. The first domain error or transport failure
/// aborts the attempt; later stages are never invoked and the failure is
/// surfaced as one [`AuthenticationError`] naming the originating stage.
/// No stage is retried internally. Note that the authorization code is
/// single-use, so a failed `login_with_code` attempt needs a new code.
#[derive(Debug, Clone)]
pub struct Authenticator {
    service: MicrosoftService,
    fetch_entitlement: bool,
    fetch_profile: bool,
}

impl Authenticator {
    pub fn new(config: AuthConfig) -> std::result::Result<Self, TransportError> {
        Ok(Self {
            service: MicrosoftService::new(config)?,
            fetch_entitlement: true,
            fetch_profile: true,
        })
    }

    /// Skip the entitlement call when only a session token is needed.
    pub fn fetch_entitlement(mut self, fetch: bool) -> Self {
        self.fetch_entitlement = fetch;
        self
    }

    /// Skip the profile call when only a session token is needed.
    pub fn fetch_profile(mut self, fetch: bool) -> Self {
        self.fetch_profile = fetch;
        self
    }

    pub fn service(&self) -> &MicrosoftService {
        &self.service
    }

    /// First login: run the chain from a single-use authorization code.
    #[instrument(skip(self, authorization_code))]
    pub async fn login_with_code(&self, authorization_code: &str) -> Result<AuthenticationResult> {
        debug!("Starting authentication from authorization code");
        let oauth = stage_value(
            Stage::OAuth,
            self.service.oauth_token_from_code(authorization_code).await,
            FailureKind::OAuthRejected,
        )?;
        self.run_chain(oauth).await
    }

    /// Renewal: run the chain from a stored refresh token.
    #[instrument(skip(self, refresh_token))]
    pub async fn login_with_refresh_token(&self, refresh_token: &str) -> Result<AuthenticationResult> {
        debug!("Starting authentication from refresh token");
        let oauth = stage_value(
            Stage::OAuth,
            self.service.oauth_token_from_refresh_token(refresh_token).await,
            FailureKind::OAuthRejected,
        )?;
        self.run_chain(oauth).await
    }

    /// Renewal from a persisted [`CredentialFile`].
    pub async fn login_with_file(&self, file: &CredentialFile) -> Result<AuthenticationResult> {
        match file {
            CredentialFile::Microsoft(credentials) => {
                self.login_with_refresh_token(&credentials.refresh_token).await
            }
        }
    }

    async fn run_chain(&self, oauth: OAuthToken) -> Result<AuthenticationResult> {
        let xbl = stage_value(
            Stage::Xbl,
            self.service.xbl_authenticate(&oauth.access_token).await,
            FailureKind::StatusRejected,
        )?;

        let xsts = stage_value(
            Stage::Xsts,
            self.service
                .xsts_authorize(&xbl, RP_MINECRAFT, SANDBOX_RETAIL)
                .await,
            FailureKind::XstsDenied,
        )?;

        let session = stage_value(
            Stage::MinecraftLogin,
            self.service.minecraft_login_with_xsts(&xsts).await,
            FailureKind::StatusRejected,
        )?;

        let entitlement = if self.fetch_entitlement {
            Some(stage_value(
                Stage::Entitlement,
                self.service.minecraft_has_purchased(&session).await,
                FailureKind::StatusRejected,
            )?)
        } else {
            None
        };

        let profile = if self.fetch_profile {
            Some(stage_value(
                Stage::Profile,
                self.service.minecraft_profile(&session).await,
                FailureKind::StatusRejected,
            )?)
        } else {
            None
        };

        let file = CredentialFile::Microsoft(MicrosoftCredentials {
            client_id: self.service.config().client_id.clone(),
            refresh_token: oauth.refresh_token.clone(),
        });

        debug!("Authentication chain completed");
        Ok(AuthenticationResult {
            oauth,
            session,
            entitlement,
            profile,
            file,
        })
    }
}

fn stage_value<T, E>(
    stage: Stage,
    outcome: StageOutcome<T, E>,
    reject: impl FnOnce(E) -> FailureKind,
) -> Result<T> {
    match outcome {
        StageOutcome::Value(value) => Ok(value),
        StageOutcome::DomainError(error) => Err(AuthenticationError::new(stage, reject(error))),
        StageOutcome::TransportFailure(failure) => Err(AuthenticationError::new(
            stage,
            FailureKind::Transport(failure),
        )),
    }
}
