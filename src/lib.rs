//! Microsoft account authentication chain for Minecraft.
//!
//! Obtains a valid Minecraft game session from a Microsoft account by
//! running the multi-stage token exchange used by launchers, and persists
//! the long-lived refresh token so the user is not re-prompted for login.
//!
//! # Authentication chain
//!
//! 1. OAuth token exchange (authorization code or refresh token)
//! 2. Xbox Live user authentication
//! 3. XSTS authorization
//! 4. Minecraft services login
//! 5. Entitlement check (optional)
//! 6. Profile retrieval (optional)
//!
//! Each stage is modeled as a [`StageOutcome`]: a value, a stage-specific
//! domain rejection, or a transport failure. The [`Authenticator`] runs the
//! stages strictly in order and aborts on the first outcome that is not a
//! plain value.
//!
//! # Example
//!
//! ```no_run
//! use mc_msa_auth::{AuthConfig, Authenticator, CredentialFile};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AuthConfig::well_known();
//!     println!("Visit: {}", config.oauth_authorize_url()?);
//!
//!     let authenticator = Authenticator::new(config)?;
//!
//!     // After the user authorized in the browser and you extracted the
//!     // code from the redirect...
//!     let result = authenticator.login_with_code("<authorization code>").await?;
//!     if let Some(profile) = &result.profile {
//!         println!("Logged in as {}", profile.name);
//!     }
//!
//!     // Persist the credential file to skip the browser next time.
//!     std::fs::write("credentials.json", result.file.write())?;
//!
//!     // On the next run, renew the session from the stored file.
//!     let file = CredentialFile::read(&std::fs::read("credentials.json")?)?;
//!     let renewed = authenticator.login_with_file(&file).await?;
//!     std::fs::write("credentials.json", renewed.file.write())?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Notes
//!
//! - The credential file is plain text. It holds no password, but the
//!   refresh token inside can be used to log into the account; the written
//!   document carries a warning field saying so.
//! - No stage retries internally. A whole chain attempt may be retried by
//!   the caller, except from an authorization code, which is single-use.
//! - For a custom Azure application registration, substitute the client id
//!   and redirect URL together via [`AuthConfig::custom`].

pub mod authenticator;
pub mod config;
pub mod errors;
pub mod file;
pub mod models;
pub mod outcome;
pub mod service;
pub mod session;

pub use authenticator::{AuthenticationResult, Authenticator};
pub use config::{AuthConfig, HttpTimeouts, ServiceEndpoints};
pub use errors::{
    AuthenticationError, FailureKind, FormatError, Result, Stage, TransportError,
};
pub use file::{CredentialFile, FILE_WARNING, MicrosoftCredentials};
pub use models::{OAuthErrorResponse, XstsErrorResponse};
pub use outcome::StageOutcome;
pub use service::MicrosoftService;
pub use session::{Entitlement, MinecraftSession, OAuthToken, Profile, XblToken, XstsToken};
